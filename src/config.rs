use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use serde::{Deserialize, Deserializer};

pub const CONFIG_FILE: &str = ".flickr_download";

/// Default values for command line options, keyed by option name.
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Defaults {
    #[serde(deserialize_with = "string_like")]
    pub api_key: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub api_secret: Option<String>,
    #[serde(deserialize_with = "bool_like")]
    pub api_token: Option<bool>,
    #[serde(deserialize_with = "string_like")]
    pub list: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub photos: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub download: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub photostream: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub photosets: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub all: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub size_label: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(CONFIG_FILE)
}

/// Loads defaults from `path`. A missing or broken file means no defaults.
pub fn load_defaults(path: &Path) -> Defaults {
    debug!("Loading configuration from {}", path.display());

    match fs::read_to_string(path) {
        Ok(contents) => parse_defaults(&contents).unwrap_or_else(|e| {
            warn!("Could not parse configuration file: {e}");
            Defaults::default()
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No config file");
            Defaults::default()
        }
        Err(e) => {
            warn!("Could not open configuration file: {e}");
            Defaults::default()
        }
    }
}

fn parse_defaults(contents: &str) -> Result<Defaults, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(Defaults::default());
    }
    let defaults: Option<Defaults> = serde_yaml::from_str(contents)?;
    Ok(defaults.unwrap_or_default())
}

/// Set ids and all-digit keys come out of YAML as numbers.
fn string_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
    }))
}

/// Accepts YAML booleans, yes/no and on/off words, and 0/1. Anything else is
/// ignored rather than failing the whole file.
fn bool_like<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Number(i64),
        Text(String),
    }

    let flag = match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Flag(flag)) => Some(flag),
        Some(Raw::Number(0)) => Some(false),
        Some(Raw::Number(1)) => Some(true),
        Some(Raw::Number(n)) => {
            warn!("Ignoring api_token value {n}");
            None
        }
        Some(Raw::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "on" | "true" | "1" => Some(true),
            "no" | "n" | "off" | "false" | "0" => Some(false),
            _ => {
                warn!("Ignoring api_token value '{text}'");
                None
            }
        },
    };
    Ok(flag)
}
