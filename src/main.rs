mod auth;
mod commands;
mod config;
mod downloader;
mod error;
mod flickr_client;
mod model;
mod walker;

#[cfg(test)]
mod test_support;

use std::{io, path::Path, process::ExitCode};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use git_version::git_version;
use log::debug;

use crate::auth::{ApiKeys, FlickrOAuth};
use crate::config::Defaults;
use crate::downloader::{DownloadOutcome, DownloadRun};
use crate::flickr_client::FlickrClient;

pub const GIT_VERSION: &str = git_version!(args = ["--always", "--dirty=-modified"], fallback = "unknown");

/// Download Flickr photosets and photostreams
#[derive(Parser, Debug)]
#[clap(author, version = GIT_VERSION, about, long_about = None)]
struct Args {
    /// Flickr API key
    #[clap(short = 'k', long = "api_key")]
    api_key: Option<String>,

    /// Flickr API secret
    #[clap(short = 's', long = "api_secret")]
    api_secret: Option<String>,

    /// Use OAuth token
    #[clap(short = 't', long = "api_token")]
    api_token: bool,

    /// List photosets for a user
    #[clap(short = 'l', long, value_name = "USERNAME")]
    list: Option<String>,

    /// List photos of a user
    #[clap(short = 'p', long, value_name = "USERNAME")]
    photos: Option<String>,

    /// Download the given set
    #[clap(short = 'd', long, value_name = "SET_ID")]
    download: Option<String>,

    /// Download photostream of user
    #[clap(short = 'u', long, value_name = "USERNAME")]
    photostream: Option<String>,

    /// Download all photosets of user
    #[clap(short = 'o', long, value_name = "USERNAME")]
    photosets: Option<String>,

    /// Download all photosets and photos of user
    #[clap(short = 'x', long, value_name = "USERNAME")]
    all: Option<String>,

    /// Size to download, e.g. "Original" or "Medium 640" (largest available if not given)
    #[clap(short = 'z', long = "size_label", value_name = "LABEL")]
    size_label: Option<String>,

    /// Enable debug logging
    #[clap(short = 'v', long)]
    verbose: bool,
}

/// What a single invocation does.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    ListSets(String),
    DownloadSet(String),
    ListPhotos(String),
    DownloadSets(String),
    DownloadPhotostream(String),
    DownloadAll(String),
}

/// Command line flags merged over the config file defaults.
#[derive(Debug)]
struct Options {
    api_key: Option<String>,
    api_secret: Option<String>,
    api_token: bool,
    action: Option<Action>,
    size_label: Option<String>,
}

impl Options {
    fn merge(args: Args, defaults: Defaults) -> Options {
        let list = args.list.or(defaults.list);
        let download = args.download.or(defaults.download);
        let photos = args.photos.or(defaults.photos);
        let photosets = args.photosets.or(defaults.photosets);
        let photostream = args.photostream.or(defaults.photostream);
        let all = args.all.or(defaults.all);

        let action = list
            .map(Action::ListSets)
            .or(download.map(Action::DownloadSet))
            .or(photos.map(Action::ListPhotos))
            .or(photosets.map(Action::DownloadSets))
            .or(photostream.map(Action::DownloadPhotostream))
            .or(all.map(Action::DownloadAll));

        Options {
            api_key: args.api_key.or(defaults.api_key),
            api_secret: args.api_secret.or(defaults.api_secret),
            api_token: args.api_token || defaults.api_token.unwrap_or(false),
            action,
            size_label: args.size_label.or(defaults.size_label),
        }
    }

    fn api_keys(&self) -> Option<ApiKeys> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Some(ApiKeys {
                key: key.clone(),
                secret: secret.clone(),
            }),
            _ => None,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose);

    let defaults = config::load_defaults(&config::default_config_path());
    debug!("flickr_download {GIT_VERSION}");

    let options = Options::merge(args, defaults);

    match run(options).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(options: Options) -> anyhow::Result<ExitCode> {
    let Some(keys) = options.api_keys() else {
        eprintln!("You need to pass in both \"api_key\" and \"api_secret\" arguments");
        return Ok(ExitCode::FAILURE);
    };

    let Some(action) = options.action.clone() else {
        eprintln!("ERROR: Must pass either --list or --download\n");
        Args::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    };

    let http = FlickrClient::build_client()?;
    let credentials = auth::initialize(
        &FlickrOAuth::new(http.clone()),
        keys,
        options.api_token,
        &auth::default_token_path(),
        &mut io::stdin().lock(),
        &mut io::stdout(),
    )
    .await
    .context("Authorization failed")?;
    let service = FlickrClient::new(credentials, http);

    let size_label = options.size_label.as_deref();
    let current_dir = Path::new(".");
    let mut run = DownloadRun::new(io::stdout());
    let result = match action {
        Action::ListSets(username) => {
            commands::print_sets(&service, &username, &mut io::stdout()).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Action::ListPhotos(username) => {
            commands::list_photos(&service, &username, &mut io::stdout()).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Action::DownloadSet(set_id) => {
            commands::download_set(&service, &set_id, current_dir, size_label, &mut run).await
        }
        Action::DownloadSets(username) => {
            commands::download_sets(&service, &username, current_dir, size_label, &mut run).await
        }
        Action::DownloadPhotostream(username) => {
            commands::download_photostream(&service, &username, current_dir, size_label, &mut run).await
        }
        Action::DownloadAll(username) => {
            commands::download_all(&service, &username, current_dir, size_label, &mut run).await
        }
    };

    // Photos handled before a listing error are still reported.
    println!("{}", run.summary());
    for outcome in run.outcomes() {
        if let DownloadOutcome::Failed { reason, .. } = outcome {
            eprintln!("  {}: {reason}", outcome.path().display());
        }
    }

    result?;
    Ok(ExitCode::SUCCESS)
}
