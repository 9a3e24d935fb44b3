use std::{
    collections::HashMap,
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use log::{debug, info};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use sha1::Sha1;
use uuid::Uuid;

use crate::error::{FlickrError, Result};

const REQUEST_TOKEN_URL: &str = "https://www.flickr.com/services/oauth/request_token";
const AUTHORIZE_URL: &str = "https://www.flickr.com/services/oauth/authorize";
const ACCESS_TOKEN_URL: &str = "https://www.flickr.com/services/oauth/access_token";
const PERMS: &str = "read";

pub const TOKEN_FILE: &str = ".flickr_token";

/// RFC 3986 unreserved characters stay as they are.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone)]
pub struct ApiKeys {
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OAuthToken {
    pub token: String,
    pub secret: String,
}

/// Everything the client needs to talk to Flickr. Built once at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub keys: ApiKeys,
    pub token: Option<OAuthToken>,
}

pub fn default_token_path() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(TOKEN_FILE)
}

/// The two network legs of the OAuth 1.0a authorization dance.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn request_token(&self, keys: &ApiKeys) -> Result<OAuthToken>;

    async fn access_token(
        &self,
        keys: &ApiKeys,
        request_token: &OAuthToken,
        verifier: &str,
    ) -> Result<OAuthToken>;
}

/// Token exchange against the Flickr OAuth endpoints.
pub struct FlickrOAuth {
    client: Client,
}

impl FlickrOAuth {
    pub fn new(client: Client) -> FlickrOAuth {
        FlickrOAuth { client }
    }
}

#[async_trait]
impl TokenExchange for FlickrOAuth {
    async fn request_token(&self, keys: &ApiKeys) -> Result<OAuthToken> {
        let params = vec![("oauth_callback".to_string(), "oob".to_string())];
        let query = signed_params("GET", REQUEST_TOKEN_URL, params, keys, None)?;
        let body = oauth_get(&self.client, REQUEST_TOKEN_URL, &query).await?;
        token_from_response(&body)
    }

    async fn access_token(
        &self,
        keys: &ApiKeys,
        request_token: &OAuthToken,
        verifier: &str,
    ) -> Result<OAuthToken> {
        let params = vec![("oauth_verifier".to_string(), verifier.to_string())];
        let query = signed_params("GET", ACCESS_TOKEN_URL, params, keys, Some(request_token))?;
        let body = oauth_get(&self.client, ACCESS_TOKEN_URL, &query).await?;
        token_from_response(&body)
    }
}

/// Sets up credentials. With `use_oauth`, a cached token is reused, otherwise
/// the operator is walked through authorization on `input`/`out` and the
/// token is cached.
pub async fn initialize(
    exchange: &dyn TokenExchange,
    keys: ApiKeys,
    use_oauth: bool,
    token_path: &Path,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Credentials> {
    if !use_oauth {
        return Ok(Credentials { keys, token: None });
    }

    if token_path.exists() {
        debug!("Loading OAuth token from {}", token_path.display());
        let token = load_token(token_path)?;
        return Ok(Credentials {
            keys,
            token: Some(token),
        });
    }

    let token = authorize_interactively(exchange, &keys, input, out).await?;
    save_token(token_path, &token)?;
    info!("Saved OAuth token to {}", token_path.display());

    Ok(Credentials {
        keys,
        token: Some(token),
    })
}

async fn authorize_interactively(
    exchange: &dyn TokenExchange,
    keys: &ApiKeys,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<OAuthToken> {
    let request_token = exchange.request_token(keys).await?;

    writeln!(out)?;
    writeln!(out, "Enter following url to the browser to authorize application")?;
    writeln!(out, "{}", authorization_url(&request_token))?;
    writeln!(out, "Copy paste <oauth_verifier> value and press return")?;
    out.flush()?;

    let verifier = read_verifier(input)?;
    exchange.access_token(keys, &request_token, &verifier).await
}

pub fn authorization_url(request_token: &OAuthToken) -> String {
    format!(
        "{AUTHORIZE_URL}?oauth_token={token}&perms={PERMS}",
        token = encode(&request_token.token)
    )
}

fn read_verifier(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let verifier = line.trim();
    if verifier.is_empty() {
        return Err(FlickrError::OAuth("no verifier entered".to_string()));
    }
    Ok(verifier.to_string())
}

async fn oauth_get(client: &Client, url: &str, query: &[(String, String)]) -> Result<String> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(FlickrError::OAuth(format!("{url} answered {status}: {body}")));
    }
    Ok(body)
}

fn token_from_response(body: &str) -> Result<OAuthToken> {
    let fields: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();

    if let Some(problem) = fields.get("oauth_problem") {
        return Err(FlickrError::OAuth(problem.clone()));
    }

    match (fields.get("oauth_token"), fields.get("oauth_token_secret")) {
        (Some(token), Some(secret)) => Ok(OAuthToken {
            token: token.clone(),
            secret: secret.clone(),
        }),
        _ => Err(FlickrError::OAuth(format!("unexpected response: {body}"))),
    }
}

/// Adds the OAuth protocol parameters and the HMAC-SHA1 signature to `params`.
pub fn signed_params(
    method: &str,
    url: &str,
    mut params: Vec<(String, String)>,
    keys: &ApiKeys,
    token: Option<&OAuthToken>,
) -> Result<Vec<(String, String)>> {
    params.push(("oauth_consumer_key".to_string(), keys.key.clone()));
    params.push(("oauth_nonce".to_string(), Uuid::new_v4().simple().to_string()));
    params.push(("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()));
    params.push((
        "oauth_timestamp".to_string(),
        chrono::Utc::now().timestamp().to_string(),
    ));
    params.push(("oauth_version".to_string(), "1.0".to_string()));
    if let Some(token) = token {
        params.push(("oauth_token".to_string(), token.token.clone()));
    }

    let token_secret = token.map(|t| t.secret.as_str()).unwrap_or("");
    let signature = sign(method, url, &params, &keys.secret, token_secret)?;
    params.push(("oauth_signature".to_string(), signature));

    Ok(params)
}

pub fn sign(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String> {
    let base = signature_base_string(method, url, params);
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| FlickrError::OAuth(format!("invalid signing key: {e}")))?;
    mac.update(base.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&normalized)
    )
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE).to_string()
}

/// The token file holds the access token on the first line and its secret on
/// the second.
pub fn load_token(path: &Path) -> Result<OAuthToken> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines().map(str::trim);

    match (lines.next(), lines.next()) {
        (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => Ok(OAuthToken {
            token: token.to_string(),
            secret: secret.to_string(),
        }),
        _ => Err(FlickrError::TokenFile(path.to_path_buf())),
    }
}

/// The file is readable by its owner only.
pub fn save_token(path: &Path, token: &OAuthToken) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    write!(file, "{}\n{}\n", token.token, token.secret)?;
    Ok(())
}
