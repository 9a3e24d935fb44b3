use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlickrError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: StatusCode, url: String },

    // Remote API errors
    #[error("Flickr API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Size '{label}' is not available for photo {photo_id}")]
    SizeUnavailable { label: String, photo_id: String },

    // Local errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid capture date: {0}")]
    InvalidDate(String),

    // Authorization errors
    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Invalid token file: {0}")]
    TokenFile(PathBuf),
}

impl FlickrError {
    /// True for the "not found" answers Flickr sometimes gives for photos
    /// that are still listed.
    pub fn is_not_found(&self) -> bool {
        match self {
            FlickrError::Api { code, .. } => *code == 1,
            FlickrError::Status { status, .. } => *status == StatusCode::NOT_FOUND,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlickrError>;
