use std::time::Duration;

use thiserror::Error;

use crate::ai::{AiError, ConfigError};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Subprocess fetch failed: {0}")]
    Subprocess(String),

    #[error("Response body exceeded {0} bytes")]
    BodyTooLarge(usize),
}

/// Failure surfaced by the extraction entry points.
///
/// `Display` is short and safe to show to end users. Upstream detail is
/// logged where the failure happens and never carried in the message.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "Couldn't load this page. The site may be blocking automated access. \
         Try again later or add the recipe manually."
    )]
    AcquisitionFailed { url: String },

    #[error("No recipe found on this page. Try adding it manually.")]
    NoRecipe { url: String },

    #[error("Not a supported video link: {0}")]
    UnsupportedVideo(String),

    #[error("The recipe could not be extracted from this video.")]
    VideoUnavailable { video_id: String },

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("Unsupported document: {0}")]
    Document(String),

    #[error("Could not read uploaded file {path}")]
    Storage { path: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP client setup failed")]
    Http(#[from] FetchError),
}

impl ExtractError {
    /// Message suitable for returning to the person who submitted the input.
    pub fn user_message(&self) -> String {
        match self {
            ExtractError::Ai(e) => e.user_message().to_string(),
            ExtractError::Config(_) => {
                "Recipe import is not set up on this server. Please contact the administrator."
                    .to_string()
            }
            other => other.to_string(),
        }
    }

    /// HTTP status a boundary handler should map this failure to.
    pub fn status_hint(&self) -> u16 {
        match self {
            ExtractError::InvalidInput(_)
            | ExtractError::UnsupportedVideo(_)
            | ExtractError::Document(_) => 400,
            ExtractError::AcquisitionFailed { .. } => 502,
            ExtractError::NoRecipe { .. } | ExtractError::VideoUnavailable { .. } => 422,
            ExtractError::Ai(e) => e.status_hint(),
            ExtractError::Storage { .. } | ExtractError::Config(_) | ExtractError::Http(_) => 500,
        }
    }

    /// Whether trying the same input again later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractError::AcquisitionFailed { .. } | ExtractError::Storage { .. } => true,
            ExtractError::Ai(e) => e.is_retryable(),
            _ => false,
        }
    }
}
