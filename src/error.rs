//! Error types for the harvest pipeline.
//!
//! [`HarvestError`] is what the pipeline returns to its caller: every
//! variant is fatal for the run. [`ApiError`] describes a failed call at
//! the remote boundary; the stages never propagate it directly but turn it
//! into a "miss" (resolution probe), a kept identity (cross-save), or an
//! exhausted character (history pages).

use thiserror::Error;

use crate::models::PlayerHandle;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("invalid Bungie name: {0} (expected name#code)")]
    InputFormat(String),

    #[error("no API key: set BUNGIE_API_KEY or api.api_key in the config file")]
    CredentialMissing,

    #[error("player {0} not found on any platform")]
    NotFound(PlayerHandle),

    #[error("failed to retrieve characters: {0}")]
    ProfileUnavailable(String),

    #[error("no characters found on this account")]
    NoCharacters,

    #[error("failed to write export: {0}")]
    Sink(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Bungie API error {status}: {message}")]
    Service { status: String, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Malformed(e.to_string())
    }
}
