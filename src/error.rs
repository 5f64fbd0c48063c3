use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// How a failure affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Interaction or extraction failure during collection; skip the candidate.
    Transient,
    /// Fetch, decode or encode failure for one image; skip the item.
    Item,
    /// Nothing further can be done; abort the run.
    Fatal,
}

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("missing config file plant-harvest.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid subject entry: {0}")]
    InvalidSubject(String),

    #[error("images per category must be a positive integer, got {0}")]
    InvalidTargetCount(u64),

    #[error("invalid search endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("browser action `{action}` failed: {message}")]
    BrowserAction { action: &'static str, message: String },

    #[error("image request failed for {url}: {message}")]
    FetchHttp { url: String, message: String },

    #[error("image request for {url} returned status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("failed to decode image from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("failed to encode image from {url}: {message}")]
    Encode { url: String, message: String },

    #[error("failed to write image {path}: {message}")]
    ImageWrite { path: String, message: String },

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl HarvestError {
    pub fn class(&self) -> ErrorClass {
        match self {
            HarvestError::Navigation { .. } | HarvestError::BrowserAction { .. } => {
                ErrorClass::Transient
            }
            HarvestError::FetchHttp { .. }
            | HarvestError::FetchStatus { .. }
            | HarvestError::Decode { .. }
            | HarvestError::Encode { .. }
            | HarvestError::ImageWrite { .. } => ErrorClass::Item,
            HarvestError::MissingConfig
            | HarvestError::ConfigRead(_)
            | HarvestError::ConfigParse(_)
            | HarvestError::InvalidSubject(_)
            | HarvestError::InvalidTargetCount(_)
            | HarvestError::InvalidEndpoint(_)
            | HarvestError::BrowserLaunch(_)
            | HarvestError::Ledger(_)
            | HarvestError::Filesystem(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }

    pub(crate) fn action(action: &'static str, err: impl std::fmt::Display) -> Self {
        HarvestError::BrowserAction {
            action,
            message: err.to_string(),
        }
    }
}
