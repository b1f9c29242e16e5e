//! Error taxonomy for the resolution pipeline and history store

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using MonitorError
pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {
    /// Upstream provider did not answer within the request timeout
    #[error("provider {provider} timed out: {detail}")]
    ProviderTimeout { provider: String, detail: String },

    /// Upstream provider answered but had no usable observation
    #[error("provider {provider} returned no data: {detail}")]
    ProviderDataMissing { provider: String, detail: String },

    /// Malformed monitoring list, source hint or history file
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// History file exists but cannot be read back as a table
    #[error("history file {path} is corrupted: {detail}")]
    StoreCorruption { path: PathBuf, detail: String },

    /// Another writer holds the history lock
    #[error("history file {0} is locked by another writer")]
    StoreBusy(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    pub fn timeout(provider: &str, detail: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    pub fn missing(provider: &str, detail: impl Into<String>) -> Self {
        Self::ProviderDataMissing {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    /// Classify a transport error from an upstream provider.
    pub fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(provider, err.to_string())
        } else {
            Self::missing(provider, err.to_string())
        }
    }

    /// Provider-level errors degrade to "absent" and let the next tier run.
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            Self::ProviderTimeout { .. } | Self::ProviderDataMissing { .. }
        )
    }
}

impl From<csv::Error> for MonitorError {
    fn from(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return MonitorError::ParseFailure(err.to_string());
        }
        match err.into_kind() {
            csv::ErrorKind::Io(e) => MonitorError::Io(e),
            other => MonitorError::ParseFailure(format!("{:?}", other)),
        }
    }
}
