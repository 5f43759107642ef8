use std::path::PathBuf;
use thiserror::Error;

/// The provider could not be reached, or refused the request, after the retry
/// policy gave up.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Provider rejected the request: {reason}")]
    Provider { reason: String },

    #[error("Request still failing after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<RetrievalError>,
    },
}

impl RetrievalError {
    /// Whether another attempt may succeed: connection problems, timeouts,
    /// server errors, 408 and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            RetrievalError::NetworkRequest(_, e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(is_transient_status)
            }
            RetrievalError::HttpStatus { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

pub(crate) fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
}

/// Failures of the on-disk response cache. The session logs these and falls
/// back to the network; only directory creation is fatal.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode cache data from '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode cache data")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
