//! Error types for the net module.

use thiserror::Error;

/// Errors that can occur while talking to other nodes.
#[derive(Debug, Error)]
pub enum NetError {
    /// The host is unknown or refused the connection.
    #[error("host unreachable: {0}")]
    Unreachable(String),

    /// The peer answered with a non-success status.
    #[error("http status {status} from {url}")]
    Status { status: u16, url: String },

    /// The request did not complete in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The peer answered with something that is not a JSON document.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer directory could not be read.
    #[error("peer directory error: {0}")]
    Directory(String),
}

impl From<reqwest::Error> for NetError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        if e.is_timeout() {
            NetError::Timeout(url)
        } else if e.is_connect() {
            NetError::Unreachable(url)
        } else if let Some(status) = e.status() {
            NetError::Status {
                status: status.as_u16(),
                url,
            }
        } else if e.is_decode() {
            NetError::InvalidResponse(e.to_string())
        } else {
            NetError::Transport(e.to_string())
        }
    }
}

/// Result type for net operations.
pub type Result<T> = std::result::Result<T, NetError>;
