use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while downloading or writing a catalogue
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request for page {page} timed out after {seconds}s")]
    Timeout { page: u32, seconds: u64 },

    #[error("Network error on page {page}: {message}")]
    Network { page: u32, message: String },

    #[error("HTTP {status} on page {page}: {body}")]
    Status { page: u32, status: u16, body: String },

    #[error("Invalid response on page {page}: {message}")]
    InvalidResponse { page: u32, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize catalogue: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FetchError {
    /// Page the error occurred on, if it came from a page request
    pub fn page(&self) -> Option<u32> {
        match self {
            FetchError::Timeout { page, .. }
            | FetchError::Network { page, .. }
            | FetchError::Status { page, .. }
            | FetchError::InvalidResponse { page, .. } => Some(*page),
            _ => None,
        }
    }
}
