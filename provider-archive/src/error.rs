//! Error types for the archive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Archive provider errors
#[derive(Error, Debug)]
pub enum ArchiveProviderError {
    /// An endpoint answered with a non-success status
    #[error("Archive request to {url} failed (status {status})")]
    HttpStatus { url: String, status: u16 },

    /// The answer could not be decoded
    #[error("Failed to parse archive response from {url}: {message}")]
    ParseError { url: String, message: String },

    /// No route is configured for the logical path
    #[error("No endpoint configured for {0}")]
    NoRoute(String),

    /// Every resolved endpoint failed; carries the last failure
    #[error("All {attempts} endpoints failed for {path}: {last}")]
    AllEndpointsFailed {
        path: String,
        attempts: usize,
        last: Box<ArchiveProviderError>,
    },

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for archive provider operations
pub type Result<T> = std::result::Result<T, ArchiveProviderError>;

impl From<ArchiveProviderError> for BridgeError {
    fn from(error: ArchiveProviderError) -> Self {
        match error {
            ArchiveProviderError::HttpStatus { url, status } => BridgeError::HttpStatus { url, status },
            ArchiveProviderError::ParseError { url, message } => {
                BridgeError::Decode(format!("{}: {}", url, message))
            }
            ArchiveProviderError::NoRoute(path) => BridgeError::NoRoute(path),
            ArchiveProviderError::AllEndpointsFailed { last, .. } => (*last).into(),
            ArchiveProviderError::BridgeError(e) => e,
        }
    }
}
