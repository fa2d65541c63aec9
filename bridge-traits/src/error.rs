use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("No endpoint could serve {0}")]
    NoRoute(String),
}

impl BridgeError {
    /// True when the remote answered but the payload could not be understood.
    ///
    /// Everything else is a reachability problem.
    pub fn is_decode(&self) -> bool {
        matches!(self, BridgeError::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
