use bridge_traits::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

/// Failures surfaced by the loader and the sync engine.
///
/// A partially expanded member list is not an error: records that could not
/// be expanded simply stay stubs.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The endpoint could not be reached or answered with a failure status
    #[error("Transport failure while fetching {what}: {source}")]
    Transport {
        what: String,
        #[source]
        source: BridgeError,
    },

    /// The endpoint answered, but not with what was asked for
    #[error("Integrity error for {identifier}: {message}")]
    Integrity { identifier: String, message: String },

    #[error(
        "{identifier} is no longer available. Items may be taken down for various reasons, \
         including by decision of the uploader or due to a violation of the Terms of Use."
    )]
    Dark { identifier: String },

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Config(#[from] core_runtime::Error),
}

impl SyncError {
    /// Classify a bridge failure: undecodable payloads are integrity
    /// problems, everything else is transport.
    pub fn from_bridge(what: impl Into<String>, err: BridgeError) -> Self {
        let what = what.into();
        match err {
            BridgeError::Decode(message) => SyncError::Integrity {
                identifier: what,
                message,
            },
            source => SyncError::Transport { what, source },
        }
    }

    pub fn integrity(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Integrity {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport { .. })
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, SyncError::Integrity { .. })
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, SyncError::Dark { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
