use thiserror::Error;

/// Errors raised while bootstrapping the runtime (configuration, logging,
/// capability wiring). Sync-time failures live in `core_sync::SyncError`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
