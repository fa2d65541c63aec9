//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the archive sync core:
//! - Logging and tracing infrastructure
//! - Immutable configuration ([`ArchiveConfig`](config::ArchiveConfig))
//! - The runtime error type
//!
//! ## Overview
//!
//! Every other core crate takes an `Arc<ArchiveConfig>` built here, and logs
//! through the subscriber installed by [`logging::init_logging`].

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ArchiveConfig, ArchiveConfigBuilder};
pub use error::{Error, Result};
