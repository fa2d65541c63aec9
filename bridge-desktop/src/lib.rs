//! # Desktop Bridge Implementations
//!
//! Native implementations of the bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls, pooled connections and
//!   retry with exponential backoff on 5xx/429 and connection failures.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_desktop::ReqwestHttpClient;
//! use provider_archive::ArchiveConnector;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http = Arc::new(ReqwestHttpClient::new()?);
//!     let connector = ArchiveConnector::from_config(http, &config);
//!     // hand the connector to the sync engine
//!     Ok(())
//! }
//! ```

mod http;

pub use http::ReqwestHttpClient;
