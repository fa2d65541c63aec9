//! Endpoint Resolution
//!
//! A logical request names a service path such as `metadata/commute` or
//! `advancedsearch.php?q=...`. The resolver maps it onto zero or more physical
//! URLs. Callers try them in order and stop at the first success, so the
//! sync layer never learns which backend actually answered.

/// Maps logical request paths to physical URLs.
pub trait EndpointResolver: Send + Sync {
    /// Physical URLs to try, most preferred first. An empty list means the
    /// path is not routable.
    fn resolve(&self, logical: &str) -> Vec<String>;
}

/// Resolver that prefixes every path with a single base URL.
#[derive(Debug, Clone)]
pub struct SingleOrigin {
    base: String,
}

impl SingleOrigin {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }
}

impl EndpointResolver for SingleOrigin {
    fn resolve(&self, logical: &str) -> Vec<String> {
        vec![format!("{}{}", self.base, logical.trim_start_matches('/'))]
    }
}
