//! Route table resolver
//!
//! Maps a logical path onto physical URLs by its first segment. Unknown
//! segments fall through to the `.` route, which receives the whole path.

use bridge_traits::routing::EndpointResolver;
use core_runtime::config::RouteTable;
use tracing::trace;

/// Catch-all route key.
const FALLBACK_ROUTE: &str = ".";

/// [`EndpointResolver`] backed by a [`RouteTable`].
///
/// # Example
///
/// ```ignore
/// let routing = ArchiveRouting::new(RouteTable::default());
/// assert_eq!(
///     routing.resolve("metadata/commute"),
///     vec!["https://archive.org/metadata/commute"]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveRouting {
    table: RouteTable,
}

impl ArchiveRouting {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Swap a mirrored origin for the mirror. URLs on other origins are
    /// returned as is.
    fn apply_mirror(&self, url: String) -> String {
        let Some(mirror) = self.table.mirror.as_deref() else {
            return url;
        };
        let mirror = mirror.trim_end_matches('/');
        for origin in &self.table.mirrored_origins {
            let origin = origin.trim_end_matches('/');
            if let Some(rest) = url.strip_prefix(origin) {
                if rest.is_empty() || rest.starts_with('/') {
                    return format!("{}{}", mirror, rest);
                }
            }
        }
        url
    }
}

impl Default for ArchiveRouting {
    fn default() -> Self {
        Self::new(RouteTable::default())
    }
}

/// Split `metadata/commute` into `("metadata", "commute")` and
/// `advancedsearch.php?x=1` into `("advancedsearch.php", "?x=1")`.
fn split_first_segment(path: &str) -> (&str, &str) {
    match path.find(['/', '?']) {
        Some(i) if path.as_bytes()[i] == b'/' => (&path[..i], &path[i + 1..]),
        Some(i) => (&path[..i], &path[i..]),
        None => (path, ""),
    }
}

impl EndpointResolver for ArchiveRouting {
    fn resolve(&self, logical: &str) -> Vec<String> {
        let path = logical.trim_start_matches('/');
        let (segment, rest) = split_first_segment(path);

        let (bases, remainder) = match self.table.routes.get(segment) {
            Some(bases) => (bases, rest),
            None => match self.table.routes.get(FALLBACK_ROUTE) {
                Some(bases) => (bases, path),
                None => return Vec::new(),
            },
        };

        let mut urls: Vec<String> = Vec::with_capacity(bases.len());
        for base in bases {
            let url = self.apply_mirror(format!("{}{}", base, remainder));
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        trace!(logical, ?urls, "Resolved endpoints");
        urls
    }
}
