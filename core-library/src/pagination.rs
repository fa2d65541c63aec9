//! Pagination helper types for member listings

use bridge_traits::{SearchResponse, SearchResult};
use serde::{Deserialize, Serialize};

use crate::models::MemberRecord;

/// Pagination request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Current page number (1-indexed; 0 is read as 1)
    pub page: u32,
    /// Number of records per page
    pub rows: u32,
}

impl PageRequest {
    /// Create a new page request
    ///
    /// # Examples
    ///
    /// ```
    /// use core_library::pagination::PageRequest;
    ///
    /// let request = PageRequest::new(0, 20);
    /// assert_eq!(request.page, 1);
    /// assert_eq!(request.offset(), 0);
    /// ```
    pub fn new(page: u32, rows: u32) -> Self {
        Self {
            page: page.max(1),
            rows,
        }
    }

    /// Index of the first record of this page
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.rows as usize
    }

    /// Index one past the last record of this page
    pub fn end(&self) -> usize {
        self.page.max(1) as usize * self.rows as usize
    }

    /// Search results that must already be held for this page to follow on
    /// without a gap.
    pub fn expected_before(&self) -> usize {
        self.offset()
    }

    /// Shape of the search request that fills this page given `held`
    /// search results.
    pub fn plan(&self, held: usize) -> FetchPlan {
        let expected = self.expected_before();
        if held == expected {
            FetchPlan::Steady {
                page: self.page.max(1),
                rows: self.rows,
            }
        } else if held * 2 >= expected {
            FetchPlan::CatchUp { rows: held as u32 }
        } else {
            FetchPlan::Rebuild {
                rows: self.end() as u32,
            }
        }
    }

    /// Request that rebuilds the whole window `[0, end)` in one call.
    pub fn rebuild(&self) -> FetchPlan {
        FetchPlan::Rebuild {
            rows: self.end() as u32,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, rows: 75 }
    }
}

/// The search request issued to fill a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Held results end exactly where this page starts
    Steady { page: u32, rows: u32 },
    /// At least half the gap is held: ask for page 2 with `rows = held`,
    /// which returns the missing tail plus read-ahead
    CatchUp { rows: u32 },
    /// Too little is held: drop it and fetch page 1 with the whole window
    Rebuild { rows: u32 },
}

impl FetchPlan {
    /// `(page, rows)` sent to the search endpoint
    pub fn params(&self) -> (u32, u32) {
        match *self {
            FetchPlan::Steady { page, rows } => (page, rows),
            FetchPlan::CatchUp { rows } => (2, rows),
            FetchPlan::Rebuild { rows } => (1, rows),
        }
    }

    /// Whether held search results are replaced rather than appended to.
    pub fn replaces_held(&self) -> bool {
        matches!(self, FetchPlan::Rebuild { .. })
    }
}

/// Bookkeeping last reported by the search index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    pub start: u64,
}

/// One page of members, optionally with the index bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPage {
    pub members: Vec<MemberRecord>,
    /// Present when the caller asked for the wrapped form
    pub response: Option<PageInfo>,
}

impl MemberPage {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.members.iter().map(MemberRecord::identifier).collect()
    }

    /// Present the page as a raw search response
    /// (`{response: {numFound, start, docs}}`).
    pub fn to_search_response(&self) -> SearchResponse {
        let info = self.response.unwrap_or_default();
        SearchResponse {
            response: SearchResult {
                num_found: info.num_found,
                start: info.start,
                docs: self.members.iter().map(MemberRecord::to_doc).collect(),
            },
        }
    }
}
