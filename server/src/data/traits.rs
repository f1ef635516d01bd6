//! Backend traits for query execution
//!
//! The executor only needs two things from a backend: how many rows a query
//! produces (reported as page ranges) and the rows of one page. Each backend
//! implements [`PagedQueryBackend`] with its own paging strategy.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::data::error::DataError;
use crate::domain::query::RenderedQuery;

/// One result row keyed by column name
pub type Record = Map<String, Value>;

/// A page reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// Zero-based page index
    pub index: usize,
    /// Number of rows on this page
    pub size: usize,
}

impl PageRange {
    /// Split `total` rows into pages of `page_size`
    pub fn split(total: usize, page_size: usize) -> Vec<PageRange> {
        let page_size = page_size.max(1);
        (0..total.div_ceil(page_size))
            .map(|index| PageRange {
                index,
                size: page_size.min(total - index * page_size),
            })
            .collect()
    }
}

// ============================================================================
// Paged Query Backend Trait
// ============================================================================

/// Page-oriented execution of a compiled query
#[async_trait]
pub trait PagedQueryBackend: Send + Sync {
    /// Short backend name for logs and errors
    fn name(&self) -> &'static str;

    /// Pages the query produces at `page_size` rows per page
    async fn page_ranges(
        &self,
        query: &RenderedQuery,
        page_size: usize,
    ) -> Result<Vec<PageRange>, DataError>;

    /// Rows of a single page
    async fn fetch_page(
        &self,
        query: &RenderedQuery,
        page_size: usize,
        range: PageRange,
    ) -> Result<Vec<Record>, DataError>;
}
