//! Page-wise execution of a rendered query
//!
//! The backend reports page ranges for a page size; the executor either
//! fetches one page (paginated) or walks every range in order and
//! concatenates the rows. Backend errors surface as
//! [`QueryError::ExecutionFailure`] and are not retried.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::error::QueryError;
use super::plan::RenderedQuery;
use crate::data::traits::{PageRange, PagedQueryBackend, Record};

/// Hard ceiling on rows per page
pub const MAX_PAGE_SIZE: usize = 1000;

/// Effective paging parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDescriptor {
    pub page_size: usize,
    pub page_index: usize,
    pub use_pagination: bool,
}

impl PageDescriptor {
    /// Clamp raw request values; `max_page_size` is itself capped at [`MAX_PAGE_SIZE`]
    pub fn new(
        page_size: Option<i64>,
        page_index: Option<i64>,
        use_pagination: Option<bool>,
        max_page_size: usize,
    ) -> Self {
        let ceiling = max_page_size.clamp(1, MAX_PAGE_SIZE);
        let page_size = page_size
            .map(|s| s.clamp(1, ceiling as i64) as usize)
            .unwrap_or(ceiling);
        let page_index = page_index.map(|i| i.max(0) as usize).unwrap_or(0);
        Self {
            page_size,
            page_index,
            use_pagination: use_pagination.unwrap_or(true),
        }
    }
}

/// Numeric coercion for paging inputs
///
/// Fractional numbers truncate toward zero and numeric strings are parsed;
/// anything else counts as absent.
pub fn coerce_page_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64),
        _ => None,
    }
}

impl Default for PageDescriptor {
    fn default() -> Self {
        Self::new(None, None, None, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page_size: usize,
    pub page_index: usize,
    pub total_records: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl PaginationMeta {
    fn compute(page_size: usize, page_index: usize, total_records: usize) -> Self {
        Self {
            page_size,
            page_index,
            total_records,
            total_pages: total_records.div_ceil(page_size),
            has_more: (page_index + 1) * page_size < total_records,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub success: bool,
    pub data: Vec<Record>,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

/// Execution details reported in debug responses
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub page_size: usize,
    pub page_index: usize,
    pub total_records: usize,
    pub returned_records: usize,
    pub use_pagination: bool,
    pub pages_fetched: usize,
    pub elapsed_ms: u64,
}

pub struct QueryExecutor;

impl QueryExecutor {
    pub async fn execute(
        backend: &dyn PagedQueryBackend,
        query: &RenderedQuery,
        page: PageDescriptor,
    ) -> Result<(ResultEnvelope, ExecutionStats), QueryError> {
        let started = Instant::now();
        let ranges = backend.page_ranges(query, page.page_size).await?;

        let (data, pagination, page_index, pages_fetched) = if page.use_pagination {
            let (data, meta) = fetch_one(backend, query, page, &ranges).await?;
            let fetched = usize::from(!ranges.is_empty());
            let index = meta.page_index;
            (data, Some(meta), index, fetched)
        } else {
            let data = fetch_all(backend, query, page.page_size, &ranges).await?;
            (data, None, 0, ranges.len())
        };

        let record_count = data.len();
        let stats = ExecutionStats {
            page_size: page.page_size,
            page_index,
            total_records: pagination
                .as_ref()
                .map(|p| p.total_records)
                .unwrap_or(record_count),
            returned_records: record_count,
            use_pagination: page.use_pagination,
            pages_fetched,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        tracing::debug!(
            backend = backend.name(),
            records = record_count,
            pages = pages_fetched,
            elapsed_ms = stats.elapsed_ms,
            "Query executed"
        );

        Ok((
            ResultEnvelope {
                success: true,
                data,
                record_count,
                pagination,
            },
            stats,
        ))
    }
}

/// Fetch the requested page, clamped to the last reported range
async fn fetch_one(
    backend: &dyn PagedQueryBackend,
    query: &RenderedQuery,
    page: PageDescriptor,
    ranges: &[PageRange],
) -> Result<(Vec<Record>, PaginationMeta), QueryError> {
    let total: usize = ranges.iter().map(|r| r.size).sum();
    let Some(last) = ranges.last() else {
        return Ok((Vec::new(), PaginationMeta::compute(page.page_size, 0, 0)));
    };
    let range = ranges.get(page.page_index).copied().unwrap_or(*last);
    let data = backend.fetch_page(query, page.page_size, range).await?;
    Ok((data, PaginationMeta::compute(page.page_size, range.index, total)))
}

async fn fetch_all(
    backend: &dyn PagedQueryBackend,
    query: &RenderedQuery,
    page_size: usize,
    ranges: &[PageRange],
) -> Result<Vec<Record>, QueryError> {
    let mut rows = Vec::with_capacity(ranges.iter().map(|r| r.size).sum());
    for range in ranges {
        rows.extend(backend.fetch_page(query, page_size, *range).await?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// In-memory backend serving `total` numbered rows
    struct FakeBackend {
        total: usize,
        fail: bool,
        fetched: Mutex<Vec<usize>>,
    }

    impl FakeBackend {
        fn with_rows(total: usize) -> Self {
            Self {
                total,
                fail: false,
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::with_rows(0)
            }
        }
    }

    #[async_trait]
    impl PagedQueryBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn page_ranges(
            &self,
            _query: &RenderedQuery,
            page_size: usize,
        ) -> Result<Vec<PageRange>, DataError> {
            if self.fail {
                return Err(DataError::backend_unavailable("fake", "down"));
            }
            Ok(PageRange::split(self.total, page_size))
        }

        async fn fetch_page(
            &self,
            _query: &RenderedQuery,
            page_size: usize,
            range: PageRange,
        ) -> Result<Vec<Record>, DataError> {
            self.fetched.lock().push(range.index);
            let start = range.index * page_size;
            Ok((start..start + range.size)
                .map(|i| {
                    let mut r = Record::new();
                    r.insert("id".into(), json!(i));
                    r
                })
                .collect())
        }
    }

    fn query() -> RenderedQuery {
        RenderedQuery {
            sql: "SELECT t.* FROM t t ORDER BY t.id ASC".into(),
            params: Vec::new(),
        }
    }

    async fn run(backend: &FakeBackend, page: PageDescriptor) -> (ResultEnvelope, ExecutionStats) {
        QueryExecutor::execute(backend, &query(), page).await.unwrap()
    }

    #[test]
    fn test_page_descriptor_clamps() {
        let p = PageDescriptor::new(Some(5000), Some(-3), None, MAX_PAGE_SIZE);
        assert_eq!(p.page_size, 1000);
        assert_eq!(p.page_index, 0);
        assert!(p.use_pagination);

        assert_eq!(PageDescriptor::new(Some(0), None, None, 1000).page_size, 1);
        assert_eq!(PageDescriptor::new(None, None, None, 250).page_size, 250);
        assert_eq!(PageDescriptor::new(Some(900), None, None, 250).page_size, 250);
        assert_eq!(PageDescriptor::new(None, None, None, 0).page_size, 1);
    }

    #[test]
    fn test_coerce_page_number() {
        assert_eq!(coerce_page_number(&json!(10)), Some(10));
        assert_eq!(coerce_page_number(&json!(10.0)), Some(10));
        assert_eq!(coerce_page_number(&json!(2.9)), Some(2));
        assert_eq!(coerce_page_number(&json!(-1.5)), Some(-1));
        assert_eq!(coerce_page_number(&json!(" 25 ")), Some(25));
        assert_eq!(coerce_page_number(&json!("abc")), None);
        assert_eq!(coerce_page_number(&json!(null)), None);
        assert_eq!(coerce_page_number(&json!(true)), None);
    }

    #[tokio::test]
    async fn test_pagination_math_238_rows() {
        let backend = FakeBackend::with_rows(238);
        for index in 0..=23 {
            let (envelope, _) = run(
                &backend,
                PageDescriptor::new(Some(10), Some(index), Some(true), MAX_PAGE_SIZE),
            )
            .await;
            let meta = envelope.pagination.unwrap();
            assert_eq!(meta.total_pages, 24);
            assert_eq!(meta.total_records, 238);
            assert_eq!(meta.has_more, index < 23, "page {}", index);
        }
    }

    #[tokio::test]
    async fn test_paginated_fetches_only_requested_page() {
        let backend = FakeBackend::with_rows(238);
        let (envelope, stats) = run(
            &backend,
            PageDescriptor::new(Some(10), Some(3), Some(true), MAX_PAGE_SIZE),
        )
        .await;
        assert_eq!(envelope.record_count, 10);
        assert_eq!(envelope.data[0]["id"], json!(30));
        assert_eq!(*backend.fetched.lock(), vec![3]);
        assert_eq!(stats.pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_clamped() {
        let backend = FakeBackend::with_rows(238);
        let (envelope, stats) = run(
            &backend,
            PageDescriptor::new(Some(10), Some(99), Some(true), MAX_PAGE_SIZE),
        )
        .await;
        let meta = envelope.pagination.unwrap();
        assert_eq!(meta.page_index, 23);
        assert!(!meta.has_more);
        assert_eq!(envelope.record_count, 8);
        assert_eq!(stats.page_index, 23);
    }

    #[tokio::test]
    async fn test_unpaginated_concatenates_every_page() {
        let backend = FakeBackend::with_rows(25);
        let (envelope, stats) = run(
            &backend,
            PageDescriptor::new(Some(10), Some(1), Some(false), MAX_PAGE_SIZE),
        )
        .await;
        assert!(envelope.pagination.is_none());
        assert_eq!(envelope.record_count, 25);
        assert_eq!(envelope.data[24]["id"], json!(24));
        assert_eq!(*backend.fetched.lock(), vec![0, 1, 2]);
        assert_eq!(stats.total_records, 25);
        assert_eq!(stats.pages_fetched, 3);
    }

    #[tokio::test]
    async fn test_empty_result() {
        let backend = FakeBackend::with_rows(0);
        let (envelope, stats) = run(&backend, PageDescriptor::default()).await;
        assert!(envelope.success);
        assert!(envelope.data.is_empty());
        assert_eq!(
            envelope.pagination,
            Some(PaginationMeta {
                page_size: 1000,
                page_index: 0,
                total_records: 0,
                total_pages: 0,
                has_more: false,
            })
        );
        assert_eq!(stats.pages_fetched, 0);
        assert!(backend.fetched.lock().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_is_execution_failure() {
        let backend = FakeBackend::failing();
        let err = QueryExecutor::execute(&backend, &query(), PageDescriptor::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::ExecutionFailure(_)));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = ResultEnvelope {
            success: true,
            data: Vec::new(),
            record_count: 0,
            pagination: Some(PaginationMeta::compute(10, 0, 238)),
        };
        let v = serde_json::to_value(&envelope).unwrap();
        assert_eq!(v["recordCount"], json!(0));
        assert_eq!(v["pagination"]["totalPages"], json!(24));
        assert_eq!(v["pagination"]["hasMore"], json!(true));
    }
}
