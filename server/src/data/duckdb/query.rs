//! Paged query execution on DuckDB
//!
//! Page ranges come from a `COUNT(*)` over the compiled query; pages are
//! fetched by appending `LIMIT`/`OFFSET` to the same SQL and parameters.

use std::sync::Arc;

use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{Connection, params_from_iter};

use super::sql_types::{SqlScalar, value_to_json};
use super::{DuckdbError, DuckdbService};
use crate::data::error::DataError;
use crate::data::traits::{PageRange, PagedQueryBackend, Record};
use crate::domain::query::RenderedQuery;

/// [`PagedQueryBackend`] over a shared [`DuckdbService`]
#[derive(Clone)]
pub struct DuckdbQueryBackend {
    db: Arc<DuckdbService>,
}

impl DuckdbQueryBackend {
    pub fn new(db: Arc<DuckdbService>) -> Self {
        Self { db }
    }
}

fn count_rows(conn: &Connection, query: &RenderedQuery) -> Result<usize, DuckdbError> {
    let sql = format!("SELECT COUNT(*) FROM ({}) AS q", query.sql);
    let count: i64 = conn.query_row(
        &sql,
        params_from_iter(query.params.iter().map(SqlScalar)),
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

fn select_page(
    conn: &Connection,
    query: &RenderedQuery,
    page_size: usize,
    range: PageRange,
) -> Result<Vec<Record>, DuckdbError> {
    let sql = format!(
        "{} LIMIT {} OFFSET {}",
        query.sql,
        range.size,
        range.index * page_size
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(query.params.iter().map(SqlScalar)))?;
    let columns = rows
        .as_ref()
        .map(|s| s.column_names())
        .unwrap_or_default();

    let mut records = Vec::with_capacity(range.size);
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (i, name) in columns.iter().enumerate() {
            let value: Value = row.get(i)?;
            record.insert(name.clone(), value_to_json(value));
        }
        records.push(record);
    }
    Ok(records)
}

#[async_trait]
impl PagedQueryBackend for DuckdbQueryBackend {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    async fn page_ranges(
        &self,
        query: &RenderedQuery,
        page_size: usize,
    ) -> Result<Vec<PageRange>, DataError> {
        let db = Arc::clone(&self.db);
        let query = query.clone();
        let total = self
            .db
            .run_query(move || {
                let conn = db.conn()?;
                count_rows(&conn, &query)
            })
            .await??;
        Ok(PageRange::split(total, page_size))
    }

    async fn fetch_page(
        &self,
        query: &RenderedQuery,
        page_size: usize,
        range: PageRange,
    ) -> Result<Vec<Record>, DataError> {
        let db = Arc::clone(&self.db);
        let query = query.clone();
        let records = self
            .db
            .run_query(move || {
                let conn = db.conn()?;
                select_page(&conn, &query, page_size, range)
            })
            .await??;
        Ok(records)
    }
}
