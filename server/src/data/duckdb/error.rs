//! DuckDB service errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuckdbError {
    #[error("DuckDB error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Query timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("DuckDB connection already closed")]
    Closed,
}
