//! Data storage layer
//!
//! - `duckdb` - Embedded DuckDB backend
//! - `traits` - Page-oriented query backend trait
//! - `error` - Unified error type for all backends

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::{DuckdbQueryBackend, DuckdbService};
pub use error::DataError;
pub use traits::{PageRange, PagedQueryBackend, Record};
