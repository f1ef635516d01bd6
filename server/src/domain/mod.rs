//! Domain logic
//!
//! - `query` - Filter normalization, SQL compilation and paged execution

pub mod query;

pub use query::{QueryCompiler, QueryError, QueryExecutor};
