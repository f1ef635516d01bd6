//! Filter-to-query compiler
//!
//! - `catalog` - Record types, base tables and aliases
//! - `normalize` - Filter shape normalization
//! - `dates` - Date string normalization
//! - `operators` - Per-operator predicate compilation
//! - `join` - Header/line correlation
//! - `plan` - Query AST and rendering
//! - `compiler` - Request to rendered query
//! - `executor` - Page-wise execution against a backend

pub mod catalog;
pub mod compiler;
pub mod dates;
pub mod error;
pub mod executor;
pub mod join;
pub mod normalize;
pub mod operators;
pub mod plan;
pub mod types;

pub use catalog::{CatalogEntry, ImplicitFilter, LineSpec, RecordCatalog};
pub use compiler::{CompiledQuery, QueryCompiler, QueryConfig, QuerySpec};
pub use error::QueryError;
pub use executor::{
    ExecutionStats, MAX_PAGE_SIZE, PageDescriptor, PaginationMeta, QueryExecutor, ResultEnvelope,
    coerce_page_number,
};
pub use normalize::{MAX_FILTER_TERMS, NormalizedFilterTerm};
pub use operators::Operator;
pub use plan::{RenderedQuery, SqlDialect};
pub use types::{Identifier, OrderDirection, Scalar};
