//! RecordQL: compiles structured record filters into parameterized SQL and
//! executes them page by page.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
