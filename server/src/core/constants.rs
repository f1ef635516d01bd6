// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "RecordQL";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".recordql";

/// API version reported in response envelopes
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "recordql.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "RECORDQL_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "RECORDQL_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "RECORDQL_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "RECORDQL_LOG";

/// Environment variable to suppress the startup banner
pub const ENV_NO_BANNER: &str = "RECORDQL_NO_BANNER";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Default log filter when neither RECORDQL_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "recordql_server=info,tower_http=warn";

/// Maximum request body size in bytes
pub const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "RECORDQL_DATA_DIR";

// =============================================================================
// Environment Variables - Database
// =============================================================================

/// Environment variable for the DuckDB database file
pub const ENV_DUCKDB_PATH: &str = "RECORDQL_DUCKDB_PATH";

/// Environment variable for the query timeout
pub const ENV_QUERY_TIMEOUT_SECS: &str = "RECORDQL_QUERY_TIMEOUT_SECS";

// =============================================================================
// DuckDB Database
// =============================================================================

/// DuckDB database filename (inside the `duckdb` data subdirectory)
pub const DUCKDB_DB_FILENAME: &str = "recordql.duckdb";

/// Default query timeout in seconds
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Environment Variables - Query
// =============================================================================

/// Environment variable for the SQL dialect (duckdb or suiteql)
pub const ENV_QUERY_DIALECT: &str = "RECORDQL_QUERY_DIALECT";

/// Environment variable toggling day-window date comparisons
pub const ENV_DATE_AWARE_COMPARISONS: &str = "RECORDQL_DATE_AWARE_COMPARISONS";

/// Environment variable for the page size ceiling
pub const ENV_MAX_PAGE_SIZE: &str = "RECORDQL_MAX_PAGE_SIZE";

// =============================================================================
// Query Defaults
// =============================================================================

/// Default page size ceiling
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

/// Maximum entries in a request's `fields` list
pub const MAX_SELECT_FIELDS: usize = 200;

/// Prefix of every failure message in query responses
pub const QUERY_ERROR_PREFIX: &str = "Request processing failed";

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum time to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;
