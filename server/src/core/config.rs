use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::query::{CatalogEntry, LineSpec, MAX_PAGE_SIZE, QueryConfig, SqlDialect};
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PORT,
    DEFAULT_QUERY_TIMEOUT_SECS,
};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Database configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    /// DuckDB database file (defaults to the data directory)
    pub duckdb_path: Option<String>,
    /// Per-call query timeout in seconds
    pub query_timeout_secs: Option<u64>,
}

/// Query compiler configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryFileConfig {
    pub dialect: Option<SqlDialect>,
    pub date_aware_comparisons: Option<bool>,
    pub max_page_size: Option<usize>,
}

/// Header table of a configured line record type
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LineFileConfig {
    pub header_table: String,
    pub header_alias: String,
    pub foreign_key: String,
    #[serde(default)]
    pub header_only_fields: Vec<String>,
}

/// One configured record type
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RecordTypeFileConfig {
    pub table: String,
    pub line: Option<LineFileConfig>,
    /// Field/value pairs added as equality filters
    #[serde(default)]
    pub implicit_filters: BTreeMap<String, String>,
}

impl RecordTypeFileConfig {
    fn to_entry(&self) -> CatalogEntry {
        let mut entry = match &self.line {
            Some(line) => {
                let fields: Vec<&str> = line.header_only_fields.iter().map(String::as_str).collect();
                CatalogEntry::line(
                    &self.table,
                    LineSpec::new(
                        &line.header_table,
                        &line.header_alias,
                        &line.foreign_key,
                        &fields,
                    ),
                )
            }
            None => CatalogEntry::table(&self.table),
        };
        for (field, value) in &self.implicit_filters {
            entry = entry.with_implicit_filter(field, value);
        }
        entry
    }
}

/// Record catalog section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CatalogFileConfig {
    #[serde(default)]
    pub record_types: BTreeMap<String, RecordTypeFileConfig>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub query: Option<QueryFileConfig>,
    pub catalog: Option<CatalogFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Server
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        // Database
        if let Some(database) = other.database {
            let current = self.database.get_or_insert_with(DatabaseFileConfig::default);
            if database.duckdb_path.is_some() {
                tracing::trace!(path = ?database.duckdb_path, "Merging database.duckdb_path");
                current.duckdb_path = database.duckdb_path;
            }
            if database.query_timeout_secs.is_some() {
                tracing::trace!(
                    secs = ?database.query_timeout_secs,
                    "Merging database.query_timeout_secs"
                );
                current.query_timeout_secs = database.query_timeout_secs;
            }
        }

        // Query
        if let Some(query) = other.query {
            let current = self.query.get_or_insert_with(QueryFileConfig::default);
            if query.dialect.is_some() {
                tracing::trace!(dialect = ?query.dialect, "Merging query.dialect");
                current.dialect = query.dialect;
            }
            if query.date_aware_comparisons.is_some() {
                tracing::trace!(
                    enabled = ?query.date_aware_comparisons,
                    "Merging query.date_aware_comparisons"
                );
                current.date_aware_comparisons = query.date_aware_comparisons;
            }
            if query.max_page_size.is_some() {
                tracing::trace!(max = ?query.max_page_size, "Merging query.max_page_size");
                current.max_page_size = query.max_page_size;
            }
        }

        // Catalog (record types merge by key)
        if let Some(catalog) = other.catalog {
            let current = self.catalog.get_or_insert_with(CatalogFileConfig::default);
            for (key, record_type) in catalog.record_types {
                tracing::trace!(record_type = %key, "Merging catalog.record_types");
                current.record_types.insert(key, record_type);
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub duckdb_path: Option<String>,
    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            duckdb_path: None,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

/// Query compiler and executor configuration
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub compiler: QueryConfig,
    pub max_page_size: usize,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub query: QuerySettings,
    /// Record types added to (or replacing) the built-in catalog
    pub catalog: BTreeMap<String, CatalogEntry>,
    pub data_dir: Option<PathBuf>,
    pub no_banner: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.recordql/recordql.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.recordql/recordql.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_layers(cli, file_config)
    }

    /// Layer defaults, file config and CLI/env overrides
    pub(crate) fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();
        let file_query = file_config.query.unwrap_or_default();
        let file_catalog = file_config.catalog.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let database = DatabaseConfig {
            duckdb_path: cli.duckdb_path.clone().or(file_database.duckdb_path),
            query_timeout_secs: cli
                .query_timeout
                .or(file_database.query_timeout_secs)
                .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS),
        };

        let defaults = QueryConfig::default();
        let query = QuerySettings {
            compiler: QueryConfig {
                dialect: cli.dialect.or(file_query.dialect).unwrap_or(defaults.dialect),
                date_aware_comparisons: cli
                    .date_aware_comparisons
                    .or(file_query.date_aware_comparisons)
                    .unwrap_or(defaults.date_aware_comparisons),
            },
            max_page_size: cli
                .max_page_size
                .or(file_query.max_page_size)
                .unwrap_or(DEFAULT_MAX_PAGE_SIZE),
        };

        let catalog = file_catalog
            .record_types
            .iter()
            .map(|(key, rt)| (key.clone(), rt.to_entry()))
            .collect();

        let config = Self {
            server: ServerConfig { host, port },
            database,
            query,
            catalog,
            data_dir: cli.data_dir.clone(),
            no_banner: cli.no_banner,
        };

        // Validate configuration
        config.validate()?;

        if is_all_interfaces(&config.server.host) {
            tracing::warn!(
                host = %config.server.host,
                "Server binds to all interfaces; the query endpoint has no authentication"
            );
        }

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            duckdb_path = ?config.database.duckdb_path,
            query_timeout_secs = config.database.query_timeout_secs,
            dialect = %config.query.compiler.dialect,
            date_aware_comparisons = config.query.compiler.date_aware_comparisons,
            max_page_size = config.query.max_page_size,
            custom_record_types = config.catalog.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        // Host must not be empty
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port must be non-zero (port 0 would cause bind failure)
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.database.query_timeout_secs == 0 {
            anyhow::bail!("Configuration error: database.query_timeout_secs must be greater than 0");
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.query.max_page_size) {
            anyhow::bail!(
                "Configuration error: query.max_page_size must be between 1 and {} (got {})",
                MAX_PAGE_SIZE,
                self.query.max_page_size
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.recordql/recordql.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub(crate) fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}
