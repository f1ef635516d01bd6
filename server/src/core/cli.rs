use clap::{Parser, Subcommand};

use std::path::PathBuf;

use crate::domain::query::SqlDialect;

use super::constants::{
    ENV_CONFIG, ENV_DATA_DIR, ENV_DATE_AWARE_COMPARISONS, ENV_DUCKDB_PATH, ENV_HOST,
    ENV_MAX_PAGE_SIZE, ENV_NO_BANNER, ENV_PORT, ENV_QUERY_DIALECT, ENV_QUERY_TIMEOUT_SECS,
};

#[derive(Parser)]
#[command(name = "recordql")]
#[command(version, about = "Filter-to-query compiler service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Data directory
    #[arg(long, global = true, env = ENV_DATA_DIR)]
    pub data_dir: Option<PathBuf>,

    /// Do not print the startup banner
    #[arg(long, global = true, env = ENV_NO_BANNER)]
    pub no_banner: bool,

    /// DuckDB database file
    #[arg(long, global = true, env = ENV_DUCKDB_PATH)]
    pub duckdb_path: Option<String>,

    /// Query timeout in seconds
    #[arg(long, global = true, env = ENV_QUERY_TIMEOUT_SECS)]
    pub query_timeout: Option<u64>,

    /// SQL dialect (duckdb or suiteql)
    #[arg(long, global = true, env = ENV_QUERY_DIALECT, value_parser = parse_dialect)]
    pub dialect: Option<SqlDialect>,

    /// Treat date-shaped operands of comparison operators as whole days
    #[arg(long, global = true, env = ENV_DATE_AWARE_COMPARISONS)]
    pub date_aware_comparisons: Option<bool>,

    /// Page size ceiling (1-1000)
    #[arg(long, global = true, env = ENV_MAX_PAGE_SIZE)]
    pub max_page_size: Option<usize>,
}

/// Parse SQL dialect from CLI/env string
fn parse_dialect(s: &str) -> Result<SqlDialect, String> {
    match s.to_lowercase().as_str() {
        "duckdb" => Ok(SqlDialect::Duckdb),
        "suiteql" => Ok(SqlDialect::Suiteql),
        _ => Err(format!(
            "Invalid dialect '{}'. Valid options: duckdb, suiteql",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Compile a query and print the SQL without executing it
    Compile {
        /// Record type to query
        #[arg(long, short = 'r')]
        record_type: String,

        /// Filters as JSON (any accepted shape)
        #[arg(long, short = 'f')]
        filters: Option<String>,

        /// Comma-separated column list
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Order column
        #[arg(long)]
        order_by: Option<String>,

        /// Order direction (asc or desc)
        #[arg(long)]
        order_dir: Option<String>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub no_banner: bool,
    pub duckdb_path: Option<String>,
    pub query_timeout: Option<u64>,
    pub dialect: Option<SqlDialect>,
    pub date_aware_comparisons: Option<bool>,
    pub max_page_size: Option<usize>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        data_dir: cli.data_dir,
        no_banner: cli.no_banner,
        duckdb_path: cli.duckdb_path,
        query_timeout: cli.query_timeout,
        dialect: cli.dialect,
        date_aware_comparisons: cli.date_aware_comparisons,
        max_page_size: cli.max_page_size,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect() {
        assert_eq!(parse_dialect("SuiteQL").unwrap(), SqlDialect::Suiteql);
        assert_eq!(parse_dialect("duckdb").unwrap(), SqlDialect::Duckdb);
        assert!(parse_dialect("oracle").is_err());
    }

    #[test]
    fn test_compile_subcommand() {
        let cli = Cli::try_parse_from([
            "recordql",
            "compile",
            "--record-type",
            "customer",
            "--fields",
            "id,companyname",
            "--order-dir",
            "desc",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Compile {
                record_type,
                fields,
                order_dir,
                ..
            }) => {
                assert_eq!(record_type, "customer");
                assert_eq!(fields, vec!["id", "companyname"]);
                assert_eq!(order_dir.as_deref(), Some("desc"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["recordql", "--port", "8080", "--dialect", "suiteql"])
            .unwrap();
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.dialect, Some(SqlDialect::Suiteql));
        assert!(cli.command.is_none());
    }
}
