//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::{DuckdbQueryBackend, DuckdbService, PagedQueryBackend};
use crate::domain::query::{QueryCompiler, QuerySpec, RecordCatalog};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub database: Arc<DuckdbService>,
    pub compiler: Arc<QueryCompiler>,
    pub backend: Arc<dyn PagedQueryBackend>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Compile {
                record_type,
                filters,
                fields,
                order_by,
                order_dir,
            }) => {
                let filters = match filters {
                    Some(raw) => serde_json::from_str(&raw).context("Invalid --filters JSON")?,
                    None => serde_json::Value::Null,
                };
                let spec = QuerySpec {
                    record_type: Some(record_type),
                    filters,
                    fields: (!fields.is_empty()).then_some(fields),
                    order_by,
                    order_dir,
                };
                return Self::print_compiled(&cli_config, &spec);
            }
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    /// Build the compiler from the built-in catalog plus configured record types
    pub fn build_compiler(config: &AppConfig) -> Result<QueryCompiler> {
        let catalog = RecordCatalog::builtin()
            .extend(config.catalog.clone())
            .context("Invalid catalog configuration")?;
        tracing::debug!(record_types = catalog.len(), "Catalog loaded");
        Ok(QueryCompiler::new(Arc::new(catalog), config.query.compiler))
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init(&config).await?;
        let compiler = Arc::new(Self::build_compiler(&config)?);

        let database = Arc::new(
            DuckdbService::init(&storage, &config.database)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize DuckDB: {}", e))?,
        );
        let backend: Arc<dyn PagedQueryBackend> =
            Arc::new(DuckdbQueryBackend::new(Arc::clone(&database)));
        let shutdown = ShutdownService::new(Arc::clone(&database));

        Ok(Self {
            shutdown,
            config,
            storage,
            database,
            compiler,
            backend,
        })
    }

    /// `compile` subcommand: print SQL and parameters without touching the database
    fn print_compiled(cli: &CliConfig, spec: &QuerySpec) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let compiler = Self::build_compiler(&config)?;
        let compiled = compiler.compile(spec)?;

        println!("-- {} ({} {})", compiled.record_type, compiled.base_table, compiled.alias);
        println!("{}", compiled.rendered.sql);
        println!("-- params: {}", serde_json::to_string(&compiled.rendered.params)?);
        Ok(())
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        if !app.config.no_banner {
            banner::print_banner(
                &app.config.server.host,
                app.config.server.port,
                app.storage.data_dir(),
                app.database.path(),
                app.compiler.catalog().len(),
            );
        }

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
