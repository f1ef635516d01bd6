//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::Redirect;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::routes::health::{self, HealthState};
use super::routes::query::{self, QueryApiState};
use crate::core::CoreApp;
use crate::core::constants::MAX_REQUEST_BODY_BYTES;

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);
        Self {
            app,
            allowed_origins,
        }
    }

    /// Build the router for the configured application
    pub fn router(app: &CoreApp, allowed_origins: &AllowedOrigins) -> Router {
        let query_routes = query::routes(QueryApiState {
            compiler: Arc::clone(&app.compiler),
            backend: Arc::clone(&app.backend),
            max_page_size: app.config.query.max_page_size,
            shutdown_rx: app.shutdown.subscribe(),
        });

        let health_routes = Router::new()
            .route("/", get(health::health))
            .with_state(HealthState {
                database: Arc::clone(&app.database),
                record_types: app.compiler.catalog().len(),
            });

        Router::new()
            .route("/", get(|| async { Redirect::temporary("/api/docs") }))
            .route("/api/openapi.json", get(openapi_json))
            .route("/api/docs", get(swagger_ui_html))
            .route("/api/docs/", get(swagger_ui_html))
            .nest("/api/v1/health", health_routes)
            .nest("/api/v1/query", query_routes)
            .fallback(middleware::handle_404)
            .layer(CompressionLayer::new())
            .layer(middleware::cors(allowed_origins))
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            allowed_origins,
        } = self;

        let shutdown = app.shutdown.clone();
        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = Self::router(&app, &allowed_origins);

        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(addr = %addr, "HTTP server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
