//! Health check endpoint

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::constants::API_VERSION;
use crate::data::DuckdbService;

#[derive(Clone)]
pub struct HealthState {
    pub database: Arc<DuckdbService>,
    pub record_types: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub record_types: usize,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database connection is closed", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    let (status, code, database) = if state.database.is_open() {
        ("ok", StatusCode::OK, "open")
    } else {
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE, "closed")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: API_VERSION,
            database,
            record_types: state.record_types,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn response_for(state: HealthState) -> (StatusCode, serde_json::Value) {
        let response = health(State(state)).await.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_database_state() {
        let temp_dir = TempDir::new().unwrap();
        let database = Arc::new(
            DuckdbService::open(&temp_dir.path().join("health.duckdb"), 5)
                .await
                .unwrap(),
        );
        let state = HealthState {
            database: Arc::clone(&database),
            record_types: 3,
        };

        let (status, body) = response_for(state.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "open");
        assert_eq!(body["recordTypes"], 3);

        Arc::clone(&database).close().await.unwrap();
        let (status, body) = response_for(state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["database"], "closed");
    }
}
