//! Record query endpoint

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::watch;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, validate_fields};
use crate::core::constants::{API_VERSION, QUERY_ERROR_PREFIX};
use crate::data::{PagedQueryBackend, Record};
use crate::domain::query::{
    CompiledQuery, ExecutionStats, Operator, PageDescriptor, PaginationMeta, QueryCompiler,
    QueryError, QueryExecutor, QuerySpec, ResultEnvelope, Scalar, coerce_page_number,
};

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct QueryApiState {
    pub compiler: Arc<QueryCompiler>,
    pub backend: Arc<dyn PagedQueryBackend>,
    pub max_page_size: usize,
    pub shutdown_rx: watch::Receiver<bool>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Logical record type, e.g. `customer` or `transactionline`
    pub record_type: Option<String>,
    /// Filter terms in any accepted shape
    #[serde(default)]
    #[schema(value_type = Object)]
    pub filters: Value,
    #[validate(custom(function = "validate_fields"))]
    pub fields: Option<Vec<String>>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
    /// Rows per page; fractional values truncate
    #[schema(value_type = Option<f64>)]
    pub page_size: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub page_index: Option<Value>,
    pub use_pagination: Option<bool>,
    pub debug: Option<bool>,
}

impl QueryRequest {
    fn to_spec(&self) -> QuerySpec {
        QuerySpec {
            record_type: self.record_type.clone(),
            filters: self.filters.clone(),
            fields: self.fields.clone(),
            order_by: self.order_by.clone(),
            order_dir: self.order_dir.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryDebug {
    pub sql: String,
    #[schema(value_type = Vec<Object>)]
    pub params: Vec<Scalar>,
    pub base_table: String,
    pub alias: String,
    pub execution_info: ExecutionStats,
}

impl QueryDebug {
    fn new(compiled: CompiledQuery, stats: ExecutionStats) -> Self {
        Self {
            sql: compiled.rendered.sql,
            params: compiled.rendered.params,
            base_table: compiled.base_table,
            alias: compiled.alias,
            execution_info: stats,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Record>,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
    pub record_type: Option<String>,
    pub timestamp: String,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<QueryDebug>,
}

impl QueryResponse {
    fn new(record_type: Option<String>, envelope: ResultEnvelope, debug: Option<QueryDebug>) -> Self {
        Self {
            success: envelope.success,
            data: envelope.data,
            record_count: envelope.record_count,
            pagination: envelope.pagination,
            record_type,
            timestamp: timestamp(),
            version: API_VERSION,
            debug,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureDebug {
    /// `validation` or `execution`
    pub error_class: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryFailure {
    pub success: bool,
    pub error: String,
    pub error_kind: &'static str,
    pub record_type: Option<String>,
    pub timestamp: String,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<FailureDebug>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesResponse {
    pub version: &'static str,
    pub dialect: String,
    pub date_aware_comparisons: bool,
    pub max_page_size: usize,
    pub operators: Vec<&'static str>,
    /// Symbol to operator name
    pub operator_symbols: BTreeMap<String, String>,
    pub record_types: Vec<String>,
    #[schema(value_type = Object)]
    pub example: Value,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: QueryApiState) -> Router<()> {
    Router::new()
        .route("/", get(capabilities).post(run_query))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Compile and execute a record query
#[utoipa::path(
    post,
    path = "/api/v1/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Query results", body = QueryResponse),
        (status = 400, description = "Invalid query", body = QueryFailure),
        (status = 502, description = "Backend execution failed", body = QueryFailure),
        (status = 503, description = "Server is shutting down")
    )
)]
pub async fn run_query(
    State(state): State<QueryApiState>,
    ValidatedJson(req): ValidatedJson<QueryRequest>,
) -> Result<Response, ApiError> {
    if *state.shutdown_rx.borrow() {
        return Err(ApiError::service_unavailable("Server is shutting down"));
    }

    let debug = req.debug.unwrap_or(false);
    let page = PageDescriptor::new(
        req.page_size.as_ref().and_then(coerce_page_number),
        req.page_index.as_ref().and_then(coerce_page_number),
        req.use_pagination,
        state.max_page_size,
    );
    let spec = req.to_spec();

    let result = async {
        let compiled = state.compiler.compile(&spec)?;
        if debug {
            tracing::debug!(
                record_type = %compiled.record_type,
                sql = %compiled.rendered.sql,
                params = ?compiled.rendered.params,
                "Executing query"
            );
        }
        let (envelope, stats) =
            QueryExecutor::execute(state.backend.as_ref(), &compiled.rendered, page).await?;
        Ok::<_, QueryError>((compiled, envelope, stats))
    }
    .await;

    let response = match result {
        Ok((compiled, envelope, stats)) => {
            let debug_info = debug.then(|| QueryDebug::new(compiled, stats));
            Json(QueryResponse::new(req.record_type, envelope, debug_info)).into_response()
        }
        Err(e) => failure_response(req.record_type, &e, debug),
    };
    Ok(response)
}

fn failure_response(record_type: Option<String>, err: &QueryError, debug: bool) -> Response {
    let (status, error_class) = if err.is_validation() {
        tracing::debug!(kind = err.kind(), error = %err, "Query rejected");
        (StatusCode::BAD_REQUEST, "validation")
    } else {
        tracing::warn!(kind = err.kind(), error = %err, "Query execution failed");
        (StatusCode::BAD_GATEWAY, "execution")
    };

    let body = QueryFailure {
        success: false,
        error: format!("{}: {}", QUERY_ERROR_PREFIX, err),
        error_kind: err.kind(),
        record_type,
        timestamp: timestamp(),
        version: API_VERSION,
        debug: debug.then_some(FailureDebug { error_class }),
    };
    (status, Json(body)).into_response()
}

/// Describe supported operators, record types and an example request
#[utoipa::path(
    get,
    path = "/api/v1/query",
    tag = "query",
    responses(
        (status = 200, description = "Query capabilities", body = CapabilitiesResponse)
    )
)]
pub async fn capabilities(State(state): State<QueryApiState>) -> Json<CapabilitiesResponse> {
    let config = state.compiler.config();
    Json(CapabilitiesResponse {
        version: API_VERSION,
        dialect: config.dialect.to_string(),
        date_aware_comparisons: config.date_aware_comparisons,
        max_page_size: state.max_page_size,
        operators: Operator::ALL.iter().map(Operator::as_str).collect(),
        operator_symbols: Operator::SYMBOLS
            .iter()
            .map(|(symbol, op)| (symbol.to_string(), op.as_str().to_string()))
            .collect(),
        record_types: state
            .compiler
            .catalog()
            .record_types()
            .map(str::to_string)
            .collect(),
        example: json!({
            "recordType": "transactionline",
            "filters": [
                { "field": "type", "operator": "equals", "value": "SalesOrd" },
                { "field": "trandate", "operator": "date_range", "startDate": "2024-01-01", "endDate": "2024-03-31" }
            ],
            "fields": ["transaction", "item", "amount"],
            "orderBy": "trandate",
            "orderDir": "desc",
            "pageSize": 100,
            "pageIndex": 0,
            "usePagination": true,
            "debug": false
        }),
    })
}
