//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{health, query};
use crate::domain::query::{ExecutionStats, PaginationMeta};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RecordQL API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Compiles structured record filters into parameterized SQL and runs them page by page"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "query", description = "Record queries")
    ),
    paths(
        health::health,
        query::run_query,
        query::capabilities,
    ),
    components(schemas(
        health::HealthResponse,
        query::QueryRequest,
        query::QueryResponse,
        query::QueryDebug,
        query::QueryFailure,
        query::FailureDebug,
        query::CapabilitiesResponse,
        PaginationMeta,
        ExecutionStats,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>RecordQL API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true,
                showExtensions: true,
                showCommonExtensions: true
            });
        };
    </script>
</body>
</html>"#;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_query_paths() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(doc["info"]["title"], "RecordQL API");
        assert!(doc["paths"]["/api/v1/query"]["post"].is_object());
        assert!(doc["paths"]["/api/v1/query"]["get"].is_object());
        assert!(doc["paths"]["/api/v1/health"]["get"].is_object());
        assert!(doc["components"]["schemas"]["QueryRequest"].is_object());
    }
}
