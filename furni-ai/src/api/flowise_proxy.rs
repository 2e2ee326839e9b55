//! Browser-facing Flowise proxy
//!
//! POST /flowise/analysis forwards a prediction request to the configured
//! chatflow so browser clients never call Flowise cross-origin.

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{AnalysisError, ApiError, ApiResult};
use crate::services::flowise_client::FlowiseRequest;
use crate::AppState;

/// POST /flowise/analysis
///
/// Upstream non-2xx answers are passed through with their status and body.
pub async fn proxy_analysis(
    State(state): State<AppState>,
    Json(mut request): Json<FlowiseRequest>,
) -> ApiResult<Response> {
    let client = state
        .flowise
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Flowise URL is not configured".to_string()))?;

    request.prepare_for_forwarding()?;

    tracing::info!(
        question = %request.question.chars().take(100).collect::<String>(),
        uploads = request.uploads.len(),
        "Forwarding analysis request to Flowise"
    );

    match client.predict(&request).await {
        Ok(value) => Ok(Json(value).into_response()),
        Err(AnalysisError::Service { status, body }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let details = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
            Ok((
                status,
                Json(json!({
                    "error": {
                        "code": "ANALYSIS_SERVICE_ERROR",
                        "message": format!("Flowise API error: {}", status.as_u16()),
                        "details": details,
                    }
                })),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Preflight-capable CORS policy for browser callers
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

/// Build proxy routes
pub fn flowise_routes() -> Router<AppState> {
    Router::new()
        .route("/flowise/analysis", post(proxy_analysis))
        .layer(cors_layer())
}
