//! Design API handlers
//!
//! POST /designs, GET /designs, GET /designs/:id,
//! GET /designs/:id/analysis, GET /designs/:id/analysis/wait

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisPayload, Design, ImageUpload};
use crate::services::upload_orchestrator::UploadRequest;
use crate::AppState;

/// POST /designs request
#[derive(Debug, Deserialize)]
pub struct UploadDesignRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Base64 payload, bare or as a `data:` URL
    pub data: String,
}

/// GET /designs response
#[derive(Debug, Serialize)]
pub struct DesignListResponse {
    pub designs: Vec<Design>,
    pub count: usize,
}

/// POST /designs
///
/// Stores the image, creates the design and starts its analysis in the
/// background. Returns 202 with the design in `analyzing`.
pub async fn upload_design(
    State(state): State<AppState>,
    Json(request): Json<UploadDesignRequest>,
) -> ApiResult<(StatusCode, Json<Design>)> {
    let image = ImageUpload::from_base64(request.file_name, request.content_type, &request.data)?;
    let upload = UploadRequest {
        title: request.title,
        description: request.description,
        image,
    };

    let token = CancellationToken::new();
    let submitted = state.orchestrator.submit(upload, token.clone()).await?;
    let design_id = submitted.design.id;

    state
        .cancellation_tokens
        .write()
        .await
        .insert(design_id, token);

    // Forget the token once the background analysis settles
    let tokens = state.cancellation_tokens.clone();
    let last_error = state.last_error.clone();
    let handle = submitted.handle;
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                *last_error.write().await = Some(format!("design {}: {}", design_id, e));
            }
            Err(e) => {
                tracing::error!(design_id = %design_id, error = %e, "Analysis task panicked");
                *last_error.write().await = Some(format!("design {}: task failed: {}", design_id, e));
            }
        }
        tokens.write().await.remove(&design_id);
    });

    Ok((StatusCode::ACCEPTED, Json(submitted.design)))
}

/// GET /designs
pub async fn list_designs(State(state): State<AppState>) -> ApiResult<Json<DesignListResponse>> {
    let designs = state.orchestrator.repository().list_designs().await?;
    Ok(Json(DesignListResponse {
        count: designs.len(),
        designs,
    }))
}

/// GET /designs/:id
pub async fn get_design(
    State(state): State<AppState>,
    Path(design_id): Path<Uuid>,
) -> ApiResult<Json<Design>> {
    let design = state
        .orchestrator
        .repository()
        .get_design(design_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Design not found: {}", design_id)))?;
    Ok(Json(design))
}

/// GET /designs/:id/analysis
///
/// The stored analysis with its materials, or 404 while there is none.
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(design_id): Path<Uuid>,
) -> ApiResult<Json<AnalysisPayload>> {
    let repository = state.orchestrator.repository();

    match repository.find_analysis(design_id).await? {
        Some(analysis) => {
            let materials = repository.list_materials(analysis.id).await?;
            Ok(Json(AnalysisPayload { analysis, materials }))
        }
        None => match repository.get_design(design_id).await? {
            Some(design) => Err(ApiError::NotFound(format!(
                "No analysis for design {} (status {})",
                design_id, design.status
            ))),
            None => Err(ApiError::NotFound(format!("Design not found: {}", design_id))),
        },
    }
}

/// GET /designs/:id/analysis/wait
///
/// Long poll until the analysis is available. Polling stops when the client
/// goes away.
pub async fn wait_for_analysis(
    State(state): State<AppState>,
    Path(design_id): Path<Uuid>,
) -> ApiResult<Json<AnalysisPayload>> {
    let token = CancellationToken::new();
    let _disconnect_guard = token.clone().drop_guard();

    let payload = state.poller.wait_for_analysis(design_id, &token).await?;
    Ok(Json(payload))
}

/// Build design routes
pub fn design_routes() -> Router<AppState> {
    Router::new()
        .route("/designs", post(upload_design).get(list_designs))
        .route("/designs/:id", get(get_design))
        .route("/designs/:id/analysis", get(get_analysis))
        .route("/designs/:id/analysis/wait", get(wait_for_analysis))
}
