//! furni-ai library interface
//!
//! Upload, analysis and cost-breakdown service for furniture designs.
//! Exposes the router and state for the binary and integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use furni_common::events::EventBus;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::db::SqliteDesignRepository;
use crate::services::{
    AnalysisPoller, FlowiseClient, LocalBlobStore, PollSettings, UploadOrchestrator,
};
use crate::types::AnalysisService;

/// Base64 image uploads arrive in JSON bodies
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Service wiring that does not come from the database
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory blobs are written to and served from
    pub images_root: PathBuf,
    /// URL prefix `images_root` is reachable at
    pub public_base_url: String,
    pub poll: PollSettings,
    /// Overrides the built-in analysis prompt
    pub question: Option<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub orchestrator: Arc<UploadOrchestrator>,
    pub poller: AnalysisPoller,
    /// Present when a Flowise URL is configured
    pub flowise: Option<Arc<FlowiseClient>>,
    pub images_root: PathBuf,
    /// Cancellation tokens for background analyses, by design id
    pub cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        flowise: Option<FlowiseClient>,
        config: ServiceConfig,
    ) -> Self {
        let repository = Arc::new(SqliteDesignRepository::new(db.clone()));
        let blobs = Arc::new(LocalBlobStore::new(
            config.images_root.clone(),
            config.public_base_url,
        ));
        let flowise = flowise.map(Arc::new);
        let analysis_service = flowise
            .clone()
            .map(|client| client as Arc<dyn AnalysisService>);

        let mut orchestrator =
            UploadOrchestrator::new(blobs, repository.clone(), analysis_service, event_bus.clone());
        if let Some(question) = config.question {
            orchestrator = orchestrator.with_question(question);
        }

        Self {
            db,
            event_bus,
            orchestrator: Arc::new(orchestrator),
            poller: AnalysisPoller::new(repository, config.poll),
            flowise,
            images_root: config.images_root,
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Cancel every background analysis still running; returns how many
    pub async fn cancel_all(&self) -> usize {
        let tokens = self.cancellation_tokens.read().await;
        for token in tokens.values() {
            token.cancel();
        }
        tokens.len()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let storage = ServeDir::new(&state.images_root);

    Router::new()
        .merge(api::design_routes())
        .merge(api::supplier_routes())
        .merge(api::flowise_routes())
        .merge(api::health_routes())
        .route("/events", get(api::design_event_stream))
        .nest_service("/storage", storage)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
