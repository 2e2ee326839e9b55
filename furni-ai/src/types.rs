//! Collaborator traits for the analysis pipeline
//!
//! The orchestrator and poller only see these traits, so the SQLite
//! repository, the filesystem blob store and the Flowise client can each be
//! replaced by in-memory fakes.
//!
//! - [`BlobStore`]: durable image bytes addressed by a public URL
//! - [`DesignRepository`]: designs, analysis results and materials
//! - [`AnalysisService`]: the remote AI collaborator

use furni_common::Result;
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::models::{AnalysisPayload, AnalysisResult, Design, DesignStatus, FurnitureAnalysis, Material};
use crate::services::result_normalizer::RawAnalysis;

/// Durable blob storage
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the URL it is retrievable at
    async fn write(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// Relational store for designs and their analyses
#[async_trait::async_trait]
pub trait DesignRepository: Send + Sync {
    async fn create_design(&self, design: &Design) -> Result<()>;

    async fn get_design(&self, id: Uuid) -> Result<Option<Design>>;

    /// Newest first
    async fn list_designs(&self) -> Result<Vec<Design>>;

    /// Set status unless the stored design is already terminal.
    /// Returns whether a row changed.
    async fn update_status(&self, id: Uuid, status: DesignStatus) -> Result<bool>;

    /// Persist the result and its materials and mark the design completed,
    /// all or nothing
    async fn complete_analysis(
        &self,
        design_id: Uuid,
        analysis: &FurnitureAnalysis,
        raw_response: &serde_json::Value,
    ) -> Result<AnalysisPayload>;

    async fn find_analysis(&self, design_id: Uuid) -> Result<Option<AnalysisResult>>;

    /// Ordered by priority (required, optional, alternative)
    async fn list_materials(&self, analysis_id: Uuid) -> Result<Vec<Material>>;
}

/// What the AI collaborator is asked
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub design_id: Uuid,
    pub question: String,
    /// `data:<mime>;base64,...`
    pub image_data_url: String,
    pub image_mime: String,
    pub image_name: String,
}

/// Remote AI analysis collaborator
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn analyze(&self, request: &AnalysisRequest) -> std::result::Result<RawAnalysis, AnalysisError>;
}
