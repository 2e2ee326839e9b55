//! Upload orchestrator
//!
//! Drives one design through its lifecycle:
//!
//! ```text
//! validate → store blob → insert pending design → analyzing
//!     → AI service (or fallback) → normalize → completed | failed
//! ```
//!
//! `analyze` runs the analysis inline; `submit` returns as soon as the design
//! is `analyzing` and finishes the work on a spawned task.

use std::sync::Arc;

use chrono::Utc;
use furni_common::events::{DesignStatus, EventBus, FurniEvent};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::models::{AnalysisPayload, Design, ImageUpload};
use crate::services::flowise_client::DEFAULT_QUESTION;
use crate::services::result_normalizer::{self, FallbackInput, RawAnalysis};
use crate::types::{AnalysisRequest, AnalysisService, BlobStore, DesignRepository};

/// What a client hands in for one design
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub title: String,
    pub description: Option<String>,
    pub image: ImageUpload,
}

/// A design whose analysis is running in the background
#[derive(Debug)]
pub struct SubmittedAnalysis {
    /// Design as of submission, already `analyzing`
    pub design: Design,
    pub handle: JoinHandle<Result<AnalysisPayload, AnalysisError>>,
}

/// Coordinates blob storage, design rows and the AI collaborator
pub struct UploadOrchestrator {
    blobs: Arc<dyn BlobStore>,
    repository: Arc<dyn DesignRepository>,
    /// `None` means every design is analyzed by the local fallback
    analysis_service: Option<Arc<dyn AnalysisService>>,
    event_bus: EventBus,
    question: String,
}

impl UploadOrchestrator {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        repository: Arc<dyn DesignRepository>,
        analysis_service: Option<Arc<dyn AnalysisService>>,
        event_bus: EventBus,
    ) -> Self {
        match &analysis_service {
            Some(service) => info!(service = service.name(), "Analysis service configured"),
            None => warn!("No analysis service configured, using local fallback analyzer"),
        }

        Self {
            blobs,
            repository,
            analysis_service,
            event_bus,
            question: DEFAULT_QUESTION.to_string(),
        }
    }

    /// Override the prompt sent with every image
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = question.into();
        self
    }

    pub fn repository(&self) -> &Arc<dyn DesignRepository> {
        &self.repository
    }

    /// Name of the active analysis backend
    pub fn backend_name(&self) -> &str {
        self.analysis_service
            .as_ref()
            .map_or("fallback", |service| service.name())
    }

    /// Validate, store the image and create the design in `pending`
    pub async fn upload(&self, request: &UploadRequest) -> Result<Design, AnalysisError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(AnalysisError::Validation("Title is required".to_string()));
        }
        let mime = request.image.validate()?;

        let key = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            request.image.extension()
        );
        let image_url = self
            .blobs
            .write(&key, &request.image.bytes, &mime)
            .await
            .map_err(|e| AnalysisError::Upload(e.to_string()))?;

        let design = Design::new(
            title,
            request.description.clone(),
            image_url,
            Some(request.image.file_name.clone()),
        );
        // A blob left behind by a failed insert is tolerated
        self.repository
            .create_design(&design)
            .await
            .map_err(|e| AnalysisError::Database(e.to_string()))?;

        info!(
            design_id = %design.id,
            title = %design.title,
            mime = %mime,
            bytes = request.image.bytes.len(),
            "Design uploaded"
        );
        self.event_bus.emit_lossy(FurniEvent::DesignUploaded {
            design_id: design.id,
            title: design.title.clone(),
            image_url: design.image_url.clone(),
            timestamp: design.created_at,
        });

        Ok(design)
    }

    /// Move a design to `analyzing`.
    ///
    /// Designs that already completed or failed are rejected; the stored
    /// status is authoritative over the one carried by `design`, which is
    /// only updated once the move is persisted.
    pub async fn start_analysis(&self, design: &mut Design) -> Result<(), AnalysisError> {
        let mut stored = self
            .repository
            .get_design(design.id)
            .await?
            .ok_or_else(|| AnalysisError::Validation(format!("Design {} does not exist", design.id)))?;

        let transition = stored.transition_to(DesignStatus::Analyzing).ok_or_else(|| {
            AnalysisError::Validation(format!(
                "Design {} is already {} and cannot be analyzed again",
                stored.id, stored.status
            ))
        })?;

        if !self
            .repository
            .update_status(design.id, DesignStatus::Analyzing)
            .await?
        {
            return Err(AnalysisError::Validation(format!(
                "Design {} finished while starting analysis",
                design.id
            )));
        }

        design.status = stored.status;
        design.updated_at = stored.updated_at;
        if transition.old_status != transition.new_status {
            self.event_bus.emit_lossy(transition.into_event());
        }
        Ok(())
    }

    /// `start_analysis`, failing the design when the move itself breaks.
    ///
    /// Validation rejections leave the design as it is.
    async fn begin_analysis(&self, design: &mut Design) -> Result<(), AnalysisError> {
        let from = design.status;
        match self.start_analysis(design).await {
            Err(err) if !matches!(err, AnalysisError::Validation(_)) => {
                error!(design_id = %design.id, code = err.code(), error = %err, "Could not start analysis");
                self.mark_failed(design.id, from, &err).await;
                Err(err)
            }
            result => result,
        }
    }

    /// Analyze a stored design inline and return the persisted payload.
    ///
    /// Any failure marks the design `failed` before the error is returned.
    pub async fn analyze(
        &self,
        mut design: Design,
        image: &ImageUpload,
    ) -> Result<AnalysisPayload, AnalysisError> {
        self.begin_analysis(&mut design).await?;
        self.finish_analysis(&design, image).await
    }

    /// Upload and analyze inline
    pub async fn upload_and_analyze(
        &self,
        request: &UploadRequest,
    ) -> Result<AnalysisPayload, AnalysisError> {
        let design = self.upload(request).await?;
        self.analyze(design, &request.image).await
    }

    /// Upload, move the design to `analyzing` and finish on a spawned task.
    ///
    /// Cancelling `cancel` stops the background work and marks the design
    /// `failed`.
    pub async fn submit(
        self: &Arc<Self>,
        request: UploadRequest,
        cancel: CancellationToken,
    ) -> Result<SubmittedAnalysis, AnalysisError> {
        let mut design = self.upload(&request).await?;
        self.begin_analysis(&mut design).await?;

        let orchestrator = Arc::clone(self);
        let task_design = design.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                result = orchestrator.finish_analysis(&task_design, &request.image) => result,
                _ = cancel.cancelled() => {
                    let err = AnalysisError::Cancelled;
                    orchestrator
                        .mark_failed(task_design.id, DesignStatus::Analyzing, &err)
                        .await;
                    Err(err)
                }
            }
        });

        Ok(SubmittedAnalysis { design, handle })
    }

    /// Everything after the `analyzing` transition
    async fn finish_analysis(
        &self,
        design: &Design,
        image: &ImageUpload,
    ) -> Result<AnalysisPayload, AnalysisError> {
        match self.run_analysis(design, image).await {
            Ok(payload) => {
                info!(
                    design_id = %design.id,
                    analysis_id = %payload.analysis.id,
                    materials = payload.materials.len(),
                    required_cost = payload.required_materials_cost(),
                    "Analysis completed"
                );
                self.event_bus.emit_lossy(FurniEvent::DesignStatusChanged {
                    design_id: design.id,
                    old_status: DesignStatus::Analyzing,
                    new_status: DesignStatus::Completed,
                    timestamp: payload.analysis.created_at,
                });
                self.event_bus.emit_lossy(FurniEvent::AnalysisCompleted {
                    design_id: design.id,
                    analysis_id: payload.analysis.id,
                    material_count: payload.materials.len(),
                    estimated_cost_min: payload.analysis.estimated_cost_min,
                    estimated_cost_max: payload.analysis.estimated_cost_max,
                    timestamp: payload.analysis.created_at,
                });
                Ok(payload)
            }
            Err(err) => {
                error!(design_id = %design.id, code = err.code(), error = %err, "Analysis failed");
                self.mark_failed(design.id, DesignStatus::Analyzing, &err).await;
                Err(err)
            }
        }
    }

    async fn run_analysis(
        &self,
        design: &Design,
        image: &ImageUpload,
    ) -> Result<AnalysisPayload, AnalysisError> {
        let raw = match &self.analysis_service {
            Some(service) => {
                let request = AnalysisRequest {
                    design_id: design.id,
                    question: self.question.clone(),
                    image_data_url: image.to_data_url(),
                    image_mime: image.validate()?,
                    image_name: image.file_name.clone(),
                };
                service.analyze(&request).await?
            }
            None => RawAnalysis::Absent,
        };

        let normalized = result_normalizer::normalize(
            &raw,
            &FallbackInput {
                title: &design.title,
                description: design.description.as_deref(),
                seed: design.fallback_seed(),
            },
        )?;
        tracing::debug!(
            design_id = %design.id,
            source = ?normalized.source,
            "Analysis normalized"
        );

        Ok(self
            .repository
            .complete_analysis(design.id, &normalized.analysis, &normalized.raw_response)
            .await?)
    }

    /// Set `failed` and announce it; a design already terminal is left alone
    async fn mark_failed(&self, design_id: Uuid, from: DesignStatus, err: &AnalysisError) {
        match self.repository.update_status(design_id, DesignStatus::Failed).await {
            Ok(true) => {
                let timestamp = Utc::now();
                self.event_bus.emit_lossy(FurniEvent::DesignStatusChanged {
                    design_id,
                    old_status: from,
                    new_status: DesignStatus::Failed,
                    timestamp,
                });
                self.event_bus.emit_lossy(FurniEvent::AnalysisFailed {
                    design_id,
                    error: err.to_string(),
                    timestamp,
                });
            }
            Ok(false) => {
                warn!(design_id = %design_id, "Design already terminal, not marking failed");
            }
            Err(e) => {
                error!(design_id = %design_id, error = %e, "Failed to mark design failed");
            }
        }
    }
}
