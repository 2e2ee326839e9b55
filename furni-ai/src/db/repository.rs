//! SQLite-backed [`DesignRepository`]

use furni_common::events::DesignStatus;
use furni_common::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{analyses, designs};
use crate::models::{AnalysisPayload, AnalysisResult, Design, FurnitureAnalysis, Material};
use crate::types::DesignRepository;

#[derive(Clone)]
pub struct SqliteDesignRepository {
    pool: SqlitePool,
}

impl SqliteDesignRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DesignRepository for SqliteDesignRepository {
    async fn create_design(&self, design: &Design) -> Result<()> {
        designs::insert_design(&self.pool, design).await
    }

    async fn get_design(&self, id: Uuid) -> Result<Option<Design>> {
        designs::get_design(&self.pool, id).await
    }

    async fn list_designs(&self) -> Result<Vec<Design>> {
        designs::list_designs(&self.pool).await
    }

    async fn update_status(&self, id: Uuid, status: DesignStatus) -> Result<bool> {
        designs::update_status(&self.pool, id, status).await
    }

    async fn complete_analysis(
        &self,
        design_id: Uuid,
        analysis: &FurnitureAnalysis,
        raw_response: &Value,
    ) -> Result<AnalysisPayload> {
        analyses::complete_analysis(&self.pool, design_id, analysis, raw_response).await
    }

    async fn find_analysis(&self, design_id: Uuid) -> Result<Option<AnalysisResult>> {
        analyses::find_analysis(&self.pool, design_id).await
    }

    async fn list_materials(&self, analysis_id: Uuid) -> Result<Vec<Material>> {
        analyses::list_materials(&self.pool, analysis_id).await
    }
}
