//! Analysis results and their materials

use chrono::Utc;
use furni_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::models::{AnalysisPayload, AnalysisResult, FurnitureAnalysis, Material};

/// Store the analysis and its materials and mark the design completed.
///
/// Runs in one transaction. The design must currently be `analyzing`;
/// otherwise nothing is written and `Error::InvalidInput` is returned.
pub async fn complete_analysis(
    pool: &SqlitePool,
    design_id: Uuid,
    analysis: &FurnitureAnalysis,
    raw_response: &serde_json::Value,
) -> Result<AnalysisPayload> {
    let now = Utc::now();
    let now_text = format_timestamp(&now);
    let raw_text = serde_json::to_string(raw_response)
        .map_err(|e| Error::Internal(format!("Failed to serialize raw response: {}", e)))?;

    let result = AnalysisResult {
        id: Uuid::new_v4(),
        design_id,
        ai_description: analysis.description.clone(),
        estimated_cost_min: analysis.estimated_cost_min,
        estimated_cost_max: analysis.estimated_cost_max,
        difficulty_level: analysis.difficulty_level,
        estimated_time_hours: analysis.estimated_time_hours,
        style_category: analysis.style_category.clone(),
        raw_ai_response: raw_response.clone(),
        created_at: now,
    };

    // Stable sort keeps response order within a priority
    let mut estimates: Vec<_> = analysis.materials.iter().enumerate().collect();
    estimates.sort_by_key(|(_, m)| m.priority);

    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE designs SET status = 'completed', updated_at = ? WHERE id = ? AND status = 'analyzing'",
    )
    .bind(&now_text)
    .bind(design_id.to_string())
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(Error::InvalidInput(format!(
            "Design {} is not awaiting analysis",
            design_id
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO analysis_results (
            id, design_id, ai_description, estimated_cost_min, estimated_cost_max,
            difficulty_level, estimated_time_hours, style_category,
            raw_ai_response, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(result.id.to_string())
    .bind(design_id.to_string())
    .bind(&result.ai_description)
    .bind(result.estimated_cost_min)
    .bind(result.estimated_cost_max)
    .bind(result.difficulty_level.as_str())
    .bind(result.estimated_time_hours)
    .bind(&result.style_category)
    .bind(&raw_text)
    .bind(&now_text)
    .execute(&mut *tx)
    .await?;

    let mut materials = Vec::with_capacity(estimates.len());
    for (position, estimate) in estimates {
        let material = Material {
            id: Uuid::new_v4(),
            analysis_id: result.id,
            name: estimate.name.clone(),
            category: estimate.category.clone(),
            quantity: estimate.quantity,
            unit: estimate.unit.clone(),
            estimated_cost: estimate.estimated_cost,
            priority: estimate.priority,
            notes: estimate.notes.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO materials (
                id, analysis_id, position, name, category, quantity, unit,
                estimated_cost, priority, priority_rank, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(material.id.to_string())
        .bind(result.id.to_string())
        .bind(position as i64)
        .bind(&material.name)
        .bind(&material.category)
        .bind(material.quantity)
        .bind(&material.unit)
        .bind(material.estimated_cost)
        .bind(material.priority.as_str())
        .bind(material.priority.rank())
        .bind(&material.notes)
        .execute(&mut *tx)
        .await?;

        materials.push(material);
    }

    tx.commit().await?;

    tracing::debug!(
        design_id = %design_id,
        analysis_id = %result.id,
        materials = materials.len(),
        "Analysis persisted"
    );

    Ok(AnalysisPayload {
        analysis: result,
        materials,
    })
}

pub async fn find_analysis(pool: &SqlitePool, design_id: Uuid) -> Result<Option<AnalysisResult>> {
    let row = sqlx::query(
        r#"
        SELECT id, design_id, ai_description, estimated_cost_min, estimated_cost_max,
               difficulty_level, estimated_time_hours, style_category,
               raw_ai_response, created_at
        FROM analysis_results
        WHERE design_id = ?
        "#,
    )
    .bind(design_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(analysis_from_row).transpose()
}

/// Materials of one analysis: required, optional, alternative
pub async fn list_materials(pool: &SqlitePool, analysis_id: Uuid) -> Result<Vec<Material>> {
    let rows = sqlx::query(
        r#"
        SELECT id, analysis_id, name, category, quantity, unit,
               estimated_cost, priority, notes
        FROM materials
        WHERE analysis_id = ?
        ORDER BY priority_rank, position
        "#,
    )
    .bind(analysis_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(material_from_row).collect()
}

pub async fn material_exists(pool: &SqlitePool, material_id: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials WHERE id = ?")
        .bind(material_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

fn analysis_from_row(row: &SqliteRow) -> Result<AnalysisResult> {
    let id: String = row.get("id");
    let design_id: String = row.get("design_id");
    let difficulty: String = row.get("difficulty_level");
    let raw: String = row.get("raw_ai_response");
    let created_at: String = row.get("created_at");

    Ok(AnalysisResult {
        id: parse_uuid("analysis_results.id", &id)?,
        design_id: parse_uuid("analysis_results.design_id", &design_id)?,
        ai_description: row.get("ai_description"),
        estimated_cost_min: row.get("estimated_cost_min"),
        estimated_cost_max: row.get("estimated_cost_max"),
        difficulty_level: difficulty.parse()?,
        estimated_time_hours: row.get("estimated_time_hours"),
        style_category: row.get("style_category"),
        raw_ai_response: serde_json::from_str(&raw)
            .map_err(|e| Error::Corrupt(format!("Failed to parse raw_ai_response: {}", e)))?,
        created_at: parse_timestamp("analysis_results.created_at", &created_at)?,
    })
}

fn material_from_row(row: &SqliteRow) -> Result<Material> {
    let id: String = row.get("id");
    let analysis_id: String = row.get("analysis_id");
    let priority: String = row.get("priority");

    Ok(Material {
        id: parse_uuid("materials.id", &id)?,
        analysis_id: parse_uuid("materials.analysis_id", &analysis_id)?,
        name: row.get("name"),
        category: row.get("category"),
        quantity: row.get("quantity"),
        unit: row.get("unit"),
        estimated_cost: row.get("estimated_cost"),
        priority: priority.parse()?,
        notes: row.get("notes"),
    })
}
