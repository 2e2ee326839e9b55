//! Database access for furni-ai
//!
//! One SQLite file in the root folder holds designs, their analyses,
//! materials, supplier quotes and settings.

pub mod analyses;
pub mod designs;
pub mod repository;
pub mod settings;
pub mod suppliers;

pub use repository::SqliteDesignRepository;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

/// Initialize database connection pool
///
/// Creates the file (and its parent directory) when missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create furni-ai tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS designs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            image_url TEXT NOT NULL,
            original_filename TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'analyzing', 'completed', 'failed')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_results (
            id TEXT PRIMARY KEY,
            design_id TEXT NOT NULL UNIQUE REFERENCES designs(id) ON DELETE CASCADE,
            ai_description TEXT NOT NULL,
            estimated_cost_min REAL NOT NULL,
            estimated_cost_max REAL NOT NULL,
            difficulty_level TEXT NOT NULL
                CHECK (difficulty_level IN ('beginner', 'intermediate', 'advanced')),
            estimated_time_hours REAL NOT NULL,
            style_category TEXT NOT NULL,
            raw_ai_response TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS materials (
            id TEXT PRIMARY KEY,
            analysis_id TEXT NOT NULL REFERENCES analysis_results(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit TEXT NOT NULL,
            estimated_cost REAL NOT NULL,
            priority TEXT NOT NULL
                CHECK (priority IN ('required', 'optional', 'alternative')),
            priority_rank INTEGER NOT NULL,
            notes TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS supplier_pricing (
            id TEXT PRIMARY KEY,
            material_id TEXT NOT NULL REFERENCES materials(id) ON DELETE CASCADE,
            supplier_name TEXT NOT NULL,
            price REAL NOT NULL,
            location TEXT,
            quality_rating REAL,
            delivery_time_days INTEGER,
            is_available INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for index in [
        "CREATE INDEX IF NOT EXISTS idx_designs_created_at ON designs(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_materials_analysis ON materials(analysis_id, priority_rank, position)",
        "CREATE INDEX IF NOT EXISTS idx_supplier_pricing_material ON supplier_pricing(material_id)",
    ] {
        sqlx::query(index).execute(pool).await?;
    }

    tracing::info!(
        "Database tables initialized (settings, designs, analysis_results, materials, supplier_pricing)"
    );

    Ok(())
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> furni_common::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| furni_common::Error::Corrupt(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn parse_uuid(column: &str, value: &str) -> furni_common::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| furni_common::Error::Corrupt(format!("Failed to parse {}: {}", column, e)))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> (SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = init_database_pool(&dir.path().join("furnicraft.db"))
        .await
        .expect("database init");
    (pool, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let (pool, _dir) = test_pool().await;
        init_tables(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["analysis_results", "designs", "materials", "settings", "supplier_pricing"]
        );
    }

    #[test]
    fn test_timestamp_round_trip_is_fixed_width() {
        let ts = Utc::now();
        let text = format_timestamp(&ts);
        assert!(text.ends_with('Z'));
        assert_eq!(parse_timestamp("created_at", &text).unwrap().timestamp_micros(), ts.timestamp_micros());
    }
}
