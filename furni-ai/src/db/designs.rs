//! Design rows

use chrono::Utc;
use furni_common::events::DesignStatus;
use furni_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::models::Design;

const DESIGN_COLUMNS: &str =
    "id, title, description, image_url, original_filename, status, created_at, updated_at";

pub async fn insert_design(pool: &SqlitePool, design: &Design) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO designs (
            id, title, description, image_url, original_filename,
            status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(design.id.to_string())
    .bind(&design.title)
    .bind(&design.description)
    .bind(&design.image_url)
    .bind(&design.original_filename)
    .bind(design.status.as_str())
    .bind(format_timestamp(&design.created_at))
    .bind(format_timestamp(&design.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_design(pool: &SqlitePool, id: Uuid) -> Result<Option<Design>> {
    let row = sqlx::query(&format!("SELECT {} FROM designs WHERE id = ?", DESIGN_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(design_from_row).transpose()
}

/// All designs, newest first
pub async fn list_designs(pool: &SqlitePool) -> Result<Vec<Design>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM designs ORDER BY created_at DESC, rowid DESC",
        DESIGN_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(design_from_row).collect()
}

/// Set the status of a non-terminal design; returns whether a row changed
pub async fn update_status(pool: &SqlitePool, id: Uuid, status: DesignStatus) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE designs
        SET status = ?, updated_at = ?
        WHERE id = ? AND status NOT IN ('completed', 'failed')
        "#,
    )
    .bind(status.as_str())
    .bind(format_timestamp(&Utc::now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn design_from_row(row: &SqliteRow) -> Result<Design> {
    let id: String = row.get("id");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Design {
        id: parse_uuid("designs.id", &id)?,
        title: row.get("title"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        original_filename: row.get("original_filename"),
        status: status.parse()?,
        created_at: parse_timestamp("designs.created_at", &created_at)?,
        updated_at: parse_timestamp("designs.updated_at", &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn design(title: &str) -> Design {
        Design::new(title, Some("walnut".into()), format!("http://x/{}.png", title), None)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (pool, _dir) = test_pool().await;
        let original = design("Desk");
        insert_design(&pool, &original).await.unwrap();

        let loaded = get_design(&pool, original.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Desk");
        assert_eq!(loaded.description.as_deref(), Some("walnut"));
        assert_eq!(loaded.status, DesignStatus::Pending);
        assert_eq!(loaded.created_at.timestamp_micros(), original.created_at.timestamp_micros());

        assert!(get_design(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (pool, _dir) = test_pool().await;
        let first = design("First");
        insert_design(&pool, &first).await.unwrap();
        let mut second = design("Second");
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        insert_design(&pool, &second).await.unwrap();

        let titles: Vec<String> = list_designs(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_terminal_status_not_overwritten() {
        let (pool, _dir) = test_pool().await;
        let d = design("Chair");
        insert_design(&pool, &d).await.unwrap();

        assert!(update_status(&pool, d.id, DesignStatus::Analyzing).await.unwrap());
        assert!(update_status(&pool, d.id, DesignStatus::Failed).await.unwrap());
        assert!(!update_status(&pool, d.id, DesignStatus::Analyzing).await.unwrap());

        let loaded = get_design(&pool, d.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, DesignStatus::Failed);
    }
}
