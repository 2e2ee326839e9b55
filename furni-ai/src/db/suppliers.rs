//! Supplier quotes per material

use chrono::Utc;
use furni_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::models::{NewSupplierPrice, SupplierPrice};

/// Validate and store a quote for an existing material
pub async fn insert_price(
    pool: &SqlitePool,
    material_id: Uuid,
    new_price: &NewSupplierPrice,
) -> Result<SupplierPrice> {
    let supplier_name = new_price.supplier_name.trim();
    if supplier_name.is_empty() {
        return Err(Error::InvalidInput("supplier_name is required".to_string()));
    }
    if !new_price.price.is_finite() || new_price.price < 0.0 {
        return Err(Error::InvalidInput(format!(
            "price must be a non-negative number, got {}",
            new_price.price
        )));
    }
    if let Some(rating) = new_price.quality_rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(Error::InvalidInput(format!(
                "quality_rating must be between 0 and 5, got {}",
                rating
            )));
        }
    }
    if matches!(new_price.delivery_time_days, Some(days) if days < 0) {
        return Err(Error::InvalidInput(
            "delivery_time_days cannot be negative".to_string(),
        ));
    }

    let price = SupplierPrice {
        id: Uuid::new_v4(),
        material_id,
        supplier_name: supplier_name.to_string(),
        price: new_price.price,
        location: new_price.location.clone(),
        quality_rating: new_price.quality_rating,
        delivery_time_days: new_price.delivery_time_days,
        is_available: new_price.is_available,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO supplier_pricing (
            id, material_id, supplier_name, price, location,
            quality_rating, delivery_time_days, is_available, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(price.id.to_string())
    .bind(material_id.to_string())
    .bind(&price.supplier_name)
    .bind(price.price)
    .bind(&price.location)
    .bind(price.quality_rating)
    .bind(price.delivery_time_days)
    .bind(price.is_available)
    .bind(format_timestamp(&price.created_at))
    .execute(pool)
    .await?;

    Ok(price)
}

pub async fn list_prices(pool: &SqlitePool, material_id: Uuid) -> Result<Vec<SupplierPrice>> {
    let rows = sqlx::query(
        r#"
        SELECT id, material_id, supplier_name, price, location,
               quality_rating, delivery_time_days, is_available, created_at
        FROM supplier_pricing
        WHERE material_id = ?
        ORDER BY price
        "#,
    )
    .bind(material_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(price_from_row).collect()
}

fn price_from_row(row: &SqliteRow) -> Result<SupplierPrice> {
    let id: String = row.get("id");
    let material_id: String = row.get("material_id");
    let created_at: String = row.get("created_at");

    Ok(SupplierPrice {
        id: parse_uuid("supplier_pricing.id", &id)?,
        material_id: parse_uuid("supplier_pricing.material_id", &material_id)?,
        supplier_name: row.get("supplier_name"),
        price: row.get("price"),
        location: row.get("location"),
        quality_rating: row.get("quality_rating"),
        delivery_time_days: row.get("delivery_time_days"),
        is_available: row.get("is_available"),
        created_at: parse_timestamp("supplier_pricing.created_at", &created_at)?,
    })
}
