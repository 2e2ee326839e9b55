//! Supplier quote handlers
//!
//! GET /materials/:id/suppliers, POST /materials/:id/suppliers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::db::{analyses, suppliers};
use crate::error::{ApiError, ApiResult};
use crate::models::{NewSupplierPrice, SupplierComparison, SupplierPrice};
use crate::services::price_comparison;
use crate::AppState;

async fn ensure_material(state: &AppState, material_id: Uuid) -> ApiResult<()> {
    if analyses::material_exists(&state.db, material_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("Material not found: {}", material_id)))
    }
}

/// GET /materials/:id/suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
) -> ApiResult<Json<SupplierComparison>> {
    ensure_material(&state, material_id).await?;
    let prices = suppliers::list_prices(&state.db, material_id).await?;
    Ok(Json(price_comparison::compare(material_id, prices)))
}

/// POST /materials/:id/suppliers
pub async fn add_supplier(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
    Json(request): Json<NewSupplierPrice>,
) -> ApiResult<(StatusCode, Json<SupplierPrice>)> {
    ensure_material(&state, material_id).await?;
    let price = suppliers::insert_price(&state.db, material_id, &request).await?;

    tracing::info!(
        material_id = %material_id,
        supplier = %price.supplier_name,
        price = price.price,
        "Supplier quote added"
    );
    Ok((StatusCode::CREATED, Json(price)))
}

/// Build supplier routes
pub fn supplier_routes() -> Router<AppState> {
    Router::new().route(
        "/materials/:id/suppliers",
        get(list_suppliers).post(add_supplier),
    )
}
