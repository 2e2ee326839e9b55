//! Supplier quotes for materials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One supplier's price for one material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierPrice {
    pub id: Uuid,
    pub material_id: Uuid,
    pub supplier_name: String,
    pub price: f64,
    pub location: Option<String>,
    /// 0.0 - 5.0
    pub quality_rating: Option<f64>,
    pub delivery_time_days: Option<i64>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// POST body for a new quote
#[derive(Debug, Clone, Deserialize)]
pub struct NewSupplierPrice {
    pub supplier_name: String,
    pub price: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub quality_rating: Option<f64>,
    #[serde(default)]
    pub delivery_time_days: Option<i64>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// A quote annotated for comparison display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierQuote {
    #[serde(flatten)]
    pub price: SupplierPrice,
    pub is_best_price: bool,
}

/// All quotes for a material, cheapest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierComparison {
    pub material_id: Uuid,
    pub quotes: Vec<SupplierQuote>,
    /// Lowest price among in-stock quotes
    pub best_price: Option<f64>,
    /// Difference between the highest and lowest in-stock price
    pub potential_savings: f64,
}
