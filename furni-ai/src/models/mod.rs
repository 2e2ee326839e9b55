//! Data models for furni-ai
//!
//! - Design lifecycle (pending, analyzing, completed, failed)
//! - Normalized analysis schema and its stored rows
//! - Supplier quotes for materials

pub mod analysis;
pub mod design;
pub mod supplier;
pub mod upload;

pub use analysis::{
    AnalysisPayload, AnalysisResult, Difficulty, FurnitureAnalysis, Material, MaterialEstimate,
    Priority,
};
pub use design::{Design, StatusTransition};
pub use furni_common::events::DesignStatus;
pub use supplier::{NewSupplierPrice, SupplierComparison, SupplierPrice, SupplierQuote};
pub use upload::ImageUpload;
