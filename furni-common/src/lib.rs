//! # FurniCraft Common Library
//!
//! Shared code for the FurniCraft crates:
//! - Error and result types
//! - Configuration loading and root folder resolution
//! - Event types (FurniEvent) and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
