//! Analysis schema: the normalized breakdown and its stored rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Build difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = furni_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(furni_common::Error::Corrupt(format!("unknown difficulty '{}'", other))),
        }
    }
}

/// Material priority; declaration order is display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Required,
    Optional,
    Alternative,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Required => "required",
            Priority::Optional => "optional",
            Priority::Alternative => "alternative",
        }
    }

    /// Sort key used by the materials query
    pub fn rank(&self) -> i64 {
        match self {
            Priority::Required => 0,
            Priority::Optional => 1,
            Priority::Alternative => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = furni_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "required" => Ok(Priority::Required),
            "optional" => Ok(Priority::Optional),
            "alternative" => Ok(Priority::Alternative),
            other => Err(furni_common::Error::Corrupt(format!("unknown priority '{}'", other))),
        }
    }
}

/// Normalized cost/material breakdown
///
/// Produced by the result normalizer from either the AI collaborator or the
/// fallback generator. Guarantees: costs non-negative with min <= max, time
/// positive, every material has a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureAnalysis {
    pub description: String,
    pub style_category: String,
    pub difficulty_level: Difficulty,
    pub estimated_time_hours: f64,
    pub estimated_cost_min: f64,
    pub estimated_cost_max: f64,
    pub materials: Vec<MaterialEstimate>,
}

/// One material line before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialEstimate {
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub estimated_cost: f64,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Stored analysis row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub design_id: Uuid,
    pub ai_description: String,
    pub estimated_cost_min: f64,
    pub estimated_cost_max: f64,
    pub difficulty_level: Difficulty,
    pub estimated_time_hours: f64,
    pub style_category: String,
    /// Response as received, for optional display
    pub raw_ai_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Stored material row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub estimated_cost: f64,
    pub priority: Priority,
    pub notes: Option<String>,
}

/// Analysis plus its materials, ordered by priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub analysis: AnalysisResult,
    pub materials: Vec<Material>,
}

impl AnalysisPayload {
    /// Sum of all required material costs
    pub fn required_materials_cost(&self) -> f64 {
        self.materials
            .iter()
            .filter(|m| m.priority == Priority::Required)
            .map(|m| m.estimated_cost)
            .sum()
    }
}
