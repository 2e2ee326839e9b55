//! Local heuristic analyzer
//!
//! Used when no AI collaborator is configured or it produced no response.
//! Matches the design's title and description against a fixed furniture
//! vocabulary and scales the category's canned breakdown by a seeded random
//! variation, so repeated designs do not all get identical numbers while a
//! given seed always reproduces the same result.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Difficulty, FurnitureAnalysis, MaterialEstimate, Priority};

/// Style labels the generator picks from
pub const STYLE_CATEGORIES: &[&str] = &[
    "modern",
    "traditional",
    "rustic",
    "industrial",
    "scandinavian",
    "minimalist",
];

/// Category chosen when no keyword matches
pub const DEFAULT_CATEGORY: &str = "table";

const TIME_VARIATION: std::ops::Range<f64> = 0.85..1.15;
const COST_VARIATION: std::ops::Range<f64> = 0.8..1.2;

struct CannedMaterial {
    name: &'static str,
    category: &'static str,
    quantity: f64,
    unit: &'static str,
    cost: f64,
    priority: Priority,
    notes: &'static str,
}

/// One furniture category of the vocabulary
pub struct FurniturePattern {
    pub category: &'static str,
    pub keywords: &'static [&'static str],
    base_description: &'static str,
    difficulty: Difficulty,
    time_range: (f64, f64),
    cost_range: (f64, f64),
    materials: &'static [CannedMaterial],
}

/// Declaration order breaks ties
static PATTERNS: &[FurniturePattern] = &[
    FurniturePattern {
        category: "chair",
        keywords: &["chair", "seat", "backrest"],
        base_description: "Comfortable seating furniture",
        difficulty: Difficulty::Intermediate,
        time_range: (15.0, 25.0),
        cost_range: (800.0, 1500.0),
        materials: &[
            CannedMaterial { name: "Pine Wood Planks", category: "wood", quantity: 3.0, unit: "pieces", cost: 120.0, priority: Priority::Required, notes: "For seat and backrest" },
            CannedMaterial { name: "Wood Screws", category: "hardware", quantity: 20.0, unit: "pieces", cost: 25.0, priority: Priority::Required, notes: "50mm wood screws" },
            CannedMaterial { name: "Wood Glue", category: "adhesive", quantity: 1.0, unit: "bottle", cost: 35.0, priority: Priority::Required, notes: "PVA wood glue" },
            CannedMaterial { name: "Sandpaper Set", category: "tools", quantity: 1.0, unit: "set", cost: 45.0, priority: Priority::Required, notes: "120, 220 and 320 grit" },
            CannedMaterial { name: "Wood Stain", category: "finish", quantity: 1.0, unit: "liter", cost: 180.0, priority: Priority::Optional, notes: "Natural wood stain" },
        ],
    },
    FurniturePattern {
        category: "table",
        keywords: &["table", "desk", "surface"],
        base_description: "Functional table or desk furniture",
        difficulty: Difficulty::Intermediate,
        time_range: (20.0, 35.0),
        cost_range: (1200.0, 2500.0),
        materials: &[
            CannedMaterial { name: "Oak Wood Planks", category: "wood", quantity: 6.0, unit: "pieces", cost: 200.0, priority: Priority::Required, notes: "For tabletop and legs" },
            CannedMaterial { name: "Table Legs", category: "wood", quantity: 4.0, unit: "pieces", cost: 160.0, priority: Priority::Required, notes: "Pre-made or custom cut" },
            CannedMaterial { name: "Corner Brackets", category: "hardware", quantity: 8.0, unit: "pieces", cost: 80.0, priority: Priority::Required, notes: "Metal corner supports" },
            CannedMaterial { name: "Wood Screws", category: "hardware", quantity: 30.0, unit: "pieces", cost: 40.0, priority: Priority::Required, notes: "Various sizes" },
            CannedMaterial { name: "Polyurethane Finish", category: "finish", quantity: 1.0, unit: "liter", cost: 250.0, priority: Priority::Required, notes: "Protective coating" },
        ],
    },
    FurniturePattern {
        category: "cabinet",
        keywords: &["cabinet", "storage", "cupboard", "wardrobe"],
        base_description: "Storage cabinet or wardrobe",
        difficulty: Difficulty::Advanced,
        time_range: (40.0, 60.0),
        cost_range: (2000.0, 4000.0),
        materials: &[
            CannedMaterial { name: "MDF Boards", category: "wood", quantity: 8.0, unit: "pieces", cost: 320.0, priority: Priority::Required, notes: "18mm thick MDF" },
            CannedMaterial { name: "Cabinet Hinges", category: "hardware", quantity: 6.0, unit: "pieces", cost: 120.0, priority: Priority::Required, notes: "Soft-close hinges" },
            CannedMaterial { name: "Drawer Slides", category: "hardware", quantity: 4.0, unit: "pairs", cost: 200.0, priority: Priority::Optional, notes: "Full extension slides" },
            CannedMaterial { name: "Cabinet Handles", category: "hardware", quantity: 8.0, unit: "pieces", cost: 160.0, priority: Priority::Required, notes: "Brushed steel" },
            CannedMaterial { name: "Edge Banding", category: "finish", quantity: 10.0, unit: "meters", cost: 80.0, priority: Priority::Required, notes: "Matching wood veneer" },
        ],
    },
    FurniturePattern {
        category: "shelf",
        keywords: &["shelf", "bookshelf", "shelving"],
        base_description: "Wall-mounted or standing shelf unit",
        difficulty: Difficulty::Beginner,
        time_range: (8.0, 15.0),
        cost_range: (400.0, 800.0),
        materials: &[
            CannedMaterial { name: "Pine Shelving Boards", category: "wood", quantity: 4.0, unit: "pieces", cost: 120.0, priority: Priority::Required, notes: "200mm x 25mm planks" },
            CannedMaterial { name: "Shelf Brackets", category: "hardware", quantity: 8.0, unit: "pieces", cost: 80.0, priority: Priority::Required, notes: "Heavy-duty metal brackets" },
            CannedMaterial { name: "Wall Anchors", category: "hardware", quantity: 16.0, unit: "pieces", cost: 30.0, priority: Priority::Required, notes: "For hollow wall mounting" },
            CannedMaterial { name: "Wood Screws", category: "hardware", quantity: 20.0, unit: "pieces", cost: 25.0, priority: Priority::Required, notes: "40mm screws" },
        ],
    },
];

/// Best keyword-overlap match for the combined title and description
pub fn match_pattern(title: &str, description: Option<&str>) -> &'static FurniturePattern {
    let text = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();

    let mut best = PATTERNS
        .iter()
        .find(|p| p.category == DEFAULT_CATEGORY)
        .unwrap_or(&PATTERNS[0]);
    let mut best_matches = 0;

    for pattern in PATTERNS {
        let matches = pattern
            .keywords
            .iter()
            .filter(|keyword| text.contains(*keyword))
            .count();
        // Strictly greater: earlier declarations win ties
        if matches > best_matches {
            best_matches = matches;
            best = pattern;
        }
    }

    best
}

/// Produce a plausible breakdown for a design without the AI collaborator
pub fn generate(title: &str, description: Option<&str>, seed: u64) -> FurnitureAnalysis {
    let pattern = match_pattern(title, description);
    let mut rng = StdRng::seed_from_u64(seed);

    let time_variation = rng.gen_range(TIME_VARIATION);
    let cost_variation = rng.gen_range(COST_VARIATION);
    let style = STYLE_CATEGORIES[rng.gen_range(0..STYLE_CATEGORIES.len())];

    let (time_low, time_high) = pattern.time_range;
    let (cost_low, cost_high) = pattern.cost_range;

    tracing::debug!(
        category = pattern.category,
        seed,
        time_variation,
        cost_variation,
        "Generated fallback analysis"
    );

    FurnitureAnalysis {
        description: format!(
            "{} with custom design elements. Combines everyday function with a clean look and suits most home interiors.",
            pattern.base_description
        ),
        style_category: style.to_string(),
        difficulty_level: pattern.difficulty,
        estimated_time_hours: ((time_low + time_high) / 2.0 * time_variation).round().max(1.0),
        estimated_cost_min: (cost_low * cost_variation).round(),
        estimated_cost_max: (cost_high * cost_variation).round(),
        materials: pattern
            .materials
            .iter()
            .map(|m| MaterialEstimate {
                name: m.name.to_string(),
                category: m.category.to_string(),
                quantity: m.quantity,
                unit: m.unit.to_string(),
                estimated_cost: (m.cost * cost_variation).round(),
                priority: m.priority,
                notes: Some(m.notes.to_string()),
            })
            .collect(),
    }
}
