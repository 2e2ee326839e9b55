//! Result normalization
//!
//! Maps whatever the AI collaborator returned into [`FurnitureAnalysis`].
//! Three input shapes exist and are told apart once, in
//! [`RawAnalysis::classify`]:
//!
//! - a JSON object already in the target schema
//! - a Flowise execution trace whose final text holds the JSON answer
//! - nothing usable, in which case the local fallback generator runs
//!
//! Normalization is a pure function of its inputs: the same raw response and
//! fallback seed always yield the same output.

use serde_json::{Map, Value};

use crate::error::AnalysisError;
use crate::models::{Difficulty, FurnitureAnalysis, MaterialEstimate, Priority};
use crate::services::fallback_analyzer;

const DEFAULT_STYLE: &str = "unspecified";
const DEFAULT_MATERIAL_CATEGORY: &str = "other";
const DEFAULT_UNIT: &str = "pieces";

/// AI collaborator response, by shape
#[derive(Debug, Clone, PartialEq)]
pub enum RawAnalysis {
    /// Object matching the schema directly
    Structured(Value),
    /// Multi-agent execution trace (or a bare text answer), as received.
    /// Only its final text is interpreted.
    Trace(Value),
    /// No response to work with
    Absent,
}

impl RawAnalysis {
    /// Decide which shape a response body has
    pub fn classify(value: Value) -> Result<Self, AnalysisError> {
        let trace_shaped = match &value {
            Value::Null => return Ok(RawAnalysis::Absent),
            Value::String(_) => true,
            Value::Object(obj) => is_trace(obj),
            other => {
                return Err(AnalysisError::Parse(format!(
                    "unexpected response shape: {}",
                    json_kind(other)
                )))
            }
        };

        Ok(if trace_shaped {
            RawAnalysis::Trace(value)
        } else {
            RawAnalysis::Structured(value)
        })
    }
}

fn is_trace(obj: &Map<String, Value>) -> bool {
    obj.contains_key("agentFlowExecutedData")
        || obj.get("text").map_or(false, Value::is_string)
        || obj.get("answer").map_or(false, Value::is_string)
}

/// Final answer of a trace: `text`, else `answer`, ignoring blank strings
pub fn trace_text(trace: &Value) -> Option<&str> {
    let candidates: Vec<&str> = match trace {
        Value::String(text) => vec![text.as_str()],
        Value::Object(obj) => ["text", "answer"]
            .iter()
            .filter_map(|key| obj.get(*key).and_then(Value::as_str))
            .collect(),
        _ => Vec::new(),
    };
    candidates.into_iter().find(|s| !s.trim().is_empty())
}

/// Where a normalized result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Structured,
    Trace,
    Fallback,
}

/// Design details the fallback generator works from
#[derive(Debug, Clone, Copy)]
pub struct FallbackInput<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub seed: u64,
}

/// Normalizer output: the schema plus the raw response to store with it
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnalysis {
    pub analysis: FurnitureAnalysis,
    pub raw_response: Value,
    pub source: AnalysisSource,
}

/// Normalize any response shape into the fixed schema
pub fn normalize(
    raw: &RawAnalysis,
    fallback: &FallbackInput<'_>,
) -> Result<NormalizedAnalysis, AnalysisError> {
    match raw {
        RawAnalysis::Structured(value) => Ok(NormalizedAnalysis {
            analysis: conform(value)?,
            raw_response: value.clone(),
            source: AnalysisSource::Structured,
        }),
        RawAnalysis::Trace(trace) => {
            let text = trace_text(trace).ok_or_else(|| {
                AnalysisError::Parse("execution trace has no final text".to_string())
            })?;
            let value = extract_json(text)?;
            Ok(NormalizedAnalysis {
                analysis: conform(&value)?,
                raw_response: trace.clone(),
                source: AnalysisSource::Trace,
            })
        }
        RawAnalysis::Absent => {
            let analysis =
                fallback_analyzer::generate(fallback.title, fallback.description, fallback.seed);
            let raw_response = serde_json::to_value(&analysis)
                .map_err(|e| AnalysisError::Parse(format!("fallback not serializable: {}", e)))?;
            Ok(NormalizedAnalysis {
                analysis,
                raw_response,
                source: AnalysisSource::Fallback,
            })
        }
    }
}

/// Pull the JSON object out of an agent's final answer.
///
/// Accepts the bare object, the object inside a markdown code fence, or the
/// outermost `{...}` span of surrounding prose.
pub fn extract_json(text: &str) -> Result<Value, AnalysisError> {
    let text = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(strip_code_fence(text)) {
        if value.is_object() {
            return Ok(value);
        }
    }

    // Outermost braces of the untouched text; fences and prose fall outside
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&text[start..=end])
            .map_err(|e| AnalysisError::Parse(format!("embedded JSON is invalid: {}", e))),
        _ => Err(AnalysisError::Parse(
            "response text contains no JSON object".to_string(),
        )),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // drop the info string (```json), on its own line or inline
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim()
}

/// Validate and coerce a schema object
fn conform(value: &Value) -> Result<FurnitureAnalysis, AnalysisError> {
    let obj = value.as_object().ok_or_else(|| {
        AnalysisError::Parse(format!("expected a JSON object, got {}", json_kind(value)))
    })?;

    let description = string_field(obj, &["description", "ai_description"]).unwrap_or_default();
    let style_category =
        string_field(obj, &["style_category"]).unwrap_or_else(|| DEFAULT_STYLE.to_string());

    let difficulty_level = match obj.get("difficulty_level") {
        Some(Value::String(s)) => parse_difficulty(s)?,
        Some(other) => {
            return Err(AnalysisError::Parse(format!(
                "difficulty_level must be a string, got {}",
                json_kind(other)
            )))
        }
        None => return Err(missing("difficulty_level")),
    };

    let estimated_time_hours = required_number(obj, "estimated_time_hours")?;
    if estimated_time_hours <= 0.0 {
        return Err(AnalysisError::Parse(format!(
            "estimated_time_hours must be positive, got {}",
            estimated_time_hours
        )));
    }

    let cost_a = required_number(obj, "estimated_cost_min")?.max(0.0);
    let cost_b = required_number(obj, "estimated_cost_max")?.max(0.0);
    let (estimated_cost_min, estimated_cost_max) = if cost_a <= cost_b {
        (cost_a, cost_b)
    } else {
        (cost_b, cost_a)
    };

    let materials = match obj.get("materials") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| conform_material(index, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(AnalysisError::Parse(format!(
                "materials must be a list, got {}",
                json_kind(other)
            )))
        }
    };

    Ok(FurnitureAnalysis {
        description,
        style_category,
        difficulty_level,
        estimated_time_hours,
        estimated_cost_min,
        estimated_cost_max,
        materials,
    })
}

fn conform_material(index: usize, value: &Value) -> Result<MaterialEstimate, AnalysisError> {
    let obj = value.as_object().ok_or_else(|| {
        AnalysisError::Parse(format!("material {} is {}, not an object", index, json_kind(value)))
    })?;

    let name = string_field(obj, &["name"])
        .ok_or_else(|| AnalysisError::Parse(format!("material {} has no name", index)))?;

    Ok(MaterialEstimate {
        name,
        category: string_field(obj, &["category"])
            .map(|c| c.to_lowercase())
            .unwrap_or_else(|| DEFAULT_MATERIAL_CATEGORY.to_string()),
        quantity: number_field(obj, &["quantity"])?.unwrap_or(0.0).max(0.0),
        unit: string_field(obj, &["unit"]).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        estimated_cost: number_field(obj, &["estimated_cost", "cost"])?
            .unwrap_or(0.0)
            .max(0.0),
        priority: string_field(obj, &["priority"])
            .and_then(|p| parse_priority(&p))
            .unwrap_or(Priority::Required),
        notes: string_field(obj, &["notes"]),
    })
}

/// Case-insensitive, with common synonyms
pub fn parse_difficulty(s: &str) -> Result<Difficulty, AnalysisError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "beginner" | "easy" | "basic" | "novice" => Ok(Difficulty::Beginner),
        "intermediate" | "medium" | "moderate" => Ok(Difficulty::Intermediate),
        "advanced" | "hard" | "expert" | "difficult" => Ok(Difficulty::Advanced),
        other => Err(AnalysisError::Parse(format!("unknown difficulty_level '{}'", other))),
    }
}

fn parse_priority(s: &str) -> Option<Priority> {
    match s.trim().to_ascii_lowercase().as_str() {
        "required" | "essential" => Some(Priority::Required),
        "optional" => Some(Priority::Optional),
        "alternative" => Some(Priority::Alternative),
        _ => None,
    }
}

/// First non-blank string among `keys`
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Value of the first present key among `keys`; numeric strings like
/// "R 1,200" count. A present value that is not a number is an error.
fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Result<Option<f64>, AnalysisError> {
    match keys.iter().find_map(|key| obj.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v))) {
        None => Ok(None),
        Some((key, value)) => as_number(value).map(Some).ok_or_else(|| {
            AnalysisError::Parse(format!("{} is not a number: {}", key, value))
        }),
    }
}

fn required_number(obj: &Map<String, Value>, key: &str) -> Result<f64, AnalysisError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(missing(key)),
        Some(value) => as_number(value).ok_or_else(|| {
            AnalysisError::Parse(format!("{} is not a number: {}", key, value))
        }),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_amount(s)?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Parse an amount such as `"1200"`, `"R 1,200.50"`, `"$15"` or `"1.5e3"`.
///
/// A leading currency code or symbol and comma thousands separators are
/// accepted; anything else left over rejects the whole string.
fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim();
    let number = s.trim_start_matches(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.')));
    let currency = s[..s.len() - number.len()].trim();
    if !is_currency_token(currency) {
        return None;
    }

    let (int_part, rest) = match number.find(|c: char| c == '.' || c == 'e' || c == 'E') {
        Some(split) => number.split_at(split),
        None => (number, ""),
    };
    if rest.contains(',') {
        return None;
    }

    let digits = int_part.trim_start_matches(|c| c == '-' || c == '+');
    if digits.contains(',') {
        let mut groups = digits.split(',');
        let first = groups.next()?;
        if first.is_empty() || first.len() > 3 || !groups.all(|g| g.len() == 3) {
            return None;
        }
    }

    let plain = format!("{}{}", int_part.replace(',', ""), rest);
    plain.parse::<f64>().ok()
}

fn is_currency_token(token: &str) -> bool {
    match token.chars().count() {
        0 => true,
        1 => matches!(token, "$" | "€" | "£" | "¥" | "₹" | "R"),
        _ => token.len() <= 3 && token.chars().all(|c| c.is_ascii_uppercase()),
    }
}

fn missing(field: &str) -> AnalysisError {
    AnalysisError::Parse(format!("missing required field '{}'", field))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
