//! Flowise prediction API client
//!
//! Sends one image plus the analysis prompt to a Flowise chatflow and hands
//! the JSON answer, as received, to the result normalizer. The request type
//! also backs the CORS proxy route.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::AnalysisError;
use crate::services::result_normalizer::RawAnalysis;
use crate::types::{AnalysisRequest, AnalysisService};

const USER_AGENT: &str = concat!("FurniCraft/", env!("CARGO_PKG_VERSION"));

/// Prompt asking the agents for the exact schema the normalizer expects
pub const DEFAULT_QUESTION: &str = r#"Analyze this furniture piece and identify all components with materials and sourcing information. Give costs in South African Rand (ZAR), name local suppliers where possible, and be specific about wood types, hardware and finishing materials.

Your response must be a valid JSON object with this exact structure:
{
  "description": "Detailed description of the furniture piece",
  "style_category": "modern/traditional/rustic/industrial/etc",
  "difficulty_level": "beginner/intermediate/advanced",
  "estimated_time_hours": number,
  "estimated_cost_min": number,
  "estimated_cost_max": number,
  "materials": [
    {
      "name": "material name",
      "category": "wood/hardware/upholstery/finish/etc",
      "quantity": number,
      "unit": "pieces/meters/liters/etc",
      "estimated_cost": number,
      "priority": "required/optional/alternative",
      "notes": "specific details or alternatives"
    }
  ]
}"#;

/// One uploaded file in a prediction request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowiseUpload {
    /// `data:<mime>;base64,...`
    pub data: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub name: String,
}

/// Prediction request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowiseRequest {
    pub question: String,
    pub uploads: Vec<FlowiseUpload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub streaming: bool,
}

impl FlowiseRequest {
    pub fn for_image(question: impl Into<String>, upload: FlowiseUpload) -> Self {
        Self {
            question: question.into(),
            uploads: vec![upload],
            chat_id: None,
            streaming: false,
        }
    }

    /// Check a client-supplied request before forwarding it.
    ///
    /// Requires a question and at least one upload carrying data, type and
    /// name. Bare base64 payloads get the `data:` URL prefix Flowise expects.
    /// Streaming is always switched off.
    pub fn prepare_for_forwarding(&mut self) -> Result<(), AnalysisError> {
        if self.question.trim().is_empty() {
            return Err(AnalysisError::Validation("Question is required".to_string()));
        }
        if self.uploads.is_empty() {
            return Err(AnalysisError::Validation(
                "At least one upload is required".to_string(),
            ));
        }

        for upload in &mut self.uploads {
            if upload.data.is_empty() || upload.mime_type.is_empty() || upload.name.is_empty() {
                return Err(AnalysisError::Validation(
                    "Each upload must have data, type, and name properties".to_string(),
                ));
            }
            if !upload.data.starts_with("data:") {
                tracing::debug!(name = %upload.name, "Adding data URL prefix to upload");
                upload.data = format!("data:{};base64,{}", upload.mime_type, upload.data);
            }
        }

        self.streaming = false;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowiseTimeMetadata {
    pub start: f64,
    pub end: f64,
    pub delta: f64,
}

/// Token usage of one agent node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowiseUsageMetadata {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowiseAgentOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_metadata: Option<FlowiseTimeMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<FlowiseUsageMetadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowiseAgentData {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub input: Value,
    pub output: FlowiseAgentOutput,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One agent step of the execution trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowiseExecutionNode {
    pub node_id: String,
    pub node_label: String,
    pub data: FlowiseAgentData,
    pub previous_node_ids: Vec<String>,
    pub status: String,
}

/// Statistics over an execution trace, for logging.
///
/// Best effort: nodes whose metadata does not fit the typed view are counted
/// but contribute no tokens or timings. The trace itself is stored untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceSummary {
    pub agent_nodes: usize,
    pub total_tokens: u64,
    /// Wall time of the slowest agent node, in milliseconds
    pub slowest_node_ms: Option<f64>,
}

impl TraceSummary {
    pub fn from_trace(trace: &Value) -> Self {
        let nodes = trace
            .get("agentFlowExecutedData")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let typed: Vec<FlowiseExecutionNode> = nodes
            .iter()
            .filter_map(|node| serde_json::from_value(node.clone()).ok())
            .collect();

        Self {
            agent_nodes: nodes.len(),
            total_tokens: typed
                .iter()
                .filter_map(|node| node.data.output.usage_metadata.as_ref())
                .map(|usage| usage.total_tokens)
                .sum(),
            slowest_node_ms: typed
                .iter()
                .filter_map(|node| node.data.output.time_metadata.as_ref())
                .map(|t| t.delta)
                .reduce(f64::max),
        }
    }
}

/// Flowise prediction client
pub struct FlowiseClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl FlowiseClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// POST a prediction request and return the JSON body as received
    ///
    /// Non-2xx responses become `AnalysisError::Service` carrying the
    /// upstream status and body text.
    pub async fn predict(&self, request: &FlowiseRequest) -> Result<Value, AnalysisError> {
        tracing::debug!(
            url = %self.api_url,
            uploads = request.uploads.len(),
            question_chars = request.question.len(),
            "Sending prediction request to Flowise"
        );

        let mut builder = self.http_client.post(&self.api_url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Flowise responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Flowise API error");
            return Err(AnalysisError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| AnalysisError::Parse(format!("Flowise body is not JSON: {}", e)))
    }
}

#[async_trait::async_trait]
impl AnalysisService for FlowiseClient {
    fn name(&self) -> &str {
        "flowise"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<RawAnalysis, AnalysisError> {
        let body = FlowiseRequest::for_image(
            request.question.clone(),
            FlowiseUpload {
                data: request.image_data_url.clone(),
                mime_type: request.image_mime.clone(),
                name: request.image_name.clone(),
            },
        );

        let value = self.predict(&body).await?;
        let raw = RawAnalysis::classify(value)?;

        if let RawAnalysis::Trace(trace) = &raw {
            let summary = TraceSummary::from_trace(trace);
            tracing::info!(
                design_id = %request.design_id,
                agent_nodes = summary.agent_nodes,
                total_tokens = summary.total_tokens,
                slowest_node_ms = ?summary.slowest_node_ms,
                "Flowise execution trace received"
            );
        }

        Ok(raw)
    }
}
