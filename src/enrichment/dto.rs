//! Anthropic Messages API Data Transfer Objects
//!
//! These types match the request/response shapes of the Messages API
//! with forced tool use, which is how we get structured output.
//! DO NOT use these types outside the enrichment module - convert to
//! domain types immediately after receipt.
//!
//! API Reference: https://docs.anthropic.com/en/api/messages

use serde::{Deserialize, Serialize};

/// Messages API request
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
    pub messages: Vec<Message>,
}

/// A tool definition with a JSON Schema for its input
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Forced tool choice - the response always contains this tool's input
#[derive(Debug, Clone, Serialize)]
pub struct ToolChoice {
    #[serde(rename = "type")]
    pub choice_type: String,
    pub name: String,
}

/// A chat message
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Messages API response
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// One response content block; tool_use blocks carry the structured input
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub name: Option<String>,
    pub input: Option<serde_json::Value>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// The forced tool's payload
// ---------------------------------------------------------------------------

/// Structured album credits, as demanded by the tool schema.
///
/// Deserializing the tool input into this type is the schema validation
/// step: anything that doesn't fit is a parse error at the boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreditsPayload {
    #[serde(default)]
    pub producer: String,
    #[serde(default)]
    pub musicians: Vec<MusicianEntry>,
    #[serde(default)]
    pub personnel: Vec<PersonnelEntry>,
    #[serde(default)]
    pub other_details: Vec<OtherDetailEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MusicianEntry {
    pub musician_name: String,
    pub instrument: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonnelEntry {
    pub person_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtherDetailEntry {
    pub detail_name: String,
    pub detail_type: String,
}

// ============================================================================
// CONTRACT TESTS
// ============================================================================
