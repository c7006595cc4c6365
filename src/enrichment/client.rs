//! Claude Messages API client for album credits.
//!
//! The request forces a tool call whose input schema is the credits
//! shape, so the response is machine-readable without prose parsing. The
//! system prompt makes the accuracy contract explicit: an empty result is
//! always acceptable, an invented credit never is. Known entity names
//! from the catalog are passed along so the model can normalise spelling
//! to match existing records (preventing "Phil Collen" and "Philip
//! Collen" becoming two separate rows for the same person).

use super::domain::{AlbumFacts, EnrichmentError};
use super::dto;
use crate::model::{DetailEntry, MusicianCredit, StaffCredit};

/// Name of the forced tool; the response block is matched against this.
const TOOL_NAME: &str = "album_credits";

/// Cap on how many known names of each kind are included in the prompt.
const KNOWN_NAMES_LIMIT: usize = 200;

const API_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are a precise music database assistant. Your only job is to return \
    verified album credits. Never fabricate, infer, or guess data. \
    If you are not certain a fact appears in the album's official liner notes \
    or is documented from a highly reliable source, omit it entirely. \
    Returning an empty array is always correct; returning wrong data is never acceptable.";

/// Everything the client needs to ask about one album.
#[derive(Debug, Clone, Default)]
pub struct CreditsRequest {
    pub title: String,
    pub artist: String,
    pub release_year: Option<i64>,
    /// Existing catalog names, passed as spelling hints
    pub known_musicians: Vec<String>,
    pub known_persons: Vec<String>,
    pub known_details: Vec<String>,
}

/// Claude Messages API client
pub struct CreditsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CreditsClient {
    /// Create a new client with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
        }
    }

    /// Ask the model for credits. Returns None when the response carries
    /// no usable tool output.
    pub async fn fetch_credits(
        &self,
        request: &CreditsRequest,
    ) -> Result<Option<AlbumFacts>, EnrichmentError> {
        if self.api_key.is_empty() {
            return Err(EnrichmentError::MissingApiKey);
        }

        let body = dto::MessagesRequest {
            model: self.model.clone(),
            max_tokens: 2048,
            system: SYSTEM_PROMPT.to_string(),
            tools: vec![credits_tool()],
            tool_choice: dto::ToolChoice {
                choice_type: "tool".to_string(),
                name: TOOL_NAME.to_string(),
            },
            messages: vec![dto::Message {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EnrichmentError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(envelope) = serde_json::from_str::<dto::ApiErrorResponse>(&text) {
                return Err(EnrichmentError::Api(envelope.error.message));
            }
            return Err(EnrichmentError::Api(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let parsed: dto::MessagesResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        // With tool_choice forced there should be exactly one tool_use
        // block; validate its input against the payload schema right here
        let Some(input) = parsed
            .content
            .iter()
            .find(|block| block.block_type == "tool_use" && block.name.as_deref() == Some(TOOL_NAME))
            .and_then(|block| block.input.clone())
        else {
            return Ok(None);
        };

        let payload: dto::CreditsPayload =
            serde_json::from_value(input).map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        Ok(Some(to_facts(payload)))
    }
}

/// The forced tool definition with the credits input schema.
fn credits_tool() -> dto::Tool {
    dto::Tool {
        name: TOOL_NAME.to_string(),
        description: "Structured album credits and metadata".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "producer": {
                    "type": "string",
                    "description": "Main album producer name, or empty string if unknown",
                },
                "musicians": {
                    "type": "array",
                    "description": "List of musicians who performed on the album",
                    "items": {
                        "type": "object",
                        "properties": {
                            "musician_name": {"type": "string"},
                            "instrument": {"type": "string"},
                        },
                        "required": ["musician_name", "instrument"],
                    },
                },
                "personnel": {
                    "type": "array",
                    "description": "Production/technical personnel on the album",
                    "items": {
                        "type": "object",
                        "properties": {
                            "person_name": {"type": "string"},
                            "role": {"type": "string"},
                        },
                        "required": ["person_name", "role"],
                    },
                },
                "other_details": {
                    "type": "array",
                    "description": "Additional album details such as studios. \
                        Do NOT include chart positions — these are frequently inaccurate.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "detail_name": {
                                "type": "string",
                                "description": "The value, e.g. 'Abbey Road Studios' or 'Sterling Sound'",
                            },
                            "detail_type": {
                                "type": "string",
                                "description": "Category, e.g. 'Recording Studio' or 'Mastering Studio'",
                            },
                        },
                        "required": ["detail_name", "detail_type"],
                    },
                },
            },
            "required": ["producer", "musicians", "personnel", "other_details"],
        }),
    }
}

/// Build the user prompt for one album.
fn build_prompt(request: &CreditsRequest) -> String {
    let year_str = request
        .release_year
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();

    let mut lines = vec![
        format!(
            "Provide accurate credits for the album \"{}\" by {}{}.",
            request.title, request.artist, year_str
        ),
        String::new(),
        "For musicians: list every performer and their instrument(s).".to_string(),
        "For personnel: include roles such as Producer, Engineer, Assistant Engineer, \
         Recording Engineer, Mix Engineer, Mastering Engineer, Assistant Producer, \
         and any other credited roles."
            .to_string(),
        "For other_details: include Recording Studio and Mastering Studio/Company only. \
         Do NOT include chart positions (UK, US, or any other) — they are hard to verify \
         and frequently wrong."
            .to_string(),
        String::new(),
        "ACCURACY IS CRITICAL. Only return data you are certain of from the album's \
         liner notes or well-documented sources. It is far better to return an empty \
         array than to include a single incorrect entry. Do not guess or infer."
            .to_string(),
        String::new(),
    ];

    let mut push_known = |label: &str, names: &[String]| {
        if !names.is_empty() {
            let shown: Vec<&str> = names
                .iter()
                .take(KNOWN_NAMES_LIMIT)
                .map(|s| s.as_str())
                .collect();
            lines.push(format!(
                "Known {} already in the database (use the exact spelling if you \
                 identify the same {}): {}",
                label,
                if label == "detail values" { "value" } else { "person" },
                shown.join(", ")
            ));
        }
    };

    push_known("musicians", &request.known_musicians);
    push_known("personnel", &request.known_persons);
    push_known("detail values", &request.known_details);

    lines.join("\n")
}

/// Convert the validated payload to domain facts, dropping blank entries.
fn to_facts(payload: dto::CreditsPayload) -> AlbumFacts {
    AlbumFacts {
        producer: Some(payload.producer.trim().to_string()).filter(|p| !p.is_empty()),
        musicians: payload
            .musicians
            .into_iter()
            .filter(|m| !m.musician_name.trim().is_empty())
            .map(|m| MusicianCredit {
                name: m.musician_name.trim().to_string(),
                instrument: m.instrument.trim().to_string(),
            })
            .collect(),
        personnel: payload
            .personnel
            .into_iter()
            .filter(|p| !p.person_name.trim().is_empty())
            .map(|p| StaffCredit {
                name: p.person_name.trim().to_string(),
                role: p.role.trim().to_string(),
            })
            .collect(),
        other_details: payload
            .other_details
            .into_iter()
            .filter(|d| !d.detail_name.trim().is_empty())
            .map(|d| DetailEntry {
                value: d.detail_name.trim().to_string(),
                detail_type: d.detail_type.trim().to_string(),
            })
            .collect(),
    }
}
