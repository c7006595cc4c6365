//! Roon API gateway Data Transfer Objects
//!
//! These types match the JSON exchanged with the Roon Core's extension
//! gateway for the registration, browse, load, and image endpoints - the
//! subset of the service surface the importer reads.
//! DO NOT use these types outside the roon module - convert to domain types.

use serde::{Deserialize, Serialize};

/// Extension registration request
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub extension_id: String,
    pub display_name: String,
    pub display_version: String,
    pub publisher: String,
    pub email: String,
    /// Previously issued pairing token, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Extension registration / status response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterResponse {
    /// Set once the handshake with the Core has completed
    pub core_name: Option<String>,
    /// Set once the user has approved the extension in Roon
    pub token: Option<String>,
}

/// Browse request (cursor navigation)
#[derive(Debug, Clone, Serialize)]
pub struct BrowseRequest {
    pub hierarchy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pop_all: Option<bool>,
}

/// Browse response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowseResponse {
    pub list: Option<BrowseList>,
}

/// The list the browse cursor currently points at
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowseList {
    /// Service-reported item count (can disagree with what load returns)
    pub count: Option<u64>,
}

/// Load request (one page at the current cursor)
#[derive(Debug, Clone, Serialize)]
pub struct LoadRequest {
    pub hierarchy: String,
    pub offset: u32,
    pub count: u32,
}

/// Load response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoadResponse {
    #[serde(default)]
    pub items: Vec<Item>,
}

/// One browse item (an album, a track row, or an action entry)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Item {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub item_key: Option<String>,
    pub image_key: Option<String>,
}

// ============================================================================
// CONTRACT TESTS
// ============================================================================

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[test]
    fn test_parse_register_response() {
        let json = r#"{"core_name": "Living Room", "token": "abc-123"}"#;
        let response: RegisterResponse = serde_json::from_str(json).expect("Should parse");
        assert_eq!(response.core_name.as_deref(), Some("Living Room"));
        assert_eq!(response.token.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_parse_unpaired_register_response() {
        let json = r#"{"core_name": "Living Room", "token": null}"#;
        let response: RegisterResponse = serde_json::from_str(json).expect("Should parse");
        assert!(response.token.is_none());
    }

    #[test]
    fn test_parse_load_response_with_action_item() {
        let json = r#"{"items": [
            {"title": "Play Album", "item_key": null, "image_key": null},
            {"title": "IV", "subtitle": "Led Zeppelin", "item_key": "k1", "image_key": "img1"}
        ]}"#;
        let response: LoadResponse = serde_json::from_str(json).expect("Should parse");
        assert_eq!(response.items.len(), 2);
        assert!(response.items[0].item_key.is_none());
        assert_eq!(response.items[1].subtitle.as_deref(), Some("Led Zeppelin"));
    }

    #[test]
    fn test_browse_request_omits_empty_fields() {
        let request = BrowseRequest {
            hierarchy: "albums".to_string(),
            item_key: None,
            pop_all: Some(true),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("item_key"));
        assert!(json.contains("pop_all"));
    }
}
