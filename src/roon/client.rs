//! Roon Core gateway HTTP client
//!
//! Talks to the Core's extension gateway: registration (pairing),
//! cursor-based browse/load, and the image endpoint. Only the subset of
//! the service surface the importer reads is implemented.
//!
//! The pairing token is persisted to disk the first time the Core issues
//! one, so later runs reconnect without re-approval.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{dto, BrowseItem, ConnectionStatus, LibraryBrowseApi, RoonError, ALBUMS_HIERARCHY};

/// Extension identity shown in Roon > Settings > Extensions.
const EXTENSION_ID: &str = "musicshelf";
const DISPLAY_NAME: &str = "Musicshelf Importer";
const PUBLISHER: &str = "musicshelf";
const EMAIL: &str = "noreply@musicshelf";

/// Roon gateway client. Cheap to clone; clones share the session token.
#[derive(Clone)]
pub struct RoonClient {
    http_client: reqwest::Client,
    base_url: String,
    token_path: PathBuf,
    token: Arc<Mutex<Option<String>>>,
}

impl RoonClient {
    /// Create a client for the Core at host:port, loading any previously
    /// persisted pairing token.
    pub fn new(host: &str, port: u16, token_path: PathBuf) -> Self {
        let token = load_token(&token_path);
        Self {
            http_client: reqwest::Client::new(),
            base_url: format!("http://{}:{}/api", host, port),
            token_path,
            token: Arc::new(Mutex::new(token)),
        }
    }

    /// Create a client for testing with a custom base URL.
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>, token_path: PathBuf) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            token_path,
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Register with the Core and report connection state.
    ///
    /// Registration doubles as the status poll: the Core answers with its
    /// name once the handshake is up, and with a token once the user has
    /// approved the extension. A newly issued token is persisted.
    pub async fn status(&self) -> ConnectionStatus {
        match self.register().await {
            Ok(response) => {
                let connected = response.core_name.is_some();
                if connected && let Some(token) = &response.token {
                    self.store_token(token);
                }
                let authorized = connected && self.token.lock().is_some();
                ConnectionStatus {
                    connected,
                    authorized,
                    core_name: response.core_name,
                }
            }
            Err(e) => {
                tracing::debug!("Roon status poll failed: {}", e);
                ConnectionStatus::default()
            }
        }
    }

    async fn register(&self) -> Result<dto::RegisterResponse, RoonError> {
        let request = dto::RegisterRequest {
            extension_id: EXTENSION_ID.to_string(),
            display_name: DISPLAY_NAME.to_string(),
            display_version: env!("CARGO_PKG_VERSION").to_string(),
            publisher: PUBLISHER.to_string(),
            email: EMAIL.to_string(),
            token: self.token.lock().clone(),
        };

        self.post_json("register", &request).await
    }

    fn store_token(&self, token: &str) {
        let mut current = self.token.lock();
        if current.as_deref() == Some(token) {
            return;
        }
        *current = Some(token.to_string());
        drop(current);

        if let Some(parent) = self.token_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let body = serde_json::json!({ "token": token }).to_string();
        if let Err(e) = std::fs::write(&self.token_path, body) {
            tracing::warn!("failed to persist Roon token: {}", e);
        }
    }

    async fn browse(&self, request: &dto::BrowseRequest) -> Result<dto::BrowseResponse, RoonError> {
        self.post_json("browse", request).await
    }

    async fn post_json<Req, Resp>(&self, endpoint: &str, request: &Req) -> Result<Resp, RoonError>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| RoonError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoonError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| RoonError::Parse(e.to_string()))
    }
}

fn load_token(path: &PathBuf) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let parsed: serde_json::Value = serde_json::from_str(&contents).ok()?;
    parsed
        .get("token")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
}

#[async_trait]
impl LibraryBrowseApi for RoonClient {
    async fn reset_to_root(&self) -> Result<u64, RoonError> {
        let response = self
            .browse(&dto::BrowseRequest {
                hierarchy: ALBUMS_HIERARCHY.to_string(),
                item_key: None,
                pop_all: Some(true),
            })
            .await?;
        Ok(response.list.and_then(|l| l.count).unwrap_or(0))
    }

    async fn open_item(&self, item_key: &str) -> Result<(), RoonError> {
        self.browse(&dto::BrowseRequest {
            hierarchy: ALBUMS_HIERARCHY.to_string(),
            item_key: Some(item_key.to_string()),
            pop_all: None,
        })
        .await?;
        Ok(())
    }

    async fn load_page(&self, offset: u32, count: u32) -> Result<Vec<BrowseItem>, RoonError> {
        let request = dto::LoadRequest {
            hierarchy: ALBUMS_HIERARCHY.to_string(),
            offset,
            count,
        };
        let response: dto::LoadResponse = self.post_json("load", &request).await?;
        Ok(response.items.into_iter().map(BrowseItem::from_dto).collect())
    }

    async fn fetch_image(&self, image_key: &str) -> Result<Option<Vec<u8>>, RoonError> {
        let url = format!(
            "{}/image/{}?scale=fit&width=600&height=600",
            self.base_url, image_key
        );
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| RoonError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RoonError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RoonError::Network(e.to_string()))?;

        if bytes.is_empty() {
            tracing::debug!("Roon image endpoint returned empty body for key {}", image_key);
            return Ok(None);
        }
        Ok(Some(bytes.to_vec()))
    }
}
