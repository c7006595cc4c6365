//! Roon Core connection management and library browsing.
//!
//! The Core's browse API is stateful and cursor-based: `browse` moves a
//! cursor (optionally popping to the hierarchy root), `load` reads a page
//! of items at the cursor. Because the cursor is shared, every drill-down
//! must reset to the albums root first or subsequent navigation reads the
//! wrong level.
//!
//! Pairing flow (one-time per Roon Core):
//! 1. [`RoonManager::connect`] - starts talking to the Core
//! 2. User opens Roon > Settings > Extensions and clicks Enable
//! 3. The Core issues an auth token; status reports `authorized: true`
//! 4. The token is saved to disk for future runs (no re-pairing needed)
//!
//! Connection state is tracked separately from import-job state: a cached
//! token alone is not "authorized" until a handshake has confirmed the
//! Core is actually reachable.

pub mod client;
pub mod dto;

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;

pub use client::RoonClient;

/// Hierarchy the importer browses.
pub const ALBUMS_HIERARCHY: &str = "albums";

/// Errors from the Roon gateway.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoonError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Not connected to Roon Core")]
    NotConnected,

    #[error("Roon Core not yet authorized — approve the extension in Roon > Settings > Extensions")]
    NotAuthorized,
}

/// Connection/authorization state, polled by the UI while pairing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionStatus {
    /// The handshake with the Core has completed
    pub connected: bool,
    /// Connected and holding a valid auth token
    pub authorized: bool,
    pub core_name: Option<String>,
}

/// One item from a browse listing (an album, a track row, or a non-album
/// action entry such as "Play Album").
#[derive(Debug, Clone, Default)]
pub struct BrowseItem {
    pub title: String,
    pub subtitle: String,
    /// Drill-down key; action entries have none
    pub item_key: Option<String>,
    pub image_key: Option<String>,
}

impl BrowseItem {
    fn from_dto(item: dto::Item) -> Self {
        Self {
            title: item.title.unwrap_or_default().trim().to_string(),
            subtitle: item.subtitle.unwrap_or_default().trim().to_string(),
            item_key: item.item_key.filter(|k| !k.is_empty()),
            image_key: item.image_key.filter(|k| !k.is_empty()),
        }
    }
}

/// Trait for the library browse operations the importer needs.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait LibraryBrowseApi: Send + Sync {
    /// Pop the browse cursor back to the albums root.
    ///
    /// Returns the service-reported album count (informational only; the
    /// importer counts what it actually enumerates).
    async fn reset_to_root(&self) -> Result<u64, RoonError>;

    /// Move the cursor into an item (an album's track listing).
    async fn open_item(&self, item_key: &str) -> Result<(), RoonError>;

    /// Load one page of items at the current cursor position.
    async fn load_page(&self, offset: u32, count: u32) -> Result<Vec<BrowseItem>, RoonError>;

    /// Fetch an image by key via the Core's image endpoint.
    ///
    /// `Ok(None)` means the Core had nothing usable for the key.
    async fn fetch_image(&self, image_key: &str) -> Result<Option<Vec<u8>>, RoonError>;
}

/// Extract the track title from an album-detail row ("7. Going to
/// California" -> "Going to California"). Non-track rows return None.
pub fn parse_track_title(row_title: &str) -> Option<String> {
    static TRACK_RE: OnceLock<Regex> = OnceLock::new();
    let re = TRACK_RE.get_or_init(|| Regex::new(r"^\d+\.\s+(.+)$").expect("valid regex"));
    re.captures(row_title)
        .map(|caps| caps.get(1).expect("capture group").as_str().to_string())
}

/// Track titles from a page of album-detail rows.
pub fn parse_tracks(items: &[BrowseItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| parse_track_title(&item.title))
        .collect()
}

/// Raw browse output for the first albums in the library. Diagnostic aid
/// for reviewing the available fields before a full import.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub reported_total: u64,
    pub albums: Vec<BrowseItem>,
    pub first_album_tracks: Vec<String>,
}

/// Browse the library and return raw data for the first `count` albums.
pub async fn probe(api: &dyn LibraryBrowseApi, count: u32) -> Result<ProbeReport, RoonError> {
    let reported_total = api.reset_to_root().await?;
    let albums = api.load_page(0, count).await?;

    let mut first_album_tracks = Vec::new();
    if let Some(key) = albums.iter().find_map(|a| a.item_key.clone()) {
        api.open_item(&key).await?;
        let rows = api.load_page(0, 50).await?;
        first_album_tracks = parse_tracks(&rows);
    }

    Ok(ProbeReport {
        reported_total,
        albums,
        first_album_tracks,
    })
}

/// Owns the (at most one) live connection to a Roon Core.
///
/// `connect` replaces any previous connection; the client handed out is a
/// cheap clone sharing the same session.
pub struct RoonManager {
    token_path: PathBuf,
    client: Mutex<Option<RoonClient>>,
}

impl RoonManager {
    pub fn new(token_path: PathBuf) -> Self {
        Self {
            token_path,
            client: Mutex::new(None),
        }
    }

    /// Start a connection attempt to the Core. Non-blocking: pairing
    /// completes in the background; poll [`status`] until authorized.
    ///
    /// [`status`]: RoonManager::status
    pub fn connect(&self, host: &str, port: u16) {
        let client = RoonClient::new(host, port, self.token_path.clone());
        *self.client.lock() = Some(client);
        tracing::info!("Roon connection initiated to {}:{}", host, port);
    }

    /// The current client, if a connection was started.
    pub fn client(&self) -> Option<RoonClient> {
        self.client.lock().clone()
    }

    /// Poll connection state.
    ///
    /// `connected` is true only when the handshake with the Core has
    /// actually completed; `authorized` additionally requires a valid
    /// token. This prevents a stale cached token from being reported as
    /// authorized when the Core is unreachable.
    pub async fn status(&self) -> ConnectionStatus {
        match self.client() {
            Some(client) => client.status().await,
            None => ConnectionStatus::default(),
        }
    }
}
