//! MusicBrainz release search and Cover Art Archive lookups.
//!
//! # Architecture
//!
//! - **Domain models** (this file) - the types the rest of the crate uses
//! - **API DTOs** (`dto.rs`) - exact API response shapes
//! - **Adapter** (`adapter.rs`) - converts DTOs to domain models
//! - **Client** (`client.rs`) - HTTP client for both services
//!
//! The [`MusicBrainzApi`] trait is the seam the art resolver depends on,
//! so tests can substitute mock implementations.

pub mod adapter;
pub mod client;
pub mod dto;

use async_trait::async_trait;

pub use client::MusicBrainzClient;

/// A release candidate from a MusicBrainz search, ranked by the service.
#[derive(Debug, Clone)]
pub struct ReleaseCandidate {
    /// MusicBrainz release ID
    pub mbid: String,
    pub title: String,
    pub artist: String,
    pub year: Option<i64>,
    pub label: Option<String>,
    pub country: Option<String>,
    pub track_count: u32,
}

/// Full release details, used to pre-populate a manual album form.
#[derive(Debug, Clone)]
pub struct ReleaseDetails {
    pub mbid: String,
    pub title: String,
    pub artist: String,
    pub year: Option<i64>,
    pub label: Option<String>,
    pub tracks: Vec<String>,
}

/// Errors from the MusicBrainz / Cover Art Archive clients.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MusicBrainzError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Release not found")]
    NotFound,

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("API error: {0}")]
    Api(String),
}

/// Trait for MusicBrainz lookups.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait MusicBrainzApi: Send + Sync {
    /// Search releases by album title and artist, best matches first.
    async fn search_releases(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Vec<ReleaseCandidate>, MusicBrainzError>;

    /// Download the front cover image for a release.
    ///
    /// Returns `Ok(None)` when the archive has no art for the release
    /// (HTTP 404) - absence is a result, not an error.
    async fn front_cover(&self, mbid: &str) -> Result<Option<Vec<u8>>, MusicBrainzError>;
}

#[async_trait]
impl MusicBrainzApi for MusicBrainzClient {
    async fn search_releases(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Vec<ReleaseCandidate>, MusicBrainzError> {
        self.search_releases(title, artist).await
    }

    async fn front_cover(&self, mbid: &str) -> Result<Option<Vec<u8>>, MusicBrainzError> {
        self.front_cover(mbid).await
    }
}
