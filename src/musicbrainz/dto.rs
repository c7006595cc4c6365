//! MusicBrainz API Data Transfer Objects
//!
//! These types match EXACTLY what the MusicBrainz API returns.
//! DO NOT add fields that aren't in the API response.
//! DO NOT use these types outside the musicbrainz module - convert to domain types.
//!
//! API Reference: https://musicbrainz.org/doc/MusicBrainz_API
//!
//! We use the /release search endpoint to find candidate releases by
//! title and artist, and the /release/{mbid} lookup endpoint for full
//! details including track titles.

use serde::{Deserialize, Serialize};

/// Release search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub releases: Vec<Release>,
}

/// Release, as returned by both search and lookup
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Release {
    /// MusicBrainz release ID
    pub id: String,
    /// Release title
    pub title: Option<String>,
    /// Release date (YYYY, YYYY-MM, or YYYY-MM-DD)
    pub date: Option<String>,
    /// Country code
    pub country: Option<String>,
    /// Number of tracks (search results only)
    pub track_count: Option<u32>,
    /// Artist credits
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    /// Label information
    #[serde(default)]
    pub label_info: Vec<LabelInfo>,
    /// Media (discs) in this release (lookup with inc=recordings only)
    #[serde(default)]
    pub media: Vec<Medium>,
}

/// Artist credit (can be multiple for collaborations)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistCredit {
    /// How this artist is credited (may differ from official name)
    pub name: Option<String>,
    /// Join phrase (e.g., " & ", " feat. ")
    pub joinphrase: Option<String>,
    /// The artist
    pub artist: Option<Artist>,
}

/// Artist info
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// Label entry within label-info
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelInfo {
    pub label: Option<Label>,
}

/// A record label
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Label {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Medium (disc) within a release
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Medium {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Track on a medium
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    /// Track title (may differ from recording title)
    pub title: Option<String>,
    /// The underlying recording
    pub recording: Option<Recording>,
}

/// Recording referenced by a track
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recording {
    pub title: Option<String>,
}

/// Error response from MusicBrainz API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: String,
    pub help: Option<String>,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// If these fail, the API has changed and we need to update our DTOs.
// ============================================================================
