//! Core data models for the album catalog.
//!
//! Defines the persistent entities ([`Album`], [`Collection`]) and the
//! typed credit/link inputs shared by manual edits, importers, and
//! enrichment. Scanners produce an ephemeral [`AlbumUnit`] which the
//! catalog upsert consumes.
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `albums` - Album records matched by case-insensitive (title, artist)
//! - `record_labels`, `musicians`, `persons`, `details` - Global entities,
//!   deduplicated case-insensitively by name
//! - `album_musicians`, `album_personnel`, `album_details` - Link tables
//!   keyed by the full (album, entity, qualifier) triple
//! - `collections`, `collection_albums` - Named collections of albums

use sqlx::FromRow;

/// An album in the catalog.
#[derive(Debug, Clone)]
pub struct Album {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Album title
    pub title: String,
    /// Album artist
    pub artist: String,
    /// Release year; once set, automated passes never change it
    pub release_year: Option<i64>,
    /// Producer; once set, automated passes never change it
    pub producer: Option<String>,
    /// Record label reference; once set, automated passes never change it
    pub record_label_id: Option<i64>,
    /// Ordered track titles; replaced wholesale on every import pass
    pub tracks: Vec<String>,
    /// Cover art filename in the art store, if any
    pub art_path: Option<String>,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// A record label.
#[derive(Debug, Clone, FromRow)]
pub struct RecordLabel {
    pub id: i64,
    pub name: String,
}

/// A named collection of albums.
#[derive(Debug, Clone, FromRow)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// A musician credited on an album, with the instrument played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicianCredit {
    pub name: String,
    pub instrument: String,
}

/// A production/technical person credited on an album, with their role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffCredit {
    pub name: String,
    pub role: String,
}

/// A free-form album detail (e.g. a recording studio), with a type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailEntry {
    pub value: String,
    pub detail_type: String,
}

/// An ephemeral album-shaped unit of work produced by a scanner.
///
/// Not persisted directly; consumed by [`crate::catalog::upsert_unit`].
#[derive(Debug, Clone, Default)]
pub struct AlbumUnit {
    pub title: String,
    pub artist: String,
    pub release_year: Option<i64>,
    pub record_label: Option<String>,
    pub tracks: Vec<String>,
    pub image_bytes: Option<Vec<u8>>,
}

impl AlbumUnit {
    /// Display label for progress reporting ("Title — Artist").
    pub fn label(&self) -> String {
        format!("{} — {}", self.title, self.artist)
    }
}
