//! Database module for album catalog persistence.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Provides async operations for:
//! - Album lookup by case-insensitive (title, artist) and creation
//! - Set-only-if-absent field updates (release year, label, producer, art path)
//! - Linked-entity and collection management (see [`links`])
//!
//! The "set field only if currently null" semantics are enforced at this
//! layer with `UPDATE ... WHERE ... IS NULL` statements, not by storage
//! constraints, so automated import passes can never clobber a value a
//! previous pass or a manual edit established.

pub mod links;

use crate::model::Album;
use chrono::Utc;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use links::AlbumWithCredits;

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "musicshelf.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Fields supplied when creating a new album.
#[derive(Debug, Clone, Default)]
pub struct NewAlbum {
    pub title: String,
    pub artist: String,
    pub release_year: Option<i64>,
    pub producer: Option<String>,
    pub record_label: Option<String>,
    pub tracks: Vec<String>,
}

/// Raw album row; `tracks` is stored as a JSON array of strings.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AlbumRow {
    id: i64,
    title: String,
    artist: String,
    release_year: Option<i64>,
    producer: Option<String>,
    record_label_id: Option<i64>,
    tracks: String,
    art_path: Option<String>,
    created_at: String,
}

impl AlbumRow {
    fn into_album(self) -> Album {
        let tracks = serde_json::from_str(&self.tracks).unwrap_or_default();
        Album {
            id: self.id,
            title: self.title,
            artist: self.artist,
            release_year: self.release_year,
            producer: self.producer,
            record_label_id: self.record_label_id,
            tracks,
            art_path: self.art_path,
            created_at: self.created_at,
        }
    }
}

const ALBUM_COLUMNS: &str =
    "id, title, artist, release_year, producer, record_label_id, tracks, art_path, created_at";

/// Find an album by case-insensitive exact (title, artist) match.
///
/// This is the identity key used by both importers: the same physical
/// album may be discovered via different sources, so no source-specific
/// identifier participates in matching.
pub async fn find_album(
    pool: &SqlitePool,
    title: &str,
    artist: &str,
) -> sqlx::Result<Option<Album>> {
    let row: Option<AlbumRow> = sqlx::query_as(&format!(
        "SELECT {ALBUM_COLUMNS} FROM albums \
         WHERE title = ? COLLATE NOCASE AND artist = ? COLLATE NOCASE"
    ))
    .bind(title)
    .bind(artist)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(AlbumRow::into_album))
}

/// Get an album by its database ID.
pub async fn get_album(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Option<Album>> {
    let row: Option<AlbumRow> =
        sqlx::query_as(&format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE id = ?"))
            .bind(album_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(AlbumRow::into_album))
}

/// Create a new album, resolving the record label via get-or-create.
///
/// Returns the database ID of the new album.
pub async fn create_album(pool: &SqlitePool, album: &NewAlbum) -> sqlx::Result<i64> {
    let label_id = match &album.record_label {
        Some(name) => Some(links::get_or_create_record_label(pool, name).await?),
        None => None,
    };

    let tracks_json = serde_json::to_string(&album.tracks).unwrap_or_else(|_| "[]".to_string());
    let result = sqlx::query(
        "INSERT INTO albums (title, artist, release_year, producer, record_label_id, tracks, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&album.title)
    .bind(&album.artist)
    .bind(album.release_year)
    .bind(&album.producer)
    .bind(label_id)
    .bind(tracks_json)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Replace an album's track list wholesale.
///
/// Tracks always reflect the most recent scan; unlike year, label, and
/// art, this replacement is unconditional.
pub async fn set_tracks(pool: &SqlitePool, album_id: i64, tracks: &[String]) -> sqlx::Result<()> {
    let tracks_json = serde_json::to_string(tracks).unwrap_or_else(|_| "[]".to_string());
    sqlx::query("UPDATE albums SET tracks = ? WHERE id = ?")
        .bind(tracks_json)
        .bind(album_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Set the release year only if it is currently null.
///
/// Returns true if the value was written.
pub async fn set_release_year_if_absent(
    pool: &SqlitePool,
    album_id: i64,
    year: i64,
) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE albums SET release_year = ? WHERE id = ? AND release_year IS NULL")
        .bind(year)
        .bind(album_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Set the producer only if it is currently null.
pub async fn set_producer_if_absent(
    pool: &SqlitePool,
    album_id: i64,
    producer: &str,
) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE albums SET producer = ? WHERE id = ? AND producer IS NULL")
        .bind(producer)
        .bind(album_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Resolve a label name via get-or-create and attach it only if the album
/// has no label yet.
pub async fn set_record_label_if_absent(
    pool: &SqlitePool,
    album_id: i64,
    label_name: &str,
) -> sqlx::Result<bool> {
    let label_id = links::get_or_create_record_label(pool, label_name).await?;
    let result =
        sqlx::query("UPDATE albums SET record_label_id = ? WHERE id = ? AND record_label_id IS NULL")
            .bind(label_id)
            .bind(album_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Record the art filename only if none is set.
///
/// The re-check at write time avoids racing a concurrent manual upload:
/// whoever writes first wins and the loser's file is simply unreferenced.
pub async fn set_art_path_if_absent(
    pool: &SqlitePool,
    album_id: i64,
    filename: &str,
) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE albums SET art_path = ? WHERE id = ? AND art_path IS NULL")
        .bind(filename)
        .bind(album_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Total number of albums in the catalog.
pub async fn album_count(pool: &SqlitePool) -> sqlx::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM albums")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
