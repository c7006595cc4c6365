//! Find-or-create of scanned album units against the catalog.
//!
//! Both importers funnel their units through [`upsert_unit`], which owns
//! the matching and field fill-in rules:
//!
//! - Matching is by case-insensitive (title, artist); no source-specific
//!   identifier participates, so the same album discovered via Roon and a
//!   file scan lands on one record.
//! - Tracks are replaced unconditionally - they always reflect the most
//!   recent scan.
//! - Release year, record label, and art path are filled only while null;
//!   automated passes never overwrite an established value.
//! - Supplied image bytes are persisted in the art store under the album
//!   ID and never deleted here.
//!
//! Storage failures propagate to the caller; there are no internal
//! retries.

use sqlx::SqlitePool;

use crate::art::ArtStore;
use crate::db;
use crate::error::Result;
use crate::model::AlbumUnit;

/// Outcome of an album-unit upsert.
#[derive(Debug, Clone, Copy)]
pub struct Upserted {
    pub album_id: i64,
    /// True if a new album was created, false if an existing one matched
    pub created: bool,
    /// Whether the album has art after this upsert - the caller uses this
    /// to decide whether to try the remote art fallback
    pub has_art: bool,
}

/// Find-or-create the album for a scanned unit and apply non-destructive
/// field fill-in.
pub async fn upsert_unit(pool: &SqlitePool, art: &ArtStore, unit: &AlbumUnit) -> Result<Upserted> {
    if let Some(existing) = db::find_album(pool, &unit.title, &unit.artist).await? {
        // Update path: refresh tracks, fill absent fields
        db::set_tracks(pool, existing.id, &unit.tracks).await?;

        if let Some(year) = unit.release_year {
            db::set_release_year_if_absent(pool, existing.id, year).await?;
        }
        if let Some(label) = &unit.record_label {
            db::set_record_label_if_absent(pool, existing.id, label).await?;
        }

        let mut has_art = existing.art_path.is_some();
        if !has_art
            && let Some(bytes) = &unit.image_bytes
        {
            let filename = art.write(existing.id, bytes)?;
            has_art = db::set_art_path_if_absent(pool, existing.id, &filename).await?;
        }

        tracing::debug!("updated album {} ({})", existing.id, unit.label());
        Ok(Upserted {
            album_id: existing.id,
            created: false,
            has_art,
        })
    } else {
        // Create path: all provided fields, art persisted immediately
        let album_id = db::create_album(
            pool,
            &db::NewAlbum {
                title: unit.title.clone(),
                artist: unit.artist.clone(),
                release_year: unit.release_year,
                producer: None,
                record_label: unit.record_label.clone(),
                tracks: unit.tracks.clone(),
            },
        )
        .await?;

        let mut has_art = false;
        if let Some(bytes) = &unit.image_bytes {
            let filename = art.write(album_id, bytes)?;
            has_art = db::set_art_path_if_absent(pool, album_id, &filename).await?;
        }

        tracing::debug!("created album {} ({})", album_id, unit.label());
        Ok(Upserted {
            album_id,
            created: true,
            has_art,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use tempfile::TempDir;

    fn unit(title: &str, artist: &str) -> AlbumUnit {
        AlbumUnit {
            title: title.to_string(),
            artist: artist.to_string(),
            tracks: vec!["Track One".to_string()],
            ..Default::default()
        }
    }

    async fn setup() -> (tempfile::TempDir, TempDir, SqlitePool, ArtStore) {
        let (db_dir, pool) = test_pool().await;
        let art_dir = TempDir::new().unwrap();
        let store = ArtStore::new(art_dir.path());
        (db_dir, art_dir, pool, store)
    }

    #[tokio::test]
    async fn test_creates_then_matches_case_insensitively() {
        let (_db, _art, pool, store) = setup().await;

        let first = upsert_unit(&pool, &store, &unit("Rumours", "Fleetwood Mac"))
            .await
            .unwrap();
        assert!(first.created);

        let mut second_unit = unit("RUMOURS", "fleetwood mac");
        second_unit.tracks = vec!["Dreams".to_string()];
        let second = upsert_unit(&pool, &store, &second_unit).await.unwrap();

        assert!(!second.created);
        assert_eq!(second.album_id, first.album_id);
        assert_eq!(db::album_count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tracks_replaced_unconditionally() {
        let (_db, _art, pool, store) = setup().await;

        let mut u = unit("Album", "Artist");
        let id = upsert_unit(&pool, &store, &u).await.unwrap().album_id;

        u.tracks = vec!["New One".to_string(), "New Two".to_string()];
        upsert_unit(&pool, &store, &u).await.unwrap();

        let album = db::get_album(&pool, id).await.unwrap().unwrap();
        assert_eq!(album.tracks, vec!["New One", "New Two"]);
    }

    #[tokio::test]
    async fn test_year_and_label_fill_once() {
        let (_db, _art, pool, store) = setup().await;

        let mut u = unit("Album", "Artist");
        u.release_year = Some(1977);
        u.record_label = Some("Warner".to_string());
        let id = upsert_unit(&pool, &store, &u).await.unwrap().album_id;

        // Re-import with different values; stored ones must survive
        u.release_year = Some(2001);
        u.record_label = Some("Rhino".to_string());
        upsert_unit(&pool, &store, &u).await.unwrap();

        let album = db::get_album(&pool, id).await.unwrap().unwrap();
        assert_eq!(album.release_year, Some(1977));
        let label_id = album.record_label_id.unwrap();
        let warner = db::links::get_or_create_record_label(&pool, "Warner").await.unwrap();
        assert_eq!(label_id, warner);
    }

    #[tokio::test]
    async fn test_year_fills_in_on_update_when_absent() {
        let (_db, _art, pool, store) = setup().await;

        let mut u = unit("Album", "Artist");
        let id = upsert_unit(&pool, &store, &u).await.unwrap().album_id;

        u.release_year = Some(1969);
        upsert_unit(&pool, &store, &u).await.unwrap();

        let album = db::get_album(&pool, id).await.unwrap().unwrap();
        assert_eq!(album.release_year, Some(1969));
    }

    #[tokio::test]
    async fn test_art_persisted_on_create() {
        let (_db, _art, pool, store) = setup().await;

        let mut u = unit("Album", "Artist");
        u.image_bytes = Some(b"front".to_vec());
        let result = upsert_unit(&pool, &store, &u).await.unwrap();

        assert!(result.has_art);
        assert!(store.contains(result.album_id));
        let album = db::get_album(&pool, result.album_id).await.unwrap().unwrap();
        assert_eq!(
            album.art_path.as_deref(),
            Some(format!("{}.jpg", result.album_id).as_str())
        );
    }

    #[tokio::test]
    async fn test_art_fills_only_when_absent() {
        let (_db, _art, pool, store) = setup().await;

        let mut u = unit("Album", "Artist");
        u.image_bytes = Some(b"first".to_vec());
        let id = upsert_unit(&pool, &store, &u).await.unwrap().album_id;

        u.image_bytes = Some(b"second".to_vec());
        let second = upsert_unit(&pool, &store, &u).await.unwrap();

        assert!(second.has_art);
        // Existing art wins; the second image was not written
        assert_eq!(std::fs::read(store.path_for(id)).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_reports_missing_art_for_fallback() {
        let (_db, _art, pool, store) = setup().await;

        let result = upsert_unit(&pool, &store, &unit("Album", "Artist")).await.unwrap();
        assert!(!result.has_art);
    }
}
