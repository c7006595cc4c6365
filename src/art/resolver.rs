//! Cover-art fallback via MusicBrainz + Cover Art Archive.
//!
//! Used by both importers when neither embedded nor directory art was
//! found. Every outcome short of a storage failure is soft: "no art" is
//! returned as `false`, never as an error, so a missing cover can never
//! fail an import unit.
//!
//! # Rate limiting
//!
//! MusicBrainz allows 1 request/second. A single timestamp, shared by
//! every caller through the one [`ArtResolver`] instance, is checked
//! before each search; callers sleep only for the remainder of the
//! minimum interval. The mutex is held across the sleep so concurrent
//! callers serialize through the same check.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::db;
use crate::musicbrainz::MusicBrainzApi;

use super::ArtStore;

/// Minimum spacing between MusicBrainz searches (the service allows
/// 1 req/sec; 1.1s leaves headroom).
const MIN_SEARCH_INTERVAL: Duration = Duration::from_millis(1100);

/// Rate-limited cover-art fallback resolver.
///
/// One instance is shared by all importers and any manual lookups, so the
/// rate limit is global to the process.
#[derive(Clone)]
pub struct ArtResolver {
    pool: SqlitePool,
    store: ArtStore,
    musicbrainz: Arc<dyn MusicBrainzApi>,
    last_search: Arc<Mutex<Option<Instant>>>,
}

impl ArtResolver {
    pub fn new(pool: SqlitePool, store: ArtStore, musicbrainz: Arc<dyn MusicBrainzApi>) -> Self {
        Self {
            pool,
            store,
            musicbrainz,
            last_search: Arc::new(Mutex::new(None)),
        }
    }

    /// Try to find and persist cover art for an album.
    ///
    /// Searches MusicBrainz by (title, artist), takes the top candidate,
    /// and downloads its front cover. On success the image is written to
    /// the art store and the album's art path is set - but only if still
    /// absent, re-checked at write time to avoid racing a concurrent
    /// manual upload.
    ///
    /// Returns true if art was found and recorded.
    pub async fn resolve_art(&self, album_id: i64, title: &str, artist: &str) -> bool {
        self.wait_for_slot().await;

        let candidates = match self.musicbrainz.search_releases(title, artist).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::debug!("art search failed for album {} ({}): {}", album_id, title, e);
                return false;
            }
        };

        let Some(top) = candidates.first() else {
            return false;
        };

        let bytes = match self.musicbrainz.front_cover(&top.mbid).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return false,
            Err(e) => {
                tracing::debug!("art download failed for album {} ({}): {}", album_id, title, e);
                return false;
            }
        };

        let filename = match self.store.write(album_id, &bytes) {
            Ok(filename) => filename,
            Err(e) => {
                tracing::warn!("failed to store art for album {}: {}", album_id, e);
                return false;
            }
        };

        match db::set_art_path_if_absent(&self.pool, album_id, &filename).await {
            Ok(true) => {
                tracing::debug!("cover art saved for album {} ({})", album_id, title);
                true
            }
            Ok(false) => {
                // Someone set art between our check and now; theirs wins
                false
            }
            Err(e) => {
                tracing::warn!("failed to record art for album {}: {}", album_id, e);
                false
            }
        }
    }

    /// Sleep just long enough that [`MIN_SEARCH_INTERVAL`] has elapsed
    /// since the previous search by any caller, then claim the slot.
    async fn wait_for_slot(&self) {
        let mut last = self.last_search.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < MIN_SEARCH_INTERVAL {
                tokio::time::sleep(MIN_SEARCH_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
