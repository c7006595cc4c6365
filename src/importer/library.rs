//! Bulk album import from a connected Roon library.
//!
//! Discovery pages through the albums hierarchy and collects the full
//! item list before processing, so the progress denominator is the
//! number of items actually enumerated - the service-reported total can
//! disagree and is used only for logging. Listing failures are job-fatal;
//! everything after that point is per-unit.
//!
//! The browse cursor is shared, stateful service-side session data, so
//! each drill-down resets to the albums root first. Skipping that reset
//! corrupts subsequent navigation.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::art::{ArtResolver, ArtStore};
use crate::catalog;
use crate::db::links;
use crate::enrichment::{Enricher, EnrichmentScope};
use crate::error::Result;
use crate::jobs::{JobKind, JobStatus, Jobs, StartError};
use crate::model::AlbumUnit;
use crate::roon::{parse_tracks, BrowseItem, LibraryBrowseApi, RoonManager};

use super::UnitOutcome;

/// Page size for the albums listing.
const LIST_PAGE_SIZE: u32 = 100;
/// Page size while reading one album's track rows.
const DETAIL_PAGE_SIZE: u32 = 100;

/// Roon library import job. Cheap to clone.
#[derive(Clone)]
pub struct LibraryImporter {
    pool: SqlitePool,
    art_store: ArtStore,
    resolver: ArtResolver,
    jobs: Arc<Jobs>,
    roon: Arc<RoonManager>,
    enricher: Enricher,
}

impl LibraryImporter {
    pub fn new(
        pool: SqlitePool,
        art_store: ArtStore,
        resolver: ArtResolver,
        jobs: Arc<Jobs>,
        roon: Arc<RoonManager>,
        enricher: Enricher,
    ) -> Self {
        Self {
            pool,
            art_store,
            resolver,
            jobs,
            roon,
            enricher,
        }
    }

    /// Start a background import of the connected library.
    ///
    /// Rejected when the Roon Core is not connected and authorized, or
    /// when an import is already running. With `auto_enrich` and a target
    /// collection, a collection enrichment run is chained after a
    /// successful import.
    pub async fn start(
        &self,
        collection_id: Option<i64>,
        auto_enrich: bool,
    ) -> std::result::Result<(), StartError> {
        let status = self.roon.status().await;
        if !status.authorized {
            return Err(StartError::NotAuthorized);
        }
        let Some(client) = self.roon.client() else {
            return Err(StartError::NotAuthorized);
        };

        self.jobs.tracker(JobKind::LibraryImport).begin()?;

        let importer = self.clone();
        tokio::spawn(async move {
            importer.run(Arc::new(client), collection_id, auto_enrich).await;
        });
        Ok(())
    }

    /// The job body, generic over the browse API for testability.
    pub(crate) async fn run(
        self,
        api: Arc<dyn LibraryBrowseApi>,
        collection_id: Option<i64>,
        auto_enrich: bool,
    ) {
        let tracker = self.jobs.tracker(JobKind::LibraryImport);
        tracker.update(|p| p.status = JobStatus::Running);

        // Phase 1: collect the full album list
        let reported_total = match api.reset_to_root().await {
            Ok(count) => count,
            Err(e) => {
                tracker.fail(format!("failed to browse the library: {}", e));
                return;
            }
        };

        let mut all_items: Vec<BrowseItem> = Vec::new();
        let mut offset = 0u32;
        loop {
            if tracker.cancel_requested() {
                tracker.finish(JobStatus::Cancelled);
                return;
            }

            let page = match api.load_page(offset, LIST_PAGE_SIZE).await {
                Ok(page) => page,
                Err(e) => {
                    tracker.fail(format!("failed to list albums at offset {}: {}", offset, e));
                    return;
                }
            };

            let page_len = page.len();
            all_items.extend(page);
            tracing::info!(
                "Roon import listing: {} items so far (reported total: {})",
                all_items.len(),
                reported_total,
            );

            if page_len < LIST_PAGE_SIZE as usize {
                break;
            }
            offset += LIST_PAGE_SIZE;
        }

        // The actual item count is the denominator; the reported total
        // can disagree with what enumeration returns
        tracker.update(|p| p.total = all_items.len() as u64);
        tracing::info!("Roon import: {} albums to process", all_items.len());

        // Phase 2: import each album
        for item in all_items {
            if tracker.cancel_requested() {
                tracker.finish(JobStatus::Cancelled);
                tracing::info!("Roon import cancelled");
                return;
            }
            tokio::task::yield_now().await;

            // Action entries (e.g. "Play Album") have no item key and are
            // not albums
            let Some(item_key) = item.item_key.clone().filter(|_| !item.title.is_empty()) else {
                tracker.update(|p| {
                    p.done += 1;
                    p.skipped += 1;
                });
                continue;
            };

            tracker.update(|p| p.current = Some(format!("{} — {}", item.title, item.subtitle)));

            match self.import_item(api.as_ref(), &item, &item_key, collection_id).await {
                Ok(UnitOutcome::Created) => tracker.update(|p| p.imported += 1),
                Ok(UnitOutcome::Updated) => tracker.update(|p| p.updated += 1),
                Ok(UnitOutcome::Skipped) => tracker.update(|p| p.skipped += 1),
                Err(e) => {
                    tracing::warn!(
                        "Roon import: failed '{}' by '{}': {}",
                        item.title,
                        item.subtitle,
                        e
                    );
                    tracker.push_error(format!("{} — {}", item.title, e));
                }
            }
            tracker.update(|p| p.done += 1);
        }

        tracker.finish(JobStatus::Done);
        let snapshot = tracker.snapshot();
        tracing::info!(
            "Roon import complete: imported={} updated={} skipped={} errors={}",
            snapshot.imported,
            snapshot.updated,
            snapshot.skipped,
            snapshot.errors,
        );

        if auto_enrich && let Some(collection_id) = collection_id {
            match self.enricher.start(EnrichmentScope::Collection(collection_id)) {
                Ok(()) => tracing::info!("auto-enrichment started for collection {}", collection_id),
                Err(e) => tracing::warn!("auto-enrichment not started: {}", e),
            }
        }
    }

    /// Import one listed album: drill in for tracks and artwork, then
    /// upsert. Everything here is a per-unit error, isolated by the
    /// caller.
    async fn import_item(
        &self,
        api: &dyn LibraryBrowseApi,
        item: &BrowseItem,
        item_key: &str,
        collection_id: Option<i64>,
    ) -> Result<UnitOutcome> {
        // The browse cursor is stateful: always re-enter from the root
        api.reset_to_root().await?;
        api.open_item(item_key).await?;

        let mut tracks: Vec<String> = Vec::new();
        let mut offset = 0u32;
        loop {
            let rows = api.load_page(offset, DETAIL_PAGE_SIZE).await?;
            let row_count = rows.len();
            tracks.extend(parse_tracks(&rows));
            if row_count < DETAIL_PAGE_SIZE as usize {
                break;
            }
            offset += DETAIL_PAGE_SIZE;
        }

        // Artwork is best-effort: a missing or failed image is "no art"
        let image_bytes = match &item.image_key {
            Some(image_key) => match api.fetch_image(image_key).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!("Roon image fetch failed for key {}: {}", image_key, e);
                    None
                }
            },
            None => None,
        };

        let unit = AlbumUnit {
            title: item.title.clone(),
            artist: item.subtitle.clone(),
            release_year: None,
            record_label: None,
            tracks,
            image_bytes,
        };

        let upserted = catalog::upsert_unit(&self.pool, &self.art_store, &unit).await?;

        if !upserted.has_art {
            self.resolver
                .resolve_art(upserted.album_id, &unit.title, &unit.artist)
                .await;
        }

        if let Some(collection_id) = collection_id {
            links::add_album_to_collection(&self.pool, collection_id, upserted.album_id).await?;
        }

        Ok(if upserted.created {
            UnitOutcome::Created
        } else {
            UnitOutcome::Updated
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, test_support::test_pool};
    use crate::enrichment::mocks::MockCredits;
    use crate::musicbrainz::mocks::MockMusicBrainz;
    use crate::roon::mocks::MockLibrary;
    use tempfile::TempDir;

    struct Fixture {
        _db_dir: tempfile::TempDir,
        _art_dir: TempDir,
        pool: SqlitePool,
        art_store: ArtStore,
        jobs: Arc<Jobs>,
        importer: LibraryImporter,
    }

    async fn fixture() -> Fixture {
        let (_db_dir, pool) = test_pool().await;
        let _art_dir = TempDir::new().unwrap();
        let art_store = ArtStore::new(_art_dir.path());
        let resolver = ArtResolver::new(
            pool.clone(),
            art_store.clone(),
            Arc::new(MockMusicBrainz::no_matches()),
        );
        let jobs = Arc::new(Jobs::new());
        let enricher = Enricher::new(pool.clone(), Arc::new(MockCredits::empty()), jobs.clone());
        let roon = Arc::new(RoonManager::new(
            _art_dir.path().join("roon_token.json"),
        ));
        let importer = LibraryImporter::new(
            pool.clone(),
            art_store.clone(),
            resolver,
            jobs.clone(),
            roon,
            enricher,
        );
        Fixture {
            _db_dir,
            _art_dir,
            pool,
            art_store,
            jobs,
            importer,
        }
    }

    fn album_item(title: &str, artist: &str, key: &str, image: Option<&str>) -> BrowseItem {
        BrowseItem {
            title: title.to_string(),
            subtitle: artist.to_string(),
            item_key: Some(key.to_string()),
            image_key: image.map(|s| s.to_string()),
        }
    }

    fn action_item(title: &str) -> BrowseItem {
        BrowseItem {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_imports_albums_and_skips_action_items() {
        let f = fixture().await;
        let library = MockLibrary::new(vec![
            action_item("Play Album"),
            album_item("IV", "Led Zeppelin", "k1", Some("img1")),
            album_item("Benefit", "Jethro Tull", "k2", None),
        ])
        .with_tracks("k1", &["Black Dog", "Rock and Roll"])
        .with_tracks("k2", &["With You There to Help Me"])
        .with_image("img1", b"roon artwork");

        f.jobs.tracker(JobKind::LibraryImport).begin().unwrap();
        f.importer.clone().run(Arc::new(library), None, false).await;

        let progress = f.jobs.progress(JobKind::LibraryImport);
        assert_eq!(progress.status, JobStatus::Done);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.done, 3);
        assert_eq!(progress.imported, 2);
        assert_eq!(progress.skipped, 1);

        let album = db::find_album(&f.pool, "IV", "Led Zeppelin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(album.tracks, vec!["Black Dog", "Rock and Roll"]);
        assert!(album.art_path.is_some());
        assert!(f.art_store.contains(album.id));
    }

    #[tokio::test]
    async fn test_cursor_reset_before_each_drilldown() {
        let f = fixture().await;
        let library = Arc::new(
            MockLibrary::new(vec![
                album_item("A", "Artist", "ka", None),
                album_item("B", "Artist", "kb", None),
            ])
            .with_tracks("ka", &["One"])
            .with_tracks("kb", &["Two"]),
        );

        f.jobs.tracker(JobKind::LibraryImport).begin().unwrap();
        f.importer.clone().run(library.clone(), None, false).await;

        // One reset for the listing plus one per drilled-into album
        assert_eq!(library.reset_count(), 3);
    }

    #[tokio::test]
    async fn test_reimport_updates_instead_of_duplicating() {
        let f = fixture().await;

        for _ in 0..2 {
            let library = MockLibrary::new(vec![album_item("IV", "Led Zeppelin", "k1", None)])
                .with_tracks("k1", &["Black Dog"]);
            f.jobs.tracker(JobKind::LibraryImport).begin().unwrap();
            f.importer.clone().run(Arc::new(library), None, false).await;
        }

        assert_eq!(db::album_count(&f.pool).await.unwrap(), 1);
        let progress = f.jobs.progress(JobKind::LibraryImport);
        assert_eq!(progress.imported, 0);
        assert_eq!(progress.updated, 1);
    }

    #[tokio::test]
    async fn test_empty_image_is_no_art_not_an_error() {
        let f = fixture().await;
        let library = MockLibrary::new(vec![album_item("IV", "Led Zeppelin", "k1", Some("img1"))])
            .with_tracks("k1", &["Black Dog"]);
        // No image registered for img1: fetch_image returns None

        f.jobs.tracker(JobKind::LibraryImport).begin().unwrap();
        f.importer.clone().run(Arc::new(library), None, false).await;

        let progress = f.jobs.progress(JobKind::LibraryImport);
        assert_eq!(progress.errors, 0);
        let album = db::find_album(&f.pool, "IV", "Led Zeppelin")
            .await
            .unwrap()
            .unwrap();
        assert!(album.art_path.is_none());
    }

    #[tokio::test]
    async fn test_start_rejects_when_not_authorized() {
        let f = fixture().await;
        // No connection was ever made, so the manager reports unauthorized
        let result = f.importer.start(None, false).await;
        assert!(matches!(result, Err(StartError::NotAuthorized)));
        assert_eq!(
            f.jobs.progress(JobKind::LibraryImport).status,
            JobStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_auto_enrich_chains_into_enrichment_job() {
        let f = fixture().await;
        let collection = links::create_collection(&f.pool, "Roon").await.unwrap();
        let library = MockLibrary::new(vec![album_item("IV", "Led Zeppelin", "k1", None)])
            .with_tracks("k1", &["Black Dog"]);

        f.jobs.tracker(JobKind::LibraryImport).begin().unwrap();
        f.importer
            .clone()
            .run(Arc::new(library), Some(collection), true)
            .await;

        // The import finished and handed off to the enrichment tracker
        assert_eq!(
            f.jobs.progress(JobKind::LibraryImport).status,
            JobStatus::Done
        );
        let enrichment = f.jobs.progress(JobKind::Enrichment);
        assert_ne!(enrichment.status, JobStatus::Idle);
    }
}
