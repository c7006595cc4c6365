//! Bulk album import from a local directory tree.
//!
//! Scans the tree for directories that directly contain audio files,
//! turns each into an album unit, and feeds the units to the catalog
//! upsert in sorted path order. A single bad directory never aborts the
//! scan; its error is counted and logged and the job moves on.
//!
//! Filesystem traversal and tag parsing are blocking, so both run on the
//! blocking thread pool while the job task itself stays responsive to
//! progress polls and cancellation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::art::{ArtResolver, ArtStore};
use crate::catalog;
use crate::db::links;
use crate::error::{Error, Result};
use crate::jobs::{JobKind, JobStatus, Jobs, StartError};
use crate::scanner;

use super::UnitOutcome;

/// Filesystem import job. Cheap to clone.
#[derive(Clone)]
pub struct FilesystemImporter {
    pool: SqlitePool,
    art_store: ArtStore,
    resolver: ArtResolver,
    jobs: Arc<Jobs>,
}

impl FilesystemImporter {
    pub fn new(pool: SqlitePool, art_store: ArtStore, resolver: ArtResolver, jobs: Arc<Jobs>) -> Self {
        Self {
            pool,
            art_store,
            resolver,
            jobs,
        }
    }

    /// Start a background import of `root`.
    ///
    /// Rejected synchronously when the path is not a directory or an
    /// import is already running; no job record is created in either
    /// case.
    pub fn start(
        &self,
        root: PathBuf,
        collection_id: Option<i64>,
    ) -> std::result::Result<(), StartError> {
        if !root.is_dir() {
            return Err(StartError::BadPath(root.display().to_string()));
        }
        self.jobs.tracker(JobKind::FilesystemImport).begin()?;

        let importer = self.clone();
        tokio::spawn(async move {
            importer.run(root, collection_id).await;
        });
        Ok(())
    }

    /// The job body. Runs until completion, cancellation, or a fatal
    /// error; per-unit failures are absorbed along the way.
    pub(crate) async fn run(self, root: PathBuf, collection_id: Option<i64>) {
        let tracker = self.jobs.tracker(JobKind::FilesystemImport);
        tracker.update(|p| p.status = JobStatus::Running);

        // Phase 1: discover album directories (blocking walk)
        let scan_root = root.clone();
        let dirs = match tokio::task::spawn_blocking(move || scanner::find_album_dirs(&scan_root)).await
        {
            Ok(dirs) => dirs,
            Err(e) => {
                tracker.fail(format!("directory scan failed: {}", e));
                return;
            }
        };
        tracker.update(|p| p.total = dirs.len() as u64);
        tracing::info!(
            "file import: found {} album directories under {}",
            dirs.len(),
            root.display()
        );

        // Phase 2: process each directory in sorted path order
        for dir in dirs {
            if tracker.cancel_requested() {
                tracker.finish(JobStatus::Cancelled);
                tracing::info!("file import cancelled");
                return;
            }
            tokio::task::yield_now().await;

            let label = dir_label(&dir);
            tracker.update(|p| p.current = Some(label.clone()));

            match self.import_dir(&dir, collection_id).await {
                Ok(UnitOutcome::Created) => tracker.update(|p| p.imported += 1),
                Ok(UnitOutcome::Updated) => tracker.update(|p| p.updated += 1),
                Ok(UnitOutcome::Skipped) => tracker.update(|p| p.skipped += 1),
                Err(e) => {
                    tracing::warn!("file import: failed directory '{}': {}", dir.display(), e);
                    tracker.push_error(format!("{} — {}", label, e));
                }
            }
            tracker.update(|p| p.done += 1);
        }

        tracker.finish(JobStatus::Done);
        let snapshot = tracker.snapshot();
        tracing::info!(
            "file import complete: imported={} updated={} skipped={} errors={}",
            snapshot.imported,
            snapshot.updated,
            snapshot.skipped,
            snapshot.errors,
        );
    }

    /// Import one album directory. Everything that can go wrong here is a
    /// per-unit error, isolated by the caller.
    async fn import_dir(&self, dir: &Path, collection_id: Option<i64>) -> Result<UnitOutcome> {
        let scan_dir = dir.to_path_buf();
        let unit = tokio::task::spawn_blocking(move || scanner::scan_album_dir(&scan_dir))
            .await
            .map_err(|e| Error::metadata(dir, e.to_string()))?;

        let Some(unit) = unit else {
            return Ok(UnitOutcome::Skipped);
        };

        let upserted = catalog::upsert_unit(&self.pool, &self.art_store, &unit).await?;

        // Remote fallback only when no local art was found; best-effort
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

fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("?")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, test_support::test_pool};
    use crate::musicbrainz::mocks::MockMusicBrainz;
    use tempfile::TempDir;

    struct Fixture {
        _db_dir: tempfile::TempDir,
        _art_dir: TempDir,
        pool: SqlitePool,
        jobs: Arc<Jobs>,
        importer: FilesystemImporter,
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
        let importer = FilesystemImporter::new(pool.clone(), art_store, resolver, jobs.clone());
        Fixture {
            _db_dir,
            _art_dir,
            pool,
            jobs,
            importer,
        }
    }

    /// Two album directories with unreadable tags: titles fall back to
    /// the directory names.
    fn music_root() -> TempDir {
        let root = TempDir::new().unwrap();
        for name in ["Aqualung", "Benefit"] {
            let dir = root.path().join(name);
            std::fs::create_dir(&dir).unwrap();
            std::fs::write(dir.join("01 - Track.flac"), b"junk").unwrap();
        }
        root
    }

    #[tokio::test]
    async fn test_import_two_directories() {
        let f = fixture().await;
        let root = music_root();

        f.jobs.tracker(JobKind::FilesystemImport).begin().unwrap();
        f.importer.clone().run(root.path().to_path_buf(), None).await;

        let progress = f.jobs.progress(JobKind::FilesystemImport);
        assert_eq!(progress.status, JobStatus::Done);
        assert_eq!(progress.total, 2);
        assert_eq!(progress.done, 2);
        assert_eq!(progress.imported, 2);
        assert_eq!(progress.errors, 0);
        assert_eq!(db::album_count(&f.pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let f = fixture().await;
        let root = music_root();

        f.jobs.tracker(JobKind::FilesystemImport).begin().unwrap();
        f.importer.clone().run(root.path().to_path_buf(), None).await;
        assert_eq!(db::album_count(&f.pool).await.unwrap(), 2);

        f.jobs.tracker(JobKind::FilesystemImport).begin().unwrap();
        f.importer.clone().run(root.path().to_path_buf(), None).await;

        let progress = f.jobs.progress(JobKind::FilesystemImport);
        assert_eq!(progress.status, JobStatus::Done);
        assert_eq!(progress.done, progress.total);
        assert_eq!(progress.imported, 0);
        assert_eq!(progress.updated, 2);
        // No net new albums on the second pass
        assert_eq!(db::album_count(&f.pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_import_adds_to_collection_idempotently() {
        let f = fixture().await;
        let root = music_root();
        let collection = links::create_collection(&f.pool, "Imports").await.unwrap();

        for _ in 0..2 {
            f.jobs.tracker(JobKind::FilesystemImport).begin().unwrap();
            f.importer
                .clone()
                .run(root.path().to_path_buf(), Some(collection))
                .await;
        }

        let members = links::collection_albums_by_title(&f.pool, collection).await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_before_first_unit() {
        let f = fixture().await;
        let root = music_root();

        let tracker = f.jobs.tracker(JobKind::FilesystemImport);
        tracker.begin().unwrap();
        tracker.request_cancel();
        f.importer.clone().run(root.path().to_path_buf(), None).await;

        let progress = f.jobs.progress(JobKind::FilesystemImport);
        assert_eq!(progress.status, JobStatus::Cancelled);
        assert_eq!(progress.done, 0);
        assert_eq!(db::album_count(&f.pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_rejects_bad_path() {
        let f = fixture().await;

        let result = f
            .importer
            .start(PathBuf::from("/nonexistent/music"), None);
        assert!(matches!(result, Err(StartError::BadPath(_))));
        // No job record was created
        assert_eq!(
            f.jobs.progress(JobKind::FilesystemImport).status,
            JobStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_start_rejects_while_running() {
        let f = fixture().await;
        let root = music_root();

        let tracker = f.jobs.tracker(JobKind::FilesystemImport);
        tracker.begin().unwrap();
        tracker.update(|p| p.status = JobStatus::Running);

        let result = f.importer.start(root.path().to_path_buf(), None);
        assert!(matches!(result, Err(StartError::AlreadyRunning(_))));
    }

    #[tokio::test]
    async fn test_empty_root_completes_with_zero_units() {
        let f = fixture().await;
        let root = TempDir::new().unwrap();

        f.jobs.tracker(JobKind::FilesystemImport).begin().unwrap();
        f.importer.clone().run(root.path().to_path_buf(), None).await;

        let progress = f.jobs.progress(JobKind::FilesystemImport);
        assert_eq!(progress.status, JobStatus::Done);
        assert_eq!(progress.total, 0);
        assert_eq!(progress.done, 0);
    }
}
