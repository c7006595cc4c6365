//! Enrichment job orchestration.
//!
//! Enriches one album or every album in a collection by querying the
//! credits model and merging the result into the album's existing links.
//! Merged link sets are applied through the same replace-by-recompute
//! path manual edits use, so there is exactly one write path for credits.
//!
//! Only one enrichment job (either scope) runs at a time; starting a
//! second is rejected synchronously.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::{self, links};
use crate::enrichment::domain::{merge_details, merge_musicians, merge_personnel};
use crate::enrichment::{CreditsApi, CreditsRequest};
use crate::error::Result;
use crate::jobs::{JobKind, JobStatus, Jobs, StartError};

/// What to enrich.
#[derive(Debug, Clone, Copy)]
pub enum EnrichmentScope {
    Album(i64),
    Collection(i64),
}

/// Enrichment engine; cheap to clone.
#[derive(Clone)]
pub struct Enricher {
    pool: SqlitePool,
    credits: Arc<dyn CreditsApi>,
    jobs: Arc<Jobs>,
}

impl Enricher {
    pub fn new(pool: SqlitePool, credits: Arc<dyn CreditsApi>, jobs: Arc<Jobs>) -> Self {
        Self { pool, credits, jobs }
    }

    /// Start a background enrichment job.
    ///
    /// Rejected while an enrichment job of either scope is running.
    pub fn start(&self, scope: EnrichmentScope) -> std::result::Result<(), StartError> {
        self.jobs.tracker(JobKind::Enrichment).begin()?;

        let enricher = self.clone();
        tokio::spawn(async move {
            match scope {
                EnrichmentScope::Album(album_id) => enricher.run_single(album_id).await,
                EnrichmentScope::Collection(collection_id) => {
                    enricher.run_collection(collection_id).await
                }
            }
        });
        Ok(())
    }

    /// Enrich a single album with model-sourced credits.
    ///
    /// Returns true if anything changed, false if the album is missing or
    /// the model had nothing to add. Errors from the model call or the
    /// database propagate to the caller.
    pub async fn enrich_album(&self, album_id: i64) -> Result<bool> {
        let Some(record) = links::get_album_with_credits(&self.pool, album_id).await? else {
            return Ok(false);
        };

        // Existing entity names are hints for spelling normalisation
        let request = CreditsRequest {
            title: record.album.title.clone(),
            artist: record.album.artist.clone(),
            release_year: record.album.release_year,
            known_musicians: links::all_musician_names(&self.pool).await?,
            known_persons: links::all_person_names(&self.pool).await?,
            known_details: links::all_detail_names(&self.pool).await?,
        };

        let Some(facts) = self.credits.fetch_credits(&request).await? else {
            return Ok(false);
        };

        let mut changed = false;

        // Producer is only set while absent; an incoming value is otherwise discarded
        if let Some(producer) = &facts.producer
            && record.album.producer.is_none()
        {
            changed |= db::set_producer_if_absent(&self.pool, album_id, producer).await?;
        }

        let merged_musicians = merge_musicians(&record.musicians, &facts.musicians);
        if merged_musicians.len() > record.musicians.len() {
            links::replace_musician_links(&self.pool, album_id, &merged_musicians).await?;
            changed = true;
        }

        let merged_personnel = merge_personnel(&record.personnel, &facts.personnel);
        if merged_personnel.len() > record.personnel.len() {
            links::replace_personnel_links(&self.pool, album_id, &merged_personnel).await?;
            changed = true;
        }

        let merged_details = merge_details(&record.details, &facts.other_details);
        if merged_details.len() > record.details.len() {
            links::replace_detail_links(&self.pool, album_id, &merged_details).await?;
            changed = true;
        }

        Ok(changed)
    }

    /// Background task: enrich a single album.
    pub(crate) async fn run_single(self, album_id: i64) {
        let tracker = self.jobs.tracker(JobKind::Enrichment);
        tracker.update(|p| {
            p.status = JobStatus::Running;
            p.total = 1;
        });

        let label = match db::get_album(&self.pool, album_id).await {
            Ok(Some(album)) => format!("{} — {}", album.title, album.artist),
            _ => format!("album {}", album_id),
        };
        tracker.update(|p| p.current = Some(label.clone()));

        match self.enrich_album(album_id).await {
            Ok(true) => tracker.update(|p| p.updated += 1),
            Ok(false) => tracker.update(|p| p.skipped += 1),
            Err(e) => {
                tracing::error!("enrichment failed for album {}: {}", album_id, e);
                tracker.push_error(format!("{} — {}", label, e));
            }
        }

        tracker.update(|p| p.done = 1);
        tracker.finish(JobStatus::Done);
    }

    /// Background task: enrich all albums in a collection sequentially.
    pub(crate) async fn run_collection(self, collection_id: i64) {
        let tracker = self.jobs.tracker(JobKind::Enrichment);
        tracker.update(|p| p.status = JobStatus::Running);

        // Enumerate up front so the denominator is fixed before processing
        let rows = match links::collection_albums_by_title(&self.pool, collection_id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracker.fail(format!("failed to list collection {}: {}", collection_id, e));
                return;
            }
        };
        tracker.update(|p| p.total = rows.len() as u64);

        for (album_id, title, artist) in rows {
            if tracker.cancel_requested() {
                tracker.finish(JobStatus::Cancelled);
                tracing::info!("collection enrichment cancelled");
                return;
            }
            tokio::task::yield_now().await;
            tracker.update(|p| p.current = Some(format!("{} — {}", title, artist)));

            match self.enrich_album(album_id).await {
                Ok(true) => tracker.update(|p| p.updated += 1),
                Ok(false) => tracker.update(|p| p.skipped += 1),
                Err(e) => {
                    tracing::warn!("enrichment failed for album {} ({}): {}", album_id, title, e);
                    tracker.push_error(format!("{} — {}", title, e));
                }
            }
            tracker.update(|p| p.done += 1);
        }

        tracker.finish(JobStatus::Done);
        let snapshot = tracker.snapshot();
        tracing::info!(
            "collection enrichment complete: enriched={} skipped={} errors={}",
            snapshot.updated,
            snapshot.skipped,
            snapshot.errors,
        );
    }
}
