//! Application service wiring.
//!
//! All cross-service dependencies are constructed here, once, at startup:
//! the importers and the enricher receive the catalog pool, the shared
//! art resolver, and the job trackers by injection rather than reaching
//! for globals at call time.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::art::{ArtResolver, ArtStore};
use crate::config::Config;
use crate::db;
use crate::enrichment::{CreditsApi, CreditsClient, Enricher};
use crate::error::Result;
use crate::importer::{FilesystemImporter, LibraryImporter};
use crate::jobs::Jobs;
use crate::musicbrainz::{MusicBrainzApi, MusicBrainzClient};
use crate::roon::RoonManager;

/// The wired-up service graph.
pub struct Services {
    pub pool: SqlitePool,
    pub jobs: Arc<Jobs>,
    pub art_store: ArtStore,
    pub roon: Arc<RoonManager>,
    pub enricher: Enricher,
    pub filesystem_importer: FilesystemImporter,
    pub library_importer: LibraryImporter,
}

impl Services {
    /// Build every service from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(crate::config::data_dir())?;

        let pool = db::init_db(&config.db_url()).await?;
        let jobs = Arc::new(Jobs::new());
        let art_store = ArtStore::new(config.art_dir());

        let musicbrainz: Arc<dyn MusicBrainzApi> = Arc::new(MusicBrainzClient::new());
        let resolver = ArtResolver::new(pool.clone(), art_store.clone(), musicbrainz);

        let credits: Arc<dyn CreditsApi> = Arc::new(CreditsClient::new(
            config
                .enrichment
                .anthropic_api_key
                .clone()
                .unwrap_or_default(),
            config.enrichment.model.clone(),
        ));
        let enricher = Enricher::new(pool.clone(), credits, jobs.clone());

        let roon = Arc::new(RoonManager::new(config.roon_token_path()));

        let filesystem_importer = FilesystemImporter::new(
            pool.clone(),
            art_store.clone(),
            resolver.clone(),
            jobs.clone(),
        );
        let library_importer = LibraryImporter::new(
            pool.clone(),
            art_store.clone(),
            resolver,
            jobs.clone(),
            roon.clone(),
            enricher.clone(),
        );

        Ok(Self {
            pool,
            jobs,
            art_store,
            roon,
            enricher,
            filesystem_importer,
            library_importer,
        })
    }
}
