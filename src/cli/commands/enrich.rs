//! AI enrichment command.

use crate::app::Services;
use crate::config;
use crate::enrichment::EnrichmentScope;
use crate::jobs::JobKind;

/// Enrich one album or a whole collection with model-sourced credits.
pub async fn cmd_enrich(album: Option<i64>, collection: Option<i64>) -> anyhow::Result<()> {
    let scope = match (album, collection) {
        (Some(album_id), None) => EnrichmentScope::Album(album_id),
        (None, Some(collection_id)) => EnrichmentScope::Collection(collection_id),
        _ => anyhow::bail!("pass exactly one of --album or --collection"),
    };

    let config = config::load();
    if config
        .enrichment
        .anthropic_api_key
        .as_deref()
        .unwrap_or_default()
        .is_empty()
    {
        anyhow::bail!(
            "no API key configured - set enrichment.anthropic_api_key in {}",
            config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the config file".to_string())
        );
    }

    let services = Services::from_config(&config).await?;
    services.enricher.start(scope)?;

    super::watch_job(&services.jobs, JobKind::Enrichment).await;
    Ok(())
}
