//! Roon library probe and import commands.
//!
//! Both commands connect to the Core first and poll status until the
//! user has approved the extension in Roon > Settings > Extensions (or a
//! previously persisted pairing token is accepted).

use std::time::Duration;

use crate::app::Services;
use crate::config::{self, Config};
use crate::jobs::JobKind;
use crate::roon;

/// How long to wait for the user to approve the extension.
const PAIRING_TIMEOUT: Duration = Duration::from_secs(120);

/// Import every album from the connected Roon library.
pub async fn cmd_roon_import(
    host: Option<&str>,
    port: Option<u16>,
    collection_id: Option<i64>,
    auto_enrich: bool,
) -> anyhow::Result<()> {
    let config = config::load();
    let services = Services::from_config(&config).await?;

    connect_and_pair(&services, &config, host, port).await?;

    services.library_importer.start(collection_id, auto_enrich).await?;
    super::watch_job(&services.jobs, JobKind::LibraryImport).await;

    if auto_enrich && collection_id.is_some() {
        println!("auto-enrichment:");
        super::watch_job(&services.jobs, JobKind::Enrichment).await;
    }
    Ok(())
}

/// Fetch raw browse data for the first `count` albums.
pub async fn cmd_roon_probe(
    host: Option<&str>,
    port: Option<u16>,
    count: u32,
) -> anyhow::Result<()> {
    let config = config::load();
    let services = Services::from_config(&config).await?;

    connect_and_pair(&services, &config, host, port).await?;

    let client = services
        .roon
        .client()
        .ok_or_else(|| anyhow::anyhow!("not connected to Roon Core"))?;
    let report = roon::probe(&client, count).await?;

    println!("reported album count: {}", report.reported_total);
    for album in &report.albums {
        println!(
            "  {} — {} (item_key: {}, image_key: {})",
            album.title,
            album.subtitle,
            album.item_key.as_deref().unwrap_or("-"),
            album.image_key.as_deref().unwrap_or("-"),
        );
    }
    if !report.first_album_tracks.is_empty() {
        println!("first album tracks:");
        for track in &report.first_album_tracks {
            println!("  {}", track);
        }
    }
    Ok(())
}

/// Connect to the Core and wait for authorization.
async fn connect_and_pair(
    services: &Services,
    config: &Config,
    host: Option<&str>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let host = host
        .map(|h| h.to_string())
        .unwrap_or_else(|| config.roon.host.clone());
    if host.is_empty() {
        anyhow::bail!("Roon Core host is required - pass --host or set roon.host in the config");
    }
    let port = port.unwrap_or(config.roon.port);

    services.roon.connect(&host, port);

    let deadline = tokio::time::Instant::now() + PAIRING_TIMEOUT;
    let mut prompted = false;
    loop {
        let status = services.roon.status().await;
        if status.authorized {
            println!(
                "connected to {} at {}:{}",
                status.core_name.as_deref().unwrap_or("Roon Core"),
                host,
                port
            );
            return Ok(());
        }

        if status.connected && !prompted {
            println!("waiting for approval - open Roon > Settings > Extensions and enable Musicshelf");
            prompted = true;
        }

        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!(
                "Roon Core at {}:{} did not authorize within {:?}",
                host,
                port,
                PAIRING_TIMEOUT
            );
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}
