//! Filesystem import command.

use std::path::Path;

use crate::app::Services;
use crate::config;
use crate::jobs::JobKind;

/// Scan a directory tree and import every album directory found.
pub async fn cmd_import(path: &Path, collection_id: Option<i64>) -> anyhow::Result<()> {
    let config = config::load();
    let services = Services::from_config(&config).await?;

    println!("Importing albums from {}", path.display());
    services
        .filesystem_importer
        .start(path.to_path_buf(), collection_id)?;

    super::watch_job(&services.jobs, JobKind::FilesystemImport).await;
    Ok(())
}
