//! Fetch stage: download every object under each table's prefix into a
//! per-table scratch subdirectory and record what was fetched.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::{PipelineConfig, Table};
use crate::manifest::FetchManifest;
use crate::store::ObjectStore;

/// Map an object key to its download path under the scratch directory.
///
/// Files land in `<scratch>/<table>/<basename>` so objects from different
/// table prefixes never clash on a shared basename. Returns None for prefix
/// marker objects, which have nothing to download.
fn local_path(scratch_dir: &Path, table: Table, key: &str) -> Option<PathBuf> {
    let file_name = key.rsplit('/').next().unwrap_or_default();
    if file_name.is_empty() {
        return None;
    }
    Some(scratch_dir.join(table.as_str()).join(file_name))
}

/// Download all table files and return the manifest.
///
/// The manifest contains an entry for every configured table, empty when the
/// prefix had no objects. Files from previous runs are overwritten when they
/// share a name and otherwise left in place.
pub async fn run_fetch(config: &PipelineConfig) -> Result<FetchManifest> {
    let store_config = &config.store;

    // Checked again here so a config constructed outside from_env still
    // fails before any network call is made
    if store_config.access_key.trim().is_empty() || store_config.secret_key.trim().is_empty() {
        bail!("Object store credentials are missing");
    }

    tokio::fs::create_dir_all(&store_config.scratch_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create scratch directory {}",
                store_config.scratch_dir.display()
            )
        })?;

    let store = ObjectStore::new(store_config);
    let mut manifest = FetchManifest::new();

    for table in &config.tables {
        let keys = store.list(&table.prefix()).await?;

        let table_dir = store_config.scratch_dir.join(table.as_str());
        tokio::fs::create_dir_all(&table_dir)
            .await
            .with_context(|| format!("Failed to create scratch directory {}", table_dir.display()))?;

        let mut paths = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(path) = local_path(&store_config.scratch_dir, *table, &key) else {
                continue;
            };

            store.download(&key, &path).await?;
            info!("Downloaded {} -> {}", key, path.display());
            paths.push(path);
        }

        info!(table = %table, files = paths.len(), "Fetched table prefix");
        manifest.insert(*table, paths);
    }

    Ok(manifest)
}
