//! The fetch manifest: which local files were downloaded for which table.
//!
//! Produced once by the fetch stage and consumed once by the load stage.
//! When the stages are driven as separate processes by an external
//! orchestrator, the manifest round-trips through a JSON file on disk instead
//! of an orchestrator-private result channel.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Table;

/// Mapping from table to the ordered list of downloaded local paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchManifest {
    pub files: BTreeMap<Table, Vec<PathBuf>>,
}

impl FetchManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table, paths: Vec<PathBuf>) {
        self.files.insert(table, paths);
    }

    /// True when no table has any file to load
    pub fn is_empty(&self) -> bool {
        self.files.values().all(|paths| paths.is_empty())
    }

    pub fn file_count(&self) -> usize {
        self.files.values().map(|paths| paths.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Table, &[PathBuf])> {
        self.files.iter().map(|(table, paths)| (*table, paths.as_slice()))
    }

    /// Persist the manifest as pretty JSON for a later stage invocation
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read manifest from {}", path.display()))?;
        serde_json::from_str(&json).context("Failed to parse manifest JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_detection_ignores_tables_without_files() {
        let mut manifest = FetchManifest::new();
        assert!(manifest.is_empty());

        manifest.insert(Table::Customers, vec![]);
        manifest.insert(Table::Accounts, vec![]);
        assert!(manifest.is_empty());
        assert_eq!(manifest.file_count(), 0);

        manifest.insert(Table::Transactions, vec![PathBuf::from("/tmp/t.parquet")]);
        assert!(!manifest.is_empty());
        assert_eq!(manifest.file_count(), 1);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("manifest.json");

        let mut manifest = FetchManifest::new();
        manifest.insert(
            Table::Customers,
            vec![PathBuf::from("/tmp/a.parquet"), PathBuf::from("/tmp/b.parquet")],
        );
        manifest.insert(Table::Accounts, vec![]);

        manifest.save(&path).await.unwrap();
        let loaded = FetchManifest::load(&path).await.unwrap();

        assert_eq!(loaded, manifest);
    }

    #[tokio::test]
    async fn load_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = FetchManifest::load(&dir.path().join("absent.json")).await;
        assert!(result.is_err());
    }
}
