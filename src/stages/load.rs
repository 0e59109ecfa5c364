//! Load stage: parse each fetched Parquet file and insert every row as one
//! semi-structured value into the table's raw warehouse table.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{PipelineConfig, WarehouseConfig};
use crate::formats;
use crate::manifest::FetchManifest;
use crate::warehouse::{sql, Warehouse};

/// What the load stage did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub tables_loaded: usize,
    pub files_loaded: usize,
    pub rows_loaded: u64,
    /// Rows dropped by per-row error tolerance; counted, never fatal
    pub rows_skipped: u64,
}

/// Load the fetched files into the raw layer.
///
/// An empty manifest is a successful no-op and never opens a connection.
/// Otherwise one connection serves the whole batch and is released whether
/// the load succeeds or fails. Inserts that completed before an error are
/// not rolled back.
pub async fn run_load(config: &PipelineConfig, manifest: &FetchManifest) -> Result<LoadReport> {
    if manifest.is_empty() {
        info!("No files to load; skipping load stage");
        return Ok(LoadReport::default());
    }

    let mut warehouse = Warehouse::connect(&config.warehouse).await?;
    let result = load_manifest(&mut warehouse, &config.warehouse, manifest).await;

    if let Err(e) = warehouse.close().await {
        warn!("Failed to close warehouse connection: {:#}", e);
    }

    result
}

pub(crate) async fn load_manifest(
    warehouse: &mut Warehouse,
    config: &WarehouseConfig,
    manifest: &FetchManifest,
) -> Result<LoadReport> {
    let dialect = warehouse.dialect();

    if let Some(statement) = sql::create_schema(dialect, &config.raw_schema) {
        warehouse.execute(&statement).await?;
    }

    let mut report = LoadReport::default();
    for (table, files) in manifest.iter() {
        if files.is_empty() {
            info!(table = %table, "No files fetched; nothing to load");
            continue;
        }

        warehouse
            .execute(&sql::create_raw_table(dialect, &config.raw_schema, table))
            .await?;

        let mut table_rows = 0u64;
        let mut table_skipped = 0u64;
        for file in files {
            let parsed = formats::read_rows(file)
                .with_context(|| format!("Failed to parse {}", file.display()))?;

            for row in &parsed.rows {
                warehouse.insert_raw(&config.raw_schema, table, row).await?;
            }

            table_rows += parsed.rows.len() as u64;
            table_skipped += parsed.skipped;
            report.files_loaded += 1;
        }

        if table_skipped > 0 {
            warn!(table = %table, skipped = table_skipped, "Rows skipped during load");
        }
        info!(table = %table, rows = table_rows, "Loaded raw table");

        report.rows_loaded += table_rows;
        report.rows_skipped += table_skipped;
        report.tables_loaded += 1;
    }

    Ok(report)
}
