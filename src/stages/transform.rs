//! Transform stage: destructively rebuild each analytical table from a typed
//! projection over its raw table.

use anyhow::Result;
use tracing::{info, warn};

use crate::config::{PipelineConfig, WarehouseConfig};
use crate::warehouse::{sql, Warehouse};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransformReport {
    pub tables_rebuilt: Vec<String>,
}

/// Run the fixed transform list over one connection.
///
/// Each statement recreates one analytical table from its raw table; the
/// statements are independent, so their order is for readability only.
/// Re-running over unchanged raw tables produces identical results.
pub async fn run_transform(config: &PipelineConfig) -> Result<TransformReport> {
    let mut warehouse = Warehouse::connect(&config.warehouse).await?;
    let result = transform_tables(&mut warehouse, &config.warehouse).await;

    if let Err(e) = warehouse.close().await {
        warn!("Failed to close warehouse connection: {:#}", e);
    }

    result
}

pub(crate) async fn transform_tables(
    warehouse: &mut Warehouse,
    config: &WarehouseConfig,
) -> Result<TransformReport> {
    let dialect = warehouse.dialect();

    if let Some(statement) = sql::create_schema(dialect, &config.analytics_schema) {
        warehouse.execute(&statement).await?;
    }

    // A raw table that was never loaded still projects to an empty
    // analytical table rather than failing the stage
    if let Some(statement) = sql::create_schema(dialect, &config.raw_schema) {
        warehouse.execute(&statement).await?;
    }
    for spec in &sql::TRANSFORMS {
        warehouse
            .execute(&sql::create_raw_table(dialect, &config.raw_schema, spec.source))
            .await?;
    }

    let mut report = TransformReport::default();
    for spec in &sql::TRANSFORMS {
        warehouse
            .execute(&sql::drop_analytics_table(dialect, &config.analytics_schema, spec))
            .await?;
        warehouse
            .execute(&sql::create_analytics_table(
                dialect,
                &config.analytics_schema,
                &config.raw_schema,
                spec,
            ))
            .await?;

        info!(table = spec.target, "Rebuilt analytical table");
        report.tables_rebuilt.push(spec.target.to_string());
    }

    Ok(report)
}
