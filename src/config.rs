//! Pipeline configuration.
//!
//! All configuration is read once from the environment into an explicit
//! [`PipelineConfig`] and validated at construction, before any network or
//! warehouse I/O happens. The fixed table list lives here too so that every
//! stage works from the same declaration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Default scratch directory for downloaded objects
pub const DEFAULT_SCRATCH_DIR: &str = "/tmp/lakeload_downloads";

/// Default region sent to the object store; S3-compatible stores like MinIO
/// accept any value here but the SDK requires one
pub const DEFAULT_STORE_REGION: &str = "us-east-1";

pub const DEFAULT_RAW_SCHEMA: &str = "raw";

pub const DEFAULT_ANALYTICS_SCHEMA: &str = "analytics";

/// Timeout for establishing the warehouse connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(45);

/// The fixed set of source tables moved by the pipeline.
///
/// Each variant names an object-store prefix (`"<table>/"`), a raw warehouse
/// table, and the analytical table derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Customers,
    Accounts,
    Transactions,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Customers, Table::Accounts, Table::Transactions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Customers => "customers",
            Table::Accounts => "accounts",
            Table::Transactions => "transactions",
        }
    }

    /// Object-store prefix holding this table's source files
    pub fn prefix(&self) -> String {
        format!("{}/", self.as_str())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object store endpoint, credentials, bucket, and local scratch location
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub scratch_dir: PathBuf,
}

/// Warehouse connection URL and target schemas
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub url: String,
    pub raw_schema: String,
    pub analytics_schema: String,
}

/// Complete configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    pub warehouse: WarehouseConfig,
    pub tables: Vec<Table>,
}

impl PipelineConfig {
    /// Build the configuration from the process environment.
    ///
    /// Fails fast on missing or empty credentials so a misconfigured run
    /// never reaches the network.
    pub fn from_env() -> Result<Self> {
        let store = StoreConfig {
            endpoint: required_env("STORE_ENDPOINT")?,
            access_key: required_env("STORE_ACCESS_KEY")?,
            secret_key: required_env("STORE_SECRET_KEY")?,
            bucket: required_env("STORE_BUCKET")?,
            region: optional_env("STORE_REGION", DEFAULT_STORE_REGION),
            scratch_dir: PathBuf::from(optional_env("STORE_SCRATCH_DIR", DEFAULT_SCRATCH_DIR)),
        };

        let warehouse = WarehouseConfig {
            url: required_env("WAREHOUSE_URL")?,
            raw_schema: optional_env("WAREHOUSE_RAW_SCHEMA", DEFAULT_RAW_SCHEMA),
            analytics_schema: optional_env("WAREHOUSE_ANALYTICS_SCHEMA", DEFAULT_ANALYTICS_SCHEMA),
        };

        Ok(Self {
            store,
            warehouse,
            tables: Table::ALL.to_vec(),
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    let value = std::env::var(name).with_context(|| format!("{} is not set", name))?;
    if value.trim().is_empty() {
        bail!("{} is set but empty", name);
    }
    Ok(value)
}

fn optional_env(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_and_prefixes() {
        assert_eq!(Table::Customers.as_str(), "customers");
        assert_eq!(Table::Accounts.prefix(), "accounts/");
        assert_eq!(Table::ALL.len(), 3);
    }

    #[test]
    fn table_serializes_as_snake_case_string() {
        let json = serde_json::to_string(&Table::Transactions).unwrap();
        assert_eq!(json, "\"transactions\"");

        let parsed: Table = serde_json::from_str("\"accounts\"").unwrap();
        assert_eq!(parsed, Table::Accounts);
    }

    // Env helpers are exercised with unique variable names so parallel tests
    // don't trample the shared process environment.
    #[test]
    fn required_env_rejects_missing_and_empty() {
        std::env::remove_var("LAKELOAD_TEST_MISSING");
        assert!(required_env("LAKELOAD_TEST_MISSING").is_err());

        std::env::set_var("LAKELOAD_TEST_EMPTY", "   ");
        assert!(required_env("LAKELOAD_TEST_EMPTY").is_err());
        std::env::remove_var("LAKELOAD_TEST_EMPTY");
    }

    #[test]
    fn optional_env_falls_back_to_default() {
        std::env::remove_var("LAKELOAD_TEST_OPTIONAL");
        assert_eq!(optional_env("LAKELOAD_TEST_OPTIONAL", "fallback"), "fallback");

        std::env::set_var("LAKELOAD_TEST_OPTIONAL", "value");
        assert_eq!(optional_env("LAKELOAD_TEST_OPTIONAL", "fallback"), "value");
        std::env::remove_var("LAKELOAD_TEST_OPTIONAL");
    }
}
