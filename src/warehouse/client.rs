//! Single-connection warehouse client.
//!
//! Each stage opens one connection, uses it for the whole batch, and closes
//! it on exit. Production runs against Postgres; tests run the same code
//! paths against in-memory SQLite, with the placeholder and JSON-binding
//! differences handled per backend.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{Connection, PgConnection};

#[cfg(test)]
use sqlx::SqliteConnection;

use super::sql::{self, Dialect};
use crate::config::{Table, WarehouseConfig, CONNECT_TIMEOUT};

pub enum Warehouse {
    Postgres(PgConnection),
    #[cfg(test)]
    Sqlite(SqliteConnection),
}

impl Warehouse {
    /// Open a single connection to the configured warehouse
    pub async fn connect(config: &WarehouseConfig) -> Result<Self> {
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, PgConnection::connect(&config.url))
            .await
            .context("Timed out connecting to warehouse")?
            .context("Failed to connect to warehouse")?;
        Ok(Warehouse::Postgres(conn))
    }

    #[cfg(test)]
    pub async fn sqlite_in_memory() -> Result<Self> {
        let conn = SqliteConnection::connect("sqlite::memory:").await?;
        Ok(Warehouse::Sqlite(conn))
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Warehouse::Postgres(_) => Dialect::Postgres,
            #[cfg(test)]
            Warehouse::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Execute one statement without parameters (DDL, transforms)
    pub async fn execute(&mut self, statement: &str) -> Result<()> {
        match self {
            Warehouse::Postgres(conn) => {
                sqlx::query(statement).execute(&mut *conn).await.map(|_| ())
            }
            #[cfg(test)]
            Warehouse::Sqlite(conn) => {
                sqlx::query(statement).execute(&mut *conn).await.map(|_| ())
            }
        }
        .with_context(|| format!("Failed to execute: {}", statement))?;
        Ok(())
    }

    /// Insert one semi-structured value into a raw table
    pub async fn insert_raw(&mut self, raw_schema: &str, table: Table, value: &Value) -> Result<()> {
        match self {
            Warehouse::Postgres(conn) => {
                let statement = sql::insert_raw(Dialect::Postgres, raw_schema, table);
                sqlx::query(&statement)
                    .bind(sqlx::types::Json(value))
                    .execute(&mut *conn)
                    .await
                    .map(|_| ())
            }
            #[cfg(test)]
            Warehouse::Sqlite(conn) => {
                let statement = sql::insert_raw(Dialect::Sqlite, raw_schema, table);
                sqlx::query(&statement)
                    .bind(value.to_string())
                    .execute(&mut *conn)
                    .await
                    .map(|_| ())
            }
        }
        .with_context(|| format!("Failed to insert into raw table {}", table))?;
        Ok(())
    }

    /// Close the connection gracefully
    pub async fn close(self) -> Result<()> {
        match self {
            Warehouse::Postgres(conn) => conn.close().await.context("Failed to close connection")?,
            #[cfg(test)]
            Warehouse::Sqlite(conn) => conn.close().await?,
        }
        Ok(())
    }
}
