//! SQL statement builders for the raw and analytics layers.
//!
//! Production targets Postgres (JSONB raw column, schema-qualified tables).
//! The SQLite test backend stores the raw value as TEXT, projects with
//! `json_extract`, and flattens schema qualification into a name prefix,
//! mirroring how the production statements behave.

use crate::config::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    #[cfg(test)]
    Sqlite,
}

/// How a projected column is typed in the analytical table
#[derive(Debug, Clone, Copy)]
pub enum ColumnKind {
    Int,
    Text,
    Decimal,
    Timestamp,
}

/// One projected column: raw JSON field -> typed analytical column
#[derive(Debug, Clone, Copy)]
pub struct ColumnProjection {
    pub field: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
}

/// One replace-table-as-select statement: raw source -> analytical target
#[derive(Debug, Clone, Copy)]
pub struct TransformSpec {
    pub source: Table,
    pub target: &'static str,
    pub columns: &'static [ColumnProjection],
}

/// The fixed, ordered transform list. Statements are independent of each
/// other; the order matches the raw table order for readability.
pub const TRANSFORMS: [TransformSpec; 3] = [
    TransformSpec {
        source: Table::Customers,
        target: "dim_customers",
        columns: &[
            ColumnProjection { field: "id", column: "customer_id", kind: ColumnKind::Int },
            ColumnProjection { field: "first_name", column: "first_name", kind: ColumnKind::Text },
            ColumnProjection { field: "last_name", column: "last_name", kind: ColumnKind::Text },
            ColumnProjection { field: "email", column: "email", kind: ColumnKind::Text },
        ],
    },
    TransformSpec {
        source: Table::Accounts,
        target: "dim_accounts",
        columns: &[
            ColumnProjection { field: "account_id", column: "account_id", kind: ColumnKind::Int },
            ColumnProjection { field: "customer_id", column: "customer_id", kind: ColumnKind::Int },
            ColumnProjection {
                field: "account_type",
                column: "account_type",
                kind: ColumnKind::Text,
            },
            ColumnProjection { field: "balance", column: "balance", kind: ColumnKind::Decimal },
        ],
    },
    TransformSpec {
        source: Table::Transactions,
        target: "fact_transactions",
        columns: &[
            ColumnProjection {
                field: "transaction_id",
                column: "transaction_id",
                kind: ColumnKind::Int,
            },
            ColumnProjection { field: "account_id", column: "account_id", kind: ColumnKind::Int },
            ColumnProjection { field: "amount", column: "amount", kind: ColumnKind::Decimal },
            ColumnProjection {
                field: "transaction_date",
                column: "transaction_date",
                kind: ColumnKind::Timestamp,
            },
        ],
    },
];

/// Schema-qualify a table name; SQLite has no schemas so the schema becomes
/// a name prefix
pub fn qualified(dialect: Dialect, schema: &str, name: &str) -> String {
    match dialect {
        Dialect::Postgres => format!("{}.{}", schema, name),
        #[cfg(test)]
        Dialect::Sqlite => format!("{}_{}", schema, name),
    }
}

/// Statement creating the schema, where the dialect has schemas
pub fn create_schema(dialect: Dialect, schema: &str) -> Option<String> {
    match dialect {
        Dialect::Postgres => Some(format!("CREATE SCHEMA IF NOT EXISTS {}", schema)),
        #[cfg(test)]
        Dialect::Sqlite => None,
    }
}

/// DDL for a raw table: one semi-structured value column plus a load
/// timestamp defaulted by the warehouse
pub fn create_raw_table(dialect: Dialect, raw_schema: &str, table: Table) -> String {
    let name = qualified(dialect, raw_schema, table.as_str());
    match dialect {
        Dialect::Postgres => format!(
            "CREATE TABLE IF NOT EXISTS {} (v JSONB, load_timestamp TIMESTAMPTZ NOT NULL DEFAULT now())",
            name
        ),
        #[cfg(test)]
        Dialect::Sqlite => format!(
            "CREATE TABLE IF NOT EXISTS {} (v TEXT, load_timestamp TEXT NOT NULL DEFAULT (datetime('now')))",
            name
        ),
    }
}

/// Parameterized insert of one raw value; load_timestamp comes from the
/// column default
pub fn insert_raw(dialect: Dialect, raw_schema: &str, table: Table) -> String {
    let name = qualified(dialect, raw_schema, table.as_str());
    match dialect {
        Dialect::Postgres => format!("INSERT INTO {} (v) VALUES ($1)", name),
        #[cfg(test)]
        Dialect::Sqlite => format!("INSERT INTO {} (v) VALUES (?1)", name),
    }
}

pub fn drop_analytics_table(dialect: Dialect, analytics_schema: &str, spec: &TransformSpec) -> String {
    format!(
        "DROP TABLE IF EXISTS {}",
        qualified(dialect, analytics_schema, spec.target)
    )
}

/// Create-as-select projecting typed columns out of the raw value, excluding
/// rows whose raw value is null
pub fn create_analytics_table(
    dialect: Dialect,
    analytics_schema: &str,
    raw_schema: &str,
    spec: &TransformSpec,
) -> String {
    let projections = spec
        .columns
        .iter()
        .map(|col| projection(dialect, col))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE {} AS SELECT {} FROM {} WHERE v IS NOT NULL",
        qualified(dialect, analytics_schema, spec.target),
        projections,
        qualified(dialect, raw_schema, spec.source.as_str()),
    )
}

fn projection(dialect: Dialect, col: &ColumnProjection) -> String {
    match dialect {
        Dialect::Postgres => match col.kind {
            ColumnKind::Int => format!("(v->>'{}')::INT AS {}", col.field, col.column),
            ColumnKind::Text => format!("v->>'{}' AS {}", col.field, col.column),
            ColumnKind::Decimal => {
                format!("(v->>'{}')::NUMERIC(15,2) AS {}", col.field, col.column)
            }
            ColumnKind::Timestamp => {
                format!("(v->>'{}')::TIMESTAMP AS {}", col.field, col.column)
            }
        },
        #[cfg(test)]
        Dialect::Sqlite => match col.kind {
            ColumnKind::Int => format!(
                "CAST(json_extract(v, '$.{}') AS INTEGER) AS {}",
                col.field, col.column
            ),
            ColumnKind::Text => format!("json_extract(v, '$.{}') AS {}", col.field, col.column),
            ColumnKind::Decimal => format!(
                "CAST(json_extract(v, '$.{}') AS REAL) AS {}",
                col.field, col.column
            ),
            ColumnKind::Timestamp => {
                format!("json_extract(v, '$.{}') AS {}", col.field, col.column)
            }
        },
    }
}
