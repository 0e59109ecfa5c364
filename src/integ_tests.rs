//! Integration tests for the load and transform stages.
//!
//! These run the production code paths against in-memory SQLite with real
//! Parquet fixtures, covering the raw layer contract and the analytical
//! projections end to end.

#[cfg(test)]
mod tests {
    use crate::{
        config::{Table, WarehouseConfig},
        manifest::FetchManifest,
        stages::{load::load_manifest, transform::transform_tables},
        warehouse::{sql, Warehouse},
    };
    use arrow::array::{ArrayRef, Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    // ============ Test Helpers ============

    fn warehouse_config() -> WarehouseConfig {
        WarehouseConfig {
            url: "sqlite::memory:".to_string(),
            raw_schema: "raw".to_string(),
            analytics_schema: "analytics".to_string(),
        }
    }

    /// Write a customers Parquet file with id/first_name/last_name/email columns
    fn write_customers_parquet(
        dir: &TempDir,
        filename: &str,
        rows: &[(i32, &str, &str, &str)],
    ) -> PathBuf {
        let path = dir.path().join(filename);

        let schema = Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("first_name", DataType::Utf8, true),
            Field::new("last_name", DataType::Utf8, true),
            Field::new("email", DataType::Utf8, true),
        ]);

        let ids = Int32Array::from_iter_values(rows.iter().map(|r| r.0));
        let first_names = StringArray::from_iter_values(rows.iter().map(|r| r.1));
        let last_names = StringArray::from_iter_values(rows.iter().map(|r| r.2));
        let emails = StringArray::from_iter_values(rows.iter().map(|r| r.3));

        let batch = RecordBatch::try_new(
            Arc::new(schema.clone()),
            vec![
                Arc::new(ids) as ArrayRef,
                Arc::new(first_names),
                Arc::new(last_names),
                Arc::new(emails),
            ],
        )
        .unwrap();

        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, Arc::new(schema), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        path
    }

    async fn count(warehouse: &mut Warehouse, table: &str) -> i64 {
        match warehouse {
            Warehouse::Sqlite(conn) => {
                let sql = format!("SELECT COUNT(*) FROM {}", table);
                let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await.unwrap();
                count
            }
            _ => panic!("Tests run against the SQLite backend"),
        }
    }

    async fn dim_customers(warehouse: &mut Warehouse) -> Vec<(i64, String, String, String)> {
        match warehouse {
            Warehouse::Sqlite(conn) => sqlx::query_as(
                "SELECT customer_id, first_name, last_name, email \
                 FROM analytics_dim_customers ORDER BY customer_id",
            )
            .fetch_all(&mut *conn)
            .await
            .unwrap(),
            _ => panic!("Tests run against the SQLite backend"),
        }
    }

    async fn prepare_raw_customers(warehouse: &mut Warehouse) {
        let ddl = sql::create_raw_table(warehouse.dialect(), "raw", Table::Customers);
        warehouse.execute(&ddl).await.unwrap();
    }

    // ============ Tests ============

    #[tokio::test]
    async fn load_parquet_files_into_raw_layer() {
        let dir = TempDir::new().unwrap();
        let path = write_customers_parquet(
            &dir,
            "customers.parquet",
            &[
                (1, "Ann", "Lee", "a@x.com"),
                (2, "Bo", "Ray", "b@x.com"),
                (3, "Cy", "Fox", "c@x.com"),
            ],
        );

        let mut manifest = FetchManifest::new();
        manifest.insert(Table::Customers, vec![path]);

        let mut warehouse = Warehouse::sqlite_in_memory().await.unwrap();
        let report = load_manifest(&mut warehouse, &warehouse_config(), &manifest)
            .await
            .unwrap();

        assert_eq!(report.tables_loaded, 1);
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.rows_loaded, 3);
        assert_eq!(report.rows_skipped, 0);
        assert_eq!(count(&mut warehouse, "raw_customers").await, 3);
    }

    #[tokio::test]
    async fn multiple_files_for_one_table_are_appended() {
        let dir = TempDir::new().unwrap();
        let first = write_customers_parquet(&dir, "part0.parquet", &[(1, "Ann", "Lee", "a@x.com")]);
        let second = write_customers_parquet(&dir, "part1.parquet", &[(2, "Bo", "Ray", "b@x.com")]);

        let mut manifest = FetchManifest::new();
        manifest.insert(Table::Customers, vec![first, second]);

        let mut warehouse = Warehouse::sqlite_in_memory().await.unwrap();
        let report = load_manifest(&mut warehouse, &warehouse_config(), &manifest)
            .await
            .unwrap();

        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.rows_loaded, 2);
        assert_eq!(count(&mut warehouse, "raw_customers").await, 2);
    }

    #[tokio::test]
    async fn transform_projects_typed_columns_from_raw_value() {
        let mut warehouse = Warehouse::sqlite_in_memory().await.unwrap();
        prepare_raw_customers(&mut warehouse).await;

        let row = json!({"id": 1, "first_name": "Ann", "last_name": "Lee", "email": "a@x.com"});
        warehouse.insert_raw("raw", Table::Customers, &row).await.unwrap();

        let report = transform_tables(&mut warehouse, &warehouse_config())
            .await
            .unwrap();

        assert_eq!(
            report.tables_rebuilt,
            vec!["dim_customers", "dim_accounts", "fact_transactions"]
        );
        assert_eq!(
            dim_customers(&mut warehouse).await,
            vec![(1, "Ann".to_string(), "Lee".to_string(), "a@x.com".to_string())]
        );
    }

    #[tokio::test]
    async fn null_raw_values_are_excluded_from_analytical_tables() {
        let mut warehouse = Warehouse::sqlite_in_memory().await.unwrap();
        prepare_raw_customers(&mut warehouse).await;

        let row = json!({"id": 1, "first_name": "Ann", "last_name": "Lee", "email": "a@x.com"});
        warehouse.insert_raw("raw", Table::Customers, &row).await.unwrap();
        warehouse
            .execute("INSERT INTO raw_customers (v) VALUES (NULL)")
            .await
            .unwrap();

        transform_tables(&mut warehouse, &warehouse_config())
            .await
            .unwrap();

        // The null row projects to nothing
        assert_eq!(count(&mut warehouse, "analytics_dim_customers").await, 1);
    }

    #[tokio::test]
    async fn transform_is_idempotent_over_unchanged_raw_tables() {
        let mut warehouse = Warehouse::sqlite_in_memory().await.unwrap();
        prepare_raw_customers(&mut warehouse).await;

        let row = json!({"id": 7, "first_name": "Di", "last_name": "Wu", "email": "d@x.com"});
        warehouse.insert_raw("raw", Table::Customers, &row).await.unwrap();

        let config = warehouse_config();
        transform_tables(&mut warehouse, &config).await.unwrap();
        let first = dim_customers(&mut warehouse).await;

        transform_tables(&mut warehouse, &config).await.unwrap();
        let second = dim_customers(&mut warehouse).await;

        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn transform_handles_never_loaded_raw_tables() {
        let mut warehouse = Warehouse::sqlite_in_memory().await.unwrap();

        let report = transform_tables(&mut warehouse, &warehouse_config())
            .await
            .unwrap();

        assert_eq!(report.tables_rebuilt.len(), 3);
        assert_eq!(count(&mut warehouse, "analytics_dim_customers").await, 0);
        assert_eq!(count(&mut warehouse, "analytics_fact_transactions").await, 0);
    }

    #[tokio::test]
    async fn end_to_end_load_then_transform() {
        let dir = TempDir::new().unwrap();
        let path = write_customers_parquet(
            &dir,
            "customers.parquet",
            &[(1, "Ann", "Lee", "a@x.com"), (2, "Bo", "Ray", "b@x.com")],
        );

        let mut manifest = FetchManifest::new();
        manifest.insert(Table::Customers, vec![path]);

        let config = warehouse_config();
        let mut warehouse = Warehouse::sqlite_in_memory().await.unwrap();

        let load_report = load_manifest(&mut warehouse, &config, &manifest).await.unwrap();
        assert_eq!(load_report.rows_loaded, 2);

        transform_tables(&mut warehouse, &config).await.unwrap();

        assert_eq!(
            dim_customers(&mut warehouse).await,
            vec![
                (1, "Ann".to_string(), "Lee".to_string(), "a@x.com".to_string()),
                (2, "Bo".to_string(), "Ray".to_string(), "b@x.com".to_string()),
            ]
        );
    }
}
