//! Source file parsing

pub mod parquet;

pub use parquet::{read_rows, ParquetRows};
