//! Conversion from Parquet files to JSON rows.
//!
//! The raw warehouse layer stores one semi-structured value per source row,
//! so each Arrow record batch is transposed into JSON objects keyed by column
//! name. Nulls become JSON nulls. A column type outside the supported set
//! makes the affected rows unconvertible; those rows are skipped and counted
//! rather than failing the load.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::*;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Float32Type, Float64Type, Int8Type,
    Int16Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value};
use tracing::warn;

/// Rows decoded from one Parquet file
#[derive(Debug, Default)]
pub struct ParquetRows {
    pub rows: Vec<Value>,
    /// Rows that could not be converted to a JSON value
    pub skipped: u64,
}

/// Read every row of a local Parquet file as a JSON object
pub fn read_rows(path: &Path) -> Result<ParquetRows> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Failed to read Parquet metadata from {}", path.display()))?
        .build()
        .context("Failed to build Parquet reader")?;

    let mut result = ParquetRows::default();
    for batch in reader {
        let batch = batch.context("Failed to decode record batch")?;
        let (mut rows, skipped) = batch_to_rows(&batch);
        result.rows.append(&mut rows);
        result.skipped += skipped;
    }

    Ok(result)
}

/// Transpose a record batch into per-row JSON objects.
///
/// Returns the converted rows plus the count of rows that had to be skipped.
fn batch_to_rows(batch: &RecordBatch) -> (Vec<Value>, u64) {
    let num_rows = batch.num_rows();
    if num_rows == 0 {
        return (Vec::new(), 0);
    }

    let schema = batch.schema();
    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(batch.num_columns());
    for (idx, array) in batch.columns().iter().enumerate() {
        match array_to_values(array.as_ref()) {
            Ok(values) => columns.push(values),
            Err(e) => {
                warn!(
                    column = schema.field(idx).name().as_str(),
                    "Skipping {} rows: {:#}", num_rows, e
                );
                return (Vec::new(), num_rows as u64);
            }
        }
    }

    let mut rows = Vec::with_capacity(num_rows);
    for row_idx in 0..num_rows {
        let mut object = Map::with_capacity(columns.len());
        for (col_idx, field) in schema.fields().iter().enumerate() {
            object.insert(field.name().clone(), columns[col_idx][row_idx].clone());
        }
        rows.push(Value::Object(object));
    }

    (rows, 0)
}

/// Convert an Arrow array to JSON values, one per row
fn array_to_values(array: &dyn Array) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(array.len());

    match array.data_type() {
        DataType::Boolean => {
            let arr = as_boolean_array(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    Value::Bool(arr.value(i))
                });
            }
        }
        DataType::Int8 => convert_signed::<Int8Type>(array, &mut values),
        DataType::Int16 => convert_signed::<Int16Type>(array, &mut values),
        DataType::Int32 => convert_signed::<Int32Type>(array, &mut values),
        DataType::Int64 => convert_signed::<Int64Type>(array, &mut values),
        DataType::UInt8 => convert_unsigned::<UInt8Type>(array, &mut values),
        DataType::UInt16 => convert_unsigned::<UInt16Type>(array, &mut values),
        DataType::UInt32 => convert_unsigned::<UInt32Type>(array, &mut values),
        DataType::UInt64 => convert_unsigned::<UInt64Type>(array, &mut values),
        DataType::Float32 => {
            let arr = as_primitive_array::<Float32Type>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    json_float(arr.value(i) as f64)
                });
            }
        }
        DataType::Float64 => {
            let arr = as_primitive_array::<Float64Type>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    json_float(arr.value(i))
                });
            }
        }
        DataType::Utf8 => {
            let arr = as_string_array(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    Value::String(arr.value(i).to_string())
                });
            }
        }
        DataType::LargeUtf8 => {
            let arr = as_largestring_array(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    Value::String(arr.value(i).to_string())
                });
            }
        }
        DataType::Binary => {
            let arr = as_generic_binary_array::<i32>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    Value::String(hex::encode(arr.value(i)))
                });
            }
        }
        DataType::LargeBinary => {
            let arr = as_generic_binary_array::<i64>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    Value::String(hex::encode(arr.value(i)))
                });
            }
        }
        DataType::Date32 => {
            let arr = as_primitive_array::<Date32Type>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    let days = arr.value(i);
                    let date = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                        .unwrap()
                        .checked_add_signed(chrono::Duration::days(days as i64))
                        .context("Invalid date")?;
                    Value::String(date.format("%Y-%m-%d").to_string())
                });
            }
        }
        DataType::Date64 => {
            let arr = as_primitive_array::<Date64Type>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    let millis = arr.value(i);
                    let datetime =
                        chrono::DateTime::from_timestamp_millis(millis).context("Invalid date")?;
                    Value::String(datetime.format("%Y-%m-%d").to_string())
                });
            }
        }
        DataType::Timestamp(unit, _) => {
            convert_timestamp(array, unit, &mut values)?;
        }
        DataType::Decimal128(_, scale) => {
            let arr = as_primitive_array::<Decimal128Type>(array);
            let scale = *scale as u32;
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    // Kept as a string so the warehouse-side cast decides precision
                    Value::String(format_decimal128(arr.value(i), scale))
                });
            }
        }
        DataType::Null => {
            values.resize(array.len(), Value::Null);
        }
        other => {
            return Err(anyhow::anyhow!("Unsupported column type: {:?}", other));
        }
    }

    Ok(values)
}

fn convert_signed<T: ArrowPrimitiveType>(array: &dyn Array, values: &mut Vec<Value>)
where
    T::Native: Into<i64>,
{
    let arr = as_primitive_array::<T>(array);
    for i in 0..arr.len() {
        values.push(if arr.is_null(i) {
            Value::Null
        } else {
            let v: i64 = arr.value(i).into();
            Value::from(v)
        });
    }
}

fn convert_unsigned<T: ArrowPrimitiveType>(array: &dyn Array, values: &mut Vec<Value>)
where
    T::Native: Into<u64>,
{
    let arr = as_primitive_array::<T>(array);
    for i in 0..arr.len() {
        values.push(if arr.is_null(i) {
            Value::Null
        } else {
            let v: u64 = arr.value(i).into();
            Value::from(v)
        });
    }
}

/// JSON numbers cannot hold NaN or infinities; those become null
fn json_float(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn convert_timestamp(array: &dyn Array, unit: &TimeUnit, values: &mut Vec<Value>) -> Result<()> {
    match unit {
        TimeUnit::Second => {
            let arr = as_primitive_array::<TimestampSecondType>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    let datetime = chrono::DateTime::from_timestamp(arr.value(i), 0)
                        .context("Invalid timestamp")?;
                    Value::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
                });
            }
        }
        TimeUnit::Millisecond => {
            let arr = as_primitive_array::<TimestampMillisecondType>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    let datetime = chrono::DateTime::from_timestamp_millis(arr.value(i))
                        .context("Invalid timestamp")?;
                    Value::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
                });
            }
        }
        TimeUnit::Microsecond => {
            let arr = as_primitive_array::<TimestampMicrosecondType>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    let datetime = chrono::DateTime::from_timestamp_micros(arr.value(i))
                        .context("Invalid timestamp")?;
                    Value::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
                });
            }
        }
        TimeUnit::Nanosecond => {
            let arr = as_primitive_array::<TimestampNanosecondType>(array);
            for i in 0..arr.len() {
                values.push(if arr.is_null(i) {
                    Value::Null
                } else {
                    let datetime = chrono::DateTime::from_timestamp_nanos(arr.value(i));
                    Value::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
                });
            }
        }
    }
    Ok(())
}

/// Format a Decimal128 value with the given scale. The sign is formatted
/// apart from the magnitude so values between -1 and 0 keep it.
fn format_decimal128(value: i128, scale: u32) -> String {
    if scale == 0 {
        return value.to_string();
    }

    let divisor = 10_u128.pow(scale);
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    let int_part = magnitude / divisor;
    let frac_part = magnitude % divisor;

    format!("{}{}.{:0width$}", sign, int_part, frac_part, width = scale as usize)
}
