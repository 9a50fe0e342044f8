//! Arrow record batches to the in-memory table

use std::borrow::Cow;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::datatypes::{
    DataType as ArrowType, Date64Type, Float16Type, Float32Type, Float64Type, Int16Type,
    Int32Type, Int64Type, Int8Type, Schema, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, NaiveDate};
use rayon::prelude::*;

use crate::model::{CellValue, Column, ColumnType, Table};

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Editor columns for an Arrow schema
pub fn columns_from_schema(schema: &Schema) -> Vec<Column> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            Column::new(
                field.name().clone(),
                i,
                ColumnType::from_arrow(field.data_type()),
            )
        })
        .collect()
}

/// Build a table from a schema and the batches of a result set
///
/// Batches are converted in parallel; row order follows batch order.
pub fn batches_to_table(schema: &Schema, batches: &[RecordBatch]) -> Table {
    let mut table = Table::new(columns_from_schema(schema));

    let converted: Vec<Vec<Vec<CellValue>>> = batches.par_iter().map(batch_rows).collect();
    table.rows.reserve(batches.iter().map(RecordBatch::num_rows).sum());
    for cells in converted.into_iter().flatten() {
        table.push_row(cells);
    }

    table
}

fn batch_rows(batch: &RecordBatch) -> Vec<Vec<CellValue>> {
    (0..batch.num_rows())
        .map(|row_idx| {
            batch
                .columns()
                .iter()
                .map(|col| extract_cell_value(col, row_idx))
                .collect()
        })
        .collect()
}

/// Read one cell out of an Arrow array
pub fn extract_cell_value(array: &ArrayRef, row_idx: usize) -> CellValue {
    if array.is_null(row_idx) {
        return CellValue::Null;
    }

    match array.data_type() {
        ArrowType::Boolean => CellValue::Bool(array.as_boolean().value(row_idx)),
        ArrowType::Int8 => CellValue::Int(array.as_primitive::<Int8Type>().value(row_idx) as i64),
        ArrowType::Int16 => {
            CellValue::Int(array.as_primitive::<Int16Type>().value(row_idx) as i64)
        }
        ArrowType::Int32 => {
            CellValue::Int(array.as_primitive::<Int32Type>().value(row_idx) as i64)
        }
        ArrowType::Int64 => CellValue::Int(array.as_primitive::<Int64Type>().value(row_idx)),
        ArrowType::UInt8 => {
            CellValue::Int(array.as_primitive::<UInt8Type>().value(row_idx) as i64)
        }
        ArrowType::UInt16 => {
            CellValue::Int(array.as_primitive::<UInt16Type>().value(row_idx) as i64)
        }
        ArrowType::UInt32 => {
            CellValue::Int(array.as_primitive::<UInt32Type>().value(row_idx) as i64)
        }
        ArrowType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row_idx);
            // Past i64::MAX the value is kept as text
            match i64::try_from(v) {
                Ok(i) => CellValue::Int(i),
                Err(_) => CellValue::String(Cow::Owned(v.to_string())),
            }
        }
        ArrowType::Float16 => {
            CellValue::Float(array.as_primitive::<Float16Type>().value(row_idx).to_f64())
        }
        ArrowType::Float32 => {
            CellValue::Float(array.as_primitive::<Float32Type>().value(row_idx) as f64)
        }
        ArrowType::Float64 => {
            CellValue::Float(array.as_primitive::<Float64Type>().value(row_idx))
        }
        ArrowType::Utf8 => CellValue::String(Cow::Owned(
            array.as_string::<i32>().value(row_idx).to_string(),
        )),
        ArrowType::LargeUtf8 => CellValue::String(Cow::Owned(
            array.as_string::<i64>().value(row_idx).to_string(),
        )),
        ArrowType::Utf8View => CellValue::String(Cow::Owned(
            array.as_string_view().value(row_idx).to_string(),
        )),
        ArrowType::Date32 => {
            let days = array.as_primitive::<arrow::datatypes::Date32Type>().value(row_idx);
            match NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE) {
                Some(date) => CellValue::Date(date),
                None => CellValue::Int(days as i64),
            }
        }
        ArrowType::Date64 => {
            let millis = array.as_primitive::<Date64Type>().value(row_idx);
            match DateTime::from_timestamp_millis(millis) {
                Some(dt) => CellValue::Date(dt.date_naive()),
                None => CellValue::Int(millis),
            }
        }
        ArrowType::Timestamp(unit, _) => {
            let (raw, datetime) = match unit {
                TimeUnit::Second => {
                    let v = array.as_primitive::<TimestampSecondType>().value(row_idx);
                    (v, DateTime::from_timestamp(v, 0))
                }
                TimeUnit::Millisecond => {
                    let v = array.as_primitive::<TimestampMillisecondType>().value(row_idx);
                    (v, DateTime::from_timestamp_millis(v))
                }
                TimeUnit::Microsecond => {
                    let v = array.as_primitive::<TimestampMicrosecondType>().value(row_idx);
                    (v, DateTime::from_timestamp_micros(v))
                }
                TimeUnit::Nanosecond => {
                    let v = array.as_primitive::<TimestampNanosecondType>().value(row_idx);
                    (v, Some(DateTime::from_timestamp_nanos(v)))
                }
            };
            match datetime {
                Some(dt) => CellValue::DateTime(dt.naive_utc()),
                None => CellValue::Int(raw),
            }
        }
        _ => {
            // Decimals, binary and nested types are shown as text
            match ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default()) {
                Ok(fmt) => CellValue::String(Cow::Owned(fmt.value(row_idx).to_string())),
                Err(_) => CellValue::Null,
            }
        }
    }
}
