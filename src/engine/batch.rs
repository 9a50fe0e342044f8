//! In-memory table to an Arrow record batch

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, Int32Builder, Int64Builder,
    RecordBatch, RecordBatchOptions, StringBuilder, TimestampMicrosecondBuilder,
};
use arrow::datatypes::{Field, Schema};
use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::error::{Result, StudioError};
use crate::model::{CellValue, ColumnType, Table};

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

static NULL_CELL: CellValue = CellValue::Null;

/// Encode a table as one record batch in its current column types
///
/// Every field is nullable. Cells are coerced where the conversion is
/// lossless or textual; anything else is a `TypeMismatch`.
pub fn table_to_batch(table: &Table) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|c| Field::new(c.name.clone(), c.column_type.arrow_type(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays = (0..table.column_count())
        .map(|idx| build_array(table, idx))
        .collect::<Result<Vec<ArrayRef>>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(table.row_count()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

fn build_array(table: &Table, idx: usize) -> Result<ArrayRef> {
    let column_type = table.columns[idx].column_type;
    let cells = table
        .rows
        .iter()
        .map(|row| row.get(idx).unwrap_or(&NULL_CELL));
    let mismatch = |row: usize| StudioError::TypeMismatch {
        column: table.columns[idx].name.clone(),
        row,
        expected: column_type.to_string(),
    };

    let array: ArrayRef = match column_type {
        ColumnType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(table.row_count());
            for (row, cell) in cells.enumerate() {
                match cell {
                    CellValue::Null => builder.append_null(),
                    CellValue::Bool(b) => builder.append_value(*b),
                    _ => return Err(mismatch(row)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Integer => {
            let mut builder = Int32Builder::with_capacity(table.row_count());
            for (row, cell) in cells.enumerate() {
                match cell {
                    CellValue::Null => builder.append_null(),
                    CellValue::Int(i) => {
                        builder.append_value(i32::try_from(*i).map_err(|_| mismatch(row))?)
                    }
                    _ => return Err(mismatch(row)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::BigInt => {
            let mut builder = Int64Builder::with_capacity(table.row_count());
            for (row, cell) in cells.enumerate() {
                match cell {
                    CellValue::Null => builder.append_null(),
                    CellValue::Int(i) => builder.append_value(*i),
                    _ => return Err(mismatch(row)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Double => {
            let mut builder = Float64Builder::with_capacity(table.row_count());
            for (row, cell) in cells.enumerate() {
                match cell {
                    CellValue::Null => builder.append_null(),
                    CellValue::Float(f) => builder.append_value(*f),
                    CellValue::Int(i) => builder.append_value(*i as f64),
                    _ => return Err(mismatch(row)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Date => {
            let mut builder = Date32Builder::with_capacity(table.row_count());
            for (row, cell) in cells.enumerate() {
                match cell {
                    CellValue::Null => builder.append_null(),
                    CellValue::Date(d) => builder.append_value(days_since_epoch(*d)),
                    CellValue::DateTime(dt) => builder.append_value(days_since_epoch(dt.date())),
                    _ => return Err(mismatch(row)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Timestamp => {
            let mut builder = TimestampMicrosecondBuilder::with_capacity(table.row_count());
            for (row, cell) in cells.enumerate() {
                match cell {
                    CellValue::Null => builder.append_null(),
                    CellValue::DateTime(dt) => builder.append_value(dt.and_utc().timestamp_micros()),
                    CellValue::Date(d) => {
                        builder.append_value(d.and_time(NaiveTime::MIN).and_utc().timestamp_micros())
                    }
                    _ => return Err(mismatch(row)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Varchar => {
            let mut builder = StringBuilder::with_capacity(table.row_count(), table.row_count() * 8);
            for cell in cells {
                match cell {
                    CellValue::Null => builder.append_null(),
                    other => builder.append_value(other.display()),
                }
            }
            Arc::new(builder.finish())
        }
    };

    Ok(array)
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}
