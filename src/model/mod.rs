//! Data model for tabular data representation

mod convert;
mod schema;
mod table;

pub use convert::{parse_cell, parse_timestamp};
pub use schema::{Column, ColumnType};
pub use table::{CellValue, Row, Table};
