//! Table, Row, and Cell data structures

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{Result, StudioError};

use super::convert::parse_cell;
use super::schema::{Column, ColumnType};

/// A cell value with type information
#[derive(Debug, Clone)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Cow<'static, str>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => {
                // NaN equals NaN so edited tables compare stable
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (CellValue::String(a), CellValue::String(b)) => a == b,
            (CellValue::Date(a), CellValue::Date(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Null => {}
            CellValue::Bool(b) => b.hash(state),
            CellValue::Int(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::String(s) => s.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
        }
    }
}

impl CellValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Convert to a display string
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed("NULL"),
            CellValue::Bool(b) => Cow::Owned(b.to_string()),
            CellValue::Int(i) => Cow::Owned(i.to_string()),
            CellValue::Float(f) => Cow::Owned(f.to_string()),
            CellValue::String(s) => Cow::Borrowed(s.as_ref()),
            CellValue::Date(d) => Cow::Owned(d.to_string()),
            CellValue::DateTime(dt) => Cow::Owned(dt.to_string()),
        }
    }

    /// Plain JSON rendering, dates as ISO strings
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Int(i) => serde_json::json!(*i),
            CellValue::Float(f) => serde_json::json!(*f),
            CellValue::String(s) => serde_json::Value::String(s.to_string()),
            CellValue::Date(d) => serde_json::Value::String(d.to_string()),
            CellValue::DateTime(dt) => serde_json::Value::String(dt.to_string()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(Cow::Owned(s.to_string()))
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(Cow::Owned(s))
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

/// A row in the table
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Cell values in column order
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }
}

/// An editable table: ordered typed columns and ordered rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// All rows in the table
    pub rows: Vec<Row>,
}

impl Table {
    /// Create a new empty table with column definitions
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row of already-typed cells
    pub fn push_row(&mut self, cells: Vec<CellValue>) {
        self.rows.push(Row::new(cells));
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column types in order
    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Header text of a column, empty when out of range
    pub fn header(&self, column: usize) -> String {
        self.columns
            .get(column)
            .map(Column::header)
            .unwrap_or_default()
    }

    /// Cell at the given position
    pub fn value(&self, row: usize, column: usize) -> Option<&CellValue> {
        if column >= self.columns.len() {
            return None;
        }
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Convert `text` to the column's type and store it
    ///
    /// On a conversion error the previous value is kept.
    pub fn set_value(&mut self, row: usize, column: usize, text: Option<&str>) -> Result<()> {
        if row >= self.rows.len() || column >= self.columns.len() {
            return Err(StudioError::CellOutOfRange {
                row,
                column,
                rows: self.rows.len(),
                columns: self.columns.len(),
            });
        }

        let value = parse_cell(text, self.columns[column].column_type)?;
        let cells = &mut self.rows[row].cells;
        if cells.len() <= column {
            cells.resize(column + 1, CellValue::Null);
        }
        cells[column] = value;
        Ok(())
    }

    /// Append a row of type defaults and return its index
    pub fn add_row(&mut self) -> usize {
        let cells = self
            .columns
            .iter()
            .map(|c| c.column_type.default_value())
            .collect();
        self.rows.push(Row::new(cells));
        self.rows.len() - 1
    }

    /// Remove one row, returns false when the index is out of range
    pub fn delete_row(&mut self, row: usize) -> bool {
        if row < self.rows.len() {
            self.rows.remove(row);
            true
        } else {
            false
        }
    }

    /// Remove several rows, returns how many were actually removed
    pub fn delete_rows(&mut self, rows: &[usize]) -> usize {
        let unique: FxHashSet<usize> = rows.iter().copied().collect();
        let mut sorted: Vec<usize> = unique.into_iter().collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));

        sorted.into_iter().filter(|&r| self.delete_row(r)).count()
    }

    /// Add a column filled with the type default; returns its index
    pub fn add_column(&mut self, name: &str, type_name: &str) -> Result<usize> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StudioError::invalid_column("Column name cannot be empty"));
        }
        if type_name.trim().is_empty() {
            return Err(StudioError::invalid_column("Column type cannot be empty"));
        }
        if self.column_index(name).is_some() {
            return Err(StudioError::invalid_column(format!(
                "Column name already exists: {}",
                name
            )));
        }

        let column_type = ColumnType::normalize(type_name);
        let index = self.columns.len();
        self.columns.push(Column::new(name, index, column_type));

        let default = column_type.default_value();
        for row in &mut self.rows {
            row.cells.resize(index, CellValue::Null);
            row.cells.push(default.clone());
        }

        debug!(column = name, %column_type, index, "column added");
        Ok(index)
    }

    /// Remove a column; the last remaining column cannot be removed
    pub fn delete_column(&mut self, index: usize) -> Result<Column> {
        if index >= self.columns.len() {
            return Err(StudioError::invalid_column(format!(
                "Invalid column index: {}",
                index
            )));
        }
        if self.columns.len() <= 1 {
            return Err(StudioError::invalid_column(
                "Cannot delete the last column. A table must have at least one column.",
            ));
        }

        let removed = self.columns.remove(index);
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.index = i;
        }
        for row in &mut self.rows {
            if index < row.cells.len() {
                row.cells.remove(index);
            }
        }
        Ok(removed)
    }

    /// Indices of rows where any cell contains `text`, ignoring case
    pub fn search(&self, text: &str) -> Vec<usize> {
        if text.trim().is_empty() {
            return (0..self.rows.len()).collect();
        }
        let needle = text.to_lowercase();

        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.cells
                    .iter()
                    .filter(|c| !c.is_null())
                    .any(|c| c.display().to_lowercase().contains(&needle))
            })
            .map(|(i, _)| i)
            .collect()
    }
}
