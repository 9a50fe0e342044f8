//! JSON output format

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{CellValue, Table};

use super::OutputFormatter;

/// JSON output formatter
pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonColumn<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    column_type: String,
}

#[derive(Serialize)]
struct JsonTable<'a> {
    file: String,
    columns: Vec<JsonColumn<'a>>,
    total_rows: usize,
    rows: Vec<IndexMap<&'a str, serde_json::Value>>,
}

impl OutputFormatter for JsonOutput {
    fn render(
        &self,
        table: &Table,
        rows: &[usize],
        source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let columns = table
            .columns
            .iter()
            .map(|c| JsonColumn {
                name: &c.name,
                column_type: c.column_type.to_string(),
            })
            .collect();

        let rows = rows
            .iter()
            .map(|&row| {
                table
                    .columns
                    .iter()
                    .map(|c| {
                        let value = table
                            .value(row, c.index)
                            .map_or(serde_json::Value::Null, CellValue::to_json);
                        (c.name.as_str(), value)
                    })
                    .collect()
            })
            .collect();

        let output = JsonTable {
            file: source.display().to_string(),
            columns,
            total_rows: table.row_count(),
            rows,
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &output)?;
        } else {
            serde_json::to_writer(&mut *writer, &output)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}
