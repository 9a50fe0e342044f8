//! CSV output format

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{CellValue, Table};

use super::OutputFormatter;

/// CSV output formatter; nulls are written as empty fields
pub struct CsvOutput;

impl CsvOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for CsvOutput {
    fn render(
        &self,
        table: &Table,
        rows: &[usize],
        _source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer
            .write_record(table.column_names())
            .context("Failed to write CSV header")?;

        for &row in rows {
            let record = (0..table.column_count()).map(|col| match table.value(row, col) {
                None | Some(CellValue::Null) => String::new(),
                Some(value) => value.display().into_owned(),
            });
            csv_writer
                .write_record(record)
                .with_context(|| format!("Failed to write CSV row {}", row))?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
