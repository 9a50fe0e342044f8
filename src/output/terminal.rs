//! Colored terminal output

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tabled::builder::Builder;
use tabled::settings::Style;
use termcolor::{Ansi, Color, ColorSpec, NoColor, WriteColor};

use crate::model::Table;

use super::{status_line, OutputFormatter};

/// Terminal output: an aligned grid followed by a status line
pub struct TerminalOutput {
    color: bool,
}

impl TerminalOutput {
    pub fn new() -> Self {
        Self { color: true }
    }

    pub fn with_color(color: bool) -> Self {
        Self { color }
    }

    fn write_report<W: WriteColor>(
        &self,
        out: &mut W,
        table: &Table,
        rows: &[usize],
        source: &Path,
    ) -> Result<()> {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(out, "{}", source.display())?;
        out.reset()?;

        writeln!(out, "{}", build_grid(table, rows))?;

        out.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(out, "{}", status_line(table, rows.len(), source))?;
        out.reset()?;
        Ok(())
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TerminalOutput {
    fn render(
        &self,
        table: &Table,
        rows: &[usize],
        source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()> {
        if self.color {
            self.write_report(&mut Ansi::new(writer), table, rows, source)
        } else {
            self.write_report(&mut NoColor::new(writer), table, rows, source)
        }
    }
}

/// Grid with `name (TYPE)` headers
fn build_grid(table: &Table, rows: &[usize]) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns.iter().map(|c| c.header()));

    for &row in rows {
        builder.push_record((0..table.column_count()).map(|col| {
            table
                .value(row, col)
                .map(|v| v.display().into_owned())
                .unwrap_or_default()
        }));
    }

    let mut grid = builder.build();
    grid.with(Style::modern());
    grid.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, Column, ColumnType};

    fn sample() -> Table {
        let mut table = Table::new(vec![
            Column::new("id", 0, ColumnType::Integer),
            Column::new("city", 1, ColumnType::Varchar),
        ]);
        table.push_row(vec![CellValue::Int(1), CellValue::from("Lima")]);
        table.push_row(vec![CellValue::Int(2), CellValue::Null]);
        table
    }

    fn render(rows: &[usize]) -> String {
        let mut out = Vec::new();
        TerminalOutput::with_color(false)
            .render(&sample(), rows, Path::new("cities.parquet"), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_render_plain() {
        let text = render(&[0, 1]);
        assert!(text.starts_with("cities.parquet\n"));
        assert!(text.contains("id (INTEGER)"));
        assert!(text.contains("city (VARCHAR)"));
        assert!(text.contains("Lima"));
        assert!(text.contains("NULL"));
        assert!(text.trim_end().ends_with("Rows: 2 | File: cities.parquet"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_render_filtered() {
        let text = render(&[0]);
        assert!(!text.contains("NULL"));
        assert!(text.contains("Rows: 2 (filtered: 1) | File: cities.parquet"));

        let none = render(&[]);
        assert!(none.contains("id (INTEGER)"));
        assert!(!none.contains("Lima"));
        assert!(none.contains("Rows: 2 (filtered: 0) | File: cities.parquet"));
    }

    #[test]
    fn test_render_colored() {
        let mut out = Vec::new();
        TerminalOutput::new()
            .render(&sample(), &[0], Path::new("cities.parquet"), &mut out)
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains('\u{1b}'));
    }
}
