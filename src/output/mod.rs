//! Rendering of tables and row selections

mod csv;
mod html;
mod json;
mod terminal;

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use crate::config::{Config, OutputFormat};
use crate::model::Table;

pub use self::csv::CsvOutput;
pub use html::HtmlOutput;
pub use json::JsonOutput;
pub use terminal::TerminalOutput;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Render the rows at `rows` (indices into `table`) to a writer
    fn render(
        &self,
        table: &Table,
        rows: &[usize],
        source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()>;
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter for the configured format
    pub fn create(config: &Config) -> Box<dyn OutputFormatter> {
        match config.output_format {
            OutputFormat::Terminal => Box::new(TerminalOutput::with_color(config.color)),
            OutputFormat::Json => Box::new(JsonOutput::new()),
            OutputFormat::Csv => Box::new(CsvOutput::new()),
            OutputFormat::Html => Box::new(HtmlOutput::new()),
        }
    }
}

/// Row indices to show: the search matches, cut to the row limit
pub fn select_rows(table: &Table, search: Option<&str>, limit: Option<usize>) -> Vec<usize> {
    let mut rows = match search {
        Some(text) => table.search(text),
        None => (0..table.row_count()).collect(),
    };
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

/// Render a selection of rows to stdout
pub fn render_to_stdout(
    table: &Table,
    rows: &[usize],
    source: &Path,
    config: &Config,
) -> Result<()> {
    let formatter = OutputFactory::create(config);
    let mut stdout = std::io::stdout().lock();
    formatter.render(table, rows, source, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

/// `Rows: N | File: name`, with the shown count when rows are filtered out
pub fn status_line(table: &Table, shown: usize, source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());

    if shown < table.row_count() {
        format!(
            "Rows: {} (filtered: {}) | File: {}",
            table.row_count(),
            shown,
            name
        )
    } else {
        format!("Rows: {} | File: {}", table.row_count(), name)
    }
}
