//! HTML page output

use std::io::Write;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Serialize;
use tera::{Context, Tera};

use crate::model::{CellValue, Table};

use super::{status_line, OutputFormatter};

/// Standalone HTML page rendered through a tera template
pub struct HtmlOutput;

impl HtmlOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct HtmlCell {
    text: String,
    null: bool,
}

impl OutputFormatter for HtmlOutput {
    fn render(
        &self,
        table: &Table,
        rows: &[usize],
        source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let headers: Vec<String> = table.columns.iter().map(|c| c.header()).collect();
        let body: Vec<Vec<HtmlCell>> = rows
            .iter()
            .map(|&row| {
                (0..table.column_count())
                    .map(|col| match table.value(row, col) {
                        None | Some(CellValue::Null) => HtmlCell {
                            text: "NULL".to_string(),
                            null: true,
                        },
                        Some(value) => HtmlCell {
                            text: value.display().into_owned(),
                            null: false,
                        },
                    })
                    .collect()
            })
            .collect();

        let mut context = Context::new();
        context.insert("title", &source.display().to_string());
        context.insert("headers", &headers);
        context.insert("rows", &body);
        context.insert("status", &status_line(table, rows.len(), source));
        context.insert("css", CSS_STYLES);

        let page = Tera::one_off(TEMPLATE, &context, true).context("Failed to render HTML")?;
        writer.write_all(page.as_bytes())?;
        Ok(())
    }
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{ title }}</title>
  <style>{{ css | safe }}</style>
</head>
<body>
  <div class="header">
    <h1>parquet-studio</h1>
    <p class="files">{{ title }}</p>
  </div>
  <table>
    <tr>
{%- for header in headers %}
      <th>{{ header }}</th>
{%- endfor %}
    </tr>
{%- for row in rows %}
    <tr>
{%- for cell in row %}
      <td{% if cell.null %} class="null"{% endif %}>{{ cell.text }}</td>
{%- endfor %}
    </tr>
{%- endfor %}
  </table>
  <div class="footer">{{ status }}</div>
</body>
</html>
"#;

const CSS_STYLES: &str = r#"
    :root {
      --bg: #1a1b26;
      --fg: #a9b1d6;
      --accent: #7aa2f7;
      --muted: #565f89;
      --border: #414868;
    }

    * { box-sizing: border-box; margin: 0; padding: 0; }

    body {
      font-family: 'JetBrains Mono', 'Fira Code', monospace;
      background: var(--bg);
      color: var(--fg);
      padding: 2rem;
      line-height: 1.6;
    }

    .header {
      border-bottom: 2px solid var(--border);
      padding-bottom: 1rem;
      margin-bottom: 2rem;
    }

    .header h1 { color: var(--accent); font-size: 2rem; font-weight: 600; }
    .header .files { opacity: 0.8; margin-top: 0.5rem; }

    table { width: 100%; border-collapse: collapse; margin-bottom: 1rem; }
    th, td { text-align: left; padding: 0.5rem 0.75rem; border: 1px solid var(--border); }
    th { background: rgba(255,255,255,0.05); font-weight: 600; }
    td.null { color: var(--muted); font-style: italic; }

    .footer {
      margin-top: 2rem;
      padding-top: 1rem;
      border-top: 1px solid var(--border);
      opacity: 0.6;
      font-size: 0.875rem;
    }
"#;
