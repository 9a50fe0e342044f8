//! Parquet file writer
//!
//! Writes go to a hidden sibling file first and are renamed over the
//! destination once the footer is flushed. The sibling is removed when either
//! step fails.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use tracing::debug;

use crate::config::Config;
use crate::error::Result;

pub fn writer_properties(config: &Config) -> WriterProperties {
    WriterProperties::builder()
        .set_dictionary_enabled(true)
        .set_statistics_enabled(EnabledStatistics::Page)
        .set_compression(config.compression.codec())
        .set_max_row_group_size(config.max_row_group_size)
        .set_created_by(format!("parquet-studio {}", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Write batches sharing `schema` into a Parquet file at `path`
///
/// Returns the number of rows written.
pub fn write_parquet_file(
    path: &Path,
    schema: SchemaRef,
    batches: &[RecordBatch],
    props: WriterProperties,
) -> Result<usize> {
    let staging = staging_path(path);

    let written = write_into(&staging, schema, batches, props)
        .and_then(|rows| fs::rename(&staging, path).map(|()| rows).map_err(Into::into));

    match written {
        Ok(rows) => {
            debug!(path = %path.display(), rows, "parquet file written");
            Ok(rows)
        }
        Err(e) => {
            let _ = fs::remove_file(&staging);
            Err(e)
        }
    }
}

fn write_into(
    path: &Path,
    schema: SchemaRef,
    batches: &[RecordBatch],
    props: WriterProperties,
) -> Result<usize> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), schema, Some(props))?;

    let mut rows = 0;
    for batch in batches {
        writer.write(batch)?;
        rows += batch.num_rows();
    }
    let mut inner = writer.into_inner()?;
    inner.flush()?;

    Ok(rows)
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.parquet".to_string());
    path.with_file_name(format!(".{}.{}.partial", name, std::process::id()))
}
