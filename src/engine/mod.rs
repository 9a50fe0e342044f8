//! Query execution over Parquet files
//!
//! [`QueryEngine`] owns one DataFusion session and a private current-thread
//! runtime, and exposes a synchronous load/query/save API. The session layer
//! only sees it through [`TableStore`].

mod batch;
mod materialize;
mod writer;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::Expr;
use datafusion::prelude::{cast, ident, ParquetReadOptions, SessionConfig, SessionContext};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, StudioError};
use crate::model::{Column, ColumnType, Table};

pub use self::batch::table_to_batch;
pub use self::materialize::{batches_to_table, columns_from_schema, extract_cell_value};
pub use self::writer::{write_parquet_file, writer_properties};

/// Storage backend behind an editing session
pub trait TableStore: Send + Sync {
    /// Column names and types of a file, without reading its rows
    fn describe(&self, path: &Path) -> Result<Vec<Column>>;

    /// Read every row of a file in file order
    fn load(&self, path: &Path) -> Result<Table>;

    /// Write `table` to `path`, casting column `i` to `target_types[i]`
    ///
    /// With no target types each column keeps its current type.
    fn save(&self, path: &Path, table: &Table, target_types: Option<&[ColumnType]>)
        -> Result<usize>;

    /// Check if this store handles the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}

/// DataFusion-backed Parquet engine
pub struct QueryEngine {
    ctx: SessionContext,
    runtime: Runtime,
    config: Config,
}

impl QueryEngine {
    pub fn new(config: Config) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        // One partition keeps scan output in file order
        let ctx = SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1));

        Ok(Self {
            ctx,
            runtime,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `sql` against `path`, registered under the configured table name
    pub fn query(&self, path: &Path, sql: &str) -> Result<Table> {
        let path = self.resolve(path)?;
        let location = path.to_string_lossy().into_owned();
        let name = self.config.table_name.as_str();

        info!(path = %path.display(), table = name, "running query");
        self.runtime.block_on(self.run_sql(name, &location, sql))
    }

    async fn run_sql(&self, name: &str, location: &str, sql: &str) -> Result<Table> {
        self.ctx.deregister_table(name)?;
        self.ctx
            .register_parquet(name, location, read_options())
            .await?;
        let df = self.ctx.sql(sql).await?;
        collect_table(df).await
    }

    async fn project(
        &self,
        staging: &str,
        exprs: Vec<Expr>,
    ) -> Result<(SchemaRef, Vec<RecordBatch>)> {
        let df = self.ctx.table(staging).await?.select(exprs)?;
        let schema = Arc::new(df.schema().as_arrow().clone());
        let batches = df.collect().await?;
        Ok((schema, batches))
    }

    fn read(&self, path: &Path) -> Result<DataFrame> {
        let location = path.to_string_lossy().into_owned();
        let df = self
            .runtime
            .block_on(self.ctx.read_parquet(location, read_options()))?;
        Ok(df)
    }

    /// Existing, canonical path of a file the engine can read
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        if !path.is_file() {
            return Err(StudioError::FileNotFound(path.to_path_buf()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !self.supports_extension(&ext) && detect_format(path) != Some("parquet") {
            return Err(StudioError::UnsupportedFormat(path.to_path_buf()));
        }

        Ok(path.canonicalize()?)
    }
}

impl TableStore for QueryEngine {
    fn describe(&self, path: &Path) -> Result<Vec<Column>> {
        let path = self.resolve(path)?;
        let df = self.read(&path)?;
        Ok(columns_from_schema(df.schema().as_arrow()))
    }

    fn load(&self, path: &Path) -> Result<Table> {
        let path = self.resolve(path)?;
        let df = self.read(&path)?;
        let table = self.runtime.block_on(collect_table(df))?;

        info!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "parquet file loaded"
        );
        Ok(table)
    }

    fn save(
        &self,
        path: &Path,
        table: &Table,
        target_types: Option<&[ColumnType]>,
    ) -> Result<usize> {
        if table.column_count() == 0 {
            return Err(StudioError::NoColumns);
        }

        let current = table.column_types();
        let targets = target_types.unwrap_or(&current);
        if targets.len() != table.column_count() {
            return Err(StudioError::invalid_column(format!(
                "Expected {} target types, got {}",
                table.column_count(),
                targets.len()
            )));
        }

        let batch = table_to_batch(table)?;
        let staging = format!("staging_{}", chrono::Utc::now().timestamp_millis());
        let exprs = table
            .columns
            .iter()
            .zip(targets)
            .map(|(column, target)| {
                cast(ident(&column.name), target.arrow_type()).alias(&column.name)
            })
            .collect::<Vec<Expr>>();

        self.ctx.register_batch(&staging, batch)?;
        let projected = self.runtime.block_on(self.project(&staging, exprs));
        self.ctx.deregister_table(staging.as_str())?;
        let (schema, batches) = projected?;
        debug!(staging = %staging, batches = batches.len(), "staging table projected");

        let rows = write_parquet_file(path, schema, &batches, writer_properties(&self.config))?;
        info!(path = %path.display(), rows, "parquet file saved");
        Ok(rows)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "parquet" | "pq")
    }
}

fn read_options() -> ParquetReadOptions<'static> {
    // Accept any file name; the caller already checked the format
    ParquetReadOptions {
        file_extension: "",
        ..Default::default()
    }
}

async fn collect_table(df: DataFrame) -> Result<Table> {
    let schema = df.schema().as_arrow().clone();
    let batches = df.collect().await?;
    Ok(batches_to_table(&schema, &batches))
}

/// Detect file format from content
pub fn detect_format(path: &Path) -> Option<&'static str> {
    let mut file = File::open(path).ok()?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).ok()?;

    (&magic == b"PAR1").then_some("parquet")
}
