//! Configuration handling for parquet-studio

use parquet::basic::{Compression, ZstdLevel};

/// Output format for rendered tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Csv,
    Html,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Compression codec for written Parquet files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParquetCompression {
    #[default]
    Snappy,
    Zstd,
    Uncompressed,
}

impl ParquetCompression {
    pub fn codec(self) -> Compression {
        match self {
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
        }
    }
}

impl std::str::FromStr for ParquetCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snappy" => Ok(ParquetCompression::Snappy),
            "zstd" => Ok(ParquetCompression::Zstd),
            "none" | "uncompressed" => Ok(ParquetCompression::Uncompressed),
            _ => Err(format!("Unknown compression: {}", s)),
        }
    }
}

/// Configuration shared by the engine, the session and the renderers
#[derive(Debug, Clone)]
pub struct Config {
    /// Table name a file is registered under for SQL queries
    pub table_name: String,
    /// Output format
    pub output_format: OutputFormat,
    /// Maximum number of rows rendered, `None` for all
    pub row_limit: Option<usize>,
    /// Colour terminal output
    pub color: bool,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Log line format
    pub log_format: LogFormat,
    /// Codec for written files
    pub compression: ParquetCompression,
    /// Rows per row group in written files
    pub max_row_group_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_name: "data".to_string(),
            output_format: OutputFormat::default(),
            row_limit: None,
            color: true,
            log_level: "warn".to_string(),
            log_format: LogFormat::default(),
            compression: ParquetCompression::default(),
            max_row_group_size: 64 * 1024,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query table name
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Set output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Limit rendered rows
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = Some(limit);
        self
    }

    /// Enable or disable coloured output
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Set the default log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set log line format
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Set compression for written files
    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Set rows per row group for written files
    pub fn with_max_row_group_size(mut self, rows: usize) -> Self {
        self.max_row_group_size = rows.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_format() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .with_table_name("events")
            .with_row_limit(10)
            .with_compression("zstd".parse().unwrap())
            .with_max_row_group_size(0);
        assert_eq!(config.table_name, "events");
        assert_eq!(config.row_limit, Some(10));
        assert_eq!(config.compression, ParquetCompression::Zstd);
        assert_eq!(config.max_row_group_size, 1);
    }
}
