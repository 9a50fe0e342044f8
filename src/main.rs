//! parquet-studio - View and edit Parquet files

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use parquet_studio::config::{Config, LogFormat, OutputFormat, ParquetCompression};
use parquet_studio::output::{render_to_stdout, select_rows};
use parquet_studio::telemetry::init_tracing;
use parquet_studio::{EditorSession, QueryEngine, SaveOptions, TableStore};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
    Csv,
    Html,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Csv => OutputFormat::Csv,
            CliOutputFormat::Html => OutputFormat::Html,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Text,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(f: CliLogFormat) -> Self {
        match f {
            CliLogFormat::Text => LogFormat::Text,
            CliLogFormat::Json => LogFormat::Json,
        }
    }
}

/// View, query and edit Parquet files
#[derive(Parser, Debug)]
#[command(name = "parquet-studio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: CliLogFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the rows of a file
    Show {
        file: PathBuf,

        #[command(flatten)]
        view: ViewArgs,

        /// Only rows with a cell containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Print the schema of a file, or its transform against a schema file
    Schema {
        file: PathBuf,

        /// Schema file (.schema or .json) to match against
        #[arg(long)]
        transform: Option<PathBuf>,
    },

    /// Run SQL against a file
    Query {
        file: PathBuf,

        sql: String,

        /// Table name the file is registered under
        #[arg(long, default_value = "data")]
        table: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Edit a file and write the result
    Edit(EditArgs),
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: CliOutputFormat,

    /// Maximum number of rows to print
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct EditArgs {
    file: PathBuf,

    /// Append N rows filled with type defaults
    #[arg(long, value_name = "N")]
    add_row: Option<usize>,

    /// Set a cell; COLUMN is a name or a 0-based index, an empty VALUE is null
    #[arg(long = "set", value_name = "ROW:COLUMN=VALUE", value_parser = parse_assignment)]
    set: Vec<Assignment>,

    /// Add a column
    #[arg(long, value_name = "NAME:TYPE", value_parser = parse_column_spec)]
    add_column: Vec<(String, String)>,

    /// Delete a column by name
    #[arg(long, value_name = "NAME")]
    drop_column: Vec<String>,

    /// Delete a row by 0-based index
    #[arg(long, value_name = "N")]
    delete_row: Vec<usize>,

    /// Write columns with the types declared in this schema file
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Require the schema file to declare exactly the file's columns
    #[arg(long, requires = "schema")]
    strict: bool,

    /// Destination; `.parquet` is appended when missing. Defaults to FILE
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing destination
    #[arg(long)]
    force: bool,

    /// Compression codec for the written file
    #[arg(long, default_value = "snappy")]
    compression: ParquetCompression,

    /// Rows per row group in the written file
    #[arg(long)]
    row_group_size: Option<usize>,
}

#[derive(Debug, Clone)]
struct Assignment {
    row: usize,
    column: String,
    value: String,
}

fn parse_assignment(s: &str) -> Result<Assignment, String> {
    let (target, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROW:COLUMN=VALUE, got '{}'", s))?;
    let (row, column) = target
        .split_once(':')
        .ok_or_else(|| format!("expected ROW:COLUMN=VALUE, got '{}'", s))?;
    let row = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row index '{}'", row))?;

    Ok(Assignment {
        row,
        column: column.trim().to_string(),
        value: value.to_string(),
    })
}

fn parse_column_spec(s: &str) -> Result<(String, String), String> {
    s.rsplit_once(':')
        .map(|(name, ty)| (name.to_string(), ty.to_string()))
        .ok_or_else(|| format!("expected NAME:TYPE, got '{}'", s))
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::new()
        .with_log_level(cli.log_level.clone())
        .with_log_format(cli.log_format.into())
        .with_color(!cli.no_color && std::io::stdout().is_terminal());
    init_tracing(&config);
    debug!(command = ?cli.command, "starting");

    match cli.command {
        Command::Show { file, view, search } => {
            let config = view.apply(config);
            let engine = QueryEngine::new(config.clone())?;
            let table = engine
                .load(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let rows = select_rows(&table, search.as_deref(), config.row_limit);
            render_to_stdout(&table, &rows, &file, &config)
        }
        Command::Schema { file, transform } => show_schema(&file, transform.as_deref(), config),
        Command::Query {
            file,
            sql,
            table,
            view,
        } => {
            let config = view.apply(config).with_table_name(table);
            let engine = QueryEngine::new(config.clone())?;
            let result = engine
                .query(&file, &sql)
                .with_context(|| format!("Query failed on {}", file.display()))?;
            let rows = select_rows(&result, None, config.row_limit);
            render_to_stdout(&result, &rows, &file, &config)
        }
        Command::Edit(args) => edit(args, config),
    }
}

impl ViewArgs {
    fn apply(&self, config: Config) -> Config {
        let config = config.with_output_format(self.format.into());
        match self.limit {
            Some(limit) => config.with_row_limit(limit),
            None => config,
        }
    }
}

fn show_schema(file: &Path, schema_file: Option<&Path>, config: Config) -> Result<()> {
    let mut session = EditorSession::with_config(config)?;
    session
        .open(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    let Some(schema_file) = schema_file else {
        println!("{}", session.original_schema_json()?);
        return Ok(());
    };

    session.set_schema_file(schema_file)?;
    println!("{}", session.generate_transform_schema()?);
    if let Some(gaps) = session.transform().and_then(|t| t.coverage_gaps()) {
        eprintln!("warning: {}", gaps);
    }
    Ok(())
}

fn edit(args: EditArgs, config: Config) -> Result<()> {
    let mut config = config.with_compression(args.compression);
    if let Some(rows) = args.row_group_size {
        config = config.with_max_row_group_size(rows);
    }

    let mut session = EditorSession::with_config(config)?;
    session
        .open(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    for name in &args.drop_column {
        let index = column_index(&session, name)?;
        session.delete_column(index)?;
    }
    for (name, type_name) in &args.add_column {
        session.add_column(name, type_name)?;
    }
    if !args.delete_row.is_empty() {
        let removed = session.delete_rows(&args.delete_row)?;
        debug!(removed, "rows deleted");
    }
    for _ in 0..args.add_row.unwrap_or(0) {
        session.add_row()?;
    }
    for assignment in &args.set {
        let column = column_index(&session, &assignment.column)?;
        session
            .set_value(assignment.row, column, Some(&assignment.value))
            .with_context(|| {
                format!("Failed to set {}:{}", assignment.row, assignment.column)
            })?;
    }

    if let Some(schema_file) = &args.schema {
        session.set_schema_file(schema_file)?;
        session.generate_transform_schema()?;
    }

    let written = match &args.output {
        Some(output) => {
            let mut options = SaveOptions::default().with_overwrite(args.force);
            if args.schema.is_some() {
                options = options.with_transform(args.strict);
            }
            session
                .save_as(output, options)
                .with_context(|| format!("Failed to save {}", output.display()))?
        }
        None if args.schema.is_some() => session
            .save_with_transform(args.strict)
            .with_context(|| format!("Failed to save {}", args.file.display()))?,
        None => session
            .save()
            .with_context(|| format!("Failed to save {}", args.file.display()))?,
    };
    println!("File saved: {}", written.display());
    Ok(())
}

/// Resolve a column given by name, falling back to a 0-based index
fn column_index(session: &EditorSession, column: &str) -> Result<usize> {
    let Some(table) = session.table() else {
        bail!("No data loaded");
    };
    if let Some(index) = table.column_index(column) {
        return Ok(index);
    }
    match column.parse::<usize>() {
        Ok(index) if index < table.column_count() => Ok(index),
        _ => bail!("Unknown column: {}", column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let a = parse_assignment("3:name=Jane Doe").unwrap();
        assert_eq!(a.row, 3);
        assert_eq!(a.column, "name");
        assert_eq!(a.value, "Jane Doe");

        let empty = parse_assignment("0:1=").unwrap();
        assert_eq!(empty.value, "");

        let with_equals = parse_assignment("1:expr=a=b").unwrap();
        assert_eq!(with_equals.value, "a=b");

        assert!(parse_assignment("name=1").is_err());
        assert!(parse_assignment("x:name=1").is_err());
    }

    #[test]
    fn test_parse_column_spec() {
        assert_eq!(
            parse_column_spec("created:TIMESTAMP").unwrap(),
            ("created".to_string(), "TIMESTAMP".to_string())
        );
        assert!(parse_column_spec("nocolon").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
