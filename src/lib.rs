//! parquet-studio - View and edit Parquet files
//!
//! Loads a Parquet file through an embedded DataFusion engine into an
//! editable typed table, optionally retypes columns from a JSON schema file,
//! and writes the result back to Parquet.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod schema;
pub mod session;
pub mod telemetry;

pub use config::Config;
pub use engine::{QueryEngine, TableStore};
pub use error::{Result, StudioError};
pub use model::Table;
pub use session::{EditorSession, SaveOptions};
