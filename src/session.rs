//! Editing session over one Parquet file
//!
//! [`EditorSession`] holds the loaded table together with everything needed
//! to write it back: the file it came from, its original schema, an optional
//! schema file and the transform generated from it. All reads and writes go
//! through a [`TableStore`].

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{QueryEngine, TableStore};
use crate::error::{Result, StudioError};
use crate::model::{ColumnType, Table};
use crate::schema::{validate_schema_file, SchemaStructure, TransformSchema};

/// How [`EditorSession::save_as`] writes its destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Write columns with the types from the generated transform
    pub use_transform: bool,
    /// Refuse a transform that does not cover exactly the table's fields
    pub strict: bool,
    /// Replace an existing destination
    pub overwrite: bool,
}

impl SaveOptions {
    pub fn with_transform(mut self, strict: bool) -> Self {
        self.use_transform = true;
        self.strict = strict;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

pub struct EditorSession<S = QueryEngine> {
    store: S,
    current_file: Option<PathBuf>,
    table: Option<Table>,
    original_schema: Option<SchemaStructure>,
    schema_file: Option<PathBuf>,
    transform: Option<TransformSchema>,
    dirty: bool,
}

impl EditorSession<QueryEngine> {
    /// Session backed by a DataFusion engine
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self::new(QueryEngine::new(config)?))
    }
}

impl<S: TableStore> EditorSession<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            current_file: None,
            table: None,
            original_schema: None,
            schema_file: None,
            transform: None,
            dirty: false,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load `path`, replacing whatever was open before
    pub fn open(&mut self, path: &Path) -> Result<&Table> {
        info!(path = %path.display(), "opening parquet file");
        let table = self.store.load(path)?;

        self.original_schema = Some(SchemaStructure::from_columns(&table.columns));
        self.current_file = Some(path.to_path_buf());
        self.schema_file = None;
        self.transform = None;
        self.dirty = false;

        Ok(self.table.insert(table))
    }

    pub fn is_open(&self) -> bool {
        self.table.is_some()
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Whether there are edits not yet written to disk
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn row_count(&self) -> usize {
        self.table.as_ref().map_or(0, Table::row_count)
    }

    pub fn column_count(&self) -> usize {
        self.table.as_ref().map_or(0, Table::column_count)
    }

    pub fn column_name(&self, index: usize) -> Result<&str> {
        self.loaded()?
            .columns
            .get(index)
            .map(|c| c.name.as_str())
            .ok_or_else(|| {
                StudioError::invalid_column(format!("Invalid column index: {}", index))
            })
    }

    fn loaded(&self) -> Result<&Table> {
        self.table.as_ref().ok_or(StudioError::NoDataLoaded)
    }

    fn loaded_mut(&mut self) -> Result<&mut Table> {
        self.table.as_mut().ok_or(StudioError::NoDataLoaded)
    }

    pub fn add_row(&mut self) -> Result<usize> {
        let index = self.loaded_mut()?.add_row();
        self.dirty = true;
        info!(index, "row added");
        Ok(index)
    }

    pub fn add_column(&mut self, name: &str, type_name: &str) -> Result<usize> {
        let index = self.loaded_mut()?.add_column(name, type_name)?;
        self.dirty = true;
        info!(column = name.trim(), type_name, index, "column added");
        Ok(index)
    }

    /// Delete a column and return its name
    pub fn delete_column(&mut self, index: usize) -> Result<String> {
        let removed = self.loaded_mut()?.delete_column(index)?;
        self.dirty = true;
        info!(column = %removed.name, "column deleted");
        Ok(removed.name)
    }

    pub fn delete_rows(&mut self, rows: &[usize]) -> Result<usize> {
        let removed = self.loaded_mut()?.delete_rows(rows);
        if removed > 0 {
            self.dirty = true;
            info!(removed, "rows deleted");
        }
        Ok(removed)
    }

    pub fn set_value(&mut self, row: usize, column: usize, text: Option<&str>) -> Result<()> {
        self.loaded_mut()?.set_value(row, column, text)?;
        self.dirty = true;
        Ok(())
    }

    pub fn search(&self, text: &str) -> Result<Vec<usize>> {
        Ok(self.loaded()?.search(text))
    }

    /// Use `path` as the schema file for the next transform
    pub fn set_schema_file(&mut self, path: &Path) -> Result<()> {
        validate_schema_file(path)?;
        self.schema_file = Some(path.to_path_buf());
        self.transform = None;
        Ok(())
    }

    pub fn schema_file(&self) -> Option<&Path> {
        self.schema_file.as_deref()
    }

    pub fn has_schema_file(&self) -> bool {
        self.schema_file.is_some()
    }

    /// Schema of the file as it was opened, as pretty JSON
    pub fn original_schema_json(&self) -> Result<String> {
        self.original_schema
            .as_ref()
            .ok_or(StudioError::NoDataLoaded)?
            .to_json_pretty()
    }

    /// Match the schema file against the opened file's schema
    ///
    /// The transform is kept for later saves and returned as pretty JSON.
    pub fn generate_transform_schema(&mut self) -> Result<String> {
        let schema_file = self
            .schema_file
            .as_deref()
            .ok_or(StudioError::SchemaNotReady("First load a schema file"))?;
        let original = self
            .original_schema
            .as_ref()
            .ok_or(StudioError::SchemaNotReady("First load a file parquet"))?;

        let mut destination = SchemaStructure::from_file(schema_file)?;
        destination.standardize();

        let transform = original.to_transform(&destination);
        info!(
            schema = %schema_file.display(),
            fields = transform.fields.len(),
            unmatched = transform.unmatched.len(),
            "transform schema generated"
        );
        let json = transform.to_json_pretty()?;
        self.transform = Some(transform);
        Ok(json)
    }

    pub fn transform(&self) -> Option<&TransformSchema> {
        self.transform.as_ref()
    }

    pub fn clear_transform(&mut self) {
        self.transform = None;
    }

    /// Whether the schema file declares exactly the opened file's fields
    pub fn complies_strict_mode(&self) -> Result<bool> {
        if self.original_schema.is_none() {
            return Err(StudioError::SchemaNotReady("First load a file parquet"));
        }
        let transform = self
            .transform
            .as_ref()
            .ok_or(StudioError::SchemaNotReady("First load a schema file"))?;
        Ok(transform.is_complete())
    }

    /// Write the table to `path` and make it the current file
    ///
    /// `.parquet` is appended when missing. Returns the path written.
    pub fn save_as(&mut self, path: &Path, options: SaveOptions) -> Result<PathBuf> {
        let table = self.loaded()?;
        let destination = with_parquet_extension(path);

        if destination.exists() && !options.overwrite {
            return Err(StudioError::AlreadyExists(destination));
        }

        let targets = if options.use_transform {
            Some(self.target_types(table, options.strict)?)
        } else {
            None
        };

        info!(
            path = %destination.display(),
            transform = options.use_transform,
            "saving parquet file"
        );
        let rows = self.store.save(&destination, table, targets.as_deref())?;
        info!(path = %destination.display(), rows, "saved parquet file");

        self.current_file = Some(destination.clone());
        self.dirty = false;
        Ok(destination)
    }

    /// Overwrite the current file with the table in its current types
    pub fn save(&mut self) -> Result<PathBuf> {
        self.save_in_place(None)
    }

    /// Overwrite the current file, writing each column with the type the
    /// transform assigns it
    ///
    /// The path is kept exactly as opened, whatever its extension.
    pub fn save_with_transform(&mut self, strict: bool) -> Result<PathBuf> {
        let table = self.loaded()?;
        let targets = self.target_types(table, strict)?;
        self.save_in_place(Some(&targets))
    }

    fn save_in_place(&mut self, targets: Option<&[ColumnType]>) -> Result<PathBuf> {
        let table = self.loaded()?;
        let path = self
            .current_file
            .clone()
            .ok_or(StudioError::NoDataLoaded)?;

        let rows = self.store.save(&path, table, targets)?;
        info!(path = %path.display(), rows, transform = targets.is_some(), "saved parquet file");
        self.dirty = false;
        Ok(path)
    }

    /// Forget the open file; unsaved edits block this unless `force`
    pub fn close(&mut self, force: bool) -> Result<()> {
        if self.dirty && !force {
            let path = self.current_file.clone().unwrap_or_default();
            return Err(StudioError::UnsavedChanges(path));
        }
        if self.dirty {
            warn!("discarding unsaved changes");
        }

        self.current_file = None;
        self.table = None;
        self.original_schema = None;
        self.schema_file = None;
        self.transform = None;
        self.dirty = false;
        Ok(())
    }

    fn target_types(&self, table: &Table, strict: bool) -> Result<Vec<ColumnType>> {
        let schema_file = self
            .schema_file
            .as_deref()
            .ok_or(StudioError::SchemaNotReady("First load a schema file"))?;
        validate_schema_file(schema_file)?;

        let transform = self
            .transform
            .as_ref()
            .ok_or(StudioError::SchemaNotReady("Generate the transform schema first"))?;
        if strict {
            if let Some(gaps) = transform.coverage_gaps() {
                return Err(StudioError::StrictMode(gaps));
            }
        }

        Ok(transform.target_types(&table.columns))
    }
}

fn with_parquet_extension(path: &Path) -> PathBuf {
    let has_extension = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase().ends_with(".parquet"))
        .unwrap_or(false);

    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".parquet");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;

    use crate::model::{CellValue, Column};

    /// Store keeping tables in memory; saves also touch the file on disk
    #[derive(Default)]
    struct MemoryStore {
        tables: Mutex<HashMap<PathBuf, Table>>,
        saves: Mutex<Vec<(PathBuf, Option<Vec<ColumnType>>)>>,
    }

    impl MemoryStore {
        fn with_table(path: &Path, table: Table) -> Self {
            let store = Self::default();
            store
                .tables
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), table);
            store
        }

        fn saves(&self) -> Vec<(PathBuf, Option<Vec<ColumnType>>)> {
            self.saves.lock().unwrap().clone()
        }
    }

    impl TableStore for MemoryStore {
        fn describe(&self, path: &Path) -> Result<Vec<Column>> {
            Ok(self.load(path)?.columns)
        }

        fn load(&self, path: &Path) -> Result<Table> {
            self.tables
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| StudioError::FileNotFound(path.to_path_buf()))
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
            fs::write(path, b"PAR1")?;
            self.tables
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), table.clone());
            self.saves
                .lock()
                .unwrap()
                .push((path.to_path_buf(), target_types.map(<[_]>::to_vec)));
            Ok(table.row_count())
        }

        fn supports_extension(&self, ext: &str) -> bool {
            ext == "parquet"
        }
    }

    fn people() -> Table {
        let mut table = Table::new(vec![
            Column::new("id", 0, ColumnType::Integer),
            Column::new("name", 1, ColumnType::Varchar),
        ]);
        table.push_row(vec![CellValue::Int(1), CellValue::from("Alice")]);
        table.push_row(vec![CellValue::Int(2), CellValue::from("Bob")]);
        table
    }

    fn open_session(dir: &Path) -> (EditorSession<MemoryStore>, PathBuf) {
        let path = dir.join("people.parquet");
        let mut session = EditorSession::new(MemoryStore::with_table(&path, people()));
        session.open(&path).unwrap();
        (session, path)
    }

    #[test]
    fn test_edits_require_data() {
        let mut session = EditorSession::new(MemoryStore::default());
        assert!(!session.is_open());
        assert_eq!(session.row_count(), 0);
        assert_eq!(session.column_count(), 0);

        let err = session.add_row().unwrap_err();
        assert_eq!(err.to_string(), "No data loaded. Please open a file first.");
        assert!(matches!(
            session.add_column("x", "INTEGER"),
            Err(StudioError::NoDataLoaded)
        ));
        assert!(matches!(
            session.delete_rows(&[0]),
            Err(StudioError::NoDataLoaded)
        ));
        assert!(matches!(
            session.save_as(Path::new("out"), SaveOptions::default()),
            Err(StudioError::NoDataLoaded)
        ));
    }

    #[test]
    fn test_open_and_edit() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, path) = open_session(dir.path());

        assert_eq!(session.current_file(), Some(path.as_path()));
        assert_eq!(session.row_count(), 2);
        assert!(!session.is_dirty());

        assert_eq!(session.add_row().unwrap(), 2);
        assert!(session.is_dirty());
        assert_eq!(session.add_column("score", "double").unwrap(), 2);
        assert_eq!(session.column_name(2).unwrap(), "score");
        session.set_value(2, 1, Some("Carol")).unwrap();
        assert_eq!(session.search("carol").unwrap(), vec![2]);

        assert_eq!(session.delete_column(0).unwrap(), "id");
        assert_eq!(session.delete_rows(&[0, 0, 9]).unwrap(), 1);
        assert_eq!(session.row_count(), 2);
        assert_eq!(session.table().unwrap().column_names(), vec!["name", "score"]);
    }

    #[test]
    fn test_noop_delete_keeps_clean() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = open_session(dir.path());

        assert_eq!(session.delete_rows(&[]).unwrap(), 0);
        assert_eq!(session.delete_rows(&[7]).unwrap(), 0);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_save_as_appends_extension_and_checks_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = open_session(dir.path());
        session.add_row().unwrap();

        let written = session
            .save_as(&dir.path().join("copy"), SaveOptions::default())
            .unwrap();
        assert_eq!(written, dir.path().join("copy.parquet"));
        assert_eq!(session.current_file(), Some(written.as_path()));
        assert!(!session.is_dirty());

        let err = session
            .save_as(&written, SaveOptions::default())
            .unwrap_err();
        assert!(matches!(err, StudioError::AlreadyExists(_)));

        session
            .save_as(&written, SaveOptions::default().with_overwrite(true))
            .unwrap();
        assert_eq!(session.store().saves().len(), 2);
    }

    #[test]
    fn test_parquet_extension() {
        assert_eq!(
            with_parquet_extension(Path::new("out/data")),
            PathBuf::from("out/data.parquet")
        );
        assert_eq!(
            with_parquet_extension(Path::new("data.PARQUET")),
            PathBuf::from("data.PARQUET")
        );
        assert_eq!(
            with_parquet_extension(Path::new("data.pq")),
            PathBuf::from("data.pq.parquet")
        );
    }

    #[test]
    fn test_transform_requires_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = EditorSession::new(MemoryStore::default());
        let schema = dir.path().join("people.schema");
        fs::write(&schema, r#"{"fields": []}"#).unwrap();

        let err = session.generate_transform_schema().unwrap_err();
        assert_eq!(err.to_string(), "First load a schema file");

        session.set_schema_file(&schema).unwrap();
        let err = session.generate_transform_schema().unwrap_err();
        assert_eq!(err.to_string(), "First load a file parquet");
    }

    #[test]
    fn test_save_with_transform() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = open_session(dir.path());
        let schema = dir.path().join("people.json");
        fs::write(
            &schema,
            r#"{"partitions": [], "fields": [
                {"name": "id", "type": ["null", "int64"]},
                {"name": "name", "type": "string"}
            ]}"#,
        )
        .unwrap();

        session.set_schema_file(&schema).unwrap();
        assert!(session.has_schema_file());
        let json = session.generate_transform_schema().unwrap();
        assert!(json.contains("\"typeTransform\": \"bigint\""));
        assert!(session.complies_strict_mode().unwrap());

        let out = dir.path().join("typed.parquet");
        session
            .save_as(&out, SaveOptions::default().with_transform(true))
            .unwrap();

        let saves = session.store().saves();
        assert_eq!(
            saves[0].1,
            Some(vec![ColumnType::BigInt, ColumnType::Varchar])
        );
        // The in-memory table keeps its types
        assert_eq!(
            session.table().unwrap().column_types(),
            vec![ColumnType::Integer, ColumnType::Varchar]
        );
    }

    #[test]
    fn test_save_with_transform_keeps_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.pq");
        let mut session = EditorSession::new(MemoryStore::with_table(&path, people()));
        session.open(&path).unwrap();
        let schema = dir.path().join("people.schema");
        fs::write(&schema, r#"{"fields": [{"name": "id", "type": "int64"}]}"#).unwrap();

        assert!(matches!(
            session.save_with_transform(false),
            Err(StudioError::SchemaNotReady(_))
        ));

        session.set_schema_file(&schema).unwrap();
        session.generate_transform_schema().unwrap();
        assert!(matches!(
            session.save_with_transform(true),
            Err(StudioError::StrictMode(_))
        ));

        let written = session.save_with_transform(false).unwrap();
        assert_eq!(written, path);
        assert!(!dir.path().join("people.pq.parquet").exists());
        assert_eq!(
            session.store().saves(),
            vec![(path, Some(vec![ColumnType::BigInt, ColumnType::Varchar]))]
        );
    }

    #[test]
    fn test_strict_mode_rejects_partial_schema() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = open_session(dir.path());
        let schema = dir.path().join("partial.schema");
        fs::write(&schema, r#"{"fields": [{"name": "id", "type": "int64"}]}"#).unwrap();

        session.set_schema_file(&schema).unwrap();
        session.generate_transform_schema().unwrap();
        assert!(!session.complies_strict_mode().unwrap());

        let out = dir.path().join("strict.parquet");
        let err = session
            .save_as(&out, SaveOptions::default().with_transform(true))
            .unwrap_err();
        assert!(matches!(err, StudioError::StrictMode(_)));
        assert!(!out.exists());

        // Without strict mode the missing column keeps its type
        session
            .save_as(&out, SaveOptions::default().with_transform(false))
            .unwrap();
        assert_eq!(
            session.store().saves()[0].1,
            Some(vec![ColumnType::BigInt, ColumnType::Varchar])
        );
    }

    #[test]
    fn test_transform_without_generation() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = open_session(dir.path());
        let schema = dir.path().join("people.schema");
        fs::write(&schema, r#"{"fields": []}"#).unwrap();
        session.set_schema_file(&schema).unwrap();

        let err = session
            .save_as(
                &dir.path().join("out.parquet"),
                SaveOptions::default().with_transform(false),
            )
            .unwrap_err();
        assert!(matches!(err, StudioError::SchemaNotReady(_)));

        session.generate_transform_schema().unwrap();
        session.clear_transform();
        assert!(session.transform().is_none());
    }

    #[test]
    fn test_close_guards_unsaved_changes() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, path) = open_session(dir.path());
        session.add_row().unwrap();

        let err = session.close(false).unwrap_err();
        assert!(matches!(err, StudioError::UnsavedChanges(p) if p == path));
        assert!(session.is_open());

        session.close(true).unwrap();
        assert!(!session.is_open());
        assert!(session.current_file().is_none());
    }

    #[test]
    fn test_save_overwrites_current_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, path) = open_session(dir.path());
        session.set_value(0, 1, Some("Alicia")).unwrap();

        assert_eq!(session.save().unwrap(), path);
        assert!(!session.is_dirty());
        let saved = session.store().load(&path).unwrap();
        assert_eq!(saved.value(0, 1), Some(&CellValue::from("Alicia")));
        session.close(false).unwrap();
    }

    #[test]
    fn test_original_schema_json() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _) = open_session(dir.path());
        let json: serde_json::Value =
            serde_json::from_str(&session.original_schema_json().unwrap()).unwrap();
        assert_eq!(json["fields"][0]["type"], "INTEGER");
        assert_eq!(json["fields"][1]["name"], "name");
    }

    #[test]
    fn test_round_trip_through_engine() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.parquet");
        let engine = QueryEngine::new(Config::default()).unwrap();
        engine.save(&source, &people(), None).unwrap();

        let mut session = EditorSession::with_config(Config::default()).unwrap();
        session.open(&source).unwrap();
        let row = session.add_row().unwrap();
        session.set_value(row, 0, Some("3")).unwrap();
        session.set_value(row, 1, Some("Carol")).unwrap();
        let out = session
            .save_as(&dir.path().join("edited"), SaveOptions::default())
            .unwrap();

        let reloaded = engine.load(&out).unwrap();
        assert_eq!(reloaded.row_count(), 3);
        assert_eq!(reloaded.value(2, 0), Some(&CellValue::Int(3)));
        assert_eq!(reloaded.value(2, 1), Some(&CellValue::from("Carol")));
    }
}
