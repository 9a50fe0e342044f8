//! Schema files and column type transforms
//!
//! A schema file is a JSON document listing fields with their types:
//!
//! ```json
//! {"partitions": [], "fields": [{"name": "id", "type": ["null", "int64"]}]}
//! ```
//!
//! Matching it against the schema of an open table yields a
//! [`TransformSchema`], which tells the save path which type each column is
//! written as.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StudioError};
use crate::model::{Column, ColumnType};

/// File extensions accepted for schema files
pub const SCHEMA_EXTENSIONS: [&str; 2] = ["schema", "json"];

/// Declared type of a schema field, a single name or a union such as
/// `["null", "string"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldType {
    Single(String),
    Union(Vec<String>),
}

/// One field of a schema file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: Some(FieldType::Single(field_type.into())),
        }
    }

    /// Type name with unions resolved and common aliases applied
    pub fn standard_type(&self) -> String {
        let declared = match &self.field_type {
            Some(FieldType::Single(name)) => Some(name.as_str()),
            Some(FieldType::Union(names)) => {
                names.iter().map(String::as_str).find(|n| *n != "null")
            }
            None => None,
        };

        match declared {
            None => "string".to_string(),
            Some(name) => match name.to_lowercase().as_str() {
                "timestamp_millis" => "timestamp".to_string(),
                "int32" => "integer".to_string(),
                "int64" => "bigint".to_string(),
                _ => name.to_string(),
            },
        }
    }
}

/// Contents of a schema file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaStructure {
    #[serde(default)]
    pub partitions: Vec<String>,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

impl SchemaStructure {
    /// Schema describing the columns of a loaded table
    pub fn from_columns(columns: &[Column]) -> Self {
        Self {
            partitions: Vec::new(),
            fields: columns
                .iter()
                .map(|c| SchemaField::new(c.name.clone(), c.column_type.to_string()))
                .collect(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading schema file");
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| StudioError::SchemaParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace every field type by its standard type
    pub fn standardize(&mut self) {
        for field in &mut self.fields {
            field.field_type = Some(FieldType::Single(field.standard_type()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Pair each field of this schema with its type in `destination`
    ///
    /// Fields only present in `destination` are kept as unmatched.
    pub fn to_transform(&self, destination: &SchemaStructure) -> TransformSchema {
        let fields = self
            .fields
            .iter()
            .map(|field| TransformField {
                name: field.name.clone(),
                field_type: field.standard_type(),
                type_transform: destination.get(&field.name).map(SchemaField::standard_type),
            })
            .collect();

        let unmatched = destination
            .fields
            .iter()
            .filter(|f| self.get(&f.name).is_none())
            .map(|f| f.name.clone())
            .collect();

        TransformSchema {
            partitions: self.partitions.clone(),
            fields,
            unmatched,
        }
    }
}

/// A column's current type and the type a schema file asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(rename = "typeTransform")]
    pub type_transform: Option<String>,
}

/// Per-column type mapping between an open table and a schema file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformSchema {
    pub partitions: Vec<String>,
    pub fields: Vec<TransformField>,
    /// Schema file fields with no matching column
    #[serde(skip)]
    pub unmatched: Vec<String>,
}

impl TransformSchema {
    pub fn get(&self, name: &str) -> Option<&TransformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Type each column is written as
    ///
    /// Columns the schema file does not mention keep their current type.
    pub fn target_types(&self, columns: &[Column]) -> Vec<ColumnType> {
        columns
            .iter()
            .map(|column| {
                let target = self
                    .get(&column.name)
                    .and_then(|f| f.type_transform.as_deref())
                    .map(ColumnType::normalize)
                    .unwrap_or(column.column_type);
                debug!(
                    column = %column.name,
                    from = %column.column_type,
                    to = %target,
                    "column type transform"
                );
                target
            })
            .collect()
    }

    /// Names of table fields the schema file does not declare
    pub fn missing(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.type_transform.is_none())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Whether the schema file declares exactly the table's fields
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty() && self.fields.iter().all(|f| f.type_transform.is_some())
    }

    /// Description of the coverage gaps, `None` when complete
    pub fn coverage_gaps(&self) -> Option<String> {
        if self.is_complete() {
            return None;
        }

        let mut parts = Vec::new();
        let missing = self.missing();
        if !missing.is_empty() {
            parts.push(format!("missing from schema: {}", missing.join(", ")));
        }
        if !self.unmatched.is_empty() {
            parts.push(format!("not in file: {}", self.unmatched.join(", ")));
        }
        warn!(gaps = %parts.join("; "), "schema does not cover the table");
        Some(parts.join("; "))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Check that `path` exists and carries a schema file extension
pub fn validate_schema_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(StudioError::SchemaFile(format!(
            "Select a schema file that exists: {}",
            path.display()
        )));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !SCHEMA_EXTENSIONS.contains(&ext.as_str()) {
        return Err(StudioError::SchemaFile(
            "Select a valid format: .schema or .json".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "partitions": ["day"],
        "fields": [
            {"name": "id", "type": ["null", "int64"]},
            {"name": "created", "type": "timestamp_millis"},
            {"name": "comment"},
            {"name": "extra", "type": "int32"}
        ]
    }"#;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", 0, ColumnType::Integer),
            Column::new("created", 1, ColumnType::Varchar),
            Column::new("comment", 2, ColumnType::Varchar),
            Column::new("score", 3, ColumnType::Double),
        ]
    }

    #[test]
    fn test_standard_types() {
        let schema: SchemaStructure = serde_json::from_str(SCHEMA).unwrap();
        let types: Vec<String> = schema.fields.iter().map(|f| f.standard_type()).collect();
        assert_eq!(types, vec!["bigint", "timestamp", "string", "integer"]);

        let only_null = SchemaField {
            name: "x".into(),
            field_type: Some(FieldType::Union(vec!["null".into()])),
        };
        assert_eq!(only_null.standard_type(), "string");
        assert_eq!(SchemaField::new("y", "Boolean").standard_type(), "Boolean");
    }

    #[test]
    fn test_from_columns_json() {
        let schema = SchemaStructure::from_columns(&columns()[..2]);
        let json: serde_json::Value =
            serde_json::from_str(&schema.to_json_pretty().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "partitions": [],
                "fields": [
                    {"name": "id", "type": "INTEGER"},
                    {"name": "created", "type": "VARCHAR"}
                ]
            })
        );
    }

    #[test]
    fn test_transform_and_targets() {
        let mut destination: SchemaStructure = serde_json::from_str(SCHEMA).unwrap();
        destination.standardize();
        let original = SchemaStructure::from_columns(&columns());

        let transform = original.to_transform(&destination);
        assert_eq!(transform.fields.len(), 4);
        assert_eq!(transform.fields[0].type_transform.as_deref(), Some("bigint"));
        assert_eq!(transform.fields[3].type_transform, None);
        assert_eq!(transform.unmatched, vec!["extra"]);

        let targets = transform.target_types(&columns());
        assert_eq!(
            targets,
            vec![
                ColumnType::BigInt,
                ColumnType::Timestamp,
                ColumnType::Varchar,
                ColumnType::Double
            ]
        );

        let json: serde_json::Value =
            serde_json::from_str(&transform.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["fields"][0]["typeTransform"], "bigint");
        assert!(json["fields"][3]["typeTransform"].is_null());
        assert!(json.get("unmatched").is_none());
    }

    #[test]
    fn test_coverage() {
        let original = SchemaStructure::from_columns(&columns()[..2]);
        let destination = SchemaStructure {
            partitions: vec![],
            fields: vec![SchemaField::new("id", "int64"), SchemaField::new("created", "date")],
        };
        let transform = original.to_transform(&destination);
        assert!(transform.is_complete());
        assert_eq!(transform.coverage_gaps(), None);

        let partial = SchemaStructure::from_columns(&columns()).to_transform(&destination);
        assert!(!partial.is_complete());
        assert_eq!(partial.missing(), vec!["comment", "score"]);
        assert!(partial.coverage_gaps().unwrap().contains("comment, score"));
    }

    #[test]
    fn test_validate_schema_file() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("absent.schema");
        assert!(matches!(
            validate_schema_file(&missing),
            Err(StudioError::SchemaFile(_))
        ));

        let wrong = dir.path().join("schema.txt");
        fs::write(&wrong, "{}").unwrap();
        let err = validate_schema_file(&wrong).unwrap_err();
        assert_eq!(err.to_string(), "Select a valid format: .schema or .json");

        let good = dir.path().join("table.SCHEMA");
        fs::write(&good, SCHEMA).unwrap();
        assert!(validate_schema_file(&good).is_ok());
        assert_eq!(SchemaStructure::from_file(&good).unwrap().fields.len(), 4);
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"fields\": [").unwrap();

        let err = SchemaStructure::from_file(&path).unwrap_err();
        assert!(matches!(err, StudioError::SchemaParse { .. }));
    }
}
