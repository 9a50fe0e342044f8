//! Column metadata and type information

use arrow::datatypes::{DataType as ArrowType, TimeUnit};

use super::table::CellValue;

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Date,
    Timestamp,
    Varchar,
}

impl Default for ColumnType {
    fn default() -> Self {
        ColumnType::Varchar
    }
}

impl ColumnType {
    /// Normalize a free-form type name (engine or schema-file spelling)
    ///
    /// Matching is by substring on the upper-cased name, so `INT32`,
    /// `UINTEGER` and `SMALLINT` all land on `INTEGER`. Unknown names fall back
    /// to `VARCHAR`.
    pub fn normalize(name: &str) -> ColumnType {
        let upper = name.trim().to_uppercase();

        match upper.as_str() {
            "LONG" => return ColumnType::BigInt,
            "STRING" | "TEXT" => return ColumnType::Varchar,
            "REAL" => return ColumnType::Double,
            _ => {}
        }

        if upper.contains("BOOL") {
            ColumnType::Boolean
        } else if upper.contains("INT") {
            if upper.contains("BIG") {
                ColumnType::BigInt
            } else {
                ColumnType::Integer
            }
        } else if upper.contains("DOUBLE") || upper.contains("FLOAT") {
            ColumnType::Double
        } else if upper.contains("DATE") && !upper.contains("TIME") {
            ColumnType::Date
        } else if upper.contains("TIMESTAMP") {
            ColumnType::Timestamp
        } else {
            ColumnType::Varchar
        }
    }

    /// Map an Arrow data type read from a file to its editor type
    pub fn from_arrow(arrow_type: &ArrowType) -> ColumnType {
        match arrow_type {
            ArrowType::Boolean => ColumnType::Boolean,
            ArrowType::Int8
            | ArrowType::Int16
            | ArrowType::Int32
            | ArrowType::UInt8
            | ArrowType::UInt16 => ColumnType::Integer,
            ArrowType::Int64 | ArrowType::UInt32 | ArrowType::UInt64 => ColumnType::BigInt,
            ArrowType::Float16 | ArrowType::Float32 | ArrowType::Float64 => ColumnType::Double,
            ArrowType::Date32 | ArrowType::Date64 => ColumnType::Date,
            ArrowType::Timestamp(_, _) => ColumnType::Timestamp,
            _ => ColumnType::Varchar,
        }
    }

    /// Arrow type used when writing a column of this type
    pub fn arrow_type(self) -> ArrowType {
        match self {
            ColumnType::Boolean => ArrowType::Boolean,
            ColumnType::Integer => ArrowType::Int32,
            ColumnType::BigInt => ArrowType::Int64,
            ColumnType::Double => ArrowType::Float64,
            ColumnType::Date => ArrowType::Date32,
            ColumnType::Timestamp => ArrowType::Timestamp(TimeUnit::Microsecond, None),
            ColumnType::Varchar => ArrowType::Utf8,
        }
    }

    /// SQL spelling understood by the query engine
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// Value given to cells of this type in new rows and columns
    pub fn default_value(self) -> CellValue {
        match self {
            ColumnType::Boolean => CellValue::Bool(false),
            ColumnType::Integer | ColumnType::BigInt => CellValue::Int(0),
            ColumnType::Double => CellValue::Float(0.0),
            ColumnType::Date | ColumnType::Timestamp => CellValue::Null,
            ColumnType::Varchar => CellValue::from(""),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_name())
    }
}

impl std::str::FromStr for ColumnType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ColumnType::normalize(s))
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column index (0-based position)
    pub index: usize,
    /// Semantic type
    pub column_type: ColumnType,
}

impl Column {
    /// Create a column with a name, position and type
    pub fn new(name: impl Into<String>, index: usize, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            index,
            column_type,
        }
    }

    /// Header text, e.g. `id (INTEGER)`
    pub fn header(&self) -> String {
        format!("{} ({})", self.name, self.column_type)
    }
}
