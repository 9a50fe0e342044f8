//! Conversion of edited text into typed cell values

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, StudioError};

use super::schema::ColumnType;
use super::table::CellValue;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const TIMESTAMP_HELP: &str = "Invalid timestamp format. Expected formats:\n  \
    - YYYY-MM-DDTHH:mm:ss (e.g., 2024-11-12T10:30:00)\n  \
    - YYYY-MM-DD HH:mm:ss (e.g., 2024-11-12 10:30:00)\n  \
    - YYYY-MM-DD HH:mm:ss.SSS (e.g., 2022-07-11 15:53:24.671)";

/// Convert user text into a value of the given column type
///
/// Missing, empty and whitespace-only text becomes `Null` whatever the type.
pub fn parse_cell(text: Option<&str>, column_type: ColumnType) -> Result<CellValue> {
    let trimmed = match text.map(str::trim) {
        None | Some("") => return Ok(CellValue::Null),
        Some(t) => t,
    };

    let value = match column_type {
        ColumnType::Boolean => CellValue::Bool(parse_bool(trimmed)),
        ColumnType::Integer => trimmed
            .parse::<i32>()
            .map(|i| CellValue::Int(i as i64))
            .map_err(|_| cannot_convert(trimmed, column_type))?,
        ColumnType::BigInt => trimmed
            .parse::<i64>()
            .map(CellValue::Int)
            .map_err(|_| cannot_convert(trimmed, column_type))?,
        ColumnType::Double => trimmed
            .parse::<f64>()
            .map(CellValue::Float)
            .map_err(|_| cannot_convert(trimmed, column_type))?,
        ColumnType::Date => CellValue::Date(parse_date(trimmed)?),
        ColumnType::Timestamp => CellValue::DateTime(parse_timestamp(trimmed)?),
        ColumnType::Varchar => CellValue::String(Cow::Owned(trimmed.to_string())),
    };

    Ok(value)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| StudioError::Conversion {
        column_type: ColumnType::Date.to_string(),
        reason: "Invalid date format. Expected: YYYY-MM-DD (e.g., 2024-11-12)".to_string(),
    })
}

/// Parse a timestamp with either `T` or a space between date and time
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let normalized = truncate_fraction(s);

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .ok_or_else(|| StudioError::Conversion {
            column_type: ColumnType::Timestamp.to_string(),
            reason: TIMESTAMP_HELP.to_string(),
        })
}

/// Cut fractional seconds down to nanosecond precision
fn truncate_fraction(s: &str) -> Cow<'_, str> {
    let Some(dot) = s.rfind('.') else {
        return Cow::Borrowed(s);
    };
    let fraction = &s[dot + 1..];
    if fraction.len() <= 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(format!("{}.{}", &s[..dot], &fraction[..9]))
}

fn cannot_convert(text: &str, column_type: ColumnType) -> StudioError {
    StudioError::Conversion {
        column_type: column_type.to_string(),
        reason: format!("Cannot convert '{}' to {}", text, column_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_blank_is_null() {
        assert_eq!(parse_cell(None, ColumnType::Integer).unwrap(), CellValue::Null);
        assert_eq!(parse_cell(Some("   "), ColumnType::Varchar).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["true", "TRUE", "1", "yes", "Y"] {
            assert_eq!(parse_cell(Some(yes), ColumnType::Boolean).unwrap(), CellValue::Bool(true));
        }
        for no in ["false", "0", "no", "maybe"] {
            assert_eq!(parse_cell(Some(no), ColumnType::Boolean).unwrap(), CellValue::Bool(false));
        }
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_cell(Some(" 42 "), ColumnType::Integer).unwrap(), CellValue::Int(42));
        assert_eq!(
            parse_cell(Some("9000000000"), ColumnType::BigInt).unwrap(),
            CellValue::Int(9_000_000_000)
        );
        assert_eq!(parse_cell(Some("3.5"), ColumnType::Double).unwrap(), CellValue::Float(3.5));
    }

    #[test]
    fn test_integer_overflow_is_rejected() {
        let err = parse_cell(Some("9000000000"), ColumnType::Integer).unwrap_err();
        assert!(err.to_string().contains("Cannot convert '9000000000' to INTEGER"));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_cell(Some("2024-11-12"), ColumnType::Date).unwrap(),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 11, 12).unwrap())
        );
        let err = parse_cell(Some("12/11/2024"), ColumnType::Date).unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = NaiveDate::from_ymd_opt(2022, 7, 11)
            .unwrap()
            .and_hms_opt(15, 53, 24)
            .unwrap();
        assert_eq!(parse_timestamp("2022-07-11T15:53:24").unwrap(), expected);
        assert_eq!(parse_timestamp("2022-07-11 15:53:24").unwrap(), expected);

        let millis = parse_timestamp("2022-07-11 15:53:24.671").unwrap();
        assert_eq!(millis.nanosecond(), 671_000_000);

        let nanos = parse_timestamp("2022-07-11T15:53:24.671234567").unwrap();
        assert_eq!(nanos.nanosecond(), 671_234_567);

        let minutes = parse_timestamp("2024-11-12T10:30").unwrap();
        assert_eq!(minutes.minute(), 30);
        assert_eq!(minutes.second(), 0);
    }

    #[test]
    fn test_long_fraction_is_truncated() {
        let ts = parse_timestamp("2022-07-11 15:53:24.1234567891").unwrap();
        assert_eq!(ts.nanosecond(), 123_456_789);
    }

    #[test]
    fn test_bad_timestamp() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(err.to_string().contains("Invalid timestamp format"));
    }
}
