//! Column type classification and cell decoding.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Backend-specific decoders extract the value as a [`CellValue`]
//!
//! Anything that cannot be decoded as its category falls back to text, then
//! to raw bytes, and finally to `Null`.

use crate::models::{CellValue, DatabaseType, ResultSet};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Binary,
    Text,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Before "date" since "datetime" contains it
    if lower.contains("datetime") || lower.contains("timestamp") {
        return TypeCategory::DateTime;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }

    if lower.contains("int") || lower.contains("serial") || lower == "year" {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower.contains("blob") || lower.contains("binary") {
        return TypeCategory::Binary;
    }

    // Default to text for everything else (varchar, text, char, time, enum, json...)
    TypeCategory::Text
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Render binary data as text: UTF-8 when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> CellValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => CellValue::Text(s.to_string()),
        Err(_) => CellValue::Text(STANDARD.encode(bytes)),
    }
}

// =============================================================================
// Row to Cells Trait
// =============================================================================

/// Trait for converting database rows to ordered cells.
pub trait RowToCells {
    fn column_names(&self) -> Vec<String>;
    fn to_cells(&self) -> Vec<CellValue>;
}

impl RowToCells for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_cells(&self) -> Vec<CellValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::MySQL);
                mysql::decode_column(self, idx, category)
            })
            .collect()
    }
}

impl RowToCells for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_cells(&self) -> Vec<CellValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let declared = categorize_type(col.type_info().name(), DatabaseType::SQLite);
                sqlite::decode_column(self, idx, declared)
            })
            .collect()
    }
}

/// Build a result set from fetched rows. Column names come from the first row.
pub fn rows_to_result_set<R: RowToCells>(rows: &[R]) -> ResultSet {
    let columns = rows.first().map(|r| r.column_names()).unwrap_or_default();
    let rows = rows.iter().map(RowToCells::to_cells).collect();
    ResultSet::new(columns, rows)
}

// =============================================================================
// Backend-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> CellValue {
        match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return CellValue::Null,
            Ok(_) => {}
            Err(_) => return CellValue::Null,
        }

        let decoded = match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Date => decode_date(row, idx),
            TypeCategory::DateTime => decode_datetime(row, idx),
            TypeCategory::Binary => decode_binary_col(row, idx),
            TypeCategory::Text => None,
        };
        decoded
            .or_else(|| decode_text(row, idx))
            .or_else(|| decode_binary_col(row, idx))
            .unwrap_or(CellValue::Null)
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> Option<CellValue> {
        match row.try_get::<RawDecimal, _>(idx) {
            Ok(v) => Some(CellValue::Text(v.0)),
            Err(e) => {
                tracing::error!("Failed to decode DECIMAL: {:?}", e);
                None
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<CellValue> {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(CellValue::Integer(v));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(CellValue::Integer(v.into()));
        }
        if let Ok(v) = row.try_get::<i8, _>(idx) {
            return Some(CellValue::Integer(v.into()));
        }
        // Unsigned values beyond i64 keep their exact digits as text
        if let Ok(v) = row.try_get::<u64, _>(idx) {
            return Some(match i64::try_from(v) {
                Ok(i) => CellValue::Integer(i),
                Err(_) => CellValue::Text(v.to_string()),
            });
        }
        if let Ok(v) = row.try_get::<u32, _>(idx) {
            return Some(CellValue::Integer(v.into()));
        }
        None
    }

    fn decode_boolean(row: &MySqlRow, idx: usize) -> Option<CellValue> {
        row.try_get::<bool, _>(idx)
            .ok()
            .map(|b| CellValue::Integer(b as i64))
            .or_else(|| decode_integer(row, idx))
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Option<CellValue> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(CellValue::Real(v));
        }
        row.try_get::<f32, _>(idx)
            .ok()
            .map(|v| CellValue::Real(v as f64))
    }

    fn decode_date(row: &MySqlRow, idx: usize) -> Option<CellValue> {
        row.try_get::<chrono::NaiveDate, _>(idx)
            .ok()
            .map(CellValue::Date)
    }

    fn decode_datetime(row: &MySqlRow, idx: usize) -> Option<CellValue> {
        if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(idx) {
            return Some(CellValue::DateTime(v));
        }
        row.try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .ok()
            .map(|v| CellValue::DateTime(v.naive_utc()))
    }

    fn decode_binary_col(row: &MySqlRow, idx: usize) -> Option<CellValue> {
        row.try_get::<Vec<u8>, _>(idx)
            .ok()
            .map(|v| decode_binary_value(&v))
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> Option<CellValue> {
        row.try_get::<String, _>(idx).ok().map(CellValue::Text)
    }
}

mod sqlite {
    use super::*;

    /// SQLite is dynamically typed: the storage class of the value decides how
    /// it is read, the declared category only refines TEXT into dates.
    pub fn decode_column(row: &SqliteRow, idx: usize, declared: TypeCategory) -> CellValue {
        let storage = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return CellValue::Null,
            Ok(raw) => raw.type_info().name().to_uppercase(),
            Err(_) => return CellValue::Null,
        };

        let decoded = match storage.as_str() {
            "INTEGER" => row.try_get::<i64, _>(idx).ok().map(CellValue::Integer),
            "REAL" => row.try_get::<f64, _>(idx).ok().map(CellValue::Real),
            "BLOB" => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| decode_binary_value(&v)),
            _ => row
                .try_get::<String, _>(idx)
                .ok()
                .map(|s| refine_text(s, declared)),
        };
        decoded.unwrap_or(CellValue::Null)
    }

    fn refine_text(s: String, declared: TypeCategory) -> CellValue {
        match declared {
            TypeCategory::Date => chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(CellValue::Date)
                .unwrap_or(CellValue::Text(s)),
            TypeCategory::DateTime => parse_datetime(&s)
                .map(CellValue::DateTime)
                .unwrap_or(CellValue::Text(s)),
            _ => CellValue::Text(s),
        }
    }

    fn parse_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).ok())
    }
}
