//! Query-related data models.
//!
//! This module defines result sets, statement outcomes and the statement
//! history kept by a session.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::schema::{KeyRole, TableSchema};

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{}", s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(r: f64) -> Self {
        Self::Real(r)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// A result column: the raw name plus its key role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultColumn {
    pub name: String,
    pub key_role: KeyRole,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_role: KeyRole::None,
        }
    }

    /// Display label with the key-role suffix. Never used to build SQL.
    pub fn label(&self) -> String {
        format!("{}{}", self.name, self.key_role.suffix())
    }
}

/// Rows returned by a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<CellValue>>,
    /// True when rows were cut off by the row limit.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl ResultSet {
    /// Create a result set from raw column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            columns: columns.into_iter().map(ResultColumn::new).collect(),
            rows,
            truncated: false,
        }
    }

    /// Copy key roles from `schema` onto columns of the same name.
    pub fn decorate(mut self, schema: &TableSchema) -> Self {
        for column in &mut self.columns {
            if let Some(desc) = schema.column(&column.name) {
                column.key_role = desc.key_role;
            }
        }
        self
    }

    /// Raw column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Display labels, e.g. `["id (P)", "name", "dept_id (F)"]`.
    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(ResultColumn::label).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at `row` for the column named `column`.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.columns.iter().position(|c| c.name == column)?;
        self.rows.get(row)?.get(idx)
    }
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementOutcome {
    Rows(ResultSet),
    Ack { affected: u64 },
}

impl StatementOutcome {
    /// The result set, if the statement returned rows.
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            Self::Rows(rs) => Some(rs),
            Self::Ack { .. } => None,
        }
    }

    pub fn into_rows(self) -> Option<ResultSet> {
        match self {
            Self::Rows(rs) => Some(rs),
            Self::Ack { .. } => None,
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack { .. })
    }
}

/// Append-only record of successfully executed statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementHistory {
    entries: Vec<String>,
}

impl StatementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one executed statement, exactly as issued.
    pub fn record(&mut self, statement: impl Into<String>) {
        self.entries.push(statement.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Headers plus rows handed over by an importer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularSource {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl TabularSource {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn with_row(mut self, row: Vec<CellValue>) -> Self {
        self.rows.push(row);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::ColumnDescriptor;

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Null.to_string(), "NULL");
        assert_eq!(CellValue::Integer(-4).to_string(), "-4");
        assert_eq!(CellValue::from("abc").to_string(), "abc");
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(CellValue::Date(d).to_string(), "2024-02-29");
        let dt = d.and_hms_opt(13, 5, 9).unwrap();
        assert_eq!(CellValue::DateTime(dt).to_string(), "2024-02-29 13:05:09");
        assert_eq!(CellValue::from(None::<i64>), CellValue::Null);
    }

    #[test]
    fn test_decorate_labels_but_keeps_raw_names() {
        let mut id = ColumnDescriptor::new("id", "int");
        id.key_role = KeyRole::Primary;
        let mut dept = ColumnDescriptor::new("dept_id", "int");
        dept.key_role = KeyRole::Foreign;
        let schema = TableSchema::new("emp", vec![id, ColumnDescriptor::new("name", "text"), dept]);

        let rs = ResultSet::new(
            vec!["id".into(), "name".into(), "dept_id".into()],
            vec![vec![CellValue::Integer(1), "Ada".into(), CellValue::Integer(7)]],
        )
        .decorate(&schema);

        assert_eq!(rs.labels(), vec!["id (P)", "name", "dept_id (F)"]);
        assert_eq!(rs.column_names(), vec!["id", "name", "dept_id"]);
        assert_eq!(rs.get(0, "name"), Some(&CellValue::from("Ada")));
    }

    #[test]
    fn test_history_append_and_clear() {
        let mut history = StatementHistory::new();
        history.record("SELECT 1");
        history.record("SELECT 1");
        assert_eq!(history.entries(), ["SELECT 1", "SELECT 1"]);
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_outcome_serializes_with_kind() {
        let json = serde_json::to_value(StatementOutcome::Ack { affected: 3 }).unwrap();
        assert_eq!(json["kind"], "ack");
        assert_eq!(json["affected"], 3);
    }
}
