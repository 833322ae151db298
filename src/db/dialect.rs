//! Identifier quoting and literal rendering per backend.
//!
//! Raw column and table names are quoted here and nowhere else; display
//! labels (`id (P)`) never reach this module.

use crate::models::{CellValue, DatabaseType};

/// Quote an identifier: backticks for MySQL, double quotes for SQLite.
pub fn quote_ident(db: DatabaseType, ident: &str) -> String {
    match db {
        DatabaseType::MySQL => format!("`{}`", ident.replace('`', "``")),
        DatabaseType::SQLite => format!("\"{}\"", ident.replace('"', "\"\"")),
    }
}

/// Quote `schema.name`.
pub fn quote_qualified(db: DatabaseType, schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(db, schema), quote_ident(db, name))
}

/// Quote a string literal. MySQL also treats backslash as an escape character.
pub fn quote_string(db: DatabaseType, value: &str) -> String {
    let escaped = match db {
        DatabaseType::MySQL => value.replace('\\', "\\\\").replace('\'', "''"),
        DatabaseType::SQLite => value.replace('\'', "''"),
    };
    format!("'{}'", escaped)
}

/// Render a cell as a SQL literal.
pub fn render_literal(db: DatabaseType, value: &CellValue) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Integer(i) => i.to_string(),
        CellValue::Real(r) if r.is_finite() => r.to_string(),
        CellValue::Real(_) => "NULL".to_string(),
        CellValue::Text(s) => quote_string(db, s),
        CellValue::Date(_) => quote_string(db, &value.to_string()),
        // Keep fractional seconds so browsed values write back unchanged
        CellValue::DateTime(dt) => {
            quote_string(db, &dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
    }
}
