//! Schema-related data models.
//!
//! This module defines the column descriptions read from the catalog and the
//! column specifications used to create or alter tables.

use serde::{Deserialize, Serialize};

/// Role a column plays in the table's keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    #[default]
    None,
    Primary,
    Foreign,
}

impl KeyRole {
    /// Display suffix appended to column labels.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Primary => " (P)",
            Self::Foreign => " (F)",
        }
    }
}

/// A column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
    pub is_nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Free-form server annotations, e.g. "auto_increment".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extra: String,
    pub key_role: KeyRole,
    pub auto_increment: bool,
}

impl ColumnDescriptor {
    /// Create a new nullable column descriptor with no key role.
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            is_nullable: true,
            default_value: None,
            extra: String::new(),
            key_role: KeyRole::None,
            auto_increment: false,
        }
    }

    /// Set nullability.
    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    /// Set the server annotations.
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// Column label for display, e.g. `id (P)`.
    pub fn label(&self) -> String {
        format!("{}{}", self.name, self.key_role.suffix())
    }
}

/// Ordered column list of one table, regenerated on every describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the primary key columns, in table order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.key_role == KeyRole::Primary)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Names of the foreign key columns, in table order.
    pub fn foreign_keys(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.key_role == KeyRole::Foreign)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Names of all columns, in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Target of a foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Specification of a column to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKeyRef>,
}

impl ColumnSpec {
    /// Create a nullable column with no key.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            auto_increment: false,
            not_null: false,
            references: None,
        }
    }

    /// Mark the column as (part of) the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark the column as auto-increment.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Set the NOT NULL flag.
    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    /// Reference `table(column)` with a foreign key.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }
}

/// Parses `name:TYPE[:pk][:ai][:notnull][:ref=table.column]`.
impl std::str::FromStr for ColumnSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let name = parts.next().unwrap_or_default().trim();
        let data_type = parts.next().unwrap_or_default().trim();
        if name.is_empty() || data_type.is_empty() {
            return Err(format!(
                "Invalid column '{}'. Expected name:TYPE[:pk][:ai][:notnull][:ref=table.column]",
                s
            ));
        }

        let mut spec = ColumnSpec::new(name, data_type);
        for flag in parts {
            let flag = flag.trim();
            match flag.to_lowercase().as_str() {
                "pk" => spec.primary_key = true,
                "ai" => spec.auto_increment = true,
                "notnull" => spec.not_null = true,
                lower if lower.starts_with("ref=") => {
                    let target = &flag[4..];
                    let (table, column) = target.split_once('.').ok_or_else(|| {
                        format!("Invalid reference '{}'. Expected table.column", target)
                    })?;
                    spec = spec.references(table, column);
                }
                _ => return Err(format!("Unknown column flag '{}' in '{}'", flag, s)),
            }
        }
        Ok(spec)
    }
}

/// Pending add/drop column edits for one table, applied as one planner run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralChangeSet {
    pub adds: Vec<ColumnSpec>,
    pub drops: Vec<String>,
}

impl StructuralChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a column to add.
    pub fn add_column(&mut self, spec: ColumnSpec) {
        self.adds.push(spec);
    }

    /// Queue a column to drop.
    pub fn drop_column(&mut self, name: impl Into<String>) {
        self.drops.push(name.into());
    }

    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.drops.is_empty()
    }

    pub fn clear(&mut self) {
        self.adds.clear();
        self.drops.clear();
    }
}
