//! Plan builders.
//!
//! Each builder validates its input and renders a deterministic, ordered list
//! of statements. Nothing here touches a connection.

use crate::db::dialect::{quote_ident, quote_qualified, render_literal};
use crate::db::guard::DangerousOperationType;
use crate::error::{DbError, DbResult};
use crate::models::{
    CellValue, ColumnSpec, DatabaseType, StructuralChangeSet, TableSchema, TabularSource,
};
use serde::Serialize;

/// Structural operations the planner knows how to sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateDatabase,
    DropDatabase,
    RenameDatabase,
    CreateTable,
    AlterTable,
    DropTable,
    RenameTable,
    DuplicateTable,
    InsertRow,
    DeleteRows,
    UpdateRows,
    BulkUpload,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateDatabase => "create database",
            Self::DropDatabase => "drop database",
            Self::RenameDatabase => "rename database",
            Self::CreateTable => "create table",
            Self::AlterTable => "alter table",
            Self::DropTable => "drop table",
            Self::RenameTable => "rename table",
            Self::DuplicateTable => "duplicate table",
            Self::InsertRow => "insert row",
            Self::DeleteRows => "delete rows",
            Self::UpdateRows => "update rows",
            Self::BulkUpload => "bulk upload",
        }
    }

    /// Operations rendered as exactly one statement whatever their input.
    ///
    /// Their failures surface as the statement's own error; every other
    /// operation reports the failing step.
    pub fn is_single_statement(&self) -> bool {
        matches!(
            self,
            Self::CreateDatabase
                | Self::DropDatabase
                | Self::CreateTable
                | Self::DropTable
                | Self::InsertRow
                | Self::DeleteRows
                | Self::UpdateRows
        )
    }

    /// The guard classification of operations that destroy a database or
    /// table. Callers must obtain confirmation before running them.
    pub fn danger(&self) -> Option<DangerousOperationType> {
        match self {
            Self::DropDatabase => Some(DangerousOperationType::DropDatabase),
            Self::DropTable => Some(DangerousOperationType::DropTable),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One statement of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub description: String,
    pub sql: String,
}

impl PlanStep {
    fn new(description: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            sql: sql.into(),
        }
    }
}

/// An ordered list of statements implementing one structural operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub operation: Operation,
    pub target: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    fn new(operation: Operation, target: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            operation,
            target: target.into(),
            steps,
        }
    }

    fn single(
        operation: Operation,
        target: impl Into<String>,
        description: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self::new(operation, target, vec![PlanStep::new(description, sql)])
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// SQL text of every step, in order.
    pub fn statements(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.sql.as_str()).collect()
    }

    // =========================================================================
    // Databases
    // =========================================================================

    pub fn create_database(db: DatabaseType, name: &str) -> DbResult<Self> {
        require_databases(db, Operation::CreateDatabase)?;
        require_name("Database", name)?;
        Ok(Self::single(
            Operation::CreateDatabase,
            name,
            format!("{} created", name),
            format!("CREATE DATABASE {}", quote_ident(db, name)),
        ))
    }

    pub fn drop_database(db: DatabaseType, name: &str) -> DbResult<Self> {
        require_databases(db, Operation::DropDatabase)?;
        require_name("Database", name)?;
        Ok(Self::single(
            Operation::DropDatabase,
            name,
            format!("{} dropped", name),
            format!("DROP DATABASE {}", quote_ident(db, name)),
        ))
    }

    /// Copy every table of `old` into a new database `new`, then drop `old`.
    ///
    /// `tables` must be the table list of `old`, read before the run starts.
    pub fn rename_database(
        db: DatabaseType,
        old: &str,
        new: &str,
        tables: &[String],
    ) -> DbResult<Self> {
        require_databases(db, Operation::RenameDatabase)?;
        require_name("Database", old)?;
        require_name("Database", new)?;
        if old == new {
            return Err(DbError::invalid_input(format!(
                "Database '{}' already has that name",
                old
            )));
        }

        let mut steps = vec![PlanStep::new(
            format!("{} created", new),
            format!("CREATE DATABASE {}", quote_ident(db, new)),
        )];
        for table in tables {
            let src = quote_qualified(db, old, table);
            let dst = quote_qualified(db, new, table);
            steps.push(PlanStep::new(
                format!("{} structure copied", table),
                format!("CREATE TABLE {} LIKE {}", dst, src),
            ));
            steps.push(PlanStep::new(
                format!("{} rows copied", table),
                format!("INSERT INTO {} SELECT * FROM {}", dst, src),
            ));
        }
        steps.push(PlanStep::new(
            format!("{} dropped", old),
            format!("DROP DATABASE {}", quote_ident(db, old)),
        ));
        Ok(Self::new(Operation::RenameDatabase, old, steps))
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// One `CREATE TABLE` from the ordered column specs.
    pub fn create_table(db: DatabaseType, name: &str, columns: &[ColumnSpec]) -> DbResult<Self> {
        require_name("Table", name)?;
        if columns.is_empty() {
            return Err(DbError::invalid_input(format!(
                "Table '{}' needs at least one column",
                name
            )));
        }

        let primary: Vec<&ColumnSpec> = columns.iter().filter(|c| c.primary_key).collect();
        let inline_pk = primary.len() == 1;
        if db == DatabaseType::SQLite && !inline_pk && columns.iter().any(|c| c.auto_increment) {
            return Err(DbError::invalid_input(
                "AUTOINCREMENT requires a single-column primary key",
            ));
        }

        let mut defs: Vec<String> = columns
            .iter()
            .map(|c| column_definition(db, c, inline_pk))
            .collect::<DbResult<_>>()?;
        if primary.len() > 1 {
            let names: Vec<String> = primary.iter().map(|c| quote_ident(db, &c.name)).collect();
            defs.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }
        defs.extend(columns.iter().filter_map(|c| {
            c.references.as_ref().map(|r| {
                format!(
                    "FOREIGN KEY ({}) REFERENCES {}({})",
                    quote_ident(db, &c.name),
                    quote_ident(db, &r.table),
                    quote_ident(db, &r.column)
                )
            })
        }));

        Ok(Self::single(
            Operation::CreateTable,
            name,
            format!("{} created", name),
            format!("CREATE TABLE {} ({})", quote_ident(db, name), defs.join(", ")),
        ))
    }

    /// One `ADD COLUMN` per queued add, then one `DROP COLUMN` per queued drop.
    pub fn alter_table(
        db: DatabaseType,
        table: &str,
        changes: &StructuralChangeSet,
    ) -> DbResult<Self> {
        require_name("Table", table)?;
        if changes.is_empty() {
            return Err(DbError::invalid_input(format!(
                "No pending changes for table '{}'",
                table
            )));
        }

        let quoted = quote_ident(db, table);
        let mut steps = Vec::with_capacity(changes.adds.len() + changes.drops.len());
        for spec in &changes.adds {
            let mut def = column_definition(db, spec, true)?;
            if let Some(r) = &spec.references {
                let target = format!("{}({})", quote_ident(db, &r.table), quote_ident(db, &r.column));
                match db {
                    DatabaseType::MySQL => def.push_str(&format!(
                        ", ADD FOREIGN KEY ({}) REFERENCES {}",
                        quote_ident(db, &spec.name),
                        target
                    )),
                    DatabaseType::SQLite => def.push_str(&format!(" REFERENCES {}", target)),
                }
            }
            steps.push(PlanStep::new(
                format!("{} added", spec.name),
                format!("ALTER TABLE {} ADD COLUMN {}", quoted, def),
            ));
        }
        for name in &changes.drops {
            require_name("Column", name)?;
            steps.push(PlanStep::new(
                format!("{} dropped", name),
                format!("ALTER TABLE {} DROP COLUMN {}", quoted, quote_ident(db, name)),
            ));
        }
        Ok(Self::new(Operation::AlterTable, table, steps))
    }

    pub fn drop_table(db: DatabaseType, table: &str) -> DbResult<Self> {
        require_name("Table", table)?;
        Ok(Self::single(
            Operation::DropTable,
            table,
            format!("{} dropped", table),
            format!("DROP TABLE {}", quote_ident(db, table)),
        ))
    }

    /// Copy `src` into a new table `dst`.
    pub fn duplicate_table(db: DatabaseType, src: &str, dst: &str) -> DbResult<Self> {
        let steps = copy_table_steps(db, src, dst)?;
        Ok(Self::new(Operation::DuplicateTable, src, steps))
    }

    /// Copy `src` into `dst`, then drop `src`.
    pub fn rename_table(db: DatabaseType, src: &str, dst: &str) -> DbResult<Self> {
        let mut steps = copy_table_steps(db, src, dst)?;
        steps.push(PlanStep::new(
            format!("{} dropped", src),
            format!("DROP TABLE {}", quote_ident(db, src)),
        ));
        Ok(Self::new(Operation::RenameTable, src, steps))
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Insert one row. Auto-increment columns given `NULL` are left to the server.
    pub fn insert_row(
        db: DatabaseType,
        schema: &TableSchema,
        values: &[(String, CellValue)],
    ) -> DbResult<Self> {
        for (name, _) in values {
            if schema.column(name).is_none() {
                return Err(DbError::invalid_input(format!(
                    "Table '{}' has no column '{}'",
                    schema.name, name
                )));
            }
        }
        let kept: Vec<&(String, CellValue)> = values
            .iter()
            .filter(|(name, value)| {
                !(value.is_null() && schema.column(name).is_some_and(|c| c.auto_increment))
            })
            .collect();

        let sql = insert_statement(
            db,
            &schema.name,
            kept.iter().map(|(n, _)| n.as_str()),
            kept.iter().map(|(_, v)| v),
        );
        Ok(Self::single(
            Operation::InsertRow,
            &schema.name,
            "row inserted",
            sql,
        ))
    }

    /// `DELETE FROM table WHERE condition`. The condition is required.
    pub fn delete_rows(db: DatabaseType, table: &str, condition: &str) -> DbResult<Self> {
        require_name("Table", table)?;
        let condition = require_condition(condition)?;
        Ok(Self::single(
            Operation::DeleteRows,
            table,
            "rows deleted",
            format!("DELETE FROM {} WHERE {}", quote_ident(db, table), condition),
        ))
    }

    /// `UPDATE table SET ... WHERE condition`. Assignments and condition are required.
    pub fn update_rows(
        db: DatabaseType,
        table: &str,
        assignments: &[(String, CellValue)],
        condition: &str,
    ) -> DbResult<Self> {
        require_name("Table", table)?;
        if assignments.is_empty() {
            return Err(DbError::invalid_input("UPDATE needs at least one assignment"));
        }
        let condition = require_condition(condition)?;
        let sets: Vec<String> = assignments
            .iter()
            .map(|(name, value)| {
                format!("{} = {}", quote_ident(db, name), render_literal(db, value))
            })
            .collect();
        Ok(Self::single(
            Operation::UpdateRows,
            table,
            "rows updated",
            format!(
                "UPDATE {} SET {} WHERE {}",
                quote_ident(db, table),
                sets.join(", "),
                condition
            ),
        ))
    }

    /// One `INSERT` per source row, in source order.
    ///
    /// Every row must have exactly as many cells as there are headers.
    pub fn bulk_upload(db: DatabaseType, table: &str, source: &TabularSource) -> DbResult<Self> {
        require_name("Table", table)?;
        if source.columns.is_empty() {
            return Err(DbError::invalid_input("Upload source has no columns"));
        }
        if let Some((index, row)) = source
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != source.columns.len())
        {
            return Err(DbError::invalid_input(format!(
                "Row {} has {} values, expected {}",
                index,
                row.len(),
                source.columns.len()
            )));
        }

        let steps = source
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                PlanStep::new(
                    format!("row {} inserted", index),
                    insert_statement(db, table, source.columns.iter().map(String::as_str), row),
                )
            })
            .collect();
        Ok(Self::new(Operation::BulkUpload, table, steps))
    }
}

// =============================================================================
// Rendering Helpers
// =============================================================================

fn require_databases(db: DatabaseType, operation: Operation) -> DbResult<()> {
    if db.has_databases() {
        Ok(())
    } else {
        Err(DbError::unsupported(operation.name(), db.display_name()))
    }
}

fn require_name(kind: &str, name: &str) -> DbResult<()> {
    if name.trim().is_empty() {
        Err(DbError::invalid_input(format!("{} name is required", kind)))
    } else {
        Ok(())
    }
}

fn require_condition(condition: &str) -> DbResult<&str> {
    let condition = condition.trim();
    if condition.is_empty() {
        Err(DbError::invalid_input("A WHERE condition is required"))
    } else {
        Ok(condition)
    }
}

/// Render one column definition.
///
/// `inline_pk` places `PRIMARY KEY` on the column itself; composite keys are
/// rendered as a table constraint by the caller instead.
fn column_definition(db: DatabaseType, spec: &ColumnSpec, inline_pk: bool) -> DbResult<String> {
    require_name("Column", &spec.name)?;
    if spec.data_type.trim().is_empty() {
        return Err(DbError::invalid_input(format!(
            "Column '{}' needs a data type",
            spec.name
        )));
    }

    let mut def = format!("{} {}", quote_ident(db, &spec.name), spec.data_type.trim());
    if spec.not_null {
        def.push_str(" NOT NULL");
    }
    let pk = spec.primary_key && inline_pk;
    match db {
        DatabaseType::MySQL => {
            if spec.auto_increment {
                def.push_str(" AUTO_INCREMENT");
            }
            if pk {
                def.push_str(" PRIMARY KEY");
            }
        }
        DatabaseType::SQLite => {
            if pk {
                def.push_str(" PRIMARY KEY");
                if spec.auto_increment {
                    def.push_str(" AUTOINCREMENT");
                }
            }
        }
    }
    Ok(def)
}

fn copy_table_steps(db: DatabaseType, src: &str, dst: &str) -> DbResult<Vec<PlanStep>> {
    require_name("Table", src)?;
    require_name("Table", dst)?;
    if src == dst {
        return Err(DbError::invalid_input(format!(
            "Source and destination are both '{}'",
            src
        )));
    }

    let (s, d) = (quote_ident(db, src), quote_ident(db, dst));
    Ok(match db {
        DatabaseType::MySQL => vec![
            PlanStep::new(
                format!("{} structure copied", dst),
                format!("CREATE TABLE {} LIKE {}", d, s),
            ),
            PlanStep::new(
                format!("{} rows copied", dst),
                format!("INSERT INTO {} SELECT * FROM {}", d, s),
            ),
        ],
        DatabaseType::SQLite => vec![PlanStep::new(
            format!("{} copied", dst),
            format!("CREATE TABLE {} AS SELECT * FROM {}", d, s),
        )],
    })
}

fn insert_statement<'a>(
    db: DatabaseType,
    table: &str,
    columns: impl Iterator<Item = &'a str>,
    values: impl IntoIterator<Item = &'a CellValue>,
) -> String {
    let columns: Vec<String> = columns.map(|c| quote_ident(db, c)).collect();
    let values: Vec<String> = values.into_iter().map(|v| render_literal(db, v)).collect();
    let table = quote_ident(db, table);

    if columns.is_empty() {
        return match db {
            DatabaseType::MySQL => format!("INSERT INTO {} () VALUES ()", table),
            DatabaseType::SQLite => format!("INSERT INTO {} DEFAULT VALUES", table),
        };
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        values.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnDescriptor;

    const MYSQL: DatabaseType = DatabaseType::MySQL;
    const SQLITE: DatabaseType = DatabaseType::SQLite;

    #[test]
    fn test_create_table_mysql() {
        let columns = vec![
            ColumnSpec::new("id", "INT").primary_key().auto_increment().not_null(true),
            ColumnSpec::new("dept_id", "INT").references("departments", "id"),
            ColumnSpec::new("name", "VARCHAR(50)"),
        ];
        let plan = Plan::create_table(MYSQL, "employees", &columns).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan.steps[0].sql,
            "CREATE TABLE `employees` (`id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
             `dept_id` INT, `name` VARCHAR(50), \
             FOREIGN KEY (`dept_id`) REFERENCES `departments`(`id`))"
        );
    }

    #[test]
    fn test_create_table_sqlite_composite_key() {
        let columns = vec![
            ColumnSpec::new("a", "INTEGER").primary_key(),
            ColumnSpec::new("b", "TEXT").primary_key(),
        ];
        let plan = Plan::create_table(SQLITE, "pairs", &columns).unwrap();
        assert_eq!(
            plan.steps[0].sql,
            "CREATE TABLE \"pairs\" (\"a\" INTEGER, \"b\" TEXT, PRIMARY KEY (\"a\", \"b\"))"
        );

        let bad = vec![
            ColumnSpec::new("a", "INTEGER").primary_key().auto_increment(),
            ColumnSpec::new("b", "TEXT").primary_key(),
        ];
        assert!(matches!(
            Plan::create_table(SQLITE, "pairs", &bad),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_create_table_requires_columns() {
        assert!(matches!(
            Plan::create_table(MYSQL, "t", &[]),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_alter_table_orders_adds_before_drops() {
        let mut changes = StructuralChangeSet::new();
        changes.drop_column("legacy_flag");
        changes.add_column(ColumnSpec::new("age", "INT"));
        changes.add_column(ColumnSpec::new("email", "TEXT").not_null(true));

        let plan = Plan::alter_table(SQLITE, "people", &changes).unwrap();
        let descriptions: Vec<&str> = plan.steps.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["age added", "email added", "legacy_flag dropped"]
        );
        assert_eq!(
            plan.statements(),
            vec![
                "ALTER TABLE \"people\" ADD COLUMN \"age\" INT",
                "ALTER TABLE \"people\" ADD COLUMN \"email\" TEXT NOT NULL",
                "ALTER TABLE \"people\" DROP COLUMN \"legacy_flag\"",
            ]
        );
    }

    #[test]
    fn test_alter_table_foreign_key() {
        let mut changes = StructuralChangeSet::new();
        changes.add_column(ColumnSpec::new("dept_id", "INT").references("departments", "id"));
        let plan = Plan::alter_table(MYSQL, "emp", &changes).unwrap();
        assert_eq!(
            plan.steps[0].sql,
            "ALTER TABLE `emp` ADD COLUMN `dept_id` INT, ADD FOREIGN KEY (`dept_id`) REFERENCES `departments`(`id`)"
        );
    }

    #[test]
    fn test_alter_table_empty_is_invalid() {
        assert!(matches!(
            Plan::alter_table(MYSQL, "t", &StructuralChangeSet::new()),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_rename_database_steps() {
        let tables = vec!["a".to_string(), "b".to_string()];
        let plan = Plan::rename_database(MYSQL, "old", "new", &tables).unwrap();
        assert_eq!(
            plan.statements(),
            vec![
                "CREATE DATABASE `new`",
                "CREATE TABLE `new`.`a` LIKE `old`.`a`",
                "INSERT INTO `new`.`a` SELECT * FROM `old`.`a`",
                "CREATE TABLE `new`.`b` LIKE `old`.`b`",
                "INSERT INTO `new`.`b` SELECT * FROM `old`.`b`",
                "DROP DATABASE `old`",
            ]
        );
    }

    #[test]
    fn test_database_plans_unsupported_on_sqlite() {
        assert!(matches!(
            Plan::create_database(SQLITE, "x"),
            Err(DbError::Unsupported { .. })
        ));
        assert!(matches!(
            Plan::drop_database(SQLITE, "x"),
            Err(DbError::Unsupported { .. })
        ));
        assert!(matches!(
            Plan::rename_database(SQLITE, "x", "y", &[]),
            Err(DbError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_rename_and_duplicate_table() {
        let plan = Plan::rename_table(MYSQL, "src", "dst").unwrap();
        assert_eq!(
            plan.statements(),
            vec![
                "CREATE TABLE `dst` LIKE `src`",
                "INSERT INTO `dst` SELECT * FROM `src`",
                "DROP TABLE `src`",
            ]
        );

        let plan = Plan::duplicate_table(SQLITE, "src", "dst").unwrap();
        assert_eq!(
            plan.statements(),
            vec!["CREATE TABLE \"dst\" AS SELECT * FROM \"src\""]
        );
    }

    #[test]
    fn test_insert_skips_null_auto_increment() {
        let mut id = ColumnDescriptor::new("id", "int").with_extra("auto_increment");
        id.auto_increment = true;
        let schema = TableSchema::new("t", vec![id, ColumnDescriptor::new("name", "text")]);

        let plan = Plan::insert_row(
            MYSQL,
            &schema,
            &[
                ("id".to_string(), CellValue::Null),
                ("name".to_string(), CellValue::from("O'Neil")),
            ],
        )
        .unwrap();
        assert_eq!(plan.steps[0].sql, "INSERT INTO `t` (`name`) VALUES ('O''Neil')");

        let plan = Plan::insert_row(MYSQL, &schema, &[("id".to_string(), CellValue::Integer(7))])
            .unwrap();
        assert_eq!(plan.steps[0].sql, "INSERT INTO `t` (`id`) VALUES (7)");

        assert!(matches!(
            Plan::insert_row(MYSQL, &schema, &[("nope".to_string(), CellValue::Null)]),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_delete_and_update_require_condition() {
        assert!(matches!(
            Plan::delete_rows(MYSQL, "t", "  "),
            Err(DbError::InvalidInput { .. })
        ));
        let plan = Plan::delete_rows(MYSQL, "t", "id = 3").unwrap();
        assert_eq!(plan.steps[0].sql, "DELETE FROM `t` WHERE id = 3");

        let set = vec![("name".to_string(), CellValue::from("x"))];
        assert!(matches!(
            Plan::update_rows(MYSQL, "t", &set, ""),
            Err(DbError::InvalidInput { .. })
        ));
        assert!(matches!(
            Plan::update_rows(MYSQL, "t", &[], "id = 1"),
            Err(DbError::InvalidInput { .. })
        ));
        let plan = Plan::update_rows(SQLITE, "t", &set, "id = 1").unwrap();
        assert_eq!(plan.steps[0].sql, "UPDATE \"t\" SET \"name\" = 'x' WHERE id = 1");
    }

    #[test]
    fn test_bulk_upload_rejects_ragged_rows() {
        let source = TabularSource::new(vec!["a".into(), "b".into()])
            .with_row(vec![CellValue::Integer(1), CellValue::from("x")])
            .with_row(vec![CellValue::Integer(2)]);
        let err = Plan::bulk_upload(SQLITE, "t", &source).unwrap_err();
        assert!(err.to_string().contains("Row 1"));
    }

    #[test]
    fn test_bulk_upload_one_step_per_row() {
        let source = TabularSource::new(vec!["a".into()])
            .with_row(vec![CellValue::Integer(1)])
            .with_row(vec![CellValue::Null]);
        let plan = Plan::bulk_upload(SQLITE, "t", &source).unwrap();
        assert_eq!(
            plan.statements(),
            vec![
                "INSERT INTO \"t\" (\"a\") VALUES (1)",
                "INSERT INTO \"t\" (\"a\") VALUES (NULL)",
            ]
        );
        assert_eq!(plan.steps[1].description, "row 1 inserted");
    }

    #[test]
    fn test_operation_classification() {
        assert!(Operation::DropTable.is_single_statement());
        assert!(!Operation::BulkUpload.is_single_statement());
        assert!(!Operation::AlterTable.is_single_statement());
        assert!(!Operation::DuplicateTable.is_single_statement());

        assert_eq!(
            Operation::DropDatabase.danger(),
            Some(DangerousOperationType::DropDatabase)
        );
        assert_eq!(
            Operation::DropTable.danger(),
            Some(DangerousOperationType::DropTable)
        );
        assert_eq!(Operation::RenameTable.danger(), None);
    }
}
