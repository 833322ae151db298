//! Statement classification and dangerous operation detection.
//!
//! Statements are forwarded to the server verbatim. This module only parses
//! them far enough to decide the outcome shape (rows or acknowledgement), to
//! reject multi-statement text, and to flag statements that destroy data.
//! Uses sqlparser with the backend's dialect; text that sqlparser cannot parse
//! falls back to its leading keyword.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use tracing::debug;

/// Outcome shape of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// The server answers with a result descriptor and rows.
    Rows,
    /// The server answers with an affected-row count.
    Ack,
}

/// Leading keywords of statements that return rows.
const ROW_KEYWORDS: &[&str] = &[
    "SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH", "PRAGMA", "VALUES", "TABLE",
    "CHECKSUM",
];

/// Type of dangerous SQL operation detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DangerousOperationType {
    DropDatabase,
    DropTable,
    DropIndex,
    AlterTableDropColumn,
    Truncate,
    DeleteWithoutWhere,
    UpdateWithoutWhere,
}

impl DangerousOperationType {
    /// Get the operation name for error messages.
    pub fn operation_name(&self) -> &'static str {
        match self {
            Self::DropDatabase => "DROP DATABASE",
            Self::DropTable => "DROP TABLE",
            Self::DropIndex => "DROP INDEX",
            Self::AlterTableDropColumn => "ALTER TABLE DROP COLUMN",
            Self::Truncate => "TRUNCATE",
            Self::DeleteWithoutWhere => "DELETE without WHERE",
            Self::UpdateWithoutWhere => "UPDATE without WHERE",
        }
    }

    /// Get the reason why this operation is dangerous.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DropDatabase => {
                "This will permanently delete the entire database and all its data"
            }
            Self::DropTable => "This will permanently delete the table and all its data",
            Self::DropIndex => "This will permanently delete the index",
            Self::AlterTableDropColumn => {
                "This will permanently delete the column and all its data"
            }
            Self::Truncate => "This will remove all rows from the table",
            Self::DeleteWithoutWhere => "This will delete all rows from the table",
            Self::UpdateWithoutWhere => "This will update all rows in the table",
        }
    }

    /// The error returned when the caller did not confirm this operation.
    pub fn blocked(&self) -> DbError {
        DbError::dangerous_operation_blocked(self.operation_name(), self.reason())
    }
}

fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

/// Decide whether `sql` returns rows or an acknowledgement.
///
/// Returns `InvalidInput` for empty text and for text that parses as more than
/// one statement.
pub fn classify_statement(sql: &str, db_type: DatabaseType) -> DbResult<StatementKind> {
    if sql.trim().is_empty() {
        return Err(DbError::invalid_input("Empty SQL statement"));
    }
    let keyword = leading_keyword(sql);
    let keyword_says_rows = ROW_KEYWORDS.contains(&keyword.as_str());

    let dialect = get_dialect(db_type);
    match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) if statements.len() > 1 => Err(DbError::invalid_input(format!(
            "Expected exactly one statement, found {}",
            statements.len()
        ))),
        Ok(statements) => {
            let ast_says_rows = statements.first().is_some_and(is_row_statement);
            Ok(if ast_says_rows || keyword_says_rows {
                StatementKind::Rows
            } else {
                StatementKind::Ack
            })
        }
        Err(e) => {
            debug!(keyword = %keyword, error = %e, "Statement not parseable, classifying by keyword");
            Ok(if keyword_says_rows {
                StatementKind::Rows
            } else {
                StatementKind::Ack
            })
        }
    }
}

fn is_row_statement(stmt: &Statement) -> bool {
    matches!(
        stmt,
        Statement::Query(_)
            | Statement::Explain { .. }
            | Statement::ExplainTable { .. }
            | Statement::ShowCreate { .. }
            | Statement::ShowTables { .. }
            | Statement::ShowColumns { .. }
            | Statement::ShowDatabases { .. }
            | Statement::ShowSchemas { .. }
            | Statement::ShowFunctions { .. }
            | Statement::ShowVariable { .. }
            | Statement::ShowVariables { .. }
            | Statement::ShowStatus { .. }
            | Statement::ShowCollation { .. }
    )
}

/// Check if SQL contains a dangerous operation.
///
/// Text that cannot be parsed is not flagged; it is forwarded as is and the
/// server decides.
///
/// # Examples
///
/// ```
/// use db_admin::db::guard::{check_dangerous_sql, DangerousOperationType};
/// use db_admin::models::DatabaseType;
///
/// let result = check_dangerous_sql("DELETE FROM users", DatabaseType::MySQL);
/// assert_eq!(result, Some(DangerousOperationType::DeleteWithoutWhere));
///
/// let result = check_dangerous_sql("DELETE FROM users WHERE id = 1", DatabaseType::MySQL);
/// assert_eq!(result, None);
/// ```
pub fn check_dangerous_sql(sql: &str, db_type: DatabaseType) -> Option<DangerousOperationType> {
    let dialect = get_dialect(db_type);
    let statements = match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => statements,
        Err(e) => {
            debug!(error = %e, "Skipping dangerous statement check for unparseable SQL");
            return None;
        }
    };
    statements.iter().find_map(check_statement_dangerous)
}

/// Check if a single statement is dangerous.
fn check_statement_dangerous(stmt: &Statement) -> Option<DangerousOperationType> {
    match stmt {
        Statement::Drop { object_type, .. } => {
            use sqlparser::ast::ObjectType;
            match object_type {
                ObjectType::Table => Some(DangerousOperationType::DropTable),
                ObjectType::Index => Some(DangerousOperationType::DropIndex),
                ObjectType::Database | ObjectType::Schema => {
                    Some(DangerousOperationType::DropDatabase)
                }
                _ => None,
            }
        }

        Statement::AlterTable(alter_table) => {
            use sqlparser::ast::AlterTableOperation;
            alter_table
                .operations
                .iter()
                .any(|op| matches!(op, AlterTableOperation::DropColumn { .. }))
                .then_some(DangerousOperationType::AlterTableDropColumn)
        }

        Statement::Truncate { .. } => Some(DangerousOperationType::Truncate),

        Statement::Delete(delete) => delete
            .selection
            .is_none()
            .then_some(DangerousOperationType::DeleteWithoutWhere),

        Statement::Update(update) => update
            .selection
            .is_none()
            .then_some(DangerousOperationType::UpdateWithoutWhere),

        _ => None,
    }
}
