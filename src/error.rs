//! Error types for the db-admin engine.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant carries the table, database, statement or step needed to reproduce
//! the failure, so callers can report it without extra bookkeeping.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection to '{host}' failed: {message}")]
    Connection {
        host: String,
        message: String,
        suggestion: String,
    },

    #[error("Authentication failed for '{user}' on '{host}': {message}")]
    Authentication {
        user: String,
        host: String,
        message: String,
    },

    #[error("Unknown host: '{host}'")]
    UnknownHost { host: String },

    #[error("Catalog query failed for table '{table}': {cause}")]
    Catalog {
        table: String,
        #[source]
        cause: Box<DbError>,
    },

    #[error("Statement failed: {message} (statement: {statement})")]
    Execution {
        statement: String,
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
    },

    #[error(
        "{operation} failed at step {step_index} ({statement}): {cause}; completed steps: [{}]",
        .committed.join(", ")
    )]
    PlannerStep {
        operation: String,
        step_index: usize,
        statement: String,
        /// Descriptions of the steps that were committed before the failure.
        committed: Vec<String>,
        #[source]
        cause: Box<DbError>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Dangerous operation blocked: {operation}. {reason}. Confirm the operation to proceed.")]
    DangerousOperationBlocked { operation: String, reason: String },

    #[error("{operation} is not supported by {backend}")]
    Unsupported { operation: String, backend: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(
        host: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Connection {
            host: host.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(
        user: impl Into<String>,
        host: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Authentication {
            user: user.into(),
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create an unknown host error.
    pub fn unknown_host(host: impl Into<String>) -> Self {
        Self::UnknownHost { host: host.into() }
    }

    /// Wrap a failure that happened while reading the catalog of `table`.
    pub fn catalog(table: impl Into<String>, cause: DbError) -> Self {
        Self::Catalog {
            table: table.into(),
            cause: Box::new(cause),
        }
    }

    /// Create an execution error for a statement the server rejected.
    pub fn execution(
        statement: impl Into<String>,
        message: impl Into<String>,
        sql_state: Option<String>,
    ) -> Self {
        Self::Execution {
            statement: statement.into(),
            message: message.into(),
            sql_state,
        }
    }

    /// Build an execution error from a sqlx error raised by `statement`.
    pub fn from_sqlx(statement: impl Into<String>, err: sqlx::Error) -> Self {
        let (message, sql_state) = describe_sqlx_error(&err);
        Self::execution(statement, message, sql_state)
    }

    /// Create a planner step error.
    pub fn planner_step(
        operation: impl Into<String>,
        step_index: usize,
        statement: impl Into<String>,
        committed: Vec<String>,
        cause: DbError,
    ) -> Self {
        Self::PlannerStep {
            operation: operation.into(),
            step_index,
            statement: statement.into(),
            committed,
            cause: Box::new(cause),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a dangerous operation blocked error.
    pub fn dangerous_operation_blocked(
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::DangerousOperationBlocked {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            backend: backend.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Authentication { .. } => Some("Check the user name and password"),
            Self::UnknownHost { .. } => Some("Check the host name or database file path"),
            Self::Timeout { .. } => Some("Consider increasing the timeout"),
            Self::Catalog { cause, .. } | Self::PlannerStep { cause, .. } => cause.suggestion(),
            _ => None,
        }
    }

    /// The SQLSTATE reported by the server, looking through wrapped causes.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Execution { sql_state, .. } => sql_state.as_deref(),
            Self::Catalog { cause, .. } | Self::PlannerStep { cause, .. } => cause.sql_state(),
            _ => None,
        }
    }
}

/// Split a sqlx error into a message and the SQLSTATE, when the server sent one.
pub fn describe_sqlx_error(err: &sqlx::Error) -> (String, Option<String>) {
    match err {
        sqlx::Error::Database(db_err) => (
            db_err.message().to_string(),
            db_err.code().map(|c| c.to_string()),
        ),
        sqlx::Error::Io(io_err) => (format!("I/O error: {}", io_err), None),
        sqlx::Error::Tls(tls_err) => (format!("TLS error: {}", tls_err), None),
        sqlx::Error::Protocol(msg) => (format!("Protocol error: {}", msg), None),
        sqlx::Error::ColumnNotFound(col) => (format!("Column not found: {}", col), None),
        sqlx::Error::ColumnDecode { index, source } => (
            format!("Failed to decode column {}: {}", index, source),
            None,
        ),
        sqlx::Error::Decode(source) => (format!("Decode error: {}", source), None),
        sqlx::Error::RowNotFound => ("No rows returned".to_string(), None),
        other => (other.to_string(), None),
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("db.internal", "Failed to connect", "Check the server");
        assert!(err.to_string().contains("Connection to 'db.internal' failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::connection("localhost", "refused", "Is the server running?");
        assert_eq!(err.suggestion(), Some("Is the server running?"));
        assert!(DbError::invalid_input("x").suggestion().is_none());
    }

    #[test]
    fn test_catalog_error_names_table() {
        let err = DbError::catalog(
            "employees",
            DbError::execution("SHOW COLUMNS FROM `employees`", "no such table", None),
        );
        let msg = err.to_string();
        assert!(msg.contains("employees"));
        assert!(msg.contains("no such table"));
    }

    #[test]
    fn test_planner_step_lists_committed_steps() {
        let err = DbError::planner_step(
            "alter table people",
            1,
            "ALTER TABLE `people` DROP COLUMN `legacy_flag`",
            vec!["age added".to_string()],
            DbError::execution("ALTER TABLE ...", "Can't DROP 'legacy_flag'", Some("42000".into())),
        );
        let msg = err.to_string();
        assert!(msg.contains("step 1"));
        assert!(msg.contains("[age added]"));
        assert_eq!(err.sql_state(), Some("42000"));
    }

    #[test]
    fn test_describe_sqlx_row_not_found() {
        let (msg, state) = describe_sqlx_error(&sqlx::Error::RowNotFound);
        assert_eq!(msg, "No rows returned");
        assert!(state.is_none());
    }
}
