//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Short-lived connections scoped to one operation
//! - Statement classification, guarding and execution
//! - Catalog introspection
//! - Type mappings and identifier quoting
//! - Database dispatch macros for reducing code duplication

pub mod connection;
pub mod dialect;
pub mod executor;
pub mod guard;
#[macro_use]
pub mod macros;
pub mod schema;
pub mod types;

pub use connection::{ConnectionProvider, DbConnection, ScopedConnection};
pub use executor::StatementExecutor;
pub use guard::{DangerousOperationType, StatementKind, check_dangerous_sql, classify_statement};
pub use schema::SchemaInspector;
