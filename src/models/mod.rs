//! Data models for the db-admin engine.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionInfo, DatabaseType};
pub use query::{
    CellValue, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_QUERY_TIMEOUT_SECS, ResultColumn, ResultSet,
    StatementHistory, StatementOutcome, TabularSource,
};
pub use schema::{
    ColumnDescriptor, ColumnSpec, ForeignKeyRef, KeyRole, StructuralChangeSet, TableSchema,
};
