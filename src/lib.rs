//! db-admin Library
//!
//! The engine of a database administration client for MySQL/MariaDB servers
//! and SQLite files: catalog introspection, single-statement execution,
//! planned structural changes, and per-login session state.

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod models;
pub mod planner;
pub mod session;

pub use config::Config;
pub use error::{DbError, DbResult};
pub use session::{Session, Snapshot, TableView};
