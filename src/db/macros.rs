//! Backend dispatch macro.
//!
//! Expands to a `match` over [`DbConnection`](crate::db::connection::DbConnection)
//! so per-backend code stays linear and readable.

/// Macro for generating backend dispatch match arms.
///
/// # Example
///
/// ```ignore
/// dispatch_connection!(conn, {
///     MySql(c) => mysql::list_tables(c).await,
///     SQLite(c) => sqlite::list_tables(c).await,
/// });
/// ```
#[macro_export]
macro_rules! dispatch_connection {
    ($conn:expr, { $($variant:ident($c:pat) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::connection::DbConnection::$variant($c) => $body,
            )+
        }
    };
}

pub use dispatch_connection;
