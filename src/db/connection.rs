//! Connection Provider.
//!
//! Opens one short-lived, backend-specific connection per logical operation.
//! There is no pooling: every call dials the server with the supplied
//! [`ConnectionInfo`] and the returned [`ScopedConnection`] is closed when the
//! operation finishes.

use crate::error::{DbError, DbResult};
use crate::models::{ConnectionInfo, DEFAULT_CONNECT_TIMEOUT_SECS, DatabaseType};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Backend-specific connection (avoids `AnyConnection` type limitations).
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbConnection::MySql(_) => DatabaseType::MySQL,
            DbConnection::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> Result<(), sqlx::Error> {
        match self {
            DbConnection::MySql(conn) => conn.close().await,
            DbConnection::SQLite(conn) => conn.close().await,
        }
    }
}

/// A connection owned by exactly one operation.
///
/// Prefer [`ScopedConnection::finish`] or [`ScopedConnection::close`]; on any
/// other exit path (early `?` return, panic) dropping the guard drops the
/// underlying socket, so the connection never outlives the operation.
#[derive(Debug)]
pub struct ScopedConnection {
    conn: DbConnection,
    target: String,
    opened_at: Instant,
}

impl ScopedConnection {
    /// Get the underlying connection.
    pub fn conn(&mut self) -> &mut DbConnection {
        &mut self.conn
    }

    pub fn db_type(&self) -> DatabaseType {
        self.conn.db_type()
    }

    /// Close the connection. Close failures are logged, never returned.
    pub async fn close(self) {
        let Self {
            conn,
            target,
            opened_at,
        } = self;
        match conn.close().await {
            Ok(()) => debug!(
                target_db = %target,
                elapsed_ms = opened_at.elapsed().as_millis() as u64,
                "Connection closed"
            ),
            Err(e) => warn!(target_db = %target, error = %e, "Failed to close connection cleanly"),
        }
    }

    /// Close the connection and hand back the operation's result.
    pub async fn finish<T>(self, result: DbResult<T>) -> DbResult<T> {
        self.close().await;
        result
    }
}

/// Opens scoped connections. Holds no connection state of its own.
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    connect_timeout: Duration,
}

impl ConnectionProvider {
    /// Create a provider with the default connect timeout.
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Open a connection for one operation. Never retries.
    pub async fn open(&self, info: &ConnectionInfo) -> DbResult<ScopedConnection> {
        let target = info.masked();
        debug!(target_db = %target, "Opening connection");

        let connect = self.connect(info);
        let conn = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                DbError::timeout(
                    format!("connect to {}", info.host),
                    self.connect_timeout.as_secs(),
                )
            })??;

        Ok(ScopedConnection {
            conn,
            target,
            opened_at: Instant::now(),
        })
    }

    /// Verify that `info` can connect and authenticate, then close again.
    pub async fn check(&self, info: &ConnectionInfo) -> DbResult<()> {
        let conn = self.open(info).await?;
        info!(target_db = %info.masked(), "Credentials verified");
        conn.close().await;
        Ok(())
    }

    async fn connect(&self, info: &ConnectionInfo) -> DbResult<DbConnection> {
        match info.db_type {
            DatabaseType::MySQL => {
                let mut options = MySqlConnectOptions::new()
                    .host(&info.host)
                    .username(&info.user)
                    .password(info.secret())
                    .charset("utf8mb4");
                if let Some(port) = info.effective_port() {
                    options = options.port(port);
                }
                if let Some(db) = &info.database {
                    options = options.database(db);
                }

                let conn = MySqlConnection::connect_with(&options)
                    .await
                    .map_err(|e| map_connect_error(info, e))?;
                Ok(DbConnection::MySql(conn))
            }
            DatabaseType::SQLite => {
                // Opening a missing file would silently create an empty database
                if !std::path::Path::new(&info.host).exists() {
                    return Err(DbError::unknown_host(&info.host));
                }
                let options = SqliteConnectOptions::new()
                    .filename(&info.host)
                    .create_if_missing(false)
                    .foreign_keys(true);

                let conn = SqliteConnection::connect_with(&options)
                    .await
                    .map_err(|e| map_connect_error(info, e))?;
                Ok(DbConnection::SQLite(conn))
            }
        }
    }
}

impl Default for ConnectionProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// MySQL error numbers for rejected credentials.
const MYSQL_ACCESS_DENIED: &[&str] = &["1044", "1045", "1698"];

/// Classify a connect-time failure into unknown-host, authentication or
/// plain connectivity errors.
pub fn map_connect_error(info: &ConnectionInfo, err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            let message = db_err.message().to_string();
            let mysql_errno = db_err
                .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                .map(|e| e.number().to_string());
            if code == "28000"
                || mysql_errno
                    .as_deref()
                    .is_some_and(|n| MYSQL_ACCESS_DENIED.contains(&n))
                || message.contains("Access denied")
            {
                DbError::authentication(&info.user, &info.host, message)
            } else {
                DbError::connection(&info.host, message, connection_suggestion(info.db_type, &err))
            }
        }
        sqlx::Error::Io(io_err) => {
            let text = io_err.to_string().to_lowercase();
            if io_err.kind() == std::io::ErrorKind::NotFound
                || text.contains("failed to lookup address")
                || text.contains("name or service not known")
                || text.contains("nodename nor servname")
                || text.contains("no such host")
            {
                DbError::unknown_host(&info.host)
            } else {
                DbError::connection(
                    &info.host,
                    format!("I/O error: {}", io_err),
                    connection_suggestion(info.db_type, &err),
                )
            }
        }
        _ => DbError::connection(
            &info.host,
            err.to_string(),
            connection_suggestion(info.db_type, &err),
        ),
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            db_type
        );
    }

    if error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match db_type {
        DatabaseType::MySQL => "Verify host, port and that the server accepts remote connections"
            .to_string(),
        DatabaseType::SQLite => {
            "Verify the file path exists and is a SQLite database".to_string()
        }
    }
}
