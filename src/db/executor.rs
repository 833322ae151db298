//! Statement Executor.
//!
//! Runs exactly one statement and reports either the rows it produced or the
//! number of rows it affected. Successful statements are appended to the
//! caller's [`StatementHistory`]; failed ones never are.
//!
//! # Architecture
//!
//! Statements are sent as plain text (no parameter binding), so MySQL uses the
//! text protocol and accepts statements that cannot be prepared (`USE`,
//! `CREATE DATABASE`, ...). Backend-specific fetching lives in the `mysql` and
//! `sqlite` submodules, which are intentionally parallel.

use crate::db::connection::{ConnectionProvider, DbConnection};
use crate::db::guard::{StatementKind, classify_statement};
use crate::db::types::rows_to_result_set;
use crate::dispatch_connection;
use crate::error::{DbError, DbResult};
use crate::models::{
    ConnectionInfo, DEFAULT_QUERY_TIMEOUT_SECS, ResultSet, StatementHistory, StatementOutcome,
};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Executes single statements with a timeout and optional row limit.
#[derive(Debug, Clone)]
pub struct StatementExecutor {
    query_timeout: Duration,
    row_limit: Option<u32>,
}

impl StatementExecutor {
    /// Create a new executor with default settings (no row limit).
    pub fn new() -> Self {
        Self {
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            row_limit: None,
        }
    }

    /// Set the per-statement timeout.
    pub fn with_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Cap the number of rows kept from a result. Zero means no limit.
    pub fn with_row_limit(mut self, row_limit: Option<u32>) -> Self {
        self.row_limit = row_limit.filter(|l| *l > 0);
        self
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Execute one statement on a connection opened just for it.
    pub async fn execute(
        &self,
        provider: &ConnectionProvider,
        info: &ConnectionInfo,
        sql: &str,
        history: &mut StatementHistory,
    ) -> DbResult<StatementOutcome> {
        let mut conn = provider.open(info).await?;
        let result = self.execute_on(conn.conn(), sql, history).await;
        conn.finish(result).await
    }

    /// Execute one statement on a caller-owned connection.
    pub async fn execute_on(
        &self,
        conn: &mut DbConnection,
        sql: &str,
        history: &mut StatementHistory,
    ) -> DbResult<StatementOutcome> {
        let start = Instant::now();
        let kind = classify_statement(sql, conn.db_type())?;
        let statement = sql.trim();

        debug!(
            sql = %statement,
            kind = ?kind,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing statement"
        );

        let outcome = match kind {
            StatementKind::Rows => StatementOutcome::Rows(self.fetch(conn, statement).await?),
            StatementKind::Ack => StatementOutcome::Ack {
                affected: self.write(conn, statement).await?,
            },
        };

        history.record(sql);
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            rows = outcome.rows().map(ResultSet::row_count),
            "Statement executed"
        );
        Ok(outcome)
    }

    /// Fetch rows without touching any history (catalog reads, table browsing).
    pub(crate) async fn fetch(&self, conn: &mut DbConnection, sql: &str) -> DbResult<ResultSet> {
        let fetch_limit = self
            .row_limit
            .map(|l| l as usize + 1)
            .unwrap_or(usize::MAX);

        let mut result = dispatch_connection!(conn, {
            MySql(c) => mysql::fetch_rows(c, sql, fetch_limit, self.query_timeout).await?,
            SQLite(c) => sqlite::fetch_rows(c, sql, fetch_limit, self.query_timeout).await?,
        });

        if let Some(limit) = self.row_limit {
            if result.rows.len() > limit as usize {
                warn!(limit = limit, "Query result truncated");
                result.rows.truncate(limit as usize);
                result.truncated = true;
            }
        }
        Ok(result)
    }

    async fn write(&self, conn: &mut DbConnection, sql: &str) -> DbResult<u64> {
        dispatch_connection!(conn, {
            MySql(c) => mysql::execute_write(c, sql, self.query_timeout).await,
            SQLite(c) => sqlite::execute_write(c, sql, self.query_timeout).await,
        })
    }
}

impl Default for StatementExecutor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(sql: &str, results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(|e| DbError::from_sqlx(sql, e))?);
    }
    Ok(rows)
}

fn timeout_error(sql: &str, timeout: Duration) -> DbError {
    let preview: String = sql.chars().take(60).collect();
    DbError::timeout(format!("statement '{}'", preview), timeout.as_secs())
}

/// Column names for a statement that returned no rows. Asks the server to
/// describe the statement; an empty list if it cannot.
fn described_columns<C: sqlx::Column>(described: Result<Vec<C>, sqlx::Error>) -> Vec<String> {
    match described {
        Ok(columns) => columns.iter().map(|c| c.name().to_string()).collect(),
        Err(e) => {
            debug!(error = %e, "Could not describe result columns");
            Vec::new()
        }
    }
}

// =============================================================================
// Backend-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlConnection;
    use sqlx::Executor;

    pub async fn fetch_rows(
        conn: &mut MySqlConnection,
        sql: &str,
        fetch_limit: usize,
        query_timeout: Duration,
    ) -> DbResult<ResultSet> {
        let rows_future = (&mut *conn).fetch(sql).take(fetch_limit).collect::<Vec<_>>();
        let results = timeout(query_timeout, rows_future)
            .await
            .map_err(|_| timeout_error(sql, query_timeout))?;
        let rows = collect_rows(sql, results)?;

        if rows.is_empty() {
            let described = (&mut *conn)
                .describe(sql)
                .await
                .map(|d| d.columns().to_vec());
            return Ok(ResultSet::new(described_columns(described), Vec::new()));
        }
        Ok(rows_to_result_set(&rows))
    }

    pub async fn execute_write(
        conn: &mut MySqlConnection,
        sql: &str,
        query_timeout: Duration,
    ) -> DbResult<u64> {
        match timeout(query_timeout, (&mut *conn).execute(sql)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(DbError::from_sqlx(sql, e)),
            Err(_) => Err(timeout_error(sql, query_timeout)),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteConnection;
    use sqlx::Executor;

    pub async fn fetch_rows(
        conn: &mut SqliteConnection,
        sql: &str,
        fetch_limit: usize,
        query_timeout: Duration,
    ) -> DbResult<ResultSet> {
        let rows_future = (&mut *conn).fetch(sql).take(fetch_limit).collect::<Vec<_>>();
        let results = timeout(query_timeout, rows_future)
            .await
            .map_err(|_| timeout_error(sql, query_timeout))?;
        let rows = collect_rows(sql, results)?;

        if rows.is_empty() {
            let described = (&mut *conn)
                .describe(sql)
                .await
                .map(|d| d.columns().to_vec());
            return Ok(ResultSet::new(described_columns(described), Vec::new()));
        }
        Ok(rows_to_result_set(&rows))
    }

    pub async fn execute_write(
        conn: &mut SqliteConnection,
        sql: &str,
        query_timeout: Duration,
    ) -> DbResult<u64> {
        match timeout(query_timeout, (&mut *conn).execute(sql)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(DbError::from_sqlx(sql, e)),
            Err(_) => Err(timeout_error(sql, query_timeout)),
        }
    }
}
