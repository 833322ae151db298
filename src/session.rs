//! Session/Context State.
//!
//! A [`Session`] is the single source of truth for a presentation layer: the
//! verified connection info, the active database, a cached table list, the
//! open table, the statement history and the pending structural changes.
//!
//! Every operation opens its own scoped connection. Mutating operations
//! invalidate the table cache; callers re-read state with [`Session::refresh`].

use crate::db::connection::ConnectionProvider;
use crate::db::executor::StatementExecutor;
use crate::db::schema::SchemaInspector;
use crate::error::{DbError, DbResult};
use crate::models::{
    CellValue, ColumnSpec, ConnectionInfo, ResultSet, StatementHistory, StatementOutcome,
    StructuralChangeSet, TableSchema, TabularSource,
};
use crate::planner::{Plan, PlanRunner, RunReport};
use serde::Serialize;
use tracing::{debug, info};

/// Name reported for the single database of a SQLite file.
const SQLITE_MAIN: &str = "main";

/// Schema and rows of the open table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub schema: TableSchema,
    pub rows: ResultSet,
}

/// Everything a presentation layer needs to redraw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub database: Option<String>,
    pub tables: Vec<String>,
    pub open_table: Option<TableView>,
}

/// Per-login state. One operation at a time: every method takes `&mut self`.
pub struct Session {
    info: ConnectionInfo,
    provider: ConnectionProvider,
    executor: StatementExecutor,
    tables: Option<Vec<String>>,
    open_table: Option<String>,
    history: StatementHistory,
    pending: StructuralChangeSet,
}

impl Session {
    /// Verify the credentials and start a session.
    ///
    /// On failure no session exists and `info` is dropped.
    pub async fn login(
        info: ConnectionInfo,
        provider: ConnectionProvider,
        executor: StatementExecutor,
    ) -> DbResult<Self> {
        provider.check(&info).await?;
        info!(target_db = %info.masked(), "Logged in");
        Ok(Self {
            info,
            provider,
            executor,
            tables: None,
            open_table: None,
            history: StatementHistory::new(),
            pending: StructuralChangeSet::new(),
        })
    }

    /// End the session, discarding the credentials and all state.
    pub fn disconnect(self) {
        info!(
            target_db = %self.info.masked(),
            statements = self.history.len(),
            "Disconnected"
        );
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// The active database. SQLite always reports `main`.
    pub fn active_database(&self) -> Option<&str> {
        if self.info.db_type.has_databases() {
            self.info.database.as_deref()
        } else {
            Some(SQLITE_MAIN)
        }
    }

    pub fn open_table_name(&self) -> Option<&str> {
        self.open_table.as_deref()
    }

    pub fn history(&self) -> &[String] {
        self.history.entries()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn invalidate(&mut self) {
        if self.tables.take().is_some() {
            debug!("Table cache invalidated");
        }
    }

    /// Connection info for operations that need a database selected.
    fn database_info(&self) -> DbResult<ConnectionInfo> {
        if self.active_database().is_none() {
            return Err(DbError::invalid_input(
                "No database selected. Use a database first",
            ));
        }
        Ok(self.info.clone())
    }

    async fn run_plan(&mut self, plan: &Plan, info: &ConnectionInfo) -> DbResult<RunReport> {
        self.run_confirmed(plan, info, false).await
    }

    /// Run a plan, refusing destructive operations the caller did not confirm.
    async fn run_confirmed(
        &mut self,
        plan: &Plan,
        info: &ConnectionInfo,
        confirmed: bool,
    ) -> DbResult<RunReport> {
        if let (Some(danger), false) = (plan.operation.danger(), confirmed) {
            return Err(danger.blocked());
        }
        let mut runner = PlanRunner::new(&self.executor);
        let result = runner
            .run(&self.provider, info, plan, &mut self.history)
            .await;
        // Steps may have committed even when the run failed
        self.invalidate();
        result
    }

    // =========================================================================
    // Databases
    // =========================================================================

    pub async fn list_databases(&mut self) -> DbResult<Vec<String>> {
        let mut conn = self.provider.open(&self.info.server_level()).await?;
        let result = SchemaInspector::list_databases(conn.conn()).await;
        conn.finish(result).await
    }

    /// Make `name` the active database.
    pub async fn use_database(&mut self, name: &str) -> DbResult<()> {
        let next = self.info.with_database(name);
        let mut conn = self.provider.open(&next).await?;
        let result = SchemaInspector::use_database(conn.conn(), name).await;
        conn.finish(result).await?;

        info!(database = %name, "Database selected");
        self.info = next;
        self.open_table = None;
        self.pending.clear();
        self.invalidate();
        Ok(())
    }

    pub async fn create_database(&mut self, name: &str) -> DbResult<RunReport> {
        let plan = Plan::create_database(self.info.db_type, name)?;
        let info = self.info.server_level();
        self.run_plan(&plan, &info).await
    }

    /// Drop a database. Blocked unless the caller confirmed it.
    pub async fn drop_database(&mut self, name: &str, confirmed: bool) -> DbResult<RunReport> {
        let plan = Plan::drop_database(self.info.db_type, name)?;
        let info = self.info.server_level();
        let report = self.run_confirmed(&plan, &info, confirmed).await?;

        if self.info.database.as_deref() == Some(name) {
            self.info = self.info.server_level();
            self.open_table = None;
            self.pending.clear();
        }
        Ok(report)
    }

    /// Copy every table of `old` into `new`, then drop `old`.
    ///
    /// The active database follows the rename.
    pub async fn rename_database(&mut self, old: &str, new: &str) -> DbResult<RunReport> {
        let info = self.info.server_level();
        let mut conn = self.provider.open(&info).await?;
        let tables = SchemaInspector::list_tables(conn.conn(), Some(old)).await;
        let tables = conn.finish(tables).await?;

        let plan = Plan::rename_database(self.info.db_type, old, new, &tables)?;
        let report = self.run_plan(&plan, &info).await?;

        if self.info.database.as_deref() == Some(old) {
            self.info = self.info.with_database(new);
            info!(database = %new, "Active database renamed");
        }
        Ok(report)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Tables of the active database, cached until the next mutation.
    pub async fn tables(&mut self) -> DbResult<&[String]> {
        if self.tables.is_none() {
            let info = self.database_info()?;
            let mut conn = self.provider.open(&info).await?;
            let result = SchemaInspector::list_tables(conn.conn(), None).await;
            self.tables = Some(conn.finish(result).await?);
        }
        Ok(self.tables.as_deref().unwrap_or_default())
    }

    /// Open `table` for browsing and return its current view.
    pub async fn open_table(&mut self, table: &str) -> DbResult<TableView> {
        let view = self.table_view(table).await?;
        self.open_table = Some(table.to_string());
        Ok(view)
    }

    pub fn close_table(&mut self) {
        self.open_table = None;
    }

    async fn table_view(&self, table: &str) -> DbResult<TableView> {
        let info = self.database_info()?;
        let mut conn = self.provider.open(&info).await?;
        let result = async {
            let schema = SchemaInspector::describe_table(conn.conn(), table).await?;
            let rows = SchemaInspector::browse_table(conn.conn(), &self.executor, &schema).await?;
            Ok::<_, DbError>(TableView { schema, rows })
        }
        .await;
        conn.finish(result).await
    }

    /// Re-read everything a presentation layer shows.
    pub async fn refresh(&mut self) -> DbResult<Snapshot> {
        let database = self.active_database().map(str::to_string);
        let tables = if database.is_some() {
            self.tables().await?.to_vec()
        } else {
            Vec::new()
        };
        // The open table may have been dropped or renamed by an ad hoc statement
        if let Some(name) = self.open_table.take_if(|name| !tables.contains(name)) {
            info!(table = %name, "Open table no longer exists, closing it");
        }
        let open_table = match self.open_table.clone() {
            Some(name) => Some(self.table_view(&name).await?),
            None => None,
        };
        Ok(Snapshot {
            database,
            tables,
            open_table,
        })
    }

    pub async fn describe_table(&mut self, table: &str) -> DbResult<TableSchema> {
        let info = self.database_info()?;
        let mut conn = self.provider.open(&info).await?;
        let result = SchemaInspector::describe_table(conn.conn(), table).await;
        conn.finish(result).await
    }

    pub async fn show_create_table(&mut self, table: &str) -> DbResult<String> {
        let info = self.database_info()?;
        let mut conn = self.provider.open(&info).await?;
        let result = SchemaInspector::show_create_table(conn.conn(), table).await;
        conn.finish(result).await
    }

    /// Browse a table without opening it.
    pub async fn browse_table(&mut self, table: &str) -> DbResult<ResultSet> {
        Ok(self.table_view(table).await?.rows)
    }

    pub async fn create_table(&mut self, name: &str, columns: &[ColumnSpec]) -> DbResult<RunReport> {
        let info = self.database_info()?;
        let plan = Plan::create_table(info.db_type, name, columns)?;
        self.run_plan(&plan, &info).await
    }

    pub fn queue_add_column(&mut self, spec: ColumnSpec) {
        debug!(column = %spec.name, "Queued column add");
        self.pending.add_column(spec);
    }

    pub fn queue_drop_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!(column = %name, "Queued column drop");
        self.pending.drop_column(name);
    }

    pub fn pending_changes(&self) -> &StructuralChangeSet {
        &self.pending
    }

    pub fn reset_changes(&mut self) {
        self.pending.clear();
    }

    /// Apply the pending change set to `table`. The set is cleared only on success.
    pub async fn apply_changes(&mut self, table: &str) -> DbResult<RunReport> {
        let info = self.database_info()?;
        let plan = Plan::alter_table(info.db_type, table, &self.pending)?;
        let report = self.run_plan(&plan, &info).await?;
        self.pending.clear();
        Ok(report)
    }

    pub async fn rename_table(&mut self, src: &str, dst: &str) -> DbResult<RunReport> {
        let info = self.database_info()?;
        let plan = Plan::rename_table(info.db_type, src, dst)?;
        let report = self.run_plan(&plan, &info).await?;
        if self.open_table.as_deref() == Some(src) {
            self.open_table = Some(dst.to_string());
        }
        Ok(report)
    }

    pub async fn duplicate_table(&mut self, src: &str, dst: &str) -> DbResult<RunReport> {
        let info = self.database_info()?;
        let plan = Plan::duplicate_table(info.db_type, src, dst)?;
        self.run_plan(&plan, &info).await
    }

    /// Drop a table. Blocked unless the caller confirmed it.
    pub async fn drop_table(&mut self, table: &str, confirmed: bool) -> DbResult<RunReport> {
        let info = self.database_info()?;
        let plan = Plan::drop_table(info.db_type, table)?;
        let report = self.run_confirmed(&plan, &info, confirmed).await?;
        if self.open_table.as_deref() == Some(table) {
            self.open_table = None;
        }
        Ok(report)
    }

    // =========================================================================
    // Rows
    // =========================================================================

    pub async fn insert_row(
        &mut self,
        table: &str,
        values: &[(String, CellValue)],
    ) -> DbResult<RunReport> {
        let schema = self.describe_table(table).await?;
        let plan = Plan::insert_row(self.info.db_type, &schema, values)?;
        let info = self.database_info()?;
        self.run_plan(&plan, &info).await
    }

    pub async fn delete_rows(&mut self, table: &str, condition: &str) -> DbResult<RunReport> {
        let info = self.database_info()?;
        let plan = Plan::delete_rows(info.db_type, table, condition)?;
        self.run_plan(&plan, &info).await
    }

    pub async fn update_rows(
        &mut self,
        table: &str,
        assignments: &[(String, CellValue)],
        condition: &str,
    ) -> DbResult<RunReport> {
        let info = self.database_info()?;
        let plan = Plan::update_rows(info.db_type, table, assignments, condition)?;
        self.run_plan(&plan, &info).await
    }

    /// Insert every row of `source` into `table`, stopping at the first failure.
    pub async fn upload(&mut self, table: &str, source: &TabularSource) -> DbResult<RunReport> {
        let info = self.database_info()?;
        let plan = Plan::bulk_upload(info.db_type, table, source)?;
        self.run_plan(&plan, &info).await
    }

    // =========================================================================
    // Ad hoc statements
    // =========================================================================

    /// Run one ad hoc statement against the active database.
    pub async fn execute(&mut self, sql: &str) -> DbResult<StatementOutcome> {
        let outcome = self
            .executor
            .execute(&self.provider, &self.info, sql, &mut self.history)
            .await?;
        if outcome.is_ack() {
            self.invalidate();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn session() -> (tempfile::NamedTempFile, Session) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let info = ConnectionInfo::sqlite(file.path().to_string_lossy());
        let session = Session::login(info, ConnectionProvider::new(), StatementExecutor::new())
            .await
            .unwrap();
        (file, session)
    }

    #[tokio::test]
    async fn test_login_rejects_missing_file() {
        let info = ConnectionInfo::sqlite("/nonexistent/dir/nothing.db");
        let result = Session::login(info, ConnectionProvider::new(), StatementExecutor::new()).await;
        assert!(matches!(result, Err(DbError::UnknownHost { .. })));
    }

    #[tokio::test]
    async fn test_sqlite_reports_main_database() {
        let (_file, mut session) = session().await;
        assert_eq!(session.active_database(), Some("main"));
        assert_eq!(session.list_databases().await.unwrap(), vec!["main"]);
        assert!(session.use_database("main").await.is_ok());
        assert!(matches!(
            session.use_database("other").await,
            Err(DbError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_pending_changes_cleared_on_reset() {
        let (_file, mut session) = session().await;
        session.queue_add_column(ColumnSpec::new("a", "INT"));
        session.queue_drop_column("b");
        assert!(!session.pending_changes().is_empty());
        session.reset_changes();
        assert!(session.pending_changes().is_empty());
    }

    #[tokio::test]
    async fn test_execute_invalidates_table_cache() {
        let (_file, mut session) = session().await;
        assert!(session.tables().await.unwrap().is_empty());

        session.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
        assert_eq!(session.tables().await.unwrap(), ["t".to_string()]);
    }
}
