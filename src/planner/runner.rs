//! Plan runner.
//!
//! Executes the steps of a [`Plan`] in order on one scoped connection and
//! stops at the first failing step. Nothing is rolled back: steps that
//! completed before the failure stay committed and are listed in the error.

use crate::db::connection::{ConnectionProvider, DbConnection};
use crate::db::executor::StatementExecutor;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionInfo, StatementHistory, StatementOutcome};
use crate::planner::plan::{Operation, Plan};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Progress of a plan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running(usize),
    Completed,
    FailedAt(usize),
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub operation: Operation,
    pub target: String,
    /// Descriptions of the executed steps, in order.
    pub completed: Vec<String>,
    /// Total rows affected across all steps.
    pub affected: u64,
}

/// Runs plans through a [`StatementExecutor`].
pub struct PlanRunner<'a> {
    executor: &'a StatementExecutor,
    state: RunState,
}

impl<'a> PlanRunner<'a> {
    pub fn new(executor: &'a StatementExecutor) -> Self {
        Self {
            executor,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Open a connection for `info`, run the plan on it and close it.
    pub async fn run(
        &mut self,
        provider: &ConnectionProvider,
        info: &ConnectionInfo,
        plan: &Plan,
        history: &mut StatementHistory,
    ) -> DbResult<RunReport> {
        let mut conn = provider.open(info).await?;
        let result = self.run_on(conn.conn(), plan, history).await;
        conn.finish(result).await
    }

    /// Run the plan on a caller-owned connection.
    ///
    /// A failing step is reported as [`DbError::PlannerStep`], except for
    /// single-statement operations, which return the statement's own error.
    pub async fn run_on(
        &mut self,
        conn: &mut DbConnection,
        plan: &Plan,
        history: &mut StatementHistory,
    ) -> DbResult<RunReport> {
        let start = Instant::now();
        let mut completed = Vec::with_capacity(plan.steps.len());
        let mut affected = 0u64;

        info!(
            operation = %plan.operation,
            target = %plan.target,
            steps = plan.steps.len(),
            "Running plan"
        );

        for (index, step) in plan.steps.iter().enumerate() {
            self.state = RunState::Running(index);
            debug!(step = index, description = %step.description, "Plan step");

            match self.executor.execute_on(conn, &step.sql, history).await {
                Ok(outcome) => {
                    if let StatementOutcome::Ack { affected: n } = outcome {
                        affected += n;
                    }
                    completed.push(step.description.clone());
                }
                Err(cause) => {
                    self.state = RunState::FailedAt(index);
                    warn!(
                        operation = %plan.operation,
                        step = index,
                        committed = completed.len(),
                        error = %cause,
                        "Plan step failed"
                    );
                    if plan.operation.is_single_statement() {
                        return Err(cause);
                    }
                    return Err(DbError::planner_step(
                        plan.operation.name(),
                        index,
                        step.sql.clone(),
                        completed,
                        cause,
                    ));
                }
            }
        }

        self.state = RunState::Completed;
        info!(
            operation = %plan.operation,
            target = %plan.target,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Plan completed"
        );
        Ok(RunReport {
            operation: plan.operation,
            target: plan.target.clone(),
            completed,
            affected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, ColumnSpec, DatabaseType, TabularSource};

    fn sqlite_info() -> (tempfile::NamedTempFile, ConnectionInfo) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let info = ConnectionInfo::sqlite(file.path().to_string_lossy());
        (file, info)
    }

    #[tokio::test]
    async fn test_run_completes_and_records_history() {
        let (_file, info) = sqlite_info();
        let provider = ConnectionProvider::new();
        let executor = StatementExecutor::new();
        let mut history = StatementHistory::new();
        let mut runner = PlanRunner::new(&executor);
        assert_eq!(runner.state(), RunState::Idle);

        let plan = Plan::create_table(
            DatabaseType::SQLite,
            "t",
            &[ColumnSpec::new("a", "INTEGER")],
        )
        .unwrap();
        let report = runner.run(&provider, &info, &plan, &mut history).await.unwrap();
        assert_eq!(report.completed, vec!["t created"]);
        assert_eq!(runner.state(), RunState::Completed);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_single_step_failure_is_execution_error() {
        let (_file, info) = sqlite_info();
        let provider = ConnectionProvider::new();
        let executor = StatementExecutor::new();
        let mut history = StatementHistory::new();
        let mut runner = PlanRunner::new(&executor);

        let plan = Plan::drop_table(DatabaseType::SQLite, "missing").unwrap();
        let err = runner
            .run(&provider, &info, &plan, &mut history)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Execution { .. }));
        assert_eq!(runner.state(), RunState::FailedAt(0));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_upload_aborts_at_failing_row() {
        let (_file, info) = sqlite_info();
        let provider = ConnectionProvider::new();
        let executor = StatementExecutor::new();
        let mut history = StatementHistory::new();
        let mut runner = PlanRunner::new(&executor);

        let setup = Plan::create_table(
            DatabaseType::SQLite,
            "u",
            &[ColumnSpec::new("a", "INTEGER").primary_key()],
        )
        .unwrap();
        runner.run(&provider, &info, &setup, &mut history).await.unwrap();

        let source = TabularSource::new(vec!["a".into()])
            .with_row(vec![CellValue::Integer(1)])
            .with_row(vec![CellValue::Integer(1)])
            .with_row(vec![CellValue::Integer(2)]);
        let plan = Plan::bulk_upload(DatabaseType::SQLite, "u", &source).unwrap();
        let err = runner
            .run(&provider, &info, &plan, &mut history)
            .await
            .unwrap_err();
        match err {
            DbError::PlannerStep {
                step_index,
                committed,
                ..
            } => {
                assert_eq!(step_index, 1);
                assert_eq!(committed, vec!["row 0 inserted"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.state(), RunState::FailedAt(1));
    }
}
