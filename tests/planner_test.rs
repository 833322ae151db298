//! Integration tests for structural plans run against SQLite.
//!
//! Tests verify that:
//! - Alter batches report completed steps when a later step fails
//! - Copy-then-drop rename and duplicate keep the rows
//! - Row edits render literals that round-trip through the server

use db_admin::db::{ConnectionProvider, SchemaInspector, StatementExecutor};
use db_admin::error::DbError;
use db_admin::models::{
    CellValue, ColumnSpec, ConnectionInfo, StatementHistory, StructuralChangeSet, TabularSource,
};
use db_admin::planner::{Plan, PlanRunner, RunState};
use tempfile::NamedTempFile;

struct Fixture {
    _file: NamedTempFile,
    info: ConnectionInfo,
    provider: ConnectionProvider,
    executor: StatementExecutor,
    history: StatementHistory,
}

impl Fixture {
    async fn new() -> Self {
        let file = NamedTempFile::new().unwrap();
        let info = ConnectionInfo::sqlite(file.path().to_string_lossy());
        let mut fixture = Self {
            _file: file,
            info,
            provider: ConnectionProvider::new(),
            executor: StatementExecutor::new(),
            history: StatementHistory::new(),
        };
        let plan = Plan::create_table(
            fixture.info.db_type,
            "people",
            &[
                ColumnSpec::new("id", "INTEGER").primary_key().auto_increment(),
                ColumnSpec::new("name", "TEXT").not_null(true),
            ],
        )
        .unwrap();
        fixture.run(&plan).await.unwrap();
        fixture
    }

    async fn run(&mut self, plan: &Plan) -> db_admin::DbResult<db_admin::planner::RunReport> {
        PlanRunner::new(&self.executor)
            .run(&self.provider, &self.info, plan, &mut self.history)
            .await
    }

    async fn count(&mut self, table: &str) -> i64 {
        let rows = self
            .executor
            .execute(
                &self.provider,
                &self.info,
                &format!("SELECT COUNT(*) AS n FROM \"{}\"", table),
                &mut self.history,
            )
            .await
            .unwrap()
            .into_rows()
            .unwrap();
        match rows.get(0, "n") {
            Some(CellValue::Integer(n)) => *n,
            other => panic!("unexpected count cell: {other:?}"),
        }
    }

    async fn columns(&self, table: &str) -> Vec<String> {
        let mut conn = self.provider.open(&self.info).await.unwrap();
        let schema = SchemaInspector::describe_table(conn.conn(), table)
            .await
            .unwrap();
        conn.close().await;
        schema.columns.into_iter().map(|c| c.name).collect()
    }
}

#[tokio::test]
async fn test_alter_partial_failure_reports_committed_steps() {
    let mut fx = Fixture::new().await;

    let mut changes = StructuralChangeSet::new();
    changes.add_column(ColumnSpec::new("age", "INT"));
    changes.drop_column("legacy_flag");
    let plan = Plan::alter_table(fx.info.db_type, "people", &changes).unwrap();

    let mut runner = PlanRunner::new(&fx.executor);
    let err = runner
        .run(&fx.provider, &fx.info, &plan, &mut fx.history)
        .await
        .unwrap_err();
    assert_eq!(runner.state(), RunState::FailedAt(1));

    match err {
        DbError::PlannerStep {
            operation,
            step_index,
            statement,
            committed,
            cause,
        } => {
            assert_eq!(operation, "alter table");
            assert_eq!(step_index, 1);
            assert!(statement.contains("legacy_flag"));
            assert_eq!(committed, vec!["age added"]);
            assert!(matches!(*cause, DbError::Execution { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    let columns = fx.columns("people").await;
    assert_eq!(columns, vec!["id", "name", "age"]);

    let mut conn = fx.provider.open(&fx.info).await.unwrap();
    let schema = SchemaInspector::describe_table(conn.conn(), "people")
        .await
        .unwrap();
    conn.close().await;
    assert!(schema.column("age").unwrap().is_nullable);
}

#[tokio::test]
async fn test_alter_add_and_drop() {
    let mut fx = Fixture::new().await;

    let mut changes = StructuralChangeSet::new();
    changes.add_column(ColumnSpec::new("email", "TEXT"));
    changes.add_column(ColumnSpec::new("nickname", "TEXT"));
    changes.drop_column("nickname");
    let plan = Plan::alter_table(fx.info.db_type, "people", &changes).unwrap();
    let report = fx.run(&plan).await.unwrap();

    assert_eq!(
        report.completed,
        vec!["email added", "nickname added", "nickname dropped"]
    );
    assert_eq!(fx.columns("people").await, vec!["id", "name", "email"]);
}

#[tokio::test]
async fn test_rename_and_duplicate_keep_rows() {
    let mut fx = Fixture::new().await;
    let db = fx.info.db_type;

    let source = TabularSource::new(vec!["name".into()])
        .with_row(vec![CellValue::from("Ann")])
        .with_row(vec![CellValue::from("Bo")]);
    let report = fx.run(&Plan::bulk_upload(db, "people", &source).unwrap()).await.unwrap();
    assert_eq!(report.affected, 2);

    fx.run(&Plan::duplicate_table(db, "people", "people_copy").unwrap())
        .await
        .unwrap();
    assert_eq!(fx.count("people_copy").await, 2);
    assert_eq!(fx.count("people").await, 2);

    fx.run(&Plan::rename_table(db, "people_copy", "staff").unwrap())
        .await
        .unwrap();
    let mut conn = fx.provider.open(&fx.info).await.unwrap();
    let tables = SchemaInspector::list_tables(conn.conn(), None).await.unwrap();
    conn.close().await;
    assert!(tables.contains(&"staff".to_string()));
    assert!(!tables.contains(&"people_copy".to_string()));
    assert_eq!(fx.count("staff").await, 2);
}

#[tokio::test]
async fn test_row_edits() {
    let mut fx = Fixture::new().await;
    let db = fx.info.db_type;

    let mut conn = fx.provider.open(&fx.info).await.unwrap();
    let schema = SchemaInspector::describe_table(conn.conn(), "people")
        .await
        .unwrap();
    conn.close().await;

    let insert = Plan::insert_row(
        db,
        &schema,
        &[
            ("id".to_string(), CellValue::Null),
            ("name".to_string(), CellValue::from("O'Brien")),
        ],
    )
    .unwrap();
    fx.run(&insert).await.unwrap();

    let update = Plan::update_rows(
        db,
        "people",
        &[("name".to_string(), CellValue::from("Ó Briain"))],
        "name = 'O''Brien'",
    )
    .unwrap();
    assert_eq!(fx.run(&update).await.unwrap().affected, 1);

    let rows = fx
        .executor
        .execute(&fx.provider, &fx.info, "SELECT id, name FROM people", &mut fx.history)
        .await
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(rows.get(0, "id"), Some(&CellValue::Integer(1)));
    assert_eq!(rows.get(0, "name"), Some(&CellValue::from("Ó Briain")));

    let delete = Plan::delete_rows(db, "people", "id = 1").unwrap();
    assert_eq!(fx.run(&delete).await.unwrap().affected, 1);
    assert_eq!(fx.count("people").await, 0);
}

#[tokio::test]
async fn test_failed_steps_are_not_in_history() {
    let mut fx = Fixture::new().await;
    let before = fx.history.len();

    let plan = Plan::drop_table(fx.info.db_type, "missing").unwrap();
    let err = fx.run(&plan).await.unwrap_err();
    assert!(matches!(err, DbError::Execution { .. }));
    assert_eq!(fx.history.len(), before);
}
