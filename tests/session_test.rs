//! Integration tests for session state against SQLite.
//!
//! Tests verify that:
//! - refresh() is stable when nothing changed
//! - Only successful statements reach the history
//! - Mutations invalidate the cached table list
//! - Destructive operations require confirmation
//! - Pending structural changes survive a failed apply and clear on success

use db_admin::db::{ConnectionProvider, StatementExecutor};
use db_admin::error::DbError;
use db_admin::models::{CellValue, ColumnSpec, ConnectionInfo, TabularSource};
use db_admin::session::Session;
use tempfile::NamedTempFile;

async fn setup_session() -> (NamedTempFile, Session) {
    let temp_file = NamedTempFile::new().unwrap();
    let info = ConnectionInfo::sqlite(temp_file.path().to_string_lossy());
    let mut session = Session::login(info, ConnectionProvider::new(), StatementExecutor::new())
        .await
        .unwrap();
    session
        .create_table(
            "items",
            &[
                ColumnSpec::new("id", "INTEGER").primary_key().auto_increment(),
                ColumnSpec::new("label", "TEXT").not_null(true),
                ColumnSpec::new("price", "REAL"),
            ],
        )
        .await
        .unwrap();
    (temp_file, session)
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let (_file, mut session) = setup_session().await;
    session
        .insert_row(
            "items",
            &[
                ("label".to_string(), CellValue::from("pen")),
                ("price".to_string(), CellValue::Real(1.25)),
            ],
        )
        .await
        .unwrap();
    session.open_table("items").await.unwrap();

    let first = session.refresh().await.unwrap();
    let second = session.refresh().await.unwrap();
    assert_eq!(first, second);

    assert_eq!(first.database.as_deref(), Some("main"));
    assert_eq!(first.tables, vec!["items"]);
    let view = first.open_table.unwrap();
    assert_eq!(view.schema.name, "items");
    assert_eq!(view.rows.row_count(), 1);
    assert_eq!(view.rows.labels()[0], "id (P)");
}

#[tokio::test]
async fn test_history_records_only_successes() {
    let (_file, mut session) = setup_session().await;
    session.clear_history();

    session.execute("SELECT * FROM items").await.unwrap();
    let err = session.execute("SELECT * FROM no_such_table").await.unwrap_err();
    assert!(matches!(err, DbError::Execution { .. }));
    let err = session.execute("SELECT 1; SELECT 2").await.unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));

    assert_eq!(session.history(), ["SELECT * FROM items".to_string()]);
}

#[tokio::test]
async fn test_mutations_invalidate_table_cache() {
    let (_file, mut session) = setup_session().await;
    assert_eq!(session.tables().await.unwrap(), ["items".to_string()]);

    session.duplicate_table("items", "items_backup").await.unwrap();
    assert_eq!(
        session.tables().await.unwrap(),
        ["items".to_string(), "items_backup".to_string()]
    );

    session.execute("DROP TABLE items_backup").await.unwrap();
    assert_eq!(session.tables().await.unwrap(), ["items".to_string()]);
}

#[tokio::test]
async fn test_drop_table_requires_confirmation() {
    let (_file, mut session) = setup_session().await;
    session.open_table("items").await.unwrap();

    let err = session.drop_table("items", false).await.unwrap_err();
    assert!(matches!(err, DbError::DangerousOperationBlocked { .. }));
    assert_eq!(session.tables().await.unwrap(), ["items".to_string()]);

    session.drop_table("items", true).await.unwrap();
    assert!(session.tables().await.unwrap().is_empty());
    assert_eq!(session.open_table_name(), None);
}

#[tokio::test]
async fn test_database_operations_unsupported_on_sqlite() {
    let (_file, mut session) = setup_session().await;
    assert!(matches!(
        session.create_database("other").await,
        Err(DbError::Unsupported { .. })
    ));
    assert!(matches!(
        session.drop_database("main", true).await,
        Err(DbError::Unsupported { .. })
    ));
    assert!(matches!(
        session.rename_database("main", "other").await,
        Err(DbError::Unsupported { .. })
    ));
}

#[tokio::test]
async fn test_pending_changes_lifecycle() {
    let (_file, mut session) = setup_session().await;

    session.queue_add_column(ColumnSpec::new("stock", "INTEGER"));
    session.queue_drop_column("legacy_flag");
    let err = session.apply_changes("items").await.unwrap_err();
    assert!(matches!(err, DbError::PlannerStep { step_index: 1, .. }));
    // Failed apply keeps the queue for the caller to fix or reset
    assert_eq!(session.pending_changes().adds.len(), 1);
    assert_eq!(session.pending_changes().drops, vec!["legacy_flag"]);

    session.reset_changes();
    session.queue_drop_column("stock");
    let report = session.apply_changes("items").await.unwrap();
    assert_eq!(report.completed, vec!["stock dropped"]);
    assert!(session.pending_changes().is_empty());

    let schema = session.describe_table("items").await.unwrap();
    assert!(schema.column("stock").is_none());
}

#[tokio::test]
async fn test_rename_table_follows_open_table() {
    let (_file, mut session) = setup_session().await;
    session.open_table("items").await.unwrap();
    session.rename_table("items", "products").await.unwrap();
    assert_eq!(session.open_table_name(), Some("products"));

    let snapshot = session.refresh().await.unwrap();
    assert_eq!(snapshot.tables, vec!["products"]);
    assert_eq!(snapshot.open_table.unwrap().schema.name, "products");
}

#[tokio::test]
async fn test_upload_and_row_edits() {
    let (_file, mut session) = setup_session().await;

    let source = TabularSource::new(vec!["label".into(), "price".into()])
        .with_row(vec![CellValue::from("a"), CellValue::Real(1.0)])
        .with_row(vec![CellValue::from("b"), CellValue::Null])
        .with_row(vec![CellValue::Null, CellValue::Real(3.0)])
        .with_row(vec![CellValue::from("d"), CellValue::Real(4.0)]);
    let err = session.upload("items", &source).await.unwrap_err();
    match err {
        DbError::PlannerStep {
            step_index,
            committed,
            ..
        } => {
            assert_eq!(step_index, 2);
            assert_eq!(committed, vec!["row 0 inserted", "row 1 inserted"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let report = session
        .update_rows(
            "items",
            &[("price".to_string(), CellValue::Real(2.0))],
            "price IS NULL",
        )
        .await
        .unwrap();
    assert_eq!(report.affected, 1);

    let report = session.delete_rows("items", "label = 'a'").await.unwrap();
    assert_eq!(report.affected, 1);

    let rows = session
        .execute("SELECT label, price FROM items")
        .await
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(rows.row_count(), 1);
    assert_eq!(rows.get(0, "price"), Some(&CellValue::Real(2.0)));
    assert!(matches!(
        session.delete_rows("items", "").await,
        Err(DbError::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn test_show_create_table() {
    let (_file, mut session) = setup_session().await;
    let ddl = session.show_create_table("items").await.unwrap();
    assert!(ddl.contains("AUTOINCREMENT"));
    assert!(matches!(
        session.show_create_table("missing").await,
        Err(DbError::Catalog { .. })
    ));
}

#[tokio::test]
async fn test_single_row_upload_reports_row_index() {
    let (_file, mut session) = setup_session().await;

    let source = TabularSource::new(vec!["label".into()]).with_row(vec![CellValue::Null]);
    let err = session.upload("items", &source).await.unwrap_err();
    match err {
        DbError::PlannerStep {
            operation,
            step_index,
            committed,
            cause,
            ..
        } => {
            assert_eq!(operation, "bulk upload");
            assert_eq!(step_index, 0);
            assert!(committed.is_empty());
            assert!(matches!(*cause, DbError::Execution { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_refresh_closes_table_dropped_by_statement() {
    let (_file, mut session) = setup_session().await;
    session.open_table("items").await.unwrap();

    session.execute("DROP TABLE items").await.unwrap();
    let snapshot = session.refresh().await.unwrap();
    assert!(snapshot.tables.is_empty());
    assert!(snapshot.open_table.is_none());
    assert_eq!(session.open_table_name(), None);

    // Stable afterwards
    assert_eq!(session.refresh().await.unwrap(), snapshot);
}

#[tokio::test]
async fn test_refresh_closes_table_renamed_by_statement() {
    let (_file, mut session) = setup_session().await;
    session.open_table("items").await.unwrap();

    session
        .execute("ALTER TABLE items RENAME TO goods")
        .await
        .unwrap();
    let snapshot = session.refresh().await.unwrap();
    assert_eq!(snapshot.tables, vec!["goods"]);
    assert!(snapshot.open_table.is_none());
}
