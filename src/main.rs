//! db-admin - Main entry point.
//!
//! Logs in, runs one session operation per invocation and prints the result.

use clap::Parser;
use db_admin::config::{Command, Config};
use db_admin::db::{ConnectionProvider, StatementExecutor, check_dangerous_sql};
use db_admin::db::guard::DangerousOperationType;
use db_admin::error::{DbError, DbResult};
use db_admin::format::{
    OutputFormat, format_names, format_report, format_result, format_schema, to_json,
};
use db_admin::models::StatementOutcome;
use db_admin::session::Session;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so stdout carries only command output.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn report_error(e: &DbError) {
    error!(error = %e, "Command failed");
    eprintln!("Error: {}", e);
    if let Some(suggestion) = e.suggestion() {
        eprintln!("Hint: {}", suggestion);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    let conn_info = config.connection_info()?;
    info!(
        target_db = %conn_info.masked(),
        "Starting db-admin v{}",
        env!("CARGO_PKG_VERSION")
    );

    let provider = ConnectionProvider::new().with_connect_timeout(config.connect_timeout_duration());
    let executor = StatementExecutor::new()
        .with_timeout(config.query_timeout_duration())
        .with_row_limit(config.row_limit());

    let mut session = match Session::login(conn_info, provider, executor).await {
        Ok(session) => session,
        Err(e) => {
            report_error(&e);
            std::process::exit(1);
        }
    };

    let result = run(&mut session, &config).await;
    session.disconnect();

    match result {
        Ok(output) => {
            println!("{}", output.trim_end());
            Ok(())
        }
        Err(e) => {
            report_error(&e);
            std::process::exit(1);
        }
    }
}

async fn run(session: &mut Session, config: &Config) -> DbResult<String> {
    let format = config.format;
    let output = match &config.command {
        Command::Databases => format_names("Database", &session.list_databases().await?, format),
        Command::Tables { database } => {
            if let Some(db) = database {
                session.use_database(db).await?;
            }
            format_names("Table", session.tables().await?, format)
        }
        Command::Describe { table } => format_schema(&session.describe_table(table).await?, format),
        Command::Browse { table } => {
            let start = Instant::now();
            let view = session.open_table(table).await?;
            format_result(&view.rows, format, start.elapsed().as_millis() as u64)
        }
        Command::Ddl { table } => {
            let ddl = session.show_create_table(table).await?;
            match format {
                OutputFormat::Json => to_json(&serde_json::json!({ "table": table, "ddl": ddl })),
                _ => ddl,
            }
        }
        Command::Exec { sql, yes } => {
            if let Some(op) = check_dangerous_sql(sql, session.info().db_type) {
                if !yes {
                    return Err(op.blocked());
                }
            }
            let start = Instant::now();
            let outcome = session.execute(sql).await?;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match (&outcome, format) {
                (_, OutputFormat::Json) => to_json(&outcome),
                (StatementOutcome::Rows(rows), _) => format_result(rows, format, elapsed_ms),
                (StatementOutcome::Ack { affected }, _) => format!(
                    "Query OK, {} rows affected ({:.2} sec)",
                    affected,
                    elapsed_ms as f64 / 1000.0
                ),
            }
        }
        Command::CreateDb { name } => format_report(&session.create_database(name).await?, format),
        Command::DropDb { name, yes } => {
            format_report(&session.drop_database(name, *yes).await?, format)
        }
        Command::RenameDb { old, new } => {
            format_report(&session.rename_database(old, new).await?, format)
        }
        Command::CreateTable { name, columns } => {
            format_report(&session.create_table(name, columns).await?, format)
        }
        Command::AlterTable {
            table,
            add,
            drop,
            yes,
        } => {
            if !drop.is_empty() && !yes {
                return Err(DangerousOperationType::AlterTableDropColumn.blocked());
            }
            for spec in add {
                session.queue_add_column(spec.clone());
            }
            for name in drop {
                session.queue_drop_column(name);
            }
            format_report(&session.apply_changes(table).await?, format)
        }
        Command::DropTable { table, yes } => {
            format_report(&session.drop_table(table, *yes).await?, format)
        }
        Command::RenameTable { src, dst } => {
            format_report(&session.rename_table(src, dst).await?, format)
        }
        Command::DuplicateTable { src, dst } => {
            format_report(&session.duplicate_table(src, dst).await?, format)
        }
        Command::Insert { table, values } => {
            format_report(&session.insert_row(table, values).await?, format)
        }
        Command::Delete { table, condition } => {
            format_report(&session.delete_rows(table, condition).await?, format)
        }
        Command::Update {
            table,
            assignments,
            condition,
        } => format_report(
            &session.update_rows(table, assignments, condition).await?,
            format,
        ),
    };
    Ok(output)
}
