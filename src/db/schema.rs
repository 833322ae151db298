//! Catalog Inspector.
//!
//! Reads database, table and column metadata from a live server and merges
//! the primary-key and foreign-key information into per-column key roles.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule. Backend-specific
//! implementations are in the `mysql` and `sqlite` submodules, each providing
//! the same interface. Every catalog failure for a table is reported as
//! [`DbError::Catalog`] and no partial result is returned.

use crate::db::connection::DbConnection;
use crate::db::dialect::quote_ident;
use crate::db::executor::StatementExecutor;
use crate::dispatch_connection;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDescriptor, DatabaseType, KeyRole, ResultSet, TableSchema};
use std::collections::BTreeSet;
use tracing::debug;

/// Server-internal databases never shown to the user.
pub const SYSTEM_DATABASES: &[&str] = &["mysql", "information_schema", "performance_schema", "sys"];

/// Check whether `name` is a server-internal database.
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(name))
}

/// Schema inspector for catalog introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List user databases, excluding [`SYSTEM_DATABASES`], in server order.
    pub async fn list_databases(conn: &mut DbConnection) -> DbResult<Vec<String>> {
        let names = dispatch_connection!(conn, {
            MySql(c) => mysql::list_databases(c).await?,
            SQLite(_) => vec![sqlite::MAIN_DATABASE.to_string()],
        });
        let names: Vec<String> = names
            .into_iter()
            .filter(|n| !is_system_database(n))
            .collect();
        debug!(count = names.len(), "Listed databases");
        Ok(names)
    }

    /// Make `database` the connection's default database.
    pub async fn use_database(conn: &mut DbConnection, database: &str) -> DbResult<()> {
        dispatch_connection!(conn, {
            MySql(c) => mysql::use_database(c, database).await,
            SQLite(_) => sqlite::use_database(database),
        })
    }

    /// List tables of the current database, or of `database` after switching to it.
    pub async fn list_tables(
        conn: &mut DbConnection,
        database: Option<&str>,
    ) -> DbResult<Vec<String>> {
        if let Some(db) = database {
            Self::use_database(conn, db).await?;
        }
        let tables = dispatch_connection!(conn, {
            MySql(c) => mysql::list_tables(c).await?,
            SQLite(c) => sqlite::list_tables(c).await?,
        });
        debug!(count = tables.len(), database = ?database, "Listed tables");
        Ok(tables)
    }

    /// Describe the columns of `table` with key roles and auto-increment flags.
    pub async fn describe_columns(
        conn: &mut DbConnection,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        describe_columns_inner(conn, table)
            .await
            .map_err(|e| DbError::catalog(table, e))
    }

    /// Describe a table.
    pub async fn describe_table(conn: &mut DbConnection, table: &str) -> DbResult<TableSchema> {
        let columns = Self::describe_columns(conn, table).await?;
        Ok(TableSchema::new(table, columns))
    }

    /// Primary key column names of `table`, in key order.
    pub async fn primary_keys(conn: &mut DbConnection, table: &str) -> DbResult<Vec<String>> {
        primary_keys_inner(conn, table)
            .await
            .map_err(|e| DbError::catalog(table, e))
    }

    /// Names of the columns of `table` that take part in a foreign key.
    pub async fn describe_foreign_keys(
        conn: &mut DbConnection,
        table: &str,
    ) -> DbResult<BTreeSet<String>> {
        foreign_keys_inner(conn, table)
            .await
            .map_err(|e| DbError::catalog(table, e))
    }

    /// The server's CREATE statement for `table`.
    pub async fn show_create_table(conn: &mut DbConnection, table: &str) -> DbResult<String> {
        show_create_inner(conn, table)
            .await
            .map_err(|e| DbError::catalog(table, e))
    }

    /// All rows of the described table, headers decorated with key roles.
    pub async fn browse_table(
        conn: &mut DbConnection,
        executor: &StatementExecutor,
        schema: &TableSchema,
    ) -> DbResult<ResultSet> {
        let sql = format!("SELECT * FROM {}", quote_ident(conn.db_type(), &schema.name));
        let mut rows = executor
            .fetch(conn, &sql)
            .await
            .map_err(|e| DbError::catalog(&schema.name, e))?;
        if rows.columns.is_empty() {
            rows = ResultSet::new(
                schema.columns.iter().map(|c| c.name.clone()).collect(),
                Vec::new(),
            );
        }
        Ok(rows.decorate(schema))
    }
}

async fn describe_columns_inner(
    conn: &mut DbConnection,
    table: &str,
) -> DbResult<Vec<ColumnDescriptor>> {
    let columns = dispatch_connection!(conn, {
        MySql(c) => mysql::fetch_columns(c, table).await?,
        SQLite(c) => sqlite::fetch_columns(c, table).await?,
    });
    if columns.is_empty() {
        return Err(DbError::invalid_input(format!(
            "Table '{}' not found",
            table
        )));
    }
    let primary_keys = primary_keys_inner(conn, table).await?;
    let foreign_keys = foreign_keys_inner(conn, table).await?;
    Ok(apply_key_roles(columns, &primary_keys, &foreign_keys))
}

async fn primary_keys_inner(conn: &mut DbConnection, table: &str) -> DbResult<Vec<String>> {
    dispatch_connection!(conn, {
        MySql(c) => mysql::primary_keys(c, table).await,
        SQLite(c) => sqlite::primary_keys(c, table).await,
    })
}

async fn foreign_keys_inner(conn: &mut DbConnection, table: &str) -> DbResult<BTreeSet<String>> {
    dispatch_connection!(conn, {
        MySql(c) => {
            let ddl = mysql::show_create_table(c, table).await?;
            Ok(parse_foreign_keys(&ddl))
        },
        SQLite(c) => sqlite::foreign_keys(c, table).await,
    })
}

async fn show_create_inner(conn: &mut DbConnection, table: &str) -> DbResult<String> {
    dispatch_connection!(conn, {
        MySql(c) => mysql::show_create_table(c, table).await,
        SQLite(c) => sqlite::show_create_table(c, table).await,
    })
}

// =============================================================================
// Key Role Merging
// =============================================================================

/// Assign key roles and auto-increment flags.
///
/// A column is `Primary` iff it is in the primary-key set, otherwise
/// `Foreign` iff it is in the foreign-key set. It is auto-increment only if it
/// is a primary key column whose extra annotations say so.
pub fn apply_key_roles(
    columns: Vec<ColumnDescriptor>,
    primary_keys: &[String],
    foreign_keys: &BTreeSet<String>,
) -> Vec<ColumnDescriptor> {
    columns
        .into_iter()
        .map(|mut col| {
            let is_primary = primary_keys.iter().any(|pk| pk == &col.name);
            col.key_role = if is_primary {
                KeyRole::Primary
            } else if foreign_keys.contains(&col.name) {
                KeyRole::Foreign
            } else {
                KeyRole::None
            };
            col.auto_increment = is_primary && col.extra.to_lowercase().contains("auto_increment");
            col
        })
        .collect()
}

// =============================================================================
// Foreign Key Text Parsing
// =============================================================================

const FOREIGN_KEY: &str = "FOREIGN KEY";

/// Extract foreign key column names from CREATE TABLE text.
///
/// Only lines whose trimmed text starts with `FOREIGN KEY`, or with a
/// `CONSTRAINT <name> FOREIGN KEY` clause, are considered. The name is the
/// text inside the first parenthesis pair after the marker, with identifier
/// quotes removed. Composite keys come back as the unsplit column list, and a
/// clause sharing a line with other definitions is not seen.
pub fn parse_foreign_keys(ddl: &str) -> BTreeSet<String> {
    ddl.lines()
        .filter_map(|line| {
            let line = line.trim();
            let upper = line.to_ascii_uppercase();
            let marker = if upper.starts_with(FOREIGN_KEY) {
                0
            } else if upper.starts_with("CONSTRAINT") {
                upper.find(FOREIGN_KEY)?
            } else {
                return None;
            };
            let rest = &line[marker + FOREIGN_KEY.len()..];
            let open = rest.find('(')?;
            let close = open + rest[open..].find(')')?;
            let name: String = rest[open + 1..close]
                .chars()
                .filter(|c| !matches!(c, '`' | '"' | '[' | ']'))
                .collect();
            let name = name.trim().to_string();
            (!name.is_empty()).then_some(name)
        })
        .collect()
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod mysql {
        pub const LIST_DATABASES: &str = "SHOW DATABASES";
        pub const LIST_TABLES: &str = "SHOW TABLES";
        pub const SHOW_COLUMNS: &str = "SHOW COLUMNS FROM";
        pub const SHOW_CREATE_TABLE: &str = "SHOW CREATE TABLE";
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;
        pub const SHOW_CREATE_TABLE: &str =
            "SELECT sql FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?";
    }
}

// =============================================================================
// Backend-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use sqlx::Executor;
    use sqlx::Row;
    use sqlx::mysql::{MySqlConnection, MySqlRow};

    /// Safely get a string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_string(row: &MySqlRow, column: &str) -> String {
        get_optional_string(row, column).unwrap_or_default()
    }

    fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<Vec<u8>>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
    }

    fn get_string_by_index(row: &MySqlRow, index: usize) -> Option<String> {
        row.try_get::<String, _>(index).ok().or_else(|| {
            row.try_get::<Vec<u8>, _>(index)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
    }

    async fn fetch_all(conn: &mut MySqlConnection, sql: &str) -> DbResult<Vec<MySqlRow>> {
        debug!(sql = %sql, "Catalog query");
        (&mut *conn).fetch_all(sql)
            .await
            .map_err(|e| DbError::from_sqlx(sql, e))
    }

    pub async fn list_databases(conn: &mut MySqlConnection) -> DbResult<Vec<String>> {
        let rows = fetch_all(conn, queries::mysql::LIST_DATABASES).await?;
        Ok(rows
            .iter()
            .filter_map(|row| get_string_by_index(row, 0))
            .collect())
    }

    pub async fn use_database(conn: &mut MySqlConnection, database: &str) -> DbResult<()> {
        let sql = format!("USE {}", quote_ident(DatabaseType::MySQL, database));
        (&mut *conn).execute(sql.as_str())
            .await
            .map_err(|e| DbError::from_sqlx(&sql, e))?;
        Ok(())
    }

    pub async fn list_tables(conn: &mut MySqlConnection) -> DbResult<Vec<String>> {
        let rows = fetch_all(conn, queries::mysql::LIST_TABLES).await?;
        Ok(rows
            .iter()
            .filter_map(|row| get_string_by_index(row, 0))
            .collect())
    }

    pub async fn fetch_columns(
        conn: &mut MySqlConnection,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let sql = format!(
            "{} {}",
            queries::mysql::SHOW_COLUMNS,
            quote_ident(DatabaseType::MySQL, table)
        );
        let rows = fetch_all(conn, &sql).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let mut col = ColumnDescriptor::new(get_string(row, "Field"), get_string(row, "Type"))
                    .nullable(get_string(row, "Null").eq_ignore_ascii_case("YES"))
                    .with_extra(get_string(row, "Extra"));
                col.default_value = get_optional_string(row, "Default");
                col
            })
            .collect())
    }

    pub async fn primary_keys(conn: &mut MySqlConnection, table: &str) -> DbResult<Vec<String>> {
        let sql = format!(
            "SHOW KEYS FROM {} WHERE Key_name = 'PRIMARY'",
            quote_ident(DatabaseType::MySQL, table)
        );
        let rows = fetch_all(conn, &sql).await?;
        Ok(rows
            .iter()
            .map(|row| get_string(row, "Column_name"))
            .filter(|name| !name.is_empty())
            .collect())
    }

    pub async fn show_create_table(conn: &mut MySqlConnection, table: &str) -> DbResult<String> {
        let sql = format!(
            "{} {}",
            queries::mysql::SHOW_CREATE_TABLE,
            quote_ident(DatabaseType::MySQL, table)
        );
        let rows = fetch_all(conn, &sql).await?;
        rows.first()
            .and_then(|row| get_string_by_index(row, 1))
            .ok_or_else(|| DbError::execution(&sql, "No CREATE statement returned", None))
    }
}

mod sqlite {
    use super::*;
    use crate::db::dialect::quote_string;
    use sqlx::Row;
    use sqlx::sqlite::SqliteConnection;

    /// The only database of a SQLite file.
    pub const MAIN_DATABASE: &str = "main";

    pub fn use_database(database: &str) -> DbResult<()> {
        if database == MAIN_DATABASE {
            Ok(())
        } else {
            Err(DbError::unsupported(
                format!("Switching to database '{}'", database),
                DatabaseType::SQLite.display_name(),
            ))
        }
    }

    pub async fn list_tables(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(queries::sqlite::LIST_TABLES.trim(), e))?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| DbError::from_sqlx(queries::sqlite::LIST_TABLES.trim(), e))
            })
            .collect()
    }

    struct PragmaColumn {
        name: String,
        declared_type: String,
        not_null: bool,
        default_value: Option<String>,
        pk_position: i64,
    }

    async fn table_info(conn: &mut SqliteConnection, table: &str) -> DbResult<Vec<PragmaColumn>> {
        let sql = format!(
            "PRAGMA table_info({})",
            quote_string(DatabaseType::SQLite, table)
        );
        debug!(sql = %sql, "Catalog query");
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(&sql, e))?;

        rows.iter()
            .map(|row| -> Result<PragmaColumn, sqlx::Error> {
                Ok(PragmaColumn {
                    name: row.try_get("name")?,
                    declared_type: row.try_get("type")?,
                    not_null: row.try_get::<i64, _>("notnull")? != 0,
                    default_value: row.try_get("dflt_value").ok().flatten(),
                    pk_position: row.try_get("pk")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| DbError::from_sqlx(&sql, e))
    }

    pub async fn fetch_columns(
        conn: &mut SqliteConnection,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let info = table_info(conn, table).await?;
        if info.is_empty() {
            return Ok(Vec::new());
        }
        // SQLite only reports AUTOINCREMENT in the stored DDL
        let ddl = show_create_table(conn, table).await?;
        let autoincrement = ddl.to_ascii_uppercase().contains("AUTOINCREMENT");

        Ok(info
            .into_iter()
            .map(|c| {
                let extra = if autoincrement && c.pk_position > 0 {
                    "auto_increment"
                } else {
                    ""
                };
                let mut col = ColumnDescriptor::new(c.name, c.declared_type)
                    .nullable(!c.not_null && c.pk_position == 0)
                    .with_extra(extra);
                col.default_value = c.default_value;
                col
            })
            .collect())
    }

    pub async fn primary_keys(conn: &mut SqliteConnection, table: &str) -> DbResult<Vec<String>> {
        let mut keyed: Vec<PragmaColumn> = table_info(conn, table)
            .await?
            .into_iter()
            .filter(|c| c.pk_position > 0)
            .collect();
        keyed.sort_by_key(|c| c.pk_position);
        Ok(keyed.into_iter().map(|c| c.name).collect())
    }

    /// Structured catalog first, DDL text when the pragma fails or lists
    /// nothing.
    pub async fn foreign_keys(
        conn: &mut SqliteConnection,
        table: &str,
    ) -> DbResult<BTreeSet<String>> {
        let sql = format!(
            "PRAGMA foreign_key_list({})",
            quote_string(DatabaseType::SQLite, table)
        );
        let listed = sqlx::query(&sql)
            .fetch_all(&mut *conn)
            .await
            .and_then(|rows| {
                rows.iter()
                    .map(|row| row.try_get::<String, _>("from"))
                    .collect::<Result<BTreeSet<_>, _>>()
            });

        match listed {
            Ok(columns) if !columns.is_empty() => return Ok(columns),
            Ok(_) => debug!(table = %table, "foreign_key_list empty, parsing DDL"),
            Err(e) => debug!(error = %e, "foreign_key_list failed, parsing DDL instead"),
        }
        let ddl = show_create_table(conn, table).await?;
        Ok(parse_foreign_keys(&ddl))
    }

    pub async fn show_create_table(conn: &mut SqliteConnection, table: &str) -> DbResult<String> {
        let row = sqlx::query(queries::sqlite::SHOW_CREATE_TABLE)
            .bind(table)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(queries::sqlite::SHOW_CREATE_TABLE, e))?;
        row.and_then(|r| r.try_get::<Option<String>, _>("sql").ok().flatten())
            .ok_or_else(|| DbError::invalid_input(format!("Table '{}' not found", table)))
    }
}
