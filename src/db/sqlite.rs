//! SQLite database client.
//!
//! Opens the bundled database file read-only. SQLite itself rejects any
//! write attempted through this handle.

use super::{
    Column, ColumnInfo, DatabaseBackend, DatabaseClient, ForeignKey, QueryResult, Row, Schema,
    Table, Value, MAX_ROWS,
};
use crate::error::{Result, SqlChatError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row as _, TypeInfo as _};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// SQLite client backed by a read-only connection pool.
pub struct SqliteClient {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteClient {
    /// Opens the database at `path` in read-only mode. The file must exist.
    pub async fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SqlChatError::connection(format!(
                "Local database not found at {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                SqlChatError::connection(format!("Cannot open {}: {e}", path.display()))
            })?;

        debug!(path = %path.display(), "Opened SQLite database read-only");

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn fetch_table_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SqlChatError::query(format!("Failed to list tables: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|e| SqlChatError::query(e.to_string()))
            })
            .collect()
    }

    async fn fetch_table(&self, name: &str) -> Result<Table> {
        let rows = sqlx::query(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SqlChatError::query(format!("Failed to describe {name}: {e}")))?;

        let mut table = Table::new(name);
        let mut pk: Vec<(i64, String)> = Vec::new();

        for row in &rows {
            let column_name: String = row
                .try_get(0)
                .map_err(|e| SqlChatError::query(e.to_string()))?;
            let data_type: String = row.try_get(1).unwrap_or_default();
            let not_null: i64 = row.try_get(2).unwrap_or(0);
            let default: Option<String> = row.try_get(3).unwrap_or(None);
            let pk_position: i64 = row.try_get(4).unwrap_or(0);

            if pk_position > 0 {
                pk.push((pk_position, column_name.clone()));
            }

            let mut column = Column::new(column_name, data_type).nullable(not_null == 0);
            column.default = default;
            table.columns.push(column);
        }

        pk.sort_by_key(|(position, _)| *position);
        table.primary_key = pk.into_iter().map(|(_, name)| name).collect();

        Ok(table)
    }

    async fn fetch_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            "SELECT id, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?) ORDER BY id, seq",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SqlChatError::query(format!("Failed to read foreign keys of {table}: {e}")))?;

        let mut keys: Vec<(i64, ForeignKey)> = Vec::new();
        for row in &rows {
            let id: i64 = row.try_get(0).unwrap_or(0);
            let to_table: String = row.try_get(1).unwrap_or_default();
            let from: String = row.try_get(2).unwrap_or_default();
            let to: Option<String> = row.try_get(3).unwrap_or(None);

            match keys.iter_mut().find(|(key_id, _)| *key_id == id) {
                Some((_, fk)) => {
                    fk.from_columns.push(from);
                    fk.to_columns.extend(to);
                }
                None => keys.push((
                    id,
                    ForeignKey::new(table, vec![from], to_table, to.into_iter().collect()),
                )),
            }
        }

        Ok(keys.into_iter().map(|(_, fk)| fk).collect())
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.fetch_table_names().await
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let mut schema = Schema::new();
        for name in self.fetch_table_names().await? {
            schema.foreign_keys.extend(self.fetch_foreign_keys(&name).await?);
            schema.tables.push(self.fetch_table(&name).await?);
        }
        Ok(schema)
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            SqlChatError::query(format!(
                "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
            ))
        })?
        .map_err(|e| SqlChatError::query(format_query_error(&e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;
        if was_truncated {
            warn!(total_rows, max_rows = MAX_ROWS, "Truncating query result");
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows,
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes one cell. SQLite is dynamically typed, so after the declared type
/// fails the decoder falls back through the storage classes.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    let declared = match type_name.to_uppercase().as_str() {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(index).ok().map(Value::from),
        "INTEGER" | "INT8" | "BIGINT" | "INT" => {
            row.try_get::<Option<i64>, _>(index).ok().map(Value::from)
        }
        "REAL" | "FLOAT" | "DOUBLE" => row.try_get::<Option<f64>, _>(index).ok().map(Value::from),
        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .map(|v| v.map(Value::Bytes).unwrap_or(Value::Null)),
        "NULL" => Some(Value::Null),
        _ => None,
    };

    declared
        .or_else(|| row.try_get::<Option<i64>, _>(index).ok().map(Value::from))
        .or_else(|| row.try_get::<Option<f64>, _>(index).ok().map(Value::from))
        .or_else(|| row.try_get::<Option<String>, _>(index).ok().map(Value::from))
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(index)
                .ok()
                .map(|v| v.map(Value::Bytes).unwrap_or(Value::Null))
        })
        .unwrap_or(Value::Null)
}

fn format_query_error(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use sqlx::ConnectOptions;
    use tempfile::TempDir;

    async fn create_fixture() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.db");

        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();

        for stmt in [
            "CREATE TABLE classes (id INTEGER PRIMARY KEY, title TEXT NOT NULL)",
            "CREATE TABLE students (id INTEGER PRIMARY KEY, name VARCHAR(25) NOT NULL, \
             marks REAL, class_id INTEGER REFERENCES classes(id))",
            "INSERT INTO classes VALUES (1, 'Data Science')",
            "INSERT INTO students VALUES (1, 'Krish', 90.5, 1), (2, 'Darius', NULL, 1)",
        ] {
            sqlx::query(stmt).execute(&mut conn).await.unwrap();
        }
        drop(conn);

        (dir, path)
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.db");

        let err = SqliteClient::open_read_only(&missing).await.err().unwrap();
        assert_eq!(err.category(), "Connection Error");
        assert!(!missing.exists(), "read-only open must not create the file");
    }

    #[tokio::test]
    async fn test_list_tables() {
        let (_dir, path) = create_fixture().await;
        let client = SqliteClient::open_read_only(&path).await.unwrap();

        assert_eq!(client.list_tables().await.unwrap(), vec!["classes", "students"]);
    }

    #[tokio::test]
    async fn test_introspect_schema() {
        let (_dir, path) = create_fixture().await;
        let client = SqliteClient::open_read_only(&path).await.unwrap();

        let schema = client.introspect_schema().await.unwrap();
        let students = schema.table("students").unwrap();

        assert_eq!(students.primary_key, vec!["id"]);
        assert_eq!(students.columns.len(), 4);
        assert!(!students.columns[1].is_nullable);
        assert_eq!(students.columns[1].data_type, "VARCHAR(25)");
        assert_eq!(schema.foreign_keys.len(), 1);
        assert_eq!(schema.foreign_keys[0].to_table, "classes");
    }

    #[tokio::test]
    async fn test_execute_select() {
        let (_dir, path) = create_fixture().await;
        let client = SqliteClient::open_read_only(&path).await.unwrap();

        let result = client
            .execute_query("SELECT name, marks FROM students ORDER BY id")
            .await
            .unwrap();

        assert_eq!(result.row_count, 2);
        assert_eq!(result.columns[0].name, "name");
        assert_eq!(result.rows[0][0], Value::from("Krish"));
        assert_eq!(result.rows[0][1], Value::Float(90.5));
        assert_eq!(result.rows[1][1], Value::Null);
    }

    #[tokio::test]
    async fn test_count_query() {
        let (_dir, path) = create_fixture().await;
        let client = SqliteClient::open_read_only(&path).await.unwrap();

        let result = client
            .execute_query("SELECT COUNT(*) FROM students")
            .await
            .unwrap();

        assert_eq!(result.rows[0][0], Value::Int(2));
    }

    #[tokio::test]
    async fn test_writes_are_rejected() {
        let (_dir, path) = create_fixture().await;
        let client = SqliteClient::open_read_only(&path).await.unwrap();

        let err = client
            .execute_query("INSERT INTO classes VALUES (2, 'Art')")
            .await
            .unwrap_err();

        assert_eq!(err.category(), "Query Error");
        assert!(err.to_string().contains("readonly"), "got: {err}");
    }

    #[tokio::test]
    async fn test_query_error_message() {
        let (_dir, path) = create_fixture().await;
        let client = SqliteClient::open_read_only(&path).await.unwrap();

        let err = client
            .execute_query("SELECT * FROM nope")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no such table"));
    }
}
