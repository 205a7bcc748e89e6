//! MySQL database client for the remote connection mode.

use super::{
    Column, ColumnInfo, DatabaseBackend, DatabaseClient, ForeignKey, QueryResult, Row, Schema,
    Table, Value, MAX_ROWS,
};
use crate::error::{Result, SqlChatError};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::Decimal;
use sqlx::{Column as _, Row as _, TypeInfo as _};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// MySQL client backed by a connection pool.
pub struct MySqlClient {
    pool: MySqlPool,
    display: String,
}

impl MySqlClient {
    /// Connects to the server described by `url`. A failure is returned as is;
    /// there is no retry.
    pub async fn connect(url: &str, label: impl Into<String>) -> Result<Self> {
        let label = label.into();

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| map_connection_error(&e, &label))?;

        debug!(target_db = %label, "Connected to MySQL");

        Ok(Self {
            pool,
            display: label,
        })
    }

    async fn fetch_table_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
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
            "SELECT CAST(column_name AS CHAR), CAST(column_type AS CHAR), \
                    CAST(is_nullable AS CHAR), CAST(column_default AS CHAR), \
                    CAST(column_key AS CHAR) \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY ordinal_position",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SqlChatError::query(format!("Failed to describe {name}: {e}")))?;

        let mut table = Table::new(name);
        for row in &rows {
            let column_name: String = row
                .try_get(0)
                .map_err(|e| SqlChatError::query(e.to_string()))?;
            let data_type: String = row.try_get(1).unwrap_or_default();
            let nullable: String = row.try_get(2).unwrap_or_default();
            let default: Option<String> = row.try_get(3).unwrap_or(None);
            let key: String = row.try_get(4).unwrap_or_default();

            if key == "PRI" {
                table.primary_key.push(column_name.clone());
            }

            let mut column = Column::new(column_name, data_type).nullable(nullable == "YES");
            column.default = default;
            table.columns.push(column);
        }

        Ok(table)
    }

    async fn fetch_foreign_keys(&self) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            "SELECT CAST(constraint_name AS CHAR), CAST(table_name AS CHAR), \
                    CAST(column_name AS CHAR), CAST(referenced_table_name AS CHAR), \
                    CAST(referenced_column_name AS CHAR) \
             FROM information_schema.key_column_usage \
             WHERE table_schema = DATABASE() AND referenced_table_name IS NOT NULL \
             ORDER BY constraint_name, ordinal_position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SqlChatError::query(format!("Failed to read foreign keys: {e}")))?;

        let mut keys: Vec<(String, ForeignKey)> = Vec::new();
        for row in &rows {
            let constraint: String = row.try_get(0).unwrap_or_default();
            let from_table: String = row.try_get(1).unwrap_or_default();
            let from: String = row.try_get(2).unwrap_or_default();
            let to_table: String = row.try_get(3).unwrap_or_default();
            let to: String = row.try_get(4).unwrap_or_default();

            match keys
                .iter_mut()
                .find(|(name, fk)| *name == constraint && fk.from_table == from_table)
            {
                Some((_, fk)) => {
                    fk.from_columns.push(from);
                    fk.to_columns.push(to);
                }
                None => keys.push((
                    constraint,
                    ForeignKey::new(from_table, vec![from], to_table, vec![to]),
                )),
            }
        }

        Ok(keys.into_iter().map(|(_, fk)| fk).collect())
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySql
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.fetch_table_names().await
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let mut schema = Schema::new();
        for name in self.fetch_table_names().await? {
            schema.tables.push(self.fetch_table(&name).await?);
        }
        schema.foreign_keys = self.fetch_foreign_keys().await?;
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
        debug!(target_db = %self.display, "Closing MySQL pool");
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let upper = type_name.to_uppercase();
    let decoded = match upper.as_str() {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(index).ok().map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(index).ok().map(Value::from)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .map(|v| v.map(|n| Value::Int(n as i64)).unwrap_or(Value::Null)),
        "FLOAT" | "DOUBLE" => row.try_get::<Option<f64>, _>(index).ok().map(Value::from),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .map(|v| v.map(Value::Bytes).unwrap_or(Value::Null)),
        "DECIMAL" => row
            .try_get::<Option<Decimal>, _>(index)
            .ok()
            .map(|v| text_or_null(v.map(|d| d.to_string()))),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .ok()
            .map(|v| text_or_null(v.map(|d| d.to_string()))),
        "DATETIME" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .map(|v| text_or_null(v.map(|d| d.to_string()))),
        "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .map(|v| text_or_null(v.map(|d| d.naive_utc().to_string()))),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)
            .ok()
            .map(|v| text_or_null(v.map(|t| t.to_string()))),
        "NULL" => Some(Value::Null),
        _ => None,
    };

    decoded
        .or_else(|| row.try_get::<Option<String>, _>(index).ok().map(Value::from))
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(index).ok().map(|v| {
                v.map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
                    .unwrap_or(Value::Null)
            })
        })
        .unwrap_or_else(|| Value::String(format!("<{upper}>")))
}

fn text_or_null(text: Option<String>) -> Value {
    text.map(Value::String).unwrap_or(Value::Null)
}

fn map_connection_error(error: &sqlx::Error, display: &str) -> SqlChatError {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        SqlChatError::connection(format!(
            "Cannot connect to {display}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") {
        SqlChatError::connection(format!(
            "Access denied for {display}. Check your credentials."
        ))
    } else if error_str.contains("unknown database") {
        SqlChatError::connection(format!("Database does not exist: {display}"))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        SqlChatError::connection(format!("Connection to {display} timed out."))
    } else {
        SqlChatError::connection(error.to_string())
    }
}

fn format_query_error(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
