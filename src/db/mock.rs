//! Mock database client for testing.
//!
//! Serves a fixed schema and canned query results, and records every SQL
//! statement it receives.

use super::{Column, ColumnInfo, DatabaseBackend, DatabaseClient, QueryResult, Schema, Table, Value};
use crate::error::{Result, SqlChatError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that returns predefined results.
#[derive(Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    results: HashMap<String, QueryResult>,
    executed: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockDatabaseClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    /// A STUDENT table with five rows that answers the row count query.
    pub fn with_student_table() -> Self {
        let schema = Schema {
            tables: vec![Table::new("STUDENT")
                .with_column(Column::new("NAME", "VARCHAR(25)"))
                .with_column(Column::new("CLASS", "VARCHAR(25)"))
                .with_column(Column::new("SECTION", "VARCHAR(25)"))
                .with_column(Column::new("MARKS", "INT"))],
            foreign_keys: Vec::new(),
        };
        Self::with_schema(schema).with_result(
            "SELECT COUNT(*) FROM STUDENT",
            QueryResult::with_data(
                vec![ColumnInfo::new("COUNT(*)", "INTEGER")],
                vec![vec![Value::Int(5)]],
            ),
        )
    }

    /// Registers a result for a statement. Matching ignores case and
    /// surrounding whitespace and a trailing semicolon.
    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.results.insert(normalize(sql), result);
        self
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn normalize(sql: &str) -> String {
    sql.trim().trim_end_matches(';').trim().to_lowercase()
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.schema.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut queries) = self.executed.lock() {
            queries.push(sql.to_string());
        }

        if let Some(result) = self.results.get(&normalize(sql)) {
            return Ok(result.clone());
        }

        if normalize(sql).starts_with("select") {
            let result = QueryResult::with_data(
                vec![ColumnInfo::new("result", "TEXT")],
                vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            );
            Ok(result.with_execution_time(Duration::from_millis(1)))
        } else {
            Err(SqlChatError::query("attempt to write a readonly database"))
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
