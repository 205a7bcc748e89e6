//! Database abstraction layer.
//!
//! A trait-based interface over the two supported backends: the bundled
//! read-only SQLite file and a remote MySQL server.

mod mock;
mod mysql;
mod schema;
mod sqlite;
mod types;

pub use mock::MockDatabaseClient;
pub use mysql::MySqlClient;
pub use schema::{Column, ForeignKey, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Maximum number of rows returned by a single query.
pub(crate) const MAX_ROWS: usize = 1000;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    MySql,
}

impl DatabaseBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
        }
    }

    /// Quotes an identifier for use in generated SQL.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Self::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
            Self::MySql => format!("`{}`", name.replace('`', "``")),
        }
    }
}

/// Trait defining the interface for database clients.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    fn backend(&self) -> DatabaseBackend;

    /// Lists the user tables of the connected database.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Introspects tables, columns and foreign keys.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL statement and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the underlying pool.
    async fn close(&self) -> Result<()>;
}

/// A live, shareable database handle.
pub type DatabaseHandle = Arc<dyn DatabaseClient>;
