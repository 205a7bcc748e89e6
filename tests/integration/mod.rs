//! Integration tests against real database files.

pub mod agent_test;
pub mod mysql_test;
pub mod sqlite_test;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::ConnectOptions;
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a database shaped like the bundled example: a STUDENT table with
/// five rows. Keep the `TempDir` alive for as long as the file is needed.
pub async fn student_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.db");

    let mut conn = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();

    for stmt in [
        "CREATE TABLE STUDENT (NAME VARCHAR(25), CLASS VARCHAR(25), SECTION VARCHAR(25), MARKS INT)",
        "INSERT INTO STUDENT VALUES ('Krish', 'Data Science', 'A', 90)",
        "INSERT INTO STUDENT VALUES ('John', 'Data Science', 'B', 100)",
        "INSERT INTO STUDENT VALUES ('Mukesh', 'Data Science', 'A', 86)",
        "INSERT INTO STUDENT VALUES ('Jacob', 'DEVOPS', 'A', 50)",
        "INSERT INTO STUDENT VALUES ('Dipesh', 'DEVOPS', 'A', 35)",
    ] {
        sqlx::query(stmt).execute(&mut conn).await.unwrap();
    }
    drop(conn);

    (dir, path)
}
