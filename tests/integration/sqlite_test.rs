//! Read-only SQLite behavior through the handle factory.

use super::student_db;
use sqlchat::connection::{ConnectionConfig, HandleFactory};
use sqlchat::db::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TTL: Duration = Duration::from_secs(7200);

#[tokio::test]
async fn test_local_handle_reads() {
    let (_dir, path) = student_db().await;
    let factory = HandleFactory::new(&path, TTL);

    let db = factory.configure(&ConnectionConfig::Local).await.unwrap();
    assert_eq!(db.list_tables().await.unwrap(), vec!["STUDENT"]);

    let result = db
        .execute_query("SELECT NAME FROM STUDENT WHERE MARKS = 100")
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::from("John")]]);
}

#[tokio::test]
async fn test_local_handle_rejects_writes() {
    let (_dir, path) = student_db().await;
    let factory = HandleFactory::new(&path, TTL);
    let db = factory.configure(&ConnectionConfig::Local).await.unwrap();

    for sql in [
        "INSERT INTO STUDENT VALUES ('Eve', 'Art', 'C', 70)",
        "UPDATE STUDENT SET MARKS = 0",
        "DROP TABLE STUDENT",
    ] {
        let err = db.execute_query(sql).await.unwrap_err();
        assert!(err.to_string().contains("readonly"), "{sql}: {err}");
    }

    let count = db.execute_query("SELECT COUNT(*) FROM STUDENT").await.unwrap();
    assert_eq!(count.rows[0][0], Value::Int(5));
}

#[tokio::test]
async fn test_handle_reused_until_ttl_expires() {
    let (_dir, path) = student_db().await;
    let factory = HandleFactory::new(&path, TTL);
    let start = Instant::now();

    let first = factory.configure_at(&ConnectionConfig::Local, start).await.unwrap();
    let again = factory
        .configure_at(&ConnectionConfig::Local, start + Duration::from_secs(60))
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    let fresh = factory
        .configure_at(&ConnectionConfig::Local, start + TTL + Duration::from_secs(1))
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(factory.cached().await, 1);

    factory.shutdown().await;
    assert_eq!(factory.cached().await, 0);
}

#[tokio::test]
async fn test_missing_local_file_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let factory = HandleFactory::new(dir.path().join("absent.db"), TTL);

    let err = factory
        .configure(&ConnectionConfig::Local)
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), "Connection Error");
    assert_eq!(factory.cached().await, 0);
}
