//! MySQL integration tests.
//!
//! Set MYSQL_URL (e.g. mysql://root:pw@localhost:3306/test) to run them.

use sqlchat::connection::{ConnectionConfig, HandleFactory, RemoteConfig};
use sqlchat::db::{DatabaseClient, MySqlClient, Value};
use std::time::Duration;

fn get_test_database_url() -> Option<String> {
    std::env::var("MYSQL_URL").ok()
}

#[tokio::test]
async fn test_connect_and_list_tables() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: MYSQL_URL not set");
        return;
    };

    let client = MySqlClient::connect(&url, "test").await.unwrap();
    assert!(client.list_tables().await.is_ok());
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_read_only_statement_runs() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: MYSQL_URL not set");
        return;
    };

    let client = MySqlClient::connect(&url, "test").await.unwrap();
    let result = client.execute_query("SELECT 1 AS one").await.unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.columns[0].name, "one");
}

#[tokio::test]
async fn test_aggregates_and_temporal_values_are_text() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: MYSQL_URL not set");
        return;
    };

    let client = MySqlClient::connect(&url, "test").await.unwrap();
    let result = client
        .execute_query(
            "SELECT AVG(m) AS avg_marks, SUM(m) AS total, \
             CAST('2024-05-01' AS DATE) AS d, \
             CAST('2024-05-01 10:30:00' AS DATETIME) AS dt, \
             CAST('10:30:00' AS TIME) AS t \
             FROM (SELECT 80 AS m UNION ALL SELECT 91) AS marks",
        )
        .await
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(row[0], Value::String("85.5000".to_string()));
    assert_eq!(row[1], Value::String("171".to_string()));
    assert_eq!(row[2], Value::String("2024-05-01".to_string()));
    assert_eq!(row[3], Value::String("2024-05-01 10:30:00".to_string()));
    assert_eq!(row[4], Value::String("10:30:00".to_string()));
}

#[tokio::test(flavor = "current_thread")]
async fn test_unreachable_server_is_connection_error() {
    let factory = HandleFactory::new("example.db", Duration::from_secs(7200));
    let config = ConnectionConfig::Remote(RemoteConfig {
        host: "127.0.0.1".to_string(),
        user: "root".to_string(),
        password: "secret".to_string(),
        database: "shop".to_string(),
        // Reserved port; nothing listens there
        port: "1".to_string(),
    });

    let err = factory.configure(&config).await.err().unwrap();
    assert_eq!(err.category(), "Connection Error");
    assert!(!err.to_string().contains("secret"), "password leaked: {err}");
    assert_eq!(factory.cached().await, 0);
}
