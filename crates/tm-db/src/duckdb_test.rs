use super::*;

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[tokio::test]
async fn test_execute_batch_runs_every_statement() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE t1 (id INT); CREATE TABLE t2 (id INT); INSERT INTO t1 VALUES (1);",
    )
    .await
    .unwrap();

    assert!(db.relation_exists("t1").await.unwrap());
    assert!(db.relation_exists("t2").await.unwrap());
    assert_eq!(db.query_count("SELECT * FROM t1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_execute_returns_affected_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE nums AS SELECT * FROM range(10) t(n)")
        .await
        .unwrap();

    let deleted = db.execute("DELETE FROM nums WHERE n < 3").await.unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(db.query_count("SELECT * FROM nums").await.unwrap(), 7);
}

#[tokio::test]
async fn test_relation_exists_with_schema() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA staging; CREATE VIEW staging.v AS SELECT 1 AS id")
        .await
        .unwrap();

    assert!(db.relation_exists("staging.v").await.unwrap());
    assert!(!db.relation_exists("v").await.unwrap());
    assert!(!db.relation_exists("nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_failed_script_reports_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute_batch("SELECT * FROM missing_table").await.unwrap_err();
    match err {
        DbError::ExecutionError(msg) => assert!(msg.contains("missing_table"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_connection_handle_sees_same_database() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE shared (id INT); INSERT INTO shared VALUES (1), (2)")
        .await
        .unwrap();

    let other = db.connection_handle().unwrap();
    let count: i64 = other
        .query_row("SELECT COUNT(*) FROM shared", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute_batch("CREATE TABLE kept (id INT)").await.unwrap();
    }
    let db = DuckDbBackend::new(path.to_str().unwrap()).unwrap();
    assert!(db.relation_exists("kept").await.unwrap());
}
