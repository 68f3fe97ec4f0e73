use super::*;
use chrono::TimeZone;

fn id(s: &str) -> MigrationId {
    MigrationId::parse(s).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[test]
fn test_validate_table_name() {
    validate_table_name("tidemark_migrations").unwrap();
    validate_table_name("_t1").unwrap();
    for bad in ["", "1abc", "a-b", "a.b", "t; DROP TABLE x", "a b"] {
        assert!(
            matches!(validate_table_name(bad), Err(StateError::InvalidTable(_))),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn test_open_rejects_bad_table() {
    assert!(matches!(
        DuckDbStore::open_memory("bad-name"),
        Err(StateError::InvalidTable(_))
    ));
}

#[tokio::test]
async fn test_mark_unmark_cycle() {
    let store = DuckDbStore::open_memory("tm_state").unwrap();
    let a = id("20240101000000_a");

    assert!(!store.is_applied(&a).await.unwrap());
    store.mark_applied(&a, at(0)).await.unwrap();
    assert!(store.is_applied(&a).await.unwrap());

    assert!(matches!(
        store.mark_applied(&a, at(1)).await,
        Err(StateError::AlreadyApplied(_))
    ));

    store.unmark_applied(&a).await.unwrap();
    assert!(!store.is_applied(&a).await.unwrap());
    assert!(matches!(
        store.unmark_applied(&a).await,
        Err(StateError::NotApplied(_))
    ));
}

#[tokio::test]
async fn test_list_preserves_time_and_order() {
    let store = DuckDbStore::open_memory("tm_state").unwrap();
    let b = id("20240102000000_b");
    let a = id("20240101000000_a");
    let c = id("20240103000000_c");

    store.mark_applied(&b, at(1)).await.unwrap();
    store.mark_applied(&a, at(1)).await.unwrap();
    store.mark_applied(&c, at(0)).await.unwrap();

    let records = store.list_applied().await.unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["20240103000000_c", "20240102000000_b", "20240101000000_a"]);
    assert_eq!(records[0].applied_at, at(0));
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.duckdb");
    let a = id("20240101000000_a");

    {
        let store = DuckDbStore::open(Connection::open(&path).unwrap(), "history").unwrap();
        store.mark_applied(&a, at(0)).await.unwrap();
    }

    let store = DuckDbStore::open(Connection::open(&path).unwrap(), "history").unwrap();
    assert!(store.is_applied(&a).await.unwrap());
    assert_eq!(store.table(), "history");
    assert_eq!(store.engine_name(), "duckdb");
}

#[tokio::test]
async fn test_corrupt_identity_is_reported() {
    let conn = Connection::open_in_memory().unwrap();
    let store = DuckDbStore::open(conn.try_clone().unwrap(), "tm_state").unwrap();
    conn.execute(
        "INSERT INTO tm_state VALUES ('not_a_migration', 0, nextval('tm_state_seq'))",
        [],
    )
    .unwrap();

    assert!(matches!(
        store.list_applied().await,
        Err(StateError::CorruptRecord { .. })
    ));
}
