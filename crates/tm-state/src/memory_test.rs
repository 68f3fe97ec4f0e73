use super::*;
use chrono::TimeZone;

fn id(s: &str) -> MigrationId {
    MigrationId::parse(s).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[tokio::test]
async fn test_mark_then_is_applied() {
    let store = MemoryStore::new();
    let a = id("20240101000000_a");

    assert!(!store.is_applied(&a).await.unwrap());
    store.mark_applied(&a, at(0)).await.unwrap();
    assert!(store.is_applied(&a).await.unwrap());
}

#[tokio::test]
async fn test_mark_twice_is_already_applied() {
    let store = MemoryStore::new();
    let a = id("20240101000000_a");
    store.mark_applied(&a, at(0)).await.unwrap();

    let err = store.mark_applied(&a, at(1)).await.unwrap_err();
    assert!(matches!(err, StateError::AlreadyApplied(ref s) if s == "20240101000000_a"));
}

#[tokio::test]
async fn test_unmark_missing_is_not_applied() {
    let store = MemoryStore::new();
    let err = store
        .unmark_applied(&id("20240101000000_a"))
        .await
        .unwrap_err();
    assert!(matches!(err, StateError::NotApplied(_)));
}

#[tokio::test]
async fn test_unmark_removes_record() {
    let store = MemoryStore::new();
    let a = id("20240101000000_a");
    store.mark_applied(&a, at(0)).await.unwrap();
    store.unmark_applied(&a).await.unwrap();

    assert!(!store.is_applied(&a).await.unwrap());
    assert!(store.list_applied().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_orders_by_time_then_insertion() {
    let store = MemoryStore::new();
    let late = id("20240101000000_late");
    let first = id("20240301000000_first");
    let second = id("20240201000000_second");

    store.mark_applied(&late, at(10)).await.unwrap();
    store.mark_applied(&first, at(5)).await.unwrap();
    store.mark_applied(&second, at(5)).await.unwrap();

    let ids: Vec<String> = store
        .list_applied()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(
        ids,
        vec![
            "20240301000000_first",
            "20240201000000_second",
            "20240101000000_late"
        ]
    );
}
