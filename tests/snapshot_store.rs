// tests/snapshot_store.rs
mod common;

use common::listing;
use listing_watch::snapshot::JsonFileStore;
use listing_watch::{Snapshot, SnapshotStore};
use std::fs;

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nope.json"));
    assert!(store.load_previous().await.is_empty());
}

#[tokio::test]
async fn corrupt_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("last_items.json");
    fs::write(&p, "{ not json").unwrap();
    let store = JsonFileStore::new(&p);
    assert!(store.load_previous().await.is_empty());

    fs::write(&p, r#"[{"name":"missing fields"}]"#).unwrap();
    assert!(store.load_previous().await.is_empty());
}

#[tokio::test]
async fn persist_replaces_instead_of_merging() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("data").join("last_items.json");
    let store = JsonFileStore::new(&p);

    let first = Snapshot::new(vec![
        listing("Selmer A", "https://s/a"),
        listing("Selmer B", "https://s/b"),
    ]);
    store.persist(&first).await.unwrap();
    assert_eq!(store.load_previous().await, first);

    let second = Snapshot::new(vec![listing("Selmer C", "https://s/c")]);
    store.persist(&second).await.unwrap();
    let back = store.load_previous().await;
    assert_eq!(back, second);
    assert!(!back.links().contains("https://s/a"));
}

#[tokio::test]
async fn file_is_a_json_array_of_listing_objects() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("last_items.json");
    let store = JsonFileStore::new(&p);
    store
        .persist(&Snapshot::new(vec![listing("Yanagisawa T-991", "https://s/y")]))
        .await
        .unwrap();

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&p).unwrap()).unwrap();
    let arr = v.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    for key in ["name", "price", "link", "source"] {
        assert!(arr[0].get(key).is_some(), "missing {key}");
    }
    assert!(!dir.path().join("last_items.json.tmp").exists());
}

#[tokio::test]
async fn reads_state_written_by_hand() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("last_items.json");
    fs::write(
        &p,
        r#"[{"name":"Otto Link","price":"Price not listed","link":"https://s/o","source":"https://s/"}]"#,
    )
    .unwrap();
    let snap = JsonFileStore::new(&p).load_previous().await;
    assert_eq!(snap.len(), 1);
    assert_eq!(snap.listings()[0].price, "Price not listed");
}
