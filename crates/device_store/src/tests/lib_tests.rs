use super::*;
use chrono::Utc;

fn sample_entry(email: &str) -> NewEntrant {
    NewEntrant {
        name: "Ada Lovelace".to_string(),
        email: email.to_string(),
        phone: "555-0100".to_string(),
        company: "Analytical Engines".to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let store = DeviceStore::new("sqlite::memory:").await.expect("db");
    store.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("booth_device_store_test_{suffix}"));
    let db_path = temp_root.join("nested").join("device.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let store = DeviceStore::new(&database_url).await.expect("db");
    drop(store);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn submission_marker_defaults_to_false() {
    let store = DeviceStore::new("sqlite::memory:").await.expect("db");
    assert!(!store.submission_marker().await.expect("marker"));
}

#[tokio::test]
async fn set_submission_marker_is_sticky() {
    let store = DeviceStore::new("sqlite::memory:").await.expect("db");
    store.set_submission_marker().await.expect("set");
    store.set_submission_marker().await.expect("set again");
    assert!(store.submission_marker().await.expect("marker"));
}

#[tokio::test]
async fn enqueue_appends_and_marks_in_one_step() {
    let store = DeviceStore::new("sqlite::memory:").await.expect("db");
    let entry = sample_entry("ada@example.com");

    let queue_id = store
        .enqueue_entry_and_mark_submitted(&entry)
        .await
        .expect("enqueue");
    assert!(queue_id > 0);
    assert!(store.submission_marker().await.expect("marker"));

    let pending = store.pending_entries().await.expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].queue_id, queue_id);
    assert_eq!(pending[0].entry, entry);
}

#[tokio::test]
async fn pending_entries_are_ordered_oldest_first() {
    let store = DeviceStore::new("sqlite::memory:").await.expect("db");
    let first = store
        .enqueue_entry_and_mark_submitted(&sample_entry("first@example.com"))
        .await
        .expect("first");
    let second = store
        .enqueue_entry_and_mark_submitted(&sample_entry("second@example.com"))
        .await
        .expect("second");

    let pending = store.pending_entries().await.expect("pending");
    assert_eq!(
        pending.iter().map(|p| p.queue_id).collect::<Vec<_>>(),
        vec![first, second]
    );
}

#[tokio::test]
async fn mark_synced_removes_entry_from_pending_set() {
    let store = DeviceStore::new("sqlite::memory:").await.expect("db");
    let queue_id = store
        .enqueue_entry_and_mark_submitted(&sample_entry("ada@example.com"))
        .await
        .expect("enqueue");

    store.mark_synced(queue_id).await.expect("mark synced");

    assert_eq!(store.pending_count().await.expect("count"), 0);
    assert!(store.pending_entries().await.expect("pending").is_empty());
    assert!(store.failed_entries().await.expect("failed").is_empty());
}

#[tokio::test]
async fn mark_sync_failed_keeps_entry_distinguishable() {
    let store = DeviceStore::new("sqlite::memory:").await.expect("db");
    let queue_id = store
        .enqueue_entry_and_mark_submitted(&sample_entry("dup@example.com"))
        .await
        .expect("enqueue");

    store
        .mark_sync_failed(queue_id, "duplicate email")
        .await
        .expect("mark failed");

    assert!(store.pending_entries().await.expect("pending").is_empty());
    let failed = store.failed_entries().await.expect("failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].queue_id, queue_id);
    assert_eq!(failed[0].email, "dup@example.com");
    assert_eq!(failed[0].sync_error, "duplicate email");
}

#[tokio::test]
async fn mark_sync_failed_does_not_clobber_synced_entries() {
    let store = DeviceStore::new("sqlite::memory:").await.expect("db");
    let queue_id = store
        .enqueue_entry_and_mark_submitted(&sample_entry("ok@example.com"))
        .await
        .expect("enqueue");

    store.mark_synced(queue_id).await.expect("mark synced");
    store
        .mark_sync_failed(queue_id, "late failure")
        .await
        .expect("mark failed");

    assert!(store.failed_entries().await.expect("failed").is_empty());
}
