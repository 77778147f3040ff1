use super::*;

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::protocol::SyncStatus;
use tokio::{sync::Mutex, time::sleep};

#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<(FieldId, String)>>,
    fail: AtomicBool,
}

#[async_trait]
impl AnswerStore for RecordingStore {
    async fn save(&self, field_id: &FieldId, value: &str) -> Result<()> {
        self.calls
            .lock()
            .await
            .push((field_id.clone(), value.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("store rejected {value}"));
        }
        Ok(())
    }
}

fn sheet(store: &Arc<RecordingStore>, online: bool) -> AnswerSheet {
    let store: Arc<dyn AnswerStore> = store.clone();
    AnswerSheet::new(
        store,
        ConnectivityMonitor::new(online),
        SyncConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn rejects_duplicate_and_unknown_fields() {
    let store = Arc::new(RecordingStore::default());
    let mut sheet = sheet(&store, true);

    sheet.bind("q1", "").expect("bind q1");
    let err = sheet.bind("q1", "").expect_err("duplicate bind");
    assert!(matches!(err, SyncError::AlreadyBound(ref id) if id.as_str() == "q1"));

    let missing = FieldId::from("q9");
    assert!(matches!(
        sheet.input(&missing, "text"),
        Err(SyncError::UnknownField(_))
    ));
    assert!(matches!(
        sheet.unbind(&missing),
        Err(SyncError::UnknownField(_))
    ));
    assert!(matches!(
        sheet.snapshot(&missing),
        Err(SyncError::UnknownField(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn shared_connectivity_queues_and_flushes_every_field() {
    let store = Arc::new(RecordingStore::default());
    let mut sheet = sheet(&store, true);
    sheet.bind("q1", "").expect("bind q1");
    sheet.bind("q2", "").expect("bind q2");

    sheet.input(&FieldId::from("q1"), "sync vs async").expect("input q1");
    sheet.input(&FieldId::from("q2"), "pub/sub buffers").expect("input q2");
    sheet.set_online(false);
    sleep(Duration::from_millis(1)).await;
    assert!(!sheet.is_online());

    for snapshot in sheet.snapshots() {
        assert_eq!(snapshot.status, SyncStatus::Offline);
        assert!(snapshot.queued_value.is_some());
    }

    sleep(Duration::from_secs(2)).await;
    assert!(store.calls.lock().await.is_empty());

    sheet.set_online(true);
    sleep(Duration::from_millis(1)).await;

    let mut calls = store.calls.lock().await.clone();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            (FieldId::from("q1"), "sync vs async".to_string()),
            (FieldId::from("q2"), "pub/sub buffers".to_string()),
        ]
    );
    assert!(sheet
        .snapshots()
        .iter()
        .all(|snapshot| snapshot.status == SyncStatus::Saved));
}

#[tokio::test(start_paused = true)]
async fn quick_offline_online_flap_retries_every_queued_field() {
    let store = Arc::new(RecordingStore::default());
    let mut sheet = sheet(&store, false);
    sheet.bind("q1", "").expect("bind q1");
    sheet.bind("q2", "").expect("bind q2");

    store.fail.store(true, Ordering::SeqCst);
    sheet.input(&FieldId::from("q1"), "draft one").expect("input q1");
    sheet.input(&FieldId::from("q2"), "draft two").expect("input q2");
    sheet.set_online(true);
    sleep(Duration::from_millis(1)).await;
    for snapshot in sheet.snapshots() {
        assert_eq!(snapshot.status, SyncStatus::Error);
        assert!(snapshot.queued_value.is_some());
    }

    store.fail.store(false, Ordering::SeqCst);
    sheet.set_online(false);
    sheet.set_online(true);
    sleep(Duration::from_millis(1)).await;

    let mut calls = store.calls.lock().await.clone();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            (FieldId::from("q1"), "draft one".to_string()),
            (FieldId::from("q1"), "draft one".to_string()),
            (FieldId::from("q2"), "draft two".to_string()),
            (FieldId::from("q2"), "draft two".to_string()),
        ]
    );
    for snapshot in sheet.snapshots() {
        assert_eq!(snapshot.status, SyncStatus::Saved);
        assert_eq!(snapshot.queued_value, None);
    }
}

#[tokio::test(start_paused = true)]
async fn connectivity_reaches_fields_before_set_online_returns() {
    let store = Arc::new(RecordingStore::default());
    let mut sheet = sheet(&store, true);
    sheet.bind("q1", "").expect("bind q1");

    sheet.set_online(false);
    assert!(!sheet.is_online());
    assert!(sheet.snapshots().iter().all(|snapshot| !snapshot.online));

    sheet.input(&FieldId::from("q1"), "typed offline").expect("input q1");
    let snapshot = sheet.snapshot(&FieldId::from("q1")).expect("snapshot");
    assert_eq!(snapshot.status, SyncStatus::Offline);
    assert_eq!(snapshot.queued_value.as_deref(), Some("typed offline"));
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_events_from_all_fields() {
    let store = Arc::new(RecordingStore::default());
    let mut sheet = sheet(&store, true);
    sheet.bind("q1", "").expect("bind q1");
    sheet.bind("q2", "").expect("bind q2");
    let mut events = sheet.subscribe();

    sheet.input(&FieldId::from("q2"), "b").expect("input q2");
    sheet.input(&FieldId::from("q1"), "a").expect("input q1");

    let first = events.recv().await.expect("event");
    let second = events.recv().await.expect("event");
    assert_eq!(first.field_id(), &FieldId::from("q2"));
    assert_eq!(second.field_id(), &FieldId::from("q1"));
}

#[tokio::test(start_paused = true)]
async fn unbind_returns_final_state_and_stops_the_field() {
    let store = Arc::new(RecordingStore::default());
    let mut sheet = sheet(&store, false);
    sheet.bind("q1", "").expect("bind q1");
    sheet.bind("q2", "").expect("bind q2");

    sheet.input(&FieldId::from("q1"), "unsent").expect("input q1");
    let last = sheet.unbind(&FieldId::from("q1")).expect("unbind");
    assert_eq!(last.status, SyncStatus::Offline);
    assert_eq!(last.queued_value.as_deref(), Some("unsent"));
    assert_eq!(sheet.field_ids(), vec![FieldId::from("q2")]);

    sheet.set_online(true);
    sleep(Duration::from_secs(2)).await;
    assert!(store.calls.lock().await.is_empty());

    sheet.bind("q1", "").expect("rebind after unbind");
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_sorted_by_field() {
    let store = Arc::new(RecordingStore::default());
    let mut sheet = sheet(&store, true);
    for id in ["q3", "q1", "q2"] {
        sheet.bind(id, "").expect("bind");
    }

    let ids = sheet
        .snapshots()
        .into_iter()
        .map(|snapshot| snapshot.field_id)
        .collect::<Vec<_>>();
    assert_eq!(
        ids,
        vec![FieldId::from("q1"), FieldId::from("q2"), FieldId::from("q3")]
    );
}
