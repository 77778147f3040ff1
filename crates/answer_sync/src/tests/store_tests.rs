use super::*;

use std::sync::Mutex;

use futures::FutureExt;
use tokio::time::Instant;

#[tokio::test]
async fn missing_store_always_fails() {
    let err = MissingAnswerStore
        .save(&FieldId::from("q1"), "answer")
        .await
        .expect_err("missing store should fail");
    assert!(err.to_string().contains("unavailable"));
    assert!(err.to_string().contains("q1"));
}

#[tokio::test]
async fn fn_store_receives_field_and_value() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let store = FnAnswerStore::new(move |field_id: FieldId, value: String| {
        let recorder = Arc::clone(&recorder);
        async move {
            recorder
                .lock()
                .expect("recorder lock")
                .push(format!("{field_id}={value}"));
            Ok::<_, anyhow::Error>(())
        }
        .boxed()
    });

    store
        .save(&FieldId::from("q2"), "queues absorb bursts")
        .await
        .expect("save");
    assert_eq!(
        *seen.lock().expect("recorder lock"),
        vec!["q2=queues absorb bursts".to_string()]
    );
}

#[tokio::test]
async fn fn_store_propagates_errors() {
    let store = FnAnswerStore::new(|_field_id: FieldId, _value: String| {
        async { Err::<(), _>(anyhow!("503")) }.boxed()
    });
    let err = store
        .save(&FieldId::from("q1"), "x")
        .await
        .expect_err("should fail");
    assert_eq!(err.to_string(), "503");
}

#[tokio::test(start_paused = true)]
async fn simulated_latency_delays_only_while_enabled() {
    let store = SimulatedLatency::with_default_delay(Arc::new(FnAnswerStore::new(
        |_field_id: FieldId, _value: String| async { Ok::<_, anyhow::Error>(()) }.boxed(),
    )));
    assert!(store.is_enabled());
    assert_eq!(store.delay(), DEFAULT_SIMULATED_LATENCY);

    let started = Instant::now();
    store.save(&FieldId::from("q1"), "slow").await.expect("save");
    assert!(started.elapsed() >= DEFAULT_SIMULATED_LATENCY);

    store.set_enabled(false);
    let started = Instant::now();
    store.save(&FieldId::from("q1"), "fast").await.expect("save");
    assert!(started.elapsed() < Duration::from_millis(1));
}

#[tokio::test]
async fn simulated_latency_passes_failures_through() {
    let store = SimulatedLatency::new(MissingAnswerStore, Duration::from_millis(5), false);
    assert!(store.save(&FieldId::from("q1"), "x").await.is_err());
}
