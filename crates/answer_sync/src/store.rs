use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use shared::domain::FieldId;

use crate::config::DEFAULT_SIMULATED_LATENCY;

/// Transport that persists one answer value.
///
/// Calls may resolve in any order and the same value may be submitted more than
/// once (an edit and a reconnect retry can both carry it), so implementations
/// must tolerate duplicate writes.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    async fn save(&self, field_id: &FieldId, value: &str) -> Result<()>;
}

#[async_trait]
impl<T> AnswerStore for Arc<T>
where
    T: AnswerStore + ?Sized,
{
    async fn save(&self, field_id: &FieldId, value: &str) -> Result<()> {
        (**self).save(field_id, value).await
    }
}

pub struct MissingAnswerStore;

#[async_trait]
impl AnswerStore for MissingAnswerStore {
    async fn save(&self, field_id: &FieldId, _value: &str) -> Result<()> {
        Err(anyhow!("answer store is unavailable for field {field_id}"))
    }
}

/// Adapts a closure returning a boxed future into an [`AnswerStore`].
pub struct FnAnswerStore<F> {
    save_fn: F,
}

impl<F> FnAnswerStore<F>
where
    F: Fn(FieldId, String) -> BoxFuture<'static, Result<()>> + Send + Sync,
{
    pub fn new(save_fn: F) -> Self {
        Self { save_fn }
    }
}

#[async_trait]
impl<F> AnswerStore for FnAnswerStore<F>
where
    F: Fn(FieldId, String) -> BoxFuture<'static, Result<()>> + Send + Sync,
{
    async fn save(&self, field_id: &FieldId, value: &str) -> Result<()> {
        (self.save_fn)(field_id.clone(), value.to_string()).await
    }
}

/// Delays every save by a fixed amount while enabled.
pub struct SimulatedLatency<S> {
    inner: S,
    delay: Duration,
    enabled: AtomicBool,
}

impl<S: AnswerStore> SimulatedLatency<S> {
    pub fn new(inner: S, delay: Duration, enabled: bool) -> Self {
        Self {
            inner,
            delay,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn with_default_delay(inner: S) -> Self {
        Self::new(inner, DEFAULT_SIMULATED_LATENCY, true)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl<S: AnswerStore> AnswerStore for SimulatedLatency<S> {
    async fn save(&self, field_id: &FieldId, value: &str) -> Result<()> {
        if self.is_enabled() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.save(field_id, value).await
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
