//! Per-field answer sync state machine.
//!
//! Edits are debounced into save attempts, connectivity loss parks the latest
//! value in a single-slot queue, and reconnecting retries it once. Every timer
//! and save is stamped with the generation it was started under; results from
//! older generations are dropped so a slow save can never overwrite newer state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use shared::{
    domain::FieldId,
    protocol::{SyncSnapshot, SyncStatus},
};
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    config::SyncConfig,
    connectivity::{ConnectivitySignal, ConnectivitySubscription},
    error::SyncError,
    store::AnswerStore,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum SyncEvent {
    StatusChanged(SyncSnapshot),
    SaveFailed {
        field_id: FieldId,
        generation: u64,
        reason: String,
    },
}

impl SyncEvent {
    pub fn field_id(&self) -> &FieldId {
        match self {
            SyncEvent::StatusChanged(snapshot) => &snapshot.field_id,
            SyncEvent::SaveFailed { field_id, .. } => field_id,
        }
    }
}

pub struct SyncController {
    shared: Arc<ControllerShared>,
    connectivity: ConnectivitySubscription,
}

struct ControllerShared {
    field_id: FieldId,
    store: Arc<dyn AnswerStore>,
    config: SyncConfig,
    events: broadcast::Sender<SyncEvent>,
    state: Mutex<ControllerState>,
}

struct ControllerState {
    current_value: String,
    status: SyncStatus,
    queued_value: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
    online: bool,
    generation: u64,
    closed: bool,
    debounce_timer: Option<JoinHandle<()>>,
}

impl ControllerState {
    fn cancel_debounce(&mut self) {
        if let Some(timer) = self.debounce_timer.take() {
            timer.abort();
        }
    }

    fn ensure_current(&self, field_id: &FieldId, started: u64) -> Result<(), SyncError> {
        if self.closed {
            return Err(SyncError::Closed(field_id.clone()));
        }
        if self.generation != started {
            return Err(SyncError::StaleOperation {
                started,
                current: self.generation,
            });
        }
        Ok(())
    }
}

impl SyncController {
    /// Binds a controller for `field_id`. Inputs and connectivity changes must
    /// arrive from within a Tokio runtime.
    ///
    /// `initial_text` is treated as already persisted: the controller starts
    /// `Idle` and issues no save for it.
    pub fn bind(
        field_id: impl Into<FieldId>,
        initial_text: impl Into<String>,
        store: Arc<dyn AnswerStore>,
        connectivity: ConnectivitySignal,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self::bind_with_events(field_id, initial_text, store, connectivity, config, events)
    }

    pub fn bind_with_events(
        field_id: impl Into<FieldId>,
        initial_text: impl Into<String>,
        store: Arc<dyn AnswerStore>,
        connectivity: ConnectivitySignal,
        config: SyncConfig,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        let field_id = field_id.into();
        let online = connectivity.is_online();
        let shared = Arc::new(ControllerShared {
            field_id,
            store,
            config,
            events,
            state: Mutex::new(ControllerState {
                current_value: initial_text.into(),
                status: SyncStatus::Idle,
                queued_value: None,
                last_saved_at: None,
                online,
                generation: 0,
                closed: false,
                debounce_timer: None,
            }),
        });
        debug!(field_id = %shared.field_id, online, "sync: controller bound");

        let listener = Arc::downgrade(&shared);
        let connectivity = connectivity.attach(move |online| {
            if let Some(shared) = listener.upgrade() {
                shared.on_connectivity_change(online);
            }
        });
        Self {
            shared,
            connectivity,
        }
    }

    pub fn field_id(&self) -> &FieldId {
        &self.shared.field_id
    }

    pub fn on_input(&self, text: impl Into<String>) {
        self.shared.on_input(text.into());
    }

    pub fn on_connectivity_change(&self, online: bool) {
        self.shared.on_connectivity_change(online);
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.shared.lock();
        self.shared.snapshot_of(&state)
    }

    pub fn status(&self) -> SyncStatus {
        self.shared.lock().status
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// Snapshots of this field only; lagged receivers skip missed entries.
    pub fn status_stream(&self) -> impl Stream<Item = SyncSnapshot> + Send + 'static {
        let field_id = self.shared.field_id.clone();
        BroadcastStream::new(self.subscribe()).filter_map(move |event| match event {
            Ok(SyncEvent::StatusChanged(snapshot)) if snapshot.field_id == field_id => {
                Some(snapshot)
            }
            _ => None,
        })
    }

    /// Cancels the debounce timer and stops listening for connectivity.
    /// Saves already in flight run to completion but their results are ignored.
    pub fn shutdown(&self) {
        self.connectivity.cancel();
        self.shared.shutdown();
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ControllerShared {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_of(&self, state: &ControllerState) -> SyncSnapshot {
        SyncSnapshot {
            field_id: self.field_id.clone(),
            status: state.status,
            current_value: state.current_value.clone(),
            queued_value: state.queued_value.clone(),
            last_saved_at: state.last_saved_at,
            generation: state.generation,
            online: state.online,
        }
    }

    // Sent while the state lock is held so observers see changes in call order.
    fn emit(&self, state: &ControllerState) {
        let _ = self
            .events
            .send(SyncEvent::StatusChanged(self.snapshot_of(state)));
    }

    fn on_input(self: &Arc<Self>, text: String) {
        let mut state = self.lock();
        if state.closed {
            debug!(field_id = %self.field_id, "sync: ignoring input after shutdown");
            return;
        }

        state.current_value = text.clone();
        state.generation += 1;
        state.cancel_debounce();

        if text.is_empty() {
            state.status = SyncStatus::Idle;
            state.queued_value = None;
        } else if !state.online {
            state.queued_value = Some(text);
            state.status = SyncStatus::Offline;
        } else {
            if state.queued_value.is_some() {
                state.queued_value = Some(text.clone());
            }
            let generation = state.generation;
            state.status = SyncStatus::PendingDebounce;
            state.debounce_timer = Some(self.arm_debounce(generation, text));
        }

        self.emit(&state);
    }

    fn arm_debounce(self: &Arc<Self>, generation: u64, value: String) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let delay = self.config.debounce;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.fire_debounce(generation, value);
        })
    }

    fn fire_debounce(self: &Arc<Self>, generation: u64, value: String) {
        let mut state = self.lock();
        if let Err(err) = state.ensure_current(&self.field_id, generation) {
            debug!(field_id = %self.field_id, "sync: debounce timer dropped: {err}");
            return;
        }
        if !state.online {
            debug!(field_id = %self.field_id, generation, "sync: debounce fired while offline");
            return;
        }

        // Fired; the handle belongs to this very task.
        state.debounce_timer = None;
        self.begin_save(&mut state, generation, value);
    }

    fn begin_save(self: &Arc<Self>, state: &mut ControllerState, generation: u64, value: String) {
        state.status = SyncStatus::Syncing;
        self.emit(state);

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = shared.store.save(&shared.field_id, &value).await;
            shared.complete_save(generation, &value, outcome);
        });
    }

    fn complete_save(&self, generation: u64, value: &str, outcome: anyhow::Result<()>) {
        let mut state = self.lock();
        if let Err(err) = state.ensure_current(&self.field_id, generation) {
            debug!(
                field_id = %self.field_id,
                succeeded = outcome.is_ok(),
                "sync: discarding save result: {err}"
            );
            return;
        }

        match outcome {
            Ok(()) => {
                let now = Utc::now();
                state.last_saved_at = Some(match state.last_saved_at {
                    Some(previous) if previous > now => previous,
                    _ => now,
                });
                if state.queued_value.as_deref() == Some(value) {
                    state.queued_value = None;
                }
                state.status = SyncStatus::Saved;
                info!(
                    field_id = %self.field_id,
                    generation,
                    bytes = value.len(),
                    "sync: answer saved"
                );
                self.emit(&state);
            }
            Err(source) => {
                let reason = format!("{source:#}");
                let err = SyncError::SaveFailed {
                    field_id: self.field_id.clone(),
                    source,
                };
                warn!(field_id = %self.field_id, generation, "sync: {err}");
                state.status = SyncStatus::Error;
                self.emit(&state);
                let _ = self.events.send(SyncEvent::SaveFailed {
                    field_id: self.field_id.clone(),
                    generation,
                    reason,
                });
            }
        }
    }

    fn on_connectivity_change(self: &Arc<Self>, online: bool) {
        let mut state = self.lock();
        if state.closed || state.online == online {
            return;
        }
        state.online = online;

        if !online {
            state.cancel_debounce();
            // Anything in flight now belongs to the previous connection.
            state.generation += 1;
            if !state.current_value.is_empty() {
                state.queued_value = Some(state.current_value.clone());
                state.status = SyncStatus::Offline;
            }
            info!(
                field_id = %self.field_id,
                queued = state.queued_value.is_some(),
                "sync: connectivity lost"
            );
            self.emit(&state);
            return;
        }

        match state.queued_value.clone().filter(|value| !value.is_empty()) {
            Some(value) => {
                state.generation += 1;
                let generation = state.generation;
                info!(
                    field_id = %self.field_id,
                    generation,
                    "sync: connectivity restored, retrying queued answer"
                );
                self.begin_save(&mut state, generation, value);
            }
            None => {
                if state.status == SyncStatus::Offline {
                    state.status = SyncStatus::Idle;
                }
                info!(field_id = %self.field_id, "sync: connectivity restored");
                self.emit(&state);
            }
        }
    }

    fn shutdown(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.generation += 1;
        state.cancel_debounce();
        debug!(field_id = %self.field_id, "sync: controller unbound");
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
