use std::{collections::HashMap, sync::Arc};

use shared::{domain::FieldId, protocol::SyncSnapshot};
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    config::SyncConfig,
    connectivity::ConnectivityMonitor,
    controller::{SyncController, SyncEvent},
    error::SyncError,
    store::AnswerStore,
};

const SHEET_EVENT_CAPACITY: usize = 1024;

/// Controllers for every answer field of one quiz, sharing a store, a
/// connectivity source and an event channel.
pub struct AnswerSheet {
    store: Arc<dyn AnswerStore>,
    connectivity: ConnectivityMonitor,
    config: SyncConfig,
    events: broadcast::Sender<SyncEvent>,
    controllers: HashMap<FieldId, SyncController>,
}

impl AnswerSheet {
    pub fn new(
        store: Arc<dyn AnswerStore>,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(SHEET_EVENT_CAPACITY);
        Self {
            store,
            connectivity,
            config,
            events,
            controllers: HashMap::new(),
        }
    }

    pub fn bind(
        &mut self,
        field_id: impl Into<FieldId>,
        initial_text: impl Into<String>,
    ) -> Result<(), SyncError> {
        let field_id = field_id.into();
        if self.controllers.contains_key(&field_id) {
            return Err(SyncError::AlreadyBound(field_id));
        }

        let controller = SyncController::bind_with_events(
            field_id.clone(),
            initial_text,
            Arc::clone(&self.store),
            self.connectivity.subscribe(),
            self.config,
            self.events.clone(),
        );
        self.controllers.insert(field_id, controller);
        Ok(())
    }

    /// Shuts the field's controller down and returns its last state.
    pub fn unbind(&mut self, field_id: &FieldId) -> Result<SyncSnapshot, SyncError> {
        let controller = self
            .controllers
            .remove(field_id)
            .ok_or_else(|| SyncError::UnknownField(field_id.clone()))?;
        controller.shutdown();
        let snapshot = controller.snapshot();
        if snapshot.queued_value.is_some() {
            info!(field_id = %field_id, "sync: unbinding field with an unsent answer");
        }
        Ok(snapshot)
    }

    pub fn input(&self, field_id: &FieldId, text: impl Into<String>) -> Result<(), SyncError> {
        self.controller(field_id)?.on_input(text);
        Ok(())
    }

    pub fn snapshot(&self, field_id: &FieldId) -> Result<SyncSnapshot, SyncError> {
        Ok(self.controller(field_id)?.snapshot())
    }

    pub fn snapshots(&self) -> Vec<SyncSnapshot> {
        let mut snapshots = self
            .controllers
            .values()
            .map(SyncController::snapshot)
            .collect::<Vec<_>>();
        snapshots.sort_by(|a, b| a.field_id.cmp(&b.field_id));
        snapshots
    }

    pub fn field_ids(&self) -> Vec<FieldId> {
        let mut ids = self.controllers.keys().cloned().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Every bound field has handled the change when this returns.
    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    fn controller(&self, field_id: &FieldId) -> Result<&SyncController, SyncError> {
        self.controllers
            .get(field_id)
            .ok_or_else(|| SyncError::UnknownField(field_id.clone()))
    }
}

#[cfg(test)]
#[path = "tests/sheet_tests.rs"]
mod tests;
