//! Connectivity source shared by every controller of a quiz.
//!
//! Every change is handed to each attached listener before `set_online`
//! returns, so controllers observe each edge in call order.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

struct MonitorState {
    online: bool,
    next_listener: u64,
    listeners: Vec<(u64, Listener)>,
}

struct MonitorInner {
    state: Mutex<MonitorState>,
}

impl MonitorInner {
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                state: Mutex::new(MonitorState {
                    online,
                    next_listener: 0,
                    listeners: Vec::new(),
                }),
            }),
        }
    }

    /// Publishes a new connectivity value; repeated values are not re-announced.
    ///
    /// Listeners run on the calling thread and must not call back into the
    /// monitor.
    pub fn set_online(&self, online: bool) {
        let mut state = self.inner.lock();
        if state.online == online {
            return;
        }
        state.online = online;
        // Held across delivery so concurrent callers reach listeners in order.
        for (_, listener) in &state.listeners {
            listener(online);
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.lock().online
    }

    pub fn subscribe(&self) -> ConnectivitySignal {
        ConnectivitySignal {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ConnectivityMonitor")
            .field("online", &state.online)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

/// Receiving side of a [`ConnectivityMonitor`].
#[derive(Clone)]
pub struct ConnectivitySignal {
    inner: Arc<MonitorInner>,
}

impl ConnectivitySignal {
    /// A signal that never changes, for callers without a connectivity source.
    pub fn fixed(online: bool) -> Self {
        ConnectivityMonitor::new(online).subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.inner.lock().online
    }

    /// Registers `listener` for every later change. It is first called once
    /// with the current value, under the same lock that orders later changes.
    pub(crate) fn attach(
        &self,
        listener: impl Fn(bool) + Send + Sync + 'static,
    ) -> ConnectivitySubscription {
        let listener: Listener = Arc::new(listener);
        let mut state = self.inner.lock();
        let id = state.next_listener;
        state.next_listener += 1;
        listener(state.online);
        state.listeners.push((id, listener));
        ConnectivitySubscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }
}

impl fmt::Debug for ConnectivitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivitySignal")
            .field("online", &self.is_online())
            .finish()
    }
}

/// Detaches its listener when cancelled or dropped.
pub(crate) struct ConnectivitySubscription {
    inner: Weak<MonitorInner>,
    id: u64,
}

impl ConnectivitySubscription {
    pub(crate) fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for ConnectivitySubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
