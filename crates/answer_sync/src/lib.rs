//! Debounced, offline-queueing sync for quiz answer fields.

pub mod config;
pub mod connectivity;
pub mod controller;
pub mod error;
pub mod sheet;
pub mod store;

pub use config::SyncConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivitySignal};
pub use controller::{SyncController, SyncEvent};
pub use error::SyncError;
pub use sheet::AnswerSheet;
pub use shared::protocol::{SyncSnapshot, SyncStatus};
pub use store::{AnswerStore, FnAnswerStore, MissingAnswerStore, SimulatedLatency};
