use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_SIMULATED_LATENCY_MS: u64 = 2000;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(DEFAULT_DEBOUNCE_MS);
pub const DEFAULT_SIMULATED_LATENCY: Duration =
    Duration::from_millis(DEFAULT_SIMULATED_LATENCY_MS);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last edit before a save is issued.
    pub debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl SyncConfig {
    pub fn with_debounce_ms(debounce_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
        }
    }
}
