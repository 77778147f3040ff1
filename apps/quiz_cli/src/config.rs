use std::{fs, path::Path, time::Duration};

use answer_sync::{
    config::{DEFAULT_DEBOUNCE_MS, DEFAULT_SIMULATED_LATENCY_MS},
    SyncConfig,
};
use anyhow::Context;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub student_id: Option<String>,
    pub debounce_ms: u64,
    pub simulate_latency: bool,
    pub simulated_latency_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            student_id: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            simulate_latency: false,
            simulated_latency_ms: DEFAULT_SIMULATED_LATENCY_MS,
        }
    }
}

impl Settings {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::with_debounce_ms(self.debounce_ms)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    /// Applies a flat `key = value` TOML document. Unknown keys are ignored.
    pub fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let table = toml::from_str::<toml::Table>(raw).context("invalid quiz settings file")?;
        for (key, value) in &table {
            let value = match value {
                toml::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            self.apply(key, &value);
        }
        Ok(())
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("QUIZ_STUDENT_ID") {
            self.apply("student_id", &v);
        }
        if let Some(v) = lookup("APP__STUDENT_ID") {
            self.apply("student_id", &v);
        }
        if let Some(v) = lookup("APP__DEBOUNCE_MS") {
            self.apply("debounce_ms", &v);
        }
        if let Some(v) = lookup("APP__SIMULATE_LATENCY") {
            self.apply("simulate_latency", &v);
        }
        if let Some(v) = lookup("APP__SIMULATED_LATENCY_MS") {
            self.apply("simulated_latency_ms", &v);
        }
    }

    fn apply(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key {
            "student_id" if !value.is_empty() => self.student_id = Some(value.to_string()),
            "debounce_ms" => match value.parse::<u64>() {
                Ok(parsed) => self.debounce_ms = parsed,
                Err(_) => warn!(key, value, "config: ignoring invalid number"),
            },
            "simulate_latency" => match parse_flag(value) {
                Some(parsed) => self.simulate_latency = parsed,
                None => warn!(key, value, "config: ignoring invalid flag"),
            },
            "simulated_latency_ms" => match value.parse::<u64>() {
                Ok(parsed) => self.simulated_latency_ms = parsed,
                Err(_) => warn!(key, value, "config: ignoring invalid number"),
            },
            _ => {}
        }
    }
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Defaults, then the settings file (if present), then environment overrides.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Err(err) = settings.apply_file(&raw) {
            warn!(path = %path.display(), "config: {err:#}");
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
