use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use specta::Type;
use std::path::Path;

fn default_event_capacity() -> usize {
    64
}

fn default_log_changes() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Configuration for a [`MeetStore`](crate::managers::MeetStore).
#[derive(Clone, Debug, Serialize, Deserialize, Type, PartialEq, Eq)]
pub struct StoreSettings {
    /// Buffer size of the change-event channel. Slow subscribers that fall
    /// further behind than this miss events.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Log every applied change at info level
    #[serde(default = "default_log_changes")]
    pub log_changes: bool,

    /// Logger directives used by [`crate::logging::init_from`]
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            log_changes: default_log_changes(),
            log_filter: default_log_filter(),
        }
    }
}

impl StoreSettings {
    /// Reads settings from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading store settings from {:?}", path);

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings: StoreSettings = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings file {:?}", path))?;

        Ok(settings)
    }

    /// Channel capacity clamped to the minimum a broadcast channel accepts.
    pub fn channel_capacity(&self) -> usize {
        self.event_capacity.max(1)
    }
}
