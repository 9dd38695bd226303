use std::path::Path;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Timing knobs for a review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a `saved` indicator stays up before reverting to `idle`.
    #[serde(default = "default_saved_revert_ms")]
    pub saved_revert_ms: u64,
    /// Visual transition delay between focus-mode items.
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            saved_revert_ms: default_saved_revert_ms(),
            transition_ms: default_transition_ms(),
        }
    }
}

fn default_saved_revert_ms() -> u64 {
    2_000
}

fn default_transition_ms() -> u64 {
    200
}

impl SessionConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(EngineError::Config(format!("{}: {e}", path.display()))),
        }
    }

    pub fn saved_revert_delay(&self) -> TimeDelta {
        millis(self.saved_revert_ms)
    }

    pub fn transition_delay(&self) -> TimeDelta {
        millis(self.transition_ms)
    }
}

fn millis(ms: u64) -> TimeDelta {
    TimeDelta::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}
