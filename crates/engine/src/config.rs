// Local configuration for docsync clients.
//
// Config file: `~/.docsync/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default server URL when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

const DEFAULT_DEBOUNCE_MS: u64 = 2_000;
const MIN_DEBOUNCE_MS: u64 = 100;
const MAX_DEBOUNCE_MS: u64 = 60_000;

const DEFAULT_FALLBACK_INTERVAL_MS: u64 = 10_000;
const MIN_FALLBACK_INTERVAL_MS: u64 = 1_000;
const MAX_FALLBACK_INTERVAL_MS: u64 = 600_000;

/// Root directory for docsync global state: `~/.docsync/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".docsync"))
}

/// Path to the config file: `~/.docsync/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

// ── Engine config ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the docsync server (e.g. `http://127.0.0.1:8080`).
    pub server_url: String,
    /// Autosave timing.
    pub autosave: AutosaveConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { server_url: DEFAULT_SERVER_URL.into(), autosave: AutosaveConfig::default() }
    }
}

impl EngineConfig {
    /// Load from `~/.docsync/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Timing of the save scheduler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before an autosave fires.
    pub debounce_ms: u64,
    /// Interval of the safety-net tick that saves dirty content no debounce caught.
    pub fallback_interval_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { debounce_ms: DEFAULT_DEBOUNCE_MS, fallback_interval_ms: DEFAULT_FALLBACK_INTERVAL_MS }
    }
}

impl AutosaveConfig {
    /// Debounce window, clamped to [100ms, 60s].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS))
    }

    /// Fallback tick interval, clamped to [1s, 10min].
    pub fn fallback_interval(&self) -> Duration {
        Duration::from_millis(
            self.fallback_interval_ms.clamp(MIN_FALLBACK_INTERVAL_MS, MAX_FALLBACK_INTERVAL_MS),
        )
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
