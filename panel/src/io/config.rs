//! Panel configuration stored under `.panel/state/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::RunInputs;
use crate::io::atomic::write_atomic;

/// Panel configuration (TOML).
///
/// Edited by humans; missing fields default to the values below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PanelConfig {
    /// User name sent to the engine when the operator leaves it blank.
    pub fallback_user_name: String,

    /// Number of operator errors kept for display.
    pub error_history_limit: usize,

    /// Poll interval for the engine exchange directory, in milliseconds.
    pub poll_interval_ms: u64,

    /// Run inputs used when the engine publishes none.
    pub defaults: InputDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputDefaults {
    pub newsletters: String,
    pub topics: String,
    pub user_name: String,
}

impl From<&InputDefaults> for RunInputs {
    fn from(defaults: &InputDefaults) -> Self {
        RunInputs {
            newsletters: defaults.newsletters.clone(),
            topics: defaults.topics.clone(),
            user_name: defaults.user_name.clone(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            fallback_user_name: "Guest".to_string(),
            error_history_limit: 20,
            poll_interval_ms: 100,
            defaults: InputDefaults::default(),
        }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fallback_user_name.trim().is_empty() {
            return Err(anyhow!("fallback_user_name must not be blank"));
        }
        if self.error_history_limit == 0 {
            return Err(anyhow!("error_history_limit must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PanelConfig::default()`.
pub fn load_config(path: &Path) -> Result<PanelConfig> {
    if !path.exists() {
        return Ok(PanelConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PanelConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk.
pub fn write_config(path: &Path, cfg: &PanelConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
