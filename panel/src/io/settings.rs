//! Operator credentials persisted as one fixed-name JSON record.
//!
//! The record is read once when the store opens. Updates merge field by field
//! into the in-memory copy and persist the full merged record atomically.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::io::atomic::write_json_atomic;

/// File name of the credentials record under `.panel/state/`.
pub const SETTINGS_FILE: &str = "api_settings.json";

/// API keys the engine needs. Opaque strings; no format validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    /// Key for the language-model provider.
    #[serde(alias = "openaiKey")]
    pub llm_key: String,
    /// Key for the web crawling tool.
    #[serde(alias = "firecrawlKey")]
    pub crawler_key: String,
}

impl Credentials {
    fn merge(&mut self, patch: CredentialsPatch) {
        if let Some(llm_key) = patch.llm_key {
            self.llm_key = llm_key;
        }
        if let Some(crawler_key) = patch.crawler_key {
            self.crawler_key = crawler_key;
        }
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialsPatch {
    pub llm_key: Option<String>,
    pub crawler_key: Option<String>,
}

impl CredentialsPatch {
    pub fn is_empty(&self) -> bool {
        self.llm_key.is_none() && self.crawler_key.is_none()
    }
}

/// In-memory credentials mirrored to a durable record.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    current: Credentials,
}

impl SettingsStore {
    /// Open the store, reading the durable record once.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = load_credentials(&path);
        Self { path, current }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> &Credentials {
        &self.current
    }

    /// Merge `patch` and persist the full record.
    ///
    /// The in-memory record keeps the merge even if persisting fails.
    pub fn update(&mut self, patch: CredentialsPatch) -> Result<()> {
        self.current.merge(patch);
        debug!(path = %self.path.display(), "persisting credentials");
        write_json_atomic(&self.path, &self.current)
    }
}

/// Read credentials; a missing or unreadable record yields empty credentials.
pub fn load_credentials(path: &Path) -> Credentials {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return Credentials::default(),
    };
    match serde_json::from_str(&contents) {
        Ok(credentials) => credentials,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unparsable credentials record");
            Credentials::default()
        }
    }
}
