//! Recently used identifiers.
//!
//! A small JSON index consulted when an update request names no artifact.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::content_store::write_atomic;
use super::error::StoreResult;

/// Upper bound on `recent`, whatever the configured limit.
pub const MAX_RECENT: usize = 10;

/// Persisted registry contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryData {
    /// Identifier touched most recently
    pub last_identifier: Option<String>,

    /// When `last_identifier` was recorded
    pub last_timestamp: Option<DateTime<Utc>>,

    /// Unique identifiers, most recent first
    pub recent: Vec<String>,
}

impl RegistryData {
    /// Move `identifier` to the front, keeping at most `limit` entries.
    pub fn touch(&mut self, identifier: &str, limit: usize, now: DateTime<Utc>) {
        self.recent.retain(|id| id != identifier);
        self.recent.insert(0, identifier.to_string());
        self.recent.truncate(limit);
        self.last_identifier = Some(identifier.to_string());
        self.last_timestamp = Some(now);
    }

    /// Drop repeated and blank identifiers and cap `recent` at `limit`.
    fn tidy(&mut self, limit: usize) {
        let mut seen = HashSet::new();
        self.recent.retain(|id| !id.trim().is_empty() && seen.insert(id.clone()));
        self.recent.truncate(limit);
    }
}

/// File-backed identifier registry.
#[derive(Debug)]
pub struct IdentifierRegistry {
    path: PathBuf,
    limit: usize,
    lock: Mutex<()>,
}

impl IdentifierRegistry {
    /// Create a registry stored at `path`, keeping between 1 and
    /// [`MAX_RECENT`] identifiers.
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self { path: path.into(), limit: limit.clamp(1, MAX_RECENT), lock: Mutex::new(()) }
    }

    /// Registry file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a new or updated identifier.
    pub fn record(&self, identifier: &str) -> StoreResult<()> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock();
        let mut data = self.read();
        data.touch(identifier, self.limit, Utc::now());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&self.path, &serde_json::to_vec_pretty(&data)?)?;

        tracing::debug!(identifier, recent = data.recent.len(), "Registry updated");
        Ok(())
    }

    /// Most recently recorded identifier.
    pub fn last_identifier(&self) -> Option<String> {
        self.read().last_identifier
    }

    /// Recent identifiers, most recent first.
    pub fn recent(&self) -> Vec<String> {
        self.read().recent
    }

    /// Current registry contents; missing or corrupt files read as empty.
    ///
    /// A hand-edited file with repeats or too many entries is tidied on read.
    pub fn read(&self) -> RegistryData {
        let mut data: RegistryData = fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        data.tidy(self.limit);
        data
    }
}
