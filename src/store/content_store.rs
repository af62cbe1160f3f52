//! File-backed content store.
//!
//! One JSON file per normalized identifier, under `<data_dir>/content`.
//! Lookups go from strict to loose:
//!
//! 1. exact key (`<id>.json`)
//! 2. normalized key
//! 3. bare identifier with a known source extension (legacy layout)
//! 4. any stored file whose name contains the identifier
//! 5. best positional similarity above the threshold
//!
//! Steps 3 to 5 are best effort and can resolve to the wrong record.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use super::error::{StoreError, StoreResult};
use super::record::{ContentRecord, RecordMetadata};

/// Extensions tried for legacy bare-identifier files, in order.
const LEGACY_EXTENSIONS: [&str; 10] =
    [".py", ".ts", ".js", ".cpp", ".java", ".md", ".txt", ".html", ".css", ""];

/// A record together with the file it was resolved from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    /// File name inside the store directory
    pub key: String,

    /// The record
    pub record: ContentRecord,
}

impl ResolvedRecord {
    /// Identifier the record is saved under from now on.
    pub fn identifier(&self) -> String {
        let stem = Path::new(&self.key).file_stem().and_then(|s| s.to_str()).unwrap_or(&self.key);
        normalize_identifier(stem).unwrap_or_else(|_| stem.to_string())
    }
}

/// Identifier-keyed record storage.
#[derive(Debug)]
pub struct ContentStore {
    dir: PathBuf,
    threshold: f64,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContentStore {
    /// Open a store rooted at `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>, threshold: f64) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, threshold, locks: Mutex::new(HashMap::new()) })
    }

    /// Directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a record under the normalized identifier.
    ///
    /// On update the prior revision is read and merged under the key's lock,
    /// so concurrent writers to one identifier serialize. A legacy record
    /// stored under the raw identifier (`my-report.json`) is merged and then
    /// removed, so the name it was found by now reaches the new revision.
    pub fn save(
        &self,
        identifier: &str,
        content: &str,
        metadata: RecordMetadata,
        is_update: bool,
    ) -> StoreResult<PathBuf> {
        let key = normalize_identifier(identifier)?;
        let lock = self.lock_for(&key);
        let result = {
            let _guard = lock.lock();
            self.save_locked(identifier.trim(), &key, content, metadata, is_update)
        };
        self.release_lock(&key, lock);
        result
    }

    fn save_locked(
        &self,
        identifier: &str,
        key: &str,
        content: &str,
        mut metadata: RecordMetadata,
        is_update: bool,
    ) -> StoreResult<PathBuf> {
        let path = self.dir.join(format!("{key}.json"));
        let legacy = (identifier != key && is_plain_name(identifier))
            .then(|| self.dir.join(format!("{identifier}.json")))
            .filter(|p| p.is_file());
        let now = Utc::now();

        let prior_path = if path.exists() { Some(&path) } else { legacy.as_ref() };
        let prior = match prior_path {
            Some(prior_path) if is_update => match read_record(prior_path) {
                Ok(record) => Some(record.metadata),
                Err(e) => {
                    tracing::error!(
                        path = %prior_path.display(),
                        error = %e,
                        "Failed to read prior revision"
                    );
                    None
                }
            },
            _ => None,
        };

        match prior {
            Some(prior) => metadata.stamp_update(&prior, now),
            None => metadata.stamp_new(now),
        }

        let record = ContentRecord::new(content, metadata);
        write_atomic(&path, &serde_json::to_vec_pretty(&record)?)?;

        if let Some(legacy) = legacy {
            match fs::remove_file(&legacy) {
                Ok(()) => {
                    tracing::info!(from = %legacy.display(), to = %key, "Migrated legacy record");
                }
                Err(e) => {
                    tracing::warn!(path = %legacy.display(), error = %e, "Failed to remove legacy record");
                }
            }
        }

        tracing::info!(identifier = %key, is_update, "Content saved");
        Ok(path)
    }

    /// Retrieve the record for an identifier.
    ///
    /// Never fails: a miss or an unreadable store yields an empty record.
    pub fn retrieve(&self, identifier: &str) -> ContentRecord {
        self.resolve(identifier).map(|r| r.record).unwrap_or_default()
    }

    /// Resolve an identifier through the layered lookup.
    pub fn resolve(&self, identifier: &str) -> Option<ResolvedRecord> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }

        // Raw identifiers only address files directly when they are plain names
        let plain = is_plain_name(identifier);

        if plain {
            if let Some(found) = self.load_key(&format!("{identifier}.json")) {
                return Some(found);
            }
        }

        if let Ok(key) = normalize_identifier(identifier) {
            if let Some(found) = self.load_key(&format!("{key}.json")) {
                return Some(found);
            }
        }

        if plain {
            for ext in LEGACY_EXTENSIONS {
                if let Some(found) = self.load_key(&format!("{identifier}{ext}")) {
                    tracing::debug!(identifier, ext, "Resolved by extension");
                    return Some(found);
                }
            }
        }

        let names = self.file_names();
        let needle = identifier.to_lowercase();

        for name in &names {
            if name.to_lowercase().contains(&needle) {
                if let Some(found) = self.load_key(name) {
                    tracing::debug!(identifier, key = %name, "Resolved by substring");
                    return Some(found);
                }
            }
        }

        let mut best: Option<(&String, f64)> = None;
        for name in &names {
            let stem = Path::new(name).file_stem().and_then(|s| s.to_str()).unwrap_or(name);
            let score = similarity(stem, identifier);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }

        if let Some((name, score)) = best {
            if score > self.threshold {
                tracing::debug!(identifier, key = %name, score, "Resolved by similarity");
                return self.load_key(name);
            }
        }

        tracing::warn!(identifier, "No content found");
        None
    }

    /// Stored file names, sorted for a deterministic scan order.
    pub fn file_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    fn load_key(&self, name: &str) -> Option<ResolvedRecord> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return None;
        }

        match read_entry(&path) {
            Ok(record) => Some(ResolvedRecord { key: name.to_string(), record }),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error reading stored file");
                None
            }
        }
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks.lock().entry(key.to_string()).or_default().clone()
    }

    /// Forget a key's lock once no other writer holds or awaits it.
    fn release_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }
}

/// Map an identifier to a filesystem-safe key.
///
/// Every non-alphanumeric character becomes `_`.
pub fn normalize_identifier(identifier: &str) -> StoreResult<String> {
    let key: String = identifier
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();

    if key.is_empty() {
        return Err(StoreError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(key)
}

/// Positional character overlap between two names, relative to the longer one.
///
/// Case-insensitive; `1.0` means identical, `0.0` means no position matches.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }

    let same = a.iter().zip(&b).filter(|(x, y)| x == y).count();
    same as f64 / longest as f64
}

fn is_plain_name(identifier: &str) -> bool {
    !identifier.starts_with('.') && !identifier.contains(['/', '\\'])
}

/// Read a stored file of any supported shape.
fn read_entry(path: &Path) -> StoreResult<ContentRecord> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext == "json" {
        return read_record(path);
    }

    let content = fs::read_to_string(path)?;
    Ok(ContentRecord::new(content, RecordMetadata::from_extension(ext)))
}

/// Read a `.json` record, treating undecodable files as plain text.
fn read_record(path: &Path) -> StoreResult<ContentRecord> {
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(record) => Ok(record),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Not a JSON record, reading as text");
            Ok(ContentRecord::new(raw, RecordMetadata::default()))
        }
    }
}

/// Write through a temporary file so readers never see a partial record.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("record");
    let tmp = path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
