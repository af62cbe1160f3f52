//! Durable artifact storage.
//!
//! [`Store`] bundles the two pieces of state shared between requests:
//!
//! - [`ContentStore`]: one record per identifier, with layered lookup
//! - [`IdentifierRegistry`]: recently used identifiers
//!
//! Both serialize their read-merge-write sequences behind locks; writes land
//! through a temporary file and rename.

mod content_store;
mod error;
mod record;
mod registry;

pub use content_store::{normalize_identifier, similarity, ContentStore, ResolvedRecord};
pub use error::{StoreError, StoreResult};
pub use record::{ContentRecord, RecordMetadata};
pub use registry::{IdentifierRegistry, RegistryData, MAX_RECENT};

use std::path::{Path, PathBuf};

use crate::core::StoreConfig;

/// Content store and identifier registry under one data directory.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,
    content: ContentStore,
    registry: IdentifierRegistry,
}

impl Store {
    /// Open the store under `root` (`root/content`, `root/registry.json`).
    pub fn open(root: impl Into<PathBuf>, config: &StoreConfig) -> StoreResult<Self> {
        let root = root.into();
        let content = ContentStore::open(root.join("content"), config.similarity_threshold)?;
        let registry = IdentifierRegistry::new(root.join("registry.json"), config.recent_limit);
        Ok(Self { root, content, registry })
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record storage.
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Recent identifiers.
    pub fn registry(&self) -> &IdentifierRegistry {
        &self.registry
    }
}
