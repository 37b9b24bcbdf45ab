//! Shared, immutable access to a loaded index.
//!
//! A serving process loads its index once and passes an [`IndexHandle`] into every
//! request path. Handles are cheap to clone and never allow mutation, so any number
//! of threads can search concurrently without locking.
//!
//! [`SharedIndex`] adds hot-reload on top: a rebuilt index is loaded completely and
//! then swapped in as a whole. Requests that already took a handle keep searching
//! their snapshot; later requests see the new one.

use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::config::FaceFindConfig;
use crate::error::Result;
use crate::index::NearestNeighborIndex;
use crate::persist;
use crate::store::EmbeddingStore;

/// Cheaply clonable, read-only reference to a [`NearestNeighborIndex`].
#[derive(Debug, Clone, Default)]
pub struct IndexHandle(Arc<NearestNeighborIndex>);

impl IndexHandle {
    pub fn new(index: NearestNeighborIndex) -> Self {
        Self(Arc::new(index))
    }

    /// Load the persisted index pair from disk.
    pub fn load(index_path: &Path, identifiers_path: &Path) -> Result<Self> {
        let store = persist::load(index_path, identifiers_path)?;
        info!(
            index = %index_path.display(),
            faces = store.size(),
            "index opened"
        );
        Ok(Self::from(store))
    }

    /// Load the index pair named by `config`.
    pub fn open(config: &FaceFindConfig) -> Result<Self> {
        Self::load(&config.index_path, &config.identifiers_path)
    }
}

impl From<EmbeddingStore> for IndexHandle {
    fn from(store: EmbeddingStore) -> Self {
        Self::new(NearestNeighborIndex::new(store))
    }
}

impl Deref for IndexHandle {
    type Target = NearestNeighborIndex;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Index slot that can be atomically replaced by a freshly built index.
#[derive(Debug, Default)]
pub struct SharedIndex {
    current: RwLock<IndexHandle>,
}

impl SharedIndex {
    pub fn new(handle: IndexHandle) -> Self {
        Self {
            current: RwLock::new(handle),
        }
    }

    /// Snapshot of the index currently being served.
    pub fn current(&self) -> IndexHandle {
        // the guarded value is a plain Arc, a poisoned lock still holds a valid one
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in `handle`, returning the previously served index.
    pub fn replace(&self, handle: IndexHandle) -> IndexHandle {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        info!(faces = handle.len(), "swapping in rebuilt index");
        std::mem::replace(&mut *guard, handle)
    }
}
