//! In-process memory store and the durable-store boundary
//!
//! `MemoryStore` is the in-memory record collection one engine owns; the
//! external durable store is the source of truth and is reachable only
//! through the read-only [`DurableStore`] trait.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::Result;
use crate::memory::types::{MemoryId, MemoryRecord, SharedMemory, StoredRecord};

/// Read-only view of the external durable store
///
/// `fetch_recent` returns records ordered by `created_at` descending,
/// ties broken by store-assigned id descending. The engine never writes
/// through this interface; new memories reach the durable store upstream
/// and are re-indexed on the next full reload.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn fetch_recent(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<StoredRecord>>;
}

/// Per-user in-memory record collection
///
/// Owned exclusively by one engine instance; never shared across user
/// partitions. Records are inserted by the two-phase loader and the
/// background indexer, and only read thereafter.
pub struct MemoryStore {
    records: RwLock<HashMap<MemoryId, SharedMemory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a record, returning the shared handle
    ///
    /// Inserting an id that already exists replaces nothing: the first
    /// record wins, matching the index's no-duplicate invariant.
    pub fn insert(&self, record: MemoryRecord) -> SharedMemory {
        let mut records = self.records.write();
        let shared = Arc::new(record);
        records
            .entry(shared.id.clone())
            .or_insert_with(|| shared.clone())
            .clone()
    }

    pub fn get(&self, id: &MemoryId) -> Option<SharedMemory> {
        self.records.read().get(id).cloned()
    }

    pub fn contains(&self, id: &MemoryId) -> bool {
        self.records.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
