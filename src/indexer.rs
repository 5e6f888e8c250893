//! Background ingestion of new memories
//!
//! `enqueue` is fire-and-forget: the caller returns immediately while an
//! owned task embeds the text and inserts the record into the store and
//! index. Every spawned task is tracked so graceful shutdown can drain
//! outstanding writes instead of silently losing them, bounded by a
//! timeout. A failed record is logged and dropped; the durable store
//! upstream remains the source of truth and re-indexes it on the next
//! full reload.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::MemoryConfig;
use crate::embeddings::CachedEmbedder;
use crate::memory::store::MemoryStore;
use crate::memory::types::{MemoryCategory, MemoryRecord};
use crate::vector_db::FlatIndex;

/// Tracks and drains fire-and-forget indexing tasks
pub struct BackgroundIndexer {
    store: Arc<MemoryStore>,
    index: Arc<FlatIndex>,
    embedder: Arc<CachedEmbedder>,
    config: Arc<MemoryConfig>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
}

impl BackgroundIndexer {
    pub fn new(
        store: Arc<MemoryStore>,
        index: Arc<FlatIndex>,
        embedder: Arc<CachedEmbedder>,
        config: Arc<MemoryConfig>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            config,
            tasks: Mutex::new(Vec::new()),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of enqueued records not yet indexed
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Enqueue a new memory for indexing; returns immediately
    ///
    /// Must be called from within a tokio runtime. Empty text is rejected
    /// up front rather than spending a provider call on it.
    pub fn enqueue(
        &self,
        text: String,
        category: MemoryCategory,
        metadata: HashMap<String, String>,
    ) {
        if text.trim().is_empty() {
            warn!("Ignoring empty memory text");
            return;
        }

        self.pending.fetch_add(1, Ordering::SeqCst);

        let store = self.store.clone();
        let index = self.index.clone();
        let embedder = self.embedder.clone();
        let config = self.config.clone();
        let pending = self.pending.clone();

        let handle = tokio::spawn(async move {
            index_one(store, index, embedder, config, text, category, metadata).await;
            pending.fetch_sub(1, Ordering::SeqCst);
        });

        let mut tasks = self.tasks.lock();
        // Opportunistically drop completed handles so the set stays small
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Await outstanding tasks, bounded by the shutdown budget
    ///
    /// Returns true if everything drained. Tasks still running at the
    /// deadline are detached with a warning; their records will be absent
    /// from the index until the next reload.
    pub async fn shutdown(&self, drain_timeout: Duration) -> bool {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        if handles.is_empty() {
            return true;
        }

        let deadline = Instant::now() + drain_timeout;
        let mut drained = true;

        for handle in handles {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("Shutdown drain budget exhausted, detaching remaining tasks");
                drained = false;
                break;
            }
            if timeout(remaining, handle).await.is_err() {
                warn!("Indexing task did not finish within drain budget");
                drained = false;
            }
        }

        drained
    }
}

async fn index_one(
    store: Arc<MemoryStore>,
    index: Arc<FlatIndex>,
    embedder: Arc<CachedEmbedder>,
    config: Arc<MemoryConfig>,
    text: String,
    category: MemoryCategory,
    metadata: HashMap<String, String>,
) {
    let embedding = match timeout(config.embed_timeout(), embedder.embed(&text)).await {
        Ok(Ok(vector)) => vector,
        Ok(Err(e)) => {
            warn!("Embedding failed for enqueued memory, dropping: {e}");
            return;
        }
        Err(_) => {
            warn!(
                "Embedding timed out after {}ms for enqueued memory, dropping",
                config.embed_timeout_ms
            );
            return;
        }
    };

    let importance = config.ranking.importance_for(category);
    let record = MemoryRecord::new(text, category, embedding.clone(), importance, metadata);
    let id = record.id.clone();

    // Store before index: a searchable id must always resolve in the store
    store.insert(record);
    if let Err(e) = index.insert(id.clone(), embedding) {
        warn!("Index insert failed for {id}, record remains unsearchable: {e}");
        return;
    }

    debug!("Indexed new {category} memory {id}");
}
