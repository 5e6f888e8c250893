//! Per-user retrieval engine
//!
//! Owns one user's store, index, and ingestion pipeline, and wires the
//! query processor and ranking stage into the `search` surface. Created
//! per user partition on first use, discarded on session teardown; never
//! shared across users.
//!
//! # Lifecycle
//!
//! 1. `new` builds a cold engine (empty store and index)
//! 2. `start` runs the critical load synchronously, marks the engine
//!    ready, and spawns the background remainder
//! 3. `search` / `add_memory` serve traffic, degraded until loading
//!    converges
//! 4. `shutdown` drains outstanding ingestion tasks, bounded by a timeout

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::MemoryConfig;
use crate::embeddings::CachedEmbedder;
use crate::indexer::BackgroundIndexer;
use crate::memory::loader::TwoPhaseLoader;
use crate::memory::store::{DurableStore, MemoryStore};
use crate::memory::types::{
    EngineStats, MemoryCategory, RecallResponse, SearchRequest,
};
use crate::query::{QueryExpander, QueryProcessor};
use crate::ranking::RankingEngine;
use crate::vector_db::FlatIndex;

/// Semantic memory retrieval engine for one user partition
pub struct RecallEngine {
    user_id: String,
    config: Arc<MemoryConfig>,
    store: Arc<MemoryStore>,
    index: Arc<FlatIndex>,
    embedder: Arc<CachedEmbedder>,
    query: QueryProcessor,
    ranking: RankingEngine,
    indexer: BackgroundIndexer,
    loader: Arc<TwoPhaseLoader>,
    started: AtomicBool,
    ready: AtomicBool,
    background_complete: Arc<AtomicBool>,
    background_task: Mutex<Option<JoinHandle<()>>>,
}

impl RecallEngine {
    /// Build a cold engine; call [`start`](Self::start) before serving
    ///
    /// The embedder is shareable across engines (its cache keys carry no
    /// user data); everything else is owned by this instance.
    pub fn new(
        user_id: impl Into<String>,
        durable: Arc<dyn DurableStore>,
        embedder: Arc<CachedEmbedder>,
        expander: Arc<dyn QueryExpander>,
        config: Arc<MemoryConfig>,
    ) -> Self {
        let user_id = user_id.into();
        let store = Arc::new(MemoryStore::new());
        let index = Arc::new(FlatIndex::new(embedder.dimension()));

        let query = QueryProcessor::new(
            embedder.clone(),
            index.clone(),
            expander,
            config.overfetch_multiplier,
            config.max_query_variants,
            config.embed_timeout(),
        );
        let ranking = RankingEngine::new(config.ranking.clone());
        let indexer = BackgroundIndexer::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            config.clone(),
        );
        let loader = Arc::new(TwoPhaseLoader::new(
            user_id.clone(),
            durable,
            embedder.clone(),
            store.clone(),
            index.clone(),
            config.clone(),
        ));

        Self {
            user_id,
            config,
            store,
            index,
            embedder,
            query,
            ranking,
            indexer,
            loader,
            started: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            background_complete: Arc::new(AtomicBool::new(false)),
            background_task: Mutex::new(None),
        }
    }

    /// Run the critical load and spawn the background remainder
    ///
    /// Idempotent; only the first call does work. Returns once the engine
    /// is ready for queries — the background phase keeps filling the index
    /// afterwards.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let critical = self.loader.load_critical().await;
        self.ready.store(true, Ordering::SeqCst);
        info!(
            user_id = %self.user_id,
            critical_indexed = critical.indexed,
            "Engine ready"
        );

        // A short critical page means the store is already exhausted
        if critical.fetched < self.config.critical_load_limit {
            self.background_complete.store(true, Ordering::SeqCst);
            return;
        }

        let loader = self.loader.clone();
        let complete = self.background_complete.clone();
        let offset = critical.fetched;
        let handle = tokio::spawn(async move {
            loader.load_remaining(offset).await;
            complete.store(true, Ordering::SeqCst);
        });
        *self.background_task.lock() = Some(handle);
    }

    /// Semantic search over this user's memories
    ///
    /// Never errors: provider failure, mid-load state, or an empty index
    /// all degrade to fewer (possibly zero) results within the configured
    /// timeout bounds.
    pub async fn search(&self, request: SearchRequest) -> RecallResponse {
        let started = Instant::now();
        let top_k = if request.top_k == 0 {
            self.config.default_top_k
        } else {
            request.top_k
        };

        let candidates = self
            .query
            .process(&request.query, top_k, request.expand)
            .await;
        let memories = self.ranking.rank(
            &candidates,
            &self.store,
            chrono::Utc::now(),
            &request.context,
            top_k,
        );

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            user_id = %self.user_id,
            hits = memories.len(),
            latency_ms,
            "Search complete"
        );

        RecallResponse {
            memories,
            latency_ms,
        }
    }

    /// Fire-and-forget ingestion of a new memory
    ///
    /// The durable store write happens upstream; this only makes the text
    /// searchable in-process. Returns immediately.
    pub fn add_memory(
        &self,
        text: impl Into<String>,
        category: MemoryCategory,
        metadata: HashMap<String, String>,
    ) {
        self.indexer.enqueue(text.into(), category, metadata);
    }

    /// True once the critical load phase finished (possibly degraded)
    pub fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Diagnostics snapshot
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            total_indexed: self.index.len(),
            pending_background_count: self.indexer.pending(),
            ready: self.ready(),
            background_load_complete: self.background_complete.load(Ordering::SeqCst),
            cache: self.embedder.stats(),
        }
    }

    /// Graceful teardown: stop background loading, drain ingestion tasks
    pub async fn shutdown(&self) {
        if let Some(handle) = self.background_task.lock().take() {
            handle.abort();
        }

        let drained = self.indexer.shutdown(self.config.shutdown_timeout()).await;
        info!(
            user_id = %self.user_id,
            drained,
            total_indexed = self.index.len(),
            "Engine shut down"
        );
    }
}
