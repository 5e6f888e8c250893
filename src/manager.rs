//! Multi-user engine registry
//!
//! One `RecallEngine` per user partition, created on first use and torn
//! down explicitly. Engines never share a store or index; the cached
//! embedder is shared process-wide because its keys are pure normalized
//! text. Holding engines in an owned registry (rather than ambient module
//! state) keeps one user's index from leaking into another's session.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::MemoryConfig;
use crate::embeddings::{CachedEmbedder, EmbeddingProvider};
use crate::memory::retrieval::RecallEngine;
use crate::memory::store::DurableStore;
use crate::memory::types::EngineStats;
use crate::query::QueryExpander;

/// Creates, caches, and tears down per-user retrieval engines
pub struct MemoryManager {
    config: Arc<MemoryConfig>,
    durable: Arc<dyn DurableStore>,
    embedder: Arc<CachedEmbedder>,
    expander: Arc<dyn QueryExpander>,
    engines: DashMap<String, Arc<RecallEngine>>,
}

impl MemoryManager {
    pub fn new(
        durable: Arc<dyn DurableStore>,
        provider: Arc<dyn EmbeddingProvider>,
        expander: Arc<dyn QueryExpander>,
        config: MemoryConfig,
    ) -> Self {
        let embedder = Arc::new(CachedEmbedder::new(provider, config.cache_capacity));
        Self {
            config: Arc::new(config),
            durable,
            embedder,
            expander,
            engines: DashMap::new(),
        }
    }

    /// Get or create the engine for a user partition
    ///
    /// First caller triggers the critical load; concurrent callers for the
    /// same user share one engine (`start` is idempotent) and may observe
    /// `ready() == false` until the critical phase finishes.
    pub async fn engine_for(&self, user_id: &str) -> Arc<RecallEngine> {
        if let Some(engine) = self.engines.get(user_id) {
            return engine.clone();
        }

        let engine = Arc::new(RecallEngine::new(
            user_id,
            self.durable.clone(),
            self.embedder.clone(),
            self.expander.clone(),
            self.config.clone(),
        ));

        // Entry guard is dropped before the await below; losers of the
        // insert race adopt the winner's engine
        let engine = match self.engines.entry(user_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => existing.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(engine.clone());
                engine
            }
        };

        engine.start().await;
        engine
    }

    /// Tear down one user's engine, draining its ingestion tasks
    pub async fn remove_user(&self, user_id: &str) {
        if let Some((_, engine)) = self.engines.remove(user_id) {
            engine.shutdown().await;
            info!(user_id, "Engine removed");
        }
    }

    /// Tear down every engine
    pub async fn shutdown_all(&self) {
        let engines: Vec<Arc<RecallEngine>> = self
            .engines
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.engines.clear();

        for engine in engines {
            engine.shutdown().await;
        }
        info!("All engines shut down");
    }

    pub fn user_count(&self) -> usize {
        self.engines.len()
    }

    /// Diagnostics for every live engine
    pub fn stats(&self) -> Vec<(String, EngineStats)> {
        self.engines
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect()
    }
}
