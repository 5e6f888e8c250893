//! Two-phase loading from the durable store
//!
//! Startup cost is bounded by loading only the most recent records
//! synchronously (the critical phase); the remainder streams in through a
//! background task. A search issued between the two phases simply sees
//! fewer, more recent candidates until the rest lands.
//!
//! Failure policy: the critical phase retries once with a short backoff,
//! then proceeds with whatever subset loaded — the engine must become
//! ready even with zero records. The background phase logs and stops on
//! error; missing records are re-indexed on the next full reload.

use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::MemoryConfig;
use crate::embeddings::CachedEmbedder;
use crate::errors::{MemoryError, Result};
use crate::memory::store::{DurableStore, MemoryStore};
use crate::memory::types::MemoryRecord;
use crate::vector_db::FlatIndex;

/// Outcome of loading one page from the durable store
#[derive(Debug, Clone, Copy, Default)]
pub struct PageLoad {
    /// Rows returned by the store for this page
    pub fetched: usize,
    /// Rows successfully embedded and indexed
    pub indexed: usize,
}

/// Loads durable-store pages into the in-memory store and index
pub struct TwoPhaseLoader {
    user_id: String,
    durable: Arc<dyn DurableStore>,
    embedder: Arc<CachedEmbedder>,
    store: Arc<MemoryStore>,
    index: Arc<FlatIndex>,
    config: Arc<MemoryConfig>,
}

impl TwoPhaseLoader {
    pub fn new(
        user_id: String,
        durable: Arc<dyn DurableStore>,
        embedder: Arc<CachedEmbedder>,
        store: Arc<MemoryStore>,
        index: Arc<FlatIndex>,
        config: Arc<MemoryConfig>,
    ) -> Self {
        Self {
            user_id,
            durable,
            embedder,
            store,
            index,
            config,
        }
    }

    /// Critical phase: most recent records, synchronous, retried once
    ///
    /// Blocks the caller until done; the engine is ready afterwards no
    /// matter the outcome.
    pub async fn load_critical(&self) -> PageLoad {
        let limit = self.config.critical_load_limit;

        match self.load_page(0, limit).await {
            Ok(page) => {
                info!(
                    user_id = %self.user_id,
                    indexed = page.indexed,
                    "Critical load complete"
                );
                page
            }
            Err(first_err) => {
                warn!(
                    user_id = %self.user_id,
                    "Critical load failed ({first_err}), retrying once"
                );
                tokio::time::sleep(self.config.critical_retry_backoff()).await;

                match self.load_page(0, limit).await {
                    Ok(page) => {
                        info!(
                            user_id = %self.user_id,
                            indexed = page.indexed,
                            "Critical load recovered on retry"
                        );
                        page
                    }
                    Err(second_err) => {
                        warn!(
                            user_id = %self.user_id,
                            "Critical load failed twice ({second_err}), starting empty"
                        );
                        PageLoad::default()
                    }
                }
            }
        }
    }

    /// Background phase: page through the remainder until a short page
    ///
    /// Never blocks the engine's caller. Errors stop the phase rather than
    /// retrying forever; availability over completeness.
    pub async fn load_remaining(&self, mut offset: usize) {
        let page_size = self.config.background_page_size;
        let mut total = 0usize;

        loop {
            match self.load_page(offset, page_size).await {
                Ok(page) => {
                    total += page.indexed;
                    if page.fetched < page_size {
                        break;
                    }
                    offset += page.fetched;
                }
                Err(e) => {
                    warn!(
                        user_id = %self.user_id,
                        "Background load stopped at offset {offset}: {e}"
                    );
                    break;
                }
            }
        }

        info!(
            user_id = %self.user_id,
            indexed = total,
            "Background load complete"
        );
    }

    /// Fetch, embed, and index one page
    ///
    /// Rows already present in the store (page overlap across phases) are
    /// skipped, preserving the one-record-per-indexed-vector invariant.
    /// Rows whose embedding slot failed are skipped with a warning.
    async fn load_page(&self, offset: usize, limit: usize) -> Result<PageLoad> {
        let fetched = timeout(
            self.config.store_read_timeout(),
            self.durable.fetch_recent(&self.user_id, offset, limit),
        )
        .await
        .map_err(|_| MemoryError::Timeout {
            operation: "fetch_recent",
            limit_ms: self.config.store_read_timeout_ms,
        })??;

        if fetched.is_empty() {
            return Ok(PageLoad::default());
        }

        let fresh: Vec<_> = fetched
            .iter()
            .filter(|row| !self.store.contains(&row.id))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return Ok(PageLoad {
                fetched: fetched.len(),
                indexed: 0,
            });
        }

        // One provider round-trip for the whole page, not N calls
        let texts: Vec<String> = fresh.iter().map(|row| row.text.clone()).collect();
        let vectors = timeout(
            self.config.embed_timeout(),
            self.embedder.embed_batch(&texts),
        )
        .await
        .map_err(|_| MemoryError::Timeout {
            operation: "embed_batch",
            limit_ms: self.config.embed_timeout_ms,
        })??;

        let mut pairs = Vec::with_capacity(fresh.len());
        for (row, slot) in fresh.into_iter().zip(vectors) {
            match slot {
                Some(embedding) => {
                    let importance = self.config.ranking.importance_for(row.category);
                    let id = row.id.clone();
                    let record = MemoryRecord::from_stored(row, embedding.clone(), importance);
                    // Store before index: searchable ids must resolve
                    self.store.insert(record);
                    pairs.push((id, embedding));
                }
                None => {
                    warn!(
                        user_id = %self.user_id,
                        "Embedding failed for record {}, skipping",
                        row.id
                    );
                }
            }
        }

        let indexed = pairs.len();
        self.index.insert_batch(pairs)?;

        Ok(PageLoad {
            fetched: fetched.len(),
            indexed,
        })
    }
}
