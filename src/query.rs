//! Query processing: expansion, embedding, index search, candidate merge
//!
//! Turns a free-text query into one or more embedding lookups. With
//! expansion enabled, a pluggable strategy generates up to three semantic
//! paraphrase variants; each variant plus the original is searched
//! independently and the candidate sets are merged by id, keeping the best
//! (lowest-distance) score per memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::embeddings::CachedEmbedder;
use crate::errors::Result;
use crate::memory::types::MemoryId;
use crate::vector_db::FlatIndex;

/// Pluggable query-expansion strategy
///
/// The generator itself (typically a language-model call) lives outside
/// this crate; only the contract matters here: text in, zero to three
/// alternate query strings out. Failures and timeouts degrade to the
/// unexpanded query.
#[async_trait]
pub trait QueryExpander: Send + Sync {
    async fn expand(&self, query: &str) -> Result<Vec<String>>;
}

/// Expansion disabled: no variants, no external call
pub struct NoopExpander;

#[async_trait]
impl QueryExpander for NoopExpander {
    async fn expand(&self, _query: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// A merged search candidate prior to ranking
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: MemoryId,
    /// Best squared Euclidean distance across all query variants
    pub distance: f32,
}

/// Turns query text into a merged candidate set
pub struct QueryProcessor {
    embedder: Arc<CachedEmbedder>,
    index: Arc<FlatIndex>,
    expander: Arc<dyn QueryExpander>,
    overfetch_multiplier: usize,
    max_variants: usize,
    embed_timeout: Duration,
}

impl QueryProcessor {
    pub fn new(
        embedder: Arc<CachedEmbedder>,
        index: Arc<FlatIndex>,
        expander: Arc<dyn QueryExpander>,
        overfetch_multiplier: usize,
        max_variants: usize,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            expander,
            overfetch_multiplier,
            max_variants,
            embed_timeout,
        }
    }

    /// Produce the candidate set for a query
    ///
    /// Over-fetches `top_k * overfetch_multiplier` per variant so the
    /// ranking stage has enough material after merge. Never errors:
    /// provider failure or timeout yields an empty set, expansion failure
    /// yields the unexpanded set.
    pub async fn process(&self, query: &str, top_k: usize, expand: bool) -> Vec<Candidate> {
        let trimmed = query.trim();
        if trimmed.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut texts = vec![query.to_string()];
        if expand {
            texts.extend(self.expansion_variants(trimmed).await);
        }

        let embeddings = match timeout(self.embed_timeout, self.embedder.embed_batch(&texts)).await
        {
            Ok(Ok(vectors)) => vectors,
            Ok(Err(e)) => {
                warn!("Query embedding failed, returning empty candidates: {e}");
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    "Query embedding timed out after {}ms, returning empty candidates",
                    self.embed_timeout.as_millis()
                );
                return Vec::new();
            }
        };

        let k = top_k.saturating_mul(self.overfetch_multiplier).max(top_k);
        let mut best: HashMap<MemoryId, f32> = HashMap::new();

        for embedding in embeddings.into_iter().flatten() {
            for (id, score) in self.index.search(&embedding, k) {
                // Index scores are negative squared distance
                let distance = -score;
                best.entry(id)
                    .and_modify(|d| {
                        if distance < *d {
                            *d = distance;
                        }
                    })
                    .or_insert(distance);
            }
        }

        debug!(
            candidates = best.len(),
            variants = texts.len(),
            "Query processed"
        );

        best.into_iter()
            .map(|(id, distance)| Candidate { id, distance })
            .collect()
    }

    /// Ask the expander for paraphrases, bounded and failure-tolerant
    async fn expansion_variants(&self, query: &str) -> Vec<String> {
        match timeout(self.embed_timeout, self.expander.expand(query)).await {
            Ok(Ok(variants)) => variants
                .into_iter()
                .filter(|v| !v.trim().is_empty())
                .take(self.max_variants)
                .collect(),
            Ok(Err(e)) => {
                warn!("Query expansion failed, searching unexpanded: {e}");
                Vec::new()
            }
            Err(_) => {
                warn!("Query expansion timed out, searching unexpanded");
                Vec::new()
            }
        }
    }
}
