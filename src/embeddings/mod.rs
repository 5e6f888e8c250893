//! Embedding generation module
//!
//! Provides semantic embeddings for memory retrieval through an injected
//! remote provider, fronted by a bounded deduplicating cache.
//!
//! # Contract
//! - `embed_batch` issues one provider call for all cache misses combined,
//!   preserving input order
//! - text → vector is a pure function from the provider's point of view;
//!   cache entries are immutable once written
//! - a batch may partially fail: per-item slots come back as `None` with
//!   the rest of the batch intact

pub mod cache;

pub use cache::{normalize_text, CacheStats, CachedEmbedder, EmbeddingCache};

use async_trait::async_trait;

use crate::errors::Result;

/// Result of one provider batch call
///
/// `vectors` has the same length and order as the input. A `None` slot
/// marks a per-item failure; the caller skips that record rather than
/// failing the whole batch.
#[derive(Debug, Clone)]
pub struct BatchEmbeddings {
    pub vectors: Vec<Option<Vec<f32>>>,
}

impl BatchEmbeddings {
    /// All-successful batch
    pub fn complete(vectors: Vec<Vec<f32>>) -> Self {
        Self {
            vectors: vectors.into_iter().map(Some).collect(),
        }
    }

    /// Number of failed slots
    pub fn failed_count(&self) -> usize {
        self.vectors.iter().filter(|v| v.is_none()).count()
    }
}

/// Remote text → vector function
///
/// Stateless from this crate's perspective; batching is the caller's
/// responsibility and the contract requires output order to match input
/// order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts in one round-trip
    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbeddings>;

    /// Fixed embedding dimension for this deployment
    fn dimension(&self) -> usize;
}
