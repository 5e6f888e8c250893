//! Bounded deduplicating embedding cache
//!
//! Keyed by SHA256 of normalized text (trimmed, case-folded) so that
//! retries and repeated phrasings of the same fact cost one provider call.
//! Uses SHA256 rather than DefaultHasher for stable keys independent of
//! hasher seeding. Eviction is oldest-first at a fixed capacity.

use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::errors::{MemoryError, Result};

/// Cache key type: SHA256 of normalized text
pub type CacheKey = [u8; 32];

/// Normalize text for cache lookup: trim plus case-fold
///
/// Two texts that normalize identically share one cache entry and one
/// provider call.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

fn cache_key(text: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    hasher.finalize().into()
}

/// Cache counters for diagnostics
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded text → vector cache with oldest-first eviction
///
/// Entries are immutable once created (text → vector is pure), so there is
/// no invalidation path. Not internally synchronized; `CachedEmbedder`
/// wraps it in a mutex.
pub struct EmbeddingCache {
    capacity: usize,
    entries: HashMap<CacheKey, Vec<f32>>,
    insertion_order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<&Vec<f32>> {
        if self.entries.contains_key(key) {
            self.hits += 1;
            self.entries.get(key)
        } else {
            self.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, key: CacheKey, vector: Vec<f32>) {
        // Entries are immutable; a concurrent double-compute produced the
        // same vector, so the first write wins
        if self.entries.contains_key(&key) {
            return;
        }

        self.entries.insert(key, vector);
        self.insertion_order.push_back(key);

        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
                self.evictions += 1;
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

/// Embedding provider wrapper with cache-first lookup and batch dedup
///
/// Shareable across engines: cache keys carry no user-identifying data
/// beyond the text itself, and entries are immutable once written.
pub struct CachedEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Mutex<EmbeddingCache>,
}

impl CachedEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        Self {
            provider,
            cache: Mutex::new(EmbeddingCache::new(capacity)),
        }
    }

    /// Fixed embedding dimension of the underlying provider
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed a single text, cache-first
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        results
            .pop()
            .flatten()
            .ok_or_else(|| MemoryError::Provider {
                reason: "provider returned no vector for input".to_string(),
            })
    }

    /// Embed a batch, issuing one provider call for all distinct misses
    ///
    /// Output preserves input order; duplicate texts within the batch
    /// resolve to a single provider slot. Per-item provider failures come
    /// back as `None` and are not cached, so a later retry can succeed.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<CacheKey> = texts.iter().map(|t| cache_key(t)).collect();
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut miss_slots: HashMap<CacheKey, usize> = HashMap::new();
        let mut miss_texts: Vec<String> = Vec::new();

        {
            let mut cache = self.cache.lock();
            for (i, key) in keys.iter().enumerate() {
                if let Some(vector) = cache.get(key) {
                    results[i] = Some(vector.clone());
                } else if !miss_slots.contains_key(key) {
                    miss_slots.insert(*key, miss_texts.len());
                    miss_texts.push(texts[i].clone());
                }
            }
        }

        if miss_texts.is_empty() {
            return Ok(results);
        }

        // Lock released across the provider round-trip; a racing task may
        // recompute the same text, which insert() tolerates
        let batch = self.provider.embed_batch(&miss_texts).await?;
        if batch.vectors.len() != miss_texts.len() {
            return Err(MemoryError::Provider {
                reason: format!(
                    "provider returned {} vectors for {} inputs",
                    batch.vectors.len(),
                    miss_texts.len()
                ),
            });
        }

        let mut cache = self.cache.lock();
        for (i, key) in keys.iter().enumerate() {
            if results[i].is_some() {
                continue;
            }
            let slot = miss_slots[key];
            if let Some(vector) = &batch.vectors[slot] {
                cache.insert(*key, vector.clone());
                results[i] = Some(vector.clone());
            }
        }

        Ok(results)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}
