//! Shared mock collaborators for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use smriti_memory::chrono::{DateTime, Duration, Utc};
use smriti_memory::embeddings::normalize_text;
use smriti_memory::parking_lot::Mutex;
use smriti_memory::uuid::Uuid;
use smriti_memory::{
    BatchEmbeddings, DurableStore, EmbeddingProvider, MemoryCategory, MemoryConfig, MemoryError,
    MemoryId, Result, StoredRecord,
};

pub const DIM: usize = 4;

/// One-hot vector along the given axis
pub fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i % DIM] = 1.0;
    v
}

/// Deterministic filler vector for texts without a canned embedding
fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.1; DIM];
    for (i, b) in text.bytes().enumerate() {
        v[i % DIM] += (b % 17) as f32 / 16.0;
    }
    v
}

/// Scripted embedding provider with canned vectors and failure modes
pub struct MockProvider {
    pub calls: AtomicUsize,
    pub hang: AtomicBool,
    pub delay_ms: AtomicU64,
    canned: Mutex<HashMap<String, Vec<f32>>>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            hang: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            canned: Mutex::new(HashMap::new()),
        })
    }

    /// Register a fixed vector for a text (normalized-key lookup)
    pub fn set_canned(&self, text: &str, vector: Vec<f32>) {
        self.canned.lock().insert(normalize_text(text), vector);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbeddings> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        let canned = self.canned.lock();
        let vectors = texts
            .iter()
            .map(|t| {
                canned
                    .get(&normalize_text(t))
                    .cloned()
                    .unwrap_or_else(|| hash_vector(t))
            })
            .collect();
        Ok(BatchEmbeddings::complete(vectors))
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// In-memory durable store with per-user partitions, scripted failures,
/// and an optional gate blocking background-phase reads
pub struct MockDurableStore {
    records: Mutex<HashMap<String, Vec<StoredRecord>>>,
    pub fetch_calls: AtomicUsize,
    pub fail_remaining: AtomicUsize,
    background_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockDurableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
            fetch_calls: AtomicUsize::new(0),
            fail_remaining: AtomicUsize::new(0),
            background_gate: Mutex::new(None),
        })
    }

    pub fn put_records(&self, user_id: &str, mut records: Vec<StoredRecord>) {
        // Durable-store contract: created_at descending, id descending
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        self.records.lock().insert(user_id.to_string(), records);
    }

    /// Block reads with offset > 0 until the returned gate gets permits
    pub fn gate_background(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.background_gate.lock() = Some(gate.clone());
        gate
    }

    /// Fail the next `n` fetch calls
    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl DurableStore for MockDurableStore {
    async fn fetch_recent(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<StoredRecord>> {
        let gate = if offset > 0 {
            self.background_gate.lock().clone()
        } else {
            None
        };
        if let Some(gate) = gate {
            gate.acquire().await.map_err(|_| MemoryError::StoreRead {
                reason: "gate closed".to_string(),
            })?
            .forget();
        }

        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(MemoryError::StoreRead {
                reason: "injected failure".to_string(),
            });
        }

        let records = self.records.lock();
        let rows = records.get(user_id).cloned().unwrap_or_default();
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }
}

/// A stored record `minutes_old` minutes in the past
pub fn stored(text: &str, category: MemoryCategory, minutes_old: i64) -> StoredRecord {
    stored_at(text, category, Utc::now() - Duration::minutes(minutes_old))
}

pub fn stored_at(text: &str, category: MemoryCategory, created_at: DateTime<Utc>) -> StoredRecord {
    StoredRecord {
        id: MemoryId(Uuid::new_v4()),
        text: text.to_string(),
        category,
        created_at,
    }
}

/// `count` FACT records, newest first, one minute apart
pub fn record_batch(count: usize) -> Vec<StoredRecord> {
    (0..count)
        .map(|i| stored(&format!("memory number {i}"), MemoryCategory::Fact, i as i64))
        .collect()
}

/// Tight timeouts so failure-path tests stay fast
pub fn test_config() -> MemoryConfig {
    MemoryConfig {
        embed_timeout_ms: 300,
        store_read_timeout_ms: 500,
        shutdown_timeout_ms: 1000,
        critical_retry_backoff_ms: 30,
        ..Default::default()
    }
}

/// Like [`test_config`] but with a store-read timeout generous enough
/// that a gated background fetch survives until the test opens the gate
pub fn gated_test_config() -> MemoryConfig {
    MemoryConfig {
        store_read_timeout_ms: 10_000,
        ..test_config()
    }
}

/// Poll until `check` passes or ~2 seconds elapse
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    false
}
