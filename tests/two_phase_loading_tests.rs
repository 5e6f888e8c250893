//! Two-phase loading, degraded startup, shutdown, and multi-user
//! lifecycle tests

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{
    axis, gated_test_config, record_batch, stored, test_config, wait_until, MockDurableStore,
    MockProvider,
};
use smriti_memory::{
    CachedEmbedder, MemoryCategory, MemoryConfig, MemoryManager, NoopExpander, RecallEngine,
    SearchRequest,
};

async fn started_engine_with(
    provider: Arc<MockProvider>,
    store: Arc<MockDurableStore>,
    config: MemoryConfig,
) -> RecallEngine {
    let engine = RecallEngine::new(
        "user-1",
        store,
        Arc::new(CachedEmbedder::new(provider, 1000)),
        Arc::new(NoopExpander),
        Arc::new(config),
    );
    engine.start().await;
    engine
}

async fn started_engine(
    provider: Arc<MockProvider>,
    store: Arc<MockDurableStore>,
) -> RecallEngine {
    started_engine_with(provider, store, test_config()).await
}

#[tokio::test]
async fn test_critical_then_background_counts() {
    let provider = MockProvider::new();
    let store = MockDurableStore::new();
    store.put_records("user-1", record_batch(150));
    let gate = store.gate_background();

    let engine = started_engine_with(provider, store, gated_test_config()).await;

    // Ready right after the critical phase, background still gated
    assert!(engine.ready());
    let stats = engine.stats();
    assert_eq!(stats.total_indexed, 100);
    assert!(!stats.background_load_complete);

    gate.add_permits(100);
    assert!(wait_until(|| engine.stats().total_indexed == 150).await);
    assert!(wait_until(|| engine.stats().background_load_complete).await);
}

#[tokio::test]
async fn test_search_before_background_uses_critical_subset_only() {
    let provider = MockProvider::new();
    let mut records = record_batch(150);
    // Record 120 sits beyond the critical page and matches the query
    records[120].text = "tail target memory".to_string();
    provider.set_canned("tail target memory", axis(3));
    provider.set_canned("find the tail target", axis(3));

    let critical_ids: HashSet<_> = records.iter().take(100).map(|r| r.id.clone()).collect();
    let tail_id = records[120].id.clone();

    let store = MockDurableStore::new();
    store.put_records("user-1", records);
    let gate = store.gate_background();

    let engine = started_engine_with(provider, store, gated_test_config()).await;

    let before = engine
        .search(SearchRequest::new("find the tail target"))
        .await;
    assert!(!before.memories.is_empty());
    for hit in &before.memories {
        assert!(
            critical_ids.contains(&hit.memory.id),
            "pre-background search returned a record outside the critical subset"
        );
    }

    gate.add_permits(100);
    assert!(wait_until(|| engine.stats().background_load_complete).await);

    let after = engine
        .search(SearchRequest::new("find the tail target"))
        .await;
    assert_eq!(after.memories[0].memory.id, tail_id);
}

#[tokio::test]
async fn test_critical_load_retries_once_after_store_failure() {
    let provider = MockProvider::new();
    let store = MockDurableStore::new();
    store.put_records("user-1", record_batch(10));
    store.fail_next(1);

    let engine = started_engine(provider, store.clone()).await;

    assert!(engine.ready());
    assert_eq!(engine.stats().total_indexed, 10);
    assert!(store.fetch_calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_ready_with_zero_records_when_store_unreachable() {
    let provider = MockProvider::new();
    let store = MockDurableStore::new();
    store.put_records("user-1", record_batch(10));
    // Both the first attempt and the retry fail
    store.fail_next(5);

    let engine = started_engine(provider, store).await;

    assert!(engine.ready());
    assert_eq!(engine.stats().total_indexed, 0);

    let response = engine.search(SearchRequest::new("memory number 1")).await;
    assert!(response.memories.is_empty());
}

#[tokio::test]
async fn test_load_uses_one_batch_call_not_per_record_calls() {
    let provider = MockProvider::new();
    let store = MockDurableStore::new();
    store.put_records("user-1", record_batch(50));

    let engine = started_engine(provider.clone(), store).await;

    assert_eq!(engine.stats().total_indexed, 50);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_shutdown_drains_pending_writes() {
    let provider = MockProvider::new();
    provider.delay_ms.store(30, Ordering::SeqCst);
    let store = MockDurableStore::new();

    let engine = started_engine(provider, store).await;
    for i in 0..5 {
        engine.add_memory(
            format!("note {i}"),
            MemoryCategory::Experience,
            HashMap::new(),
        );
    }

    engine.shutdown().await;

    let stats = engine.stats();
    assert_eq!(stats.pending_background_count, 0);
    assert_eq!(stats.total_indexed, 5);
}

#[tokio::test]
async fn test_stats_track_pending_ingest() {
    let provider = MockProvider::new();
    provider.delay_ms.store(100, Ordering::SeqCst);
    let store = MockDurableStore::new();

    let engine = started_engine(provider, store).await;
    engine.add_memory("slow note", MemoryCategory::State, HashMap::new());

    assert_eq!(engine.stats().pending_background_count, 1);
    assert!(wait_until(|| engine.stats().pending_background_count == 0).await);
    assert_eq!(engine.stats().total_indexed, 1);
}

#[tokio::test]
async fn test_manager_isolates_user_partitions() {
    let provider = MockProvider::new();
    provider.set_canned("alpha likes chess", axis(0));
    provider.set_canned("beta likes rowing", axis(1));
    provider.set_canned("what does this user like", vec![0.7, 0.7, 0.0, 0.0]);

    let store = MockDurableStore::new();
    store.put_records(
        "alpha",
        vec![stored("alpha likes chess", MemoryCategory::Interest, 1)],
    );
    store.put_records(
        "beta",
        vec![stored("beta likes rowing", MemoryCategory::Interest, 1)],
    );

    let manager = MemoryManager::new(
        store,
        provider,
        Arc::new(NoopExpander),
        test_config(),
    );

    let alpha = manager.engine_for("alpha").await;
    let beta = manager.engine_for("beta").await;
    assert_eq!(manager.user_count(), 2);

    let alpha_hits = alpha
        .search(SearchRequest::new("what does this user like"))
        .await;
    let beta_hits = beta
        .search(SearchRequest::new("what does this user like"))
        .await;

    assert_eq!(alpha_hits.memories.len(), 1);
    assert_eq!(alpha_hits.memories[0].memory.text, "alpha likes chess");
    assert_eq!(beta_hits.memories.len(), 1);
    assert_eq!(beta_hits.memories[0].memory.text, "beta likes rowing");

    manager.remove_user("alpha").await;
    assert_eq!(manager.user_count(), 1);
    manager.shutdown_all().await;
    assert_eq!(manager.user_count(), 0);
}

#[tokio::test]
async fn test_engine_for_returns_same_engine_for_same_user() {
    let provider = MockProvider::new();
    let store = MockDurableStore::new();
    let manager = MemoryManager::new(
        store,
        provider,
        Arc::new(NoopExpander),
        test_config(),
    );

    let first = manager.engine_for("gamma").await;
    let second = manager.engine_for("gamma").await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(manager.user_count(), 1);
}

#[tokio::test]
async fn test_shared_cache_spares_provider_on_rebuild() {
    let provider = MockProvider::new();
    let store = MockDurableStore::new();
    store.put_records("delta", record_batch(20));

    let manager = MemoryManager::new(
        store,
        provider.clone(),
        Arc::new(NoopExpander),
        test_config(),
    );

    manager.engine_for("delta").await;
    let calls_after_first_load = provider.call_count();
    assert_eq!(calls_after_first_load, 1);

    // Rebuilding the same user's engine hits the shared embedding cache
    manager.remove_user("delta").await;
    let rebuilt = manager.engine_for("delta").await;

    assert_eq!(rebuilt.stats().total_indexed, 20);
    assert_eq!(provider.call_count(), calls_after_first_load);
}
