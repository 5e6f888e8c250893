//! Smriti-Memory Library
//!
//! Per-user semantic memory retrieval engine for conversational agents.
//! Stores short textual facts, embeds them through a pluggable provider,
//! and serves meaning-based (not keyword) recall over them.
//!
//! # Key Features
//! - Brute-force vector search with copy-on-write snapshots (search never
//!   blocks on a loader holding a lock)
//! - Two-phase loading: a small critical subset synchronously, the rest
//!   in the background
//! - Embedding deduplication through a bounded, normalized-text cache
//! - Multi-factor ranking: similarity + recency + category importance +
//!   conversational-context bonus
//! - Fire-and-forget ingestion with tracked tasks and graceful shutdown
//!
//! # Collaborators
//! The durable store, the embedding provider, and the optional query
//! expander are injected traits. The crate has no wire protocol and no
//! storage of its own; the index is rebuilt from the durable store on
//! every engine start.

pub mod config;
pub mod constants;
pub mod embeddings;
pub mod errors;
pub mod indexer;
pub mod manager;
pub mod memory;
pub mod query;
pub mod ranking;
pub mod tracing_setup;
pub mod vector_db;

// Re-export dependencies to ensure tests/benchmarks use the same version
pub use chrono;
pub use parking_lot;
pub use uuid;

pub use config::{MemoryConfig, RankingConfig};
pub use embeddings::{BatchEmbeddings, CachedEmbedder, EmbeddingProvider};
pub use errors::{MemoryError, Result};
pub use manager::MemoryManager;
pub use memory::retrieval::RecallEngine;
pub use memory::store::DurableStore;
pub use memory::types::{
    EngineStats, MemoryCategory, MemoryId, MemoryRecord, RecallResponse, RecalledMemory,
    SearchRequest, SharedMemory, StoredRecord,
};
pub use query::{NoopExpander, QueryExpander};
