//! Type definitions for the memory system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::constants::{DEFAULT_TOP_K, IMPORTANCE_WEIGHT_CAP};
use crate::embeddings::CacheStats;

/// Unique identifier for memories
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)] // Serialize as plain UUID string, not array
pub struct MemoryId(pub Uuid);

impl MemoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared memory reference for zero-copy operations
///
/// Using Arc<MemoryRecord> instead of MemoryRecord eliminates expensive
/// cloning of embedding vectors (384-1536 floats = 1.5-6KB each) on the
/// search hot path.
pub type SharedMemory = Arc<MemoryRecord>;

/// Closed set of memory categories
///
/// The set is extensible without code change through the importance
/// override table in `RankingConfig`; a category missing from the table
/// falls back to its built-in default weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryCategory {
    Fact,
    Goal,
    Interest,
    Experience,
    Preference,
    Relationship,
    Plan,
    Opinion,
    State,
}

impl MemoryCategory {
    /// Stable lowercase name, used as the importance-table key and for
    /// context matching
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Goal => "goal",
            Self::Interest => "interest",
            Self::Experience => "experience",
            Self::Preference => "preference",
            Self::Relationship => "relationship",
            Self::Plan => "plan",
            Self::Opinion => "opinion",
            Self::State => "state",
        }
    }

    /// Built-in importance weight, bounded to [0, 0.2]
    ///
    /// Durable facts and goals are weighted highest; transient state and
    /// opinions lowest. These are ranking priors, not validity judgments.
    pub fn default_importance(&self) -> f32 {
        match self {
            Self::Fact => 0.20,
            Self::Goal => 0.18,
            Self::Plan => 0.15,
            Self::Relationship => 0.14,
            Self::Preference => 0.12,
            Self::Experience => 0.10,
            Self::Interest => 0.10,
            Self::State => 0.06,
            Self::Opinion => 0.04,
        }
    }
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single memory fact with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique within a user partition
    pub id: MemoryId,

    /// The memory text as captured upstream
    pub text: String,

    /// Category driving the importance weight
    pub category: MemoryCategory,

    /// Capture timestamp (store-assigned for loaded records)
    pub created_at: DateTime<Utc>,

    /// Fixed-length embedding vector; dimensionality is identical for
    /// every record in a given index
    pub embedding: Vec<f32>,

    /// Derived scalar in [0, 0.2] from category (pre-resolved so ranking
    /// never consults the table per candidate)
    pub importance_weight: f32,

    /// Caller-supplied metadata, opaque to the engine
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl MemoryRecord {
    /// Build a record for a freshly ingested memory
    pub fn new(
        text: String,
        category: MemoryCategory,
        embedding: Vec<f32>,
        importance_weight: f32,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            text,
            category,
            created_at: Utc::now(),
            embedding,
            importance_weight: importance_weight.clamp(0.0, IMPORTANCE_WEIGHT_CAP),
            metadata,
        }
    }

    /// Build a record from a durable-store row plus its recomputed embedding
    pub fn from_stored(stored: StoredRecord, embedding: Vec<f32>, importance_weight: f32) -> Self {
        Self {
            id: stored.id,
            text: stored.text,
            category: stored.category,
            created_at: stored.created_at,
            embedding,
            importance_weight: importance_weight.clamp(0.0, IMPORTANCE_WEIGHT_CAP),
            metadata: HashMap::new(),
        }
    }

    /// Age of the memory relative to `now`, never negative
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        let age = now.signed_duration_since(self.created_at);
        if age < chrono::Duration::zero() {
            chrono::Duration::zero()
        } else {
            age
        }
    }
}

/// Row shape returned by the durable store
///
/// Embeddings are not persisted; they are recomputed at load time through
/// the cached embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: MemoryId,
    pub text: String,
    pub category: MemoryCategory,
    pub created_at: DateTime<Utc>,
}

/// Search request against one user's memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query; empty or whitespace-only returns no results
    /// without touching the embedding provider
    pub query: String,

    /// Maximum results to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Generate semantic paraphrase variants before searching
    ///
    /// Off by default: expansion adds an expander round-trip plus extra
    /// index queries.
    #[serde(default)]
    pub expand: bool,

    /// Recent utterances from the current conversation, used for the
    /// context-match bonus
    #[serde(default)]
    pub context: Vec<String>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl SearchRequest {
    /// Plain query with defaults for everything else
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            expand: false,
            context: Vec::new(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_expansion(mut self) -> Self {
        self.expand = true;
        self
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }
}

/// A search hit with its score breakdown
#[derive(Debug, Clone, Serialize)]
pub struct RecalledMemory {
    /// The matched record
    pub memory: SharedMemory,

    /// Combined score: similarity + temporal + importance + context
    pub final_score: f32,

    /// Normalized vector similarity in [0, 1], 1 = identical embedding
    pub similarity: f32,
}

/// Search response with timing for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct RecallResponse {
    /// Hits ordered by final score descending, at most top_k
    pub memories: Vec<RecalledMemory>,

    /// Wall-clock processing time in milliseconds
    pub latency_ms: f64,
}

/// Engine diagnostics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    /// Vectors currently searchable
    pub total_indexed: usize,

    /// Fire-and-forget ingestion tasks not yet completed
    pub pending_background_count: usize,

    /// Critical load phase finished (possibly degraded)
    pub ready: bool,

    /// Background load phase finished
    pub background_load_complete: bool,

    /// Embedding cache counters
    pub cache: CacheStats,
}
