//! Documented constants for the retrieval engine
//!
//! This module contains all tunable parameters with justification for their
//! values. Centralizing constants prevents magic numbers and makes tuning
//! easier. Every value here is a default; `config::MemoryConfig` can
//! override each one at runtime.

// =============================================================================
// RANKING BONUSES
// Recency and importance act as additive nudges on top of vector similarity.
// They are deliberately small relative to the [0, 1] similarity range so that
// a strong semantic match cannot be displaced by freshness alone.
// =============================================================================

/// Temporal bonus for memories newer than [`TEMPORAL_RECENT_HOURS`]
///
/// Justification:
/// - 0.15 lets a fresh memory beat a slightly better semantic match,
///   which tracks conversational behavior (people reference what just
///   happened)
/// - Below the 0.2 ceiling so recency never dominates similarity outright
pub const TEMPORAL_BONUS_RECENT: f32 = 0.15;

/// Age threshold for the full recency boost (hours)
pub const TEMPORAL_RECENT_HOURS: i64 = 24;

/// Temporal bonus for memories within [`TEMPORAL_MEDIUM_DAYS`]
///
/// Half-strength boost for the past week. Keeps the decay curve monotone:
/// recent > this-week > older, never the reverse.
pub const TEMPORAL_BONUS_MEDIUM: f32 = 0.05;

/// Age threshold for the medium recency boost (days)
pub const TEMPORAL_MEDIUM_DAYS: i64 = 7;

/// Upper bound on any temporal bonus
///
/// The ranking formula guarantees bonus ∈ [0, 0.2] regardless of
/// configuration; configured boosts are clamped to this cap.
pub const TEMPORAL_BONUS_CAP: f32 = 0.2;

/// Bonus when a candidate matches the current conversation context
///
/// Justification:
/// - 0.1 sits between the two temporal tiers: an on-topic memory from last
///   week should outrank an off-topic memory from this morning when their
///   similarity is comparable
pub const CONTEXT_MATCH_BONUS: f32 = 0.1;

/// Upper bound on category importance weights
///
/// Importance is a per-category prior, not a similarity signal, so it is
/// capped at the same 0.2 ceiling as the temporal bonus.
pub const IMPORTANCE_WEIGHT_CAP: f32 = 0.2;

/// Importance weight for categories with no table entry
///
/// Middle-of-the-road default so newly added categories participate in
/// ranking without code changes.
pub const IMPORTANCE_WEIGHT_DEFAULT: f32 = 0.08;

/// Minimum token length considered for context matching
///
/// Filters out pronouns and articles ("I", "a", "to") that would otherwise
/// make nearly every candidate match the conversation window.
pub const CONTEXT_MIN_TOKEN_LEN: usize = 3;

// =============================================================================
// QUERY PROCESSING
// =============================================================================

/// Over-fetch multiplier for vector search
///
/// When searching for N results, each index query retrieves N * this
/// multiplier candidates so the ranking stage has enough material after
/// merging variants and applying recency/importance re-ordering.
///
/// Justification:
/// - 4x absorbs the worst case where re-ranking promotes candidates from
///   deep in the similarity ordering
/// - Brute-force search cost is linear in index size, not in k, so the
///   larger k is effectively free at this scale
pub const VECTOR_SEARCH_OVERFETCH: usize = 4;

/// Maximum number of semantic paraphrase variants per query
///
/// Expansion is additive latency (one expander call plus extra searches),
/// so it is bounded tightly. Three variants cover phrasing diversity
/// without tripling the embedding bill.
pub const MAX_QUERY_VARIANTS: usize = 3;

/// Default number of results returned by a search
pub const DEFAULT_TOP_K: usize = 5;

// =============================================================================
// EMBEDDING CACHE
// =============================================================================

/// Maximum number of distinct normalized texts held by the embedding cache
///
/// Justification:
/// - 1000 entries at 384 dims is ~1.5MB of vectors, negligible for a
///   per-process cache
/// - Covers the full memory set of a typical user (hundreds to low
///   thousands of records) so reloads hit the cache instead of the provider
pub const EMBEDDING_CACHE_CAPACITY: usize = 1000;

// =============================================================================
// TWO-PHASE LOADING
// =============================================================================

/// Records loaded synchronously before the engine reports ready
///
/// Justification:
/// - 100 most-recent records bound worst-case startup latency to one store
///   read plus one embedding batch
/// - Recent records answer the overwhelming majority of conversational
///   recall queries; the long tail arrives via the background phase
pub const CRITICAL_LOAD_LIMIT: usize = 100;

/// Page size for the background loading phase
///
/// Larger than the critical page because nothing is waiting on it; one
/// provider round-trip per 400 records keeps remote-call overhead low.
pub const BACKGROUND_LOAD_PAGE_SIZE: usize = 400;

/// Backoff before retrying a failed critical load (milliseconds)
///
/// One short retry, then the engine proceeds with whatever loaded.
/// Availability is prioritized over completeness at startup.
pub const CRITICAL_RETRY_BACKOFF_MS: u64 = 200;

// =============================================================================
// TIMEOUTS
// Every suspension point is bounded. On expiry the caller receives a
// partial or empty result, never an indefinite hang.
// =============================================================================

/// Timeout for a single embedding provider call (milliseconds)
pub const EMBED_TIMEOUT_MS: u64 = 1500;

/// Timeout for a durable-store batch read (milliseconds)
pub const STORE_READ_TIMEOUT_MS: u64 = 2000;

/// Graceful-shutdown budget for draining background indexing tasks
/// (milliseconds)
///
/// Tasks still running after this are detached, not lost: the durable
/// store remains the source of truth and re-indexes them on the next
/// full reload.
pub const SHUTDOWN_DRAIN_TIMEOUT_MS: u64 = 3000;
