//! Configuration management for Smriti-Memory
//!
//! All configurable parameters in one place with environment variable
//! overrides. Follows the principle: sensible defaults, configurable in
//! production. Numeric ranking constants are tunables, not correctness
//! requirements; the documented monotonicity and bound guarantees hold for
//! any configuration because values are clamped at use sites.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::constants::{
    BACKGROUND_LOAD_PAGE_SIZE, CONTEXT_MATCH_BONUS, CRITICAL_LOAD_LIMIT,
    CRITICAL_RETRY_BACKOFF_MS, DEFAULT_TOP_K, EMBEDDING_CACHE_CAPACITY, EMBED_TIMEOUT_MS,
    IMPORTANCE_WEIGHT_CAP, IMPORTANCE_WEIGHT_DEFAULT, MAX_QUERY_VARIANTS, SHUTDOWN_DRAIN_TIMEOUT_MS,
    STORE_READ_TIMEOUT_MS, TEMPORAL_BONUS_CAP, TEMPORAL_BONUS_MEDIUM, TEMPORAL_BONUS_RECENT,
    TEMPORAL_MEDIUM_DAYS, TEMPORAL_RECENT_HOURS, VECTOR_SEARCH_OVERFETCH,
};
use crate::memory::types::MemoryCategory;

/// Ranking stage configuration
///
/// The final score is `similarity + temporal_bonus + importance + context`.
/// All bonuses are clamped to their documented caps, so any configuration
/// preserves the invariant that similarity dominates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Memories newer than this receive the full recency boost (hours)
    #[serde(default = "default_recent_hours")]
    pub recent_window_hours: i64,

    /// Boost for memories inside the recent window
    #[serde(default = "default_recent_bonus")]
    pub recent_bonus: f32,

    /// Memories newer than this receive the partial recency boost (days)
    #[serde(default = "default_medium_days")]
    pub medium_window_days: i64,

    /// Boost for memories inside the medium window
    #[serde(default = "default_medium_bonus")]
    pub medium_bonus: f32,

    /// Boost when candidate text or category matches conversation context
    #[serde(default = "default_context_bonus")]
    pub context_bonus: f32,

    /// Importance weight for categories without a table entry
    #[serde(default = "default_importance")]
    pub importance_default: f32,

    /// Per-category importance overrides, keyed by category name
    ///
    /// This is the extension point for new categories: adding an entry here
    /// changes ranking without a code change.
    #[serde(default)]
    pub importance_overrides: HashMap<String, f32>,
}

fn default_recent_hours() -> i64 {
    TEMPORAL_RECENT_HOURS
}

fn default_recent_bonus() -> f32 {
    TEMPORAL_BONUS_RECENT
}

fn default_medium_days() -> i64 {
    TEMPORAL_MEDIUM_DAYS
}

fn default_medium_bonus() -> f32 {
    TEMPORAL_BONUS_MEDIUM
}

fn default_context_bonus() -> f32 {
    CONTEXT_MATCH_BONUS
}

fn default_importance() -> f32 {
    IMPORTANCE_WEIGHT_DEFAULT
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            recent_window_hours: default_recent_hours(),
            recent_bonus: default_recent_bonus(),
            medium_window_days: default_medium_days(),
            medium_bonus: default_medium_bonus(),
            context_bonus: default_context_bonus(),
            importance_default: default_importance(),
            importance_overrides: HashMap::new(),
        }
    }
}

impl RankingConfig {
    /// Resolve the importance weight for a category
    ///
    /// Override table first, then the category's built-in default, clamped
    /// to [0, IMPORTANCE_WEIGHT_CAP].
    pub fn importance_for(&self, category: MemoryCategory) -> f32 {
        self.importance_overrides
            .get(category.as_str())
            .copied()
            .unwrap_or_else(|| category.default_importance())
            .clamp(0.0, IMPORTANCE_WEIGHT_CAP)
    }

    /// Temporal bonus clamped to the documented [0, 0.2] bound
    pub fn clamped_recent_bonus(&self) -> f32 {
        self.recent_bonus.clamp(0.0, TEMPORAL_BONUS_CAP)
    }

    /// Medium-window bonus, additionally capped by the recent bonus so the
    /// curve stays monotone even under adversarial configuration
    pub fn clamped_medium_bonus(&self) -> f32 {
        self.medium_bonus
            .clamp(0.0, TEMPORAL_BONUS_CAP)
            .min(self.clamped_recent_bonus())
    }
}

/// Engine configuration loaded from defaults or environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum distinct normalized texts held by the embedding cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Records loaded synchronously before the engine reports ready
    #[serde(default = "default_critical_limit")]
    pub critical_load_limit: usize,

    /// Page size for the background loading phase
    #[serde(default = "default_background_page")]
    pub background_page_size: usize,

    /// Default number of results when a search does not specify top_k
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Over-fetch multiplier for index queries
    #[serde(default = "default_overfetch")]
    pub overfetch_multiplier: usize,

    /// Maximum paraphrase variants per expanded query
    #[serde(default = "default_max_variants")]
    pub max_query_variants: usize,

    /// Embedding provider call timeout (milliseconds)
    #[serde(default = "default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,

    /// Durable-store batch read timeout (milliseconds)
    #[serde(default = "default_store_read_timeout_ms")]
    pub store_read_timeout_ms: u64,

    /// Graceful-shutdown drain budget (milliseconds)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Backoff before the single critical-load retry (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub critical_retry_backoff_ms: u64,

    /// Ranking stage tunables
    #[serde(default)]
    pub ranking: RankingConfig,
}

fn default_cache_capacity() -> usize {
    EMBEDDING_CACHE_CAPACITY
}

fn default_critical_limit() -> usize {
    CRITICAL_LOAD_LIMIT
}

fn default_background_page() -> usize {
    BACKGROUND_LOAD_PAGE_SIZE
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_overfetch() -> usize {
    VECTOR_SEARCH_OVERFETCH
}

fn default_max_variants() -> usize {
    MAX_QUERY_VARIANTS
}

fn default_embed_timeout_ms() -> u64 {
    EMBED_TIMEOUT_MS
}

fn default_store_read_timeout_ms() -> u64 {
    STORE_READ_TIMEOUT_MS
}

fn default_shutdown_timeout_ms() -> u64 {
    SHUTDOWN_DRAIN_TIMEOUT_MS
}

fn default_retry_backoff_ms() -> u64 {
    CRITICAL_RETRY_BACKOFF_MS
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            critical_load_limit: default_critical_limit(),
            background_page_size: default_background_page(),
            default_top_k: default_top_k(),
            overfetch_multiplier: default_overfetch(),
            max_query_variants: default_max_variants(),
            embed_timeout_ms: default_embed_timeout_ms(),
            store_read_timeout_ms: default_store_read_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            critical_retry_backoff_ms: default_retry_backoff_ms(),
            ranking: RankingConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// Recognized variables (all optional):
    /// - `SMRITI_CACHE_CAPACITY`
    /// - `SMRITI_CRITICAL_LOAD_LIMIT`
    /// - `SMRITI_BACKGROUND_PAGE_SIZE`
    /// - `SMRITI_DEFAULT_TOP_K`
    /// - `SMRITI_OVERFETCH_MULTIPLIER`
    /// - `SMRITI_MAX_QUERY_VARIANTS`
    /// - `SMRITI_EMBED_TIMEOUT_MS`
    /// - `SMRITI_STORE_READ_TIMEOUT_MS`
    /// - `SMRITI_SHUTDOWN_TIMEOUT_MS`
    /// - `SMRITI_RECENT_BONUS`, `SMRITI_MEDIUM_BONUS`, `SMRITI_CONTEXT_BONUS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        read_usize("SMRITI_CACHE_CAPACITY", &mut config.cache_capacity);
        read_usize("SMRITI_CRITICAL_LOAD_LIMIT", &mut config.critical_load_limit);
        read_usize(
            "SMRITI_BACKGROUND_PAGE_SIZE",
            &mut config.background_page_size,
        );
        read_usize("SMRITI_DEFAULT_TOP_K", &mut config.default_top_k);
        read_usize(
            "SMRITI_OVERFETCH_MULTIPLIER",
            &mut config.overfetch_multiplier,
        );
        read_usize("SMRITI_MAX_QUERY_VARIANTS", &mut config.max_query_variants);
        read_u64("SMRITI_EMBED_TIMEOUT_MS", &mut config.embed_timeout_ms);
        read_u64(
            "SMRITI_STORE_READ_TIMEOUT_MS",
            &mut config.store_read_timeout_ms,
        );
        read_u64("SMRITI_SHUTDOWN_TIMEOUT_MS", &mut config.shutdown_timeout_ms);
        read_f32("SMRITI_RECENT_BONUS", &mut config.ranking.recent_bonus);
        read_f32("SMRITI_MEDIUM_BONUS", &mut config.ranking.medium_bonus);
        read_f32("SMRITI_CONTEXT_BONUS", &mut config.ranking.context_bonus);

        config
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn store_read_timeout(&self) -> Duration {
        Duration::from_millis(self.store_read_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn critical_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.critical_retry_backoff_ms)
    }
}

fn read_usize(var: &str, target: &mut usize) {
    if let Ok(val) = env::var(var) {
        if let Ok(n) = val.parse() {
            *target = n;
        }
    }
}

fn read_u64(var: &str, target: &mut u64) {
    if let Ok(val) = env::var(var) {
        if let Ok(n) = val.parse() {
            *target = n;
        }
    }
}

fn read_f32(var: &str, target: &mut f32) {
    if let Ok(val) = env::var(var) {
        if let Ok(n) = val.parse() {
            *target = n;
        }
    }
}
