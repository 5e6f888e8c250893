//! Multi-factor ranking for retrieved candidates
//!
//! Combines raw vector similarity with recency, category importance, and a
//! conversational-context bonus:
//!
//! ```text
//! final_score = similarity            (1 / (1 + distance), in [0, 1])
//!             + temporal_bonus        (monotone in age, bounded [0, 0.2])
//!             + importance_weight     (category table, bounded [0, 0.2])
//!             + context_bonus         (fixed bonus on term overlap)
//! ```
//!
//! Ordering: final score descending, ties by `created_at` descending (more
//! recent wins), deduplicated by id, truncated to top_k.

use chrono::{DateTime, Duration, Utc};
use ordered_float::OrderedFloat;
use std::collections::HashSet;
use tracing::warn;

use crate::config::RankingConfig;
use crate::constants::CONTEXT_MIN_TOKEN_LEN;
use crate::memory::store::MemoryStore;
use crate::memory::types::{MemoryRecord, RecalledMemory};
use crate::query::Candidate;
use crate::vector_db::distance::similarity_from_distance;

/// Scores, orders, and truncates candidates
pub struct RankingEngine {
    config: RankingConfig,
}

impl RankingEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Rank candidates against the store, returning at most `top_k` hits
    ///
    /// Candidates whose id no longer resolves in the store are dropped and
    /// logged; a ghost id here would mean the index and store diverged.
    pub fn rank(
        &self,
        candidates: &[Candidate],
        store: &MemoryStore,
        now: DateTime<Utc>,
        context: &[String],
        top_k: usize,
    ) -> Vec<RecalledMemory> {
        if candidates.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let context_terms = extract_terms(context);
        let mut seen: HashSet<_> = HashSet::with_capacity(candidates.len());
        let mut scored: Vec<RecalledMemory> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if !seen.insert(candidate.id.clone()) {
                continue;
            }

            let Some(memory) = store.get(&candidate.id) else {
                warn!("Candidate {} missing from store, dropping", candidate.id);
                continue;
            };

            let similarity = similarity_from_distance(candidate.distance);
            let final_score = similarity
                + self.temporal_bonus(memory.age_at(now))
                + memory.importance_weight
                + self.context_bonus(&memory, &context_terms);

            scored.push(RecalledMemory {
                memory,
                final_score,
                similarity,
            });
        }

        scored.sort_by(|a, b| {
            OrderedFloat(b.final_score)
                .cmp(&OrderedFloat(a.final_score))
                .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
        });
        scored.truncate(top_k);
        scored
    }

    /// Recency boost: full inside the recent window, partial inside the
    /// medium window, zero beyond
    ///
    /// Monotone non-increasing in age by construction (the medium bonus is
    /// capped at the recent bonus), bounded to [0, 0.2] by clamping.
    fn temporal_bonus(&self, age: Duration) -> f32 {
        if age <= Duration::hours(self.config.recent_window_hours) {
            self.config.clamped_recent_bonus()
        } else if age <= Duration::days(self.config.medium_window_days) {
            self.config.clamped_medium_bonus()
        } else {
            0.0
        }
    }

    /// Fixed bonus when candidate text or category overlaps the
    /// conversation window
    fn context_bonus(&self, memory: &MemoryRecord, context_terms: &HashSet<String>) -> f32 {
        if context_terms.is_empty() {
            return 0.0;
        }

        let category_match = context_terms.contains(memory.category.as_str());
        let text_match = tokenize(&memory.text).any(|token| context_terms.contains(&token));

        if category_match || text_match {
            self.config.context_bonus.max(0.0)
        } else {
            0.0
        }
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= CONTEXT_MIN_TOKEN_LEN)
        .map(|token| token.to_lowercase())
}

fn extract_terms(context: &[String]) -> HashSet<String> {
    context.iter().flat_map(|line| tokenize(line)).collect()
}
