//! Brute-force vector index with copy-on-write snapshots
//!
//! # Lock discipline
//!
//! `snapshot` is held only long enough to clone or swap an `Arc`; the
//! linear scan and the new-slab construction both run lock-free on owned
//! data. `write_lock` serializes writers so concurrent batch inserts
//! cannot lose each other's entries. Search never blocks on a lock held
//! for longer than the swap.

use ordered_float::OrderedFloat;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::errors::{MemoryError, Result};
use crate::memory::types::MemoryId;
use crate::vector_db::distance::euclidean_squared;

struct IndexEntry {
    id: MemoryId,
    vector: Vec<f32>,
}

/// Exact k-nearest-neighbor index over one user's memories
///
/// Similarity scores returned by [`search`](FlatIndex::search) are the
/// negative squared Euclidean distance: higher = closer, 0 = identical.
/// Ties are broken by insertion order (stable). No deletion; the index is
/// discarded and rebuilt from the durable store on engine start.
pub struct FlatIndex {
    dimension: usize,
    snapshot: RwLock<Arc<Vec<IndexEntry>>>,
    write_lock: Mutex<()>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a single vector
    pub fn insert(&self, id: MemoryId, vector: Vec<f32>) -> Result<()> {
        self.insert_batch(vec![(id, vector)])
    }

    /// Insert a batch of vectors as one snapshot swap
    ///
    /// Either the whole batch becomes visible or none of it; a concurrent
    /// search observes the index before or after the batch, never midway.
    pub fn insert_batch(&self, items: Vec<(MemoryId, Vec<f32>)>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        for (id, vector) in &items {
            if vector.len() != self.dimension {
                return Err(MemoryError::IndexInconsistency {
                    details: format!(
                        "vector for {} has dimension {}, index expects {}",
                        id,
                        vector.len(),
                        self.dimension
                    ),
                });
            }
        }

        let _writer = self.write_lock.lock();

        let current = self.snapshot.read().clone();
        let mut next = Vec::with_capacity(current.len() + items.len());
        for entry in current.iter() {
            next.push(IndexEntry {
                id: entry.id.clone(),
                vector: entry.vector.clone(),
            });
        }
        for (id, vector) in items {
            next.push(IndexEntry { id, vector });
        }

        *self.snapshot.write() = Arc::new(next);
        Ok(())
    }

    /// k-nearest-neighbor search
    ///
    /// Returns up to k `(id, similarity)` pairs ordered best-first, where
    /// similarity is the negative squared Euclidean distance. A query of
    /// the wrong dimension returns no results rather than erroring;
    /// degraded output is preferred over a failed search.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(MemoryId, f32)> {
        if k == 0 || query.len() != self.dimension {
            return Vec::new();
        }

        let snapshot = self.snapshot.read().clone();
        if snapshot.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(OrderedFloat<f32>, usize)> = snapshot
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                (
                    OrderedFloat(euclidean_squared(query, &entry.vector)),
                    position,
                )
            })
            .collect();

        // Distance ascending; equal distances fall back to insertion order
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        scored
            .into_iter()
            .take(k)
            .map(|(distance, position)| (snapshot[position].id.clone(), -distance.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> MemoryId {
        MemoryId::new()
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = FlatIndex::new(2);
        let near = id();
        let far = id();
        let exact = id();

        index.insert(far.clone(), vec![10.0, 0.0]).unwrap();
        index.insert(near.clone(), vec![1.0, 0.0]).unwrap();
        index.insert(exact.clone(), vec![0.0, 0.0]).unwrap();

        let results = index.search(&[0.0, 0.0], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, exact);
        assert_eq!(results[1].0, near);
        assert_eq!(results[2].0, far);
        // Exact match scores 0, everything else negative
        assert_eq!(results[0].1, 0.0);
        assert!(results[1].1 > results[2].1);
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let index = FlatIndex::new(2);
        let first = id();
        let second = id();

        // Equidistant from the query
        index.insert(first.clone(), vec![1.0, 0.0]).unwrap();
        index.insert(second.clone(), vec![-1.0, 0.0]).unwrap();

        let results = index.search(&[0.0, 0.0], 2);
        assert_eq!(results[0].0, first);
        assert_eq!(results[1].0, second);
    }

    #[test]
    fn test_k_bounds_results() {
        let index = FlatIndex::new(1);
        for i in 0..10 {
            index.insert(id(), vec![i as f32]).unwrap();
        }

        assert_eq!(index.search(&[0.0], 3).len(), 3);
        assert_eq!(index.search(&[0.0], 100).len(), 10);
        assert!(index.search(&[0.0], 0).is_empty());
    }

    #[test]
    fn test_dimension_mismatch_on_insert_is_error() {
        let index = FlatIndex::new(3);
        let err = index.insert(id(), vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err.code(), "INDEX_INCONSISTENCY");
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_dimension_mismatch_on_search_is_empty() {
        let index = FlatIndex::new(3);
        index.insert(id(), vec![1.0, 2.0, 3.0]).unwrap();
        assert!(index.search(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn test_batch_insert_all_or_nothing_on_bad_dimension() {
        let index = FlatIndex::new(2);
        let result = index.insert_batch(vec![
            (id(), vec![1.0, 2.0]),
            (id(), vec![1.0, 2.0, 3.0]),
        ]);

        assert!(result.is_err());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_empty_index_search() {
        let index = FlatIndex::new(4);
        assert!(index.search(&[0.0, 0.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_snapshot_isolated_from_later_inserts() {
        let index = Arc::new(FlatIndex::new(1));
        index.insert(id(), vec![0.0]).unwrap();

        // A snapshot taken before an insert keeps serving the old view
        let before = index.search(&[0.0], 10);
        index.insert(id(), vec![1.0]).unwrap();
        let after = index.search(&[0.0], 10);

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn test_concurrent_insert_during_search() {
        use std::thread;

        let index = Arc::new(FlatIndex::new(4));
        for _ in 0..50 {
            index.insert(id(), vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        }

        let writer = {
            let index = index.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    index.insert(id(), vec![0.0, 1.0, 0.0, 0.0]).unwrap();
                }
            })
        };

        let reader = {
            let index = index.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let results = index.search(&[1.0, 0.0, 0.0, 0.0], 20);
                    // Every observed snapshot is internally consistent
                    assert!(results.len() <= 20);
                    for (_, score) in results {
                        assert!(score.is_finite());
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(index.len(), 250);
    }
}
