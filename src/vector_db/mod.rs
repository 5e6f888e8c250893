//! Vector index for semantic retrieval
//!
//! Brute-force exact nearest neighbor over per-user collections. At the
//! target scale (hundreds to low thousands of vectors per user) a linear
//! scan outperforms graph-based ANN structures once build cost is counted,
//! and it gives exact recall.
//!
//! Concurrency model: copy-on-write snapshots. Readers clone an `Arc` of
//! the current entry slab under a lock held only for the clone; writers
//! rebuild off to the side and swap the `Arc`. A search therefore sees a
//! fully-consistent pre-insert or post-insert snapshot, never a partially
//! written vector.

pub mod distance;
pub mod flat;

pub use flat::FlatIndex;
