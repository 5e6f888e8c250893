//! Per-user memory: record types, in-process store, two-phase loading,
//! and the retrieval engine facade

pub mod loader;
pub mod retrieval;
pub mod store;
pub mod types;

pub use loader::{PageLoad, TwoPhaseLoader};
pub use retrieval::RecallEngine;
pub use store::{DurableStore, MemoryStore};
pub use types::*;
