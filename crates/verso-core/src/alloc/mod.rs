//! Collection types used across Verso.
//!
//! - AHash-backed hash maps and sets
//! - [`SparseSet`](sparse_set::SparseSet), the generational arena behind every handle

pub mod sparse_set;

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
