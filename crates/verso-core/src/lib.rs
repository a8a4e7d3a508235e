//! Verso Core
//!
//! Shared building blocks for the Verso text server: generational handle
//! storage, geometry, math re-exports, logging and profiling setup, and the
//! worker pool used for fork-join jobs.

pub mod alloc;
pub mod geometry;
pub mod logging;
pub mod math;
pub mod profiling;
pub mod task_pool;

pub use task_pool::TaskPool;
