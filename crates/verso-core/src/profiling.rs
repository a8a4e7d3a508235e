//! Profiling utilities based on the `puffin` crate.
//!
//! Scopes are compiled in everywhere but only recorded once
//! [`set_enabled`] has been called with `true`.

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

/// Turns scope recording on or off process-wide.
pub fn set_enabled(enabled: bool) {
    puffin::set_scopes_on(enabled);
    tracing::debug!("puffin scopes {}", if enabled { "enabled" } else { "disabled" });
}

pub fn is_enabled() -> bool {
    puffin::are_scopes_on()
}

/// Mark the start of a new profiling frame.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
