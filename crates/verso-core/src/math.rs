//! SIMD-friendly math types re-exported from [`glam`].
//!
//! Glyph advances and offsets use [`Vec2`]; font transforms use [`Affine2`].
//!
//! ```
//! use verso_core::math::{Affine2, Vec2};
//!
//! let slant = Affine2::from_cols_array(&[1.0, 0.0, 0.5, 1.0, 0.0, 0.0]);
//! assert_eq!(slant.transform_vector2(Vec2::new(0.0, 10.0)), Vec2::new(5.0, 10.0));
//! ```
//!
//! [`glam`]: https://docs.rs/glam

pub use glam::{Affine2, IVec2, Mat2, UVec2, Vec2};

/// Smallest power of two greater than or equal to `value` (at least 1).
pub fn next_power_of_two(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}
