//! Test utilities for Verso.
//!
//! - [`TestFontBuilder`] writes small TrueType fonts in memory, so tests
//!   never depend on fonts installed on the host.
//! - [`RecordingCanvas`] implements the glyph canvas by recording texture
//!   creation, uploads and draws.
//!
//! Unit tests inside `verso-text` should only use the font helpers: the
//! canvas implements traits of the `verso-text` crate this crate links
//! against, which is a distinct copy from the one under unit test. Use it
//! from integration tests.

pub mod canvas;
pub mod font;

pub use canvas::{CanvasCall, MockTexture, RecordingCanvas};
pub use font::{GlyphBox, TestFontBuilder, latin_font, latin_font_without};
