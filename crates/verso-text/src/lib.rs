//! Verso Text - fallback text server
//!
//! This crate provides the simplest tier of a text server:
//! - Font objects with per-size glyph caches packed into atlas pages
//! - Bitmap rasterization through swash and multi-channel distance fields
//! - Shaped text buffers laid out one character per glyph, with line
//!   breaking, justification, tab stops and overrun trimming
//! - A handle-based API where fonts and buffers are addressed by
//!   generation-checked ids
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use indexmap::IndexMap;
//! use verso_text::{Direction, FallbackTextServer, JustificationFlags, Orientation, TextServerConfig};
//!
//! let server = FallbackTextServer::new(TextServerConfig::default());
//! let font = server.create_font();
//! server.font_load_file(font, "assets/fonts/NotoSans-Regular.ttf");
//!
//! let text = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
//! server.shaped_text_add_string(text, "Hello, World!", &[font], 16, IndexMap::new(), "", None);
//!
//! let width = server.shaped_text_fit_to_width(text, 200.0, JustificationFlags::WORD_BOUND);
//! println!("justified to {width}px");
//! ```
//!
//! ## Missing glyphs
//!
//! Characters no font in a span's fallback chain provides become hex-code
//! boxes. Their size comes from [`hex_code_box_size`].

pub mod config;
pub mod error;
pub mod feature_tags;
pub mod font;
pub mod handle;
pub mod server;
pub mod shaped;
pub mod texture;

pub use config::TextServerConfig;
pub use error::{TextError, TextResult};
pub use font::{
    Antialiasing, AtlasFormat, AtlasImage, FontObject, FontStyle, GlyphContours, Hinting,
    SizeMetrics, SubpixelPositioning, VariationAxis,
};
pub use handle::{FontId, ShapedTextId};
pub use server::{FallbackTextServer, ServerFeatures, TextServer};
pub use shaped::{
    Direction, Glyph, GlyphFlags, InlineAlign, JustificationFlags, ObjectKey, Orientation,
    ShapeState, ShapedTextBuffer, SpacingType, SpanMeta, TrimFlags,
};
pub use texture::{Color, GlyphCanvas, GlyphTexture, MsdfDrawParams, hex_code_box_size};
