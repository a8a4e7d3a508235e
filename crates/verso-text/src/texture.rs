//! Seams to the renderer that owns GPU textures.
//!
//! The text server never creates GPU resources itself. Atlas pages are
//! handed to a [`GlyphCanvas`], which returns a [`GlyphTexture`]; later
//! changes to a page are pushed with [`GlyphTexture::upload`].

use std::sync::Arc;

use verso_core::geometry::Rect;
use verso_core::math::Vec2;

use crate::font::atlas::AtlasImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// A texture owned by the renderer that mirrors one atlas page.
pub trait GlyphTexture: Send + Sync + std::fmt::Debug {
    /// Replaces the texture contents with `image`.
    fn upload(&self, image: &AtlasImage);

    fn size(&self) -> (u32, u32);
}

/// Parameters the renderer needs to sample a distance-field page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsdfDrawParams {
    pub pixel_range: f32,
    /// Scale from atlas pixels to destination pixels.
    pub scale: f32,
}

/// Drawing surface used by `draw` calls.
pub trait GlyphCanvas {
    fn create_texture(&self, image: &AtlasImage) -> Arc<dyn GlyphTexture>;

    /// Draws `source` (atlas pixels) of `texture` into `dest` (canvas pixels).
    fn draw_texture_rect_region(
        &self,
        texture: &Arc<dyn GlyphTexture>,
        dest: Rect<f32>,
        source: Rect<f32>,
        modulate: Color,
        msdf: Option<MsdfDrawParams>,
    );

    /// Placeholder box for a glyph no font could provide. `pos` is on the baseline.
    fn draw_hex_code_box(&self, size: u32, pos: Vec2, codepoint: u32, color: Color) {
        let _ = (size, pos, codepoint, color);
    }
}

/// Size of the hex-code placeholder box for `codepoint` at font `size`.
///
/// Box width grows with the number of hex digit columns needed.
pub fn hex_code_box_size(size: u32, codepoint: u32) -> Vec2 {
    let columns = if codepoint <= 0xFF {
        1.0
    } else if codepoint <= 0xFFFF {
        2.0
    } else {
        3.0
    };
    let spacing = (columns - 1.0f32).max(0.0);
    let unit = (size as f32 / 15.0).round().max(1.0);
    Vec2::new(4.0 + 3.0 * columns + spacing + 1.0, 15.0) * unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_box_widths() {
        assert_eq!(hex_code_box_size(15, 'e' as u32), Vec2::new(8.0, 15.0));
        assert_eq!(hex_code_box_size(15, 0x4E00), Vec2::new(12.0, 15.0));
        assert_eq!(hex_code_box_size(15, 0x1F600), Vec2::new(16.0, 15.0));
    }

    #[test]
    fn test_hex_box_scales_with_size() {
        assert_eq!(hex_code_box_size(30, 0x41), Vec2::new(16.0, 30.0));
        assert_eq!(hex_code_box_size(1, 0x41), Vec2::new(8.0, 15.0));
    }
}
