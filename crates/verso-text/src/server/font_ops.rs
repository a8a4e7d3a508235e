//! Handle-based font operations.
//!
//! Every call resolves the handle, locks the font for the duration of the
//! call and returns a sentinel when the handle is stale.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use verso_core::geometry::Rect;
use verso_core::math::{Affine2, Vec2};

use super::FallbackTextServer;
use crate::font::{
    AtlasImage, Antialiasing, FontStyle, GlyphContours, Hinting, SizeMetrics,
    SubpixelPositioning, VariationAxis,
};
use crate::handle::FontId;
use crate::texture::{Color, GlyphCanvas};

macro_rules! font_property {
    ($getter:ident => $inner_get:ident, $setter:ident => $inner_set:ident, $ty:ty) => {
        pub fn $getter(&self, font: FontId) -> $ty {
            self.with_font(font, |font| font.$inner_get()).unwrap_or_default()
        }

        pub fn $setter(&self, font: FontId, value: $ty) {
            self.with_font(font, |font| font.$inner_set(value));
        }
    };
}

macro_rules! font_metric {
    ($getter:ident, $setter:ident, $field:ident) => {
        pub fn $getter(&self, font: FontId, size: u32) -> f32 {
            self.with_font(font, |font| font.metrics(size).$field)
                .unwrap_or_default()
        }

        pub fn $setter(&self, font: FontId, size: u32, value: f32) {
            self.with_font(font, |font| {
                let metrics = SizeMetrics {
                    $field: value,
                    ..font.metrics(size)
                };
                font.set_metrics(size, metrics);
            });
        }
    };
}

macro_rules! glyph_property {
    ($getter:ident => $inner_get:ident, $setter:ident => $inner_set:ident, $ty:ty) => {
        pub fn $getter(&self, font: FontId, size: u32, glyph: u32) -> $ty {
            self.with_font(font, |font| font.$inner_get(size, glyph))
                .unwrap_or_default()
        }

        pub fn $setter(&self, font: FontId, size: u32, glyph: u32, value: $ty) {
            self.with_font(font, |font| font.$inner_set(size, glyph, value));
        }
    };
}

impl FallbackTextServer {
    /// Loads font bytes. Rejected data is logged and leaves the font unusable.
    pub fn font_set_data(&self, font: FontId, data: impl Into<Arc<[u8]>>) -> bool {
        let data = data.into();
        self.with_font(font, |font| match font.set_data(data) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Rejected font data: {}", err);
                false
            }
        })
        .unwrap_or(false)
    }

    /// Loads font bytes from `path`. Read and parse failures are logged.
    pub fn font_load_file(&self, font: FontId, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.with_font(font, |font| match font.load_file(path) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Failed to load font file {}: {}", path.display(), err);
                false
            }
        })
        .unwrap_or(false)
    }

    pub fn font_is_valid(&self, font: FontId) -> bool {
        self.with_font(font, |font| font.is_valid()).unwrap_or(false)
    }

    pub fn font_face_index(&self, font: FontId) -> u32 {
        self.with_font(font, |font| font.face_index()).unwrap_or(0)
    }

    pub fn font_set_face_index(&self, font: FontId, index: u32) -> bool {
        self.with_font(font, |font| match font.set_face_index(index) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Invalid face index: {}", err);
                false
            }
        })
        .unwrap_or(false)
    }

    pub fn font_face_count(&self, font: FontId) -> u32 {
        self.with_font(font, |font| font.face_count()).unwrap_or(0)
    }

    pub fn font_style(&self, font: FontId) -> FontStyle {
        self.with_font(font, |font| font.style())
            .unwrap_or(FontStyle::empty())
    }

    pub fn font_set_style(&self, font: FontId, style: FontStyle) {
        self.with_font(font, |font| font.set_style(style));
    }

    pub fn font_name(&self, font: FontId) -> String {
        self.with_font(font, |font| font.name().to_string())
            .unwrap_or_default()
    }

    pub fn font_set_name(&self, font: FontId, name: &str) {
        self.with_font(font, |font| font.set_name(name));
    }

    pub fn font_style_name(&self, font: FontId) -> String {
        self.with_font(font, |font| font.style_name().to_string())
            .unwrap_or_default()
    }

    pub fn font_set_style_name(&self, font: FontId, name: &str) {
        self.with_font(font, |font| font.set_style_name(name));
    }

    font_property!(font_antialiasing => antialiasing, font_set_antialiasing => set_antialiasing, Antialiasing);
    font_property!(font_hinting => hinting, font_set_hinting => set_hinting, Hinting);
    font_property!(font_subpixel_positioning => subpixel_positioning, font_set_subpixel_positioning => set_subpixel_positioning, SubpixelPositioning);
    font_property!(font_embolden => embolden, font_set_embolden => set_embolden, f32);
    font_property!(font_fixed_size => fixed_size, font_set_fixed_size => set_fixed_size, u32);
    font_property!(font_msdf_pixel_range => msdf_pixel_range, font_set_msdf_pixel_range => set_msdf_pixel_range, u32);
    font_property!(font_msdf_size => msdf_size, font_set_msdf_size => set_msdf_size, u32);
    font_property!(font_oversampling => oversampling, font_set_oversampling => set_oversampling, f32);

    pub fn font_is_msdf(&self, font: FontId) -> bool {
        self.with_font(font, |font| font.is_msdf()).unwrap_or(false)
    }

    pub fn font_set_msdf(&self, font: FontId, msdf: bool) {
        self.with_font(font, |font| font.set_msdf(msdf));
    }

    pub fn font_transform(&self, font: FontId) -> Affine2 {
        self.with_font(font, |font| font.transform())
            .unwrap_or(Affine2::IDENTITY)
    }

    pub fn font_set_transform(&self, font: FontId, transform: Affine2) {
        self.with_font(font, |font| font.set_transform(transform));
    }

    pub fn font_variation_coordinates(&self, font: FontId) -> IndexMap<u32, f32> {
        self.with_font(font, |font| font.variation_coordinates().clone())
            .unwrap_or_default()
    }

    pub fn font_set_variation_coordinates(&self, font: FontId, coordinates: IndexMap<u32, f32>) {
        self.with_font(font, |font| font.set_variation_coordinates(coordinates));
    }

    pub fn font_supported_variations(&self, font: FontId) -> Vec<VariationAxis> {
        self.with_font(font, |font| font.supported_variations())
            .unwrap_or_default()
    }

    /// OpenType features the font exposes. This tier does not shape, so none.
    pub fn font_supported_features(&self, font: FontId) -> IndexMap<u32, i32> {
        let _ = font;
        IndexMap::new()
    }

    pub fn font_opentype_feature_overrides(&self, font: FontId) -> IndexMap<u32, i32> {
        self.with_font(font, |font| font.opentype_feature_overrides().clone())
            .unwrap_or_default()
    }

    pub fn font_set_opentype_feature_overrides(&self, font: FontId, overrides: IndexMap<u32, i32>) {
        self.with_font(font, |font| font.set_opentype_feature_overrides(overrides));
    }

    // Size caches

    pub fn font_size_cache_list(&self, font: FontId) -> Vec<u32> {
        self.with_font(font, |font| font.size_cache_list())
            .unwrap_or_default()
    }

    pub fn font_clear_size_cache(&self, font: FontId) {
        self.with_font(font, |font| font.clear_size_cache());
    }

    pub fn font_remove_size_cache(&self, font: FontId, size: u32) {
        self.with_font(font, |font| font.remove_size_cache(size));
    }

    font_metric!(font_ascent, font_set_ascent, ascent);
    font_metric!(font_descent, font_set_descent, descent);
    font_metric!(font_underline_position, font_set_underline_position, underline_position);
    font_metric!(font_underline_thickness, font_set_underline_thickness, underline_thickness);

    pub fn font_scale(&self, font: FontId, size: u32) -> f32 {
        self.with_font(font, |font| font.scale(size)).unwrap_or(0.0)
    }

    pub fn font_set_scale(&self, font: FontId, size: u32, scale: f32) {
        self.with_font(font, |font| font.set_scale(size, scale));
    }

    // Textures

    pub fn font_texture_count(&self, font: FontId, size: u32) -> usize {
        self.with_font(font, |font| font.texture_count(size))
            .unwrap_or(0)
    }

    pub fn font_clear_textures(&self, font: FontId, size: u32) {
        self.with_font(font, |font| font.clear_textures(size));
    }

    pub fn font_remove_texture(&self, font: FontId, size: u32, idx: usize) -> bool {
        self.with_font(font, |font| font.remove_texture(size, idx))
            .unwrap_or(false)
    }

    pub fn font_texture_image(&self, font: FontId, size: u32, idx: usize) -> Option<AtlasImage> {
        self.with_font(font, |font| font.texture_image(size, idx))
            .flatten()
    }

    pub fn font_set_texture_image(&self, font: FontId, size: u32, idx: usize, image: AtlasImage) -> bool {
        self.with_font(font, |font| font.set_texture_image(size, idx, image))
            .unwrap_or(false)
    }

    // Glyphs

    pub fn font_glyph_list(&self, font: FontId, size: u32) -> Vec<u32> {
        self.with_font(font, |font| font.glyph_list(size))
            .unwrap_or_default()
    }

    pub fn font_clear_glyphs(&self, font: FontId, size: u32) {
        self.with_font(font, |font| font.clear_glyphs(size));
    }

    pub fn font_remove_glyph(&self, font: FontId, size: u32, glyph: u32) {
        self.with_font(font, |font| font.remove_glyph(size, glyph));
    }

    glyph_property!(font_glyph_advance => glyph_advance, font_set_glyph_advance => set_glyph_advance, Vec2);
    glyph_property!(font_glyph_offset => glyph_offset, font_set_glyph_offset => set_glyph_offset, Vec2);
    glyph_property!(font_glyph_size => glyph_size, font_set_glyph_size => set_glyph_size, Vec2);
    glyph_property!(font_glyph_uv_rect => glyph_uv_rect, font_set_glyph_uv_rect => set_glyph_uv_rect, Rect<f32>);
    glyph_property!(font_glyph_texture_idx => glyph_texture_idx, font_set_glyph_texture_idx => set_glyph_texture_idx, Option<usize>);

    pub fn font_glyph_texture_size(&self, font: FontId, size: u32, glyph: u32) -> (u32, u32) {
        self.with_font(font, |font| font.glyph_texture_size(size, glyph))
            .unwrap_or((0, 0))
    }

    pub fn font_glyph_contours(&self, font: FontId, size: u32, glyph: u32) -> Option<GlyphContours> {
        self.with_font(font, |font| font.glyph_contours(size, glyph))
            .flatten()
    }

    // Kerning

    pub fn font_kerning_list(&self, font: FontId, size: u32) -> Vec<(u32, u32)> {
        self.with_font(font, |font| font.kerning_list(size))
            .unwrap_or_default()
    }

    pub fn font_clear_kerning_map(&self, font: FontId, size: u32) {
        self.with_font(font, |font| font.clear_kerning_map(size));
    }

    pub fn font_remove_kerning(&self, font: FontId, size: u32, pair: (u32, u32)) {
        self.with_font(font, |font| font.remove_kerning(size, pair));
    }

    pub fn font_set_kerning(&self, font: FontId, size: u32, pair: (u32, u32), kerning: Vec2) {
        self.with_font(font, |font| font.set_kerning(size, pair, kerning));
    }

    pub fn font_kerning(&self, font: FontId, size: u32, pair: (u32, u32)) -> Vec2 {
        self.with_font(font, |font| font.kerning(size, pair))
            .unwrap_or(Vec2::ZERO)
    }

    // Characters

    pub fn font_glyph_index(&self, font: FontId, ch: char) -> u32 {
        self.with_font(font, |font| font.glyph_index(ch)).unwrap_or(0)
    }

    pub fn font_has_char(&self, font: FontId, ch: char) -> bool {
        self.with_font(font, |font| font.has_char(ch)).unwrap_or(false)
    }

    pub fn font_supported_chars(&self, font: FontId) -> Vec<char> {
        self.with_font(font, |font| font.supported_chars())
            .unwrap_or_default()
    }

    pub fn font_render_range(&self, font: FontId, size: u32, start: char, end: char) {
        self.with_font(font, |font| font.render_range(size, start, end));
    }

    pub fn font_render_glyph(&self, font: FontId, size: u32, glyph: u32) {
        self.with_font(font, |font| font.render_glyph(size, glyph));
    }

    /// Draws one glyph with its origin on the baseline at `pos`.
    pub fn font_draw_glyph(
        &self,
        font: FontId,
        canvas: &dyn GlyphCanvas,
        size: u32,
        pos: Vec2,
        glyph: u32,
        color: Color,
    ) {
        self.with_font(font, |font| font.draw_glyph(canvas, size, pos, glyph, color));
    }

    // Language and script support

    pub fn font_is_language_supported(&self, font: FontId, language: &str) -> bool {
        self.with_font(font, |font| font.is_language_supported(language))
            .unwrap_or(false)
    }

    pub fn font_set_language_support_override(&self, font: FontId, language: &str, supported: bool) {
        self.with_font(font, |font| font.set_language_support_override(language, supported));
    }

    pub fn font_language_support_override(&self, font: FontId, language: &str) -> Option<bool> {
        self.with_font(font, |font| font.language_support_override(language))
            .flatten()
    }

    pub fn font_remove_language_support_override(&self, font: FontId, language: &str) {
        self.with_font(font, |font| font.remove_language_support_override(language));
    }

    pub fn font_language_support_overrides(&self, font: FontId) -> Vec<String> {
        self.with_font(font, |font| font.language_support_overrides())
            .unwrap_or_default()
    }

    pub fn font_is_script_supported(&self, font: FontId, script: &str) -> bool {
        self.with_font(font, |font| font.is_script_supported(script))
            .unwrap_or(false)
    }

    pub fn font_set_script_support_override(&self, font: FontId, script: &str, supported: bool) {
        self.with_font(font, |font| font.set_script_support_override(script, supported));
    }

    pub fn font_script_support_override(&self, font: FontId, script: &str) -> Option<bool> {
        self.with_font(font, |font| font.script_support_override(script))
            .flatten()
    }

    pub fn font_remove_script_support_override(&self, font: FontId, script: &str) {
        self.with_font(font, |font| font.remove_script_support_override(script));
    }

    pub fn font_script_support_overrides(&self, font: FontId) -> Vec<String> {
        self.with_font(font, |font| font.script_support_overrides())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use verso_test_utils::latin_font;

    use super::*;
    use crate::config::TextServerConfig;

    fn server_with_font() -> (FallbackTextServer, FontId) {
        let server = FallbackTextServer::new(TextServerConfig::default().with_worker_threads(1));
        let font = server.create_font();
        assert!(server.font_set_data(font, latin_font()));
        (server, font)
    }

    #[test]
    fn test_rejected_data_leaves_font_unusable() {
        let server = FallbackTextServer::new(TextServerConfig::default().with_worker_threads(1));
        let font = server.create_font();
        assert!(!server.font_set_data(font, vec![0u8; 12]));
        assert!(!server.font_is_valid(font));
        assert!(!server.font_has_char(font, 'a'));
        assert_eq!(server.font_glyph_index(font, 'a'), 0);
    }

    #[test]
    fn test_stale_handle_sentinels() {
        let (server, font) = server_with_font();
        server.free_font(font);

        assert_eq!(server.font_name(font), "");
        assert_eq!(server.font_ascent(font, 16), 0.0);
        assert_eq!(server.font_glyph_advance(font, 16, 36), Vec2::ZERO);
        assert_eq!(server.font_texture_image(font, 16, 0), None);
        assert!(server.font_size_cache_list(font).is_empty());
        assert!(!server.font_set_face_index(font, 0));
        server.font_set_embolden(font, 1.0);
        assert_eq!(server.font_embolden(font), 0.0);
    }

    #[test]
    fn test_metric_setters_touch_only_their_field() {
        let (server, font) = server_with_font();
        let descent = server.font_descent(font, 16);
        server.font_set_ascent(font, 16, 20.0);
        assert_eq!(server.font_ascent(font, 16), 20.0);
        assert_eq!(server.font_descent(font, 16), descent);
    }

    #[test]
    fn test_language_overrides() {
        let (server, font) = server_with_font();
        server.font_set_language_support_override(font, "ja", false);
        server.font_set_language_support_override(font, "en", true);
        assert!(!server.font_is_language_supported(font, "ja"));
        assert_eq!(server.font_language_support_override(font, "ja"), Some(false));
        assert_eq!(server.font_language_support_overrides(font).len(), 2);

        server.font_remove_language_support_override(font, "ja");
        assert_eq!(server.font_language_support_override(font, "ja"), None);
    }

    #[test]
    fn test_no_supported_features_in_fallback() {
        let (server, font) = server_with_font();
        assert!(server.font_supported_features(font).is_empty());
    }
}
