//! Handle-based shaped text operations.
//!
//! The buffer is locked first and the fonts its spans reference are locked
//! on demand while it is held.

use std::ops::Range;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use verso_core::geometry::Rect;
use verso_core::math::Vec2;

use super::FallbackTextServer;
use crate::handle::{FontId, ShapedTextId};
use crate::shaped::{
    Direction, Glyph, InlineAlign, JustificationFlags, ObjectKey, Orientation, ShapeState,
    SpacingType, SpanMeta, TrimFlags,
};
use crate::texture::{Color, GlyphCanvas};

impl FallbackTextServer {
    pub fn shaped_text_clear(&self, shaped: ShapedTextId) {
        self.with_shaped(shaped, |buffer, _| buffer.clear());
    }

    pub fn shaped_text_direction(&self, shaped: ShapedTextId) -> Direction {
        self.with_shaped(shaped, |buffer, _| buffer.direction())
            .unwrap_or_default()
    }

    pub fn shaped_text_set_direction(&self, shaped: ShapedTextId, direction: Direction) {
        self.with_shaped(shaped, |buffer, _| buffer.set_direction(direction));
    }

    /// Direction of the first strong character when the buffer is `Auto`.
    pub fn shaped_text_inferred_direction(&self, shaped: ShapedTextId) -> Direction {
        self.with_shaped(shaped, |buffer, _| buffer.inferred_direction())
            .unwrap_or(Direction::Ltr)
    }

    pub fn shaped_text_set_bidi_override(&self, shaped: ShapedTextId, ranges: Vec<Range<usize>>) {
        self.with_shaped(shaped, |buffer, _| buffer.set_bidi_override(ranges));
    }

    pub fn shaped_text_custom_punctuation(&self, shaped: ShapedTextId) -> String {
        self.with_shaped(shaped, |buffer, _| buffer.custom_punctuation().to_string())
            .unwrap_or_default()
    }

    pub fn shaped_text_set_custom_punctuation(&self, shaped: ShapedTextId, punctuation: &str) {
        self.with_shaped(shaped, |buffer, _| buffer.set_custom_punctuation(punctuation));
    }

    pub fn shaped_text_orientation(&self, shaped: ShapedTextId) -> Orientation {
        self.with_shaped(shaped, |buffer, _| buffer.orientation())
            .unwrap_or_default()
    }

    pub fn shaped_text_set_orientation(&self, shaped: ShapedTextId, orientation: Orientation) {
        self.with_shaped(shaped, |buffer, _| buffer.set_orientation(orientation));
    }

    pub fn shaped_text_preserve_invalid(&self, shaped: ShapedTextId) -> bool {
        self.with_shaped(shaped, |buffer, _| buffer.preserve_invalid())
            .unwrap_or(false)
    }

    pub fn shaped_text_set_preserve_invalid(&self, shaped: ShapedTextId, enabled: bool) {
        self.with_shaped(shaped, |buffer, _| buffer.set_preserve_invalid(enabled));
    }

    pub fn shaped_text_preserve_control(&self, shaped: ShapedTextId) -> bool {
        self.with_shaped(shaped, |buffer, _| buffer.preserve_control())
            .unwrap_or(false)
    }

    pub fn shaped_text_set_preserve_control(&self, shaped: ShapedTextId, enabled: bool) {
        self.with_shaped(shaped, |buffer, _| buffer.set_preserve_control(enabled));
    }

    pub fn shaped_text_spacing(&self, shaped: ShapedTextId, kind: SpacingType) -> f32 {
        self.with_shaped(shaped, |buffer, _| buffer.spacing(kind))
            .unwrap_or(0.0)
    }

    pub fn shaped_text_set_spacing(&self, shaped: ShapedTextId, kind: SpacingType, value: f32) {
        self.with_shaped(shaped, |buffer, _| buffer.set_spacing(kind, value));
    }

    /// Appends a span. An empty `language` means the configured default.
    #[allow(clippy::too_many_arguments)]
    pub fn shaped_text_add_string(
        &self,
        shaped: ShapedTextId,
        text: &str,
        fonts: &[FontId],
        size: u32,
        features: IndexMap<u32, i32>,
        language: &str,
        meta: Option<SpanMeta>,
    ) -> bool {
        let language = if language.is_empty() {
            self.config.default_language.as_str()
        } else {
            language
        };
        self.with_shaped(shaped, |buffer, _| {
            buffer.add_string(text, fonts, size, features, language, meta)
        })
        .unwrap_or(false)
    }

    pub fn shaped_text_add_object(
        &self,
        shaped: ShapedTextId,
        key: ObjectKey,
        size: Vec2,
        align: InlineAlign,
        length: usize,
    ) -> bool {
        self.with_shaped(shaped, |buffer, _| match buffer.add_object(key, size, align, length) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Cannot add object {}: {}", key, err);
                false
            }
        })
        .unwrap_or(false)
    }

    pub fn shaped_text_resize_object(
        &self,
        shaped: ShapedTextId,
        key: ObjectKey,
        size: Vec2,
        align: InlineAlign,
    ) -> bool {
        self.with_shaped(shaped, |buffer, _| buffer.resize_object(key, size, align))
            .unwrap_or(false)
    }

    pub fn shaped_text_span_count(&self, shaped: ShapedTextId) -> usize {
        self.with_shaped(shaped, |buffer, _| buffer.span_count())
            .unwrap_or(0)
    }

    pub fn shaped_text_span_meta(&self, shaped: ShapedTextId, index: usize) -> Option<SpanMeta> {
        self.with_shaped(shaped, |buffer, _| buffer.span_meta(index))
            .flatten()
    }

    pub fn shaped_text_update_span_font(
        &self,
        shaped: ShapedTextId,
        index: usize,
        fonts: &[FontId],
        size: u32,
        features: IndexMap<u32, i32>,
    ) -> bool {
        self.with_shaped(shaped, |buffer, _| {
            buffer.update_span_font(index, fonts, size, features)
        })
        .unwrap_or(false)
    }

    /// Registers a new buffer covering `start..end` of `shaped`.
    pub fn shaped_text_substr(
        &self,
        shaped: ShapedTextId,
        start: usize,
        end: usize,
    ) -> Option<ShapedTextId> {
        let sub = self
            .with_shaped(shaped, |buffer, fonts| buffer.substr(fonts, shaped, start, end))?;
        match sub {
            Ok(sub) => {
                let slot = self.shaped.write().push(Arc::new(Mutex::new(sub)));
                Some(ShapedTextId::from_slot(slot))
            }
            Err(err) => {
                tracing::warn!("Invalid substring: {}", err);
                None
            }
        }
    }

    pub fn shaped_text_parent(&self, shaped: ShapedTextId) -> Option<ShapedTextId> {
        self.with_shaped(shaped, |buffer, _| buffer.parent()).flatten()
    }

    pub fn shaped_text_fit_to_width(
        &self,
        shaped: ShapedTextId,
        width: f32,
        flags: JustificationFlags,
    ) -> f32 {
        self.with_shaped(shaped, |buffer, fonts| buffer.fit_to_width(fonts, width, flags))
            .unwrap_or(0.0)
    }

    pub fn shaped_text_fit_width_minimum_reached(&self, shaped: ShapedTextId) -> bool {
        self.with_shaped(shaped, |buffer, _| buffer.fit_width_minimum_reached())
            .unwrap_or(false)
    }

    pub fn shaped_text_tab_align(&self, shaped: ShapedTextId, tab_stops: &[f32]) -> f32 {
        self.with_shaped(shaped, |buffer, fonts| buffer.tab_align(fonts, tab_stops))
            .unwrap_or(0.0)
    }

    pub fn shaped_text_shape(&self, shaped: ShapedTextId) -> bool {
        self.with_shaped(shaped, |buffer, fonts| buffer.shape(fonts))
            .unwrap_or(false)
    }

    pub fn shaped_text_update_breaks(&self, shaped: ShapedTextId) -> bool {
        self.with_shaped(shaped, |buffer, fonts| buffer.update_breaks(fonts))
            .unwrap_or(false)
    }

    pub fn shaped_text_update_justification_ops(&self, shaped: ShapedTextId) -> bool {
        self.with_shaped(shaped, |buffer, fonts| buffer.update_justification_ops(fonts))
            .unwrap_or(false)
    }

    pub fn shaped_text_trim_pos(&self, shaped: ShapedTextId) -> Option<usize> {
        self.with_shaped(shaped, |buffer, _| buffer.trim_pos()).flatten()
    }

    pub fn shaped_text_ellipsis_pos(&self, shaped: ShapedTextId) -> Option<usize> {
        self.with_shaped(shaped, |buffer, _| buffer.ellipsis_pos())
            .flatten()
    }

    pub fn shaped_text_ellipsis_glyphs(&self, shaped: ShapedTextId) -> Vec<Glyph> {
        self.with_shaped(shaped, |buffer, _| buffer.ellipsis_glyphs().to_vec())
            .unwrap_or_default()
    }

    pub fn shaped_text_overrun_trim_to_width(
        &self,
        shaped: ShapedTextId,
        width: f32,
        flags: TrimFlags,
    ) {
        self.with_shaped(shaped, |buffer, fonts| {
            buffer.overrun_trim_to_width(fonts, width, flags)
        });
    }

    pub fn shaped_text_is_ready(&self, shaped: ShapedTextId) -> bool {
        self.with_shaped(shaped, |buffer, _| buffer.is_ready())
            .unwrap_or(false)
    }

    pub fn shaped_text_state(&self, shaped: ShapedTextId) -> ShapeState {
        self.with_shaped(shaped, |buffer, _| buffer.state())
            .unwrap_or(ShapeState::Empty)
    }

    pub fn shaped_text_glyphs(&self, shaped: ShapedTextId) -> Vec<Glyph> {
        self.with_shaped(shaped, |buffer, fonts| buffer.glyphs(fonts).to_vec())
            .unwrap_or_default()
    }

    /// Glyphs left after trimming, with the ellipsis in place.
    pub fn shaped_text_visible_glyphs(&self, shaped: ShapedTextId) -> Vec<Glyph> {
        self.with_shaped(shaped, |buffer, fonts| buffer.visible_glyphs(fonts))
            .unwrap_or_default()
    }

    pub fn shaped_text_sort_logical(&self, shaped: ShapedTextId) -> Vec<Glyph> {
        self.with_shaped(shaped, |buffer, fonts| buffer.sort_logical(fonts).to_vec())
            .unwrap_or_default()
    }

    pub fn shaped_text_glyph_count(&self, shaped: ShapedTextId) -> usize {
        self.with_shaped(shaped, |buffer, fonts| buffer.glyph_count(fonts))
            .unwrap_or(0)
    }

    pub fn shaped_text_range(&self, shaped: ShapedTextId) -> Range<usize> {
        self.with_shaped(shaped, |buffer, _| buffer.range())
            .unwrap_or(0..0)
    }

    pub fn shaped_text_objects(&self, shaped: ShapedTextId) -> Vec<ObjectKey> {
        self.with_shaped(shaped, |buffer, _| buffer.objects())
            .unwrap_or_default()
    }

    pub fn shaped_text_object_rect(&self, shaped: ShapedTextId, key: ObjectKey) -> Option<Rect<f32>> {
        self.with_shaped(shaped, |buffer, fonts| buffer.object_rect(fonts, key))
            .flatten()
    }

    pub fn shaped_text_object_range(&self, shaped: ShapedTextId, key: ObjectKey) -> Option<Range<usize>> {
        self.with_shaped(shaped, |buffer, _| buffer.object_range(key))
            .flatten()
    }

    pub fn shaped_text_size(&self, shaped: ShapedTextId) -> Vec2 {
        self.with_shaped(shaped, |buffer, fonts| buffer.size(fonts))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn shaped_text_ascent(&self, shaped: ShapedTextId) -> f32 {
        self.with_shaped(shaped, |buffer, fonts| buffer.ascent(fonts))
            .unwrap_or(0.0)
    }

    pub fn shaped_text_descent(&self, shaped: ShapedTextId) -> f32 {
        self.with_shaped(shaped, |buffer, fonts| buffer.descent(fonts))
            .unwrap_or(0.0)
    }

    pub fn shaped_text_width(&self, shaped: ShapedTextId) -> f32 {
        self.with_shaped(shaped, |buffer, fonts| buffer.width(fonts))
            .unwrap_or(0.0)
    }

    pub fn shaped_text_trimmed_width(&self, shaped: ShapedTextId) -> f32 {
        self.with_shaped(shaped, |buffer, fonts| buffer.trimmed_width(fonts))
            .unwrap_or(0.0)
    }

    pub fn shaped_text_underline_position(&self, shaped: ShapedTextId) -> f32 {
        self.with_shaped(shaped, |buffer, fonts| buffer.underline_position(fonts))
            .unwrap_or(0.0)
    }

    pub fn shaped_text_underline_thickness(&self, shaped: ShapedTextId) -> f32 {
        self.with_shaped(shaped, |buffer, fonts| buffer.underline_thickness(fonts))
            .unwrap_or(0.0)
    }

    /// Draws the buffer with its origin on the baseline at `pos`.
    pub fn shaped_text_draw(
        &self,
        shaped: ShapedTextId,
        canvas: &dyn GlyphCanvas,
        pos: Vec2,
        clip: Option<(f32, f32)>,
        color: Color,
    ) {
        self.with_shaped(shaped, |buffer, fonts| {
            buffer.draw(fonts, canvas, pos, clip, color)
        });
    }
}

#[cfg(test)]
mod tests {
    use verso_test_utils::latin_font;

    use super::*;
    use crate::config::TextServerConfig;

    fn setup(text: &str) -> (FallbackTextServer, ShapedTextId) {
        let server = FallbackTextServer::new(
            TextServerConfig::default()
                .with_worker_threads(1)
                .with_default_language("fr"),
        );
        let font = server.create_font();
        server.font_set_data(font, latin_font());
        let shaped = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
        assert!(server.shaped_text_add_string(shaped, text, &[font], 16, IndexMap::new(), "", None));
        (server, shaped)
    }

    #[test]
    fn test_empty_language_uses_default() {
        let (server, shaped) = setup("abc");
        let language = server
            .with_shaped(shaped, |buffer, _| buffer.span(0).map(|span| span.language.clone()))
            .flatten();
        assert_eq!(language.as_deref(), Some("fr"));
    }

    #[test]
    fn test_substr_registers_child() {
        let (server, shaped) = setup("hello world");
        let sub = server.shaped_text_substr(shaped, 6, 11).unwrap();
        assert_eq!(server.shaped_text_parent(sub), Some(shaped));
        assert_eq!(server.shaped_text_range(sub), 6..11);
        assert_eq!(server.shaped_text_glyph_count(sub), 5);
        assert!((server.shaped_text_width(sub) - 40.0).abs() < 1e-3);

        assert_eq!(server.shaped_text_substr(shaped, 8, 2), None);
    }

    #[test]
    fn test_stale_buffer_sentinels() {
        let (server, shaped) = setup("abc");
        assert!(server.free_shaped_text(shaped));
        assert!(!server.shaped_text_shape(shaped));
        assert_eq!(server.shaped_text_width(shaped), 0.0);
        assert!(server.shaped_text_glyphs(shaped).is_empty());
        assert_eq!(server.shaped_text_range(shaped), 0..0);
        assert_eq!(server.shaped_text_substr(shaped, 0, 1), None);
        assert!(!server.shaped_text_add_string(shaped, "x", &[], 16, IndexMap::new(), "en", None));
    }

    #[test]
    fn test_duplicate_object_rejected() {
        let (server, shaped) = setup("a");
        let size = Vec2::new(10.0, 10.0);
        assert!(server.shaped_text_add_object(shaped, 7, size, InlineAlign::Center, 1));
        assert!(!server.shaped_text_add_object(shaped, 7, size, InlineAlign::Center, 1));
        assert_eq!(server.shaped_text_objects(shaped), vec![7]);
    }
}
