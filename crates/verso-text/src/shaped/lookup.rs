//! Font access used while shaping and drawing.

use std::sync::Arc;

use parking_lot::Mutex;
use verso_core::alloc::HashMap;
use verso_core::math::Vec2;

use crate::font::{FontObject, SizeMetrics};
use crate::handle::FontId;
use crate::texture::{Color, GlyphCanvas};

/// What a shaped buffer needs to know about the fonts its spans reference.
pub trait FontLookup {
    fn has_char(&self, font: FontId, ch: char) -> bool;

    /// Explicit language support override of `font`, if any.
    fn language_support_override(&self, font: FontId, language: &str) -> Option<bool>;

    /// `None` when `font` is unknown or unusable.
    fn glyph_advance(&self, font: FontId, size: u32, glyph: u32) -> Option<Vec2>;

    fn kerning(&self, font: FontId, size: u32, pair: (u32, u32)) -> Vec2;

    fn metrics(&self, font: FontId, size: u32) -> Option<SizeMetrics>;

    fn draw_glyph(
        &self,
        font: FontId,
        canvas: &dyn GlyphCanvas,
        size: u32,
        pos: Vec2,
        glyph: u32,
        color: Color,
    );
}

/// Fonts resolved from the registry for one buffer operation.
///
/// Holding the objects directly lets the registry lock be released before
/// any font is locked.
#[derive(Debug, Default, Clone)]
pub struct FontSet {
    fonts: HashMap<FontId, Arc<Mutex<FontObject>>>,
}

impl FontSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FontId, font: Arc<Mutex<FontObject>>) {
        self.fonts.insert(id, font);
    }

    pub fn get(&self, id: FontId) -> Option<&Arc<Mutex<FontObject>>> {
        self.fonts.get(&id)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl FromIterator<(FontId, Arc<Mutex<FontObject>>)> for FontSet {
    fn from_iter<I: IntoIterator<Item = (FontId, Arc<Mutex<FontObject>>)>>(iter: I) -> Self {
        Self {
            fonts: iter.into_iter().collect(),
        }
    }
}

impl FontLookup for FontSet {
    fn has_char(&self, font: FontId, ch: char) -> bool {
        self.get(font).is_some_and(|font| font.lock().has_char(ch))
    }

    fn language_support_override(&self, font: FontId, language: &str) -> Option<bool> {
        self.get(font)?.lock().language_support_override(language)
    }

    fn glyph_advance(&self, font: FontId, size: u32, glyph: u32) -> Option<Vec2> {
        let mut font = self.get(font)?.lock();
        if !font.is_valid() {
            return None;
        }
        Some(font.glyph_advance(size, glyph))
    }

    fn kerning(&self, font: FontId, size: u32, pair: (u32, u32)) -> Vec2 {
        self.get(font)
            .map_or(Vec2::ZERO, |font| font.lock().kerning(size, pair))
    }

    fn metrics(&self, font: FontId, size: u32) -> Option<SizeMetrics> {
        let mut font = self.get(font)?.lock();
        font.is_valid().then(|| font.metrics(size))
    }

    fn draw_glyph(
        &self,
        font: FontId,
        canvas: &dyn GlyphCanvas,
        size: u32,
        pos: Vec2,
        glyph: u32,
        color: Color,
    ) {
        if let Some(font) = self.get(font) {
            font.lock().draw_glyph(canvas, size, pos, glyph, color);
        }
    }
}
