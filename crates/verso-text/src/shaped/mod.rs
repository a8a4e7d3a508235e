//! Shaped text buffers.
//!
//! A [`ShapedTextBuffer`] collects spans of text and embedded objects and
//! derives a glyph run from them in stages:
//!
//! ```text
//! Empty -> HasSpans -> Shaped -> BreaksComputed -> JustificationComputed
//! ```
//!
//! Every mutator drops the derived data and returns to `HasSpans`. Accessors
//! that need a later stage run the missing stages first, which is why most of
//! them take a [`FontLookup`].

mod breaks;
pub mod glyph;
mod justify;
pub mod lookup;
mod shape;
mod trim;

use std::any::Any;
use std::ops::Range;
use std::sync::Arc;

use indexmap::IndexMap;
use verso_core::geometry::Rect;
use verso_core::math::Vec2;
use verso_core::profiling::profile_function;

use crate::error::{TextError, TextResult};
use crate::handle::{FontId, ShapedTextId};
use crate::texture::{Color, GlyphCanvas};

pub use glyph::{
    Direction, Glyph, GlyphFlags, InlineAlign, JustificationFlags, Orientation, SpacingType,
    TrimFlags,
};
pub use lookup::{FontLookup, FontSet};

/// Caller-chosen key of an embedded object.
pub type ObjectKey = u64;

/// Opaque data attached to a span.
pub type SpanMeta = Arc<dyn Any + Send + Sync>;

/// Object replacement character used as the text of embedded objects.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ShapeState {
    #[default]
    Empty,
    HasSpans,
    Shaped,
    BreaksComputed,
    JustificationComputed,
}

/// A run of text sharing fonts, size, language and features.
#[derive(Clone)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// Fallback chain; the first font that has a character wins.
    pub fonts: Vec<FontId>,
    pub size: u32,
    pub language: String,
    pub features: IndexMap<u32, i32>,
    pub meta: Option<SpanMeta>,
    pub object: Option<ObjectKey>,
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("fonts", &self.fonts)
            .field("size", &self.size)
            .field("language", &self.language)
            .field("features", &self.features)
            .field("meta", &self.meta.is_some())
            .field("object", &self.object)
            .finish()
    }
}

/// An inline object that takes the place of its span's text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddedObject {
    pub pos: usize,
    pub align: InlineAlign,
    /// Layout rectangle relative to the line origin on the baseline.
    pub rect: Rect<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Spacing {
    glyph: f32,
    space: f32,
    top: f32,
    bottom: f32,
}

#[derive(Debug, Clone, Default)]
struct TrimData {
    trim_pos: Option<usize>,
    ellipsis_pos: Option<usize>,
    ellipsis_glyphs: Vec<Glyph>,
    from_start: bool,
}

impl TrimData {
    /// Follows marker insertion. `moved[i]` is the new index of old glyph
    /// `i`, with one extra entry for the end of the run.
    fn remap(&mut self, moved: &[usize]) {
        self.trim_pos = self.trim_pos.and_then(|pos| moved.get(pos).copied());
        self.ellipsis_pos = self.ellipsis_pos.and_then(|pos| moved.get(pos).copied());
    }
}

/// Text spans plus the glyph run derived from them.
#[derive(Debug, Clone)]
pub struct ShapedTextBuffer {
    parent: Option<ShapedTextId>,
    /// Character range of `text` inside the root text.
    start: usize,
    end: usize,
    text: Vec<char>,
    custom_punctuation: String,
    direction: Direction,
    orientation: Orientation,
    spans: Vec<Span>,
    objects: IndexMap<ObjectKey, EmbeddedObject>,
    preserve_invalid: bool,
    preserve_control: bool,
    spacing: Spacing,
    bidi_override: Vec<Range<usize>>,

    para_direction: Direction,
    glyphs: Vec<Glyph>,
    ascent: f32,
    descent: f32,
    width: f32,
    underline_position: f32,
    underline_thickness: f32,
    trim: TrimData,
    /// Edge spaces zeroed by the last fit, with their natural advances.
    trimmed_edges: Vec<(usize, f32)>,
    fit_width_minimum_reached: bool,
    state: ShapeState,
    sorted: bool,
}

impl Default for ShapedTextBuffer {
    fn default() -> Self {
        Self::new(Direction::Auto, Orientation::Horizontal)
    }
}

impl ShapedTextBuffer {
    pub fn new(direction: Direction, orientation: Orientation) -> Self {
        Self {
            parent: None,
            start: 0,
            end: 0,
            text: Vec::new(),
            custom_punctuation: String::new(),
            direction,
            orientation,
            spans: Vec::new(),
            objects: IndexMap::new(),
            preserve_invalid: true,
            preserve_control: false,
            spacing: Spacing::default(),
            bidi_override: Vec::new(),
            para_direction: Direction::Ltr,
            glyphs: Vec::new(),
            ascent: 0.0,
            descent: 0.0,
            width: 0.0,
            underline_position: 0.0,
            underline_thickness: 0.0,
            trim: TrimData::default(),
            trimmed_edges: Vec::new(),
            fit_width_minimum_reached: false,
            state: ShapeState::Empty,
            sorted: false,
        }
    }

    /// Drops derived data. A substring is detached from its parent first.
    fn invalidate(&mut self) {
        if self.parent.take().is_some() {
            tracing::trace!("substring {}..{} detached from its parent", self.start, self.end);
        }
        self.reset_derived();
        self.state = if self.spans.is_empty() {
            ShapeState::Empty
        } else {
            ShapeState::HasSpans
        };
    }

    fn reset_derived(&mut self) {
        self.glyphs.clear();
        self.ascent = 0.0;
        self.descent = 0.0;
        self.width = 0.0;
        self.underline_position = 0.0;
        self.underline_thickness = 0.0;
        self.trim = TrimData::default();
        self.trimmed_edges.clear();
        self.fit_width_minimum_reached = false;
        self.sorted = false;
    }

    /// Drops a trim whose cut no longer matches the glyph advances.
    fn drop_trim(&mut self) {
        if self.trim.trim_pos.take().is_some() {
            tracing::trace!("line re-measured, trim dropped");
        }
        self.trim = TrimData::default();
    }

    /// Gives edge spaces zeroed by a fit their natural advance back.
    fn restore_edge_spaces(&mut self) {
        for (idx, advance) in std::mem::take(&mut self.trimmed_edges) {
            if let Some(glyph) = self.glyphs.get_mut(idx) {
                glyph.advance = advance;
            }
        }
    }

    /// Removes all text, objects and derived data.
    pub fn clear(&mut self) {
        self.parent = None;
        self.text.clear();
        self.spans.clear();
        self.objects.clear();
        self.end = self.start;
        self.invalidate();
    }

    pub fn state(&self) -> ShapeState {
        self.state
    }

    /// True once the glyph run is available.
    pub fn is_ready(&self) -> bool {
        self.state >= ShapeState::Shaped
    }

    pub fn parent(&self) -> Option<ShapedTextId> {
        self.parent
    }

    /// Character range of this buffer in the root text.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub(crate) fn char_at(&self, pos: usize) -> char {
        pos.checked_sub(self.start)
            .and_then(|idx| self.text.get(idx))
            .copied()
            .unwrap_or(OBJECT_REPLACEMENT)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        if self.direction != direction {
            self.direction = direction;
            self.invalidate();
        }
    }

    /// Paragraph direction: the requested one, or the first strong character for `Auto`.
    pub fn inferred_direction(&self) -> Direction {
        match self.direction {
            Direction::Auto => shape::strong_direction(&self.text).unwrap_or(Direction::Ltr),
            direction => direction,
        }
    }

    pub fn bidi_override(&self) -> &[Range<usize>] {
        &self.bidi_override
    }

    /// Character ranges whose direction is resolved on their own.
    pub fn set_bidi_override(&mut self, ranges: Vec<Range<usize>>) {
        self.bidi_override = ranges;
        self.invalidate();
    }

    pub fn custom_punctuation(&self) -> &str {
        &self.custom_punctuation
    }

    /// Characters treated as punctuation instead of the built-in set. Empty restores it.
    pub fn set_custom_punctuation(&mut self, punctuation: impl Into<String>) {
        let punctuation = punctuation.into();
        if self.custom_punctuation != punctuation {
            self.custom_punctuation = punctuation;
            self.invalidate();
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        if self.orientation != orientation {
            self.orientation = orientation;
            self.invalidate();
        }
    }

    pub fn preserve_invalid(&self) -> bool {
        self.preserve_invalid
    }

    /// Reserve a hex-code box for characters no font provides.
    pub fn set_preserve_invalid(&mut self, enabled: bool) {
        if self.preserve_invalid != enabled {
            self.preserve_invalid = enabled;
            self.invalidate();
        }
    }

    pub fn preserve_control(&self) -> bool {
        self.preserve_control
    }

    pub fn set_preserve_control(&mut self, enabled: bool) {
        if self.preserve_control != enabled {
            self.preserve_control = enabled;
            self.invalidate();
        }
    }

    pub fn spacing(&self, kind: SpacingType) -> f32 {
        match kind {
            SpacingType::Glyph => self.spacing.glyph,
            SpacingType::Space => self.spacing.space,
            SpacingType::Top => self.spacing.top,
            SpacingType::Bottom => self.spacing.bottom,
        }
    }

    pub fn set_spacing(&mut self, kind: SpacingType, value: f32) {
        let slot = match kind {
            SpacingType::Glyph => &mut self.spacing.glyph,
            SpacingType::Space => &mut self.spacing.space,
            SpacingType::Top => &mut self.spacing.top,
            SpacingType::Bottom => &mut self.spacing.bottom,
        };
        if *slot != value {
            *slot = value;
            self.invalidate();
        }
    }

    /// Appends `text` as a new span. Returns false for empty text.
    pub fn add_string(
        &mut self,
        text: &str,
        fonts: &[FontId],
        size: u32,
        features: IndexMap<u32, i32>,
        language: &str,
        meta: Option<SpanMeta>,
    ) -> bool {
        if text.is_empty() {
            return false;
        }
        let start = self.end;
        self.text.extend(text.chars());
        self.end = self.start + self.text.len();
        self.spans.push(Span {
            start,
            end: self.end,
            fonts: fonts.to_vec(),
            size: size.max(1),
            language: language.to_string(),
            features,
            meta,
            object: None,
        });
        self.invalidate();
        true
    }

    /// Appends an inline object covering `length` characters.
    pub fn add_object(
        &mut self,
        key: ObjectKey,
        size: Vec2,
        align: InlineAlign,
        length: usize,
    ) -> TextResult<()> {
        if self.objects.contains_key(&key) {
            return Err(TextError::DuplicateObject);
        }
        let start = self.end;
        let length = length.max(1);
        self.text.extend(std::iter::repeat_n(OBJECT_REPLACEMENT, length));
        self.end = self.start + self.text.len();
        self.spans.push(Span {
            start,
            end: self.end,
            fonts: Vec::new(),
            size: 0,
            language: String::new(),
            features: IndexMap::new(),
            meta: None,
            object: Some(key),
        });
        self.objects.insert(
            key,
            EmbeddedObject {
                pos: start,
                align,
                rect: Rect::new(0.0, 0.0, size.x.max(0.0), size.y.max(0.0)),
            },
        );
        self.invalidate();
        Ok(())
    }

    pub fn resize_object(&mut self, key: ObjectKey, size: Vec2, align: InlineAlign) -> bool {
        let Some(object) = self.objects.get_mut(&key) else {
            return false;
        };
        object.rect.width = size.x.max(0.0);
        object.rect.height = size.y.max(0.0);
        object.align = align;
        self.invalidate();
        true
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    pub fn span(&self, index: usize) -> Option<&Span> {
        self.spans.get(index)
    }

    pub fn span_meta(&self, index: usize) -> Option<SpanMeta> {
        self.spans.get(index).and_then(|span| span.meta.clone())
    }

    /// Replaces the fonts, size and features of span `index`.
    pub fn update_span_font(
        &mut self,
        index: usize,
        fonts: &[FontId],
        size: u32,
        features: IndexMap<u32, i32>,
    ) -> bool {
        let Some(span) = self.spans.get_mut(index) else {
            return false;
        };
        if span.object.is_some() {
            return false;
        }
        span.fonts = fonts.to_vec();
        span.size = size.max(1);
        span.features = features;
        self.invalidate();
        true
    }

    /// Every font referenced by a span, in first-use order.
    pub fn referenced_fonts(&self) -> Vec<FontId> {
        let mut fonts: Vec<FontId> = Vec::new();
        for font in self.spans.iter().flat_map(|span| span.fonts.iter()) {
            if !fonts.contains(font) {
                fonts.push(*font);
            }
        }
        fonts
    }

    pub fn objects(&self) -> Vec<ObjectKey> {
        self.objects.keys().copied().collect()
    }

    /// Object rectangle, positioned after shaping.
    pub fn object_rect(&mut self, fonts: &dyn FontLookup, key: ObjectKey) -> Option<Rect<f32>> {
        self.shape(fonts);
        self.objects.get(&key).map(|object| object.rect)
    }

    /// Character range covered by object `key`.
    pub fn object_range(&self, key: ObjectKey) -> Option<Range<usize>> {
        self.spans
            .iter()
            .find(|span| span.object == Some(key))
            .map(|span| span.start..span.end)
    }

    /// Glyph run in logical order.
    pub fn glyphs(&mut self, fonts: &dyn FontLookup) -> &[Glyph] {
        self.shape(fonts);
        &self.glyphs
    }

    pub fn glyph_count(&mut self, fonts: &dyn FontLookup) -> usize {
        self.glyphs(fonts).len()
    }

    /// Glyphs sorted by source position. Logical and visual order coincide here.
    pub fn sort_logical(&mut self, fonts: &dyn FontLookup) -> &[Glyph] {
        if self.shape(fonts) && !self.sorted {
            debug_assert!(self.glyphs.windows(2).all(|pair| pair[0].start <= pair[1].start));
            self.sorted = true;
        }
        &self.glyphs
    }

    /// Line size: `(width, ascent + descent)`, swapped for vertical text.
    pub fn size(&mut self, fonts: &dyn FontLookup) -> Vec2 {
        self.shape(fonts);
        let line = self.ascent + self.descent;
        match self.orientation {
            Orientation::Horizontal => Vec2::new(self.width, line),
            Orientation::Vertical => Vec2::new(line, self.width),
        }
    }

    pub fn ascent(&mut self, fonts: &dyn FontLookup) -> f32 {
        self.shape(fonts);
        self.ascent
    }

    pub fn descent(&mut self, fonts: &dyn FontLookup) -> f32 {
        self.shape(fonts);
        self.descent
    }

    pub fn width(&mut self, fonts: &dyn FontLookup) -> f32 {
        self.shape(fonts);
        self.width
    }

    pub fn underline_position(&mut self, fonts: &dyn FontLookup) -> f32 {
        self.shape(fonts);
        self.underline_position
    }

    pub fn underline_thickness(&mut self, fonts: &dyn FontLookup) -> f32 {
        self.shape(fonts);
        self.underline_thickness
    }

    /// True when the last `fit_to_width` could not reach its target.
    pub fn fit_width_minimum_reached(&self) -> bool {
        self.fit_width_minimum_reached
    }

    fn run_width(glyphs: &[Glyph]) -> f32 {
        glyphs.iter().map(Glyph::total_advance).sum()
    }

    /// New buffer covering characters `start..end` of this one.
    ///
    /// The glyph subrange and embedded objects are copied and local metrics
    /// recomputed. The parent of a substring of a substring is the root.
    pub fn substr(
        &mut self,
        fonts: &dyn FontLookup,
        self_id: ShapedTextId,
        start: usize,
        end: usize,
    ) -> TextResult<ShapedTextBuffer> {
        profile_function!();
        if start > end {
            return Err(TextError::InvalidRange {
                start,
                end,
                text_len: self.end,
            });
        }
        self.shape(fonts);
        let start = start.clamp(self.start, self.end);
        let end = end.clamp(start, self.end);

        let mut sub = ShapedTextBuffer::new(self.direction, self.orientation);
        sub.parent = Some(self.parent.unwrap_or(self_id));
        sub.start = start;
        sub.end = end;
        sub.text = self.text[start - self.start..end - self.start].to_vec();
        sub.custom_punctuation = self.custom_punctuation.clone();
        sub.preserve_invalid = self.preserve_invalid;
        sub.preserve_control = self.preserve_control;
        sub.spacing = self.spacing;
        sub.para_direction = self.para_direction;
        sub.bidi_override = self
            .bidi_override
            .iter()
            .filter(|range| range.start < end && range.end > start)
            .map(|range| range.start.max(start)..range.end.min(end))
            .collect();

        for span in &self.spans {
            if span.start >= end || span.end <= start {
                continue;
            }
            if let Some(key) = span.object {
                if span.start < start || span.end > end {
                    continue;
                }
                if let Some(object) = self.objects.get(&key) {
                    sub.objects.insert(key, *object);
                }
                sub.spans.push(span.clone());
            } else {
                let mut span = span.clone();
                span.start = span.start.max(start);
                span.end = span.end.min(end);
                sub.spans.push(span);
            }
        }

        sub.glyphs = self
            .glyphs
            .iter()
            .filter(|glyph| {
                if glyph.is_virtual() {
                    glyph.start > start && glyph.start < end
                } else {
                    glyph.start >= start && glyph.end <= end
                }
            })
            .copied()
            .collect();

        if sub.spans.is_empty() {
            sub.state = ShapeState::Empty;
            return Ok(sub);
        }
        sub.state = self.state.max(ShapeState::Shaped);
        sub.update_line_metrics(fonts);
        sub.realign();
        sub.width = Self::run_width(&sub.glyphs);
        Ok(sub)
    }

    /// Draws the visible run with its origin on the baseline at `pos`.
    ///
    /// `clip` limits drawing to glyphs overlapping `left..right`, measured
    /// along the line from `pos`.
    pub fn draw(
        &mut self,
        fonts: &dyn FontLookup,
        canvas: &dyn GlyphCanvas,
        pos: Vec2,
        clip: Option<(f32, f32)>,
        color: Color,
    ) {
        profile_function!();
        let glyphs = self.visible_glyphs(fonts);
        let vertical = self.orientation == Orientation::Vertical;
        let mut offset = 0.0f32;

        for glyph in &glyphs {
            for _ in 0..glyph.repeat {
                let visible = clip.is_none_or(|(left, right)| {
                    offset + glyph.advance >= left && offset <= right
                });
                if visible && !glyph.flags.contains(GlyphFlags::EMBEDDED_OBJECT) {
                    let along = if vertical {
                        Vec2::new(0.0, offset)
                    } else {
                        Vec2::new(offset, 0.0)
                    };
                    let at = pos + along + Vec2::new(glyph.x_offset, glyph.y_offset);
                    if let Some(font) = glyph.font {
                        fonts.draw_glyph(font, canvas, glyph.font_size, at, glyph.index, color);
                    } else if !glyph.flags.contains(GlyphFlags::VALID)
                        && !glyph.is_virtual()
                        && self.preserve_invalid
                    {
                        canvas.draw_hex_code_box(glyph.font_size, at, glyph.index, color);
                    }
                }
                offset += glyph.advance;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use verso_core::alloc::sparse_set::IndexSlot;

    use super::FontSet;
    use crate::font::FontObject;
    use crate::handle::FontId;

    /// Font set holding one font per data blob, with ids 0, 1, ...
    pub fn font_set(blobs: Vec<Vec<u8>>) -> (FontSet, Vec<FontId>) {
        let mut set = FontSet::new();
        let mut ids = Vec::new();
        for (idx, data) in blobs.into_iter().enumerate() {
            let mut font = FontObject::default();
            font.set_data(data).unwrap();
            let id = FontId::from_slot(IndexSlot::new(0, idx as u32));
            set.insert(id, Arc::new(Mutex::new(font)));
            ids.push(id);
        }
        (set, ids)
    }
}
