use verso_core::math::Vec2;
use verso_core::profiling::profile_function;

use super::glyph::{Direction, Glyph, GlyphFlags, InlineAlign, Orientation};
use super::lookup::FontLookup;
use super::{ShapeState, ShapedTextBuffer, Span};
use crate::handle::FontId;
use crate::texture::hex_code_box_size;

/// Hebrew, Arabic and the other right-to-left blocks.
pub(crate) fn is_rtl_char(ch: char) -> bool {
    matches!(
        ch as u32,
        0x0590..=0x08FF | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFF | 0x10800..=0x10FFF | 0x1E800..=0x1EFFF
    )
}

/// Direction of the first strong character.
pub(crate) fn strong_direction(text: &[char]) -> Option<Direction> {
    text.iter().find_map(|&ch| {
        if is_rtl_char(ch) {
            Some(Direction::Rtl)
        } else if ch.is_alphabetic() {
            Some(Direction::Ltr)
        } else {
            None
        }
    })
}

impl ShapedTextBuffer {
    /// Builds the glyph run from the spans. Returns false for an empty buffer.
    pub fn shape(&mut self, fonts: &dyn FontLookup) -> bool {
        if self.state >= ShapeState::Shaped {
            return true;
        }
        if self.spans.is_empty() {
            return false;
        }
        profile_function!();
        self.reset_derived();
        self.para_direction = self.inferred_direction();

        let spans = self.spans.clone();
        for span in &spans {
            if let Some(key) = span.object {
                let Some(object) = self.objects.get(&key) else {
                    continue;
                };
                let advance = match self.orientation {
                    Orientation::Horizontal => object.rect.width,
                    Orientation::Vertical => object.rect.height,
                };
                self.glyphs.push(Glyph {
                    start: span.start,
                    end: span.end,
                    flags: GlyphFlags::VALID | GlyphFlags::EMBEDDED_OBJECT,
                    advance,
                    font_size: span.size,
                    ..Glyph::default()
                });
                continue;
            }

            for pos in span.start..span.end {
                let glyph = self.shape_char(fonts, span, pos);
                if let Some(prev) = self.glyphs.last_mut()
                    && let Some(font) = glyph.font
                    && prev.font == Some(font)
                    && prev.font_size == glyph.font_size
                {
                    let kerning = fonts.kerning(font, glyph.font_size, (prev.index, glyph.index));
                    prev.advance += match self.orientation {
                        Orientation::Horizontal => kerning.x,
                        Orientation::Vertical => kerning.y,
                    };
                }
                self.glyphs.push(glyph);
            }
        }

        if let Some((_, body)) = self.glyphs.split_last_mut() {
            for glyph in body.iter_mut().filter(|glyph| !glyph.is_virtual()) {
                glyph.advance += self.spacing.glyph;
                if glyph.flags.contains(GlyphFlags::SPACE) {
                    glyph.advance += self.spacing.space;
                }
            }
        }

        let para_rtl = self.para_direction == Direction::Rtl;
        let overrides: Vec<_> = self
            .bidi_override
            .iter()
            .map(|range| {
                let chars: Vec<char> = range.clone().map(|pos| self.char_at(pos)).collect();
                let rtl = strong_direction(&chars).map_or(para_rtl, |dir| dir == Direction::Rtl);
                (range.clone(), rtl)
            })
            .collect();
        for glyph in &mut self.glyphs {
            let rtl = overrides
                .iter()
                .find(|(range, _)| range.contains(&glyph.start))
                .map_or(para_rtl, |(_, rtl)| *rtl);
            glyph.flags.set(GlyphFlags::RTL, rtl);
        }

        self.update_line_metrics(fonts);
        self.realign();
        self.width = Self::run_width(&self.glyphs);
        self.state = ShapeState::Shaped;
        tracing::trace!(
            "shaped {} glyphs, width {:.2}, direction {:?}",
            self.glyphs.len(),
            self.width,
            self.para_direction
        );
        true
    }

    fn shape_char(&self, fonts: &dyn FontLookup, span: &Span, pos: usize) -> Glyph {
        let ch = self.char_at(pos);
        let mut glyph = Glyph {
            start: pos,
            end: pos + 1,
            font_size: span.size,
            index: ch as u32,
            ..Glyph::default()
        };

        let lookup = match ch {
            '\t' => {
                glyph.flags |= GlyphFlags::TAB | GlyphFlags::SPACE;
                ' '
            }
            '\u{0B}' => ' ',
            _ if ch.is_control() && !self.preserve_control => {
                glyph.flags |= GlyphFlags::VALID;
                return glyph;
            }
            _ => ch,
        };
        if lookup == ' ' || ch.is_whitespace() {
            glyph.flags |= GlyphFlags::SPACE;
        }

        let resolved = span
            .fonts
            .iter()
            .copied()
            .filter(|&font| fonts.language_support_override(font, &span.language) != Some(false))
            .find(|&font| fonts.has_char(font, lookup))
            .and_then(|font| {
                fonts
                    .glyph_advance(font, span.size, lookup as u32)
                    .map(|advance| (font, advance))
            });

        match resolved {
            Some((font, advance)) => {
                glyph.font = Some(font);
                glyph.index = lookup as u32;
                glyph.flags |= GlyphFlags::VALID;
                glyph.advance = match self.orientation {
                    Orientation::Horizontal => advance.x,
                    Orientation::Vertical => fonts
                        .metrics(font, span.size)
                        .map_or(span.size as f32, |m| m.ascent + m.descent),
                };
            }
            None => {
                tracing::trace!("no font for U+{:04X} at {}", ch as u32, pos);
                if self.preserve_invalid {
                    let size = hex_code_box_size(span.size, ch as u32);
                    glyph.advance = match self.orientation {
                        Orientation::Horizontal => size.x,
                        Orientation::Vertical => size.y,
                    };
                }
            }
        }
        glyph
    }

    /// Ascent, descent and underline from the fonts the line uses.
    ///
    /// Falls back to the hex-code box height when no font resolves.
    pub(super) fn update_line_metrics(&mut self, fonts: &dyn FontLookup) {
        let mut used: Vec<(FontId, u32)> = Vec::new();
        for span in self.spans.iter().filter(|span| span.object.is_none()) {
            if let Some(&font) = span
                .fonts
                .iter()
                .find(|&&font| fonts.metrics(font, span.size).is_some())
                && !used.contains(&(font, span.size))
            {
                used.push((font, span.size));
            }
        }
        for glyph in &self.glyphs {
            if let Some(font) = glyph.font
                && !used.contains(&(font, glyph.font_size))
            {
                used.push((font, glyph.font_size));
            }
        }

        let (mut ascent, mut descent) = (0.0f32, 0.0f32);
        let (mut underline_position, mut underline_thickness) = (0.0f32, 0.0f32);
        let mut resolved = false;
        for (font, size) in used {
            if let Some(metrics) = fonts.metrics(font, size) {
                resolved = true;
                ascent = ascent.max(metrics.ascent);
                descent = descent.max(metrics.descent);
                underline_position = underline_position.max(metrics.underline_position);
                underline_thickness = underline_thickness.max(metrics.underline_thickness);
            }
        }
        if !resolved {
            let size = self
                .spans
                .iter()
                .find(|span| span.object.is_none())
                .map_or(1, |span| span.size);
            ascent = hex_code_box_size(size, 0).y;
        }

        if self.orientation == Orientation::Vertical {
            let half = (ascent + descent) * 0.5;
            ascent = half;
            descent = half;
        }
        self.ascent = ascent + self.spacing.top;
        self.descent = descent + self.spacing.bottom;
        self.underline_position = underline_position;
        self.underline_thickness = underline_thickness;
    }

    /// Grows the line to fit embedded objects and positions them.
    pub(super) fn realign(&mut self) {
        let vertical = self.orientation == Orientation::Vertical;
        let cross = |rect: &verso_core::geometry::Rect<f32>| if vertical { rect.width } else { rect.height };

        for glyph in self.glyphs.iter().filter(|g| g.flags.contains(GlyphFlags::EMBEDDED_OBJECT)) {
            let Some(object) = self.objects.values().find(|object| object.pos == glyph.start) else {
                continue;
            };
            let extent = cross(&object.rect);
            match object.align {
                InlineAlign::Top => self.descent = self.descent.max(extent - self.ascent),
                InlineAlign::Center => {
                    let line = self.ascent + self.descent;
                    if extent > line {
                        let grow = (extent - line) * 0.5;
                        self.ascent += grow;
                        self.descent += grow;
                    }
                }
                InlineAlign::Baseline => self.ascent = self.ascent.max(extent),
                InlineAlign::Bottom => self.ascent = self.ascent.max(extent - self.descent),
            }
        }

        let (ascent, descent) = (self.ascent, self.descent);
        let mut offset = 0.0f32;
        for glyph in &self.glyphs {
            if glyph.flags.contains(GlyphFlags::EMBEDDED_OBJECT)
                && let Some(object) = self.objects.values_mut().find(|object| object.pos == glyph.start)
            {
                let extent = cross(&object.rect);
                let across = match object.align {
                    InlineAlign::Top => -ascent,
                    InlineAlign::Center => (descent - ascent - extent) * 0.5,
                    InlineAlign::Baseline => -extent,
                    InlineAlign::Bottom => descent - extent,
                };
                let origin = if vertical {
                    Vec2::new(across, offset)
                } else {
                    Vec2::new(offset, across)
                };
                object.rect.x = origin.x;
                object.rect.y = origin.y;
            }
            offset += glyph.total_advance();
        }
    }
}
