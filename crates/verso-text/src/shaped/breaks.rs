use verso_core::profiling::profile_function;

use super::glyph::{Glyph, GlyphFlags};
use super::lookup::FontLookup;
use super::{ShapeState, ShapedTextBuffer};

pub(crate) fn is_hard_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\u{0B}' | '\u{0C}' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Whitespace that allows a line break. No-break spaces do not.
pub(crate) fn is_soft_break(ch: char) -> bool {
    ch.is_whitespace()
        && !is_hard_break(ch)
        && !matches!(ch, '\u{A0}' | '\u{2007}' | '\u{202F}' | '\u{FEFF}')
}

pub(crate) fn is_ideographic(ch: char) -> bool {
    matches!(
        ch as u32,
        0x2E80..=0x2FDF
            | 0x3040..=0x30FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xF900..=0xFAFF
            | 0x20000..=0x3134F
    )
}

pub(crate) fn is_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation()
        || matches!(
            ch as u32,
            0x00A1 | 0x00A7 | 0x00AB | 0x00B6 | 0x00B7 | 0x00BB | 0x00BF
                | 0x2010..=0x2027
                | 0x2030..=0x205E
                | 0x3001..=0x3003
                | 0x3008..=0x3011
                | 0xFF01..=0xFF0F
                | 0xFF1A..=0xFF20
                | 0xFF3B..=0xFF40
                | 0xFF5B..=0xFF65
        )
}

fn is_hyphen(ch: char) -> bool {
    matches!(ch, '-' | '\u{2010}' | '\u{AD}')
}

impl ShapedTextBuffer {
    fn is_punct(&self, ch: char) -> bool {
        if self.custom_punctuation.is_empty() {
            is_punctuation(ch)
        } else {
            self.custom_punctuation.contains(ch)
        }
    }

    /// Flags break opportunities and inserts zero-width soft-break markers
    /// after hyphens and between ideographs.
    pub fn update_breaks(&mut self, fonts: &dyn FontLookup) -> bool {
        if !self.shape(fonts) {
            return false;
        }
        if self.state >= ShapeState::BreaksComputed {
            return true;
        }
        profile_function!();

        let mut out = Vec::with_capacity(self.glyphs.len() + self.glyphs.len() / 8);
        let mut moved = Vec::with_capacity(self.glyphs.len() + 1);
        for (idx, glyph) in self.glyphs.iter().enumerate() {
            moved.push(out.len());
            let mut glyph = *glyph;
            if glyph.is_virtual() || glyph.flags.contains(GlyphFlags::EMBEDDED_OBJECT) {
                out.push(glyph);
                continue;
            }
            let ch = self.char_at(glyph.start);
            if is_hard_break(ch) {
                glyph.flags |= GlyphFlags::BREAK_HARD;
            } else if is_soft_break(ch) {
                glyph.flags |= GlyphFlags::BREAK_SOFT | GlyphFlags::SPACE;
            }
            if ch == '\t' {
                glyph.flags |= GlyphFlags::TAB | GlyphFlags::BREAK_SOFT;
            }
            if self.is_punct(ch) {
                glyph.flags |= GlyphFlags::PUNCTUATION;
            }
            if ch == '_' {
                glyph.flags |= GlyphFlags::UNDERSCORE;
            }
            if ch == '\u{AD}' {
                glyph.flags |= GlyphFlags::SOFT_HYPHEN;
            }
            out.push(glyph);

            let next = self
                .glyphs
                .get(idx + 1)
                .filter(|next| !next.is_virtual() && !next.flags.contains(GlyphFlags::EMBEDDED_OBJECT))
                .map(|next| self.char_at(next.start));
            let Some(next) = next else {
                continue;
            };
            let after_hyphen = is_hyphen(ch) && !next.is_whitespace();
            let between_ideographs = is_ideographic(ch) && is_ideographic(next);
            if after_hyphen || between_ideographs {
                out.push(Glyph::marker(
                    glyph.end,
                    GlyphFlags::BREAK_SOFT | (glyph.flags & GlyphFlags::RTL),
                    glyph.font_size,
                ));
            }
        }

        moved.push(out.len());
        self.glyphs = out;
        self.trim.remap(&moved);
        self.sorted = false;
        self.state = ShapeState::BreaksComputed;
        true
    }
}
