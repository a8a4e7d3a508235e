use bitflags::bitflags;

use crate::handle::FontId;

bitflags! {
    /// Per-glyph flags of a shaped run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GlyphFlags: u32 {
        /// A font provided the glyph.
        const VALID = 1 << 0;
        const RTL = 1 << 1;
        /// Zero-width marker inserted by break or justification passes.
        const VIRTUAL = 1 << 2;
        const SPACE = 1 << 3;
        const BREAK_SOFT = 1 << 4;
        const BREAK_HARD = 1 << 5;
        const TAB = 1 << 6;
        /// Stretch point used by `fit_to_width`.
        const ELONGATION = 1 << 7;
        const PUNCTUATION = 1 << 8;
        const UNDERSCORE = 1 << 9;
        const EMBEDDED_OBJECT = 1 << 10;
        const SOFT_HYPHEN = 1 << 11;
    }
}

/// One entry of a shaped glyph run.
///
/// `start` and `end` are character offsets into the root text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub start: usize,
    pub end: usize,
    /// Glyphs in the cluster this entry starts.
    pub count: u8,
    /// Times the glyph is drawn in a row.
    pub repeat: u8,
    pub flags: GlyphFlags,
    pub x_offset: f32,
    pub y_offset: f32,
    pub advance: f32,
    pub font: Option<FontId>,
    pub font_size: u32,
    /// Glyph index; the codepoint in this server.
    pub index: u32,
}

impl Default for Glyph {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            count: 1,
            repeat: 1,
            flags: GlyphFlags::empty(),
            x_offset: 0.0,
            y_offset: 0.0,
            advance: 0.0,
            font: None,
            font_size: 0,
            index: 0,
        }
    }
}

impl Glyph {
    /// Zero-width marker at character offset `pos`.
    pub(crate) fn marker(pos: usize, flags: GlyphFlags, font_size: u32) -> Self {
        Self {
            start: pos,
            end: pos,
            flags: flags | GlyphFlags::VIRTUAL | GlyphFlags::VALID,
            font_size,
            ..Self::default()
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.flags.contains(GlyphFlags::VIRTUAL)
    }

    pub fn is_stretch(&self) -> bool {
        self.flags.contains(GlyphFlags::ELONGATION)
    }

    pub fn total_advance(&self) -> f32 {
        self.advance * self.repeat as f32
    }
}

/// Requested or detected paragraph direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Taken from the first strong character.
    #[default]
    Auto,
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// How an embedded object sits relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InlineAlign {
    Top,
    #[default]
    Center,
    Baseline,
    Bottom,
}

/// Extra spacing slots of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpacingType {
    /// Added after every glyph except the last.
    Glyph,
    /// Added after every space except the last glyph.
    Space,
    Top,
    Bottom,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct JustificationFlags: u32 {
        /// Stretch at inter-word gaps.
        const WORD_BOUND = 1 << 0;
        /// Weight each gap by the length of the word before it.
        const WORD_WEIGHTED = 1 << 1;
        /// Zero the advance of leading and trailing spaces first.
        const TRIM_EDGE_SPACES = 1 << 2;
        /// Only stretch gaps after the last tab.
        const AFTER_LAST_TAB = 1 << 3;
        /// Keep room for the ellipsis of a previous trim.
        const CONSTRAIN_ELLIPSIS = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TrimFlags: u32 {
        const TRIM = 1 << 0;
        /// Cut only at break opportunities.
        const WORD_BOUND = 1 << 1;
        const ADD_ELLIPSIS = 1 << 2;
        /// Add the ellipsis even when few glyphs remain.
        const ENFORCE_ELLIPSIS = 1 << 3;
        /// Cut from the leading edge instead of the trailing one.
        const TRIM_START = 1 << 4;
        /// Keep stretch markers in place and only zero them.
        const JUSTIFICATION_AWARE = 1 << 5;
    }
}
