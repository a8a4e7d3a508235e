use verso_core::profiling::profile_function;

use super::glyph::{Glyph, GlyphFlags, TrimFlags};
use super::lookup::FontLookup;
use super::{ShapeState, ShapedTextBuffer, TrimData};
use crate::handle::FontId;

/// Glyphs that must remain before an ellipsis is added, unless it is enforced.
const ELLIPSIS_MIN_GLYPHS: usize = 6;

fn is_break(glyph: &Glyph) -> bool {
    glyph.flags.intersects(GlyphFlags::BREAK_SOFT | GlyphFlags::BREAK_HARD)
}

fn visible_count(glyphs: &[Glyph]) -> usize {
    glyphs.iter().filter(|glyph| !glyph.is_virtual()).count()
}

impl ShapedTextBuffer {
    /// Font and size used for the ellipsis: the glyph nearest the cut that has
    /// a '.', else any span font that has one.
    fn ellipsis_font(&self, fonts: &dyn FontLookup, from_start: bool) -> Option<(FontId, u32)> {
        let near_cut = |glyph: &Glyph| {
            glyph
                .font
                .filter(|&font| fonts.has_char(font, '.'))
                .map(|font| (font, glyph.font_size))
        };
        let from_glyphs = if from_start {
            self.glyphs.iter().find_map(near_cut)
        } else {
            self.glyphs.iter().rev().find_map(near_cut)
        };
        from_glyphs.or_else(|| {
            self.spans.iter().find_map(|span| {
                span.fonts
                    .iter()
                    .find(|&&font| fonts.has_char(font, '.'))
                    .map(|&font| (font, span.size))
            })
        })
    }

    /// Three dots, with a space on the inner side when cutting per word.
    fn build_ellipsis(&self, fonts: &dyn FontLookup, word_bound: bool, from_start: bool) -> Vec<Glyph> {
        let Some((font, size)) = self.ellipsis_font(fonts, from_start) else {
            return Vec::new();
        };
        let glyph_for = |ch: char| {
            fonts.glyph_advance(font, size, ch as u32).map(|advance| Glyph {
                flags: GlyphFlags::VALID | GlyphFlags::VIRTUAL,
                advance: advance.x,
                font: Some(font),
                font_size: size,
                index: ch as u32,
                ..Glyph::default()
            })
        };
        let Some(dot) = glyph_for('.') else {
            return Vec::new();
        };
        let mut glyphs = vec![dot; 3];
        if word_bound && fonts.has_char(font, ' ') {
            if let Some(mut space) = glyph_for(' ') {
                space.flags |= GlyphFlags::SPACE;
                if from_start {
                    glyphs.push(space);
                } else {
                    glyphs.insert(0, space);
                }
            }
        }
        glyphs
    }

    /// Number of glyphs to cut so the rest plus `reserve` fits `width`.
    ///
    /// Trailing cuts keep `glyphs[..k]`, leading cuts keep `glyphs[k..]`.
    fn find_cut(&self, width: f32, reserve: f32, word_bound: bool, from_start: bool) -> usize {
        let glyphs = &self.glyphs;
        let count = glyphs.len();
        if from_start {
            let mut kept = Self::run_width(glyphs);
            for k in 0..=count {
                if k > 0 {
                    kept -= glyphs[k - 1].total_advance();
                }
                let boundary = !word_bound || k == 0 || k == count || is_break(&glyphs[k - 1]);
                if k > 0 && boundary && kept + reserve <= width {
                    return k;
                }
            }
            count
        } else {
            let mut kept = Self::run_width(glyphs);
            for k in (0..count).rev() {
                kept -= glyphs[k].total_advance();
                let boundary = !word_bound || k == 0 || is_break(&glyphs[k]);
                if boundary && kept + reserve <= width {
                    let mut k = k;
                    while word_bound
                        && k > 0
                        && glyphs[k - 1].flags.contains(GlyphFlags::SPACE)
                        && !glyphs[k - 1].is_virtual()
                    {
                        k -= 1;
                    }
                    return k;
                }
            }
            0
        }
    }

    /// Cuts the visible run so it fits `width`, optionally adding an ellipsis.
    ///
    /// Justification stretch and trimmed edge spaces are discarded first. The
    /// shaped run itself is kept; [`visible_glyphs`](Self::visible_glyphs)
    /// returns the cut run. The cut follows later break or justification
    /// markers; fitting or tab alignment drops it.
    pub fn overrun_trim_to_width(&mut self, fonts: &dyn FontLookup, width: f32, flags: TrimFlags) {
        if !self.shape(fonts) {
            return;
        }
        profile_function!();

        if self.state == ShapeState::JustificationComputed {
            if flags.contains(TrimFlags::JUSTIFICATION_AWARE) {
                for glyph in self.glyphs.iter_mut().filter(|glyph| glyph.is_stretch()) {
                    glyph.advance = 0.0;
                }
            } else {
                self.restore_edge_spaces();
                self.glyphs.retain(|glyph| !glyph.is_stretch());
                self.state = ShapeState::BreaksComputed;
            }
            self.width = Self::run_width(&self.glyphs);
        }

        self.trim = TrimData::default();
        if !flags.contains(TrimFlags::TRIM) || self.width <= width {
            return;
        }

        let word_bound = flags.contains(TrimFlags::WORD_BOUND);
        if word_bound {
            self.update_breaks(fonts);
        }
        let from_start = flags.contains(TrimFlags::TRIM_START);
        let width = width.max(0.0);

        let mut ellipsis = if flags.contains(TrimFlags::ADD_ELLIPSIS) {
            self.build_ellipsis(fonts, word_bound, from_start)
        } else {
            Vec::new()
        };
        let enforce = flags.contains(TrimFlags::ENFORCE_ELLIPSIS);

        let mut cut = self.find_cut(width, Self::run_width(&ellipsis), word_bound, from_start);
        let kept = |cut: usize| {
            if from_start {
                &self.glyphs[cut..]
            } else {
                &self.glyphs[..cut]
            }
        };
        let show_ellipsis =
            !ellipsis.is_empty() && (enforce || visible_count(kept(cut)) >= ELLIPSIS_MIN_GLYPHS);
        if !show_ellipsis {
            ellipsis.clear();
            cut = self.find_cut(width, 0.0, word_bound, from_start);
        }

        let kept_width = Self::run_width(kept(cut));
        while !ellipsis.is_empty() && kept_width + Self::run_width(&ellipsis) > width {
            if from_start {
                ellipsis.pop();
            } else {
                ellipsis.remove(0);
            }
        }

        let pos = if from_start {
            self.glyphs.get(cut).map_or(self.end, |glyph| glyph.start)
        } else {
            cut.checked_sub(1)
                .and_then(|idx| self.glyphs.get(idx))
                .map_or(self.start, |glyph| glyph.end)
        };
        for glyph in &mut ellipsis {
            glyph.start = pos;
            glyph.end = pos;
        }

        tracing::trace!(
            "trimmed to {:.2} (limit {:.2}) at glyph {}",
            kept_width + Self::run_width(&ellipsis),
            width,
            cut
        );
        self.trim = TrimData {
            trim_pos: Some(cut),
            ellipsis_pos: (!ellipsis.is_empty()).then_some(cut),
            ellipsis_glyphs: ellipsis,
            from_start,
        };
    }

    /// Glyph index where the run is cut, if it is.
    pub fn trim_pos(&self) -> Option<usize> {
        self.trim.trim_pos
    }

    /// Glyph index where the ellipsis is drawn, if one was added.
    pub fn ellipsis_pos(&self) -> Option<usize> {
        self.trim.ellipsis_pos
    }

    pub fn ellipsis_glyphs(&self) -> &[Glyph] {
        &self.trim.ellipsis_glyphs
    }

    /// Width of the visible run after trimming, ellipsis included.
    pub fn trimmed_width(&mut self, fonts: &dyn FontLookup) -> f32 {
        self.shape(fonts);
        if self.trim.trim_pos.is_some() {
            Self::run_width(&self.visible_glyphs(fonts))
        } else {
            self.width
        }
    }

    /// The run as displayed: trimmed glyphs with the ellipsis in place.
    pub fn visible_glyphs(&mut self, fonts: &dyn FontLookup) -> Vec<Glyph> {
        self.shape(fonts);
        let Some(cut) = self.trim.trim_pos else {
            return self.glyphs.clone();
        };
        let cut = cut.min(self.glyphs.len());
        let ellipsis = self.trim.ellipsis_glyphs.iter().copied();
        if self.trim.from_start {
            ellipsis.chain(self.glyphs[cut..].iter().copied()).collect()
        } else {
            self.glyphs[..cut].iter().copied().chain(ellipsis).collect()
        }
    }
}
