use verso_core::profiling::profile_function;

use super::glyph::{Glyph, GlyphFlags, JustificationFlags};
use super::lookup::FontLookup;
use super::{ShapeState, ShapedTextBuffer};

fn is_gap(glyph: &Glyph) -> bool {
    !glyph.is_virtual()
        && glyph.flags.contains(GlyphFlags::SPACE)
        && !glyph.flags.intersects(GlyphFlags::TAB | GlyphFlags::BREAK_HARD)
}

fn is_word(glyph: &Glyph) -> bool {
    !glyph.is_virtual() && !glyph.flags.intersects(GlyphFlags::SPACE | GlyphFlags::BREAK_HARD)
}

impl ShapedTextBuffer {
    /// Inserts one zero-width stretch marker after every inter-word gap.
    ///
    /// Leading and trailing whitespace gets no marker.
    pub fn update_justification_ops(&mut self, fonts: &dyn FontLookup) -> bool {
        if !self.update_breaks(fonts) {
            return false;
        }
        if self.state >= ShapeState::JustificationComputed {
            return true;
        }
        profile_function!();

        let first_word = self.glyphs.iter().position(is_word);
        let last_word = self.glyphs.iter().rposition(is_word);
        if let (Some(first_word), Some(last_word)) = (first_word, last_word) {
            let mut out = Vec::with_capacity(self.glyphs.len() + 8);
            let mut moved = Vec::with_capacity(self.glyphs.len() + 1);
            for (idx, glyph) in self.glyphs.iter().enumerate() {
                moved.push(out.len());
                out.push(*glyph);
                let closes_gap = is_gap(glyph)
                    && idx > first_word
                    && idx < last_word
                    && !self.glyphs.get(idx + 1).is_some_and(is_gap);
                if closes_gap {
                    out.push(Glyph::marker(
                        glyph.end,
                        GlyphFlags::ELONGATION | (glyph.flags & GlyphFlags::RTL),
                        glyph.font_size,
                    ));
                }
            }
            moved.push(out.len());
            self.glyphs = out;
            self.trim.remap(&moved);
        }

        self.sorted = false;
        self.state = ShapeState::JustificationComputed;
        true
    }

    /// Stretches or shrinks the line towards `width` using the stretch markers.
    ///
    /// Shrinking only takes back stretch added earlier. When no usable
    /// stretch point exists the width is left unchanged and
    /// [`fit_width_minimum_reached`](Self::fit_width_minimum_reached) is set.
    /// Edge spaces zeroed by an earlier fit get their advance back unless
    /// `TRIM_EDGE_SPACES` is passed again. A previous trim is dropped, so
    /// trim after fitting. Returns the achieved width.
    pub fn fit_to_width(
        &mut self,
        fonts: &dyn FontLookup,
        width: f32,
        flags: JustificationFlags,
    ) -> f32 {
        if !self.update_justification_ops(fonts) {
            return 0.0;
        }
        profile_function!();
        self.fit_width_minimum_reached = false;

        let start = if flags.contains(JustificationFlags::AFTER_LAST_TAB) {
            self.glyphs
                .iter()
                .rposition(|glyph| glyph.flags.contains(GlyphFlags::TAB))
                .map_or(0, |idx| idx + 1)
        } else {
            0
        };

        let mut target = width;
        if flags.contains(JustificationFlags::CONSTRAIN_ELLIPSIS) {
            target -= Self::run_width(&self.trim.ellipsis_glyphs);
        }
        self.drop_trim();

        self.restore_edge_spaces();
        if flags.contains(JustificationFlags::TRIM_EDGE_SPACES) {
            let is_edge = |glyph: &Glyph| glyph.is_virtual() || !is_word(glyph);
            let len = self.glyphs.len();
            let leading = self.glyphs[start..].iter().take_while(|glyph| is_edge(*glyph)).count();
            let trailing = self.glyphs[start..].iter().rev().take_while(|glyph| is_edge(*glyph)).count();
            let tail = (len - trailing).max(start + leading);
            for idx in (start..start + leading).chain(tail..len) {
                let glyph = &mut self.glyphs[idx];
                if !glyph.is_virtual() {
                    self.trimmed_edges.push((idx, glyph.advance));
                    glyph.advance = 0.0;
                }
            }
        }

        let markers: Vec<usize> = if flags.contains(JustificationFlags::WORD_BOUND) {
            (start..self.glyphs.len())
                .filter(|&idx| self.glyphs[idx].is_stretch())
                .collect()
        } else {
            Vec::new()
        };

        self.width = Self::run_width(&self.glyphs);
        if markers.is_empty() {
            self.fit_width_minimum_reached = true;
            return self.width;
        }

        let delta = target - self.width;
        if delta > 0.0 {
            let weights: Vec<f32> = if flags.contains(JustificationFlags::WORD_WEIGHTED) {
                let mut from = start;
                markers
                    .iter()
                    .map(|&marker| {
                        let chars: usize = self.glyphs[from..marker]
                            .iter()
                            .filter(|glyph| is_word(glyph))
                            .map(|glyph| glyph.end - glyph.start)
                            .sum();
                        from = marker + 1;
                        chars.max(1) as f32
                    })
                    .collect()
            } else {
                vec![1.0; markers.len()]
            };
            let total: f32 = weights.iter().sum();
            for (&marker, weight) in markers.iter().zip(weights) {
                self.glyphs[marker].advance += delta * weight / total;
            }
        } else if delta < 0.0 {
            let stretch: f32 = markers.iter().map(|&idx| self.glyphs[idx].advance.max(0.0)).sum();
            let shrink = (-delta).min(stretch);
            if stretch > 0.0 {
                for &marker in &markers {
                    let glyph = &mut self.glyphs[marker];
                    glyph.advance -= glyph.advance.max(0.0) * shrink / stretch;
                }
            }
            if -delta > stretch {
                self.fit_width_minimum_reached = true;
            }
        }

        self.width = Self::run_width(&self.glyphs);
        self.width
    }

    /// Widens tab glyphs so the following text starts at the next tab stop.
    ///
    /// Stops are distances between consecutive tab positions and repeat
    /// cyclically. Non-positive stops are ignored. A previous trim is
    /// dropped. Returns the new width.
    pub fn tab_align(&mut self, fonts: &dyn FontLookup, tab_stops: &[f32]) -> f32 {
        if !self.update_breaks(fonts) {
            return 0.0;
        }
        let stops: Vec<f32> = tab_stops
            .iter()
            .copied()
            .filter(|stop| stop.is_finite() && *stop > 0.0)
            .collect();
        if stops.is_empty() {
            return self.width;
        }
        self.drop_trim();
        self.restore_edge_spaces();

        let mut stop_idx = 0;
        let mut offset = 0.0f32;
        for glyph in &mut self.glyphs {
            if glyph.flags.contains(GlyphFlags::TAB) && !glyph.is_virtual() {
                let mut tab_offset = 0.0f32;
                while tab_offset <= offset {
                    tab_offset += stops[stop_idx];
                    stop_idx = (stop_idx + 1) % stops.len();
                }
                glyph.advance = tab_offset - offset;
            }
            offset += glyph.total_advance();
        }
        self.width = offset;
        self.width
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use verso_test_utils::latin_font;

    use super::super::testing::font_set;
    use super::*;
    use crate::shaped::{FontSet, TrimFlags};

    fn buffer(text: &str) -> (ShapedTextBuffer, FontSet) {
        let (fonts, ids) = font_set(vec![latin_font()]);
        let mut buffer = ShapedTextBuffer::default();
        buffer.add_string(text, &ids, 16, IndexMap::new(), "en", None);
        (buffer, fonts)
    }

    fn stretch_count(buffer: &mut ShapedTextBuffer, fonts: &FontSet) -> usize {
        buffer.glyphs(fonts).iter().filter(|g| g.is_stretch()).count()
    }

    #[test]
    fn test_one_marker_per_inner_gap() {
        let (mut buffer, fonts) = buffer("  one  two three ");
        buffer.update_justification_ops(&fonts);
        assert_eq!(stretch_count(&mut buffer, &fonts), 2);

        let glyphs = buffer.glyphs(&fonts).to_vec();
        let marker = glyphs.iter().position(|g| g.is_stretch()).unwrap();
        assert!(glyphs[marker - 1].flags.contains(GlyphFlags::SPACE));
        assert!(!glyphs[marker + 1].flags.contains(GlyphFlags::SPACE));
        assert_eq!(glyphs[marker].advance, 0.0);
    }

    #[test]
    fn test_fit_grows_to_target() {
        let (mut buffer, fonts) = buffer("aa bb cc");
        let natural = buffer.width(&fonts);
        let width = buffer.fit_to_width(&fonts, natural + 30.0, JustificationFlags::WORD_BOUND);

        assert!((width - (natural + 30.0)).abs() < 1e-3);
        assert!(!buffer.fit_width_minimum_reached());
        let stretch: Vec<f32> = buffer
            .glyphs(&fonts)
            .iter()
            .filter(|g| g.is_stretch())
            .map(|g| g.advance)
            .collect();
        assert_eq!(stretch.len(), 2);
        assert!((stretch[0] - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_fit_word_weighted() {
        let (mut buffer, fonts) = buffer("a bbb c");
        let natural = buffer.width(&fonts);
        buffer.fit_to_width(
            &fonts,
            natural + 40.0,
            JustificationFlags::WORD_BOUND | JustificationFlags::WORD_WEIGHTED,
        );
        let stretch: Vec<f32> = buffer
            .glyphs(&fonts)
            .iter()
            .filter(|g| g.is_stretch())
            .map(|g| g.advance)
            .collect();
        assert!((stretch[0] - 10.0).abs() < 1e-3);
        assert!((stretch[1] - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_fit_shrinks_only_added_stretch() {
        let (mut buffer, fonts) = buffer("aa bb cc");
        let natural = buffer.width(&fonts);
        buffer.fit_to_width(&fonts, natural + 20.0, JustificationFlags::WORD_BOUND);

        let width = buffer.fit_to_width(&fonts, natural + 5.0, JustificationFlags::WORD_BOUND);
        assert!((width - (natural + 5.0)).abs() < 1e-3);

        let width = buffer.fit_to_width(&fonts, natural - 10.0, JustificationFlags::WORD_BOUND);
        assert!((width - natural).abs() < 1e-3);
        assert!(buffer.fit_width_minimum_reached());
    }

    #[test]
    fn test_fit_without_stretch_points_flags_minimum() {
        let (mut buffer, fonts) = buffer("single");
        let natural = buffer.width(&fonts);
        let width = buffer.fit_to_width(&fonts, natural + 50.0, JustificationFlags::WORD_BOUND);
        assert_eq!(width, natural);
        assert!(buffer.fit_width_minimum_reached());
    }

    #[test]
    fn test_trim_edge_spaces() {
        let (mut buffer, fonts) = buffer(" ab ");
        let natural = buffer.width(&fonts);
        let width = buffer.fit_to_width(&fonts, 100.0, JustificationFlags::TRIM_EDGE_SPACES);
        assert!((width - (natural - 8.0)).abs() < 1e-3);
    }

    #[test]
    fn test_edge_spaces_come_back_on_next_fit() {
        let (mut buffer, fonts) = buffer("  aa bb  ");
        let natural = buffer.width(&fonts);
        let trimmed = buffer.fit_to_width(&fonts, 0.0, JustificationFlags::TRIM_EDGE_SPACES);
        assert!((trimmed - (natural - 16.0)).abs() < 1e-3);

        let width = buffer.fit_to_width(&fonts, 0.0, JustificationFlags::WORD_BOUND);
        assert!((width - natural).abs() < 1e-3);
        let spaces: Vec<f32> = buffer
            .glyphs(&fonts)
            .iter()
            .filter(|g| g.flags.contains(GlyphFlags::SPACE))
            .map(|g| g.advance)
            .collect();
        assert_eq!(spaces, vec![4.0; 5]);
    }

    #[test]
    fn test_all_space_line_trims_each_glyph_once() {
        let (mut buffer, fonts) = buffer("   ");
        let natural = buffer.width(&fonts);
        assert_eq!(buffer.fit_to_width(&fonts, 0.0, JustificationFlags::TRIM_EDGE_SPACES), 0.0);
        let width = buffer.fit_to_width(&fonts, 0.0, JustificationFlags::empty());
        assert!((width - natural).abs() < 1e-3);
    }

    #[test]
    fn test_markers_keep_trim_cut_in_place() {
        let (mut buffer, fonts) = buffer("aa bb cc dd ee");
        buffer.update_breaks(&fonts);
        buffer.overrun_trim_to_width(&fonts, 60.0, TrimFlags::TRIM);
        let before = buffer.visible_glyphs(&fonts);
        assert_eq!(before.len(), 9);

        buffer.update_justification_ops(&fonts);
        let after: Vec<Glyph> = buffer
            .visible_glyphs(&fonts)
            .into_iter()
            .filter(|g| !g.is_stretch())
            .collect();
        assert_eq!(after, before);
        assert_eq!(buffer.trimmed_width(&fonts), 60.0);
    }

    #[test]
    fn test_fit_drops_trim() {
        let (mut buffer, fonts) = buffer("aa bb cc dd ee");
        buffer.overrun_trim_to_width(&fonts, 60.0, TrimFlags::TRIM);
        assert!(buffer.trim_pos().is_some());

        let width = buffer.fit_to_width(&fonts, 200.0, JustificationFlags::WORD_BOUND);
        assert_eq!(buffer.trim_pos(), None);
        assert_eq!(buffer.trimmed_width(&fonts), width);
        assert_eq!(buffer.visible_glyphs(&fonts).len(), buffer.glyph_count(&fonts));
    }

    #[test]
    fn test_tab_align_to_stops() {
        let (mut buffer, fonts) = buffer("ab\tc\td");
        let width = buffer.tab_align(&fonts, &[0.0, 40.0]);
        let glyphs = buffer.glyphs(&fonts).to_vec();
        // "ab" is 16px wide, the first tab reaches 40.
        assert!((glyphs[2].advance - 24.0).abs() < 1e-3);
        // "c" ends at 48, the next stop is 80.
        assert!((glyphs[4].advance - 32.0).abs() < 1e-3);
        assert!((width - 88.0).abs() < 1e-3);
    }
}
