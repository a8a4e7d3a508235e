//! Synthetic TrueType fonts.
//!
//! Builds small but valid `glyf`-flavoured fonts in memory so tests never
//! depend on fonts installed on the host. Every inked glyph is a single
//! rectangle contour, which keeps expected raster output easy to reason
//! about.

/// Ink box in font units: `(x_min, y_min, x_max, y_max)`.
pub type GlyphBox = (i16, i16, i16, i16);

#[derive(Debug, Clone)]
struct GlyphDef {
    ch: char,
    advance: u16,
    ink: Option<GlyphBox>,
}

/// Builder for an in-memory TrueType font.
///
/// ```
/// use verso_test_utils::TestFontBuilder;
///
/// let data = TestFontBuilder::new()
///     .family("Mono Test")
///     .chars("abc", 600)
///     .kern('a', 'b', -40)
///     .build();
/// assert_eq!(&data[0..4], &[0, 1, 0, 0]);
/// ```
#[derive(Debug, Clone)]
pub struct TestFontBuilder {
    family: String,
    style: String,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    underline_position: i16,
    underline_thickness: i16,
    glyphs: Vec<GlyphDef>,
    kerning: Vec<(char, char, i16)>,
}

impl Default for TestFontBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFontBuilder {
    pub fn new() -> Self {
        Self {
            family: "Verso Test".to_string(),
            style: "Regular".to_string(),
            units_per_em: 1000,
            ascender: 800,
            descender: -200,
            underline_position: -100,
            underline_thickness: 50,
            glyphs: Vec::new(),
            kerning: Vec::new(),
        }
    }

    pub fn family(mut self, family: &str) -> Self {
        self.family = family.to_string();
        self
    }

    pub fn style(mut self, style: &str) -> Self {
        self.style = style.to_string();
        self
    }

    pub fn metrics(mut self, units_per_em: u16, ascender: i16, descender: i16) -> Self {
        self.units_per_em = units_per_em;
        self.ascender = ascender;
        self.descender = descender;
        self
    }

    fn push(mut self, def: GlyphDef) -> Self {
        self.glyphs.retain(|glyph| glyph.ch != def.ch);
        self.glyphs.push(def);
        self
    }

    /// Adds `ch` with a rectangular glyph inset 10% from each side of the advance.
    pub fn glyph(self, ch: char, advance: u16) -> Self {
        let inset = (advance / 10) as i16;
        let ink = (inset, 0, advance as i16 - inset, 700);
        self.glyph_with_box(ch, advance, ink)
    }

    pub fn glyph_with_box(self, ch: char, advance: u16, ink: GlyphBox) -> Self {
        self.push(GlyphDef {
            ch,
            advance,
            ink: Some(ink),
        })
    }

    /// Adds `ch` with an advance but no outline, like a space.
    pub fn blank(self, ch: char, advance: u16) -> Self {
        self.push(GlyphDef {
            ch,
            advance,
            ink: None,
        })
    }

    /// Adds every character of `text`; whitespace becomes blank glyphs.
    pub fn chars(mut self, text: &str, advance: u16) -> Self {
        for ch in text.chars() {
            self = if ch.is_whitespace() {
                self.blank(ch, advance)
            } else {
                self.glyph(ch, advance)
            };
        }
        self
    }

    /// Adds a `kern` pair in font units. Both characters must be mapped.
    pub fn kern(mut self, left: char, right: char, value: i16) -> Self {
        self.kerning.push((left, right, value));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut glyphs = self.glyphs.clone();
        glyphs.sort_by_key(|glyph| glyph.ch);

        let notdef = GlyphDef {
            ch: '\0',
            advance: 500,
            ink: Some((50, 0, 450, 700)),
        };
        let all: Vec<&GlyphDef> = std::iter::once(&notdef).chain(glyphs.iter()).collect();
        let glyph_id = |ch: char| {
            glyphs
                .iter()
                .position(|glyph| glyph.ch == ch)
                .map(|idx| idx as u16 + 1)
        };

        let (glyf, loca) = build_glyf(&all);
        let mut tables: Vec<([u8; 4], Vec<u8>)> = vec![
            (*b"cmap", build_cmap(&glyphs)),
            (*b"glyf", glyf),
            (*b"head", self.build_head(&all)),
            (*b"hhea", self.build_hhea(&all)),
            (*b"hmtx", build_hmtx(&all)),
            (*b"loca", loca),
            (*b"maxp", build_maxp(all.len() as u16)),
            (*b"name", self.build_name()),
            (*b"post", self.build_post()),
        ];

        let mut pairs: Vec<(u16, u16, i16)> = self
            .kerning
            .iter()
            .filter_map(|&(left, right, value)| Some((glyph_id(left)?, glyph_id(right)?, value)))
            .collect();
        if !pairs.is_empty() {
            pairs.sort_by_key(|&(left, right, _)| ((left as u32) << 16) | right as u32);
            pairs.dedup_by_key(|&mut (left, right, _)| (left, right));
            tables.push((*b"kern", build_kern(&pairs)));
        }
        tables.sort_by_key(|(tag, _)| *tag);

        assemble(tables)
    }

    fn build_head(&self, glyphs: &[&GlyphDef]) -> Vec<u8> {
        let (x_min, y_min, x_max, y_max) = font_bounds(glyphs);
        let mut w = Writer::default();
        w.u32(0x0001_0000);
        w.u32(0x0001_0000);
        w.u32(0);
        w.u32(0x5F0F_3CF5);
        w.u16(0x0003);
        w.u16(self.units_per_em);
        w.u64(0);
        w.u64(0);
        w.i16(x_min);
        w.i16(y_min);
        w.i16(x_max);
        w.i16(y_max);
        w.u16(0);
        w.u16(8);
        w.i16(2);
        // Long loca offsets.
        w.i16(1);
        w.i16(0);
        w.0
    }

    fn build_hhea(&self, glyphs: &[&GlyphDef]) -> Vec<u8> {
        let (_, _, x_max, _) = font_bounds(glyphs);
        let advance_max = glyphs.iter().map(|glyph| glyph.advance).max().unwrap_or(0);
        let mut w = Writer::default();
        w.u32(0x0001_0000);
        w.i16(self.ascender);
        w.i16(self.descender);
        w.i16(0);
        w.u16(advance_max);
        w.i16(0);
        w.i16(0);
        w.i16(x_max);
        w.i16(1);
        w.i16(0);
        w.i16(0);
        for _ in 0..4 {
            w.i16(0);
        }
        w.i16(0);
        w.u16(glyphs.len() as u16);
        w.0
    }

    fn build_name(&self) -> Vec<u8> {
        let records = [(1u16, self.family.as_str()), (2u16, self.style.as_str())];
        let encoded: Vec<Vec<u8>> = records
            .iter()
            .map(|(_, text)| text.encode_utf16().flat_map(u16::to_be_bytes).collect())
            .collect();

        let mut w = Writer::default();
        w.u16(0);
        w.u16(records.len() as u16);
        w.u16(6 + 12 * records.len() as u16);
        let mut offset = 0u16;
        for ((name_id, _), bytes) in records.iter().zip(&encoded) {
            w.u16(3);
            w.u16(1);
            w.u16(0x0409);
            w.u16(*name_id);
            w.u16(bytes.len() as u16);
            w.u16(offset);
            offset += bytes.len() as u16;
        }
        for bytes in &encoded {
            w.bytes(bytes);
        }
        w.0
    }

    fn build_post(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.u32(0x0003_0000);
        w.u32(0);
        w.i16(self.underline_position);
        w.i16(self.underline_thickness);
        w.u32(0);
        for _ in 0..4 {
            w.u32(0);
        }
        w.0
    }
}

/// Printable ASCII with a 250-unit space and 500-unit inked glyphs.
pub fn latin_font() -> Vec<u8> {
    latin_font_without("")
}

/// Like [`latin_font`] but leaves every character of `missing` unmapped.
pub fn latin_font_without(missing: &str) -> Vec<u8> {
    let mut builder = TestFontBuilder::new().blank(' ', 250);
    for ch in '!'..='~' {
        if !missing.contains(ch) {
            builder = builder.glyph(ch, 500);
        }
    }
    builder.build()
}

#[derive(Default)]
struct Writer(Vec<u8>);

impl Writer {
    fn u16(&mut self, value: u16) {
        self.0.extend_from_slice(&value.to_be_bytes());
    }

    fn i16(&mut self, value: i16) {
        self.0.extend_from_slice(&value.to_be_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.0.extend_from_slice(&value.to_be_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.0.extend_from_slice(&value.to_be_bytes());
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    fn pad4(&mut self) {
        while self.0.len() % 4 != 0 {
            self.0.push(0);
        }
    }
}

fn font_bounds(glyphs: &[&GlyphDef]) -> GlyphBox {
    glyphs
        .iter()
        .filter_map(|glyph| glyph.ink)
        .fold((i16::MAX, i16::MAX, i16::MIN, i16::MIN), |acc, ink| {
            (acc.0.min(ink.0), acc.1.min(ink.1), acc.2.max(ink.2), acc.3.max(ink.3))
        })
}

fn build_glyf(glyphs: &[&GlyphDef]) -> (Vec<u8>, Vec<u8>) {
    let mut glyf = Writer::default();
    let mut loca = Writer::default();

    for glyph in glyphs {
        loca.u32(glyf.0.len() as u32);
        let Some((x0, y0, x1, y1)) = glyph.ink else {
            continue;
        };

        glyf.i16(1);
        glyf.i16(x0);
        glyf.i16(y0);
        glyf.i16(x1);
        glyf.i16(y1);
        glyf.u16(3);
        glyf.u16(0);
        // Four on-curve points, coordinates stored as signed 16-bit deltas.
        glyf.bytes(&[0x01; 4]);
        // Clockwise outer contour: bottom-left, top-left, top-right, bottom-right.
        for dx in [x0, 0, x1 - x0, 0] {
            glyf.i16(dx);
        }
        for dy in [y0, y1 - y0, 0, y0 - y1] {
            glyf.i16(dy);
        }
        glyf.pad4();
    }
    loca.u32(glyf.0.len() as u32);

    (glyf.0, loca.0)
}

fn build_hmtx(glyphs: &[&GlyphDef]) -> Vec<u8> {
    let mut w = Writer::default();
    for glyph in glyphs {
        w.u16(glyph.advance);
        w.i16(glyph.ink.map_or(0, |ink| ink.0));
    }
    w.0
}

fn build_maxp(num_glyphs: u16) -> Vec<u8> {
    let mut w = Writer::default();
    w.u32(0x0001_0000);
    w.u16(num_glyphs);
    // maxPoints, maxContours
    w.u16(4);
    w.u16(1);
    // maxCompositePoints, maxCompositeContours
    w.u16(0);
    w.u16(0);
    // maxZones
    w.u16(2);
    // maxTwilightPoints, maxStorage, maxFunctionDefs, maxInstructionDefs
    for _ in 0..4 {
        w.u16(0);
    }
    // maxStackElements
    w.u16(64);
    // maxSizeOfInstructions, maxComponentElements, maxComponentDepth
    for _ in 0..3 {
        w.u16(0);
    }
    w.0
}

fn build_cmap(glyphs: &[GlyphDef]) -> Vec<u8> {
    let mut w = Writer::default();
    w.u16(0);
    w.u16(1);
    // Windows, Unicode full repertoire.
    w.u16(3);
    w.u16(10);
    w.u32(12);

    w.u16(12);
    w.u16(0);
    w.u32(16 + 12 * glyphs.len() as u32);
    w.u32(0);
    w.u32(glyphs.len() as u32);
    for (idx, glyph) in glyphs.iter().enumerate() {
        w.u32(glyph.ch as u32);
        w.u32(glyph.ch as u32);
        w.u32(idx as u32 + 1);
    }
    w.0
}

fn build_kern(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
    let count = pairs.len() as u16;
    let entry_selector = 15 - count.max(1).leading_zeros() as u16;
    let search_range = (1u16 << entry_selector) * 6;

    let mut w = Writer::default();
    w.u16(0);
    w.u16(1);
    w.u16(0);
    w.u16(14 + 6 * count);
    // Horizontal, format 0.
    w.u16(0x0001);
    w.u16(count);
    w.u16(search_range);
    w.u16(entry_selector);
    w.u16(count * 6 - search_range);
    for &(left, right, value) in pairs {
        w.u16(left);
        w.u16(right);
        w.i16(value);
    }
    w.0
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn assemble(tables: Vec<([u8; 4], Vec<u8>)>) -> Vec<u8> {
    let count = tables.len() as u16;
    let entry_selector = 15 - count.leading_zeros() as u16;
    let search_range = (1u16 << entry_selector) * 16;

    let mut w = Writer::default();
    w.u32(0x0001_0000);
    w.u16(count);
    w.u16(search_range);
    w.u16(entry_selector);
    w.u16(count * 16 - search_range);

    let mut offset = 12 + 16 * tables.len() as u32;
    let mut body = Writer::default();
    for (tag, data) in &tables {
        w.bytes(tag);
        w.u32(checksum(data));
        w.u32(offset);
        w.u32(data.len() as u32);

        body.bytes(data);
        body.pad4();
        offset = 12 + 16 * tables.len() as u32 + body.0.len() as u32;
    }
    w.bytes(&body.0);
    w.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be_u32(data: &[u8], at: usize) -> u32 {
        u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
    }

    #[test]
    fn test_table_directory_is_sorted_and_aligned() {
        let data = TestFontBuilder::new().chars("ab", 500).kern('a', 'b', -50).build();
        let count = u16::from_be_bytes([data[4], data[5]]) as usize;
        assert_eq!(count, 10);

        let mut previous = [0u8; 4];
        for i in 0..count {
            let record = 12 + i * 16;
            let tag: [u8; 4] = data[record..record + 4].try_into().unwrap();
            assert!(tag > previous);
            previous = tag;

            let offset = be_u32(&data, record + 8) as usize;
            let len = be_u32(&data, record + 12) as usize;
            assert_eq!(offset % 4, 0);
            assert!(offset + len <= data.len());
        }
    }

    #[test]
    fn test_kern_skipped_for_unmapped_chars() {
        let with_pair = TestFontBuilder::new().chars("a", 500).kern('a', 'z', 10).build();
        let count = u16::from_be_bytes([with_pair[4], with_pair[5]]);
        assert_eq!(count, 9);
    }

    #[test]
    fn test_latin_font_without_drops_chars() {
        let full = latin_font();
        let partial = latin_font_without("e");
        assert!(partial.len() < full.len());
    }
}
