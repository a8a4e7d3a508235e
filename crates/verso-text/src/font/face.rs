//! Read-only queries against the font file through `ttf-parser`.
//!
//! A `Face` borrows the font bytes, so callers parse it where they need it.
//! Per-character lookups go through the [`CharMap`] kept by the font instead.

use ttf_parser::{Face, GlyphId, OutlineBuilder, Tag, name_id};
use verso_core::alloc::HashMap;
use verso_core::math::Vec2;

use super::config::FontStyle;
use crate::error::{TextError, TextResult};

pub(crate) fn face_count(data: &[u8]) -> u32 {
    ttf_parser::fonts_in_collection(data).unwrap_or(1)
}

/// Parses face `index` of `data` and applies variation coordinates.
pub(crate) fn parse<'a>(
    data: &'a [u8],
    index: u32,
    variations: &[(u32, f32)],
) -> TextResult<Face<'a>> {
    let count = face_count(data);
    if index >= count {
        return Err(TextError::FaceIndexOutOfRange {
            index,
            face_count: count,
        });
    }
    let mut face = Face::parse(data, index)?;
    for &(tag, value) in variations {
        if face.set_variation(Tag(tag), value).is_none() {
            tracing::trace!("font has no variation axis {:08x}", tag);
        }
    }
    Ok(face)
}

/// Vertical metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct UnitMetrics {
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
}

pub(crate) fn unit_metrics(face: &Face<'_>) -> UnitMetrics {
    let underline = face.underline_metrics();
    UnitMetrics {
        units_per_em: face.units_per_em().max(1) as f32,
        ascender: face.ascender() as f32,
        descender: -(face.descender() as f32),
        underline_position: underline.map_or(-100.0, |m| m.position as f32),
        underline_thickness: underline.map_or(50.0, |m| m.thickness as f32),
    }
}

pub(crate) fn glyph_id(face: &Face<'_>, codepoint: u32) -> Option<GlyphId> {
    char::from_u32(codepoint).and_then(|ch| face.glyph_index(ch))
}

/// Horizontal kerning between two glyphs from the legacy `kern` table.
pub(crate) fn kerning(face: &Face<'_>, left: GlyphId, right: GlyphId) -> i16 {
    let Some(kern) = face.tables().kern else {
        return 0;
    };
    kern.subtables
        .into_iter()
        .filter(|subtable| subtable.horizontal && !subtable.variable)
        .find_map(|subtable| subtable.glyphs_kerning(left, right))
        .unwrap_or(0)
}

fn name(face: &Face<'_>, id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == id && name.is_unicode())
        .find_map(|name| name.to_string())
}

pub(crate) fn family_name(face: &Face<'_>) -> Option<String> {
    name(face, name_id::TYPOGRAPHIC_FAMILY).or_else(|| name(face, name_id::FAMILY))
}

pub(crate) fn style_name(face: &Face<'_>) -> Option<String> {
    name(face, name_id::TYPOGRAPHIC_SUBFAMILY).or_else(|| name(face, name_id::SUBFAMILY))
}

pub(crate) fn style_flags(face: &Face<'_>) -> FontStyle {
    let mut style = FontStyle::empty();
    style.set(FontStyle::BOLD, face.is_bold());
    style.set(FontStyle::ITALIC, face.is_italic() || face.is_oblique());
    style.set(FontStyle::FIXED_WIDTH, face.is_monospaced());
    style
}

/// Characters mapped by the Unicode cmap subtables, resolved once per face.
#[derive(Debug, Clone, Default)]
pub(crate) struct CharMap {
    glyphs: HashMap<char, GlyphId>,
    /// Sorted.
    chars: Vec<char>,
}

impl CharMap {
    pub(crate) fn new(face: &Face<'_>) -> Self {
        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(ch) = char::from_u32(cp)
                        && let Some(gid) = subtable.glyph_index(cp).filter(|gid| gid.0 != 0)
                    {
                        glyphs.entry(ch).or_insert(gid);
                    }
                });
            }
        }
        let mut chars: Vec<char> = glyphs.keys().copied().collect();
        chars.sort_unstable();
        Self { glyphs, chars }
    }

    pub(crate) fn glyph_id(&self, codepoint: u32) -> Option<GlyphId> {
        char::from_u32(codepoint).and_then(|ch| self.glyphs.get(&ch).copied())
    }

    pub(crate) fn contains(&self, ch: char) -> bool {
        self.glyphs.contains_key(&ch)
    }

    pub(crate) fn chars(&self) -> &[char] {
        &self.chars
    }
}

/// A variation axis of the face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariationAxis {
    pub tag: u32,
    pub min: f32,
    pub default: f32,
    pub max: f32,
}

pub(crate) fn variation_axes(face: &Face<'_>) -> Vec<VariationAxis> {
    face.variation_axes()
        .into_iter()
        .map(|axis| VariationAxis {
            tag: axis.tag.0,
            min: axis.min_value,
            default: axis.def_value,
            max: axis.max_value,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PathSegment {
    MoveTo(Vec2),
    LineTo(Vec2),
    QuadTo(Vec2, Vec2),
    CurveTo(Vec2, Vec2, Vec2),
    Close,
}

#[derive(Default)]
struct PathCollector(Vec<PathSegment>);

impl OutlineBuilder for PathCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.push(PathSegment::MoveTo(Vec2::new(x, y)));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.push(PathSegment::LineTo(Vec2::new(x, y)));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0
            .push(PathSegment::QuadTo(Vec2::new(x1, y1), Vec2::new(x, y)));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.push(PathSegment::CurveTo(
            Vec2::new(x1, y1),
            Vec2::new(x2, y2),
            Vec2::new(x, y),
        ));
    }

    fn close(&mut self) {
        self.0.push(PathSegment::Close);
    }
}

/// Outline of `glyph` in font units, y up. `None` for glyphs without ink.
pub(crate) fn outline(face: &Face<'_>, glyph: GlyphId) -> Option<Vec<PathSegment>> {
    let mut collector = PathCollector::default();
    face.outline_glyph(glyph, &mut collector)?;
    (!collector.0.is_empty()).then_some(collector.0)
}

/// Kind of a point in [`GlyphContours`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourPoint {
    OnCurve,
    /// Quadratic control point.
    Conic,
    /// Cubic control point.
    Cubic,
}

/// Glyph outline flattened to point lists, in pixels with y up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphContours {
    pub points: Vec<(Vec2, ContourPoint)>,
    /// Index of the last point of each contour.
    pub contour_ends: Vec<usize>,
    /// True when outer contours run clockwise.
    pub clockwise: bool,
}

pub(crate) fn contours(segments: &[PathSegment], scale: f32) -> GlyphContours {
    let mut out = GlyphContours::default();
    let mut area = 0.0f32;
    let mut contour_start = Vec2::ZERO;
    let mut last = Vec2::ZERO;

    for segment in segments {
        match *segment {
            PathSegment::MoveTo(p) => {
                contour_start = p;
                last = p;
                out.points.push((p * scale, ContourPoint::OnCurve));
            }
            PathSegment::LineTo(p) => {
                area += last.perp_dot(p);
                last = p;
                out.points.push((p * scale, ContourPoint::OnCurve));
            }
            PathSegment::QuadTo(c, p) => {
                area += last.perp_dot(p);
                last = p;
                out.points.push((c * scale, ContourPoint::Conic));
                out.points.push((p * scale, ContourPoint::OnCurve));
            }
            PathSegment::CurveTo(c1, c2, p) => {
                area += last.perp_dot(p);
                last = p;
                out.points.push((c1 * scale, ContourPoint::Cubic));
                out.points.push((c2 * scale, ContourPoint::Cubic));
                out.points.push((p * scale, ContourPoint::OnCurve));
            }
            PathSegment::Close => {
                area += last.perp_dot(contour_start);
                last = contour_start;
                if let Some(end) = out.points.len().checked_sub(1) {
                    out.contour_ends.push(end);
                }
            }
        }
    }
    out.clockwise = area < 0.0;
    out
}
