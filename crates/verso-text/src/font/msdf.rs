//! Multi-channel signed distance fields.
//!
//! Outlines are flattened to polylines, one polyline per outline segment,
//! and the segments are colored so that every sharp corner sits between
//! edges that disagree in at least two channels. Each of R, G and B stores
//! the pseudo-distance to the nearest edge of that channel; alpha stores
//! the true signed distance. Values are mapped so that 128 is the outline
//! and `pixel_range` pixels span the full byte range.

use std::ops::Range;
use std::sync::Arc;

use verso_core::TaskPool;
use verso_core::math::{Affine2, Vec2};
use verso_core::profiling::{profile_function, profile_scope};

use super::atlas::{AtlasFormat, AtlasImage};
use super::face::PathSegment;
use super::raster::RasterGlyph;

const RED: u8 = 1;
const GREEN: u8 = 2;
const BLUE: u8 = 4;
const WHITE: u8 = RED | GREEN | BLUE;
const CYAN: u8 = GREEN | BLUE;
const MAGENTA: u8 = RED | BLUE;
const YELLOW: u8 = RED | GREEN;

/// sin of the smallest direction change treated as a corner.
const CORNER_CROSS_THRESHOLD: f32 = 0.141;
const QUAD_STEPS: usize = 8;
const CUBIC_STEPS: usize = 12;

#[derive(Debug, Clone)]
struct Edge {
    points: Vec<Vec2>,
    color: u8,
}

impl Edge {
    fn start_direction(&self) -> Vec2 {
        (self.points[1] - self.points[0]).normalize_or_zero()
    }

    fn end_direction(&self) -> Vec2 {
        let n = self.points.len();
        (self.points[n - 1] - self.points[n - 2]).normalize_or_zero()
    }
}

#[derive(Debug, Clone, Copy)]
struct EdgeDistance {
    distance: f32,
    /// |cos| between the edge direction and the direction to the point at a
    /// clamped endpoint; 0 for interior hits. Breaks ties at shared vertices.
    obliqueness: f32,
    pseudo: f32,
}

impl EdgeDistance {
    const FAR: EdgeDistance = EdgeDistance {
        distance: f32::MAX,
        obliqueness: 1.0,
        pseudo: f32::MAX,
    };

    fn closer_than(&self, other: &EdgeDistance) -> bool {
        if (self.distance - other.distance).abs() <= 1e-5 {
            self.obliqueness < other.obliqueness
        } else {
            self.distance < other.distance
        }
    }
}

fn edge_distance(edge: &Edge, p: Vec2) -> EdgeDistance {
    let segments = edge.points.len() - 1;
    let mut best = EdgeDistance::FAR;

    for (i, pair) in edge.points.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let ab = b - a;
        let len_sq = ab.length_squared();
        if len_sq <= f32::EPSILON {
            continue;
        }
        let raw_t = (p - a).dot(ab) / len_sq;
        let t = raw_t.clamp(0.0, 1.0);
        let q = a + ab * t;
        let to_point = p - q;
        let distance = to_point.length();
        let dir = ab / len_sq.sqrt();
        let side = dir.perp_dot(p - a);

        let before_start = i == 0 && raw_t < 0.0;
        let after_end = i == segments - 1 && raw_t > 1.0;
        let obliqueness = if raw_t < 0.0 || raw_t > 1.0 {
            dir.dot(to_point.normalize_or_zero()).abs()
        } else {
            0.0
        };
        // Past the edge ends the distance extends along the tangent line.
        let pseudo = if before_start || after_end {
            side
        } else {
            distance.copysign(side)
        };

        let candidate = EdgeDistance {
            distance,
            obliqueness,
            pseudo,
        };
        if candidate.closer_than(&best) {
            best = candidate;
        }
    }
    best
}

fn is_corner(a: Vec2, b: Vec2) -> bool {
    a.dot(b) <= 0.0 || a.perp_dot(b).abs() > CORNER_CROSS_THRESHOLD
}

fn color_contour(edges: &mut [Edge]) {
    let count = edges.len();
    let corners: Vec<usize> = (0..count)
        .filter(|&i| {
            let prev = &edges[(i + count - 1) % count];
            is_corner(prev.end_direction(), edges[i].start_direction())
        })
        .collect();

    match corners.len() {
        0 => edges.iter_mut().for_each(|edge| edge.color = WHITE),
        1 if count >= 3 => {
            // Teardrop: split the loop into thirds around the single corner.
            let start = corners[0];
            for j in 0..count {
                edges[(start + j) % count].color = [MAGENTA, WHITE, YELLOW][(3 * j) / count];
            }
        }
        1 => edges.iter_mut().for_each(|edge| edge.color = WHITE),
        n => {
            const CYCLE: [u8; 3] = [CYAN, MAGENTA, YELLOW];
            let start = corners[0];
            let mut spline = 0;
            for j in 0..count {
                let idx = (start + j) % count;
                if j > 0 && corners.contains(&idx) {
                    spline += 1;
                }
                let color = if spline == n - 1 && spline % 3 == 0 {
                    CYCLE[1]
                } else {
                    CYCLE[spline % 3]
                };
                edges[idx].color = color;
            }
        }
    }
}

fn flatten(segments: &[PathSegment], map: impl Fn(Vec2) -> Vec2) -> Vec<Vec<Edge>> {
    let mut contours = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut start = Vec2::ZERO;
    let mut last = Vec2::ZERO;

    let push = |edges: &mut Vec<Edge>, points: Vec<Vec2>| {
        if points.windows(2).any(|pair| pair[0].distance_squared(pair[1]) > f32::EPSILON) {
            edges.push(Edge { points, color: WHITE });
        }
    };

    for segment in segments {
        match *segment {
            PathSegment::MoveTo(p) => {
                if !edges.is_empty() {
                    contours.push(std::mem::take(&mut edges));
                }
                start = map(p);
                last = start;
            }
            PathSegment::LineTo(p) => {
                let p = map(p);
                push(&mut edges, vec![last, p]);
                last = p;
            }
            PathSegment::QuadTo(c, p) => {
                let (c, p) = (map(c), map(p));
                let points = (0..=QUAD_STEPS)
                    .map(|i| {
                        let t = i as f32 / QUAD_STEPS as f32;
                        let mt = 1.0 - t;
                        last * (mt * mt) + c * (2.0 * mt * t) + p * (t * t)
                    })
                    .collect();
                push(&mut edges, points);
                last = p;
            }
            PathSegment::CurveTo(c1, c2, p) => {
                let (c1, c2, p) = (map(c1), map(c2), map(p));
                let points = (0..=CUBIC_STEPS)
                    .map(|i| {
                        let t = i as f32 / CUBIC_STEPS as f32;
                        let mt = 1.0 - t;
                        last * (mt * mt * mt)
                            + c1 * (3.0 * mt * mt * t)
                            + c2 * (3.0 * mt * t * t)
                            + p * (t * t * t)
                    })
                    .collect();
                push(&mut edges, points);
                last = p;
            }
            PathSegment::Close => {
                push(&mut edges, vec![last, start]);
                last = start;
                if !edges.is_empty() {
                    contours.push(std::mem::take(&mut edges));
                }
            }
        }
    }
    if !edges.is_empty() {
        contours.push(edges);
    }
    contours
}

/// A glyph outline prepared for distance field rendering.
#[derive(Debug, Clone)]
pub(crate) struct MsdfShape {
    edges: Vec<Edge>,
    /// +1 when outer contours run counter-clockwise, -1 otherwise.
    orientation: f32,
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    pixel_range: f32,
    embolden: f32,
}

impl MsdfShape {
    /// `scale` converts font units to pixels; `transform` is applied after scaling.
    pub fn new(
        segments: &[PathSegment],
        scale: f32,
        transform: Affine2,
        pixel_range: f32,
        embolden: f32,
    ) -> Option<Self> {
        let contours = flatten(segments, |p| transform.transform_point2(p * scale));

        let mut edges = Vec::new();
        let mut area = 0.0f32;
        for mut contour in contours {
            color_contour(&mut contour);
            for edge in &contour {
                for pair in edge.points.windows(2) {
                    area += pair[0].perp_dot(pair[1]);
                }
            }
            edges.extend(contour);
        }
        if edges.is_empty() {
            return None;
        }

        let (min, max) = edges
            .iter()
            .flat_map(|edge| edge.points.iter())
            .fold((Vec2::MAX, Vec2::MIN), |(min, max), p| (min.min(*p), max.max(*p)));
        let border = (pixel_range * 0.5).ceil() as i32 + 1 + embolden.max(0.0).ceil() as i32;
        let left = min.x.floor() as i32 - border;
        let right = max.x.ceil() as i32 + border;
        let bottom = min.y.floor() as i32 - border;
        let top = max.y.ceil() as i32 + border;

        Some(Self {
            edges,
            orientation: if area >= 0.0 { 1.0 } else { -1.0 },
            left,
            top,
            width: (right - left) as u32,
            height: (top - bottom) as u32,
            pixel_range: pixel_range.max(1.0),
            embolden,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn winding(&self, p: Vec2) -> i32 {
        let mut winding = 0;
        for edge in &self.edges {
            for pair in edge.points.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if a.y <= p.y {
                    if b.y > p.y && (b - a).perp_dot(p - a) > 0.0 {
                        winding += 1;
                    }
                } else if b.y <= p.y && (b - a).perp_dot(p - a) < 0.0 {
                    winding -= 1;
                }
            }
        }
        winding
    }

    fn encode(&self, distance: f32) -> u8 {
        ((distance / self.pixel_range + 0.5) * 255.0)
            .round()
            .clamp(0.0, 255.0) as u8
    }

    fn sample(&self, p: Vec2) -> [u8; 4] {
        let mut channels = [EdgeDistance::FAR; 3];
        let mut nearest = f32::MAX;

        for edge in &self.edges {
            let hit = edge_distance(edge, p);
            nearest = nearest.min(hit.distance);
            for (bit, channel) in [RED, GREEN, BLUE].into_iter().zip(channels.iter_mut()) {
                if edge.color & bit != 0 && hit.closer_than(channel) {
                    *channel = hit;
                }
            }
        }

        let inside = self.winding(p) != 0;
        let alpha = if inside { nearest } else { -nearest } + self.embolden;
        let mut rgb = channels.map(|channel| {
            if channel.pseudo == f32::MAX {
                alpha
            } else {
                channel.pseudo * self.orientation + self.embolden
            }
        });

        let median = rgb[0].max(rgb[1]).min(rgb[0].min(rgb[1]).max(rgb[2]));
        if (median > 0.0) != (alpha > 0.0) {
            rgb = [alpha; 3];
        }

        [
            self.encode(rgb[0]),
            self.encode(rgb[1]),
            self.encode(rgb[2]),
            self.encode(alpha),
        ]
    }

    /// RGBA bytes for image rows `rows`, top row first.
    fn render_rows(&self, rows: Range<usize>) -> Vec<u8> {
        profile_scope!("msdf_rows");
        let mut out = Vec::with_capacity(rows.len() * self.width as usize * 4);
        for row in rows {
            let y = self.top as f32 - row as f32 - 0.5;
            for col in 0..self.width {
                let x = self.left as f32 + col as f32 + 0.5;
                out.extend_from_slice(&self.sample(Vec2::new(x, y)));
            }
        }
        out
    }
}

/// Renders `shape`, splitting rows over `pool` when the image has at least
/// `parallel_threshold` pixels.
pub(crate) fn generate(
    shape: MsdfShape,
    pool: Option<&TaskPool>,
    parallel_threshold: u32,
) -> RasterGlyph {
    profile_function!();
    let (width, height) = shape.size();
    let pixels = width.saturating_mul(height);
    let (left, top) = (shape.left, shape.top);

    let data = match pool {
        Some(pool) if pixels >= parallel_threshold && height > 1 => {
            let shape = Arc::new(shape);
            pool.fork_join(height as usize, move |rows| shape.render_rows(rows))
                .concat()
        }
        _ => shape.render_rows(0..height as usize),
    };

    RasterGlyph {
        image: AtlasImage {
            format: AtlasFormat::Rgba8,
            width,
            height,
            data,
        },
        left,
        top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f32) -> Vec<PathSegment> {
        // Clockwise, like TrueType outer contours.
        vec![
            PathSegment::MoveTo(Vec2::new(0.0, 0.0)),
            PathSegment::LineTo(Vec2::new(0.0, size)),
            PathSegment::LineTo(Vec2::new(size, size)),
            PathSegment::LineTo(Vec2::new(size, 0.0)),
            PathSegment::Close,
        ]
    }

    fn pixel(glyph: &RasterGlyph, x: u32, y: u32) -> [u8; 4] {
        let p = glyph.image.pixel(x, y);
        [p[0], p[1], p[2], p[3]]
    }

    fn median(p: [u8; 4]) -> u8 {
        p[0].max(p[1]).min(p[0].min(p[1]).max(p[2]))
    }

    #[test]
    fn test_square_corners_get_distinct_colors() {
        let mut contours = flatten(&square(10.0), |p| p);
        assert_eq!(contours.len(), 1);
        let edges = &mut contours[0];
        assert_eq!(edges.len(), 4);
        color_contour(edges);
        for i in 0..4 {
            let a = edges[i].color;
            let b = edges[(i + 1) % 4].color;
            assert_ne!(a, b);
            assert_ne!(a & b, 0);
        }
    }

    #[test]
    fn test_inside_and_outside_values() {
        let shape = MsdfShape::new(&square(20.0), 1.0, Affine2::IDENTITY, 4.0, 0.0).unwrap();
        let glyph = generate(shape, None, u32::MAX);
        let (w, h) = (glyph.image.width, glyph.image.height);
        assert_eq!(glyph.image.data.len(), (w * h * 4) as usize);

        let center = pixel(&glyph, w / 2, h / 2);
        assert_eq!(center[3], 255);
        assert!(median(center) > 128);

        let corner = pixel(&glyph, 0, 0);
        assert_eq!(corner[3], 0);
        assert!(median(corner) < 128);
    }

    #[test]
    fn test_placement_matches_bounds() {
        let shape = MsdfShape::new(&square(10.0), 1.0, Affine2::IDENTITY, 4.0, 0.0).unwrap();
        // border = ceil(4 / 2) + 1 = 3
        assert_eq!((shape.left, shape.top), (-3, 13));
        assert_eq!(shape.size(), (16, 16));
    }

    #[test]
    fn test_parallel_rows_match_serial() {
        let make = || MsdfShape::new(&square(12.0), 1.0, Affine2::IDENTITY, 4.0, 1.0).unwrap();
        let pool = TaskPool::new(3);

        let serial = generate(make(), None, 0);
        let parallel = generate(make(), Some(&pool), 0);
        assert_eq!(serial.image, parallel.image);
    }

    #[test]
    fn test_empty_outline_has_no_shape() {
        assert!(MsdfShape::new(&[], 1.0, Affine2::IDENTITY, 4.0, 0.0).is_none());
    }
}
