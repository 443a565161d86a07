//! Curve flattening.
//!
//! Turns a glyph path into closed polygons by recursive midpoint subdivision:
//! a curve is split at t = 0.5 until its control points lie within
//! `tolerance` of the chord, or the depth cap is reached.

use lyon::geom::{CubicBezierSegment, QuadraticBezierSegment};
use lyon::math::Point;
use lyon::path::{Event, Path};

/// Subdivision depth cap; 2^16 segments per curve at most.
const MAX_DEPTH: u32 = 16;

/// Closed polygons, one per contour, in one point buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedOutline {
    pub points: Vec<[f32; 2]>,
    /// Exclusive end index into `points` of each contour.
    pub contour_ends: Vec<usize>,
}

impl FlattenedOutline {
    pub fn clear(&mut self) {
        self.points.clear();
        self.contour_ends.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour_ends.is_empty()
    }

    pub fn contours(&self) -> impl Iterator<Item = &[[f32; 2]]> + '_ {
        let starts = std::iter::once(0).chain(self.contour_ends.iter().copied());
        starts
            .zip(self.contour_ends.iter().copied())
            .map(|(s, e)| &self.points[s..e])
    }
}

pub fn flatten(path: &Path, tolerance: f32) -> FlattenedOutline {
    let mut out = FlattenedOutline::default();
    flatten_into(path, tolerance, &mut out);
    out
}

/// Flatten into a reused buffer. Contours with fewer than three distinct
/// points enclose nothing and are dropped.
pub fn flatten_into(path: &Path, tolerance: f32, out: &mut FlattenedOutline) {
    out.clear();
    let tolerance = tolerance.max(f32::EPSILON);
    let mut contour_start = 0;

    for event in path.iter() {
        match event {
            Event::Begin { at } => {
                contour_start = out.points.len();
                out.points.push([at.x, at.y]);
            }
            Event::Line { to, .. } => out.points.push([to.x, to.y]),
            Event::Quadratic { from, ctrl, to } => {
                let seg = QuadraticBezierSegment { from, ctrl, to };
                flatten_quadratic(&seg, tolerance, 0, &mut out.points);
            }
            Event::Cubic {
                from,
                ctrl1,
                ctrl2,
                to,
            } => {
                let seg = CubicBezierSegment {
                    from,
                    ctrl1,
                    ctrl2,
                    to,
                };
                flatten_cubic(&seg, tolerance, 0, &mut out.points);
            }
            Event::End { .. } => finish_contour(out, contour_start),
        }
    }
}

fn finish_contour(out: &mut FlattenedOutline, start: usize) {
    // Drop the closing point when it repeats the first one.
    if out.points.len() > start + 1 && out.points.last() == out.points.get(start) {
        out.points.pop();
    }
    if out.points.len() - start < 3 {
        out.points.truncate(start);
        return;
    }
    out.contour_ends.push(out.points.len());
}

fn flatten_quadratic(
    seg: &QuadraticBezierSegment<f32>,
    tolerance: f32,
    depth: u32,
    out: &mut Vec<[f32; 2]>,
) {
    if depth >= MAX_DEPTH || distance_to_chord(seg.from, seg.to, seg.ctrl) <= tolerance {
        out.push([seg.to.x, seg.to.y]);
        return;
    }
    let (a, b) = seg.split(0.5);
    flatten_quadratic(&a, tolerance, depth + 1, out);
    flatten_quadratic(&b, tolerance, depth + 1, out);
}

fn flatten_cubic(
    seg: &CubicBezierSegment<f32>,
    tolerance: f32,
    depth: u32,
    out: &mut Vec<[f32; 2]>,
) {
    let flat = distance_to_chord(seg.from, seg.to, seg.ctrl1)
        .max(distance_to_chord(seg.from, seg.to, seg.ctrl2))
        <= tolerance;
    if depth >= MAX_DEPTH || flat {
        out.push([seg.to.x, seg.to.y]);
        return;
    }
    let (a, b) = seg.split(0.5);
    flatten_cubic(&a, tolerance, depth + 1, out);
    flatten_cubic(&b, tolerance, depth + 1, out);
}

/// Distance from `p` to the line through `a` and `b`; to `a` if they coincide.
fn distance_to_chord(a: Point, b: Point, p: Point) -> f32 {
    let chord = b - a;
    let len = chord.length();
    if len <= f32::EPSILON {
        return (p - a).length();
    }
    chord.cross(p - a).abs() / len
}
