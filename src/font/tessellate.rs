//! Polygon tessellation.
//!
//! Converts flattened glyph contours into a flat triangle-vertex array using
//! `lyon::tessellation::FillTessellator`:
//! - `TessTool` owns the tessellator and its output buffers so many glyphs can
//!   reuse them.
//! - Output is `[x0, y0, x1, y1, x2, y2, ...]`, three vertices per triangle,
//!   indices already expanded.
//! - `Winding` classifies a triangle array by its first triangle; assembly picks
//!   the index order that matches the renderer's front face.
//!
//! Notes:
//! - Fonts are authored for non-zero winding; overlapping contours of one glyph
//!   (accents, composites) fill correctly under it.

use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, FillVertexConstructor,
    TessellationError, VertexBuffers,
};

use crate::font::flatten::FlattenedOutline;

/// Tessellation options tailored for glyph outlines.
///
/// - `tolerance`: smaller => more triangles (smoother curves), larger => fewer triangles.
///   Applies to curve flattening; the tessellator itself only sees polygons.
/// - `fill_rule`: NonZero is the font default; EvenOdd is kept for diagnostics.
#[derive(Debug, Copy, Clone)]
pub struct TessellateOptions {
    pub tolerance: f32,
    pub fill_rule: FillRule,
}

impl Default for TessellateOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            fill_rule: FillRule::NonZero,
        }
    }
}

/// A vertex for tessellation output (2D position only).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TessVertex {
    pub position: [f32; 2],
}

/// Builds `TessVertex` from lyon's `FillVertex`.
struct TessVertexCtor;

impl FillVertexConstructor<TessVertex> for TessVertexCtor {
    fn new_vertex(&mut self, v: FillVertex) -> TessVertex {
        let p = v.position();
        TessVertex {
            position: [p.x, p.y],
        }
    }
}

/// Orientation of a triangle in Y-up coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

impl Winding {
    /// Classify `tess_data` by its first triangle; `None` if it has none.
    ///
    /// Uses the shoelace sum `Σ (x[i+1] - x[i]) * (y[i+1] + y[i])`, positive
    /// for clockwise order.
    pub fn of_first_triangle(tess_data: &[f32]) -> Option<Self> {
        let t = tess_data.get(..6)?;
        let (x0, y0, x1, y1, x2, y2) = (t[0], t[1], t[2], t[3], t[4], t[5]);
        let sum = (x1 - x0) * (y1 + y0) + (x2 - x1) * (y2 + y1) + (x0 - x2) * (y0 + y2);
        Some(if sum > 0.0 {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        })
    }
}

/// Which triangle orientation the consumer treats as front-facing.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

impl FrontFace {
    /// Indices for the triangle starting at vertex `base`, reordered so that a
    /// triangle of `winding` comes out front-facing.
    #[inline]
    pub fn triangle_indices(self, base: u32, winding: Winding) -> [u32; 3] {
        let matches = matches!(
            (self, winding),
            (FrontFace::Clockwise, Winding::Clockwise)
                | (FrontFace::CounterClockwise, Winding::CounterClockwise)
        );
        if matches {
            [base, base + 1, base + 2]
        } else {
            [base, base + 2, base + 1]
        }
    }
}

/// Reusable fill tessellator for flattened outlines.
pub struct TessTool {
    tessellator: FillTessellator,
    buffers: VertexBuffers<TessVertex, u32>,
    options: TessellateOptions,
}

impl Default for TessTool {
    fn default() -> Self {
        Self::new(TessellateOptions::default())
    }
}

impl TessTool {
    pub fn new(options: TessellateOptions) -> Self {
        Self {
            tessellator: FillTessellator::new(),
            buffers: VertexBuffers::new(),
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> TessellateOptions {
        self.options
    }

    /// Triangulate `outline` into a flat `[x, y]` triangle-vertex array.
    pub fn tessellate(&mut self, outline: &FlattenedOutline) -> Result<Vec<f32>, TessellationError> {
        if outline.is_empty() {
            return Ok(Vec::new());
        }

        let path = polygon_path(outline);
        self.buffers.vertices.clear();
        self.buffers.indices.clear();

        let fill = FillOptions::tolerance(self.options.tolerance)
            .with_fill_rule(self.options.fill_rule);
        self.tessellator.tessellate_path(
            &path,
            &fill,
            &mut BuffersBuilder::new(&mut self.buffers, TessVertexCtor),
        )?;

        let vertices = &self.buffers.vertices;
        let mut out = Vec::with_capacity(self.buffers.indices.len() * 2);
        for &i in &self.buffers.indices {
            let [x, y] = vertices[i as usize].position;
            out.push(x);
            out.push(y);
        }
        Ok(out)
    }
}

/// Rebuild a lyon path out of closed polygons.
fn polygon_path(outline: &FlattenedOutline) -> Path {
    let mut b = Path::builder();
    for contour in outline.contours() {
        let Some((first, rest)) = contour.split_first() else {
            continue;
        };
        b.begin(point(first[0], first[1]));
        for p in rest {
            b.line_to(point(p[0], p[1]));
        }
        b.close();
    }
    b.build()
}
