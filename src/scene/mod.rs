//! Renderer-agnostic geometry containers.
//!
//! Everything downstream of tessellation speaks in these types:
//! - `Affine2` transforms processed glyph meshes (oblique skew, vertical flip)
//!   and places them along the pen line.
//! - `Mesh2D` is the assembled, indexed triangle mesh a renderer uploads.
//! - `Aabb2` bounds meshes for framing/centering.
//!
//! No GPU API is used here.

/// 2D affine transform stored as a 3x3 matrix in column-major order.
///
/// Convention:
/// - Column vectors (x, y, 1)
/// - Composition is `outer.mul(inner)`: `inner` applies first.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2 {
    /// Column-major 3x3 matrix.
    pub m: [[f32; 3]; 3],
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    #[inline]
    pub fn translate(tx: f32, ty: f32) -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [tx, ty, 1.0]],
        }
    }

    #[inline]
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Horizontal shear: `x' = x + y * tan(angle)`, y unchanged.
    ///
    /// Positive angles lean the top of a Y-up shape to the right.
    #[inline]
    pub fn skew_x(angle_rad: f32) -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [angle_rad.tan(), 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Compose transforms: `self * rhs` (rhs applies first).
    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        let a = self.m;
        let b = rhs.m;

        let mut out = [[0.0f32; 3]; 3];
        for col in 0..3 {
            for row in 0..3 {
                out[col][row] =
                    a[0][row] * b[col][0] + a[1][row] * b[col][1] + a[2][row] * b[col][2];
            }
        }
        Self { m: out }
    }

    #[inline]
    pub fn transform_point(self, x: f32, y: f32) -> (f32, f32) {
        let nx = self.m[0][0] * x + self.m[1][0] * y + self.m[2][0];
        let ny = self.m[0][1] * x + self.m[1][1] * y + self.m[2][1];
        (nx, ny)
    }

    /// Transform an interleaved `[x0, y0, x1, y1, ...]` buffer into a new buffer.
    pub fn transform_xy_pairs(self, xy: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(xy.len());
        for p in xy.chunks_exact(2) {
            let (x, y) = self.transform_point(p[0], p[1]);
            out.push(x);
            out.push(y);
        }
        out
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Aabb2 {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Aabb2 {
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY, f32::INFINITY],
            max: [f32::NEG_INFINITY, f32::NEG_INFINITY],
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    #[inline]
    pub fn include_point(&mut self, p: [f32; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    #[inline]
    pub fn size(&self) -> [f32; 2] {
        [self.max[0] - self.min[0], self.max[1] - self.min[1]]
    }
}

/// An owned CPU triangle mesh (2D positions, u32 indices).
#[derive(Debug, Clone, Default)]
pub struct Mesh2D {
    pub positions: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Mesh2D {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb2 {
        let mut b = Aabb2::empty();
        for &p in &self.positions {
            b.include_point(p);
        }
        b
    }

    /// Raw vertex bytes, ready for a vertex buffer upload.
    #[inline]
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Raw index bytes, ready for an index buffer upload.
    #[inline]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skew_leans_top_to_the_right() {
        let xf = Affine2::skew_x(45f32.to_radians());
        let (x, y) = xf.transform_point(0.0, 10.0);
        assert!((x - 10.0).abs() < 1e-4);
        assert!((y - 10.0).abs() < 1e-6);
        let (x0, _) = xf.transform_point(3.0, 0.0);
        assert!((x0 - 3.0).abs() < 1e-6);
    }

    #[test]
    fn mul_applies_rhs_first() {
        let xf = Affine2::translate(5.0, 0.0).mul(Affine2::scale(2.0, -1.0));
        assert_eq!(xf.transform_point(1.0, 1.0), (7.0, -1.0));
    }

    #[test]
    fn transform_xy_pairs_keeps_layout() {
        let out = Affine2::scale(1.0, -1.0).transform_xy_pairs(&[1.0, 2.0, 3.0, -4.0]);
        assert_eq!(out, vec![1.0, -2.0, 3.0, 4.0]);
    }

    #[test]
    fn empty_mesh_has_empty_bounds() {
        let mesh = Mesh2D::default();
        assert!(mesh.bounds().is_empty());
        assert_eq!(mesh.triangle_count(), 0);
        assert!(mesh.position_bytes().is_empty());
    }
}
