//! Font module root.
//!
//! This crate renders text via **vector glyph outlines**:
//! - A `Typeface` exposes glyph lookup, metrics, outlines and substitution tables.
//! - `outline` resolves a glyph's contours at a size, optionally grid-fitted.
//! - `flatten` turns curves into closed polygons.
//! - `tessellate` triangulates those polygons into a flat triangle-vertex array.
//!
//! Concrete typefaces:
//! - `ttf::TtfTypeface`: font bytes parsed with `ttf-parser`.
//! - `memory::MemoryTypeface`: glyphs assembled in code (procedural fonts, tests).
//! - `db::FontSystem` resolves a family/weight/style query to a `TtfTypeface`
//!   through `fontdb`.

pub mod db;
pub mod flatten;
pub mod memory;
pub mod outline;
pub mod tessellate;
pub mod ttf;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::gsub::{LayoutTable, LookupIndex};

/// A glyph identifier within one typeface.
pub type GlyphIndex = u16;

/// Points are 1/72 inch; pixels are assumed at 96 DPI.
pub const POINTS_TO_PIXELS: f32 = 96.0 / 72.0;

/// Identity of a loaded typeface.
///
/// Allocated once per load from a process-wide counter, so two loads of the
/// same bytes are distinct typefaces and an id is never reused.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TypefaceId(u64);

impl TypefaceId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Basic vertical metrics needed for consistent baseline alignment.
///
/// Values are in **font units** (units-per-em).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FontVMetrics {
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

impl FontVMetrics {
    pub fn default_for_upm(units_per_em: f32) -> Self {
        // Conservative defaults when the face doesn't provide metrics.
        Self {
            units_per_em,
            ascender: 0.8 * units_per_em,
            descender: -0.2 * units_per_em,
            line_gap: 0.0,
        }
    }

    /// Ascender to descender plus line gap, in font units.
    #[inline]
    pub fn line_spacing(&self) -> f32 {
        self.ascender - self.descender + self.line_gap
    }
}

/// Placement and advance change for one glyph, in font units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GlyphAdjustment {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
}

impl GlyphAdjustment {
    #[inline]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn accumulate(&mut self, other: GlyphAdjustment) {
        self.x_placement = self.x_placement.saturating_add(other.x_placement);
        self.y_placement = self.y_placement.saturating_add(other.y_placement);
        self.x_advance = self.x_advance.saturating_add(other.x_advance);
    }
}

/// Adjustments for a glyph pair: `first` applies to the left glyph, `second`
/// to the right one.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PairAdjustment {
    pub first: GlyphAdjustment,
    pub second: GlyphAdjustment,
}

impl PairAdjustment {
    /// Legacy kerning: only the left glyph's advance changes.
    pub fn from_kerning(value: i16) -> Self {
        Self {
            first: GlyphAdjustment {
                x_advance: value,
                ..GlyphAdjustment::default()
            },
            second: GlyphAdjustment::default(),
        }
    }

    pub fn accumulate(&mut self, other: PairAdjustment) {
        self.first.accumulate(other.first);
        self.second.accumulate(other.second);
    }
}

/// The read-only font collaborator consumed by layout and meshing.
///
/// Implementations must be immutable after load: every pipeline instance may
/// hold the same `Arc<dyn Typeface>`.
pub trait Typeface: Send + Sync {
    /// Stable identity used as a cache key.
    fn id(&self) -> TypefaceId;

    fn glyph_count(&self) -> u16;

    /// Map a character to a glyph; 0 (`.notdef`) when the font lacks it.
    fn glyph_index(&self, ch: char) -> GlyphIndex;

    /// Horizontal advance in font units.
    fn advance_width(&self, glyph: GlyphIndex) -> u16;

    fn v_metrics(&self) -> FontVMetrics;

    /// Stream the glyph's contours (composites already resolved) into `builder`,
    /// in font units. Returns `false` when the glyph has no outline.
    fn outline_glyph(
        &self,
        glyph: GlyphIndex,
        builder: &mut dyn ttf_parser::OutlineBuilder,
    ) -> bool;

    /// Glyph substitution tables, if the font has any.
    fn gsub(&self) -> Option<&LayoutTable>;

    /// Glyph positioning tables, if the font has any. Only the script,
    /// feature and lookup structure is exposed; pair values are read through
    /// `pair_adjustment`.
    fn gpos(&self) -> Option<&LayoutTable> {
        None
    }

    /// Legacy `kern` table value for a pair, in font units.
    fn kerning(&self, _left: GlyphIndex, _right: GlyphIndex) -> i16 {
        0
    }

    /// Pair adjustment from the positioning `lookups` (indices into `gpos`),
    /// summed in lookup order. With no lookups the legacy kerning applies.
    fn pair_adjustment(
        &self,
        _lookups: &[LookupIndex],
        left: GlyphIndex,
        right: GlyphIndex,
    ) -> PairAdjustment {
        PairAdjustment::from_kerning(self.kerning(left, right))
    }

    #[inline]
    fn units_per_em(&self) -> f32 {
        self.v_metrics().units_per_em
    }

    /// Scale factor mapping font units to pixels for a size in points.
    fn scale_to_pixel_from_point_size(&self, size_pt: f32) -> f32 {
        size_pt * POINTS_TO_PIXELS / self.units_per_em()
    }
}

/// Simplified font style selection.
#[derive(Debug, Clone, Default)]
pub struct FontQuery {
    /// Preferred font family names, in priority order.
    /// Generic names (`serif`, `sans-serif`, `monospace`) are understood.
    pub families: Vec<String>,

    /// Weight in CSS-ish terms (100..900).
    pub weight: u16,

    /// Italic / oblique.
    pub italic: bool,
}

/// Errors produced by the font subsystem.
#[derive(thiserror::Error, Debug)]
pub enum FontError {
    #[error("no fonts found on this system")]
    NoFontsAvailable,

    #[error("failed to resolve a font face for query: {0:?}")]
    ResolveFailed(FontQuery),

    #[error("failed to read font file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse font face: {0}")]
    ParseFailed(#[from] ttf_parser::FaceParsingError),

    #[error("font has zero units per em")]
    InvalidUnitsPerEm,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typeface_ids_are_unique() {
        let a = TypefaceId::next();
        let b = TypefaceId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn line_spacing_sums_metrics() {
        let m = FontVMetrics {
            units_per_em: 1000.0,
            ascender: 800.0,
            descender: -200.0,
            line_gap: 90.0,
        };
        assert_eq!(m.line_spacing(), 1090.0);
        assert_eq!(FontVMetrics::default_for_upm(2048.0).line_gap, 0.0);
    }
}
