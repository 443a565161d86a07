//! Glyph mesh cache.
//!
//! `GlyphMeshStore` maps (typeface, size, hint) scopes to per-glyph processed
//! meshes. A glyph is built at most once per scope: outline → flatten →
//! tessellate, then shared as `Arc<ProcessedGlyph>`. Oblique and flipped
//! variants are derived from the base mesh on first request and cached beside
//! it.

use std::collections::HashMap;
use std::sync::Arc;

use lyon::path::Path;

use crate::font::flatten::{FlattenedOutline, flatten_into};
use crate::font::outline::{FontSize, GlyphControlParameters, GlyphOutlineBuilder, HintTechnique};
use crate::font::tessellate::{TessTool, TessellateOptions};
use crate::font::{GlyphIndex, Typeface, TypefaceId};
use crate::scene::Affine2;

/// Slant of the synthesized oblique, in degrees (top leans right).
pub const OBLIQUE_ANGLE_DEG: f32 = 15.0;

/// Everything that changes the geometry of a glyph mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CacheScope {
    pub typeface: TypefaceId,
    pub size: FontSize,
    pub hint: HintTechnique,
}

/// A tessellated glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedGlyph {
    /// `[x, y]` pairs, three vertices per triangle.
    pub tess_data: Vec<f32>,
    pub vertex_count: usize,
    pub control: GlyphControlParameters,
}

impl ProcessedGlyph {
    pub fn empty(control: GlyphControlParameters) -> Self {
        Self {
            tess_data: Vec::new(),
            vertex_count: 0,
            control,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.vertex_count / 3
    }

    /// Apply `xf` to every vertex; bounds follow.
    pub fn transformed(&self, xf: Affine2) -> Self {
        let tess_data = xf.transform_xy_pairs(&self.tess_data);
        let mut control = self.control;
        control.bounds = crate::scene::Aabb2::empty();
        for p in tess_data.chunks_exact(2) {
            control.bounds.include_point([p[0], p[1]]);
        }
        Self {
            tess_data,
            vertex_count: self.vertex_count,
            control,
        }
    }
}

/// Which derived form of a glyph mesh to return.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum MeshVariant {
    #[default]
    Base,
    /// Skewed 15° to the right.
    Oblique,
    /// Mirrored vertically, for Y-down consumers.
    FlipY,
    /// Skewed, then mirrored.
    ObliqueFlipY,
}

impl MeshVariant {
    pub fn transform(self) -> Affine2 {
        match self {
            MeshVariant::Base => Affine2::IDENTITY,
            MeshVariant::Oblique => Affine2::skew_x(OBLIQUE_ANGLE_DEG.to_radians()),
            MeshVariant::FlipY => Affine2::scale(1.0, -1.0),
            MeshVariant::ObliqueFlipY => Affine2::scale(1.0, -1.0)
                .mul(Affine2::skew_x(OBLIQUE_ANGLE_DEG.to_radians())),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("no cache scope set; call set_scope first")]
    NoScope,
}

/// Meshes of one scope.
#[derive(Debug, Default)]
struct GlyphMeshCollection {
    meshes: HashMap<(GlyphIndex, MeshVariant), Arc<ProcessedGlyph>>,
}

struct ActiveScope {
    key: CacheScope,
    typeface: Arc<dyn Typeface>,
}

pub struct GlyphMeshStore {
    collections: HashMap<CacheScope, GlyphMeshCollection>,
    builders: HashMap<TypefaceId, GlyphOutlineBuilder>,
    scope: Option<ActiveScope>,
    tess: TessTool,
    flattened: FlattenedOutline,
    build_count: usize,
}

impl Default for GlyphMeshStore {
    fn default() -> Self {
        Self::new(TessellateOptions::default())
    }
}

impl GlyphMeshStore {
    pub fn new(options: TessellateOptions) -> Self {
        Self {
            collections: HashMap::new(),
            builders: HashMap::new(),
            scope: None,
            tess: TessTool::new(options),
            flattened: FlattenedOutline::default(),
            build_count: 0,
        }
    }

    /// Select the scope subsequent requests are served from.
    ///
    /// Unscaled meshes are never hinted, so every hint maps to the same
    /// unscaled scope.
    pub fn set_scope(&mut self, typeface: Arc<dyn Typeface>, size: FontSize, hint: HintTechnique) {
        let key = CacheScope {
            typeface: typeface.id(),
            size,
            hint: size.effective_hint(hint),
        };
        if self.scope.as_ref().is_some_and(|s| s.key == key) {
            return;
        }
        log::debug!("glyph mesh scope: {key:?}");
        self.collections.entry(key).or_default();
        self.scope = Some(ActiveScope { key, typeface });
    }

    pub fn scope(&self) -> Option<CacheScope> {
        self.scope.as_ref().map(|s| s.key)
    }

    /// Base mesh of `glyph` in the current scope, built on first request.
    pub fn get_or_build(&mut self, glyph: GlyphIndex) -> Result<Arc<ProcessedGlyph>, MeshError> {
        self.get_variant(glyph, MeshVariant::Base)
    }

    pub fn get_variant(
        &mut self,
        glyph: GlyphIndex,
        variant: MeshVariant,
    ) -> Result<Arc<ProcessedGlyph>, MeshError> {
        let key = self.scope.as_ref().ok_or(MeshError::NoScope)?.key;
        if let Some(found) = self.cached(key, glyph, variant) {
            return Ok(found);
        }

        let mesh = match variant {
            MeshVariant::Base => Arc::new(self.build(glyph)?),
            _ => {
                let base = self.get_variant(glyph, MeshVariant::Base)?;
                Arc::new(base.transformed(variant.transform()))
            }
        };

        self.collections
            .entry(key)
            .or_default()
            .meshes
            .insert((glyph, variant), Arc::clone(&mesh));
        Ok(mesh)
    }

    /// Bounds and auto-fit offset of `glyph` in the current scope.
    pub fn control_parameters(
        &mut self,
        glyph: GlyphIndex,
    ) -> Result<GlyphControlParameters, MeshError> {
        Ok(self.get_or_build(glyph)?.control)
    }

    /// Build the outline path of `glyph` in the current scope without caching.
    pub fn build_uncached_outline(&mut self, glyph: GlyphIndex) -> Result<Option<Path>, MeshError> {
        let scope = self.scope.as_ref().ok_or(MeshError::NoScope)?;
        let builder = self
            .builders
            .entry(scope.key.typeface)
            .or_insert_with(|| GlyphOutlineBuilder::new(scope.key.hint));
        builder.set_hint(scope.key.hint);
        Ok(builder
            .build(scope.typeface.as_ref(), glyph, scope.key.size)
            .map(|o| o.path))
    }

    /// Drop every cached mesh and builder. The current scope stays selected.
    pub fn clear(&mut self) {
        self.collections.clear();
        self.builders.clear();
        if let Some(scope) = &self.scope {
            self.collections.entry(scope.key).or_default();
        }
    }

    /// Number of base meshes built since creation.
    #[inline]
    pub fn build_count(&self) -> usize {
        self.build_count
    }

    /// Cached meshes across all scopes.
    pub fn cached_len(&self) -> usize {
        self.collections.values().map(|c| c.meshes.len()).sum()
    }

    fn cached(
        &self,
        key: CacheScope,
        glyph: GlyphIndex,
        variant: MeshVariant,
    ) -> Option<Arc<ProcessedGlyph>> {
        self.collections
            .get(&key)?
            .meshes
            .get(&(glyph, variant))
            .cloned()
    }

    fn build(&mut self, glyph: GlyphIndex) -> Result<ProcessedGlyph, MeshError> {
        let scope = self.scope.as_ref().ok_or(MeshError::NoScope)?;
        let builder = self
            .builders
            .entry(scope.key.typeface)
            .or_insert_with(|| GlyphOutlineBuilder::new(scope.key.hint));
        builder.set_hint(scope.key.hint);

        self.build_count += 1;
        Ok(build_mesh(
            builder,
            &mut self.tess,
            &mut self.flattened,
            scope.typeface.as_ref(),
            glyph,
            scope.key.size,
        ))
    }
}

/// Outline → flatten → tessellate for one glyph.
///
/// Glyphs without contours yield an empty mesh silently; contours that
/// tessellate to nothing are logged.
pub fn build_mesh(
    builder: &mut GlyphOutlineBuilder,
    tess: &mut TessTool,
    flattened: &mut FlattenedOutline,
    typeface: &dyn Typeface,
    glyph: GlyphIndex,
    size: FontSize,
) -> ProcessedGlyph {
    let Some(outline) = builder.build(typeface, glyph, size) else {
        log::trace!("glyph {glyph} has no outline");
        return ProcessedGlyph::empty(GlyphControlParameters::default());
    };

    flatten_into(&outline.path, tess.options().tolerance, flattened);
    let tess_data = match tess.tessellate(flattened) {
        Ok(data) => data,
        Err(err) => {
            log::warn!("glyph {glyph}: tessellation failed: {err}");
            Vec::new()
        }
    };

    if tess_data.is_empty() {
        log::warn!("glyph {glyph}: outline produced no triangles");
        return ProcessedGlyph::empty(outline.control);
    }

    log::trace!("glyph {glyph}: {} triangles", tess_data.len() / 6);
    ProcessedGlyph {
        vertex_count: tess_data.len() / 2,
        tess_data,
        control: outline.control,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::memory::{MemoryTypeface, rect};

    fn face() -> Arc<dyn Typeface> {
        Arc::new(
            MemoryTypeface::builder(1000)
                .glyph('I', 300, |b| rect(b, 100.0, 0.0, 200.0, 700.0))
                .glyph('-', 300, |b| rect(b, 50.0, 300.0, 250.0, 360.0))
                .empty_glyph(' ', 250)
                .build(),
        )
    }

    fn store_for(face: &Arc<dyn Typeface>) -> GlyphMeshStore {
        let mut store = GlyphMeshStore::default();
        store.set_scope(Arc::clone(face), FontSize::Points(12.0), HintTechnique::None);
        store
    }

    #[test]
    fn requests_without_scope_fail() {
        let mut store = GlyphMeshStore::default();
        assert_eq!(store.get_or_build(1).unwrap_err(), MeshError::NoScope);
        assert_eq!(store.build_uncached_outline(1).unwrap_err(), MeshError::NoScope);
    }

    #[test]
    fn repeated_requests_share_one_build() {
        let face = face();
        let mut store = store_for(&face);
        let a = store.get_or_build(1).unwrap();
        let b = store.get_or_build(1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.build_count(), 1);
        assert_eq!(a.vertex_count, 6);
        assert_eq!(a.tess_data.len(), 12);
    }

    #[test]
    fn scope_change_builds_fresh_meshes() {
        let face = face();
        let mut store = store_for(&face);
        let small = store.get_or_build(1).unwrap();

        store.set_scope(Arc::clone(&face), FontSize::Points(24.0), HintTechnique::None);
        let large = store.get_or_build(1).unwrap();
        assert!(!Arc::ptr_eq(&small, &large));
        assert_eq!(store.build_count(), 2);
        let w = |g: &ProcessedGlyph| g.control.bounds.size()[0];
        assert!((w(&large) - 2.0 * w(&small)).abs() < 1e-3);

        // Switching back finds the old entry under its own key.
        store.set_scope(Arc::clone(&face), FontSize::Points(12.0), HintTechnique::None);
        let again = store.get_or_build(1).unwrap();
        assert!(Arc::ptr_eq(&small, &again));
        assert_eq!(store.build_count(), 2);
    }

    #[test]
    fn hint_is_part_of_the_scope() {
        let face = face();
        let mut store = store_for(&face);
        let plain = store.get_or_build(2).unwrap();
        store.set_scope(Arc::clone(&face), FontSize::Points(12.0), HintTechnique::TrueTypeInstruction);
        let hinted = store.get_or_build(2).unwrap();
        assert!(!Arc::ptr_eq(&plain, &hinted));
        assert_eq!(store.scope().map(|s| s.hint), Some(HintTechnique::TrueTypeInstruction));
    }

    #[test]
    fn hint_does_not_split_unscaled_scopes() {
        let face = face();
        let mut store = GlyphMeshStore::default();
        store.set_scope(Arc::clone(&face), FontSize::Unscaled, HintTechnique::None);
        let plain = store.get_or_build(2).unwrap();

        store.set_scope(Arc::clone(&face), FontSize::Unscaled, HintTechnique::CustomAutoFit);
        assert_eq!(store.scope().map(|s| s.hint), Some(HintTechnique::None));
        let again = store.get_or_build(2).unwrap();
        assert!(Arc::ptr_eq(&plain, &again));
        assert_eq!(store.build_count(), 1);
    }

    #[test]
    fn variants_are_derived_once_from_base() {
        let face = face();
        let mut store = store_for(&face);
        let base = store.get_or_build(1).unwrap();
        let oblique = store.get_variant(1, MeshVariant::Oblique).unwrap();
        let oblique_again = store.get_variant(1, MeshVariant::Oblique).unwrap();
        let flipped = store.get_variant(1, MeshVariant::FlipY).unwrap();
        assert!(Arc::ptr_eq(&oblique, &oblique_again));
        assert_eq!(store.build_count(), 1);

        // Baseline stays put, the top leans right by height * tan(15°).
        let h = base.control.bounds.max[1];
        let lean = oblique.control.bounds.max[0] - base.control.bounds.max[0];
        assert!((lean - h * OBLIQUE_ANGLE_DEG.to_radians().tan()).abs() < 1e-3);

        assert_eq!(flipped.control.bounds.min[1], -base.control.bounds.max[1]);
        assert_eq!(flipped.vertex_count, base.vertex_count);
    }

    #[test]
    fn variant_first_still_builds_base_once() {
        let face = face();
        let mut store = store_for(&face);
        store.get_variant(1, MeshVariant::FlipY).unwrap();
        store.get_or_build(1).unwrap();
        assert_eq!(store.build_count(), 1);
        assert_eq!(store.cached_len(), 2);
    }

    #[test]
    fn empty_glyph_is_cached_as_empty() {
        let face = face();
        let mut store = store_for(&face);
        let space = store.get_or_build(3).unwrap();
        assert!(space.is_empty());
        store.get_or_build(3).unwrap();
        assert_eq!(store.build_count(), 1);
    }

    #[test]
    fn uncached_outline_does_not_touch_cache() {
        let face = face();
        let mut store = store_for(&face);
        assert!(store.build_uncached_outline(1).unwrap().is_some());
        assert!(store.build_uncached_outline(3).unwrap().is_none());
        assert_eq!(store.build_count(), 0);
        assert_eq!(store.cached_len(), 0);
    }

    #[test]
    fn clear_forces_rebuild() {
        let face = face();
        let mut store = store_for(&face);
        let a = store.get_or_build(1).unwrap();
        store.clear();
        let b = store.get_or_build(1).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*a, *b);
        assert_eq!(store.build_count(), 2);
    }

    #[test]
    fn control_parameters_report_bounds() {
        let face = face();
        let mut store = store_for(&face);
        let control = store.control_parameters(1).unwrap();
        // 12pt at 1000 upm = 0.016 px per unit.
        assert!((control.bounds.min[0] - 1.6).abs() < 1e-4);
        assert!((control.bounds.max[1] - 11.2).abs() < 1e-4);
    }
}
