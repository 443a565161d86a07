//! Text printer: layout + glyph meshes for a run of text.
//!
//! `TextPrinter` ties a `GlyphLayout` to a `GlyphMeshStore` under one
//! `PrinterConfig`. It fills a caller-owned `TextRun` with one `GlyphRun` per
//! laid-out glyph; the run can then be assembled into a single `Mesh2D`.

use std::sync::Arc;

use crate::config::PrinterConfig;
use crate::font::Typeface;
use crate::font::outline::HintTechnique;
use crate::font::tessellate::{FrontFace, Winding};
use crate::layout::{GlyphLayout, LayoutError, MeasuredStringBox, UnscaledGlyphPlan};
use crate::mesh::{GlyphMeshStore, MeshError, ProcessedGlyph};
use crate::scene::{Affine2, Mesh2D};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PrinterError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// A laid-out glyph and its mesh.
#[derive(Debug, Clone)]
pub struct GlyphRun {
    pub plan: UnscaledGlyphPlan,
    pub mesh: Arc<ProcessedGlyph>,
}

/// Glyphs of one `generate_glyph_runs` call, in input order.
#[derive(Debug, Clone)]
pub struct TextRun {
    glyphs: Vec<GlyphRun>,
    /// Font units to pixels, for advances and offsets.
    px_scale: f32,
    /// Mesh units to pixels.
    mesh_scale: f32,
    flip_y: bool,
}

impl Default for TextRun {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRun {
    pub fn new() -> Self {
        Self {
            glyphs: Vec::new(),
            px_scale: 1.0,
            mesh_scale: 1.0,
            flip_y: false,
        }
    }

    pub fn clear(&mut self) {
        self.glyphs.clear();
    }

    #[inline]
    pub fn glyphs(&self) -> &[GlyphRun] {
        &self.glyphs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    #[inline]
    pub fn px_scale(&self) -> f32 {
        self.px_scale
    }

    #[inline]
    pub fn mesh_scale(&self) -> f32 {
        self.mesh_scale
    }

    /// Pen position of every glyph in pixels, starting at the origin.
    pub fn positions(&self) -> Vec<[f32; 2]> {
        let y_sign = if self.flip_y { -1.0 } else { 1.0 };
        let mut pen_x = 0i64;
        self.glyphs
            .iter()
            .map(|g| {
                let x = (pen_x + g.plan.offset_x as i64) as f32 * self.px_scale;
                let y = g.plan.offset_y as f32 * self.px_scale * y_sign;
                pen_x += g.plan.advance_x as i64;
                [x, y]
            })
            .collect()
    }

    /// Total advance in pixels.
    pub fn width(&self) -> f32 {
        let advance: i64 = self.glyphs.iter().map(|g| g.plan.advance_x as i64).sum();
        advance as f32 * self.px_scale
    }

    pub fn triangle_count(&self) -> usize {
        self.glyphs.iter().map(|g| g.mesh.triangle_count()).sum()
    }

    /// Assemble every glyph into one indexed mesh in pixels.
    ///
    /// Index order is chosen per glyph so every triangle faces `front`.
    pub fn build_mesh(&self, front: FrontFace) -> Mesh2D {
        let mut mesh = Mesh2D::default();
        mesh.positions.reserve(self.glyphs.iter().map(|g| g.mesh.vertex_count).sum());
        mesh.indices.reserve(self.triangle_count() * 3);

        for (glyph, [x, y]) in self.glyphs.iter().zip(self.positions()) {
            let Some(winding) = Winding::of_first_triangle(&glyph.mesh.tess_data) else {
                continue;
            };
            let xf = Affine2::translate(x, y).mul(Affine2::scale(self.mesh_scale, self.mesh_scale));

            let base = mesh.positions.len() as u32;
            for p in glyph.mesh.tess_data.chunks_exact(2) {
                let (px, py) = xf.transform_point(p[0], p[1]);
                mesh.positions.push([px, py]);
            }
            for t in 0..glyph.mesh.triangle_count() as u32 {
                mesh.indices
                    .extend_from_slice(&front.triangle_indices(base + 3 * t, winding));
            }
        }
        mesh
    }
}

pub struct TextPrinter {
    config: PrinterConfig,
    layout: GlyphLayout,
    store: GlyphMeshStore,
    typeface: Option<Arc<dyn Typeface>>,
}

impl TextPrinter {
    pub fn new(config: PrinterConfig) -> Self {
        let mut layout = GlyphLayout::new();
        layout.set_script_lang(config.script_lang());
        layout.set_position_technique(config.position_technique);
        layout.set_enable_ligature(config.enable_ligature);
        layout.set_break_options(config.break_options);

        Self {
            store: GlyphMeshStore::new(config.tessellate_options()),
            config,
            layout,
            typeface: None,
        }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn typeface(&self) -> Option<&Arc<dyn Typeface>> {
        self.typeface.as_ref()
    }

    pub fn layout(&self) -> &GlyphLayout {
        &self.layout
    }

    pub fn store(&self) -> &GlyphMeshStore {
        &self.store
    }

    pub fn set_typeface(&mut self, typeface: Arc<dyn Typeface>) {
        self.layout.set_typeface(Arc::clone(&typeface));

        match typeface.gsub() {
            Some(gsub) if !self.config.features.is_empty() => {
                let features = gsub.features_with_toggles(
                    &self.config.script_lang(),
                    self.config.enable_ligature,
                    &self.config.features,
                );
                log::debug!("feature toggles {:?} -> {features:?}", self.config.features);
                self.layout.set_features(features);
            }
            _ => self.layout.clear_features(),
        }

        self.typeface = Some(typeface);
        self.refresh_scope();
    }

    pub fn set_font_size(&mut self, size_pt: f32) {
        self.config.font_size_pt = size_pt;
        self.refresh_scope();
    }

    pub fn set_hint(&mut self, hint: HintTechnique) {
        self.config.hint_technique = hint;
        self.refresh_scope();
    }

    /// Lay out `chars[start..start + len]` and fill `run` with glyph meshes.
    pub fn generate_glyph_runs(
        &mut self,
        chars: &[u16],
        start: usize,
        len: usize,
        run: &mut TextRun,
    ) -> Result<(), PrinterError> {
        run.clear();
        let typeface = self.typeface.as_ref().ok_or(LayoutError::NoTypeface)?;

        let px_scale = typeface.scale_to_pixel_from_point_size(self.config.font_size_pt);
        run.px_scale = px_scale;
        run.mesh_scale = px_scale / self.config.cache_font_size().pixel_scale(typeface.as_ref());
        run.flip_y = self.config.flip_y;

        let variant = self.config.mesh_variant();
        let out = self.layout.layout(chars, start, len)?;
        run.glyphs.reserve(out.plans.len());
        for plan in out.plans {
            let mesh = self.store.get_variant(plan.glyph_index, variant)?;
            run.glyphs.push(GlyphRun { plan: *plan, mesh });
        }
        Ok(())
    }

    /// Pixel extent of `chars[start..start + len]` at the configured size.
    pub fn measure(
        &mut self,
        chars: &[u16],
        start: usize,
        len: usize,
    ) -> Result<MeasuredStringBox, PrinterError> {
        Ok(self
            .layout
            .layout_and_measure(chars, start, len, self.config.font_size_pt)?)
    }

    fn refresh_scope(&mut self) {
        if let Some(typeface) = &self.typeface {
            self.store.set_scope(
                Arc::clone(typeface),
                self.config.cache_font_size(),
                self.config.cache_hint(),
            );
        }
    }
}
