//! A typeface assembled in code.
//!
//! Glyph outlines are recorded through the same `OutlineBuilder` callbacks a
//! font file would produce. Composite glyphs reference other glyphs with an
//! affine placement and are resolved when streamed, so consumers see plain
//! contours either way.

use std::collections::HashMap;

use ttf_parser::OutlineBuilder;

use crate::font::outline::{OutlineCommand, OutlineRecorder};
use crate::font::{FontVMetrics, GlyphIndex, PairAdjustment, Typeface, TypefaceId};
use crate::gsub::{LayoutTable, LookupIndex};
use crate::scene::Affine2;

/// Composites nest at most this deep; deeper references are ignored.
const MAX_COMPOSITE_DEPTH: u32 = 8;

#[derive(Debug, Clone)]
enum GlyphShape {
    Empty,
    Simple(Vec<OutlineCommand>),
    Composite(Vec<(GlyphIndex, Affine2)>),
}

#[derive(Debug, Clone)]
struct MemoryGlyph {
    advance: u16,
    shape: GlyphShape,
}

#[derive(Debug)]
pub struct MemoryTypeface {
    id: TypefaceId,
    metrics: FontVMetrics,
    cmap: HashMap<char, GlyphIndex>,
    glyphs: Vec<MemoryGlyph>,
    kerning: HashMap<(GlyphIndex, GlyphIndex), i16>,
    gsub: Option<LayoutTable>,
    gpos: Option<LayoutTable>,
    positioning: HashMap<(LookupIndex, GlyphIndex, GlyphIndex), PairAdjustment>,
}

impl MemoryTypeface {
    /// Start a typeface with the given units per em. Glyph 0 is an empty
    /// `.notdef`; added glyphs are numbered from 1 in call order.
    pub fn builder(units_per_em: u16) -> MemoryTypefaceBuilder {
        MemoryTypefaceBuilder {
            metrics: FontVMetrics::default_for_upm(units_per_em as f32),
            cmap: HashMap::new(),
            glyphs: vec![MemoryGlyph {
                advance: units_per_em / 2,
                shape: GlyphShape::Empty,
            }],
            kerning: HashMap::new(),
            gsub: None,
            gpos: None,
            positioning: HashMap::new(),
        }
    }

    fn stream(
        &self,
        glyph: GlyphIndex,
        xf: Affine2,
        depth: u32,
        builder: &mut dyn OutlineBuilder,
    ) -> bool {
        let Some(g) = self.glyphs.get(glyph as usize) else {
            return false;
        };
        match &g.shape {
            GlyphShape::Empty => false,
            GlyphShape::Simple(commands) => {
                replay(commands, xf, builder);
                !commands.is_empty()
            }
            GlyphShape::Composite(parts) if depth < MAX_COMPOSITE_DEPTH => {
                let mut any = false;
                for &(component, placement) in parts {
                    any |= self.stream(component, xf.mul(placement), depth + 1, builder);
                }
                any
            }
            GlyphShape::Composite(_) => {
                log::warn!("composite glyph {glyph} nests deeper than {MAX_COMPOSITE_DEPTH}");
                false
            }
        }
    }
}

fn replay(commands: &[OutlineCommand], xf: Affine2, builder: &mut dyn OutlineBuilder) {
    let t = |p: [f32; 2]| xf.transform_point(p[0], p[1]);
    for cmd in commands {
        match *cmd {
            OutlineCommand::MoveTo(p) => {
                let (x, y) = t(p);
                builder.move_to(x, y);
            }
            OutlineCommand::LineTo(p) => {
                let (x, y) = t(p);
                builder.line_to(x, y);
            }
            OutlineCommand::QuadTo(c, p) => {
                let ((cx, cy), (x, y)) = (t(c), t(p));
                builder.quad_to(cx, cy, x, y);
            }
            OutlineCommand::CurveTo(c1, c2, p) => {
                let ((c1x, c1y), (c2x, c2y), (x, y)) = (t(c1), t(c2), t(p));
                builder.curve_to(c1x, c1y, c2x, c2y, x, y);
            }
            OutlineCommand::Close => builder.close(),
        }
    }
}

impl Typeface for MemoryTypeface {
    fn id(&self) -> TypefaceId {
        self.id
    }

    fn glyph_count(&self) -> u16 {
        self.glyphs.len() as u16
    }

    fn glyph_index(&self, ch: char) -> GlyphIndex {
        self.cmap.get(&ch).copied().unwrap_or(0)
    }

    fn advance_width(&self, glyph: GlyphIndex) -> u16 {
        self.glyphs.get(glyph as usize).map_or(0, |g| g.advance)
    }

    fn v_metrics(&self) -> FontVMetrics {
        self.metrics
    }

    fn outline_glyph(&self, glyph: GlyphIndex, builder: &mut dyn OutlineBuilder) -> bool {
        self.stream(glyph, Affine2::IDENTITY, 0, builder)
    }

    fn gsub(&self) -> Option<&LayoutTable> {
        self.gsub.as_ref()
    }

    fn gpos(&self) -> Option<&LayoutTable> {
        self.gpos.as_ref()
    }

    fn kerning(&self, left: GlyphIndex, right: GlyphIndex) -> i16 {
        self.kerning.get(&(left, right)).copied().unwrap_or(0)
    }

    fn pair_adjustment(
        &self,
        lookups: &[LookupIndex],
        left: GlyphIndex,
        right: GlyphIndex,
    ) -> PairAdjustment {
        if lookups.is_empty() {
            return PairAdjustment::from_kerning(self.kerning(left, right));
        }
        let mut out = PairAdjustment::default();
        for &lookup in lookups {
            if let Some(&adjustment) = self.positioning.get(&(lookup, left, right)) {
                out.accumulate(adjustment);
            }
        }
        out
    }
}

pub struct MemoryTypefaceBuilder {
    metrics: FontVMetrics,
    cmap: HashMap<char, GlyphIndex>,
    glyphs: Vec<MemoryGlyph>,
    kerning: HashMap<(GlyphIndex, GlyphIndex), i16>,
    gsub: Option<LayoutTable>,
    gpos: Option<LayoutTable>,
    positioning: HashMap<(LookupIndex, GlyphIndex, GlyphIndex), PairAdjustment>,
}

impl MemoryTypefaceBuilder {
    /// Index the next added glyph will get.
    pub fn next_glyph_index(&self) -> GlyphIndex {
        self.glyphs.len() as GlyphIndex
    }

    fn push(mut self, ch: Option<char>, advance: u16, shape: GlyphShape) -> Self {
        let index = self.next_glyph_index();
        self.glyphs.push(MemoryGlyph { advance, shape });
        if let Some(ch) = ch {
            self.cmap.insert(ch, index);
        }
        self
    }

    /// Add a glyph mapped from `ch`, drawn by `draw` in font units.
    pub fn glyph(self, ch: char, advance: u16, draw: impl FnOnce(&mut OutlineRecorder)) -> Self {
        let mut recorder = OutlineRecorder::new();
        draw(&mut recorder);
        let commands = recorder.commands().to_vec();
        self.push(Some(ch), advance, GlyphShape::Simple(commands))
    }

    /// Add a glyph reachable only by index (ligatures, alternates).
    pub fn unmapped_glyph(self, advance: u16, draw: impl FnOnce(&mut OutlineRecorder)) -> Self {
        let mut recorder = OutlineRecorder::new();
        draw(&mut recorder);
        let commands = recorder.commands().to_vec();
        self.push(None, advance, GlyphShape::Simple(commands))
    }

    /// Add a mapped glyph with no contours (spaces).
    pub fn empty_glyph(self, ch: char, advance: u16) -> Self {
        self.push(Some(ch), advance, GlyphShape::Empty)
    }

    /// Add a mapped glyph built from other glyphs placed by affine transforms.
    pub fn composite(self, ch: char, advance: u16, parts: &[(GlyphIndex, Affine2)]) -> Self {
        self.push(Some(ch), advance, GlyphShape::Composite(parts.to_vec()))
    }

    /// Pair adjustment between two mapped characters, in font units.
    pub fn kern(mut self, left: char, right: char, value: i16) -> Self {
        let l = self.cmap.get(&left).copied().unwrap_or(0);
        let r = self.cmap.get(&right).copied().unwrap_or(0);
        self.kerning.insert((l, r), value);
        self
    }

    pub fn metrics(mut self, ascender: f32, descender: f32, line_gap: f32) -> Self {
        self.metrics.ascender = ascender;
        self.metrics.descender = descender;
        self.metrics.line_gap = line_gap;
        self
    }

    pub fn gsub(mut self, table: LayoutTable) -> Self {
        self.gsub = Some(table);
        self
    }

    /// Positioning structure; its lookups need no subtables, pair values
    /// come from `pair_positioning`.
    pub fn gpos(mut self, table: LayoutTable) -> Self {
        self.gpos = Some(table);
        self
    }

    /// Pair adjustment between two mapped characters, owned by positioning
    /// lookup `lookup`.
    pub fn pair_positioning(
        mut self,
        lookup: LookupIndex,
        left: char,
        right: char,
        adjustment: PairAdjustment,
    ) -> Self {
        let l = self.cmap.get(&left).copied().unwrap_or(0);
        let r = self.cmap.get(&right).copied().unwrap_or(0);
        self.positioning.insert((lookup, l, r), adjustment);
        self
    }

    pub fn build(self) -> MemoryTypeface {
        MemoryTypeface {
            id: TypefaceId::next(),
            metrics: self.metrics,
            cmap: self.cmap,
            glyphs: self.glyphs,
            kerning: self.kerning,
            gsub: self.gsub,
            gpos: self.gpos,
            positioning: self.positioning,
        }
    }
}

/// Draw an axis-aligned rectangle contour.
pub fn rect(b: &mut OutlineRecorder, x0: f32, y0: f32, x1: f32, y1: f32) {
    b.move_to(x0, y0);
    b.line_to(x1, y0);
    b.line_to(x1, y1);
    b.line_to(x0, y1);
    b.close();
}
