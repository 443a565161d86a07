//! Glyph outline extraction.
//!
//! A `Typeface` streams a glyph's contours through the `ttf_parser::OutlineBuilder`
//! callbacks (composites already resolved). `OutlineRecorder` captures them in
//! font units; `GlyphOutlineBuilder` then scales to pixels, applies the hint
//! technique and emits a `lyon::path::Path`.
//!
//! Coordinates stay Y-up (font convention). Flipping for screen space is a
//! mesh variant, see `mesh::MeshVariant::FlipY`.

use std::hash::{Hash, Hasher};

use lyon::math::point;
use lyon::path::Path;
use serde::{Deserialize, Serialize};

use crate::font::{GlyphIndex, Typeface};
use crate::scene::Aabb2;

/// Grid-fitting applied to outlines before flattening.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintTechnique {
    /// Outline used as designed.
    #[default]
    None,
    /// Snap x and y to the pixel grid.
    TrueTypeInstruction,
    /// Snap y only; horizontal positions keep subpixel precision.
    TrueTypeInstructionVerticalOnly,
    /// Snap y, then shift the glyph so its vertical stems land on pixel edges
    /// on average.
    CustomAutoFit,
}

/// Size at which outlines are resolved.
///
/// `Unscaled` keeps font units; meshes built that way are scaled at assembly
/// and are never hinted (there is no pixel grid to fit).
#[derive(Debug, Copy, Clone, Default)]
pub enum FontSize {
    #[default]
    Unscaled,
    Points(f32),
}

impl FontSize {
    /// Font units → output units.
    pub fn pixel_scale(self, typeface: &dyn Typeface) -> f32 {
        match self {
            FontSize::Unscaled => 1.0,
            FontSize::Points(pt) => typeface.scale_to_pixel_from_point_size(pt),
        }
    }

    /// The hint actually applied at this size.
    #[inline]
    pub fn effective_hint(self, hint: HintTechnique) -> HintTechnique {
        match self {
            FontSize::Unscaled => HintTechnique::None,
            FontSize::Points(_) => hint,
        }
    }

    fn key(self) -> Option<u32> {
        match self {
            FontSize::Unscaled => None,
            FontSize::Points(pt) => Some(pt.to_bits()),
        }
    }
}

impl PartialEq for FontSize {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FontSize {}

impl Hash for FontSize {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// One recorded outline callback.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum OutlineCommand {
    MoveTo([f32; 2]),
    LineTo([f32; 2]),
    QuadTo([f32; 2], [f32; 2]),
    CurveTo([f32; 2], [f32; 2], [f32; 2]),
    Close,
}

impl OutlineCommand {
    fn for_each_point(&mut self, mut f: impl FnMut(&mut [f32; 2])) {
        match self {
            OutlineCommand::MoveTo(p) | OutlineCommand::LineTo(p) => f(p),
            OutlineCommand::QuadTo(c, p) => {
                f(c);
                f(p);
            }
            OutlineCommand::CurveTo(c1, c2, p) => {
                f(c1);
                f(c2);
                f(p);
            }
            OutlineCommand::Close => {}
        }
    }

    fn end_point(&self) -> Option<[f32; 2]> {
        match *self {
            OutlineCommand::MoveTo(p)
            | OutlineCommand::LineTo(p)
            | OutlineCommand::QuadTo(_, p)
            | OutlineCommand::CurveTo(_, _, p) => Some(p),
            OutlineCommand::Close => None,
        }
    }
}

/// Captures outline callbacks into a reusable command buffer.
#[derive(Debug, Clone, Default)]
pub struct OutlineRecorder {
    commands: Vec<OutlineCommand>,
}

impl OutlineRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[OutlineCommand] {
        &self.commands
    }
}

impl ttf_parser::OutlineBuilder for OutlineRecorder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(OutlineCommand::MoveTo([x, y]));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(OutlineCommand::LineTo([x, y]));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.commands.push(OutlineCommand::QuadTo([x1, y1], [x, y]));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.commands
            .push(OutlineCommand::CurveTo([x1, y1], [x2, y2], [x, y]));
    }

    fn close(&mut self) {
        self.commands.push(OutlineCommand::Close);
    }
}

/// Layout-relevant numbers derived while building an outline.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphControlParameters {
    /// Outline bounds in output units, control points included.
    pub bounds: Aabb2,
    /// Horizontal shift applied by `CustomAutoFit`, 0 otherwise.
    pub avg_x_offset_to_fit: f32,
}

impl Default for GlyphControlParameters {
    fn default() -> Self {
        Self {
            bounds: Aabb2::empty(),
            avg_x_offset_to_fit: 0.0,
        }
    }
}

/// A glyph outline resolved at one size and hint technique.
#[derive(Debug, Clone)]
pub struct GlyphOutline {
    pub path: Path,
    pub control: GlyphControlParameters,
}

/// Builds outlines for one typeface, reusing its recording buffer.
#[derive(Debug, Clone, Default)]
pub struct GlyphOutlineBuilder {
    hint: HintTechnique,
    recorder: OutlineRecorder,
}

/// Stem edges shorter than this (in pixels) do not vote in `CustomAutoFit`.
const MIN_STEM_EDGE_PX: f32 = 0.5;

impl GlyphOutlineBuilder {
    pub fn new(hint: HintTechnique) -> Self {
        Self {
            hint,
            recorder: OutlineRecorder::new(),
        }
    }

    #[inline]
    pub fn hint(&self) -> HintTechnique {
        self.hint
    }

    pub fn set_hint(&mut self, hint: HintTechnique) {
        self.hint = hint;
    }

    /// Resolve `glyph` at `size`. `None` when the glyph has no contours.
    pub fn build(
        &mut self,
        typeface: &dyn Typeface,
        glyph: GlyphIndex,
        size: FontSize,
    ) -> Option<GlyphOutline> {
        self.recorder.clear();
        if !typeface.outline_glyph(glyph, &mut self.recorder) || self.recorder.is_empty() {
            return None;
        }

        let scale = size.pixel_scale(typeface);
        let commands = &mut self.recorder.commands;
        for cmd in commands.iter_mut() {
            cmd.for_each_point(|p| {
                p[0] *= scale;
                p[1] *= scale;
            });
        }

        let avg_x_offset_to_fit = apply_hint(commands, size.effective_hint(self.hint));

        let mut bounds = Aabb2::empty();
        for cmd in commands.iter_mut() {
            cmd.for_each_point(|p| bounds.include_point(*p));
        }

        Some(GlyphOutline {
            path: path_from_commands(commands),
            control: GlyphControlParameters {
                bounds,
                avg_x_offset_to_fit,
            },
        })
    }
}

/// Grid-fit `commands` in place; returns the horizontal auto-fit shift.
fn apply_hint(commands: &mut [OutlineCommand], hint: HintTechnique) -> f32 {
    match hint {
        HintTechnique::None => 0.0,
        HintTechnique::TrueTypeInstruction => {
            for cmd in commands.iter_mut() {
                cmd.for_each_point(|p| *p = [p[0].round(), p[1].round()]);
            }
            0.0
        }
        HintTechnique::TrueTypeInstructionVerticalOnly => {
            for cmd in commands.iter_mut() {
                cmd.for_each_point(|p| p[1] = p[1].round());
            }
            0.0
        }
        HintTechnique::CustomAutoFit => {
            let dx = average_stem_offset(commands);
            for cmd in commands.iter_mut() {
                cmd.for_each_point(|p| *p = [p[0] + dx, p[1].round()]);
            }
            dx
        }
    }
}

/// Mean distance from each vertical line edge to its nearest pixel column.
fn average_stem_offset(commands: &[OutlineCommand]) -> f32 {
    let mut sum = 0.0;
    let mut count = 0u32;
    let mut current: Option<[f32; 2]> = None;
    let mut contour_start: Option<[f32; 2]> = None;

    let mut vote = |from: [f32; 2], to: [f32; 2]| {
        let vertical = (to[0] - from[0]).abs() < f32::EPSILON;
        if vertical && (to[1] - from[1]).abs() >= MIN_STEM_EDGE_PX {
            sum += from[0].round() - from[0];
            count += 1;
        }
    };

    for cmd in commands {
        match *cmd {
            OutlineCommand::MoveTo(p) => contour_start = Some(p),
            OutlineCommand::LineTo(p) => {
                if let Some(from) = current {
                    vote(from, p);
                }
            }
            OutlineCommand::Close => {
                if let (Some(from), Some(to)) = (current, contour_start) {
                    vote(from, to);
                }
            }
            _ => {}
        }
        current = cmd.end_point().or(current);
    }

    if count == 0 { 0.0 } else { sum / count as f32 }
}

/// Convert recorded commands into a lyon path, closing every contour.
fn path_from_commands(commands: &[OutlineCommand]) -> Path {
    let mut builder = Path::builder();
    let mut contour_open = false;

    for cmd in commands {
        match *cmd {
            OutlineCommand::MoveTo([x, y]) => {
                if contour_open {
                    builder.close();
                }
                builder.begin(point(x, y));
                contour_open = true;
            }
            OutlineCommand::LineTo([x, y]) => {
                if !contour_open {
                    builder.begin(point(x, y));
                    contour_open = true;
                } else {
                    builder.line_to(point(x, y));
                }
            }
            OutlineCommand::QuadTo([cx, cy], [x, y]) if contour_open => {
                builder.quadratic_bezier_to(point(cx, cy), point(x, y));
            }
            OutlineCommand::CurveTo([c1x, c1y], [c2x, c2y], [x, y]) if contour_open => {
                builder.cubic_bezier_to(point(c1x, c1y), point(c2x, c2y), point(x, y));
            }
            OutlineCommand::Close => {
                if contour_open {
                    builder.close();
                    contour_open = false;
                }
            }
            // A curve with no current point has nothing to start from.
            OutlineCommand::QuadTo(..) | OutlineCommand::CurveTo(..) => {}
        }
    }
    if contour_open {
        builder.close();
    }
    builder.build()
}
