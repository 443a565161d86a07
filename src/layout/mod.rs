//! Glyph layout.
//!
//! Breaks a UTF-16 range into segments, maps each segment to glyphs, runs the
//! selected substitution lookups over the segment's glyph window and positions
//! the result as unscaled glyph plans (font units).
//!
//! `GlyphLayout` owns its workspace (glyph list, plans, groups) and reuses it
//! across calls, so it is not reentrant; results borrow the workspace.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::font::{GlyphAdjustment, GlyphIndex, Typeface, TypefaceId};
use crate::gsub::{
    FeatureIndex, GlyphIndexList, KERNING_FEATURE, LayoutTable, LookupIndex, ScriptLang,
    SubstitutionOutcome, substitute,
};
use crate::text_break::{BreakOptions, WordBreaker, WordKind};

/// One positioned glyph in font units.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UnscaledGlyphPlan {
    pub glyph_index: GlyphIndex,
    /// Pen advance after this glyph, kerning included.
    pub advance_x: i32,
    /// Placement relative to the pen, from pair positioning.
    pub offset_x: i16,
    pub offset_y: i16,
    /// Code-unit offset of the first character that produced this glyph.
    pub cluster: usize,
}

/// The plans produced by one breaker segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanGroup {
    pub kind: WordKind,
    /// Code units of the segment, in input-buffer offsets.
    pub char_range: Range<usize>,
    /// Indices into `LayoutOutput::plans`.
    pub plan_range: Range<usize>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionTechnique {
    /// Advances plus pair adjustments from the font's `kern` positioning
    /// feature, or its legacy `kern` table when there is none.
    #[default]
    TableDriven,
    /// Advances only.
    BuiltInMetrics,
}

/// Laid-out glyphs, borrowed from the layout workspace.
#[derive(Debug, Copy, Clone)]
pub struct LayoutOutput<'a> {
    pub plans: &'a [UnscaledGlyphPlan],
    pub groups: &'a [PlanGroup],
}

impl LayoutOutput<'_> {
    /// Sum of all advances, in font units.
    pub fn total_advance(&self) -> i64 {
        self.plans.iter().map(|p| p.advance_x as i64).sum()
    }

    pub fn group_plans(&self, group: &PlanGroup) -> &[UnscaledGlyphPlan] {
        &self.plans[group.plan_range.clone()]
    }
}

/// Extent of a laid-out string, in pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct MeasuredStringBox {
    pub width: f32,
    pub ascent: f32,
    /// Negative below the baseline.
    pub descent: f32,
    pub line_gap: f32,
}

impl MeasuredStringBox {
    #[inline]
    pub fn line_height(&self) -> f32 {
        self.ascent - self.descent + self.line_gap
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("no typeface set")]
    NoTypeface,

    #[error("range {start}..{start}+{len} is outside a buffer of {buffer_len} code units")]
    RangeOutOfBounds {
        start: usize,
        len: usize,
        buffer_len: usize,
    },
}

pub struct GlyphLayout {
    typeface: Option<Arc<dyn Typeface>>,
    script_lang: ScriptLang,
    position_technique: PositionTechnique,
    enable_ligature: bool,
    features: Option<Vec<FeatureIndex>>,
    breaker: WordBreaker,

    glyphs: GlyphIndexList,
    plans: Vec<UnscaledGlyphPlan>,
    groups: Vec<PlanGroup>,
    feature_scratch: Vec<FeatureIndex>,
    lookups: Vec<LookupIndex>,
    position_lookups: Vec<LookupIndex>,
    reported_unsupported: HashSet<(TypefaceId, LookupIndex)>,
}

impl Default for GlyphLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphLayout {
    pub fn new() -> Self {
        Self {
            typeface: None,
            script_lang: ScriptLang::default(),
            position_technique: PositionTechnique::default(),
            enable_ligature: true,
            features: None,
            breaker: WordBreaker::default(),
            glyphs: GlyphIndexList::new(),
            plans: Vec::new(),
            groups: Vec::new(),
            feature_scratch: Vec::new(),
            lookups: Vec::new(),
            position_lookups: Vec::new(),
            reported_unsupported: HashSet::new(),
        }
    }

    pub fn set_typeface(&mut self, typeface: Arc<dyn Typeface>) {
        self.typeface = Some(typeface);
    }

    pub fn typeface(&self) -> Option<&Arc<dyn Typeface>> {
        self.typeface.as_ref()
    }

    pub fn set_script_lang(&mut self, script_lang: ScriptLang) {
        self.script_lang = script_lang;
    }

    pub fn script_lang(&self) -> ScriptLang {
        self.script_lang
    }

    pub fn set_position_technique(&mut self, technique: PositionTechnique) {
        self.position_technique = technique;
    }

    pub fn position_technique(&self) -> PositionTechnique {
        self.position_technique
    }

    pub fn set_enable_ligature(&mut self, enable: bool) {
        self.enable_ligature = enable;
    }

    pub fn enable_ligature(&self) -> bool {
        self.enable_ligature
    }

    /// Apply exactly `features` instead of the script defaults.
    pub fn set_features(&mut self, features: Vec<FeatureIndex>) {
        self.features = Some(features);
    }

    /// Go back to the script's default features.
    pub fn clear_features(&mut self) {
        self.features = None;
    }

    pub fn features(&self) -> Option<&[FeatureIndex]> {
        self.features.as_deref()
    }

    pub fn set_break_options(&mut self, options: BreakOptions) {
        self.breaker.set_options(options);
    }

    /// Lay out `chars[start..start + len]`.
    pub fn layout(
        &mut self,
        chars: &[u16],
        start: usize,
        len: usize,
    ) -> Result<LayoutOutput<'_>, LayoutError> {
        let typeface = self.typeface.clone().ok_or(LayoutError::NoTypeface)?;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= chars.len())
            .ok_or(LayoutError::RangeOutOfBounds {
                start,
                len,
                buffer_len: chars.len(),
            })?;

        self.glyphs.clear();
        self.plans.clear();
        self.groups.clear();
        self.resolve_lookups(typeface.gsub());
        self.resolve_position_lookups(typeface.gpos());

        let text = &chars[start..end];
        for seg in self.breaker.breaks(text) {
            let glyph_start = self.glyphs.len();
            map_characters(
                typeface.as_ref(),
                &text[seg.range()],
                start + seg.start,
                &mut self.glyphs,
            );

            if let Some(gsub) = typeface.gsub() {
                self.substitute_window(typeface.id(), gsub, glyph_start);
            }

            let plan_start = self.plans.len();
            self.position(typeface.as_ref(), glyph_start);
            self.groups.push(PlanGroup {
                kind: seg.kind,
                char_range: start + seg.start..start + seg.end(),
                plan_range: plan_start..self.plans.len(),
            });
        }

        log::trace!(
            "laid out {len} code units into {} glyphs, {} groups",
            self.plans.len(),
            self.groups.len()
        );

        Ok(LayoutOutput {
            plans: &self.plans,
            groups: &self.groups,
        })
    }

    /// Lay out a range and report its pixel extent at `size_pt`.
    pub fn layout_and_measure(
        &mut self,
        chars: &[u16],
        start: usize,
        len: usize,
        size_pt: f32,
    ) -> Result<MeasuredStringBox, LayoutError> {
        let advance = self.layout(chars, start, len)?.total_advance();
        let typeface = self.typeface.as_ref().ok_or(LayoutError::NoTypeface)?;
        let scale = typeface.scale_to_pixel_from_point_size(size_pt);
        let metrics = typeface.v_metrics();
        Ok(MeasuredStringBox {
            width: advance as f32 * scale,
            ascent: metrics.ascender * scale,
            descent: metrics.descender * scale,
            line_gap: metrics.line_gap * scale,
        })
    }

    fn resolve_lookups(&mut self, gsub: Option<&LayoutTable>) {
        self.lookups.clear();
        let Some(gsub) = gsub else {
            return;
        };
        let features = match &self.features {
            Some(features) => features,
            None => {
                gsub.default_features_into(
                    &self.script_lang,
                    self.enable_ligature,
                    &mut self.feature_scratch,
                );
                &self.feature_scratch
            }
        };
        gsub.lookups_for_features_into(features, &mut self.lookups);
    }

    fn resolve_position_lookups(&mut self, gpos: Option<&LayoutTable>) {
        self.position_lookups.clear();
        let Some(gpos) = gpos else {
            return;
        };
        if self.position_technique != PositionTechnique::TableDriven {
            return;
        }
        gpos.features_with_tags_into(
            &self.script_lang,
            &[KERNING_FEATURE],
            &mut self.feature_scratch,
        );
        gpos.lookups_for_features_into(&self.feature_scratch, &mut self.position_lookups);
    }

    /// Run the selected lookups over the glyphs from `glyph_start` to the end.
    fn substitute_window(&mut self, typeface: TypefaceId, gsub: &LayoutTable, glyph_start: usize) {
        for &lookup_index in &self.lookups {
            let Some(lookup) = gsub.lookup(lookup_index) else {
                continue;
            };
            for subtable in &lookup.subtables {
                let window = self.glyphs.len() - glyph_start;
                if window == 0 {
                    return;
                }
                if let SubstitutionOutcome::Unsupported(msg) =
                    substitute(&mut self.glyphs, glyph_start, window, subtable)
                {
                    if self.reported_unsupported.insert((typeface, lookup_index)) {
                        log::warn!("lookup {lookup_index}: {msg}; skipped");
                    }
                }
            }
        }
    }

    fn position(&mut self, typeface: &dyn Typeface, glyph_start: usize) {
        let glyphs = &self.glyphs.glyphs()[glyph_start..];
        let clusters = &self.glyphs.clusters()[glyph_start..];

        for (&glyph, &cluster) in glyphs.iter().zip(clusters) {
            let mut plan = UnscaledGlyphPlan {
                glyph_index: glyph,
                advance_x: typeface.advance_width(glyph) as i32,
                offset_x: 0,
                offset_y: 0,
                cluster,
            };
            if self.position_technique == PositionTechnique::TableDriven {
                if let Some(prev) = self.plans.last_mut() {
                    let pair =
                        typeface.pair_adjustment(&self.position_lookups, prev.glyph_index, glyph);
                    adjust(prev, pair.first);
                    adjust(&mut plan, pair.second);
                }
            }
            self.plans.push(plan);
        }
    }
}

fn adjust(plan: &mut UnscaledGlyphPlan, by: GlyphAdjustment) {
    plan.advance_x += by.x_advance as i32;
    plan.offset_x = plan.offset_x.saturating_add(by.x_placement);
    plan.offset_y = plan.offset_y.saturating_add(by.y_placement);
}

/// Push the glyph of every character in `units`; lone surrogates map as U+FFFD.
fn map_characters(
    typeface: &dyn Typeface,
    units: &[u16],
    first_offset: usize,
    out: &mut GlyphIndexList,
) {
    let mut offset = first_offset;
    for decoded in char::decode_utf16(units.iter().copied()) {
        let (ch, width) = match decoded {
            Ok(ch) => (ch, ch.len_utf16()),
            Err(_) => (char::REPLACEMENT_CHARACTER, 1),
        };
        out.push(typeface.glyph_index(ch), offset);
        offset += width;
    }
}
