//! `Typeface` backed by a font file parsed with `ttf-parser`.
//!
//! The face bytes are shared (`Arc<[u8]>`) and re-parsed per query; parsing
//! only reads table directories. GSUB is decoded once at load into the
//! crate's `LayoutTable` form. GPOS keeps only its script/feature/lookup
//! structure; pair values are read from the face when asked for.

use std::path::Path;
use std::sync::Arc;

use ttf_parser::gpos::{PairAdjustment as TtfPairAdjustment, PositioningSubtable, ValueRecord};
use ttf_parser::gsub::{
    LigatureSubstitution as TtfLigatures, MultipleSubstitution as TtfMultiple,
    SingleSubstitution as TtfSingle, SubstitutionSubtable,
};
use ttf_parser::opentype_layout::{self, Coverage};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::font::{
    FontError, FontVMetrics, GlyphAdjustment, GlyphIndex, PairAdjustment, Typeface, TypefaceId,
};
use crate::gsub::{
    FeatureRecord, LangSys, LayoutTable, LigatureSubstitution, Lookup, LookupIndex,
    LookupSubtable, MultipleSubstitution, ScriptRecord, SingleSubstitution,
};

#[derive(Debug, Clone)]
pub struct TtfTypeface {
    id: TypefaceId,
    bytes: Arc<[u8]>,
    index: u32,
    glyph_count: u16,
    v_metrics: FontVMetrics,
    gsub: Option<LayoutTable>,
    gpos: Option<LayoutTable>,
}

impl TtfTypeface {
    /// Parse face `index` of a font file or collection.
    pub fn from_bytes(bytes: Arc<[u8]>, index: u32) -> Result<Self, FontError> {
        let face = Face::parse(&bytes, index)?;

        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(FontError::InvalidUnitsPerEm);
        }

        // Prefer OS/2 typographic metrics, fall back to hhea.
        let v_metrics = FontVMetrics {
            units_per_em: units_per_em as f32,
            ascender: face.typographic_ascender().unwrap_or_else(|| face.ascender()) as f32,
            descender: face
                .typographic_descender()
                .unwrap_or_else(|| face.descender()) as f32,
            line_gap: face.typographic_line_gap().unwrap_or_else(|| face.line_gap()) as f32,
        };

        let glyph_count = face.number_of_glyphs();
        let gsub = face
            .tables()
            .gsub
            .map(|t| convert_layout_table(t, convert_substitution_lookup));
        let gpos = face
            .tables()
            .gpos
            .map(|t| convert_layout_table(t, |_| Lookup::default()));
        let id = TypefaceId::next();

        log::debug!(
            "loaded typeface {:?} (face {index}): {glyph_count} glyphs, {units_per_em} upm, gsub: {}, gpos: {}",
            id,
            gsub.is_some(),
            gpos.is_some()
        );

        Ok(Self {
            id,
            bytes,
            index,
            glyph_count,
            v_metrics,
            gsub,
            gpos,
        })
    }

    pub fn from_path(path: impl AsRef<Path>, index: u32) -> Result<Self, FontError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| FontError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(Arc::from(data), index)
    }

    #[inline]
    pub fn face_index(&self) -> u32 {
        self.index
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.bytes, self.index).ok()
    }
}

impl Typeface for TtfTypeface {
    fn id(&self) -> TypefaceId {
        self.id
    }

    fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    fn glyph_index(&self, ch: char) -> GlyphIndex {
        self.face()
            .and_then(|f| f.glyph_index(ch))
            .map_or(0, |g| g.0)
    }

    fn advance_width(&self, glyph: GlyphIndex) -> u16 {
        self.face()
            .and_then(|f| f.glyph_hor_advance(GlyphId(glyph)))
            .unwrap_or(0)
    }

    fn v_metrics(&self) -> FontVMetrics {
        self.v_metrics
    }

    fn outline_glyph(&self, glyph: GlyphIndex, builder: &mut dyn OutlineBuilder) -> bool {
        self.face()
            .and_then(|f| f.outline_glyph(GlyphId(glyph), builder))
            .is_some()
    }

    fn gsub(&self) -> Option<&LayoutTable> {
        self.gsub.as_ref()
    }

    fn gpos(&self) -> Option<&LayoutTable> {
        self.gpos.as_ref()
    }

    fn kerning(&self, left: GlyphIndex, right: GlyphIndex) -> i16 {
        let Some(face) = self.face() else {
            return 0;
        };
        let Some(kern) = face.tables().kern else {
            return 0;
        };
        kern.subtables
            .into_iter()
            .filter(|st| st.horizontal && !st.variable)
            .find_map(|st| st.glyphs_kerning(GlyphId(left), GlyphId(right)))
            .unwrap_or(0)
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
        let Some(gpos) = self.face().and_then(|f| f.tables().gpos) else {
            return PairAdjustment::default();
        };

        let (first, second) = (GlyphId(left), GlyphId(right));
        let mut out = PairAdjustment::default();
        for &index in lookups {
            let Some(lookup) = gpos.lookups.get(index) else {
                continue;
            };
            // The first subtable covering the pair wins within a lookup.
            let found = (0..lookup.subtables.len())
                .filter_map(|i| lookup.subtables.get::<PositioningSubtable<'_>>(i))
                .find_map(|subtable| match subtable {
                    PositioningSubtable::Pair(pair) => pair_values(pair, first, second),
                    _ => None,
                });
            if let Some(adjustment) = found {
                out.accumulate(adjustment);
            }
        }
        out
    }
}

fn pair_values(
    pair: TtfPairAdjustment<'_>,
    first: GlyphId,
    second: GlyphId,
) -> Option<PairAdjustment> {
    let (a, b) = match pair {
        TtfPairAdjustment::Format1 { coverage, sets } => {
            sets.get(coverage.get(first)?)?.get(second)?
        }
        TtfPairAdjustment::Format2 {
            coverage,
            classes,
            matrix,
        } => {
            coverage.get(first)?;
            matrix.get((classes.0.get(first), classes.1.get(second)))?
        }
    };
    Some(PairAdjustment {
        first: glyph_adjustment(&a),
        second: glyph_adjustment(&b),
    })
}

fn glyph_adjustment(record: &ValueRecord<'_>) -> GlyphAdjustment {
    GlyphAdjustment {
        x_placement: record.x_placement,
        y_placement: record.y_placement,
        x_advance: record.x_advance,
    }
}

fn convert_layout_table(
    table: opentype_layout::LayoutTable<'_>,
    convert_lookup: impl Fn(opentype_layout::Lookup<'_>) -> Lookup,
) -> LayoutTable {
    let convert_lang = |l: opentype_layout::LanguageSystem<'_>| LangSys {
        tag: l.tag,
        required_feature: l.required_feature,
        feature_indices: l.feature_indices.into_iter().collect(),
    };

    let scripts = table
        .scripts
        .into_iter()
        .map(|s| ScriptRecord {
            tag: s.tag,
            default_language: s.default_language.map(convert_lang),
            languages: s.languages.into_iter().map(convert_lang).collect(),
        })
        .collect();

    let features = table
        .features
        .into_iter()
        .map(|f| FeatureRecord {
            tag: f.tag,
            lookup_indices: f.lookup_indices.into_iter().collect(),
        })
        .collect();

    let lookups = table.lookups.into_iter().map(convert_lookup).collect();

    LayoutTable {
        scripts,
        features,
        lookups,
    }
}

fn convert_substitution_lookup(lookup: opentype_layout::Lookup<'_>) -> Lookup {
    Lookup {
        subtables: (0..lookup.subtables.len())
            .filter_map(|i| lookup.subtables.get::<SubstitutionSubtable<'_>>(i))
            .map(convert_subtable)
            .collect(),
    }
}

fn convert_subtable(subtable: SubstitutionSubtable<'_>) -> LookupSubtable {
    match subtable {
        SubstitutionSubtable::Single(s) => LookupSubtable::OneToOne(convert_single(s)),
        SubstitutionSubtable::Multiple(m) => LookupSubtable::OneToMany(convert_multiple(m)),
        SubstitutionSubtable::Ligature(l) => LookupSubtable::ManyToOne(convert_ligatures(l)),
        SubstitutionSubtable::Alternate(_) => LookupSubtable::Unsupported { lookup_type: 3 },
        SubstitutionSubtable::Context(_) => LookupSubtable::Unsupported { lookup_type: 5 },
        SubstitutionSubtable::ChainContext(_) => LookupSubtable::Unsupported { lookup_type: 6 },
        SubstitutionSubtable::ReverseChainSingle(_) => {
            LookupSubtable::Unsupported { lookup_type: 8 }
        }
    }
}

/// Covered glyphs paired with their coverage index, in table order.
fn coverage_glyphs(coverage: Coverage<'_>) -> Vec<(GlyphIndex, u16)> {
    match coverage {
        Coverage::Format1 { glyphs } => glyphs
            .into_iter()
            .enumerate()
            .map(|(i, g)| (g.0, i as u16))
            .collect(),
        Coverage::Format2 { records } => records
            .into_iter()
            .flat_map(|r| {
                (r.start.0..=r.end.0)
                    .map(move |g| (g, r.value.wrapping_add(g - r.start.0)))
            })
            .collect(),
    }
}

fn convert_single(table: TtfSingle<'_>) -> SingleSubstitution {
    match table {
        TtfSingle::Format1 { coverage, delta } => coverage_glyphs(coverage)
            .into_iter()
            .map(|(g, _)| (g, (g as i32 + delta as i32) as u16))
            .collect(),
        TtfSingle::Format2 {
            coverage,
            substitutes,
        } => coverage_glyphs(coverage)
            .into_iter()
            .filter_map(|(g, i)| substitutes.get(i).map(|to| (g, to.0)))
            .collect(),
    }
}

fn convert_multiple(table: TtfMultiple<'_>) -> MultipleSubstitution {
    let mut out = MultipleSubstitution::new();
    for (g, i) in coverage_glyphs(table.coverage) {
        if let Some(seq) = table.sequences.get(i) {
            out.insert(g, seq.substitutes.into_iter().map(|s| s.0).collect());
        }
    }
    out
}

fn convert_ligatures(table: TtfLigatures<'_>) -> LigatureSubstitution {
    let mut out = LigatureSubstitution::new();
    for (first, i) in coverage_glyphs(table.coverage) {
        let Some(set) = table.ligature_sets.get(i) else {
            continue;
        };
        for lig in set {
            let mut components = Vec::with_capacity(lig.components.len() as usize + 1);
            components.push(first);
            components.extend(lig.components.into_iter().map(|c| c.0));
            out.insert(components, lig.glyph.0);
        }
    }
    out
}
