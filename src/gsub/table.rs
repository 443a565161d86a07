//! In-memory glyph substitution tables.
//!
//! Mirrors the shape of an OpenType layout table (script → language system →
//! feature → lookup → subtables) with the subtables already decoded into
//! glyph mappings. Decoders (`font::ttf`) and hand-built fonts
//! (`font::memory`) both produce this form.

use std::collections::HashMap;

use ttf_parser::Tag;

use crate::font::GlyphIndex;

pub type FeatureIndex = u16;
pub type LookupIndex = u16;

/// The sentinel script used when a caller does not pick one.
pub const DEFAULT_SCRIPT: Tag = Tag::from_bytes(b"DFLT");

/// Script a `DFLT` request resolves to first.
pub const LATIN_SCRIPT: Tag = Tag::from_bytes(b"latn");

/// Features applied by default, regardless of the ligature toggle.
const DEFAULT_FEATURES: [Tag; 4] = [
    Tag::from_bytes(b"ccmp"),
    Tag::from_bytes(b"locl"),
    Tag::from_bytes(b"rlig"),
    Tag::from_bytes(b"calt"),
];

/// Positioning feature holding pair kerning.
pub const KERNING_FEATURE: Tag = Tag::from_bytes(b"kern");

/// Features applied only when ligatures are enabled.
const LIGATURE_FEATURES: [Tag; 2] = [Tag::from_bytes(b"liga"), Tag::from_bytes(b"clig")];

/// Build a tag from up to four ASCII characters, space padded.
pub fn tag_from_str(s: &str) -> Tag {
    let mut bytes = [b' '; 4];
    for (dst, src) in bytes.iter_mut().zip(s.bytes()) {
        *dst = src;
    }
    Tag::from_bytes(&bytes)
}

/// Script and optional language system used to pick features.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScriptLang {
    pub script: Tag,
    pub language: Option<Tag>,
}

impl Default for ScriptLang {
    fn default() -> Self {
        Self {
            script: DEFAULT_SCRIPT,
            language: None,
        }
    }
}

impl ScriptLang {
    pub fn new(script: &str) -> Self {
        Self {
            script: tag_from_str(script),
            language: None,
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(tag_from_str(language));
        self
    }
}

/// A glyph substitution table.
#[derive(Debug, Clone, Default)]
pub struct LayoutTable {
    pub scripts: Vec<ScriptRecord>,
    pub features: Vec<FeatureRecord>,
    pub lookups: Vec<Lookup>,
}

#[derive(Debug, Clone)]
pub struct ScriptRecord {
    pub tag: Tag,
    pub default_language: Option<LangSys>,
    pub languages: Vec<LangSys>,
}

#[derive(Debug, Clone)]
pub struct LangSys {
    pub tag: Tag,
    pub required_feature: Option<FeatureIndex>,
    pub feature_indices: Vec<FeatureIndex>,
}

#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub tag: Tag,
    pub lookup_indices: Vec<LookupIndex>,
}

#[derive(Debug, Clone, Default)]
pub struct Lookup {
    pub subtables: Vec<LookupSubtable>,
}

/// One decoded lookup subtable.
///
/// Every supported variant maps to exactly one edit shape of the glyph list.
#[derive(Debug, Clone)]
pub enum LookupSubtable {
    /// Single substitution: 1-for-1.
    OneToOne(SingleSubstitution),
    /// Ligature substitution: N-for-1.
    ManyToOne(LigatureSubstitution),
    /// Multiple substitution: 1-for-N.
    OneToMany(MultipleSubstitution),
    /// A lookup type this engine does not apply (alternate, contextual, ...).
    Unsupported { lookup_type: u16 },
}

impl LookupSubtable {
    /// Human-readable name of the OpenType lookup type.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::OneToOne(_) => "single",
            Self::ManyToOne(_) => "ligature",
            Self::OneToMany(_) => "multiple",
            Self::Unsupported { lookup_type } => match lookup_type {
                3 => "alternate",
                5 => "context",
                6 => "chained context",
                7 => "extension",
                8 => "reverse chained single",
                _ => "unknown",
            },
        }
    }
}

/// Glyph → glyph mapping kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SingleSubstitution {
    pairs: Vec<(GlyphIndex, GlyphIndex)>,
    index: HashMap<GlyphIndex, usize>,
}

impl SingleSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. The first rule for a source glyph wins.
    pub fn insert(&mut self, from: GlyphIndex, to: GlyphIndex) {
        if self.index.contains_key(&from) {
            return;
        }
        self.index.insert(from, self.pairs.len());
        self.pairs.push((from, to));
    }

    #[inline]
    pub fn get(&self, from: GlyphIndex) -> Option<GlyphIndex> {
        self.index.get(&from).map(|&i| self.pairs[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlyphIndex, GlyphIndex)> + '_ {
        self.pairs.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<(GlyphIndex, GlyphIndex)> for SingleSubstitution {
    fn from_iter<T: IntoIterator<Item = (GlyphIndex, GlyphIndex)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (from, to) in iter {
            table.insert(from, to);
        }
        table
    }
}

/// One ligature rule: the full component sequence (first glyph included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ligature {
    pub components: Vec<GlyphIndex>,
    pub glyph: GlyphIndex,
}

/// Glyph sequence → glyph rules, grouped by first component.
#[derive(Debug, Clone, Default)]
pub struct LigatureSubstitution {
    ligatures: Vec<Ligature>,
    by_first: HashMap<GlyphIndex, Vec<usize>>,
}

impl LigatureSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Empty component lists are ignored.
    pub fn insert(&mut self, components: Vec<GlyphIndex>, glyph: GlyphIndex) {
        let Some(&first) = components.first() else {
            return;
        };
        self.by_first
            .entry(first)
            .or_default()
            .push(self.ligatures.len());
        self.ligatures.push(Ligature { components, glyph });
    }

    /// Rules starting with `first`, in insertion order.
    pub fn candidates(&self, first: GlyphIndex) -> impl Iterator<Item = &Ligature> + '_ {
        self.by_first
            .get(&first)
            .into_iter()
            .flatten()
            .map(|&i| &self.ligatures[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ligature> + '_ {
        self.ligatures.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ligatures.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ligatures.is_empty()
    }
}

/// Glyph → glyph sequence mapping kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MultipleSubstitution {
    sequences: Vec<(GlyphIndex, Vec<GlyphIndex>)>,
    index: HashMap<GlyphIndex, usize>,
}

impl MultipleSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. The first rule for a source glyph wins.
    pub fn insert(&mut self, from: GlyphIndex, to: Vec<GlyphIndex>) {
        if self.index.contains_key(&from) {
            return;
        }
        self.index.insert(from, self.sequences.len());
        self.sequences.push((from, to));
    }

    #[inline]
    pub fn get(&self, from: GlyphIndex) -> Option<&[GlyphIndex]> {
        self.index
            .get(&from)
            .map(|&i| self.sequences[i].1.as_slice())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl LayoutTable {
    #[inline]
    pub fn lookup(&self, index: LookupIndex) -> Option<&Lookup> {
        self.lookups.get(index as usize)
    }

    #[inline]
    pub fn feature(&self, index: FeatureIndex) -> Option<&FeatureRecord> {
        self.features.get(index as usize)
    }

    /// Resolve the language system for a script/language pair.
    ///
    /// Falls back to the `DFLT` script and to the script's default language.
    /// A `DFLT` request means no script was picked: the `latn` script is
    /// used when the font has one, since many fonts keep `liga` only there.
    pub fn find_lang_sys(&self, script_lang: &ScriptLang) -> Option<&LangSys> {
        let preferred = if script_lang.script == DEFAULT_SCRIPT {
            LATIN_SCRIPT
        } else {
            script_lang.script
        };
        let script = self
            .script(preferred)
            .or_else(|| self.script(DEFAULT_SCRIPT))?;

        script_lang
            .language
            .and_then(|lang| script.languages.iter().find(|l| l.tag == lang))
            .or(script.default_language.as_ref())
    }

    fn script(&self, tag: Tag) -> Option<&ScriptRecord> {
        self.scripts.iter().find(|s| s.tag == tag)
    }

    /// Feature indices applied when the caller does not supply a list.
    pub fn default_features(
        &self,
        script_lang: &ScriptLang,
        enable_ligature: bool,
    ) -> Vec<FeatureIndex> {
        let mut out = Vec::new();
        self.default_features_into(script_lang, enable_ligature, &mut out);
        out
    }

    /// `default_features` into a reused buffer.
    pub fn default_features_into(
        &self,
        script_lang: &ScriptLang,
        enable_ligature: bool,
        out: &mut Vec<FeatureIndex>,
    ) {
        out.clear();
        let Some(lang_sys) = self.find_lang_sys(script_lang) else {
            return;
        };

        if let Some(required) = lang_sys.required_feature {
            out.push(required);
        }

        for &index in &lang_sys.feature_indices {
            let Some(feature) = self.feature(index) else {
                continue;
            };
            let wanted = DEFAULT_FEATURES.contains(&feature.tag)
                || (enable_ligature && LIGATURE_FEATURES.contains(&feature.tag));
            if wanted && !out.contains(&index) {
                out.push(index);
            }
        }
    }

    /// Features of the resolved language system whose tag is in `tags`, in
    /// language-system order.
    pub fn features_with_tags_into(
        &self,
        script_lang: &ScriptLang,
        tags: &[Tag],
        out: &mut Vec<FeatureIndex>,
    ) {
        out.clear();
        let Some(lang_sys) = self.find_lang_sys(script_lang) else {
            return;
        };
        out.extend(
            lang_sys
                .feature_indices
                .iter()
                .copied()
                .filter(|&i| self.feature(i).is_some_and(|f| tags.contains(&f.tag))),
        );
    }

    /// Apply tag toggles to the default feature set.
    ///
    /// Each entry is a feature tag, enabling it, or `-tag`, disabling it.
    /// Only features of the resolved language system are considered.
    pub fn features_with_toggles(
        &self,
        script_lang: &ScriptLang,
        enable_ligature: bool,
        toggles: &[String],
    ) -> Vec<FeatureIndex> {
        let mut out = self.default_features(script_lang, enable_ligature);
        let Some(lang_sys) = self.find_lang_sys(script_lang) else {
            return out;
        };

        for toggle in toggles {
            let (enable, name) = match toggle.strip_prefix('-') {
                Some(name) => (false, name),
                None => (true, toggle.strip_prefix('+').unwrap_or(toggle)),
            };
            let tag = tag_from_str(name);
            for &index in &lang_sys.feature_indices {
                if self.feature(index).is_none_or(|f| f.tag != tag) {
                    continue;
                }
                if enable && !out.contains(&index) {
                    out.push(index);
                } else if !enable {
                    out.retain(|&i| i != index);
                }
            }
        }
        out
    }

    /// Lookups referenced by `features`, in lookup-list order, each once.
    pub fn lookups_for_features(&self, features: &[FeatureIndex]) -> Vec<LookupIndex> {
        let mut out = Vec::new();
        self.lookups_for_features_into(features, &mut out);
        out
    }

    /// `lookups_for_features` into a reused buffer.
    pub fn lookups_for_features_into(
        &self,
        features: &[FeatureIndex],
        out: &mut Vec<LookupIndex>,
    ) {
        out.clear();
        out.extend(
            features
                .iter()
                .filter_map(|&f| self.feature(f))
                .flat_map(|f| f.lookup_indices.iter().copied())
                .filter(|&l| (l as usize) < self.lookups.len()),
        );
        out.sort_unstable();
        out.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_features(tags: &[&[u8; 4]]) -> LayoutTable {
        let features: Vec<FeatureRecord> = tags
            .iter()
            .enumerate()
            .map(|(i, t)| FeatureRecord {
                tag: Tag::from_bytes(t),
                lookup_indices: vec![(tags.len() - 1 - i) as u16],
            })
            .collect();
        let feature_indices = (0..features.len() as u16).collect();
        LayoutTable {
            scripts: vec![ScriptRecord {
                tag: Tag::from_bytes(b"latn"),
                default_language: Some(LangSys {
                    tag: Tag::from_bytes(b"dflt"),
                    required_feature: None,
                    feature_indices,
                }),
                languages: Vec::new(),
            }],
            features,
            lookups: vec![Lookup::default(); tags.len()],
        }
    }

    #[test]
    fn tag_from_short_str_is_space_padded() {
        assert_eq!(tag_from_str("kor"), Tag::from_bytes(b"kor "));
        assert_eq!(tag_from_str("latn"), Tag::from_bytes(b"latn"));
    }

    #[test]
    fn single_substitution_keeps_insertion_order_and_first_rule() {
        let table: SingleSubstitution = [(5, 9), (3, 4), (5, 1)].into_iter().collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(5), Some(9));
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![(5, 9), (3, 4)]);
    }

    #[test]
    fn ligature_candidates_follow_insertion_order() {
        let mut table = LigatureSubstitution::new();
        table.insert(vec![1, 2, 3], 10);
        table.insert(vec![1, 2], 11);
        table.insert(vec![], 12);
        table.insert(vec![7, 1], 13);
        let glyphs: Vec<_> = table.candidates(1).map(|l| l.glyph).collect();
        assert_eq!(glyphs, vec![10, 11]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.candidates(2).count(), 0);
    }

    #[test]
    fn default_features_honor_ligature_toggle() {
        let table = table_with_features(&[b"liga", b"smcp", b"ccmp"]);
        let sl = ScriptLang::new("latn");
        assert_eq!(table.default_features(&sl, true), vec![0, 2]);
        assert_eq!(table.default_features(&sl, false), vec![2]);
    }

    #[test]
    fn unknown_script_falls_back_to_dflt_or_nothing() {
        let mut table = table_with_features(&[b"liga"]);
        assert!(table.find_lang_sys(&ScriptLang::new("cyrl")).is_none());
        table.scripts[0].tag = DEFAULT_SCRIPT;
        assert!(table.find_lang_sys(&ScriptLang::new("cyrl")).is_some());
    }

    #[test]
    fn unpicked_script_prefers_latin_over_dflt() {
        // DFLT carries only ccmp, latn carries liga as well.
        let mut table = table_with_features(&[b"liga", b"ccmp"]);
        table.scripts.push(ScriptRecord {
            tag: DEFAULT_SCRIPT,
            default_language: Some(LangSys {
                tag: Tag::from_bytes(b"dflt"),
                required_feature: None,
                feature_indices: vec![1],
            }),
            languages: Vec::new(),
        });
        assert_eq!(table.default_features(&ScriptLang::default(), true), vec![0, 1]);
        // Scripts the font lacks still land on DFLT.
        assert_eq!(table.default_features(&ScriptLang::new("cyrl"), true), vec![1]);

        // Without a latn script, DFLT is used as is.
        table.scripts.remove(0);
        assert_eq!(table.default_features(&ScriptLang::default(), true), vec![1]);
    }

    #[test]
    fn resolution_into_reused_buffers_matches_fresh_results() {
        let table = table_with_features(&[b"liga", b"smcp", b"ccmp"]);
        let sl = ScriptLang::new("latn");
        let mut features: Vec<FeatureIndex> = vec![7, 7, 7];
        table.default_features_into(&sl, true, &mut features);
        assert_eq!(features, table.default_features(&sl, true));

        let mut lookups: Vec<LookupIndex> = Vec::with_capacity(8);
        let buffer = lookups.as_ptr();
        table.lookups_for_features_into(&features, &mut lookups);
        assert_eq!(lookups, table.lookups_for_features(&features));
        assert_eq!(lookups.as_ptr(), buffer);
    }

    #[test]
    fn feature_toggles_add_and_remove_by_tag() {
        let table = table_with_features(&[b"liga", b"smcp", b"ccmp"]);
        let sl = ScriptLang::new("latn");
        let toggles = ["smcp".to_string(), "-liga".to_string(), "zzzz".to_string()];
        assert_eq!(table.features_with_toggles(&sl, true, &toggles), vec![2, 1]);
        assert_eq!(table.features_with_toggles(&sl, true, &[]), vec![0, 2]);
    }

    #[test]
    fn features_are_picked_by_tag() {
        let table = table_with_features(&[b"mark", b"kern", b"liga"]);
        let mut out = vec![9];
        table.features_with_tags_into(&ScriptLang::new("latn"), &[KERNING_FEATURE], &mut out);
        assert_eq!(out, vec![1]);
        table.features_with_tags_into(&ScriptLang::new("latn"), &[], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn lookups_are_sorted_and_deduplicated() {
        let table = table_with_features(&[b"liga", b"ccmp", b"calt"]);
        assert_eq!(table.lookups_for_features(&[0, 1, 0, 2, 99]), vec![0, 1, 2]);
    }
}
