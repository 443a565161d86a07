//! Glyph substitution engine.
//!
//! Rewrites a window of a `GlyphIndexList` in place according to one decoded
//! lookup subtable. Each supported subtable kind has exactly one edit shape:
//! - `OneToOne`  → `GlyphIndexList::replace`
//! - `ManyToOne` → `GlyphIndexList::replace_range`
//! - `OneToMany` → `GlyphIndexList::replace_with_many`
//!
//! After an edit the cursor is moved by the edit's net length delta so the scan
//! continues on the glyph that followed the replaced ones. Substituted glyphs
//! are not revisited by the same subtable.

mod glyph_list;
mod table;

pub use glyph_list::{GlyphCursor, GlyphIndexList};
pub use table::{
    DEFAULT_SCRIPT, FeatureIndex, FeatureRecord, KERNING_FEATURE, LATIN_SCRIPT, LangSys,
    LayoutTable, Ligature, LigatureSubstitution, Lookup, LookupIndex, LookupSubtable,
    MultipleSubstitution, ScriptLang, ScriptRecord, SingleSubstitution, tag_from_str,
};

/// Result of running one subtable over a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionOutcome {
    /// The subtable ran. `window_len` is the window's length after the edits.
    Applied { edits: usize, window_len: usize },
    /// The subtable kind is not implemented; nothing was changed.
    Unsupported(String),
}

/// Apply `subtable` to `glyphs[start..start + len]`.
///
/// The window is clamped to the list.
pub fn substitute(
    glyphs: &mut GlyphIndexList,
    start: usize,
    len: usize,
    subtable: &LookupSubtable,
) -> SubstitutionOutcome {
    let start = start.min(glyphs.len());
    let len = len.min(glyphs.len() - start);
    let mut cursor = GlyphCursor::new(start, len);

    let edits = match subtable {
        LookupSubtable::OneToOne(table) => {
            scan(glyphs, &mut cursor, |g, c| step_single(g, c, table))
        }
        LookupSubtable::ManyToOne(table) => {
            scan(glyphs, &mut cursor, |g, c| step_ligature(g, c, table))
        }
        LookupSubtable::OneToMany(table) => {
            scan(glyphs, &mut cursor, |g, c| step_multiple(g, c, table))
        }
        LookupSubtable::Unsupported { lookup_type } => {
            return SubstitutionOutcome::Unsupported(format!(
                "GSUB lookup type {lookup_type} ({}) is not supported",
                subtable.kind_name()
            ));
        }
    };

    SubstitutionOutcome::Applied {
        edits,
        window_len: cursor.end() - start,
    }
}

/// Drive `step` until the cursor leaves the window; returns the edit count.
fn scan(
    glyphs: &mut GlyphIndexList,
    cursor: &mut GlyphCursor,
    mut step: impl FnMut(&mut GlyphIndexList, &mut GlyphCursor) -> bool,
) -> usize {
    let mut edits = 0;
    while !cursor.is_done() {
        if step(glyphs, cursor) {
            edits += 1;
        }
    }
    edits
}

fn step_single(
    glyphs: &mut GlyphIndexList,
    cursor: &mut GlyphCursor,
    table: &SingleSubstitution,
) -> bool {
    let pos = cursor.pos();
    match glyphs.get(pos).and_then(|g| table.get(g)) {
        Some(to) => {
            glyphs.replace(pos, to);
            cursor.step_over_edit(1, 1);
            true
        }
        None => {
            cursor.advance(1);
            false
        }
    }
}

fn step_ligature(
    glyphs: &mut GlyphIndexList,
    cursor: &mut GlyphCursor,
    table: &LigatureSubstitution,
) -> bool {
    let pos = cursor.pos();
    let Some(first) = glyphs.get(pos) else {
        cursor.advance(1);
        return false;
    };

    let window = &glyphs.glyphs()[pos..cursor.end()];
    let matched = table
        .candidates(first)
        .find(|lig| window.starts_with(&lig.components))
        .map(|lig| (lig.components.len(), lig.glyph));

    match matched {
        Some((n, glyph)) => {
            glyphs.replace_range(pos, n, glyph);
            cursor.step_over_edit(n, 1);
            true
        }
        None => {
            cursor.advance(1);
            false
        }
    }
}

fn step_multiple(
    glyphs: &mut GlyphIndexList,
    cursor: &mut GlyphCursor,
    table: &MultipleSubstitution,
) -> bool {
    let pos = cursor.pos();
    match glyphs.get(pos).and_then(|g| table.get(g)) {
        Some(seq) if !seq.is_empty() => {
            let inserted = seq.len();
            glyphs.replace_with_many(pos, seq);
            cursor.step_over_edit(1, inserted);
            true
        }
        _ => {
            cursor.advance(1);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::GlyphIndex;

    fn list(glyphs: &[GlyphIndex]) -> GlyphIndexList {
        let mut l = GlyphIndexList::new();
        for (i, &g) in glyphs.iter().enumerate() {
            l.push(g, i);
        }
        l
    }

    fn ligatures(rules: &[(&[GlyphIndex], GlyphIndex)]) -> LookupSubtable {
        let mut t = LigatureSubstitution::new();
        for (components, glyph) in rules {
            t.insert(components.to_vec(), *glyph);
        }
        LookupSubtable::ManyToOne(t)
    }

    #[test]
    fn single_substitution_rewrites_matches_only() {
        let sub = LookupSubtable::OneToOne([(2, 20), (4, 40)].into_iter().collect());
        let mut l = list(&[1, 2, 3, 4]);
        let out = substitute(&mut l, 0, 4, &sub);
        assert_eq!(out, SubstitutionOutcome::Applied { edits: 2, window_len: 4 });
        assert_eq!(l.glyphs(), &[1, 20, 3, 40]);
    }

    #[test]
    fn single_substitution_is_idempotent_when_targets_have_no_rule() {
        let sub = LookupSubtable::OneToOne([(2, 20), (3, 30)].into_iter().collect());
        let mut once = list(&[2, 3, 5, 2]);
        substitute(&mut once, 0, 4, &sub);
        let mut twice = once.clone();
        substitute(&mut twice, 0, 4, &sub);
        assert_eq!(once.glyphs(), twice.glyphs());
    }

    #[test]
    fn single_substitution_does_not_chain_within_one_pass() {
        let sub = LookupSubtable::OneToOne([(1, 2), (2, 3)].into_iter().collect());
        let mut l = list(&[1, 2]);
        substitute(&mut l, 0, 2, &sub);
        assert_eq!(l.glyphs(), &[2, 3]);
    }

    #[test]
    fn ligature_shrinks_window_and_continues_after_it() {
        // f f i x f i
        let sub = ligatures(&[(&[10, 10, 11], 100), (&[10, 11], 101)]);
        let mut l = list(&[10, 10, 11, 50, 10, 11]);
        let out = substitute(&mut l, 0, 6, &sub);
        assert_eq!(out, SubstitutionOutcome::Applied { edits: 2, window_len: 3 });
        assert_eq!(l.glyphs(), &[100, 50, 101]);
        assert_eq!(l.clusters(), &[0, 3, 4]);
    }

    #[test]
    fn ligature_first_rule_in_insertion_order_wins() {
        let sub = ligatures(&[(&[10, 10], 200), (&[10, 10, 11], 100)]);
        let mut l = list(&[10, 10, 11]);
        substitute(&mut l, 0, 3, &sub);
        assert_eq!(l.glyphs(), &[200, 11]);
    }

    #[test]
    fn ligature_never_reaches_outside_the_window() {
        let sub = ligatures(&[(&[10, 11], 100)]);
        let mut l = list(&[10, 11, 10, 11]);
        let out = substitute(&mut l, 1, 2, &sub);
        assert_eq!(out, SubstitutionOutcome::Applied { edits: 0, window_len: 2 });
        assert_eq!(l.glyphs(), &[10, 11, 10, 11]);

        let out = substitute(&mut l, 2, 2, &sub);
        assert_eq!(out, SubstitutionOutcome::Applied { edits: 1, window_len: 1 });
        assert_eq!(l.glyphs(), &[10, 11, 100]);
    }

    #[test]
    fn multiple_substitution_grows_window() {
        let mut t = MultipleSubstitution::new();
        t.insert(7, vec![70, 71, 72]);
        t.insert(8, vec![]);
        let sub = LookupSubtable::OneToMany(t);
        let mut l = list(&[7, 8, 7]);
        let out = substitute(&mut l, 0, 3, &sub);
        assert_eq!(out, SubstitutionOutcome::Applied { edits: 2, window_len: 7 });
        assert_eq!(l.glyphs(), &[70, 71, 72, 8, 70, 71, 72]);
        assert_eq!(l.clusters(), &[0, 0, 0, 1, 2, 2, 2]);
    }

    #[test]
    fn unsupported_subtable_is_reported_not_applied() {
        let sub = LookupSubtable::Unsupported { lookup_type: 6 };
        let mut l = list(&[1, 2]);
        match substitute(&mut l, 0, 2, &sub) {
            SubstitutionOutcome::Unsupported(msg) => assert!(msg.contains("chained context")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(l.glyphs(), &[1, 2]);
    }

    #[test]
    fn window_is_clamped_to_list() {
        let sub = LookupSubtable::OneToOne([(1, 9)].into_iter().collect());
        let mut l = list(&[1, 1]);
        let out = substitute(&mut l, 1, 50, &sub);
        assert_eq!(out, SubstitutionOutcome::Applied { edits: 1, window_len: 1 });
        assert_eq!(l.glyphs(), &[1, 9]);

        let out = substitute(&mut l, 5, 1, &sub);
        assert_eq!(out, SubstitutionOutcome::Applied { edits: 0, window_len: 0 });
    }
}
