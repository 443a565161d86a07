//! The replaceable glyph index list and its scan cursor.

use crate::font::GlyphIndex;

/// Glyph indices under substitution, with the source cluster of each glyph.
///
/// A cluster is the code-unit offset of the first input character that
/// produced the glyph. Every edit keeps both columns the same length.
#[derive(Debug, Clone, Default)]
pub struct GlyphIndexList {
    glyphs: Vec<GlyphIndex>,
    clusters: Vec<usize>,
}

impl GlyphIndexList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the list, keeping its allocation.
    pub fn clear(&mut self) {
        self.glyphs.clear();
        self.clusters.clear();
    }

    pub fn push(&mut self, glyph: GlyphIndex, cluster: usize) {
        self.glyphs.push(glyph);
        self.clusters.push(cluster);
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
    pub fn get(&self, index: usize) -> Option<GlyphIndex> {
        self.glyphs.get(index).copied()
    }

    #[inline]
    pub fn glyphs(&self) -> &[GlyphIndex] {
        &self.glyphs
    }

    #[inline]
    pub fn clusters(&self) -> &[usize] {
        &self.clusters
    }

    /// Remove one, add one.
    pub fn replace(&mut self, index: usize, glyph: GlyphIndex) {
        self.glyphs[index] = glyph;
    }

    /// Remove `remove_len` glyphs starting at `index`, add one in their place.
    ///
    /// The new glyph takes the cluster of the first removed glyph.
    pub fn replace_range(&mut self, index: usize, remove_len: usize, glyph: GlyphIndex) {
        debug_assert!(remove_len >= 1);
        self.glyphs.splice(index..index + remove_len, [glyph]);
        self.clusters.drain(index + 1..index + remove_len);
    }

    /// Remove one glyph at `index`, add `glyphs` in its place.
    ///
    /// All inserted glyphs share the removed glyph's cluster.
    pub fn replace_with_many(&mut self, index: usize, glyphs: &[GlyphIndex]) {
        let cluster = self.clusters[index];
        self.glyphs.splice(index..=index, glyphs.iter().copied());
        self.clusters
            .splice(index..=index, std::iter::repeat_n(cluster, glyphs.len()));
    }
}

/// Scan position over a window of a `GlyphIndexList`.
///
/// Passed by `&mut` between scan steps; edits report their shape so the
/// window end follows the list's length changes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlyphCursor {
    pos: usize,
    end: usize,
}

impl GlyphCursor {
    pub fn new(start: usize, len: usize) -> Self {
        Self {
            pos: start,
            end: start + len,
        }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// One past the last glyph of the window.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.pos >= self.end
    }

    /// Glyphs left in the window from the current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Record an edit at the current position that replaced `removed` glyphs
    /// with `inserted` ones, and step past the inserted glyphs.
    pub fn step_over_edit(&mut self, removed: usize, inserted: usize) {
        self.end = self.end + inserted - removed;
        self.pos += inserted;
    }
}
