//! Word/script breaker.
//!
//! Splits a UTF-16 buffer into contiguous segments tagged with a `WordKind`.
//! One left-to-right pass, never fails and never drops a code unit: the
//! segments of a buffer concatenate back to the buffer.

mod classify;

use std::iter::FusedIterator;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use classify::{CharClass, EMOJI_PRESENTATION_SELECTOR, ZERO_WIDTH_JOINER, classify};

/// What a segment contains.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WordKind {
    Text,
    Number,
    Punctuation,
    Whitespace,
    OtherWhitespace,
    NewLine,
    Unknown,
}

/// How supplementary-plane characters are grouped.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurrogatePairBreakingOption {
    /// Every well-formed pair is its own run.
    #[default]
    OnlySurrogatePair,
    /// Consecutive pairs, zero-width joiners and emoji presentation selectors
    /// form one run (emoji ZWJ sequences stay whole).
    ConsecutiveSurrogatePairsAndJoiner,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakOptions {
    /// Split digits off a preceding Text run ("A123" → "A", "123").
    pub break_number_after_text: bool,
    pub surrogate_pair_breaking: SurrogatePairBreakingOption,
}

/// A run of code units `[start, start + len)` in the input buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BreakSegment {
    pub start: usize,
    pub len: usize,
    pub kind: WordKind,
}

impl BreakSegment {
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordBreaker {
    options: BreakOptions,
}

impl WordBreaker {
    pub fn new(options: BreakOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BreakOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: BreakOptions) {
        self.options = options;
    }

    /// Lazily break `text`. The returned iterator can be cloned to restart.
    pub fn breaks<'a>(&self, text: &'a [u16]) -> Breaks<'a> {
        Breaks {
            text,
            pos: 0,
            options: self.options,
        }
    }

    /// Break a UTF-8 string, returning each piece with its kind.
    pub fn break_str<'s>(&self, text: &'s str) -> Vec<(&'s str, WordKind)> {
        let units: Vec<u16> = text.encode_utf16().collect();

        // Byte offset of every code unit, plus the end.
        let mut byte_at = Vec::with_capacity(units.len() + 1);
        for (b, ch) in text.char_indices() {
            for _ in 0..ch.len_utf16() {
                byte_at.push(b);
            }
        }
        byte_at.push(text.len());

        self.breaks(&units)
            .map(|seg| (&text[byte_at[seg.start]..byte_at[seg.end()]], seg.kind))
            .collect()
    }
}

/// One decoded position of the buffer.
#[derive(Debug, Copy, Clone)]
enum Unit {
    Char(char),
    LoneSurrogate,
}

impl Unit {
    fn len(self) -> usize {
        match self {
            Unit::Char(ch) => ch.len_utf16(),
            Unit::LoneSurrogate => 1,
        }
    }

    /// A BMP character of the given class.
    fn is_bmp(self, class: CharClass) -> bool {
        matches!(self, Unit::Char(ch) if ch.len_utf16() == 1 && classify(ch) == class)
    }
}

/// Iterator over the segments of one buffer.
#[derive(Debug, Clone)]
pub struct Breaks<'a> {
    text: &'a [u16],
    pos: usize,
    options: BreakOptions,
}

impl Breaks<'_> {
    fn unit_at(&self, at: usize) -> Option<Unit> {
        let rest = self.text.get(at..)?;
        char::decode_utf16(rest.iter().copied())
            .next()
            .map(|r| r.map_or(Unit::LoneSurrogate, Unit::Char))
    }

    fn is_char_at(&self, at: usize, expected: char) -> bool {
        matches!(self.unit_at(at), Some(Unit::Char(ch)) if ch == expected)
    }

    /// Extend while the next unit is a BMP character accepted by `accept`.
    fn extend_bmp(&self, mut end: usize, accept: impl Fn(CharClass) -> bool) -> usize {
        while let Some(Unit::Char(ch)) = self.unit_at(end) {
            if ch.len_utf16() != 1 || !accept(classify(ch)) {
                break;
            }
            end += 1;
        }
        end
    }

    fn scan_number(&self, end: usize) -> usize {
        self.extend_bmp(end, |c| matches!(c, CharClass::Digit | CharClass::Mark))
    }

    fn scan_text(&self, mut end: usize) -> usize {
        let digits_continue = !self.options.break_number_after_text;
        let mut has_inner_period = false;

        loop {
            end = self.extend_bmp(end, |c| match c {
                CharClass::Letter | CharClass::Mark => true,
                CharClass::Digit => digits_continue,
                _ => false,
            });

            if !self.is_char_at(end, '.') {
                return end;
            }
            let letter_follows = self
                .unit_at(end + 1)
                .is_some_and(|u| u.is_bmp(CharClass::Letter));
            if letter_follows {
                has_inner_period = true;
                end += 1;
            } else if has_inner_period {
                return end + 1;
            } else {
                return end;
            }
        }
    }

    fn scan_supplementary(&self, mut end: usize) -> usize {
        if self.options.surrogate_pair_breaking
            != SurrogatePairBreakingOption::ConsecutiveSurrogatePairsAndJoiner
        {
            return end;
        }
        while let Some(Unit::Char(ch)) = self.unit_at(end) {
            let joins = ch.len_utf16() == 2
                || ch == ZERO_WIDTH_JOINER
                || ch == EMOJI_PRESENTATION_SELECTOR;
            if !joins {
                break;
            }
            end += ch.len_utf16();
        }
        end
    }

    fn scan_same_char(&self, mut end: usize, ch: char) -> usize {
        while self.is_char_at(end, ch) {
            end += 1;
        }
        end
    }

    fn next_segment(&self, start: usize, first: Unit) -> BreakSegment {
        let after_first = start + first.len();
        let (end, kind) = match first {
            Unit::LoneSurrogate => (after_first, WordKind::Unknown),
            Unit::Char(_) if first.len() == 2 => {
                (self.scan_supplementary(after_first), WordKind::Text)
            }
            Unit::Char(ch) => match classify(ch) {
                CharClass::Letter | CharClass::Mark => (self.scan_text(after_first), WordKind::Text),
                CharClass::Digit => (self.scan_number(after_first), WordKind::Number),
                CharClass::Punctuation
                    if ch == '-'
                        && self
                            .unit_at(after_first)
                            .is_some_and(|u| u.is_bmp(CharClass::Digit)) =>
                {
                    (self.scan_number(after_first), WordKind::Number)
                }
                CharClass::Punctuation => (after_first, WordKind::Punctuation),
                CharClass::Space => (self.scan_same_char(after_first, ch), WordKind::Whitespace),
                CharClass::OtherSpace => (after_first, WordKind::OtherWhitespace),
                CharClass::LineBreak if ch == '\r' && self.is_char_at(after_first, '\n') => {
                    (after_first + 1, WordKind::NewLine)
                }
                CharClass::LineBreak => (after_first, WordKind::NewLine),
                CharClass::Unknown => (after_first, WordKind::Unknown),
            },
        };

        BreakSegment {
            start,
            len: end - start,
            kind,
        }
    }
}

impl Iterator for Breaks<'_> {
    type Item = BreakSegment;

    fn next(&mut self) -> Option<BreakSegment> {
        let first = self.unit_at(self.pos)?;
        let seg = self.next_segment(self.pos, first);
        self.pos = seg.end();
        Some(seg)
    }
}

impl FusedIterator for Breaks<'_> {}
