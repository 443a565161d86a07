//! Per-character classes the breaker merges into runs.

use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

/// Coarse class of one scalar value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum CharClass {
    Letter,
    Digit,
    /// General category Mn, Mc or Me; continues whatever run it follows.
    Mark,
    /// Horizontal space; merges only with the identical character.
    Space,
    /// Vertical tab, form feed and other control codes.
    OtherSpace,
    LineBreak,
    Punctuation,
    /// Format controls, joiners, noncharacters.
    Unknown,
}

pub(crate) const ZERO_WIDTH_JOINER: char = '\u{200D}';
pub(crate) const EMOJI_PRESENTATION_SELECTOR: char = '\u{FE0F}';

pub(crate) fn classify(ch: char) -> CharClass {
    match ch {
        '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}' => CharClass::LineBreak,
        '\u{0B}' | '\u{0C}' => CharClass::OtherSpace,
        '\t' => CharClass::Space,
        _ if ch.is_control() => CharClass::OtherSpace,
        _ if is_format_or_noncharacter(ch) => CharClass::Unknown,
        _ if ch.is_whitespace() => CharClass::Space,
        _ if is_combining_mark(ch) => CharClass::Mark,
        _ if ch.is_numeric() => CharClass::Digit,
        _ if ch.is_alphabetic() => CharClass::Letter,
        _ => CharClass::Punctuation,
    }
}

#[inline]
fn is_combining_mark(ch: char) -> bool {
    ch.general_category_group() == GeneralCategoryGroup::Mark
}

fn is_format_or_noncharacter(ch: char) -> bool {
    let cp = ch as u32;
    matches!(
        ch,
        '\u{200B}'..='\u{200F}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{FEFF}'
            | '\u{FDD0}'..='\u{FDEF}'
    ) || (cp & 0xFFFE) == 0xFFFE
}
