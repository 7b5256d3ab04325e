//! Small Unicode character predicates the stream edits depend on.

use icu_properties::props::DefaultIgnorableCodePoint;
use icu_properties::CodePointSetData;

/// Whether a codepoint is Default_Ignorable (ZWJ, ZWNJ, variation
/// selectors, BOM, ...). Such codepoints never become the representative
/// codepoint of a ligature.
pub fn is_default_ignorable(cp: char) -> bool {
    CodePointSetData::new::<DefaultIgnorableCodePoint>().contains(cp)
}

/// Whether a codepoint is U+200D ZERO WIDTH JOINER.
pub fn is_zero_width_joiner(cp: char) -> bool {
    cp == '\u{200D}'
}
