//! Character property queries backed by the ICU data crates.

use icu_properties::props::{BidiClass, GeneralCategory, Script};
use icu_properties::{CodePointMapData, CodePointSetData};

pub use glifo_core::charclass::{is_default_ignorable, is_zero_width_joiner};

/// The Unicode script property of one codepoint.
pub fn script(cp: char) -> Script {
    CodePointMapData::<Script>::new().get(cp)
}

/// The Unicode bidi class of one codepoint.
pub fn bidi_class(cp: char) -> BidiClass {
    CodePointMapData::<BidiClass>::new().get(cp)
}

/// The Unicode general category of one codepoint.
pub fn general_category(cp: char) -> GeneralCategory {
    CodePointMapData::<GeneralCategory>::new().get(cp)
}

/// Whether a codepoint is white space per the Unicode property.
pub fn is_white_space(cp: char) -> bool {
    CodePointSetData::new::<icu_properties::props::WhiteSpace>().contains(cp)
}

/// A space a justifier may stretch: space-separator general category,
/// excluding the no-break variants.
pub fn is_breaking_space(cp: char) -> bool {
    !matches!(cp, '\u{00A0}' | '\u{2007}' | '\u{202F}')
        && general_category(cp) == GeneralCategory::SpaceSeparator
}

/// Dependent vowel signs that render before the consonant they follow in
/// logical order (Devanagari-family pre-base matras).
pub fn is_prebase_matra(cp: char) -> bool {
    matches!(
        cp,
        '\u{093F}' // devanagari vowel sign i
            | '\u{09BF}' // bengali vowel sign i
            | '\u{09C7}' | '\u{09C8}'
            | '\u{0A3F}' // gurmukhi vowel sign i
            | '\u{0ABF}' // gujarati vowel sign i
            | '\u{0B47}' // oriya vowel sign e
            | '\u{0BC6}' | '\u{0BC7}' | '\u{0BC8}' // tamil e/ee/ai
            | '\u{0D46}' | '\u{0D47}' | '\u{0D48}' // malayalam e/ee/ai
            | '\u{0DD9}' | '\u{0DDA}' | '\u{0DDB}' // sinhala kombuva forms
    )
}
