//! Mapping from Unicode script values to OpenType script tags.

use glifo_core::Tag;
use icu_properties::props::Script;

/// The OpenType script tag for a Unicode script value.
///
/// Scripts without a dedicated OpenType tag (and Common/Inherited) map to
/// `DFLT`, which selects the font's default script system.
pub fn script_tag(script: Script) -> Tag {
    let bytes: &[u8; 4] = match script {
        Script::Latin => b"latn",
        Script::Arabic => b"arab",
        Script::Hebrew => b"hebr",
        Script::Devanagari => b"deva",
        Script::Bengali => b"beng",
        Script::Gurmukhi => b"guru",
        Script::Gujarati => b"gujr",
        Script::Oriya => b"orya",
        Script::Tamil => b"taml",
        Script::Telugu => b"telu",
        Script::Kannada => b"knda",
        Script::Malayalam => b"mlym",
        Script::Sinhala => b"sinh",
        Script::Thai => b"thai",
        Script::Lao => b"lao ",
        Script::Khmer => b"khmr",
        Script::Myanmar => b"mymr",
        Script::Cyrillic => b"cyrl",
        Script::Greek => b"grek",
        Script::Armenian => b"armn",
        Script::Georgian => b"geor",
        Script::Ethiopian => b"ethi",
        Script::Han => b"hani",
        Script::Hiragana | Script::Katakana => b"kana",
        Script::Hangul => b"hang",
        Script::Syriac => b"syrc",
        Script::Thaana => b"thaa",
        _ => return Tag::DEFAULT_SCRIPT,
    };
    Tag::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_scripts_map() {
        assert_eq!(script_tag(Script::Latin), Tag::new(b"latn"));
        assert_eq!(script_tag(Script::Arabic), Tag::new(b"arab"));
        assert_eq!(script_tag(Script::Katakana), Tag::new(b"kana"));
        assert_eq!(script_tag(Script::Common), Tag::DEFAULT_SCRIPT);
    }
}
