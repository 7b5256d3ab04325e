//! Where text becomes shapable: analysis for glifo
//!
//! Before any glyph work can happen, raw text has to be understood:
//! which way it flows, which writing systems it mixes, which font can
//! actually draw each codepoint, and which OpenType features should be
//! live. This crate turns a string plus options into run plans and seeded
//! glyph streams for the shaping engines.

pub mod analyzer;
pub mod joining;
pub mod props;
pub mod script;

use std::borrow::Cow;

use unicode_normalization::{is_nfc, UnicodeNormalization};

pub use analyzer::{line_break_opportunities, Analysis, RunPlan, TextAnalyzer};
pub use script::script_tag;

/// NFC-normalize text, borrowing when it is already normalized.
///
/// Analysis never normalizes implicitly: source offsets index the text the
/// caller handed in. Callers that want composed input run this first and
/// shape the result.
pub fn nfc_normalize(text: &str) -> Cow<'_, str> {
    if is_nfc(text) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.nfc().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nfc_borrows_when_clean() {
        assert!(matches!(nfc_normalize("hello"), Cow::Borrowed(_)));
    }

    #[test]
    fn nfc_composes() {
        let composed = nfc_normalize("e\u{0301}");
        assert_eq!(composed.as_ref(), "é");
        assert!(matches!(composed, Cow::Owned(_)));
    }
}
