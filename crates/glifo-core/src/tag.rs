//! Four-byte OpenType tags for scripts, languages, and features.

use std::fmt;

/// A 4-byte ASCII tag, space-padded on the right, as OpenType uses for
/// script, language, and feature identifiers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// The default script tag used when no script-specific data exists.
    pub const DEFAULT_SCRIPT: Tag = Tag(*b"DFLT");
    /// The default language system tag.
    pub const DEFAULT_LANGUAGE: Tag = Tag(*b"dflt");

    /// Build a tag from exactly four bytes.
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Tag(*bytes)
    }

    /// Build a tag from a string, truncating past four bytes and padding
    /// shorter input with spaces. Non-ASCII bytes are replaced with spaces.
    pub fn from_str_lossy(s: &str) -> Self {
        let mut bytes = *b"    ";
        for (slot, b) in bytes.iter_mut().zip(s.bytes()) {
            *slot = if b.is_ascii() && !b.is_ascii_control() {
                b
            } else {
                b' '
            };
        }
        Tag(bytes)
    }

    /// The tag as a string slice, if it is valid ASCII.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.as_str())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&[u8; 4]> for Tag {
    fn from(bytes: &[u8; 4]) -> Self {
        Tag(*bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_pads_and_truncates() {
        assert_eq!(Tag::from_str_lossy("liga"), Tag(*b"liga"));
        assert_eq!(Tag::from_str_lossy("fi"), Tag(*b"fi  "));
        assert_eq!(Tag::from_str_lossy("kerning"), Tag(*b"kern"));
    }

    #[test]
    fn display_round_trip() {
        assert_eq!(Tag(*b"kern").to_string(), "kern");
        assert_eq!(Tag::DEFAULT_SCRIPT.to_string(), "DFLT");
    }
}
