// this_file: crates/glifo-core/src/slot.rs

//! The shaping slot: one element of the evolving glyph stream.
//!
//! A slot starts life as a single codepoint mapped to a glyph and is then
//! rewritten by substitution and annotated by positioning. Its
//! `source_offset` never changes, which is what lets callers map every
//! output glyph back to the byte of text it came from.

use std::sync::Arc;

use bitflags::bitflags;

use crate::tag::Tag;

/// Which way a resolved run of text flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl Direction {
    /// Direction implied by a resolved bidi embedding level.
    pub fn from_level(level: u8) -> Self {
        if level & 1 == 1 {
            Direction::RightToLeft
        } else {
            Direction::LeftToRight
        }
    }
}

/// Identifies the text run (font, script, direction) a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u32);

/// One OpenType feature selection.
///
/// `value == 0` disables the feature, `value == 1` enables it, and a value
/// greater than one both enables it and selects alternate `value - 1` for
/// alternate-set substitutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureSetting {
    pub tag: Tag,
    pub value: u32,
}

impl FeatureSetting {
    pub const fn new(tag: Tag, value: u32) -> Self {
        Self { tag, value }
    }
}

bitflags! {
    /// Monotonic set-once bits recording what substitution did to a slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        const SUBSTITUTED = 0b0001;
        const LIGATED     = 0b0010;
        const DECOMPOSED  = 0b0100;
        const MULTIPLIED  = 0b1000;
    }
}

/// A single element of a [`GlyphStream`](crate::stream::GlyphStream).
#[derive(Debug, Clone)]
pub struct Slot {
    /// Byte index into the original text where this slot originated.
    /// Never edited after creation; ligated slots carry the leftmost
    /// component's offset.
    pub source_offset: u32,
    /// The Unicode scalar that seeded this slot. Ligated slots carry the
    /// representative codepoint of their components.
    pub codepoint: char,
    /// How many original codepoints this slot now represents.
    pub codepoint_count: u16,
    /// Current glyph index in the run's font.
    pub glyph_id: u32,
    /// Resolved bidi direction.
    pub direction: Direction,
    /// Resolved bidi embedding level; parity agrees with `direction`.
    pub bidi_level: u8,
    /// Resolved OpenType script tag.
    pub script: Tag,
    /// The run this slot belongs to.
    pub run_ref: RunId,
    /// Ordered feature state applying at this slot, shared across the run.
    pub features: Arc<[FeatureSetting]>,
    /// Ligation cohort identifier; 0 means none.
    pub ligature_id: u32,
    /// Component index within a decomposed ligature; -1 when not part of one.
    pub ligature_component: i16,
    /// How many slots back the base this mark is attached to sits;
    /// -1 when unattached.
    pub mark_attachment: i16,
    /// How many slots back the cursive join partner sits; -1 when none.
    pub cursive_attachment: i16,
    /// What substitution has done to this slot so far.
    pub flags: SlotFlags,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl Slot {
    /// A fresh slot for one codepoint, as the text analyzer emits it.
    pub fn new(
        source_offset: u32,
        codepoint: char,
        glyph_id: u32,
        bidi_level: u8,
        script: Tag,
        run_ref: RunId,
        features: Arc<[FeatureSetting]>,
    ) -> Self {
        Self {
            source_offset,
            codepoint,
            codepoint_count: 1,
            glyph_id,
            direction: Direction::from_level(bidi_level),
            bidi_level,
            script,
            run_ref,
            features,
            ligature_id: 0,
            ligature_component: -1,
            mark_attachment: -1,
            cursive_attachment: -1,
            flags: SlotFlags::empty(),
            x_advance: 0,
            y_advance: 0,
            x_offset: 0,
            y_offset: 0,
        }
    }

    /// The value this slot carries for `tag`, if the feature applies here.
    pub fn feature_value(&self, tag: Tag) -> Option<u32> {
        self.features
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value)
    }

    /// Whether any of `tags` is enabled (non-zero) at this slot.
    pub fn any_feature_enabled(&self, tags: &[Tag]) -> bool {
        tags.iter()
            .any(|t| self.feature_value(*t).is_some_and(|v| v > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(features: &[FeatureSetting]) -> Slot {
        Slot::new(
            0,
            'a',
            1,
            0,
            Tag::new(b"latn"),
            RunId(0),
            Arc::from(features),
        )
    }

    #[test]
    fn feature_lookup() {
        let s = slot(&[
            FeatureSetting::new(Tag::new(b"liga"), 1),
            FeatureSetting::new(Tag::new(b"smcp"), 0),
        ]);
        assert_eq!(s.feature_value(Tag::new(b"liga")), Some(1));
        assert_eq!(s.feature_value(Tag::new(b"smcp")), Some(0));
        assert_eq!(s.feature_value(Tag::new(b"kern")), None);
        assert!(s.any_feature_enabled(&[Tag::new(b"liga")]));
        assert!(!s.any_feature_enabled(&[Tag::new(b"smcp"), Tag::new(b"dlig")]));
    }

    #[test]
    fn direction_from_level_parity() {
        assert_eq!(Direction::from_level(0), Direction::LeftToRight);
        assert_eq!(Direction::from_level(1), Direction::RightToLeft);
        assert_eq!(Direction::from_level(2), Direction::LeftToRight);
    }
}
