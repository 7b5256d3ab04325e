// this_file: crates/glifo-shape/src/skip.rs

//! The skip filter: which slots a lookup can see.
//!
//! Lookup flags hide whole glyph classes (bases, ligatures, marks) or
//! filter marks down to an attachment class or a filtering set. Both
//! engines match sequences through the same filter so that contextual
//! rules, ligature components, and pair positioning all agree on what
//! "adjacent" means.

use glifo_core::{Coverage, FontAdapter, GlyphClass, GlyphStream, Lookup, LookupFlags, Slot};

/// Per-lookup skip predicate plus sequence-matching helpers.
pub struct SkipFilter<'a> {
    font: &'a dyn FontAdapter,
    flags: LookupFlags,
    mark_filtering_set: Option<u16>,
}

impl<'a> SkipFilter<'a> {
    pub fn new(font: &'a dyn FontAdapter, lookup: &Lookup) -> Self {
        let mark_filtering_set = lookup
            .flags
            .contains(LookupFlags::USE_MARK_FILTERING_SET)
            .then_some(lookup.mark_filtering_set)
            .flatten();
        Self {
            font,
            flags: lookup.flags,
            mark_filtering_set,
        }
    }

    /// Whether the lookup ignores this slot entirely.
    pub fn skips(&self, slot: &Slot) -> bool {
        match self.font.glyph_class(slot.glyph_id) {
            GlyphClass::Base => self.flags.contains(LookupFlags::IGNORE_BASE_GLYPHS),
            GlyphClass::Ligature => self.flags.contains(LookupFlags::IGNORE_LIGATURES),
            GlyphClass::Mark => {
                if self.flags.contains(LookupFlags::IGNORE_MARKS) {
                    return true;
                }
                if let Some(set) = self.mark_filtering_set {
                    if !self.font.mark_set_contains(set, slot.glyph_id) {
                        return true;
                    }
                }
                let attach = self.flags.mark_attachment_type();
                attach != 0 && self.font.mark_attachment_class(slot.glyph_id) != attach
            }
            GlyphClass::Component | GlyphClass::Unclassified => false,
        }
    }

    /// First visible slot at or after `from`.
    pub fn next_visible(&self, stream: &GlyphStream, from: usize) -> Option<usize> {
        (from..stream.len()).find(|&i| !self.skips(stream.get(i)))
    }

    /// First visible slot strictly after `after`.
    pub fn following(&self, stream: &GlyphStream, after: usize) -> Option<usize> {
        self.next_visible(stream, after + 1)
    }

    /// First visible slot strictly before `before`.
    pub fn preceding(&self, stream: &GlyphStream, before: usize) -> Option<usize> {
        (0..before).rev().find(|&i| !self.skips(stream.get(i)))
    }

    /// Match `matchers` against the visible slots starting at `start`
    /// (which must satisfy `matchers[0]`). Returns the matched positions.
    pub fn match_input(
        &self,
        stream: &GlyphStream,
        start: usize,
        matchers: &[Coverage],
    ) -> Option<Vec<usize>> {
        let first = matchers.first()?;
        if !first.contains(stream.get(start).glyph_id) {
            return None;
        }
        let mut positions = Vec::with_capacity(matchers.len());
        positions.push(start);
        let mut at = start;
        for matcher in &matchers[1..] {
            let next = self.following(stream, at)?;
            if !matcher.contains(stream.get(next).glyph_id) {
                return None;
            }
            positions.push(next);
            at = next;
        }
        Some(positions)
    }

    /// Match a nearest-first backtrack sequence against the visible slots
    /// before `before`.
    pub fn match_backtrack(
        &self,
        stream: &GlyphStream,
        before: usize,
        matchers: &[Coverage],
    ) -> bool {
        let mut at = before;
        for matcher in matchers {
            let Some(prev) = self.preceding(stream, at) else {
                return false;
            };
            if !matcher.contains(stream.get(prev).glyph_id) {
                return false;
            }
            at = prev;
        }
        true
    }

    /// Match a lookahead sequence against the visible slots after `after`.
    pub fn match_lookahead(
        &self,
        stream: &GlyphStream,
        after: usize,
        matchers: &[Coverage],
    ) -> bool {
        let mut at = after;
        for matcher in matchers {
            let Some(next) = self.following(stream, at) else {
                return false;
            };
            if !matcher.contains(stream.get(next).glyph_id) {
                return false;
            }
            at = next;
        }
        true
    }
}
