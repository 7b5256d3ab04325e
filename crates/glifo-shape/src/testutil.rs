//! Shared test fixtures for the engine unit tests.

use glifo_core::{FontAdapter, GlyphClass, GlyphMetrics, Lookup, LookupStage, Tag};

/// A font with a fixed classing scheme and no tables: glyph ids below 100
/// are bases, ids from 100 are marks with attachment class `id % 3`, and
/// mark filtering set `s` contains the marks with `id % 5 == s`.
#[derive(Default)]
pub struct ClassedFont;

impl FontAdapter for ClassedFont {
    fn face_id(&self) -> u64 {
        0
    }
    fn units_per_em(&self) -> u16 {
        1000
    }
    fn ascent(&self) -> i32 {
        800
    }
    fn descent(&self) -> i32 {
        200
    }
    fn line_gap(&self) -> i32 {
        0
    }
    fn map_codepoint(&self, cp: char) -> u32 {
        cp as u32
    }
    fn metrics(&self, _glyph: u32) -> GlyphMetrics {
        GlyphMetrics {
            advance_x: 500,
            ..GlyphMetrics::default()
        }
    }
    fn lookup_count(&self, _stage: LookupStage) -> u16 {
        0
    }
    fn lookup(&self, _stage: LookupStage, _index: u16) -> Option<&Lookup> {
        None
    }
    fn lookup_indices(&self, _stage: LookupStage, _script: Tag, _lang: Tag) -> Vec<u16> {
        Vec::new()
    }
    fn default_features(&self, _script: Tag, _lang: Tag) -> Vec<Tag> {
        Vec::new()
    }
    fn glyph_class(&self, glyph: u32) -> GlyphClass {
        if glyph >= 100 {
            GlyphClass::Mark
        } else {
            GlyphClass::Base
        }
    }
    fn mark_attachment_class(&self, glyph: u32) -> u8 {
        if glyph >= 100 {
            (glyph % 3) as u8
        } else {
            0
        }
    }
    fn mark_set_contains(&self, set: u16, glyph: u32) -> bool {
        glyph >= 100 && glyph % 5 == u32::from(set)
    }
    fn kern_pair(&self, _left: u32, _right: u32) -> Option<i32> {
        None
    }
    fn has_gpos_kern(&self, _script: Tag, _lang: Tag) -> bool {
        false
    }
}
