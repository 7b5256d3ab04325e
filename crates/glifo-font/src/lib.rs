// this_file: crates/glifo-font/src/lib.rs

//! An in-memory [`FontAdapter`] over already-decoded table data.
//!
//! Binary OpenType parsing lives outside the engine; whatever parses a
//! font hands the pipeline decoded lookups, coverage, anchors, and
//! metrics. [`FontBuilder`] assembles exactly that data programmatically,
//! validates it once, and produces an immutable [`StaticFont`]. Tests,
//! demos, and embedders with their own table decoders all use this seam.
//!
//! Table sanity is checked eagerly in [`FontBuilder::build`]; after that,
//! shaping never sees a malformed structure.

mod validate;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use glifo_core::{
    FontAdapter, FontError, GlyphClass, GlyphMetrics, Lookup, LookupFlags, LookupKind,
    LookupStage, PosSubtable, SubstSubtable, Tag,
};

static NEXT_FACE_ID: AtomicU64 = AtomicU64::new(1);

/// Immutable font data behind the [`FontAdapter`] contract.
///
/// Built by [`FontBuilder`]; reference-shared by any number of concurrent
/// shaping calls. The builder registers features globally rather than per
/// script system, which is all the synthetic fonts this adapter serves
/// ever need; a table parser with real script scoping implements
/// [`FontAdapter`] directly.
pub struct StaticFont {
    id: u64,
    path: Option<String>,
    upem: u16,
    ascent: i32,
    descent: i32,
    line_gap: i32,
    cmap: BTreeMap<char, u32>,
    metrics: HashMap<u32, GlyphMetrics>,
    default_advance: i32,
    classes: HashMap<u32, GlyphClass>,
    mark_classes: HashMap<u32, u8>,
    mark_sets: Vec<BTreeSet<u32>>,
    gsub: Vec<Lookup>,
    gpos: Vec<Lookup>,
    default_features: Vec<Tag>,
    required_feature: Option<Tag>,
    kern: HashMap<(u32, u32), i32>,
}

impl StaticFont {
    fn list(&self, stage: LookupStage) -> &[Lookup] {
        match stage {
            LookupStage::Substitution => &self.gsub,
            LookupStage::Positioning => &self.gpos,
        }
    }
}

impl FontAdapter for StaticFont {
    fn face_id(&self) -> u64 {
        self.id
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn units_per_em(&self) -> u16 {
        self.upem
    }

    fn ascent(&self) -> i32 {
        self.ascent
    }

    fn descent(&self) -> i32 {
        self.descent
    }

    fn line_gap(&self) -> i32 {
        self.line_gap
    }

    fn map_codepoint(&self, cp: char) -> u32 {
        self.cmap.get(&cp).copied().unwrap_or(0)
    }

    fn metrics(&self, glyph: u32) -> GlyphMetrics {
        self.metrics.get(&glyph).copied().unwrap_or(GlyphMetrics {
            advance_x: self.default_advance,
            ..GlyphMetrics::default()
        })
    }

    fn lookup_count(&self, stage: LookupStage) -> u16 {
        self.list(stage).len() as u16
    }

    fn lookup(&self, stage: LookupStage, index: u16) -> Option<&Lookup> {
        self.list(stage).get(index as usize)
    }

    fn lookup_indices(&self, stage: LookupStage, _script: Tag, _lang: Tag) -> Vec<u16> {
        (0..self.lookup_count(stage)).collect()
    }

    fn default_features(&self, _script: Tag, _lang: Tag) -> Vec<Tag> {
        self.default_features.clone()
    }

    fn required_feature(&self, _script: Tag, _lang: Tag) -> Option<Tag> {
        self.required_feature
    }

    fn glyph_class(&self, glyph: u32) -> GlyphClass {
        self.classes
            .get(&glyph)
            .copied()
            .unwrap_or(GlyphClass::Unclassified)
    }

    fn mark_attachment_class(&self, glyph: u32) -> u8 {
        self.mark_classes.get(&glyph).copied().unwrap_or(0)
    }

    fn mark_set_contains(&self, set: u16, glyph: u32) -> bool {
        self.mark_sets
            .get(set as usize)
            .is_some_and(|s| s.contains(&glyph))
    }

    fn kern_pair(&self, left: u32, right: u32) -> Option<i32> {
        self.kern.get(&(left, right)).copied()
    }

    fn has_gpos_kern(&self, _script: Tag, _lang: Tag) -> bool {
        let kern = Tag::new(b"kern");
        self.gpos.iter().any(|l| l.features.contains(&kern))
    }
}

/// Assembles a [`StaticFont`] from decoded table data.
#[derive(Default)]
pub struct FontBuilder {
    path: Option<String>,
    upem: u16,
    ascent: i32,
    descent: i32,
    line_gap: i32,
    cmap: BTreeMap<char, u32>,
    metrics: HashMap<u32, GlyphMetrics>,
    classes: HashMap<u32, GlyphClass>,
    mark_classes: HashMap<u32, u8>,
    mark_sets: Vec<BTreeSet<u32>>,
    gsub: Vec<Lookup>,
    gpos: Vec<Lookup>,
    default_features: Vec<Tag>,
    required_feature: Option<Tag>,
    kern: HashMap<(u32, u32), i32>,
}

impl FontBuilder {
    pub fn new(units_per_em: u16) -> Self {
        Self {
            upem: units_per_em,
            ascent: i32::from(units_per_em) * 4 / 5,
            descent: i32::from(units_per_em) / 5,
            line_gap: 0,
            ..Self::default()
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn vertical_metrics(mut self, ascent: i32, descent: i32, line_gap: i32) -> Self {
        self.ascent = ascent;
        self.descent = descent;
        self.line_gap = line_gap;
        self
    }

    /// Map a codepoint to a glyph and give the glyph a horizontal advance.
    pub fn glyph(mut self, cp: char, glyph: u32, advance: i32) -> Self {
        self.cmap.insert(cp, glyph);
        self.metrics.insert(
            glyph,
            GlyphMetrics {
                advance_x: advance,
                ..GlyphMetrics::default()
            },
        );
        self
    }

    /// Metrics for a glyph no codepoint maps to directly (ligatures,
    /// contextual forms).
    pub fn glyph_advance(mut self, glyph: u32, advance: i32) -> Self {
        self.metrics.insert(
            glyph,
            GlyphMetrics {
                advance_x: advance,
                ..GlyphMetrics::default()
            },
        );
        self
    }

    pub fn glyph_metrics(mut self, glyph: u32, metrics: GlyphMetrics) -> Self {
        self.metrics.insert(glyph, metrics);
        self
    }

    pub fn glyph_class(mut self, glyph: u32, class: GlyphClass) -> Self {
        self.classes.insert(glyph, class);
        self
    }

    pub fn mark_attachment_class(mut self, glyph: u32, class: u8) -> Self {
        self.mark_classes.insert(glyph, class);
        self
    }

    /// Append a mark filtering set; sets are indexed in insertion order.
    pub fn mark_set(mut self, glyphs: &[u32]) -> Self {
        self.mark_sets.push(glyphs.iter().copied().collect());
        self
    }

    pub fn gsub_lookup(
        self,
        features: &[&[u8; 4]],
        flags: LookupFlags,
        subtables: Vec<SubstSubtable>,
    ) -> Self {
        self.gsub_lookup_filtered(features, flags, None, subtables)
    }

    pub fn gsub_lookup_filtered(
        mut self,
        features: &[&[u8; 4]],
        flags: LookupFlags,
        mark_filtering_set: Option<u16>,
        subtables: Vec<SubstSubtable>,
    ) -> Self {
        self.gsub.push(Lookup {
            flags,
            mark_filtering_set,
            features: features.iter().map(|t| Tag::new(t)).collect(),
            kind: LookupKind::Subst(subtables),
        });
        self
    }

    pub fn gpos_lookup(
        self,
        features: &[&[u8; 4]],
        flags: LookupFlags,
        subtables: Vec<PosSubtable>,
    ) -> Self {
        self.gpos_lookup_filtered(features, flags, None, subtables)
    }

    pub fn gpos_lookup_filtered(
        mut self,
        features: &[&[u8; 4]],
        flags: LookupFlags,
        mark_filtering_set: Option<u16>,
        subtables: Vec<PosSubtable>,
    ) -> Self {
        self.gpos.push(Lookup {
            flags,
            mark_filtering_set,
            features: features.iter().map(|t| Tag::new(t)).collect(),
            kind: LookupKind::Pos(subtables),
        });
        self
    }

    /// A feature the font turns on by default for every script system.
    pub fn default_feature(mut self, tag: &[u8; 4]) -> Self {
        self.default_features.push(Tag::new(tag));
        self
    }

    pub fn required_feature(mut self, tag: &[u8; 4]) -> Self {
        self.required_feature = Some(Tag::new(tag));
        self
    }

    /// A legacy kern table pair, design units.
    pub fn kern(mut self, left: u32, right: u32, value: i32) -> Self {
        self.kern.insert((left, right), value);
        self
    }

    /// Validate the assembled tables and freeze them into a font.
    ///
    /// All structural checks happen here; a [`StaticFont`] that builds
    /// successfully never produces a malformed-table condition during
    /// shaping.
    pub fn build(self) -> Result<StaticFont, FontError> {
        if self.cmap.is_empty() && self.metrics.is_empty() {
            return Err(FontError::EmptyFont);
        }
        validate::check_gsub(&self.gsub)?;
        validate::check_gpos(&self.gpos)?;
        validate::check_mark_sets(&self.gsub, &self.gpos, self.mark_sets.len())?;

        Ok(StaticFont {
            id: NEXT_FACE_ID.fetch_add(1, Ordering::Relaxed),
            path: self.path,
            upem: self.upem,
            ascent: self.ascent,
            descent: self.descent,
            line_gap: self.line_gap,
            default_advance: i32::from(self.upem) / 2,
            cmap: self.cmap,
            metrics: self.metrics,
            classes: self.classes,
            mark_classes: self.mark_classes,
            mark_sets: self.mark_sets,
            gsub: self.gsub,
            gpos: self.gpos,
            default_features: self.default_features,
            required_feature: self.required_feature,
            kern: self.kern,
        })
    }
}
