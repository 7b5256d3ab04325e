// this_file: crates/glifo-core/src/font.rs

//! The read-only font facade and the parsed layout-table data model.
//!
//! Binary table parsing happens outside this crate. A parser (or a test
//! font builder) hands the engine a [`FontAdapter`]: codepoint mapping,
//! metrics, and substitution/positioning lookups already decoded into the
//! types below. The engine dispatches on subtable kind and otherwise treats
//! rule data as opaque.

use std::fmt;

use bitflags::bitflags;

use crate::tag::Tag;

/// Which lookup list a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupStage {
    Substitution,
    Positioning,
}

/// GDEF glyph classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphClass {
    Unclassified,
    Base,
    Ligature,
    Mark,
    Component,
}

/// Per-glyph metrics in design units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    pub advance_x: i32,
    pub advance_y: i32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub bbox: GlyphBounds,
}

/// A glyph's outline extents in design units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphBounds {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

/// An attachment point in design units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

/// The set of glyph ids a subtable applies to, with coverage indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    /// Sorted list of glyph ids; the coverage index is the list position.
    Glyphs(Vec<u32>),
    /// Sorted, non-overlapping inclusive ranges; indices run through the
    /// ranges in order.
    Ranges(Vec<(u32, u32)>),
}

impl Coverage {
    /// The coverage index of `glyph`, if covered.
    pub fn index(&self, glyph: u32) -> Option<u16> {
        match self {
            Coverage::Glyphs(glyphs) => glyphs
                .binary_search(&glyph)
                .ok()
                .map(|i| i as u16),
            Coverage::Ranges(ranges) => {
                let mut base = 0u32;
                for &(start, end) in ranges {
                    if glyph < start {
                        return None;
                    }
                    if glyph <= end {
                        return Some((base + (glyph - start)) as u16);
                    }
                    base += end - start + 1;
                }
                None
            }
        }
    }

    /// Whether `glyph` is covered at all.
    pub fn contains(&self, glyph: u32) -> bool {
        self.index(glyph).is_some()
    }

    /// Number of covered glyphs.
    pub fn len(&self) -> usize {
        match self {
            Coverage::Glyphs(glyphs) => glyphs.len(),
            Coverage::Ranges(ranges) => ranges
                .iter()
                .map(|&(s, e)| (e - s + 1) as usize)
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maps glyph ids to classes; unlisted glyphs are class 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassDef {
    /// Consecutive glyphs starting at `start`, one class per entry.
    Table { start: u32, classes: Vec<u16> },
    /// Sorted inclusive ranges with a class each.
    Ranges(Vec<(u32, u32, u16)>),
}

impl ClassDef {
    pub fn class(&self, glyph: u32) -> u16 {
        match self {
            ClassDef::Table { start, classes } => glyph
                .checked_sub(*start)
                .and_then(|i| classes.get(i as usize).copied())
                .unwrap_or(0),
            ClassDef::Ranges(ranges) => ranges
                .iter()
                .find(|&&(s, e, _)| glyph >= s && glyph <= e)
                .map(|&(_, _, c)| c)
                .unwrap_or(0),
        }
    }
}

bitflags! {
    /// OpenType lookup flags controlling the skip filter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LookupFlags: u16 {
        const RIGHT_TO_LEFT          = 0x0001;
        const IGNORE_BASE_GLYPHS     = 0x0002;
        const IGNORE_LIGATURES       = 0x0004;
        const IGNORE_MARKS           = 0x0008;
        const USE_MARK_FILTERING_SET = 0x0010;
        const MARK_ATTACHMENT_TYPE   = 0xFF00;
    }
}

impl LookupFlags {
    /// The mark-attachment-type filter byte; 0 means no filter.
    pub fn mark_attachment_type(self) -> u8 {
        ((self.bits() & 0xFF00) >> 8) as u8
    }

    /// Flags with the given mark-attachment-type filter byte set.
    pub fn with_mark_attachment_type(self, class: u8) -> Self {
        LookupFlags::from_bits_retain((self.bits() & 0x00FF) | ((class as u16) << 8))
    }
}

/// Adjustments a positioning subtable applies to one glyph, design units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueRecord {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl ValueRecord {
    pub const ZERO: ValueRecord = ValueRecord {
        x_advance: 0,
        y_advance: 0,
        x_offset: 0,
        y_offset: 0,
    };

    pub fn x_advance(value: i32) -> Self {
        ValueRecord {
            x_advance: value,
            ..ValueRecord::ZERO
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == ValueRecord::ZERO
    }
}

/// A nested lookup application inside a contextual rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLookup {
    /// Which matched input position the nested lookup applies at.
    pub sequence_index: u16,
    /// Index into the stage's full lookup list.
    pub lookup_index: u16,
}

/// One contextual rule: an input sequence and the lookups to run inside it.
///
/// Parsers normalize all three OpenType context formats to per-position
/// coverage sets before handing them to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRule {
    /// Matchers for each input position, including position 0.
    pub input: Vec<Coverage>,
    pub actions: Vec<SequenceLookup>,
}

/// One chaining-contextual rule with backtrack and lookahead sequences.
///
/// `backtrack` is ordered nearest-first, matching the direction the engine
/// walks when it looks behind the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRule {
    pub backtrack: Vec<Coverage>,
    pub input: Vec<Coverage>,
    pub lookahead: Vec<Coverage>,
    pub actions: Vec<SequenceLookup>,
}

/// One ligature rule: components beyond the first, and the resulting glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigatureRule {
    /// Component glyphs after the first (the first is the coverage glyph).
    pub components: Vec<u32>,
    /// The ligature glyph that replaces the components.
    pub glyph: u32,
}

/// A substitution subtable, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstSubtable {
    /// 1:1 replacement; `substitutes` is parallel to the coverage indices.
    Single {
        coverage: Coverage,
        substitutes: Vec<u32>,
    },
    /// 1:N decomposition; an empty sequence deletes the glyph.
    Multiple {
        coverage: Coverage,
        sequences: Vec<Vec<u32>>,
    },
    /// 1:1 from an alternate set.
    Alternate {
        coverage: Coverage,
        alternates: Vec<Vec<u32>>,
    },
    /// N:1 ligation; rules are grouped by first-glyph coverage index and
    /// tried in order, so longer components should be listed first.
    Ligature {
        coverage: Coverage,
        ligatures: Vec<Vec<LigatureRule>>,
    },
    Context(Vec<ContextRule>),
    ChainContext(Vec<ChainRule>),
    /// Right-to-left single pass with chained context.
    ReverseChainSingle {
        coverage: Coverage,
        backtrack: Vec<Coverage>,
        lookahead: Vec<Coverage>,
        substitutes: Vec<u32>,
    },
}

/// Pair adjustment rule data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairData {
    /// Per first-glyph coverage index: (second glyph, first record, second
    /// record) entries sorted by second glyph.
    Glyphs(Vec<Vec<(u32, ValueRecord, ValueRecord)>>),
    /// Class matrix: `matrix[class1][class2]`.
    Classes {
        class1: ClassDef,
        class2: ClassDef,
        matrix: Vec<Vec<(ValueRecord, ValueRecord)>>,
    },
}

/// A positioning subtable, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosSubtable {
    /// Adjust one glyph; `values` is parallel to the coverage indices.
    SingleAdjust {
        coverage: Coverage,
        values: Vec<ValueRecord>,
    },
    PairAdjust {
        coverage: Coverage,
        pairs: PairData,
    },
    /// Glue the exit anchor of one glyph to the entry anchor of the next.
    Cursive {
        coverage: Coverage,
        /// (entry, exit) per coverage index.
        anchors: Vec<(Option<Anchor>, Option<Anchor>)>,
    },
    MarkToBase {
        mark_coverage: Coverage,
        base_coverage: Coverage,
        mark_classes: u16,
        /// (class, anchor) per mark coverage index.
        marks: Vec<(u16, Anchor)>,
        /// `bases[base index][mark class]`.
        bases: Vec<Vec<Option<Anchor>>>,
    },
    MarkToLigature {
        mark_coverage: Coverage,
        ligature_coverage: Coverage,
        mark_classes: u16,
        marks: Vec<(u16, Anchor)>,
        /// `ligatures[lig index][component][mark class]`.
        ligatures: Vec<Vec<Vec<Option<Anchor>>>>,
    },
    MarkToMark {
        mark_coverage: Coverage,
        base_mark_coverage: Coverage,
        mark_classes: u16,
        marks: Vec<(u16, Anchor)>,
        base_marks: Vec<Vec<Option<Anchor>>>,
    },
    Context(Vec<ContextRule>),
    ChainContext(Vec<ChainRule>),
}

/// The subtables of one lookup, tagged by stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKind {
    Subst(Vec<SubstSubtable>),
    Pos(Vec<PosSubtable>),
}

/// One decoded lookup: flags, the features that activate it, subtables.
///
/// The feature list is flattened onto the lookup by the parser so the
/// engine can test eligibility without a separate feature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub flags: LookupFlags,
    /// Mark filtering set index, when `USE_MARK_FILTERING_SET` is set.
    pub mark_filtering_set: Option<u16>,
    /// Features that reference this lookup.
    pub features: Vec<Tag>,
    pub kind: LookupKind,
}

/// Read-only facade over one font.
///
/// Immutable after construction and freely shared across threads; all
/// methods observe a consistent snapshot. Absent tables surface as empty
/// query results, never as shaping-time errors.
pub trait FontAdapter: Send + Sync {
    /// A process-unique identity for caching.
    fn face_id(&self) -> u64;

    /// Source path, when the font was loaded from a file. Metadata only.
    fn path(&self) -> Option<&str> {
        None
    }

    fn units_per_em(&self) -> u16;

    /// Typographic ascent in design units (positive, above baseline).
    fn ascent(&self) -> i32;

    /// Typographic descent in design units (positive, below baseline).
    fn descent(&self) -> i32;

    fn line_gap(&self) -> i32;

    /// Map a codepoint to a glyph id; 0 is `.notdef`. Implementations must
    /// consult the Unicode-preferred cmap subtable before platform ones.
    fn map_codepoint(&self, cp: char) -> u32;

    fn metrics(&self, glyph: u32) -> GlyphMetrics;

    /// Number of lookups in the stage's full lookup list.
    fn lookup_count(&self, stage: LookupStage) -> u16;

    /// A lookup by list index, for nested contextual application.
    fn lookup(&self, stage: LookupStage, index: u16) -> Option<&Lookup>;

    /// Indices of the lookups that apply for a script/language, in
    /// font-declared lookup-list order (not feature-declaration order).
    fn lookup_indices(&self, stage: LookupStage, script: Tag, lang: Tag) -> Vec<u16>;

    /// Features the font enables by default for a script/language.
    fn default_features(&self, script: Tag, lang: Tag) -> Vec<Tag>;

    /// The required feature for a script/language, if any. Always applied.
    fn required_feature(&self, script: Tag, lang: Tag) -> Option<Tag> {
        let _ = (script, lang);
        None
    }

    fn glyph_class(&self, glyph: u32) -> GlyphClass;

    /// GDEF mark attachment class; 0 when unassigned.
    fn mark_attachment_class(&self, glyph: u32) -> u8;

    /// Whether `glyph` belongs to GDEF mark filtering set `set`.
    fn mark_set_contains(&self, set: u16, glyph: u32) -> bool;

    /// Legacy `kern` table pair value in design units, if present.
    fn kern_pair(&self, left: u32, right: u32) -> Option<i32>;

    /// Whether GPOS exposes a `kern` feature for this script/language.
    /// When it does, the legacy table is not applied on top.
    fn has_gpos_kern(&self, script: Tag, lang: Tag) -> bool;
}

impl fmt::Debug for dyn FontAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontAdapter")
            .field("face_id", &self.face_id())
            .field("units_per_em", &self.units_per_em())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_glyph_list() {
        let cov = Coverage::Glyphs(vec![3, 7, 9]);
        assert_eq!(cov.index(3), Some(0));
        assert_eq!(cov.index(7), Some(1));
        assert_eq!(cov.index(9), Some(2));
        assert_eq!(cov.index(8), None);
        assert_eq!(cov.len(), 3);
    }

    #[test]
    fn coverage_ranges() {
        let cov = Coverage::Ranges(vec![(10, 12), (20, 20)]);
        assert_eq!(cov.index(10), Some(0));
        assert_eq!(cov.index(12), Some(2));
        assert_eq!(cov.index(20), Some(3));
        assert_eq!(cov.index(13), None);
        assert_eq!(cov.len(), 4);
    }

    #[test]
    fn class_def_lookup() {
        let classes = ClassDef::Table {
            start: 5,
            classes: vec![1, 0, 2],
        };
        assert_eq!(classes.class(5), 1);
        assert_eq!(classes.class(6), 0);
        assert_eq!(classes.class(7), 2);
        assert_eq!(classes.class(4), 0);
        assert_eq!(classes.class(100), 0);

        let ranges = ClassDef::Ranges(vec![(10, 19, 3), (30, 30, 1)]);
        assert_eq!(ranges.class(15), 3);
        assert_eq!(ranges.class(30), 1);
        assert_eq!(ranges.class(29), 0);
    }

    #[test]
    fn lookup_flags_mark_attachment_byte() {
        let flags = LookupFlags::IGNORE_BASE_GLYPHS.with_mark_attachment_type(2);
        assert_eq!(flags.mark_attachment_type(), 2);
        assert!(flags.contains(LookupFlags::IGNORE_BASE_GLYPHS));
        assert_eq!(
            LookupFlags::empty().mark_attachment_type(),
            0,
        );
    }
}
