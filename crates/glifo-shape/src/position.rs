// this_file: crates/glifo-shape/src/position.rs

//! Glyph positioning: advances, offsets, attachments.
//!
//! Every pass starts from freshly seeded font advances, which is what
//! makes positioning idempotent: re-running it with unchanged substitution
//! state reproduces the same offsets. Positioning never inserts or removes
//! slots, so the relative attachment references it records stay valid for
//! the rest of the pipeline.

use glifo_core::{
    Anchor, Coverage, FontAdapter, GlyphClass, GlyphStream, LookupKind, LookupStage, PairData,
    PosSubtable, Result, SequenceLookup, Tag, ValueRecord,
};

use crate::skip::SkipFilter;
use crate::substitute::NESTED_RECURSION_LIMIT;

/// Applies GPOS-equivalent lookups and legacy kerning to a glyph stream.
pub struct PositioningEngine;

impl PositioningEngine {
    pub fn new() -> Self {
        Self
    }

    /// Seed advances and run every eligible positioning lookup, then the
    /// legacy kern table when the font has no GPOS kerning.
    pub fn apply(
        &self,
        font: &dyn FontAdapter,
        script: Tag,
        language: Tag,
        apply_kerning: bool,
        stream: &mut GlyphStream,
    ) -> Result<()> {
        self.seed(font, stream);

        let indices = font.lookup_indices(LookupStage::Positioning, script, language);
        log::debug!(
            "positioning: {} lookups for {}/{} over {} slots",
            indices.len(),
            script,
            language,
            stream.len()
        );
        for index in indices {
            let Some(lookup) = font.lookup(LookupStage::Positioning, index) else {
                log::warn!("positioning lookup {index} out of range; skipping");
                continue;
            };
            let LookupKind::Pos(subtables) = &lookup.kind else {
                log::warn!("lookup {index} is not a positioning lookup; skipping");
                continue;
            };
            if !stream
                .iter()
                .any(|s| s.any_feature_enabled(&lookup.features))
            {
                continue;
            }
            let filter = SkipFilter::new(font, lookup);
            let mut i = 0;
            while i < stream.len() {
                let slot = stream.get(i);
                if !slot.any_feature_enabled(&lookup.features) || filter.skips(slot) {
                    i += 1;
                    continue;
                }
                match self.apply_at(font, stream, &filter, subtables, i, 0) {
                    Some(next) if next > i => i = next,
                    _ => i += 1,
                }
            }
        }

        if apply_kerning && !font.has_gpos_kern(script, language) {
            self.apply_legacy_kerning(font, stream);
        }
        Ok(())
    }

    // Unhinted font advances; also resets attachment state so that a
    // second pass observes the same starting point as the first.
    fn seed(&self, font: &dyn FontAdapter, stream: &mut GlyphStream) {
        for i in 0..stream.len() {
            let metrics = font.metrics(stream.get(i).glyph_id);
            let slot = stream.get_mut(i);
            slot.x_advance = metrics.advance_x;
            slot.y_advance = metrics.advance_y;
            slot.x_offset = 0;
            slot.y_offset = 0;
            slot.mark_attachment = -1;
            slot.cursive_attachment = -1;
        }
    }

    /// Try each subtable at `i`; on the first match apply the adjustment
    /// and return the resume position. Ties across rules resolve by
    /// subtable order, then by position.
    fn apply_at(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        filter: &SkipFilter<'_>,
        subtables: &[PosSubtable],
        i: usize,
        depth: usize,
    ) -> Option<usize> {
        for subtable in subtables {
            let applied = match subtable {
                PosSubtable::SingleAdjust { coverage, values } => {
                    self.try_single(stream, coverage, values, i)
                }
                PosSubtable::PairAdjust { coverage, pairs } => {
                    self.try_pair(stream, filter, coverage, pairs, i)
                }
                PosSubtable::Cursive { coverage, anchors } => {
                    self.try_cursive(stream, filter, coverage, anchors, i)
                }
                PosSubtable::MarkToBase {
                    mark_coverage,
                    base_coverage,
                    marks,
                    bases,
                    ..
                } => self.try_mark_to_base(font, stream, mark_coverage, base_coverage, marks, bases, i),
                PosSubtable::MarkToLigature {
                    mark_coverage,
                    ligature_coverage,
                    marks,
                    ligatures,
                    ..
                } => self.try_mark_to_ligature(
                    font,
                    stream,
                    mark_coverage,
                    ligature_coverage,
                    marks,
                    ligatures,
                    i,
                ),
                PosSubtable::MarkToMark {
                    mark_coverage,
                    base_mark_coverage,
                    marks,
                    base_marks,
                    ..
                } => self.try_mark_to_mark(
                    font,
                    stream,
                    mark_coverage,
                    base_mark_coverage,
                    marks,
                    base_marks,
                    i,
                ),
                PosSubtable::Context(rules) => {
                    let mut result = None;
                    for rule in rules {
                        if let Some(positions) = filter.match_input(stream, i, &rule.input) {
                            result = Some(self.apply_nested(
                                font,
                                stream,
                                &positions,
                                &rule.actions,
                                depth,
                            ));
                            break;
                        }
                    }
                    result
                }
                PosSubtable::ChainContext(rules) => {
                    let mut result = None;
                    for rule in rules {
                        let Some(positions) = filter.match_input(stream, i, &rule.input) else {
                            continue;
                        };
                        if !filter.match_backtrack(stream, i, &rule.backtrack) {
                            continue;
                        }
                        let last = *positions.last().unwrap_or(&i);
                        if !filter.match_lookahead(stream, last, &rule.lookahead) {
                            continue;
                        }
                        result = Some(self.apply_nested(
                            font,
                            stream,
                            &positions,
                            &rule.actions,
                            depth,
                        ));
                        break;
                    }
                    result
                }
            };
            if applied.is_some() {
                return applied;
            }
        }
        None
    }

    fn try_single(
        &self,
        stream: &mut GlyphStream,
        coverage: &Coverage,
        values: &[ValueRecord],
        i: usize,
    ) -> Option<usize> {
        let idx = coverage.index(stream.get(i).glyph_id)?;
        let Some(value) = values.get(idx as usize) else {
            log::warn!("single adjustment index {idx} out of range");
            return None;
        };
        apply_value(stream, i, value);
        Some(i + 1)
    }

    fn try_pair(
        &self,
        stream: &mut GlyphStream,
        filter: &SkipFilter<'_>,
        coverage: &Coverage,
        pairs: &PairData,
        i: usize,
    ) -> Option<usize> {
        let glyph = stream.get(i).glyph_id;
        let idx = coverage.index(glyph)?;
        let j = filter.following(stream, i)?;
        let second = stream.get(j).glyph_id;
        let (first_value, second_value) = match pairs {
            PairData::Glyphs(sets) => {
                let Some(entries) = sets.get(idx as usize) else {
                    log::warn!("pair set {idx} out of range");
                    return None;
                };
                let k = entries.binary_search_by_key(&second, |&(g, _, _)| g).ok()?;
                (entries[k].1, entries[k].2)
            }
            PairData::Classes {
                class1,
                class2,
                matrix,
            } => {
                let c1 = class1.class(glyph) as usize;
                let c2 = class2.class(second) as usize;
                matrix.get(c1).and_then(|row| row.get(c2)).copied()?
            }
        };
        apply_value(stream, i, &first_value);
        apply_value(stream, j, &second_value);
        // Per OpenType, scanning resumes at the second glyph unless its
        // record was also consulted.
        Some(if second_value.is_zero() { j } else { j + 1 })
    }

    fn try_cursive(
        &self,
        stream: &mut GlyphStream,
        filter: &SkipFilter<'_>,
        coverage: &Coverage,
        anchors: &[(Option<Anchor>, Option<Anchor>)],
        i: usize,
    ) -> Option<usize> {
        let idx = coverage.index(stream.get(i).glyph_id)?;
        let exit = anchors.get(idx as usize).and_then(|a| a.1)?;
        let j = filter.following(stream, i)?;
        let next_idx = coverage.index(stream.get(j).glyph_id)?;
        let entry = anchors.get(next_idx as usize).and_then(|a| a.0)?;

        // The pen lands on the exit anchor; the later slot is lifted so
        // the anchors coincide.
        let (prev_x_offset, prev_y_offset) = {
            let prev = stream.get(i);
            (prev.x_offset, prev.y_offset)
        };
        let next_x_offset = stream.get(j).x_offset;
        stream.get_mut(i).x_advance = prev_x_offset + exit.x - (next_x_offset + entry.x);
        let next = stream.get_mut(j);
        next.y_offset = prev_y_offset + exit.y - entry.y;
        next.cursive_attachment = (j - i) as i16;
        Some(j)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_mark_to_base(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        mark_coverage: &Coverage,
        base_coverage: &Coverage,
        marks: &[(u16, Anchor)],
        bases: &[Vec<Option<Anchor>>],
        i: usize,
    ) -> Option<usize> {
        let mark_idx = mark_coverage.index(stream.get(i).glyph_id)?;
        // The base search walks over intervening marks no matter what the
        // lookup flags say.
        let base = (0..i)
            .rev()
            .find(|&k| font.glyph_class(stream.get(k).glyph_id) != GlyphClass::Mark)?;
        let base_idx = base_coverage.index(stream.get(base).glyph_id)?;
        let &(class, mark_anchor) = marks.get(mark_idx as usize)?;
        let base_anchor = bases
            .get(base_idx as usize)
            .and_then(|row| row.get(class as usize))
            .copied()
            .flatten()?;
        attach_mark(stream, i, base, mark_anchor, base_anchor);
        Some(i + 1)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_mark_to_ligature(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        mark_coverage: &Coverage,
        ligature_coverage: &Coverage,
        marks: &[(u16, Anchor)],
        ligatures: &[Vec<Vec<Option<Anchor>>>],
        i: usize,
    ) -> Option<usize> {
        let mark_idx = mark_coverage.index(stream.get(i).glyph_id)?;
        let base = (0..i)
            .rev()
            .find(|&k| font.glyph_class(stream.get(k).glyph_id) != GlyphClass::Mark)?;
        let lig_idx = ligature_coverage.index(stream.get(base).glyph_id)?;
        let &(class, mark_anchor) = marks.get(mark_idx as usize)?;
        let components = ligatures.get(lig_idx as usize)?;
        if components.is_empty() {
            return None;
        }
        // The substitution engine recorded which component the mark
        // followed; marks outside the cohort attach to the last component.
        let mark = stream.get(i);
        let component = if mark.ligature_id != 0
            && mark.ligature_id == stream.get(base).ligature_id
            && mark.ligature_component >= 0
        {
            (mark.ligature_component as usize).min(components.len() - 1)
        } else {
            components.len() - 1
        };
        let base_anchor = components
            .get(component)
            .and_then(|row| row.get(class as usize))
            .copied()
            .flatten()?;
        attach_mark(stream, i, base, mark_anchor, base_anchor);
        Some(i + 1)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_mark_to_mark(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        mark_coverage: &Coverage,
        base_mark_coverage: &Coverage,
        marks: &[(u16, Anchor)],
        base_marks: &[Vec<Option<Anchor>>],
        i: usize,
    ) -> Option<usize> {
        let mark_idx = mark_coverage.index(stream.get(i).glyph_id)?;
        // The carrying mark must be the immediately preceding mark slot.
        let base = i.checked_sub(1)?;
        if font.glyph_class(stream.get(base).glyph_id) != GlyphClass::Mark {
            return None;
        }
        let base_idx = base_mark_coverage.index(stream.get(base).glyph_id)?;
        let &(class, mark_anchor) = marks.get(mark_idx as usize)?;
        let base_anchor = base_marks
            .get(base_idx as usize)
            .and_then(|row| row.get(class as usize))
            .copied()
            .flatten()?;
        attach_mark(stream, i, base, mark_anchor, base_anchor);
        Some(i + 1)
    }

    // Positioning never changes the stream length, so nested application
    // needs no position fixups.
    fn apply_nested(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        positions: &[usize],
        actions: &[SequenceLookup],
        depth: usize,
    ) -> usize {
        let end = positions.last().copied().unwrap_or(0) + 1;
        if depth >= NESTED_RECURSION_LIMIT {
            log::warn!("nested positioning depth limit reached; rule actions skipped");
            return end;
        }
        for action in actions {
            let Some(&pos) = positions.get(action.sequence_index as usize) else {
                log::warn!(
                    "sequence index {} outside matched context",
                    action.sequence_index
                );
                continue;
            };
            let Some(nested) = font.lookup(LookupStage::Positioning, action.lookup_index) else {
                log::warn!("nested lookup {} out of range", action.lookup_index);
                continue;
            };
            let LookupKind::Pos(nested_subtables) = &nested.kind else {
                log::warn!(
                    "nested lookup {} is not a positioning lookup",
                    action.lookup_index
                );
                continue;
            };
            let nested_filter = SkipFilter::new(font, nested);
            self.apply_at(font, stream, &nested_filter, nested_subtables, pos, depth + 1);
        }
        end
    }

    // Pair adjustments from the legacy kern table, applied between
    // consecutive non-mark slots.
    fn apply_legacy_kerning(&self, font: &dyn FontAdapter, stream: &mut GlyphStream) {
        let mut previous: Option<usize> = None;
        for i in 0..stream.len() {
            if font.glyph_class(stream.get(i).glyph_id) == GlyphClass::Mark {
                continue;
            }
            if let Some(p) = previous {
                if let Some(value) = font.kern_pair(stream.get(p).glyph_id, stream.get(i).glyph_id)
                {
                    log::trace!("legacy kern {} -> {}: {}", p, i, value);
                    stream.get_mut(p).x_advance += value;
                }
            }
            previous = Some(i);
        }
    }
}

impl Default for PositioningEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_value(stream: &mut GlyphStream, i: usize, value: &ValueRecord) {
    let slot = stream.get_mut(i);
    slot.x_advance += value.x_advance;
    slot.y_advance += value.y_advance;
    slot.x_offset += value.x_offset;
    slot.y_offset += value.y_offset;
}

// Pin a mark to its base anchor: the mark's offset becomes the base
// anchor minus the mark anchor, compensated for the pen distance between
// the two slots. The mark stops consuming horizontal space.
fn attach_mark(
    stream: &mut GlyphStream,
    mark: usize,
    base: usize,
    mark_anchor: Anchor,
    base_anchor: Anchor,
) {
    let advance_between: i32 = (base..mark).map(|k| stream.get(k).x_advance).sum();
    let (base_x_offset, base_y_offset) = {
        let b = stream.get(base);
        (b.x_offset, b.y_offset)
    };
    let slot = stream.get_mut(mark);
    slot.x_offset = base_x_offset + base_anchor.x - mark_anchor.x - advance_between;
    slot.y_offset = base_y_offset + base_anchor.y - mark_anchor.y;
    slot.x_advance = 0;
    slot.y_advance = 0;
    slot.mark_attachment = (mark - base) as i16;
}

#[cfg(test)]
mod tests {
    use super::*;
    use glifo_core::{Coverage, FeatureSetting, LookupFlags, RunId, Slot};
    use glifo_font::{FontBuilder, StaticFont};
    use std::sync::Arc;

    const LATN: Tag = Tag(*b"latn");
    const DFLT: Tag = Tag(*b"dflt");

    fn stream_for(font: &StaticFont, text: &str, features: &[(&[u8; 4], u32)]) -> GlyphStream {
        let plan: Arc<[FeatureSetting]> = features
            .iter()
            .map(|&(t, v)| FeatureSetting::new(Tag::new(t), v))
            .collect();
        let mut stream = GlyphStream::new();
        for (i, cp) in text.char_indices() {
            stream
                .append(Slot::new(
                    i as u32,
                    cp,
                    font.map_codepoint(cp),
                    0,
                    LATN,
                    RunId(0),
                    plan.clone(),
                ))
                .unwrap();
        }
        stream
    }

    fn advances(stream: &GlyphStream) -> Vec<i32> {
        stream.iter().map(|s| s.x_advance).collect()
    }

    #[test]
    fn seeding_uses_font_advances() {
        let font = FontBuilder::new(1000)
            .glyph('a', 1, 500)
            .glyph('b', 2, 620)
            .build()
            .unwrap();
        let mut stream = stream_for(&font, "ab", &[]);
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, false, &mut stream)
            .unwrap();
        assert_eq!(advances(&stream), vec![500, 620]);
    }

    #[test]
    fn single_adjustment() {
        let font = FontBuilder::new(1000)
            .glyph('a', 1, 500)
            .gpos_lookup(
                &[b"cpsp"],
                LookupFlags::empty(),
                vec![PosSubtable::SingleAdjust {
                    coverage: Coverage::Glyphs(vec![1]),
                    values: vec![ValueRecord {
                        x_advance: 40,
                        y_offset: -15,
                        ..ValueRecord::ZERO
                    }],
                }],
            )
            .build()
            .unwrap();
        let mut stream = stream_for(&font, "a", &[(b"cpsp", 1)]);
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, false, &mut stream)
            .unwrap();
        assert_eq!(stream.get(0).x_advance, 540);
        assert_eq!(stream.get(0).y_offset, -15);
    }

    #[test]
    fn pair_adjustment_by_glyph() {
        let font = FontBuilder::new(1000)
            .glyph('A', 10, 700)
            .glyph('V', 11, 680)
            .gpos_lookup(
                &[b"kern"],
                LookupFlags::empty(),
                vec![PosSubtable::PairAdjust {
                    coverage: Coverage::Glyphs(vec![10]),
                    pairs: PairData::Glyphs(vec![vec![(
                        11,
                        ValueRecord::x_advance(-80),
                        ValueRecord::ZERO,
                    )]]),
                }],
            )
            .build()
            .unwrap();
        let mut stream = stream_for(&font, "AV", &[(b"kern", 1)]);
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, true, &mut stream)
            .unwrap();
        assert_eq!(advances(&stream), vec![620, 680]);
    }

    #[test]
    fn pair_adjustment_by_class() {
        let font = FontBuilder::new(1000)
            .glyph('A', 10, 700)
            .glyph('V', 11, 680)
            .glyph('W', 12, 700)
            .gpos_lookup(
                &[b"kern"],
                LookupFlags::empty(),
                vec![PosSubtable::PairAdjust {
                    coverage: Coverage::Glyphs(vec![10]),
                    pairs: PairData::Classes {
                        class1: glifo_core::ClassDef::Ranges(vec![(10, 10, 1)]),
                        class2: glifo_core::ClassDef::Ranges(vec![(11, 12, 1)]),
                        matrix: vec![
                            vec![(ValueRecord::ZERO, ValueRecord::ZERO); 2],
                            vec![
                                (ValueRecord::ZERO, ValueRecord::ZERO),
                                (ValueRecord::x_advance(-60), ValueRecord::ZERO),
                            ],
                        ],
                    },
                }],
            )
            .build()
            .unwrap();
        let mut stream = stream_for(&font, "AW", &[(b"kern", 1)]);
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, true, &mut stream)
            .unwrap();
        assert_eq!(advances(&stream), vec![640, 700]);
    }

    #[test]
    fn legacy_kerning_when_no_gpos_kern() {
        let font = FontBuilder::new(1000)
            .glyph('A', 10, 700)
            .glyph('V', 11, 680)
            .kern(10, 11, -80)
            .build()
            .unwrap();
        let engine = PositioningEngine::new();

        let mut kerned = stream_for(&font, "AV", &[]);
        engine.apply(&font, LATN, DFLT, true, &mut kerned).unwrap();
        assert_eq!(advances(&kerned), vec![620, 680]);

        let mut unkerned = stream_for(&font, "AV", &[]);
        engine
            .apply(&font, LATN, DFLT, false, &mut unkerned)
            .unwrap();
        assert_eq!(advances(&unkerned), vec![700, 680]);
    }

    #[test]
    fn gpos_kern_disables_legacy_table() {
        // Both a GPOS kern feature and a legacy pair: only GPOS applies.
        let font = FontBuilder::new(1000)
            .glyph('A', 10, 700)
            .glyph('V', 11, 680)
            .kern(10, 11, -500)
            .gpos_lookup(
                &[b"kern"],
                LookupFlags::empty(),
                vec![PosSubtable::PairAdjust {
                    coverage: Coverage::Glyphs(vec![10]),
                    pairs: PairData::Glyphs(vec![vec![(
                        11,
                        ValueRecord::x_advance(-80),
                        ValueRecord::ZERO,
                    )]]),
                }],
            )
            .build()
            .unwrap();
        let mut stream = stream_for(&font, "AV", &[(b"kern", 1)]);
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, true, &mut stream)
            .unwrap();
        assert_eq!(advances(&stream), vec![620, 680]);
    }

    #[test]
    fn cursive_attachment_aligns_anchors() {
        let font = FontBuilder::new(1000)
            .glyph('a', 1, 500)
            .glyph('b', 2, 500)
            .gpos_lookup(
                &[b"curs"],
                LookupFlags::empty(),
                vec![PosSubtable::Cursive {
                    coverage: Coverage::Glyphs(vec![1, 2]),
                    anchors: vec![
                        (Some(Anchor { x: 20, y: 10 }), Some(Anchor { x: 480, y: 40 })),
                        (Some(Anchor { x: 30, y: -20 }), Some(Anchor { x: 470, y: 0 })),
                    ],
                }],
            )
            .build()
            .unwrap();
        let mut stream = stream_for(&font, "ab", &[(b"curs", 1)]);
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, false, &mut stream)
            .unwrap();
        // Exit of a at x=480 meets entry of b at x=30: advance 450.
        assert_eq!(stream.get(0).x_advance, 450);
        // b is lifted so the anchors coincide vertically: 40 - (-20).
        assert_eq!(stream.get(1).y_offset, 60);
        assert_eq!(stream.get(1).cursive_attachment, 1);
    }

    #[test]
    fn mark_attaches_to_base() {
        use glifo_core::GlyphClass;
        let font = FontBuilder::new(1000)
            .glyph('e', 1, 520)
            .glyph('\u{0301}', 100, 180)
            .glyph_class(1, GlyphClass::Base)
            .glyph_class(100, GlyphClass::Mark)
            .gpos_lookup(
                &[b"mark"],
                LookupFlags::empty(),
                vec![PosSubtable::MarkToBase {
                    mark_coverage: Coverage::Glyphs(vec![100]),
                    base_coverage: Coverage::Glyphs(vec![1]),
                    mark_classes: 1,
                    marks: vec![(0, Anchor { x: 90, y: 0 })],
                    bases: vec![vec![Some(Anchor { x: 260, y: 540 })]],
                }],
            )
            .build()
            .unwrap();
        let mut stream = stream_for(&font, "e\u{0301}", &[(b"mark", 1)]);
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, false, &mut stream)
            .unwrap();
        let mark = stream.get(1);
        // 260 - 90 - 520 (pen distance back to the base).
        assert_eq!(mark.x_offset, -350);
        assert_eq!(mark.y_offset, 540);
        assert_eq!(mark.x_advance, 0);
        assert_eq!(mark.mark_attachment, 1);
        // The base keeps its advance.
        assert_eq!(stream.get(0).x_advance, 520);
    }

    #[test]
    fn mark_attaches_to_ligature_component() {
        use glifo_core::GlyphClass;
        let font = FontBuilder::new(1000)
            .glyph_advance(20, 900)
            .glyph('\u{0301}', 100, 0)
            .glyph_class(20, GlyphClass::Ligature)
            .glyph_class(100, GlyphClass::Mark)
            .gpos_lookup(
                &[b"mark"],
                LookupFlags::empty(),
                vec![PosSubtable::MarkToLigature {
                    mark_coverage: Coverage::Glyphs(vec![100]),
                    ligature_coverage: Coverage::Glyphs(vec![20]),
                    mark_classes: 1,
                    marks: vec![(0, Anchor { x: 0, y: 0 })],
                    ligatures: vec![vec![
                        vec![Some(Anchor { x: 150, y: 500 })],
                        vec![Some(Anchor { x: 600, y: 500 })],
                    ]],
                }],
            )
            .build()
            .unwrap();
        // Hand-build the post-substitution state: ligature then its mark,
        // cohort recorded by the substitution engine.
        let mut stream = stream_for(&font, "x\u{0301}", &[(b"mark", 1)]);
        {
            let slot = stream.get_mut(0);
            slot.glyph_id = 20;
            slot.ligature_id = 1;
        }
        {
            let slot = stream.get_mut(1);
            slot.glyph_id = 100;
            slot.ligature_id = 1;
            slot.ligature_component = 1;
        }
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, false, &mut stream)
            .unwrap();
        let mark = stream.get(1);
        // Second component anchor: 600 - 0 - 900.
        assert_eq!(mark.x_offset, -300);
        assert_eq!(mark.y_offset, 500);
    }

    #[test]
    fn mark_to_mark_stacks() {
        use glifo_core::GlyphClass;
        let font = FontBuilder::new(1000)
            .glyph('e', 1, 520)
            .glyph('\u{0301}', 100, 0)
            .glyph('\u{0308}', 101, 0)
            .glyph_class(1, GlyphClass::Base)
            .glyph_class(100, GlyphClass::Mark)
            .glyph_class(101, GlyphClass::Mark)
            .gpos_lookup(
                &[b"mkmk"],
                LookupFlags::empty(),
                vec![PosSubtable::MarkToMark {
                    mark_coverage: Coverage::Glyphs(vec![101]),
                    base_mark_coverage: Coverage::Glyphs(vec![100]),
                    mark_classes: 1,
                    marks: vec![(0, Anchor { x: 50, y: 0 })],
                    base_marks: vec![vec![Some(Anchor { x: 50, y: 120 })]],
                }],
            )
            .build()
            .unwrap();
        let mut stream = stream_for(&font, "e\u{0301}\u{0308}", &[(b"mkmk", 1)]);
        PositioningEngine::new()
            .apply(&font, LATN, DFLT, false, &mut stream)
            .unwrap();
        let upper = stream.get(2);
        assert_eq!(upper.y_offset, 120);
        assert_eq!(upper.mark_attachment, 1);
    }

    #[test]
    fn positioning_is_idempotent() {
        let font = FontBuilder::new(1000)
            .glyph('A', 10, 700)
            .glyph('V', 11, 680)
            .kern(10, 11, -80)
            .gpos_lookup(
                &[b"cpsp"],
                LookupFlags::empty(),
                vec![PosSubtable::SingleAdjust {
                    coverage: Coverage::Glyphs(vec![10]),
                    values: vec![ValueRecord::x_advance(12)],
                }],
            )
            .build()
            .unwrap();
        let engine = PositioningEngine::new();
        let mut stream = stream_for(&font, "AV", &[(b"cpsp", 1)]);
        engine.apply(&font, LATN, DFLT, true, &mut stream).unwrap();
        let first: Vec<(i32, i32, i32, i32)> = stream
            .iter()
            .map(|s| (s.x_advance, s.y_advance, s.x_offset, s.y_offset))
            .collect();
        engine.apply(&font, LATN, DFLT, true, &mut stream).unwrap();
        let second: Vec<(i32, i32, i32, i32)> = stream
            .iter()
            .map(|s| (s.x_advance, s.y_advance, s.x_offset, s.y_offset))
            .collect();
        assert_eq!(first, second);
    }
}
