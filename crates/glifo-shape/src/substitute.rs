// this_file: crates/glifo-shape/src/substitute.rs

//! Feature-driven glyph substitution.
//!
//! Lookups run in font-declared order, never in the order features were
//! requested; feature activation is a per-slot filter. Each eligible
//! lookup makes one pass over the stream, and scanning resumes after a
//! rewritten region so no lookup re-enters its own output.

use glifo_core::{
    FontAdapter, GlyphClass, GlyphStream, Lookup, LookupKind, LookupStage, Result, SequenceLookup,
    SlotFlags, SubstSubtable, Tag,
};

use crate::skip::SkipFilter;

/// How deep nested contextual lookups may recurse.
pub(crate) const NESTED_RECURSION_LIMIT: usize = 2;

/// Applies GSUB-equivalent lookups to a glyph stream.
pub struct SubstitutionEngine;

impl SubstitutionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite `stream` with every eligible substitution lookup for the
    /// run's script and language.
    pub fn apply(
        &self,
        font: &dyn FontAdapter,
        script: Tag,
        language: Tag,
        stream: &mut GlyphStream,
    ) -> Result<()> {
        let indices = font.lookup_indices(LookupStage::Substitution, script, language);
        log::debug!(
            "substitution: {} lookups for {}/{} over {} slots",
            indices.len(),
            script,
            language,
            stream.len()
        );
        for index in indices {
            let Some(lookup) = font.lookup(LookupStage::Substitution, index) else {
                log::warn!("substitution lookup {index} out of range; skipping");
                continue;
            };
            let LookupKind::Subst(subtables) = &lookup.kind else {
                log::warn!("lookup {index} is not a substitution lookup; skipping");
                continue;
            };
            if !stream
                .iter()
                .any(|s| s.any_feature_enabled(&lookup.features))
            {
                continue;
            }
            let reverse = subtables
                .iter()
                .all(|s| matches!(s, SubstSubtable::ReverseChainSingle { .. }));
            if reverse && !subtables.is_empty() {
                self.reverse_pass(font, stream, lookup, subtables);
            } else {
                self.forward_pass(font, stream, lookup, subtables)?;
            }
        }
        Ok(())
    }

    fn forward_pass(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        lookup: &Lookup,
        subtables: &[SubstSubtable],
    ) -> Result<()> {
        let filter = SkipFilter::new(font, lookup);
        let mut i = 0;
        while i < stream.len() {
            let slot = stream.get(i);
            if !slot.any_feature_enabled(&lookup.features) || filter.skips(slot) {
                i += 1;
                continue;
            }
            let len_before = stream.len();
            match self.apply_at(font, stream, &filter, lookup, subtables, i, 0)? {
                // A deletion may legitimately resume in place; anything
                // else must advance so a pass always terminates.
                Some(next) if next > i || stream.len() < len_before => i = next,
                Some(_) | None => i += 1,
            }
        }
        Ok(())
    }

    // Reverse chaining single runs right-to-left and only ever rewrites
    // 1:1, so plain decrementing cannot re-enter a rewritten slot.
    fn reverse_pass(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        lookup: &Lookup,
        subtables: &[SubstSubtable],
    ) {
        let filter = SkipFilter::new(font, lookup);
        let mut i = stream.len();
        while i > 0 {
            i -= 1;
            let slot = stream.get(i);
            if !slot.any_feature_enabled(&lookup.features) || filter.skips(slot) {
                continue;
            }
            for subtable in subtables {
                let SubstSubtable::ReverseChainSingle {
                    coverage,
                    backtrack,
                    lookahead,
                    substitutes,
                } = subtable
                else {
                    continue;
                };
                let Some(idx) = coverage.index(slot.glyph_id) else {
                    continue;
                };
                if !filter.match_backtrack(stream, i, backtrack)
                    || !filter.match_lookahead(stream, i, lookahead)
                {
                    continue;
                }
                let Some(&new) = substitutes.get(idx as usize) else {
                    log::warn!("reverse chaining substitute index {idx} out of range");
                    continue;
                };
                stream.replace_1_1(i, new);
                break;
            }
        }
    }

    /// Try each subtable at position `i`; on the first match perform the
    /// substitution and return the position scanning should resume at.
    fn apply_at(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        filter: &SkipFilter<'_>,
        lookup: &Lookup,
        subtables: &[SubstSubtable],
        i: usize,
        depth: usize,
    ) -> Result<Option<usize>> {
        let glyph = stream.get(i).glyph_id;
        for subtable in subtables {
            match subtable {
                SubstSubtable::Single {
                    coverage,
                    substitutes,
                } => {
                    let Some(idx) = coverage.index(glyph) else {
                        continue;
                    };
                    let Some(&new) = substitutes.get(idx as usize) else {
                        log::warn!("single substitute index {idx} out of range");
                        continue;
                    };
                    stream.replace_1_1(i, new);
                    return Ok(Some(i + 1));
                }
                SubstSubtable::Multiple {
                    coverage,
                    sequences,
                } => {
                    let Some(idx) = coverage.index(glyph) else {
                        continue;
                    };
                    let Some(sequence) = sequences.get(idx as usize) else {
                        log::warn!("multiple substitution sequence {idx} out of range");
                        continue;
                    };
                    stream.decompose(i, sequence)?;
                    for k in i..i + sequence.len() {
                        stream.get_mut(k).flags |= SlotFlags::MULTIPLIED;
                    }
                    // A zero-glyph sequence deleted the slot; resume in place.
                    return Ok(Some(i + sequence.len()));
                }
                SubstSubtable::Alternate {
                    coverage,
                    alternates,
                } => {
                    let Some(idx) = coverage.index(glyph) else {
                        continue;
                    };
                    let Some(set) = alternates.get(idx as usize) else {
                        log::warn!("alternate set {idx} out of range");
                        continue;
                    };
                    if set.is_empty() {
                        continue;
                    }
                    // The feature value doubles as the alternate-index
                    // hint: value v selects alternate v-1.
                    let hint = lookup
                        .features
                        .iter()
                        .filter_map(|t| stream.get(i).feature_value(*t))
                        .find(|&v| v > 0)
                        .unwrap_or(1) as usize;
                    let choice = set.get(hint - 1).copied().unwrap_or(set[0]);
                    stream.replace_1_1(i, choice);
                    return Ok(Some(i + 1));
                }
                SubstSubtable::Ligature {
                    coverage,
                    ligatures,
                } => {
                    let Some(idx) = coverage.index(glyph) else {
                        continue;
                    };
                    let Some(rules) = ligatures.get(idx as usize) else {
                        log::warn!("ligature rule set {idx} out of range");
                        continue;
                    };
                    if let Some(next) = self.try_ligate(font, stream, filter, rules, i) {
                        return Ok(Some(next));
                    }
                }
                SubstSubtable::Context(rules) => {
                    for rule in rules {
                        let Some(positions) = filter.match_input(stream, i, &rule.input) else {
                            continue;
                        };
                        let next =
                            self.apply_nested(font, stream, positions, &rule.actions, depth)?;
                        return Ok(Some(next));
                    }
                }
                SubstSubtable::ChainContext(rules) => {
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
                        let next =
                            self.apply_nested(font, stream, positions, &rule.actions, depth)?;
                        return Ok(Some(next));
                    }
                }
                // Handled by the reverse pass.
                SubstSubtable::ReverseChainSingle { .. } => continue,
            }
        }
        Ok(None)
    }

    // Match one ligature rule set at `i` and fold the components. Skipped
    // marks inside the match stay as slots but join the cohort with the
    // component index they followed, so positioning can re-attach them.
    fn try_ligate(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        filter: &SkipFilter<'_>,
        rules: &[glifo_core::LigatureRule],
        i: usize,
    ) -> Option<usize> {
        'rules: for rule in rules {
            let mut positions = Vec::with_capacity(rule.components.len());
            let mut at = i;
            for &component in &rule.components {
                let Some(j) = filter.following(stream, at) else {
                    continue 'rules;
                };
                if stream.get(j).glyph_id != component {
                    continue 'rules;
                }
                positions.push(j);
                at = j;
            }

            let ligature_id = stream.alloc_ligature_id();
            let last = positions.last().copied().unwrap_or(i);
            let mut component = 0i16;
            for k in (i + 1)..=last {
                if positions.contains(&k) {
                    component += 1;
                    continue;
                }
                let slot = stream.get_mut(k);
                slot.ligature_id = ligature_id;
                slot.ligature_component = component;
            }
            // Trailing marks attach to the last component.
            let mut k = last + 1;
            while k < stream.len() && font.glyph_class(stream.get(k).glyph_id) == GlyphClass::Mark
            {
                let slot = stream.get_mut(k);
                slot.ligature_id = ligature_id;
                slot.ligature_component = rule.components.len() as i16;
                k += 1;
            }

            stream.ligate(i, &positions, rule.glyph, ligature_id);
            return Some(i + 1);
        }
        None
    }

    // Run the nested lookups of a matched contextual rule. Positions are
    // adjusted by the length delta of every nested rewrite so later
    // actions land on the slots the rule matched.
    fn apply_nested(
        &self,
        font: &dyn FontAdapter,
        stream: &mut GlyphStream,
        mut positions: Vec<usize>,
        actions: &[SequenceLookup],
        depth: usize,
    ) -> Result<usize> {
        let mut end = positions.last().copied().unwrap_or(0) + 1;
        if depth >= NESTED_RECURSION_LIMIT {
            log::warn!("nested substitution depth limit reached; rule actions skipped");
            return Ok(end);
        }
        for action in actions {
            let Some(&pos) = positions.get(action.sequence_index as usize) else {
                log::warn!(
                    "sequence index {} outside matched context",
                    action.sequence_index
                );
                continue;
            };
            let Some(nested) = font.lookup(LookupStage::Substitution, action.lookup_index) else {
                log::warn!("nested lookup {} out of range", action.lookup_index);
                continue;
            };
            let LookupKind::Subst(nested_subtables) = &nested.kind else {
                log::warn!("nested lookup {} is not a substitution", action.lookup_index);
                continue;
            };
            let nested_filter = SkipFilter::new(font, nested);
            let before = stream.len() as isize;
            self.apply_at(
                font,
                stream,
                &nested_filter,
                nested,
                nested_subtables,
                pos,
                depth + 1,
            )?;
            let delta = stream.len() as isize - before;
            if delta != 0 {
                for p in positions.iter_mut() {
                    if *p > pos {
                        *p = (*p as isize + delta) as usize;
                    }
                }
                end = (end as isize + delta).max(0) as usize;
            }
        }
        Ok(end)
    }
}

impl Default for SubstitutionEngine {
    fn default() -> Self {
        Self::new()
    }
}
