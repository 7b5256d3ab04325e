//! Construction-time table sanity checks.
//!
//! Everything here runs once in `FontBuilder::build`. The rule: a
//! structural problem is fatal and eager, so the shaping engines can
//! treat every subtable they receive as internally consistent and only
//! ever degrade on semantic gaps (absent anchors, uncovered glyphs).

use glifo_core::{
    ChainRule, ContextRule, Coverage, FontError, Lookup, LookupKind, PairData, PosSubtable,
    SubstSubtable,
};

fn malformed(table: &'static str, reason: String) -> FontError {
    FontError::Malformed { table, reason }
}

fn check_coverage(table: &'static str, coverage: &Coverage) -> Result<(), FontError> {
    match coverage {
        Coverage::Glyphs(glyphs) => {
            if glyphs.windows(2).any(|w| w[0] >= w[1]) {
                return Err(malformed(table, "coverage glyphs not sorted".into()));
            }
        }
        Coverage::Ranges(ranges) => {
            for window in ranges.windows(2) {
                if window[0].1 >= window[1].0 {
                    return Err(malformed(table, "coverage ranges overlap".into()));
                }
            }
            if ranges.iter().any(|&(start, end)| start > end) {
                return Err(malformed(table, "coverage range inverted".into()));
            }
        }
    }
    Ok(())
}

fn check_parallel(
    table: &'static str,
    what: &str,
    coverage: &Coverage,
    len: usize,
) -> Result<(), FontError> {
    if coverage.len() != len {
        return Err(malformed(
            table,
            format!(
                "{what} count {len} does not match coverage count {}",
                coverage.len()
            ),
        ));
    }
    Ok(())
}

fn check_context_rules(
    table: &'static str,
    rules: &[ContextRule],
    lookup_count: usize,
) -> Result<(), FontError> {
    for rule in rules {
        if rule.input.is_empty() {
            return Err(malformed(table, "context rule with empty input".into()));
        }
        for coverage in &rule.input {
            check_coverage(table, coverage)?;
        }
        check_actions(table, rule.input.len(), &rule.actions, lookup_count)?;
    }
    Ok(())
}

fn check_chain_rules(
    table: &'static str,
    rules: &[ChainRule],
    lookup_count: usize,
) -> Result<(), FontError> {
    for rule in rules {
        if rule.input.is_empty() {
            return Err(malformed(table, "chain rule with empty input".into()));
        }
        for coverage in rule
            .backtrack
            .iter()
            .chain(&rule.input)
            .chain(&rule.lookahead)
        {
            check_coverage(table, coverage)?;
        }
        check_actions(table, rule.input.len(), &rule.actions, lookup_count)?;
    }
    Ok(())
}

fn check_actions(
    table: &'static str,
    input_len: usize,
    actions: &[glifo_core::SequenceLookup],
    lookup_count: usize,
) -> Result<(), FontError> {
    for action in actions {
        if usize::from(action.sequence_index) >= input_len {
            return Err(malformed(
                table,
                format!("sequence index {} outside input", action.sequence_index),
            ));
        }
        if usize::from(action.lookup_index) >= lookup_count {
            return Err(malformed(
                table,
                format!("nested lookup index {} out of range", action.lookup_index),
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_gsub(lookups: &[Lookup]) -> Result<(), FontError> {
    const T: &str = "GSUB";
    for lookup in lookups {
        let LookupKind::Subst(subtables) = &lookup.kind else {
            return Err(malformed(T, "positioning subtables in GSUB list".into()));
        };
        for subtable in subtables {
            match subtable {
                SubstSubtable::Single {
                    coverage,
                    substitutes,
                } => {
                    check_coverage(T, coverage)?;
                    check_parallel(T, "substitute", coverage, substitutes.len())?;
                }
                SubstSubtable::Multiple {
                    coverage,
                    sequences,
                } => {
                    check_coverage(T, coverage)?;
                    check_parallel(T, "sequence", coverage, sequences.len())?;
                }
                SubstSubtable::Alternate {
                    coverage,
                    alternates,
                } => {
                    check_coverage(T, coverage)?;
                    check_parallel(T, "alternate set", coverage, alternates.len())?;
                }
                SubstSubtable::Ligature {
                    coverage,
                    ligatures,
                } => {
                    check_coverage(T, coverage)?;
                    check_parallel(T, "ligature set", coverage, ligatures.len())?;
                }
                SubstSubtable::Context(rules) => {
                    check_context_rules(T, rules, lookups.len())?;
                }
                SubstSubtable::ChainContext(rules) => {
                    check_chain_rules(T, rules, lookups.len())?;
                }
                SubstSubtable::ReverseChainSingle {
                    coverage,
                    backtrack,
                    lookahead,
                    substitutes,
                } => {
                    check_coverage(T, coverage)?;
                    for c in backtrack.iter().chain(lookahead) {
                        check_coverage(T, c)?;
                    }
                    check_parallel(T, "substitute", coverage, substitutes.len())?;
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn check_gpos(lookups: &[Lookup]) -> Result<(), FontError> {
    const T: &str = "GPOS";
    for lookup in lookups {
        let LookupKind::Pos(subtables) = &lookup.kind else {
            return Err(malformed(T, "substitution subtables in GPOS list".into()));
        };
        for subtable in subtables {
            match subtable {
                PosSubtable::SingleAdjust { coverage, values } => {
                    check_coverage(T, coverage)?;
                    check_parallel(T, "value record", coverage, values.len())?;
                }
                PosSubtable::PairAdjust { coverage, pairs } => {
                    check_coverage(T, coverage)?;
                    match pairs {
                        PairData::Glyphs(sets) => {
                            check_parallel(T, "pair set", coverage, sets.len())?;
                            for entries in sets {
                                if entries.windows(2).any(|w| w[0].0 >= w[1].0) {
                                    return Err(malformed(
                                        T,
                                        "pair entries not sorted by second glyph".into(),
                                    ));
                                }
                            }
                        }
                        PairData::Classes { matrix, .. } => {
                            let width = matrix.first().map(Vec::len).unwrap_or(0);
                            if matrix.iter().any(|row| row.len() != width) {
                                return Err(malformed(T, "ragged pair class matrix".into()));
                            }
                        }
                    }
                }
                PosSubtable::Cursive { coverage, anchors } => {
                    check_coverage(T, coverage)?;
                    check_parallel(T, "anchor pair", coverage, anchors.len())?;
                }
                PosSubtable::MarkToBase {
                    mark_coverage,
                    base_coverage,
                    mark_classes,
                    marks,
                    bases,
                } => {
                    check_coverage(T, mark_coverage)?;
                    check_coverage(T, base_coverage)?;
                    check_parallel(T, "mark record", mark_coverage, marks.len())?;
                    check_parallel(T, "base record", base_coverage, bases.len())?;
                    check_mark_records(T, *mark_classes, marks, bases)?;
                }
                PosSubtable::MarkToLigature {
                    mark_coverage,
                    ligature_coverage,
                    mark_classes,
                    marks,
                    ligatures,
                } => {
                    check_coverage(T, mark_coverage)?;
                    check_coverage(T, ligature_coverage)?;
                    check_parallel(T, "mark record", mark_coverage, marks.len())?;
                    check_parallel(T, "ligature record", ligature_coverage, ligatures.len())?;
                    for (class, _) in marks {
                        if class >= mark_classes {
                            return Err(malformed(T, "mark class out of range".into()));
                        }
                    }
                    for components in ligatures {
                        for row in components {
                            if row.len() != usize::from(*mark_classes) {
                                return Err(malformed(
                                    T,
                                    "ligature anchor row width mismatch".into(),
                                ));
                            }
                        }
                    }
                }
                PosSubtable::MarkToMark {
                    mark_coverage,
                    base_mark_coverage,
                    mark_classes,
                    marks,
                    base_marks,
                } => {
                    check_coverage(T, mark_coverage)?;
                    check_coverage(T, base_mark_coverage)?;
                    check_parallel(T, "mark record", mark_coverage, marks.len())?;
                    check_parallel(T, "base mark record", base_mark_coverage, base_marks.len())?;
                    check_mark_records(T, *mark_classes, marks, base_marks)?;
                }
                PosSubtable::Context(rules) => {
                    check_context_rules(T, rules, lookups.len())?;
                }
                PosSubtable::ChainContext(rules) => {
                    check_chain_rules(T, rules, lookups.len())?;
                }
            }
        }
    }
    Ok(())
}

fn check_mark_records(
    table: &'static str,
    mark_classes: u16,
    marks: &[(u16, glifo_core::Anchor)],
    bases: &[Vec<Option<glifo_core::Anchor>>],
) -> Result<(), FontError> {
    for (class, _) in marks {
        if *class >= mark_classes {
            return Err(malformed(table, "mark class out of range".into()));
        }
    }
    for row in bases {
        if row.len() != usize::from(mark_classes) {
            return Err(malformed(table, "anchor row width mismatch".into()));
        }
    }
    Ok(())
}

pub(crate) fn check_mark_sets(
    gsub: &[Lookup],
    gpos: &[Lookup],
    set_count: usize,
) -> Result<(), FontError> {
    for lookup in gsub.iter().chain(gpos) {
        if let Some(set) = lookup.mark_filtering_set {
            if usize::from(set) >= set_count {
                return Err(malformed(
                    "GDEF",
                    format!("mark filtering set {set} out of range"),
                ));
            }
        }
    }
    Ok(())
}
