// this_file: crates/glifo-unicode/src/joining.rs

//! Joining-form assignment for cursive scripts.
//!
//! Arabic-class scripts pick a presentation form per letter (isolated,
//! initial, medial, final) from the joining behavior of its neighbors.
//! The form becomes a per-slot feature on top of the run's plan, so the
//! substitution engine activates the font's form lookups exactly where
//! they belong.

use std::sync::Arc;

use icu_properties::props::{JoiningType, Script};
use icu_properties::CodePointMapData;

use glifo_core::{FeatureSetting, GlyphStream, Tag};

const ISOL: Tag = Tag(*b"isol");
const INIT: Tag = Tag(*b"init");
const MEDI: Tag = Tag(*b"medi");
const FINA: Tag = Tag(*b"fina");

/// Whether a script selects letter forms by joining context.
pub fn uses_joining(script: Script) -> bool {
    matches!(
        script,
        Script::Arabic | Script::Syriac | Script::Mongolian | Script::Nko
    )
}

fn joining_type(cp: char) -> JoiningType {
    CodePointMapData::<JoiningType>::new().get(cp)
}

// Whether a letter of this type connects towards the following character.
fn connects_forward(t: JoiningType) -> bool {
    matches!(
        t,
        JoiningType::DualJoining | JoiningType::LeftJoining | JoiningType::JoinCausing
    )
}

// Whether a letter of this type connects towards the preceding character.
fn connects_backward(t: JoiningType) -> bool {
    matches!(
        t,
        JoiningType::DualJoining | JoiningType::RightJoining | JoiningType::JoinCausing
    )
}

/// Overlay one joining form feature per letter slot.
///
/// Transparent characters (marks, ZWJ handled by its Join_Causing class)
/// are invisible to the neighbor search and keep the plain run plan.
pub fn assign_joining_forms(stream: &mut GlyphStream) {
    let types: Vec<JoiningType> = stream.iter().map(|s| joining_type(s.codepoint)).collect();

    // The four overlays share storage per run plan.
    let mut overlays: [Option<Arc<[FeatureSetting]>>; 4] = [None, None, None, None];
    let mut overlay = |base: &Arc<[FeatureSetting]>, form: Tag, slot_idx: usize| -> Arc<[FeatureSetting]> {
        let cache = &mut overlays[slot_idx];
        cache
            .get_or_insert_with(|| {
                base.iter()
                    .copied()
                    .chain(std::iter::once(FeatureSetting::new(form, 1)))
                    .collect()
            })
            .clone()
    };

    for i in 0..stream.len() {
        let t = types[i];
        if !matches!(
            t,
            JoiningType::DualJoining | JoiningType::RightJoining | JoiningType::LeftJoining
        ) {
            continue;
        }

        let before = (0..i)
            .rev()
            .map(|k| types[k])
            .find(|t| *t != JoiningType::Transparent);
        let after = (i + 1..stream.len())
            .map(|k| types[k])
            .find(|t| *t != JoiningType::Transparent);

        let joined_prev =
            connects_backward(t) && before.is_some_and(connects_forward);
        let joined_next = connects_forward(t) && after.is_some_and(connects_backward);

        let (form, cache_idx) = match (joined_prev, joined_next) {
            (true, true) => (MEDI, 2),
            (true, false) => (FINA, 3),
            (false, true) => (INIT, 1),
            (false, false) => (ISOL, 0),
        };
        let base = stream.get(i).features.clone();
        stream.get_mut(i).features = overlay(&base, form, cache_idx);
    }
}
