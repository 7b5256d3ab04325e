// this_file: crates/glifo-unicode/src/analyzer.rs

//! Splitting input text into shapable runs.
//!
//! The analyzer resolves bidi levels, itemizes by script, picks a font per
//! codepoint (primary first, then fallbacks), plans the feature set per
//! run, and seeds one glyph stream per run. Everything downstream mutates
//! those streams; nothing downstream looks at the text again except line
//! layout, which consults it for break opportunities.

use std::sync::Arc;

use icu_properties::props::Script;
use icu_properties::script::ScriptWithExtensions;
use icu_segmenter::options::LineBreakOptions;
use icu_segmenter::LineSegmenter;
use unicode_bidi::BidiInfo;

use glifo_core::{
    AnalysisError, Direction, FeatureSetting, FontAdapter, GlyphStream, LayoutOptions, Result,
    RunId, Slot, Tag,
};

use crate::joining;
use crate::props;
use crate::script::script_tag;

/// Everything the pipeline knows about one run of uniform text.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub id: RunId,
    /// Byte range of the run in the original text.
    pub range: (usize, usize),
    pub script: Script,
    pub script_tag: Tag,
    pub language: Tag,
    pub direction: Direction,
    /// Resolved bidi embedding level.
    pub level: u8,
    /// Index into the shaping call's font list (0 = primary).
    pub font: usize,
    /// Ordered feature plan: font defaults, then caller overrides.
    pub features: Arc<[FeatureSetting]>,
}

/// The analyzer's output: run plans and their seeded glyph streams,
/// parallel vectors in logical order.
#[derive(Debug, Default)]
pub struct Analysis {
    /// Paragraph embedding level of the first paragraph.
    pub base_level: u8,
    /// Codepoint count of the whole input; streams conserve this.
    pub codepoint_count: u32,
    pub runs: Vec<RunPlan>,
    pub streams: Vec<GlyphStream>,
}

/// Splits text into runs and seeds their glyph streams.
pub struct TextAnalyzer;

impl TextAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze `text` against `fonts` (primary first, then fallbacks).
    pub fn analyze(
        &self,
        text: &str,
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> Result<Analysis> {
        if fonts.is_empty() {
            return Err(AnalysisError::NoPrimaryFont.into());
        }
        if text.is_empty() {
            return Ok(Analysis::default());
        }

        let bidi = BidiInfo::new(text, None);
        let base_level = bidi
            .paragraphs
            .first()
            .map(|p| p.level.number())
            .unwrap_or(0);

        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let scripts = resolve_scripts(&chars);
        let levels: Vec<u8> = chars
            .iter()
            .map(|&(byte, _)| bidi.levels[byte].number())
            .collect();
        let choices: Vec<usize> = chars
            .iter()
            .enumerate()
            .map(|(i, &(_, cp))| choose_font(cp, fonts, i, &chars))
            .collect();

        let mut analysis = Analysis {
            base_level,
            codepoint_count: chars.len() as u32,
            ..Analysis::default()
        };

        let mut start = 0;
        while start < chars.len() {
            let mut end = start + 1;
            while end < chars.len()
                && scripts[end] == scripts[start]
                && levels[end] == levels[start]
                && choices[end] == choices[start]
            {
                end += 1;
            }

            let id = RunId(analysis.runs.len() as u32);
            let font = &fonts[choices[start]];
            let tag = script_tag(scripts[start]);
            let features = feature_plan(
                font.as_ref(),
                tag,
                options.language,
                &options.features,
            );

            let mut stream = GlyphStream::with_capacity(end - start)?;
            for &(byte, cp) in &chars[start..end] {
                stream.append(Slot::new(
                    byte as u32,
                    cp,
                    font.map_codepoint(cp),
                    levels[start],
                    tag,
                    id,
                    features.clone(),
                ))?;
            }

            if joining::uses_joining(scripts[start]) {
                joining::assign_joining_forms(&mut stream);
            }

            let byte_end = chars
                .get(end)
                .map(|&(b, _)| b)
                .unwrap_or(text.len());
            analysis.runs.push(RunPlan {
                id,
                range: (chars[start].0, byte_end),
                script: scripts[start],
                script_tag: tag,
                language: options.language,
                direction: Direction::from_level(levels[start]),
                level: levels[start],
                font: choices[start],
                features,
            });
            analysis.streams.push(stream);
            start = end;
        }

        log::debug!(
            "analyzed {} codepoints into {} runs (base level {})",
            analysis.codepoint_count,
            analysis.runs.len(),
            base_level
        );
        Ok(analysis)
    }
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

// Per-char script with Common/Inherited inheriting the surrounding strong
// script: backward first (attach to the preceding run), then forward for
// leading weak characters.
fn resolve_scripts(chars: &[(usize, char)]) -> Vec<Script> {
    let data = ScriptWithExtensions::new();
    let mut scripts: Vec<Script> = chars
        .iter()
        .map(|&(_, cp)| data.get_script_val(cp))
        .collect();

    let mut strong = None;
    for script in scripts.iter_mut() {
        if *script == Script::Common || *script == Script::Inherited {
            if let Some(inherit) = strong {
                *script = inherit;
            }
        } else {
            strong = Some(*script);
        }
    }
    let mut strong = None;
    for script in scripts.iter_mut().rev() {
        if *script == Script::Common || *script == Script::Inherited {
            if let Some(inherit) = strong {
                *script = inherit;
            }
        } else {
            strong = Some(*script);
        }
    }
    scripts
}

// First font that maps the codepoint; default-ignorables stick with the
// preceding character's font so they never split a run on coverage alone.
fn choose_font(
    cp: char,
    fonts: &[Arc<dyn FontAdapter>],
    index: usize,
    chars: &[(usize, char)],
) -> usize {
    if props::is_default_ignorable(cp) && index > 0 {
        return choose_font(chars[index - 1].1, fonts, index - 1, chars);
    }
    fonts
        .iter()
        .position(|font| font.map_codepoint(cp) != 0)
        .unwrap_or(0)
}

// Feature plan: (font defaults for script/lang ∪ caller-enabled) minus
// caller-disabled; the required feature is always on.
fn feature_plan(
    font: &dyn FontAdapter,
    script: Tag,
    language: Tag,
    overrides: &[FeatureSetting],
) -> Arc<[FeatureSetting]> {
    let required = font.required_feature(script, language);
    let mut plan: Vec<FeatureSetting> = font
        .default_features(script, language)
        .into_iter()
        .map(|tag| FeatureSetting::new(tag, 1))
        .collect();
    if let Some(req) = required {
        if !plan.iter().any(|f| f.tag == req) {
            plan.push(FeatureSetting::new(req, 1));
        }
    }
    for setting in overrides {
        if Some(setting.tag) == required && setting.value == 0 {
            continue;
        }
        match plan.iter_mut().find(|f| f.tag == setting.tag) {
            Some(existing) => existing.value = setting.value,
            None => plan.push(*setting),
        }
    }
    plan.into()
}

/// Byte offsets where a line may break, including 0 and `text.len()`.
pub fn line_break_opportunities(text: &str) -> Vec<usize> {
    let segmenter = LineSegmenter::new_auto(LineBreakOptions::default());
    segmenter.segment_str(text).collect()
}
