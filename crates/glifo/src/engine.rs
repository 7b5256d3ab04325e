// this_file: crates/glifo/src/engine.rs

//! The engine that drives text through the four shaping stages.

use std::sync::Arc;

use glifo_core::{
    AnalysisError, Bounds, FontAdapter, LayoutOptions, PositionedGlyph, RenderSink, Result,
};
use glifo_layout::{LaidText, LineLayout};
use glifo_shape::{PositioningEngine, SubstitutionEngine};
use glifo_unicode::{nfc_normalize, TextAnalyzer};

use crate::cache::{ShapeCache, ShapeCacheKey};

/// Scaled vertical metrics of the primary font, render units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
    pub line_height: f32,
}

/// Analysis, substitution, positioning, and layout behind one call.
///
/// An engine owns a primary font and a set of options; every [`shape`]
/// call runs the full pipeline (or serves an identical earlier call from
/// the cache) and returns positioned glyphs with their source offsets.
///
/// ```
/// use std::sync::Arc;
/// use glifo::{Engine, FontBuilder};
///
/// let font = FontBuilder::new(1000)
///     .glyph('h', 1, 520)
///     .glyph('i', 2, 260)
///     .build()?;
/// let engine = Engine::new(Arc::new(font));
/// let shaped = engine.shape("hi")?;
/// assert_eq!(shaped.glyphs.len(), 2);
/// # Ok::<(), glifo::GlifoError>(())
/// ```
///
/// [`shape`]: Engine::shape
pub struct Engine {
    primary: Arc<dyn FontAdapter>,
    options: LayoutOptions,
    normalize_input: bool,
    analyzer: TextAnalyzer,
    substitution: SubstitutionEngine,
    positioning: PositioningEngine,
    layout: LineLayout,
    cache: ShapeCache,
}

impl Engine {
    /// An engine over one font with default options.
    pub fn new(primary: Arc<dyn FontAdapter>) -> Self {
        Self {
            primary,
            options: LayoutOptions::default(),
            normalize_input: false,
            analyzer: TextAnalyzer::new(),
            substitution: SubstitutionEngine::new(),
            positioning: PositioningEngine::new(),
            layout: LineLayout::new(),
            cache: ShapeCache::new(128),
        }
    }

    /// Start configuring an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Run the full pipeline over `text`.
    pub fn shape(&self, text: &str) -> Result<LaidText> {
        let normalized;
        let text = if self.normalize_input {
            normalized = nfc_normalize(text);
            normalized.as_ref()
        } else {
            text
        };

        let fonts = self.font_list();
        let ids: Vec<u64> = fonts.iter().map(|f| f.face_id()).collect();
        let key = ShapeCacheKey::new(text, &ids, &self.options);
        if let Some(hit) = self.cache.get(&key) {
            log::trace!("shape cache hit for {} bytes", text.len());
            return Ok(hit);
        }

        let mut analysis = self.analyzer.analyze(text, &fonts, &self.options)?;
        for (run, stream) in analysis.runs.iter().zip(analysis.streams.iter_mut()) {
            let font = fonts[run.font].as_ref();
            self.substitution
                .apply(font, run.script_tag, run.language, stream)?;
            self.positioning.apply(
                font,
                run.script_tag,
                run.language,
                self.options.apply_kerning,
                stream,
            )?;
        }
        let laid = self.layout.layout(text, &analysis, &fonts, &self.options)?;
        self.cache.insert(key, laid.clone());
        Ok(laid)
    }

    /// Shape and stream the result through a render sink.
    pub fn shape_into(&self, text: &str, sink: &mut dyn RenderSink) -> Result<LaidText> {
        let laid = self.shape(text)?;
        sink.begin_text(laid.bounds);
        for glyph in &laid.glyphs {
            sink.emit_glyph(glyph, &self.options);
        }
        sink.end_text();
        Ok(laid)
    }

    /// Positioned glyphs only, for callers that don't need line records.
    pub fn shape_to_glyphs(&self, text: &str) -> Result<(Vec<PositionedGlyph>, Bounds)> {
        let laid = self.shape(text)?;
        Ok((laid.glyphs, laid.bounds))
    }

    /// Scaled vertical metrics of the primary font under the engine's
    /// options.
    pub fn line_metrics(&self) -> LineMetrics {
        let (_, sy) = self.options.scale(self.primary.units_per_em());
        let ascent = self.primary.ascent() as f32 * sy;
        let descent = self.primary.descent() as f32 * sy;
        let line_gap = self.primary.line_gap() as f32 * sy;
        LineMetrics {
            ascent,
            descent,
            line_gap,
            line_height: ascent + descent + line_gap,
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn font_list(&self) -> Vec<Arc<dyn FontAdapter>> {
        let mut fonts = Vec::with_capacity(1 + self.options.fallback_fonts.len());
        fonts.push(self.primary.clone());
        fonts.extend(self.options.fallback_fonts.iter().cloned());
        fonts
    }
}

/// Configure an [`Engine`] piece by piece.
#[derive(Default)]
pub struct EngineBuilder {
    primary: Option<Arc<dyn FontAdapter>>,
    options: LayoutOptions,
    normalize_input: bool,
    cache_capacity: Option<usize>,
}

impl EngineBuilder {
    /// The font tried first for every codepoint. Required.
    pub fn primary(mut self, font: Arc<dyn FontAdapter>) -> Self {
        self.primary = Some(font);
        self
    }

    pub fn options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    /// NFC-normalize input before shaping. Off by default: source offsets
    /// always index the text the pipeline actually shaped.
    pub fn normalize_input(mut self, normalize: bool) -> Self {
        self.normalize_input = normalize;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let primary = self.primary.ok_or(AnalysisError::NoPrimaryFont)?;
        Ok(Engine {
            primary,
            options: self.options,
            normalize_input: self.normalize_input,
            analyzer: TextAnalyzer::new(),
            substitution: SubstitutionEngine::new(),
            positioning: PositioningEngine::new(),
            layout: LineLayout::new(),
            cache: ShapeCache::new(self.cache_capacity.unwrap_or(128)),
        })
    }
}
