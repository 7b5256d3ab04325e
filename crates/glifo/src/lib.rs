//! Glifo: text in, positioned glyphs out
//!
//! Glifo shapes a run of Unicode text against OpenType layout data and
//! produces an ordered sequence of positioned glyphs ready for an outline
//! renderer or rasterizer. The pipeline has four stages:
//!
//! 1. **Analysis** - bidi resolution, script itemization, font fallback,
//!    feature planning ([`glifo_unicode`])
//! 2. **Substitution** - feature-driven glyph rewriting in font-declared
//!    lookup order ([`glifo_shape`])
//! 3. **Positioning** - advances, kerning, cursive joins, mark attachment
//!    ([`glifo_shape`])
//! 4. **Line layout** - breaking, visual reordering, alignment, emission
//!    ([`glifo_layout`])
//!
//! Binary font parsing, rasterization, and font discovery stay outside;
//! fonts reach the engine through the
//! [`FontAdapter`](glifo_core::FontAdapter) contract, with
//! [`FontBuilder`] as the in-memory implementation.
//!
//! ## Shape your first text
//!
//! ```
//! use std::sync::Arc;
//! use glifo::{Engine, FontBuilder, LayoutOptions};
//!
//! let font = Arc::new(
//!     FontBuilder::new(1000)
//!         .glyph('h', 1, 520)
//!         .glyph('e', 2, 480)
//!         .glyph('l', 3, 240)
//!         .glyph('o', 4, 510)
//!         .build()?,
//! );
//! let engine = Engine::builder()
//!     .primary(font)
//!     .options(LayoutOptions::with_size(12.0))
//!     .build()?;
//!
//! let shaped = engine.shape("hello")?;
//! assert_eq!(shaped.glyphs.len(), 5);
//! assert_eq!(shaped.glyphs[0].source_offset, 0);
//! # Ok::<(), glifo::GlifoError>(())
//! ```

mod cache;
mod engine;

pub use cache::{ShapeCache, ShapeCacheKey};
pub use engine::{Engine, EngineBuilder, LineMetrics};

pub use glifo_core::{
    Anchor, AnalysisError, Bounds, ChainRule, ClassDef, CollectingSink, ContextRule, Coverage,
    Direction, FeatureSetting, FontAdapter, FontError, GlifoError, GlyphBounds, GlyphClass,
    GlyphMetrics, GlyphStream, HorizontalAlign, LayoutError, LayoutMode, LayoutOptions,
    LigatureRule, Lookup, LookupFlags, LookupKind, LookupStage, PairData, PosSubtable,
    PositionedGlyph, RenderSink, Result, RunId, SequenceLookup, Slot, SlotFlags, SubstSubtable,
    Tag, ValueRecord, VerticalAlign,
};
pub use glifo_font::{FontBuilder, StaticFont};
pub use glifo_layout::{LaidText, LineInfo, LineLayout};
pub use glifo_shape::{PositioningEngine, SubstitutionEngine};
pub use glifo_unicode::{nfc_normalize, Analysis, RunPlan, TextAnalyzer};
