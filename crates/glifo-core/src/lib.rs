//! Glifo core: the glyph stream and the contracts around it
//!
//! Text shaping rewrites a stream of glyphs in place: codepoints map to
//! glyphs, features substitute them (one-to-one, one-to-many, many-to-one),
//! positioning attaches and spaces them, and line layout reads the result.
//! This crate holds the pieces every stage shares:
//!
//! - [`Slot`] and [`GlyphStream`] - the mutable spine of the pipeline
//! - [`FontAdapter`] - read-only access to one font's decoded tables
//! - the decoded lookup data model ([`Lookup`], [`Coverage`], subtables)
//! - [`LayoutOptions`] - caller configuration
//! - [`RenderSink`] and [`PositionedGlyph`] - the output boundary
//! - [`GlifoError`] - the error tree
//!
//! The engines that drive the stream live in `glifo-shape` and
//! `glifo-layout`; text analysis lives in `glifo-unicode`.

pub mod charclass;
pub mod error;
pub mod font;
pub mod options;
pub mod sink;
pub mod slot;
pub mod stream;
pub mod tag;

pub use error::{AnalysisError, FontError, GlifoError, LayoutError, Result};
pub use font::{
    Anchor, ChainRule, ClassDef, ContextRule, Coverage, FontAdapter, GlyphBounds, GlyphClass,
    GlyphMetrics, LigatureRule, Lookup, LookupFlags, LookupKind, LookupStage, PairData,
    PosSubtable, SequenceLookup, SubstSubtable, ValueRecord,
};
pub use options::{HorizontalAlign, LayoutOptions, VerticalAlign};
pub use sink::{Bounds, CollectingSink, LayoutMode, PositionedGlyph, RenderSink};
pub use slot::{Direction, FeatureSetting, RunId, Slot, SlotFlags};
pub use stream::GlyphStream;
pub use tag::Tag;
