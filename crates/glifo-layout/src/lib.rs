//! The last stage: positioned slots become lines of render-space glyphs
//!
//! Line layout consumes the shaped and positioned glyph streams read-only.
//! It scales design units to render units, expands tabs, breaks lines
//! (hard breaks always, soft wrapping when a width is set), reorders each
//! line into visual order, aligns, and hands positioned glyphs to a
//! [`RenderSink`](glifo_core::RenderSink).

mod layout;

pub use layout::{LaidText, LineInfo, LineLayout};
