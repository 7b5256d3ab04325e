//! Where the glyph stream gets rewritten: the glifo shaping engines
//!
//! Substitution first, positioning second, both driven by the font's own
//! lookup lists. The engines own no state of their own; everything they
//! need arrives through the [`FontAdapter`](glifo_core::FontAdapter)
//! contract and the slot stream they mutate.

pub mod position;
pub mod skip;
pub mod substitute;

#[cfg(test)]
mod testutil;

pub use position::PositioningEngine;
pub use skip::SkipFilter;
pub use substitute::SubstitutionEngine;
