//! Error types for glifo

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GlifoError>;

/// Main error type for glifo
///
/// Construction-time font problems are fatal and eager; shaping-time
/// anomalies degrade gracefully and never surface here.
#[derive(Debug, Error)]
pub enum GlifoError {
    #[error("font error: {0}")]
    Font(#[from] FontError),

    #[error("text analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("layout failed: {0}")]
    Layout(#[from] LayoutError),

    #[error("glyph buffer capacity exhausted")]
    Capacity,
}

/// Errors raised while validating or adapting font table data
#[derive(Debug, Error)]
pub enum FontError {
    #[error("malformed {table} table: {reason}")]
    Malformed {
        table: &'static str,
        reason: String,
    },

    #[error("font exposes no glyphs")]
    EmptyFont,
}

/// Errors raised while analyzing input text into runs
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no primary font configured")]
    NoPrimaryFont,
}

/// Errors raised while breaking and aligning lines
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid layout options: {0}")]
    InvalidOptions(String),
}
