//! How shaping and layout should behave.

use std::fmt;
use std::sync::Arc;

use crate::font::FontAdapter;
use crate::slot::FeatureSetting;
use crate::tag::Tag;

/// Horizontal placement of each line inside the wrapping width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    #[default]
    Start,
    End,
    Center,
    /// Expand inter-word gaps so lines fill the wrapping width.
    Justify,
}

/// Vertical placement of the text block relative to the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
    /// The first line's baseline sits on the origin.
    #[default]
    Baseline,
}

/// Everything the analyzer and line layout need to know from the caller.
#[derive(Clone)]
pub struct LayoutOptions {
    /// Font size in points.
    pub size: f32,
    pub dpi_x: f32,
    pub dpi_y: f32,
    /// Pen origin in render coordinates.
    pub origin: (f32, f32),
    /// Tab stops sit at multiples of `tab_width` space advances.
    pub tab_width: u32,
    /// Apply legacy kern-table pairs when the font has no GPOS kerning.
    pub apply_kerning: bool,
    /// Maximum line advance before soft wrapping; negative disables it.
    pub wrapping_width: f32,
    pub horizontal_alignment: HorizontalAlign,
    pub vertical_alignment: VerticalAlign,
    /// Feature overrides applied on top of the font's defaults. Value 0
    /// disables a feature, 1 enables it, greater values select alternates.
    pub features: Vec<FeatureSetting>,
    /// Extra advance between slots, in points. Never applied inside a
    /// ligature cohort.
    pub letter_spacing: f32,
    /// Language system tag for lookup selection.
    pub language: Tag,
    /// Fonts tried in order when the primary cannot map a codepoint.
    pub fallback_fonts: Vec<Arc<dyn FontAdapter>>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            dpi_x: 72.0,
            dpi_y: 72.0,
            origin: (0.0, 0.0),
            tab_width: 8,
            apply_kerning: true,
            wrapping_width: -1.0,
            horizontal_alignment: HorizontalAlign::Start,
            vertical_alignment: VerticalAlign::Baseline,
            features: Vec::new(),
            letter_spacing: 0.0,
            language: Tag::DEFAULT_LANGUAGE,
            fallback_fonts: Vec::new(),
        }
    }
}

impl LayoutOptions {
    /// Options with a specific point size, everything else default.
    pub fn with_size(size: f32) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Enable a feature (value 1).
    pub fn enable(mut self, tag: Tag) -> Self {
        self.features.push(FeatureSetting::new(tag, 1));
        self
    }

    /// Disable a feature (value 0).
    pub fn disable(mut self, tag: Tag) -> Self {
        self.features.push(FeatureSetting::new(tag, 0));
        self
    }

    /// Scale factors from design units to render units, per axis.
    pub fn scale(&self, units_per_em: u16) -> (f32, f32) {
        let upem = f32::from(units_per_em.max(1));
        (
            self.size * self.dpi_x / (72.0 * upem),
            self.size * self.dpi_y / (72.0 * upem),
        )
    }
}

impl fmt::Debug for LayoutOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutOptions")
            .field("size", &self.size)
            .field("dpi", &(self.dpi_x, self.dpi_y))
            .field("origin", &self.origin)
            .field("tab_width", &self.tab_width)
            .field("apply_kerning", &self.apply_kerning)
            .field("wrapping_width", &self.wrapping_width)
            .field("horizontal_alignment", &self.horizontal_alignment)
            .field("vertical_alignment", &self.vertical_alignment)
            .field("features", &self.features)
            .field("letter_spacing", &self.letter_spacing)
            .field("language", &self.language)
            .field("fallback_fonts", &self.fallback_fonts.len())
            .finish()
    }
}
