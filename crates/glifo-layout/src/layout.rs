// this_file: crates/glifo-layout/src/layout.rs

//! Breaking the positioned stream into aligned lines of render glyphs.

use std::collections::HashSet;
use std::sync::Arc;

use glifo_core::{
    Bounds, FontAdapter, HorizontalAlign, LayoutError, LayoutMode, LayoutOptions, PositionedGlyph,
    RenderSink, Result, VerticalAlign,
};
use glifo_unicode::{line_break_opportunities, props, Analysis};

/// One laid-out line: its glyph range in the output, its advance width,
/// and its baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInfo {
    pub glyphs: (usize, usize),
    pub width: f32,
    pub baseline: f32,
}

/// The finished layout: glyphs in visual order, line records, extents.
#[derive(Debug, Clone, Default)]
pub struct LaidText {
    pub glyphs: Vec<PositionedGlyph>,
    pub lines: Vec<LineInfo>,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Glyph,
    Space,
    Tab,
    HardBreak,
    /// The LF of a CRLF pair; consumed by the CR.
    Skip,
}

// A slot flattened to render space.
struct Item {
    glyph_id: u32,
    font: usize,
    source_offset: u32,
    codepoint: char,
    level: u8,
    ligature_id: u32,
    advance: f32,
    x_offset: f32,
    y_offset: f32,
    kind: ItemKind,
}

struct Line {
    indices: Vec<usize>,
    hard_end: bool,
}

/// Consumes shaped, positioned streams and emits positioned glyphs.
pub struct LineLayout;

impl LineLayout {
    pub fn new() -> Self {
        Self
    }

    /// Lay out the analyzed and positioned text into render coordinates.
    pub fn layout(
        &self,
        text: &str,
        analysis: &Analysis,
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> Result<LaidText> {
        if options.size <= 0.0 || options.dpi_x <= 0.0 || options.dpi_y <= 0.0 {
            return Err(LayoutError::InvalidOptions(format!(
                "size {} at {}x{} dpi",
                options.size, options.dpi_x, options.dpi_y
            ))
            .into());
        }
        if analysis.runs.is_empty() || fonts.is_empty() {
            return Ok(LaidText::default());
        }

        let items = self.flatten(analysis, fonts, options);
        let lines = self.break_lines(text, &items, fonts, options);
        log::debug!("layout: {} items over {} lines", items.len(), lines.len());
        Ok(self.emit(&items, &lines, fonts, options))
    }

    /// Lay out and stream the result through a render sink.
    pub fn layout_into(
        &self,
        text: &str,
        analysis: &Analysis,
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
        sink: &mut dyn RenderSink,
    ) -> Result<LaidText> {
        let laid = self.layout(text, analysis, fonts, options)?;
        sink.begin_text(laid.bounds);
        for glyph in &laid.glyphs {
            sink.emit_glyph(glyph, options);
        }
        sink.end_text();
        Ok(laid)
    }

    // Scale every slot to render units and classify it for breaking.
    fn flatten(
        &self,
        analysis: &Analysis,
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> Vec<Item> {
        let spacing = options.letter_spacing * options.dpi_x / 72.0;
        let mut items = Vec::with_capacity(analysis.codepoint_count as usize);
        for (run, stream) in analysis.runs.iter().zip(&analysis.streams) {
            let font = &fonts[run.font.min(fonts.len() - 1)];
            let (sx, sy) = options.scale(font.units_per_em());
            let slots = stream.slots();
            for (k, slot) in slots.iter().enumerate() {
                let kind = match slot.codepoint {
                    '\t' => ItemKind::Tab,
                    '\r' | '\n' | '\u{85}' => ItemKind::HardBreak,
                    cp if props::is_breaking_space(cp) => ItemKind::Space,
                    _ => ItemKind::Glyph,
                };
                let mut advance = slot.x_advance as f32 * sx;
                // Letter spacing pads every visible join except inside a
                // ligature cohort.
                let in_cohort = slot.ligature_id != 0
                    && slots
                        .get(k + 1)
                        .is_some_and(|next| next.ligature_id == slot.ligature_id);
                if matches!(kind, ItemKind::Glyph | ItemKind::Space) && !in_cohort {
                    advance += spacing;
                }
                items.push(Item {
                    glyph_id: slot.glyph_id,
                    font: run.font,
                    source_offset: slot.source_offset,
                    codepoint: slot.codepoint,
                    level: slot.bidi_level,
                    ligature_id: slot.ligature_id,
                    advance,
                    x_offset: slot.x_offset as f32 * sx,
                    y_offset: slot.y_offset as f32 * sy,
                    kind,
                });
            }
        }
        // CRLF counts as one break: the LF half goes silent.
        for i in 1..items.len() {
            if items[i].codepoint == '\n'
                && items[i - 1].codepoint == '\r'
                && items[i].source_offset == items[i - 1].source_offset + 1
            {
                items[i].kind = ItemKind::Skip;
            }
        }
        items
    }

    // Greedy line breaking: hard breaks always terminate a line; when a
    // wrapping width is set, overflow splits at the last break opportunity,
    // and content without one (an oversized cluster) gets its own line.
    fn break_lines(
        &self,
        text: &str,
        items: &[Item],
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> Vec<Line> {
        let wrap = options.wrapping_width >= 0.0;
        let opportunities: HashSet<usize> = if wrap {
            line_break_opportunities(text).into_iter().collect()
        } else {
            HashSet::new()
        };

        let mut lines = Vec::new();
        let mut line: Vec<usize> = Vec::new();
        let mut width = 0.0f32;
        let mut candidate: Option<usize> = None;

        for (idx, item) in items.iter().enumerate() {
            match item.kind {
                ItemKind::Skip => continue,
                ItemKind::HardBreak => {
                    lines.push(Line {
                        indices: std::mem::take(&mut line),
                        hard_end: true,
                    });
                    width = 0.0;
                    candidate = None;
                }
                _ => {
                    if wrap
                        && !line.is_empty()
                        && opportunities.contains(&(item.source_offset as usize))
                    {
                        if width > options.wrapping_width {
                            // Oversized content with no earlier candidate.
                            lines.push(Line {
                                indices: std::mem::take(&mut line),
                                hard_end: false,
                            });
                            width = 0.0;
                        } else {
                            candidate = Some(line.len());
                        }
                    }
                    line.push(idx);
                    width = self.advance_pen(width, item, fonts, options);
                    let breakable = !matches!(item.kind, ItemKind::Space | ItemKind::Tab);
                    if wrap && breakable && width > options.wrapping_width {
                        if let Some(c) = candidate.filter(|&c| c > 0 && c < line.len()) {
                            let carried = line.split_off(c);
                            lines.push(Line {
                                indices: std::mem::take(&mut line),
                                hard_end: false,
                            });
                            line = carried;
                            width = line.iter().fold(0.0, |pen, &i| {
                                self.advance_pen(pen, &items[i], fonts, options)
                            });
                        }
                        candidate = None;
                    }
                }
            }
        }
        if !line.is_empty() {
            lines.push(Line {
                indices: line,
                hard_end: false,
            });
        }
        lines
    }

    fn advance_pen(
        &self,
        pen: f32,
        item: &Item,
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> f32 {
        if item.kind == ItemKind::Tab {
            self.next_tab_stop(pen, item.font, fonts, options)
        } else {
            pen + item.advance
        }
    }

    // The next multiple of tab_width space-advances strictly greater than
    // the current pen position.
    fn next_tab_stop(
        &self,
        pen: f32,
        font: usize,
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> f32 {
        let font = &fonts[font.min(fonts.len() - 1)];
        let (sx, _) = options.scale(font.units_per_em());
        let space = font.map_codepoint(' ');
        let space_advance = font.metrics(space).advance_x as f32 * sx;
        let stop = options.tab_width.max(1) as f32 * space_advance;
        if stop <= 0.0 {
            return pen;
        }
        ((pen / stop).floor() + 1.0) * stop
    }

    // Visual order inside one line: UBA rule L2 (reverse every maximal run
    // at or above each odd level), then pre-base vowel signs move in front
    // of the glyph they follow logically.
    fn visual_order(&self, indices: &[usize], items: &[Item]) -> Vec<usize> {
        let mut order: Vec<usize> = indices.to_vec();
        let levels: Vec<u8> = order.iter().map(|&i| items[i].level).collect();
        let max = levels.iter().copied().max().unwrap_or(0);
        let min_odd = levels.iter().copied().filter(|l| l % 2 == 1).min();
        if let Some(min_odd) = min_odd {
            for l in (min_odd..=max).rev() {
                let mut i = 0;
                while i < order.len() {
                    if items[order[i]].level >= l {
                        let start = i;
                        while i < order.len() && items[order[i]].level >= l {
                            i += 1;
                        }
                        order[start..i].reverse();
                    } else {
                        i += 1;
                    }
                }
            }
        }
        for i in 1..order.len() {
            if props::is_prebase_matra(items[order[i]].codepoint)
                && items[order[i - 1]].kind == ItemKind::Glyph
                && !props::is_prebase_matra(items[order[i - 1]].codepoint)
            {
                order.swap(i - 1, i);
            }
        }
        order
    }

    fn emit(
        &self,
        items: &[Item],
        lines: &[Line],
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> LaidText {
        let primary = &fonts[0];
        let (_, sy) = options.scale(primary.units_per_em());
        let ascent = primary.ascent() as f32 * sy;
        let descent = primary.descent() as f32 * sy;
        let line_height = ascent + descent + primary.line_gap() as f32 * sy;
        let block_height = lines.len() as f32 * line_height;

        // Trailing whitespace never counts towards alignment width.
        let measures: Vec<(f32, usize)> = lines
            .iter()
            .map(|line| self.measure_trimmed(line, items, fonts, options))
            .collect();
        let max_width = measures.iter().fold(0.0f32, |m, &(w, _)| m.max(w));
        let room = if options.wrapping_width >= 0.0 {
            options.wrapping_width
        } else {
            max_width
        };

        let v_shift = match options.vertical_alignment {
            VerticalAlign::Top => 0.0,
            VerticalAlign::Center => -block_height / 2.0,
            VerticalAlign::Bottom => -block_height,
            VerticalAlign::Baseline => -ascent,
        };

        let mut laid = LaidText::default();
        for (index, (line, &(line_width, gaps))) in lines.iter().zip(&measures).enumerate() {
            let is_last = index + 1 == lines.len();
            let room_left = (room - line_width).max(0.0);
            let h_shift = match options.horizontal_alignment {
                HorizontalAlign::Start | HorizontalAlign::Justify => 0.0,
                HorizontalAlign::End => room_left,
                HorizontalAlign::Center => room_left / 2.0,
            };
            let justify_extra = if options.horizontal_alignment == HorizontalAlign::Justify
                && !line.hard_end
                && !is_last
                && gaps > 0
            {
                room_left / gaps as f32
            } else {
                0.0
            };

            let baseline = options.origin.1 + v_shift + ascent + index as f32 * line_height;
            let line_start = options.origin.0 + h_shift;
            let mut pen = 0.0f32;
            let glyph_start = laid.glyphs.len();

            for &idx in &self.visual_order(&line.indices, items) {
                let item = &items[idx];
                match item.kind {
                    ItemKind::Tab => {
                        pen = self.next_tab_stop(pen, item.font, fonts, options);
                        continue;
                    }
                    ItemKind::HardBreak | ItemKind::Skip => continue,
                    ItemKind::Glyph | ItemKind::Space => {}
                }
                let glyph = PositionedGlyph {
                    glyph_id: item.glyph_id,
                    font_ref: item.font,
                    pen_x: line_start + pen,
                    pen_y: baseline,
                    x_offset: item.x_offset,
                    y_offset: item.y_offset,
                    source_offset: item.source_offset,
                    layout_mode: LayoutMode::Horizontal,
                };
                laid.bounds.union_rect(
                    glyph.pen_x + glyph.x_offset,
                    baseline - ascent,
                    glyph.pen_x + glyph.x_offset + item.advance,
                    baseline + descent,
                );
                laid.glyphs.push(glyph);
                pen += item.advance;
                if item.kind == ItemKind::Space {
                    pen += justify_extra;
                }
            }

            laid.lines.push(LineInfo {
                glyphs: (glyph_start, laid.glyphs.len()),
                width: line_width,
                baseline,
            });
        }
        laid
    }

    // Pen width of a line without its trailing whitespace, plus the number
    // of stretchable gaps justification may expand.
    fn measure_trimmed(
        &self,
        line: &Line,
        items: &[Item],
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> (f32, usize) {
        let trailing = line
            .indices
            .iter()
            .rev()
            .take_while(|&&i| matches!(items[i].kind, ItemKind::Space | ItemKind::Tab))
            .count();
        let kept = &line.indices[..line.indices.len() - trailing];
        let width = kept
            .iter()
            .fold(0.0, |pen, &i| self.advance_pen(pen, &items[i], fonts, options));
        let gaps = kept
            .iter()
            .filter(|&&i| items[i].kind == ItemKind::Space)
            .count();
        (width, gaps)
    }
}

impl Default for LineLayout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glifo_core::CollectingSink;
    use glifo_font::FontBuilder;
    use glifo_unicode::TextAnalyzer;

    fn test_font() -> Arc<dyn FontAdapter> {
        let mut builder = FontBuilder::new(1000);
        for (i, cp) in "abcdefghijklmnopqrstuvwxyz".chars().enumerate() {
            builder = builder.glyph(cp, 10 + i as u32, 500);
        }
        builder = builder.glyph(' ', 3, 500);
        for (i, cp) in "שלוםאב".chars().enumerate() {
            builder = builder.glyph(cp, 50 + i as u32, 500);
        }
        builder = builder.glyph('क', 70, 500).glyph('ि', 71, 0);
        Arc::new(builder.build().unwrap())
    }

    // Layout unit tests drive the stage in isolation: advances are seeded
    // straight from metrics instead of running the positioning engine.
    fn analyze_seeded(
        text: &str,
        fonts: &[Arc<dyn FontAdapter>],
        options: &LayoutOptions,
    ) -> Analysis {
        let mut analysis = TextAnalyzer::new().analyze(text, fonts, options).unwrap();
        for (run, stream) in analysis.runs.iter().zip(analysis.streams.iter_mut()) {
            let font = &fonts[run.font];
            for i in 0..stream.len() {
                let advance = font.metrics(stream.get(i).glyph_id).advance_x;
                stream.get_mut(i).x_advance = advance;
            }
        }
        analysis
    }

    fn laid(text: &str, options: &LayoutOptions) -> LaidText {
        let fonts = vec![test_font()];
        let analysis = analyze_seeded(text, &fonts, options);
        LineLayout::new()
            .layout(text, &analysis, &fonts, options)
            .unwrap()
    }

    #[test]
    fn empty_text_is_empty_layout() {
        let laid = laid("", &LayoutOptions::default());
        assert!(laid.glyphs.is_empty());
        assert!(laid.lines.is_empty());
        assert!(laid.bounds.is_empty());
    }

    #[test]
    fn single_line_pen_advances() {
        // 16pt at 72dpi over 1000 upem: 500 units = 8px per glyph.
        let laid = laid("abc", &LayoutOptions::default());
        assert_eq!(laid.lines.len(), 1);
        let xs: Vec<f32> = laid.glyphs.iter().map(|g| g.pen_x).collect();
        assert_eq!(xs, vec![0.0, 8.0, 16.0]);
        // Baseline alignment puts the first baseline on the origin.
        assert_eq!(laid.glyphs[0].pen_y, 0.0);
        assert!((laid.lines[0].width - 24.0).abs() < 1e-4);
    }

    #[test]
    fn soft_wrap_splits_at_opportunity() {
        let options = LayoutOptions {
            wrapping_width: 100.0,
            ..LayoutOptions::default()
        };
        let laid = laid("hello world foo", &options);
        assert_eq!(laid.lines.len(), 2);
        // Line 2 starts with the f of "foo" (byte offset 12).
        let (start, _) = laid.lines[1].glyphs;
        assert_eq!(laid.glyphs[start].source_offset, 12);
        // Line 1 ends after the space, which stays on line 1.
        let (_, end) = laid.lines[0].glyphs;
        assert_eq!(laid.glyphs[end - 1].source_offset, 11);
    }

    #[test]
    fn oversized_cluster_gets_its_own_line() {
        let options = LayoutOptions {
            wrapping_width: 20.0, // fits two glyphs of 8px
            ..LayoutOptions::default()
        };
        let laid = laid("abcdef gh", &options);
        // "abcdef" cannot be split and overflows alone.
        assert!(laid.lines.len() >= 2);
        let (start, _) = laid.lines[1].glyphs;
        assert_eq!(laid.glyphs[start].source_offset, 7);
    }

    #[test]
    fn tab_expansion() {
        let options = LayoutOptions {
            tab_width: 4,
            ..LayoutOptions::default()
        };
        let laid = laid("a\tb", &options);
        // Space advance 8px, stop every 32px; a ends at 8, b lands on 32.
        assert_eq!(laid.glyphs.len(), 2);
        assert_eq!(laid.glyphs[1].pen_x, 32.0);
        assert_eq!(laid.glyphs[1].source_offset, 2);
    }

    #[test]
    fn tab_skips_to_strictly_greater_stop() {
        let options = LayoutOptions {
            tab_width: 1,
            ..LayoutOptions::default()
        };
        // Pen sits exactly on a stop after "a" (8px, stop = 8px): the tab
        // must move to 16, not stay.
        let laid = laid("a\tb", &options);
        assert_eq!(laid.glyphs[1].pen_x, 16.0);
    }

    #[test]
    fn hard_breaks_make_lines() {
        let laid = laid("a\nb\r\nc", &LayoutOptions::default());
        assert_eq!(laid.lines.len(), 3);
        assert_eq!(laid.glyphs.len(), 3);
        // 1000-unit line height at 16pt: 16px between baselines.
        assert_eq!(laid.lines[0].baseline, 0.0);
        assert_eq!(laid.lines[1].baseline, 16.0);
        assert_eq!(laid.lines[2].baseline, 32.0);
    }

    #[test]
    fn rtl_line_is_visually_reversed() {
        let laid = laid("שלום", &LayoutOptions::default());
        let offsets: Vec<u32> = laid.glyphs.iter().map(|g| g.source_offset).collect();
        // Logical offsets 0,2,4,6 emitted right-to-left.
        assert_eq!(offsets, vec![6, 4, 2, 0]);
        // Pen still advances left to right across the visual sequence.
        assert!(laid.glyphs.windows(2).all(|w| w[0].pen_x < w[1].pen_x));
    }

    #[test]
    fn prebase_matra_renders_before_base() {
        let laid = laid("कि", &LayoutOptions::default());
        let offsets: Vec<u32> = laid.glyphs.iter().map(|g| g.source_offset).collect();
        // The vowel sign (offset 3) precedes ka (offset 0) visually; both
        // keep their original offsets for the round trip.
        assert_eq!(offsets, vec![3, 0]);
    }

    #[test]
    fn center_alignment_shifts_line() {
        let options = LayoutOptions {
            wrapping_width: 100.0,
            horizontal_alignment: HorizontalAlign::Center,
            ..LayoutOptions::default()
        };
        let laid = laid("ab", &options);
        // Width 16 in 100: centered start at 42.
        assert_eq!(laid.glyphs[0].pen_x, 42.0);
    }

    #[test]
    fn end_alignment_shifts_line() {
        let options = LayoutOptions {
            wrapping_width: 100.0,
            horizontal_alignment: HorizontalAlign::End,
            ..LayoutOptions::default()
        };
        let laid = laid("ab", &options);
        assert_eq!(laid.glyphs[0].pen_x, 84.0);
    }

    #[test]
    fn justify_stretches_spaces() {
        let options = LayoutOptions {
            wrapping_width: 100.0,
            horizontal_alignment: HorizontalAlign::Justify,
            ..LayoutOptions::default()
        };
        let laid = laid("ab cd ef gg hh", &options);
        assert!(laid.lines.len() >= 2);
        // The first (wrapped, not last) line fills the room: its last
        // glyph ends at the wrapping width.
        let (start, end) = laid.lines[0].glyphs;
        let last = &laid.glyphs[end - 1];
        // Find the advance of the last glyph: next stop is the room edge.
        assert!(last.pen_x + 8.0 > 99.0, "line not justified: {}", last.pen_x);
        assert_eq!(laid.glyphs[start].pen_x, 0.0);
    }

    #[test]
    fn vertical_alignment_shifts_block() {
        let top = laid("a", &LayoutOptions {
            vertical_alignment: VerticalAlign::Top,
            ..LayoutOptions::default()
        });
        // Top: first baseline sits one ascent below the origin.
        assert!((top.glyphs[0].pen_y - 12.8).abs() < 1e-4);

        let bottom = laid("a", &LayoutOptions {
            vertical_alignment: VerticalAlign::Bottom,
            ..LayoutOptions::default()
        });
        // Bottom: the whole 16px block sits above the origin.
        assert!((bottom.glyphs[0].pen_y - (12.8 - 16.0)).abs() < 1e-4);
    }

    #[test]
    fn sink_receives_everything() {
        let fonts = vec![test_font()];
        let options = LayoutOptions::default();
        let analysis = analyze_seeded("abc", &fonts, &options);
        let mut sink = CollectingSink::default();
        let laid = LineLayout::new()
            .layout_into("abc", &analysis, &fonts, &options, &mut sink)
            .unwrap();
        assert!(sink.finished);
        assert_eq!(sink.glyphs.len(), laid.glyphs.len());
        assert_eq!(sink.bounds, Some(laid.bounds));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let fonts = vec![test_font()];
        let options = LayoutOptions {
            size: 0.0,
            ..LayoutOptions::default()
        };
        let analysis = TextAnalyzer::new()
            .analyze("a", &fonts, &LayoutOptions::default())
            .unwrap();
        assert!(LineLayout::new()
            .layout("a", &analysis, &fonts, &options)
            .is_err());
    }
}
