//! Paragraph layout
//!
//! A [`Paragraph`] holds UTF-16 text with its style runs and turns it into
//! lines for a given width. Layout runs in stages:
//!
//! 1. Itemize the text into segments that share a style and a typeface
//!    (falling back per character when the matched face lacks a glyph) and
//!    measure every code unit.
//! 2. Break lines greedily at the line breaker's opportunities, splitting
//!    at mandatory breaks first and between graphemes for words that cannot
//!    fit at all.
//! 3. Resolve bidi runs and, per line, cut them at segment boundaries,
//!    reorder them visually and shape each piece. Trailing whitespace is
//!    shaped as a ghost run that takes no width.
//! 4. Justify, align and compute vertical metrics, then emit
//!    [`CodeUnitRun`]s for hit testing and [`PaintRecord`]s for painting.
//!
//! All text offsets are UTF-16 code units.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use quill_core::{Path, Point, Rect};
use quill_paint::{Canvas, GlyphPosition as FrameGlyph, Paint, TextFrame, TextRun};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::font::{FontCollection, FontMetrics, Typeface};
use crate::line_breaker::{LineRange, MeasuredText};
use crate::oracles::{
    BidiResolver, BidiRun, GraphemeBreaker, LineBreaker, UnicodeBidiResolver,
    UnicodeGraphemeBreaker, UnicodeLineBreaker,
};
use crate::paint_record::PaintRecord;
use crate::style::{
    ParagraphStyle, PlaceholderAlignment, PlaceholderRun, TextAlign, TextDecorationStyle,
    TextDirection, TextStyle,
};
use crate::styled_runs::StyledRuns;
use crate::utf16::{is_space, is_whitespace, Utf16Text};

/// Slack for accumulated float error when fitting an ellipsis
const FIT_EPSILON: f32 = 1e-3;

// ─────────────────────────────────────────────────────────────────────────────
// Public results
// ─────────────────────────────────────────────────────────────────────────────

/// Vertical extent of boxes returned by [`Paragraph::get_rects_for_range`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RectHeightStyle {
    /// The font ascent and descent of each run
    #[default]
    Tight,
    /// The tallest run on the line
    Max,
    /// Like `Max`, sharing the spacing between lines evenly above and below
    IncludeLineSpacingMiddle,
    /// Like `Max`, extended up to the line above
    IncludeLineSpacingTop,
    /// Like `Max`, extended down to the line below
    IncludeLineSpacingBottom,
    /// The strut's ascent and descent when a strut is enabled
    Strut,
}

/// Horizontal extent of boxes returned by [`Paragraph::get_rects_for_range`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RectWidthStyle {
    /// Only the selected glyphs
    #[default]
    Tight,
    /// Lines continuing the selection reach the paragraph's left and right
    /// extent
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub rect: Rect,
    pub direction: TextDirection,
}

/// Which side of a position a caret sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// The caret belongs to the character before the position
    Upstream,
    /// The caret belongs to the character after the position
    Downstream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionWithAffinity {
    pub position: usize,
    pub affinity: Affinity,
}

impl PositionWithAffinity {
    pub fn new(position: usize, affinity: Affinity) -> Self {
        Self { position, affinity }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineMetrics {
    pub start: usize,
    pub end: usize,
    pub end_excluding_whitespace: usize,
    pub end_including_newline: usize,
    pub hard_break: bool,
    /// Distance from the top of the line to the baseline
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the line
    pub descent: f32,
    pub height: f32,
    /// Width of the visible content, without trailing whitespace
    pub width: f32,
    /// Left edge of the content after alignment
    pub left: f32,
    /// Baseline y from the top of the paragraph
    pub baseline: f32,
    pub line_number: usize,
}

impl LineMetrics {
    pub fn top(&self) -> f32 {
        self.baseline - self.ascent
    }

    pub fn bottom(&self) -> f32 {
        self.baseline + self.descent
    }
}

/// Horizontal extent of one grapheme
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphPosition {
    pub code_units: Range<usize>,
    pub x_pos: Range<f32>,
}

impl GlyphPosition {
    pub fn width(&self) -> f32 {
        self.x_pos.end - self.x_pos.start
    }
}

/// A laid-out run of one direction and style, used for hit testing
#[derive(Debug, Clone)]
pub struct CodeUnitRun {
    /// Grapheme positions in visual order
    pub positions: Vec<GlyphPosition>,
    pub code_units: Range<usize>,
    pub x_pos: Range<f32>,
    pub line_number: usize,
    /// Font metrics of the run, or the placeholder's extent around the baseline
    pub metrics: FontMetrics,
    pub direction: TextDirection,
    pub placeholder_index: Option<usize>,
    /// Trailing whitespace that takes no line width
    pub is_ghost: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout internals
// ─────────────────────────────────────────────────────────────────────────────

/// Text sharing one style run and one typeface, or a single placeholder
#[derive(Clone)]
struct Segment {
    start: usize,
    end: usize,
    run_index: Option<usize>,
    typeface: Option<Arc<dyn Typeface>>,
    placeholder: Option<usize>,
}

/// A segment cut to one bidi run and one line
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    level: u8,
    segment: usize,
    is_ghost: bool,
}

#[derive(Debug, Clone, Copy)]
struct PlacedGlyph {
    glyph_id: u16,
    unit: usize,
    /// Relative to the start of the piece
    x: f32,
    advance: f32,
    offset: Point,
}

struct ShapedPiece {
    start: usize,
    end: usize,
    level: u8,
    run_index: Option<usize>,
    typeface: Option<Arc<dyn Typeface>>,
    placeholder: Option<usize>,
    is_ghost: bool,
    is_ellipsis: bool,
    /// Left edge relative to the line's content start
    x: f32,
    glyphs: Vec<PlacedGlyph>,
}

impl ShapedPiece {
    fn is_rtl(&self) -> bool {
        self.level % 2 == 1
    }

    fn direction(&self) -> TextDirection {
        if self.is_rtl() {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }

    fn width(&self) -> f32 {
        self.glyphs
            .iter()
            .map(|glyph| glyph.x + glyph.advance)
            .fold(0.0, f32::max)
    }

    /// Move the piece so its first glyph starts at its left edge.
    fn normalize(&mut self) {
        let shift = self.glyphs.iter().map(|glyph| glyph.x).fold(f32::INFINITY, f32::min);
        if shift.is_finite() && shift != 0.0 {
            self.x += shift;
            for glyph in &mut self.glyphs {
                glyph.x -= shift;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StrutMetrics {
    ascent: f32,
    descent: f32,
    force: bool,
}

/// State shared by every line of one layout pass
struct LayoutPass<'a> {
    measured: MeasuredText<'a>,
    segments: &'a [Segment],
    bidi_runs: &'a [BidiRun],
    graphemes: &'a [usize],
    strut: Option<StrutMetrics>,
    line_count: usize,
    did_exceed_max_lines: bool,
}

struct LaidOutLine {
    metrics: LineMetrics,
    /// Tallest font ascent and descent among the line's runs
    glyph_extent: (f32, f32),
    code_unit_runs: Vec<CodeUnitRun>,
    records: Vec<PaintRecord>,
}

type OutlineCache = FxHashMap<(usize, u16, u32), Option<Arc<Path>>>;

// ─────────────────────────────────────────────────────────────────────────────
// Paragraph
// ─────────────────────────────────────────────────────────────────────────────

pub struct Paragraph {
    text: Vec<u16>,
    runs: StyledRuns,
    paragraph_style: ParagraphStyle,
    default_style: TextStyle,
    placeholders: Vec<PlaceholderRun>,
    /// Code unit offset of each placeholder's replacement character
    placeholder_positions: FxHashMap<usize, usize>,
    font_collection: Arc<dyn FontCollection>,
    line_breaker: Box<dyn LineBreaker>,
    bidi_resolver: Box<dyn BidiResolver>,
    grapheme_breaker: Box<dyn GraphemeBreaker>,

    needs_layout: bool,
    width: f32,
    line_metrics: Vec<LineMetrics>,
    glyph_extents: Vec<(f32, f32)>,
    code_unit_runs: Vec<CodeUnitRun>,
    records: Vec<PaintRecord>,
    strut: Option<StrutMetrics>,
    height: f32,
    max_intrinsic_width: f32,
    min_intrinsic_width: f32,
    longest_line: f32,
    alphabetic_baseline: f32,
    ideographic_baseline: f32,
    did_exceed_max_lines: bool,
    min_left: f32,
    max_right: f32,
}

impl Paragraph {
    pub fn new(font_collection: Arc<dyn FontCollection>) -> Self {
        let paragraph_style = ParagraphStyle::default();
        Self {
            text: Vec::new(),
            runs: StyledRuns::new(),
            default_style: paragraph_style.default_text_style(),
            paragraph_style,
            placeholders: Vec::new(),
            placeholder_positions: FxHashMap::default(),
            font_collection,
            line_breaker: Box::new(UnicodeLineBreaker),
            bidi_resolver: Box::new(UnicodeBidiResolver),
            grapheme_breaker: Box::new(UnicodeGraphemeBreaker),
            needs_layout: true,
            width: 0.0,
            line_metrics: Vec::new(),
            glyph_extents: Vec::new(),
            code_unit_runs: Vec::new(),
            records: Vec::new(),
            strut: None,
            height: 0.0,
            max_intrinsic_width: 0.0,
            min_intrinsic_width: 0.0,
            longest_line: 0.0,
            alphabetic_baseline: 0.0,
            ideographic_baseline: 0.0,
            did_exceed_max_lines: false,
            min_left: 0.0,
            max_right: 0.0,
        }
    }

    pub fn with_line_breaker(mut self, line_breaker: Box<dyn LineBreaker>) -> Self {
        self.line_breaker = line_breaker;
        self.needs_layout = true;
        self
    }

    pub fn with_bidi_resolver(mut self, bidi_resolver: Box<dyn BidiResolver>) -> Self {
        self.bidi_resolver = bidi_resolver;
        self.needs_layout = true;
        self
    }

    pub fn with_grapheme_breaker(mut self, grapheme_breaker: Box<dyn GraphemeBreaker>) -> Self {
        self.grapheme_breaker = grapheme_breaker;
        self.needs_layout = true;
        self
    }

    pub fn set_text(&mut self, text: Vec<u16>, runs: StyledRuns) {
        self.text = text;
        self.runs = runs;
        self.needs_layout = true;
    }

    pub fn set_paragraph_style(&mut self, style: ParagraphStyle) {
        self.default_style = style.default_text_style();
        self.paragraph_style = style;
        self.needs_layout = true;
    }

    /// Reserve space for inline objects.
    ///
    /// `replacement_offsets[i]` is the offset of the object replacement
    /// character standing in for `placeholders[i]`.
    pub fn set_inline_placeholders(&mut self, placeholders: Vec<PlaceholderRun>, replacement_offsets: &[usize]) {
        self.placeholder_positions = replacement_offsets
            .iter()
            .copied()
            .enumerate()
            .take(placeholders.len())
            .map(|(index, offset)| (offset, index))
            .collect();
        self.placeholders = placeholders;
        self.needs_layout = true;
    }

    pub fn text(&self) -> &[u16] {
        &self.text
    }

    pub fn paragraph_style(&self) -> &ParagraphStyle {
        &self.paragraph_style
    }

    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Layout
    // ─────────────────────────────────────────────────────────────────────────

    /// Lay out the text for `width`. Repeating the last width without
    /// changing the paragraph is a no-op.
    pub fn layout(&mut self, width: f32) {
        if !self.needs_layout && width == self.width {
            return;
        }
        self.width = width;
        self.needs_layout = false;

        let graphemes = self.grapheme_breaker.grapheme_boundaries(&self.text);
        let breaks = self.line_breaker.break_opportunities(&self.text);
        let segments = self.itemize();
        let advances = self.measure(&segments);
        let measured = MeasuredText::new(&self.text, &advances, &breaks, &graphemes);
        let broken = measured.break_lines(width);

        let mut lines = broken.lines;
        let max_lines = match self.paragraph_style.max_lines {
            Some(max_lines) => Some(max_lines),
            // An ellipsis without a line limit cuts after the first line
            None if self.paragraph_style.ellipsized() => Some(1),
            None => None,
        };
        let did_exceed_max_lines = max_lines.is_some_and(|max_lines| lines.len() > max_lines);
        if let Some(max_lines) = max_lines {
            lines.truncate(max_lines);
        }

        let bidi_runs = self.resolve_bidi();
        let strut = self.compute_strut();
        let pass = LayoutPass {
            measured,
            segments: &segments,
            bidi_runs: &bidi_runs,
            graphemes: &graphemes,
            strut,
            line_count: lines.len(),
            did_exceed_max_lines,
        };

        let mut outlines = OutlineCache::default();
        let mut laid_out = Vec::with_capacity(lines.len());
        let mut top = 0.0;
        for (line_number, line) in lines.iter().enumerate() {
            let line = self.layout_line(&pass, line, line_number, top, &mut outlines);
            top += line.metrics.height;
            laid_out.push(line);
        }

        self.line_metrics.clear();
        self.glyph_extents.clear();
        self.code_unit_runs.clear();
        self.records.clear();
        for line in laid_out {
            self.line_metrics.push(line.metrics);
            self.glyph_extents.push(line.glyph_extent);
            self.code_unit_runs.extend(line.code_unit_runs);
            self.records.extend(line.records);
        }

        self.strut = strut;
        self.height = top;
        self.max_intrinsic_width = broken.max_intrinsic_width;
        self.min_intrinsic_width = broken.min_intrinsic_width;
        self.did_exceed_max_lines = did_exceed_max_lines;
        self.longest_line = self.line_metrics.iter().map(|line| line.width).fold(0.0, f32::max);
        self.min_left = self.line_metrics.iter().map(|line| line.left).fold(f32::INFINITY, f32::min);
        self.max_right = self
            .line_metrics
            .iter()
            .map(|line| line.left + line.width)
            .fold(f32::NEG_INFINITY, f32::max);
        if self.line_metrics.is_empty() {
            self.min_left = 0.0;
            self.max_right = 0.0;
        }
        let (alphabetic, ideographic) = self
            .line_metrics
            .first()
            .map_or((0.0, 0.0), |line| (line.ascent, line.ascent + line.descent));
        self.alphabetic_baseline = alphabetic;
        self.ideographic_baseline = ideographic;

        debug!(
            width,
            lines = self.line_metrics.len(),
            height = self.height,
            runs = self.code_unit_runs.len(),
            exceeded = self.did_exceed_max_lines,
            "Laid out paragraph"
        );
    }

    fn style_for(&self, run_index: Option<usize>) -> &TextStyle {
        run_index
            .and_then(|index| self.runs.get_run(index))
            .map_or(&self.default_style, |run| run.style)
    }

    fn style_at(&self, offset: usize) -> &TextStyle {
        self.runs.run_at(offset).map_or(&self.default_style, |run| run.style)
    }

    fn match_typeface(&self, style: &TextStyle) -> Option<Arc<dyn Typeface>> {
        match self.font_collection.match_style(style) {
            Ok(typeface) => Some(typeface),
            Err(e) => {
                warn!("No typeface for text: {}", e);
                None
            }
        }
    }

    /// Cut the text into segments of one style and one typeface.
    fn itemize(&self) -> Vec<Segment> {
        let len = self.text.len();
        let mut spans: Vec<(usize, usize, Option<usize>)> = Vec::new();
        let mut cursor = 0;
        for index in 0..self.runs.size() {
            let Some(run) = self.runs.get_run(index) else {
                continue;
            };
            let start = run.start.clamp(cursor, len);
            let end = run.end.min(len);
            if start > cursor {
                spans.push((cursor, start, None));
            }
            if end > start {
                spans.push((start, end, Some(index)));
                cursor = end;
            }
        }
        if cursor < len {
            spans.push((cursor, len, None));
        }

        let mut segments: Vec<Segment> = Vec::new();
        for (start, end, run_index) in spans {
            let style = self.style_for(run_index);
            let primary = self.match_typeface(style);
            let mut current: Option<Segment> = None;
            let mut unit = start;

            for decoded in char::decode_utf16(self.text[start..end].iter().copied()) {
                let (ch, width) = match decoded {
                    Ok(ch) => (ch, ch.len_utf16()),
                    Err(_) => (char::REPLACEMENT_CHARACTER, 1),
                };

                if let Some(&placeholder) = self.placeholder_positions.get(&unit) {
                    segments.extend(current.take());
                    segments.push(Segment {
                        start: unit,
                        end: unit + width,
                        run_index,
                        typeface: None,
                        placeholder: Some(placeholder),
                    });
                    unit += width;
                    continue;
                }

                let typeface = match &primary {
                    Some(face) if face.has_glyph(ch) || ch.is_whitespace() || ch.is_control() => Some(face.clone()),
                    _ => self.font_collection.fallback_for(ch, style).or_else(|| primary.clone()),
                };
                let same_face = current.as_ref().is_some_and(|segment| match (&segment.typeface, &typeface) {
                    (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                    (None, None) => true,
                    _ => false,
                });
                match current.as_mut() {
                    Some(segment) if same_face => segment.end = unit + width,
                    _ => {
                        segments.extend(current.take());
                        current = Some(Segment {
                            start: unit,
                            end: unit + width,
                            run_index,
                            typeface,
                            placeholder: None,
                        });
                    }
                }
                unit += width;
            }
            segments.extend(current);
        }
        segments
    }

    fn placeholder_width(&self, index: usize) -> f32 {
        self.placeholders.get(index).map_or(0.0, |placeholder| placeholder.width)
    }

    /// Advance of every code unit, credited to the first unit of its cluster.
    fn measure(&self, segments: &[Segment]) -> Vec<f32> {
        let mut advances = vec![0.0; self.text.len()];
        for segment in segments {
            if let Some(index) = segment.placeholder {
                advances[segment.start] = self.placeholder_width(index);
                continue;
            }
            for glyph in self.shape_range(segment, segment.start, segment.end, false) {
                if let Some(advance) = advances.get_mut(glyph.unit) {
                    *advance += glyph.advance;
                }
            }
        }
        advances
    }

    /// Shape part of a segment, with letter and word spacing applied.
    fn shape_range(&self, segment: &Segment, start: usize, end: usize, rtl: bool) -> Vec<PlacedGlyph> {
        let Some(typeface) = &segment.typeface else {
            return Vec::new();
        };
        let style = self.style_for(segment.run_index);
        let decoded = Utf16Text::new(&self.text[start..end]);
        let mut x = 0.0;
        typeface
            .shape(decoded.as_str(), style.font_size, rtl)
            .into_iter()
            .map(|glyph| {
                let unit = start + decoded.unit_at(glyph.cluster);
                let mut advance = glyph.advance + style.letter_spacing;
                if self.text.get(unit).is_some_and(|unit| is_space(*unit)) {
                    advance += style.word_spacing;
                }
                let placed = PlacedGlyph {
                    glyph_id: glyph.glyph_id,
                    unit,
                    x,
                    advance,
                    offset: glyph.offset,
                };
                x += advance;
                placed
            })
            .collect()
    }

    fn resolve_bidi(&self) -> Vec<BidiRun> {
        let base = self.paragraph_style.text_direction;
        let mut runs = self.bidi_resolver.resolve(&self.text, base);
        if runs.is_empty() && !self.text.is_empty() {
            runs.push(BidiRun {
                start: 0,
                end: self.text.len(),
                level: u8::from(base.is_rtl()),
            });
        }
        // A lone trailing whitespace run joins the run before it
        if runs.len() >= 2 {
            if let Some(&last) = runs.last() {
                if last.len() == 1 && self.text.get(last.start).is_some_and(|unit| is_whitespace(*unit)) {
                    runs.pop();
                    if let Some(previous) = runs.last_mut() {
                        previous.end = last.end;
                    }
                }
            }
        }
        runs
    }

    fn compute_strut(&self) -> Option<StrutMetrics> {
        let style = &self.paragraph_style;
        if !style.strut_enabled {
            return None;
        }
        let strut_style = style.strut_style();
        let typeface = self.match_typeface(&strut_style)?;
        let metrics = typeface.metrics(strut_style.font_size);
        let (mut ascent, mut descent) = match style.strut_height {
            Some(height) if metrics.height() > 0.0 => {
                let line_height = height * strut_style.font_size;
                (
                    metrics.ascent / metrics.height() * line_height,
                    metrics.descent / metrics.height() * line_height,
                )
            }
            _ => (metrics.ascent, metrics.descent),
        };
        let leading = match style.strut_leading {
            Some(leading) => leading * strut_style.font_size,
            None if style.strut_height.is_some() => 0.0,
            None => metrics.leading,
        };
        ascent += leading / 2.0;
        descent += leading / 2.0;
        Some(StrutMetrics {
            ascent,
            descent,
            force: style.force_strut_height,
        })
    }

    fn layout_line(
        &self,
        pass: &LayoutPass<'_>,
        line: &LineRange,
        line_number: usize,
        top: f32,
        outlines: &mut OutlineCache,
    ) -> LaidOutLine {
        let rtl = self.paragraph_style.text_direction.is_rtl();
        let base_level = u8::from(rtl);
        let is_last_line = line_number + 1 == pass.line_count;

        // Ellipsis
        let mut visible_end = line.end_excluding_whitespace;
        let mut ellipsis = None;
        let overflows = pass.measured.width(line.start, visible_end) > self.width + FIT_EPSILON;
        if is_last_line && self.paragraph_style.ellipsized() && (pass.did_exceed_max_lines || overflows) {
            let style_offset = visible_end.saturating_sub(1).max(line.start);
            let run_index = pass
                .segments
                .iter()
                .find(|segment| segment.start <= style_offset && style_offset < segment.end)
                .and_then(|segment| segment.run_index);
            if let Some(piece) = self.shape_ellipsis(run_index, base_level, visible_end) {
                let ellipsis_width = piece.width();
                while visible_end > line.start
                    && pass.measured.width(line.start, visible_end) + ellipsis_width > self.width + FIT_EPSILON
                {
                    visible_end = pass.measured.previous_grapheme(line.start, visible_end);
                }
                visible_end = pass.measured.trim_trailing_whitespace(line.start, visible_end);
                ellipsis = Some(piece);
            }
        }

        let mut logical = Vec::new();
        collect_pieces(pass.bidi_runs, pass.segments, line.start, visible_end, false, &mut logical);
        reorder_visually(&mut logical);
        let mut ghosts = Vec::new();
        if ellipsis.is_none() {
            collect_pieces(pass.bidi_runs, pass.segments, line.end_excluding_whitespace, line.end, true, &mut ghosts);
        }

        let mut pieces: Vec<ShapedPiece> = Vec::with_capacity(logical.len() + ghosts.len() + 1);
        if rtl {
            pieces.extend(ellipsis.take());
            pieces.extend(ghosts.iter().rev().map(|piece| self.shape_piece(piece, pass.segments)));
            pieces.extend(logical.iter().map(|piece| self.shape_piece(piece, pass.segments)));
        } else {
            pieces.extend(logical.iter().map(|piece| self.shape_piece(piece, pass.segments)));
            pieces.extend(ellipsis.take());
            pieces.extend(ghosts.iter().map(|piece| self.shape_piece(piece, pass.segments)));
        }

        // Horizontal placement
        let ghost_width: f32 = pieces.iter().filter(|piece| piece.is_ghost).map(ShapedPiece::width).sum();
        let mut line_width: f32 = pieces.iter().filter(|piece| !piece.is_ghost).map(ShapedPiece::width).sum();
        let mut cursor = if rtl { -ghost_width } else { 0.0 };
        for piece in &mut pieces {
            piece.x = cursor;
            cursor += piece.width();
        }

        let align = self.paragraph_style.effective_align();
        let justify = align == TextAlign::Justify
            && !line.hard_break
            && !is_last_line
            && !pieces.iter().any(|piece| piece.is_ellipsis)
            && self.width.is_finite();
        if justify && self.justify(&mut pieces, self.width - line_width) {
            line_width = self.width;
        }

        let left = if self.width.is_finite() {
            match align {
                TextAlign::Right => self.width - line_width,
                TextAlign::Center => (self.width - line_width) / 2.0,
                TextAlign::Justify if rtl => self.width - line_width,
                _ => 0.0,
            }
        } else {
            0.0
        };

        // Vertical metrics
        let (mut ascent, mut descent) = (0.0_f32, 0.0_f32);
        let mut has_text = false;
        for piece in pieces.iter().filter(|piece| !piece.is_ghost && piece.placeholder.is_none()) {
            let Some(typeface) = &piece.typeface else {
                continue;
            };
            let style = self.style_for(piece.run_index);
            let (a, d) = style_line_extent(style, &typeface.metrics(style.font_size));
            ascent = ascent.max(a);
            descent = descent.max(d);
            has_text = true;
        }
        if !has_text {
            let style = self.style_at(line.start);
            if let Some(typeface) = self.match_typeface(style) {
                let (a, d) = style_line_extent(style, &typeface.metrics(style.font_size));
                ascent = a;
                descent = d;
            }
        }
        let (text_ascent, text_descent) = (ascent, descent);
        for piece in pieces.iter().filter(|piece| !piece.is_ghost) {
            if let Some(placeholder) = piece.placeholder.and_then(|index| self.placeholders.get(index)) {
                let (a, d) = placeholder_extent(placeholder, text_ascent, text_descent);
                ascent = ascent.max(a);
                descent = descent.max(d);
            }
        }
        if let Some(strut) = pass.strut {
            if strut.force {
                ascent = strut.ascent;
                descent = strut.descent;
            } else {
                ascent = ascent.max(strut.ascent);
                descent = descent.max(strut.descent);
            }
        }
        let baseline = top + ascent;

        // Outputs
        let mut code_unit_runs = Vec::new();
        let mut records = Vec::new();
        for piece in &pieces {
            if !piece.is_ellipsis {
                code_unit_runs.push(self.code_unit_run(piece, pass.graphemes, left, line_number, text_ascent, text_descent));
            }
            if !piece.is_ghost && piece.placeholder.is_none() && !piece.glyphs.is_empty() {
                if let Some(record) = self.paint_record(piece, left, baseline, line_number, outlines) {
                    records.push(record);
                }
            }
        }
        let glyph_extent = code_unit_runs
            .iter()
            .filter(|run| !run.is_ghost)
            .map(|run| (run.metrics.ascent, run.metrics.descent))
            .reduce(|a, b| (a.0.max(b.0), a.1.max(b.1)))
            .unwrap_or((ascent, descent));

        LaidOutLine {
            metrics: LineMetrics {
                start: line.start,
                end: line.end,
                end_excluding_whitespace: visible_end,
                end_including_newline: line.end_including_newline,
                hard_break: line.hard_break,
                ascent,
                descent,
                height: ascent + descent,
                width: line_width,
                left,
                baseline,
                line_number,
            },
            glyph_extent,
            code_unit_runs,
            records,
        }
    }

    fn shape_piece(&self, piece: &Piece, segments: &[Segment]) -> ShapedPiece {
        let segment = &segments[piece.segment];
        let glyphs = match segment.placeholder {
            Some(index) => vec![PlacedGlyph {
                glyph_id: 0,
                unit: piece.start,
                x: 0.0,
                advance: self.placeholder_width(index),
                offset: Point::ZERO,
            }],
            None => self.shape_range(segment, piece.start, piece.end, piece.level % 2 == 1),
        };
        ShapedPiece {
            start: piece.start,
            end: piece.end,
            level: piece.level,
            run_index: segment.run_index,
            typeface: segment.typeface.clone(),
            placeholder: segment.placeholder,
            is_ghost: piece.is_ghost,
            is_ellipsis: false,
            x: 0.0,
            glyphs,
        }
    }

    fn shape_ellipsis(&self, run_index: Option<usize>, level: u8, offset: usize) -> Option<ShapedPiece> {
        let style = self.style_for(run_index);
        let typeface = self.match_typeface(style)?;
        let mut x = 0.0;
        let glyphs = typeface
            .shape(&self.paragraph_style.ellipsis, style.font_size, level % 2 == 1)
            .into_iter()
            .map(|glyph| {
                let placed = PlacedGlyph {
                    glyph_id: glyph.glyph_id,
                    unit: offset,
                    x,
                    advance: glyph.advance + style.letter_spacing,
                    offset: glyph.offset,
                };
                x += placed.advance;
                placed
            })
            .collect();
        Some(ShapedPiece {
            start: offset,
            end: offset,
            level,
            run_index,
            typeface: Some(typeface),
            placeholder: None,
            is_ghost: false,
            is_ellipsis: true,
            x: 0.0,
            glyphs,
        })
    }

    /// Spread `extra` over the gaps between words. Returns false when the
    /// line has a single word.
    fn justify(&self, pieces: &mut [ShapedPiece], extra: f32) -> bool {
        let rtl = self.paragraph_style.text_direction.is_rtl();
        let is_word_glyph = |glyph: &PlacedGlyph| !self.text.get(glyph.unit).is_some_and(|unit| is_whitespace(*unit));

        let mut gaps = 0usize;
        let mut seen_word = false;
        let mut after_space = false;
        for glyph in pieces.iter().filter(|piece| !piece.is_ghost).flat_map(|piece| piece.glyphs.iter()) {
            if is_word_glyph(glyph) {
                if seen_word && after_space {
                    gaps += 1;
                }
                seen_word = true;
                after_space = false;
            } else {
                after_space = true;
            }
        }
        if gaps == 0 {
            return false;
        }

        let offset_for = |gap: usize| {
            if gap == gaps {
                extra
            } else {
                extra * gap as f32 / gaps as f32
            }
        };
        let mut gap = 0usize;
        let mut seen_word = false;
        let mut after_space = false;
        for piece in pieces.iter_mut() {
            if piece.is_ghost {
                // Ghosts after the line stay after it
                if !rtl {
                    piece.x += extra;
                }
                continue;
            }
            for glyph in &mut piece.glyphs {
                if is_word_glyph(glyph) {
                    if seen_word && after_space {
                        gap += 1;
                    }
                    seen_word = true;
                    after_space = false;
                } else {
                    after_space = true;
                }
                glyph.x += offset_for(gap);
            }
            piece.normalize();
        }
        true
    }

    fn code_unit_run(
        &self,
        piece: &ShapedPiece,
        graphemes: &[usize],
        left: f32,
        line_number: usize,
        text_ascent: f32,
        text_descent: f32,
    ) -> CodeUnitRun {
        let origin = left + piece.x;
        let mut positions = Vec::new();

        // Consecutive glyphs of one cluster form a group
        let mut clusters: Vec<usize> = piece.glyphs.iter().map(|glyph| glyph.unit).collect();
        clusters.sort_unstable();
        clusters.dedup();
        let mut groups: Vec<(usize, f32, f32)> = Vec::new();
        for glyph in &piece.glyphs {
            let (start, end) = (origin + glyph.x, origin + glyph.x + glyph.advance);
            match groups.last_mut() {
                Some(group) if group.0 == glyph.unit => {
                    group.1 = group.1.min(start);
                    group.2 = group.2.max(end);
                }
                _ => groups.push((glyph.unit, start, end)),
            }
        }

        for (unit, x_start, x_end) in groups {
            let cluster_end = clusters
                .iter()
                .copied()
                .find(|&cluster| cluster > unit)
                .unwrap_or(piece.end)
                .max(unit + 1);
            // Ligatures share their advance between the graphemes they cover
            let first = graphemes.partition_point(|&boundary| boundary <= unit);
            let last = graphemes.partition_point(|&boundary| boundary < cluster_end);
            let mut starts = vec![unit];
            starts.extend(graphemes[first..last.max(first)].iter().copied());
            let count = starts.len();
            let step = (x_end - x_start) / count as f32;
            for (index, &start) in starts.iter().enumerate() {
                let end = starts.get(index + 1).copied().unwrap_or(cluster_end);
                let x_pos = if piece.is_rtl() {
                    x_end - step * (index + 1) as f32..x_end - step * index as f32
                } else {
                    x_start + step * index as f32..x_start + step * (index + 1) as f32
                };
                positions.push(GlyphPosition {
                    code_units: start..end,
                    x_pos,
                });
            }
        }
        positions.sort_by(|a, b| a.x_pos.start.total_cmp(&b.x_pos.start));

        let metrics = match piece.placeholder.and_then(|index| self.placeholders.get(index)) {
            Some(placeholder) => {
                let (ascent, descent) = placeholder_extent(placeholder, text_ascent, text_descent);
                FontMetrics {
                    ascent,
                    descent,
                    ..FontMetrics::default()
                }
            }
            None => {
                let style = self.style_for(piece.run_index);
                piece
                    .typeface
                    .as_ref()
                    .map(|typeface| typeface.metrics(style.font_size))
                    .unwrap_or_default()
            }
        };

        let x_pos = match (positions.first(), positions.last()) {
            (Some(first), Some(last)) => first.x_pos.start..last.x_pos.end,
            _ => origin..origin,
        };
        CodeUnitRun {
            positions,
            code_units: piece.start..piece.end,
            x_pos,
            line_number,
            metrics,
            direction: piece.direction(),
            placeholder_index: piece.placeholder,
            is_ghost: piece.is_ghost,
        }
    }

    fn paint_record(
        &self,
        piece: &ShapedPiece,
        left: f32,
        baseline: f32,
        line_number: usize,
        outlines: &mut OutlineCache,
    ) -> Option<PaintRecord> {
        let typeface = piece.typeface.as_ref()?;
        let style = self.style_for(piece.run_index);
        let font_size = style.font_size;
        let face_key = Arc::as_ptr(typeface) as *const u8 as usize;

        let glyphs = piece
            .glyphs
            .iter()
            .map(|glyph| {
                let outline = outlines
                    .entry((face_key, glyph.glyph_id, font_size.to_bits()))
                    .or_insert_with(|| typeface.glyph_outline(glyph.glyph_id, font_size).map(Arc::new))
                    .clone();
                FrameGlyph {
                    glyph_id: glyph.glyph_id,
                    position: Point::new(glyph.x + glyph.offset.x, glyph.offset.y),
                    bounds: typeface.glyph_bounds(glyph.glyph_id, font_size).unwrap_or(Rect::ZERO),
                    outline,
                }
            })
            .collect();

        Some(PaintRecord {
            style: style.clone(),
            offset: Point::new(left + piece.x, baseline),
            text_frame: TextFrame::new(vec![TextRun {
                font_size,
                has_color_glyphs: typeface.has_color_glyphs(),
                glyphs,
            }]),
            metrics: typeface.metrics(font_size),
            line_number,
            run_width: piece.width(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    fn laid_out(&self) -> bool {
        debug_assert!(!self.needs_layout, "paragraph queried before layout");
        !self.needs_layout
    }

    pub fn get_max_width(&self) -> f32 {
        self.laid_out();
        self.width
    }

    pub fn get_height(&self) -> f32 {
        self.laid_out();
        self.height
    }

    pub fn get_line_count(&self) -> usize {
        self.laid_out();
        self.line_metrics.len()
    }

    /// Width of the widest line if no soft wrapping happened
    pub fn get_max_intrinsic_width(&self) -> f32 {
        self.laid_out();
        self.max_intrinsic_width
    }

    /// Width of the widest unbreakable word
    pub fn get_min_intrinsic_width(&self) -> f32 {
        self.laid_out();
        self.min_intrinsic_width
    }

    pub fn get_longest_line(&self) -> f32 {
        self.laid_out();
        self.longest_line
    }

    pub fn get_alphabetic_baseline(&self) -> f32 {
        self.laid_out();
        self.alphabetic_baseline
    }

    pub fn get_ideographic_baseline(&self) -> f32 {
        self.laid_out();
        self.ideographic_baseline
    }

    pub fn did_exceed_max_lines(&self) -> bool {
        self.laid_out();
        self.did_exceed_max_lines
    }

    pub fn get_line_metrics(&self) -> &[LineMetrics] {
        self.laid_out();
        &self.line_metrics
    }

    pub fn code_unit_runs(&self) -> &[CodeUnitRun] {
        self.laid_out();
        &self.code_unit_runs
    }

    pub fn paint_records(&self) -> &[PaintRecord] {
        self.laid_out();
        &self.records
    }

    /// Boxes covering the code units in `start..end`, merged per line.
    pub fn get_rects_for_range(
        &self,
        start: usize,
        end: usize,
        height_style: RectHeightStyle,
        width_style: RectWidthStyle,
    ) -> Vec<TextBox> {
        if !self.laid_out() || start >= end {
            return Vec::new();
        }

        let mut line_boxes: Vec<Vec<TextBox>> = vec![Vec::new(); self.line_metrics.len()];
        for run in &self.code_unit_runs {
            if run.code_units.end <= start || run.code_units.start >= end {
                continue;
            }
            let (top, bottom) = self.box_vertical_extent(run.line_number, Some(run), height_style);
            let Some(boxes) = line_boxes.get_mut(run.line_number) else {
                continue;
            };
            for position in &run.positions {
                if position.code_units.end <= start || position.code_units.start >= end {
                    continue;
                }
                let rect = Rect::from_ltrb(position.x_pos.start, top, position.x_pos.end, bottom);
                push_merged(boxes, TextBox { rect, direction: run.direction });
            }
        }

        // Selected empty lines still get a box
        for line in &self.line_metrics {
            let empty = line.start == line.end_excluding_whitespace && line.end_including_newline > line.start;
            if empty && line.start >= start && line.start < end && line_boxes[line.line_number].is_empty() {
                let (top, bottom) = self.box_vertical_extent(line.line_number, None, height_style);
                line_boxes[line.line_number].push(TextBox {
                    rect: Rect::from_ltrb(line.left, top, line.left, bottom),
                    direction: self.paragraph_style.text_direction,
                });
            }
        }

        if width_style == RectWidthStyle::Max {
            self.extend_to_paragraph_edges(&mut line_boxes);
        }
        line_boxes.into_iter().flatten().collect()
    }

    fn extend_to_paragraph_edges(&self, line_boxes: &mut [Vec<TextBox>]) {
        let selected: Vec<usize> = (0..line_boxes.len()).filter(|&index| !line_boxes[index].is_empty()).collect();
        let (Some(&first), Some(&last)) = (selected.first(), selected.last()) else {
            return;
        };
        let direction = self.paragraph_style.text_direction;
        let rtl = direction.is_rtl();
        for &index in &selected {
            let boxes = &mut line_boxes[index];
            let left = boxes.iter().map(|b| b.rect.left()).fold(f32::INFINITY, f32::min);
            let right = boxes.iter().map(|b| b.rect.right()).fold(f32::NEG_INFINITY, f32::max);
            let top = boxes.iter().map(|b| b.rect.top()).fold(f32::INFINITY, f32::min);
            let bottom = boxes.iter().map(|b| b.rect.bottom()).fold(f32::NEG_INFINITY, f32::max);

            let mut extend = |from: f32, to: f32| {
                if to > from {
                    boxes.push(TextBox {
                        rect: Rect::from_ltrb(from, top, to, bottom),
                        direction,
                    });
                }
            };
            // The selection continues past the line's trailing edge and
            // arrives from its leading edge
            if index != last {
                if rtl {
                    extend(self.min_left, left);
                } else {
                    extend(right, self.max_right);
                }
            }
            if index != first {
                if rtl {
                    extend(right, self.max_right);
                } else {
                    extend(self.min_left, left);
                }
            }
        }
    }

    fn box_vertical_extent(&self, line_index: usize, run: Option<&CodeUnitRun>, style: RectHeightStyle) -> (f32, f32) {
        let Some(line) = self.line_metrics.get(line_index) else {
            return (0.0, 0.0);
        };
        let baseline = line.baseline;
        let glyph_top = |index: usize| {
            self.line_metrics
                .get(index)
                .zip(self.glyph_extents.get(index))
                .map_or(0.0, |(line, extent)| line.baseline - extent.0)
        };
        let glyph_bottom = |index: usize| {
            self.line_metrics
                .get(index)
                .zip(self.glyph_extents.get(index))
                .map_or(0.0, |(line, extent)| line.baseline + extent.1)
        };
        let is_last = line_index + 1 == self.line_metrics.len();
        let tight = || match run {
            Some(run) => (baseline - run.metrics.ascent, baseline + run.metrics.descent),
            None => (line.top(), line.bottom()),
        };

        match style {
            RectHeightStyle::Tight => tight(),
            RectHeightStyle::Max => (glyph_top(line_index), glyph_bottom(line_index)),
            RectHeightStyle::IncludeLineSpacingMiddle => {
                let top = if line_index == 0 {
                    line.top()
                } else {
                    (glyph_bottom(line_index - 1) + glyph_top(line_index)) / 2.0
                };
                let bottom = if is_last {
                    line.bottom()
                } else {
                    (glyph_bottom(line_index) + glyph_top(line_index + 1)) / 2.0
                };
                (top, bottom)
            }
            RectHeightStyle::IncludeLineSpacingTop => {
                let top = if line_index == 0 { line.top() } else { glyph_bottom(line_index - 1) };
                (top, glyph_bottom(line_index))
            }
            RectHeightStyle::IncludeLineSpacingBottom => {
                let bottom = if is_last { line.bottom() } else { glyph_top(line_index + 1) };
                (glyph_top(line_index), bottom)
            }
            RectHeightStyle::Strut => match self.strut {
                Some(strut) => (baseline - strut.ascent, baseline + strut.descent),
                None => tight(),
            },
        }
    }

    /// Boxes of every placeholder, in text order
    pub fn get_rects_for_placeholders(&self) -> Vec<TextBox> {
        if !self.laid_out() {
            return Vec::new();
        }
        let mut placeholders: Vec<(usize, TextBox)> = self
            .code_unit_runs
            .iter()
            .filter_map(|run| {
                let index = run.placeholder_index?;
                let line = self.line_metrics.get(run.line_number)?;
                let rect = Rect::from_ltrb(
                    run.x_pos.start,
                    line.baseline - run.metrics.ascent,
                    run.x_pos.end,
                    line.baseline + run.metrics.descent,
                );
                Some((index, TextBox { rect, direction: run.direction }))
            })
            .collect();
        placeholders.sort_by_key(|(index, _)| *index);
        placeholders.into_iter().map(|(_, text_box)| text_box).collect()
    }

    /// Text position closest to a point in paragraph coordinates
    pub fn get_glyph_position_at_coordinate(&self, dx: f32, dy: f32) -> PositionWithAffinity {
        if !self.laid_out() {
            return PositionWithAffinity::new(0, Affinity::Downstream);
        }
        let Some(line) = self
            .line_metrics
            .iter()
            .find(|line| dy < line.bottom())
            .or_else(|| self.line_metrics.last())
        else {
            return PositionWithAffinity::new(0, Affinity::Downstream);
        };

        let mut positions: Vec<(&GlyphPosition, TextDirection)> = self
            .code_unit_runs
            .iter()
            .filter(|run| run.line_number == line.line_number)
            .flat_map(|run| run.positions.iter().map(move |position| (position, run.direction)))
            .collect();
        positions.sort_by(|a, b| a.0.x_pos.start.total_cmp(&b.0.x_pos.start));

        let Some(&(glyph, direction)) = positions
            .iter()
            .find(|(position, _)| dx < position.x_pos.end)
            .or_else(|| positions.last())
        else {
            return PositionWithAffinity::new(line.start, Affinity::Downstream);
        };

        let midpoint = (glyph.x_pos.start + glyph.x_pos.end) / 2.0;
        let after_midpoint = dx >= midpoint;
        match (direction.is_rtl(), after_midpoint) {
            (false, true) | (true, false) => {
                // Trailing edge of the glyph in reading order
                PositionWithAffinity::new(glyph.code_units.end, Affinity::Upstream)
            }
            (false, false) | (true, true) => PositionWithAffinity::new(glyph.code_units.start, Affinity::Downstream),
        }
    }

    /// The word around `offset`.
    ///
    /// Words are maximal runs of non-whitespace, so punctuation stays part of
    /// the word it touches. A run of whitespace is its own segment.
    pub fn get_word_boundary(&self, offset: usize) -> Range<usize> {
        if self.text.is_empty() {
            return 0..0;
        }
        let offset = offset.min(self.text.len() - 1);
        let whitespace = is_whitespace(self.text[offset]);
        let mut start = offset;
        while start > 0 && is_whitespace(self.text[start - 1]) == whitespace {
            start -= 1;
        }
        let mut end = offset + 1;
        while end < self.text.len() && is_whitespace(self.text[end]) == whitespace {
            end += 1;
        }
        start..end
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Painting
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw the laid-out text with its top left corner at `(x, y)`.
    pub fn paint(&self, canvas: &mut Canvas, x: f32, y: f32) {
        if !self.laid_out() {
            return;
        }
        for record in &self.records {
            let style = &record.style;
            if let Some(background) = &style.background {
                canvas.draw_rect(record.background_rect().offset(x, y), background);
            }
            let paint = style.foreground.clone().unwrap_or_else(|| Paint::new(style.color));
            let position = Point::new(x + record.offset.x, y + record.offset.y);
            canvas.draw_text_frame(record.text_frame.clone(), position, &paint);
            paint_decorations(canvas, record, position);
        }
    }
}

impl fmt::Debug for Paragraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paragraph")
            .field("text_len", &self.text.len())
            .field("runs", &self.runs.size())
            .field("placeholders", &self.placeholders.len())
            .field("needs_layout", &self.needs_layout)
            .field("width", &self.width)
            .field("lines", &self.line_metrics.len())
            .field("height", &self.height)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Pieces of `start..end` cut at bidi and segment boundaries, in logical order.
fn collect_pieces(
    bidi_runs: &[BidiRun],
    segments: &[Segment],
    start: usize,
    end: usize,
    is_ghost: bool,
    out: &mut Vec<Piece>,
) {
    if start >= end {
        return;
    }
    let first_run = bidi_runs.partition_point(|run| run.end <= start);
    for run in &bidi_runs[first_run..] {
        if run.start >= end {
            break;
        }
        let run_start = start.max(run.start);
        let run_end = end.min(run.end);
        let first_segment = segments.partition_point(|segment| segment.end <= run_start);
        for (index, segment) in segments.iter().enumerate().skip(first_segment) {
            if segment.start >= run_end {
                break;
            }
            let piece_start = run_start.max(segment.start);
            let piece_end = run_end.min(segment.end);
            if piece_start < piece_end {
                out.push(Piece {
                    start: piece_start,
                    end: piece_end,
                    level: run.level,
                    segment: index,
                    is_ghost,
                });
            }
        }
    }
}

/// Reverse every maximal sequence at or above each odd level, highest first.
fn reorder_visually(pieces: &mut [Piece]) {
    let Some(highest) = pieces.iter().map(|piece| piece.level).max() else {
        return;
    };
    let Some(lowest_odd) = pieces.iter().map(|piece| piece.level).filter(|level| level % 2 == 1).min() else {
        return;
    };
    for level in (lowest_odd..=highest).rev() {
        let mut index = 0;
        while index < pieces.len() {
            if pieces[index].level >= level {
                let start = index;
                while index < pieces.len() && pieces[index].level >= level {
                    index += 1;
                }
                pieces[start..index].reverse();
            } else {
                index += 1;
            }
        }
    }
}

/// Ascent and descent a style contributes to its line.
///
/// With a height override the font's ascent to descent ratio is kept and
/// scaled to `height * font_size`, so faces with different native metrics
/// produce the same line height.
fn style_line_extent(style: &TextStyle, metrics: &FontMetrics) -> (f32, f32) {
    let total = metrics.height();
    if style.has_height_override && total > 0.0 {
        let line_height = style.height * style.font_size;
        return (
            metrics.ascent / total * line_height,
            metrics.descent / total * line_height,
        );
    }
    (
        metrics.ascent + metrics.leading / 2.0,
        metrics.descent + metrics.leading / 2.0,
    )
}

fn placeholder_extent(placeholder: &PlaceholderRun, text_ascent: f32, text_descent: f32) -> (f32, f32) {
    let height = placeholder.height;
    match placeholder.alignment {
        PlaceholderAlignment::Baseline => (placeholder.baseline_offset, height - placeholder.baseline_offset),
        PlaceholderAlignment::AboveBaseline => (height, 0.0),
        PlaceholderAlignment::BelowBaseline => (0.0, height),
        PlaceholderAlignment::Top => (text_ascent, height - text_ascent),
        PlaceholderAlignment::Bottom => (height - text_descent, text_descent),
        PlaceholderAlignment::Middle => {
            let middle = (text_ascent - text_descent) / 2.0;
            (middle + height / 2.0, height / 2.0 - middle)
        }
    }
}

/// Append `text_box`, merging it into the previous box when they touch.
fn push_merged(boxes: &mut Vec<TextBox>, text_box: TextBox) {
    if let Some(last) = boxes.last_mut() {
        let same_band = last.direction == text_box.direction
            && last.rect.top() == text_box.rect.top()
            && last.rect.bottom() == text_box.rect.bottom();
        let touches = (last.rect.right() - text_box.rect.left()).abs() < FIT_EPSILON
            || (text_box.rect.right() - last.rect.left()).abs() < FIT_EPSILON;
        if same_band && touches {
            last.rect = last.rect.union(&text_box.rect);
            return;
        }
    }
    boxes.push(text_box);
}

fn paint_decorations(canvas: &mut Canvas, record: &PaintRecord, position: Point) {
    let style = &record.style;
    if style.decoration.is_none() {
        return;
    }
    let paint = Paint::new(style.decoration_color.unwrap_or(style.color));
    let metrics = &record.metrics;
    let base_thickness = if metrics.underline_thickness > 0.0 {
        metrics.underline_thickness
    } else {
        style.font_size / 14.0
    };
    let thickness = base_thickness * style.decoration_thickness_multiplier;

    // (center y, direction the second line of a double decoration goes)
    let mut lines: Vec<(f32, f32)> = Vec::with_capacity(3);
    if style.decoration.underline {
        lines.push((position.y + metrics.underline_position, 1.0));
    }
    if style.decoration.overline {
        lines.push((position.y - metrics.ascent, -1.0));
    }
    if style.decoration.line_through {
        lines.push((position.y - metrics.strikeout_position, 1.0));
    }

    for (y, direction) in lines {
        let rect = Rect::new(position.x, y - thickness / 2.0, record.run_width, thickness);
        canvas.draw_rect(rect, &paint);
        if style.decoration_style == TextDecorationStyle::Double {
            canvas.draw_rect(rect.offset(0.0, direction * thickness * 2.0), &paint);
        }
    }
}
