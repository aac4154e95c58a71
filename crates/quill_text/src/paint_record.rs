//! Shaped runs ready to be painted

use quill_core::{Point, Rect};
use quill_paint::TextFrame;

use crate::font::FontMetrics;
use crate::style::TextStyle;

/// One shaped run of a laid-out line
#[derive(Debug, Clone)]
pub struct PaintRecord {
    pub style: TextStyle,
    /// Left edge of the run on its baseline, in paragraph coordinates
    pub offset: Point,
    /// Glyph positions are relative to `offset`
    pub text_frame: TextFrame,
    pub metrics: FontMetrics,
    pub line_number: usize,
    pub run_width: f32,
}

impl PaintRecord {
    pub fn x_start(&self) -> f32 {
        self.offset.x
    }

    pub fn x_end(&self) -> f32 {
        self.offset.x + self.run_width
    }

    /// Box spanning the font's ascent and descent under the run
    pub fn background_rect(&self) -> Rect {
        Rect::from_ltrb(
            self.x_start(),
            self.offset.y - self.metrics.ascent,
            self.x_end(),
            self.offset.y + self.metrics.descent,
        )
    }
}
