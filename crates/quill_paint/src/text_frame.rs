//! Positioned glyphs ready to be drawn

use std::sync::Arc;

use quill_core::{Path, Point, Rect};

/// One glyph placed relative to the frame origin
#[derive(Clone, Debug)]
pub struct GlyphPosition {
    pub glyph_id: u16,
    /// Baseline origin of the glyph
    pub position: Point,
    /// Ink bounds relative to `position`
    pub bounds: Rect,
    /// Outline relative to `position`; glyphs without one draw their bounds
    pub outline: Option<Arc<Path>>,
}

impl GlyphPosition {
    pub fn device_bounds(&self) -> Rect {
        self.bounds.offset(self.position.x, self.position.y)
    }
}

/// Glyphs sharing one font and size
#[derive(Clone, Debug, Default)]
pub struct TextRun {
    pub font_size: f32,
    /// Color glyphs keep their own colors unless the text color is forced
    pub has_color_glyphs: bool,
    pub glyphs: Vec<GlyphPosition>,
}

#[derive(Clone, Debug, Default)]
pub struct TextFrame {
    runs: Vec<TextRun>,
}

impl TextFrame {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self { runs }
    }

    pub fn add_run(&mut self, run: TextRun) {
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    pub fn glyph_count(&self) -> usize {
        self.runs.iter().map(|run| run.glyphs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.glyph_count() == 0
    }

    /// Union of glyph ink bounds
    pub fn bounds(&self) -> Option<Rect> {
        self.runs
            .iter()
            .flat_map(|run| run.glyphs.iter())
            .map(GlyphPosition::device_bounds)
            .filter(|bounds| !bounds.is_empty())
            .reduce(|a, b| a.union(&b))
    }
}
