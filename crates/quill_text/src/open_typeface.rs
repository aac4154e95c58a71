//! TrueType/OpenType typefaces
//!
//! Font data is parsed with ttf-parser for metrics and outlines and shaped
//! with rustybuzz. The raw bytes are shared, so cloning is cheap.

use std::sync::Arc;

use quill_core::{Path, PathBuilder, Point, Rect};
use tracing::debug;

use crate::font::{FontMetrics, ShapedGlyph, Typeface};
use crate::style::{FontSlant, FontWeight};
use crate::{Result, TextError};

#[derive(Clone)]
pub struct OpenTypeface {
    data: Arc<Vec<u8>>,
    index: u32,
    family: String,
    weight: FontWeight,
    slant: FontSlant,
    units_per_em: f32,
    has_color_glyphs: bool,
}

impl OpenTypeface {
    /// Parse face `index` of a font file or collection.
    pub fn from_data(data: Vec<u8>, index: u32) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, index)
            .map_err(|e| TextError::FontParseError(e.to_string()))?;

        let family = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode())
            .find_map(|name| name.to_string())
            .unwrap_or_default();
        let weight = FontWeight::from_number(face.weight().to_number());
        let slant = if face.is_italic() || face.is_oblique() {
            FontSlant::Italic
        } else {
            FontSlant::Upright
        };
        let units_per_em = f32::from(face.units_per_em());
        if units_per_em <= 0.0 {
            return Err(TextError::InvalidFontData);
        }
        let tables = face.tables();
        let has_color_glyphs = tables.colr.is_some() || tables.sbix.is_some() || tables.cbdt.is_some();

        debug!(family = %family, weight = ?weight, glyphs = face.number_of_glyphs(), "Parsed typeface");

        Ok(Self {
            data: Arc::new(data),
            index,
            family,
            weight,
            slant,
            units_per_em,
            has_color_glyphs,
        })
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.index).ok()
    }

    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em
    }
}

impl std::fmt::Debug for OpenTypeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenTypeface")
            .field("family", &self.family)
            .field("index", &self.index)
            .field("weight", &self.weight)
            .field("slant", &self.slant)
            .finish()
    }
}

impl Typeface for OpenTypeface {
    fn family_name(&self) -> &str {
        &self.family
    }

    fn weight(&self) -> FontWeight {
        self.weight
    }

    fn slant(&self) -> FontSlant {
        self.slant
    }

    fn metrics(&self, font_size: f32) -> FontMetrics {
        let Some(face) = self.face() else {
            return FontMetrics::default();
        };
        let scale = self.scale(font_size);
        let underline = face.underline_metrics();
        let strikeout = face.strikeout_metrics();
        FontMetrics {
            ascent: f32::from(face.ascender()) * scale,
            descent: -f32::from(face.descender()) * scale,
            leading: f32::from(face.line_gap()) * scale,
            underline_position: underline.map_or(font_size * 0.1, |m| -f32::from(m.position) * scale),
            underline_thickness: underline.map_or(font_size / 14.0, |m| f32::from(m.thickness) * scale),
            strikeout_position: strikeout.map_or(font_size * 0.3, |m| f32::from(m.position) * scale),
            strikeout_thickness: strikeout.map_or(font_size / 14.0, |m| f32::from(m.thickness) * scale),
        }
    }

    fn has_glyph(&self, ch: char) -> bool {
        self.face()
            .and_then(|face| face.glyph_index(ch))
            .is_some_and(|id| id.0 != 0)
    }

    fn shape(&self, text: &str, font_size: f32, rtl: bool) -> Vec<ShapedGlyph> {
        let Some(face) = rustybuzz::Face::from_slice(&self.data, self.index) else {
            return Vec::new();
        };
        let mut buffer = rustybuzz::UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        buffer.set_direction(if rtl {
            rustybuzz::Direction::RightToLeft
        } else {
            rustybuzz::Direction::LeftToRight
        });

        let output = rustybuzz::shape(&face, &[], buffer);
        let scale = self.scale(font_size);
        output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .map(|(info, position)| ShapedGlyph {
                glyph_id: u16::try_from(info.glyph_id).unwrap_or(0),
                cluster: info.cluster as usize,
                advance: position.x_advance as f32 * scale,
                offset: Point::new(position.x_offset as f32 * scale, -position.y_offset as f32 * scale),
            })
            .collect()
    }

    fn glyph_outline(&self, glyph_id: u16, font_size: f32) -> Option<Path> {
        let face = self.face()?;
        let mut sink = OutlineSink {
            builder: Some(PathBuilder::new()),
            scale: self.scale(font_size),
        };
        face.outline_glyph(ttf_parser::GlyphId(glyph_id), &mut sink)?;
        sink.builder.map(PathBuilder::take_path)
    }

    fn glyph_bounds(&self, glyph_id: u16, font_size: f32) -> Option<Rect> {
        let face = self.face()?;
        let bbox = face.glyph_bounding_box(ttf_parser::GlyphId(glyph_id))?;
        let scale = self.scale(font_size);
        // Font units are y up
        Some(Rect::from_ltrb(
            f32::from(bbox.x_min) * scale,
            -f32::from(bbox.y_max) * scale,
            f32::from(bbox.x_max) * scale,
            -f32::from(bbox.y_min) * scale,
        ))
    }

    fn has_color_glyphs(&self) -> bool {
        self.has_color_glyphs
    }
}

/// Feeds ttf-parser outline callbacks into a [`PathBuilder`], flipping y.
struct OutlineSink {
    builder: Option<PathBuilder>,
    scale: f32,
}

impl OutlineSink {
    fn point(&self, x: f32, y: f32) -> Point {
        Point::new(x * self.scale, -y * self.scale)
    }

    fn apply(&mut self, step: impl FnOnce(PathBuilder) -> PathBuilder) {
        self.builder = self.builder.take().map(step);
    }
}

impl ttf_parser::OutlineBuilder for OutlineSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let point = self.point(x, y);
        self.apply(|builder| builder.move_to(point));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let point = self.point(x, y);
        self.apply(|builder| builder.line_to(point));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (control, point) = (self.point(x1, y1), self.point(x, y));
        self.apply(|builder| builder.quadratic_curve_to(control, point));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1, c2, point) = (self.point(x1, y1), self.point(x2, y2), self.point(x, y));
        self.apply(|builder| builder.cubic_curve_to(c1, c2, point));
    }

    fn close(&mut self) {
        self.apply(PathBuilder::close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            OpenTypeface::from_data(vec![0, 1, 2, 3], 0),
            Err(TextError::FontParseError(_))
        ));
    }
}
