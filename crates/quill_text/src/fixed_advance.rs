use quill_core::{Path, PathBuilder, Point, Rect};

use crate::font::{FontMetrics, ShapedGlyph, Typeface};
use crate::style::{FontSlant, FontWeight};

/// A synthetic typeface where every visible glyph is a filled em square
///
/// Ascent is 0.8em and descent 0.2em, so a run of `n` characters at size
/// `s` is exactly `n * s` wide and `s` tall.
#[derive(Debug, Clone)]
pub struct FixedAdvanceTypeface {
    family: String,
    weight: FontWeight,
    slant: FontSlant,
    missing: Vec<char>,
}

impl FixedAdvanceTypeface {
    pub const ASCENT: f32 = 0.8;
    pub const DESCENT: f32 = 0.2;

    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            weight: FontWeight::Normal,
            slant: FontSlant::Upright,
            missing: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_slant(mut self, slant: FontSlant) -> Self {
        self.slant = slant;
        self
    }

    /// Report no glyph for these characters.
    pub fn without_glyphs(mut self, chars: &[char]) -> Self {
        self.missing.extend_from_slice(chars);
        self
    }

    fn advance(ch: char, font_size: f32) -> f32 {
        if ch.is_control() {
            0.0
        } else {
            font_size
        }
    }
}

impl Typeface for FixedAdvanceTypeface {
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
        FontMetrics {
            ascent: font_size * Self::ASCENT,
            descent: font_size * Self::DESCENT,
            leading: 0.0,
            underline_position: font_size * 0.1,
            underline_thickness: font_size * 0.05,
            strikeout_position: font_size * 0.3,
            strikeout_thickness: font_size * 0.05,
        }
    }

    fn has_glyph(&self, ch: char) -> bool {
        !self.missing.contains(&ch)
    }

    fn shape(&self, text: &str, font_size: f32, rtl: bool) -> Vec<ShapedGlyph> {
        let mut glyphs: Vec<ShapedGlyph> = text
            .char_indices()
            .map(|(cluster, ch)| ShapedGlyph {
                glyph_id: if self.has_glyph(ch) { u16::try_from(u32::from(ch)).unwrap_or(0) } else { 0 },
                cluster,
                advance: Self::advance(ch, font_size),
                offset: Point::ZERO,
            })
            .collect();
        if rtl {
            glyphs.reverse();
        }
        glyphs
    }

    fn glyph_outline(&self, glyph_id: u16, font_size: f32) -> Option<Path> {
        let bounds = self.glyph_bounds(glyph_id, font_size)?;
        Some(PathBuilder::new().add_rect(bounds).take_path())
    }

    fn glyph_bounds(&self, glyph_id: u16, font_size: f32) -> Option<Rect> {
        let ch = char::from_u32(u32::from(glyph_id))?;
        if glyph_id == 0 || ch.is_whitespace() || ch.is_control() {
            return None;
        }
        Some(Rect::new(
            0.0,
            -font_size * Self::ASCENT,
            font_size,
            font_size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_is_one_em_per_char() {
        let typeface = FixedAdvanceTypeface::new("Ahem");
        let glyphs = typeface.shape("ab c", 10.0, false);
        assert_eq!(glyphs.len(), 4);
        assert!(glyphs.iter().all(|glyph| glyph.advance == 10.0));
        assert_eq!(glyphs[3].cluster, 3);
    }

    #[test]
    fn test_rtl_shaping_is_visual_order() {
        let typeface = FixedAdvanceTypeface::new("Ahem");
        let clusters: Vec<usize> = typeface
            .shape("abc", 10.0, true)
            .iter()
            .map(|glyph| glyph.cluster)
            .collect();
        assert_eq!(clusters, vec![2, 1, 0]);
    }

    #[test]
    fn test_spaces_have_no_outline() {
        let typeface = FixedAdvanceTypeface::new("Ahem");
        assert!(typeface.glyph_outline(u16::from(b' '), 10.0).is_none());
        assert_eq!(
            typeface.glyph_bounds(u16::from(b'x'), 10.0),
            Some(Rect::new(0.0, -8.0, 10.0, 10.0))
        );
    }
}
