//! Typefaces and font collections
//!
//! Layout only needs metrics, shaping and outlines from a font, so fonts are
//! consumed through the [`Typeface`] trait. [`OpenTypeface`] implements it
//! over TrueType/OpenType data and [`FixedAdvanceTypeface`] gives every glyph
//! an em-square advance, which keeps layout results exact in tests.
//!
//! [`OpenTypeface`]: crate::OpenTypeface
//! [`FixedAdvanceTypeface`]: crate::FixedAdvanceTypeface

use std::fmt;
use std::sync::Arc;

use quill_core::{Path, Point, Rect};

use crate::style::{FontSlant, FontWeight, TextStyle};
use crate::{Result, TextError};

/// Vertical font metrics in pixels at a given size
///
/// `ascent` and `descent` are both positive distances from the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub leading: f32,
    /// Distance below the baseline
    pub underline_position: f32,
    pub underline_thickness: f32,
    /// Distance above the baseline
    pub strikeout_position: f32,
    pub strikeout_thickness: f32,
}

impl FontMetrics {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// One glyph out of the shaper, in visual order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    pub glyph_id: u16,
    /// Byte offset of the first character this glyph represents
    pub cluster: usize,
    pub advance: f32,
    /// Offset from the pen position
    pub offset: Point,
}

/// A font face at any size
pub trait Typeface: Send + Sync {
    fn family_name(&self) -> &str;

    fn weight(&self) -> FontWeight {
        FontWeight::Normal
    }

    fn slant(&self) -> FontSlant {
        FontSlant::Upright
    }

    fn metrics(&self, font_size: f32) -> FontMetrics;

    fn has_glyph(&self, ch: char) -> bool;

    /// Shape `text` as a single run. Glyphs come back in visual order.
    fn shape(&self, text: &str, font_size: f32, rtl: bool) -> Vec<ShapedGlyph>;

    /// Outline in pixels relative to the glyph origin, y down
    fn glyph_outline(&self, glyph_id: u16, font_size: f32) -> Option<Path>;

    /// Ink bounds in pixels relative to the glyph origin, y down
    fn glyph_bounds(&self, glyph_id: u16, font_size: f32) -> Option<Rect>;

    fn has_color_glyphs(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeface")
            .field("family", &self.family_name())
            .field("weight", &self.weight())
            .field("slant", &self.slant())
            .finish()
    }
}

/// Resolves text styles to typefaces
pub trait FontCollection: Send + Sync {
    /// Typeface for the style's families, falling back to a default.
    fn match_style(&self, style: &TextStyle) -> Result<Arc<dyn Typeface>>;

    /// Typeface able to draw `ch` when the matched one cannot.
    fn fallback_for(&self, ch: char, style: &TextStyle) -> Option<Arc<dyn Typeface>> {
        let _ = (ch, style);
        None
    }
}

/// An in-memory collection of typefaces. The first one added is the default.
#[derive(Clone)]
pub struct TypefaceCollection {
    typefaces: Vec<Arc<dyn Typeface>>,
    enable_fallback: bool,
}

impl Default for TypefaceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl TypefaceCollection {
    pub fn new() -> Self {
        Self {
            typefaces: Vec::new(),
            enable_fallback: true,
        }
    }

    pub fn with_typeface(mut self, typeface: Arc<dyn Typeface>) -> Self {
        self.add_typeface(typeface);
        self
    }

    pub fn add_typeface(&mut self, typeface: Arc<dyn Typeface>) {
        self.typefaces.push(typeface);
    }

    pub fn set_fallback_enabled(&mut self, enabled: bool) {
        self.enable_fallback = enabled;
    }

    pub fn len(&self) -> usize {
        self.typefaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.typefaces.is_empty()
    }

    fn score(typeface: &dyn Typeface, style: &TextStyle) -> u32 {
        let weight_distance = (i32::from(typeface.weight().to_number())
            - i32::from(style.font_weight.to_number()))
        .unsigned_abs();
        let slant_penalty = if typeface.slant() == style.font_slant { 0 } else { 1000 };
        weight_distance + slant_penalty
    }
}

impl FontCollection for TypefaceCollection {
    fn match_style(&self, style: &TextStyle) -> Result<Arc<dyn Typeface>> {
        for family in &style.font_families {
            let best = self
                .typefaces
                .iter()
                .filter(|typeface| typeface.family_name().eq_ignore_ascii_case(family))
                .min_by_key(|typeface| Self::score(typeface.as_ref(), style));
            if let Some(typeface) = best {
                return Ok(typeface.clone());
            }
        }
        self.typefaces
            .first()
            .cloned()
            .ok_or_else(|| TextError::NoTypeface(style.font_families.clone()))
    }

    fn fallback_for(&self, ch: char, _style: &TextStyle) -> Option<Arc<dyn Typeface>> {
        if !self.enable_fallback {
            return None;
        }
        self.typefaces.iter().find(|typeface| typeface.has_glyph(ch)).cloned()
    }
}

impl fmt::Debug for TypefaceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypefaceCollection")
            .field("typefaces", &self.typefaces)
            .field("enable_fallback", &self.enable_fallback)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedAdvanceTypeface;

    #[test]
    fn test_family_match_falls_back_to_default() {
        let collection = TypefaceCollection::new()
            .with_typeface(Arc::new(FixedAdvanceTypeface::new("Ahem")))
            .with_typeface(Arc::new(FixedAdvanceTypeface::new("Square")));

        let style = TextStyle::default().with_font_family("square");
        assert_eq!(collection.match_style(&style).unwrap().family_name(), "Square");

        let style = TextStyle::default().with_font_family("Missing");
        assert_eq!(collection.match_style(&style).unwrap().family_name(), "Ahem");
    }

    #[test]
    fn test_empty_collection_has_no_match() {
        let collection = TypefaceCollection::new();
        assert!(matches!(
            collection.match_style(&TextStyle::default()),
            Err(TextError::NoTypeface(_))
        ));
    }

    #[test]
    fn test_weight_picks_closest_face() {
        let collection = TypefaceCollection::new()
            .with_typeface(Arc::new(FixedAdvanceTypeface::new("Ahem")))
            .with_typeface(Arc::new(
                FixedAdvanceTypeface::new("Ahem").with_weight(FontWeight::Bold),
            ));
        let mut style = TextStyle::default().with_font_family("Ahem");
        style.font_weight = FontWeight::ExtraBold;
        assert_eq!(
            collection.match_style(&style).unwrap().weight(),
            FontWeight::Bold
        );
    }
}
