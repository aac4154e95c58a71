//! Paragraph layout for Quill
//!
//! This crate provides:
//! - Text and paragraph styles, and style runs over UTF-16 text
//! - Typefaces (TTF/OTF via ttf-parser, shaping via rustybuzz)
//! - Line breaking, bidi reordering and grapheme segmentation oracles
//! - [`Paragraph`] layout: line metrics, justification, ellipsis, struts
//!   and inline placeholders, plus hit testing and selection queries
//! - Painting laid-out text into a [`quill_paint::Canvas`]
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use quill_text::{FixedAdvanceTypeface, ParagraphBuilder, ParagraphStyle, TypefaceCollection};
//!
//! let fonts = TypefaceCollection::new().with_typeface(Arc::new(FixedAdvanceTypeface::new("Ahem")));
//! let mut builder = ParagraphBuilder::new(ParagraphStyle::default(), Arc::new(fonts));
//! builder.add_text("Hello world");
//! let mut paragraph = builder.build();
//! paragraph.layout(100.0);
//! assert_eq!(paragraph.get_line_count(), 2);
//! ```

pub mod builder;
pub mod fixed_advance;
pub mod font;
pub mod open_typeface;
pub mod oracles;
pub mod paint_record;
pub mod paragraph;
pub mod style;
pub mod styled_runs;

mod line_breaker;
mod utf16;

pub use builder::ParagraphBuilder;
pub use fixed_advance::FixedAdvanceTypeface;
pub use font::{FontCollection, FontMetrics, ShapedGlyph, Typeface, TypefaceCollection};
pub use open_typeface::OpenTypeface;
pub use oracles::{
    BidiResolver, BidiRun, BreakOpportunity, GraphemeBreaker, LineBreaker, UnicodeBidiResolver,
    UnicodeGraphemeBreaker, UnicodeLineBreaker,
};
pub use paint_record::PaintRecord;
pub use paragraph::{
    Affinity, CodeUnitRun, GlyphPosition, LineMetrics, Paragraph, PositionWithAffinity,
    RectHeightStyle, RectWidthStyle, TextBox,
};
pub use style::{
    FontSlant, FontWeight, ParagraphStyle, PlaceholderAlignment, PlaceholderRun, TextAlign,
    TextDecoration, TextDecorationStyle, TextDirection, TextStyle,
};
pub use styled_runs::{Run, StyledRuns};

use thiserror::Error;

/// Text layout errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Font collection has no typeface for families {0:?}")]
    NoTypeface(Vec<String>),

    #[error("Invalid font data")]
    InvalidFontData,
}

pub type Result<T> = std::result::Result<T, TextError>;
