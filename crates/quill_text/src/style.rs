//! Text and paragraph styles

use quill_core::Color;
use quill_paint::Paint;

/// Horizontal alignment of lines within the paragraph width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    Right,
    Center,
    /// Stretch every soft-wrapped line to the paragraph width
    Justify,
    /// Left for LTR paragraphs, right for RTL
    #[default]
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn is_rtl(self) -> bool {
        self == TextDirection::Rtl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum FontWeight {
    Thin,
    ExtraLight,
    Light,
    #[default]
    Normal,
    Medium,
    SemiBold,
    Bold,
    ExtraBold,
    Black,
}

impl FontWeight {
    /// CSS numeric weight
    pub fn to_number(self) -> u16 {
        match self {
            FontWeight::Thin => 100,
            FontWeight::ExtraLight => 200,
            FontWeight::Light => 300,
            FontWeight::Normal => 400,
            FontWeight::Medium => 500,
            FontWeight::SemiBold => 600,
            FontWeight::Bold => 700,
            FontWeight::ExtraBold => 800,
            FontWeight::Black => 900,
        }
    }

    /// Nearest named weight for a CSS numeric weight
    pub fn from_number(weight: u16) -> Self {
        match weight {
            0..=149 => FontWeight::Thin,
            150..=249 => FontWeight::ExtraLight,
            250..=349 => FontWeight::Light,
            350..=449 => FontWeight::Normal,
            450..=549 => FontWeight::Medium,
            550..=649 => FontWeight::SemiBold,
            650..=749 => FontWeight::Bold,
            750..=849 => FontWeight::ExtraBold,
            _ => FontWeight::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FontSlant {
    #[default]
    Upright,
    Italic,
}

/// Set of decoration lines drawn with a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct TextDecoration {
    pub underline: bool,
    pub overline: bool,
    pub line_through: bool,
}

impl TextDecoration {
    pub const NONE: TextDecoration = TextDecoration {
        underline: false,
        overline: false,
        line_through: false,
    };
    pub const UNDERLINE: TextDecoration = TextDecoration {
        underline: true,
        overline: false,
        line_through: false,
    };
    pub const OVERLINE: TextDecoration = TextDecoration {
        underline: false,
        overline: true,
        line_through: false,
    };
    pub const LINE_THROUGH: TextDecoration = TextDecoration {
        underline: false,
        overline: false,
        line_through: true,
    };

    pub fn is_none(&self) -> bool {
        !self.underline && !self.overline && !self.line_through
    }

    pub fn union(self, other: TextDecoration) -> TextDecoration {
        TextDecoration {
            underline: self.underline || other.underline,
            overline: self.overline || other.overline,
            line_through: self.line_through || other.line_through,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum TextDecorationStyle {
    #[default]
    Solid,
    Double,
}

/// Style of one run of text
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub color: Color,
    pub decoration: TextDecoration,
    /// `None` draws decorations in the text color
    pub decoration_color: Option<Color>,
    pub decoration_style: TextDecorationStyle,
    /// Scales the font's decoration thickness
    pub decoration_thickness_multiplier: f32,
    pub font_weight: FontWeight,
    pub font_slant: FontSlant,
    /// Tried in order; the collection's default is used when none match
    pub font_families: Vec<String>,
    pub font_size: f32,
    /// Added after every glyph
    pub letter_spacing: f32,
    /// Added after every space
    pub word_spacing: f32,
    /// Line height as a multiple of the font size
    pub height: f32,
    /// Use `height` instead of the font's own ascent and descent
    pub has_height_override: bool,
    pub locale: String,
    /// Replaces `color` when set
    pub foreground: Option<Paint>,
    pub background: Option<Paint>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Color::from_argb(0xFFFF_FFFF),
            decoration: TextDecoration::NONE,
            decoration_color: None,
            decoration_style: TextDecorationStyle::Solid,
            decoration_thickness_multiplier: 1.0,
            font_weight: FontWeight::Normal,
            font_slant: FontSlant::Upright,
            font_families: Vec::new(),
            font_size: 14.0,
            letter_spacing: 0.0,
            word_spacing: 0.0,
            height: 1.0,
            has_height_override: false,
            locale: String::new(),
            foreground: None,
            background: None,
        }
    }
}

impl TextStyle {
    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_families = vec![family.into()];
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self.has_height_override = true;
        self
    }

    pub fn with_letter_spacing(mut self, letter_spacing: f32) -> Self {
        self.letter_spacing = letter_spacing;
        self
    }

    pub fn with_word_spacing(mut self, word_spacing: f32) -> Self {
        self.word_spacing = word_spacing;
        self
    }

    pub fn with_decoration(mut self, decoration: TextDecoration) -> Self {
        self.decoration = decoration;
        self
    }

    /// Whether glyphs shaped with `self` and `other` are interchangeable
    pub fn shapes_like(&self, other: &TextStyle) -> bool {
        self.font_families == other.font_families
            && self.font_size == other.font_size
            && self.font_weight == other.font_weight
            && self.font_slant == other.font_slant
            && self.letter_spacing == other.letter_spacing
            && self.word_spacing == other.word_spacing
            && self.height == other.height
            && self.has_height_override == other.has_height_override
    }
}

/// Paragraph-wide layout settings
#[derive(Debug, Clone)]
pub struct ParagraphStyle {
    pub text_align: TextAlign,
    pub text_direction: TextDirection,
    /// `None` for no limit
    pub max_lines: Option<usize>,
    /// Appended to the last visible line when text is cut off
    pub ellipsis: String,
    /// Used for empty paragraphs and empty lines
    pub font_size: f32,
    pub font_families: Vec<String>,
    pub font_weight: FontWeight,
    pub font_slant: FontSlant,
    /// Line height multiplier for empty lines
    pub height: f32,
    pub strut_enabled: bool,
    pub strut_font_families: Vec<String>,
    pub strut_font_size: f32,
    /// Multiple of the strut font size; `None` uses font metrics
    pub strut_height: Option<f32>,
    /// Extra leading as a multiple of the strut font size
    pub strut_leading: Option<f32>,
    /// Strut metrics replace line metrics instead of setting a minimum
    pub force_strut_height: bool,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        Self {
            text_align: TextAlign::Start,
            text_direction: TextDirection::Ltr,
            max_lines: None,
            ellipsis: String::new(),
            font_size: 14.0,
            font_families: Vec::new(),
            font_weight: FontWeight::Normal,
            font_slant: FontSlant::Upright,
            height: 1.0,
            strut_enabled: false,
            strut_font_families: Vec::new(),
            strut_font_size: 14.0,
            strut_height: None,
            strut_leading: None,
            force_strut_height: false,
        }
    }
}

impl ParagraphStyle {
    pub fn ellipsized(&self) -> bool {
        !self.ellipsis.is_empty()
    }

    pub fn unlimited_lines(&self) -> bool {
        self.max_lines.is_none()
    }

    /// Alignment with start/end resolved against the text direction
    pub fn effective_align(&self) -> TextAlign {
        match (self.text_align, self.text_direction) {
            (TextAlign::Start, TextDirection::Ltr) | (TextAlign::End, TextDirection::Rtl) => TextAlign::Left,
            (TextAlign::Start, TextDirection::Rtl) | (TextAlign::End, TextDirection::Ltr) => TextAlign::Right,
            (align, _) => align,
        }
    }

    /// Style used where the text has no run of its own
    pub fn default_text_style(&self) -> TextStyle {
        TextStyle {
            font_families: self.font_families.clone(),
            font_size: self.font_size,
            font_weight: self.font_weight,
            font_slant: self.font_slant,
            height: self.height,
            has_height_override: self.height != 1.0,
            ..TextStyle::default()
        }
    }

    pub(crate) fn strut_style(&self) -> TextStyle {
        TextStyle {
            font_families: if self.strut_font_families.is_empty() {
                self.font_families.clone()
            } else {
                self.strut_font_families.clone()
            },
            font_size: self.strut_font_size,
            font_weight: self.font_weight,
            font_slant: self.font_slant,
            height: self.strut_height.unwrap_or(1.0),
            has_height_override: self.strut_height.is_some(),
            ..TextStyle::default()
        }
    }
}

/// Vertical placement of an inline placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderAlignment {
    /// `baseline_offset` from the top sits on the text baseline
    #[default]
    Baseline,
    /// Bottom edge on the baseline
    AboveBaseline,
    /// Top edge on the baseline
    BelowBaseline,
    /// Top edge on the line's text ascent
    Top,
    /// Bottom edge on the line's text descent
    Bottom,
    /// Centered on the middle of the line's text
    Middle,
}

/// Space reserved inline for a non-text object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceholderRun {
    pub width: f32,
    pub height: f32,
    pub alignment: PlaceholderAlignment,
    /// Distance from the top of the placeholder to its baseline
    pub baseline_offset: f32,
}

impl PlaceholderRun {
    pub fn new(width: f32, height: f32, alignment: PlaceholderAlignment) -> Self {
        Self {
            width,
            height,
            alignment,
            baseline_offset: height,
        }
    }

    pub fn with_baseline_offset(mut self, baseline_offset: f32) -> Self {
        self.baseline_offset = baseline_offset;
        self
    }
}
