//! Unicode oracles used by paragraph layout
//!
//! Layout asks three questions it does not answer itself: where lines may
//! break, which direction each stretch of text runs, and where grapheme
//! clusters begin. Each is a trait so embedders can substitute their own
//! implementation; the defaults are backed by `unicode-linebreak`,
//! `unicode-bidi` and `unicode-segmentation`. All offsets are UTF-16 code
//! units.

use unicode_bidi::{BidiInfo, Level};
use unicode_segmentation::UnicodeSegmentation;

use crate::style::TextDirection;
use crate::utf16::Utf16Text;

/// A position where a new line may start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakOpportunity {
    pub offset: usize,
    /// The line must break here
    pub mandatory: bool,
}

pub trait LineBreaker: Send + Sync {
    /// Break opportunities in ascending order. The end of the text is
    /// always reported as a mandatory break.
    fn break_opportunities(&self, text: &[u16]) -> Vec<BreakOpportunity>;
}

/// A maximal run of one embedding level, in logical order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidiRun {
    pub start: usize,
    pub end: usize,
    pub level: u8,
}

impl BidiRun {
    pub fn direction(&self) -> TextDirection {
        if self.level % 2 == 1 {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

pub trait BidiResolver: Send + Sync {
    /// Level runs covering the whole text, in logical order
    fn resolve(&self, text: &[u16], base_direction: TextDirection) -> Vec<BidiRun>;
}

pub trait GraphemeBreaker: Send + Sync {
    /// Offsets where grapheme clusters start, followed by the text length
    fn grapheme_boundaries(&self, text: &[u16]) -> Vec<usize>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Unicode-backed defaults
// ─────────────────────────────────────────────────────────────────────────────

/// UAX #14 line breaking
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeLineBreaker;

impl LineBreaker for UnicodeLineBreaker {
    fn break_opportunities(&self, text: &[u16]) -> Vec<BreakOpportunity> {
        let decoded = Utf16Text::new(text);
        let mut breaks: Vec<BreakOpportunity> = unicode_linebreak::linebreaks(decoded.as_str())
            .map(|(byte, opportunity)| BreakOpportunity {
                offset: decoded.unit_at(byte),
                mandatory: opportunity == unicode_linebreak::BreakOpportunity::Mandatory,
            })
            .collect();
        match breaks.last_mut() {
            Some(last) if last.offset == text.len() => last.mandatory = true,
            _ => breaks.push(BreakOpportunity {
                offset: text.len(),
                mandatory: true,
            }),
        }
        breaks
    }
}

/// UAX #9 bidi resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeBidiResolver;

impl BidiResolver for UnicodeBidiResolver {
    fn resolve(&self, text: &[u16], base_direction: TextDirection) -> Vec<BidiRun> {
        if text.is_empty() {
            return Vec::new();
        }
        let decoded = Utf16Text::new(text);
        let base_level = if base_direction.is_rtl() {
            Level::rtl()
        } else {
            Level::ltr()
        };
        let info = BidiInfo::new(decoded.as_str(), Some(base_level));

        let mut runs: Vec<BidiRun> = Vec::new();
        for (byte, _) in decoded.as_str().char_indices() {
            let level = info.levels.get(byte).map_or(base_level.number(), |level| level.number());
            let unit = decoded.unit_at(byte);
            match runs.last_mut() {
                Some(run) if run.level == level => {}
                Some(run) => {
                    run.end = unit;
                    runs.push(BidiRun {
                        start: unit,
                        end: unit,
                        level,
                    });
                }
                None => runs.push(BidiRun {
                    start: unit,
                    end: unit,
                    level,
                }),
            }
        }
        if let Some(last) = runs.last_mut() {
            last.end = text.len();
        }
        runs
    }
}

/// Extended grapheme clusters per UAX #29
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeGraphemeBreaker;

impl GraphemeBreaker for UnicodeGraphemeBreaker {
    fn grapheme_boundaries(&self, text: &[u16]) -> Vec<usize> {
        let decoded = Utf16Text::new(text);
        let mut boundaries: Vec<usize> = decoded
            .as_str()
            .grapheme_indices(true)
            .map(|(byte, _)| decoded.unit_at(byte))
            .collect();
        boundaries.push(text.len());
        boundaries
    }
}
