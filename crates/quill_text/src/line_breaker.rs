//! Greedy line fitting over measured code units

use crate::oracles::BreakOpportunity;
use crate::utf16::{is_newline, is_whitespace};

/// Slack for accumulated float error when checking whether a line fits
const FIT_EPSILON: f32 = 1e-3;

/// Code unit range of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineRange {
    pub start: usize,
    pub end: usize,
    pub end_excluding_whitespace: usize,
    pub end_including_newline: usize,
    /// Ended by a mandatory break or the end of the text
    pub hard_break: bool,
}

/// Measured text ready for breaking
pub(crate) struct MeasuredText<'a> {
    pub text: &'a [u16],
    /// `prefix[i]` is the advance of units `0..i`
    pub prefix: Vec<f32>,
    pub breaks: &'a [BreakOpportunity],
    pub graphemes: &'a [usize],
}

#[derive(Debug, Default)]
pub(crate) struct BrokenLines {
    pub lines: Vec<LineRange>,
    pub max_intrinsic_width: f32,
    pub min_intrinsic_width: f32,
}

impl<'a> MeasuredText<'a> {
    pub(crate) fn new(
        text: &'a [u16],
        advances: &[f32],
        breaks: &'a [BreakOpportunity],
        graphemes: &'a [usize],
    ) -> Self {
        let mut prefix = Vec::with_capacity(advances.len() + 1);
        prefix.push(0.0);
        let mut sum = 0.0;
        for advance in advances {
            sum += advance;
            prefix.push(sum);
        }
        Self {
            text,
            prefix,
            breaks,
            graphemes,
        }
    }

    pub(crate) fn width(&self, start: usize, end: usize) -> f32 {
        if end <= start {
            return 0.0;
        }
        self.prefix[end] - self.prefix[start]
    }

    pub(crate) fn trim_trailing_whitespace(&self, start: usize, mut end: usize) -> usize {
        while end > start && is_whitespace(self.text[end - 1]) {
            end -= 1;
        }
        end
    }

    fn trim_trailing_newlines(&self, start: usize, mut end: usize) -> usize {
        while end > start && is_newline(self.text[end - 1]) {
            end -= 1;
        }
        end
    }

    /// Last grapheme boundary strictly before `offset` and after `floor`
    pub(crate) fn previous_grapheme(&self, floor: usize, offset: usize) -> usize {
        self.graphemes
            .iter()
            .rev()
            .copied()
            .find(|&boundary| boundary < offset && boundary >= floor)
            .unwrap_or(floor)
    }

    /// Split the text into lines no wider than `width` where possible.
    pub(crate) fn break_lines(&self, width: f32) -> BrokenLines {
        let mut result = BrokenLines::default();
        let mut block_start = 0;

        for mandatory in self.breaks.iter().filter(|opportunity| opportunity.mandatory) {
            let block_end_with_newline = mandatory.offset;
            let repeated = block_end_with_newline == block_start && !result.lines.is_empty();
            if block_end_with_newline < block_start || repeated {
                continue;
            }
            let block_end = self.trim_trailing_newlines(block_start, block_end_with_newline);
            let soft_breaks: Vec<usize> = self
                .breaks
                .iter()
                .filter(|opportunity| {
                    !opportunity.mandatory
                        && opportunity.offset > block_start
                        && opportunity.offset < block_end
                })
                .map(|opportunity| opportunity.offset)
                .collect();

            self.measure_intrinsic(block_start, block_end, &soft_breaks, &mut result);
            self.break_block(block_start, block_end, &soft_breaks, width, &mut result.lines);
            if let Some(last) = result.lines.last_mut() {
                last.end_including_newline = block_end_with_newline;
                last.hard_break = true;
            }
            block_start = block_end_with_newline;
        }

        // Text ending in a newline gets an empty final line
        let ends_with_newline = self.text.last().is_some_and(|unit| is_newline(*unit));
        if ends_with_newline || result.lines.is_empty() {
            let end = self.text.len();
            result.lines.push(LineRange {
                start: end,
                end,
                end_excluding_whitespace: end,
                end_including_newline: end,
                hard_break: true,
            });
        }
        result
    }

    fn measure_intrinsic(&self, start: usize, end: usize, soft_breaks: &[usize], result: &mut BrokenLines) {
        let block_width = self.width(start, self.trim_trailing_whitespace(start, end));
        result.max_intrinsic_width = result.max_intrinsic_width.max(block_width);

        let mut word_start = start;
        for &word_end in soft_breaks.iter().chain(std::iter::once(&end)) {
            let trimmed = self.trim_trailing_whitespace(word_start, word_end);
            result.min_intrinsic_width = result.min_intrinsic_width.max(self.width(word_start, trimmed));
            word_start = word_end;
        }
    }

    fn break_block(&self, block_start: usize, block_end: usize, soft_breaks: &[usize], width: f32, lines: &mut Vec<LineRange>) {
        let mut line_start = block_start;
        let mut candidates = soft_breaks.iter().copied().chain(std::iter::once(block_end)).peekable();
        let mut last_fit: Option<usize> = None;

        if block_start == block_end {
            lines.push(self.line(block_start, block_end));
            return;
        }

        while line_start < block_end {
            let Some(&candidate) = candidates.peek() else {
                break;
            };
            let visible_end = self.trim_trailing_whitespace(line_start, candidate);
            if self.width(line_start, visible_end) <= width + FIT_EPSILON {
                last_fit = Some(candidate);
                candidates.next();
                if candidate == block_end {
                    lines.push(self.line(line_start, block_end));
                    line_start = block_end;
                }
                continue;
            }

            match last_fit.take() {
                Some(fit) if fit > line_start => {
                    lines.push(self.line(line_start, fit));
                    line_start = fit;
                }
                _ => {
                    // A single word wider than the line breaks between graphemes
                    let split = self.desperate_break(line_start, candidate, width);
                    lines.push(self.line(line_start, split));
                    line_start = split;
                    if split == candidate {
                        candidates.next();
                    }
                }
            }
        }
    }

    /// Furthest grapheme boundary that fits, taking at least one grapheme.
    fn desperate_break(&self, start: usize, end: usize, width: f32) -> usize {
        let mut split = start;
        for &boundary in self.graphemes.iter().filter(|&&boundary| boundary > start && boundary <= end) {
            let visible_end = self.trim_trailing_whitespace(start, boundary);
            if split > start && self.width(start, visible_end) > width + FIT_EPSILON {
                break;
            }
            split = boundary;
        }
        if split == start {
            end
        } else {
            split
        }
    }

    fn line(&self, start: usize, end: usize) -> LineRange {
        LineRange {
            start,
            end,
            end_excluding_whitespace: self.trim_trailing_whitespace(start, end),
            end_including_newline: end,
            hard_break: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracles::{GraphemeBreaker, LineBreaker, UnicodeGraphemeBreaker, UnicodeLineBreaker};

    fn break_text(text: &str, width: f32) -> BrokenLines {
        let units: Vec<u16> = text.encode_utf16().collect();
        let advances: Vec<f32> = units
            .iter()
            .map(|unit| if is_newline(*unit) { 0.0 } else { 10.0 })
            .collect();
        let breaks = UnicodeLineBreaker.break_opportunities(&units);
        let graphemes = UnicodeGraphemeBreaker.grapheme_boundaries(&units);
        MeasuredText::new(&units, &advances, &breaks, &graphemes).break_lines(width)
    }

    fn ranges(lines: &BrokenLines) -> Vec<(usize, usize)> {
        lines.lines.iter().map(|line| (line.start, line.end)).collect()
    }

    #[test]
    fn test_trailing_space_does_not_force_a_break() {
        // "abc " is 40 wide but only 30 without its trailing space
        let lines = break_text("abc def", 30.0);
        assert_eq!(ranges(&lines), vec![(0, 4), (4, 7)]);
        assert_eq!(lines.lines[0].end_excluding_whitespace, 3);
        assert!(!lines.lines[0].hard_break);
        assert!(lines.lines[1].hard_break);
    }

    #[test]
    fn test_newlines_make_hard_breaks() {
        let lines = break_text("ab\n\ncd\n", 100.0);
        assert_eq!(ranges(&lines), vec![(0, 2), (3, 3), (4, 6), (7, 7)]);
        assert_eq!(lines.lines[0].end_including_newline, 3);
        assert!(lines.lines.iter().all(|line| line.hard_break));
    }

    #[test]
    fn test_long_words_break_between_graphemes() {
        let lines = break_text("abcdefg", 30.0);
        assert_eq!(ranges(&lines), vec![(0, 3), (3, 6), (6, 7)]);
    }

    #[test]
    fn test_intrinsic_widths() {
        let lines = break_text("a bcd ef\nghijk", 1000.0);
        assert_eq!(lines.max_intrinsic_width, 80.0);
        assert_eq!(lines.min_intrinsic_width, 50.0);
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let lines = break_text("", 100.0);
        assert_eq!(ranges(&lines), vec![(0, 0)]);
    }
}
