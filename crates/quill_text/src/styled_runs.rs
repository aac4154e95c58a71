//! Non-overlapping style runs over a paragraph's text

use crate::style::TextStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexedRun {
    style_index: usize,
    start: usize,
    end: usize,
}

/// A run of text sharing one style, in UTF-16 code units
#[derive(Debug, Clone, Copy)]
pub struct Run<'a> {
    pub style: &'a TextStyle,
    pub start: usize,
    pub end: usize,
}

/// Ordered style runs. Styles are stored once and referenced by index.
#[derive(Debug, Clone, Default)]
pub struct StyledRuns {
    styles: Vec<TextStyle>,
    runs: Vec<IndexedRun>,
}

impl StyledRuns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_style(&mut self, style: TextStyle) -> usize {
        self.styles.push(style);
        self.styles.len() - 1
    }

    pub fn get_style(&self, style_index: usize) -> Option<&TextStyle> {
        self.styles.get(style_index)
    }

    /// Begin a run at `start`, closing the previous one there.
    ///
    /// Consecutive runs with the same style index are merged and runs left
    /// empty are replaced.
    pub fn start_run(&mut self, style_index: usize, start: usize) {
        self.end_run_if_needed(start);
        if let Some(last) = self.runs.last_mut() {
            if last.style_index == style_index && last.end == start {
                // Reopen instead of starting a twin
                last.end = usize::MAX;
                return;
            }
        }
        self.runs.push(IndexedRun {
            style_index,
            start,
            end: usize::MAX,
        });
    }

    /// Close the open run at `end`, dropping it if that leaves it empty.
    pub fn end_run_if_needed(&mut self, end: usize) {
        if let Some(last) = self.runs.last_mut() {
            if last.end == usize::MAX {
                if last.start == end {
                    self.runs.pop();
                } else {
                    last.end = end;
                }
            }
        }
    }

    pub fn size(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn get_run(&self, index: usize) -> Option<Run<'_>> {
        let run = self.runs.get(index)?;
        Some(Run {
            style: self.styles.get(run.style_index)?,
            start: run.start,
            end: run.end,
        })
    }

    pub fn runs(&self) -> impl Iterator<Item = Run<'_>> + '_ {
        (0..self.runs.len()).filter_map(|index| self.get_run(index))
    }

    /// Run containing `offset`; the last run for offsets at the end
    pub fn run_at(&self, offset: usize) -> Option<Run<'_>> {
        let index = self
            .runs
            .iter()
            .position(|run| offset >= run.start && offset < run.end)
            .or_else(|| self.runs.len().checked_sub(1))?;
        self.get_run(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_close_at_next_start() {
        let mut runs = StyledRuns::new();
        let a = runs.add_style(TextStyle::default());
        let b = runs.add_style(TextStyle::default().with_font_size(20.0));
        runs.start_run(a, 0);
        runs.start_run(b, 5);
        runs.end_run_if_needed(8);
        assert_eq!(runs.size(), 2);
        let second = runs.get_run(1).unwrap();
        assert_eq!((second.start, second.end), (5, 8));
        assert_eq!(second.style.font_size, 20.0);
    }

    #[test]
    fn test_empty_runs_are_dropped() {
        let mut runs = StyledRuns::new();
        let a = runs.add_style(TextStyle::default());
        let b = runs.add_style(TextStyle::default());
        runs.start_run(a, 0);
        runs.start_run(b, 0);
        runs.end_run_if_needed(3);
        assert_eq!(runs.size(), 1);
        assert_eq!(runs.run_at(1).map(|run| run.start), Some(0));
    }

    #[test]
    fn test_same_style_runs_merge() {
        let mut runs = StyledRuns::new();
        let a = runs.add_style(TextStyle::default());
        runs.start_run(a, 0);
        runs.start_run(a, 4);
        runs.end_run_if_needed(6);
        assert_eq!(runs.size(), 1);
        let run = runs.get_run(0).unwrap();
        assert_eq!((run.start, run.end), (0, 6));
    }
}
