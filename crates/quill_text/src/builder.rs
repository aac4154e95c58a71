//! Incremental paragraph construction

use std::sync::Arc;

use tracing::warn;

use crate::font::FontCollection;
use crate::paragraph::Paragraph;
use crate::style::{ParagraphStyle, PlaceholderRun, TextStyle};
use crate::styled_runs::StyledRuns;
use crate::utf16::OBJECT_REPLACEMENT;

/// Builds a [`Paragraph`] from a stack of text styles
///
/// Text added after [`push_style`](Self::push_style) uses that style until
/// the matching [`pop`](Self::pop). With an empty stack the paragraph's
/// default text style applies.
pub struct ParagraphBuilder {
    text: Vec<u16>,
    runs: StyledRuns,
    style_stack: Vec<usize>,
    paragraph_style: ParagraphStyle,
    paragraph_style_index: usize,
    placeholders: Vec<PlaceholderRun>,
    placeholder_offsets: Vec<usize>,
    font_collection: Arc<dyn FontCollection>,
}

impl ParagraphBuilder {
    pub fn new(paragraph_style: ParagraphStyle, font_collection: Arc<dyn FontCollection>) -> Self {
        let mut runs = StyledRuns::new();
        let paragraph_style_index = runs.add_style(paragraph_style.default_text_style());
        runs.start_run(paragraph_style_index, 0);
        Self {
            text: Vec::new(),
            runs,
            style_stack: Vec::new(),
            paragraph_style,
            paragraph_style_index,
            placeholders: Vec::new(),
            placeholder_offsets: Vec::new(),
            font_collection,
        }
    }

    pub fn push_style(&mut self, style: TextStyle) {
        let style_index = self.runs.add_style(style);
        self.style_stack.push(style_index);
        self.runs.start_run(style_index, self.text.len());
    }

    pub fn pop(&mut self) {
        if self.style_stack.pop().is_none() {
            warn!("ParagraphBuilder::pop called with an empty style stack");
            return;
        }
        self.runs.start_run(self.peek_style_index(), self.text.len());
    }

    /// The style text would be added with
    pub fn peek_style(&self) -> TextStyle {
        self.runs
            .get_style(self.peek_style_index())
            .cloned()
            .unwrap_or_default()
    }

    fn peek_style_index(&self) -> usize {
        self.style_stack.last().copied().unwrap_or(self.paragraph_style_index)
    }

    pub fn add_text(&mut self, text: &str) {
        self.text.extend(text.encode_utf16());
    }

    pub fn add_text_utf16(&mut self, text: &[u16]) {
        self.text.extend_from_slice(text);
    }

    /// Reserve inline space for an object, represented in the text by an
    /// object replacement character.
    pub fn add_placeholder(&mut self, placeholder: PlaceholderRun) {
        self.placeholder_offsets.push(self.text.len());
        self.placeholders.push(placeholder);
        self.text.push(OBJECT_REPLACEMENT);
    }

    pub fn build(mut self) -> Paragraph {
        self.runs.end_run_if_needed(self.text.len());
        let mut paragraph = Paragraph::new(self.font_collection);
        paragraph.set_paragraph_style(self.paragraph_style);
        paragraph.set_text(self.text, self.runs);
        paragraph.set_inline_placeholders(self.placeholders, &self.placeholder_offsets);
        paragraph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedAdvanceTypeface, TypefaceCollection};

    fn builder() -> ParagraphBuilder {
        let fonts = TypefaceCollection::new().with_typeface(Arc::new(FixedAdvanceTypeface::new("Ahem")));
        ParagraphBuilder::new(ParagraphStyle::default(), Arc::new(fonts))
    }

    #[test]
    fn test_pushed_styles_become_runs() {
        let mut builder = builder();
        builder.add_text("ab");
        builder.push_style(TextStyle::default().with_font_size(20.0));
        builder.add_text("cd");
        builder.pop();
        builder.add_text("ef");

        builder.runs.end_run_if_needed(builder.text.len());
        let ranges: Vec<(usize, usize, f32)> = builder
            .runs
            .runs()
            .map(|run| (run.start, run.end, run.style.font_size))
            .collect();
        assert_eq!(ranges, vec![(0, 2, 14.0), (2, 4, 20.0), (4, 6, 14.0)]);
    }

    #[test]
    fn test_pop_on_empty_stack_is_ignored() {
        let mut builder = builder();
        builder.pop();
        builder.add_text("a");
        assert_eq!(builder.peek_style().font_size, 14.0);
    }

    #[test]
    fn test_placeholder_inserts_replacement_character() {
        let mut builder = builder();
        builder.add_text("a");
        builder.add_placeholder(PlaceholderRun::new(10.0, 10.0, Default::default()));
        assert_eq!(builder.text, vec![u16::from(b'a'), OBJECT_REPLACEMENT]);
        assert_eq!(builder.placeholder_offsets, vec![1]);
    }
}
