use std::sync::Arc;

use quill_core::{Color, ISize, Rect};
use quill_paint::{Canvas, Renderer};
use quill_text::{
    Affinity, FixedAdvanceTypeface, Paragraph, ParagraphBuilder, ParagraphStyle, PlaceholderAlignment,
    PlaceholderRun, PositionWithAffinity, RectHeightStyle, RectWidthStyle, TextAlign, TextDirection,
    TextStyle, TypefaceCollection,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fonts() -> Arc<TypefaceCollection> {
    Arc::new(TypefaceCollection::new().with_typeface(Arc::new(FixedAdvanceTypeface::new("Ahem"))))
}

/// Every glyph is 10 wide with ascent 8 and descent 2
fn style() -> ParagraphStyle {
    ParagraphStyle {
        font_size: 10.0,
        font_families: vec!["Ahem".to_string()],
        ..ParagraphStyle::default()
    }
}

fn paragraph(text: &str, style: ParagraphStyle) -> Paragraph {
    init_tracing();
    let mut builder = ParagraphBuilder::new(style, fonts());
    builder.add_text(text);
    builder.build()
}

fn line_ranges(paragraph: &Paragraph) -> Vec<(usize, usize)> {
    paragraph
        .get_line_metrics()
        .iter()
        .map(|line| (line.start, line.end))
        .collect()
}

#[test]
fn lines_wrap_at_word_boundaries() {
    let mut paragraph = paragraph("aaa bb cccc", style());
    paragraph.layout(70.0);

    assert_eq!(line_ranges(&paragraph), vec![(0, 7), (7, 11)]);
    let lines = paragraph.get_line_metrics();
    assert_eq!(lines[0].end_excluding_whitespace, 6);
    assert_eq!(lines[0].width, 60.0);
    assert!(!lines[0].hard_break);
    assert!(lines[1].hard_break);
    assert_eq!(lines[0].baseline, 8.0);
    assert_eq!(lines[1].baseline, 18.0);
    assert_eq!(paragraph.get_height(), 20.0);
    assert_eq!(paragraph.get_longest_line(), 60.0);
    assert_eq!(paragraph.get_max_intrinsic_width(), 110.0);
    assert_eq!(paragraph.get_min_intrinsic_width(), 40.0);
    assert_eq!(paragraph.get_alphabetic_baseline(), 8.0);
    assert_eq!(paragraph.get_ideographic_baseline(), 10.0);
    assert_eq!(paragraph.get_max_width(), 70.0);
}

#[test]
fn newlines_force_breaks_and_keep_empty_lines() {
    let mut paragraph = paragraph("ab\n\ncd\n", style());
    paragraph.layout(1000.0);

    assert_eq!(line_ranges(&paragraph), vec![(0, 2), (3, 3), (4, 6), (7, 7)]);
    assert!(paragraph.get_line_metrics().iter().all(|line| line.hard_break));
    // Empty lines take the height of the style at their position
    assert_eq!(paragraph.get_height(), 40.0);
}

#[test]
fn repeated_layout_is_stable() {
    let mut paragraph = paragraph("The quick brown fox jumps", style());
    paragraph.layout(90.0);
    let lines = paragraph.get_line_metrics().to_vec();
    let positions: Vec<_> = paragraph
        .code_unit_runs()
        .iter()
        .map(|run| run.positions.clone())
        .collect();
    let offsets: Vec<_> = paragraph.paint_records().iter().map(|record| record.offset).collect();

    paragraph.layout(90.0);
    assert_eq!(paragraph.get_line_metrics(), lines.as_slice());
    let again: Vec<_> = paragraph
        .code_unit_runs()
        .iter()
        .map(|run| run.positions.clone())
        .collect();
    assert_eq!(again, positions);
    let again: Vec<_> = paragraph.paint_records().iter().map(|record| record.offset).collect();
    assert_eq!(again, offsets);

    // A new width lays out again
    paragraph.layout(1000.0);
    assert_eq!(paragraph.get_line_count(), 1);
}

#[test]
fn justified_lines_fill_the_width_exactly() {
    let mut paragraph = paragraph(
        "aa bb cc dd",
        ParagraphStyle {
            text_align: TextAlign::Justify,
            ..style()
        },
    );
    paragraph.layout(100.0);
    assert_eq!(line_ranges(&paragraph), vec![(0, 9), (9, 11)]);

    let lines = paragraph.get_line_metrics();
    assert_eq!(lines[0].width, 100.0);
    let first_line = paragraph
        .code_unit_runs()
        .iter()
        .find(|run| run.line_number == 0 && !run.is_ghost)
        .unwrap();
    let x_of = |unit: usize| {
        first_line
            .positions
            .iter()
            .find(|position| position.code_units.start == unit)
            .map(|position| position.x_pos.clone())
            .unwrap()
    };
    // 20 of extra space split over two gaps
    assert_eq!(x_of(0), 0.0..10.0);
    assert_eq!(x_of(3), 40.0..50.0);
    assert_eq!(x_of(7), 90.0..100.0);

    // The last line keeps its natural width
    assert_eq!(lines[1].width, 20.0);
    assert_eq!(lines[1].left, 0.0);
}

#[test]
fn hard_broken_lines_are_not_justified() {
    let mut paragraph = paragraph(
        "aa bb\ncc dd ee ff",
        ParagraphStyle {
            text_align: TextAlign::Justify,
            ..style()
        },
    );
    paragraph.layout(100.0);
    let lines = paragraph.get_line_metrics();
    assert_eq!(lines[0].width, 50.0);
    assert_eq!(lines[1].width, 100.0);
}

#[test]
fn ellipsis_trims_the_last_visible_line() {
    let mut paragraph = paragraph(
        "aaaa bbbb",
        ParagraphStyle {
            max_lines: Some(1),
            ellipsis: "...".to_string(),
            ..style()
        },
    );
    paragraph.layout(60.0);

    assert_eq!(paragraph.get_line_count(), 1);
    assert!(paragraph.did_exceed_max_lines());
    let line = &paragraph.get_line_metrics()[0];
    assert_eq!(line.end_excluding_whitespace, 3);
    assert_eq!(line.width, 60.0);

    let records = paragraph.paint_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].offset.x, 30.0);
    let glyphs: usize = records.iter().map(|record| record.text_frame.glyph_count()).sum();
    assert_eq!(glyphs, 6);
}

#[test]
fn ellipsis_without_line_limit_keeps_one_line() {
    let mut paragraph = paragraph(
        "aaaa bbbb",
        ParagraphStyle {
            ellipsis: "\u{2026}".to_string(),
            ..style()
        },
    );
    paragraph.layout(60.0);
    assert_eq!(paragraph.get_line_count(), 1);
    assert!(paragraph.did_exceed_max_lines());
}

#[test]
fn max_lines_drops_the_rest() {
    let mut paragraph = paragraph(
        "a b c d",
        ParagraphStyle {
            max_lines: Some(2),
            ..style()
        },
    );
    paragraph.layout(10.0);
    assert_eq!(line_ranges(&paragraph), vec![(0, 2), (2, 4)]);
    assert_eq!(paragraph.get_height(), 20.0);
    assert!(paragraph.did_exceed_max_lines());
}

#[test]
fn word_boundaries_keep_punctuation() {
    let paragraph = paragraph("hello, world  foo", style());
    assert_eq!(paragraph.get_word_boundary(2), 0..6);
    assert_eq!(paragraph.get_word_boundary(5), 0..6);
    assert_eq!(paragraph.get_word_boundary(6), 6..7);
    assert_eq!(paragraph.get_word_boundary(12), 12..14);
    assert_eq!(paragraph.get_word_boundary(100), 14..17);
}

#[test]
fn glyph_positions_follow_the_midpoint() {
    let mut paragraph = paragraph("abcd", style());
    paragraph.layout(100.0);

    assert_eq!(
        paragraph.get_glyph_position_at_coordinate(12.0, 5.0),
        PositionWithAffinity::new(1, Affinity::Downstream)
    );
    assert_eq!(
        paragraph.get_glyph_position_at_coordinate(18.0, 5.0),
        PositionWithAffinity::new(2, Affinity::Upstream)
    );
    assert_eq!(
        paragraph.get_glyph_position_at_coordinate(500.0, 100.0),
        PositionWithAffinity::new(4, Affinity::Upstream)
    );
    assert_eq!(
        paragraph.get_glyph_position_at_coordinate(-5.0, 5.0),
        PositionWithAffinity::new(0, Affinity::Downstream)
    );
}

#[test]
fn rtl_runs_resolve_positions_from_the_right() {
    let mut paragraph = paragraph("ab \u{5D0}\u{5D1}", style());
    paragraph.layout(100.0);

    let rtl_run = paragraph
        .code_unit_runs()
        .iter()
        .find(|run| run.direction == TextDirection::Rtl)
        .unwrap();
    assert_eq!(rtl_run.code_units, 3..5);
    assert_eq!(rtl_run.positions[0].code_units, 4..5);
    assert_eq!(rtl_run.positions[1].x_pos, 40.0..50.0);

    assert_eq!(
        paragraph.get_glyph_position_at_coordinate(48.0, 5.0),
        PositionWithAffinity::new(3, Affinity::Downstream)
    );
    assert_eq!(
        paragraph.get_glyph_position_at_coordinate(42.0, 5.0),
        PositionWithAffinity::new(4, Affinity::Upstream)
    );
}

#[test]
fn rtl_paragraphs_align_to_the_right() {
    let mut paragraph = paragraph(
        "abc",
        ParagraphStyle {
            text_direction: TextDirection::Rtl,
            ..style()
        },
    );
    paragraph.layout(100.0);
    assert_eq!(paragraph.get_line_metrics()[0].left, 70.0);
    let boxes = paragraph.get_rects_for_range(0, 1, RectHeightStyle::Tight, RectWidthStyle::Tight);
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].rect, Rect::from_ltrb(70.0, 0.0, 80.0, 10.0));
}

#[test]
fn selection_boxes_merge_per_line() {
    let mut paragraph = paragraph("abc def", style());
    paragraph.layout(100.0);
    let boxes = paragraph.get_rects_for_range(1, 5, RectHeightStyle::Tight, RectWidthStyle::Tight);
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].rect, Rect::from_ltrb(10.0, 0.0, 50.0, 10.0));
    assert_eq!(boxes[0].direction, TextDirection::Ltr);

    assert!(paragraph
        .get_rects_for_range(3, 3, RectHeightStyle::Tight, RectWidthStyle::Tight)
        .is_empty());
}

#[test]
fn max_width_selection_reaches_the_paragraph_edge() {
    let mut paragraph = paragraph("aa bbbb", style());
    paragraph.layout(40.0);
    assert_eq!(line_ranges(&paragraph), vec![(0, 3), (3, 7)]);

    let tight = paragraph.get_rects_for_range(1, 5, RectHeightStyle::Tight, RectWidthStyle::Tight);
    let rects: Vec<Rect> = tight.iter().map(|text_box| text_box.rect).collect();
    assert_eq!(
        rects,
        vec![
            Rect::from_ltrb(10.0, 0.0, 30.0, 10.0),
            Rect::from_ltrb(0.0, 10.0, 20.0, 20.0),
        ]
    );

    let max = paragraph.get_rects_for_range(1, 5, RectHeightStyle::Tight, RectWidthStyle::Max);
    let rects: Vec<Rect> = max.iter().map(|text_box| text_box.rect).collect();
    assert_eq!(
        rects,
        vec![
            Rect::from_ltrb(10.0, 0.0, 30.0, 10.0),
            Rect::from_ltrb(30.0, 0.0, 40.0, 10.0),
            Rect::from_ltrb(0.0, 10.0, 20.0, 20.0),
        ]
    );
}

#[test]
fn placeholders_reserve_space_and_raise_the_line() {
    init_tracing();
    let mut builder = ParagraphBuilder::new(style(), fonts());
    builder.add_text("ab");
    builder.add_placeholder(PlaceholderRun::new(30.0, 20.0, PlaceholderAlignment::Baseline));
    builder.add_text("c");
    let mut paragraph = builder.build();
    paragraph.layout(100.0);

    let line = &paragraph.get_line_metrics()[0];
    assert_eq!(line.width, 60.0);
    assert_eq!(line.ascent, 20.0);
    assert_eq!(line.descent, 2.0);
    assert_eq!(paragraph.get_height(), 22.0);

    let boxes = paragraph.get_rects_for_placeholders();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].rect, Rect::from_ltrb(20.0, 0.0, 50.0, 20.0));

    // Placeholders are not painted as glyphs
    let glyphs: usize = paragraph
        .paint_records()
        .iter()
        .map(|record| record.text_frame.glyph_count())
        .sum();
    assert_eq!(glyphs, 3);
}

#[test]
fn strut_sets_a_minimum_line_height() {
    let strut = ParagraphStyle {
        strut_enabled: true,
        strut_font_families: vec!["Ahem".to_string()],
        strut_font_size: 20.0,
        ..style()
    };
    let mut paragraph = paragraph("a", strut.clone());
    paragraph.layout(100.0);
    let line = &paragraph.get_line_metrics()[0];
    assert_eq!((line.ascent, line.descent), (16.0, 4.0));

    let forced = ParagraphStyle {
        strut_font_size: 5.0,
        force_strut_height: true,
        ..strut
    };
    let mut paragraph = self::paragraph("a", forced);
    paragraph.layout(100.0);
    assert_eq!(paragraph.get_height(), 5.0);
}

#[test]
fn height_override_scales_the_line() {
    init_tracing();
    let mut builder = ParagraphBuilder::new(style(), fonts());
    builder.push_style(TextStyle::default().with_font_family("Ahem").with_font_size(10.0).with_height(2.0));
    builder.add_text("a");
    builder.pop();
    let mut paragraph = builder.build();
    paragraph.layout(100.0);

    let line = &paragraph.get_line_metrics()[0];
    assert_eq!((line.ascent, line.descent), (16.0, 4.0));
}

#[test]
fn missing_glyphs_fall_back_to_another_typeface() {
    init_tracing();
    let collection = TypefaceCollection::new()
        .with_typeface(Arc::new(FixedAdvanceTypeface::new("Ahem").without_glyphs(&['x'])))
        .with_typeface(Arc::new(FixedAdvanceTypeface::new("Backup")));
    let mut builder = ParagraphBuilder::new(style(), Arc::new(collection));
    builder.add_text("axa");
    let mut paragraph = builder.build();
    paragraph.layout(100.0);

    let records = paragraph.paint_records();
    assert_eq!(records.len(), 3);
    let width: f32 = records.iter().map(|record| record.run_width).sum();
    assert_eq!(width, 30.0);
}

#[test]
fn painted_text_lands_on_the_canvas() {
    init_tracing();
    let mut builder = ParagraphBuilder::new(style(), fonts());
    builder.push_style(
        TextStyle::default()
            .with_font_family("Ahem")
            .with_font_size(10.0)
            .with_color(Color::RED),
    );
    builder.add_text("a");
    let mut paragraph = builder.build();
    paragraph.layout(100.0);

    let mut canvas = Canvas::new();
    paragraph.paint(&mut canvas, 0.0, 0.0);
    let mut renderer = Renderer::software();
    let image = canvas
        .end_recording_as_picture()
        .to_image(&mut renderer, ISize::new(20, 20))
        .expect("picture should render");

    assert_eq!(renderer.read_pixel(&image, 5, 5), Some(Color::RED));
    assert_eq!(renderer.read_pixel(&image, 15, 5), Some(Color::TRANSPARENT));
    assert_eq!(renderer.read_pixel(&image, 5, 15), Some(Color::TRANSPARENT));
}
