use quill_core::{BlendMode, Color, ISize, Point, Rect};
use quill_gpu::{HostAllocator, SamplerMode, SoftwareBackend};
use quill_paint::{Canvas, ClipOperation, ColorFilter, ImageFilter, Paint, Renderer};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn render(canvas: &mut Canvas, size: u32) -> (Renderer, quill_paint::Image) {
    init_tracing();
    let mut renderer = Renderer::software();
    let image = canvas
        .end_recording_as_picture()
        .to_image(&mut renderer, ISize::new(size, size))
        .expect("picture should render");
    (renderer, image)
}

#[test]
fn draws_after_restore_land_on_top_of_the_layer() {
    let mut canvas = Canvas::new();
    canvas.draw_rect(Rect::new(0.0, 0.0, 8.0, 8.0), &Paint::new(Color::RED));
    canvas.save_layer(&Paint::default(), None, None);
    canvas.draw_rect(Rect::new(0.0, 0.0, 4.0, 8.0), &Paint::new(Color::BLUE));
    canvas.restore();
    canvas.draw_rect(Rect::new(2.0, 0.0, 4.0, 8.0), &Paint::new(Color::GREEN));

    let (renderer, image) = render(&mut canvas, 8);
    assert_eq!(renderer.read_pixel(&image, 0, 4), Some(Color::BLUE));
    assert_eq!(renderer.read_pixel(&image, 3, 4), Some(Color::GREEN));
    assert_eq!(renderer.read_pixel(&image, 7, 4), Some(Color::RED));
}

#[test]
fn layer_blend_mode_applies_when_compositing() {
    let mut canvas = Canvas::new();
    canvas.draw_rect(Rect::new(0.0, 0.0, 8.0, 8.0), &Paint::new(Color::RED));
    // The whole layer goes underneath what is already there
    canvas.save_layer(&Paint::default().with_blend_mode(BlendMode::DestinationOver), None, None);
    canvas.draw_rect(Rect::new(0.0, 0.0, 8.0, 8.0), &Paint::new(Color::BLUE));
    canvas.restore();

    let (renderer, image) = render(&mut canvas, 8);
    assert_eq!(renderer.read_pixel(&image, 4, 4), Some(Color::RED));
}

#[test]
fn intersect_clip_limits_drawing() {
    let mut canvas = Canvas::new();
    canvas.clip_rect(Rect::new(2.0, 2.0, 4.0, 4.0), ClipOperation::Intersect);
    canvas.draw_paint(&Paint::new(Color::RED));

    let (renderer, image) = render(&mut canvas, 8);
    assert_eq!(renderer.read_pixel(&image, 3, 3), Some(Color::RED));
    assert_eq!(renderer.read_pixel(&image, 0, 0), Some(Color::TRANSPARENT));
    assert_eq!(renderer.read_pixel(&image, 7, 7), Some(Color::TRANSPARENT));
}

#[test]
fn difference_clip_cuts_a_hole() {
    let mut canvas = Canvas::new();
    canvas.clip_rect(Rect::new(2.0, 2.0, 4.0, 4.0), ClipOperation::Difference);
    canvas.draw_paint(&Paint::new(Color::RED));

    let (renderer, image) = render(&mut canvas, 8);
    assert_eq!(renderer.read_pixel(&image, 3, 3), Some(Color::TRANSPARENT));
    assert_eq!(renderer.read_pixel(&image, 0, 0), Some(Color::RED));
}

#[test]
fn restore_removes_the_clip() {
    let mut canvas = Canvas::new();
    canvas.save();
    canvas.clip_rect(Rect::new(0.0, 0.0, 4.0, 8.0), ClipOperation::Intersect);
    canvas.draw_paint(&Paint::new(Color::RED));
    canvas.restore();
    canvas.draw_rect(Rect::new(0.0, 0.0, 8.0, 4.0), &Paint::new(Color::BLUE));

    let (renderer, image) = render(&mut canvas, 8);
    assert_eq!(renderer.read_pixel(&image, 1, 1), Some(Color::BLUE));
    assert_eq!(renderer.read_pixel(&image, 6, 1), Some(Color::BLUE));
    assert_eq!(renderer.read_pixel(&image, 1, 6), Some(Color::RED));
    assert_eq!(renderer.read_pixel(&image, 6, 6), Some(Color::TRANSPARENT));
}

#[test]
fn clips_inside_a_layer_respect_the_parent_clip() {
    let mut canvas = Canvas::new();
    canvas.clip_rect(Rect::new(0.0, 0.0, 4.0, 8.0), ClipOperation::Intersect);
    canvas.save_layer(&Paint::default(), None, None);
    canvas.clip_rect(Rect::new(0.0, 0.0, 8.0, 4.0), ClipOperation::Intersect);
    canvas.draw_paint(&Paint::new(Color::GREEN));
    canvas.restore();

    let (renderer, image) = render(&mut canvas, 8);
    assert_eq!(renderer.read_pixel(&image, 1, 1), Some(Color::GREEN));
    assert_eq!(renderer.read_pixel(&image, 6, 1), Some(Color::TRANSPARENT));
    assert_eq!(renderer.read_pixel(&image, 1, 6), Some(Color::TRANSPARENT));
}

#[test]
fn empty_save_layer_draws_nothing() {
    let mut canvas = Canvas::new();
    canvas.save_layer(&Paint::default(), Some(Rect::new(2.0, 2.0, 0.0, 0.0)), None);
    canvas.restore();
    canvas.save_layer(&Paint::default(), None, None);
    canvas.restore();

    let (renderer, image) = render(&mut canvas, 4);
    let pixels = renderer.read_pixels(&image).unwrap();
    assert!(pixels.iter().all(|pixel| *pixel == Color::TRANSPARENT));
}

#[test]
fn tiny_blurs_still_produce_an_image() {
    let mut canvas = Canvas::new();
    canvas.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), &Paint::new(Color::RED).with_mask_blur(0.1));
    canvas.save_layer(&Paint::default().with_image_filter(ImageFilter::blur(0.1, 0.1)), None, None);
    canvas.draw_rect(Rect::new(2.0, 2.0, 1.0, 1.0), &Paint::new(Color::BLUE));
    canvas.restore();

    let mut renderer = Renderer::software();
    let image = canvas
        .end_recording_as_picture()
        .to_image(&mut renderer, ISize::new(4, 4));
    assert!(image.is_some());
}

#[test]
fn blur_spreads_past_the_shape() {
    let mut canvas = Canvas::new();
    let paint = Paint::new(Color::BLACK).with_image_filter(ImageFilter::blur(2.0, 2.0));
    canvas.draw_rect(Rect::new(8.0, 8.0, 4.0, 4.0), &paint);

    let (renderer, image) = render(&mut canvas, 20);
    let near = renderer.read_pixel(&image, 6, 10).unwrap();
    assert!(near.a > 0.0 && near.a < 1.0);
    assert_eq!(renderer.read_pixel(&image, 0, 0), Some(Color::TRANSPARENT));
    assert!(renderer.read_pixel(&image, 10, 10).unwrap().a > near.a);
}

#[test]
fn backdrop_filter_reads_what_was_drawn_before() {
    let mut canvas = Canvas::new();
    canvas.draw_rect(Rect::new(0.0, 0.0, 4.0, 8.0), &Paint::new(Color::RED));
    let backdrop = ImageFilter::ColorFilter(ColorFilter::Matrix(quill_paint::INVERT_COLOR_MATRIX));
    canvas.save_layer(&Paint::default(), None, Some(backdrop));
    canvas.restore();

    let (renderer, image) = render(&mut canvas, 8);
    // Inverted red is cyan
    assert_eq!(renderer.read_pixel(&image, 1, 1), Some(Color::rgba(0.0, 1.0, 1.0, 1.0)));
}

#[test]
fn images_draw_at_their_offset() {
    let mut renderer = Renderer::software();
    let pixels = [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE];
    let image = renderer.create_image(ISize::new(2, 2), &pixels).unwrap();

    let mut canvas = Canvas::new();
    canvas.draw_image(&image, Point::new(1.0, 1.0), &Paint::default(), SamplerMode::Nearest);
    let result = canvas
        .end_recording_as_picture()
        .to_image(&mut renderer, ISize::new(4, 4))
        .unwrap();

    assert_eq!(renderer.read_pixel(&result, 0, 0), Some(Color::TRANSPARENT));
    assert_eq!(renderer.read_pixel(&result, 1, 1), Some(Color::RED));
    assert_eq!(renderer.read_pixel(&result, 2, 1), Some(Color::GREEN));
    assert_eq!(renderer.read_pixel(&result, 1, 2), Some(Color::BLUE));
    assert_eq!(renderer.read_pixel(&result, 2, 2), Some(Color::WHITE));
}

#[test]
fn save_layers_reuse_targets_across_frames() {
    let mut canvas = Canvas::new();
    canvas.save_layer(&Paint::default(), None, None);
    canvas.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), &Paint::new(Color::RED));
    canvas.restore();
    let picture = canvas.end_recording_as_picture();

    let mut renderer = Renderer::software();
    assert!(picture.to_image(&mut renderer, ISize::new(8, 8)).is_some());
    assert!(picture.to_image(&mut renderer, ISize::new(8, 8)).is_some());
    assert_eq!(renderer.target_cache().stats().hits, 1);
    assert_eq!(renderer.target_cache().cached_target_count(), 1);
}

#[test]
fn allocation_failure_yields_no_image() {
    init_tracing();
    let mut canvas = Canvas::new();
    canvas.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), &Paint::new(Color::RED));
    let picture = canvas.end_recording_as_picture();
    let mut renderer = Renderer::new(SoftwareBackend::new(HostAllocator::default().with_texture_budget(0)));
    assert!(picture.to_image(&mut renderer, ISize::new(8, 8)).is_none());

    // Root color and stencil fit, the layer does not
    let mut canvas = Canvas::new();
    canvas.save_layer(&Paint::default(), None, None);
    canvas.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), &Paint::new(Color::RED));
    canvas.restore();
    let picture = canvas.end_recording_as_picture();
    let mut renderer = Renderer::new(SoftwareBackend::new(HostAllocator::default().with_texture_budget(2)));
    assert!(picture.to_image(&mut renderer, ISize::new(8, 8)).is_none());
}

#[test]
fn empty_size_yields_no_image() {
    init_tracing();
    let picture = Canvas::new().end_recording_as_picture();
    let mut renderer = Renderer::software();
    assert!(picture.to_image(&mut renderer, ISize::new(0, 8)).is_none());
}

#[test]
fn picture_coverage_unions_draws() {
    let mut canvas = Canvas::new();
    canvas.translate(10.0, 10.0);
    canvas.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::new(Color::RED));
    canvas.draw_circle(Point::new(20.0, 0.0), 5.0, &Paint::new(Color::RED));
    assert_eq!(
        canvas.end_recording_as_picture().coverage(),
        Some(Rect::new(10.0, 5.0, 25.0, 10.0))
    );
}
