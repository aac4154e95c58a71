//! Circles, ellipses, round rects and lines built from the analytic
//! generators instead of path tessellation.

use std::f32::consts::SQRT_2;

use quill_core::{Affine2D, PathBuilder, Point, Rect, RoundRect};

use super::stroke::{Cap, StrokeStyle};
use super::{fill, GeometryContext, GeometryResult};
use crate::command::PrimitiveType;
use crate::tessellator::EllipticalVertexGenerator;

fn from_generator(
    ctx: &mut GeometryContext<'_>,
    label: &str,
    generator: &EllipticalVertexGenerator,
    transform: &Affine2D,
) -> GeometryResult {
    GeometryResult::from_points(
        ctx.allocator,
        label,
        generator.primitive_type(),
        &generator.vertices(),
        transform,
    )
}

/// Stroke width after the one device pixel minimum.
pub(super) fn min_stroke_width(width: f32, transform: &Affine2D) -> Option<f32> {
    StrokeStyle::new(width).effective_width(transform)
}

pub(super) fn circle_position_buffer(
    center: Point,
    radius: f32,
    ctx: &mut GeometryContext<'_>,
    transform: &Affine2D,
) -> GeometryResult {
    if !(radius > 0.0) {
        return GeometryResult::default();
    }
    let generator = ctx.tessellator.filled_circle(transform, center, radius);
    from_generator(ctx, "Circle", &generator, transform)
}

pub(super) fn stroked_circle_position_buffer(
    center: Point,
    radius: f32,
    stroke_width: f32,
    ctx: &mut GeometryContext<'_>,
    transform: &Affine2D,
) -> GeometryResult {
    let Some(width) = min_stroke_width(stroke_width, transform) else {
        return GeometryResult::default();
    };
    let generator = ctx
        .tessellator
        .stroked_circle(transform, center, radius.max(0.0), width * 0.5);
    from_generator(ctx, "Stroked Circle", &generator, transform)
}

pub(super) fn ellipse_position_buffer(
    bounds: &Rect,
    ctx: &mut GeometryContext<'_>,
    transform: &Affine2D,
) -> GeometryResult {
    if bounds.is_empty() {
        return GeometryResult::default();
    }
    let generator = ctx.tessellator.filled_ellipse(transform, *bounds);
    from_generator(ctx, "Ellipse", &generator, transform)
}

pub(super) fn round_rect_position_buffer(
    round_rect: &RoundRect,
    ctx: &mut GeometryContext<'_>,
    transform: &Affine2D,
) -> GeometryResult {
    if round_rect.rect.is_empty() {
        return GeometryResult::default();
    }
    if round_rect.radii.are_all_same() {
        let generator =
            ctx.tessellator
                .filled_round_rect(transform, round_rect.rect, round_rect.radii.top_left);
        return from_generator(ctx, "Round Rect", &generator, transform);
    }
    // Mixed corner radii go through the general path
    let path = PathBuilder::new().add_round_rect(*round_rect).take_path();
    fill::position_buffer(&path, ctx, transform)
}

pub(super) fn line_position_buffer(
    p0: Point,
    p1: Point,
    width: f32,
    cap: Cap,
    ctx: &mut GeometryContext<'_>,
    transform: &Affine2D,
) -> GeometryResult {
    let Some(width) = min_stroke_width(width, transform) else {
        return GeometryResult::default();
    };
    let radius = width * 0.5;

    if cap == Cap::Round {
        let generator = ctx.tessellator.round_cap_line(transform, p0, p1, radius);
        return from_generator(ctx, "Round Cap Line", &generator, transform);
    }

    let Some(corners) = line_corners(p0, p1, radius, cap) else {
        return GeometryResult::default();
    };
    GeometryResult::from_points(
        ctx.allocator,
        "Line",
        PrimitiveType::TriangleStrip,
        &corners,
        transform,
    )
}

pub(super) fn line_coverage(p0: Point, p1: Point, width: f32, cap: Cap, transform: &Affine2D) -> Option<Rect> {
    let width = min_stroke_width(width, transform)?;
    let mut radius = width * 0.5;
    if cap == Cap::Square {
        radius *= SQRT_2;
    }
    let bounds = Rect::from_points(&[p0, p1])?.expand(radius, radius);
    Some(transform.transform_rect(&bounds))
}

/// Quad of a butt or square capped line, as a strip.
fn line_corners(p0: Point, p1: Point, radius: f32, cap: Cap) -> Option<[Point; 4]> {
    let length = (p1 - p0).length();
    let (along, p0, p1) = if length > f32::EPSILON {
        let along = (p1 - p0) * (radius / length);
        match cap {
            Cap::Square => (along, p0 - along, p1 + along),
            _ => (along, p0, p1),
        }
    } else if cap == Cap::Square {
        // Zero-length square caps still draw a square
        let along = Point::new(radius, 0.0);
        (along, p0 - along, p1 + along)
    } else {
        return None;
    };
    let across = along.perpendicular();
    Some([p0 + across, p0 - across, p1 + across, p1 - across])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HostAllocator;
    use crate::tessellator::Tessellator;
    use quill_core::{ISize, RoundingRadii, Size};

    #[test]
    fn test_line_corners_square_cap() {
        let corners = line_corners(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 1.0, Cap::Square).unwrap();
        let bounds = Rect::from_points(&corners).unwrap();
        assert_eq!(bounds, Rect::new(-1.0, -1.0, 12.0, 2.0));
    }

    #[test]
    fn test_zero_length_butt_line_is_empty() {
        assert!(line_corners(Point::new(1.0, 1.0), Point::new(1.0, 1.0), 1.0, Cap::Butt).is_none());
    }

    #[test]
    fn test_mixed_radii_round_rect_tessellates() {
        let allocator = HostAllocator::default();
        let mut tessellator = Tessellator::default();
        let mut ctx = GeometryContext {
            allocator: &allocator,
            tessellator: &mut tessellator,
            target_size: ISize::new(64, 64),
        };
        let round_rect = RoundRect::new(
            Rect::new(0.0, 0.0, 40.0, 40.0),
            RoundingRadii {
                top_left: Size::new(4.0, 4.0),
                top_right: Size::new(8.0, 8.0),
                bottom_right: Size::new(4.0, 4.0),
                bottom_left: Size::new(0.0, 0.0),
            },
        );
        let result = round_rect_position_buffer(&round_rect, &mut ctx, &Affine2D::IDENTITY);
        assert_eq!(result.primitive_type, PrimitiveType::Triangle);
        assert!(!result.is_empty());
    }
}
