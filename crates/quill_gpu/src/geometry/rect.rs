use quill_core::{Affine2D, Point, Rect};

use super::{GeometryContext, GeometryResult};
use crate::command::PrimitiveType;

/// Strip order: top-left, top-right, bottom-left, bottom-right.
fn rect_strip(rect: &Rect) -> [Point; 4] {
    [
        Point::new(rect.left(), rect.top()),
        Point::new(rect.right(), rect.top()),
        Point::new(rect.left(), rect.bottom()),
        Point::new(rect.right(), rect.bottom()),
    ]
}

pub(super) fn rect_position_buffer(
    rect: &Rect,
    ctx: &mut GeometryContext<'_>,
    transform: &Affine2D,
) -> GeometryResult {
    if rect.is_empty() {
        return GeometryResult::default();
    }
    GeometryResult::from_points(
        ctx.allocator,
        "Rect",
        PrimitiveType::TriangleStrip,
        &rect_strip(rect),
        transform,
    )
}

/// The whole render target, expressed in the entity's local space.
pub(super) fn cover_position_buffer(ctx: &mut GeometryContext<'_>, transform: &Affine2D) -> GeometryResult {
    let Some(inverse) = transform.invert() else {
        return GeometryResult::default();
    };
    let target = Rect::from(ctx.target_size.to_size());
    let corners = rect_strip(&target).map(|p| inverse.transform_point(p));
    GeometryResult::from_points(
        ctx.allocator,
        "Cover",
        PrimitiveType::TriangleStrip,
        &corners,
        transform,
    )
}
