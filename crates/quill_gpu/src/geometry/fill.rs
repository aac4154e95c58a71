use quill_core::{Affine2D, Path};

use super::{GeometryContext, GeometryResult};
use crate::command::{IndexData, SolidVertex, VertexBuffer, VertexLayout};
use crate::tessellator::TessellatorResult;

pub(super) fn position_buffer(
    path: &Path,
    ctx: &mut GeometryContext<'_>,
    transform: &Affine2D,
) -> GeometryResult {
    if path.is_empty() {
        return GeometryResult::default();
    }

    let polyline = path.create_polyline(transform.max_basis_length());
    let allocator = ctx.allocator;
    let mut output = GeometryResult {
        transform: *transform,
        ..Default::default()
    };

    let result = ctx.tessellator.tessellate(&polyline, path.is_convex(), |tessellated| {
        // One or two points cannot form a triangle
        if tessellated.points.len() < 3 {
            return true;
        }
        let vertices: Vec<SolidVertex> = tessellated
            .points
            .iter()
            .map(|p| SolidVertex::new(*p))
            .collect();
        let indices = match tessellated.indices {
            Some(indices) => IndexData::U16(indices),
            None => IndexData::None,
        };
        output.primitive_type = tessellated.primitive_type;
        output.winding_rule = tessellated.winding_rule;
        output.vertex_buffer =
            VertexBuffer::create(allocator, "Fill", VertexLayout::Position, &vertices, indices);
        !output.vertex_buffer.is_empty()
    });

    match result {
        TessellatorResult::Success => output,
        TessellatorResult::InputError | TessellatorResult::TessellationError => {
            tracing::debug!(?result, "Fill produced no vertices");
            GeometryResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HostAllocator;
    use crate::command::{IndexType, PrimitiveType};
    use crate::tessellator::Tessellator;
    use quill_core::{FillType, ISize, PathBuilder, Point, Rect};

    #[test]
    fn test_fill_rect_is_indexed_triangles() {
        let allocator = HostAllocator::default();
        let mut tessellator = Tessellator::default();
        let mut ctx = GeometryContext {
            allocator: &allocator,
            tessellator: &mut tessellator,
            target_size: ISize::new(64, 64),
        };
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 10.0, 10.0))
            .take_path();
        let result = position_buffer(&path, &mut ctx, &Affine2D::IDENTITY);
        assert_eq!(result.primitive_type, PrimitiveType::Triangle);
        assert_eq!(result.vertex_buffer.index_type, IndexType::U16);
        assert_eq!(result.vertex_buffer.element_count(), 6);
    }

    #[test]
    fn test_degenerate_fill_is_empty() {
        let allocator = HostAllocator::default();
        let mut tessellator = Tessellator::default();
        let mut ctx = GeometryContext {
            allocator: &allocator,
            tessellator: &mut tessellator,
            target_size: ISize::new(64, 64),
        };
        let path = PathBuilder::new()
            .add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0))
            .set_fill_type(FillType::EvenOdd)
            .take_path();
        let result = position_buffer(&path, &mut ctx, &Affine2D::IDENTITY);
        assert!(result.is_empty());
    }
}
