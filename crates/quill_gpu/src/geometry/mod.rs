//! Geometry: the shapes an entity can draw
//!
//! A [`Geometry`] turns itself into a [`GeometryResult`], a vertex buffer in
//! the entity's local space plus the transform that maps it to render target
//! pixels, and reports its device-space coverage.

mod fill;
mod rect;
mod shapes;
mod stroke;
mod vertices;

pub use stroke::{create_stroke_vertices, Cap, Join, StrokeStyle};
pub use vertices::{VertexMode, Vertices};

use quill_core::{Affine2D, Color, FillType, ISize, Path, Point, Rect, RoundRect};

use crate::allocator::Allocator;
use crate::command::{IndexData, PrimitiveType, SolidVertex, VertexBuffer, VertexLayout};
use crate::tessellator::Tessellator;

/// Resources available while generating vertices
pub struct GeometryContext<'a> {
    pub allocator: &'a dyn Allocator,
    pub tessellator: &'a mut Tessellator,
    /// Size of the render target being drawn into
    pub target_size: ISize,
}

/// Vertices ready to be bound to a command
#[derive(Clone, Debug, Default)]
pub struct GeometryResult {
    pub primitive_type: PrimitiveType,
    pub vertex_buffer: VertexBuffer,
    /// Local vertex positions to render target pixels
    pub transform: Affine2D,
    /// Coverage must be resolved by winding when set
    pub winding_rule: Option<FillType>,
}

impl GeometryResult {
    pub fn is_empty(&self) -> bool {
        self.vertex_buffer.is_empty()
    }

    pub(crate) fn from_points(
        allocator: &dyn Allocator,
        label: &str,
        primitive_type: PrimitiveType,
        points: &[Point],
        transform: &Affine2D,
    ) -> GeometryResult {
        let vertices: Vec<SolidVertex> = points.iter().map(|p| SolidVertex::new(*p)).collect();
        GeometryResult {
            primitive_type,
            vertex_buffer: VertexBuffer::create(
                allocator,
                label,
                VertexLayout::Position,
                &vertices,
                IndexData::None,
            ),
            transform: *transform,
            winding_rule: None,
        }
    }
}

/// A drawable shape
#[derive(Clone, Debug)]
pub enum Geometry {
    Fill {
        path: Path,
    },
    Stroke {
        path: Path,
        style: StrokeStyle,
    },
    /// Everything the render target shows
    Cover,
    Rect(Rect),
    Circle {
        center: Point,
        radius: f32,
    },
    StrokedCircle {
        center: Point,
        radius: f32,
        stroke_width: f32,
    },
    Ellipse(Rect),
    RoundRect(RoundRect),
    Line {
        p0: Point,
        p1: Point,
        width: f32,
        cap: Cap,
    },
    Vertices(Vertices),
}

impl Geometry {
    pub fn fill(path: Path) -> Self {
        Geometry::Fill { path }
    }

    pub fn stroke(path: Path, style: StrokeStyle) -> Self {
        Geometry::Stroke { path, style }
    }

    pub fn position_buffer(&self, ctx: &mut GeometryContext<'_>, transform: &Affine2D) -> GeometryResult {
        match self {
            Geometry::Fill { path } => fill::position_buffer(path, ctx, transform),
            Geometry::Stroke { path, style } => stroke::position_buffer(path, style, ctx, transform),
            Geometry::Cover => rect::cover_position_buffer(ctx, transform),
            Geometry::Rect(rect) => rect::rect_position_buffer(rect, ctx, transform),
            Geometry::Circle { center, radius } => {
                shapes::circle_position_buffer(*center, *radius, ctx, transform)
            }
            Geometry::StrokedCircle {
                center,
                radius,
                stroke_width,
            } => shapes::stroked_circle_position_buffer(*center, *radius, *stroke_width, ctx, transform),
            Geometry::Ellipse(bounds) => shapes::ellipse_position_buffer(bounds, ctx, transform),
            Geometry::RoundRect(round_rect) => {
                shapes::round_rect_position_buffer(round_rect, ctx, transform)
            }
            Geometry::Line { p0, p1, width, cap } => {
                shapes::line_position_buffer(*p0, *p1, *width, *cap, ctx, transform)
            }
            Geometry::Vertices(vertices) => vertices.position_buffer(ctx, transform),
        }
    }

    /// Device-space bounds of what this geometry can touch.
    ///
    /// `None` means nothing is drawn. [`Geometry::Cover`] reports
    /// [`Rect::MAXIMUM`].
    pub fn coverage(&self, transform: &Affine2D) -> Option<Rect> {
        match self {
            Geometry::Fill { path } => path.transformed_bounds(transform),
            Geometry::Stroke { path, style } => stroke::coverage(path, style, transform),
            Geometry::Cover => Some(Rect::MAXIMUM),
            Geometry::Rect(rect) => Some(transform.transform_rect(rect)),
            Geometry::Circle { center, radius } => Some(
                transform.transform_rect(&Rect::new(
                    center.x - radius,
                    center.y - radius,
                    radius * 2.0,
                    radius * 2.0,
                )),
            ),
            Geometry::StrokedCircle {
                center,
                radius,
                stroke_width,
            } => {
                let outer = radius + shapes::min_stroke_width(*stroke_width, transform)? * 0.5;
                Some(transform.transform_rect(&Rect::new(
                    center.x - outer,
                    center.y - outer,
                    outer * 2.0,
                    outer * 2.0,
                )))
            }
            Geometry::Ellipse(bounds) => Some(transform.transform_rect(bounds)),
            Geometry::RoundRect(round_rect) => Some(transform.transform_rect(&round_rect.rect)),
            Geometry::Line { p0, p1, width, cap } => shapes::line_coverage(*p0, *p1, *width, *cap, transform),
            Geometry::Vertices(vertices) => {
                vertices.bounds().map(|b| transform.transform_rect(&b))
            }
        }
    }

    /// Whether the geometry is an axis-aligned rectangle once transformed,
    /// so its coverage is exact.
    pub fn is_axis_aligned_rect(&self, transform: &Affine2D) -> bool {
        matches!(self, Geometry::Rect(_) | Geometry::Cover) && transform.is_translation_scale_only()
    }

    /// Whether the geometry fully covers `rect` (device space).
    pub fn covers_area(&self, transform: &Affine2D, rect: &Rect) -> bool {
        match self {
            Geometry::Cover => true,
            Geometry::Rect(_) if transform.is_translation_scale_only() => self
                .coverage(transform)
                .map_or(false, |coverage| coverage.contains_rect(rect)),
            _ => false,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry::Cover
    }
}

/// Per-vertex color data for [`Geometry::Vertices`]
pub(crate) fn vertex_colors_or(colors: &[Color], index: usize, fallback: Color) -> Color {
    colors.get(index).copied().unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HostAllocator;
    use quill_core::PathBuilder;

    fn context<'a>(allocator: &'a HostAllocator, tessellator: &'a mut Tessellator) -> GeometryContext<'a> {
        GeometryContext {
            allocator,
            tessellator,
            target_size: ISize::new(100, 100),
        }
    }

    #[test]
    fn test_fill_coverage_is_transformed_bounds() {
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 10.0, 10.0))
            .take_path();
        let geometry = Geometry::fill(path);
        let coverage = geometry
            .coverage(&Affine2D::translation(5.0, 5.0))
            .unwrap();
        assert_eq!(coverage, Rect::new(5.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn test_empty_fill_draws_nothing() {
        let allocator = HostAllocator::default();
        let mut tessellator = Tessellator::default();
        let mut ctx = context(&allocator, &mut tessellator);
        let result = Geometry::fill(Path::new()).position_buffer(&mut ctx, &Affine2D::IDENTITY);
        assert!(result.is_empty());
        assert!(Geometry::fill(Path::new()).coverage(&Affine2D::IDENTITY).is_none());
    }

    #[test]
    fn test_cover_maps_target_into_local_space() {
        let allocator = HostAllocator::default();
        let mut tessellator = Tessellator::default();
        let mut ctx = context(&allocator, &mut tessellator);
        let transform = Affine2D::scale(2.0, 2.0);
        let result = Geometry::Cover.position_buffer(&mut ctx, &transform);
        assert_eq!(result.vertex_buffer.vertex_count, 4);
        let last: SolidVertex = result.vertex_buffer.read_vertex(3).unwrap();
        assert_eq!(last.position, [50.0, 50.0]);
    }

    #[test]
    fn test_rect_covers_area() {
        let geometry = Geometry::Rect(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert!(geometry.covers_area(&Affine2D::IDENTITY, &Rect::new(10.0, 10.0, 5.0, 5.0)));
        assert!(!geometry.covers_area(&Affine2D::rotation(0.5), &Rect::new(10.0, 10.0, 5.0, 5.0)));
    }
}
