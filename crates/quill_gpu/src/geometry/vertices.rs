use quill_core::{Affine2D, Color, ISize, Point, Rect};

use super::{vertex_colors_or, GeometryContext, GeometryResult};
use crate::command::{
    ColorVertex, IndexData, PrimitiveType, SolidVertex, TextureVertex, VertexBuffer, VertexLayout,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VertexMode {
    #[default]
    Triangles,
    TriangleStrip,
    /// Converted to a triangle list when uploaded
    TriangleFan,
}

/// User supplied triangle mesh
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vertices {
    pub mode: VertexMode,
    pub positions: Vec<Point>,
    pub indices: Vec<u16>,
    pub texture_coordinates: Vec<Point>,
    /// Straight alpha
    pub colors: Vec<Color>,
}

impl Vertices {
    pub fn new(mode: VertexMode, positions: Vec<Point>) -> Self {
        Self {
            mode,
            positions,
            ..Default::default()
        }
    }

    pub fn with_indices(mut self, indices: Vec<u16>) -> Self {
        self.indices = indices;
        self
    }

    pub fn with_texture_coordinates(mut self, texture_coordinates: Vec<Point>) -> Self {
        self.texture_coordinates = texture_coordinates;
        self
    }

    pub fn with_colors(mut self, colors: Vec<Color>) -> Self {
        self.colors = colors;
        self
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    pub fn has_texture_coordinates(&self) -> bool {
        !self.texture_coordinates.is_empty()
    }

    pub fn bounds(&self) -> Option<Rect> {
        Rect::from_points(&self.positions)
    }

    fn primitive_type(&self) -> PrimitiveType {
        match self.mode {
            VertexMode::TriangleStrip => PrimitiveType::TriangleStrip,
            VertexMode::Triangles | VertexMode::TriangleFan => PrimitiveType::Triangle,
        }
    }

    /// Indices to upload; fans are rewritten as triangle lists.
    fn upload_indices(&self) -> Vec<u16> {
        if self.mode != VertexMode::TriangleFan {
            return self.indices.clone();
        }
        let fan: Vec<u16> = if self.indices.is_empty() {
            (0..self.positions.len().min(u16::MAX as usize + 1))
                .map(|i| i as u16)
                .collect()
        } else {
            self.indices.clone()
        };
        let mut triangles = Vec::with_capacity(fan.len().saturating_sub(2) * 3);
        for pair in fan.get(1..).unwrap_or(&[]).windows(2) {
            triangles.extend_from_slice(&[fan[0], pair[0], pair[1]]);
        }
        triangles
    }

    fn upload<V: bytemuck::Pod>(
        &self,
        ctx: &GeometryContext<'_>,
        label: &str,
        layout: VertexLayout,
        vertices: &[V],
        transform: &Affine2D,
    ) -> GeometryResult {
        let indices = self.upload_indices();
        let index_data = if indices.is_empty() {
            IndexData::None
        } else {
            IndexData::U16(&indices)
        };
        GeometryResult {
            primitive_type: self.primitive_type(),
            vertex_buffer: VertexBuffer::create(ctx.allocator, label, layout, vertices, index_data),
            transform: *transform,
            winding_rule: None,
        }
    }

    pub fn position_buffer(&self, ctx: &mut GeometryContext<'_>, transform: &Affine2D) -> GeometryResult {
        let vertices: Vec<SolidVertex> = self.positions.iter().map(|p| SolidVertex::new(*p)).collect();
        self.upload(ctx, "Vertices", VertexLayout::Position, &vertices, transform)
    }

    /// Positions with per-vertex colors; missing colors use `fallback`.
    pub fn position_color_buffer(
        &self,
        ctx: &mut GeometryContext<'_>,
        transform: &Affine2D,
        fallback: Color,
    ) -> GeometryResult {
        let vertices: Vec<ColorVertex> = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| ColorVertex {
                position: [p.x, p.y],
                color: vertex_colors_or(&self.colors, i, fallback).to_array(),
            })
            .collect();
        self.upload(ctx, "Vertices (Color)", VertexLayout::PositionColor, &vertices, transform)
    }

    /// Positions with texture coordinates normalized by `texture_size`.
    ///
    /// Without explicit coordinates the positions themselves are used.
    pub fn position_uv_buffer(
        &self,
        ctx: &mut GeometryContext<'_>,
        transform: &Affine2D,
        texture_size: ISize,
    ) -> GeometryResult {
        let size = texture_size.to_size();
        let sx = if size.width > 0.0 { 1.0 / size.width } else { 0.0 };
        let sy = if size.height > 0.0 { 1.0 / size.height } else { 0.0 };
        let vertices: Vec<TextureVertex> = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let uv = self.texture_coordinates.get(i).copied().unwrap_or(*p);
                TextureVertex {
                    position: [p.x, p.y],
                    uv: [uv.x * sx, uv.y * sy],
                }
            })
            .collect();
        self.upload(ctx, "Vertices (UV)", VertexLayout::PositionUv, &vertices, transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HostAllocator;
    use crate::tessellator::Tessellator;

    #[test]
    fn test_fan_becomes_triangle_list() {
        let vertices = Vertices::new(
            VertexMode::TriangleFan,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
        );
        assert_eq!(vertices.upload_indices(), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_color_buffer_layout() {
        let allocator = HostAllocator::default();
        let mut tessellator = Tessellator::default();
        let mut ctx = GeometryContext {
            allocator: &allocator,
            tessellator: &mut tessellator,
            target_size: ISize::new(16, 16),
        };
        let vertices = Vertices::new(
            VertexMode::Triangles,
            vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(0.0, 4.0)],
        )
        .with_colors(vec![Color::RED]);
        let result = vertices.position_color_buffer(&mut ctx, &Affine2D::IDENTITY, Color::BLUE);
        assert_eq!(result.vertex_buffer.layout, VertexLayout::PositionColor);
        let last: ColorVertex = result.vertex_buffer.read_vertex(2).unwrap();
        assert_eq!(last.color, Color::BLUE.to_array());
    }
}
