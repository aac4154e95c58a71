//! Recorded draw commands and render passes

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use quill_core::{Affine2D, BlendMode, Color, FillType, Point};

use crate::allocator::{Allocator, BufferDescriptor, DeviceBuffer, Texture};
use crate::render_target::RenderTarget;

// ─────────────────────────────────────────────────────────────────────────────
// Vertex Formats
// ─────────────────────────────────────────────────────────────────────────────

/// Position-only vertex, used by all geometry
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SolidVertex {
    pub position: [f32; 2],
}

impl SolidVertex {
    pub fn new(point: Point) -> Self {
        Self {
            position: [point.x, point.y],
        }
    }
}

/// Vertex with texture coordinates (glyph quads, textured vertices)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TextureVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Vertex with a per-vertex color (straight alpha)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    #[default]
    Position,
    PositionUv,
    PositionColor,
}

impl VertexLayout {
    pub fn stride(&self) -> usize {
        match self {
            VertexLayout::Position => std::mem::size_of::<SolidVertex>(),
            VertexLayout::PositionUv => std::mem::size_of::<TextureVertex>(),
            VertexLayout::PositionColor => std::mem::size_of::<ColorVertex>(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexType {
    #[default]
    None,
    U16,
    U32,
}

/// Vertex and optional index data living in one device buffer
///
/// Vertices occupy the front of the buffer, indices follow at
/// `index_offset`. With [`IndexType::None`] `vertex_count` vertices are drawn
/// in order.
#[derive(Clone, Debug, Default)]
pub struct VertexBuffer {
    pub buffer: Option<Arc<DeviceBuffer>>,
    pub layout: VertexLayout,
    pub vertex_count: usize,
    pub index_type: IndexType,
    pub index_offset: usize,
    pub index_count: usize,
}

impl VertexBuffer {
    /// Upload vertices (and optionally indices) through the allocator.
    ///
    /// Returns an empty buffer when there is nothing to draw or the
    /// allocation fails.
    pub fn create<V: Pod>(
        allocator: &dyn Allocator,
        label: &str,
        layout: VertexLayout,
        vertices: &[V],
        indices: IndexData<'_>,
    ) -> VertexBuffer {
        if vertices.is_empty() {
            return VertexBuffer::default();
        }
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let (index_type, index_count, index_bytes): (IndexType, usize, &[u8]) = match indices {
            IndexData::None => (IndexType::None, 0, &[]),
            IndexData::U16(indices) => (IndexType::U16, indices.len(), bytemuck::cast_slice(indices)),
            IndexData::U32(indices) => (IndexType::U32, indices.len(), bytemuck::cast_slice(indices)),
        };

        let mut contents = Vec::with_capacity(vertex_bytes.len() + index_bytes.len());
        contents.extend_from_slice(vertex_bytes);
        contents.extend_from_slice(index_bytes);

        let descriptor = BufferDescriptor {
            label: label.to_string(),
            size: contents.len(),
            ..Default::default()
        };
        let Some(buffer) = allocator.create_buffer(&descriptor, &contents) else {
            tracing::warn!(label, bytes = contents.len(), "Vertex buffer allocation failed");
            return VertexBuffer::default();
        };

        VertexBuffer {
            buffer: Some(buffer),
            layout,
            vertex_count: vertices.len(),
            index_type,
            index_offset: vertex_bytes.len(),
            index_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_none() || self.vertex_count == 0
    }

    /// Number of vertices the draw will consume.
    pub fn element_count(&self) -> usize {
        match self.index_type {
            IndexType::None => self.vertex_count,
            IndexType::U16 | IndexType::U32 => self.index_count,
        }
    }

    /// Read vertex `index` back from host memory.
    pub fn read_vertex<V: Pod>(&self, index: usize) -> Option<V> {
        let buffer = self.buffer.as_ref()?;
        let size = std::mem::size_of::<V>();
        let start = index.checked_mul(size)?;
        let bytes = buffer.contents().get(start..start + size)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    /// Resolve the vertex index of draw element `element`.
    pub fn read_index(&self, element: usize) -> Option<usize> {
        let buffer = self.buffer.as_ref()?;
        match self.index_type {
            IndexType::None => Some(element),
            IndexType::U16 => {
                let start = self.index_offset + element * 2;
                let bytes = buffer.contents().get(start..start + 2)?;
                Some(bytemuck::pod_read_unaligned::<u16>(bytes) as usize)
            }
            IndexType::U32 => {
                let start = self.index_offset + element * 4;
                let bytes = buffer.contents().get(start..start + 4)?;
                Some(bytemuck::pod_read_unaligned::<u32>(bytes) as usize)
            }
        }
    }
}

/// Borrowed index data for [`VertexBuffer::create`]
#[derive(Clone, Copy, Debug)]
pub enum IndexData<'a> {
    None,
    U16(&'a [u16]),
    U32(&'a [u32]),
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    #[default]
    Triangle,
    TriangleStrip,
}

/// Stencil behavior of a draw
///
/// Every draw tests against `stencil_reference`, which is the clip depth of
/// the entity relative to its pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilMode {
    /// Ignore the stencil buffer entirely
    Ignore,
    /// Write color where stencil == reference
    #[default]
    CompareEqual,
    /// Increment where stencil == reference, no color writes
    IncrementWhereEqual,
    /// Decrement where stencil == reference, no color writes
    DecrementWhereEqual,
    /// Set stencil to reference where stencil > reference, no color writes
    RestoreWhereGreater,
}

impl StencilMode {
    pub fn writes_color(&self) -> bool {
        matches!(self, StencilMode::Ignore | StencilMode::CompareEqual)
    }
}

/// Fixed pipeline state for one command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PipelineDescriptor {
    pub blend_mode: BlendMode,
    pub stencil_mode: StencilMode,
    pub primitive_type: PrimitiveType,
    /// When set, the command's triangles are accumulated as winding numbers
    /// and coverage is decided by this rule (stencil-then-cover fills).
    pub winding_rule: Option<FillType>,
    pub sample_count: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Shader Bindings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileMode {
    #[default]
    Clamp,
    Repeat,
    Mirror,
    Decal,
}

impl TileMode {
    /// Map a parametric coordinate into 0..=1, or `None` when it falls outside
    /// a decal.
    pub fn apply(&self, t: f32) -> Option<f32> {
        match self {
            TileMode::Clamp => Some(t.clamp(0.0, 1.0)),
            TileMode::Repeat => Some(t - t.floor()),
            TileMode::Mirror => {
                let m = t.rem_euclid(2.0);
                Some(if m > 1.0 { 2.0 - m } else { m })
            }
            TileMode::Decal => (0.0..=1.0).contains(&t).then_some(t),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SamplerMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// Per-texel operation applied by [`ShaderBinding::FilterTexture`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFilter {
    /// 4x5 row-major matrix on straight RGBA
    ColorMatrix([f32; 20]),
    /// Blend a constant color over each texel
    Blend(Color, BlendMode),
}

/// Fragment stage inputs of a command
///
/// All mapping transforms take a vertex position in the command's local
/// space.
#[derive(Clone, Debug)]
pub enum ShaderBinding {
    SolidFill {
        color: Color,
    },
    LinearGradient {
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
        tile_mode: TileMode,
        alpha: f32,
    },
    Texture {
        texture: Arc<Texture>,
        /// Local position to normalized texture coordinates
        uv_transform: Affine2D,
        sampler: SamplerMode,
        tile_mode: TileMode,
        alpha: f32,
    },
    /// Per-vertex colors from a [`VertexLayout::PositionColor`] buffer,
    /// blended with `color`
    VertexColor {
        color: Color,
        blend_mode: BlendMode,
    },
    /// Glyph quads from a [`VertexLayout::PositionUv`] buffer
    Glyph {
        atlas: Option<Arc<Texture>>,
        color: Color,
        /// Color glyphs keep their own color unless this is set
        force_color: bool,
        is_color_glyph: bool,
    },
    /// One direction of a separable gaussian blur
    GaussianBlur {
        texture: Arc<Texture>,
        uv_transform: Affine2D,
        /// Unit direction in texels
        direction: Point,
        sigma: f32,
        radius: u32,
        tile_mode: TileMode,
    },
    FilterTexture {
        texture: Arc<Texture>,
        uv_transform: Affine2D,
        filter: TextureFilter,
        alpha: f32,
    },
}

impl ShaderBinding {
    pub fn label(&self) -> &'static str {
        match self {
            ShaderBinding::SolidFill { .. } => "Solid Fill",
            ShaderBinding::LinearGradient { .. } => "Linear Gradient",
            ShaderBinding::Texture { .. } => "Texture",
            ShaderBinding::VertexColor { .. } => "Vertex Color",
            ShaderBinding::Glyph { .. } => "Glyph",
            ShaderBinding::GaussianBlur { .. } => "Gaussian Blur",
            ShaderBinding::FilterTexture { .. } => "Filter Texture",
        }
    }

    /// Textures sampled by this binding.
    pub fn textures(&self) -> Option<&Arc<Texture>> {
        match self {
            ShaderBinding::Texture { texture, .. }
            | ShaderBinding::GaussianBlur { texture, .. }
            | ShaderBinding::FilterTexture { texture, .. } => Some(texture),
            ShaderBinding::Glyph { atlas, .. } => atlas.as_ref(),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// A single draw
#[derive(Clone, Debug)]
pub struct Command {
    pub label: String,
    pub pipeline: PipelineDescriptor,
    /// Local vertex positions to render target pixels
    pub transform: Affine2D,
    pub vertex_buffer: VertexBuffer,
    pub shader: ShaderBinding,
    pub stencil_reference: u32,
}

impl Command {
    pub fn is_valid(&self) -> bool {
        !self.vertex_buffer.is_empty() && self.vertex_buffer.element_count() > 0
    }
}

/// An ordered list of commands drawing into one render target
#[derive(Clone, Debug)]
pub struct RenderPass {
    label: String,
    target: RenderTarget,
    commands: Vec<Command>,
}

impl RenderPass {
    pub fn new(label: impl Into<String>, target: RenderTarget) -> Self {
        Self {
            label: label.into(),
            target,
            commands: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn render_target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn sample_count(&self) -> u32 {
        self.target.sample_count()
    }

    /// Record a command. Commands without vertices are dropped.
    pub fn add_command(&mut self, command: Command) -> bool {
        if !command.is_valid() {
            tracing::trace!(label = %command.label, "Dropped empty command");
            return false;
        }
        self.commands.push(command);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HostAllocator;

    #[test]
    fn test_vertex_buffer_read_back() {
        let allocator = HostAllocator::default();
        let vertices = [
            SolidVertex::new(Point::new(1.0, 2.0)),
            SolidVertex::new(Point::new(3.0, 4.0)),
            SolidVertex::new(Point::new(5.0, 6.0)),
        ];
        let indices = [2u16, 1, 0];
        let buffer = VertexBuffer::create(
            &allocator,
            "Test",
            VertexLayout::Position,
            &vertices,
            IndexData::U16(&indices),
        );
        assert_eq!(buffer.element_count(), 3);
        assert_eq!(buffer.read_index(0), Some(2));
        let v: SolidVertex = buffer.read_vertex(2).unwrap();
        assert_eq!(v.position, [5.0, 6.0]);
    }

    #[test]
    fn test_empty_vertices_give_empty_buffer() {
        let allocator = HostAllocator::default();
        let buffer = VertexBuffer::create::<SolidVertex>(
            &allocator,
            "Empty",
            VertexLayout::Position,
            &[],
            IndexData::None,
        );
        assert!(buffer.is_empty());
        assert_eq!(allocator.buffers_created(), 0);
    }

    #[test]
    fn test_tile_modes() {
        assert_eq!(TileMode::Clamp.apply(1.5), Some(1.0));
        assert!((TileMode::Repeat.apply(1.25).unwrap() - 0.25).abs() < 1e-6);
        assert!((TileMode::Mirror.apply(1.25).unwrap() - 0.75).abs() < 1e-6);
        assert_eq!(TileMode::Decal.apply(1.5), None);
    }
}
