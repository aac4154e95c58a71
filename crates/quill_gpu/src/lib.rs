//! Quill GPU Layer
//!
//! Everything between a vector [`Path`](quill_core::Path) and a recorded draw:
//!
//! ```text
//! Path ──► Polyline ──► Tessellator / Geometry ──► VertexBuffer
//!                                                     │
//!                 RenderTargetCache ──► RenderTarget  ▼
//!                                          RenderPass (ordered Commands)
//!                                                     │
//!                                                     ▼
//!                                                  Backend
//! ```
//!
//! The GPU itself is consumed through the [`Backend`] and [`Allocator`] traits.
//! [`SoftwareBackend`] executes render passes on host memory and is used for
//! headless rendering and tests.

pub mod allocator;
pub mod backend;
pub mod command;
pub mod geometry;
pub mod render_target;
pub mod render_target_cache;
pub mod software;
pub mod tessellator;
pub mod trig;

#[cfg(feature = "wgpu")]
pub mod wgpu_allocator;

pub use allocator::{
    Allocator, BufferDescriptor, DeviceBuffer, HostAllocator, PixelFormat, StorageMode, Texture,
    TextureDescriptor, TextureId, TextureUsage,
};
pub use backend::Backend;
pub use command::{
    ColorVertex, Command, GradientStop, IndexData, IndexType, PipelineDescriptor, PrimitiveType,
    RenderPass, SamplerMode, ShaderBinding, SolidVertex, StencilMode, TextureFilter, TextureVertex,
    TileMode, VertexBuffer, VertexLayout,
};
pub use geometry::{
    create_stroke_vertices, Cap, Geometry, GeometryContext, GeometryResult, Join, StrokeStyle,
    Vertices, VertexMode,
};
pub use render_target::{
    AttachmentConfig, ColorAttachment, LoadAction, RenderTarget, RenderTargetConfig,
    StencilAttachment, StoreAction,
};
pub use render_target_cache::{RenderTargetCache, RenderTargetCacheStats};
pub use software::SoftwareBackend;
pub use tessellator::{
    compute_quadrant_divisions, EllipticalVertexGenerator, MAX_QUADRANT_DIVISIONS, TessellatedVertices, Tessellator,
    TessellatorConfig, TessellatorResult,
};
pub use trig::{Trig, Trigs};
#[cfg(feature = "wgpu")]
pub use wgpu_allocator::WgpuAllocator;

use thiserror::Error;

/// GPU layer errors
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Failed to allocate {0}")]
    AllocationFailed(String),

    #[error("Render pass '{0}' has an invalid target")]
    InvalidRenderTarget(String),

    #[error("Command '{0}' references a missing resource")]
    MissingResource(String),

    #[error("Render pass submission failed: {0}")]
    SubmitFailed(String),
}

pub type Result<T> = std::result::Result<T, GpuError>;
