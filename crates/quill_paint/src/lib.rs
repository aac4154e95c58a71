//! Quill Paint/Canvas API
//!
//! Records drawing commands into a tree of entity passes and rasterizes the
//! result through a [`quill_gpu::Backend`].
//!
//! # Features
//!
//! - Save/restore and save layers with blend modes, opacity and filters
//! - Stencil clipping with intersect and difference operations
//! - Fills and strokes with solid colors, linear gradients and images
//! - Gaussian blur, color matrix and blend color filters
//! - Backdrop filters
//! - Positioned glyph drawing through [`TextFrame`]

pub mod canvas;
pub mod content_context;
pub mod contents;
pub mod entity;
pub mod entity_pass;
pub mod filters;
pub mod image;
pub mod paint;
pub mod picture;
pub mod text_frame;

pub use canvas::Canvas;
pub use content_context::{ContentContext, RendererConfig};
pub use contents::{ClipOperation, Contents};
pub use entity::Entity;
pub use entity_pass::{Element, EntityPass};
pub use filters::{downsample_scalar, Snapshot};
pub use image::Image;
pub use paint::{
    blur_radius, ColorFilter, ColorSource, ImageFilter, MaskBlurDescriptor, Paint, PaintStyle,
    INVERT_COLOR_MATRIX,
};
pub use picture::{Picture, Renderer};
pub use text_frame::{GlyphPosition, TextFrame, TextRun};
