//! Device resources and the allocator that creates them
//!
//! Textures and buffers are reference counted. Identity is the [`TextureId`],
//! assigned once at creation, so backends can key their own storage on it.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use quill_core::ISize;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a texture for the life of the process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Texel format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    #[default]
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    /// 8-bit stencil
    S8Uint,
    D32FloatS8Uint,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Rgba8Unorm | PixelFormat::Bgra8Unorm => 4,
            PixelFormat::Rgba16Float => 8,
            PixelFormat::S8Uint => 1,
            PixelFormat::D32FloatS8Uint => 5,
        }
    }

    pub fn is_stencil(&self) -> bool {
        matches!(self, PixelFormat::S8Uint | PixelFormat::D32FloatS8Uint)
    }
}

/// Where the texture memory lives
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StorageMode {
    HostVisible,
    #[default]
    DevicePrivate,
    /// Tile memory only; contents never leave the render pass
    DeviceTransient,
}

/// How a texture may be bound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureUsage {
    pub render_target: bool,
    pub shader_read: bool,
}

impl TextureUsage {
    pub const RENDER_TARGET: TextureUsage = TextureUsage {
        render_target: true,
        shader_read: false,
    };
    pub const SHADER_READ: TextureUsage = TextureUsage {
        render_target: false,
        shader_read: true,
    };
    pub const RENDER_TARGET_AND_SHADER_READ: TextureUsage = TextureUsage {
        render_target: true,
        shader_read: true,
    };
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::SHADER_READ
    }
}

/// Texture creation parameters
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub label: String,
    pub size: ISize,
    pub format: PixelFormat,
    pub storage_mode: StorageMode,
    pub usage: TextureUsage,
    pub mip_count: u32,
    pub sample_count: u32,
}

impl TextureDescriptor {
    pub fn new(label: impl Into<String>, size: ISize, format: PixelFormat) -> Self {
        Self {
            label: label.into(),
            size,
            format,
            storage_mode: StorageMode::default(),
            usage: TextureUsage::default(),
            mip_count: 1,
            sample_count: 1,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.size.is_empty() && self.mip_count >= 1 && self.sample_count >= 1
    }

    /// Estimated memory footprint in bytes
    pub fn byte_size(&self) -> u64 {
        self.size.area() * self.format.bytes_per_pixel() as u64 * self.sample_count as u64
    }
}

/// A device texture
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    descriptor: TextureDescriptor,
    #[cfg(feature = "wgpu")]
    raw: Option<wgpu::Texture>,
}

impl Texture {
    pub(crate) fn new(descriptor: TextureDescriptor) -> Self {
        Self {
            id: TextureId::next(),
            descriptor,
            #[cfg(feature = "wgpu")]
            raw: None,
        }
    }

    #[cfg(feature = "wgpu")]
    pub(crate) fn with_raw(descriptor: TextureDescriptor, raw: wgpu::Texture) -> Self {
        Self {
            id: TextureId::next(),
            descriptor,
            raw: Some(raw),
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    pub fn size(&self) -> ISize {
        self.descriptor.size
    }

    #[cfg(feature = "wgpu")]
    pub fn raw(&self) -> Option<&wgpu::Texture> {
        self.raw.as_ref()
    }
}

/// Buffer creation parameters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: String,
    pub size: usize,
    pub storage_mode: StorageMode,
}

/// A device buffer holding vertex and index data
///
/// The host copy of the contents is always retained; it is what the software
/// backend reads.
#[derive(Debug)]
pub struct DeviceBuffer {
    id: u64,
    descriptor: BufferDescriptor,
    contents: Vec<u8>,
    #[cfg(feature = "wgpu")]
    raw: Option<wgpu::Buffer>,
}

impl DeviceBuffer {
    pub(crate) fn new(descriptor: BufferDescriptor, contents: &[u8]) -> Self {
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            descriptor,
            contents: contents.to_vec(),
            #[cfg(feature = "wgpu")]
            raw: None,
        }
    }

    #[cfg(feature = "wgpu")]
    pub(crate) fn with_raw(descriptor: BufferDescriptor, contents: &[u8], raw: wgpu::Buffer) -> Self {
        let mut buffer = Self::new(descriptor, contents);
        buffer.raw = Some(raw);
        buffer
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    #[cfg(feature = "wgpu")]
    pub fn raw(&self) -> Option<&wgpu::Buffer> {
        self.raw.as_ref()
    }
}

/// Creates device resources
///
/// Allocation failure is reported as `None`; callers treat it as "skip this
/// work" rather than as an error.
pub trait Allocator {
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<Texture>>;

    fn create_buffer(&self, descriptor: &BufferDescriptor, contents: &[u8])
        -> Option<Arc<DeviceBuffer>>;

    fn max_texture_size(&self) -> ISize;
}

/// Allocator backed by host memory
///
/// Used together with [`SoftwareBackend`](crate::SoftwareBackend). An optional
/// texture budget makes allocation fail after a fixed number of textures,
/// which is how resource exhaustion is exercised in tests.
#[derive(Debug)]
pub struct HostAllocator {
    max_texture_size: ISize,
    texture_budget: Option<usize>,
    textures_created: AtomicUsize,
    buffers_created: AtomicUsize,
    bytes_allocated: AtomicU64,
}

impl HostAllocator {
    pub fn new(max_texture_size: ISize) -> Self {
        Self {
            max_texture_size,
            texture_budget: None,
            textures_created: AtomicUsize::new(0),
            buffers_created: AtomicUsize::new(0),
            bytes_allocated: AtomicU64::new(0),
        }
    }

    /// Fail every texture allocation after `budget` successful ones.
    pub fn with_texture_budget(mut self, budget: usize) -> Self {
        self.texture_budget = Some(budget);
        self
    }

    pub fn set_texture_budget(&mut self, budget: Option<usize>) {
        self.texture_budget = budget;
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created.load(Ordering::Relaxed)
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created.load(Ordering::Relaxed)
    }

    pub fn bytes_allocated(&self) -> u64 {
        self.bytes_allocated.load(Ordering::Relaxed)
    }
}

impl Default for HostAllocator {
    fn default() -> Self {
        Self::new(ISize::new(8192, 8192))
    }
}

impl Allocator for HostAllocator {
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<Texture>> {
        if !descriptor.is_valid() {
            tracing::warn!(label = %descriptor.label, "Rejected invalid texture descriptor");
            return None;
        }
        if descriptor.size.width > self.max_texture_size.width
            || descriptor.size.height > self.max_texture_size.height
        {
            tracing::warn!(
                label = %descriptor.label,
                width = descriptor.size.width,
                height = descriptor.size.height,
                "Texture exceeds maximum size"
            );
            return None;
        }
        if let Some(budget) = self.texture_budget {
            if self.textures_created() >= budget {
                tracing::warn!(label = %descriptor.label, budget, "Texture budget exhausted");
                return None;
            }
        }

        self.textures_created.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated
            .fetch_add(descriptor.byte_size(), Ordering::Relaxed);
        Some(Arc::new(Texture::new(descriptor.clone())))
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        contents: &[u8],
    ) -> Option<Arc<DeviceBuffer>> {
        self.buffers_created.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated
            .fetch_add(contents.len() as u64, Ordering::Relaxed);
        Some(Arc::new(DeviceBuffer::new(descriptor.clone(), contents)))
    }

    fn max_texture_size(&self) -> ISize {
        self.max_texture_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_ids_are_unique() {
        let allocator = HostAllocator::default();
        let desc = TextureDescriptor::new("a", ISize::new(4, 4), PixelFormat::Rgba8Unorm);
        let a = allocator.create_texture(&desc).unwrap();
        let b = allocator.create_texture(&desc).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(allocator.textures_created(), 2);
    }

    #[test]
    fn test_budget_exhaustion() {
        let allocator = HostAllocator::default().with_texture_budget(1);
        let desc = TextureDescriptor::new("a", ISize::new(4, 4), PixelFormat::Rgba8Unorm);
        assert!(allocator.create_texture(&desc).is_some());
        assert!(allocator.create_texture(&desc).is_none());
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let allocator = HostAllocator::new(ISize::new(16, 16));
        let empty = TextureDescriptor::new("e", ISize::new(0, 4), PixelFormat::Rgba8Unorm);
        let big = TextureDescriptor::new("b", ISize::new(32, 4), PixelFormat::Rgba8Unorm);
        assert!(allocator.create_texture(&empty).is_none());
        assert!(allocator.create_texture(&big).is_none());
    }
}
