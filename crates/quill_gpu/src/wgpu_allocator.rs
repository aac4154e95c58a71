//! Allocator creating real wgpu resources
//!
//! Host copies of buffer contents are kept alongside the device buffers so
//! recorded passes can still be inspected or replayed on the host.

use std::sync::Arc;

use quill_core::ISize;
use wgpu::util::DeviceExt;

use crate::allocator::{
    Allocator, BufferDescriptor, DeviceBuffer, PixelFormat, Texture, TextureDescriptor,
};

pub struct WgpuAllocator {
    device: Arc<wgpu::Device>,
}

impl WgpuAllocator {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }
}

fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::S8Uint => wgpu::TextureFormat::Stencil8,
        PixelFormat::D32FloatS8Uint => wgpu::TextureFormat::Depth32FloatStencil8,
    }
}

impl Allocator for WgpuAllocator {
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<Texture>> {
        if !descriptor.is_valid() {
            tracing::warn!(label = %descriptor.label, "Rejected invalid texture descriptor");
            return None;
        }
        let max = self.max_texture_size();
        if descriptor.size.width > max.width || descriptor.size.height > max.height {
            tracing::warn!(
                label = %descriptor.label,
                width = descriptor.size.width,
                height = descriptor.size.height,
                "Texture exceeds maximum size"
            );
            return None;
        }

        let mut usage = wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
        if descriptor.usage.render_target {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        if descriptor.usage.shader_read && descriptor.sample_count == 1 {
            usage |= wgpu::TextureUsages::TEXTURE_BINDING;
        }

        let raw = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&descriptor.label),
            size: wgpu::Extent3d {
                width: descriptor.size.width,
                height: descriptor.size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: descriptor.mip_count,
            sample_count: descriptor.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(descriptor.format),
            usage,
            view_formats: &[],
        });
        Some(Arc::new(Texture::with_raw(descriptor.clone(), raw)))
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        contents: &[u8],
    ) -> Option<Arc<DeviceBuffer>> {
        if contents.is_empty() {
            return None;
        }
        let raw = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&descriptor.label),
                contents,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::INDEX,
            });
        Some(Arc::new(DeviceBuffer::with_raw(
            descriptor.clone(),
            contents,
            raw,
        )))
    }

    fn max_texture_size(&self) -> ISize {
        let side = self.device.limits().max_texture_dimension_2d;
        ISize::new(side, side)
    }
}
