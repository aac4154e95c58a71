//! Recorded pictures and the renderer that rasterizes them

use quill_core::{Color, ISize, Point, Rect};
use quill_gpu::{
    AttachmentConfig, Backend, PixelFormat, RenderTarget, RenderTargetCache, SoftwareBackend,
    Tessellator, TextureDescriptor, TextureUsage,
};

use crate::content_context::{stencil_attachment_config, ContentContext, RendererConfig};
use crate::entity_pass::EntityPass;
use crate::image::Image;

/// An immutable recording produced by a [`Canvas`](crate::Canvas)
#[derive(Clone, Debug, Default)]
pub struct Picture {
    pass: EntityPass,
}

impl Picture {
    pub fn new(pass: EntityPass) -> Self {
        Self { pass }
    }

    pub fn pass(&self) -> &EntityPass {
        &self.pass
    }

    /// Device-space bounds of everything the picture paints
    pub fn coverage(&self) -> Option<Rect> {
        self.pass.element_coverage()
    }

    /// Rasterize into a new image of `size` pixels.
    ///
    /// Returns `None` when `size` is empty or a render target could not be
    /// allocated.
    pub fn to_image<B: Backend>(&self, renderer: &mut Renderer<B>, size: ISize) -> Option<Image> {
        renderer.render(self, size)
    }
}

/// Owns a backend and the state reused between renders
pub struct Renderer<B: Backend = SoftwareBackend> {
    backend: B,
    tessellator: Tessellator,
    target_cache: RenderTargetCache,
    config: RendererConfig,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, RendererConfig::default())
    }

    pub fn with_config(backend: B, config: RendererConfig) -> Self {
        Self {
            backend,
            tessellator: Tessellator::new(config.tessellator.clone()),
            target_cache: RenderTargetCache::new(),
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn target_cache(&self) -> &RenderTargetCache {
        &self.target_cache
    }

    fn create_root_target(&self, size: ISize) -> Option<RenderTarget> {
        let allocator = self.backend.allocator();
        let stencil = Some(stencil_attachment_config());
        if self.config.sample_count > 1 {
            RenderTarget::create_offscreen_msaa(
                allocator,
                size,
                1,
                "Picture",
                self.config.sample_count,
                AttachmentConfig::color_msaa(),
                stencil,
                None,
                None,
                None,
            )
        } else {
            RenderTarget::create_offscreen(
                allocator,
                size,
                1,
                "Picture",
                AttachmentConfig::color(),
                stencil,
                None,
                None,
            )
        }
    }

    pub fn render(&mut self, picture: &Picture, size: ISize) -> Option<Image> {
        if size.is_empty() {
            tracing::warn!(width = size.width, height = size.height, "Refusing to render an empty picture size");
            return None;
        }
        let Some(target) = self.create_root_target(size) else {
            tracing::warn!(width = size.width, height = size.height, "Failed to allocate picture render target");
            return None;
        };

        self.target_cache.start();
        let rendered = {
            let mut ctx = ContentContext::new(
                &mut self.backend,
                &mut self.tessellator,
                &mut self.target_cache,
                &self.config,
            );
            picture.pass.render(&mut ctx, &target, Point::ZERO, None)
        };
        self.target_cache.end();

        if !rendered {
            tracing::warn!(backend = self.backend.name(), "Picture rendering failed");
            return None;
        }
        tracing::debug!(
            width = size.width,
            height = size.height,
            entities = picture.pass.entity_count(),
            cached_targets = self.target_cache.cached_target_count(),
            "Rendered picture"
        );
        Some(Image::new(target.render_target_texture()))
    }
}

impl Renderer<SoftwareBackend> {
    /// Renderer over a fresh [`SoftwareBackend`]
    pub fn software() -> Self {
        Self::new(SoftwareBackend::default())
    }

    /// Upload straight-alpha, row-major pixels as an image.
    pub fn create_image(&mut self, size: ISize, pixels: &[Color]) -> Option<Image> {
        let mut descriptor = TextureDescriptor::new("Image", size, PixelFormat::Rgba8Unorm);
        descriptor.usage = TextureUsage::RENDER_TARGET_AND_SHADER_READ;
        let texture = self.backend.allocator().create_texture(&descriptor)?;
        self.backend
            .write_pixels(&texture, pixels)
            .then(|| Image::new(texture))
    }

    /// Straight-alpha pixels of `image`, row-major
    pub fn read_pixels(&self, image: &Image) -> Option<Vec<Color>> {
        self.backend.read_pixels(image.texture())
    }

    pub fn read_pixel(&self, image: &Image, x: u32, y: u32) -> Option<Color> {
        self.backend.read_pixel(image.texture(), x, y)
    }
}
