//! Renderer configuration and the per-frame context contents render with

use quill_core::{Affine2D, BlendMode, ISize, Rect};
use quill_gpu::{
    Allocator, AttachmentConfig, Backend, Geometry, GeometryContext, GeometryResult,
    PipelineDescriptor, RenderPass, RenderTarget, RenderTargetCache, StencilMode, StoreAction,
    Tessellator, TessellatorConfig,
};

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
}

/// Renderer configuration
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Sample count of the root target
    pub sample_count: u32,
    /// Save layers and filters also render multisampled when
    /// `sample_count > 1`
    pub msaa_offscreens: bool,
    /// Offscreen sizes are clamped to this many pixels per side
    pub max_texture_size: u32,
    pub tessellator: TessellatorConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sample_count: 1,
            msaa_offscreens: true,
            max_texture_size: 8192,
            tessellator: TessellatorConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Defaults overridden by `QUILL_SAMPLE_COUNT`, `QUILL_MAX_TEXTURE_SIZE`
    /// and `QUILL_TESSELLATOR_MAX_CONTOURS`.
    pub fn from_env() -> Self {
        let mut config = Self {
            tessellator: TessellatorConfig::from_env(),
            ..Self::default()
        };
        if let Some(count) = env_u32("QUILL_SAMPLE_COUNT") {
            config.sample_count = count.max(1);
        }
        if let Some(size) = env_u32("QUILL_MAX_TEXTURE_SIZE") {
            config.max_texture_size = size.max(1);
        }
        config
    }
}

/// Pixel size of an offscreen covering `rect`, clamped to `1..=max` per side.
///
/// Returns `None` when the rect is not finite.
pub(crate) fn offscreen_size(rect: &Rect, max: u32) -> Option<ISize> {
    let (width, height) = (rect.width(), rect.height());
    if !width.is_finite() || !height.is_finite() {
        return None;
    }
    let max = max.max(1);
    let side = |extent: f32| extent.clamp(1.0, max as f32) as u32;
    Some(ISize::new(side(width), side(height)))
}

/// Stencil attachments keep their contents so a pass can be split and
/// resumed (backdrop filters).
pub(crate) fn stencil_attachment_config() -> AttachmentConfig {
    AttachmentConfig {
        store_action: StoreAction::Store,
        ..AttachmentConfig::stencil()
    }
}

/// Borrowed renderer state available while a picture renders
pub struct ContentContext<'a> {
    backend: &'a mut dyn Backend,
    tessellator: &'a mut Tessellator,
    target_cache: &'a mut RenderTargetCache,
    config: &'a RendererConfig,
}

impl<'a> ContentContext<'a> {
    pub fn new(
        backend: &'a mut dyn Backend,
        tessellator: &'a mut Tessellator,
        target_cache: &'a mut RenderTargetCache,
        config: &'a RendererConfig,
    ) -> Self {
        Self {
            backend,
            tessellator,
            target_cache,
            config,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        self.config
    }

    pub fn allocator(&self) -> &dyn Allocator {
        self.backend.allocator()
    }

    pub fn geometry_context(&mut self, target_size: ISize) -> GeometryContext<'_> {
        GeometryContext {
            allocator: self.backend.allocator(),
            tessellator: &mut *self.tessellator,
            target_size,
        }
    }

    pub fn geometry_result(
        &mut self,
        geometry: &Geometry,
        transform: &Affine2D,
        target_size: ISize,
    ) -> GeometryResult {
        let mut ctx = self.geometry_context(target_size);
        geometry.position_buffer(&mut ctx, transform)
    }

    /// Largest offscreen side the config and the allocator both allow
    pub fn max_offscreen_extent(&self) -> u32 {
        self.config
            .max_texture_size
            .min(self.backend.allocator().max_texture_size().width)
            .max(1)
    }

    /// Offscreen size for device-space `rect`, or `None` if it is not finite.
    pub fn offscreen_size_for(&self, rect: &Rect) -> Option<ISize> {
        offscreen_size(rect, self.max_offscreen_extent())
    }

    /// Allocate an offscreen target through the render target cache.
    ///
    /// Sizes are clamped to at least 1x1 and at most the configured maximum.
    pub fn make_offscreen(&mut self, size: ISize, label: &str, with_stencil: bool) -> Option<RenderTarget> {
        let max = self.max_offscreen_extent();
        let size = ISize::new(size.width.clamp(1, max), size.height.clamp(1, max));
        let stencil = with_stencil.then(stencil_attachment_config);

        let target = if self.config.sample_count > 1 && self.config.msaa_offscreens {
            self.target_cache.create_offscreen_msaa(
                self.backend.allocator(),
                size,
                1,
                label,
                self.config.sample_count,
                AttachmentConfig::color_msaa(),
                stencil,
            )
        } else {
            self.target_cache.create_offscreen(
                self.backend.allocator(),
                size,
                1,
                label,
                AttachmentConfig::color(),
                stencil,
            )
        };
        if target.is_none() {
            tracing::warn!(
                label,
                width = size.width,
                height = size.height,
                "Failed to allocate offscreen render target"
            );
        }
        target
    }

    pub fn submit(&mut self, pass: RenderPass) -> bool {
        match self.backend.submit(pass) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, "Render pass submission failed");
                false
            }
        }
    }
}

/// Pipeline state for a draw of `result` into `pass`.
pub(crate) fn pipeline_for(
    pass: &RenderPass,
    result: &GeometryResult,
    blend_mode: BlendMode,
    stencil_mode: StencilMode,
) -> PipelineDescriptor {
    PipelineDescriptor {
        blend_mode,
        stencil_mode,
        primitive_type: result.primitive_type,
        winding_rule: result.winding_rule,
        sample_count: pass.sample_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offscreen_size_clamps_to_limits() {
        assert_eq!(
            offscreen_size(&Rect::new(0.0, 0.0, 0.2, 12.0), 64),
            Some(ISize::new(1, 12))
        );
        assert_eq!(
            offscreen_size(&Rect::new(0.0, 0.0, 1.0e9, 3.0e38), 64),
            Some(ISize::new(64, 64))
        );
    }

    #[test]
    fn test_offscreen_size_rejects_non_finite() {
        assert_eq!(offscreen_size(&Rect::new(0.0, 0.0, f32::NAN, 4.0), 64), None);
        assert_eq!(offscreen_size(&Rect::new(0.0, 0.0, 4.0, f32::INFINITY), 64), None);
    }
}
