//! Render targets: the attachments a render pass draws into

use std::sync::Arc;

use quill_core::{Color, ISize};

use crate::allocator::{Allocator, PixelFormat, StorageMode, Texture, TextureDescriptor, TextureUsage};

/// What happens to attachment contents when a pass begins
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadAction {
    DontCare,
    Load,
    #[default]
    Clear,
}

/// What happens to attachment contents when a pass ends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StoreAction {
    DontCare,
    #[default]
    Store,
    MultisampleResolve,
    StoreAndMultisampleResolve,
}

impl StoreAction {
    pub fn stores(&self) -> bool {
        matches!(self, StoreAction::Store | StoreAction::StoreAndMultisampleResolve)
    }

    pub fn resolves(&self) -> bool {
        matches!(
            self,
            StoreAction::MultisampleResolve | StoreAction::StoreAndMultisampleResolve
        )
    }
}

/// How a single attachment is created
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttachmentConfig {
    pub storage_mode: StorageMode,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_color: Color,
}

impl AttachmentConfig {
    pub const fn color() -> Self {
        Self {
            storage_mode: StorageMode::DevicePrivate,
            load_action: LoadAction::Clear,
            store_action: StoreAction::Store,
            clear_color: Color::TRANSPARENT,
        }
    }

    /// Color config for a multisampled attachment that is resolved on store.
    pub const fn color_msaa() -> Self {
        Self {
            storage_mode: StorageMode::DeviceTransient,
            load_action: LoadAction::Clear,
            store_action: StoreAction::MultisampleResolve,
            clear_color: Color::TRANSPARENT,
        }
    }

    pub const fn stencil() -> Self {
        Self {
            storage_mode: StorageMode::DeviceTransient,
            load_action: LoadAction::Clear,
            store_action: StoreAction::DontCare,
            clear_color: Color::TRANSPARENT,
        }
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self::color()
    }
}

#[derive(Clone, Debug)]
pub struct ColorAttachment {
    pub texture: Arc<Texture>,
    pub resolve_texture: Option<Arc<Texture>>,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_color: Color,
}

#[derive(Clone, Debug)]
pub struct StencilAttachment {
    pub texture: Arc<Texture>,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_stencil: u32,
}

/// The shape of a render target, used as the render target cache key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetConfig {
    pub size: ISize,
    pub mip_count: u32,
    pub has_msaa: bool,
    pub has_depth_stencil: bool,
}

/// A color attachment plus optional stencil
#[derive(Clone, Debug)]
pub struct RenderTarget {
    pub color: ColorAttachment,
    pub stencil: Option<StencilAttachment>,
}

impl RenderTarget {
    pub fn size(&self) -> ISize {
        self.color.texture.size()
    }

    /// The texture holding the final image: the resolve texture for MSAA
    /// targets, the color texture otherwise.
    pub fn render_target_texture(&self) -> Arc<Texture> {
        self.color
            .resolve_texture
            .clone()
            .unwrap_or_else(|| self.color.texture.clone())
    }

    pub fn sample_count(&self) -> u32 {
        self.color.texture.descriptor().sample_count
    }

    pub fn config(&self) -> RenderTargetConfig {
        RenderTargetConfig {
            size: self.size(),
            mip_count: self.render_target_texture().descriptor().mip_count,
            has_msaa: self.color.resolve_texture.is_some(),
            has_depth_stencil: self.stencil.is_some(),
        }
    }

    /// Copy of this target whose attachments keep their previous contents
    /// when the next pass begins.
    pub fn with_load_actions(&self) -> RenderTarget {
        let mut target = self.clone();
        target.color.load_action = LoadAction::Load;
        if let Some(stencil) = target.stencil.as_mut() {
            stencil.load_action = LoadAction::Load;
        }
        target
    }

    pub fn is_valid(&self) -> bool {
        let size = self.size();
        if size.is_empty() {
            return false;
        }
        let resolve_ok = self
            .color
            .resolve_texture
            .as_ref()
            .map_or(true, |t| t.size() == size);
        let stencil_ok = self
            .stencil
            .as_ref()
            .map_or(true, |s| s.texture.size() == size);
        resolve_ok && stencil_ok
    }

    /// Create a single-sampled offscreen target.
    ///
    /// Existing textures may be passed in to rebuild a target around storage
    /// that is being reused.
    #[allow(clippy::too_many_arguments)]
    pub fn create_offscreen(
        allocator: &dyn Allocator,
        size: ISize,
        mip_count: u32,
        label: &str,
        color_config: AttachmentConfig,
        stencil_config: Option<AttachmentConfig>,
        existing_color: Option<Arc<Texture>>,
        existing_stencil: Option<Arc<Texture>>,
    ) -> Option<RenderTarget> {
        if size.is_empty() {
            return None;
        }

        let color_texture = match existing_color {
            Some(texture) => texture,
            None => {
                let mut desc = TextureDescriptor::new(
                    format!("{label} Color"),
                    size,
                    PixelFormat::Rgba8Unorm,
                );
                desc.storage_mode = color_config.storage_mode;
                desc.usage = TextureUsage::RENDER_TARGET_AND_SHADER_READ;
                desc.mip_count = mip_count.max(1);
                allocator.create_texture(&desc)?
            }
        };

        let stencil = match stencil_config {
            Some(config) => Some(StencilAttachment {
                texture: create_stencil_texture(allocator, size, label, &config, 1, existing_stencil)?,
                load_action: config.load_action,
                store_action: config.store_action,
                clear_stencil: 0,
            }),
            None => None,
        };

        Some(RenderTarget {
            color: ColorAttachment {
                texture: color_texture,
                resolve_texture: None,
                load_action: color_config.load_action,
                store_action: color_config.store_action,
                clear_color: color_config.clear_color,
            },
            stencil,
        })
    }

    /// Create a multisampled offscreen target with a single-sampled resolve
    /// texture.
    #[allow(clippy::too_many_arguments)]
    pub fn create_offscreen_msaa(
        allocator: &dyn Allocator,
        size: ISize,
        mip_count: u32,
        label: &str,
        sample_count: u32,
        color_config: AttachmentConfig,
        stencil_config: Option<AttachmentConfig>,
        existing_color: Option<Arc<Texture>>,
        existing_resolve: Option<Arc<Texture>>,
        existing_stencil: Option<Arc<Texture>>,
    ) -> Option<RenderTarget> {
        if size.is_empty() {
            return None;
        }
        let sample_count = sample_count.max(1);

        let color_texture = match existing_color {
            Some(texture) => texture,
            None => {
                let mut desc = TextureDescriptor::new(
                    format!("{label} Color (MSAA)"),
                    size,
                    PixelFormat::Rgba8Unorm,
                );
                desc.storage_mode = color_config.storage_mode;
                desc.usage = TextureUsage::RENDER_TARGET;
                desc.sample_count = sample_count;
                allocator.create_texture(&desc)?
            }
        };

        let resolve_texture = match existing_resolve {
            Some(texture) => texture,
            None => {
                let mut desc = TextureDescriptor::new(
                    format!("{label} Color (Resolve)"),
                    size,
                    PixelFormat::Rgba8Unorm,
                );
                desc.storage_mode = StorageMode::DevicePrivate;
                desc.usage = TextureUsage::RENDER_TARGET_AND_SHADER_READ;
                desc.mip_count = mip_count.max(1);
                allocator.create_texture(&desc)?
            }
        };

        let stencil = match stencil_config {
            Some(config) => Some(StencilAttachment {
                texture: create_stencil_texture(
                    allocator,
                    size,
                    label,
                    &config,
                    sample_count,
                    existing_stencil,
                )?,
                load_action: config.load_action,
                store_action: config.store_action,
                clear_stencil: 0,
            }),
            None => None,
        };

        Some(RenderTarget {
            color: ColorAttachment {
                texture: color_texture,
                resolve_texture: Some(resolve_texture),
                load_action: color_config.load_action,
                store_action: color_config.store_action,
                clear_color: color_config.clear_color,
            },
            stencil,
        })
    }
}

fn create_stencil_texture(
    allocator: &dyn Allocator,
    size: ISize,
    label: &str,
    config: &AttachmentConfig,
    sample_count: u32,
    existing: Option<Arc<Texture>>,
) -> Option<Arc<Texture>> {
    if let Some(texture) = existing {
        return Some(texture);
    }
    let mut desc = TextureDescriptor::new(format!("{label} Stencil"), size, PixelFormat::S8Uint);
    desc.storage_mode = config.storage_mode;
    desc.usage = TextureUsage::RENDER_TARGET;
    desc.sample_count = sample_count;
    allocator.create_texture(&desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HostAllocator;

    #[test]
    fn test_offscreen_with_stencil() {
        let allocator = HostAllocator::default();
        let target = RenderTarget::create_offscreen(
            &allocator,
            ISize::new(32, 16),
            1,
            "Test",
            AttachmentConfig::color(),
            Some(AttachmentConfig::stencil()),
            None,
            None,
        )
        .unwrap();
        assert!(target.is_valid());
        assert_eq!(target.size(), ISize::new(32, 16));
        assert!(target.config().has_depth_stencil);
        assert!(!target.config().has_msaa);
    }

    #[test]
    fn test_msaa_target_resolves() {
        let allocator = HostAllocator::default();
        let target = RenderTarget::create_offscreen_msaa(
            &allocator,
            ISize::new(8, 8),
            1,
            "Test",
            4,
            AttachmentConfig::color_msaa(),
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(target.sample_count(), 4);
        assert!(target.config().has_msaa);
        assert_eq!(
            target.render_target_texture().id(),
            target.color.resolve_texture.as_ref().unwrap().id()
        );
    }

    #[test]
    fn test_empty_size_fails() {
        let allocator = HostAllocator::default();
        assert!(RenderTarget::create_offscreen(
            &allocator,
            ISize::new(0, 0),
            1,
            "Empty",
            AttachmentConfig::color(),
            None,
            None,
            None,
        )
        .is_none());
    }
}
