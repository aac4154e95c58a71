//! Frame-scoped reuse of offscreen render targets
//!
//! Call [`RenderTargetCache::start`] at the beginning of a frame and
//! [`RenderTargetCache::end`] when it is done. Between the two, offscreen
//! requests are served from targets created in earlier frames when the
//! configuration matches exactly; each cached target is handed out at most
//! once per frame. Targets not requested during a frame are released at its
//! end.

use std::sync::Arc;

use quill_core::ISize;

use crate::allocator::{Allocator, Texture};
use crate::render_target::{AttachmentConfig, RenderTarget, RenderTargetConfig};

/// Statistics for cache performance monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderTargetCacheStats {
    /// Requests served from an existing target
    pub hits: u64,
    /// Requests that allocated a new target
    pub misses: u64,
    /// Targets dropped at the end of a frame
    pub evictions: u64,
}

impl RenderTargetCacheStats {
    /// Cache hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct RenderTargetData {
    used_this_frame: bool,
    config: RenderTargetConfig,
    render_target: RenderTarget,
}

/// Reuses offscreen render targets across frames
#[derive(Debug, Default)]
pub struct RenderTargetCache {
    data: Vec<RenderTargetData>,
    stats: RenderTargetCacheStats,
}

impl RenderTargetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every cached target as available for this frame.
    pub fn start(&mut self) {
        for entry in &mut self.data {
            entry.used_this_frame = false;
        }
    }

    /// Drop every cached target that was not handed out this frame.
    pub fn end(&mut self) {
        let before = self.data.len();
        self.data.retain(|entry| entry.used_this_frame);
        let evicted = before - self.data.len();
        if evicted > 0 {
            tracing::debug!(evicted, retained = self.data.len(), "Evicted render targets");
        }
        self.stats.evictions += evicted as u64;
    }

    /// Number of targets currently owned by the cache.
    pub fn cached_target_count(&self) -> usize {
        self.data.len()
    }

    pub fn stats(&self) -> &RenderTargetCacheStats {
        &self.stats
    }

    fn take_match(&mut self, config: &RenderTargetConfig) -> Option<&RenderTarget> {
        let entry = self
            .data
            .iter_mut()
            .find(|entry| !entry.used_this_frame && entry.config == *config)?;
        entry.used_this_frame = true;
        Some(&entry.render_target)
    }

    fn remember(&mut self, config: RenderTargetConfig, render_target: &RenderTarget) {
        self.data.push(RenderTargetData {
            used_this_frame: true,
            config,
            render_target: render_target.clone(),
        });
    }

    /// Single-sampled offscreen target.
    pub fn create_offscreen(
        &mut self,
        allocator: &dyn Allocator,
        size: ISize,
        mip_count: u32,
        label: &str,
        color_config: AttachmentConfig,
        stencil_config: Option<AttachmentConfig>,
    ) -> Option<RenderTarget> {
        let config = RenderTargetConfig {
            size,
            mip_count: mip_count.max(1),
            has_msaa: false,
            has_depth_stencil: stencil_config.is_some(),
        };

        if let Some(cached) = self.take_match(&config) {
            let color: Arc<Texture> = cached.color.texture.clone();
            let stencil = cached.stencil.as_ref().map(|s| s.texture.clone());
            self.stats.hits += 1;
            // Attachment load/store actions come from this request, storage
            // from the cached target.
            return RenderTarget::create_offscreen(
                allocator,
                size,
                config.mip_count,
                label,
                color_config,
                stencil_config,
                Some(color),
                stencil,
            );
        }

        self.stats.misses += 1;
        let target = RenderTarget::create_offscreen(
            allocator,
            size,
            config.mip_count,
            label,
            color_config,
            stencil_config,
            None,
            None,
        )?;
        self.remember(config, &target);
        Some(target)
    }

    /// Multisampled offscreen target with a resolve texture.
    #[allow(clippy::too_many_arguments)]
    pub fn create_offscreen_msaa(
        &mut self,
        allocator: &dyn Allocator,
        size: ISize,
        mip_count: u32,
        label: &str,
        sample_count: u32,
        color_config: AttachmentConfig,
        stencil_config: Option<AttachmentConfig>,
    ) -> Option<RenderTarget> {
        let config = RenderTargetConfig {
            size,
            mip_count: mip_count.max(1),
            has_msaa: true,
            has_depth_stencil: stencil_config.is_some(),
        };

        if let Some(cached) = self.take_match(&config) {
            let color = cached.color.texture.clone();
            let resolve = cached.color.resolve_texture.clone();
            let stencil = cached.stencil.as_ref().map(|s| s.texture.clone());
            self.stats.hits += 1;
            return RenderTarget::create_offscreen_msaa(
                allocator,
                size,
                config.mip_count,
                label,
                sample_count,
                color_config,
                stencil_config,
                Some(color),
                resolve,
                stencil,
            );
        }

        self.stats.misses += 1;
        let target = RenderTarget::create_offscreen_msaa(
            allocator,
            size,
            config.mip_count,
            label,
            sample_count,
            color_config,
            stencil_config,
            None,
            None,
            None,
        )?;
        self.remember(config, &target);
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HostAllocator;

    fn offscreen(
        cache: &mut RenderTargetCache,
        allocator: &HostAllocator,
        size: ISize,
    ) -> RenderTarget {
        cache
            .create_offscreen(
                allocator,
                size,
                1,
                "Test",
                AttachmentConfig::color(),
                Some(AttachmentConfig::stencil()),
            )
            .unwrap()
    }

    #[test]
    fn test_reuse_across_frames() {
        let allocator = HostAllocator::default();
        let mut cache = RenderTargetCache::new();

        cache.start();
        let first = offscreen(&mut cache, &allocator, ISize::new(100, 100));
        cache.end();

        cache.start();
        let second = offscreen(&mut cache, &allocator, ISize::new(100, 100));
        cache.end();

        assert!(Arc::ptr_eq(&first.color.texture, &second.color.texture));
        assert_eq!(allocator.textures_created(), 2);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_same_frame_requests_get_distinct_targets() {
        let allocator = HostAllocator::default();
        let mut cache = RenderTargetCache::new();

        cache.start();
        let a = offscreen(&mut cache, &allocator, ISize::new(10, 10));
        let b = offscreen(&mut cache, &allocator, ISize::new(10, 10));
        cache.end();

        assert!(!Arc::ptr_eq(&a.color.texture, &b.color.texture));
        assert_eq!(cache.cached_target_count(), 2);
    }

    #[test]
    fn test_unused_targets_evicted() {
        let allocator = HostAllocator::default();
        let mut cache = RenderTargetCache::new();

        cache.start();
        offscreen(&mut cache, &allocator, ISize::new(10, 10));
        offscreen(&mut cache, &allocator, ISize::new(20, 20));
        cache.end();
        assert_eq!(cache.cached_target_count(), 2);

        cache.start();
        offscreen(&mut cache, &allocator, ISize::new(10, 10));
        cache.end();
        assert_eq!(cache.cached_target_count(), 1);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_config_mismatch_allocates() {
        let allocator = HostAllocator::default();
        let mut cache = RenderTargetCache::new();

        cache.start();
        offscreen(&mut cache, &allocator, ISize::new(10, 10));
        cache.end();

        cache.start();
        cache
            .create_offscreen(
                &allocator,
                ISize::new(10, 10),
                1,
                "No stencil",
                AttachmentConfig::color(),
                None,
            )
            .unwrap();
        cache.end();

        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_failed_allocation_not_cached() {
        let allocator = HostAllocator::default().with_texture_budget(0);
        let mut cache = RenderTargetCache::new();
        cache.start();
        assert!(cache
            .create_offscreen(
                &allocator,
                ISize::new(10, 10),
                1,
                "Test",
                AttachmentConfig::color(),
                None,
            )
            .is_none());
        cache.end();
        assert_eq!(cache.cached_target_count(), 0);
    }
}
