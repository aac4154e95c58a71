use quill_core::{Affine2D, BlendMode, Rect};
use quill_gpu::RenderPass;

use crate::content_context::ContentContext;
use crate::contents::Contents;

/// Contents placed in device space
#[derive(Clone, Debug)]
pub struct Entity {
    /// Local space to device space
    pub transform: Affine2D,
    /// Number of clips applied when the entity was recorded
    pub clip_depth: u32,
    pub blend_mode: BlendMode,
    pub contents: Contents,
}

impl Entity {
    pub fn new(contents: Contents) -> Self {
        Self {
            transform: Affine2D::IDENTITY,
            clip_depth: 0,
            blend_mode: BlendMode::SourceOver,
            contents,
        }
    }

    pub fn with_transform(mut self, transform: Affine2D) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_clip_depth(mut self, clip_depth: u32) -> Self {
        self.clip_depth = clip_depth;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Device-space bounds of what the entity paints
    pub fn coverage(&self) -> Option<Rect> {
        self.contents.coverage(&self.transform)
    }

    /// Record the entity into `pass`.
    ///
    /// `pass_transform` maps device space to the pass's pixels and
    /// `base_clip_depth` is the clip depth the pass's stencil starts at.
    pub(crate) fn render(
        &self,
        ctx: &mut ContentContext<'_>,
        pass_transform: &Affine2D,
        base_clip_depth: u32,
        pass: &mut RenderPass,
    ) -> bool {
        let transform = pass_transform.then(&self.transform);
        let stencil_reference = self.clip_depth.saturating_sub(base_clip_depth);
        self.contents
            .render(ctx, &transform, self.blend_mode, stencil_reference, pass)
    }
}
