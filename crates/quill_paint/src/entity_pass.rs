//! Entity passes: the tree of entities and save layers a canvas records
//!
//! Each [`EntityPass`] renders into its own target. Subpasses are rendered
//! into offscreen targets sized to their coverage, filtered, and composited
//! back into the parent as a single textured draw.

use quill_core::{Affine2D, BlendMode, Point, Rect};
use quill_gpu::{RenderPass, RenderTarget};

use crate::content_context::ContentContext;
use crate::entity::Entity;
use crate::filters::{apply_color_filter, apply_image_filter, snapshot_command, Snapshot};
use crate::paint::{ColorFilter, ImageFilter};

#[derive(Clone, Debug)]
pub enum Element {
    Entity(Entity),
    Subpass(Box<EntityPass>),
}

#[derive(Clone, Debug)]
pub struct EntityPass {
    elements: Vec<Element>,
    /// Blend used to composite the pass into its parent
    pub blend_mode: BlendMode,
    pub opacity: f32,
    pub color_filter: Option<ColorFilter>,
    pub image_filter: Option<ImageFilter>,
    /// Applied to the parent's contents and drawn underneath this pass
    pub backdrop_filter: Option<ImageFilter>,
    /// Device-space limit on the pass's size
    pub bounds_limit: Option<Rect>,
    /// Canvas transform when the pass was created; scales filter sigmas
    pub transform: Affine2D,
    /// Clip depth of the parent when the pass was created
    pub clip_depth: u32,
}

impl Default for EntityPass {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            blend_mode: BlendMode::SourceOver,
            opacity: 1.0,
            color_filter: None,
            image_filter: None,
            backdrop_filter: None,
            bounds_limit: None,
            transform: Affine2D::IDENTITY,
            clip_depth: 0,
        }
    }
}

impl EntityPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.elements.push(Element::Entity(entity));
    }

    pub fn add_subpass(&mut self, pass: EntityPass) {
        self.elements.push(Element::Subpass(Box::new(pass)));
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Total entities recorded in this pass and its subpasses
    pub fn entity_count(&self) -> usize {
        self.elements
            .iter()
            .map(|element| match element {
                Element::Entity(_) => 1,
                Element::Subpass(pass) => pass.entity_count(),
            })
            .sum()
    }

    /// Union of everything the elements paint, before filters and limits
    pub fn element_coverage(&self) -> Option<Rect> {
        self.elements
            .iter()
            .filter_map(|element| match element {
                Element::Entity(entity) => entity.coverage(),
                Element::Subpass(pass) => pass.subpass_coverage(None),
            })
            .reduce(|a, b| a.union(&b))
    }

    /// Device-space area this pass needs when drawn as a subpass inside a
    /// parent covering `parent`.
    pub fn subpass_coverage(&self, parent: Option<Rect>) -> Option<Rect> {
        let coverage = if self.backdrop_filter.is_some() {
            // The backdrop fills whatever the pass is allowed to cover
            self.bounds_limit.or(parent)?
        } else {
            let content = self.element_coverage()?;
            match &self.image_filter {
                Some(filter) => filter.expand_coverage(&content, &self.transform),
                None => content,
            }
        };
        let coverage = match &self.bounds_limit {
            Some(limit) => coverage.intersection(limit)?,
            None => coverage,
        };
        match parent {
            Some(parent) => coverage.intersection(&parent),
            None => Some(coverage),
        }
    }

    /// Render the pass into `target`, whose top left sits at `origin` in
    /// device space.
    pub(crate) fn render(
        &self,
        ctx: &mut ContentContext<'_>,
        target: &RenderTarget,
        origin: Point,
        backdrop: Option<Snapshot>,
    ) -> bool {
        let pass_transform = Affine2D::translation(-origin.x, -origin.y);
        let mut pass = RenderPass::new("Entity Pass", target.clone());

        if let Some(backdrop) = backdrop {
            if let Some(command) = snapshot_command(
                ctx,
                &pass,
                &backdrop,
                &pass_transform,
                BlendMode::Source,
                1.0,
                0,
            ) {
                pass.add_command(command);
            }
        }

        for element in &self.elements {
            let ok = match element {
                Element::Entity(entity) => entity.render(ctx, &pass_transform, self.clip_depth, &mut pass),
                Element::Subpass(subpass) => self.render_subpass(ctx, subpass, target, origin, &mut pass),
            };
            if !ok {
                return false;
            }
        }
        ctx.submit(pass)
    }

    fn render_subpass(
        &self,
        ctx: &mut ContentContext<'_>,
        subpass: &EntityPass,
        target: &RenderTarget,
        origin: Point,
        pass: &mut RenderPass,
    ) -> bool {
        if subpass.is_empty() && subpass.backdrop_filter.is_none() {
            return true;
        }
        let target_rect = Rect::from(target.size().to_size()).offset(origin.x, origin.y);
        let Some(coverage) = subpass.subpass_coverage(Some(target_rect)) else {
            tracing::trace!("Skipping save layer with no visible coverage");
            return true;
        };
        let coverage = coverage.round_out();
        let Some(size) = ctx.offscreen_size_for(&coverage) else {
            tracing::warn!(?coverage, "Skipping save layer with non-finite coverage");
            return true;
        };
        let Some(subpass_target) = ctx.make_offscreen(size, "Save Layer", true) else {
            return false;
        };

        let backdrop = match &subpass.backdrop_filter {
            Some(filter) => {
                // Everything recorded so far has to land before it can be read back
                let label = pass.label().to_string();
                let flushed = std::mem::replace(pass, RenderPass::new(label, target.with_load_actions()));
                if !ctx.submit(flushed) {
                    return false;
                }
                let snapshot = Snapshot::from_target(target, origin);
                match apply_image_filter(ctx, filter, snapshot, &subpass.transform) {
                    Some(snapshot) => Some(snapshot),
                    None => return false,
                }
            }
            None => None,
        };

        tracing::trace!(
            width = size.width,
            height = size.height,
            elements = subpass.elements.len(),
            "Rendering save layer"
        );
        if !subpass.render(ctx, &subpass_target, coverage.origin, backdrop) {
            return false;
        }

        let mut snapshot = Snapshot::from_target(&subpass_target, coverage.origin);
        if let Some(filter) = &subpass.image_filter {
            match apply_image_filter(ctx, filter, snapshot, &subpass.transform) {
                Some(filtered) => snapshot = filtered,
                None => return false,
            }
        }
        if let Some(filter) = &subpass.color_filter {
            match apply_color_filter(ctx, filter, snapshot) {
                Some(filtered) => snapshot = filtered,
                None => return false,
            }
        }

        let pass_transform = Affine2D::translation(-origin.x, -origin.y);
        if let Some(command) = snapshot_command(
            ctx,
            pass,
            &snapshot,
            &pass_transform,
            subpass.blend_mode,
            subpass.opacity,
            subpass.clip_depth.saturating_sub(self.clip_depth),
        ) {
            pass.add_command(command);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::Contents;
    use quill_core::Color;
    use quill_gpu::Geometry;

    fn rect_entity(rect: Rect) -> Entity {
        Entity::new(Contents::SolidColor {
            geometry: Geometry::Rect(rect),
            color: Color::RED,
        })
    }

    #[test]
    fn test_element_coverage_unions_entities() {
        let mut pass = EntityPass::new();
        pass.add_entity(rect_entity(Rect::new(0.0, 0.0, 10.0, 10.0)));
        pass.add_entity(rect_entity(Rect::new(20.0, 5.0, 10.0, 10.0)));
        assert_eq!(pass.element_coverage(), Some(Rect::new(0.0, 0.0, 30.0, 15.0)));
        assert_eq!(pass.entity_count(), 2);
    }

    #[test]
    fn test_subpass_coverage_respects_limits() {
        let mut pass = EntityPass::new();
        pass.add_entity(rect_entity(Rect::new(0.0, 0.0, 100.0, 100.0)));
        pass.bounds_limit = Some(Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(
            pass.subpass_coverage(Some(Rect::new(0.0, 0.0, 25.0, 25.0))),
            Some(Rect::new(10.0, 10.0, 15.0, 15.0))
        );
        assert_eq!(pass.subpass_coverage(Some(Rect::new(50.0, 50.0, 5.0, 5.0))), None);
    }

    #[test]
    fn test_backdrop_subpass_covers_parent() {
        let pass = EntityPass {
            backdrop_filter: Some(ImageFilter::blur(2.0, 2.0)),
            ..EntityPass::default()
        };
        let parent = Rect::new(0.0, 0.0, 64.0, 32.0);
        assert_eq!(pass.subpass_coverage(Some(parent)), Some(parent));
    }

    #[test]
    fn test_image_filter_expands_subpass_coverage() {
        let mut pass = EntityPass {
            image_filter: Some(ImageFilter::blur(1.0, 1.0)),
            ..EntityPass::default()
        };
        pass.add_entity(rect_entity(Rect::new(10.0, 10.0, 10.0, 10.0)));
        assert_eq!(pass.subpass_coverage(None), Some(Rect::new(7.0, 7.0, 16.0, 16.0)));
    }
}
