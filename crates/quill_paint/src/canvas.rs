//! Canvas: records draws, clips and save layers into an entity pass tree

use quill_core::{Affine2D, BlendMode, Path, PathBuilder, Point, Rect, RoundRect};
use quill_gpu::{Geometry, SamplerMode, TileMode, Vertices};

use crate::contents::{ClipOperation, Contents};
use crate::entity::Entity;
use crate::entity_pass::EntityPass;
use crate::image::Image;
use crate::paint::{ColorFilter, ImageFilter, Paint, PaintStyle, INVERT_COLOR_MATRIX};
use crate::picture::Picture;
use crate::text_frame::TextFrame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StackMode {
    /// Drawing into the enclosing pass
    Direct,
    /// Drawing into a save layer's own pass
    Subpass,
}

#[derive(Clone, Debug)]
struct CanvasStackEntry {
    transform: Affine2D,
    /// Device-space bounds outside which draws are discarded
    cull_rect: Option<Rect>,
    clip_depth: u32,
    mode: StackMode,
    /// Present exactly when `mode` is `Subpass`
    subpass: Option<EntityPass>,
    /// Clips recorded at this level
    num_clips: u32,
}

impl CanvasStackEntry {
    fn root(cull_rect: Option<Rect>) -> Self {
        Self {
            transform: Affine2D::IDENTITY,
            cull_rect,
            clip_depth: 0,
            mode: StackMode::Direct,
            subpass: None,
            num_clips: 0,
        }
    }
}

/// Records drawing operations for later rendering as a [`Picture`].
#[derive(Clone, Debug)]
pub struct Canvas {
    root: EntityPass,
    stack: Vec<CanvasStackEntry>,
    initial_cull_rect: Option<Rect>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self::with_cull_rect(None)
    }

    /// Canvas that discards draws falling entirely outside `cull_rect`.
    pub fn with_cull_rect(cull_rect: Option<Rect>) -> Self {
        Self {
            root: EntityPass::new(),
            stack: vec![CanvasStackEntry::root(cull_rect)],
            initial_cull_rect: cull_rect,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Stack
    // ─────────────────────────────────────────────────────────────────────

    fn top(&self) -> &CanvasStackEntry {
        // The root entry is never popped
        &self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut CanvasStackEntry {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn current_pass_mut(&mut self) -> &mut EntityPass {
        match self
            .stack
            .iter_mut()
            .rev()
            .find_map(|entry| entry.subpass.as_mut())
        {
            Some(pass) => pass,
            None => &mut self.root,
        }
    }

    pub fn save(&mut self) {
        let top = self.top();
        let entry = CanvasStackEntry {
            transform: top.transform,
            cull_rect: top.cull_rect,
            clip_depth: top.clip_depth,
            mode: StackMode::Direct,
            subpass: None,
            num_clips: 0,
        };
        self.stack.push(entry);
    }

    /// Begin a layer that is composited into its parent on [`restore`].
    ///
    /// The layer takes its blend mode, opacity and filters from `paint`.
    /// `bounds` is in local space. A `backdrop_filter` filters what is
    /// already drawn underneath the layer and uses it as the layer's
    /// starting contents.
    ///
    /// [`restore`]: Canvas::restore
    pub fn save_layer(&mut self, paint: &Paint, bounds: Option<Rect>, backdrop_filter: Option<ImageFilter>) {
        let top = self.top();
        let transform = top.transform;
        let bounds_limit = bounds.map(|bounds| transform.transform_rect(&bounds));

        let mut image_filter = paint.image_filter.clone();
        if paint.invert_colors {
            let invert = ImageFilter::ColorFilter(ColorFilter::Matrix(INVERT_COLOR_MATRIX));
            image_filter = Some(match image_filter {
                Some(filter) => ImageFilter::compose(invert, filter),
                None => invert,
            });
        }

        let mut cull_rect = match (top.cull_rect, bounds_limit) {
            (Some(cull), Some(limit)) => Some(cull.intersection(&limit).unwrap_or(Rect::ZERO)),
            (cull, limit) => cull.or(limit),
        };
        // Filtered content just outside the layer can still reach into it
        if let (Some(cull), Some(filter)) = (cull_rect, &image_filter) {
            cull_rect = Some(filter.expand_coverage(&cull, &transform));
        }

        let mut pass = EntityPass::new();
        pass.blend_mode = paint.blend_mode;
        pass.opacity = paint.color.a;
        pass.color_filter = paint.color_filter;
        pass.image_filter = image_filter;
        pass.backdrop_filter = backdrop_filter;
        pass.bounds_limit = bounds_limit;
        pass.transform = transform;
        pass.clip_depth = top.clip_depth;
        let entry = CanvasStackEntry {
            transform,
            cull_rect,
            clip_depth: top.clip_depth,
            mode: StackMode::Subpass,
            subpass: Some(pass),
            num_clips: 0,
        };
        self.stack.push(entry);
    }

    /// Pop the top save. Returns `false` when only the root remains.
    pub fn restore(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        let Some(entry) = self.stack.pop() else {
            return false;
        };
        match entry.mode {
            StackMode::Subpass => {
                if let Some(pass) = entry.subpass {
                    self.current_pass_mut().add_subpass(pass);
                }
            }
            StackMode::Direct => {
                if entry.num_clips > 0 {
                    // Pixels clipped at this level go back to the parent's depth
                    let entity = Entity::new(Contents::ClipRestore)
                        .with_clip_depth(self.top().clip_depth)
                        .with_transform(entry.transform);
                    self.current_pass_mut().add_entity(entity);
                }
            }
        }
        true
    }

    pub fn restore_to_count(&mut self, count: usize) {
        while self.get_save_count() > count.max(1) {
            if !self.restore() {
                break;
            }
        }
    }

    pub fn get_save_count(&self) -> usize {
        self.stack.len()
    }

    pub fn get_clip_depth(&self) -> u32 {
        self.top().clip_depth
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transform
    // ─────────────────────────────────────────────────────────────────────

    pub fn get_current_transform(&self) -> Affine2D {
        self.top().transform
    }

    /// Cull rect mapped back into local space
    pub fn get_current_local_culling_bounds(&self) -> Option<Rect> {
        let top = self.top();
        let cull = top.cull_rect?;
        let inverse = top.transform.invert()?;
        Some(inverse.transform_rect(&cull))
    }

    pub fn reset_transform(&mut self) {
        self.top_mut().transform = Affine2D::IDENTITY;
    }

    /// Apply `transform` before the current one.
    pub fn concat(&mut self, transform: &Affine2D) {
        let top = self.top_mut();
        top.transform = top.transform.then(transform);
    }

    /// Apply `transform` after the current one.
    pub fn pre_concat(&mut self, transform: &Affine2D) {
        let top = self.top_mut();
        top.transform = transform.then(&top.transform);
    }

    pub fn transform(&mut self, transform: &Affine2D) {
        self.concat(transform);
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.concat(&Affine2D::translation(dx, dy));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.concat(&Affine2D::scale(sx, sy));
    }

    /// Rotate by `radians`.
    pub fn rotate(&mut self, radians: f32) {
        self.concat(&Affine2D::rotation(radians));
    }

    pub fn skew(&mut self, sx: f32, sy: f32) {
        self.concat(&Affine2D::skew(sx, sy));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Clips
    // ─────────────────────────────────────────────────────────────────────

    pub fn clip_path(&mut self, path: Path, operation: ClipOperation) {
        self.clip_geometry(Geometry::fill(path), operation);
    }

    pub fn clip_rect(&mut self, rect: Rect, operation: ClipOperation) {
        self.clip_geometry(Geometry::Rect(rect), operation);
    }

    pub fn clip_rrect(&mut self, rrect: RoundRect, operation: ClipOperation) {
        if rrect.is_rect() {
            self.clip_rect(rrect.rect, operation);
        } else {
            self.clip_geometry(Geometry::RoundRect(rrect), operation);
        }
    }

    pub fn clip_oval(&mut self, bounds: Rect, operation: ClipOperation) {
        self.clip_geometry(Geometry::Ellipse(bounds), operation);
    }

    pub fn clip_circle(&mut self, center: Point, radius: f32, operation: ClipOperation) {
        self.clip_geometry(Geometry::Circle { center, radius }, operation);
    }

    fn clip_geometry(&mut self, geometry: Geometry, operation: ClipOperation) {
        let top = self.top();
        let transform = top.transform;
        let coverage = geometry
            .coverage(&transform)
            .filter(|coverage| !coverage.is_empty());

        match operation {
            ClipOperation::Difference if coverage.is_none() => {
                tracing::trace!("Skipping difference clip with empty coverage");
                return;
            }
            ClipOperation::Intersect => {
                if let Some(cull) = top.cull_rect {
                    if geometry.covers_area(&transform, &cull) {
                        tracing::trace!("Skipping intersect clip covering the cull rect");
                        return;
                    }
                }
            }
            ClipOperation::Difference => {}
        }

        let entity = Entity::new(Contents::Clip { geometry, operation })
            .with_transform(transform)
            .with_clip_depth(top.clip_depth);
        self.current_pass_mut().add_entity(entity);

        let top = self.top_mut();
        top.clip_depth += 1;
        top.num_clips += 1;
        if operation == ClipOperation::Intersect {
            top.cull_rect = Some(match (top.cull_rect, coverage) {
                (Some(cull), Some(coverage)) => cull.intersection(&coverage).unwrap_or(Rect::ZERO),
                (None, Some(coverage)) => coverage,
                (_, None) => Rect::ZERO,
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Draws
    // ─────────────────────────────────────────────────────────────────────

    fn add_entity(&mut self, contents: Contents, transform: Affine2D, blend_mode: BlendMode) {
        let top = self.top();
        let entity = Entity {
            transform,
            clip_depth: top.clip_depth,
            blend_mode,
            contents,
        };
        if let Some(cull) = top.cull_rect {
            let visible = entity
                .coverage()
                .is_some_and(|coverage| coverage.intersection(&cull).is_some());
            if !visible {
                tracing::trace!(contents = entity.contents.label(), "Culled draw");
                return;
            }
        }
        self.current_pass_mut().add_entity(entity);
    }

    fn draw_geometry(&mut self, geometry: Geometry, paint: &Paint) {
        let contents = paint.create_contents(geometry);
        self.add_entity(contents, self.get_current_transform(), paint.blend_mode);
    }

    /// Fill `path`, or stroke it with a stroking paint, in the paint's style.
    fn shape_geometry(path: impl FnOnce() -> Path, fill: Geometry, paint: &Paint) -> Geometry {
        match paint.style {
            PaintStyle::Fill => fill,
            PaintStyle::Stroke => Geometry::stroke(path(), paint.stroke_style()),
        }
    }

    pub fn draw_path(&mut self, path: Path, paint: &Paint) {
        let geometry = match paint.style {
            PaintStyle::Fill => Geometry::fill(path),
            PaintStyle::Stroke => Geometry::stroke(path, paint.stroke_style()),
        };
        self.draw_geometry(geometry, paint);
    }

    pub fn draw_paint(&mut self, paint: &Paint) {
        self.draw_geometry(Geometry::Cover, paint);
    }

    pub fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        let geometry = Self::shape_geometry(
            || PathBuilder::new().add_rect(rect).take_path(),
            Geometry::Rect(rect),
            paint,
        );
        self.draw_geometry(geometry, paint);
    }

    pub fn draw_oval(&mut self, bounds: Rect, paint: &Paint) {
        let geometry = Self::shape_geometry(
            || PathBuilder::new().add_oval(bounds).take_path(),
            Geometry::Ellipse(bounds),
            paint,
        );
        self.draw_geometry(geometry, paint);
    }

    pub fn draw_rrect(&mut self, rrect: RoundRect, paint: &Paint) {
        let geometry = Self::shape_geometry(
            || PathBuilder::new().add_round_rect(rrect).take_path(),
            Geometry::RoundRect(rrect),
            paint,
        );
        self.draw_geometry(geometry, paint);
    }

    pub fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
        let geometry = match paint.style {
            PaintStyle::Fill => Geometry::Circle { center, radius },
            PaintStyle::Stroke => Geometry::StrokedCircle {
                center,
                radius,
                stroke_width: paint.stroke_width,
            },
        };
        self.draw_geometry(geometry, paint);
    }

    /// Stroke a single segment with the paint's width and cap.
    pub fn draw_line(&mut self, p0: Point, p1: Point, paint: &Paint) {
        let geometry = Geometry::Line {
            p0,
            p1,
            width: paint.stroke_width,
            cap: paint.stroke_cap,
        };
        self.draw_geometry(geometry, paint);
    }

    pub fn draw_image(&mut self, image: &Image, offset: Point, paint: &Paint, sampler: SamplerMode) {
        let dest = Rect::from_origin_size(offset, image.size().to_size());
        self.draw_image_rect(image, image.bounds(), dest, paint, sampler);
    }

    /// Draw the `source` pixels of `image` stretched over the local `dest` rect.
    pub fn draw_image_rect(&mut self, image: &Image, source: Rect, dest: Rect, paint: &Paint, sampler: SamplerMode) {
        if source.is_empty() || dest.is_empty() {
            return;
        }
        let size = image.size().to_size();
        // dest -> source pixels -> normalized texture coordinates
        let uv_transform = Affine2D::scale(1.0 / size.width, 1.0 / size.height)
            .then(&Affine2D::translation(source.origin.x, source.origin.y))
            .then(&Affine2D::scale(
                source.width() / dest.width(),
                source.height() / dest.height(),
            ))
            .then(&Affine2D::translation(-dest.origin.x, -dest.origin.y));
        let contents = Contents::Texture {
            geometry: Geometry::Rect(dest),
            texture: image.texture().clone(),
            uv_transform,
            sampler,
            tile_mode: TileMode::Clamp,
            opacity: paint.color.a,
        };
        let contents = paint.with_filters(contents, true);
        self.add_entity(contents, self.get_current_transform(), paint.blend_mode);
    }

    /// Draw a triangle mesh. Vertex colors combine with the paint color
    /// through `blend_mode`.
    pub fn draw_vertices(&mut self, vertices: Vertices, blend_mode: BlendMode, paint: &Paint) {
        let contents = Contents::Vertices {
            vertices,
            color: paint.color,
            blend_mode,
        };
        let contents = paint.with_filters(contents, true);
        self.add_entity(contents, self.get_current_transform(), paint.blend_mode);
    }

    /// Draw glyphs with their frame origin at the local `position`.
    pub fn draw_text_frame(&mut self, frame: TextFrame, position: Point, paint: &Paint) {
        if frame.is_empty() {
            return;
        }
        let contents = Contents::Text {
            frame,
            color: paint.color,
            // Mask blurs run on the glyph coverage rather than filtered colors
            force_text_color: paint.mask_blur_descriptor.is_some(),
        };
        let contents = paint.with_filters(contents, true);
        let transform = self
            .get_current_transform()
            .then(&Affine2D::translation(position.x, position.y));
        self.add_entity(contents, transform, paint.blend_mode);
    }

    /// Close every open save and hand out what was recorded.
    ///
    /// The canvas is left empty and ready to record again.
    pub fn end_recording_as_picture(&mut self) -> Picture {
        self.restore_to_count(1);
        let pass = std::mem::take(&mut self.root);
        self.stack = vec![CanvasStackEntry::root(self.initial_cull_rect)];
        Picture::new(pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_pass::Element;
    use quill_core::Color;

    #[test]
    fn test_restore_on_root_is_a_noop() {
        let mut canvas = Canvas::new();
        canvas.translate(5.0, 5.0);
        assert!(!canvas.restore());
        assert_eq!(canvas.get_save_count(), 1);
        assert_eq!(canvas.get_current_transform(), Affine2D::translation(5.0, 5.0));
    }

    #[test]
    fn test_save_restore_round_trips_state() {
        let mut canvas = Canvas::new();
        let paint = Paint::new(Color::RED);
        canvas.save();
        canvas.translate(10.0, 0.0);
        canvas.clip_rect(Rect::new(0.0, 0.0, 5.0, 5.0), ClipOperation::Intersect);
        canvas.save_layer(&paint, None, None);
        canvas.scale(2.0, 2.0);
        canvas.clip_rect(Rect::new(1.0, 1.0, 1.0, 1.0), ClipOperation::Difference);
        assert_eq!(canvas.get_save_count(), 3);
        assert_eq!(canvas.get_clip_depth(), 2);

        assert!(canvas.restore());
        assert!(canvas.restore());
        assert_eq!(canvas.get_save_count(), 1);
        assert_eq!(canvas.get_current_transform(), Affine2D::IDENTITY);
        assert_eq!(canvas.get_clip_depth(), 0);
    }

    #[test]
    fn test_restore_to_count() {
        let mut canvas = Canvas::new();
        canvas.save();
        canvas.save();
        canvas.save();
        canvas.restore_to_count(2);
        assert_eq!(canvas.get_save_count(), 2);
        canvas.restore_to_count(0);
        assert_eq!(canvas.get_save_count(), 1);
    }

    #[test]
    fn test_direct_restore_emits_clip_restore() {
        let mut canvas = Canvas::new();
        canvas.save();
        canvas.clip_rect(Rect::new(0.0, 0.0, 5.0, 5.0), ClipOperation::Intersect);
        canvas.restore();
        let picture = canvas.end_recording_as_picture();
        let elements = picture.pass().elements();
        assert_eq!(elements.len(), 2);
        match &elements[1] {
            Element::Entity(entity) => {
                assert!(matches!(entity.contents, Contents::ClipRestore));
                assert_eq!(entity.clip_depth, 0);
            }
            Element::Subpass(_) => panic!("expected a clip restore entity"),
        }
    }

    #[test]
    fn test_empty_difference_clip_is_skipped() {
        let mut canvas = Canvas::new();
        canvas.clip_rect(Rect::new(5.0, 5.0, 0.0, 0.0), ClipOperation::Difference);
        assert_eq!(canvas.get_clip_depth(), 0);
        assert!(canvas.end_recording_as_picture().pass().is_empty());
    }

    #[test]
    fn test_draws_outside_cull_rect_are_dropped() {
        let mut canvas = Canvas::with_cull_rect(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let paint = Paint::new(Color::BLUE);
        canvas.draw_rect(Rect::new(200.0, 200.0, 10.0, 10.0), &paint);
        canvas.draw_rect(Rect::new(90.0, 90.0, 20.0, 20.0), &paint);
        canvas.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0), ClipOperation::Intersect);
        canvas.draw_circle(Point::new(50.0, 50.0), 5.0, &paint);
        assert_eq!(canvas.end_recording_as_picture().pass().entity_count(), 2);
    }

    #[test]
    fn test_local_culling_bounds_follow_transform() {
        let mut canvas = Canvas::with_cull_rect(Some(Rect::new(0.0, 0.0, 100.0, 50.0)));
        canvas.scale(2.0, 2.0);
        assert_eq!(
            canvas.get_current_local_culling_bounds(),
            Some(Rect::new(0.0, 0.0, 50.0, 25.0))
        );
        assert_eq!(Canvas::new().get_current_local_culling_bounds(), None);
    }

    #[test]
    fn test_concat_orders() {
        let mut canvas = Canvas::new();
        canvas.translate(10.0, 0.0);
        canvas.pre_concat(&Affine2D::scale(2.0, 2.0));
        assert_eq!(
            canvas.get_current_transform().transform_point(Point::new(1.0, 1.0)),
            Point::new(22.0, 2.0)
        );
        canvas.reset_transform();
        canvas.concat(&Affine2D::translation(1.0, 1.0));
        canvas.scale(3.0, 3.0);
        assert_eq!(
            canvas.get_current_transform().transform_point(Point::new(1.0, 1.0)),
            Point::new(4.0, 4.0)
        );
    }

    #[test]
    fn test_layer_lands_in_parent_on_restore() {
        let mut canvas = Canvas::new();
        let paint = Paint::new(Color::RED);
        canvas.save_layer(&paint, Some(Rect::new(0.0, 0.0, 10.0, 10.0)), None);
        canvas.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), &paint);
        canvas.restore();
        let picture = canvas.end_recording_as_picture();
        match picture.pass().elements() {
            [Element::Subpass(layer)] => {
                assert_eq!(layer.entity_count(), 1);
                assert_eq!(layer.bounds_limit, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
            }
            other => panic!("unexpected elements {other:?}"),
        }
    }

    #[test]
    fn test_layer_takes_compositing_state_from_paint() {
        let mut canvas = Canvas::new();
        canvas.translate(3.0, 4.0);
        canvas.clip_rect(Rect::new(0.0, 0.0, 20.0, 20.0), ClipOperation::Intersect);
        let paint = Paint::new(Color::RED.with_alpha(0.5)).with_blend_mode(BlendMode::Screen);
        canvas.save_layer(&paint, None, None);
        canvas.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), &paint);
        canvas.restore();
        let picture = canvas.end_recording_as_picture();
        let layer = picture
            .pass()
            .elements()
            .iter()
            .find_map(|element| match element {
                Element::Subpass(layer) => Some(layer),
                Element::Entity(_) => None,
            })
            .expect("layer recorded");
        assert_eq!(layer.blend_mode, BlendMode::Screen);
        assert_eq!(layer.opacity, 0.5);
        assert_eq!(layer.transform, Affine2D::translation(3.0, 4.0));
        assert_eq!(layer.clip_depth, 1);
        assert!(layer.image_filter.is_none());
    }
}
