//! What an entity draws
//!
//! [`Contents`] is a closed set of drawables. Each variant knows its device
//! coverage and how to turn itself into commands on a render pass.

use std::sync::Arc;

use quill_core::{Affine2D, BlendMode, Color, Path, Point, Rect};
use quill_gpu::{
    Command, Geometry, GeometryResult, GradientStop, RenderPass, SamplerMode, ShaderBinding,
    StencilMode, Texture, TileMode, Vertices,
};

use crate::content_context::{pipeline_for, ContentContext};
use crate::filters::{apply_image_filter, snapshot_command, Snapshot};
use crate::paint::ImageFilter;
use crate::text_frame::TextFrame;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClipOperation {
    #[default]
    Intersect,
    Difference,
}

#[derive(Clone, Debug)]
pub enum Contents {
    SolidColor {
        geometry: Geometry,
        /// Straight alpha
        color: Color,
    },
    LinearGradient {
        geometry: Geometry,
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
        tile_mode: TileMode,
        alpha: f32,
    },
    Texture {
        geometry: Geometry,
        texture: Arc<Texture>,
        /// Local space to normalized texture coordinates
        uv_transform: Affine2D,
        sampler: SamplerMode,
        tile_mode: TileMode,
        opacity: f32,
    },
    /// Vertex colors are blended with `color` using `blend_mode`
    Vertices {
        vertices: Vertices,
        color: Color,
        blend_mode: BlendMode,
    },
    Text {
        frame: TextFrame,
        color: Color,
        /// Draw color glyphs in `color` too (mask blurs need the bare mask)
        force_text_color: bool,
    },
    /// `input` rendered offscreen, filtered, then composited
    Filtered {
        input: Box<Contents>,
        filter: ImageFilter,
    },
    /// Stencil-only clip update
    Clip {
        geometry: Geometry,
        operation: ClipOperation,
    },
    /// Return every pixel above the entity's clip depth to it
    ClipRestore,
}

impl Contents {
    pub fn label(&self) -> &'static str {
        match self {
            Contents::SolidColor { .. } => "Solid Color",
            Contents::LinearGradient { .. } => "Linear Gradient",
            Contents::Texture { .. } => "Texture",
            Contents::Vertices { .. } => "Vertices",
            Contents::Text { .. } => "Text",
            Contents::Filtered { .. } => "Filtered",
            Contents::Clip { .. } => "Clip",
            Contents::ClipRestore => "Clip Restore",
        }
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, Contents::Clip { .. } | Contents::ClipRestore)
    }

    /// Device bounds of the pixels this can paint. Clips paint nothing.
    pub fn coverage(&self, transform: &Affine2D) -> Option<Rect> {
        match self {
            Contents::SolidColor { geometry, .. }
            | Contents::LinearGradient { geometry, .. }
            | Contents::Texture { geometry, .. } => geometry.coverage(transform),
            Contents::Vertices { vertices, .. } => {
                vertices.bounds().map(|bounds| transform.transform_rect(&bounds))
            }
            Contents::Text { frame, .. } => frame.bounds().map(|bounds| transform.transform_rect(&bounds)),
            Contents::Filtered { input, filter } => input
                .coverage(transform)
                .map(|coverage| filter.expand_coverage(&coverage, transform)),
            Contents::Clip { .. } | Contents::ClipRestore => None,
        }
    }

    /// Record commands drawing this into `pass`.
    ///
    /// `transform` maps local space to the pass's pixels. Returns `false`
    /// when a resource needed for the draw could not be created.
    pub(crate) fn render(
        &self,
        ctx: &mut ContentContext<'_>,
        transform: &Affine2D,
        blend_mode: BlendMode,
        stencil_reference: u32,
        pass: &mut RenderPass,
    ) -> bool {
        let target_size = pass.render_target().size();
        let draw = DrawState {
            blend_mode,
            stencil_reference,
        };
        match self {
            Contents::SolidColor { geometry, color } => {
                if color.is_transparent() && !blend_mode.affects_transparent_source() {
                    return true;
                }
                let result = ctx.geometry_result(geometry, transform, target_size);
                draw.push(pass, self.label(), result, ShaderBinding::SolidFill { color: *color });
                true
            }
            Contents::LinearGradient {
                geometry,
                start,
                end,
                stops,
                tile_mode,
                alpha,
            } => {
                let result = ctx.geometry_result(geometry, transform, target_size);
                draw.push(
                    pass,
                    self.label(),
                    result,
                    ShaderBinding::LinearGradient {
                        start: *start,
                        end: *end,
                        stops: stops.clone(),
                        tile_mode: *tile_mode,
                        alpha: *alpha,
                    },
                );
                true
            }
            Contents::Texture {
                geometry,
                texture,
                uv_transform,
                sampler,
                tile_mode,
                opacity,
            } => {
                let result = ctx.geometry_result(geometry, transform, target_size);
                draw.push(
                    pass,
                    self.label(),
                    result,
                    ShaderBinding::Texture {
                        texture: texture.clone(),
                        uv_transform: *uv_transform,
                        sampler: *sampler,
                        tile_mode: *tile_mode,
                        alpha: *opacity,
                    },
                );
                true
            }
            Contents::Vertices {
                vertices,
                color,
                blend_mode: vertex_blend,
            } => {
                let mut geometry_ctx = ctx.geometry_context(target_size);
                if vertices.has_colors() {
                    let result = vertices.position_color_buffer(&mut geometry_ctx, transform, *color);
                    draw.push(
                        pass,
                        self.label(),
                        result,
                        ShaderBinding::VertexColor {
                            color: *color,
                            blend_mode: *vertex_blend,
                        },
                    );
                } else {
                    let result = vertices.position_buffer(&mut geometry_ctx, transform);
                    draw.push(pass, self.label(), result, ShaderBinding::SolidFill { color: *color });
                }
                true
            }
            Contents::Text {
                frame,
                color,
                force_text_color,
            } => {
                for run in frame.runs() {
                    for glyph in &run.glyphs {
                        let geometry = match &glyph.outline {
                            Some(outline) => Geometry::fill(Path::clone(outline)),
                            None => Geometry::Rect(glyph.bounds),
                        };
                        let glyph_transform = transform
                            .then(&Affine2D::translation(glyph.position.x, glyph.position.y));
                        let result = ctx.geometry_result(&geometry, &glyph_transform, target_size);
                        draw.push(
                            pass,
                            self.label(),
                            result,
                            ShaderBinding::Glyph {
                                atlas: None,
                                color: *color,
                                force_color: *force_text_color,
                                is_color_glyph: run.has_color_glyphs,
                            },
                        );
                    }
                }
                true
            }
            Contents::Filtered { input, filter } => {
                render_filtered(ctx, input, filter, transform, draw, pass)
            }
            Contents::Clip {
                geometry,
                operation,
            } => {
                let clear = ShaderBinding::SolidFill {
                    color: Color::TRANSPARENT,
                };
                match operation {
                    ClipOperation::Intersect => {
                        let result = ctx.geometry_result(geometry, transform, target_size);
                        draw.push_stencil(pass, result, clear, StencilMode::IncrementWhereEqual, 0);
                    }
                    ClipOperation::Difference => {
                        // Everything moves up one level, then the shape moves back down
                        let cover = ctx.geometry_result(&Geometry::Cover, transform, target_size);
                        draw.push_stencil(pass, cover, clear.clone(), StencilMode::IncrementWhereEqual, 0);
                        let result = ctx.geometry_result(geometry, transform, target_size);
                        draw.push_stencil(pass, result, clear, StencilMode::DecrementWhereEqual, 1);
                    }
                }
                true
            }
            Contents::ClipRestore => {
                let cover = ctx.geometry_result(&Geometry::Cover, transform, target_size);
                draw.push_stencil(
                    pass,
                    cover,
                    ShaderBinding::SolidFill {
                        color: Color::TRANSPARENT,
                    },
                    StencilMode::RestoreWhereGreater,
                    0,
                );
                true
            }
        }
    }
}

#[derive(Clone, Copy)]
struct DrawState {
    blend_mode: BlendMode,
    stencil_reference: u32,
}

impl DrawState {
    fn push(&self, pass: &mut RenderPass, label: &str, result: GeometryResult, shader: ShaderBinding) {
        if result.is_empty() {
            return;
        }
        let pipeline = pipeline_for(pass, &result, self.blend_mode, StencilMode::CompareEqual);
        pass.add_command(Command {
            label: label.to_string(),
            pipeline,
            transform: result.transform,
            vertex_buffer: result.vertex_buffer,
            shader,
            stencil_reference: self.stencil_reference,
        });
    }

    fn push_stencil(
        &self,
        pass: &mut RenderPass,
        result: GeometryResult,
        shader: ShaderBinding,
        stencil_mode: StencilMode,
        reference_offset: u32,
    ) {
        if result.is_empty() {
            return;
        }
        let pipeline = pipeline_for(pass, &result, BlendMode::Destination, stencil_mode);
        pass.add_command(Command {
            label: "Clip".to_string(),
            pipeline,
            transform: result.transform,
            vertex_buffer: result.vertex_buffer,
            shader,
            stencil_reference: self.stencil_reference + reference_offset,
        });
    }
}

fn render_filtered(
    ctx: &mut ContentContext<'_>,
    input: &Contents,
    filter: &ImageFilter,
    transform: &Affine2D,
    draw: DrawState,
    pass: &mut RenderPass,
) -> bool {
    let pass_rect = Rect::from(pass.render_target().size().to_size());
    let outset = filter.outset(transform);
    // Content just outside the pass can still bleed in through the filter
    let Some(input_rect) = input
        .coverage(transform)
        .and_then(|coverage| coverage.intersection(&pass_rect.expand(outset.x, outset.y)))
    else {
        return true;
    };
    let input_rect = input_rect.round_out();
    let Some(size) = ctx.offscreen_size_for(&input_rect) else {
        tracing::warn!(?input_rect, "Skipping filter with non-finite input coverage");
        return true;
    };

    let Some(target) = ctx.make_offscreen(size, "Filter Input", false) else {
        return false;
    };
    let origin = input_rect.origin;
    let input_transform = Affine2D::translation(-origin.x, -origin.y).then(transform);
    let mut input_pass = RenderPass::new("Filter Input", target.clone());
    if !input.render(ctx, &input_transform, BlendMode::SourceOver, 0, &mut input_pass) {
        return false;
    }
    if !ctx.submit(input_pass) {
        return false;
    }

    let snapshot = Snapshot::from_target(&target, origin);
    let Some(filtered) = apply_image_filter(ctx, filter, snapshot, transform) else {
        return false;
    };
    if let Some(command) = snapshot_command(
        ctx,
        pass,
        &filtered,
        &Affine2D::IDENTITY,
        draw.blend_mode,
        1.0,
        draw.stencil_reference,
    ) {
        pass.add_command(command);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_frame::{GlyphPosition, TextRun};

    #[test]
    fn test_clips_have_no_coverage() {
        let clip = Contents::Clip {
            geometry: Geometry::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
            operation: ClipOperation::Intersect,
        };
        assert!(clip.coverage(&Affine2D::IDENTITY).is_none());
        assert!(Contents::ClipRestore.coverage(&Affine2D::IDENTITY).is_none());
    }

    #[test]
    fn test_filtered_coverage_expands() {
        let contents = Contents::Filtered {
            input: Box::new(Contents::SolidColor {
                geometry: Geometry::Rect(Rect::new(10.0, 10.0, 10.0, 10.0)),
                color: Color::RED,
            }),
            filter: ImageFilter::blur(1.0, 1.0),
        };
        assert_eq!(
            contents.coverage(&Affine2D::IDENTITY),
            Some(Rect::new(7.0, 7.0, 16.0, 16.0))
        );
    }

    #[test]
    fn test_text_coverage_is_glyph_union() {
        let glyph = |x: f32| GlyphPosition {
            glyph_id: 1,
            position: Point::new(x, 10.0),
            bounds: Rect::new(0.0, -8.0, 5.0, 10.0),
            outline: None,
        };
        let frame = TextFrame::new(vec![TextRun {
            font_size: 10.0,
            has_color_glyphs: false,
            glyphs: vec![glyph(0.0), glyph(6.0)],
        }]);
        let contents = Contents::Text {
            frame,
            color: Color::BLACK,
            force_text_color: false,
        };
        assert_eq!(
            contents.coverage(&Affine2D::translation(1.0, 0.0)),
            Some(Rect::new(1.0, 2.0, 11.0, 10.0))
        );
    }
}
