//! Snapshots and the offscreen passes that filter them

use std::sync::Arc;

use quill_core::{Affine2D, BlendMode, ISize, Point, Rect};
use quill_gpu::{
    Command, Geometry, RenderPass, RenderTarget, SamplerMode, ShaderBinding, StencilMode, Texture,
    TextureFilter, TileMode,
};

use crate::content_context::{pipeline_for, ContentContext};
use crate::paint::{blur_radius, device_sigma, ColorFilter, ImageFilter};

/// A rendered texture and where it sits
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub texture: Arc<Texture>,
    /// Texture pixels to the pixels of the pass that owns the snapshot
    pub transform: Affine2D,
}

impl Snapshot {
    pub fn from_target(target: &RenderTarget, origin: Point) -> Self {
        Self {
            texture: target.render_target_texture(),
            transform: Affine2D::translation(origin.x, origin.y),
        }
    }

    pub fn texture_rect(&self) -> Rect {
        Rect::from(self.texture.size().to_size())
    }

    pub fn coverage(&self) -> Rect {
        self.transform.transform_rect(&self.texture_rect())
    }
}

fn is_pixel_aligned(transform: &Affine2D) -> bool {
    let [a, b, c, d, tx, ty] = transform.elements;
    a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 && tx.fract() == 0.0 && ty.fract() == 0.0
}

fn uv_scale(size: ISize) -> Affine2D {
    Affine2D::scale(1.0 / size.width as f32, 1.0 / size.height as f32)
}

/// Command drawing `snapshot` into `pass`, with `pass_transform` mapping the
/// snapshot's owner space to the pass.
pub(crate) fn snapshot_command(
    ctx: &mut ContentContext<'_>,
    pass: &RenderPass,
    snapshot: &Snapshot,
    pass_transform: &Affine2D,
    blend_mode: BlendMode,
    opacity: f32,
    stencil_reference: u32,
) -> Option<Command> {
    let transform = pass_transform.then(&snapshot.transform);
    let result = ctx.geometry_result(
        &Geometry::Rect(snapshot.texture_rect()),
        &transform,
        pass.render_target().size(),
    );
    if result.is_empty() {
        return None;
    }
    let sampler = if is_pixel_aligned(&transform) {
        SamplerMode::Nearest
    } else {
        SamplerMode::Linear
    };
    Some(Command {
        label: "Snapshot".to_string(),
        pipeline: pipeline_for(pass, &result, blend_mode, StencilMode::CompareEqual),
        transform: result.transform,
        vertex_buffer: result.vertex_buffer,
        shader: ShaderBinding::Texture {
            texture: snapshot.texture.clone(),
            uv_transform: uv_scale(snapshot.texture.size()),
            sampler,
            tile_mode: TileMode::Decal,
            alpha: opacity,
        },
        stencil_reference,
    })
}

/// Render a full-target quad with `shader` into a fresh offscreen.
fn filter_pass(ctx: &mut ContentContext<'_>, size: ISize, label: &str, shader: ShaderBinding) -> Option<Arc<Texture>> {
    let target = ctx.make_offscreen(size, label, false)?;
    let size = target.size();
    let result = ctx.geometry_result(
        &Geometry::Rect(Rect::from(size.to_size())),
        &Affine2D::IDENTITY,
        size,
    );
    let mut pass = RenderPass::new(label, target.clone());
    let pipeline = pipeline_for(&pass, &result, BlendMode::Source, StencilMode::Ignore);
    pass.add_command(Command {
        label: label.to_string(),
        pipeline,
        transform: result.transform,
        vertex_buffer: result.vertex_buffer,
        shader,
        stencil_reference: 0,
    });
    ctx.submit(pass).then(|| target.render_target_texture())
}

pub(crate) fn apply_image_filter(
    ctx: &mut ContentContext<'_>,
    filter: &ImageFilter,
    input: Snapshot,
    effect_transform: &Affine2D,
) -> Option<Snapshot> {
    match filter {
        ImageFilter::Blur {
            sigma_x,
            sigma_y,
            tile_mode,
        } => gaussian_blur(
            ctx,
            input,
            device_sigma(*sigma_x, *sigma_y, effect_transform),
            *tile_mode,
        ),
        ImageFilter::ColorFilter(color_filter) => apply_color_filter(ctx, color_filter, input),
        ImageFilter::Compose { outer, inner } => {
            let inner = apply_image_filter(ctx, inner, input, effect_transform)?;
            apply_image_filter(ctx, outer, inner, effect_transform)
        }
    }
}

pub(crate) fn apply_color_filter(
    ctx: &mut ContentContext<'_>,
    filter: &ColorFilter,
    input: Snapshot,
) -> Option<Snapshot> {
    let size = input.texture.size();
    let filter = match filter {
        ColorFilter::Blend(color, mode) => TextureFilter::Blend(*color, *mode),
        ColorFilter::Matrix(matrix) => TextureFilter::ColorMatrix(*matrix),
    };
    let texture = filter_pass(
        ctx,
        size,
        "Color Filter",
        ShaderBinding::FilterTexture {
            texture: input.texture.clone(),
            uv_transform: uv_scale(size),
            filter,
            alpha: 1.0,
        },
    )?;
    Some(Snapshot {
        texture,
        transform: input.transform,
    })
}

/// Power of two scale applied before blurring with large sigmas.
pub fn downsample_scalar(sigma: f32) -> f32 {
    if !(sigma > 4.0) {
        return 1.0;
    }
    let raw = 4.0 / sigma;
    2f32.powf(raw.log2().floor()).max(1.0 / 16.0)
}

/// Separable gaussian blur. Zero sigmas leave the input untouched.
pub(crate) fn gaussian_blur(
    ctx: &mut ContentContext<'_>,
    input: Snapshot,
    sigma: Point,
    tile_mode: TileMode,
) -> Option<Snapshot> {
    let blur_x = sigma.x > 0.0;
    let blur_y = sigma.y > 0.0;
    if !blur_x && !blur_y {
        return Some(input);
    }

    let scalar = downsample_scalar(sigma.x.max(sigma.y));
    let mut snapshot = if scalar < 1.0 {
        downsample(ctx, &input, scalar)?
    } else {
        input
    };
    let sigma = sigma * scalar;

    if blur_x {
        snapshot = blur_pass(ctx, &snapshot, Point::new(1.0, 0.0), sigma.x, tile_mode)?;
    }
    if blur_y {
        snapshot = blur_pass(ctx, &snapshot, Point::new(0.0, 1.0), sigma.y, tile_mode)?;
    }
    Some(snapshot)
}

fn downsample(ctx: &mut ContentContext<'_>, input: &Snapshot, scalar: f32) -> Option<Snapshot> {
    let in_size = input.texture.size();
    let out_size = ISize::new(
        ((in_size.width as f32 * scalar).ceil() as u32).max(1),
        ((in_size.height as f32 * scalar).ceil() as u32).max(1),
    );
    let texture = filter_pass(
        ctx,
        out_size,
        "Blur Downsample",
        ShaderBinding::Texture {
            texture: input.texture.clone(),
            uv_transform: uv_scale(out_size),
            sampler: SamplerMode::Linear,
            tile_mode: TileMode::Clamp,
            alpha: 1.0,
        },
    )?;
    let scale = Affine2D::scale(
        in_size.width as f32 / out_size.width as f32,
        in_size.height as f32 / out_size.height as f32,
    );
    Some(Snapshot {
        texture,
        transform: input.transform.then(&scale),
    })
}

fn blur_pass(
    ctx: &mut ContentContext<'_>,
    input: &Snapshot,
    direction: Point,
    sigma: f32,
    tile_mode: TileMode,
) -> Option<Snapshot> {
    let radius = blur_radius(sigma);
    let in_size = input.texture.size();
    // Decal blurs spread past the input edge
    let pad = if tile_mode == TileMode::Decal {
        (direction.x as u32 * radius, direction.y as u32 * radius)
    } else {
        (0, 0)
    };
    let out_size = ISize::new(in_size.width + pad.0 * 2, in_size.height + pad.1 * 2);
    let offset = Affine2D::translation(-(pad.0 as f32), -(pad.1 as f32));

    let texture = filter_pass(
        ctx,
        out_size,
        "Gaussian Blur",
        ShaderBinding::GaussianBlur {
            texture: input.texture.clone(),
            uv_transform: uv_scale(in_size).then(&offset),
            direction,
            sigma,
            radius,
            tile_mode,
        },
    )?;
    Some(Snapshot {
        texture,
        transform: input.transform.then(&offset),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_scalar() {
        assert_eq!(downsample_scalar(0.1), 1.0);
        assert_eq!(downsample_scalar(4.0), 1.0);
        assert_eq!(downsample_scalar(5.0), 0.5);
        assert_eq!(downsample_scalar(20.0), 0.125);
        assert_eq!(downsample_scalar(1000.0), 1.0 / 16.0);
    }

    #[test]
    fn test_pixel_alignment() {
        assert!(is_pixel_aligned(&Affine2D::translation(3.0, -2.0)));
        assert!(!is_pixel_aligned(&Affine2D::translation(0.5, 0.0)));
        assert!(!is_pixel_aligned(&Affine2D::scale(2.0, 2.0)));
    }
}
