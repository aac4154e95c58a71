//! Paint: how a shape is filled, stroked, filtered and blended

use quill_core::{Affine2D, BlendMode, Color, Point, Rect};
use quill_gpu::{Cap, Geometry, GradientStop, Join, SamplerMode, StrokeStyle, TileMode};

use crate::contents::Contents;
use crate::image::Image;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
}

/// Where a paint's colors come from
#[derive(Clone, Debug, Default)]
pub enum ColorSource {
    /// The paint's own color
    #[default]
    Color,
    LinearGradient {
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
        tile_mode: TileMode,
        /// Local space to gradient space
        matrix: Affine2D,
    },
    Image {
        image: Image,
        tile_mode: TileMode,
        sampler: SamplerMode,
        /// Local space to image pixels
        matrix: Affine2D,
    },
}

impl ColorSource {
    pub fn linear_gradient(start: Point, end: Point, colors: &[Color], tile_mode: TileMode) -> Self {
        let last = colors.len().saturating_sub(1).max(1) as f32;
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, color)| GradientStop {
                offset: i as f32 / last,
                color: *color,
            })
            .collect();
        ColorSource::LinearGradient {
            start,
            end,
            stops,
            tile_mode,
            matrix: Affine2D::IDENTITY,
        }
    }
}

/// Per-color transformation applied before blending
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorFilter {
    /// Blend a constant color over the input
    Blend(Color, BlendMode),
    /// 4x5 row-major matrix on straight-alpha RGBA
    Matrix([f32; 20]),
}

/// Color matrix that inverts RGB and keeps alpha.
pub const INVERT_COLOR_MATRIX: [f32; 20] = [
    -1.0, 0.0, 0.0, 0.0, 1.0, //
    0.0, -1.0, 0.0, 0.0, 1.0, //
    0.0, 0.0, -1.0, 0.0, 1.0, //
    0.0, 0.0, 0.0, 1.0, 0.0, //
];

impl ColorFilter {
    /// Filter a straight-alpha color.
    pub fn apply(&self, color: Color) -> Color {
        match self {
            ColorFilter::Blend(src, mode) => mode
                .apply(src.premultiply(), color.premultiply())
                .clamped()
                .unpremultiply(),
            ColorFilter::Matrix(matrix) => color.apply_color_matrix(matrix),
        }
    }
}

/// Filters applied to a rendered snapshot
#[derive(Clone, Debug, PartialEq)]
pub enum ImageFilter {
    /// Gaussian blur; sigmas are in local units and scale with the transform
    Blur {
        sigma_x: f32,
        sigma_y: f32,
        tile_mode: TileMode,
    },
    ColorFilter(ColorFilter),
    /// `inner` runs first
    Compose {
        outer: Box<ImageFilter>,
        inner: Box<ImageFilter>,
    },
}

impl ImageFilter {
    pub fn blur(sigma_x: f32, sigma_y: f32) -> Self {
        ImageFilter::Blur {
            sigma_x,
            sigma_y,
            tile_mode: TileMode::Decal,
        }
    }

    pub fn compose(outer: ImageFilter, inner: ImageFilter) -> Self {
        ImageFilter::Compose {
            outer: Box::new(outer),
            inner: Box::new(inner),
        }
    }

    /// How far, in device pixels, the filter can move content outwards.
    pub fn outset(&self, transform: &Affine2D) -> Point {
        match self {
            ImageFilter::Blur {
                sigma_x, sigma_y, ..
            } => {
                let sigma = device_sigma(*sigma_x, *sigma_y, transform);
                Point::new(blur_radius(sigma.x) as f32, blur_radius(sigma.y) as f32)
            }
            ImageFilter::ColorFilter(_) => Point::ZERO,
            ImageFilter::Compose { outer, inner } => outer.outset(transform) + inner.outset(transform),
        }
    }

    pub fn expand_coverage(&self, coverage: &Rect, transform: &Affine2D) -> Rect {
        let outset = self.outset(transform);
        coverage.expand(outset.x, outset.y)
    }
}

/// Sigmas scaled into device space by each basis vector of `transform`.
pub(crate) fn device_sigma(sigma_x: f32, sigma_y: f32, transform: &Affine2D) -> Point {
    let x_basis = transform.transform_vector(Point::new(1.0, 0.0)).length();
    let y_basis = transform.transform_vector(Point::new(0.0, 1.0)).length();
    Point::new(sigma_x.max(0.0) * x_basis, sigma_y.max(0.0) * y_basis)
}

/// Kernel radius in pixels for `sigma`.
pub fn blur_radius(sigma: f32) -> u32 {
    if sigma > 0.0 {
        (sigma * 3.0).ceil() as u32
    } else {
        0
    }
}

/// Blur applied to a shape's coverage mask
///
/// Only the normal style (blur inside and outside the shape) is supported.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskBlurDescriptor {
    pub sigma: f32,
}

impl MaskBlurDescriptor {
    pub fn normal(sigma: f32) -> Self {
        Self { sigma }
    }
}

/// Everything that controls how a draw call looks
#[derive(Clone, Debug)]
pub struct Paint {
    /// Straight alpha; also the opacity of save layers
    pub color: Color,
    pub color_source: ColorSource,
    pub style: PaintStyle,
    pub stroke_width: f32,
    pub stroke_cap: Cap,
    pub stroke_join: Join,
    pub stroke_miter: f32,
    pub blend_mode: BlendMode,
    pub color_filter: Option<ColorFilter>,
    pub image_filter: Option<ImageFilter>,
    pub mask_blur_descriptor: Option<MaskBlurDescriptor>,
    pub invert_colors: bool,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            color_source: ColorSource::Color,
            style: PaintStyle::Fill,
            stroke_width: 0.0,
            stroke_cap: Cap::Butt,
            stroke_join: Join::Miter,
            stroke_miter: 4.0,
            blend_mode: BlendMode::SourceOver,
            color_filter: None,
            image_filter: None,
            mask_blur_descriptor: None,
            invert_colors: false,
        }
    }
}

impl Paint {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn stroke(color: Color, width: f32) -> Self {
        Self {
            color,
            style: PaintStyle::Stroke,
            stroke_width: width,
            ..Default::default()
        }
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_color_source(mut self, color_source: ColorSource) -> Self {
        self.color_source = color_source;
        self
    }

    pub fn with_color_filter(mut self, color_filter: ColorFilter) -> Self {
        self.color_filter = Some(color_filter);
        self
    }

    pub fn with_image_filter(mut self, image_filter: ImageFilter) -> Self {
        self.image_filter = Some(image_filter);
        self
    }

    pub fn with_mask_blur(mut self, sigma: f32) -> Self {
        self.mask_blur_descriptor = Some(MaskBlurDescriptor::normal(sigma));
        self
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle::new(self.stroke_width)
            .with_cap(self.stroke_cap)
            .with_join(self.stroke_join)
            .with_miter_limit(self.stroke_miter)
    }

    /// Color filters in application order, invert last.
    fn color_filters(&self) -> impl Iterator<Item = ColorFilter> + '_ {
        self.color_filter
            .iter()
            .copied()
            .chain(self.invert_colors.then_some(ColorFilter::Matrix(INVERT_COLOR_MATRIX)))
    }

    /// Contents drawing `geometry` with this paint.
    pub fn create_contents(&self, geometry: Geometry) -> Contents {
        let contents = match &self.color_source {
            ColorSource::Color => {
                // Solid colors absorb color filters directly
                let color = self.color_filters().fold(self.color, |color, filter| filter.apply(color));
                return self.with_filters(Contents::SolidColor { geometry, color }, false);
            }
            ColorSource::LinearGradient {
                start,
                end,
                stops,
                tile_mode,
                matrix,
            } => {
                let (start, end) = match matrix.invert() {
                    Some(inverse) => (inverse.transform_point(*start), inverse.transform_point(*end)),
                    None => (*start, *end),
                };
                Contents::LinearGradient {
                    geometry,
                    start,
                    end,
                    stops: stops.clone(),
                    tile_mode: *tile_mode,
                    alpha: self.color.a,
                }
            }
            ColorSource::Image {
                image,
                tile_mode,
                sampler,
                matrix,
            } => {
                let size = image.size().to_size();
                let uv_transform = Affine2D::scale(1.0 / size.width, 1.0 / size.height).then(matrix);
                Contents::Texture {
                    geometry,
                    texture: image.texture().clone(),
                    uv_transform,
                    sampler: *sampler,
                    tile_mode: *tile_mode,
                    opacity: self.color.a,
                }
            }
        };
        self.with_filters(contents, true)
    }

    /// Wrap `contents` in the paint's mask blur, color filters and image
    /// filter.
    pub fn with_filters(&self, mut contents: Contents, apply_color_filters: bool) -> Contents {
        if let Some(blur) = self.mask_blur_descriptor {
            // A zero sigma blur is skipped
            if blur.sigma > 0.0 {
                contents = Contents::Filtered {
                    input: Box::new(contents),
                    filter: ImageFilter::blur(blur.sigma, blur.sigma),
                };
            }
        }
        if apply_color_filters {
            for filter in self.color_filters() {
                contents = Contents::Filtered {
                    input: Box::new(contents),
                    filter: ImageFilter::ColorFilter(filter),
                };
            }
        }
        if let Some(filter) = &self.image_filter {
            contents = Contents::Filtered {
                input: Box::new(contents),
                filter: filter.clone(),
            };
        }
        contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::Rect;

    #[test]
    fn test_solid_color_absorbs_color_filter() {
        let paint = Paint::new(Color::RED).with_color_filter(ColorFilter::Blend(Color::BLUE, BlendMode::Source));
        match paint.create_contents(Geometry::Rect(Rect::new(0.0, 0.0, 1.0, 1.0))) {
            Contents::SolidColor { color, .. } => assert_eq!(color, Color::BLUE),
            other => panic!("unexpected contents {other:?}"),
        }
    }

    #[test]
    fn test_invert_colors() {
        let paint = Paint {
            invert_colors: true,
            ..Paint::new(Color::WHITE)
        };
        match paint.create_contents(Geometry::Cover) {
            Contents::SolidColor { color, .. } => assert_eq!(color, Color::BLACK),
            other => panic!("unexpected contents {other:?}"),
        }
    }

    #[test]
    fn test_zero_sigma_mask_blur_is_skipped() {
        let paint = Paint::new(Color::RED).with_mask_blur(0.0);
        assert!(matches!(
            paint.create_contents(Geometry::Cover),
            Contents::SolidColor { .. }
        ));

        let paint = Paint::new(Color::RED).with_mask_blur(2.0);
        assert!(matches!(
            paint.create_contents(Geometry::Cover),
            Contents::Filtered { .. }
        ));
    }

    #[test]
    fn test_blur_outset_scales_with_transform() {
        let filter = ImageFilter::blur(2.0, 1.0);
        assert_eq!(filter.outset(&Affine2D::IDENTITY), Point::new(6.0, 3.0));
        assert_eq!(filter.outset(&Affine2D::scale(2.0, 2.0)), Point::new(12.0, 6.0));
        assert_eq!(blur_radius(0.1), 1);
        assert_eq!(blur_radius(0.0), 0);
    }

    #[test]
    fn test_gradient_stops_are_spread_evenly() {
        match ColorSource::linear_gradient(
            Point::ZERO,
            Point::new(10.0, 0.0),
            &[Color::RED, Color::GREEN, Color::BLUE],
            TileMode::Clamp,
        ) {
            ColorSource::LinearGradient { stops, .. } => {
                let offsets: Vec<f32> = stops.iter().map(|s| s.offset).collect();
                assert_eq!(offsets, vec![0.0, 0.5, 1.0]);
            }
            _ => unreachable!(),
        }
    }
}
