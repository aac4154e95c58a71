//! Host-memory backend
//!
//! Executes render passes with a point-sampled triangle rasterizer. Color is
//! stored premultiplied, one [`Color`] per pixel, and stencil as one `u32`
//! per pixel. Each command first computes its coverage (the union of its
//! triangles, or their winding numbers when the pipeline carries a winding
//! rule) and then tests, writes stencil and blends once per covered pixel.
//!
//! Pixel storage is keyed by [`TextureId`] and dropped once the texture is.

use std::sync::{Arc, Weak};

use quill_core::{Affine2D, Color, FillType, ISize, Point};
use rustc_hash::FxHashMap;

use crate::allocator::{Allocator, HostAllocator, Texture, TextureId};
use crate::backend::Backend;
use crate::command::{
    ColorVertex, Command, GradientStop, PrimitiveType, RenderPass, SamplerMode, ShaderBinding,
    SolidVertex, StencilMode, TextureFilter, TextureVertex, TileMode, VertexBuffer, VertexLayout,
};
use crate::render_target::{ColorAttachment, LoadAction, StencilAttachment};
use crate::{GpuError, Result};

/// Sample offset from the pixel center; keeps samples off integer edges.
const SAMPLE_BIAS: f32 = 1.0 / 1024.0;

#[derive(Debug)]
enum SurfaceData {
    Color(Vec<Color>),
    Stencil(Vec<u32>),
}

#[derive(Debug)]
struct Surface {
    texture: Weak<Texture>,
    size: ISize,
    data: SurfaceData,
}

#[derive(Clone, Copy, Debug)]
struct RasterVertex {
    position: Point,
    uv: Point,
    color: Color,
}

#[derive(Clone, Copy, Debug)]
struct Hit {
    triangle: u32,
    weights: [f32; 3],
}

/// Backend that renders into host memory
#[derive(Debug)]
pub struct SoftwareBackend {
    allocator: HostAllocator,
    surfaces: FxHashMap<TextureId, Surface>,
    passes_submitted: u64,
    commands_executed: u64,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new(HostAllocator::default())
    }
}

impl SoftwareBackend {
    pub fn new(allocator: HostAllocator) -> Self {
        Self {
            allocator,
            surfaces: FxHashMap::default(),
            passes_submitted: 0,
            commands_executed: 0,
        }
    }

    pub fn host_allocator(&self) -> &HostAllocator {
        &self.allocator
    }

    pub fn host_allocator_mut(&mut self) -> &mut HostAllocator {
        &mut self.allocator
    }

    pub fn passes_submitted(&self) -> u64 {
        self.passes_submitted
    }

    pub fn commands_executed(&self) -> u64 {
        self.commands_executed
    }

    /// Upload straight-alpha pixels, row-major.
    pub fn write_pixels(&mut self, texture: &Arc<Texture>, pixels: &[Color]) -> bool {
        let size = texture.size();
        if pixels.len() as u64 != size.area() {
            tracing::warn!(
                expected = size.area(),
                actual = pixels.len(),
                "Pixel upload does not match texture size"
            );
            return false;
        }
        let data = pixels.iter().map(|c| c.premultiply()).collect();
        self.surfaces.insert(
            texture.id(),
            Surface {
                texture: Arc::downgrade(texture),
                size,
                data: SurfaceData::Color(data),
            },
        );
        true
    }

    /// Straight-alpha color of one pixel.
    pub fn read_pixel(&self, texture: &Texture, x: u32, y: u32) -> Option<Color> {
        let (pixels, size) = self.color_surface(texture)?;
        if x >= size.width || y >= size.height {
            return None;
        }
        Some(pixels[(y * size.width + x) as usize].unpremultiply())
    }

    /// Straight-alpha pixels, row-major.
    pub fn read_pixels(&self, texture: &Texture) -> Option<Vec<Color>> {
        let (pixels, _) = self.color_surface(texture)?;
        Some(pixels.iter().map(|c| c.unpremultiply()).collect())
    }

    pub fn read_stencil(&self, texture: &Texture, x: u32, y: u32) -> Option<u32> {
        let surface = self.surfaces.get(&texture.id())?;
        match &surface.data {
            SurfaceData::Stencil(values) if x < surface.size.width && y < surface.size.height => {
                Some(values[(y * surface.size.width + x) as usize])
            }
            _ => None,
        }
    }

    fn color_surface(&self, texture: &Texture) -> Option<(&[Color], ISize)> {
        let surface = self.surfaces.get(&texture.id())?;
        match &surface.data {
            SurfaceData::Color(pixels) => Some((pixels, surface.size)),
            SurfaceData::Stencil(_) => None,
        }
    }

    fn prune(&mut self) {
        self.surfaces
            .retain(|_, surface| surface.texture.strong_count() > 0);
    }

    fn store(&mut self, texture: &Arc<Texture>, data: SurfaceData) {
        self.surfaces.insert(
            texture.id(),
            Surface {
                texture: Arc::downgrade(texture),
                size: texture.size(),
                data,
            },
        );
    }

    fn load_color(&self, attachment: &ColorAttachment, pixel_count: usize) -> Vec<Color> {
        match attachment.load_action {
            LoadAction::Clear => vec![attachment.clear_color.premultiply(); pixel_count],
            LoadAction::DontCare => vec![Color::TRANSPARENT; pixel_count],
            LoadAction::Load => {
                let existing = self.color_surface(&attachment.texture).or_else(|| {
                    attachment
                        .resolve_texture
                        .as_ref()
                        .and_then(|resolve| self.color_surface(resolve))
                });
                match existing {
                    Some((pixels, _)) if pixels.len() == pixel_count => pixels.to_vec(),
                    _ => vec![Color::TRANSPARENT; pixel_count],
                }
            }
        }
    }

    fn load_stencil(&self, attachment: &StencilAttachment, pixel_count: usize) -> Vec<u32> {
        if attachment.load_action == LoadAction::Load {
            if let Some(Surface {
                data: SurfaceData::Stencil(values),
                ..
            }) = self.surfaces.get(&attachment.texture.id())
            {
                if values.len() == pixel_count {
                    return values.clone();
                }
            }
        }
        vec![attachment.clear_stencil; pixel_count]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rasterization
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&self, command: &Command, size: ISize, color: &mut [Color], mut stencil: Option<&mut [u32]>) {
        let Some(triangles) = assemble_triangles(command) else {
            tracing::warn!(label = %command.label, "Command vertex data is out of range");
            return;
        };
        if triangles.is_empty() {
            return;
        }

        // Pixel region touched by any triangle
        let mut min = Point::new(f32::MAX, f32::MAX);
        let mut max = Point::new(f32::MIN, f32::MIN);
        for triangle in &triangles {
            for v in triangle {
                min = min.min(v.position);
                max = max.max(v.position);
            }
        }
        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().max(0.0) as u32).min(size.width);
        let y1 = (max.y.ceil().max(0.0) as u32).min(size.height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let region_width = (x1 - x0) as usize;
        let region_len = region_width * (y1 - y0) as usize;

        let winding_rule = command.pipeline.winding_rule;
        let mut winding = vec![0i32; if winding_rule.is_some() { region_len } else { 0 }];
        let mut hits: Vec<Option<Hit>> = vec![None; region_len];

        for (index, [a, b, c]) in triangles.iter().enumerate() {
            let area = edge(a.position, b.position, c.position);
            if area.abs() <= f32::EPSILON || !area.is_finite() {
                continue;
            }
            let tmin = a.position.min(b.position).min(c.position);
            let tmax = a.position.max(b.position).max(c.position);
            let tx0 = (tmin.x.floor().max(x0 as f32) as u32).max(x0);
            let ty0 = (tmin.y.floor().max(y0 as f32) as u32).max(y0);
            let tx1 = (tmax.x.ceil().max(0.0) as u32).min(x1);
            let ty1 = (tmax.y.ceil().max(0.0) as u32).min(y1);

            for y in ty0..ty1 {
                for x in tx0..tx1 {
                    let p = Point::new(x as f32 + 0.5 + SAMPLE_BIAS, y as f32 + 0.5 + SAMPLE_BIAS);
                    let w0 = edge(b.position, c.position, p) / area;
                    let w1 = edge(c.position, a.position, p) / area;
                    let w2 = edge(a.position, b.position, p) / area;
                    if !edge_owns(b.position, c.position, w0, area)
                        || !edge_owns(c.position, a.position, w1, area)
                        || !edge_owns(a.position, b.position, w2, area)
                    {
                        continue;
                    }
                    let local = (y - y0) as usize * region_width + (x - x0) as usize;
                    if winding_rule.is_some() {
                        winding[local] += if area > 0.0 { 1 } else { -1 };
                    }
                    hits[local] = Some(Hit {
                        triangle: index as u32,
                        weights: [w0, w1, w2],
                    });
                }
            }
        }

        let local_from_device = command.transform.invert();
        let mode = command.pipeline.stencil_mode;
        let reference = command.stencil_reference;

        for y in y0..y1 {
            for x in x0..x1 {
                let local = (y - y0) as usize * region_width + (x - x0) as usize;
                let Some(hit) = hits[local] else {
                    continue;
                };
                if let Some(rule) = winding_rule {
                    let covered = match rule {
                        FillType::NonZero => winding[local] != 0,
                        FillType::EvenOdd => winding[local] % 2 != 0,
                    };
                    if !covered {
                        continue;
                    }
                }

                let pixel = (y * size.width + x) as usize;
                let stencil_value = stencil.as_deref().map_or(0, |s| s[pixel]);
                let passes = match mode {
                    StencilMode::Ignore => true,
                    StencilMode::CompareEqual
                    | StencilMode::IncrementWhereEqual
                    | StencilMode::DecrementWhereEqual => stencil_value == reference,
                    StencilMode::RestoreWhereGreater => stencil_value > reference,
                };
                if !passes {
                    continue;
                }

                if let Some(values) = stencil.as_deref_mut() {
                    match mode {
                        StencilMode::IncrementWhereEqual => {
                            values[pixel] = values[pixel].saturating_add(1).min(255)
                        }
                        StencilMode::DecrementWhereEqual => {
                            values[pixel] = values[pixel].saturating_sub(1)
                        }
                        StencilMode::RestoreWhereGreater => values[pixel] = reference,
                        StencilMode::Ignore | StencilMode::CompareEqual => {}
                    }
                }

                if !mode.writes_color() {
                    continue;
                }
                let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                let triangle = &triangles[hit.triangle as usize];
                if let Some(src) = self.shade(&command.shader, local_from_device.as_ref(), center, triangle, hit.weights) {
                    color[pixel] = command.pipeline.blend_mode.apply(src, color[pixel]).clamped();
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shading
    // ─────────────────────────────────────────────────────────────────────────

    /// Premultiplied source color at device position `center`.
    fn shade(
        &self,
        shader: &ShaderBinding,
        local_from_device: Option<&Affine2D>,
        center: Point,
        triangle: &[RasterVertex; 3],
        weights: [f32; 3],
    ) -> Option<Color> {
        let interpolate_uv = || {
            triangle[0].uv * weights[0] + triangle[1].uv * weights[1] + triangle[2].uv * weights[2]
        };

        match shader {
            ShaderBinding::SolidFill { color } => Some(color.premultiply()),
            ShaderBinding::LinearGradient {
                start,
                end,
                stops,
                tile_mode,
                alpha,
            } => {
                let local = local_from_device?.transform_point(center);
                let axis = *end - *start;
                let length_squared = axis.dot(axis);
                let t = if length_squared > 0.0 {
                    (local - *start).dot(axis) / length_squared
                } else {
                    0.0
                };
                let Some(t) = tile_mode.apply(t) else {
                    return Some(Color::TRANSPARENT);
                };
                let color = gradient_color(stops, t);
                Some(color.with_alpha(color.a * alpha).premultiply())
            }
            ShaderBinding::Texture {
                texture,
                uv_transform,
                sampler,
                tile_mode,
                alpha,
            } => {
                let local = local_from_device?.transform_point(center);
                let uv = uv_transform.transform_point(local);
                Some(scale_color(self.sample(texture, uv, *sampler, *tile_mode), *alpha))
            }
            ShaderBinding::VertexColor { color, blend_mode } => {
                let vertex_color = Color::rgba(
                    triangle[0].color.r * weights[0] + triangle[1].color.r * weights[1] + triangle[2].color.r * weights[2],
                    triangle[0].color.g * weights[0] + triangle[1].color.g * weights[1] + triangle[2].color.g * weights[2],
                    triangle[0].color.b * weights[0] + triangle[1].color.b * weights[1] + triangle[2].color.b * weights[2],
                    triangle[0].color.a * weights[0] + triangle[1].color.a * weights[1] + triangle[2].color.a * weights[2],
                );
                Some(blend_mode.apply(color.premultiply(), vertex_color.premultiply()).clamped())
            }
            ShaderBinding::Glyph {
                atlas,
                color,
                force_color,
                is_color_glyph,
            } => {
                let texel = match atlas {
                    Some(atlas) => self.sample(atlas, interpolate_uv(), SamplerMode::Linear, TileMode::Clamp),
                    None => Color::WHITE,
                };
                if *is_color_glyph && !*force_color {
                    Some(scale_color(texel, color.a))
                } else {
                    Some(scale_color(color.premultiply(), texel.a))
                }
            }
            ShaderBinding::GaussianBlur {
                texture,
                uv_transform,
                direction,
                sigma,
                radius,
                tile_mode,
            } => {
                let local = local_from_device?.transform_point(center);
                let uv = uv_transform.transform_point(local);
                Some(self.blur_sample(texture, uv, *direction, *sigma, *radius, *tile_mode))
            }
            ShaderBinding::FilterTexture {
                texture,
                uv_transform,
                filter,
                alpha,
            } => {
                let local = local_from_device?.transform_point(center);
                let uv = uv_transform.transform_point(local);
                let texel = self.sample(texture, uv, SamplerMode::Nearest, TileMode::Decal);
                let filtered = match filter {
                    TextureFilter::ColorMatrix(matrix) => {
                        texel.unpremultiply().apply_color_matrix(matrix).premultiply()
                    }
                    TextureFilter::Blend(color, mode) => mode.apply(color.premultiply(), texel).clamped(),
                };
                Some(scale_color(filtered, *alpha))
            }
        }
    }

    /// Premultiplied texel at normalized `uv`.
    fn sample(&self, texture: &Texture, uv: Point, sampler: SamplerMode, tile_mode: TileMode) -> Color {
        let Some((pixels, size)) = self.color_surface(texture) else {
            return Color::TRANSPARENT;
        };
        let (Some(u), Some(v)) = (tile_mode.apply(uv.x), tile_mode.apply(uv.y)) else {
            return Color::TRANSPARENT;
        };
        let texel = |x: i64, y: i64| {
            let x = x.clamp(0, size.width as i64 - 1) as u32;
            let y = y.clamp(0, size.height as i64 - 1) as u32;
            pixels[(y * size.width + x) as usize]
        };
        match sampler {
            SamplerMode::Nearest => {
                let x = (u * size.width as f32).floor() as i64;
                let y = (v * size.height as f32).floor() as i64;
                texel(x, y)
            }
            SamplerMode::Linear => {
                let fx = u * size.width as f32 - 0.5;
                let fy = v * size.height as f32 - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let tx = fx - x0;
                let ty = fy - y0;
                let (x0, y0) = (x0 as i64, y0 as i64);
                let top = texel(x0, y0).lerp(texel(x0 + 1, y0), tx);
                let bottom = texel(x0, y0 + 1).lerp(texel(x0 + 1, y0 + 1), tx);
                top.lerp(bottom, ty)
            }
        }
    }

    fn blur_sample(
        &self,
        texture: &Texture,
        uv: Point,
        direction: Point,
        sigma: f32,
        radius: u32,
        tile_mode: TileMode,
    ) -> Color {
        let size = texture.size().to_size();
        if !(sigma > 0.0) || radius == 0 {
            return self.sample(texture, uv, SamplerMode::Nearest, tile_mode);
        }
        let step = Point::new(direction.x / size.width, direction.y / size.height);
        let mut total = Color::TRANSPARENT;
        let mut weight_sum = 0.0;
        let radius = radius as i32;
        for k in -radius..=radius {
            let weight = (-((k * k) as f32) / (2.0 * sigma * sigma)).exp();
            let texel = self.sample(texture, uv + step * k as f32, SamplerMode::Nearest, tile_mode);
            total = Color::rgba(
                total.r + texel.r * weight,
                total.g + texel.g * weight,
                total.b + texel.b * weight,
                total.a + texel.a * weight,
            );
            weight_sum += weight;
        }
        scale_color(total, 1.0 / weight_sum)
    }
}

impl Backend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "Software"
    }

    fn allocator(&self) -> &dyn Allocator {
        &self.allocator
    }

    fn submit(&mut self, pass: RenderPass) -> Result<()> {
        self.prune();

        let target = pass.render_target();
        if !target.is_valid() {
            return Err(GpuError::InvalidRenderTarget(pass.label().to_string()));
        }
        for command in pass.commands() {
            if let Some(texture) = command.shader.textures() {
                if Arc::ptr_eq(texture, &target.color.texture) {
                    return Err(GpuError::SubmitFailed(format!(
                        "command '{}' samples its own render target",
                        command.label
                    )));
                }
            }
        }

        let size = target.size();
        let pixel_count = size.area() as usize;
        let mut color = self.load_color(&target.color, pixel_count);
        let mut stencil = target
            .stencil
            .as_ref()
            .map(|attachment| self.load_stencil(attachment, pixel_count));

        for command in pass.commands() {
            self.execute(command, size, &mut color, stencil.as_deref_mut());
        }
        self.commands_executed += pass.commands().len() as u64;

        let attachment = &target.color;
        let mut resolved = false;
        if attachment.store_action.resolves() {
            if let Some(resolve) = &attachment.resolve_texture {
                self.store(resolve, SurfaceData::Color(color.clone()));
                resolved = true;
            }
        }
        if attachment.store_action.stores() || (attachment.store_action.resolves() && !resolved) {
            self.store(&attachment.texture, SurfaceData::Color(color));
        } else {
            self.surfaces.remove(&attachment.texture.id());
        }

        if let (Some(attachment), Some(values)) = (&target.stencil, stencil) {
            if attachment.store_action.stores() {
                self.store(&attachment.texture, SurfaceData::Stencil(values));
            } else {
                self.surfaces.remove(&attachment.texture.id());
            }
        }

        self.passes_submitted += 1;
        tracing::trace!(
            label = pass.label(),
            commands = pass.commands().len(),
            "Executed render pass"
        );
        Ok(())
    }
}

fn edge(a: Point, b: Point, p: Point) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Whether a sample with barycentric `weight` against edge `start -> end`
/// is inside. Samples exactly on an edge belong to one of the two triangles
/// sharing it, so winding counts see every edge once.
fn edge_owns(start: Point, end: Point, weight: f32, area: f32) -> bool {
    if weight != 0.0 {
        return weight > 0.0;
    }
    let sign = area.signum();
    let dx = (end.x - start.x) * sign;
    let dy = (end.y - start.y) * sign;
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

fn scale_color(color: Color, factor: f32) -> Color {
    Color::rgba(color.r * factor, color.g * factor, color.b * factor, color.a * factor)
}

fn gradient_color(stops: &[GradientStop], t: f32) -> Color {
    let Some(first) = stops.first() else {
        return Color::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            return a.color.lerp(b.color, local);
        }
    }
    stops[stops.len() - 1].color
}

fn fetch_vertex(buffer: &VertexBuffer, index: usize, transform: &Affine2D) -> Option<RasterVertex> {
    match buffer.layout {
        VertexLayout::Position => {
            let v: SolidVertex = buffer.read_vertex(index)?;
            Some(RasterVertex {
                position: transform.transform_point(Point::new(v.position[0], v.position[1])),
                uv: Point::ZERO,
                color: Color::TRANSPARENT,
            })
        }
        VertexLayout::PositionUv => {
            let v: TextureVertex = buffer.read_vertex(index)?;
            Some(RasterVertex {
                position: transform.transform_point(Point::new(v.position[0], v.position[1])),
                uv: Point::new(v.uv[0], v.uv[1]),
                color: Color::TRANSPARENT,
            })
        }
        VertexLayout::PositionColor => {
            let v: ColorVertex = buffer.read_vertex(index)?;
            let [r, g, b, a] = v.color;
            Some(RasterVertex {
                position: transform.transform_point(Point::new(v.position[0], v.position[1])),
                uv: Point::ZERO,
                color: Color::rgba(r, g, b, a),
            })
        }
    }
}

fn assemble_triangles(command: &Command) -> Option<Vec<[RasterVertex; 3]>> {
    let buffer = &command.vertex_buffer;
    let elements = (0..buffer.element_count())
        .map(|element| {
            buffer
                .read_index(element)
                .and_then(|index| fetch_vertex(buffer, index, &command.transform))
        })
        .collect::<Option<Vec<_>>>()?;

    let triangles = match command.pipeline.primitive_type {
        PrimitiveType::Triangle => elements
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect(),
        PrimitiveType::TriangleStrip => elements
            .windows(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect(),
    };
    Some(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{IndexData, PipelineDescriptor};
    use crate::geometry::{Geometry, GeometryContext};
    use crate::render_target::{AttachmentConfig, RenderTarget};
    use crate::tessellator::Tessellator;
    use quill_core::{BlendMode, PathBuilder, Rect};

    fn target(backend: &SoftwareBackend, size: u32) -> RenderTarget {
        RenderTarget::create_offscreen(
            backend.allocator(),
            ISize::new(size, size),
            1,
            "Test",
            AttachmentConfig::color(),
            Some(AttachmentConfig::stencil()),
            None,
            None,
        )
        .unwrap()
    }

    fn command(
        backend: &SoftwareBackend,
        geometry: &Geometry,
        shader: ShaderBinding,
        stencil_mode: StencilMode,
        stencil_reference: u32,
    ) -> Command {
        let mut tessellator = Tessellator::default();
        let mut ctx = GeometryContext {
            allocator: backend.allocator(),
            tessellator: &mut tessellator,
            target_size: ISize::new(16, 16),
        };
        let result = geometry.position_buffer(&mut ctx, &Affine2D::IDENTITY);
        Command {
            label: "Test".to_string(),
            pipeline: PipelineDescriptor {
                blend_mode: BlendMode::SourceOver,
                stencil_mode,
                primitive_type: result.primitive_type,
                winding_rule: result.winding_rule,
                sample_count: 1,
            },
            transform: result.transform,
            vertex_buffer: result.vertex_buffer,
            shader,
            stencil_reference,
        }
    }

    fn solid(color: Color) -> ShaderBinding {
        ShaderBinding::SolidFill { color }
    }

    #[test]
    fn test_solid_rect() {
        let mut backend = SoftwareBackend::default();
        let target = target(&backend, 16);
        let mut pass = RenderPass::new("Test", target.clone());
        pass.add_command(command(
            &backend,
            &Geometry::Rect(Rect::new(4.0, 4.0, 8.0, 8.0)),
            solid(Color::RED),
            StencilMode::CompareEqual,
            0,
        ));
        backend.submit(pass).unwrap();

        let texture = target.render_target_texture();
        assert_eq!(backend.read_pixel(&texture, 5, 5), Some(Color::RED));
        assert_eq!(backend.read_pixel(&texture, 11, 11), Some(Color::RED));
        assert_eq!(backend.read_pixel(&texture, 12, 12), Some(Color::TRANSPARENT));
        assert_eq!(backend.read_pixel(&texture, 3, 5), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_stencil_clip() {
        let mut backend = SoftwareBackend::default();
        let target = target(&backend, 16);
        let mut pass = RenderPass::new("Test", target.clone());
        pass.add_command(command(
            &backend,
            &Geometry::Rect(Rect::new(0.0, 0.0, 8.0, 16.0)),
            solid(Color::TRANSPARENT),
            StencilMode::IncrementWhereEqual,
            0,
        ));
        pass.add_command(command(
            &backend,
            &Geometry::Cover,
            solid(Color::BLUE),
            StencilMode::CompareEqual,
            1,
        ));
        backend.submit(pass).unwrap();

        let texture = target.render_target_texture();
        assert_eq!(backend.read_pixel(&texture, 2, 2), Some(Color::BLUE));
        assert_eq!(backend.read_pixel(&texture, 12, 2), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_even_odd_winding_leaves_hole() {
        let mut backend = SoftwareBackend::default();
        let target = target(&backend, 16);
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 16.0, 16.0))
            .add_rect(Rect::new(4.0, 4.0, 8.0, 8.0))
            .set_fill_type(FillType::EvenOdd)
            .take_path();
        let polyline = path.create_polyline(1.0);

        // Build the fan by hand so the winding path is exercised
        let mut tessellator = Tessellator::new(crate::tessellator::TessellatorConfig {
            max_exact_contours: 0,
            ..Default::default()
        });
        let mut points = Vec::new();
        let mut rule = None;
        tessellator.tessellate(&polyline, false, |v| {
            points = v.points.to_vec();
            rule = v.winding_rule;
            true
        });
        let vertices: Vec<SolidVertex> = points.iter().map(|p| SolidVertex::new(*p)).collect();
        let mut pass = RenderPass::new("Test", target.clone());
        pass.add_command(Command {
            label: "Winding".to_string(),
            pipeline: PipelineDescriptor {
                winding_rule: rule,
                ..Default::default()
            },
            transform: Affine2D::IDENTITY,
            vertex_buffer: VertexBuffer::create(
                backend.allocator(),
                "Winding",
                VertexLayout::Position,
                &vertices,
                IndexData::None,
            ),
            shader: solid(Color::GREEN),
            stencil_reference: 0,
        });
        backend.submit(pass).unwrap();

        let texture = target.render_target_texture();
        assert_eq!(backend.read_pixel(&texture, 1, 1), Some(Color::GREEN));
        assert_eq!(backend.read_pixel(&texture, 8, 8), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_shared_edge_has_one_owner() {
        let (p, q) = (Point::new(0.0, 0.0), Point::new(16.0, 16.0));
        // Two triangles of equal orientation walk a shared edge in opposite directions
        assert_ne!(edge_owns(p, q, 0.0, 256.0), edge_owns(q, p, 0.0, 256.0));
        assert_ne!(edge_owns(p, q, -0.0, -256.0), edge_owns(q, p, -0.0, -256.0));
        assert!(edge_owns(p, q, 0.25, 256.0));
        assert!(!edge_owns(p, q, -0.25, 256.0));
    }

    #[test]
    fn test_texture_sampling() {
        let mut backend = SoftwareBackend::default();
        let mut desc = crate::allocator::TextureDescriptor::new(
            "Image",
            ISize::new(2, 1),
            crate::allocator::PixelFormat::Rgba8Unorm,
        );
        desc.usage = crate::allocator::TextureUsage::SHADER_READ;
        let image = backend.allocator().create_texture(&desc).unwrap();
        assert!(backend.write_pixels(&image, &[Color::RED, Color::BLUE]));

        let target = target(&backend, 4);
        let mut pass = RenderPass::new("Test", target.clone());
        pass.add_command(command(
            &backend,
            &Geometry::Rect(Rect::new(0.0, 0.0, 4.0, 4.0)),
            ShaderBinding::Texture {
                texture: image.clone(),
                uv_transform: Affine2D::scale(0.25, 0.25),
                sampler: SamplerMode::Nearest,
                tile_mode: TileMode::Clamp,
                alpha: 1.0,
            },
            StencilMode::Ignore,
            0,
        ));
        backend.submit(pass).unwrap();

        let texture = target.render_target_texture();
        assert_eq!(backend.read_pixel(&texture, 0, 0), Some(Color::RED));
        assert_eq!(backend.read_pixel(&texture, 3, 3), Some(Color::BLUE));
    }

    #[test]
    fn test_msaa_resolves_into_resolve_texture() {
        let mut backend = SoftwareBackend::default();
        let target = RenderTarget::create_offscreen_msaa(
            backend.allocator(),
            ISize::new(4, 4),
            1,
            "MSAA",
            4,
            AttachmentConfig::color_msaa(),
            None,
            None,
            None,
            None,
        )
        .unwrap();
        let mut pass = RenderPass::new("Test", target.clone());
        pass.add_command(command(
            &backend,
            &Geometry::Cover,
            solid(Color::WHITE),
            StencilMode::Ignore,
            0,
        ));
        backend.submit(pass).unwrap();

        let resolve = target.render_target_texture();
        assert_eq!(backend.read_pixel(&resolve, 0, 0), Some(Color::WHITE));
        assert!(backend.read_pixel(&target.color.texture, 0, 0).is_none());
    }

    #[test]
    fn test_load_action_keeps_contents() {
        let mut backend = SoftwareBackend::default();
        let target = target(&backend, 4);
        let mut first = RenderPass::new("First", target.clone());
        first.add_command(command(&backend, &Geometry::Cover, solid(Color::RED), StencilMode::Ignore, 0));
        backend.submit(first).unwrap();

        let second = RenderPass::new("Second", target.with_load_actions());
        backend.submit(second).unwrap();
        let texture = target.render_target_texture();
        assert_eq!(backend.read_pixel(&texture, 1, 1), Some(Color::RED));

        let cleared = RenderPass::new("Cleared", target.clone());
        backend.submit(cleared).unwrap();
        assert_eq!(backend.read_pixel(&texture, 1, 1), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_surfaces_pruned_with_textures() {
        let mut backend = SoftwareBackend::default();
        {
            let target = target(&backend, 4);
            backend.submit(RenderPass::new("Test", target)).unwrap();
        }
        let other = target(&backend, 4);
        backend.submit(RenderPass::new("Other", other)).unwrap();
        assert_eq!(backend.surfaces.len(), 1);
    }
}
