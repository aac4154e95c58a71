//! Polygon triangulation and analytic shape vertex generation
//!
//! [`Tessellator::tessellate`] turns a flattened [`Polyline`] into triangles:
//!
//! - fewer than three points are passed through untouched
//! - convex input becomes a zig-zag triangle strip with no index buffer
//! - up to [`TessellatorConfig::max_exact_contours`] contours are triangulated
//!   by lyon, honoring the fill rule
//! - anything larger is emitted as per-contour triangle fans that the
//!   renderer resolves with a winding rule (stencil-then-cover)
//!
//! The `filled_*`, `stroked_circle` and `round_cap_line` generators produce
//! triangle strips for circles, ellipses, round rects and round-capped lines
//! directly from cached [`Trigs`] tables, sized by the on-screen radius.

use std::sync::{Arc, OnceLock};

use lyon::lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use lyon::math::point;
use lyon::path::PathEvent;
use quill_core::{Affine2D, FillType, Point, Polyline, Rect, Size};

use crate::command::PrimitiveType;
use crate::trig::Trigs;

/// Maximum deviation, in device pixels, of circle approximations.
const CIRCLE_TOLERANCE: f32 = 0.1;

/// Pixel radii below this use the precomputed division table.
const PRECOMPUTED_DIVISION_COUNT: usize = 1024;

/// Division counts below this share cached [`Trigs`].
const CACHED_TRIG_COUNT: usize = 300;

/// Upper bound on segments per quarter circle, whatever the radius.
pub const MAX_QUADRANT_DIVISIONS: usize = 16384;

/// Outcome of [`Tessellator::tessellate`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TessellatorResult {
    Success,
    /// Empty input, or the callback rejected the output
    InputError,
    /// The triangulator failed
    TessellationError,
}

/// Triangles handed to the [`Tessellator::tessellate`] callback
#[derive(Clone, Copy, Debug)]
pub struct TessellatedVertices<'a> {
    pub points: &'a [Point],
    /// Triangle-list indices into `points`, when indexed
    pub indices: Option<&'a [u16]>,
    pub primitive_type: PrimitiveType,
    /// Set when triangles overlap and coverage must be resolved by winding
    pub winding_rule: Option<FillType>,
}

/// Tessellator tuning
#[derive(Clone, Debug)]
pub struct TessellatorConfig {
    /// Paths with more contours than this skip exact triangulation
    pub max_exact_contours: usize,
    /// Flattening tolerance handed to lyon
    pub tolerance: f32,
}

impl Default for TessellatorConfig {
    fn default() -> Self {
        Self {
            max_exact_contours: 64,
            tolerance: 0.1,
        }
    }
}

impl TessellatorConfig {
    /// Defaults overridden by `QUILL_TESSELLATOR_MAX_CONTOURS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(contours) = std::env::var("QUILL_TESSELLATOR_MAX_CONTOURS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            config.max_exact_contours = contours;
        }
        config
    }
}

/// Reusable triangulation state
///
/// Holds scratch buffers so repeated calls do not reallocate. Not meant to be
/// shared between threads; create one per renderer.
pub struct Tessellator {
    config: TessellatorConfig,
    fill_tessellator: FillTessellator,
    geometry: VertexBuffers<Point, u32>,
    point_buffer: Vec<Point>,
    index_buffer: Vec<u16>,
    trigs: Vec<Option<Arc<Trigs>>>,
}

impl Default for Tessellator {
    fn default() -> Self {
        Self::new(TessellatorConfig::default())
    }
}

impl std::fmt::Debug for Tessellator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tessellator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Tessellator {
    pub fn new(config: TessellatorConfig) -> Self {
        Self {
            config,
            fill_tessellator: FillTessellator::new(),
            geometry: VertexBuffers::new(),
            point_buffer: Vec::new(),
            index_buffer: Vec::new(),
            trigs: vec![None; CACHED_TRIG_COUNT],
        }
    }

    pub fn config(&self) -> &TessellatorConfig {
        &self.config
    }

    /// Triangulate `polyline` and pass the result to `callback`.
    ///
    /// The callback returns `false` to reject the output, which is reported
    /// as [`TessellatorResult::InputError`].
    pub fn tessellate<F>(&mut self, polyline: &Polyline, is_convex: bool, mut callback: F) -> TessellatorResult
    where
        F: FnMut(TessellatedVertices<'_>) -> bool,
    {
        if polyline.points.is_empty() {
            return TessellatorResult::InputError;
        }

        // Nothing to triangulate; hand back the points as-is
        if polyline.points.len() < 3 {
            let accepted = callback(TessellatedVertices {
                points: &polyline.points,
                indices: None,
                primitive_type: PrimitiveType::TriangleStrip,
                winding_rule: None,
            });
            return accepted_result(accepted);
        }

        if is_convex {
            self.build_convex_strip(polyline);
            let accepted = callback(TessellatedVertices {
                points: &self.point_buffer,
                indices: None,
                primitive_type: PrimitiveType::TriangleStrip,
                winding_rule: None,
            });
            return accepted_result(accepted);
        }

        if polyline.contours.len() > self.config.max_exact_contours {
            self.build_contour_fans(polyline);
            let accepted = callback(TessellatedVertices {
                points: &self.point_buffer,
                indices: None,
                primitive_type: PrimitiveType::Triangle,
                winding_rule: Some(polyline.fill_type),
            });
            return accepted_result(accepted);
        }

        if let Err(result) = self.triangulate(polyline) {
            return result;
        }

        if self.geometry.vertices.len() <= u16::MAX as usize + 1 {
            self.index_buffer.clear();
            self.index_buffer
                .extend(self.geometry.indices.iter().map(|&i| i as u16));
            let accepted = callback(TessellatedVertices {
                points: &self.geometry.vertices,
                indices: Some(&self.index_buffer),
                primitive_type: PrimitiveType::Triangle,
                winding_rule: None,
            });
            accepted_result(accepted)
        } else {
            // Too many vertices for 16-bit indices; draw without an index
            // buffer instead.
            self.point_buffer.clear();
            let vertices = &self.geometry.vertices;
            self.point_buffer
                .extend(self.geometry.indices.iter().map(|&i| vertices[i as usize]));
            let accepted = callback(TessellatedVertices {
                points: &self.point_buffer,
                indices: None,
                primitive_type: PrimitiveType::Triangle,
                winding_rule: None,
            });
            accepted_result(accepted)
        }
    }

    fn triangulate(&mut self, polyline: &Polyline) -> Result<(), TessellatorResult> {
        let events = polyline_to_lyon_events(polyline);
        if events.is_empty() {
            return Err(TessellatorResult::InputError);
        }

        let fill_rule = match polyline.fill_type {
            FillType::NonZero => FillRule::NonZero,
            FillType::EvenOdd => FillRule::EvenOdd,
        };
        let options = FillOptions::default()
            .with_tolerance(self.config.tolerance)
            .with_fill_rule(fill_rule);

        self.geometry.vertices.clear();
        self.geometry.indices.clear();
        let result = self.fill_tessellator.tessellate(
            events.iter().cloned(),
            &options,
            &mut BuffersBuilder::new(&mut self.geometry, |vertex: FillVertex| {
                let p = vertex.position();
                Point::new(p.x, p.y)
            }),
        );

        if let Err(err) = result {
            tracing::warn!("Path fill tessellation failed: {:?}", err);
            return Err(TessellatorResult::TessellationError);
        }
        Ok(())
    }

    /// Zig-zag strip over each contour, bridged with degenerate triangles.
    fn build_convex_strip(&mut self, polyline: &Polyline) {
        self.point_buffer.clear();
        for index in 0..polyline.contours.len() {
            let mut points = polyline.contour_points(index);
            if points.len() > 1 && points.first() == points.last() {
                points = &points[..points.len() - 1];
            }
            if points.is_empty() {
                continue;
            }

            if let Some(&last) = self.point_buffer.last() {
                self.point_buffer.push(last);
                self.point_buffer.push(points[0]);
            }

            let mut a = 0;
            let mut b = points.len() - 1;
            self.point_buffer.push(points[a]);
            a += 1;
            while a <= b {
                self.point_buffer.push(points[a]);
                if a == b {
                    break;
                }
                self.point_buffer.push(points[b]);
                a += 1;
                b -= 1;
            }
        }
    }

    /// Independent fans per contour as a triangle list.
    fn build_contour_fans(&mut self, polyline: &Polyline) {
        self.point_buffer.clear();
        for index in 0..polyline.contours.len() {
            let points = polyline.contour_points(index);
            if points.len() < 3 {
                continue;
            }
            let anchor = points[0];
            for pair in points[1..].windows(2) {
                self.point_buffer.extend_from_slice(&[anchor, pair[0], pair[1]]);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Analytic Shapes
    // ─────────────────────────────────────────────────────────────────────────

    fn trigs_for_divisions(&mut self, divisions: usize) -> Arc<Trigs> {
        if divisions < CACHED_TRIG_COUNT {
            if let Some(trigs) = &self.trigs[divisions] {
                return trigs.clone();
            }
            let trigs = Arc::new(Trigs::new(divisions));
            self.trigs[divisions] = Some(trigs.clone());
            return trigs;
        }
        Arc::new(Trigs::new(divisions))
    }

    fn generator(
        &mut self,
        kind: GeneratorKind,
        pixel_radius: f32,
        data: GeneratorData,
    ) -> EllipticalVertexGenerator {
        let divisions = compute_quadrant_divisions(pixel_radius);
        EllipticalVertexGenerator {
            kind,
            trigs: self.trigs_for_divisions(divisions),
            data,
        }
    }

    pub fn filled_circle(
        &mut self,
        view_transform: &Affine2D,
        center: Point,
        radius: f32,
    ) -> EllipticalVertexGenerator {
        let pixel_radius = view_transform.max_basis_length() * radius;
        self.generator(
            GeneratorKind::FilledCircle,
            pixel_radius,
            GeneratorData {
                reference_centers: [center, center],
                radii: Size::new(radius, radius),
                half_width: -1.0,
            },
        )
    }

    /// Ring of `radius` with total width `2 * half_width`.
    ///
    /// Degenerates to a filled circle of the outer radius when the ring has
    /// no hole.
    pub fn stroked_circle(
        &mut self,
        view_transform: &Affine2D,
        center: Point,
        radius: f32,
        half_width: f32,
    ) -> EllipticalVertexGenerator {
        if half_width > 0.0 && half_width < radius {
            let pixel_radius = view_transform.max_basis_length() * (radius + half_width);
            self.generator(
                GeneratorKind::StrokedCircle,
                pixel_radius,
                GeneratorData {
                    reference_centers: [center, center],
                    radii: Size::new(radius, radius),
                    half_width,
                },
            )
        } else {
            self.filled_circle(view_transform, center, radius + half_width.max(0.0))
        }
    }

    /// Line from `p0` to `p1` of width `2 * radius` with semicircular caps.
    pub fn round_cap_line(
        &mut self,
        view_transform: &Affine2D,
        p0: Point,
        p1: Point,
        radius: f32,
    ) -> EllipticalVertexGenerator {
        let along = p1 - p0;
        if along.length() > f32::EPSILON {
            let pixel_radius = view_transform.max_basis_length() * radius;
            self.generator(
                GeneratorKind::RoundCapLine,
                pixel_radius,
                GeneratorData {
                    reference_centers: [p0, p1],
                    radii: Size::new(radius, radius),
                    half_width: -1.0,
                },
            )
        } else {
            self.filled_circle(view_transform, p0, radius)
        }
    }

    pub fn filled_ellipse(&mut self, view_transform: &Affine2D, bounds: Rect) -> EllipticalVertexGenerator {
        if bounds.width() == bounds.height() {
            return self.filled_circle(view_transform, bounds.center(), bounds.width() * 0.5);
        }
        let radii = Size::new(bounds.width() * 0.5, bounds.height() * 0.5);
        let pixel_radius = view_transform.max_basis_length() * radii.width.max(radii.height);
        self.generator(
            GeneratorKind::FilledEllipse,
            pixel_radius,
            GeneratorData {
                reference_centers: [bounds.center(), bounds.center()],
                radii,
                half_width: -1.0,
            },
        )
    }

    /// Round rect whose four corners share `radii`.
    pub fn filled_round_rect(
        &mut self,
        view_transform: &Affine2D,
        bounds: Rect,
        radii: Size,
    ) -> EllipticalVertexGenerator {
        if radii.width * 2.0 >= bounds.width() && radii.height * 2.0 >= bounds.height() {
            return self.filled_ellipse(view_transform, bounds);
        }
        let radii = Size::new(
            radii.width.min(bounds.width() * 0.5),
            radii.height.min(bounds.height() * 0.5),
        );
        let pixel_radius = view_transform.max_basis_length() * radii.width.max(radii.height);
        self.generator(
            GeneratorKind::FilledRoundRect,
            pixel_radius,
            GeneratorData {
                reference_centers: [
                    Point::new(bounds.left() + radii.width, bounds.top() + radii.height),
                    Point::new(bounds.right() - radii.width, bounds.bottom() - radii.height),
                ],
                radii,
                half_width: -1.0,
            },
        )
    }
}

fn accepted_result(accepted: bool) -> TessellatorResult {
    if accepted {
        TessellatorResult::Success
    } else {
        TessellatorResult::InputError
    }
}

fn polyline_to_lyon_events(polyline: &Polyline) -> Vec<PathEvent> {
    let mut events = Vec::with_capacity(polyline.points.len() + polyline.contours.len() * 2);
    for index in 0..polyline.contours.len() {
        let points = polyline.contour_points(index);
        let Some(&first) = points.first() else {
            continue;
        };
        let first = point(first.x, first.y);
        events.push(PathEvent::Begin { at: first });
        let mut last = first;
        for p in &points[1..] {
            let to = point(p.x, p.y);
            events.push(PathEvent::Line { from: last, to });
            last = to;
        }
        events.push(PathEvent::End {
            last,
            first,
            close: true,
        });
    }
    events
}

fn precomputed_divisions() -> &'static [usize] {
    static TABLE: OnceLock<Vec<usize>> = OnceLock::new();
    TABLE.get_or_init(|| {
        (0..PRECOMPUTED_DIVISION_COUNT)
            .map(|radius| divisions_for_radius(radius as f32))
            .collect()
    })
}

fn divisions_for_radius(pixel_radius: f32) -> usize {
    if pixel_radius <= CIRCLE_TOLERANCE {
        return 1;
    }
    // The midpoint of each polygon edge must stay within CIRCLE_TOLERANCE of
    // the true circle: cos(pi / 4N) = (r - tol) / r. acos(1 - k) is computed
    // as 2 asin(sqrt(k / 2)) in f64 so tiny k does not collapse to zero.
    let k = f64::from(CIRCLE_TOLERANCE) / f64::from(pixel_radius);
    let angle = 2.0 * (k / 2.0).sqrt().asin();
    (std::f64::consts::FRAC_PI_4 / angle)
        .ceil()
        .clamp(1.0, MAX_QUADRANT_DIVISIONS as f64) as usize
}

/// Number of segments per quarter circle for a circle of `pixel_radius`
/// device pixels.
pub fn compute_quadrant_divisions(pixel_radius: f32) -> usize {
    if !(pixel_radius > 0.0) {
        return 1;
    }
    let index = pixel_radius.ceil() as usize;
    if index < PRECOMPUTED_DIVISION_COUNT {
        return precomputed_divisions()[index];
    }
    divisions_for_radius(pixel_radius)
}

// ─────────────────────────────────────────────────────────────────────────────
// Vertex Generators
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GeneratorKind {
    FilledCircle,
    StrokedCircle,
    RoundCapLine,
    FilledEllipse,
    FilledRoundRect,
}

#[derive(Clone, Copy, Debug)]
struct GeneratorData {
    /// Centers for circles and ellipses are both the same point; round-cap
    /// lines hold the two endpoints; round rects hold the upper-left and
    /// lower-right corner centers.
    reference_centers: [Point; 2],
    radii: Size,
    half_width: f32,
}

/// Produces the triangle strip of an analytic shape
#[derive(Clone, Debug)]
pub struct EllipticalVertexGenerator {
    kind: GeneratorKind,
    trigs: Arc<Trigs>,
    data: GeneratorData,
}

impl EllipticalVertexGenerator {
    pub fn primitive_type(&self) -> PrimitiveType {
        PrimitiveType::TriangleStrip
    }

    pub fn vertex_count(&self) -> usize {
        match self.kind {
            GeneratorKind::StrokedCircle => self.trigs.len() * 8,
            _ => self.trigs.len() * 4,
        }
    }

    pub fn quadrant_divisions(&self) -> usize {
        self.trigs.divisions()
    }

    pub fn generate_vertices<F: FnMut(Point)>(&self, proc: F) {
        match self.kind {
            GeneratorKind::FilledCircle | GeneratorKind::FilledEllipse => {
                self.generate_filled_ellipse(proc)
            }
            GeneratorKind::StrokedCircle => self.generate_stroked_circle(proc),
            GeneratorKind::RoundCapLine => self.generate_round_cap_line(proc),
            GeneratorKind::FilledRoundRect => self.generate_filled_round_rect(proc),
        }
    }

    /// Collect the strip into a vector.
    pub fn vertices(&self) -> Vec<Point> {
        let mut out = Vec::with_capacity(self.vertex_count());
        self.generate_vertices(|p| out.push(p));
        out
    }

    fn generate_filled_ellipse<F: FnMut(Point)>(&self, mut proc: F) {
        let center = self.data.reference_centers[0];
        let Size { width: rx, height: ry } = self.data.radii;

        // Left half, sweeping top and bottom together
        for trig in self.trigs.iter() {
            let dx = trig.cos * rx;
            let dy = trig.sin * ry;
            proc(Point::new(center.x - dx, center.y + dy));
            proc(Point::new(center.x - dx, center.y - dy));
        }
        // Right half; swapping sin and cos walks the quadrant in reverse
        for trig in self.trigs.iter() {
            let dx = trig.sin * rx;
            let dy = trig.cos * ry;
            proc(Point::new(center.x + dx, center.y + dy));
            proc(Point::new(center.x + dx, center.y - dy));
        }
    }

    fn generate_stroked_circle<F: FnMut(Point)>(&self, mut proc: F) {
        let center = self.data.reference_centers[0];
        let outer_radius = self.data.radii.width + self.data.half_width;
        let inner_radius = self.data.radii.width - self.data.half_width;

        // Zig-zag between the outer and inner circles, one quadrant at a time
        for trig in self.trigs.iter() {
            let outer = *trig * outer_radius;
            let inner = *trig * inner_radius;
            proc(Point::new(center.x - outer.x, center.y - outer.y));
            proc(Point::new(center.x - inner.x, center.y - inner.y));
        }
        for trig in self.trigs.iter() {
            let outer = Point::new(trig.sin * outer_radius, trig.cos * outer_radius);
            let inner = Point::new(trig.sin * inner_radius, trig.cos * inner_radius);
            proc(Point::new(center.x + outer.x, center.y - outer.y));
            proc(Point::new(center.x + inner.x, center.y - inner.y));
        }
        for trig in self.trigs.iter() {
            let outer = *trig * outer_radius;
            let inner = *trig * inner_radius;
            proc(Point::new(center.x + outer.x, center.y + outer.y));
            proc(Point::new(center.x + inner.x, center.y + inner.y));
        }
        for trig in self.trigs.iter() {
            let outer = Point::new(trig.sin * outer_radius, trig.cos * outer_radius);
            let inner = Point::new(trig.sin * inner_radius, trig.cos * inner_radius);
            proc(Point::new(center.x - outer.x, center.y + outer.y));
            proc(Point::new(center.x - inner.x, center.y + inner.y));
        }
    }

    fn generate_round_cap_line<F: FnMut(Point)>(&self, mut proc: F) {
        let [p0, p1] = self.data.reference_centers;
        let radius = self.data.radii.width;
        let delta = p1 - p0;
        let along = delta * (radius / delta.length());
        let across = Point::new(-along.y, along.x);

        for trig in self.trigs.iter() {
            let relative_along = along * trig.cos;
            let relative_across = across * trig.sin;
            proc(p0 - relative_along + relative_across);
            proc(p0 - relative_along - relative_across);
        }
        for trig in self.trigs.iter() {
            let relative_along = along * trig.sin;
            let relative_across = across * trig.cos;
            proc(p1 + relative_along + relative_across);
            proc(p1 + relative_along - relative_across);
        }
    }

    fn generate_filled_round_rect<F: FnMut(Point)>(&self, mut proc: F) {
        let [upper_left, lower_right] = self.data.reference_centers;
        let (left, top) = (upper_left.x, upper_left.y);
        let (right, bottom) = (lower_right.x, lower_right.y);
        let Size { width: rx, height: ry } = self.data.radii;

        for trig in self.trigs.iter() {
            let dx = trig.cos * rx;
            let dy = trig.sin * ry;
            proc(Point::new(left - dx, bottom + dy));
            proc(Point::new(left - dx, top - dy));
        }
        for trig in self.trigs.iter() {
            let dx = trig.sin * rx;
            let dy = trig.cos * ry;
            proc(Point::new(right + dx, bottom + dy));
            proc(Point::new(right + dx, top - dy));
        }
    }
}
