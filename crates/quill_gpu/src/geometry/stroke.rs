//! Stroke vertex generation
//!
//! Strokes are emitted as a single triangle strip. Each polyline segment
//! contributes a pair of vertices offset by half the stroke width on either
//! side of its start and end. Joins are inserted between path components
//! (flattened curves are dense enough to skip them), caps at the ends of open
//! contours, and consecutive contours are bridged with zero-area triangles.

use std::f32::consts::{PI, SQRT_2};

use quill_core::{Affine2D, CubicPathComponent, Path, Point, Polyline, Rect, Vector2};
use smallvec::{smallvec, SmallVec};

use super::{GeometryContext, GeometryResult};
use crate::command::PrimitiveType;

/// Miter limit used when none (or a negative one) is given
pub const DEFAULT_MITER_LIMIT: f32 = 4.0;

/// Cubic control point distance for a quarter circle
const ARC_APPROXIMATION_MAGIC: f32 = 0.551_915_02;

/// Points of one round join or cap arc
type ArcPoints = SmallVec<[Point; 16]>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Join {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Stroke parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub miter_limit: f32,
    pub cap: Cap,
    pub join: Join,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            miter_limit: DEFAULT_MITER_LIMIT,
            cap: Cap::Butt,
            join: Join::Miter,
        }
    }
}

impl StrokeStyle {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    pub fn with_cap(mut self, cap: Cap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_join(mut self, join: Join) -> Self {
        self.join = join;
        self
    }

    pub fn with_miter_limit(mut self, miter_limit: f32) -> Self {
        self.miter_limit = miter_limit;
        self
    }

    pub fn effective_miter_limit(&self) -> f32 {
        if self.miter_limit < 0.0 || !self.miter_limit.is_finite() {
            DEFAULT_MITER_LIMIT
        } else {
            self.miter_limit
        }
    }

    /// Width after enforcing a one device pixel minimum.
    ///
    /// `None` when the transform collapses everything.
    pub fn effective_width(&self, transform: &Affine2D) -> Option<f32> {
        let determinant = transform.determinant();
        if determinant == 0.0 || !determinant.is_finite() {
            return None;
        }
        let min_size = 1.0 / determinant.abs().sqrt();
        Some(self.width.max(min_size))
    }
}

pub(super) fn position_buffer(
    path: &Path,
    style: &StrokeStyle,
    ctx: &mut GeometryContext<'_>,
    transform: &Affine2D,
) -> GeometryResult {
    if path.is_empty() {
        return GeometryResult::default();
    }
    let Some(width) = style.effective_width(transform) else {
        return GeometryResult::default();
    };

    let scale = transform.max_basis_length();
    let polyline = path.create_polyline(scale);
    let vertices = create_stroke_vertices(
        &polyline,
        width,
        style.effective_miter_limit(),
        style.cap,
        style.join,
        scale,
    );
    GeometryResult::from_points(
        ctx.allocator,
        "Stroke",
        PrimitiveType::TriangleStrip,
        &vertices,
        transform,
    )
}

pub(super) fn coverage(path: &Path, style: &StrokeStyle, transform: &Affine2D) -> Option<Rect> {
    let path_coverage = path.transformed_bounds(transform)?;

    let mut max_radius: f32 = 0.5;
    if style.cap == Cap::Square {
        max_radius *= SQRT_2;
    }
    if style.join == Join::Miter {
        max_radius = max_radius.max(style.effective_miter_limit() * 0.5);
    }
    let width = style.effective_width(transform)?;
    let padding = max_radius * width * transform.max_basis_length();
    Some(path_coverage.expand(padding, padding))
}

/// Build the triangle strip for stroking `polyline`.
///
/// `miter_limit` is relative to half the stroke width; `scale` controls the
/// flattening of round caps and joins.
pub fn create_stroke_vertices(
    polyline: &Polyline,
    width: f32,
    miter_limit: f32,
    cap: Cap,
    join: Join,
    scale: f32,
) -> Vec<Point> {
    let generator = StrokeGenerator {
        polyline,
        half_width: width * 0.5,
        miter_limit: miter_limit * width * 0.5,
        cap,
        join,
        scale,
    };
    let mut out = Vec::with_capacity(polyline.points.len() * 4);
    generator.generate(&mut out);
    out
}

struct StrokeGenerator<'a> {
    polyline: &'a Polyline,
    half_width: f32,
    /// Maximum miter length in local units
    miter_limit: f32,
    cap: Cap,
    join: Join,
    scale: f32,
}

impl StrokeGenerator<'_> {
    fn generate(&self, out: &mut Vec<Point>) {
        let mut contour_vertices = Vec::new();
        for index in 0..self.polyline.contours.len() {
            contour_vertices.clear();
            self.generate_contour(index, &mut contour_vertices);
            let Some(&first) = contour_vertices.first() else {
                continue;
            };
            // Pick up the pen: repeat the last vertex and the next contour's
            // first vertex so the connecting triangles have zero area.
            if let Some(&last) = out.last() {
                out.push(last);
                out.push(first);
            }
            out.extend_from_slice(&contour_vertices);
        }
    }

    fn offset(&self, direction: Vector2) -> Vector2 {
        direction.normalize().perpendicular() * self.half_width
    }

    fn generate_contour(&self, index: usize, out: &mut Vec<Point>) {
        let contour = &self.polyline.contours[index];
        let range = self.polyline.contour_point_range(index);
        let points = &self.polyline.points[range.clone()];

        match points.len() {
            0 => {}
            1 => {
                // A dot: caps on both sides of a zero-length segment
                let p = points[0];
                let offset = Point::new(0.0, self.half_width);
                self.start_cap(out, p, offset, Point::new(-self.half_width, 0.0));
                out.push(p + offset);
                out.push(p - offset);
                self.end_cap(out, p, offset, Point::new(self.half_width, 0.0));
            }
            _ => {
                let first_offset = self.offset(points[1] - points[0]);
                if !contour.is_closed {
                    self.start_cap(out, points[0], first_offset, contour.start_direction * self.half_width);
                }

                let is_component_start = |local: usize| {
                    contour
                        .components
                        .iter()
                        .any(|c| c.component_start_index == range.start + local)
                };

                let mut previous_offset = first_offset;
                for segment in 0..points.len() - 1 {
                    let a = points[segment];
                    let b = points[segment + 1];
                    let offset = self.offset(b - a);
                    if segment > 0 && is_component_start(segment) {
                        self.join(out, a, previous_offset, offset);
                    }
                    out.push(a + offset);
                    out.push(a - offset);
                    out.push(b + offset);
                    out.push(b - offset);
                    previous_offset = offset;
                }

                if contour.is_closed {
                    let start = points[0];
                    self.join(out, start, previous_offset, first_offset);
                    out.push(start + first_offset);
                    out.push(start - first_offset);
                } else {
                    let end = points[points.len() - 1];
                    self.end_cap(out, end, previous_offset, contour.end_direction * self.half_width);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Joins
    // ─────────────────────────────────────────────────────────────────────────

    fn join(&self, out: &mut Vec<Point>, position: Point, start_offset: Vector2, end_offset: Vector2) {
        match self.join {
            Join::Bevel => {
                bevel_join(out, position, start_offset, end_offset);
            }
            Join::Miter => miter_join(out, position, start_offset, end_offset, self.miter_limit),
            Join::Round => self.round_join(out, position, start_offset, end_offset),
        }
    }

    fn round_join(&self, out: &mut Vec<Point>, position: Point, start_offset: Vector2, end_offset: Vector2) {
        let start_normal = start_offset.normalize();
        let end_normal = end_offset.normalize();

        // 0 for a straight continuation, 1 for a full reversal
        let alignment = 1.0 - (start_normal.dot(end_normal) + 1.0) / 2.0;
        if alignment.abs() < 1e-6 {
            return;
        }

        let direction = join_direction(start_offset, end_offset);
        let from = start_offset * direction;
        let to = end_offset * direction;
        let start_angle = from.y.atan2(from.x);
        let mut sweep = from.cross(to).atan2(from.dot(to));
        if sweep.abs() > PI - 1e-3 {
            // Reversal: go around the side the path was heading toward
            let heading = Point::new(start_offset.y, -start_offset.x);
            let mid = Point::new((start_angle + sweep / 2.0).cos(), (start_angle + sweep / 2.0).sin());
            if mid.dot(heading) < 0.0 {
                sweep = -sweep;
            }
        }

        let mut arc: ArcPoints = smallvec![from];
        let half = sweep / 2.0;
        for i in 0..2 {
            let a0 = start_angle + half * i as f32;
            arc_segment(a0, half, self.half_width, self.scale, &mut arc);
        }

        for point in arc {
            out.push(position + point);
            out.push(position);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Caps
    // ─────────────────────────────────────────────────────────────────────────

    /// Emit cap vertices leading into the pair `position ± offset`.
    fn start_cap(&self, out: &mut Vec<Point>, position: Point, offset: Vector2, forward: Vector2) {
        match self.cap {
            Cap::Butt => {}
            Cap::Square => {
                out.push(position + offset + forward);
                out.push(position - offset + forward);
            }
            Cap::Round => {
                let arc = self.quarter_arc(offset, forward);
                let axis = forward.normalize();
                // Tip first, back toward the sides
                for point in arc.iter().rev() {
                    out.push(position + *point);
                    out.push(position + reflect(*point, axis));
                }
            }
        }
    }

    /// Emit cap vertices following the pair `position ± offset`.
    fn end_cap(&self, out: &mut Vec<Point>, position: Point, offset: Vector2, forward: Vector2) {
        match self.cap {
            Cap::Butt => {}
            Cap::Square => {
                out.push(position + offset + forward);
                out.push(position - offset + forward);
            }
            Cap::Round => {
                let arc = self.quarter_arc(offset, forward);
                let axis = forward.normalize();
                for point in &arc {
                    out.push(position + *point);
                    out.push(position + reflect(*point, axis));
                }
            }
        }
    }

    /// Quarter circle from `offset` to `forward`, excluding `offset` itself.
    fn quarter_arc(&self, offset: Vector2, forward: Vector2) -> ArcPoints {
        let m = ARC_APPROXIMATION_MAGIC;
        let cubic = CubicPathComponent::new(offset, offset + forward * m, forward + offset * m, forward);
        let mut points = ArcPoints::new();
        cubic.append_polyline_points(self.scale, &mut points);
        points
    }
}

/// Which side of the joint is outside: `1.0` or `-1.0`.
fn join_direction(start_offset: Vector2, end_offset: Vector2) -> f32 {
    if start_offset.cross(end_offset) > 0.0 {
        -1.0
    } else {
        1.0
    }
}

fn bevel_join(out: &mut Vec<Point>, position: Point, start_offset: Vector2, end_offset: Vector2) -> f32 {
    let direction = join_direction(start_offset, end_offset);
    out.push(position);
    out.push(position + start_offset * direction);
    out.push(position + end_offset * direction);
    direction
}

fn miter_join(
    out: &mut Vec<Point>,
    position: Point,
    start_offset: Vector2,
    end_offset: Vector2,
    miter_limit: f32,
) {
    let start_normal = start_offset.normalize();
    let end_normal = end_offset.normalize();

    // 1 for a straight continuation, 0 for a full reversal
    let alignment = (start_normal.dot(end_normal) + 1.0) / 2.0;
    if (alignment - 1.0).abs() < 1e-6 {
        return;
    }

    let direction = bevel_join(out, position, start_offset, end_offset);
    if alignment < 1e-6 {
        return;
    }

    let miter_point = ((start_offset + end_offset) / 2.0) / alignment;
    if miter_point.dot(miter_point) > miter_limit * miter_limit {
        // Too long; the bevel stands
        return;
    }
    out.push(position + miter_point * direction);
}

/// Mirror `point` across the line through the origin along `axis`.
fn reflect(point: Point, axis: Vector2) -> Point {
    axis * (2.0 * point.dot(axis)) - point
}

/// Append a cubic approximation of a circular arc, excluding its start.
fn arc_segment(start_angle: f32, sweep: f32, radius: f32, scale: f32, out: &mut ArcPoints) {
    let end_angle = start_angle + sweep;
    let k = 4.0 / 3.0 * (sweep / 4.0).tan() * radius;
    let p0 = Point::new(start_angle.cos(), start_angle.sin()) * radius;
    let p3 = Point::new(end_angle.cos(), end_angle.sin()) * radius;
    let t0 = Point::new(-start_angle.sin(), start_angle.cos());
    let t1 = Point::new(-end_angle.sin(), end_angle.cos());
    CubicPathComponent::new(p0, p0 + t0 * k, p3 - t1 * k, p3).append_polyline_points(scale, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::PathBuilder;

    fn polyline(builder: PathBuilder) -> Polyline {
        builder.take_path().create_polyline(1.0)
    }

    fn right_angle() -> Polyline {
        polyline(
            PathBuilder::new()
                .move_to(Point::new(0.0, 0.0))
                .line_to(Point::new(100.0, 0.0))
                .line_to(Point::new(100.0, 100.0)),
        )
    }

    #[test]
    fn test_straight_line_butt() {
        let line = polyline(PathBuilder::new().add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        let vertices = create_stroke_vertices(&line, 2.0, 4.0, Cap::Butt, Join::Miter, 1.0);
        assert_eq!(
            vertices,
            vec![
                Point::new(0.0, 1.0),
                Point::new(0.0, -1.0),
                Point::new(10.0, 1.0),
                Point::new(10.0, -1.0),
            ]
        );
    }

    #[test]
    fn test_square_cap_extends_line() {
        let line = polyline(PathBuilder::new().add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        let vertices = create_stroke_vertices(&line, 2.0, 4.0, Cap::Square, Join::Miter, 1.0);
        let bounds = Rect::from_points(&vertices).unwrap();
        assert_eq!(bounds, Rect::new(-1.0, -1.0, 12.0, 2.0));
    }

    #[test]
    fn test_round_cap_reaches_half_width() {
        let line = polyline(PathBuilder::new().add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        let vertices = create_stroke_vertices(&line, 4.0, 4.0, Cap::Round, Join::Miter, 1.0);
        let bounds = Rect::from_points(&vertices).unwrap();
        assert!((bounds.left() + 2.0).abs() < 1e-4);
        assert!((bounds.right() - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_right_angle_miter_point() {
        let vertices = create_stroke_vertices(&right_angle(), 10.0, 4.0, Cap::Butt, Join::Miter, 1.0);
        // Outer corner of a right turn in y-down space
        assert!(vertices.contains(&Point::new(105.0, -5.0)));
        let miter_length = (Point::new(105.0, -5.0) - Point::new(100.0, 0.0)).length();
        assert!((miter_length - 7.071).abs() < 1e-3);
    }

    #[test]
    fn test_miter_over_limit_matches_bevel() {
        // sqrt(2) is the miter ratio of a right angle
        let miter = create_stroke_vertices(&right_angle(), 10.0, 1.0, Cap::Butt, Join::Miter, 1.0);
        let bevel = create_stroke_vertices(&right_angle(), 10.0, 1.0, Cap::Butt, Join::Bevel, 1.0);
        assert_eq!(miter, bevel);
    }

    #[test]
    fn test_round_join_stays_on_circle() {
        let vertices = create_stroke_vertices(&right_angle(), 10.0, 4.0, Cap::Butt, Join::Round, 1.0);
        let corner = Point::new(100.0, 0.0);
        for v in &vertices {
            assert!(v.distance(corner) <= 5.0 + 1e-3 || v.x < 95.0 || v.y > 5.0);
        }
        assert!(vertices
            .iter()
            .any(|v| (v.distance(corner) - 5.0).abs() < 1e-3 && v.x > 100.0 && v.y < 0.0));
    }

    #[test]
    fn test_cap_arc_stays_inline() {
        let line = polyline(PathBuilder::new().add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        let generator = StrokeGenerator {
            polyline: &line,
            half_width: 5.0,
            miter_limit: 20.0,
            cap: Cap::Round,
            join: Join::Round,
            scale: 1.0,
        };
        let arc = generator.quarter_arc(Point::new(0.0, 5.0), Point::new(5.0, 0.0));
        assert!(!arc.spilled());
        assert_eq!(arc.last().copied(), Some(Point::new(5.0, 0.0)));
    }

    #[test]
    fn test_closed_contour_has_no_caps() {
        let square = polyline(PathBuilder::new().add_rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let butt = create_stroke_vertices(&square, 2.0, 4.0, Cap::Butt, Join::Bevel, 1.0);
        let round = create_stroke_vertices(&square, 2.0, 4.0, Cap::Round, Join::Bevel, 1.0);
        assert_eq!(butt, round);
    }

    #[test]
    fn test_contours_bridged_with_degenerate_triangles() {
        let two = polyline(
            PathBuilder::new()
                .add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0))
                .add_line(Point::new(0.0, 20.0), Point::new(10.0, 20.0)),
        );
        let vertices = create_stroke_vertices(&two, 2.0, 4.0, Cap::Butt, Join::Miter, 1.0);
        assert_eq!(vertices.len(), 4 + 2 + 4);
        assert_eq!(vertices[3], vertices[4]);
        assert_eq!(vertices[5], vertices[6]);
    }

    #[test]
    fn test_dot_with_round_cap_is_circle() {
        let dot = polyline(
            PathBuilder::new()
                .move_to(Point::new(5.0, 5.0))
                .line_to(Point::new(5.0, 5.0)),
        );
        let vertices = create_stroke_vertices(&dot, 4.0, 4.0, Cap::Round, Join::Miter, 1.0);
        let bounds = Rect::from_points(&vertices).unwrap();
        assert!((bounds.left() - 3.0).abs() < 1e-4);
        assert!((bounds.right() - 7.0).abs() < 1e-4);
        assert!((bounds.top() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_dot_with_butt_cap_has_no_area() {
        let dot = polyline(
            PathBuilder::new()
                .move_to(Point::new(5.0, 5.0))
                .line_to(Point::new(5.0, 5.0)),
        );
        let vertices = create_stroke_vertices(&dot, 4.0, 4.0, Cap::Butt, Join::Miter, 1.0);
        assert_eq!(vertices.len(), 2);
    }

    #[test]
    fn test_negative_miter_limit_defaults() {
        let style = StrokeStyle::new(1.0).with_miter_limit(-1.0);
        assert_eq!(style.effective_miter_limit(), DEFAULT_MITER_LIMIT);
    }

    #[test]
    fn test_minimum_width_under_scale() {
        let style = StrokeStyle::new(0.0);
        let width = style.effective_width(&Affine2D::scale(0.25, 0.25)).unwrap();
        // One device pixel at a quarter scale is four local units
        assert!((width - 4.0).abs() < 1e-5);
        assert!(style.effective_width(&Affine2D::scale(0.0, 1.0)).is_none());
    }

    #[test]
    fn test_coverage_padding() {
        let path = PathBuilder::new()
            .add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0))
            .take_path();
        let style = StrokeStyle::new(2.0).with_join(Join::Bevel);
        let covered = coverage(&path, &style, &Affine2D::IDENTITY).unwrap();
        assert_eq!(covered, Rect::new(-1.0, -1.0, 12.0, 2.0));

        let miter = StrokeStyle::new(2.0);
        let covered = coverage(&path, &miter, &Affine2D::IDENTITY).unwrap();
        assert_eq!(covered, Rect::new(-4.0, -4.0, 18.0, 8.0));
    }
}
