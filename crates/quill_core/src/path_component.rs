//! Path components: line segments and Bézier curves
//!
//! Curves are flattened with Wang's formula, which gives the number of line
//! segments needed to keep the polyline within `1 / precision` of the curve.

use crate::geometry::{Point, Vector2};

/// Flattening precision in device pixels (segments are within 1/4 px of the curve).
pub const CURVE_PRECISION: f32 = 4.0;

/// A straight segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearPathComponent {
    pub p1: Point,
    pub p2: Point,
}

impl LinearPathComponent {
    pub const fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    pub fn solve(&self, t: f32) -> Point {
        self.p1.lerp(self.p2, t)
    }

    pub fn extrema(&self) -> Vec<Point> {
        vec![self.p1, self.p2]
    }

    pub fn start_direction(&self) -> Option<Vector2> {
        direction(self.p1, self.p2)
    }

    pub fn end_direction(&self) -> Option<Vector2> {
        direction(self.p1, self.p2)
    }
}

/// A quadratic Bézier curve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadraticPathComponent {
    pub p1: Point,
    pub cp: Point,
    pub p2: Point,
}

impl QuadraticPathComponent {
    pub const fn new(p1: Point, cp: Point, p2: Point) -> Self {
        Self { p1, cp, p2 }
    }

    pub fn solve(&self, t: f32) -> Point {
        let mt = 1.0 - t;
        self.p1 * (mt * mt) + self.cp * (2.0 * mt * t) + self.p2 * (t * t)
    }

    /// Wang's formula for a degree-2 curve.
    pub fn subdivisions(&self, scale: f32) -> usize {
        let precision = CURVE_PRECISION * scale.max(f32::EPSILON);
        let dd = self.p1 - self.cp * 2.0 + self.p2;
        segment_count(0.25 * precision * dd.length())
    }

    /// Append the flattened points, excluding `p1`.
    pub fn append_polyline_points(&self, scale: f32, points: &mut impl Extend<Point>) {
        let count = self.subdivisions(scale);
        points.extend(
            (1..count)
                .map(|i| self.solve(i as f32 / count as f32))
                .chain(std::iter::once(self.p2)),
        );
    }

    pub fn extrema(&self) -> Vec<Point> {
        let mut out = vec![self.p1, self.p2];
        let denom = self.p1 - self.cp * 2.0 + self.p2;
        for (num, den) in [
            (self.p1.x - self.cp.x, denom.x),
            (self.p1.y - self.cp.y, denom.y),
        ] {
            if den.abs() > f32::EPSILON {
                let t = num / den;
                if t > 0.0 && t < 1.0 {
                    out.push(self.solve(t));
                }
            }
        }
        out
    }

    pub fn start_direction(&self) -> Option<Vector2> {
        direction(self.p1, self.cp).or_else(|| direction(self.p1, self.p2))
    }

    pub fn end_direction(&self) -> Option<Vector2> {
        direction(self.cp, self.p2).or_else(|| direction(self.p1, self.p2))
    }

    pub fn to_cubic(&self) -> CubicPathComponent {
        CubicPathComponent::new(
            self.p1,
            self.p1 + (self.cp - self.p1) * (2.0 / 3.0),
            self.p2 + (self.cp - self.p2) * (2.0 / 3.0),
            self.p2,
        )
    }
}

/// A cubic Bézier curve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicPathComponent {
    pub p1: Point,
    pub cp1: Point,
    pub cp2: Point,
    pub p2: Point,
}

impl CubicPathComponent {
    pub const fn new(p1: Point, cp1: Point, cp2: Point, p2: Point) -> Self {
        Self { p1, cp1, cp2, p2 }
    }

    pub fn solve(&self, t: f32) -> Point {
        let mt = 1.0 - t;
        self.p1 * (mt * mt * mt)
            + self.cp1 * (3.0 * mt * mt * t)
            + self.cp2 * (3.0 * mt * t * t)
            + self.p2 * (t * t * t)
    }

    /// Wang's formula for a degree-3 curve.
    pub fn subdivisions(&self, scale: f32) -> usize {
        let precision = CURVE_PRECISION * scale.max(f32::EPSILON);
        let a = self.p1 - self.cp1 * 2.0 + self.cp2;
        let b = self.cp1 - self.cp2 * 2.0 + self.p2;
        let max_len = a.length().max(b.length());
        segment_count(0.75 * precision * max_len)
    }

    /// Append the flattened points, excluding `p1`.
    pub fn append_polyline_points(&self, scale: f32, points: &mut impl Extend<Point>) {
        let count = self.subdivisions(scale);
        points.extend(
            (1..count)
                .map(|i| self.solve(i as f32 / count as f32))
                .chain(std::iter::once(self.p2)),
        );
    }

    pub fn extrema(&self) -> Vec<Point> {
        let mut out = vec![self.p1, self.p2];
        let axes = [
            (self.p1.x, self.cp1.x, self.cp2.x, self.p2.x),
            (self.p1.y, self.cp1.y, self.cp2.y, self.p2.y),
        ];
        for (p0, p1, p2, p3) in axes {
            // Derivative coefficients: a t^2 + b t + c
            let a = 3.0 * (-p0 + 3.0 * p1 - 3.0 * p2 + p3);
            let b = 6.0 * (p0 - 2.0 * p1 + p2);
            let c = 3.0 * (p1 - p0);
            for t in quadratic_roots(a, b, c) {
                if t > 0.0 && t < 1.0 {
                    out.push(self.solve(t));
                }
            }
        }
        out
    }

    pub fn start_direction(&self) -> Option<Vector2> {
        direction(self.p1, self.cp1)
            .or_else(|| direction(self.p1, self.cp2))
            .or_else(|| direction(self.p1, self.p2))
    }

    pub fn end_direction(&self) -> Option<Vector2> {
        direction(self.cp2, self.p2)
            .or_else(|| direction(self.cp1, self.p2))
            .or_else(|| direction(self.p1, self.p2))
    }
}

/// A single path segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathComponent {
    Linear(LinearPathComponent),
    Quadratic(QuadraticPathComponent),
    Cubic(CubicPathComponent),
}

impl PathComponent {
    pub fn start(&self) -> Point {
        match self {
            PathComponent::Linear(c) => c.p1,
            PathComponent::Quadratic(c) => c.p1,
            PathComponent::Cubic(c) => c.p1,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            PathComponent::Linear(c) => c.p2,
            PathComponent::Quadratic(c) => c.p2,
            PathComponent::Cubic(c) => c.p2,
        }
    }

    pub fn is_curve(&self) -> bool {
        !matches!(self, PathComponent::Linear(_))
    }

    pub fn extrema(&self) -> Vec<Point> {
        match self {
            PathComponent::Linear(c) => c.extrema(),
            PathComponent::Quadratic(c) => c.extrema(),
            PathComponent::Cubic(c) => c.extrema(),
        }
    }

    /// Append the flattened points of this component, excluding its start point.
    pub fn append_polyline_points(&self, scale: f32, points: &mut impl Extend<Point>) {
        match self {
            PathComponent::Linear(c) => points.extend(std::iter::once(c.p2)),
            PathComponent::Quadratic(c) => c.append_polyline_points(scale, points),
            PathComponent::Cubic(c) => c.append_polyline_points(scale, points),
        }
    }

    pub fn start_direction(&self) -> Option<Vector2> {
        match self {
            PathComponent::Linear(c) => c.start_direction(),
            PathComponent::Quadratic(c) => c.start_direction(),
            PathComponent::Cubic(c) => c.start_direction(),
        }
    }

    pub fn end_direction(&self) -> Option<Vector2> {
        match self {
            PathComponent::Linear(c) => c.end_direction(),
            PathComponent::Quadratic(c) => c.end_direction(),
            PathComponent::Cubic(c) => c.end_direction(),
        }
    }

    pub fn translated(&self, offset: Vector2) -> PathComponent {
        match *self {
            PathComponent::Linear(c) => {
                PathComponent::Linear(LinearPathComponent::new(c.p1 + offset, c.p2 + offset))
            }
            PathComponent::Quadratic(c) => PathComponent::Quadratic(QuadraticPathComponent::new(
                c.p1 + offset,
                c.cp + offset,
                c.p2 + offset,
            )),
            PathComponent::Cubic(c) => PathComponent::Cubic(CubicPathComponent::new(
                c.p1 + offset,
                c.cp1 + offset,
                c.cp2 + offset,
                c.p2 + offset,
            )),
        }
    }
}

fn direction(from: Point, to: Point) -> Option<Vector2> {
    let d = to - from;
    if d.length() > f32::EPSILON {
        Some(d.normalize())
    } else {
        None
    }
}

fn segment_count(squared: f32) -> usize {
    let n = squared.max(0.0).sqrt().ceil();
    if n.is_finite() {
        (n as usize).clamp(1, 1 << 10)
    } else {
        1
    }
}

fn quadratic_roots(a: f32, b: f32, c: f32) -> Vec<f32> {
    if a.abs() < 1e-9 {
        if b.abs() < 1e-9 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    vec![(-b + sq) / (2.0 * a), (-b - sq) / (2.0 * a)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_quadratic_needs_one_segment() {
        let q = QuadraticPathComponent::new(
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(q.subdivisions(1.0), 1);
    }

    #[test]
    fn test_subdivisions_grow_with_scale() {
        let c = CubicPathComponent::new(
            Point::new(0.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 0.0),
        );
        assert!(c.subdivisions(4.0) > c.subdivisions(1.0));
    }

    #[test]
    fn test_cubic_extrema_include_peak() {
        let c = CubicPathComponent::new(
            Point::new(0.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 0.0),
        );
        let max_y = c.extrema().iter().map(|p| p.y).fold(f32::MIN, f32::max);
        assert!((max_y - 75.0).abs() < 1e-3);
    }

    #[test]
    fn test_polyline_points_end_at_p2() {
        let q = QuadraticPathComponent::new(
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(100.0, 0.0),
        );
        let mut pts: Vec<Point> = Vec::new();
        q.append_polyline_points(1.0, &mut pts);
        assert_eq!(*pts.last().unwrap(), Point::new(100.0, 0.0));
        assert!(pts.len() > 1);
    }
}
