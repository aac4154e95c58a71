//! Core geometry types
//!
//! Points double as 2D vectors. Rectangles are stored as origin + size and may
//! carry a negative size only transiently; every constructor that derives a rect
//! from other rects normalises it.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// ─────────────────────────────────────────────────────────────────────────────
// Points and Sizes
// ─────────────────────────────────────────────────────────────────────────────

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Vectors share the point representation.
pub type Vector2 = Point;

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(&self, other: Point) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(&self, other: Point) -> f32 {
        (*self - other).length()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Rotate 90 degrees counter-clockwise in a y-down coordinate system.
    pub fn perpendicular(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn lerp(&self, other: Point, t: f32) -> Self {
        *self + (other - *self) * t
    }

    pub fn min(&self, other: Point) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(&self, other: Point) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Point {
    type Output = Point;
    fn div(self, rhs: f32) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }
}

/// Integer pixel size used for textures and render targets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ISize {
    pub width: u32,
    pub height: u32,
}

impl ISize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Number of mip levels in a full chain down to 1x1.
    pub fn mip_count(&self) -> u32 {
        let max = self.width.max(self.height).max(1);
        32 - max.leading_zeros()
    }

    pub fn to_size(self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }
}

impl From<Size> for Rect {
    /// Convert Size to Rect at origin (0, 0)
    fn from(size: Size) -> Self {
        Rect {
            origin: Point::ZERO,
            size,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rectangles
// ─────────────────────────────────────────────────────────────────────────────

/// 2D rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    /// A rect large enough to behave as "unbounded" for culling purposes.
    pub const MAXIMUM: Rect = Rect {
        origin: Point::new(-1.0e9, -1.0e9),
        size: Size::new(2.0e9, 2.0e9),
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// Smallest rect containing every point, or `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self::from_ltrb(min.x, min.y, max.x, max.y))
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn left(&self) -> f32 {
        self.origin.x.min(self.origin.x + self.size.width)
    }

    pub fn top(&self) -> f32 {
        self.origin.y.min(self.origin.y + self.size.height)
    }

    pub fn right(&self) -> f32 {
        self.origin.x.max(self.origin.x + self.size.width)
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y.max(self.origin.y + self.size.height)
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// Corner points in clockwise order starting top-left.
    pub fn points(&self) -> [Point; 4] {
        let (l, t, r, b) = (self.left(), self.top(), self.right(), self.bottom());
        [
            Point::new(l, t),
            Point::new(r, t),
            Point::new(r, b),
            Point::new(l, b),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// Get the size of this rect
    pub fn size(&self) -> Size {
        self.size
    }

    /// Offset the rect by a delta
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Rect {
            origin: Point::new(self.origin.x + dx, self.origin.y + dy),
            size: self.size,
        }
    }

    /// Inset the rect by a delta (shrink from all sides)
    pub fn inset(&self, dx: f32, dy: f32) -> Self {
        Rect {
            origin: Point::new(self.origin.x + dx, self.origin.y + dy),
            size: Size::new(
                (self.size.width - 2.0 * dx).max(0.0),
                (self.size.height - 2.0 * dy).max(0.0),
            ),
        }
    }

    /// Grow the rect on all sides
    pub fn expand(&self, dx: f32, dy: f32) -> Self {
        Self::from_ltrb(
            self.left() - dx,
            self.top() - dy,
            self.right() + dx,
            self.bottom() + dy,
        )
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > left && bottom > top {
            Some(Self::from_ltrb(left, top, right, bottom))
        } else {
            None
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Self::from_ltrb(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Smallest integer-aligned rect containing this one.
    pub fn round_out(&self) -> Rect {
        Self::from_ltrb(
            self.left().floor(),
            self.top().floor(),
            self.right().ceil(),
            self.bottom().ceil(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rounded Rectangles
// ─────────────────────────────────────────────────────────────────────────────

/// Elliptical corner radii, one [`Size`] per corner
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RoundingRadii {
    pub top_left: Size,
    pub top_right: Size,
    pub bottom_right: Size,
    pub bottom_left: Size,
}

impl RoundingRadii {
    pub const fn uniform(radius: f32) -> Self {
        let r = Size::new(radius, radius);
        Self {
            top_left: r,
            top_right: r,
            bottom_right: r,
            bottom_left: r,
        }
    }

    pub fn are_all_empty(&self) -> bool {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
        .iter()
        .all(|r| r.is_empty())
    }

    pub fn are_all_same(&self) -> bool {
        self.top_left == self.top_right
            && self.top_left == self.bottom_right
            && self.top_left == self.bottom_left
    }

    /// Scale radii down uniformly so that adjacent radii fit along each side.
    pub fn scaled_to_fit(&self, bounds: Size) -> Self {
        let mut scale = 1.0f32;
        let mut fit = |a: f32, b: f32, side: f32| {
            let sum = a + b;
            if sum > side && sum > 0.0 {
                scale = scale.min(side / sum);
            }
        };
        fit(self.top_left.width, self.top_right.width, bounds.width);
        fit(self.bottom_left.width, self.bottom_right.width, bounds.width);
        fit(self.top_left.height, self.bottom_left.height, bounds.height);
        fit(self.top_right.height, self.bottom_right.height, bounds.height);

        let s = |r: Size| Size::new((r.width * scale).max(0.0), (r.height * scale).max(0.0));
        Self {
            top_left: s(self.top_left),
            top_right: s(self.top_right),
            bottom_right: s(self.bottom_right),
            bottom_left: s(self.bottom_left),
        }
    }
}

/// A rectangle with elliptical corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RoundRect {
    pub rect: Rect,
    pub radii: RoundingRadii,
}

impl RoundRect {
    /// Create a rounded rect, normalising radii so they always fit the bounds.
    pub fn new(rect: Rect, radii: RoundingRadii) -> Self {
        let rect = Rect::from_ltrb(rect.left(), rect.top(), rect.right(), rect.bottom());
        Self {
            rect,
            radii: radii.scaled_to_fit(rect.size),
        }
    }

    pub fn from_rect_radius(rect: Rect, radius: f32) -> Self {
        Self::new(rect, RoundingRadii::uniform(radius))
    }

    pub fn is_rect(&self) -> bool {
        self.radii.are_all_empty()
    }

    /// True when every corner uses the same radius and that radius fills the
    /// whole rect, i.e. the shape is an oval.
    pub fn is_oval(&self) -> bool {
        self.radii.are_all_same()
            && (self.radii.top_left.width * 2.0 - self.rect.width()).abs() < 1e-4
            && (self.radii.top_left.height * 2.0 - self.rect.height()).abs() < 1e-4
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transforms
// ─────────────────────────────────────────────────────────────────────────────

/// 2D affine transformation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2D {
    /// Matrix elements [a, b, c, d, tx, ty]
    /// | a  c  tx |
    /// | b  d  ty |
    /// | 0  0   1 |
    pub elements: [f32; 6],
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D {
        elements: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            elements: [1.0, 0.0, 0.0, 1.0, x, y],
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            elements: [sx, 0.0, 0.0, sy, 0.0, 0.0],
        }
    }

    pub fn rotation(angle: f32) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        Self {
            elements: [c, s, -s, c, 0.0, 0.0],
        }
    }

    pub fn skew(sx: f32, sy: f32) -> Self {
        Self {
            elements: [1.0, sy, sx, 1.0, 0.0, 0.0],
        }
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let [a, b, c, d, tx, ty] = self.elements;
        Point::new(a * point.x + c * point.y + tx, b * point.x + d * point.y + ty)
    }

    /// Apply only the linear part (no translation), for direction vectors.
    pub fn transform_vector(&self, v: Vector2) -> Vector2 {
        let [a, b, c, d, _, _] = self.elements;
        Point::new(a * v.x + c * v.y, b * v.x + d * v.y)
    }

    /// Concatenate this transform with another (self * other)
    /// The resulting transform first applies `other`, then `self`.
    pub fn then(&self, other: &Affine2D) -> Affine2D {
        let [a1, b1, c1, d1, tx1, ty1] = self.elements;
        let [a2, b2, c2, d2, tx2, ty2] = other.elements;

        Affine2D {
            elements: [
                a1 * a2 + c1 * b2,
                b1 * a2 + d1 * b2,
                a1 * c2 + c1 * d2,
                b1 * c2 + d1 * d2,
                a1 * tx2 + c1 * ty2 + tx1,
                b1 * tx2 + d1 * ty2 + ty1,
            ],
        }
    }

    pub fn translation_part(&self) -> Vector2 {
        Point::new(self.elements[4], self.elements[5])
    }

    pub fn determinant(&self) -> f32 {
        let [a, b, c, d, _, _] = self.elements;
        a * d - b * c
    }

    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det != 0.0 && det.is_finite()
    }

    pub fn invert(&self) -> Option<Affine2D> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let [a, b, c, d, tx, ty] = self.elements;
        let inv = 1.0 / det;
        let na = d * inv;
        let nb = -b * inv;
        let nc = -c * inv;
        let nd = a * inv;
        Some(Affine2D {
            elements: [
                na,
                nb,
                nc,
                nd,
                -(na * tx + nc * ty),
                -(nb * tx + nd * ty),
            ],
        })
    }

    /// Length of the longest basis vector, i.e. the maximum scale factor.
    pub fn max_basis_length(&self) -> f32 {
        let [a, b, c, d, _, _] = self.elements;
        let x = a * a + b * b;
        let y = c * c + d * d;
        x.max(y).sqrt()
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn is_translation_scale_only(&self) -> bool {
        self.elements[1] == 0.0 && self.elements[2] == 0.0
    }

    /// Axis-aligned bounds of `rect` after transformation.
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let pts = rect.points().map(|p| self.transform_point(p));
        Rect::from_points(&pts).unwrap_or(Rect::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_round_trip() {
        let m = Affine2D::translation(10.0, 5.0)
            .then(&Affine2D::rotation(0.3))
            .then(&Affine2D::scale(2.0, 3.0));
        let inv = m.invert().unwrap();
        let p = Point::new(7.0, -2.0);
        let q = inv.transform_point(m.transform_point(p));
        assert!((p.x - q.x).abs() < 1e-4);
        assert!((p.y - q.y).abs() < 1e-4);
    }

    #[test]
    fn test_singular_transform_has_no_inverse() {
        assert!(Affine2D::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_max_basis_length() {
        assert_eq!(Affine2D::scale(2.0, 5.0).max_basis_length(), 5.0);
        let rotated = Affine2D::rotation(1.0).then(&Affine2D::scale(3.0, 3.0));
        assert!((rotated.max_basis_length() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_transform_rect_bounds() {
        let m = Affine2D::rotation(std::f32::consts::FRAC_PI_2);
        let r = m.transform_rect(&Rect::new(0.0, 0.0, 10.0, 20.0));
        assert!((r.left() + 20.0).abs() < 1e-4);
        assert!((r.right() - 0.0).abs() < 1e-4);
        assert!((r.bottom() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        assert_eq!(a.intersection(&Rect::new(20.0, 20.0, 1.0, 1.0)), None);
    }

    #[test]
    fn test_round_rect_radii_scaled_to_fit() {
        let rr = RoundRect::from_rect_radius(Rect::new(0.0, 0.0, 10.0, 40.0), 10.0);
        assert_eq!(rr.radii.top_left, Size::new(5.0, 5.0));
        assert!(!rr.is_oval());
        let oval = RoundRect::from_rect_radius(Rect::new(0.0, 0.0, 10.0, 10.0), 5.0);
        assert!(oval.is_oval());
    }

    #[test]
    fn test_mip_count() {
        assert_eq!(ISize::new(1, 1).mip_count(), 1);
        assert_eq!(ISize::new(256, 100).mip_count(), 9);
        assert_eq!(ISize::new(0, 0).mip_count(), 1);
    }
}
