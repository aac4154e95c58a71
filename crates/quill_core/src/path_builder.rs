//! Builder for constructing paths

use crate::geometry::{Point, Rect, RoundRect, Size, Vector2};
use crate::path::{Contour, Convexity, FillType, Path};
use crate::path_component::{
    CubicPathComponent, LinearPathComponent, PathComponent, QuadraticPathComponent,
};

/// Cubic control point distance for approximating a quarter circle.
pub const ARC_APPROXIMATION_MAGIC: f32 = 0.551_915_02;

/// Builder for constructing paths
///
/// The builder is the only way to mutate path data; [`PathBuilder::take_path`]
/// moves the finished value out.
#[derive(Clone, Debug, Default)]
pub struct PathBuilder {
    path: Path,
    current: Point,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_point(&self) -> Point {
        self.current
    }

    pub fn move_to(mut self, point: Point) -> Self {
        match self.path.contours.last_mut() {
            // Consecutive moves collapse into one
            Some(last) if last.component_start == self.path.components.len() => {
                last.start = point;
                last.is_closed = false;
            }
            _ => self.path.contours.push(Contour {
                start: point,
                is_closed: false,
                component_start: self.path.components.len(),
            }),
        }
        self.current = point;
        self
    }

    pub fn move_to_relative(self, delta: Vector2) -> Self {
        let target = self.current + delta;
        self.move_to(target)
    }

    pub fn line_to(mut self, point: Point) -> Self {
        self.ensure_contour();
        self.push(PathComponent::Linear(LinearPathComponent::new(
            self.current,
            point,
        )));
        self.current = point;
        self
    }

    pub fn line_to_relative(self, delta: Vector2) -> Self {
        let target = self.current + delta;
        self.line_to(target)
    }

    pub fn horizontal_line_to(self, x: f32) -> Self {
        let target = Point::new(x, self.current.y);
        self.line_to(target)
    }

    pub fn vertical_line_to(self, y: f32) -> Self {
        let target = Point::new(self.current.x, y);
        self.line_to(target)
    }

    pub fn quadratic_curve_to(mut self, control: Point, point: Point) -> Self {
        self.ensure_contour();
        self.push(PathComponent::Quadratic(QuadraticPathComponent::new(
            self.current,
            control,
            point,
        )));
        self.current = point;
        self
    }

    pub fn cubic_curve_to(mut self, control1: Point, control2: Point, point: Point) -> Self {
        self.ensure_contour();
        self.push(PathComponent::Cubic(CubicPathComponent::new(
            self.current,
            control1,
            control2,
            point,
        )));
        self.current = point;
        self
    }

    pub fn close(mut self) -> Self {
        let Some(contour) = self.path.contours.last().copied() else {
            return self;
        };
        if contour.is_closed {
            return self;
        }
        if self.current != contour.start {
            self.push(PathComponent::Linear(LinearPathComponent::new(
                self.current,
                contour.start,
            )));
        }
        if let Some(last) = self.path.contours.last_mut() {
            last.is_closed = true;
        }
        self.current = contour.start;
        self
    }

    pub fn add_line(self, p1: Point, p2: Point) -> Self {
        self.move_to(p1).line_to(p2)
    }

    pub fn add_rect(self, rect: Rect) -> Self {
        let [tl, tr, br, bl] = rect.points();
        self.move_to(tl).line_to(tr).line_to(br).line_to(bl).close()
    }

    pub fn add_circle(self, center: Point, radius: f32) -> Self {
        self.add_oval(Rect::new(
            center.x - radius,
            center.y - radius,
            radius * 2.0,
            radius * 2.0,
        ))
    }

    pub fn add_oval(self, rect: Rect) -> Self {
        let r = Size::new(rect.width() / 2.0, rect.height() / 2.0);
        self.add_round_rect_radii(rect, [r, r, r, r])
    }

    pub fn add_round_rect(self, round_rect: RoundRect) -> Self {
        if round_rect.is_rect() {
            return self.add_rect(round_rect.rect);
        }
        let radii = round_rect.radii;
        self.add_round_rect_radii(
            round_rect.rect,
            [
                radii.top_left,
                radii.top_right,
                radii.bottom_right,
                radii.bottom_left,
            ],
        )
    }

    /// Corners are ordered top-left, top-right, bottom-right, bottom-left.
    fn add_round_rect_radii(self, rect: Rect, radii: [Size; 4]) -> Self {
        let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
        let [tl, tr, br, bl] = radii;
        let m = ARC_APPROXIMATION_MAGIC;

        let mut builder = self.move_to(Point::new(l + tl.width, t));

        builder = builder.line_to(Point::new(r - tr.width, t));
        if !tr.is_empty() {
            builder = builder.cubic_curve_to(
                Point::new(r - tr.width + tr.width * m, t),
                Point::new(r, t + tr.height - tr.height * m),
                Point::new(r, t + tr.height),
            );
        }

        builder = builder.line_to(Point::new(r, b - br.height));
        if !br.is_empty() {
            builder = builder.cubic_curve_to(
                Point::new(r, b - br.height + br.height * m),
                Point::new(r - br.width + br.width * m, b),
                Point::new(r - br.width, b),
            );
        }

        builder = builder.line_to(Point::new(l + bl.width, b));
        if !bl.is_empty() {
            builder = builder.cubic_curve_to(
                Point::new(l + bl.width - bl.width * m, b),
                Point::new(l, b - bl.height + bl.height * m),
                Point::new(l, b - bl.height),
            );
        }

        builder = builder.line_to(Point::new(l, t + tl.height));
        if !tl.is_empty() {
            builder = builder.cubic_curve_to(
                Point::new(l, t + tl.height - tl.height * m),
                Point::new(l + tl.width - tl.width * m, t),
                Point::new(l + tl.width, t),
            );
        }

        builder.close()
    }

    /// Add an elliptical arc inscribed in `oval_bounds`.
    ///
    /// Angles are in radians, clockwise from the positive x axis. When
    /// `use_center` is set the arc becomes a closed pie wedge.
    pub fn add_arc(self, oval_bounds: Rect, start: f32, sweep: f32, use_center: bool) -> Self {
        let center = oval_bounds.center();
        let radius = Size::new(oval_bounds.width() / 2.0, oval_bounds.height() / 2.0);
        let sweep = sweep.clamp(-std::f32::consts::TAU, std::f32::consts::TAU);
        let on_ellipse =
            |angle: f32| Point::new(center.x + radius.width * angle.cos(), center.y + radius.height * angle.sin());

        let mut builder = if use_center {
            self.move_to(center).line_to(on_ellipse(start))
        } else {
            self.move_to(on_ellipse(start))
        };

        let segments = (sweep.abs() / std::f32::consts::FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep / segments as f32;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        let mut angle = start;
        for _ in 0..segments {
            let next = angle + step;
            let p0 = on_ellipse(angle);
            let p1 = on_ellipse(next);
            let d0 = Point::new(-angle.sin() * radius.width, angle.cos() * radius.height);
            let d1 = Point::new(-next.sin() * radius.width, next.cos() * radius.height);
            builder = builder.cubic_curve_to(p0 + d0 * k, p1 - d1 * k, p1);
            angle = next;
        }

        if use_center {
            builder.close()
        } else {
            builder
        }
    }

    pub fn set_fill_type(mut self, fill_type: FillType) -> Self {
        self.path.fill_type = fill_type;
        self
    }

    pub fn set_convexity(mut self, convexity: Convexity) -> Self {
        self.path.convexity = convexity;
        self
    }

    /// Translate everything added so far.
    pub fn shift(mut self, offset: Vector2) -> Self {
        for component in &mut self.path.components {
            *component = component.translated(offset);
        }
        for contour in &mut self.path.contours {
            contour.start += offset;
        }
        self.current += offset;
        self
    }

    /// Snapshot the path without consuming the builder.
    pub fn copy_path(&self) -> Path {
        let mut path = self.path.clone();
        path.bounds = path.compute_bounds();
        path
    }

    /// Move the finished path out of the builder.
    pub fn take_path(self) -> Path {
        let mut path = self.path;
        path.bounds = path.compute_bounds();
        path
    }

    fn ensure_contour(&mut self) {
        let needs_contour = match self.path.contours.last() {
            None => true,
            Some(last) => last.is_closed,
        };
        if needs_contour {
            self.path.contours.push(Contour {
                start: self.current,
                is_closed: false,
                component_start: self.path.components.len(),
            });
        }
    }

    fn push(&mut self, component: PathComponent) {
        self.path.components.push(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_adds_closing_segment() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(10.0, 0.0))
            .line_to(Point::new(10.0, 10.0))
            .close()
            .take_path();
        assert_eq!(path.component_count(), 3);
        assert!(path.is_contour_closed(0));
    }

    #[test]
    fn test_consecutive_moves_collapse() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .move_to(Point::new(5.0, 5.0))
            .line_to(Point::new(6.0, 5.0))
            .take_path();
        assert_eq!(path.contour_count(), 1);
        assert_eq!(path.components()[0].start(), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_drawing_after_close_starts_new_contour() {
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 1.0, 1.0))
            .line_to(Point::new(5.0, 5.0))
            .take_path();
        assert_eq!(path.contour_count(), 2);
        assert_eq!(path.contour_components(1)[0].start(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_circle_bounds() {
        let path = PathBuilder::new()
            .add_circle(Point::new(50.0, 50.0), 10.0)
            .take_path();
        let bounds = path.bounds().unwrap();
        assert!((bounds.left() - 40.0).abs() < 1e-3);
        assert!((bounds.right() - 60.0).abs() < 1e-3);
        assert!((bounds.top() - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_arc_ends_on_ellipse() {
        let builder = PathBuilder::new().add_arc(
            Rect::new(0.0, 0.0, 20.0, 20.0),
            0.0,
            std::f32::consts::PI,
            false,
        );
        let end = builder.current_point();
        assert!((end.x - 0.0).abs() < 1e-3);
        assert!((end.y - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_shift_moves_bounds() {
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 10.0, 10.0))
            .shift(Point::new(5.0, 5.0))
            .take_path();
        assert_eq!(path.bounds(), Some(Rect::new(5.0, 5.0, 10.0, 10.0)));
    }
}
