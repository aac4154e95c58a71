//! Path representation and flattening
//!
//! A [`Path`] is an immutable list of contours, each made of typed components.
//! Only [`PathBuilder`](crate::PathBuilder) creates paths. The tessellator and
//! stroke generator consume the flattened [`Polyline`] form.

use smallvec::SmallVec;

use crate::geometry::{Point, Rect, Vector2};
use crate::path_component::PathComponent;

/// Fill rule used when tessellating
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillType {
    #[default]
    NonZero,
    EvenOdd,
}

/// Convexity declared by the builder
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Convexity {
    #[default]
    Unknown,
    Convex,
}

/// One sub-path
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Contour {
    pub(crate) start: Point,
    pub(crate) is_closed: bool,
    /// Index of this contour's first component in the path's component list
    pub(crate) component_start: usize,
}

/// An immutable 2D path
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub(crate) components: Vec<PathComponent>,
    pub(crate) contours: Vec<Contour>,
    pub(crate) fill_type: FillType,
    pub(crate) convexity: Convexity,
    pub(crate) bounds: Option<Rect>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn fill_type(&self) -> FillType {
        self.fill_type
    }

    pub fn is_convex(&self) -> bool {
        self.convexity == Convexity::Convex
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn contour_count(&self) -> usize {
        self.contours.len()
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// Components belonging to contour `index`.
    pub fn contour_components(&self, index: usize) -> &[PathComponent] {
        let Some(contour) = self.contours.get(index) else {
            return &[];
        };
        let end = self
            .contours
            .get(index + 1)
            .map(|c| c.component_start)
            .unwrap_or(self.components.len());
        &self.components[contour.component_start..end]
    }

    pub fn is_contour_closed(&self, index: usize) -> bool {
        self.contours.get(index).is_some_and(|c| c.is_closed)
    }

    /// Tight bounding box, or `None` for an empty path.
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub(crate) fn compute_bounds(&self) -> Option<Rect> {
        let mut points: Vec<Point> = Vec::new();
        for component in &self.components {
            points.extend(component.extrema());
        }
        if points.is_empty() {
            // A lone move still has a position
            points.extend(self.contours.iter().map(|c| c.start));
        }
        Rect::from_points(&points)
    }

    /// Bounds after applying `transform`.
    pub fn transformed_bounds(&self, transform: &crate::Affine2D) -> Option<Rect> {
        if transform.is_translation_scale_only() {
            return self.bounds.map(|b| transform.transform_rect(&b));
        }
        let mut points: Vec<Point> = Vec::new();
        for component in &self.components {
            points.extend(
                component
                    .extrema()
                    .into_iter()
                    .map(|p| transform.transform_point(p)),
            );
        }
        Rect::from_points(&points)
    }

    /// Flatten the path into line segments.
    ///
    /// `scale` is the device-space scale factor of the transform the path will
    /// be drawn with; curves get proportionally more segments when magnified.
    pub fn create_polyline(&self, scale: f32) -> Polyline {
        let mut polyline = Polyline {
            points: Vec::new(),
            contours: Vec::new(),
            fill_type: self.fill_type,
        };

        for (index, contour) in self.contours.iter().enumerate() {
            let components = self.contour_components(index);
            if components.is_empty() {
                continue;
            }

            let start_index = polyline.points.len();
            polyline.points.push(contour.start);
            let mut component_starts: SmallVec<[ComponentStart; 8]> = SmallVec::new();
            let mut scratch: Vec<Point> = Vec::new();

            for component in components {
                scratch.clear();
                component.append_polyline_points(scale, &mut scratch);
                let component_start_index = polyline.points.len() - 1;
                let before = polyline.points.len();
                for point in scratch.drain(..) {
                    if polyline.points.last() != Some(&point) {
                        polyline.points.push(point);
                    }
                }
                if polyline.points.len() > before {
                    component_starts.push(ComponentStart {
                        component_start_index,
                        is_curve: component.is_curve(),
                    });
                }
            }

            let contour_points = &polyline.points[start_index..];
            let (start_direction, end_direction) = contour_directions(contour_points);
            polyline.contours.push(PolylineContour {
                start_index,
                is_closed: contour.is_closed,
                start_direction,
                end_direction,
                components: component_starts,
            });
        }

        polyline
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Polyline
// ─────────────────────────────────────────────────────────────────────────────

/// Where a path component begins inside a polyline contour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentStart {
    /// Index into [`Polyline::points`] of the component's first point
    pub component_start_index: usize,
    pub is_curve: bool,
}

/// A contour of a flattened path
#[derive(Clone, Debug, PartialEq)]
pub struct PolylineContour {
    /// Index of the first point in [`Polyline::points`]
    pub start_index: usize,
    pub is_closed: bool,
    /// Unit vector pointing out of the contour at its first point
    pub start_direction: Vector2,
    /// Unit vector pointing out of the contour at its last point
    pub end_direction: Vector2,
    pub components: SmallVec<[ComponentStart; 8]>,
}

/// A path flattened into straight segments
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
    pub contours: Vec<PolylineContour>,
    pub fill_type: FillType,
}

impl Polyline {
    /// Half-open point index range of contour `index`.
    pub fn contour_point_range(&self, index: usize) -> std::ops::Range<usize> {
        let start = self.contours[index].start_index;
        let end = self
            .contours
            .get(index + 1)
            .map(|c| c.start_index)
            .unwrap_or(self.points.len());
        start..end
    }

    pub fn contour_points(&self, index: usize) -> &[Point] {
        &self.points[self.contour_point_range(index)]
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn contour_directions(points: &[Point]) -> (Vector2, Vector2) {
    let default = (Point::new(-1.0, 0.0), Point::new(1.0, 0.0));
    if points.len() < 2 {
        return default;
    }
    let first = points[0];
    let start = points[1..]
        .iter()
        .find(|p| (**p - first).length() > f32::EPSILON)
        .map(|p| (first - *p).normalize());
    let last = points[points.len() - 1];
    let end = points[..points.len() - 1]
        .iter()
        .rev()
        .find(|p| (last - **p).length() > f32::EPSILON)
        .map(|p| (last - *p).normalize());
    (start.unwrap_or(default.0), end.unwrap_or(default.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathBuilder;

    #[test]
    fn test_polyline_of_rect() {
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 10.0, 20.0))
            .take_path();
        let polyline = path.create_polyline(1.0);
        assert_eq!(polyline.contours.len(), 1);
        // Four corners plus the closing point back at the start
        assert_eq!(polyline.points.len(), 5);
        assert!(polyline.contours[0].is_closed);
        assert_eq!(polyline.contours[0].components.len(), 4);
    }

    #[test]
    fn test_polyline_directions_point_outward() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(10.0, 0.0))
            .take_path();
        let polyline = path.create_polyline(1.0);
        let contour = &polyline.contours[0];
        assert_eq!(contour.start_direction, Point::new(-1.0, 0.0));
        assert_eq!(contour.end_direction, Point::new(1.0, 0.0));
    }

    #[test]
    fn test_duplicate_points_are_dropped() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(0.0, 0.0))
            .line_to(Point::new(5.0, 0.0))
            .take_path();
        let polyline = path.create_polyline(1.0);
        assert_eq!(polyline.points.len(), 2);
        assert_eq!(polyline.contours[0].components.len(), 1);
    }

    #[test]
    fn test_multiple_contours_ranges() {
        let path = PathBuilder::new()
            .add_line(Point::new(0.0, 0.0), Point::new(1.0, 0.0))
            .add_line(Point::new(0.0, 5.0), Point::new(1.0, 5.0))
            .take_path();
        let polyline = path.create_polyline(1.0);
        assert_eq!(polyline.contours.len(), 2);
        assert_eq!(polyline.contour_point_range(1), 2..4);
    }

    #[test]
    fn test_bounds_use_curve_extrema() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .quadratic_curve_to(Point::new(50.0, 100.0), Point::new(100.0, 0.0))
            .take_path();
        let bounds = path.bounds().unwrap();
        assert!((bounds.bottom() - 50.0).abs() < 1e-3);
    }
}
