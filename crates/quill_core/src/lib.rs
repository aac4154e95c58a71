//! Quill Core
//!
//! Foundational value types shared by the renderer and the text engine:
//!
//! - **Geometry**: points, sizes, rectangles, rounded rectangles and 2D affine transforms
//! - **Color**: RGBA colors and the blend modes used when compositing
//! - **Paths**: the immutable [`Path`] model, its [`PathBuilder`], and the
//!   flattened [`Polyline`] consumed by the tessellator
//!
//! # Example
//!
//! ```rust
//! use quill_core::{PathBuilder, Rect};
//!
//! let path = PathBuilder::new()
//!     .add_rect(Rect::new(0.0, 0.0, 10.0, 10.0))
//!     .take_path();
//!
//! let polyline = path.create_polyline(1.0);
//! assert_eq!(polyline.contours.len(), 1);
//! ```

pub mod color;
pub mod geometry;
pub mod path;
pub mod path_builder;
pub mod path_component;

pub use color::{BlendMode, Color};
pub use geometry::{Affine2D, ISize, Point, Rect, RoundRect, RoundingRadii, Size, Vector2};
pub use path::{ComponentStart, Convexity, FillType, Path, Polyline, PolylineContour};
pub use path_builder::PathBuilder;
pub use path_component::{
    CubicPathComponent, LinearPathComponent, PathComponent, QuadraticPathComponent,
    CURVE_PRECISION,
};
