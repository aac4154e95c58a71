//! Cached quarter-circle sine/cosine tables

use std::f32::consts::FRAC_PI_2;
use std::ops::Mul;

use quill_core::Point;

use crate::tessellator::MAX_QUADRANT_DIVISIONS;

/// Cosine and sine of one angle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trig {
    pub cos: f32,
    pub sin: f32,
}

impl Trig {
    pub fn from_angle(angle: f32) -> Self {
        Self {
            cos: angle.cos(),
            sin: angle.sin(),
        }
    }
}

impl Mul<f32> for Trig {
    type Output = Point;

    /// Point on a circle of the given radius.
    fn mul(self, radius: f32) -> Point {
        Point::new(self.cos * radius, self.sin * radius)
    }
}

/// `divisions + 1` evenly spaced angles covering one quadrant, 0 to π/2
///
/// Division counts are clamped to `1..=MAX_QUADRANT_DIVISIONS`.
#[derive(Clone, Debug, PartialEq)]
pub struct Trigs {
    trigs: Vec<Trig>,
}

impl Trigs {
    pub fn new(divisions: usize) -> Self {
        let divisions = divisions.clamp(1, MAX_QUADRANT_DIVISIONS);
        let step = FRAC_PI_2 / divisions as f32;
        let mut trigs = Vec::with_capacity(divisions + 1);
        trigs.push(Trig { cos: 1.0, sin: 0.0 });
        for i in 1..divisions {
            trigs.push(Trig::from_angle(step * i as f32));
        }
        trigs.push(Trig { cos: 0.0, sin: 1.0 });
        Self { trigs }
    }

    pub fn len(&self) -> usize {
        self.trigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trigs.is_empty()
    }

    pub fn divisions(&self) -> usize {
        self.trigs.len() - 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trig> {
        self.trigs.iter()
    }
}

impl<'a> IntoIterator for &'a Trigs {
    type Item = &'a Trig;
    type IntoIter = std::slice::Iter<'a, Trig>;

    fn into_iter(self) -> Self::IntoIter {
        self.trigs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact() {
        let trigs = Trigs::new(5);
        assert_eq!(trigs.len(), 6);
        assert_eq!(trigs.iter().next().copied(), Some(Trig { cos: 1.0, sin: 0.0 }));
        assert_eq!(trigs.iter().last().copied(), Some(Trig { cos: 0.0, sin: 1.0 }));
    }

    #[test]
    fn test_zero_divisions_clamped() {
        let trigs = Trigs::new(0);
        assert_eq!(trigs.divisions(), 1);
    }

    #[test]
    fn test_oversized_divisions_clamped() {
        let trigs = Trigs::new(usize::MAX);
        assert_eq!(trigs.divisions(), MAX_QUADRANT_DIVISIONS);
    }

    #[test]
    fn test_unit_length() {
        for trig in &Trigs::new(7) {
            let len = (trig.cos * trig.cos + trig.sin * trig.sin).sqrt();
            assert!((len - 1.0).abs() < 1e-6);
        }
    }
}
