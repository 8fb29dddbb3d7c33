//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::error::{CubeError, CubeResult};

/// An axis-aligned bounding box in the coordinate units of its CRS.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS, coordinates are in the CRS linear unit (usually meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundingBox {
    /// Create a new bounding box from edge coordinates.
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Create a bounding box from two corner points (lower-left, upper-right).
    pub fn from_points(ll: (f64, f64), ur: (f64, f64)) -> Self {
        Self {
            left: ll.0,
            bottom: ll.1,
            right: ur.0,
            top: ur.1,
        }
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Component-wise union of a set of bounding boxes.
    ///
    /// All boxes must be expressed in the same CRS; an empty input is an
    /// error because there is no identity element to return.
    pub fn union_all(boxes: &[BoundingBox]) -> CubeResult<BoundingBox> {
        let first = boxes
            .first()
            .ok_or_else(|| CubeError::InvalidArgument("cannot union an empty set of bboxes".into()))?;

        Ok(boxes.iter().skip(1).fold(*first, |acc, b| BoundingBox {
            left: acc.left.min(b.left),
            bottom: acc.bottom.min(b.bottom),
            right: acc.right.max(b.right),
            top: acc.top.max(b.top),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_height() {
        let bbox = BoundingBox::new(-101.5, 53.875, -101.375, 54.0);
        assert!((bbox.width() - 0.125).abs() < 1e-12);
        assert!((bbox.height() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_union_all() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(-5.0, 5.0, 8.0, 15.0);

        let u = BoundingBox::union_all(&[a, b]).unwrap();
        assert_eq!(u.left, -5.0);
        assert_eq!(u.bottom, 0.0);
        assert_eq!(u.right, 10.0);
        assert_eq!(u.top, 15.0);
    }

    #[test]
    fn test_union_single() {
        let a = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(BoundingBox::union_all(&[a]).unwrap(), a);
    }

    #[test]
    fn test_union_empty_is_error() {
        let err = BoundingBox::union_all(&[]).unwrap_err();
        assert!(matches!(err, CubeError::InvalidArgument(_)));
    }
}
