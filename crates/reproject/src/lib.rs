//! Coordinate and bounding-box reprojection utilities.
//!
//! Reprojection is delegated to proj4rs (pure Rust PROJ). Bounding boxes
//! are reprojected by transforming the (left, bottom) and (right, top)
//! corners independently. That two-corner approximation is not exact for
//! rotated or skewed reprojections, but it is this system's defined
//! behavior and is kept deliberately.

pub mod epsg;
pub mod transformer;

use thiserror::Error;
use tracing::trace;

use cube_common::{BoundingBox, Crs, CubeError};

pub use transformer::Transformer;

/// Decimal places kept when converting a bbox into a human-facing
/// polygon ring. Internal bbox math keeps full precision.
const RING_COORD_DECIMALS: i32 = 4;

/// Errors from coordinate transformation.
#[derive(Debug, Error)]
pub enum ReprojectError {
    #[error("No projection definition for EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("Failed to initialize projection for EPSG:{0}: {1}")]
    ProjInit(u32, String),

    #[error("Coordinate transform failed: {0}")]
    TransformFailed(String),
}

impl From<ReprojectError> for CubeError {
    fn from(err: ReprojectError) -> Self {
        CubeError::Internal(err.to_string())
    }
}

/// Coordinate order of an emitted polygon ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingOrder {
    /// GeoJSON order: (lon, lat) / (x, y).
    LonLat,
    /// Legacy order: (lat, lon) / (y, x).
    LatLon,
}

/// Reproject a bounding box from one CRS to another.
///
/// Identity when source and target are equal. Otherwise the two corner
/// points are transformed independently (always x,y order) and a new box
/// is rebuilt from them.
pub fn reproject_bbox(
    bbox: BoundingBox,
    source: Crs,
    target: Crs,
) -> Result<BoundingBox, ReprojectError> {
    if source == target {
        return Ok(bbox);
    }

    trace!(%source, %target, "reprojecting bbox corners");
    let transformer = Transformer::new(source, target)?;
    let (left, bottom) = transformer.transform(bbox.left, bbox.bottom)?;
    let (right, top) = transformer.transform(bbox.right, bbox.top)?;

    Ok(BoundingBox::from_points((left, bottom), (right, top)))
}

/// Reproject a bounding box into WGS84.
pub fn bbox_to_wgs84(bbox: BoundingBox, source: Crs) -> Result<BoundingBox, ReprojectError> {
    reproject_bbox(bbox, source, Crs::WGS84)
}

/// Convert a bounding box into a closed polygon ring
/// [UL, UR, LR, LL, UL], rounded for human-facing output.
pub fn bbox_to_ring(bbox: BoundingBox, order: RingOrder) -> Vec<[f64; 2]> {
    let left = apply_precision(bbox.left);
    let bottom = apply_precision(bbox.bottom);
    let right = apply_precision(bbox.right);
    let top = apply_precision(bbox.top);

    let corners = [
        (left, top),     // UL
        (right, top),    // UR
        (right, bottom), // LR
        (left, bottom),  // LL
        (left, top),     // UL again, closing the ring
    ];

    corners
        .iter()
        .map(|&(x, y)| match order {
            RingOrder::LonLat => [x, y],
            RingOrder::LatLon => [y, x],
        })
        .collect()
}

/// Round a coordinate to the fixed output precision.
pub fn apply_precision(coord: f64) -> f64 {
    let factor = 10f64.powi(RING_COORD_DECIMALS);
    (coord * factor).round() / factor
}
