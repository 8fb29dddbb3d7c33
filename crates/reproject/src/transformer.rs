//! Reusable coordinate transformer built on proj4rs.

use proj4rs::transform::transform;
use proj4rs::Proj;

use cube_common::Crs;

use crate::epsg::proj_string;
use crate::ReprojectError;

/// A coordinate transformer between two CRSs.
///
/// Coordinates are always handled in (x, y) order regardless of the CRS
/// axis convention, so geographic results come back as (lon, lat).
#[derive(Debug)]
pub struct Transformer {
    source_proj: Proj,
    target_proj: Proj,
    source: Crs,
    target: Crs,
}

impl Transformer {
    /// Create a transformer between two CRSs.
    pub fn new(source: Crs, target: Crs) -> Result<Self, ReprojectError> {
        let source_str =
            proj_string(source.epsg()).ok_or(ReprojectError::UnsupportedCrs(source.epsg()))?;
        let target_str =
            proj_string(target.epsg()).ok_or(ReprojectError::UnsupportedCrs(target.epsg()))?;

        let source_proj = Proj::from_proj_string(&source_str)
            .map_err(|e| ReprojectError::ProjInit(source.epsg(), format!("{:?}", e)))?;
        let target_proj = Proj::from_proj_string(&target_str)
            .map_err(|e| ReprojectError::ProjInit(target.epsg(), format!("{:?}", e)))?;

        Ok(Self {
            source_proj,
            target_proj,
            source,
            target,
        })
    }

    /// Transform a single (x, y) coordinate pair.
    ///
    /// Geographic endpoints use degrees externally; proj4rs works in
    /// radians, so conversion happens at the boundary.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ReprojectError> {
        let (in_x, in_y) = if self.source.is_geographic() {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (in_x, in_y, 0.0);
        transform(&self.source_proj, &self.target_proj, &mut point)
            .map_err(|e| ReprojectError::TransformFailed(format!("{:?}", e)))?;

        let (out_x, out_y) = if self.target.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        Ok((out_x, out_y))
    }

    /// The source CRS of this transformer.
    pub fn source(&self) -> Crs {
        self.source
    }

    /// The target CRS of this transformer.
    pub fn target(&self) -> Crs {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_to_utm13n() {
        let t = Transformer::new(Crs::WGS84, Crs::from_epsg(2957)).unwrap();
        let (x, y) = t.transform(-101.5, 53.875).unwrap();

        // Known corner of the The_Pas_2014 product extent.
        assert!((x - 730067.39).abs() < 1.0, "easting was {}", x);
        assert!((y - 5975292.28).abs() < 1.0, "northing was {}", y);
    }

    #[test]
    fn test_round_trip() {
        let fwd = Transformer::new(Crs::WGS84, Crs::from_epsg(2957)).unwrap();
        let back = Transformer::new(Crs::from_epsg(2957), Crs::WGS84).unwrap();

        let (x, y) = fwd.transform(-101.375, 54.0).unwrap();
        let (lon, lat) = back.transform(x, y).unwrap();

        assert!((lon - -101.375).abs() < 1e-6);
        assert!((lat - 54.0).abs() < 1e-6);
    }

    #[test]
    fn test_unsupported_crs() {
        let err = Transformer::new(Crs::WGS84, Crs::from_epsg(99999)).unwrap_err();
        assert!(matches!(err, ReprojectError::UnsupportedCrs(99999)));
    }
}
