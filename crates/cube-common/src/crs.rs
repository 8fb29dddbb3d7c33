//! Coordinate Reference System identification.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// EPSG codes of geographic (degree-unit) coordinate reference systems
/// this layer recognizes. Every other code is treated as projected.
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4267, 4269, 4258];

/// A coordinate reference system identified by its EPSG code.
///
/// Datasets in a data cube can carry arbitrary EPSG codes, so this is a
/// newtype over the code rather than a closed enum of supported systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs(u32);

impl Crs {
    /// WGS84 geographic coordinates, the normalization target for
    /// multi-CRS products and the fixed CRS of request bboxes.
    pub const WGS84: Crs = Crs(4326);

    /// Create a CRS from a raw EPSG code.
    pub fn from_epsg(code: u32) -> Self {
        Self(code)
    }

    /// The EPSG code of this CRS.
    pub fn epsg(&self) -> u32 {
        self.0
    }

    /// Parse a CRS string such as "EPSG:4326" or "epsg:2957".
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();
        let code = normalized
            .strip_prefix("EPSG:")
            .ok_or_else(|| CrsParseError::InvalidFormat(s.to_string()))?;

        code.parse::<u32>()
            .map(Crs)
            .map_err(|_| CrsParseError::InvalidCode(s.to_string()))
    }

    /// Check if this is a geographic (lat/lon degree) CRS.
    pub fn is_geographic(&self) -> bool {
        GEOGRAPHIC_EPSG.contains(&self.0)
    }

    /// Check if this is a projected (linear-unit) CRS.
    pub fn is_projected(&self) -> bool {
        !self.is_geographic()
    }

    /// Human-facing unit label for coordinates in this CRS.
    pub fn unit_label(&self) -> &'static str {
        if self.is_geographic() {
            "deg"
        } else {
            "m"
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum CrsParseError {
    #[error("Invalid CRS format: {0}. Expected 'EPSG:<code>'")]
    InvalidFormat(String),

    #[error("Invalid EPSG code in CRS: {0}")]
    InvalidCode(String),
}
