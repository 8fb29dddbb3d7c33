//! Shared types for the datacube-ogcapi workspace.
//!
//! Provides the bounding box, CRS, error, and catalog data model types
//! used by every other crate in the workspace.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod model;

pub use bbox::BoundingBox;
pub use crs::Crs;
pub use error::{CubeError, CubeResult};
pub use model::{Dataset, Dtype, LinkDef, Measurement, MeasurementTable, Product};
