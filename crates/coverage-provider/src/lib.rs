//! Coverage queries against a data-cube product.
//!
//! A [`CoverageProvider`] wraps one product: it derives the normalized
//! coverage properties from the cached catalog metadata, validates and
//! translates client queries (bbox or named-axis subsets, band list,
//! output format) into data-cube load parameters, and renders the
//! loaded arrays as CoverageJSON, GeoTIFF bytes, or NetCDF bytes.

pub mod config;
pub mod covjson;
pub mod domain;
pub mod geotiff;
pub mod netcdf;
pub mod properties;
pub mod provider;

pub use config::CoverageConfig;
pub use properties::{CoverageProperties, MeasurementProperties};
pub use provider::{CoverageBody, CoverageProvider, CoverageRequest, CoverageResponse, OutputFormat, OutputMeta};
