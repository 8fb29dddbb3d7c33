//! Catalog discovery records for data-cube products.
//!
//! Each product is encoded as a GeoJSON-shaped record feature: the
//! product name as id, the WGS84 footprint as a polygon, and the
//! product's metadata document flattened into discovery properties.

pub mod encode;
pub mod provider;

pub use encode::{encode_product_as_record, RecordFeature};
pub use provider::{FeatureCollection, RecordsProvider, RecordsResponse, ResultType};
