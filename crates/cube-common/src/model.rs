//! Catalog data model: products, datasets, and measurements.
//!
//! These are read-only views of what the external data-cube catalog
//! reports; nothing here is ever mutated after ingestion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::bbox::BoundingBox;
use crate::crs::Crs;

/// Numeric data type of a measurement/band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dtype {
    UInt8,
    UInt16,
    UInt32,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl Dtype {
    /// Canonical name as reported by the catalog (numpy-style).
    pub fn name(&self) -> &'static str {
        match self {
            Dtype::UInt8 => "uint8",
            Dtype::UInt16 => "uint16",
            Dtype::UInt32 => "uint32",
            Dtype::Int16 => "int16",
            Dtype::Int32 => "int32",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
        }
    }

    /// Parse a catalog dtype string.
    pub fn parse(s: &str) -> Option<Dtype> {
        match s {
            "uint8" => Some(Dtype::UInt8),
            "uint16" => Some(Dtype::UInt16),
            "uint32" => Some(Dtype::UInt32),
            "int16" => Some(Dtype::Int16),
            "int32" => Some(Dtype::Int32),
            "float32" => Some(Dtype::Float32),
            "float64" => Some(Dtype::Float64),
            _ => None,
        }
    }

    /// Check if this is an unsigned integer type.
    pub fn is_unsigned(&self) -> bool {
        matches!(self, Dtype::UInt8 | Dtype::UInt16 | Dtype::UInt32)
    }

    /// Size of one value in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            Dtype::UInt8 => 1,
            Dtype::UInt16 | Dtype::Int16 => 2,
            Dtype::UInt32 | Dtype::Int32 | Dtype::Float32 => 4,
            Dtype::Float64 => 8,
        }
    }
}

/// One named data variable within a product's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub dtype: Dtype,
    /// Sentinel value marking missing data.
    pub nodata: f64,
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
}

/// The catalog-wide table of active (non-archived) measurements.
///
/// Rows carry their product key, so the table is fetched once for the
/// whole catalog rather than per product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementTable {
    pub rows: Vec<MeasurementRow>,
}

/// One row of the measurement table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRow {
    pub product: String,
    pub measurement: Measurement,
}

impl MeasurementTable {
    /// All measurements belonging to the given product, in table order.
    pub fn for_product(&self, product: &str) -> Vec<&Measurement> {
        self.rows
            .iter()
            .filter(|row| row.product == product)
            .map(|row| &row.measurement)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An external link attached to a product's metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hreflang: Option<String>,
}

/// A named collection of datasets sharing a measurement schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product name, the key used throughout the catalog.
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub links: Vec<LinkDef>,
    /// Ordered band schema declared by the product definition.
    pub measurements: Vec<Measurement>,
    /// Declared default CRS; may be absent, in which case the per-dataset
    /// CRSs are the only source of truth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_crs: Option<Crs>,
    /// Declared default resolution (resx, resy), sign-preserving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_resolution: Option<(f64, f64)>,
    /// Declared storage format (e.g. "GeoTIFF"), used by config-gen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Free-form origin-specific metadata document.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Product {
    /// Number of bands in the product's schema.
    pub fn band_count(&self) -> usize {
        self.measurements.len()
    }
}

/// One ingested granule belonging to exactly one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Uuid,
    pub crs: Crs,
    /// Native affine transform. `transform[0]` is the x resolution and
    /// `transform[4]` the y resolution, signs preserved (negative y is
    /// the usual top-to-bottom raster convention).
    pub transform: [f64; 6],
    /// Bounding box in the dataset's native CRS.
    pub bbox: BoundingBox,
    /// Storage format of this granule, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Free-form origin-specific metadata document.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Dataset {
    /// The (resx, resy) resolution pair read from the affine transform,
    /// sign-preserving because the cube needs the signs when loading.
    pub fn resolution(&self) -> (f64, f64) {
        (self.transform[0], self.transform[4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meters(name: &str) -> Measurement {
        Measurement {
            name: name.to_string(),
            dtype: Dtype::Float32,
            nodata: -32767.0,
            units: "m".to_string(),
            aliases: None,
        }
    }

    #[test]
    fn test_dtype_roundtrip() {
        for dtype in [
            Dtype::UInt8,
            Dtype::UInt16,
            Dtype::UInt32,
            Dtype::Int16,
            Dtype::Int32,
            Dtype::Float32,
            Dtype::Float64,
        ] {
            assert_eq!(Dtype::parse(dtype.name()), Some(dtype));
        }
        assert_eq!(Dtype::parse("complex128"), None);
    }

    #[test]
    fn test_dtype_unsigned() {
        assert!(Dtype::UInt16.is_unsigned());
        assert!(!Dtype::Int16.is_unsigned());
        assert!(!Dtype::Float64.is_unsigned());
    }

    #[test]
    fn test_measurement_table_lookup() {
        let table = MeasurementTable {
            rows: vec![
                MeasurementRow {
                    product: "dsm__MB__The_Pas_2014".to_string(),
                    measurement: meters("dsm"),
                },
                MeasurementRow {
                    product: "dsm__NS__Port_Hawkesbury_2016".to_string(),
                    measurement: meters("dsm"),
                },
            ],
        };

        assert_eq!(table.for_product("dsm__MB__The_Pas_2014").len(), 1);
        assert_eq!(table.for_product("unknown").len(), 0);
    }

    #[test]
    fn test_dataset_resolution_keeps_sign() {
        let dataset = Dataset {
            id: Uuid::new_v4(),
            crs: Crs::from_epsg(2957),
            transform: [1.0, 0.0, 730000.0, 0.0, -1.0, 5990000.0],
            bbox: BoundingBox::new(730000.0, 5975000.0, 737000.0, 5990000.0),
            format: None,
            metadata: Map::new(),
        };

        assert_eq!(dataset.resolution(), (1.0, -1.0));
    }
}
