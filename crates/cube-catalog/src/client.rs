//! The external data-cube client seam.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cube_common::{Crs, CubeResult, Dataset, Dtype, MeasurementTable, Product};

/// Read-only operations this layer needs from the external data cube,
/// plus the one array-load passthrough.
///
/// Implementations are treated as opaque synchronous calls; callers
/// wanting timeouts must wrap the connector.
pub trait CatalogClient: Send + Sync {
    /// Enumerate all product names in catalog order.
    fn list_product_names(&self) -> CubeResult<Vec<String>>;

    /// Fetch the full catalog record for one product.
    fn get_product(&self, name: &str) -> CubeResult<Product>;

    /// Fetch all datasets belonging to one product.
    fn find_datasets(&self, product: &str) -> CubeResult<Vec<Dataset>>;

    /// Fetch the catalog-wide table of active (non-archived) measurements.
    fn list_active_measurements(&self) -> CubeResult<MeasurementTable>;

    /// Load array data for a product with the given parameters.
    fn load_array(&self, product: &str, params: &LoadParams) -> CubeResult<ArrayData>;
}

/// Parameters for a data-cube array load.
///
/// `align` and `resolution` use (y, x) component order, matching the
/// cube's load convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadParams {
    /// CRS of the x/y extent below.
    pub crs: Crs,
    /// Requested x extent (min, max) in `crs` units.
    pub x: (f64, f64),
    /// Requested y extent (min, max) in `crs` units.
    pub y: (f64, f64),
    /// Pixel alignment, always half the absolute resolution: (|resy|/2, |resx|/2).
    pub align: (f64, f64),
    /// Target resolution, sign-preserving: (resy, resx).
    pub resolution: (f64, f64),
    /// CRS of the returned arrays.
    pub output_crs: Crs,
    /// Band subset; `None` loads every band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Vec<String>>,
}

/// Values of one loaded variable, tagged by dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValues {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl VarValues {
    pub fn len(&self) -> usize {
        match self {
            VarValues::U8(v) => v.len(),
            VarValues::U16(v) => v.len(),
            VarValues::U32(v) => v.len(),
            VarValues::I16(v) => v.len(),
            VarValues::I32(v) => v.len(),
            VarValues::F32(v) => v.len(),
            VarValues::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            VarValues::U8(_) => Dtype::UInt8,
            VarValues::U16(_) => Dtype::UInt16,
            VarValues::U32(_) => Dtype::UInt32,
            VarValues::I16(_) => Dtype::Int16,
            VarValues::I32(_) => Dtype::Int32,
            VarValues::F32(_) => Dtype::Float32,
            VarValues::F64(_) => Dtype::Float64,
        }
    }

    /// Flatten to f64 for JSON output.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            VarValues::U8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            VarValues::U16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            VarValues::U32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            VarValues::I16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            VarValues::I32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            VarValues::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            VarValues::F64(v) => v.clone(),
        }
    }

    /// Raw little-endian bytes of the values, used by the GeoTIFF writer.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            VarValues::U8(v) => v.clone(),
            VarValues::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            VarValues::U32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            VarValues::I16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            VarValues::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            VarValues::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            VarValues::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

/// One loaded variable: values plus the attributes the renderers need.
#[derive(Debug, Clone)]
pub struct VarArray {
    pub values: VarValues,
    pub units: String,
    pub nodata: Option<f64>,
    pub attrs: BTreeMap<String, String>,
}

/// The result of a data-cube array load: an ordered set of variables.
#[derive(Debug, Clone, Default)]
pub struct ArrayData {
    variables: Vec<(String, VarArray)>,
    /// Attributes attached to the time axis of the result, if any.
    pub time_attrs: BTreeMap<String, String>,
}

impl ArrayData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable, preserving insertion order.
    pub fn insert(&mut self, name: impl Into<String>, var: VarArray) {
        self.variables.push((name.into(), var));
    }

    /// Variable names in insertion order.
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&VarArray> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, var)| var)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Drop the `units` attribute from the time axis. Serializing a time
    /// axis that still carries an encoding-reserved `units` attribute
    /// collides with the writer's own encoding of that axis.
    pub fn strip_time_units_attr(&mut self) {
        self.time_attrs.remove("units");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_values_dtype_and_len() {
        let values = VarValues::U16(vec![1, 2, 3]);
        assert_eq!(values.dtype(), Dtype::UInt16);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_to_f64() {
        let values = VarValues::I16(vec![-1, 0, 7]);
        assert_eq!(values.to_f64_vec(), vec![-1.0, 0.0, 7.0]);
    }

    #[test]
    fn test_le_bytes() {
        let values = VarValues::U16(vec![0x0102, 0x0304]);
        assert_eq!(values.to_le_bytes(), vec![0x02, 0x01, 0x04, 0x03]);
    }

    #[test]
    fn test_array_data_preserves_order() {
        let mut data = ArrayData::new();
        for name in ["b", "a", "c"] {
            data.insert(
                name,
                VarArray {
                    values: VarValues::F32(vec![0.0]),
                    units: "m".to_string(),
                    nodata: None,
                    attrs: BTreeMap::new(),
                },
            );
        }
        assert_eq!(data.variable_names(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_strip_time_units() {
        let mut data = ArrayData::new();
        data.time_attrs
            .insert("units".to_string(), "seconds since 1970-01-01".to_string());
        data.time_attrs
            .insert("calendar".to_string(), "gregorian".to_string());

        data.strip_time_units_attr();
        assert!(!data.time_attrs.contains_key("units"));
        assert!(data.time_attrs.contains_key("calendar"));
    }
}
