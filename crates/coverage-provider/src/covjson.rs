//! CoverageJSON rendering of a loaded coverage.
//!
//! See: <https://covjson.org/>

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cube_catalog::ArrayData;
use cube_common::{CubeError, CubeResult};

use crate::properties::CoverageProperties;
use crate::provider::OutputMeta;

/// A CoverageJSON document for one grid coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageJson {
    #[serde(rename = "type")]
    pub type_: String,
    pub domain: Domain,
    pub parameters: BTreeMap<String, Parameter>,
    pub ranges: BTreeMap<String, NdArray>,
}

/// The grid domain: x/y axes plus the reference system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "domainType")]
    pub domain_type: String,
    pub axes: GridAxes,
    pub referencing: Vec<ReferenceSystemConnection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridAxes {
    pub x: RegularAxis,
    pub y: RegularAxis,
}

/// A regularly spaced axis described by bounds and sample count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegularAxis {
    pub start: f64,
    pub stop: f64,
    pub num: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSystemConnection {
    pub coordinates: Vec<String>,
    pub system: ReferenceSystem,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSystem {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
}

/// One coverage parameter (band).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub type_: String,
    pub description: String,
    pub unit: Unit,
    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedProperty {
    pub id: String,
    pub label: BTreeMap<String, String>,
}

/// Row-major (y outer, x inner) value block for one parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NdArray {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
    #[serde(rename = "axisNames")]
    pub axis_names: Vec<String>,
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

/// Build the CoverageJSON document for a loaded coverage.
pub fn gen_covjson(
    properties: &CoverageProperties,
    meta: &OutputMeta,
    data: &ArrayData,
) -> CubeResult<CoverageJson> {
    let width = meta.width.round() as usize;
    let height = meta.height.round() as usize;

    let domain = Domain {
        type_: "Domain".to_string(),
        domain_type: "Grid".to_string(),
        axes: GridAxes {
            x: RegularAxis {
                start: meta.bbox.left,
                stop: meta.bbox.right,
                num: width,
            },
            y: RegularAxis {
                start: meta.bbox.bottom,
                stop: meta.bbox.top,
                num: height,
            },
        },
        referencing: vec![ReferenceSystemConnection {
            coordinates: vec!["x".to_string(), "y".to_string()],
            system: ReferenceSystem {
                type_: properties.crs_type.to_string(),
                id: properties.crs_uri.clone(),
            },
        }],
    };

    let mut parameters = BTreeMap::new();
    let mut ranges = BTreeMap::new();

    for band in &meta.bands {
        let var = data.get(band).ok_or_else(|| {
            CubeError::InvalidQuery(format!("requested band '{}' not in result", band))
        })?;

        let mut label = BTreeMap::new();
        label.insert("en".to_string(), band.clone());
        parameters.insert(
            band.clone(),
            Parameter {
                type_: "Parameter".to_string(),
                description: band.clone(),
                unit: Unit {
                    symbol: var.units.clone(),
                },
                observed_property: ObservedProperty {
                    id: band.clone(),
                    label,
                },
            },
        );

        let values = var.values.to_f64_vec();
        if values.len() != width * height {
            return Err(CubeError::InvalidQuery("invalid query parameter".to_string()));
        }
        ranges.insert(
            band.clone(),
            NdArray {
                type_: "NdArray".to_string(),
                data_type: var.values.dtype().name().to_string(),
                axis_names: vec!["y".to_string(), "x".to_string()],
                shape: vec![height, width],
                values,
            },
        );
    }

    Ok(CoverageJson {
        type_: "Coverage".to_string(),
        domain,
        parameters,
        ranges,
    })
}
