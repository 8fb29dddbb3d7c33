//! In-memory classic NetCDF (CDF-1) encoding of loaded coverage arrays.
//!
//! The classic format has no unsigned integer types, so unsigned bands
//! are cast to the next wider signed type (uint8 to short, uint16 to
//! int, uint32 to double) before serialization. Values, dimension
//! lengths, and offsets are all big-endian per the format.

use cube_catalog::{ArrayData, VarValues};
use cube_common::{CubeError, CubeResult};

use crate::properties::CoverageProperties;
use crate::provider::OutputMeta;

const NC_SHORT: u32 = 3;
const NC_INT: u32 = 4;
const NC_FLOAT: u32 = 5;
const NC_DOUBLE: u32 = 6;
const NC_CHAR: u32 = 2;

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;

fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

fn put_padded(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes);
    for _ in bytes.len()..pad4(bytes.len()) {
        out.push(0);
    }
}

fn put_name(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(&(name.len() as u32).to_be_bytes());
    put_padded(out, name.as_bytes());
}

struct NcAttr {
    name: String,
    nc_type: u32,
    nelems: u32,
    bytes: Vec<u8>,
}

impl NcAttr {
    fn text(name: &str, value: &str) -> NcAttr {
        NcAttr {
            name: name.to_string(),
            nc_type: NC_CHAR,
            nelems: value.len() as u32,
            bytes: value.as_bytes().to_vec(),
        }
    }

    /// A scalar attribute matching the owning variable's type.
    fn fill_value(nc_type: u32, value: f64) -> NcAttr {
        let bytes = match nc_type {
            NC_SHORT => (value as i16).to_be_bytes().to_vec(),
            NC_INT => (value as i32).to_be_bytes().to_vec(),
            NC_FLOAT => (value as f32).to_be_bytes().to_vec(),
            _ => value.to_be_bytes().to_vec(),
        };
        NcAttr {
            name: "_FillValue".to_string(),
            nc_type,
            nelems: 1,
            bytes,
        }
    }
}

struct NcVar {
    name: String,
    dimids: Vec<u32>,
    attrs: Vec<NcAttr>,
    nc_type: u32,
    data: Vec<u8>,
}

impl NcVar {
    fn vsize(&self) -> u32 {
        pad4(self.data.len()) as u32
    }
}

/// Big-endian value bytes plus the classic-format type, casting
/// unsigned inputs to the next wider signed type.
fn encode_values(values: &VarValues) -> (u32, Vec<u8>) {
    match values {
        VarValues::U8(v) => (
            NC_SHORT,
            v.iter().flat_map(|&x| i16::from(x).to_be_bytes()).collect(),
        ),
        VarValues::U16(v) => (
            NC_INT,
            v.iter().flat_map(|&x| i32::from(x).to_be_bytes()).collect(),
        ),
        VarValues::U32(v) => (
            NC_DOUBLE,
            v.iter().flat_map(|&x| f64::from(x).to_be_bytes()).collect(),
        ),
        VarValues::I16(v) => (NC_SHORT, v.iter().flat_map(|x| x.to_be_bytes()).collect()),
        VarValues::I32(v) => (NC_INT, v.iter().flat_map(|x| x.to_be_bytes()).collect()),
        VarValues::F32(v) => (NC_FLOAT, v.iter().flat_map(|x| x.to_be_bytes()).collect()),
        VarValues::F64(v) => (NC_DOUBLE, v.iter().flat_map(|x| x.to_be_bytes()).collect()),
    }
}

fn put_attr_list(out: &mut Vec<u8>, attrs: &[NcAttr]) {
    if attrs.is_empty() {
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        return;
    }
    out.extend_from_slice(&NC_ATTRIBUTE.to_be_bytes());
    out.extend_from_slice(&(attrs.len() as u32).to_be_bytes());
    for attr in attrs {
        put_name(out, &attr.name);
        out.extend_from_slice(&attr.nc_type.to_be_bytes());
        out.extend_from_slice(&attr.nelems.to_be_bytes());
        put_padded(out, &attr.bytes);
    }
}

fn build_header(dims: &[(&str, u32)], vars: &[NcVar], begins: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"CDF\x01");
    out.extend_from_slice(&0u32.to_be_bytes());

    out.extend_from_slice(&NC_DIMENSION.to_be_bytes());
    out.extend_from_slice(&(dims.len() as u32).to_be_bytes());
    for (name, len) in dims {
        put_name(&mut out, name);
        out.extend_from_slice(&len.to_be_bytes());
    }

    // No global attributes.
    put_attr_list(&mut out, &[]);

    out.extend_from_slice(&NC_VARIABLE.to_be_bytes());
    out.extend_from_slice(&(vars.len() as u32).to_be_bytes());
    for (var, begin) in vars.iter().zip(begins) {
        put_name(&mut out, &var.name);
        out.extend_from_slice(&(var.dimids.len() as u32).to_be_bytes());
        for dimid in &var.dimids {
            out.extend_from_slice(&dimid.to_be_bytes());
        }
        put_attr_list(&mut out, &var.attrs);
        out.extend_from_slice(&var.nc_type.to_be_bytes());
        out.extend_from_slice(&var.vsize().to_be_bytes());
        out.extend_from_slice(&begin.to_be_bytes());
    }

    out
}

/// Encode the loaded arrays as classic NetCDF bytes.
///
/// Emits `y` and `x` coordinate variables holding cell-center
/// coordinates, then one variable per band with its units and
/// fill-value attributes.
pub fn write_netcdf(
    properties: &CoverageProperties,
    meta: &OutputMeta,
    data: &ArrayData,
) -> CubeResult<Vec<u8>> {
    let width = meta.width.round() as usize;
    let height = meta.height.round() as usize;

    let y_coords: Vec<f64> = (0..height)
        .map(|j| meta.bbox.top + properties.resy * (j as f64 + 0.5))
        .collect();
    let x_coords: Vec<f64> = (0..width)
        .map(|i| meta.bbox.left + properties.resx.abs() * (i as f64 + 0.5))
        .collect();

    let mut vars: Vec<NcVar> = vec![
        NcVar {
            name: "y".to_string(),
            dimids: vec![0],
            attrs: vec![NcAttr::text("units", &properties.bbox_units)],
            nc_type: NC_DOUBLE,
            data: y_coords.iter().flat_map(|v| v.to_be_bytes()).collect(),
        },
        NcVar {
            name: "x".to_string(),
            dimids: vec![1],
            attrs: vec![NcAttr::text("units", &properties.bbox_units)],
            nc_type: NC_DOUBLE,
            data: x_coords.iter().flat_map(|v| v.to_be_bytes()).collect(),
        },
    ];

    for band in &meta.bands {
        let var = data.get(band).ok_or_else(|| {
            CubeError::InvalidQuery(format!("requested band '{}' not in result", band))
        })?;
        if var.values.len() != width * height {
            return Err(CubeError::InvalidQuery(format!(
                "band '{}' has {} values, expected {}",
                band,
                var.values.len(),
                width * height
            )));
        }
        let (nc_type, bytes) = encode_values(&var.values);

        let mut attrs = vec![NcAttr::text("units", &var.units)];
        for (name, value) in &var.attrs {
            if name != "units" {
                attrs.push(NcAttr::text(name, value));
            }
        }
        if let Some(nodata) = var.nodata {
            attrs.push(NcAttr::fill_value(nc_type, nodata));
        }

        vars.push(NcVar {
            name: band.clone(),
            dimids: vec![0, 1],
            attrs,
            nc_type,
            data: bytes,
        });
    }

    let dims = [("y", height as u32), ("x", width as u32)];

    // Header length is independent of the begin offsets (fixed-width
    // fields), so size it with zeros and then assign real offsets.
    let zero_begins = vec![0u32; vars.len()];
    let header_len = build_header(&dims, &vars, &zero_begins).len();

    let mut begins = Vec::with_capacity(vars.len());
    let mut offset = pad4(header_len) as u32;
    for var in &vars {
        begins.push(offset);
        offset += var.vsize();
    }

    let mut out = build_header(&dims, &vars, &begins);
    for _ in out.len()..pad4(header_len) {
        out.push(0);
    }
    for var in &vars {
        put_padded(&mut out, &var.data);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_catalog::VarArray;
    use cube_common::{BoundingBox, Crs};
    use std::collections::BTreeMap;

    fn properties() -> CoverageProperties {
        CoverageProperties {
            bbox: BoundingBox::new(0.0, 0.0, 4.0, 2.0),
            crs: Crs::from_epsg(2957),
            crs_uri: "http://www.opengis.net/def/crs/EPSG/9.8.15/2957".to_string(),
            crs_type: "ProjectedCRS",
            bbox_units: "m".to_string(),
            x_axis_label: "x",
            y_axis_label: "y",
            width: 4.0,
            height: 2.0,
            resx: 1.0,
            resy: -1.0,
            num_bands: 1,
        }
    }

    fn meta() -> OutputMeta {
        OutputMeta {
            bbox: BoundingBox::new(0.0, 0.0, 4.0, 2.0),
            width: 4.0,
            height: 2.0,
            bands: vec!["swir_1".to_string()],
        }
    }

    #[test]
    fn test_magic_and_zero_numrecs() {
        let mut data = ArrayData::new();
        data.insert(
            "swir_1",
            VarArray {
                values: VarValues::F32(vec![1.5; 8]),
                units: "1".to_string(),
                nodata: Some(0.0),
                attrs: BTreeMap::new(),
            },
        );
        let bytes = write_netcdf(&properties(), &meta(), &data).unwrap();
        assert_eq!(&bytes[0..4], b"CDF\x01");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_unsigned_band_is_widened() {
        let mut data = ArrayData::new();
        data.insert(
            "quality",
            VarArray {
                values: VarValues::U16(vec![65535; 8]),
                units: "1".to_string(),
                nodata: Some(0.0),
                attrs: BTreeMap::new(),
            },
        );
        let (nc_type, bytes) = encode_values(&data.get("quality").unwrap().values);
        assert_eq!(nc_type, NC_INT);
        assert_eq!(&bytes[0..4], &[0, 0, 0xFF, 0xFF]);

        let meta = OutputMeta {
            bands: vec!["quality".to_string()],
            ..meta()
        };
        assert!(write_netcdf(&properties(), &meta, &data).is_ok());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut data = ArrayData::new();
        data.insert(
            "swir_1",
            VarArray {
                values: VarValues::F32(vec![0.0; 3]),
                units: "1".to_string(),
                nodata: None,
                attrs: BTreeMap::new(),
            },
        );
        let err = write_netcdf(&properties(), &meta(), &data).unwrap_err();
        assert!(matches!(err, CubeError::InvalidQuery(_)));
    }
}
