//! In-memory GeoTIFF encoding of loaded coverage arrays.
//!
//! Writes a little-endian baseline TIFF with one separate plane per
//! band (PlanarConfiguration 2) plus the GeoTIFF georeferencing tags:
//! ModelPixelScale, ModelTiepoint, and a GeoKeyDirectory carrying the
//! EPSG code. Nodata is carried in the GDAL_NODATA ASCII tag.

use cube_catalog::ArrayData;
use cube_common::{CubeError, CubeResult, Dtype};

use crate::properties::{CoverageProperties, MeasurementProperties};
use crate::provider::OutputMeta;

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_DOUBLE: u16 = 12;

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_PLANAR_CONFIG: u16 = 284;
const TAG_SAMPLE_FORMAT: u16 = 339;
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

/// TIFF sample format codes: unsigned / signed / IEEE float.
fn sample_format(dtype: Dtype) -> u16 {
    match dtype {
        Dtype::UInt8 | Dtype::UInt16 | Dtype::UInt32 => 1,
        Dtype::Int16 | Dtype::Int32 => 2,
        Dtype::Float32 | Dtype::Float64 => 3,
    }
}

/// One IFD entry plus any out-of-line value bytes it needs.
struct IfdEntry {
    tag: u16,
    type_: u16,
    count: u32,
    /// Inline value bytes (at most 4) or the full external payload.
    value: Vec<u8>,
}

impl IfdEntry {
    fn shorts(tag: u16, values: &[u16]) -> IfdEntry {
        IfdEntry {
            tag,
            type_: TYPE_SHORT,
            count: values.len() as u32,
            value: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn longs(tag: u16, values: &[u32]) -> IfdEntry {
        IfdEntry {
            tag,
            type_: TYPE_LONG,
            count: values.len() as u32,
            value: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn doubles(tag: u16, values: &[f64]) -> IfdEntry {
        IfdEntry {
            tag,
            type_: TYPE_DOUBLE,
            count: values.len() as u32,
            value: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn ascii(tag: u16, text: &str) -> IfdEntry {
        let mut value: Vec<u8> = text.as_bytes().to_vec();
        value.push(0);
        IfdEntry {
            tag,
            type_: TYPE_ASCII,
            count: value.len() as u32,
            value,
        }
    }
}

/// Encode the loaded arrays as GeoTIFF bytes.
///
/// File-level dtype and nodata come from the first declared measurement,
/// band count from the selected bands. Bands are stacked as separate
/// planes, one strip each, in selection order.
pub fn write_geotiff(
    properties: &CoverageProperties,
    measurements: &[MeasurementProperties],
    meta: &OutputMeta,
    data: &ArrayData,
) -> CubeResult<Vec<u8>> {
    let width = meta.width.round() as usize;
    let height = meta.height.round() as usize;
    let count = meta.bands.len();

    let first = measurements
        .first()
        .ok_or_else(|| CubeError::InvalidQuery("product has no measurements".to_string()))?;
    let dtype = first.dtype;
    let sample_bytes = dtype.size_bytes();
    let plane_len = width * height * sample_bytes;

    let mut planes: Vec<Vec<u8>> = Vec::with_capacity(count);
    for band in &meta.bands {
        let var = data.get(band).ok_or_else(|| {
            CubeError::InvalidQuery(format!("requested band '{}' not in result", band))
        })?;
        let bytes = var.values.to_le_bytes();
        if bytes.len() != plane_len {
            return Err(CubeError::InvalidQuery(format!(
                "band '{}' has {} bytes, expected {}",
                band,
                bytes.len(),
                plane_len
            )));
        }
        planes.push(bytes);
    }

    // Layout: 8-byte header, band planes, external tag values, IFD.
    let data_start: u32 = 8;
    let strip_offsets: Vec<u32> = (0..count)
        .map(|i| data_start + (i * plane_len) as u32)
        .collect();
    let strip_byte_counts: Vec<u32> = vec![plane_len as u32; count];

    let bits = vec![(sample_bytes * 8) as u16; count];
    let formats = vec![sample_format(dtype); count];

    // Raster (0,0,0) pinned to the native top-left corner; the pixel
    // scale carries the resolution magnitudes, so together they encode
    // the affine (resx, 0, minx, 0, resy, maxy).
    let pixel_scale = [properties.resx.abs(), properties.resy.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, meta.bbox.left, meta.bbox.top, 0.0];

    let (model_type, epsg_key) = if properties.crs.is_projected() {
        (1u16, 3072u16)
    } else {
        (2u16, 2048u16)
    };
    // Geo keys are SHORTs, so codes outside u16 cannot be encoded.
    let epsg_code = u16::try_from(properties.crs.epsg()).map_err(|_| {
        CubeError::Internal(format!(
            "EPSG:{} does not fit a GeoTIFF geo key",
            properties.crs.epsg()
        ))
    })?;
    let geo_keys: Vec<u16> = vec![
        1, 1, 0, 3,
        1024, 0, 1, model_type,
        1025, 0, 1, 1,
        epsg_key, 0, 1, epsg_code,
    ];

    let entries = vec![
        IfdEntry::longs(TAG_IMAGE_WIDTH, &[width as u32]),
        IfdEntry::longs(TAG_IMAGE_LENGTH, &[height as u32]),
        IfdEntry::shorts(TAG_BITS_PER_SAMPLE, &bits),
        IfdEntry::shorts(TAG_COMPRESSION, &[1]),
        IfdEntry::shorts(TAG_PHOTOMETRIC, &[1]),
        IfdEntry::longs(TAG_STRIP_OFFSETS, &strip_offsets),
        IfdEntry::shorts(TAG_SAMPLES_PER_PIXEL, &[count as u16]),
        IfdEntry::longs(TAG_ROWS_PER_STRIP, &[height as u32]),
        IfdEntry::longs(TAG_STRIP_BYTE_COUNTS, &strip_byte_counts),
        IfdEntry::shorts(TAG_PLANAR_CONFIG, &[2]),
        IfdEntry::shorts(TAG_SAMPLE_FORMAT, &formats),
        IfdEntry::doubles(TAG_MODEL_PIXEL_SCALE, &pixel_scale),
        IfdEntry::doubles(TAG_MODEL_TIEPOINT, &tiepoint),
        IfdEntry::shorts(TAG_GEO_KEY_DIRECTORY, &geo_keys),
        IfdEntry::ascii(TAG_GDAL_NODATA, &format!("{}", first.nodata)),
    ];

    // External values land between the planes and the IFD, each padded
    // to a word boundary.
    let mut externals: Vec<u8> = Vec::new();
    let external_start = data_start + (count * plane_len) as u32;
    let mut entry_records: Vec<(u16, u16, u32, [u8; 4])> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let mut value_field = [0u8; 4];
        if entry.value.len() <= 4 {
            value_field[..entry.value.len()].copy_from_slice(&entry.value);
        } else {
            let offset = external_start + externals.len() as u32;
            externals.extend_from_slice(&entry.value);
            if externals.len() % 2 != 0 {
                externals.push(0);
            }
            value_field.copy_from_slice(&offset.to_le_bytes());
        }
        entry_records.push((entry.tag, entry.type_, entry.count, value_field));
    }

    let ifd_offset = external_start + externals.len() as u32;

    let mut out: Vec<u8> =
        Vec::with_capacity(ifd_offset as usize + 6 + entry_records.len() * 12);
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&ifd_offset.to_le_bytes());
    for plane in &planes {
        out.extend_from_slice(plane);
    }
    out.extend_from_slice(&externals);

    out.extend_from_slice(&(entry_records.len() as u16).to_le_bytes());
    for (tag, type_, count, value_field) in &entry_records {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&type_.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(value_field);
    }
    out.extend_from_slice(&0u32.to_le_bytes());

    Ok(out)
}
