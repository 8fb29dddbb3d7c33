//! Normalized per-product coverage and measurement properties.

use tracing::warn;

use cube_catalog::Connector;
use cube_common::{BoundingBox, Crs, CubeError, CubeResult, Dtype};

/// Coverage properties derived once from the cached catalog metadata.
///
/// The catalog allows datasets of one product to disagree on CRS and
/// resolution. CRS disagreement is reconciled here by falling back to
/// WGS84 (the cached bbox is already unioned in WGS84 in that case).
/// Resolution disagreement cannot be reconciled without resampling and
/// is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageProperties {
    pub bbox: BoundingBox,
    pub crs: Crs,
    pub crs_uri: String,
    pub crs_type: &'static str,
    pub bbox_units: String,
    pub x_axis_label: &'static str,
    pub y_axis_label: &'static str,
    pub width: f64,
    pub height: f64,
    pub resx: f64,
    pub resy: f64,
    pub num_bands: usize,
}

impl CoverageProperties {
    pub fn derive(connector: &Connector, product: &str) -> CubeResult<CoverageProperties> {
        let crs_set = connector.get_crs_set(product)?;
        let resolution_set = connector.get_resolution_set(product)?;

        let crs = match crs_set {
            [] => {
                return Err(CubeError::InvalidQuery(format!(
                    "product {} has no datasets",
                    product
                )))
            }
            [crs] => *crs,
            _ => {
                warn!(
                    product,
                    "product has datasets with different coordinate reference systems, \
                     assuming WGS84 as native crs"
                );
                Crs::WGS84
            }
        };

        let (resx, resy) = match resolution_set {
            [resolution] => *resolution,
            _ => {
                return Err(CubeError::InvalidQuery(format!(
                    "product {} has datasets with different spatial resolutions, \
                     this is not supported yet",
                    product
                )))
            }
        };

        // Multi-CRS products already carry a WGS84-unioned bbox.
        let bbox = connector.bbox_of_product(product)?;

        let (crs_uri, crs_type, x_axis_label, y_axis_label) = if crs.is_projected() {
            (
                format!("http://www.opengis.net/def/crs/EPSG/9.8.15/{}", crs.epsg()),
                "ProjectedCRS",
                "x",
                "y",
            )
        } else {
            (
                "http://www.opengis.net/def/crs/OGC/1.3/CRS84".to_string(),
                "GeographicCRS",
                "Lon",
                "Lat",
            )
        };

        Ok(CoverageProperties {
            bbox,
            crs,
            crs_uri,
            crs_type,
            bbox_units: crs.unit_label().to_string(),
            x_axis_label,
            y_axis_label,
            width: (bbox.width() / resx).abs(),
            height: (bbox.height() / resy).abs(),
            resx,
            resy,
            num_bands: connector.band_count(product)?,
        })
    }

    /// Axis labels as the hosting framework expects them, x first.
    pub fn axes(&self) -> [&'static str; 2] {
        [self.x_axis_label, self.y_axis_label]
    }
}

/// One measurement of the product schema, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementProperties {
    /// 1-based position in the schema.
    pub id: usize,
    pub name: String,
    pub dtype: Dtype,
    pub nodata: f64,
    pub unit: String,
    pub aliases: Option<Vec<String>>,
}

impl MeasurementProperties {
    pub fn derive(connector: &Connector, product: &str) -> Vec<MeasurementProperties> {
        connector
            .list_measurements()
            .for_product(product)
            .into_iter()
            .enumerate()
            .map(|(row, m)| MeasurementProperties {
                id: row + 1,
                name: m.name.clone(),
                dtype: m.dtype,
                nodata: m.nodata,
                unit: m.units.clone(),
                aliases: m.aliases.clone(),
            })
            .collect()
    }
}
