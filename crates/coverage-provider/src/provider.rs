//! The per-product coverage query pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use cube_catalog::{Connector, LoadParams};
use cube_common::{BoundingBox, Crs, CubeError, CubeResult};
use reproject::Transformer;

use crate::config::CoverageConfig;
use crate::covjson::{self, CoverageJson};
use crate::domain;
use crate::geotiff;
use crate::netcdf;
use crate::properties::{CoverageProperties, MeasurementProperties};

/// Requested output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    CoverageJson,
    GeoTiff,
    NetCdf,
}

impl OutputFormat {
    /// `json` is the default; `geotiff` is matched case-insensitively;
    /// everything else falls through to NetCDF.
    pub fn parse(format: &str) -> OutputFormat {
        if format == "json" {
            OutputFormat::CoverageJson
        } else if format.eq_ignore_ascii_case("geotiff") {
            OutputFormat::GeoTiff
        } else {
            OutputFormat::NetCdf
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::CoverageJson
    }
}

/// One coverage data query.
#[derive(Debug, Clone, Default)]
pub struct CoverageRequest {
    /// Band subset; empty selects all bands.
    pub bands: Vec<String>,
    /// Named-axis subset ranges, axis label to (low, high).
    pub subsets: BTreeMap<String, (f64, f64)>,
    /// Bounding box, always interpreted as WGS84.
    pub bbox: Option<BoundingBox>,
    /// Reserved; accepted but not applied.
    pub datetime: Option<String>,
    pub format: OutputFormat,
}

/// Extent and band metadata echoed with every response body.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMeta {
    /// Requested extent in the product's native CRS.
    pub bbox: BoundingBox,
    pub width: f64,
    pub height: f64,
    pub bands: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum CoverageBody {
    CoverageJson(CoverageJson),
    GeoTiff(Vec<u8>),
    NetCdf(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct CoverageResponse {
    pub meta: OutputMeta,
    pub body: CoverageBody,
}

/// Coverage access for one configured product.
pub struct CoverageProvider {
    connector: Arc<Connector>,
    config: CoverageConfig,
    product: String,
    properties: CoverageProperties,
    measurements: Vec<MeasurementProperties>,
}

impl CoverageProvider {
    pub fn new(
        connector: Arc<Connector>,
        product: &str,
        config: CoverageConfig,
    ) -> CubeResult<CoverageProvider> {
        if !connector.list_product_names().iter().any(|n| n == product) {
            return Err(CubeError::NotFound(format!(
                "configured product '{}' is not contained in the data cube",
                product
            )));
        }

        info!(product, "initializing coverage provider");
        let properties = CoverageProperties::derive(&connector, product)?;
        let measurements = MeasurementProperties::derive(&connector, product);

        Ok(CoverageProvider {
            connector,
            config,
            product: product.to_string(),
            properties,
            measurements,
        })
    }

    pub fn properties(&self) -> &CoverageProperties {
        &self.properties
    }

    pub fn measurements(&self) -> &[MeasurementProperties] {
        &self.measurements
    }

    /// Extract coverage data for one request.
    pub fn query(&self, request: &CoverageRequest) -> CubeResult<CoverageResponse> {
        let extent = self.resolve_extent(request)?;
        self.validate_extent(extent)?;

        let params = self.build_load_params(extent, &request.bands);
        debug!(?params, "load parameters");

        let mut data = self.connector.load(&self.product, &params)?;
        if data.is_empty() {
            return Err(CubeError::InvalidQuery("empty dataset returned".to_string()));
        }
        data.strip_time_units_attr();

        let bands = if request.bands.is_empty() {
            data.variable_names()
        } else {
            request.bands.clone()
        };

        let meta = OutputMeta {
            bbox: extent,
            width: (extent.width() / self.properties.resx).abs(),
            height: (extent.height() / self.properties.resy).abs(),
            bands,
        };

        let body = match request.format {
            OutputFormat::CoverageJson => {
                info!("creating output in CoverageJSON");
                CoverageBody::CoverageJson(covjson::gen_covjson(&self.properties, &meta, &data)?)
            }
            OutputFormat::GeoTiff => {
                info!("returning data as GeoTIFF");
                CoverageBody::GeoTiff(geotiff::write_geotiff(
                    &self.properties,
                    &self.measurements,
                    &meta,
                    &data,
                )?)
            }
            OutputFormat::NetCdf => {
                info!("returning data as NetCDF");
                CoverageBody::NetCdf(netcdf::write_netcdf(&self.properties, &meta, &data)?)
            }
        };

        Ok(CoverageResponse { meta, body })
    }

    /// CIS JSON domainset metadata, derived without query execution.
    pub fn get_coverage_domainset(&self) -> Value {
        domain::domainset(&self.properties)
    }

    /// CIS JSON rangetype metadata, derived without query execution.
    pub fn get_coverage_rangetype(&self) -> Value {
        domain::rangetype(&self.measurements)
    }

    /// Resolve the requested extent in the product's native CRS,
    /// enforcing the bbox/subset exclusivity and presence rules.
    fn resolve_extent(&self, request: &CoverageRequest) -> CubeResult<BoundingBox> {
        let x_subset = request.subsets.get(self.properties.x_axis_label);
        let y_subset = request.subsets.get(self.properties.y_axis_label);
        let has_subsets = x_subset.is_some() && y_subset.is_some();

        if has_subsets && request.bbox.is_some() {
            let msg = "bbox and subsetting by coordinates are exclusive";
            warn!("{}", msg);
            return Err(CubeError::InvalidQuery(msg.to_string()));
        }
        if !has_subsets && request.bbox.is_none() {
            let msg = "spatial subsetting via bbox parameter or subset is mandatory";
            warn!("{}", msg);
            return Err(CubeError::InvalidQuery(msg.to_string()));
        }

        if let Some(bbox) = request.bbox {
            if self.properties.crs == Crs::WGS84 {
                info!("source bbox CRS and data CRS are the same");
                return Ok(bbox);
            }
            info!(crs = %self.properties.crs, "reprojecting bbox into native coordinates");
            let t = Transformer::new(Crs::WGS84, self.properties.crs)?;
            let (minx, miny) = t.transform(bbox.left, bbox.bottom)?;
            let (maxx, maxy) = t.transform(bbox.right, bbox.top)?;
            return Ok(BoundingBox::new(minx, miny, maxx, maxy));
        }

        // Subset bounds are already native-CRS, the axis labels are
        // native-CRS axis names.
        let &(minx, maxx) = x_subset.ok_or_else(|| {
            CubeError::InvalidQuery("spatial subsetting via bbox parameter or subset is mandatory".to_string())
        })?;
        let &(miny, maxy) = y_subset.ok_or_else(|| {
            CubeError::InvalidQuery("spatial subsetting via bbox parameter or subset is mandatory".to_string())
        })?;
        Ok(BoundingBox {
            left: minx,
            bottom: miny,
            right: maxx,
            top: maxy,
        })
    }

    fn validate_extent(&self, extent: BoundingBox) -> CubeResult<()> {
        if extent.left > extent.right || extent.bottom > extent.top {
            let msg = "spatial subsetting invalid min > max";
            warn!("{}", msg);
            return Err(CubeError::InvalidQuery(msg.to_string()));
        }

        if self.config.is_extent_exempt(&self.product) {
            return Ok(());
        }

        let max_allowed_delta = if self.properties.crs.is_projected() {
            self.config.max_extent_projected
        } else {
            self.config.max_extent_geographic
        };

        for delta in [extent.width(), extent.height()] {
            if delta > max_allowed_delta {
                let msg = format!(
                    "spatial subsetting too large {}. please request max {}",
                    delta, max_allowed_delta
                );
                warn!("{}", msg);
                return Err(CubeError::InvalidQuery(msg));
            }
        }
        Ok(())
    }

    fn build_load_params(&self, extent: BoundingBox, bands: &[String]) -> LoadParams {
        LoadParams {
            crs: self.properties.crs,
            x: (extent.left, extent.right),
            y: (extent.bottom, extent.top),
            align: (
                (self.properties.resy / 2.0).abs(),
                (self.properties.resx / 2.0).abs(),
            ),
            resolution: (self.properties.resy, self.properties.resx),
            output_crs: self.properties.crs,
            measurements: if bands.is_empty() {
                None
            } else {
                Some(bands.to_vec())
            },
        }
    }
}
