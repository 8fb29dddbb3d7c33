//! Thin facade over the metadata store and the data-cube client.

use std::sync::Arc;

use cube_common::{BoundingBox, Crs, CubeResult, Dataset, MeasurementTable, Product};

use crate::client::{ArrayData, CatalogClient, LoadParams};
use crate::store::MetadataStore;

/// Read-only lookups backed by the frozen [`MetadataStore`], plus the raw
/// array-load passthrough to the catalog client. This is the sole
/// data-access seam of the coverage and records providers.
#[derive(Clone)]
pub struct Connector {
    store: Arc<MetadataStore>,
    client: Arc<dyn CatalogClient>,
}

impl Connector {
    pub fn new(client: Arc<dyn CatalogClient>, store: Arc<MetadataStore>) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn list_product_names(&self) -> &[String] {
        self.store.list_product_names()
    }

    pub fn get_product_by_name(&self, product: &str) -> CubeResult<&Product> {
        self.store.product_by_name(product)
    }

    pub fn band_count(&self, product: &str) -> CubeResult<usize> {
        self.store.band_count(product)
    }

    pub fn get_datasets_for_product(&self, product: &str) -> CubeResult<&[Dataset]> {
        self.store.datasets_for_product(product)
    }

    pub fn list_measurements(&self) -> &MeasurementTable {
        self.store.measurements()
    }

    pub fn bbox_of_product(&self, product: &str) -> CubeResult<BoundingBox> {
        self.store.bbox_of_product(product)
    }

    pub fn wgs84_bbox_of_product(&self, product: &str) -> CubeResult<BoundingBox> {
        self.store.wgs84_bbox_of_product(product)
    }

    pub fn get_crs_set(&self, product: &str) -> CubeResult<&[Crs]> {
        self.store.crs_set(product)
    }

    pub fn get_resolution_set(&self, product: &str) -> CubeResult<&[(f64, f64)]> {
        self.store.resolution_set(product)
    }

    /// Best-effort format family of a product: the declared product
    /// format, else the sole dataset format when all datasets agree,
    /// else GeoTIFF.
    pub fn format_of_product(&self, product: &str) -> CubeResult<String> {
        self.store.format_of_product(product)
    }

    /// Forward an array load to the external client unchanged.
    pub fn load(&self, product: &str, params: &LoadParams) -> CubeResult<ArrayData> {
        self.client.load_array(product, params)
    }
}
