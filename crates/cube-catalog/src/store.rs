//! The per-product metadata store.
//!
//! Built once per process (or loaded from a persisted cache artifact),
//! then frozen. All lookups after the build are plain map reads. Catalog
//! changes are only picked up by deleting the cache artifact and
//! rebuilding; partial invalidation is deliberately unsupported.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cube_common::{BoundingBox, Crs, CubeError, CubeResult, Dataset, MeasurementTable, Product};
use reproject::bbox_to_wgs84;

use crate::client::CatalogClient;

/// Environment variable overriding the cache artifact location.
pub const CACHE_PATH_ENV: &str = "CUBE_METADATA_CACHE";

/// Default cache artifact location under the data directory.
pub const DEFAULT_CACHE_PATH: &str = "data/cube_metadata_cache.json";

static SHARED_STORE: OnceLock<Arc<MetadataStore>> = OnceLock::new();
static BUILD_LOCK: Mutex<()> = Mutex::new(());

/// Normalized, frozen metadata for every product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataStore {
    product_names: Vec<String>,
    products: BTreeMap<String, Product>,
    datasets: BTreeMap<String, Vec<Dataset>>,
    measurements: MeasurementTable,
    crs_sets: BTreeMap<String, Vec<Crs>>,
    resolution_sets: BTreeMap<String, Vec<(f64, f64)>>,
    bboxes: BTreeMap<String, BoundingBox>,
    wgs84_bboxes: BTreeMap<String, BoundingBox>,
}

impl MetadataStore {
    /// Resolve the cache artifact path: env override, else the default.
    pub fn default_cache_path() -> PathBuf {
        std::env::var(CACHE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_PATH))
    }

    /// The process-wide shared store handle.
    ///
    /// The first caller builds (or loads) the store; concurrent cold-start
    /// callers serialize on a build lock so the catalog is scanned at most
    /// once. After that the handle is returned without locking.
    pub fn shared(client: &dyn CatalogClient, cache_path: &Path) -> CubeResult<Arc<MetadataStore>> {
        if let Some(store) = SHARED_STORE.get() {
            debug!("metadata store already initialized");
            return Ok(Arc::clone(store));
        }

        let _guard = BUILD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = SHARED_STORE.get() {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(Self::build_or_load(client, cache_path)?);
        let _ = SHARED_STORE.set(Arc::clone(&store));
        Ok(store)
    }

    /// Load the store from the cache artifact if one exists, otherwise
    /// scan the catalog, build the store, and persist it.
    pub fn build_or_load(client: &dyn CatalogClient, cache_path: &Path) -> CubeResult<MetadataStore> {
        if cache_path.exists() {
            info!(path = %cache_path.display(), "loading metadata store from cache artifact");
            return Self::load_from_cache(cache_path);
        }

        info!("building metadata store from catalog");
        let store = Self::build(client)?;
        store.persist(cache_path)?;
        Ok(store)
    }

    /// Deserialize a previously persisted store.
    ///
    /// A present-but-unreadable or corrupt artifact is fatal: proceeding
    /// with a partially loaded store is worse than failing loudly.
    pub fn load_from_cache(cache_path: &Path) -> CubeResult<MetadataStore> {
        let file = std::fs::File::open(cache_path).map_err(|e| {
            CubeError::CacheCorruption(format!(
                "cannot read cache artifact '{}': {}",
                cache_path.display(),
                e
            ))
        })?;

        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
            CubeError::CacheCorruption(format!(
                "cannot deserialize cache artifact '{}': {}",
                cache_path.display(),
                e
            ))
        })
    }

    /// Persist this store as the cache artifact.
    pub fn persist(&self, cache_path: &Path) -> CubeResult<()> {
        if let Some(parent) = cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::File::create(cache_path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        info!(path = %cache_path.display(), "persisted metadata store cache artifact");
        Ok(())
    }

    /// One full catalog scan: O(total datasets across all products).
    /// Client failures propagate; no partial store is ever produced.
    fn build(client: &dyn CatalogClient) -> CubeResult<MetadataStore> {
        let product_names = client.list_product_names()?;

        let mut products = BTreeMap::new();
        let mut datasets = BTreeMap::new();
        for name in &product_names {
            products.insert(name.clone(), client.get_product(name)?);
            datasets.insert(name.clone(), client.find_datasets(name)?);
        }

        // Measurement rows carry their product key, so one catalog-wide
        // fetch covers every product.
        let measurements = client.list_active_measurements()?;

        let mut crs_sets = BTreeMap::new();
        let mut resolution_sets = BTreeMap::new();
        for name in &product_names {
            let product_datasets = &datasets[name];
            crs_sets.insert(name.clone(), collect_crs_set(product_datasets));

            let resolution_set = collect_resolution_set(product_datasets);
            if resolution_set.len() > 1 {
                warn!(
                    product = %name,
                    resolution_count = resolution_set.len(),
                    "product has datasets with varying spatial resolution"
                );
            }
            resolution_sets.insert(name.clone(), resolution_set);
        }

        let mut bboxes = BTreeMap::new();
        for name in &product_names {
            let crs_set = &crs_sets[name];
            bboxes.insert(name.clone(), union_product_bbox(name, &datasets[name], crs_set)?);
        }

        let mut wgs84_bboxes = BTreeMap::new();
        for name in &product_names {
            let crs_set = &crs_sets[name];
            let bbox = bboxes[name];
            let wgs84 = if crs_set.len() == 1 && crs_set[0] != Crs::WGS84 {
                bbox_to_wgs84(bbox, crs_set[0])?
            } else {
                // Multi-CRS unions are already in WGS84 from the step above.
                bbox
            };
            wgs84_bboxes.insert(name.clone(), wgs84);
        }

        Ok(MetadataStore {
            product_names,
            products,
            datasets,
            measurements,
            crs_sets,
            resolution_sets,
            bboxes,
            wgs84_bboxes,
        })
    }

    /// Product names in catalog enumeration order.
    pub fn list_product_names(&self) -> &[String] {
        &self.product_names
    }

    pub fn product_by_name(&self, product: &str) -> CubeResult<&Product> {
        self.check_product_parameter(product)?;
        store_entry(&self.products, product)
    }

    pub fn datasets_for_product(&self, product: &str) -> CubeResult<&[Dataset]> {
        self.check_product_parameter(product)?;
        Ok(store_entry(&self.datasets, product)?.as_slice())
    }

    pub fn measurements(&self) -> &MeasurementTable {
        &self.measurements
    }

    pub fn crs_set(&self, product: &str) -> CubeResult<&[Crs]> {
        self.check_product_parameter(product)?;
        Ok(store_entry(&self.crs_sets, product)?.as_slice())
    }

    pub fn resolution_set(&self, product: &str) -> CubeResult<&[(f64, f64)]> {
        self.check_product_parameter(product)?;
        Ok(store_entry(&self.resolution_sets, product)?.as_slice())
    }

    /// The unioned bbox in the product's native CRS, or in WGS84 when the
    /// product's datasets disagree on CRS.
    pub fn bbox_of_product(&self, product: &str) -> CubeResult<BoundingBox> {
        self.check_product_parameter(product)?;
        Ok(*store_entry(&self.bboxes, product)?)
    }

    /// The unioned bbox normalized to WGS84.
    pub fn wgs84_bbox_of_product(&self, product: &str) -> CubeResult<BoundingBox> {
        self.check_product_parameter(product)?;
        Ok(*store_entry(&self.wgs84_bboxes, product)?)
    }

    /// Best-effort format family of a product: the declared product
    /// format, else the sole dataset format when all datasets agree,
    /// else GeoTIFF.
    pub fn format_of_product(&self, product: &str) -> CubeResult<String> {
        let record = self.product_by_name(product)?;
        if let Some(format) = &record.format {
            return Ok(format.clone());
        }
        let mut formats: Vec<&str> = self
            .datasets_for_product(product)?
            .iter()
            .filter_map(|d| d.format.as_deref())
            .collect();
        formats.sort_unstable();
        formats.dedup();
        match formats.as_slice() {
            [only] => Ok((*only).to_string()),
            _ => Ok("GeoTIFF".to_string()),
        }
    }

    pub fn band_count(&self, product: &str) -> CubeResult<usize> {
        Ok(self.product_by_name(product)?.band_count())
    }

    pub fn contains_product(&self, product: &str) -> bool {
        self.product_names.iter().any(|name| name == product)
    }

    fn check_product_parameter(&self, product: &str) -> CubeResult<()> {
        if product.is_empty() {
            return Err(CubeError::InvalidArgument(
                "product MUST not be an empty string".to_string(),
            ));
        }
        if !self.contains_product(product) {
            return Err(CubeError::NotFound("product MUST be in datacube".to_string()));
        }
        Ok(())
    }
}

/// Look up one per-product map entry. `check_product_parameter` runs
/// first, so a miss here means the maps disagree with `product_names`,
/// which only a tampered or truncated cache artifact can produce.
fn store_entry<'a, T>(map: &'a BTreeMap<String, T>, product: &str) -> CubeResult<&'a T> {
    map.get(product).ok_or_else(|| {
        CubeError::CacheCorruption(format!(
            "cache artifact has no entry for product '{}'; delete the artifact and rebuild",
            product
        ))
    })
}

/// Distinct dataset CRSs, in first-appearance order.
fn collect_crs_set(datasets: &[Dataset]) -> Vec<Crs> {
    let mut set = Vec::new();
    for dataset in datasets {
        if !set.contains(&dataset.crs) {
            set.push(dataset.crs);
        }
    }
    set
}

/// Distinct (resx, resy) pairs, sign-preserving, in first-appearance
/// order. Deduplication compares bit patterns so -0.0 and 0.0 stay apart.
fn collect_resolution_set(datasets: &[Dataset]) -> Vec<(f64, f64)> {
    let mut set: Vec<(f64, f64)> = Vec::new();
    for dataset in datasets {
        let res = dataset.resolution();
        let seen = set
            .iter()
            .any(|r| r.0.to_bits() == res.0.to_bits() && r.1.to_bits() == res.1.to_bits());
        if !seen {
            set.push(res);
        }
    }
    set
}

/// Union every dataset bbox of one product.
///
/// When the datasets agree on a single CRS the union stays native.
/// Otherwise every contributing bbox is reprojected to WGS84 first; that
/// disagreement is recoverable here (a warning), and only becomes a hard
/// error when a coverage query later needs one unambiguous native CRS.
fn union_product_bbox(
    product: &str,
    datasets: &[Dataset],
    crs_set: &[Crs],
) -> CubeResult<BoundingBox> {
    if crs_set.len() > 1 {
        warn!(
            product,
            crs_count = crs_set.len(),
            "product has datasets with varying crs; reprojecting all bboxes to WGS84"
        );
        for crs in crs_set {
            debug!(product, %crs, "contributing crs");
        }
    }

    let mut boxes = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        if crs_set.len() == 1 {
            boxes.push(dataset.bbox);
        } else {
            boxes.push(bbox_to_wgs84(dataset.bbox, dataset.crs)?);
        }
    }

    BoundingBox::union_all(&boxes)
}
