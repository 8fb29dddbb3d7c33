//! Metadata store build, caching, and accessor behavior.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Map;
use uuid::Uuid;

use cube_catalog::{ArrayData, CatalogClient, Connector, LoadParams, MetadataStore, VarArray, VarValues};
use cube_common::{
    BoundingBox, Crs, CubeError, CubeResult, Dataset, Dtype, Measurement, MeasurementTable,
    Product,
};
use cube_common::model::MeasurementRow;
use reproject::bbox_to_wgs84;

const PAS: &str = "dsm__MB__The_Pas_2014";
const HAWKESBURY: &str = "dsm__NS__Port_Hawkesbury_2016";
const FLIN_FLON: &str = "dsm__MB__Flin_Flon_2015";

fn dsm_measurement() -> Measurement {
    Measurement {
        name: "dsm".to_string(),
        dtype: Dtype::Float32,
        nodata: -32767.0,
        units: "m".to_string(),
        aliases: None,
    }
}

fn product(name: &str) -> Product {
    Product {
        name: name.to_string(),
        description: format!("\"dsm\" data for {}", name),
        keywords: vec!["elevation".to_string()],
        links: Vec::new(),
        measurements: vec![dsm_measurement()],
        default_crs: None,
        default_resolution: None,
        format: Some("GeoTIFF".to_string()),
        metadata: Map::new(),
    }
}

fn dataset(crs: Crs, bbox: BoundingBox, resx: f64, resy: f64) -> Dataset {
    Dataset {
        id: Uuid::new_v4(),
        crs,
        transform: [resx, 0.0, bbox.left, 0.0, resy, bbox.top],
        bbox,
        format: Some("GeoTIFF".to_string()),
        metadata: Map::new(),
    }
}

/// Mock catalog that counts full scans so tests can assert the store is
/// only ever built once.
struct MockCatalog {
    scans: AtomicUsize,
}

impl MockCatalog {
    fn new() -> Self {
        Self {
            scans: AtomicUsize::new(0),
        }
    }

    fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    fn pas_bbox() -> BoundingBox {
        BoundingBox::new(730067.39, 5975292.28, 737568.96, 5989604.18)
    }

    fn hawkesbury_bboxes() -> (BoundingBox, BoundingBox) {
        // UTM 20N and UTM 21N granules of the same acquisition.
        (
            BoundingBox::new(650000.0, 5030000.0, 680000.0, 5065000.0),
            BoundingBox::new(300000.0, 5030000.0, 340000.0, 5063000.0),
        )
    }
}

impl CatalogClient for MockCatalog {
    fn list_product_names(&self) -> CubeResult<Vec<String>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(vec![HAWKESBURY.to_string(), PAS.to_string(), FLIN_FLON.to_string()])
    }

    fn get_product(&self, name: &str) -> CubeResult<Product> {
        Ok(product(name))
    }

    fn find_datasets(&self, name: &str) -> CubeResult<Vec<Dataset>> {
        match name {
            PAS => Ok(vec![dataset(Crs::from_epsg(2957), Self::pas_bbox(), 1.0, -1.0)]),
            HAWKESBURY => {
                let (utm20, utm21) = Self::hawkesbury_bboxes();
                Ok(vec![
                    dataset(Crs::from_epsg(2961), utm20, 1.0, -1.0),
                    dataset(Crs::from_epsg(2962), utm21, 1.0, -1.0),
                ])
            }
            // Same CRS but a resampled second granule.
            FLIN_FLON => Ok(vec![
                dataset(
                    Crs::from_epsg(2957),
                    BoundingBox::new(708000.0, 6055000.0, 712000.0, 6060000.0),
                    1.0,
                    -1.0,
                ),
                dataset(
                    Crs::from_epsg(2957),
                    BoundingBox::new(712000.0, 6055000.0, 716000.0, 6060000.0),
                    2.0,
                    -2.0,
                ),
            ]),
            other => Err(CubeError::NotFound(format!("datasets for '{}' not found", other))),
        }
    }

    fn list_active_measurements(&self) -> CubeResult<MeasurementTable> {
        Ok(MeasurementTable {
            rows: vec![
                MeasurementRow {
                    product: HAWKESBURY.to_string(),
                    measurement: dsm_measurement(),
                },
                MeasurementRow {
                    product: PAS.to_string(),
                    measurement: dsm_measurement(),
                },
                MeasurementRow {
                    product: FLIN_FLON.to_string(),
                    measurement: dsm_measurement(),
                },
            ],
        })
    }

    fn load_array(&self, _product: &str, _params: &LoadParams) -> CubeResult<ArrayData> {
        let mut data = ArrayData::new();
        data.insert(
            "dsm",
            VarArray {
                values: VarValues::F32(vec![0.0; 4]),
                units: "m".to_string(),
                nodata: Some(-32767.0),
                attrs: BTreeMap::new(),
            },
        );
        Ok(data)
    }
}

fn cache_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("cube_metadata_cache.json")
}

#[test]
fn build_preserves_catalog_enumeration_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::build_or_load(&MockCatalog::new(), &cache_path(&dir)).unwrap();

    assert_eq!(
        store.list_product_names(),
        &[HAWKESBURY.to_string(), PAS.to_string(), FLIN_FLON.to_string()]
    );
}

#[test]
fn warm_cache_skips_second_catalog_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let catalog = MockCatalog::new();

    let first = MetadataStore::build_or_load(&catalog, &path).unwrap();
    assert_eq!(catalog.scan_count(), 1);
    assert!(path.exists());

    let second = MetadataStore::build_or_load(&catalog, &path).unwrap();
    assert_eq!(catalog.scan_count(), 1, "catalog was scanned a second time");

    assert_eq!(first.list_product_names(), second.list_product_names());
    assert_eq!(
        first.bbox_of_product(PAS).unwrap(),
        second.bbox_of_product(PAS).unwrap()
    );
    assert_eq!(
        first.wgs84_bbox_of_product(HAWKESBURY).unwrap(),
        second.wgs84_bbox_of_product(HAWKESBURY).unwrap()
    );
}

#[test]
fn corrupt_cache_artifact_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    std::fs::write(&path, b"not json {{{").unwrap();

    let err = MetadataStore::build_or_load(&MockCatalog::new(), &path).unwrap_err();
    assert!(matches!(err, CubeError::CacheCorruption(_)), "got {:?}", err);
}

#[test]
fn accessor_validates_product_parameter() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::build_or_load(&MockCatalog::new(), &cache_path(&dir)).unwrap();

    let err = store.bbox_of_product("").unwrap_err();
    assert!(matches!(err, CubeError::InvalidArgument(_)));
    assert!(err.to_string().contains("product MUST not be an empty string"));

    let err = store.bbox_of_product("not_contained_product").unwrap_err();
    assert!(matches!(err, CubeError::NotFound(_)));
    assert!(err.to_string().contains("product MUST be in datacube"));
}

#[test]
fn single_crs_product_keeps_native_bbox() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::build_or_load(&MockCatalog::new(), &cache_path(&dir)).unwrap();

    assert_eq!(store.crs_set(PAS).unwrap(), &[Crs::from_epsg(2957)]);
    assert_eq!(store.bbox_of_product(PAS).unwrap(), MockCatalog::pas_bbox());

    // The WGS84-normalized bbox is the single-CRS union reprojected once.
    let wgs84 = store.wgs84_bbox_of_product(PAS).unwrap();
    assert!((wgs84.left - -101.5).abs() < 1e-4);
    assert!((wgs84.bottom - 53.875).abs() < 1e-4);
    assert!((wgs84.right - -101.375).abs() < 1e-4);
    assert!((wgs84.top - 54.0).abs() < 1e-4);
}

#[test]
fn multi_crs_product_unions_in_wgs84() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::build_or_load(&MockCatalog::new(), &cache_path(&dir)).unwrap();

    let crs_set = store.crs_set(HAWKESBURY).unwrap();
    assert_eq!(crs_set.len(), 2);
    assert!(crs_set.contains(&Crs::from_epsg(2961)));
    assert!(crs_set.contains(&Crs::from_epsg(2962)));

    // Expected: each dataset bbox independently reprojected, then unioned.
    let (utm20, utm21) = MockCatalog::hawkesbury_bboxes();
    let expected = BoundingBox::union_all(&[
        bbox_to_wgs84(utm20, Crs::from_epsg(2961)).unwrap(),
        bbox_to_wgs84(utm21, Crs::from_epsg(2962)).unwrap(),
    ])
    .unwrap();

    assert_eq!(store.bbox_of_product(HAWKESBURY).unwrap(), expected);
    // Already WGS84, so the normalized bbox is identical.
    assert_eq!(store.wgs84_bbox_of_product(HAWKESBURY).unwrap(), expected);
}

#[test]
fn resolution_set_keeps_sign() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::build_or_load(&MockCatalog::new(), &cache_path(&dir)).unwrap();

    assert_eq!(store.resolution_set(PAS).unwrap(), &[(1.0, -1.0)]);
    // Two datasets, one distinct resolution pair.
    assert_eq!(store.resolution_set(HAWKESBURY).unwrap(), &[(1.0, -1.0)]);
}

#[test]
fn multi_resolution_product_builds_and_keeps_every_pair() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::build_or_load(&MockCatalog::new(), &cache_path(&dir)).unwrap();

    // Disagreement is tolerated at build time; the full set is retained
    // in first-appearance order so coverage construction can reject it.
    assert_eq!(
        store.resolution_set(FLIN_FLON).unwrap(),
        &[(1.0, -1.0), (2.0, -2.0)]
    );
    // The rest of the product's metadata is unaffected.
    assert_eq!(store.crs_set(FLIN_FLON).unwrap(), &[Crs::from_epsg(2957)]);
    assert_eq!(
        store.bbox_of_product(FLIN_FLON).unwrap(),
        BoundingBox::new(708000.0, 6055000.0, 716000.0, 6060000.0)
    );
}

#[test]
fn tampered_cache_artifact_errors_on_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    MetadataStore::build_or_load(&MockCatalog::new(), &path).unwrap();

    // A product name with no backing map entries, as a truncated or
    // hand-edited artifact would produce.
    let mut doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    doc["product_names"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::Value::String("phantom_product".to_string()));
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    let store = MetadataStore::load_from_cache(&path).unwrap();
    let err = store.bbox_of_product("phantom_product").unwrap_err();
    assert!(matches!(err, CubeError::CacheCorruption(_)), "got {:?}", err);
    let err = store.datasets_for_product("phantom_product").unwrap_err();
    assert!(matches!(err, CubeError::CacheCorruption(_)), "got {:?}", err);
}

#[test]
fn band_count_comes_from_product_schema() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::build_or_load(&MockCatalog::new(), &cache_path(&dir)).unwrap();

    assert_eq!(store.band_count(PAS).unwrap(), 1);
}

#[test]
fn connector_passes_through_store_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MockCatalog::new());
    let store =
        Arc::new(MetadataStore::build_or_load(client.as_ref(), &cache_path(&dir)).unwrap());
    let connector = Connector::new(client, store);

    assert_eq!(connector.list_product_names().len(), 3);
    assert_eq!(connector.band_count(PAS).unwrap(), 1);
    assert_eq!(connector.list_measurements().for_product(PAS).len(), 1);

    let params = LoadParams {
        crs: Crs::from_epsg(2957),
        x: (730067.39, 730167.39),
        y: (5975292.28, 5975392.28),
        align: (0.5, 0.5),
        resolution: (-1.0, 1.0),
        output_crs: Crs::from_epsg(2957),
        measurements: None,
    };
    let data = connector.load(PAS, &params).unwrap();
    assert_eq!(data.variable_names(), vec!["dsm"]);
}

#[test]
fn cache_path_env_override() {
    std::env::set_var(cube_catalog::store::CACHE_PATH_ENV, "/tmp/custom_cache.json");
    assert_eq!(
        MetadataStore::default_cache_path(),
        std::path::PathBuf::from("/tmp/custom_cache.json")
    );
    std::env::remove_var(cube_catalog::store::CACHE_PATH_ENV);
}
