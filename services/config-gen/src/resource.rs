//! Resource entry construction and config merging.

use anyhow::{bail, Result};
use serde_json::{json, Map, Value};
use tracing::info;

use cube_catalog::MetadataStore;

/// Build one resource entry per product, in catalog order, skipping
/// excluded products.
pub fn resources_for_store(
    store: &MetadataStore,
    exclude_products: &[String],
) -> Result<Map<String, Value>> {
    let mut resources = Map::new();
    let names = store.list_product_names().to_vec();
    for (idx, name) in names.iter().enumerate() {
        if exclude_products.iter().any(|excluded| excluded == name) {
            info!(
                product = %name,
                "[{}/{}] product is excluded, skipping it",
                idx + 1,
                names.len()
            );
            continue;
        }
        info!(product = %name, "[{}/{}] including product", idx + 1, names.len());
        resources.insert(name.clone(), resource_for_product(store, name)?);
    }
    Ok(resources)
}

/// One resource entry: collection descriptor with the WGS84 extent and
/// a coverage provider block.
pub fn resource_for_product(store: &MetadataStore, name: &str) -> Result<Value> {
    let product = store.product_by_name(name)?;
    let bbox = store.wgs84_bbox_of_product(name)?;
    let format_name = store.format_of_product(name)?;

    let links: Vec<Value> = product
        .links
        .iter()
        .map(|link| {
            json!({
                "type": link.type_,
                "rel": link.rel,
                "title": link.title,
                "href": link.href,
                "hreflang": link.hreflang
            })
        })
        .collect();

    Ok(json!({
        "type": "collection",
        "title": product.name,
        "description": product.description,
        "keywords": product.keywords,
        "links": links,
        "extents": {
            "spatial": {
                "bbox": [bbox.left, bbox.bottom, bbox.right, bbox.top],
                "crs": "http://www.opengis.net/def/crs/OGC/1.3/CRS84"
            }
        },
        "providers": [{
            "type": "coverage",
            "name": "coverage-provider",
            "data": product.name,
            "format": {
                "name": format_name,
                "mimetype": format!("application/{}", format_name.to_lowercase())
            }
        }]
    }))
}

/// Wrap resource entries in a top-level config document.
pub fn wrap_resources(resources: Map<String, Value>) -> Value {
    json!({ "resources": resources })
}

/// Merge generated resources into an existing config document by
/// resource key; generated entries win on collision.
pub fn merge_config(existing_yaml: &str, generated: Value) -> Result<Value> {
    let mut existing: Value = serde_yaml::from_str(existing_yaml)?;

    let generated_resources = match generated.get("resources").and_then(Value::as_object) {
        Some(map) => map.clone(),
        None => Map::new(),
    };

    match existing
        .as_object_mut()
        .and_then(|root| root.entry("resources").or_insert_with(|| json!({})).as_object_mut())
    {
        Some(resources) => {
            for (key, value) in generated_resources {
                resources.insert(key, value);
            }
        }
        None => bail!("existing config has a non-mapping 'resources' section"),
    }

    Ok(existing)
}
