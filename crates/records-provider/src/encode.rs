//! Encoding of one product as a record feature.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use cube_catalog::Connector;
use cube_common::CubeResult;
use reproject::{bbox_to_ring, RingOrder};

/// A GeoJSON-Feature-shaped catalog record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordFeature {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub type_: String,
    /// One closed ring [UL, UR, LR, LL, UL] in (lon, lat) order.
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

/// Encode one product as a record feature.
///
/// The footprint polygon is the product's WGS84 bbox. The metadata
/// document is flattened: `{name: ...}` shaped values reduce to the
/// name, lists are taken literally, and the raw `links` block is
/// skipped in favor of the normalized `associations` list when
/// requested.
pub fn encode_product_as_record(
    connector: &Connector,
    product_name: &str,
    with_associations: bool,
) -> CubeResult<RecordFeature> {
    let product = connector.get_product_by_name(product_name)?;
    let bbox = connector.wgs84_bbox_of_product(product_name)?;
    let ring = bbox_to_ring(bbox, RingOrder::LonLat);

    let mut properties = Map::new();
    properties.insert("product".to_string(), json!(product.name));
    for (key, value) in &product.metadata {
        if key == "links" {
            continue;
        }
        let flattened = match value.get("name") {
            Some(name) => name.clone(),
            None => value.clone(),
        };
        properties.insert(key.clone(), flattened);
    }
    properties.insert(
        "format".to_string(),
        json!(connector.format_of_product(product_name)?),
    );

    if with_associations {
        let mut associations: Vec<Value> = product
            .links
            .iter()
            .map(|link| {
                json!({
                    "rel": link.rel,
                    "href": link.href,
                    "type": link.type_,
                    "hreflang": link.hreflang,
                    "title": link.title
                })
            })
            .collect();
        for (mimetype, f) in [
            ("application/geo+json", "json"),
            ("application/ld+json", "jsonld"),
            ("text/html", "html"),
        ] {
            associations.push(json!({
                "rel": "item",
                "href": format!("../../{}?f={}", product.name, f),
                "type": mimetype,
                "title": product.name
            }));
        }
        properties.insert("associations".to_string(), Value::Array(associations));
    }

    Ok(RecordFeature {
        id: product.name.clone(),
        type_: "Feature".to_string(),
        geometry: Geometry {
            type_: "Polygon".to_string(),
            coordinates: vec![ring],
        },
        properties,
    })
}
