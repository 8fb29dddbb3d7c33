//! CIS JSON coverage metadata, derived from cached properties only.

use serde_json::{json, Value};

use crate::properties::{CoverageProperties, MeasurementProperties};

pub fn domainset(properties: &CoverageProperties) -> Value {
    json!({
        "type": "DomainSetType",
        "generalGrid": {
            "type": "GeneralGridCoverageType",
            "srsName": properties.crs_uri,
            "axisLabels": [properties.x_axis_label, properties.y_axis_label],
            "axis": [{
                "type": "RegularAxisType",
                "axisLabel": properties.x_axis_label,
                "lowerBound": properties.bbox.left,
                "upperBound": properties.bbox.right,
                "uomLabel": properties.bbox_units,
                "resolution": properties.resx
            }, {
                "type": "RegularAxisType",
                "axisLabel": properties.y_axis_label,
                "lowerBound": properties.bbox.bottom,
                "upperBound": properties.bbox.top,
                "uomLabel": properties.bbox_units,
                "resolution": properties.resy
            }],
            "gridLimits": {
                "type": "GridLimitsType",
                "srsName": "http://www.opengis.net/def/crs/OGC/0/Index2D",
                "axisLabels": ["i", "j"],
                "axis": [{
                    "type": "IndexAxisType",
                    "axisLabel": "i",
                    "lowerBound": 0,
                    "upperBound": properties.width
                }, {
                    "type": "IndexAxisType",
                    "axisLabel": "j",
                    "lowerBound": 0,
                    "upperBound": properties.height
                }]
            }
        }
    })
}

pub fn rangetype(measurements: &[MeasurementProperties]) -> Value {
    let fields: Vec<Value> = measurements
        .iter()
        .map(|m| {
            // The aliases tag is an explicit sentinel when absent,
            // never null or omitted.
            let aliases: Value = match &m.aliases {
                Some(aliases) => json!(aliases),
                None => json!("NaN"),
            };
            json!({
                "id": m.id,
                "type": "QuantityType",
                "name": m.name,
                "definition": m.dtype.name(),
                "nodata": m.nodata,
                "uom": {
                    "type": "UnitReference",
                    "code": m.unit
                },
                "_meta": {
                    "tags": {
                        "Aliases": aliases
                    }
                }
            })
        })
        .collect();

    json!({
        "type": "DataRecordType",
        "field": fields
    })
}
