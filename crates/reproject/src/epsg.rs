//! EPSG code to proj-string resolution.
//!
//! proj4rs initializes projections from proj strings, not EPSG codes, so
//! this module carries definitions for the codes the catalog is known to
//! serve plus the full WGS84 UTM grid.

/// Resolve an EPSG code to a proj initialization string.
///
/// Returns `None` for codes this layer has no definition for.
pub fn proj_string(epsg: u32) -> Option<String> {
    let fixed = match epsg {
        // Geographic systems
        4326 => "+proj=longlat +datum=WGS84 +no_defs",
        4269 => "+proj=longlat +datum=NAD83 +no_defs",
        4258 => "+proj=longlat +ellps=GRS80 +no_defs",
        // Web Mercator
        3857 => {
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 \
             +units=m +nadgrids=@null +no_defs"
        }
        // NAD83(CSRS) UTM zones used by the Canadian elevation products
        2957 => {
            "+proj=utm +zone=13 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
        }
        2961 => {
            "+proj=utm +zone=20 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
        }
        2962 => {
            "+proj=utm +zone=21 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
        }
        _ => "",
    };

    if !fixed.is_empty() {
        return Some(fixed.to_string());
    }

    // WGS84 UTM zones: 326xx northern hemisphere, 327xx southern.
    if (32601..=32660).contains(&epsg) {
        let zone = epsg - 32600;
        return Some(format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            zone
        ));
    }
    if (32701..=32760).contains(&epsg) {
        let zone = epsg - 32700;
        return Some(format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            zone
        ));
    }

    None
}
