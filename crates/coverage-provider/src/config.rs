//! Configuration for the coverage provider.

use serde::{Deserialize, Serialize};

/// Limits applied to the spatial extent of coverage data queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Maximum allowed extent per axis for projected-CRS products, in
    /// native linear units (meters for the supported CRSs).
    pub max_extent_projected: f64,

    /// Maximum allowed extent per axis for geographic-CRS products,
    /// in degrees.
    pub max_extent_geographic: f64,

    /// Products exempt from the extent cap entirely.
    pub extent_exempt_products: Vec<String>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            max_extent_projected: 7500.0,
            max_extent_geographic: 0.125,
            extent_exempt_products: vec!["landsat8_c2_l2".to_string()],
        }
    }
}

impl CoverageConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COVERAGE_MAX_EXTENT_PROJECTED") {
            if let Ok(max) = val.parse() {
                config.max_extent_projected = max;
            }
        }

        if let Ok(val) = std::env::var("COVERAGE_MAX_EXTENT_GEOGRAPHIC") {
            if let Ok(max) = val.parse() {
                config.max_extent_geographic = max;
            }
        }

        if let Ok(val) = std::env::var("COVERAGE_EXTENT_EXEMPT_PRODUCTS") {
            config.extent_exempt_products = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        config
    }

    /// Check whether a product bypasses the extent cap.
    pub fn is_extent_exempt(&self, product: &str) -> bool {
        self.extent_exempt_products.iter().any(|p| p == product)
    }
}
