//! The records query surface: listing with pagination, plus item lookup.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cube_catalog::Connector;
use cube_common::{CubeError, CubeResult};

use crate::encode::{encode_product_as_record, RecordFeature};

/// Whether a records query returns features or only the match count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Results,
    Hits,
}

impl Default for ResultType {
    fn default() -> Self {
        ResultType::Results
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub type_: String,
    /// Request time, ISO 8601.
    pub timestamp: String,
    #[serde(rename = "numberMatched")]
    pub number_matched: usize,
    #[serde(rename = "numberReturned")]
    pub number_returned: usize,
    pub features: Vec<RecordFeature>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordsResponse {
    Hits { number_matched: usize },
    Results(FeatureCollection),
}

/// Record listing over every product in the catalog.
pub struct RecordsProvider {
    connector: Arc<Connector>,
}

impl RecordsProvider {
    pub fn new(connector: Arc<Connector>) -> Self {
        Self { connector }
    }

    /// List records windowed to `[start_index, start_index + limit)`.
    ///
    /// The bbox/datetime/properties/sortby/free-text filters of the
    /// records query surface are reserved and not applied here.
    pub fn query(
        &self,
        start_index: i64,
        limit: i64,
        result_type: ResultType,
    ) -> CubeResult<RecordsResponse> {
        if limit < 1 {
            return Err(CubeError::InvalidQuery("limit < 1 makes no sense".to_string()));
        }
        if start_index < 0 {
            return Err(CubeError::InvalidQuery("startIndex < 0 makes no sense".to_string()));
        }

        let names = self.connector.list_product_names().to_vec();
        let number_matched = names.len();
        debug!(number_matched, "encoding product records");

        if result_type == ResultType::Hits {
            return Ok(RecordsResponse::Hits { number_matched });
        }

        let start = (start_index as usize).min(number_matched);
        let end = start.saturating_add(limit as usize).min(number_matched);
        let features = names[start..end]
            .iter()
            .map(|name| encode_product_as_record(&self.connector, name, true))
            .collect::<CubeResult<Vec<RecordFeature>>>()?;

        Ok(RecordsResponse::Results(FeatureCollection {
            type_: "FeatureCollection".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            number_matched,
            number_returned: features.len(),
            features,
        }))
    }

    /// Fetch a single product record by name.
    pub fn get(&self, identifier: &str) -> CubeResult<RecordFeature> {
        debug!(identifier, "fetching record");
        encode_product_as_record(&self.connector, identifier, true)
    }
}
