//! Remote spreadsheet operations
//!
//! [`SheetsApi`] is the seam between the writer and the remote resource.
//! [`SheetsClient`] implements it against the Sheets v4 REST API; tests
//! substitute in-memory fakes.

pub mod client;

use crate::address::Region;
use crate::error::SinkResult;
use crate::record::Record;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::SheetsClient;

/// The four value operations a write session needs.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Read the values currently stored in `region`
    async fn get_values(&self, region: &Region) -> SinkResult<ValueRange>;

    /// Clear every value in `region` (formatting is kept)
    async fn clear_values(&self, region: &Region) -> SinkResult<()>;

    /// Overwrite `region` with `values`
    async fn update_values(&self, region: &Region, values: &ValueRange) -> SinkResult<()>;

    /// Append `values` to the table found at `region`
    async fn append_values(&self, region: &Region, values: &ValueRange) -> SinkResult<()>;
}

/// Whether the outer array of `values` holds rows or columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MajorDimension {
    #[default]
    Rows,
    Columns,
}

/// Wire shape of a block of cell values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    #[serde(default)]
    pub major_dimension: MajorDimension,

    /// Trailing empty rows are omitted by the remote, so this may be
    /// missing entirely for an empty region.
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    /// Row-major range from raw JSON rows
    pub fn with_values(values: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            range: None,
            major_dimension: MajorDimension::Rows,
            values,
        }
    }

    /// One row per record, in order
    pub fn from_records(records: &[Record]) -> Self {
        Self::with_values(records.iter().map(Record::to_json_row).collect())
    }

    /// A single flat record normalized into a one-row block
    pub fn from_record(record: &Record) -> Self {
        Self::from_records(std::slice::from_ref(record))
    }

    /// Number of row entries
    pub fn row_count(&self) -> u32 {
        self.values.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CellValue;
    use serde_json::json;

    #[test]
    fn test_single_record_is_normalized_to_one_row() {
        let record = Record::new(vec![
            CellValue::Text("a".into()),
            CellValue::Integer(7),
        ]);
        let range = ValueRange::from_record(&record);

        assert_eq!(
            serde_json::to_value(&range).unwrap(),
            json!({"majorDimension": "ROWS", "values": [["a", 7]]})
        );
    }

    #[test]
    fn test_missing_values_deserialize_as_empty() {
        let range: ValueRange =
            serde_json::from_value(json!({"range": "'S'!A1:C1000", "majorDimension": "ROWS"}))
                .unwrap();
        assert_eq!(range.row_count(), 0);
        assert_eq!(range.range.as_deref(), Some("'S'!A1:C1000"));
    }

    #[test]
    fn test_interior_blank_rows_are_counted() {
        let range: ValueRange = serde_json::from_value(json!({
            "values": [["h1", "h2"], [], ["x"]]
        }))
        .unwrap();
        assert_eq!(range.row_count(), 3);
    }
}
