//! Input schema and typed values

use crate::error::{SinkError, SinkResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column type tags understood by the formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Long,
    Double,
    String,
    Timestamp,
    Json,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Long => "long",
            ColumnType::Double => "double",
            ColumnType::String => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered column descriptors
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

/// A typed input value, before formatting
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Decode one JSON row into typed values.
    ///
    /// Arrays are positional and must match the column count. Objects are
    /// looked up by column name; absent keys decode as null.
    pub fn decode_row(&self, row: &serde_json::Value) -> SinkResult<Vec<Value>> {
        match row {
            serde_json::Value::Array(items) => {
                if items.len() != self.columns.len() {
                    return Err(SinkError::InvalidRecord(format!(
                        "expected {} values, got {}",
                        self.columns.len(),
                        items.len()
                    )));
                }
                self.columns
                    .iter()
                    .zip(items)
                    .map(|(column, item)| decode_value(column, item))
                    .collect()
            }
            serde_json::Value::Object(fields) => self
                .columns
                .iter()
                .map(|column| match fields.get(&column.name) {
                    Some(item) => decode_value(column, item),
                    None => Ok(Value::Null),
                })
                .collect(),
            other => Err(SinkError::InvalidRecord(format!(
                "row must be a JSON array or object, got {}",
                other
            ))),
        }
    }
}

fn decode_value(column: &Column, item: &serde_json::Value) -> SinkResult<Value> {
    use serde_json::Value as Json;

    if item.is_null() {
        return Ok(Value::Null);
    }

    let mismatch = || {
        SinkError::InvalidRecord(format!(
            "column '{}' expects {}, got {}",
            column.name, column.column_type, item
        ))
    };

    let value = match (column.column_type, item) {
        (ColumnType::Json, other) => Value::Json(other.clone()),
        (ColumnType::Boolean, Json::Bool(b)) => Value::Boolean(*b),
        (ColumnType::Long, Json::Number(n)) => Value::Long(n.as_i64().ok_or_else(mismatch)?),
        (ColumnType::Double, Json::Number(n)) => Value::Double(n.as_f64().ok_or_else(mismatch)?),
        (ColumnType::String, Json::String(s)) => Value::String(s.clone()),
        (ColumnType::String, Json::Number(n)) => Value::String(n.to_string()),
        (ColumnType::String, Json::Bool(b)) => Value::String(b.to_string()),
        (ColumnType::Timestamp, Json::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
            .map_err(|e| {
                SinkError::InvalidRecord(format!(
                    "column '{}': invalid RFC 3339 timestamp '{}': {}",
                    column.name, s, e
                ))
            })?,
        (ColumnType::Timestamp, Json::Number(n)) => {
            let secs = n.as_f64().ok_or_else(mismatch)?;
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round() as u32;
            Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
                .single()
                .map(Value::Timestamp)
                .ok_or_else(mismatch)?
        }
        _ => return Err(mismatch()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Long),
            Column::new("name", ColumnType::String),
            Column::new("at", ColumnType::Timestamp),
            Column::new("meta", ColumnType::Json),
        ])
    }

    #[test]
    fn test_schema_deserializes_from_list() {
        let schema: Schema = serde_json::from_value(json!([
            {"name": "id", "type": "long"},
            {"name": "payload", "type": "json"}
        ]))
        .unwrap();
        assert_eq!(schema.names(), vec!["id", "payload"]);
        assert_eq!(schema.columns()[1].column_type, ColumnType::Json);
    }

    #[test]
    fn test_decode_positional_row() {
        let values = schema()
            .decode_row(&json!([1, "a", "2024-01-02T03:04:05Z", {"k": [1, 2]}]))
            .unwrap();

        assert_eq!(values[0], Value::Long(1));
        assert_eq!(values[1], Value::String("a".into()));
        assert_eq!(
            values[2],
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(values[3], Value::Json(json!({"k": [1, 2]})));
    }

    #[test]
    fn test_decode_object_row_with_missing_fields() {
        let values = schema()
            .decode_row(&json!({"name": "b", "at": 0}))
            .unwrap();

        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::String("b".into()));
        assert_eq!(
            values[2],
            Value::Timestamp(Utc.timestamp_opt(0, 0).unwrap())
        );
        assert_eq!(values[3], Value::Null);
    }

    #[test]
    fn test_decode_rejects_wrong_arity_and_types() {
        let schema = schema();
        assert!(matches!(
            schema.decode_row(&json!([1, "a"])),
            Err(SinkError::InvalidRecord(_))
        ));
        assert!(matches!(
            schema.decode_row(&json!(["x", "a", null, null])),
            Err(SinkError::InvalidRecord(_))
        ));
        assert!(matches!(
            schema.decode_row(&json!([1, "a", "yesterday", null])),
            Err(SinkError::InvalidRecord(_))
        ));
        assert!(matches!(
            schema.decode_row(&json!("not a row")),
            Err(SinkError::InvalidRecord(_))
        ));
    }
}
