//! Typed value -> wire representation

use crate::error::{SinkError, SinkResult};
use crate::record::{CellValue, Record};
use crate::schema::{ColumnType, Schema, Value};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

pub const DEFAULT_NULL_STRING: &str = "";
pub const DEFAULT_TIMEZONE: &str = "+00:00";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f %z";

/// Parse `UTC` or a `±HH:MM` / `±HHMM` offset.
pub fn parse_utc_offset(zone: &str) -> SinkResult<FixedOffset> {
    static OFFSET_RE: OnceLock<Regex> = OnceLock::new();

    let zone = zone.trim();
    if zone.eq_ignore_ascii_case("UTC") {
        return parse_utc_offset(DEFAULT_TIMEZONE);
    }

    let re = OFFSET_RE
        .get_or_init(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})$").expect("valid regex"));
    let invalid = || SinkError::config(format!("invalid time zone offset: {:?}", zone));

    let caps = re.captures(zone).ok_or_else(invalid)?;
    let hours: i32 = caps[2].parse().map_err(|_| invalid())?;
    let minutes: i32 = caps[3].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    let seconds = (hours * 3600 + minutes * 60) * if &caps[1] == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds).ok_or_else(invalid)
}

/// Reject strftime strings chrono cannot render, so formatting never fails later.
pub fn validate_timestamp_format(format: &str) -> SinkResult<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(SinkError::config(format!(
            "invalid timestamp format: {:?}",
            format
        )));
    }
    Ok(())
}

/// Converts typed values into cells; pure given its settings.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    null_string: String,
    offset: FixedOffset,
    timestamp_format: String,
}

impl Default for RecordFormatter {
    fn default() -> Self {
        Self {
            null_string: DEFAULT_NULL_STRING.to_string(),
            offset: Utc.fix(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl RecordFormatter {
    pub fn new(
        null_string: impl Into<String>,
        offset: FixedOffset,
        timestamp_format: impl Into<String>,
    ) -> SinkResult<Self> {
        let timestamp_format = timestamp_format.into();
        validate_timestamp_format(&timestamp_format)?;
        Ok(Self {
            null_string: null_string.into(),
            offset,
            timestamp_format,
        })
    }

    pub fn null_string(&self) -> &str {
        &self.null_string
    }

    /// Format one value declared as `column_type`
    pub fn format_value(&self, column_type: ColumnType, value: &Value) -> CellValue {
        match (column_type, value) {
            (_, Value::Null) => CellValue::Text(self.null_string.clone()),
            (ColumnType::Json, value) => CellValue::Text(json_text(value)),
            (_, Value::Timestamp(t)) => CellValue::Text(self.format_timestamp(t)),
            (_, Value::Json(j)) => CellValue::Text(j.to_string()),
            (_, Value::Boolean(b)) => CellValue::Boolean(*b),
            (_, Value::Long(i)) => CellValue::Integer(*i),
            (_, Value::Double(f)) => CellValue::Number(*f),
            (_, Value::String(s)) => CellValue::Text(s.clone()),
        }
    }

    /// Format a row positionally against `schema`
    pub fn format_record(&self, schema: &Schema, values: &[Value]) -> Record {
        schema
            .columns()
            .iter()
            .zip(values)
            .map(|(column, value)| self.format_value(column.column_type, value))
            .collect()
    }

    fn format_timestamp(&self, timestamp: &DateTime<Utc>) -> String {
        let local = timestamp.with_timezone(&self.offset);
        let mut out = String::new();
        if write!(out, "{}", local.format(&self.timestamp_format)).is_err() {
            // Only reachable with a format that slipped past validation.
            out = local.to_rfc3339();
        }
        out
    }
}

fn json_text(value: &Value) -> String {
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Long(i) => serde_json::Value::from(*i),
        Value::Double(f) => serde_json::Value::from(*f),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
        Value::Json(j) => return j.to_string(),
    };
    json.to_string()
}
