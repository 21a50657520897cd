//! Formatted records: what the buffer stores and the remote receives

/// One cell, already in its output representation.
///
/// Nulls never reach this type: the formatter turns them into the
/// configured null string.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

impl CellValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
            CellValue::Integer(i) => serde_json::Value::from(*i),
            // Non-finite floats have no JSON form and become null.
            CellValue::Number(f) => serde_json::Value::from(*f),
            CellValue::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// An ordered row of formatted cells, one per schema column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(Vec<CellValue>);

impl Record {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self(cells)
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_cells(self) -> Vec<CellValue> {
        self.0
    }

    pub fn to_json_row(&self) -> Vec<serde_json::Value> {
        self.0.iter().map(CellValue::to_json).collect()
    }
}

impl From<Vec<CellValue>> for Record {
    fn from(cells: Vec<CellValue>) -> Self {
        Self(cells)
    }
}

impl FromIterator<CellValue> for Record {
    fn from_iter<I: IntoIterator<Item = CellValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_row() {
        let record: Record = vec![
            CellValue::from("x"),
            CellValue::from(3_i64),
            CellValue::from(1.5),
            CellValue::from(false),
        ]
        .into();
        assert_eq!(record.to_json_row(), vec![json!("x"), json!(3), json!(1.5), json!(false)]);
    }

    #[test]
    fn test_non_finite_number_becomes_null() {
        assert_eq!(CellValue::Number(f64::NAN).to_json(), serde_json::Value::Null);
    }
}
