use serde::Serialize;
use serde_json::{Map, Value};

/// A single spreadsheet cell as returned by the Sheets API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<&Value> for CellValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::String(s) if s.trim().is_empty() => CellValue::Empty,
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            Value::Bool(b) => CellValue::Bool(*b),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// Worksheet contents: one header row followed by data rows of the same width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RecordSet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .filter(|row| !row.iter().all(CellValue::is_empty))
            .collect();

        Self { headers, rows }
    }

    /// Convert raw `values.get` rows (first row as headers) into a record set.
    ///
    /// Short rows are padded with empty cells, cells past the last header are
    /// dropped, and rows with no values at all are skipped.
    pub fn from_sheet_rows(values: &[Vec<Value>]) -> Self {
        let Some((header_row, data_rows)) = values.split_first() else {
            return Self::default();
        };

        let headers = header_row
            .iter()
            .map(|cell| match CellValue::from(cell) {
                CellValue::Empty => String::new(),
                CellValue::Text(s) => s.trim().to_string(),
                CellValue::Number(n) => format_number(n),
                CellValue::Bool(b) => b.to_string().to_uppercase(),
            })
            .collect();

        let rows = data_rows
            .iter()
            .map(|row| row.iter().map(CellValue::from).collect())
            .collect();

        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as header → value JSON objects.
    pub fn to_json_objects(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .headers
                    .iter()
                    .zip(row)
                    .filter(|(header, _)| !header.is_empty())
                    .map(|(header, cell)| {
                        let value = serde_json::to_value(cell).unwrap_or(Value::Null);
                        (header.clone(), value)
                    })
                    .collect();
                Value::Object(object)
            })
            .collect()
    }
}

/// Render a numeric cell the way the spreadsheet shows it, without a
/// trailing `.0` on whole numbers.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
