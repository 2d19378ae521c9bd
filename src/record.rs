//! Records flowing in and metric results flowing out.
//!
//! A [`Record`] lives only long enough to be measured. The [`MetricResults`]
//! the engine returns for it lives only long enough to be written.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// One unit of input data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A delimited row, positional against the reader's column header.
    Fields(Vec<String>),
    /// One self-describing line (a JSON object).
    Object(String),
}

impl Record {
    /// Renders the record for diagnostics.
    pub fn raw(&self) -> String {
        match self {
            Record::Fields(fields) => fields.join(","),
            Record::Object(line) => line.clone(),
        }
    }
}

/// One rendered output of a metric: ordered `(label, value)` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricResult {
    cells: Vec<(String, Value)>,
}

impl MetricResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cell, builder style.
    #[must_use]
    pub fn with(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(label, value);
        self
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.cells.push((label.into(), value.into()));
    }

    pub fn cells(&self) -> &[(String, Value)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Compact string rendering of each cell, in order.
    pub fn compact(&self) -> Vec<String> {
        self.cells.iter().map(|(_, v)| render_compact(v)).collect()
    }
}

impl Serialize for MetricResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (label, value) in &self.cells {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Per-record output of the engine, keyed by metric identifier.
///
/// Entry order is defined by the engine and is the order cells are written
/// in, so it must match the engine's header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricResults {
    entries: Vec<(String, Vec<MetricResult>)>,
}

impl MetricResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends results under `key`. A repeated key extends the existing entry.
    pub fn insert(&mut self, key: impl Into<String>, results: Vec<MetricResult>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.extend(results),
            None => self.entries.push((key, results)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, results: Vec<MetricResult>) -> Self {
        self.insert(key, results);
        self
    }

    pub fn entries(&self) -> &[(String, Vec<MetricResult>)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&[MetricResult]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every cell of every result, compact-rendered, in mapping order.
    pub fn flatten(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|(_, results)| results.iter().flat_map(MetricResult::compact))
            .collect()
    }

    /// Total number of cells across all results.
    pub fn cell_count(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|(_, results)| results.iter())
            .map(MetricResult::len)
            .sum()
    }
}

impl Serialize for MetricResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, results) in &self.entries {
            map.serialize_entry(key, results)?;
        }
        map.end()
    }
}

/// Renders a single cell value for tabular output.
///
/// Floats keep at least one decimal and at most six (`1.0`, `0.5`,
/// `0.833333`); booleans become `1`/`0`; null becomes `NA`.
pub fn render_compact(value: &Value) -> String {
    match value {
        Value::Null => "NA".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_f64() {
                n.as_f64().map(render_float).unwrap_or_else(|| n.to_string())
            } else {
                n.to_string()
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn render_float(f: f64) -> String {
    if f.fract() == 0.0 {
        return format!("{f:.1}");
    }
    let fixed = format!("{f:.6}");
    let trimmed = fixed.trim_end_matches('0');
    match trimmed {
        // Fraction below the sixth decimal.
        "-0." => "0.0".to_string(),
        t if t.ends_with('.') => format!("{t}0"),
        t => t.to_string(),
    }
}
