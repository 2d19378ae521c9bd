//! Built-in schema-driven engine: completeness, existence, cardinality and
//! extracted values.
//!
//! Field lookup is deliberately shallow: a CSV column by name, a top-level
//! JSON key, or a JSON Pointer when the path starts with `/`.

use super::{AssessmentEngine, MeasureError};
use crate::config::{Field, MeasurementConfig, Schema};
use crate::error::{QaError, Result};
use crate::record::{MetricResult, MetricResults, Record};
use serde_json::Value;
use std::collections::HashMap;

pub const EXTRACTED: &str = "extracted";
pub const COMPLETENESS: &str = "completeness";
pub const EXISTENCE: &str = "existence";
pub const CARDINALITY: &str = "cardinality";
const TOTAL: &str = "TOTAL";

/// What a lookup found for one field.
struct Observed {
    /// Number of non-empty values.
    count: usize,
    /// Value to emit when extracting.
    extracted: Value,
}

impl Observed {
    fn absent() -> Self {
        Self {
            count: 0,
            extracted: Value::Null,
        }
    }

    fn present(&self) -> bool {
        self.count > 0
    }
}

/// Reference [`AssessmentEngine`] over a borrowed [`Schema`].
pub struct CompletenessEngine<'s> {
    schema: &'s Schema,
    config: MeasurementConfig,
    columns: Option<HashMap<String, usize>>,
}

impl<'s> CompletenessEngine<'s> {
    pub fn new(schema: &'s Schema, config: MeasurementConfig) -> Self {
        Self {
            schema,
            config,
            columns: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    fn observe_row(&self, row: &[String], field: &Field) -> Observed {
        let Some(columns) = &self.columns else {
            return Observed::absent();
        };
        match columns.get(&field.path).and_then(|&i| row.get(i)) {
            Some(cell) if !cell.trim().is_empty() => Observed {
                count: 1,
                extracted: Value::String(cell.clone()),
            },
            _ => Observed::absent(),
        }
    }

    fn observe_object(doc: &Value, field: &Field) -> Observed {
        let found = if field.path.starts_with('/') {
            doc.pointer(&field.path)
        } else {
            doc.get(&field.path)
        };
        let Some(value) = found else {
            return Observed::absent();
        };
        let count = match value {
            Value::Null => 0,
            Value::String(s) => usize::from(!s.trim().is_empty()),
            Value::Array(items) => items
                .iter()
                .filter(|v| match v {
                    Value::Null => false,
                    Value::String(s) => !s.trim().is_empty(),
                    _ => true,
                })
                .count(),
            _ => 1,
        };
        let extracted = if count == 0 {
            Value::Null
        } else {
            value.clone()
        };
        Observed { count, extracted }
    }

    fn ratio(present: usize, total: usize) -> Value {
        if total == 0 {
            return Value::from(0.0);
        }
        Value::from(present as f64 / total as f64)
    }
}

impl AssessmentEngine for CompletenessEngine<'_> {
    fn header(&self) -> Vec<String> {
        let mut header = Vec::new();
        if self.config.extract {
            header.extend(self.schema.extracted().iter().map(|f| f.label.clone()));
        }
        if self.config.completeness {
            header.push(format!("{COMPLETENESS}:{TOTAL}"));
            for cat in self.schema.categories() {
                header.push(format!("{COMPLETENESS}:{cat}"));
            }
        }
        if self.config.existence {
            for f in self.schema.fields() {
                header.push(format!("{EXISTENCE}:{}", f.label));
            }
        }
        if self.config.cardinality {
            for f in self.schema.fields() {
                header.push(format!("{CARDINALITY}:{}", f.label));
            }
        }
        header
    }

    fn metric_keys(&self) -> Vec<String> {
        [
            (self.config.completeness, COMPLETENESS),
            (self.config.existence, EXISTENCE),
            (self.config.cardinality, CARDINALITY),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, key)| key.to_string())
        .collect()
    }

    fn configure_columns(&mut self, columns: &[String]) -> Result<()> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(QaError::configuration(format!(
                    "duplicate column '{name}' in input header"
                )));
            }
        }
        for f in self.schema.fields() {
            if !index.contains_key(&f.path) {
                tracing::warn!(field = %f.label, column = %f.path, "schema field has no input column");
            }
        }
        self.columns = Some(index);
        Ok(())
    }

    fn measure(&self, record: &Record) -> std::result::Result<MetricResults, MeasureError> {
        let observe: Box<dyn Fn(&Field) -> Observed + '_> = match record {
            Record::Fields(row) => {
                if self.columns.is_none() {
                    return Err(MeasureError::Rejected(
                        "delimited record measured before columns were configured".into(),
                    ));
                }
                Box::new(move |f: &Field| self.observe_row(row, f))
            }
            Record::Object(line) => {
                let doc: Value = serde_json::from_str(line)
                    .map_err(|e| MeasureError::Decode(format!("invalid JSON: {e}")))?;
                if !doc.is_object() {
                    return Err(MeasureError::Decode("not a JSON object".into()));
                }
                Box::new(move |f: &Field| Self::observe_object(&doc, f))
            }
        };

        let mut out = MetricResults::new();

        if self.config.extract && !self.schema.extracted().is_empty() {
            let mut extracted = MetricResult::new();
            for f in self.schema.extracted() {
                extracted.push(f.label.clone(), observe(f).extracted);
            }
            out.insert(EXTRACTED, vec![extracted]);
        }

        let observed: Vec<(&Field, Observed)> =
            self.schema.fields().iter().map(|f| (f, observe(f))).collect();

        if self.config.completeness {
            let present = observed.iter().filter(|(_, o)| o.present()).count();
            let mut completeness =
                MetricResult::new().with(TOTAL, Self::ratio(present, observed.len()));
            for cat in self.schema.categories() {
                let in_cat: Vec<_> = observed
                    .iter()
                    .filter(|(f, _)| f.categories.iter().any(|c| c == cat))
                    .collect();
                let present = in_cat.iter().filter(|(_, o)| o.present()).count();
                completeness.push(cat, Self::ratio(present, in_cat.len()));
            }
            out.insert(COMPLETENESS, vec![completeness]);
        }

        if self.config.existence {
            let mut existence = MetricResult::new();
            for (f, o) in &observed {
                existence.push(f.label.clone(), u8::from(o.present()));
            }
            out.insert(EXISTENCE, vec![existence]);
        }

        if self.config.cardinality {
            let mut cardinality = MetricResult::new();
            for (f, o) in &observed {
                cardinality.push(f.label.clone(), o.count);
            }
            out.insert(CARDINALITY, vec![cardinality]);
        }

        Ok(out)
    }
}
