//! A scripted [`AssessmentEngine`] for tests.

use crate::engine::{AssessmentEngine, MeasureError};
use crate::error::Result;
use crate::record::{MetricResult, MetricResults, Record};

/// Key the stub files its single result under.
pub const ECHO: &str = "echo";

/// Echoes each record back as one result.
///
/// Delimited rows become one cell per field, labelled with the header
/// labels in order. Line objects become one cell holding the raw line.
#[derive(Debug, Clone, Default)]
pub struct StubEngine {
    header: Vec<String>,
    columns: Option<Vec<String>>,
    rejected: Vec<String>,
}

impl StubEngine {
    /// An engine whose header is `labels`.
    #[must_use]
    pub fn echo(labels: &[&str]) -> Self {
        Self {
            header: labels.iter().map(|l| (*l).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Rejects any record whose raw text equals `raw`.
    #[must_use]
    pub fn rejecting(mut self, raw: &str) -> Self {
        self.rejected.push(raw.to_string());
        self
    }

    /// Columns passed to `configure_columns`, if it was called.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    fn label(&self, i: usize) -> String {
        self.header
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("col{i}"))
    }
}

impl AssessmentEngine for StubEngine {
    fn header(&self) -> Vec<String> {
        self.header.clone()
    }

    fn metric_keys(&self) -> Vec<String> {
        vec![ECHO.to_string()]
    }

    fn configure_columns(&mut self, columns: &[String]) -> Result<()> {
        self.columns = Some(columns.to_vec());
        Ok(())
    }

    fn measure(&self, record: &Record) -> std::result::Result<MetricResults, MeasureError> {
        let raw = record.raw();
        if self.rejected.contains(&raw) {
            return Err(MeasureError::Rejected(format!("scripted rejection of '{raw}'")));
        }
        let mut result = MetricResult::new();
        match record {
            Record::Fields(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    result.push(self.label(i), field.as_str());
                }
            }
            Record::Object(line) => result.push(self.label(0), line.as_str()),
        }
        Ok(MetricResults::new().with(ECHO, vec![result]))
    }
}
