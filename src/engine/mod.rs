//! The assessment engine seam.
//!
//! Readers hand every decoded [`Record`] to an [`AssessmentEngine`] and pass
//! the returned [`MetricResults`] on to a writer. The core never looks inside
//! the metrics; it only relies on the header contract below.
//!
//! # Header contract
//! - [`header`](AssessmentEngine::header) is stable for the life of a run.
//! - Metric columns are labelled `<metric>:<label>`, where `<metric>` is one
//!   of [`metric_keys`](AssessmentEngine::metric_keys). Every other column
//!   carries an extracted field value, whatever characters its label holds.
//! - Flattening a result's cells in entry order yields exactly one cell per
//!   header column.

pub mod completeness;

pub use completeness::CompletenessEngine;

use crate::error::Result;
use crate::record::{MetricResults, Record};
use thiserror::Error;

/// Why an engine could not measure a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MeasureError {
    /// The record text is not a valid row/object.
    #[error("{0}")]
    Decode(String),
    /// The record decoded but the engine refuses it.
    #[error("{0}")]
    Rejected(String),
}

/// Computes metric results for one record at a time.
pub trait AssessmentEngine {
    /// Ordered output column labels for this run.
    fn header(&self) -> Vec<String>;

    /// Keys under which [`measure`](Self::measure) files metric results, in
    /// header order. Keys holding extracted values are not listed.
    fn metric_keys(&self) -> Vec<String>;

    /// Tells the engine the column layout of delimited input.
    ///
    /// Called once, before the first delimited record is measured.
    fn configure_columns(&mut self, columns: &[String]) -> Result<()>;

    /// Measures one record.
    fn measure(&self, record: &Record) -> std::result::Result<MetricResults, MeasureError>;
}
