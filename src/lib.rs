//! # recordqa
//!
//! A **streaming record assessment pipeline**. recordqa reads delimited rows
//! or line-delimited JSON objects, hands each record to an assessment engine,
//! and writes the per-record metric results as CSV, NDJSON, or CSV with
//! embedded JSON objects.
//!
//! ## Key Features
//!
//! - **Format dispatch** - reader and writer variants chosen from explicit
//!   flags, the schema, and the output file extension, with fixed defaults
//! - **Streaming** - one record in flight; inputs of any size
//! - **Failure isolation** - a malformed record is logged and skipped, only
//!   stream faults stop a run
//! - **Compression** - gzip, zstd, bzip2 and xz (all optional via feature flags)
//! - **Pluggable engine** - anything implementing [`AssessmentEngine`]; a
//!   schema-driven [`CompletenessEngine`] is built in
//!
//! ## Quick Start
//!
//! ```no_run
//! use recordqa::*;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config: SchemaConfig = load_config("schema.yaml", None)?;
//! let schema = Schema::from_config(config)?;
//!
//! let mut engine = CompletenessEngine::new(&schema, MeasurementConfig::default());
//! let input_format = resolve_input_format(None, schema.declared_format());
//! let reader = resolve_reader(
//!     Path::new("records.csv"),
//!     input_format,
//!     Compression::None,
//!     &mut engine,
//! )?;
//! let writer = resolve_writer(OutputFormat::Delimited, Some(Path::new("results.csv")));
//!
//! let summary = Pipeline::new(reader, writer).run()?;
//! println!("{} records written, {} skipped", summary.processed, summary.skipped);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Readers
//!
//! A [`RecordReader`] is a lazy, forward-only sequence of [`MetricResults`].
//! Delimited input starts with a header row that configures the engine's
//! columns; line-object input is one JSON object per line.
//!
//! ### Writers
//!
//! A [`ResultWriter`] takes the engine header once, then one result per
//! record. Delimited output sanitizes the header
//! ([`sanitize_header_label`]); line-object output has no header; hybrid
//! output collapses each metric into one JSON cell.
//!
//! ### Errors
//!
//! [`QaError::is_fatal`] splits failures into fatal (configuration, opening
//! the input, stream I/O) and skippable (anything about one record).
//!
//! ## Feature Flags
//!
//! - `compression-gzip` - gzip via `flate2`
//! - `compression-zstd` - zstd via `zstd`
//! - `compression-bzip2` - bzip2 via `bzip2`
//! - `compression-xz` - xz via `xz2`
//!
//! All are enabled by default.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod testing;

pub use config::{
    ConfigFormat, Field, FieldConfig, MeasurementConfig, Schema, SchemaConfig, load_config,
};
pub use engine::{AssessmentEngine, CompletenessEngine, MeasureError};
pub use error::{QaError, Result};
pub use format::{
    DEFAULT_INPUT_FORMAT, DEFAULT_OUTPUT_FORMAT, Format, OutputFormat, resolve_input_format,
    resolve_output_format,
};
pub use io::{
    Compression, InputStream, OutputStream, RecordReader, ResultWriter, open_input, open_output,
    resolve_reader, resolve_writer, sanitize_header_label,
};
pub use logging::init_logging;
pub use pipeline::{PROGRESS_INTERVAL, Pipeline, PipelineError, RunState, RunSummary};
pub use record::{MetricResult, MetricResults, Record};
