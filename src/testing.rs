//! Testing utilities for record assessment runs.
//!
//! This module provides helpers for driving readers, writers and whole
//! pipelines in tests without the reference engine or real files:
//!
//! - **Scripted engine**: [`StubEngine`] echoes records back as results and
//!   can be told to reject specific records
//! - **Mock I/O**: in-memory input, a shared output buffer, a writer that
//!   fails on demand, and temporary files (optionally gzip-compressed)
//! - **Fixtures**: a small schema and matching delimited/line-object inputs
//!
//! # Quick Start
//!
//! ```
//! use recordqa::format::{Format, OutputFormat};
//! use recordqa::io::{RecordReader, ResultWriter};
//! use recordqa::pipeline::Pipeline;
//! use recordqa::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut engine = StubEngine::echo(&["raw"]);
//! let reader = RecordReader::new(Format::LineObject, memory_input("{}\n{}\n"), &mut engine)?;
//! let out = SharedBuffer::new();
//! let writer = ResultWriter::new(OutputFormat::LineObject, out.output_stream());
//!
//! let summary = Pipeline::new(reader, writer).run()?;
//! assert_eq!(summary.processed, 2);
//! assert_eq!(out.contents().lines().count(), 2);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod fixtures;
pub mod mock_io;

pub use engine::*;
pub use fixtures::*;
pub use mock_io::*;
