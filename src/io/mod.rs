//! Record I/O: streams, readers, writers and the factories that pick them.
//!
//! The factories only instantiate; which variant to use is decided by the
//! pure functions in [`crate::format`].

pub mod compression;
pub mod reader;
pub mod stream;
pub mod writer;

pub use compression::{Compression, CompressionCodec, FinishWrite};
pub use reader::RecordReader;
pub use stream::{InputStream, OutputStream, open_input, open_output, try_open_output};
pub use writer::{ResultWriter, sanitize_header_label};

use crate::engine::AssessmentEngine;
use crate::error::Result;
use crate::format::{Format, OutputFormat};
use std::path::Path;

/// Opens `input` and builds the reader for `format`.
///
/// For delimited input this consumes the header row and configures the
/// engine's columns before returning.
///
/// # Errors
/// Fails if the input cannot be opened or its header cannot be read.
pub fn resolve_reader<'e>(
    input: &Path,
    format: Format,
    compression: Compression,
    engine: &'e mut dyn AssessmentEngine,
) -> Result<RecordReader<'e>> {
    let stream = open_input(input, compression)?;
    let reader = RecordReader::new(format, stream, engine)?;
    tracing::debug!(input = %input.display(), %format, %compression, "reader ready");
    Ok(reader)
}

/// Opens the output (stdout when `output` is `None` or unopenable) and builds
/// the writer for `format`.
pub fn resolve_writer(format: OutputFormat, output: Option<&Path>) -> ResultWriter {
    let stream = open_output(output);
    tracing::debug!(output = stream.description(), %format, "writer ready");
    ResultWriter::new(format, stream)
}
