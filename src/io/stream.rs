//! Opening input and output streams.
//!
//! An input that cannot be opened stops the run. An output that cannot be
//! opened does not: the caller gets a stdout stream instead and a warning
//! that names the path and the cause.

use super::compression::{Compression, FinishWrite, Uncompressed, wrap_reader, wrap_writer};
use crate::error::{QaError, Result};
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Buffered, decompressed input.
pub struct InputStream {
    reader: Box<dyn BufRead>,
    description: String,
}

impl InputStream {
    /// Wraps an already-open reader; used for in-memory input.
    pub fn from_reader(reader: Box<dyn BufRead>, description: impl Into<String>) -> Self {
        Self {
            reader,
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn into_reader(self) -> Box<dyn BufRead> {
        self.reader
    }
}

/// Buffered, possibly compressing output.
///
/// The writer must be finished with [`FinishWrite::finish_write`] so that a
/// compressor trailer or a final flush that fails is reported.
pub struct OutputStream {
    writer: Box<dyn FinishWrite>,
    description: String,
}

impl OutputStream {
    /// Wraps an already-open writer; used for in-memory output.
    pub fn from_writer(writer: Box<dyn Write>, description: impl Into<String>) -> Self {
        Self {
            writer: Box::new(Uncompressed::new(writer)),
            description: description.into(),
        }
    }

    /// Wraps an already-open writer with the encoder for `compression`.
    ///
    /// # Errors
    /// [`QaError::Configuration`] if the codec is not compiled in.
    pub fn compressed(
        writer: Box<dyn Write>,
        compression: Compression,
        description: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            writer: wrap_writer(writer, compression)?,
            description: description.into(),
        })
    }

    /// Buffered standard output.
    pub fn stdout() -> Self {
        Self::from_writer(Box::new(BufWriter::new(std::io::stdout())), "<stdout>")
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn into_writer(self) -> Box<dyn FinishWrite> {
        self.writer
    }
}

/// Opens `path` for reading, decompressing with `compression`.
///
/// # Errors
/// [`QaError::Open`] if the file cannot be opened; [`QaError::Configuration`]
/// if the codec is not compiled in.
pub fn open_input(path: impl AsRef<Path>, compression: Compression) -> Result<InputStream> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| QaError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = wrap_reader(Box::new(file), compression)?;
    tracing::debug!(path = %path.display(), %compression, "opened input");
    Ok(InputStream {
        reader: Box::new(BufReader::new(reader)),
        description: path.display().to_string(),
    })
}

/// Opens `path` for writing, creating parent directories as needed.
///
/// The stream is compressed when the path ends in a codec suffix.
///
/// # Errors
/// [`QaError::Open`] if the directories or the file cannot be created.
pub fn try_open_output(path: impl AsRef<Path>) -> Result<OutputStream> {
    let path = path.as_ref();
    let open_err = |source| QaError::Open {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(open_err)?;
    }
    let file = File::create(path).map_err(open_err)?;
    let compression = Compression::from_path(path);
    let stream = OutputStream::compressed(
        Box::new(BufWriter::new(file)),
        compression,
        path.display().to_string(),
    )?;
    tracing::debug!(path = %path.display(), %compression, "opened output");
    Ok(stream)
}

/// Opens the output for a run: the file at `path`, or stdout.
///
/// Falls back to stdout, with a warning, when `path` cannot be opened.
pub fn open_output(path: Option<&Path>) -> OutputStream {
    let Some(path) = path else {
        return OutputStream::stdout();
    };
    match try_open_output(path) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "cannot open output file, writing to stdout instead"
            );
            OutputStream::stdout()
        }
    }
}
