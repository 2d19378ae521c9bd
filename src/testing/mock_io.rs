//! Mock I/O helpers for testing without actual files.
//!
//! This module provides utilities for testing readers and writers using
//! temporary files and in-memory buffers.

use crate::io::{InputStream, OutputStream};
use std::cell::{Cell, RefCell};
use std::io::{self, Cursor, Write};
use std::rc::Rc;
use tempfile::NamedTempFile;

fn temp_file_with_extension(extension: &str) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()
}

/// Create a temporary file holding `contents`.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written.
///
/// # Example
///
/// ```
/// use recordqa::testing::mock_text_file;
///
/// let temp = mock_text_file("id,title\n1,Foo\n", "csv").unwrap();
/// assert!(temp.path().to_string_lossy().ends_with(".csv"));
/// ```
pub fn mock_text_file(contents: &str, extension: &str) -> io::Result<NamedTempFile> {
    let temp = temp_file_with_extension(extension)?;
    std::fs::write(temp.path(), contents)?;
    Ok(temp)
}

/// Create a temporary gzip-compressed file holding `contents`.
///
/// `extension` is the data extension; `.gz` is appended.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written.
#[cfg(feature = "compression-gzip")]
pub fn mock_gzip_file(contents: &str, extension: &str) -> io::Result<NamedTempFile> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let temp = temp_file_with_extension(&format!("{extension}.gz"))?;
    let mut encoder = GzEncoder::new(std::fs::File::create(temp.path())?, Compression::default());
    encoder.write_all(contents.as_bytes())?;
    encoder.finish()?;
    Ok(temp)
}

/// An in-memory input stream over `text`.
#[must_use]
pub fn memory_input(text: &str) -> InputStream {
    InputStream::from_reader(
        Box::new(Cursor::new(text.as_bytes().to_vec())),
        "<memory>",
    )
}

/// An output buffer that stays readable after the writer owning it is gone.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
    seal_on_flush: bool,
    sealed: Rc<Cell<bool>>,
}

impl SharedBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that rejects every write after its first flush, like a pipe
    /// whose reader goes away once it has seen a flush.
    #[must_use]
    pub fn sealed_on_flush() -> Self {
        Self {
            seal_on_flush: true,
            ..Self::default()
        }
    }

    /// An output stream appending to this buffer.
    #[must_use]
    pub fn output_stream(&self) -> OutputStream {
        OutputStream::from_writer(Box::new(self.clone()), "<memory>")
    }

    /// Everything written so far, decoded lossily as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    /// Everything written so far, as raw bytes.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.sealed.get() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "buffer sealed by flush"));
        }
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.seal_on_flush {
            self.sealed.set(true);
        }
        Ok(())
    }
}

/// A writer that accepts a fixed number of `write` calls and then fails.
#[derive(Debug)]
pub struct FailingWriter {
    remaining: usize,
}

impl FailingWriter {
    #[must_use]
    pub fn after_writes(writes: usize) -> Self {
        Self { remaining: writes }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated write fault"));
        }
        self.remaining -= 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
