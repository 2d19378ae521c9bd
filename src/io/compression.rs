//! Pluggable compression for input and output streams.
//!
//! Input decompression is always requested explicitly (`--gzip` or
//! `--compression`); it is never guessed from the input file name. Output
//! compression follows the output file suffix, so `results.csv.gz` is written
//! gzip-compressed.
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags, the following codecs are available:
//! - **Gzip** (`.gz`) - via `flate2` crate (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` crate (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` crate (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` crate (feature: `compression-xz`)
//!
//! Selecting a codec whose feature is disabled is a configuration error.

use crate::error::{QaError, Result};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

/// Compression applied to a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
    Bzip2,
    Xz,
}

impl Compression {
    /// Parses a codec name as given on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "gzip" | "gz" => Some(Self::Gzip),
            "zstd" | "zst" => Some(Self::Zstd),
            "bzip2" | "bz2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Maps a bare extension (no dot) to its codec.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "gz" | "gzip" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "bz2" | "bzip2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Codec implied by a path's last extension, if any.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::None)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
        })
    }
}

/// A writer with an explicit, fallible end of stream.
///
/// Encoders write their trailer in `finish_write` and then flush the writer
/// beneath them. Errors from either step are returned, never swallowed; an
/// encoder that is only dropped may leave a truncated stream.
pub trait FinishWrite: Write {
    fn finish_write(self: Box<Self>) -> std::io::Result<()>;
}

/// An uncompressed writer; finishing it is a flush.
pub struct Uncompressed(Box<dyn Write>);

impl Uncompressed {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self(writer)
    }
}

impl Write for Uncompressed {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl FinishWrite for Uncompressed {
    fn finish_write(mut self: Box<Self>) -> std::io::Result<()> {
        self.0.flush()
    }
}

/// Pluggable compression codec trait.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip", "zstd").
    fn name(&self) -> &str;

    /// Wrap a reader with decompression.
    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;

    /// Wrap a writer with compression.
    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>>;
}

/// Returns the codec for `compression`, or `None` for uncompressed streams.
///
/// # Errors
/// Returns [`QaError::Configuration`] when the codec was compiled out.
pub fn codec_for(compression: Compression) -> Result<Option<Box<dyn CompressionCodec>>> {
    let codec: Box<dyn CompressionCodec> = match compression {
        Compression::None => return Ok(None),
        #[cfg(feature = "compression-gzip")]
        Compression::Gzip => Box::new(GzipCodec),
        #[cfg(feature = "compression-zstd")]
        Compression::Zstd => Box::new(ZstdCodec),
        #[cfg(feature = "compression-bzip2")]
        Compression::Bzip2 => Box::new(Bzip2Codec),
        #[cfg(feature = "compression-xz")]
        Compression::Xz => Box::new(XzCodec),
        #[allow(unreachable_patterns)]
        other => {
            return Err(QaError::configuration(format!(
                "{other} support is not compiled into this build"
            )));
        }
    };
    Ok(Some(codec))
}

/// Wraps `reader` with the decoder for `compression`.
pub fn wrap_reader(reader: Box<dyn Read>, compression: Compression) -> Result<Box<dyn Read>> {
    match codec_for(compression)? {
        Some(codec) => codec
            .wrap_reader_dyn(reader)
            .map_err(|e| QaError::io(format!("wrap reader with {} codec", codec.name()), e)),
        None => Ok(reader),
    }
}

/// Wraps `writer` with the encoder for `compression`.
pub fn wrap_writer(
    writer: Box<dyn Write>,
    compression: Compression,
) -> Result<Box<dyn FinishWrite>> {
    match codec_for(compression)? {
        Some(codec) => codec
            .wrap_writer_dyn(writer)
            .map_err(|e| QaError::io(format!("wrap writer with {} codec", codec.name()), e)),
        None => Ok(Box::new(Uncompressed::new(writer))),
    }
}

// ============================================================================
// Built-in Codec Implementations
// ============================================================================

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        // Concatenated gzip members are legal and common for appended logs.
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-gzip")]
impl FinishWrite for flate2::write::GzEncoder<Box<dyn Write>> {
    fn finish_write(self: Box<Self>) -> std::io::Result<()> {
        (*self).finish()?.flush()
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        zstd::stream::write::Encoder::new(writer, 3).map(|e| Box::new(e) as Box<dyn FinishWrite>)
    }
}

#[cfg(feature = "compression-zstd")]
impl FinishWrite for zstd::stream::write::Encoder<'static, Box<dyn Write>> {
    fn finish_write(self: Box<Self>) -> std::io::Result<()> {
        (*self).finish()?.flush()
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use bzip2::read::MultiBzDecoder;
        Ok(Box::new(MultiBzDecoder::new(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;
        Ok(Box::new(BzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-bzip2")]
impl FinishWrite for bzip2::write::BzEncoder<Box<dyn Write>> {
    fn finish_write(self: Box<Self>) -> std::io::Result<()> {
        (*self).finish()?.flush()
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use xz2::read::XzDecoder;
        Ok(Box::new(XzDecoder::new_multi_decoder(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        use xz2::write::XzEncoder;
        Ok(Box::new(XzEncoder::new(writer, 6)))
    }
}

#[cfg(feature = "compression-xz")]
impl FinishWrite for xz2::write::XzEncoder<Box<dyn Write>> {
    fn finish_write(self: Box<Self>) -> std::io::Result<()> {
        (*self).finish()?.flush()
    }
}
