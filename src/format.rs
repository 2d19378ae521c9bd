//! Format selection.
//!
//! Everything in this module is pure: which reader and writer variant a run
//! uses is decided from strings and paths alone, before any stream is opened.
//! The factories that instantiate the chosen variants live in
//! [`crate::io::resolve_reader`] and [`crate::io::resolve_writer`].
//!
//! # Precedence
//! - **Input**: `--input-format` override, then the schema's declared format,
//!   then [`DEFAULT_INPUT_FORMAT`].
//! - **Output**: `--format`, then the output path extension (ignoring a
//!   trailing compression suffix), then [`DEFAULT_OUTPUT_FORMAT`].
//!
//! The first signal present decides. A signal that names no known format
//! resolves to the default of its side; it never falls through to the next
//! signal.

use crate::io::compression::Compression;
use std::fmt;
use std::path::Path;

/// Record format of the input, as declared by a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Comma-separated rows with a header line.
    Delimited,
    /// One JSON object per line.
    LineObject,
}

/// Encoding of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Comma-separated rows under a sanitized header.
    Delimited,
    /// One JSON object per line, no header.
    LineObject,
    /// Comma-separated rows whose metric cells hold JSON objects.
    Hybrid,
}

/// Reader variant used when no signal names a known format.
pub const DEFAULT_INPUT_FORMAT: Format = Format::Delimited;

/// Writer variant used when no signal names a known format.
pub const DEFAULT_OUTPUT_FORMAT: OutputFormat = OutputFormat::LineObject;

impl Format {
    /// Parses a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Delimited),
            "json" | "jsonl" | "ndjson" => Some(Self::LineObject),
            _ => None,
        }
    }
}

impl OutputFormat {
    /// Parses a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Delimited),
            "json" | "jsonl" | "ndjson" => Some(Self::LineObject),
            "csvjson" | "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delimited => "csv",
            Self::LineObject => "ndjson",
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delimited => "csv",
            Self::LineObject => "ndjson",
            Self::Hybrid => "csvjson",
        })
    }
}

/// Picks the reader variant.
pub fn resolve_input_format(explicit: Option<&str>, declared: Option<&str>) -> Format {
    let (signal, source) = match (explicit, declared) {
        (Some(s), _) => (s, "--input-format"),
        (None, Some(s)) => (s, "schema"),
        (None, None) => {
            tracing::debug!(format = %DEFAULT_INPUT_FORMAT, "no input format given, using default");
            return DEFAULT_INPUT_FORMAT;
        }
    };
    match Format::parse(signal) {
        Some(format) => {
            tracing::debug!(%format, source, "input format resolved");
            format
        }
        None => {
            tracing::warn!(
                value = signal,
                source,
                fallback = %DEFAULT_INPUT_FORMAT,
                "unknown input format, using default"
            );
            DEFAULT_INPUT_FORMAT
        }
    }
}

/// Picks the writer variant.
pub fn resolve_output_format(explicit: Option<&str>, output: Option<&Path>) -> OutputFormat {
    let extension = output.and_then(output_extension);
    let (signal, source) = match (explicit, extension.as_deref()) {
        (Some(s), _) => (s, "--format"),
        (None, Some(ext)) => (ext, "output extension"),
        (None, None) => {
            tracing::debug!(format = %DEFAULT_OUTPUT_FORMAT, "no output format given, using default");
            return DEFAULT_OUTPUT_FORMAT;
        }
    };
    match OutputFormat::parse(signal) {
        Some(format) => {
            tracing::debug!(%format, source, "output format resolved");
            format
        }
        None => {
            tracing::warn!(
                value = signal,
                source,
                fallback = %DEFAULT_OUTPUT_FORMAT,
                "unknown output format, using default"
            );
            DEFAULT_OUTPUT_FORMAT
        }
    }
}

/// The extension that names the data format, skipping one compression suffix.
///
/// `out.csv.gz` yields `csv`; `out.gz` yields nothing.
pub fn output_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if Compression::from_extension(&ext).is_some() {
        let stem = Path::new(path.file_stem()?);
        return stem
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(Format::parse("CSV"), Some(Format::Delimited));
        assert_eq!(Format::parse("ndjson"), Some(Format::LineObject));
        assert_eq!(Format::parse("xml"), None);
        assert_eq!(OutputFormat::parse("csvjson"), Some(OutputFormat::Hybrid));
        assert_eq!(OutputFormat::parse(" json "), Some(OutputFormat::LineObject));
    }

    #[test]
    fn test_input_precedence() {
        assert_eq!(resolve_input_format(Some("json"), Some("csv")), Format::LineObject);
        assert_eq!(resolve_input_format(None, Some("json")), Format::LineObject);
        assert_eq!(resolve_input_format(None, None), DEFAULT_INPUT_FORMAT);
        // Unknown never falls through to the next signal.
        assert_eq!(resolve_input_format(Some("xml"), Some("json")), DEFAULT_INPUT_FORMAT);
    }

    #[test]
    fn test_output_precedence() {
        let p = Path::new("out/results.csv");
        assert_eq!(resolve_output_format(Some("ndjson"), Some(p)), OutputFormat::LineObject);
        assert_eq!(resolve_output_format(None, Some(p)), OutputFormat::Delimited);
        assert_eq!(resolve_output_format(None, None), DEFAULT_OUTPUT_FORMAT);
        assert_eq!(
            resolve_output_format(None, Some(Path::new("results.txt"))),
            DEFAULT_OUTPUT_FORMAT
        );
        assert_eq!(
            resolve_output_format(Some("parquet"), Some(p)),
            DEFAULT_OUTPUT_FORMAT
        );
    }

    #[test]
    fn test_output_extension_skips_compression() {
        assert_eq!(output_extension(Path::new("a/b.csv.gz")).as_deref(), Some("csv"));
        assert_eq!(output_extension(Path::new("b.NDJSON")).as_deref(), Some("ndjson"));
        assert_eq!(output_extension(Path::new("b.gz")), None);
        assert_eq!(output_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let p = Path::new("x.csvjson.zst");
        let first = resolve_output_format(None, Some(p));
        for _ in 0..10 {
            assert_eq!(resolve_output_format(None, Some(p)), first);
        }
        assert_eq!(first, OutputFormat::Hybrid);
    }
}
