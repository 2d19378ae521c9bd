//! Error types for record assessment runs.
//!
//! Every error is either **fatal** (the run stops after releasing its streams)
//! or **skippable** (the offending record is logged and dropped, the run goes
//! on). [`QaError::is_fatal`] is the single place that draws that line.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the record I/O core.
#[derive(Debug, Error)]
pub enum QaError {
    /// Missing or unparseable configuration, or an invalid option combination.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A stream could not be opened.
    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The underlying stream failed mid-run.
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be decoded as a row or an object.
    #[error("Record #{ordinal} could not be decoded: {message} (record: {raw})")]
    Decode {
        ordinal: u64,
        raw: String,
        message: String,
    },

    /// The assessment engine rejected a decoded record.
    #[error("Record #{ordinal} rejected by engine: {message} (record: {raw})")]
    Engine {
        ordinal: u64,
        raw: String,
        message: String,
    },

    /// Row and header disagree on the number of cells.
    #[error("Record #{ordinal} has {actual} cells, expected {expected}")]
    Cardinality {
        ordinal: u64,
        actual: usize,
        expected: usize,
    },

    /// A single result could not be serialized.
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience type alias for Results with [`QaError`].
pub type Result<T> = std::result::Result<T, QaError>;

impl QaError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a decode error for the record at `ordinal`.
    pub fn decode(ordinal: u64, raw: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            ordinal,
            raw: raw.into(),
            message: message.into(),
        }
    }

    /// Creates an engine rejection for the record at `ordinal`.
    pub fn engine(ordinal: u64, raw: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Engine {
            ordinal,
            raw: raw.into(),
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error must stop the run.
    ///
    /// Configuration, open and stream I/O failures are fatal. Everything
    /// scoped to a single record is skippable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Open { .. } | Self::Io { .. }
        )
    }

    /// The 1-based ordinal of the record this error is about, if any.
    pub fn ordinal(&self) -> Option<u64> {
        match self {
            Self::Decode { ordinal, .. }
            | Self::Engine { ordinal, .. }
            | Self::Cardinality { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }
}

/// Maps a `csv` crate error onto the fatal/skippable split.
///
/// Stream failures surface as [`QaError::Io`]; everything else is a bad row.
pub(crate) fn from_csv_error(err: csv::Error, ordinal: u64, context: &str) -> QaError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => QaError::io(context, source),
        _ => QaError::decode(ordinal, "<undecodable row>", message),
    }
}
