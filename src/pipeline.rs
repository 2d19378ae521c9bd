//! The read → measure → write loop.
//!
//! A [`Pipeline`] owns one reader and one writer for a single run. It writes
//! the engine header, then pulls one record at a time and pushes its results.
//! Record-scoped failures are logged and skipped; stream failures end the run
//! with [`PipelineError::Fatal`]. The writer is finished on every exit path.

use crate::error::QaError;
use crate::io::{RecordReader, ResultWriter};
use thiserror::Error;

/// Every this many written records, progress is logged at `info`.
pub const PROGRESS_INTERVAL: u64 = 50;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    HeaderWritten,
    Measuring,
    ResultWritten,
    Drained,
    Closed,
}

/// Counts reported by a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records measured and written.
    pub processed: u64,
    /// Records dropped because of a record-scoped error.
    pub skipped: u64,
}

/// A run that stopped before the input was exhausted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("run aborted after {processed} records: {source}")]
    Fatal {
        processed: u64,
        #[source]
        source: QaError,
    },
}

impl PipelineError {
    /// Records written before the fault.
    pub fn processed(&self) -> u64 {
        match self {
            Self::Fatal { processed, .. } => *processed,
        }
    }
}

/// Drives one reader into one writer.
pub struct Pipeline<'e> {
    reader: RecordReader<'e>,
    writer: Option<ResultWriter>,
    state: RunState,
    summary: RunSummary,
}

impl<'e> Pipeline<'e> {
    pub fn new(reader: RecordReader<'e>, writer: ResultWriter) -> Self {
        Self {
            reader,
            writer: Some(writer),
            state: RunState::Init,
            summary: RunSummary::default(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs to exhaustion of the input or to the first fatal error.
    ///
    /// # Errors
    /// [`PipelineError::Fatal`] on a stream fault, carrying the number of
    /// records written before it. A pipeline can only run once; a second call
    /// fails the same way.
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        if self.state != RunState::Init {
            return Err(self.abort(QaError::configuration("pipeline has already run")));
        }

        let engine = self.reader.engine();
        let header = engine.header();
        let metric_keys = engine.metric_keys();
        tracing::debug!(columns = header.len(), metrics = ?metric_keys, "writing header");
        if let Err(e) = self.write(|w| w.write_header(&header, &metric_keys)) {
            return Err(self.abort(e));
        }
        self.transition(RunState::HeaderWritten);

        while self.reader.has_next() {
            self.transition(RunState::Measuring);
            let Some(next) = self.reader.next_result() else {
                break;
            };
            let ordinal = self.reader.ordinal();
            let outcome = next.and_then(|results| self.write(|w| w.write_result(ordinal, &results)));
            match outcome {
                Ok(()) => {
                    self.summary.processed += 1;
                    self.transition(RunState::ResultWritten);
                    if self.summary.processed % PROGRESS_INTERVAL == 0 {
                        tracing::info!(processed = self.summary.processed, "progress");
                    }
                }
                Err(e) if e.is_fatal() => return Err(self.abort(e)),
                Err(e) => self.skip(&e),
            }
        }
        self.transition(RunState::Drained);

        if let Some(writer) = self.writer.take()
            && let Err(e) = writer.finish()
        {
            return Err(self.abort(e));
        }
        self.transition(RunState::Closed);
        tracing::info!(
            processed = self.summary.processed,
            skipped = self.summary.skipped,
            "run complete"
        );
        Ok(self.summary)
    }

    fn write(
        &mut self,
        op: impl FnOnce(&mut ResultWriter) -> crate::error::Result<()>,
    ) -> crate::error::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => op(writer),
            None => Err(QaError::configuration("writer already closed")),
        }
    }

    fn skip(&mut self, err: &QaError) {
        self.summary.skipped += 1;
        match err {
            QaError::Cardinality {
                ordinal,
                actual,
                expected,
            } => tracing::error!(
                ordinal,
                actual,
                expected,
                "{err}; check that the engine header matches its results"
            ),
            _ => tracing::warn!(ordinal = err.ordinal(), "skipping record: {err}"),
        }
    }

    /// Finishes the writer and closes the run after a fatal error.
    fn abort(&mut self, err: QaError) -> PipelineError {
        tracing::error!(processed = self.summary.processed, "fatal: {err}");
        if let Some(writer) = self.writer.take()
            && let Err(finish_err) = writer.finish()
        {
            tracing::error!("closing output after fatal error also failed: {finish_err}");
        }
        self.transition(RunState::Closed);
        PipelineError::Fatal {
            processed: self.summary.processed,
            source: err,
        }
    }

    fn transition(&mut self, next: RunState) {
        tracing::trace!(from = ?self.state, to = ?next, "state");
        self.state = next;
    }
}
