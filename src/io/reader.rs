//! Record readers.
//!
//! A [`RecordReader`] turns an input stream into a lazy, forward-only
//! sequence of [`MetricResults`], one per record, by handing each decoded
//! [`Record`] to the engine. It reads at most one record ahead.
//!
//! # Notes
//! - Delimited input must start with a header row. The header is passed to
//!   [`AssessmentEngine::configure_columns`] before anything is measured.
//! - Line-object input skips blank lines; they do not count as records.
//! - A final line without a newline that does not form a complete record
//!   (too few cells, or not valid JSON) is treated as end of input.
//! - Record ordinals are 1-based and count data records only.

use super::stream::InputStream;
use crate::engine::{AssessmentEngine, MeasureError};
use crate::error::{QaError, Result, from_csv_error};
use crate::format::Format;
use crate::record::{MetricResults, Record};
use std::io::{self, BufRead, Read};

const UTF8_BOM: char = '\u{feff}';

/// A record read from the stream but not yet measured.
type Pending = (u64, Result<Record>);

/// Passes bytes through while remembering the last one seen and whether the
/// end of the stream was reached.
struct TrackingRead<R> {
    inner: R,
    total: u64,
    last: Option<u8>,
    eof: bool,
}

impl<R: Read> TrackingRead<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            total: 0,
            last: None,
            eof: false,
        }
    }
}

impl<R: Read> Read for TrackingRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.total += n as u64;
            self.last = Some(buf[n - 1]);
        }
        Ok(n)
    }
}

/// Reads comma-separated rows under a header row.
pub struct DelimitedReader<'e> {
    csv: csv::Reader<TrackingRead<Box<dyn BufRead>>>,
    engine: &'e dyn AssessmentEngine,
    header: Vec<String>,
    source: String,
    pending: Option<Pending>,
    ordinal: u64,
    finished: bool,
}

impl<'e> DelimitedReader<'e> {
    /// Reads the header row and configures the engine with it.
    ///
    /// # Errors
    /// Fails when the input is empty, the header cannot be decoded, or the
    /// engine refuses the column layout.
    pub fn new(input: InputStream, engine: &'e mut dyn AssessmentEngine) -> Result<Self> {
        let source = input.description().to_string();
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(TrackingRead::new(input.into_reader()));

        let mut record = csv::StringRecord::new();
        let found = csv.read_record(&mut record).map_err(|e| {
            let context = format!("read header of {source}");
            match from_csv_error(e, 0, &context) {
                fatal @ QaError::Io { .. } => fatal,
                other => QaError::configuration(format!("{context}: {other}")),
            }
        })?;
        if !found {
            return Err(QaError::configuration(format!(
                "{source} is empty; delimited input needs a header row"
            )));
        }
        let header: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == 0 {
                    cell.trim_start_matches(UTF8_BOM).to_string()
                } else {
                    cell.to_string()
                }
            })
            .collect();
        tracing::debug!(columns = header.len(), %source, "read delimited header");

        engine.configure_columns(&header)?;
        let engine: &'e dyn AssessmentEngine = engine;

        Ok(Self {
            csv,
            engine,
            header,
            source,
            pending: None,
            ordinal: 0,
            finished: false,
        })
    }

    /// Column names from the input's header row.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// The last record ended the stream without a line terminator.
    fn at_unterminated_end(&self) -> bool {
        let tracker = self.csv.get_ref();
        tracker.eof
            && self.csv.position().byte() == tracker.total
            && !matches!(tracker.last, Some(b'\n' | b'\r'))
    }

    fn fetch(&mut self) {
        if self.pending.is_some() || self.finished {
            return;
        }
        let mut row = csv::ByteRecord::new();
        match self.csv.read_byte_record(&mut row) {
            Ok(false) => self.finished = true,
            Err(e) => {
                self.ordinal += 1;
                let err = from_csv_error(e, self.ordinal, &format!("read {}", self.source));
                self.finished = err.is_fatal();
                self.pending = Some((self.ordinal, Err(err)));
            }
            Ok(true) => {
                if row.len() < self.header.len() && self.at_unterminated_end() {
                    tracing::debug!(
                        cells = row.len(),
                        expected = self.header.len(),
                        "ignoring incomplete trailing row"
                    );
                    self.finished = true;
                    return;
                }
                self.ordinal += 1;
                self.pending = Some((self.ordinal, self.decode(&row)));
            }
        }
    }

    fn decode(&self, row: &csv::ByteRecord) -> Result<Record> {
        if row.len() != self.header.len() {
            return Err(QaError::Cardinality {
                ordinal: self.ordinal,
                actual: row.len(),
                expected: self.header.len(),
            });
        }
        let mut fields = Vec::with_capacity(row.len());
        for cell in row.iter() {
            match std::str::from_utf8(cell) {
                Ok(s) => fields.push(s.to_string()),
                Err(e) => {
                    let raw = row
                        .iter()
                        .map(String::from_utf8_lossy)
                        .collect::<Vec<_>>()
                        .join(",");
                    return Err(QaError::decode(self.ordinal, raw, format!("invalid UTF-8: {e}")));
                }
            }
        }
        Ok(Record::Fields(fields))
    }
}

/// Reads one JSON object per line.
pub struct LineObjectReader<'e> {
    input: Box<dyn BufRead>,
    engine: &'e dyn AssessmentEngine,
    source: String,
    buf: Vec<u8>,
    pending: Option<Pending>,
    ordinal: u64,
    finished: bool,
}

impl<'e> LineObjectReader<'e> {
    pub fn new(input: InputStream, engine: &'e dyn AssessmentEngine) -> Self {
        let source = input.description().to_string();
        Self {
            input: input.into_reader(),
            engine,
            source,
            buf: Vec::new(),
            pending: None,
            ordinal: 0,
            finished: false,
        }
    }

    fn fetch(&mut self) {
        while self.pending.is_none() && !self.finished {
            self.buf.clear();
            match self.input.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.finished = true,
                Ok(_) => self.take_line(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.ordinal += 1;
                    let err = QaError::io(format!("read {}", self.source), e);
                    self.pending = Some((self.ordinal, Err(err)));
                    self.finished = true;
                }
            }
        }
    }

    /// Turns the line in `buf` into a pending record, unless it is blank or
    /// an incomplete final line.
    fn take_line(&mut self) {
        let terminated = self.buf.ends_with(b"\n");
        let mut bytes = self.buf.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest;
        }
        if let Some(rest) = bytes.strip_suffix(b"\r") {
            bytes = rest;
        }
        let line = match std::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                self.ordinal += 1;
                let raw = String::from_utf8_lossy(bytes).into_owned();
                let err = QaError::decode(self.ordinal, raw, format!("invalid UTF-8: {e}"));
                self.pending = Some((self.ordinal, Err(err)));
                return;
            }
        };
        if line.trim().is_empty() {
            return;
        }
        if !terminated
            && serde_json::from_str::<serde::de::IgnoredAny>(line.trim_start_matches(UTF8_BOM))
                .is_err()
        {
            tracing::debug!(bytes = line.len(), "ignoring incomplete trailing line");
            self.finished = true;
            return;
        }
        self.ordinal += 1;
        let line = if self.ordinal == 1 {
            line.trim_start_matches(UTF8_BOM)
        } else {
            line
        };
        self.pending = Some((self.ordinal, Ok(Record::Object(line.to_string()))));
    }
}

/// A reader over one of the supported input formats.
pub enum RecordReader<'e> {
    Delimited(DelimitedReader<'e>),
    LineObject(LineObjectReader<'e>),
}

impl<'e> RecordReader<'e> {
    /// Builds the reader variant for `format` over `input`.
    ///
    /// # Errors
    /// See [`DelimitedReader::new`]; line-object readers cannot fail here.
    pub fn new(
        format: Format,
        input: InputStream,
        engine: &'e mut dyn AssessmentEngine,
    ) -> Result<Self> {
        Ok(match format {
            Format::Delimited => Self::Delimited(DelimitedReader::new(input, engine)?),
            Format::LineObject => Self::LineObject(LineObjectReader::new(input, engine)),
        })
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Delimited(_) => Format::Delimited,
            Self::LineObject(_) => Format::LineObject,
        }
    }

    /// The engine records are measured with.
    pub fn engine(&self) -> &'e dyn AssessmentEngine {
        match self {
            Self::Delimited(r) => r.engine,
            Self::LineObject(r) => r.engine,
        }
    }

    /// Whether another record (or an error about one) is available.
    pub fn has_next(&mut self) -> bool {
        match self {
            Self::Delimited(r) => {
                r.fetch();
                r.pending.is_some()
            }
            Self::LineObject(r) => {
                r.fetch();
                r.pending.is_some()
            }
        }
    }

    /// Measures and returns the next record, or `None` at end of input.
    ///
    /// Errors scoped to the record are skippable; the reader stays usable.
    /// After a fatal error the reader reports end of input.
    pub fn next_result(&mut self) -> Option<Result<MetricResults>> {
        let (engine, pending) = match self {
            Self::Delimited(r) => {
                r.fetch();
                (r.engine, r.pending.take())
            }
            Self::LineObject(r) => {
                r.fetch();
                (r.engine, r.pending.take())
            }
        };
        let (ordinal, record) = pending?;
        Some(record.and_then(|record| {
            engine.measure(&record).map_err(|e| match e {
                MeasureError::Decode(msg) => QaError::decode(ordinal, record.raw(), msg),
                MeasureError::Rejected(msg) => QaError::engine(ordinal, record.raw(), msg),
            })
        }))
    }

    /// Ordinal of the most recently read record.
    pub fn ordinal(&self) -> u64 {
        match self {
            Self::Delimited(r) => r.ordinal,
            Self::LineObject(r) => r.ordinal,
        }
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<MetricResults>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubEngine, memory_input};

    #[test]
    fn test_delimited_configures_engine_with_header() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["a", "b"]);
        {
            let reader =
                RecordReader::new(Format::Delimited, memory_input("a,b\n1,2\n"), &mut engine)?;
            assert_eq!(reader.format(), Format::Delimited);
        }
        assert_eq!(engine.columns(), Some(&["a".to_string(), "b".to_string()][..]));
        Ok(())
    }

    #[test]
    fn test_delimited_quoted_and_multiline_cells() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["id", "text"]);
        let input = memory_input("id,text\n1,\"hello, world\"\n2,\"two\nlines\"\n");
        let mut reader = RecordReader::new(Format::Delimited, input, &mut engine)?;
        let rows: Vec<_> = reader.by_ref().collect::<Result<_>>()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].flatten(), vec!["1", "hello, world"]);
        assert_eq!(rows[1].flatten(), vec!["2", "two\nlines"]);
        Ok(())
    }

    #[test]
    fn test_delimited_cardinality_mismatch_is_skippable() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["a", "b"]);
        let input = memory_input("a,b\n1,2\n3\n4,5,6\n7,8\n");
        let mut reader = RecordReader::new(Format::Delimited, input, &mut engine)?;
        let results: Vec<_> = reader.by_ref().collect();
        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(QaError::Cardinality {
                ordinal,
                actual,
                expected,
            }) => assert_eq!((*ordinal, *actual, *expected), (2, 1, 2)),
            other => panic!("expected cardinality error, got {other:?}"),
        }
        assert!(matches!(results[2], Err(QaError::Cardinality { ordinal: 3, .. })));
        assert_eq!(results[3].as_ref().unwrap().flatten(), vec!["7", "8"]);
        Ok(())
    }

    #[test]
    fn test_delimited_trailing_partial_row_ends_stream() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["a", "b", "c"]);
        let input = memory_input("a,b,c\n1,2,3\n4,5");
        let mut reader = RecordReader::new(Format::Delimited, input, &mut engine)?;
        assert!(reader.has_next());
        assert!(reader.next_result().unwrap().is_ok());
        assert!(!reader.has_next());
        assert!(reader.next_result().is_none());
        Ok(())
    }

    #[test]
    fn test_delimited_complete_unterminated_row_is_kept() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["a", "b"]);
        let input = memory_input("a,b\n1,2\n3,4");
        let reader = RecordReader::new(Format::Delimited, input, &mut engine)?;
        assert_eq!(reader.count(), 2);
        Ok(())
    }

    #[test]
    fn test_delimited_empty_input_is_fatal() {
        let mut engine = StubEngine::echo(&["a"]);
        let err = RecordReader::new(Format::Delimited, memory_input(""), &mut engine)
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_delimited_strips_bom_from_header() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["id"]);
        {
            let _reader =
                RecordReader::new(Format::Delimited, memory_input("\u{feff}id\n1\n"), &mut engine)?;
        }
        assert_eq!(engine.columns(), Some(&["id".to_string()][..]));
        Ok(())
    }

    #[test]
    fn test_line_object_skips_blank_lines() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["raw"]);
        let input = memory_input("{\"a\":1}\n\n   \n{\"a\":2}\r\n");
        let mut reader = RecordReader::new(Format::LineObject, input, &mut engine)?;
        let rows: Vec<_> = reader.by_ref().collect::<Result<_>>()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].flatten(), vec!["{\"a\":2}"]);
        assert_eq!(reader.ordinal(), 2);
        Ok(())
    }

    #[test]
    fn test_line_object_trailing_partial_line_ends_stream() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["raw"]);
        let input = memory_input("{\"a\":1}\n{\"a\":");
        let reader = RecordReader::new(Format::LineObject, input, &mut engine)?;
        let rows: Vec<_> = reader.collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_ok());
        Ok(())
    }

    #[test]
    fn test_line_object_bad_record_in_middle_is_skippable() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["raw"]).rejecting("bad");
        let input = memory_input("{\"a\":1}\nbad\n{\"a\":3}\n");
        let reader = RecordReader::new(Format::LineObject, input, &mut engine)?;
        let rows: Vec<_> = reader.collect();
        assert_eq!(rows.len(), 3);
        let err = rows[1].as_ref().unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(err.ordinal(), Some(2));
        assert!(err.to_string().contains("bad"));
        assert!(rows[2].is_ok());
        Ok(())
    }

    #[test]
    fn test_line_object_invalid_utf8_is_skippable() -> anyhow::Result<()> {
        let mut engine = StubEngine::echo(&["raw"]);
        let bytes: Vec<u8> = b"{\"a\":1}\n\xff\xfe\n{\"a\":2}\n".to_vec();
        let input = InputStream::from_reader(Box::new(io::Cursor::new(bytes)), "<bytes>");
        let reader = RecordReader::new(Format::LineObject, input, &mut engine)?;
        let rows: Vec<_> = reader.collect();
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[1], Err(QaError::Decode { ordinal: 2, .. })));
        Ok(())
    }
}
