//! Result writers.
//!
//! A [`ResultWriter`] takes the engine header once and then one
//! [`MetricResults`] per record. Every variant remembers the header width and
//! refuses rows that do not match it, so a misconfigured engine shows up as a
//! [`QaError::Cardinality`] naming the record instead of as shifted columns.
//!
//! Rows are encoded in memory before anything touches the stream; a record
//! that fails leaves no partial row behind.

use super::compression::FinishWrite;
use super::stream::OutputStream;
use crate::error::{QaError, Result};
use crate::format::OutputFormat;
use crate::record::{MetricResult, MetricResults};
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::io::Write;
use std::sync::LazyLock;

static NON_COLUMN_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9_]").expect("valid column regex"));

/// Turns an engine label into a tabular column name.
///
/// Lower-cases, then replaces anything outside `[a-z0-9_]` (notably `:`, `/`
/// and `.`) with `_`. Idempotent.
pub fn sanitize_header_label(label: &str) -> String {
    if label.is_empty() {
        return "_".to_string();
    }
    NON_COLUMN_CHAR
        .replace_all(&label.to_lowercase(), "_")
        .into_owned()
}

fn check_width(expected: Option<usize>, actual: usize, ordinal: u64) -> Result<()> {
    match expected {
        Some(expected) if expected != actual => Err(QaError::Cardinality {
            ordinal,
            actual,
            expected,
        }),
        _ => Ok(()),
    }
}

fn csv_write_error(err: csv::Error, context: &str) -> QaError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => QaError::io(context, source),
        _ => QaError::serialization(context, std::io::Error::other(message)),
    }
}

/// Comma-separated rows under a sanitized header.
pub struct DelimitedWriter {
    csv: csv::Writer<Box<dyn FinishWrite>>,
    description: String,
    width: Option<usize>,
    rows: u64,
}

impl DelimitedWriter {
    pub fn new(output: OutputStream) -> Self {
        let description = output.description().to_string();
        let csv = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(output.into_writer());
        Self {
            csv,
            description,
            width: None,
            rows: 0,
        }
    }

    fn write_header(&mut self, header: &[String]) -> Result<()> {
        let columns: Vec<String> = header.iter().map(|l| sanitize_header_label(l)).collect();
        self.write_row(&columns)?;
        self.width = Some(columns.len());
        Ok(())
    }

    fn write_result(&mut self, ordinal: u64, results: &MetricResults) -> Result<()> {
        let cells = results.flatten();
        check_width(self.width, cells.len(), ordinal)?;
        self.write_row(&cells)?;
        self.rows += 1;
        Ok(())
    }

    fn write_row(&mut self, cells: &[String]) -> Result<()> {
        self.csv
            .write_record(cells)
            .map_err(|e| csv_write_error(e, &format!("write row to {}", self.description)))
    }

    fn finish(self) -> Result<()> {
        let context = format!("finish {}", self.description);
        let inner = self
            .csv
            .into_inner()
            .map_err(|e| QaError::io(&context, e.into_error()))?;
        inner.finish_write().map_err(|e| QaError::io(context, e))
    }
}

/// One JSON object per line, keyed by metric.
pub struct LineObjectWriter {
    out: Box<dyn FinishWrite>,
    description: String,
    width: Option<usize>,
    rows: u64,
}

impl LineObjectWriter {
    pub fn new(output: OutputStream) -> Self {
        Self {
            description: output.description().to_string(),
            out: output.into_writer(),
            width: None,
            rows: 0,
        }
    }

    fn write_result(&mut self, ordinal: u64, results: &MetricResults) -> Result<()> {
        check_width(self.width, results.cell_count(), ordinal)?;
        let mut line = serde_json::to_vec(results)
            .map_err(|e| QaError::serialization(format!("encode record #{ordinal}"), e))?;
        line.push(b'\n');
        self.out
            .write_all(&line)
            .map_err(|e| QaError::io(format!("write to {}", self.description), e))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let context = format!("finish {}", self.description);
        self.out
            .finish_write()
            .map_err(|e| QaError::io(context, e))
    }
}

/// Serializes the cells of several results as a single JSON object.
///
/// A label seen twice keeps its first position and its last value.
struct MergedCells<'a>(Vec<(&'a str, &'a Value)>);

impl<'a> MergedCells<'a> {
    fn new(results: &'a [MetricResult]) -> Self {
        let mut merged: Vec<(&str, &Value)> = Vec::new();
        for (label, value) in results.iter().flat_map(MetricResult::cells) {
            match merged.iter_mut().find(|(l, _)| *l == label.as_str()) {
                Some(slot) => slot.1 = value,
                None => merged.push((label.as_str(), value)),
            }
        }
        Self(merged)
    }
}

impl Serialize for MergedCells<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in &self.0 {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Comma-separated rows where each metric occupies one cell holding a JSON
/// object, for bulk loading into relational stores.
pub struct HybridWriter {
    inner: DelimitedWriter,
    grouped: Vec<String>,
}

impl HybridWriter {
    pub fn new(output: OutputStream) -> Self {
        Self {
            inner: DelimitedWriter::new(output),
            grouped: Vec::new(),
        }
    }

    /// Collapses `<metric>:<label>` columns into one column per metric.
    ///
    /// Only prefixes that name one of `metric_keys` are grouped; an extracted
    /// column such as `dc:title` stays a column of its own.
    fn group_header(header: &[String], metric_keys: &[String]) -> (Vec<String>, Vec<String>) {
        let mut columns = Vec::new();
        let mut grouped: Vec<String> = Vec::new();
        for label in header {
            let metric = label
                .split_once(':')
                .filter(|(prefix, _)| metric_keys.iter().any(|k| k.as_str() == *prefix));
            match metric {
                Some((metric, _)) => {
                    if !grouped.iter().any(|g| g == metric) {
                        grouped.push(metric.to_string());
                        columns.push(metric.to_string());
                    }
                }
                None => columns.push(label.clone()),
            }
        }
        (columns, grouped)
    }

    fn write_header(&mut self, header: &[String], metric_keys: &[String]) -> Result<()> {
        let (columns, grouped) = Self::group_header(header, metric_keys);
        tracing::debug!(metrics = ?grouped, "grouping metric columns");
        self.grouped = grouped;
        self.inner.write_header(&columns)
    }

    fn encode_row(&self, ordinal: u64, results: &MetricResults) -> Result<Vec<String>> {
        let mut cells = Vec::new();
        for (key, entry) in results.entries() {
            if self.grouped.iter().any(|g| g == key) {
                let cell = serde_json::to_string(&MergedCells::new(entry)).map_err(|e| {
                    QaError::serialization(format!("encode {key} of record #{ordinal}"), e)
                })?;
                cells.push(cell);
            } else {
                cells.extend(entry.iter().flat_map(MetricResult::compact));
            }
        }
        Ok(cells)
    }

    fn write_result(&mut self, ordinal: u64, results: &MetricResults) -> Result<()> {
        let cells = self.encode_row(ordinal, results)?;
        check_width(self.inner.width, cells.len(), ordinal)?;
        self.inner.write_row(&cells)?;
        self.inner.rows += 1;
        Ok(())
    }
}

/// A writer for one of the supported output formats.
pub enum ResultWriter {
    Delimited(DelimitedWriter),
    LineObject(LineObjectWriter),
    Hybrid(HybridWriter),
}

impl ResultWriter {
    pub fn new(format: OutputFormat, output: OutputStream) -> Self {
        match format {
            OutputFormat::Delimited => Self::Delimited(DelimitedWriter::new(output)),
            OutputFormat::LineObject => Self::LineObject(LineObjectWriter::new(output)),
            OutputFormat::Hybrid => Self::Hybrid(HybridWriter::new(output)),
        }
    }

    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Delimited(_) => OutputFormat::Delimited,
            Self::LineObject(_) => OutputFormat::LineObject,
            Self::Hybrid(_) => OutputFormat::Hybrid,
        }
    }

    /// Writes the header row. Line-object output has no header line but
    /// still remembers the width for row checks.
    ///
    /// `metric_keys` are the keys the engine files metrics under; hybrid
    /// output groups the columns of those metrics and no others.
    pub fn write_header(&mut self, header: &[String], metric_keys: &[String]) -> Result<()> {
        match self {
            Self::Delimited(w) => w.write_header(header),
            Self::LineObject(w) => {
                tracing::trace!(columns = header.len(), "line-object output has no header row");
                w.width = Some(header.len());
                Ok(())
            }
            Self::Hybrid(w) => w.write_header(header, metric_keys),
        }
    }

    /// Writes one record's results.
    ///
    /// # Errors
    /// [`QaError::Cardinality`] or [`QaError::Serialization`] when the record
    /// cannot be written (nothing is written); [`QaError::Io`] when the
    /// stream fails.
    pub fn write_result(&mut self, ordinal: u64, results: &MetricResults) -> Result<()> {
        match self {
            Self::Delimited(w) => w.write_result(ordinal, results),
            Self::LineObject(w) => w.write_result(ordinal, results),
            Self::Hybrid(w) => w.write_result(ordinal, results),
        }
    }

    /// Number of result rows written so far.
    pub fn rows_written(&self) -> u64 {
        match self {
            Self::Delimited(w) => w.rows,
            Self::LineObject(w) => w.rows,
            Self::Hybrid(w) => w.inner.rows,
        }
    }

    /// Finishes the output stream: writes any compressor trailer, then
    /// flushes. A failure here means the output is incomplete.
    pub fn finish(self) -> Result<()> {
        match self {
            Self::Delimited(w) => w.finish(),
            Self::LineObject(w) => w.finish(),
            Self::Hybrid(w) => w.inner.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingWriter, SharedBuffer};

    fn header(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> MetricResults {
        MetricResults::new()
            .with(
                "extracted",
                vec![MetricResult::new().with("id", "r1").with("title", Value::Null)],
            )
            .with(
                "completeness",
                vec![MetricResult::new().with("TOTAL", 0.5).with("MANDATORY", 1.0)],
            )
            .with(
                "existence",
                vec![MetricResult::new().with("id", 1).with("title", 0)],
            )
    }

    const SAMPLE_HEADER: &[&str] = &[
        "id",
        "title",
        "completeness:TOTAL",
        "completeness:MANDATORY",
        "existence:id",
        "existence:title",
    ];

    const SAMPLE_METRICS: &[&str] = &["completeness", "existence"];

    fn run(format: OutputFormat, results: &[MetricResults]) -> (String, Vec<Result<()>>) {
        let buf = SharedBuffer::new();
        let mut writer = ResultWriter::new(format, buf.output_stream());
        writer
            .write_header(&header(SAMPLE_HEADER), &header(SAMPLE_METRICS))
            .unwrap();
        let outcomes = results
            .iter()
            .enumerate()
            .map(|(i, r)| writer.write_result(i as u64 + 1, r))
            .collect();
        writer.finish().unwrap();
        (buf.contents(), outcomes)
    }

    #[test]
    fn test_sanitize_header_label() {
        assert_eq!(sanitize_header_label("completeness:TOTAL"), "completeness_total");
        assert_eq!(sanitize_header_label("existence:dc/title.en"), "existence_dc_title_en");
        assert_eq!(sanitize_header_label("Has Space-Dash"), "has_space_dash");
        assert_eq!(sanitize_header_label(""), "_");
        for label in ["a:B/c.d", "x", "ÄÖ:1", "__"] {
            let once = sanitize_header_label(label);
            assert_eq!(sanitize_header_label(&once), once);
            assert!(once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }

    #[test]
    fn test_delimited_output() {
        let (text, outcomes) = run(OutputFormat::Delimited, &[sample()]);
        assert!(outcomes.iter().all(Result::is_ok));
        assert_eq!(
            text,
            "id,title,completeness_total,completeness_mandatory,existence_id,existence_title\n\
             r1,NA,0.5,1.0,1,0\n"
        );
    }

    #[test]
    fn test_line_object_output_keeps_order_and_has_no_header() {
        let (text, _) = run(OutputFormat::LineObject, &[sample(), sample()]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"extracted":[{"id":"r1","title":null}],"completeness":[{"TOTAL":0.5,"MANDATORY":1.0}],"existence":[{"id":1,"title":0}]}"#
        );
    }

    #[test]
    fn test_hybrid_output_groups_metrics() {
        let (text, _) = run(OutputFormat::Hybrid, &[sample()]);
        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["id", "title", "completeness", "existence"]);
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "r1");
        assert_eq!(&row[1], "NA");
        assert_eq!(&row[2], r#"{"TOTAL":0.5,"MANDATORY":1.0}"#);
        assert_eq!(&row[3], r#"{"id":1,"title":0}"#);
    }

    #[test]
    fn test_hybrid_keeps_colon_labels_outside_metrics() {
        let buf = SharedBuffer::new();
        let mut writer = ResultWriter::new(OutputFormat::Hybrid, buf.output_stream());
        writer
            .write_header(
                &header(&["dc:title", "dc:creator", "existence:dc:title"]),
                &header(&["existence"]),
            )
            .unwrap();
        let results = MetricResults::new()
            .with(
                "extracted",
                vec![MetricResult::new().with("dc:title", "Foo").with("dc:creator", "Ann")],
            )
            .with("existence", vec![MetricResult::new().with("dc:title", 1)]);
        writer.write_result(1, &results).unwrap();
        writer.finish().unwrap();
        assert_eq!(
            buf.contents(),
            "dc_title,dc_creator,existence\nFoo,Ann,\"{\"\"dc:title\"\":1}\"\n"
        );
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_finish_completes_compressed_output() -> anyhow::Result<()> {
        use crate::io::Compression;
        use std::io::Read;

        // Rejects writes once flushed, so a trailer written after the final
        // flush would be lost.
        let buf = SharedBuffer::sealed_on_flush();
        let stream =
            OutputStream::compressed(Box::new(buf.clone()), Compression::Gzip, "<memory>")?;
        let mut writer = ResultWriter::new(OutputFormat::LineObject, stream);
        writer.write_header(&header(&["existence:id"]), &header(&["existence"]))?;
        let results =
            MetricResults::new().with("existence", vec![MetricResult::new().with("id", 1)]);
        writer.write_result(1, &results)?;
        writer.finish()?;

        let mut text = String::new();
        flate2::read::GzDecoder::new(buf.bytes().as_slice()).read_to_string(&mut text)?;
        assert_eq!(text, "{\"existence\":[{\"id\":1}]}\n");
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_finish_reports_compressed_write_fault() {
        use crate::io::Compression;

        // Accepts the gzip header, then fails everything else.
        let stream = OutputStream::compressed(
            Box::new(FailingWriter::after_writes(1)),
            Compression::Gzip,
            "<failing>",
        )
        .unwrap();
        let mut writer = ResultWriter::new(OutputFormat::LineObject, stream);
        writer
            .write_header(&header(&["existence:id"]), &header(&["existence"]))
            .unwrap();
        let results =
            MetricResults::new().with("existence", vec![MetricResult::new().with("id", 1)]);
        writer.write_result(1, &results).unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, QaError::Io { .. }), "{err:?}");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_cardinality_mismatch_writes_nothing() {
        let short = MetricResults::new().with("existence", vec![MetricResult::new().with("id", 1)]);
        for format in [
            OutputFormat::Delimited,
            OutputFormat::LineObject,
            OutputFormat::Hybrid,
        ] {
            let (text, outcomes) = run(format, &[sample(), short.clone(), sample()]);
            match &outcomes[1] {
                Err(QaError::Cardinality {
                    ordinal, expected, ..
                }) => {
                    assert_eq!(*ordinal, 2);
                    let width = if format == OutputFormat::Hybrid { 4 } else { 6 };
                    assert_eq!(*expected, width, "{format}");
                }
                other => panic!("{format}: expected cardinality error, got {other:?}"),
            }
            assert!(!outcomes[1].as_ref().unwrap_err().is_fatal());
            let data_lines = text.lines().count() - usize::from(format != OutputFormat::LineObject);
            assert_eq!(data_lines, 2, "{format}");
        }
    }

    #[test]
    fn test_rows_written_counts_only_successes() {
        let buf = SharedBuffer::new();
        let mut writer = ResultWriter::new(OutputFormat::Delimited, buf.output_stream());
        writer
            .write_header(&header(&["existence:id"]), &header(&["existence"]))
            .unwrap();
        let ok = MetricResults::new().with("existence", vec![MetricResult::new().with("id", 1)]);
        writer.write_result(1, &ok).unwrap();
        assert!(writer.write_result(2, &sample()).is_err());
        writer.write_result(3, &ok).unwrap();
        assert_eq!(writer.rows_written(), 2);
        assert_eq!(writer.format(), OutputFormat::Delimited);
    }
}
