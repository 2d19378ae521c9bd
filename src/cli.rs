//! Command-line surface and the glue from parsed options to a run.
//!
//! Everything that can fail because of configuration (config files, codec
//! names, the input and its header) fails here before the output is opened.

use crate::config::{ConfigFormat, MeasurementConfig, Schema, SchemaConfig, load_config};
use crate::engine::CompletenessEngine;
use crate::format::{resolve_input_format, resolve_output_format};
use crate::io::{Compression, resolve_reader, resolve_writer};
use crate::pipeline::{Pipeline, RunSummary};
use anyhow::Context;
use clap::{Args, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "recordqa")]
#[command(about = "Measure the quality of CSV or NDJSON records, one record at a time")]
#[command(version)]
#[command(long_about = "
recordqa streams records from a file through a schema-driven assessment
engine and writes one result row per record.

INPUT FORMATS:
- csv     comma-separated rows under a header row
- ndjson  one JSON object per line (also: json, jsonl)

OUTPUT FORMATS:
- csv      sanitized header, one flat row per record
- ndjson   one JSON object per record, no header
- csvjson  csv rows whose metric cells hold JSON objects

EXAMPLES:
  recordqa -i records.csv -s schema.yaml -o results.csv
  recordqa -i dump.ndjson.gz --gzip -s schema.json -f csvjson
  recordqa -i records.csv -s schema.yaml -e id,title -o out/results.ndjson.zst
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Input file path
    #[arg(short, long, help = "Input file (csv or ndjson, optionally compressed)")]
    pub input: PathBuf,

    /// Input format override
    #[arg(long, help = "Input format (csv, json, ndjson, jsonl); overrides the schema")]
    pub input_format: Option<String>,

    /// Output file path
    #[arg(short, long, help = "Output file; stdout when absent or unwritable")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(
        short,
        long,
        help = "Output format (csv, ndjson, csvjson); else from the output extension"
    )]
    pub format: Option<String>,

    /// Schema configuration
    #[arg(short, long, help = "Schema configuration file (YAML or JSON)")]
    pub schema: PathBuf,

    #[arg(long, value_enum, help = "Schema file format; else from its extension")]
    pub schema_format: Option<ConfigFormat>,

    /// Measurement configuration
    #[arg(short, long, help = "Measurement configuration file (YAML or JSON)")]
    pub measurements: Option<PathBuf>,

    #[arg(long, value_enum, help = "Measurement file format; else from its extension")]
    pub measurements_format: Option<ConfigFormat>,

    /// Extra extractable fields
    #[arg(
        short,
        long = "extract",
        value_delimiter = ',',
        help = "Fields to copy into the output (label or label=path; repeatable)"
    )]
    pub extract: Vec<String>,

    /// Gzip input
    #[arg(short = 'z', long, help = "Input is gzip-compressed")]
    pub gzip: bool,

    #[arg(
        long,
        conflicts_with = "gzip",
        value_parser = parse_compression,
        help = "Input codec (gzip, zstd, bzip2, xz)"
    )]
    pub compression: Option<Compression>,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all logging except errors")]
    pub quiet: bool,
}

fn parse_compression(s: &str) -> Result<Compression, String> {
    Compression::parse(s)
        .ok_or_else(|| format!("unknown codec '{s}' (expected gzip, zstd, bzip2, xz or none)"))
}

/// Resolved options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub input_format: Option<String>,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub schema: PathBuf,
    pub schema_format: Option<ConfigFormat>,
    pub measurements: Option<PathBuf>,
    pub measurements_format: Option<ConfigFormat>,
    pub extract: Vec<String>,
    pub compression: Compression,
}

impl From<Cli> for RunOptions {
    fn from(cli: Cli) -> Self {
        let compression = match (cli.gzip, cli.compression) {
            (true, _) => Compression::Gzip,
            (false, Some(c)) => c,
            (false, None) => Compression::None,
        };
        Self {
            input: cli.input,
            input_format: cli.input_format,
            output: cli.output,
            format: cli.format,
            schema: cli.schema,
            schema_format: cli.schema_format,
            measurements: cli.measurements,
            measurements_format: cli.measurements_format,
            extract: cli.extract,
            compression,
        }
    }
}

/// Loads configuration, wires reader, engine and writer, and runs.
///
/// # Errors
/// Fails on any configuration or input error, and on a fatal fault during
/// the run.
pub fn execute(options: &RunOptions) -> anyhow::Result<RunSummary> {
    let schema_config: SchemaConfig = load_config(&options.schema, options.schema_format)
        .with_context(|| format!("load schema {}", options.schema.display()))?;
    let schema = Schema::from_config(schema_config)
        .with_context(|| format!("build schema from {}", options.schema.display()))?
        .with_extractable(&options.extract);

    let measurements: MeasurementConfig = match &options.measurements {
        Some(path) => load_config(path, options.measurements_format)
            .with_context(|| format!("load measurements {}", path.display()))?,
        None => MeasurementConfig::default(),
    };
    tracing::debug!(
        fields = schema.fields().len(),
        extracted = schema.extracted().len(),
        ?measurements,
        "configuration loaded"
    );

    let input_format =
        resolve_input_format(options.input_format.as_deref(), schema.declared_format());
    let output_format =
        resolve_output_format(options.format.as_deref(), options.output.as_deref());

    let mut engine = CompletenessEngine::new(&schema, measurements);
    let reader = resolve_reader(&options.input, input_format, options.compression, &mut engine)
        .with_context(|| format!("open input {}", options.input.display()))?;
    let writer = resolve_writer(output_format, options.output.as_deref());

    let summary = Pipeline::new(reader, writer).run()?;
    Ok(summary)
}
