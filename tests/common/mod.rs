#![allow(dead_code)]

use recordqa::cli::RunOptions;
use recordqa::io::Compression;
use std::fs;
use std::path::{Path, PathBuf};

/// Header of the reference engine over the sample schema with default
/// measurements.
pub const SAMPLE_HEADER: &str = "id,completeness_total,completeness_mandatory,\
completeness_descriptive,existence_id,existence_title,existence_creator";

/// Rows for the three sample records, in order.
pub const SAMPLE_ROWS: [&str; 3] = [
    "r1,1.0,1.0,1.0,1,1,1",
    "r2,0.666667,0.5,1.0,1,0,1",
    "r3,0.666667,0.5,0.0,1,1,0",
];

pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

pub fn options(input: &Path, schema: &Path, output: Option<&Path>) -> RunOptions {
    RunOptions {
        input: input.to_path_buf(),
        input_format: None,
        output: output.map(Path::to_path_buf),
        format: None,
        schema: schema.to_path_buf(),
        schema_format: None,
        measurements: None,
        measurements_format: None,
        extract: Vec::new(),
        compression: Compression::None,
    }
}

pub fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}
