//! Pre-built schemas and inputs for common testing scenarios.

use crate::config::{ConfigFormat, Schema, SchemaConfig, parse_config};
use crate::error::{QaError, Result};

/// A small metadata schema: an extractable identifier, one mandatory field,
/// and one field in two categories.
pub const SAMPLE_SCHEMA_YAML: &str = r"
fields:
  - name: id
    extractable: true
  - name: title
    categories: [MANDATORY]
  - name: creator
    categories: [MANDATORY, DESCRIPTIVE]
";

/// Delimited input matching [`SAMPLE_SCHEMA_YAML`].
pub const SAMPLE_CSV: &str = "id,title,creator\n\
r1,Foo,Ann\n\
r2,,Bob\n\
r3,\"Bar, the sequel\",\n";

/// Line-object input matching [`SAMPLE_SCHEMA_YAML`].
pub const SAMPLE_NDJSON: &str = r#"{"id":"r1","title":"Foo","creator":"Ann"}
{"id":"r2","title":"","creator":"Bob"}
{"id":"r3","title":["Bar","Baz"],"creator":null}
"#;

/// Parses [`SAMPLE_SCHEMA_YAML`].
///
/// # Errors
///
/// Only if the fixture itself is broken.
///
/// # Example
///
/// ```
/// use recordqa::testing::sample_schema;
///
/// let schema = sample_schema().unwrap();
/// assert_eq!(schema.fields().len(), 3);
/// ```
pub fn sample_schema() -> Result<Schema> {
    let config: SchemaConfig =
        parse_config(SAMPLE_SCHEMA_YAML, ConfigFormat::Yaml).map_err(QaError::configuration)?;
    Schema::from_config(config)
}

/// A delimited input of `rows` records with columns `n,label`.
#[must_use]
pub fn numbered_csv(rows: usize) -> String {
    let mut out = String::from("n,label\n");
    for i in 1..=rows {
        out.push_str(&format!("{i},row-{i}\n"));
    }
    out
}

/// A line-object input of `rows` records, each `{"n": i}`.
#[must_use]
pub fn numbered_ndjson(rows: usize) -> String {
    (1..=rows).map(|i| format!("{{\"n\":{i}}}\n")).collect()
}
