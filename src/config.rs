//! Schema and measurement configuration.
//!
//! Both files are plain serde documents in YAML or JSON. They are loaded once
//! at startup into immutable values; the [`Schema`] is then borrowed by the
//! engine for the rest of the run.

use crate::error::{QaError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Encoding of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Infers the encoding from a file extension (`.yaml`, `.yml`, `.json`).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads and deserializes a configuration file.
///
/// An explicit `format` wins over the file extension.
///
/// # Errors
/// Returns [`QaError::Configuration`] if the file is missing, its format cannot
/// be determined, or it does not deserialize into `T`.
pub fn load_config<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    format: Option<ConfigFormat>,
) -> Result<T> {
    let path = path.as_ref();
    let format = format.or_else(|| ConfigFormat::from_path(path)).ok_or_else(|| {
        QaError::configuration(format!(
            "cannot tell whether {} is YAML or JSON; pass the format explicitly",
            path.display()
        ))
    })?;
    let text = fs::read_to_string(path)
        .map_err(|e| QaError::configuration(format!("read {}: {e}", path.display())))?;
    parse_config(&text, format)
        .map_err(|msg| QaError::configuration(format!("parse {}: {msg}", path.display())))
}

/// Deserializes configuration text in the given encoding.
pub fn parse_config<T: DeserializeOwned>(
    text: &str,
    format: ConfigFormat,
) -> std::result::Result<T, String> {
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
    }
}

/// On-disk shape of a schema file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Declared record format (`csv`, `json`, ...). Optional.
    #[serde(default)]
    pub format: Option<String>,
    pub fields: Vec<FieldConfig>,
}

/// One schema field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    /// CSV column name, top-level JSON key, or JSON Pointer. Defaults to `name`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub extractable: bool,
}

/// Which measurements the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeasurementConfig {
    pub completeness: bool,
    pub existence: bool,
    pub cardinality: bool,
    /// Emit the values of extractable fields ahead of the metrics.
    pub extract: bool,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            completeness: true,
            existence: true,
            cardinality: false,
            extract: true,
        }
    }
}

/// A resolved schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: String,
    pub path: String,
    pub categories: Vec<String>,
}

/// Immutable schema built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    declared_format: Option<String>,
    fields: Vec<Field>,
    extracted: Vec<Field>,
}

impl Schema {
    /// Builds a schema from its file representation.
    ///
    /// # Errors
    /// Fails on an empty or duplicated field name.
    pub fn from_config(config: SchemaConfig) -> Result<Self> {
        let mut schema = Schema {
            declared_format: config.format,
            ..Schema::default()
        };
        for fc in config.fields {
            if fc.name.trim().is_empty() {
                return Err(QaError::configuration("schema field with empty name"));
            }
            if schema.field(&fc.name).is_some() {
                return Err(QaError::configuration(format!(
                    "duplicate schema field '{}'",
                    fc.name
                )));
            }
            let field = Field {
                path: fc.path.unwrap_or_else(|| fc.name.clone()),
                label: fc.name,
                categories: fc.categories,
            };
            if fc.extractable {
                schema.extracted.push(field.clone());
            }
            schema.fields.push(field);
        }
        Ok(schema)
    }

    /// Appends extractable fields given on the command line.
    ///
    /// Each entry is `label` or `label=path`. Labels already extracted are
    /// skipped, so the first occurrence decides the column position. A label
    /// naming a schema field reuses that field's path; any other label is
    /// extracted from `path` (or from a column/key of the same name) without
    /// being measured.
    #[must_use]
    pub fn with_extractable<S: AsRef<str>>(mut self, entries: &[S]) -> Self {
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let (label, path) = match entry.split_once('=') {
                Some((l, p)) => (l.trim(), Some(p.trim())),
                None => (entry, None),
            };
            if self.extracted.iter().any(|f| f.label == label) {
                continue;
            }
            let field = match self.field(label) {
                Some(known) => Field {
                    path: path.map_or_else(|| known.path.clone(), str::to_string),
                    ..known.clone()
                },
                None => Field {
                    label: label.to_string(),
                    path: path.unwrap_or(label).to_string(),
                    categories: Vec::new(),
                },
            };
            self.extracted.push(field);
        }
        self
    }

    /// The record format the schema declares, verbatim.
    pub fn declared_format(&self) -> Option<&str> {
        self.declared_format.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields whose values are copied into the output, in column order.
    pub fn extracted(&self) -> &[Field] {
        &self.extracted
    }

    pub fn field(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.label == label)
    }

    /// Distinct categories in first-appearance order.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for cat in self.fields.iter().flat_map(|f| f.categories.iter()) {
            if !out.contains(&cat.as_str()) {
                out.push(cat);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA_YAML: &str = r"
format: csv
fields:
  - name: id
    extractable: true
  - name: title
    categories: [MANDATORY]
  - name: creator
    path: dc_creator
    categories: [MANDATORY, DESCRIPTIVE]
";

    fn schema() -> Schema {
        let cfg: SchemaConfig = parse_config(SCHEMA_YAML, ConfigFormat::Yaml).unwrap();
        Schema::from_config(cfg).unwrap()
    }

    #[test]
    fn test_schema_from_yaml() {
        let s = schema();
        assert_eq!(s.declared_format(), Some("csv"));
        assert_eq!(s.fields().len(), 3);
        assert_eq!(s.field("creator").unwrap().path, "dc_creator");
        assert_eq!(s.categories(), vec!["MANDATORY", "DESCRIPTIVE"]);
        let extracted: Vec<_> = s.extracted().iter().map(|f| f.label.as_str()).collect();
        assert_eq!(extracted, vec!["id"]);
    }

    #[test]
    fn test_extractable_merge_dedups_and_appends() {
        let s = schema().with_extractable(&["title", "id", "title", "source=/meta/src"]);
        let extracted: Vec<_> = s
            .extracted()
            .iter()
            .map(|f| (f.label.as_str(), f.path.as_str()))
            .collect();
        assert_eq!(
            extracted,
            vec![("id", "id"), ("title", "title"), ("source", "/meta/src")]
        );
        // Unknown labels are extracted only, never measured.
        assert!(s.field("source").is_none());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let cfg = SchemaConfig {
            format: None,
            fields: vec![
                FieldConfig {
                    name: "a".into(),
                    path: None,
                    categories: vec![],
                    extractable: false,
                },
                FieldConfig {
                    name: "a".into(),
                    path: None,
                    categories: vec![],
                    extractable: false,
                },
            ],
        };
        assert!(Schema::from_config(cfg).is_err());
    }

    #[test]
    fn test_measurement_defaults_and_json() {
        let cfg: MeasurementConfig =
            parse_config(r#"{"cardinality": true}"#, ConfigFormat::Json).unwrap();
        assert!(cfg.completeness);
        assert!(cfg.existence);
        assert!(cfg.cardinality);
        assert!(cfg.extract);
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path("s.yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path("s.JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path("s.toml"), None);
    }

    #[test]
    fn test_load_config_without_format_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("schema.conf");
        fs::write(&path, SCHEMA_YAML).unwrap();
        let err = load_config::<SchemaConfig>(&path, None).unwrap_err();
        assert!(err.is_fatal());
        let cfg: SchemaConfig = load_config(&path, Some(ConfigFormat::Yaml)).unwrap();
        assert_eq!(cfg.fields.len(), 3);
    }
}
