mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{SAMPLE_HEADER, SAMPLE_ROWS, write};
use predicates::prelude::*;
use recordqa::testing::{SAMPLE_CSV, SAMPLE_SCHEMA_YAML};

#[test]
fn missing_required_options_exit_with_usage() {
    cargo_bin_cmd!("recordqa")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--input"));
}

#[test]
fn writes_csv_to_stdout() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write(tmp.path(), "in.csv", SAMPLE_CSV);
    let schema = write(tmp.path(), "schema.yaml", SAMPLE_SCHEMA_YAML);

    let expected = format!("{SAMPLE_HEADER}\n{}\n", SAMPLE_ROWS.join("\n"));
    cargo_bin_cmd!("recordqa")
        .args(["-q", "-f", "csv", "-i"])
        .arg(&input)
        .arg("-s")
        .arg(&schema)
        .assert()
        .success()
        .stdout(expected);
    Ok(())
}

#[test]
fn default_output_format_is_ndjson() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write(tmp.path(), "in.csv", SAMPLE_CSV);
    let schema = write(tmp.path(), "schema.yaml", SAMPLE_SCHEMA_YAML);

    let out = cargo_bin_cmd!("recordqa")
        .arg("-q")
        .arg("-i")
        .arg(&input)
        .arg("-s")
        .arg(&schema)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out)?;
    assert_eq!(text.lines().count(), 3);
    for line in text.lines() {
        let v: serde_json::Value = serde_json::from_str(line)?;
        assert!(v.get("completeness").is_some());
    }
    Ok(())
}

#[test]
fn unwritable_output_falls_back_to_stdout() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write(tmp.path(), "in.csv", SAMPLE_CSV);
    let schema = write(tmp.path(), "schema.yaml", SAMPLE_SCHEMA_YAML);
    // The output path is an existing directory.
    let blocked = tmp.path().join("results.csv");
    std::fs::create_dir(&blocked)?;

    cargo_bin_cmd!("recordqa")
        .arg("-i")
        .arg(&input)
        .arg("-s")
        .arg(&schema)
        .arg("-o")
        .arg(&blocked)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(SAMPLE_HEADER))
        .stderr(predicate::str::contains("writing to stdout instead"));
    Ok(())
}

#[test]
fn skipped_records_still_exit_zero() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write(
        tmp.path(),
        "in.ndjson",
        "{\"id\":\"a\"}\n{broken\n{\"id\":\"c\"}\n",
    );
    let schema = write(tmp.path(), "schema.yaml", SAMPLE_SCHEMA_YAML);
    let output = tmp.path().join("out.ndjson");

    cargo_bin_cmd!("recordqa")
        .args(["--input-format", "ndjson", "-i"])
        .arg(&input)
        .arg("-s")
        .arg(&schema)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Record #2"))
        .stderr(predicate::str::contains("skipped=1"));
    assert_eq!(std::fs::read_to_string(&output)?.lines().count(), 2);
    Ok(())
}

#[test]
fn missing_schema_exits_one() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = write(tmp.path(), "in.csv", SAMPLE_CSV);

    cargo_bin_cmd!("recordqa")
        .arg("-i")
        .arg(&input)
        .arg("-s")
        .arg(tmp.path().join("nope.yaml"))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn gzip_conflicts_with_compression() -> anyhow::Result<()> {
    cargo_bin_cmd!("recordqa")
        .args(["-i", "x.csv", "-s", "s.yaml", "--gzip", "--compression", "xz"])
        .assert()
        .failure()
        .code(2);
    Ok(())
}
