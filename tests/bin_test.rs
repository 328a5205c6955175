use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn isaac() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("isaac");
    for var in [
        "ISAAC_SCHEMA",
        "ISAAC_VOCAB",
        "ISAAC_VOCAB_DB",
        "ISAAC_RECORDS_DB",
        "ISAAC_STRICT_VOCABULARY",
        "ISAAC_DESCRIPTOR_SECTION",
        "ISAAC_LOG_JSON",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_flag_exits_0_and_prints_usage() {
    isaac()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("isaac"));
}

#[test]
fn unknown_command_exits_2() {
    // clap exits with code 2 for parse errors
    isaac()
        .arg("nonexistent")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("isaac"));
}

#[test]
fn no_command_exits_1() {
    isaac()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("isaac"));
}

#[test]
fn validate_passes_bundled_golden_records() {
    isaac()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "PASS records/xas_operando_cu.json",
        ))
        .stdout(predicate::str::contains(
            "PASS records/dft_co_binding.json",
        ))
        .stdout(predicate::str::contains("2/2 records passed"));
}

#[test]
fn validate_exits_1_for_missing_path() {
    isaac()
        .args(["validate", "/nonexistent/path"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("path not found"));
}

#[test]
fn validate_exits_1_for_missing_schema_before_reading_records() {
    isaac()
        .args(["validate", "records"])
        .args(["--schema", "/nonexistent/schema.json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("PASS").not())
        .stderr(predicate::str::contains("/nonexistent/schema.json"));
}

#[test]
fn validate_exits_1_for_empty_directory() {
    let tmp = TempDir::new().unwrap();
    isaac()
        .arg("validate")
        .arg(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no .json records found"));
}

#[test]
fn validate_itemizes_reasons_for_failing_records() {
    let tmp = TempDir::new().unwrap();
    let good = tmp.path().join("a_good.json");
    fs::copy("records/xas_operando_cu.json", good).unwrap();
    fs::write(
        tmp.path().join("b_bad.json"),
        r#"{"record_id": "X", "measurement": {}, "context": {"environment": "in_vivo"}}"#,
    )
    .unwrap();
    fs::write(tmp.path().join("c_broken.json"), "{not json").unwrap();

    isaac()
        .arg("validate")
        .arg(tmp.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("a_good.json"))
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains(
            "[logical] measurement: Measurement block missing 'series'",
        ))
        .stdout(predicate::str::contains("[semantic] context.environment"))
        .stdout(predicate::str::contains("not valid JSON"))
        .stdout(predicate::str::contains("1/3 records passed"));
}

#[test]
fn check_prints_verdict_and_exits_0_when_valid() {
    isaac()
        .args(["check", "records/dft_co_binding.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));
}

const NESTED_CONFIGURATION: &str =
    r#"{"record_id": "X", "system": {"configuration": {"gain": 5, "mode": {"nested": true}}}}"#;

#[test]
fn check_reads_stdin_and_exits_1_when_invalid() {
    let output = isaac()
        .arg("check")
        .write_stdin(NESTED_CONFIGURATION)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let verdict: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(verdict["valid"], false);
    let logical: Vec<_> = verdict["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["layer"] == "logical")
        .collect();
    assert_eq!(logical.len(), 1);
    assert_eq!(logical[0]["path"], "system.configuration.mode");
}

#[test]
fn check_exits_2_for_unparseable_input() {
    isaac()
        .arg("check")
        .write_stdin("{\"record_id\": ")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Input error"));
}

#[test]
fn check_exits_2_for_missing_schema() {
    isaac()
        .args(["check", "records/dft_co_binding.json"])
        .args(["--schema", "/nonexistent/schema.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn check_exits_2_for_bad_boolean_setting() {
    isaac()
        .args(["check", "records/dft_co_binding.json"])
        .env("ISAAC_STRICT_VOCABULARY", "maybe")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ISAAC_STRICT_VOCABULARY"));
}

#[test]
fn check_warns_when_vocab_file_is_missing() {
    let tmp = TempDir::new().unwrap();
    isaac()
        .args(["check", "records/dft_co_binding.json"])
        .arg("--vocab")
        .arg(tmp.path().join("absent.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("absent.json"))
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains("\u{1b}[").not());
}

/// Seed vocabulary plus a section governing the `preferred_site` descriptor.
fn vocab_with_descriptors(tmp: &TempDir) -> std::path::PathBuf {
    let seed = fs::read_to_string("data/vocabulary.json").unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&seed).unwrap();
    doc["Descriptors"] = serde_json::json!({
        "descriptors.preferred_site": {"description": "", "values": ["top", "hollow"]}
    });
    let path = tmp.path().join("vocabulary.json");
    fs::write(&path, doc.to_string()).unwrap();
    path
}

#[test]
fn descriptor_section_governs_categorical_descriptors() {
    let tmp = TempDir::new().unwrap();
    let vocab = vocab_with_descriptors(&tmp);

    // ungoverned unless a section is named
    isaac()
        .args(["check", "records/dft_co_binding.json"])
        .arg("--vocab")
        .arg(&vocab)
        .assert()
        .success();

    isaac()
        .args(["check", "records/dft_co_binding.json"])
        .args(["--descriptor-section", "Descriptors"])
        .arg("--vocab")
        .arg(&vocab)
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "descriptors.outputs[0].descriptors[1].value",
        ))
        .stdout(predicate::str::contains("'bridge'"));

    isaac()
        .args(["validate", "records/dft_co_binding.json"])
        .arg("--vocab")
        .arg(&vocab)
        .env("ISAAC_DESCRIPTOR_SECTION", "Descriptors")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("0/1 records passed"));
}
