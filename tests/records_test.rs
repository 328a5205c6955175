use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn isaac() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("isaac");
    for var in [
        "ISAAC_RECORDS_DB",
        "ISAAC_VOCAB",
        "ISAAC_VOCAB_DB",
        "ISAAC_LOG_JSON",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn stdout_json(cmd: &mut assert_cmd::Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

fn list(db: &Path) -> Value {
    let mut cmd = isaac();
    cmd.args(["records", "list"]).arg("--records-db").arg(db);
    stdout_json(&mut cmd)
}

#[test]
fn check_persist_stores_valid_record() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("records.db");

    let verdict = stdout_json(
        isaac()
            .args(["check", "records/xas_operando_cu.json", "--persist"])
            .arg("--records-db")
            .arg(&db),
    );
    assert_eq!(verdict["valid"], true);
    let id = verdict["record_id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 26);

    let rows = list(&db);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["id"], id.as_str());
    assert_eq!(rows[0]["record_type"], "evidence");

    let mut get = isaac();
    get.args(["records", "get", id.as_str()])
        .arg("--records-db")
        .arg(&db);
    let stored = stdout_json(&mut get);
    let text = fs::read_to_string("records/xas_operando_cu.json").unwrap();
    let expected: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(stored, expected);
}

#[test]
fn check_persist_skips_invalid_record() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("records.db");
    isaac()
        .args(["check", "--persist"])
        .arg("--records-db")
        .arg(&db)
        .write_stdin(r#"{"record_id": "X"}"#)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("record_id\": \"").not());
    assert_eq!(list(&db), json!([]));
}

#[test]
fn get_unknown_record_exits_1() {
    let tmp = TempDir::new().unwrap();
    isaac()
        .args(["records", "get", "01ARZ3NDEKTSV4RRFFQ69G5FAV"])
        .arg("--records-db")
        .arg(tmp.path().join("records.db"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Record not found"));
}

fn write_rows(dir: &Path) -> std::path::PathBuf {
    let rows = json!([
        {
            "Record Type": "evidence",
            "Record Domain": "characterization",
            "Source Type": "laboratory",
            "Environment": "operando",
            "Temperature (K)": "298.15",
            "Material Name": "Copper",
            "Formula": "Cu",
            "Sample Form": "foil"
        },
        {
            "Environment": "in_vivo",
            "Sample Form": ""
        }
    ]);
    let path = dir.join("rows.json");
    fs::write(&path, rows.to_string()).unwrap();
    path
}

#[test]
fn import_persists_valid_rows_only() {
    let tmp = TempDir::new().unwrap();
    let rows = write_rows(tmp.path());
    let db = tmp.path().join("records.db");

    isaac()
        .arg("import")
        .arg(&rows)
        .arg("--records-db")
        .arg(&db)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("PASS row 1 -> "))
        .stdout(predicate::str::contains("FAIL row 2"))
        .stdout(predicate::str::contains("[semantic] context.environment"))
        .stdout(predicate::str::contains("1/2 rows imported"));

    let stored = list(&db);
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["record_domain"], "characterization");
}

#[test]
fn import_dry_run_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let rows = write_rows(tmp.path());
    let db = tmp.path().join("records.db");

    isaac()
        .arg("import")
        .arg(&rows)
        .arg("--dry-run")
        .arg("--records-db")
        .arg(&db)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("PASS row 1\n"))
        .stdout(predicate::str::contains("1/2 rows validated"));
    assert!(!db.exists());
}

#[test]
fn import_rejects_non_array_input() {
    let tmp = TempDir::new().unwrap();
    let rows = tmp.path().join("rows.json");
    fs::write(&rows, r#"{"Environment": "operando"}"#).unwrap();
    isaac()
        .arg("import")
        .arg(&rows)
        .arg("--dry-run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Input error"));
}
