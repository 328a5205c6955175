use super::EXIT_USAGE;
use crate::core::records::RecordStore;
use crate::core::rows::build_record;
use crate::core::settings::Overrides;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

fn read_rows(path: &Path) -> Result<Vec<Map<String, Value>>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("could not read {}: {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("{} is not a JSON array of row objects: {e}", path.display()))
}

/// Build, validate and persist one record per row. Invalid rows are reported and skipped.
pub fn run(rows_path: &Path, dry_run: bool, overrides: Overrides) -> i32 {
    let settings = match super::settings(overrides) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return EXIT_USAGE;
        }
    };
    let prepared = super::engine(&settings)
        .and_then(|engine| super::vocabulary(&settings).map(|vocab| (engine, vocab)));
    let (engine, vocabulary) = match prepared {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return EXIT_USAGE;
        }
    };
    let rows = match read_rows(rows_path) {
        Ok(rows) => rows,
        Err(message) => {
            eprintln!("Input error: {message}");
            return EXIT_USAGE;
        }
    };
    let store = if dry_run {
        None
    } else {
        match RecordStore::open(&settings.records_db) {
            Ok(store) => Some(store),
            Err(e) => {
                eprintln!("Error: {e}");
                return EXIT_USAGE;
            }
        }
    };

    let mut failed = 0usize;
    for (index, row) in rows.iter().enumerate() {
        let number = index + 1;
        let record = build_record(row);
        let verdict = engine.validate(&record, &vocabulary);
        if !verdict.valid {
            failed += 1;
            println!("FAIL row {number}");
            for violation in &verdict.violations {
                println!("  {violation}");
            }
            continue;
        }
        match &store {
            None => println!("PASS row {number}"),
            Some(store) => match store.save(&record) {
                Ok(id) => println!("PASS row {number} -> {id}"),
                Err(e) => {
                    failed += 1;
                    println!("FAIL row {number}");
                    println!("  could not persist: {e}");
                }
            },
        }
    }

    let passed = rows.len() - failed;
    let verb = if dry_run { "validated" } else { "imported" };
    println!("\n{passed}/{} rows {verb}", rows.len());
    if failed > 0 { 1 } else { 0 }
}
