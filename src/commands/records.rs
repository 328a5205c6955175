use super::EXIT_USAGE;
use crate::core::records::RecordStore;
use crate::core::settings::Overrides;
use serde::Serialize;

fn open(overrides: Overrides) -> Result<RecordStore, i32> {
    let settings = super::settings(overrides).map_err(|e| {
        eprintln!("Configuration error: {e}");
        EXIT_USAGE
    })?;
    RecordStore::open(&settings.records_db).map_err(|e| {
        eprintln!("Error: {e}");
        EXIT_USAGE
    })
}

fn print_json(value: &impl Serialize) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_USAGE
        }
    }
}

pub fn list(limit: usize, offset: usize, overrides: Overrides) -> i32 {
    let store = match open(overrides) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match store.list(limit, offset) {
        Ok(rows) => print_json(&rows),
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_USAGE
        }
    }
}

pub fn get(id: &str, overrides: Overrides) -> i32 {
    let store = match open(overrides) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match store.get(id) {
        Ok(Some(record)) => print_json(&record),
        Ok(None) => {
            eprintln!("Record not found: {id}");
            1
        }
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_USAGE
        }
    }
}
