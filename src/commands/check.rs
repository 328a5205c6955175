use super::EXIT_USAGE;
use crate::core::engine::parse_record;
use crate::core::error::InputError;
use crate::core::records::RecordStore;
use crate::core::settings::Overrides;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

fn read_body(path: Option<&Path>) -> Result<String, InputError> {
    match path {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).map_err(|source| InputError::Unreadable {
                path: p.to_path_buf(),
                source,
            })
        }
        _ => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .map_err(|source| InputError::Unreadable {
                    path: PathBuf::from("-"),
                    source,
                })?;
            Ok(body)
        }
    }
}

/// Validate one record (file or stdin) and print the verdict as JSON.
///
/// Exit 0 when valid, 1 when invalid, 2 when the input or configuration is unusable.
pub fn run(path: Option<PathBuf>, persist: bool, overrides: Overrides) -> i32 {
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

    let parsed = read_body(path.as_deref()).and_then(|body| parse_record(&body));
    let record = match parsed {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Input error: {e}");
            return EXIT_USAGE;
        }
    };

    let verdict = engine.validate(&record, &vocabulary);
    let mut response = verdict.to_response();
    if verdict.valid && persist {
        let saved = RecordStore::open(&settings.records_db)
            .and_then(|store| store.save(&record));
        match saved {
            Ok(id) => response["record_id"] = serde_json::Value::String(id),
            Err(e) => {
                eprintln!("Error: could not persist record: {e}");
                return EXIT_USAGE;
            }
        }
    }

    match serde_json::to_string_pretty(&response) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error: {e}");
            return EXIT_USAGE;
        }
    }
    if verdict.valid { 0 } else { 1 }
}
