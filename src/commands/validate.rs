use crate::core::engine::Engine;
use crate::core::schema::RecordSchema;
use crate::core::settings::{DEFAULT_SCHEMA_PATH, Overrides};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub const DEFAULT_RECORDS_DIR: &str = "records";

fn find_record_files(dir: &Path) -> Vec<PathBuf> {
    let mut results = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.ends_with(".json"))
        {
            results.push(entry.into_path());
        }
    }
    results.sort();
    results
}

/// Batch mode always reads the schema from disk; the bundled copy is not a fallback here.
pub fn run(path: Option<PathBuf>, overrides: Overrides) -> i32 {
    let settings = match super::settings(overrides) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let schema_path = settings
        .schema_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_PATH));
    let schema = match RecordSchema::load(&schema_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let target = path.unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDS_DIR));
    let files = if target.is_dir() {
        find_record_files(&target)
    } else if target.is_file() {
        vec![target.clone()]
    } else {
        eprintln!("Error: path not found: {}", target.display());
        return 1;
    };
    if files.is_empty() {
        eprintln!("Error: no .json records found in {}", target.display());
        return 1;
    }

    let vocabulary = match super::vocabulary(&settings) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let engine = Engine::new(schema).with_semantic(super::semantic_checker(&settings));

    let mut failed = 0usize;
    for file in &files {
        let shown = file.display();
        let content = match fs::read_to_string(file) {
            Ok(c) => c,
            Err(e) => {
                println!("FAIL {shown}");
                println!("  Could not read file: {e}");
                failed += 1;
                continue;
            }
        };
        match engine.validate_str(&content, &vocabulary) {
            Ok(verdict) if verdict.valid => println!("PASS {shown}"),
            Ok(verdict) => {
                failed += 1;
                println!("FAIL {shown}");
                for violation in &verdict.violations {
                    println!("  {violation}");
                }
            }
            Err(e) => {
                failed += 1;
                println!("FAIL {shown}");
                println!("  {e}");
            }
        }
    }

    let passed = files.len() - failed;
    println!("\n{passed}/{} records passed", files.len());
    if failed > 0 { 1 } else { 0 }
}
