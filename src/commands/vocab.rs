use super::EXIT_USAGE;
use crate::core::error::ConfigError;
use crate::core::settings::Overrides;
use crate::core::vocab_store::{self, FileBackend, SqliteBackend, VocabularyBackend};

fn open(overrides: Overrides) -> Result<Box<dyn VocabularyBackend>, i32> {
    let settings = super::settings(overrides).map_err(|e| {
        eprintln!("Configuration error: {e}");
        EXIT_USAGE
    })?;
    vocab_store::open_store(&settings).map_err(|e| {
        eprintln!("Configuration error: {e}");
        EXIT_USAGE
    })
}

pub fn list(section: Option<String>, overrides: Overrides) -> i32 {
    let store = match open(overrides) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let vocabulary = match vocab_store::load_snapshot(store.as_ref()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return EXIT_USAGE;
        }
    };

    let sections: Vec<&str> = match section.as_deref() {
        Some(name) if vocabulary.categories(name).is_none() => {
            eprintln!("Error: section '{name}' not found");
            return 1;
        }
        Some(name) => vec![name],
        None => vocabulary.sections().collect(),
    };
    for name in sections {
        println!("{name}");
        for (key, category) in vocabulary.categories(name).into_iter().flatten() {
            println!("  {key}: {}", category.values.join(", "));
        }
    }
    0
}

pub fn add_category(
    section: &str,
    category: &str,
    description: &str,
    overrides: Overrides,
) -> i32 {
    let store = match open(overrides) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let result = vocab_store::add_category(store.as_ref(), section, category, description);
    report(result)
}

pub fn add_term(section: &str, category: &str, term: &str, overrides: Overrides) -> i32 {
    let store = match open(overrides) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let result = vocab_store::add_term(store.as_ref(), section, category, term);
    report(result)
}

fn report(result: Result<vocab_store::EditOutcome, ConfigError>) -> i32 {
    match result {
        Ok(outcome) if outcome.success => {
            println!("{}", outcome.message);
            0
        }
        Ok(outcome) => {
            eprintln!("Error: {}", outcome.message);
            1
        }
        Err(e) => {
            eprintln!("Configuration error: {e}");
            EXIT_USAGE
        }
    }
}

/// Copy the file tier into the database tier.
pub fn sync(overrides: Overrides) -> i32 {
    let settings = match super::settings(overrides) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return EXIT_USAGE;
        }
    };
    let (Some(file), Some(db)) = (settings.vocab_path.as_ref(), settings.vocab_db.as_ref()) else {
        eprintln!("Error: sync needs both a vocabulary file (--vocab) and a database (--vocab-db)");
        return EXIT_USAGE;
    };

    let source = FileBackend::new(file);
    let target = SqliteBackend::new(db);
    match source.load() {
        Ok(v) if v.is_empty() => {
            eprintln!("Error: {} has no categories to sync", file.display());
            return 1;
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    }
    match vocab_store::copy_vocabulary(&source, &target) {
        Ok(count) => {
            tracing::info!(
                count,
                from = %file.display(),
                to = %db.display(),
                "synced vocabulary"
            );
            println!(
                "Synced {count} categories from {} to {}",
                file.display(),
                db.display()
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}
