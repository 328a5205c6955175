use std::path::PathBuf;
use thiserror::Error;

/// The system is misconfigured. Distinct from "the record is invalid".
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("schema not found at {}", .0.display())]
    SchemaMissing(PathBuf),
    #[error("could not read schema {}: {source}", path.display())]
    SchemaUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("schema {} is not valid JSON: {source}", path.display())]
    SchemaNotJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("schema {origin} does not compile: {message}")]
    SchemaInvalid { origin: String, message: String },
    #[error("invalid value for {name}: {value:?}")]
    BadSetting { name: &'static str, value: String },
    #[error("no vocabulary store configured")]
    NoVocabularyStore,
    #[error("vocabulary store unavailable: {0}")]
    VocabularyUnavailable(String),
}

/// The caller's input could not be turned into a record.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Request body is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Rejections and failures from vocabulary operations.
///
/// Only [`VocabError::Backend`] means the storage tier itself failed; every
/// other variant is a domain rejection that must reach the caller unchanged.
#[derive(Debug, Error)]
pub enum VocabError {
    #[error("Category '{category}' not found in '{section}'.")]
    CategoryNotFound { section: String, category: String },
    #[error("'{term}' already exists in '{category}'.")]
    DuplicateTerm { category: String, term: String },
    #[error("Category '{category}' already exists in '{section}'.")]
    CategoryExists { section: String, category: String },
    #[error("{field} must not be empty.")]
    EmptyName { field: &'static str },
    #[error("vocabulary backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },
}

impl VocabError {
    pub fn backend(backend: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

/// Failures of the record persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("could not prepare record store at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stored record {id} is corrupt: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}
