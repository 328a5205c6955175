//! Vocabulary persistence tiers.
//!
//! Every backend implements [`VocabularyBackend`]. Mutations are
//! read-modify-write under a lock scoped to the backend and persist
//! atomically, so a concurrent reader sees either the old or the new
//! snapshot and never a partial one. [`FallbackBackend`] chains a primary
//! tier (the SQLite database) to a secondary one (the JSON file) and only
//! degrades on backend failures, never on domain rejections.

use crate::core::error::{ConfigError, VocabError};
use crate::core::settings::Settings;
use crate::core::vocabulary::{Category, Vocabulary};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

pub trait VocabularyBackend: Send + Sync {
    fn name(&self) -> &str;
    fn load(&self) -> Result<Vocabulary, VocabError>;
    fn save(&self, vocabulary: &Vocabulary) -> Result<(), VocabError>;
    fn add_term(&self, section: &str, category: &str, term: &str) -> Result<String, VocabError>;
    fn add_category(
        &self,
        section: &str,
        category: &str,
        description: &str,
    ) -> Result<String, VocabError>;
}

/// `(success, message)` result of a vocabulary edit call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    pub success: bool,
    pub message: String,
}

/// Domain rejections become an unsuccessful outcome. A store that cannot be
/// reached is a configuration error and never looks like a rejection.
fn settle(
    store: &dyn VocabularyBackend,
    op: &'static str,
    result: Result<String, VocabError>,
) -> Result<EditOutcome, ConfigError> {
    match result {
        Ok(message) => {
            tracing::info!(op, store = store.name(), "{message}");
            Ok(EditOutcome {
                success: true,
                message,
            })
        }
        Err(e) if e.is_backend_failure() => {
            tracing::error!(
                op,
                store = store.name(),
                error = %e,
                "vocabulary store unreachable"
            );
            Err(ConfigError::VocabularyUnavailable(e.to_string()))
        }
        Err(e) => {
            tracing::info!(op, error = %e, "vocabulary edit rejected");
            Ok(EditOutcome {
                success: false,
                message: e.to_string(),
            })
        }
    }
}

pub fn add_term(
    store: &dyn VocabularyBackend,
    section: &str,
    category: &str,
    term: &str,
) -> Result<EditOutcome, ConfigError> {
    let result = store.add_term(section, category, term);
    settle(store, "add_term", result)
}

pub fn add_category(
    store: &dyn VocabularyBackend,
    section: &str,
    category: &str,
    description: &str,
) -> Result<EditOutcome, ConfigError> {
    let result = store.add_category(section, category, description);
    settle(store, "add_category", result)
}

/// Build the configured chain: database over file, either alone, or an error if neither.
pub fn open_store(settings: &Settings) -> Result<Box<dyn VocabularyBackend>, ConfigError> {
    let db = settings
        .vocab_db
        .as_ref()
        .map(|p| Box::new(SqliteBackend::new(p)) as Box<dyn VocabularyBackend>);
    let file = settings
        .vocab_path
        .as_ref()
        .map(|p| Box::new(FileBackend::new(p)) as Box<dyn VocabularyBackend>);
    match (db, file) {
        (Some(primary), Some(secondary)) => {
            Ok(Box::new(FallbackBackend::new(primary, secondary)))
        }
        (Some(only), None) | (None, Some(only)) => Ok(only),
        (None, None) => Err(ConfigError::NoVocabularyStore),
    }
}

/// Snapshot for a validation call. A tier failure with nothing behind it is a configuration error.
pub fn load_snapshot(store: &dyn VocabularyBackend) -> Result<Vocabulary, ConfigError> {
    store
        .load()
        .map_err(|e| ConfigError::VocabularyUnavailable(e.to_string()))
}

/// Replace `to` with the contents of `from`; returns the number of categories copied.
pub fn copy_vocabulary(
    from: &dyn VocabularyBackend,
    to: &dyn VocabularyBackend,
) -> Result<usize, VocabError> {
    let vocab = from.load()?;
    to.save(&vocab)?;
    Ok(vocab.category_count())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Isolated store for tests; nothing touches disk.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryBackend {
    inner: parking_lot::RwLock<Vocabulary>,
}

#[cfg(test)]
impl MemoryBackend {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            inner: parking_lot::RwLock::new(vocabulary),
        }
    }
}

#[cfg(test)]
impl VocabularyBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> Result<Vocabulary, VocabError> {
        Ok(self.inner.read().clone())
    }

    fn save(&self, vocabulary: &Vocabulary) -> Result<(), VocabError> {
        *self.inner.write() = vocabulary.clone();
        Ok(())
    }

    fn add_term(&self, section: &str, category: &str, term: &str) -> Result<String, VocabError> {
        self.inner.write().add_term(section, category, term)
    }

    fn add_category(
        &self,
        section: &str,
        category: &str,
        description: &str,
    ) -> Result<String, VocabError> {
        self.inner
            .write()
            .add_category(section, category, description)
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_backoff_ms: 25,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Removes the advisory lock file when the mutation finishes.
struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

pub struct FileBackend {
    path: PathBuf,
    retry: RetryPolicy,
    writer: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retry: RetryPolicy::default(),
            writer: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "vocabulary.json".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn err(&self, message: impl std::fmt::Display) -> VocabError {
        VocabError::backend(format!("file:{}", self.path.display()), message)
    }

    fn acquire_lock(&self) -> Result<LockGuard, VocabError> {
        let lock_path = self.sibling(".lock");
        for attempt in 1..=self.retry.max_attempts {
            match OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&lock_path)
            {
                Ok(_) => return Ok(LockGuard { path: lock_path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    thread::sleep(self.retry.delay_for_attempt(attempt));
                }
                Err(e) => return Err(self.err(format!("could not create lock file: {e}"))),
            }
        }
        Err(self.err(format!(
            "lock {} still held after {} attempts",
            lock_path.display(),
            self.retry.max_attempts
        )))
    }

    fn write_atomic(&self, vocabulary: &Vocabulary) -> Result<(), VocabError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.err(e))?;
        }
        let content = vocabulary.to_pretty_json().map_err(|e| self.err(e))?;
        let tmp = self.sibling(".tmp");
        let mut file = File::create(&tmp).map_err(|e| self.err(e))?;
        file.write_all(content.as_bytes()).map_err(|e| self.err(e))?;
        file.sync_all().map_err(|e| self.err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.err(e))
    }

    fn mutate(
        &self,
        op: impl FnOnce(&mut Vocabulary) -> Result<String, VocabError>,
    ) -> Result<String, VocabError> {
        let _local = self.writer.lock();
        let _lock = self.acquire_lock()?;
        let mut vocab = self.load()?;
        let message = op(&mut vocab)?;
        self.write_atomic(&vocab)?;
        Ok(message)
    }
}

impl VocabularyBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self) -> Result<Vocabulary, VocabError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Vocabulary::from_json_str(&content).map_err(|e| self.err(e)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.path.display(),
                    "vocabulary file does not exist, treating it as empty"
                );
                Ok(Vocabulary::default())
            }
            Err(e) => Err(self.err(e)),
        }
    }

    fn save(&self, vocabulary: &Vocabulary) -> Result<(), VocabError> {
        let _local = self.writer.lock();
        let _lock = self.acquire_lock()?;
        self.write_atomic(vocabulary)
    }

    fn add_term(&self, section: &str, category: &str, term: &str) -> Result<String, VocabError> {
        self.mutate(|v| v.add_term(section, category, term))
    }

    fn add_category(
        &self,
        section: &str,
        category: &str,
        description: &str,
    ) -> Result<String, VocabError> {
        self.mutate(|v| v.add_category(section, category, description))
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// Database tier. One row per category, terms stored as a JSON array.
///
/// Opens a fresh connection per operation; `Connection` is not `Sync`.
/// The parent directory is never created: a missing directory means the
/// tier is unreachable and the chain falls back.
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn err(&self, message: impl std::fmt::Display) -> VocabError {
        VocabError::backend(format!("sqlite:{}", self.path.display()), message)
    }

    fn connect(&self) -> Result<Connection, VocabError> {
        let conn = Connection::open(&self.path).map_err(|e| self.err(e))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| self.err(e))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vocabulary (
                section TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                terms TEXT NOT NULL DEFAULT '[]',
                PRIMARY KEY (section, category)
            );",
        )
        .map_err(|e| self.err(e))?;
        Ok(conn)
    }

    fn parse_terms(&self, raw: &str) -> Result<Vec<String>, VocabError> {
        serde_json::from_str(raw).map_err(|e| self.err(format!("corrupt terms column: {e}")))
    }
}

impl VocabularyBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self) -> Result<Vocabulary, VocabError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT section, category, description, terms FROM vocabulary
                 ORDER BY section, category",
            )
            .map_err(|e| self.err(e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| self.err(e))?;

        let mut vocab = Vocabulary::default();
        for row in rows {
            let (section, category, description, terms) = row.map_err(|e| self.err(e))?;
            let values = self.parse_terms(&terms)?;
            vocab.insert_category(
                &section,
                &category,
                Category {
                    description,
                    values,
                },
            );
        }
        Ok(vocab)
    }

    fn save(&self, vocabulary: &Vocabulary) -> Result<(), VocabError> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| self.err(e))?;
        tx.execute("DELETE FROM vocabulary", [])
            .map_err(|e| self.err(e))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO vocabulary (section, category, description, terms)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| self.err(e))?;
            for (section, key, cat) in vocabulary.iter() {
                let terms = serde_json::to_string(&cat.values).map_err(|e| self.err(e))?;
                stmt.execute(params![section, key, cat.description, terms])
                    .map_err(|e| self.err(e))?;
            }
        }
        tx.commit().map_err(|e| self.err(e))
    }

    fn add_term(&self, section: &str, category: &str, term: &str) -> Result<String, VocabError> {
        if term.trim().is_empty() {
            return Err(VocabError::EmptyName { field: "term" });
        }
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| self.err(e))?;
        let raw: Option<String> = tx
            .query_row(
                "SELECT terms FROM vocabulary WHERE section = ?1 AND category = ?2",
                params![section, category],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| self.err(e))?;
        let Some(raw) = raw else {
            return Err(VocabError::CategoryNotFound {
                section: section.to_string(),
                category: category.to_string(),
            });
        };
        let mut terms = self.parse_terms(&raw)?;
        if terms.iter().any(|t| t == term) {
            return Err(VocabError::DuplicateTerm {
                category: category.to_string(),
                term: term.to_string(),
            });
        }
        terms.push(term.to_string());
        let encoded = serde_json::to_string(&terms).map_err(|e| self.err(e))?;
        tx.execute(
            "UPDATE vocabulary SET terms = ?1 WHERE section = ?2 AND category = ?3",
            params![encoded, section, category],
        )
        .map_err(|e| self.err(e))?;
        tx.commit().map_err(|e| self.err(e))?;
        Ok(format!("Added '{term}' to '{category}'."))
    }

    fn add_category(
        &self,
        section: &str,
        category: &str,
        description: &str,
    ) -> Result<String, VocabError> {
        if section.trim().is_empty() {
            return Err(VocabError::EmptyName { field: "section" });
        }
        if category.trim().is_empty() {
            return Err(VocabError::EmptyName { field: "category" });
        }
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| self.err(e))?;
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO vocabulary (section, category, description, terms)
                 VALUES (?1, ?2, ?3, '[]')",
                params![section, category, description],
            )
            .map_err(|e| self.err(e))?;
        if inserted == 0 {
            return Err(VocabError::CategoryExists {
                section: section.to_string(),
                category: category.to_string(),
            });
        }
        tx.commit().map_err(|e| self.err(e))?;
        Ok(format!("Created category '{category}' in '{section}'."))
    }
}

// ---------------------------------------------------------------------------
// Fallback chain
// ---------------------------------------------------------------------------

pub struct FallbackBackend {
    primary: Box<dyn VocabularyBackend>,
    secondary: Box<dyn VocabularyBackend>,
    name: String,
}

impl FallbackBackend {
    pub fn new(
        primary: Box<dyn VocabularyBackend>,
        secondary: Box<dyn VocabularyBackend>,
    ) -> Self {
        let name = format!("{}->{}", primary.name(), secondary.name());
        Self {
            primary,
            secondary,
            name,
        }
    }

    #[cfg(test)]
    pub fn secondary(&self) -> &dyn VocabularyBackend {
        self.secondary.as_ref()
    }

    fn attempt<T>(
        &self,
        op: &'static str,
        call: impl Fn(&dyn VocabularyBackend) -> Result<T, VocabError>,
    ) -> Result<T, VocabError> {
        match call(self.primary.as_ref()) {
            Err(e) if e.is_backend_failure() => {
                tracing::warn!(
                    op,
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    error = %e,
                    "primary vocabulary store failed, falling back"
                );
                call(self.secondary.as_ref())
            }
            other => other,
        }
    }
}

impl VocabularyBackend for FallbackBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vocabulary, VocabError> {
        self.attempt("load", |b| b.load())
    }

    fn save(&self, vocabulary: &Vocabulary) -> Result<(), VocabError> {
        self.attempt("save", |b| b.save(vocabulary))
    }

    fn add_term(&self, section: &str, category: &str, term: &str) -> Result<String, VocabError> {
        self.attempt("add_term", |b| b.add_term(section, category, term))
    }

    fn add_category(
        &self,
        section: &str,
        category: &str,
        description: &str,
    ) -> Result<String, VocabError> {
        self.attempt("add_category", |b| {
            b.add_category(section, category, description)
        })
    }
}
