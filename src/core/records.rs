use crate::core::error::StoreError;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

/// Metadata row returned by [`RecordStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub id: String,
    pub record_id: Option<String>,
    pub record_type: Option<String>,
    pub record_domain: Option<String>,
    pub blake3_hash: String,
    pub created_at: i64,
}

/// SQLite persistence for records that passed every layer.
///
/// Storage ids are ULIDs assigned here, so they sort by creation time. A
/// `Connection` is opened per call; it is not `Sync`.
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Create the parent directory and table if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let store = Self {
            path: path.to_path_buf(),
        };
        store.connect()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                record_id TEXT,
                record_type TEXT,
                record_domain TEXT,
                blake3_hash TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );",
        )?;
        Ok(conn)
    }

    /// Persist `record` and return its generated ULID.
    pub fn save(&self, record: &Value) -> Result<String, StoreError> {
        let id = Ulid::new().to_string();
        let body = record.to_string();
        let hash = blake3::hash(body.as_bytes()).to_hex().to_string();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let field = |key: &str| record.get(key).and_then(Value::as_str).map(String::from);

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO records (id, record_id, record_type, record_domain, blake3_hash, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                field("record_id"),
                field("record_type"),
                field("record_domain"),
                hash,
                body,
                now
            ],
        )?;
        tracing::info!(id = %id, record_id = ?field("record_id"), "persisted record");
        Ok(id)
    }

    /// Newest first.
    pub fn list(&self, limit: usize, offset: usize) -> Result<Vec<RecordSummary>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, record_id, record_type, record_domain, blake3_hash, created_at
             FROM records ORDER BY id DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], |row| {
            Ok(RecordSummary {
                id: row.get(0)?,
                record_id: row.get(1)?,
                record_type: row.get(2)?,
                record_domain: row.get(3)?,
                blake3_hash: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get(&self, id: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.connect()?;
        let body: Option<String> = conn
            .query_row("SELECT body FROM records WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        body.map(|b| {
            serde_json::from_str(&b).map_err(|source| StoreError::Corrupt {
                id: id.to_string(),
                source,
            })
        })
        .transpose()
    }

    #[cfg(test)]
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn save_assigns_sortable_ids_and_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db").join("records.db");
        let store = RecordStore::open(&path).unwrap();
        let first = json!({"record_id": "A", "record_type": "evidence"});
        let a = store.save(&first).unwrap();
        let b = store.save(&json!({"record_id": "B"})).unwrap();

        assert_eq!(a.len(), 26);
        assert!(Ulid::from_string(&a).is_ok());
        assert_ne!(a, b);
        assert_eq!(store.get(&a).unwrap(), Some(first));
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn list_pages_newest_first() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::open(&tmp.path().join("records.db")).unwrap();
        let ids: Vec<_> = (0..3)
            .map(|i| store.save(&json!({"record_id": format!("R{i}")})).unwrap())
            .collect();
        let page = store.list(2, 0).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, *ids.iter().max().unwrap());
        assert_eq!(store.list(10, 2).unwrap().len(), 1);
        assert_eq!(page[0].blake3_hash.len(), 64);
    }

    #[test]
    fn unknown_id_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::open(&tmp.path().join("records.db")).unwrap();
        assert!(store.get("01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap().is_none());
    }
}
