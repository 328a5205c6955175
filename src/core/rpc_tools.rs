//! Tool implementations behind `isaac serve`.
//!
//! Payload shapes follow the record API: `{valid, errors}` for validation,
//! `{success, record_id}` or `{success: false, reason, ...}` for creation and
//! `{success, message}` for vocabulary edits. Misconfiguration is reported as
//! a [`ToolError`], never folded into a verdict.

use crate::core::engine::{Engine, parse_record};
use crate::core::records::RecordStore;
use crate::core::violation::{ROOT_PATH, Verdict};
use crate::core::vocab_store::{self, VocabularyBackend};
use crate::core::vocabulary::Vocabulary;
use serde_json::{Value, json};
use std::path::PathBuf;

pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const CONFIGURATION_ERROR: i32 = -32000;
pub const NOT_FOUND: i32 = -32004;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub code: i32,
    pub message: String,
}

impl ToolError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub type ToolResult = Result<Value, ToolError>;

pub struct Service {
    engine: Engine,
    vocabulary: Option<Box<dyn VocabularyBackend>>,
    records_db: PathBuf,
}

enum Body {
    Record(Value),
    NotJson(String),
}

impl Service {
    pub fn new(
        engine: Engine,
        vocabulary: Option<Box<dyn VocabularyBackend>>,
        records_db: PathBuf,
    ) -> Self {
        Self {
            engine,
            vocabulary,
            records_db,
        }
    }

    pub fn call(&self, tool: &str, args: &Value) -> ToolResult {
        match tool {
            "health" => Ok(self.health()),
            "validate_record" => self.validate_record(args),
            "create_record" => self.create_record(args),
            "list_records" => self.list_records(args),
            "get_record" => self.get_record(args),
            "list_vocabulary" => self.list_vocabulary(args),
            "add_category" => self.add_category(args),
            "add_term" => self.add_term(args),
            _ => Err(ToolError::new(METHOD_NOT_FOUND, format!("Unknown tool: {tool}"))),
        }
    }

    fn health(&self) -> Value {
        json!({
            "status": "healthy",
            "service": "isaac-records",
            "schema": self.engine.schema().title(),
            "vocabulary_store": self.vocabulary.as_ref().map(|v| v.name()),
        })
    }

    fn store(&self) -> Result<&dyn VocabularyBackend, ToolError> {
        self.vocabulary
            .as_deref()
            .ok_or_else(|| ToolError::new(CONFIGURATION_ERROR, "no vocabulary store configured"))
    }

    /// Without a store nothing is governed; a store that cannot load is a configuration error.
    fn snapshot(&self) -> Result<Vocabulary, ToolError> {
        match &self.vocabulary {
            None => Ok(Vocabulary::default()),
            Some(store) => vocab_store::load_snapshot(store.as_ref())
                .map_err(|e| ToolError::new(CONFIGURATION_ERROR, e.to_string())),
        }
    }

    fn body(args: &Value) -> Result<Body, ToolError> {
        match args.get("record") {
            None | Some(Value::Null) => Err(ToolError::new(INVALID_PARAMS, "Missing record")),
            Some(Value::String(raw)) => Ok(match parse_record(raw) {
                Ok(record) => Body::Record(record),
                Err(e) => Body::NotJson(e.to_string()),
            }),
            Some(record) => Ok(Body::Record(record.clone())),
        }
    }

    fn verify(&self, record: &Value) -> Result<Verdict, ToolError> {
        let vocabulary = self.snapshot()?;
        Ok(self.engine.validate(record, &vocabulary))
    }

    fn validate_record(&self, args: &Value) -> ToolResult {
        let record = match Self::body(args)? {
            Body::Record(record) => record,
            Body::NotJson(_) => {
                return Ok(json!({
                    "valid": false,
                    "reason": "invalid_json",
                    "errors": [{"path": ROOT_PATH, "message": "Request body is not valid JSON"}],
                }));
            }
        };
        Ok(self.verify(&record)?.to_response())
    }

    fn create_record(&self, args: &Value) -> ToolResult {
        let record = match Self::body(args)? {
            Body::Record(record) => record,
            Body::NotJson(message) => {
                return Ok(json!({
                    "success": false,
                    "reason": "invalid_json",
                    "message": message,
                }));
            }
        };
        let verdict = self.verify(&record)?;
        if !verdict.valid {
            return Ok(json!({
                "success": false,
                "reason": "validation_failed",
                "errors": verdict.violations,
            }));
        }
        match RecordStore::open(&self.records_db)
            .and_then(|store| store.save(&record))
        {
            Ok(id) => Ok(json!({"success": true, "record_id": id})),
            Err(e) => {
                tracing::error!(error = %e, "could not persist record");
                Ok(json!({
                    "success": false,
                    "reason": "database_error",
                    "message": e.to_string(),
                }))
            }
        }
    }

    fn list_records(&self, args: &Value) -> ToolResult {
        let limit = count_arg(args, "limit", 100)?;
        let offset = count_arg(args, "offset", 0)?;
        let rows = RecordStore::open(&self.records_db)
            .and_then(|store| store.list(limit, offset))
            .map_err(|e| ToolError::new(INTERNAL_ERROR, e.to_string()))?;
        Ok(json!(rows))
    }

    fn get_record(&self, args: &Value) -> ToolResult {
        let id = str_arg(args, "id")?;
        let found = RecordStore::open(&self.records_db)
            .and_then(|store| store.get(id))
            .map_err(|e| ToolError::new(INTERNAL_ERROR, e.to_string()))?;
        found.ok_or_else(|| ToolError::new(NOT_FOUND, "Record not found"))
    }

    fn list_vocabulary(&self, args: &Value) -> ToolResult {
        let vocabulary = vocab_store::load_snapshot(self.store()?)
            .map_err(|e| ToolError::new(CONFIGURATION_ERROR, e.to_string()))?;
        match args.get("section").and_then(Value::as_str) {
            Some(section) => Ok(vocabulary
                .categories(section)
                .map(|cats| json!(cats))
                .unwrap_or_else(|| json!({}))),
            None => Ok(json!(vocabulary)),
        }
    }

    fn add_category(&self, args: &Value) -> ToolResult {
        let section = str_arg(args, "section")?;
        let category = str_arg(args, "category")?;
        let description = args
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("");
        let outcome = vocab_store::add_category(self.store()?, section, category, description)
            .map_err(|e| ToolError::new(CONFIGURATION_ERROR, e.to_string()))?;
        Ok(json!(outcome))
    }

    fn add_term(&self, args: &Value) -> ToolResult {
        let section = str_arg(args, "section")?;
        let category = str_arg(args, "category")?;
        let term = str_arg(args, "term")?;
        let outcome = vocab_store::add_term(self.store()?, section, category, term)
            .map_err(|e| ToolError::new(CONFIGURATION_ERROR, e.to_string()))?;
        Ok(json!(outcome))
    }
}

fn str_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::new(INVALID_PARAMS, format!("Missing {name}")))
}

fn count_arg(args: &Value, name: &str, default: usize) -> Result<usize, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| ToolError::new(INVALID_PARAMS, "limit and offset must be integers")),
    }
}

pub fn tools_list() -> Value {
    let record_arg = json!({
        "description": "ISAAC record as a JSON object, or as a string holding JSON"
    });
    json!([
        {
            "name": "health",
            "description": "Report service status and the loaded schema",
            "inputSchema": {"type": "object", "properties": {}}
        },
        {
            "name": "validate_record",
            "description": "Run structural, semantic and logical validation without persisting",
            "inputSchema": {
                "type": "object",
                "required": ["record"],
                "properties": {"record": record_arg}
            }
        },
        {
            "name": "create_record",
            "description": "Validate a record and persist it when every layer passes",
            "inputSchema": {
                "type": "object",
                "required": ["record"],
                "properties": {"record": record_arg}
            }
        },
        {
            "name": "list_records",
            "description": "List persisted record metadata, newest first",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "minimum": 0},
                    "offset": {"type": "integer", "minimum": 0}
                }
            }
        },
        {
            "name": "get_record",
            "description": "Fetch a persisted record by its ULID",
            "inputSchema": {
                "type": "object",
                "required": ["id"],
                "properties": {"id": {"type": "string"}}
            }
        },
        {
            "name": "list_vocabulary",
            "description": "Show the controlled vocabulary, optionally one section",
            "inputSchema": {
                "type": "object",
                "properties": {"section": {"type": "string"}}
            }
        },
        {
            "name": "add_category",
            "description": "Create an empty vocabulary category",
            "inputSchema": {
                "type": "object",
                "required": ["section", "category"],
                "properties": {
                    "section": {"type": "string"},
                    "category": {"type": "string"},
                    "description": {"type": "string"}
                }
            }
        },
        {
            "name": "add_term",
            "description": "Append an allowed term to a vocabulary category",
            "inputSchema": {
                "type": "object",
                "required": ["section", "category", "term"],
                "properties": {
                    "section": {"type": "string"},
                    "category": {"type": "string"},
                    "term": {"type": "string"}
                }
            }
        }
    ])
}
