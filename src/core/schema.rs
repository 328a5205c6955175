use crate::core::error::ConfigError;
use crate::core::violation::{ROOT_PATH, Violation};
use jsonschema::Validator;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

const SCHEMA_STR: &str = include_str!("../../schema/isaac_record_v1.json");

static BUNDLED: OnceLock<Arc<RecordSchema>> = OnceLock::new();

/// A compiled, immutable record schema (Draft 2020-12).
pub struct RecordSchema {
    title: String,
    validator: Validator,
}

impl std::fmt::Debug for RecordSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSchema")
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl RecordSchema {
    /// The schema shipped inside the binary.
    pub fn bundled() -> Arc<RecordSchema> {
        BUNDLED
            .get_or_init(|| {
                let doc: Value =
                    serde_json::from_str(SCHEMA_STR).expect("bundled schema is valid JSON");
                Arc::new(
                    RecordSchema::compile(&doc, "bundled")
                        .expect("bundled schema compiles to a valid validator"),
                )
            })
            .clone()
    }

    /// Read, parse and compile a schema file. Every failure here is fatal for the caller.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::SchemaMissing(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::SchemaUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: Value =
            serde_json::from_str(&content).map_err(|source| ConfigError::SchemaNotJson {
                path: path.to_path_buf(),
                source,
            })?;
        let schema = Self::compile(&doc, &path.display().to_string())?;
        tracing::info!(title = %schema.title, path = %path.display(), "loaded record schema");
        Ok(schema)
    }

    /// Load from `path`, or fall back to the bundled schema when no path is configured.
    pub fn resolve(path: Option<&Path>) -> Result<Arc<Self>, ConfigError> {
        match path {
            Some(p) => Self::load(p).map(Arc::new),
            None => Ok(Self::bundled()),
        }
    }

    pub fn compile(doc: &Value, origin: &str) -> Result<Self, ConfigError> {
        let validator =
            jsonschema::draft202012::new(doc).map_err(|e| ConfigError::SchemaInvalid {
                origin: origin.to_string(),
                message: e.to_string(),
            })?;
        let title = doc
            .get("title")
            .or_else(|| doc.get("$id"))
            .and_then(Value::as_str)
            .unwrap_or("untitled schema")
            .to_string();
        Ok(Self { title, validator })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Every structural violation of `record`, in the order the validator reports them.
    pub fn validate_structural(&self, record: &Value) -> Vec<Violation> {
        self.validator
            .iter_errors(record)
            .map(|err| {
                let path = render_pointer(&err.instance_path().to_string());
                Violation::structural(path, err.to_string())
            })
            .collect()
    }
}

/// `/measurement/series/0` -> `measurement/series/0`; the empty pointer -> `(root)`.
fn render_pointer(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        return ROOT_PATH.to_string();
    }
    trimmed
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join("/")
}
