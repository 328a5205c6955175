//! Composes the three layers into one verdict.
//!
//! Order is fixed: structural, semantic, logical. Every layer always runs and
//! violations are concatenated in that order without reordering or dedup.

use crate::core::error::InputError;
use crate::core::invariants::check_invariants;
use crate::core::schema::RecordSchema;
use crate::core::semantic::SemanticChecker;
use crate::core::violation::{Layer, Verdict};
use crate::core::vocabulary::Vocabulary;
use serde_json::Value;
use std::sync::Arc;

/// A compiled schema plus semantic settings, shared across calls.
#[derive(Clone)]
pub struct Engine {
    schema: Arc<RecordSchema>,
    semantic: SemanticChecker,
}

impl Engine {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            semantic: SemanticChecker::default(),
        }
    }

    pub fn with_semantic(mut self, semantic: SemanticChecker) -> Self {
        self.semantic = semantic;
        self
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn validate(&self, record: &Value, vocabulary: &Vocabulary) -> Verdict {
        let mut violations = self.schema.validate_structural(record);
        violations.extend(self.semantic.check(record, vocabulary));
        violations.extend(check_invariants(record));
        let verdict = Verdict::from_violations(violations);
        tracing::debug!(
            valid = verdict.valid,
            structural = verdict.count(Layer::Structural),
            semantic = verdict.count(Layer::Semantic),
            logical = verdict.count(Layer::Logical),
            "validated record"
        );
        verdict
    }

    /// Parse a raw body first; unparseable input never reaches any layer.
    pub fn validate_str(&self, body: &str, vocabulary: &Vocabulary) -> Result<Verdict, InputError> {
        let record = parse_record(body)?;
        Ok(self.validate(&record, vocabulary))
    }
}

pub fn parse_record(body: &str) -> Result<Value, InputError> {
    Ok(serde_json::from_str(body)?)
}
