use serde::{Deserialize, Serialize};
use std::fmt;

/// Location used when a violation applies to the whole document.
pub const ROOT_PATH: &str = "(root)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Structural,
    Semantic,
    Logical,
}

impl Layer {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Semantic => "semantic",
            Self::Logical => "logical",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub layer: Layer,
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(layer: Layer, path: impl Into<String>, message: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            layer,
            path: if path.is_empty() {
                ROOT_PATH.to_string()
            } else {
                path
            },
            message: message.into(),
        }
    }

    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Layer::Structural, path, message)
    }

    pub fn semantic(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Layer::Semantic, path, message)
    }

    pub fn logical(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Layer::Logical, path, message)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.layer, self.path, self.message)
    }
}

/// Aggregate outcome of one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl Verdict {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    pub fn in_layer(&self, layer: Layer) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.layer == layer)
    }

    pub fn count(&self, layer: Layer) -> usize {
        self.in_layer(layer).count()
    }

    /// The `{valid, errors: [{layer, path, message}]}` shape returned to callers.
    pub fn to_response(&self) -> serde_json::Value {
        if self.valid {
            serde_json::json!({"valid": true, "errors": []})
        } else {
            serde_json::json!({"valid": false, "errors": self.violations})
        }
    }
}
