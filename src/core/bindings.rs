//! The hand-maintained table binding record fields to vocabulary categories.
//!
//! Vocabulary keys are curated independently of the schema, so this table is
//! never derived from it. Field patterns are dotted paths where a `[*]`
//! suffix walks every element of an array.

use serde_json::Value;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    EachItem,
}

/// A compiled field pattern such as `measurement.series[*].channels[*].role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        for part in pattern.split('.').filter(|p| !p.is_empty()) {
            let mut rest = part;
            let mut wildcards = 0;
            while let Some(stripped) = rest.strip_suffix("[*]") {
                rest = stripped;
                wildcards += 1;
            }
            if !rest.is_empty() {
                segments.push(Segment::Key(rest.to_string()));
            }
            segments.extend(std::iter::repeat_n(Segment::EachItem, wildcards));
        }
        Self { segments }
    }

    /// Every concrete location matching the pattern, rendered as
    /// `measurement.series[0].channels[1].role`. Absent and `null` values are skipped.
    pub fn resolve<'a>(&self, record: &'a Value) -> Vec<(String, &'a Value)> {
        let mut frontier: Vec<(String, &'a Value)> = vec![(String::new(), record)];
        for segment in &self.segments {
            let mut next = Vec::new();
            for (path, value) in frontier {
                match segment {
                    Segment::Key(key) => {
                        if let Some(child) = value.get(key.as_str()) {
                            let child_path = if path.is_empty() {
                                key.clone()
                            } else {
                                format!("{path}.{key}")
                            };
                            next.push((child_path, child));
                        }
                    }
                    Segment::EachItem => {
                        if let Some(items) = value.as_array() {
                            for (i, item) in items.iter().enumerate() {
                                next.push((format!("{path}[{i}]"), item));
                            }
                        }
                    }
                }
            }
            frontier = next;
        }
        frontier.retain(|(_, v)| !v.is_null());
        frontier
    }
}

/// One row of the binding table.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Section searched first; other sections are consulted if it lacks the key.
    pub section: &'static str,
    pub category: &'static str,
    field: FieldPath,
}

impl Binding {
    pub fn new(pattern: &'static str, section: &'static str, category: &'static str) -> Self {
        Self {
            section,
            category,
            field: FieldPath::parse(pattern),
        }
    }

    pub fn resolve<'a>(&self, record: &'a Value) -> Vec<(String, &'a Value)> {
        self.field.resolve(record)
    }
}

static DEFAULT_BINDINGS: LazyLock<Vec<Binding>> = LazyLock::new(|| {
    vec![
        Binding::new("record_type", "Record Info", "record_type"),
        Binding::new(
            "system.instrument.instrument_type",
            "system",
            "system.instrument.instrument_type",
        ),
        Binding::new(
            "system.simulation.method",
            "system",
            "system.simulation.method",
        ),
        Binding::new(
            "measurement.series[*].channels[*].role",
            "measurement",
            "measurement.series.channels.role",
        ),
        Binding::new("links[*].rel", "links", "links.rel"),
        Binding::new("assets[*].content_role", "assets", "assets.content_role"),
        Binding::new("context.environment", "Context", "context.environment"),
        Binding::new(
            "context.electrochemistry.cell_type",
            "Context",
            "context.electrochemistry.cell_type",
        ),
        Binding::new(
            "context.electrochemistry.potential_scale",
            "Context",
            "context.electrochemistry.potential_scale",
        ),
        Binding::new(
            "context.electrochemistry.reaction",
            "Context",
            "context.electrochemistry.reaction",
        ),
        Binding::new(
            "context.transport.flow_mode",
            "Context",
            "context.transport.flow_mode",
        ),
        Binding::new("sample.sample_form", "Sample", "sample.sample_form"),
    ]
});

pub fn default_bindings() -> &'static [Binding] {
    &DEFAULT_BINDINGS
}
