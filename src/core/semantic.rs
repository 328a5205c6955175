use crate::core::bindings::{Binding, FieldPath, default_bindings};
use crate::core::violation::Violation;
use crate::core::vocabulary::Vocabulary;
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_MAX_LISTED: usize = 25;

/// What to do with a bound field whose category the vocabulary does not define yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UngovernedPolicy {
    /// Not yet governed: vocabulary growth never fails unrelated records.
    #[default]
    Skip,
    /// Governance freeze: every bound value needs a defined category.
    Reject,
}

/// Maps a categorical descriptor name to the `(section hint, category key)` governing its value.
pub trait DescriptorBinding: Send + Sync {
    fn category_for(&self, descriptor_name: &str) -> Option<(String, String)>;
}

/// Governs no descriptor.
pub struct NoDescriptorBindings;

impl DescriptorBinding for NoDescriptorBindings {
    fn category_for(&self, _descriptor_name: &str) -> Option<(String, String)> {
        None
    }
}

/// Governs descriptor `name` by category `descriptors.<name>` in one section.
pub struct NamespacedDescriptors {
    section: String,
}

impl NamespacedDescriptors {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
        }
    }
}

impl DescriptorBinding for NamespacedDescriptors {
    fn category_for(&self, descriptor_name: &str) -> Option<(String, String)> {
        Some((self.section.clone(), format!("descriptors.{descriptor_name}")))
    }
}

#[derive(Clone)]
pub struct SemanticChecker {
    bindings: Vec<Binding>,
    descriptors: Arc<dyn DescriptorBinding>,
    policy: UngovernedPolicy,
    max_listed: usize,
}

impl Default for SemanticChecker {
    fn default() -> Self {
        Self {
            bindings: default_bindings().to_vec(),
            descriptors: Arc::new(NoDescriptorBindings),
            policy: UngovernedPolicy::Skip,
            max_listed: DEFAULT_MAX_LISTED,
        }
    }
}

impl SemanticChecker {
    pub fn with_policy(mut self, policy: UngovernedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_descriptor_binding(mut self, binding: Arc<dyn DescriptorBinding>) -> Self {
        self.descriptors = binding;
        self
    }

    /// Check every bound value present in `record` against `vocabulary`.
    ///
    /// Runs on any JSON, structurally valid or not.
    pub fn check(&self, record: &Value, vocabulary: &Vocabulary) -> Vec<Violation> {
        let mut out = Vec::new();
        for binding in &self.bindings {
            for (path, value) in binding.resolve(record) {
                self.check_value(
                    &path,
                    value,
                    binding.section,
                    binding.category,
                    vocabulary,
                    &mut out,
                );
            }
        }
        self.check_descriptors(record, vocabulary, &mut out);
        out
    }

    fn check_descriptors(&self, record: &Value, vocabulary: &Vocabulary, out: &mut Vec<Violation>) {
        let descriptors = FieldPath::parse("descriptors.outputs[*].descriptors[*]");
        for (path, descriptor) in descriptors.resolve(record) {
            if descriptor.get("kind").and_then(Value::as_str) != Some("categorical") {
                continue;
            }
            let Some(name) = descriptor.get("name").and_then(Value::as_str) else {
                continue;
            };
            let Some((section, category)) = self.descriptors.category_for(name) else {
                continue;
            };
            let Some(value) = descriptor.get("value").filter(|v| !v.is_null()) else {
                continue;
            };
            self.check_value(
                &format!("{path}.value"),
                value,
                &section,
                &category,
                vocabulary,
                out,
            );
        }
    }

    fn check_value(
        &self,
        path: &str,
        value: &Value,
        section: &str,
        category: &str,
        vocabulary: &Vocabulary,
        out: &mut Vec<Violation>,
    ) {
        let term = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match vocabulary.find_category(section, category) {
            Some((_, cat)) => {
                if !cat.allows(&term) {
                    out.push(Violation::semantic(
                        path,
                        format!(
                            "Value '{term}' at '{path}' is not in allowed vocabulary for {category}: {}",
                            render_allowed(&cat.values, self.max_listed)
                        ),
                    ));
                }
            }
            None if self.policy == UngovernedPolicy::Reject => {
                out.push(Violation::semantic(
                    path,
                    format!(
                        "Value '{term}' at '{path}' has no vocabulary category '{category}' to govern it"
                    ),
                ));
            }
            None => {}
        }
    }
}

fn render_allowed(values: &[String], max: usize) -> String {
    let shown: Vec<String> = values.iter().take(max).map(|v| format!("{v:?}")).collect();
    let hidden = values.len().saturating_sub(max);
    if hidden == 0 {
        format!("[{}]", shown.join(", "))
    } else {
        format!("[{}, ... (+{hidden} more)]", shown.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::violation::Layer;
    use serde_json::json;

    const SITE_VOCAB: &str =
        r#"{"descriptors": {"descriptors.preferred_site": {"values": ["top"]}}}"#;

    fn vocab(json: &str) -> Vocabulary {
        Vocabulary::from_json_str(json).unwrap()
    }

    fn check_semantic(record: &Value, vocabulary: &Vocabulary) -> Vec<Violation> {
        SemanticChecker::default().check(record, vocabulary)
    }

    fn context_vocab() -> Vocabulary {
        vocab(r#"{"Context": {"context.environment": {"values": ["operando", "ex_situ"]}}}"#)
    }

    #[test]
    fn ungoverned_field_is_skipped() {
        let record = json!({"system": {"instrument": {"instrument_type": "beamline"}}});
        assert!(check_semantic(&record, &context_vocab()).is_empty());
    }

    #[test]
    fn miss_names_value_and_allowed_set() {
        let record = json!({"context": {"environment": "in_vivo"}});
        let violations = check_semantic(&record, &context_vocab());
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.layer, Layer::Semantic);
        assert_eq!(v.path, "context.environment");
        assert!(v.message.contains("'in_vivo'"), "{}", v.message);
        assert!(
            v.message.contains(r#"["operando", "ex_situ"]"#),
            "{}",
            v.message
        );
    }

    #[test]
    fn allowed_value_passes() {
        let record = json!({"context": {"environment": "operando"}});
        assert!(check_semantic(&record, &context_vocab()).is_empty());
    }

    #[test]
    fn array_fields_report_each_index() {
        let vocab = vocab(
            r#"{"links": {"links.rel": {"values": ["derived_from"]}},
                "measurement": {"measurement.series.channels.role": {"values": ["primary_signal"]}}}"#,
        );
        let record = json!({
            "links": [{"rel": "derived_from"}, {"rel": "cites"}, {"target": "x"}],
            "measurement": {"series": [{"channels": [{"role": "primary_signal"}, {"role": "noise"}]}]}
        });
        let paths: Vec<_> = check_semantic(&record, &vocab)
            .into_iter()
            .map(|v| v.path)
            .collect();
        assert_eq!(
            paths,
            ["measurement.series[0].channels[1].role", "links[1].rel"]
        );
    }

    #[test]
    fn category_found_outside_hinted_section() {
        let vocab = vocab(r#"{"System": {"system.simulation.method": {"values": ["DFT"]}}}"#);
        let record = json!({"system": {"simulation": {"method": "MD"}}});
        assert_eq!(check_semantic(&record, &vocab).len(), 1);
    }

    #[test]
    fn runs_on_structurally_broken_documents() {
        let record = json!({"record_id": 7, "context": {"environment": "in_vivo"}});
        assert_eq!(check_semantic(&record, &context_vocab()).len(), 1);
    }

    #[test]
    fn reject_policy_flags_ungoverned_values() {
        let checker = SemanticChecker::default().with_policy(UngovernedPolicy::Reject);
        let record = json!({"system": {"instrument": {"instrument_type": "beamline"}}});
        let violations = checker.check(&record, &context_vocab());
        assert_eq!(violations.len(), 1);
        let message = &violations[0].message;
        assert!(message.contains("system.instrument.instrument_type"));
    }

    #[test]
    fn categorical_descriptors_are_ignored_by_default() {
        let record = json!({"descriptors": {"outputs": [{"descriptors": [
            {"name": "preferred_site", "kind": "categorical", "value": "bridge"}
        ]}]}});
        let vocab = vocab(SITE_VOCAB);
        assert!(check_semantic(&record, &vocab).is_empty());
    }

    #[test]
    fn namespaced_descriptor_binding_checks_categorical_values_only() {
        let checker = SemanticChecker::default()
            .with_descriptor_binding(Arc::new(NamespacedDescriptors::new("descriptors")));
        let vocab = vocab(SITE_VOCAB);
        let record = json!({"descriptors": {"outputs": [{"descriptors": [
            {"name": "co_binding_energy", "kind": "absolute", "value": -0.6},
            {"name": "preferred_site", "kind": "categorical", "value": "bridge"},
            {"name": "facet", "kind": "categorical", "value": "100"}
        ]}]}});
        let violations = checker.check(&record, &vocab);
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert_eq!(
            violations[0].path,
            "descriptors.outputs[0].descriptors[1].value"
        );
    }

    #[test]
    fn long_allowed_lists_are_bounded() {
        let values: Vec<String> = (0..30).map(|i| format!("t{i}")).collect();
        let rendered = render_allowed(&values, 25);
        assert!(rendered.ends_with("... (+5 more)]"));
        assert!(!rendered.contains("t29"));
    }
}
