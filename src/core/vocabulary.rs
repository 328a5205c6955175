use crate::core::error::VocabError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One governed category: a description plus its ordered allowed terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "unique_terms")]
    pub values: Vec<String>,
}

/// A term may appear at most once per category.
fn unique_terms<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<String>::deserialize(deserializer)?;
    let mut seen = HashSet::new();
    for term in &values {
        if !seen.insert(term.as_str()) {
            let message = format!("duplicate term '{term}'");
            return Err(<D::Error as serde::de::Error>::custom(message));
        }
    }
    Ok(values)
}

impl Category {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            values: Vec::new(),
        }
    }

    pub fn allows(&self, term: &str) -> bool {
        self.values.iter().any(|v| v == term)
    }
}

/// `section -> category key -> Category`.
///
/// Category keys are dotted logical paths such as `context.environment`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    sections: BTreeMap<String, BTreeMap<String, Category>>,
}

impl Vocabulary {
    /// Rejects documents that list a term twice in one category.
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Four-space indented JSON, the layout kept on disk for human diffing.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        // serde_json only emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn categories(&self, section: &str) -> Option<&BTreeMap<String, Category>> {
        self.sections.get(section)
    }

    pub fn category_count(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Category)> {
        self.sections.iter().flat_map(|(section, cats)| {
            cats.iter()
                .map(move |(key, cat)| (section.as_str(), key.as_str(), cat))
        })
    }

    #[cfg(test)]
    pub fn category(&self, section: &str, key: &str) -> Option<&Category> {
        self.sections.get(section)?.get(key)
    }

    /// Look in `section_hint` first, then in any section defining `key`.
    pub fn find_category(&self, section_hint: &str, key: &str) -> Option<(&str, &Category)> {
        if let Some((section, cats)) = self.sections.get_key_value(section_hint)
            && let Some(cat) = cats.get(key)
        {
            return Some((section.as_str(), cat));
        }
        self.sections
            .iter()
            .find_map(|(section, cats)| cats.get(key).map(|cat| (section.as_str(), cat)))
    }

    pub fn add_category(
        &mut self,
        section: &str,
        key: &str,
        description: &str,
    ) -> Result<String, VocabError> {
        require_name("section", section)?;
        require_name("category", key)?;
        let cats = self.sections.entry(section.to_string()).or_default();
        if cats.contains_key(key) {
            return Err(VocabError::CategoryExists {
                section: section.to_string(),
                category: key.to_string(),
            });
        }
        cats.insert(key.to_string(), Category::new(description));
        Ok(format!("Created category '{key}' in '{section}'."))
    }

    pub fn add_term(&mut self, section: &str, key: &str, term: &str) -> Result<String, VocabError> {
        require_name("term", term)?;
        let Some(cat) = self.sections.get_mut(section).and_then(|c| c.get_mut(key)) else {
            return Err(VocabError::CategoryNotFound {
                section: section.to_string(),
                category: key.to_string(),
            });
        };
        if cat.allows(term) {
            return Err(VocabError::DuplicateTerm {
                category: key.to_string(),
                term: term.to_string(),
            });
        }
        cat.values.push(term.to_string());
        Ok(format!("Added '{term}' to '{key}'."))
    }

    /// Insert or replace a whole category. Used when rebuilding from a row store.
    pub fn insert_category(&mut self, section: &str, key: &str, category: Category) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), category);
    }
}

fn require_name(field: &'static str, value: &str) -> Result<(), VocabError> {
    if value.trim().is_empty() {
        Err(VocabError::EmptyName { field })
    } else {
        Ok(())
    }
}
