pub mod check;
pub mod import;
pub mod records;
pub mod serve;
pub mod validate;
pub mod vocab;

use crate::core::engine::Engine;
use crate::core::error::ConfigError;
use crate::core::schema::RecordSchema;
use crate::core::semantic::{NamespacedDescriptors, SemanticChecker, UngovernedPolicy};
use crate::core::settings::{Overrides, Settings};
use crate::core::vocab_store::{self, VocabularyBackend};
use crate::core::vocabulary::Vocabulary;
use std::sync::Arc;

/// Exit code for configuration and input failures on single-shot commands.
pub const EXIT_USAGE: i32 = 2;

pub fn settings(overrides: Overrides) -> Result<Settings, ConfigError> {
    Settings::resolve(overrides)
}

pub fn engine(settings: &Settings) -> Result<Engine, ConfigError> {
    let schema = RecordSchema::resolve(settings.schema_path.as_deref())?;
    Ok(Engine::new(schema).with_semantic(semantic_checker(settings)))
}

pub fn semantic_checker(settings: &Settings) -> SemanticChecker {
    let policy = if settings.strict_vocabulary {
        UngovernedPolicy::Reject
    } else {
        UngovernedPolicy::Skip
    };
    let checker = SemanticChecker::default().with_policy(policy);
    match &settings.descriptor_section {
        Some(section) => {
            let binding = NamespacedDescriptors::new(section.as_str());
            checker.with_descriptor_binding(Arc::new(binding))
        }
        None => checker,
    }
}

/// `None` when neither tier is configured.
pub fn vocabulary_store(
    settings: &Settings,
) -> Result<Option<Box<dyn VocabularyBackend>>, ConfigError> {
    match vocab_store::open_store(settings) {
        Ok(store) => Ok(Some(store)),
        Err(ConfigError::NoVocabularyStore) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Snapshot used by one validation run. No store governs nothing.
pub fn vocabulary(settings: &Settings) -> Result<Vocabulary, ConfigError> {
    match vocabulary_store(settings)? {
        Some(store) => vocab_store::load_snapshot(store.as_ref()),
        None => {
            tracing::warn!("no vocabulary configured; semantic layer governs nothing");
            Ok(Vocabulary::default())
        }
    }
}
