use crate::core::error::ConfigError;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_SCHEMA_PATH: &str = "schema/isaac_record_v1.json";
pub const DEFAULT_VOCAB_PATH: &str = "data/vocabulary.json";
pub const DEFAULT_RECORDS_DB: &str = "data/records.db";

/// Process-wide configuration. Flags win over environment, environment over defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// `None` selects the bundled schema.
    pub schema_path: Option<PathBuf>,
    pub vocab_path: Option<PathBuf>,
    pub vocab_db: Option<PathBuf>,
    pub records_db: PathBuf,
    pub strict_vocabulary: bool,
    /// Section whose `descriptors.<name>` categories govern categorical descriptors.
    pub descriptor_section: Option<String>,
}

/// Values given on the command line; each overrides its environment variable.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub schema: Option<PathBuf>,
    pub vocab: Option<PathBuf>,
    pub vocab_db: Option<PathBuf>,
    pub records_db: Option<PathBuf>,
    pub strict_vocabulary: bool,
    pub descriptor_section: Option<String>,
}

impl Settings {
    pub fn resolve(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |name| env::var(name).ok())
    }

    fn resolve_with(
        overrides: Overrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path_var = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);

        let vocab_path = overrides
            .vocab
            .or_else(|| path_var("ISAAC_VOCAB"))
            .or_else(|| {
                let default = Path::new(DEFAULT_VOCAB_PATH);
                default.exists().then(|| default.to_path_buf())
            });

        let strict_env = match lookup("ISAAC_STRICT_VOCABULARY") {
            Some(raw) => parse_bool("ISAAC_STRICT_VOCABULARY", &raw)?,
            None => false,
        };

        Ok(Self {
            schema_path: overrides.schema.or_else(|| path_var("ISAAC_SCHEMA")),
            vocab_path,
            vocab_db: overrides.vocab_db.or_else(|| path_var("ISAAC_VOCAB_DB")),
            records_db: overrides
                .records_db
                .or_else(|| path_var("ISAAC_RECORDS_DB"))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDS_DB)),
            strict_vocabulary: overrides.strict_vocabulary || strict_env,
            descriptor_section: overrides
                .descriptor_section
                .or_else(|| lookup("ISAAC_DESCRIPTOR_SECTION"))
                .filter(|s| !s.trim().is_empty()),
        })
    }
}

pub fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::BadSetting {
            name,
            value: raw.to_string(),
        }),
    }
}

pub fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_bool(name, &raw),
        Err(_) => Ok(default),
    }
}
