//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::summary::NO_ANSWER_PROVIDED;

/// Engine-wide behaviour switches.
///
/// Every field has a default, so an empty TOML document is a valid config.
///
/// ```toml
/// no_answer_text = "No answer provided"
/// invalidate_skipped_answers = false
/// clear_exclusive_on_keystroke = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Placeholder shown for questions with no answer.
    pub no_answer_text: String,

    /// Wipe the answers of every block a routing change skips. When false,
    /// only blocks marked `invalidate_when_skipped` are wiped and the rest
    /// keep their answers for when they become reachable again.
    pub invalidate_skipped_answers: bool,

    /// Clear the exclusive answer on every keystroke in a sibling field
    /// rather than when the field is committed.
    pub clear_exclusive_on_keystroke: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            no_answer_text: NO_ANSWER_PROVIDED.to_string(),
            invalidate_skipped_answers: false,
            clear_exclusive_on_keystroke: false,
        }
    }
}

impl EngineConfig {
    /// Parse a config from TOML.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml)?)
    }

    /// Read and parse a TOML config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&toml)
    }
}

/// Error loading an `EngineConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid engine config: {0}")]
    Toml(#[from] toml::de::Error),
}
