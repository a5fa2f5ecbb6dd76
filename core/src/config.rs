//! Generator configuration.
//!
//! Deserializes from YAML or JSON; every field has a default, so an empty document is a
//! valid configuration.
//!
//! ```yaml
//! strict: false          # report declined #[union] declarations as info diagnostics
//! header: true           # prefix generated files with an @generated banner
//! capabilities:
//!   option_type: true    # emit as_*/into_* downcasts
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::SumgenError;

/// Facts about the compilation the generated code lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Capabilities {
    /// An `Option` type is visible; gates `as_<id>` and `into_<id>`.
    pub option_type: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { option_type: true }
    }
}

/// Configuration for a [`Generator`](crate::Generator) run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Report silent declines of marked declarations as info diagnostics.
    pub strict: bool,
    /// Emit the `@generated` banner at the top of rendered files.
    pub header: bool,
    pub capabilities: Capabilities,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            strict: false,
            header: true,
            capabilities: Capabilities::default(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a YAML document (JSON is valid YAML too).
    ///
    /// # Errors
    ///
    /// Returns [`SumgenError::Config`] on malformed input or unknown keys.
    pub fn from_yaml(text: &str) -> Result<Self, SumgenError> {
        serde_yaml::from_str(text).map_err(|e| SumgenError::Config {
            message: e.to_string(),
        })
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SumgenError::Config`] on malformed input or unknown keys.
    pub fn from_json(text: &str) -> Result<Self, SumgenError> {
        serde_json::from_str(text).map_err(|e| SumgenError::Config {
            message: e.to_string(),
        })
    }

    /// Load from a file; `.json` is read as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`SumgenError::Io`] if the file cannot be read and
    /// [`SumgenError::Config`] if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SumgenError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SumgenError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }
}
