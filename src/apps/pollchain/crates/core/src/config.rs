//! Registry configuration.
//!
//! ```toml
//! [limits]
//! max_options = 16
//! max_text_bytes = 512
//!
//! [events]
//! retain = 10000
//! ```
//!
//! Every field is optional; an empty file gives the unrestricted defaults.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub limits: LimitsConfig,
    pub events: EventConfig,
}

/// Bounds on poll contents. `None` means unbounded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum options per poll
    pub max_options: Option<usize>,

    /// Maximum byte length of a title, question or option
    pub max_text_bytes: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// How many recent events the in-memory log keeps
    pub retain: Option<usize>,
}

impl RegistryConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
