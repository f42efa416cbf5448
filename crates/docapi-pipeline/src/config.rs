//! # Pipeline Configuration
//!
//! Loaded from `docapi.yaml`. Every field has a default, so an empty file
//! (or no file) is a valid configuration.
//!
//! ```yaml
//! types: types.yaml            # type manifest, relative to this file
//! recursion_bound: 2
//! name_tag: json               # struct tag naming object properties
//! param_tags: [form, json]     # struct tags naming params(...) entries
//! imports:                     # aliases usable in document expressions
//!   model: github.com/acme/petstore/model
//! script:
//!   command: node filter.js
//!   timeout_ms: 5000
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docapi_schema::{ResolverOptions, DEFAULT_RECURSION_BOUND};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::host::DEFAULT_HOST_TIMEOUT;

/// Conventional configuration file name.
pub const CONFIG_FILE_NAME: &str = "docapi.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Type manifest path.
    pub types: Option<PathBuf>,
    pub recursion_bound: u32,
    pub name_tag: Option<String>,
    pub param_tags: Vec<String>,
    /// Alias to package path, for expressions outside any source file.
    pub imports: BTreeMap<String, String>,
    pub script: Option<ScriptConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            types: None,
            recursion_bound: DEFAULT_RECURSION_BOUND,
            name_tag: None,
            param_tags: Vec::new(),
            imports: BTreeMap::new(),
            script: None,
        }
    }
}

/// External script host settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptConfig {
    /// Whitespace-separated command line.
    pub command: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_HOST_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}

impl ScriptConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl PipelineConfig {
    /// Parse configuration text. Relative paths are kept as written.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, PipelineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| PipelineError::Config {
            path: origin.to_string(),
            source,
        })
    }

    /// Load a configuration file. A relative `types` path is resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&text, &path.display().to_string())?;
        if let (Some(types), Some(dir)) = (config.types.as_ref(), path.parent()) {
            if types.is_relative() {
                config.types = Some(dir.join(types));
            }
        }
        Ok(config)
    }

    /// Resolver options derived from this configuration.
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            recursion_bound: self.recursion_bound,
            name_tag: self.name_tag.clone(),
            param_tags: self.param_tags.clone(),
        }
    }
}
