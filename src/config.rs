//! Manager configuration.
//!
//! ```yaml
//! cache_idle_secs: 60
//! sources:
//!   dark_sites:
//!     bundled: dark-sites.config
//!     remote: https://example.com/config/dark-sites.config
//!   dynamic_theme_fixes:
//!     remote: https://example.com/config/dynamic-theme-fixes.config
//! ```
//!
//! Categories without an entry use their bundled file name and no remote.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::eviction::DEFAULT_IDLE;
use crate::{Error, Result, RuleCategory};

/// Where a category's rule text comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Location passed to the bundled fetcher; defaults to the category file name
    pub bundled: Option<String>,
    /// Location passed to the remote fetcher
    pub remote: Option<String>,
}

/// Resolved source locations of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub bundled: String,
    pub remote: Option<String>,
}

/// Configuration of a [`ConfigManager`](crate::ConfigManager).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Idle seconds before a category's caches are cleared
    #[serde(default = "default_idle_secs")]
    pub cache_idle_secs: u64,
    /// Per-category sources, keyed by category name
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

fn default_idle_secs() -> u64 {
    DEFAULT_IDLE.as_secs()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cache_idle_secs: default_idle_secs(),
            sources: BTreeMap::new(),
        }
    }
}

impl ManagerConfig {
    /// Parse configuration from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ManagerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Set the remote location of a category.
    pub fn with_remote(mut self, category: RuleCategory, location: impl Into<String>) -> Self {
        self.sources
            .entry(category.as_str().to_string())
            .or_default()
            .remote = Some(location.into());
        self
    }

    /// Set the idle interval.
    pub fn with_cache_idle(mut self, idle: Duration) -> Self {
        self.cache_idle_secs = idle.as_secs();
        self
    }

    /// Idle interval before caches are cleared.
    pub fn cache_idle(&self) -> Duration {
        Duration::from_secs(self.cache_idle_secs)
    }

    /// Effective source locations of a category.
    pub fn source(&self, category: RuleCategory) -> Source {
        let entry = self.sources.get(category.as_str());
        Source {
            bundled: entry
                .and_then(|s| s.bundled.clone())
                .unwrap_or_else(|| category.bundled_file().to_string()),
            remote: entry.and_then(|s| s.remote.clone()),
        }
    }

    fn validate(&self) -> Result<()> {
        for name in self.sources.keys() {
            match RuleCategory::parse(name) {
                Some(category) if category.as_str() == name => {}
                Some(category) => {
                    return Err(Error::Config(format!(
                        "source key {} should be written as {}",
                        name, category
                    )))
                }
                None => return Err(Error::Config(format!("unknown category: {}", name))),
            }
        }
        Ok(())
    }
}

/// Options of a single load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Use bundled text only; skip remotes and overrides
    pub local: bool,
}

impl LoadOptions {
    /// Load from bundled text only.
    pub fn local() -> Self {
        Self { local: true }
    }

    /// Prefer remote text, falling back to bundled.
    pub fn remote() -> Self {
        Self { local: false }
    }
}
