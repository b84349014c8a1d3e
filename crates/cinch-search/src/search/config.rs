//! Configuration for the [`ToolSearchPolicy`](super::policy::ToolSearchPolicy).
//!
//! Every field has a default, so a config file only needs to name what it
//! overrides:
//!
//! ```json
//! {
//!   "threshold": { "tokens": 20000 },
//!   "always_include": ["read_file", "shell"],
//!   "default_mode": "bm25"
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::index::SearchMode;
use crate::error::{Result, SearchError};
use crate::tools::budget::Threshold;

/// Upper bound on results returned by one `search_tools` call.
pub const MAX_SEARCH_LIMIT: usize = 5;

/// Results returned when the caller does not pass a limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Tool search policy settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ToolSearchConfig {
    /// When the catalog's estimated token cost exceeds this, tools are
    /// deferred behind search. Default: 10% of the context window.
    pub threshold: Threshold,
    /// Tools that stay visible in deferred mode.
    pub always_include: Vec<String>,
    /// Mode used when `search_tools` is called without one. Default: hybrid.
    pub default_mode: SearchMode,
    /// Result count used when `search_tools` is called without a limit.
    /// Clamped to [`MAX_SEARCH_LIMIT`].
    pub default_limit: usize,
    /// Force deferred mode on or off regardless of the token estimate.
    pub force_deferred: Option<bool>,
}

impl Default for ToolSearchConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            always_include: Vec::new(),
            default_mode: SearchMode::default(),
            default_limit: DEFAULT_SEARCH_LIMIT,
            force_deferred: None,
        }
    }
}

impl ToolSearchConfig {
    /// Defer once tool definitions exceed an absolute token count.
    pub fn with_threshold_tokens(mut self, tokens: usize) -> Self {
        self.threshold = Threshold::Tokens(tokens);
        self
    }

    /// Defer once tool definitions exceed a fraction of the context window.
    pub fn with_threshold_fraction(mut self, fraction: f64) -> Self {
        self.threshold = Threshold::Fraction(fraction);
        self
    }

    /// Keep a tool visible in deferred mode (builder pattern).
    pub fn with_always_include(mut self, tool_name: impl Into<String>) -> Self {
        let name = tool_name.into();
        if !self.always_include.contains(&name) {
            self.always_include.push(name);
        }
        self
    }

    /// Keep several tools visible in deferred mode (builder pattern).
    pub fn with_always_include_all(self, tool_names: &[&str]) -> Self {
        tool_names
            .iter()
            .fold(self, |config, name| config.with_always_include(*name))
    }

    pub fn with_default_mode(mut self, mode: SearchMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Override the deferred-mode decision.
    pub fn with_force_deferred(mut self, deferred: bool) -> Self {
        self.force_deferred = Some(deferred);
        self
    }

    /// Reject settings that would make the policy misbehave.
    pub fn validate(&self) -> Result<()> {
        self.threshold
            .validate()
            .map_err(SearchError::InvalidConfig)?;
        if self.default_limit == 0 {
            return Err(SearchError::InvalidConfig(
                "default_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Load and validate a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ToolSearchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
