//! On-demand tool discovery for LLM function-calling agents.
//!
//! Agents wired to hundreds of tools (MCP servers, plugin registries) pay for
//! every tool definition on every request. `cinch-search` measures what a
//! catalog costs and, once it exceeds a share of the model's context window,
//! switches to **deferred mode**: the model sees a handful of tools plus a
//! `search_tools` meta-tool, and each search unlocks the matching tools for
//! the rest of the session.
//!
//! # Getting started
//!
//! ```
//! use cinch_search::prelude::*;
//! use serde_json::json;
//!
//! let catalog = vec![
//!     ToolDef::new("read_file", "Read a file from disk", json!({})),
//!     ToolDef::new("http_get", "Fetch a URL over HTTP", json!({})),
//! ];
//!
//! let config = ToolSearchConfig::default()
//!     .with_threshold_tokens(5)
//!     .with_always_include("read_file");
//! let policy = ToolSearchPolicy::new(&ContextWindow(200_000), config).unwrap();
//!
//! let session = policy.initial_state();
//! let visible = policy.filter_tools(&catalog, &session).unwrap();
//! assert_eq!(visible.tools.len(), 2); // read_file + search_tools
//! assert!(visible.prompt_addendum.is_some());
//! ```
//!
//! # Where to find things
//!
//! - **Rank tools against a query:** [`ToolIndex`](search::ToolIndex) with
//!   [`SearchMode`](search::SearchMode), built on
//!   [`Bm25Index`](search::Bm25Index).
//! - **Decide what the model sees:** [`ToolSearchPolicy`](search::ToolSearchPolicy)
//!   and its [`ToolSearchConfig`](search::ToolSearchConfig).
//! - **Track what a session unlocked:** [`SessionState`](search::SessionState).
//! - **Dispatch `search_tools` like any other tool:**
//!   [`SearchToolsTool`](search::SearchToolsTool) in a
//!   [`ToolSet`](tools::ToolSet).
//! - **Estimate definition cost:** [`tools::budget`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`search`] | BM25/regex/hybrid index, deferral policy, session state, `search_tools` |
//! | [`tools`] | [`Tool`](tools::Tool) trait, [`ToolSet`](tools::ToolSet), token budgeting |
//! | [`catalog`] | Loading tool catalogs from JSON |
//! | [`model`] | [`ModelInfo`] context-window lookup |
//! | [`observability`] | Tracing subscriber setup |

pub mod catalog;
pub mod error;
pub mod model;
pub mod observability;
pub mod prelude;
pub mod search;
pub mod tools;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use error::{Result, SearchError};
pub use model::{ContextWindow, ModelInfo, UnknownModel};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. This is the bridge between strong Rust types
/// and the `serde_json::Value` that the function-calling API expects.
///
/// # Example
///
/// ```
/// use cinch_search::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct GrepArgs {
///     pattern: String,
///     #[serde(default)]
///     path: Option<String>,
/// }
///
/// let schema = json_schema_for::<GrepArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"pattern".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Tool types ─────────────────────────────────────────────────────

/// The type of a tool definition. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum ToolType {
    #[default]
    #[serde(rename = "function")]
    Function,
}

/// Tool definition sent to the API (OpenAI function-calling format).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolDef {
    #[serde(rename = "type", default)]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    /// Create a function-calling tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Names and descriptions of the top-level parameters, sorted by name.
    ///
    /// Reads `parameters.properties.<name>.description`; parameters without a
    /// description yield an empty string.
    pub fn parameter_docs(&self) -> Vec<(&str, &str)> {
        self.function
            .parameters
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| {
                props
                    .iter()
                    .map(|(name, schema)| {
                        let desc = schema
                            .get("description")
                            .and_then(|d| d.as_str())
                            .unwrap_or_default();
                        (name.as_str(), desc)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_parameters")]
    pub parameters: serde_json::Value,
}

fn empty_parameters() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}
