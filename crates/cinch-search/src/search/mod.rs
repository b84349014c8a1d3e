//! On-demand tool discovery.
//!
//! Large tool catalogs are expensive to send with every request. This module
//! indexes the catalog once and, when it would take too large a share of the
//! context window, hides most tools behind a `search_tools` meta-tool that
//! the model calls to unlock what it needs.
//!
//! # Submodules
//!
//! - [`bm25`] — tokenizer and Okapi BM25 ranking.
//! - [`index`] — [`ToolIndex`]: BM25, regex, and hybrid search over tools.
//! - [`state`] — [`SessionState`]: tools unlocked so far in a conversation.
//! - [`config`] — [`ToolSearchConfig`].
//! - [`policy`] — [`ToolSearchPolicy`]: deferral decision, per-request
//!   filtering, and the `search_tools` operation.
//! - [`tool`] — [`SearchToolsTool`] for registration in a
//!   [`ToolSet`](crate::tools::ToolSet).
//!
//! # Typical request loop
//!
//! ```ignore
//! let policy = ToolSearchPolicy::new(&model, ToolSearchConfig::default())?;
//! let mut session = policy.initial_state();
//!
//! loop {
//!     let visible = policy.filter_tools(&catalog, &session)?;
//!     let system = apply_prompt_addendum(base_prompt, visible.prompt_addendum.as_deref());
//!     let call = model.call(&system, &visible.tools).await?;
//!     if call.tool == "search_tools" {
//!         let outcome = policy.handle_search(&serde_json::from_str(&call.args)?, &session)?;
//!         session = outcome.state;
//!         // send outcome.text back as the tool result
//!     }
//! }
//! ```

pub mod bm25;
pub mod config;
pub mod index;
pub mod policy;
pub mod state;
pub mod tool;

pub use bm25::Bm25Index;
pub use config::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, ToolSearchConfig};
pub use index::{MAX_CATALOG_TOOLS, MAX_PATTERN_LEN, SearchHit, SearchMode, ToolIndex};
pub use policy::{
    FilteredTools, SEARCH_TOOLS_PROMPT, SearchOutcome, SearchToolsArgs, ToolSearchMiddleware,
    ToolSearchPolicy, apply_prompt_addendum, search_tools_definition,
};
pub use state::{ExpandedToolSet, SessionState};
pub use tool::SearchToolsTool;
