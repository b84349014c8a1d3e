//! Convenience re-exports for common `cinch-search` types.
//!
//! Meant to be glob-imported by hosts wiring tool search into an agent loop:
//!
//! ```ignore
//! use cinch_search::prelude::*;
//! ```
//!
//! Index internals ([`Bm25Index`](crate::search::Bm25Index),
//! [`ToolIndex`](crate::search::ToolIndex)) are left out; import them from
//! [`search`](crate::search) when needed.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    ContextWindow, ModelInfo, Result, SearchError, ToolDef, UnknownModel, json_schema_for,
};

// ── Search policy ───────────────────────────────────────────────────
pub use crate::search::{
    ExpandedToolSet, FilteredTools, SearchMode, SearchOutcome, SearchToolsArgs, SearchToolsTool,
    SessionState, ToolSearchConfig, ToolSearchPolicy, apply_prompt_addendum,
};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::tools::{FnTool, Threshold, Tool, ToolFuture, ToolSet, parse_tool_args};
