//! Tool abstractions for LLM function-calling agents.
//!
//! Every agent capability is a [`Tool`] trait implementor. Tools are
//! collected into a [`ToolSet`] which handles dispatch, validation, and
//! truncation, and whose definitions make up the catalog that
//! [`search`](crate::search) indexes.
//!
//! # Submodules
//!
//! - [`core`] — [`Tool`] trait, [`ToolSet`], [`FnTool`], argument helpers.
//! - [`budget`] — token estimates for tool definitions and the deferral
//!   [`Threshold`].
//! - [`names`] — canonical tool name constants.

pub mod budget;
pub mod core;
pub mod names;

pub use budget::{CatalogBudget, Threshold, estimate_tokens, estimate_total_tokens};
pub use core::{
    DEFAULT_MAX_RESULT_BYTES, FnTool, Tool, ToolFuture, ToolSet, parse_tool_args, truncate_result,
    validate_tool_arguments,
};
