//! Canonical tool name constants.
//!
//! Tool-name string literals should reference these constants rather than
//! repeating the string.

/// The meta-tool that searches the catalog and unlocks matches.
pub const SEARCH_TOOLS: &str = "search_tools";
