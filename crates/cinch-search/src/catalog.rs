//! Loading tool catalogs from JSON.
//!
//! A catalog file is a JSON array of tool definitions in function-calling
//! shape:
//!
//! ```json
//! [
//!   {"type": "function", "function": {"name": "read_file", "description": "Read a file", "parameters": {}}}
//! ]
//! ```
//!
//! An object with a `tools` array (the shape of a chat request body) is
//! accepted too.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::ToolDef;
use crate::error::{Result, SearchError};

/// Parse a catalog from JSON text.
///
/// Rejects empty tool names and duplicate names, since either would make
/// search results ambiguous.
pub fn parse_catalog(json: &str) -> Result<Vec<ToolDef>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let list = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut obj) => match obj.remove("tools") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(SearchError::CatalogLoad(
                    "expected a JSON array of tools or an object with a \"tools\" array".into(),
                ));
            }
        },
        _ => {
            return Err(SearchError::CatalogLoad(
                "expected a JSON array of tools".into(),
            ));
        }
    };

    let mut seen = HashSet::new();
    let mut tools = Vec::with_capacity(list.len());
    for (i, item) in list.into_iter().enumerate() {
        let def: ToolDef = serde_json::from_value(item)
            .map_err(|e| SearchError::CatalogLoad(format!("tool #{i}: {e}")))?;
        let name = def.function.name.trim();
        if name.is_empty() {
            return Err(SearchError::CatalogLoad(format!(
                "tool #{i} has an empty name"
            )));
        }
        if !seen.insert(name.to_string()) {
            return Err(SearchError::CatalogLoad(format!(
                "duplicate tool name '{name}'"
            )));
        }
        tools.push(def);
    }
    Ok(tools)
}

/// Read and parse a catalog file.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<ToolDef>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let tools = parse_catalog(&content)?;
    debug!("Loaded {} tool(s) from {}", tools.len(), path.display());
    Ok(tools)
}
