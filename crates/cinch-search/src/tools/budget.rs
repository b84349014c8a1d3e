//! Tool definition token budgeting.
//!
//! Tool definitions are serialized into every API request and a large
//! catalog (hundreds of MCP tools) can eat a meaningful share of the
//! context window before the conversation even starts. These helpers
//! estimate the token cost of a catalog and compare it against a
//! [`Threshold`] to decide whether tools should be deferred behind search.

use serde::{Deserialize, Serialize};

use crate::ToolDef;

/// Characters per token used for tool definition estimates.
pub const CHARS_PER_TOKEN: usize = 4;

/// Context window assumed when the model does not report one.
pub const DEFAULT_CONTEXT_WINDOW: usize = 128_000;

/// Default share of the context window tool definitions may occupy.
pub const DEFAULT_THRESHOLD_FRACTION: f64 = 0.10;

/// Estimate the token cost of a single tool definition.
///
/// Counts the characters of the name, description, and serialized
/// parameter schema at [`CHARS_PER_TOKEN`]. Never returns less than 1.
pub fn estimate_tokens(def: &ToolDef) -> usize {
    let name_len = def.function.name.chars().count();
    let desc_len = def.function.description.chars().count();
    let params_len = serde_json::to_string(&def.function.parameters)
        .map(|s| s.chars().count())
        .unwrap_or(0);
    ((name_len + desc_len + params_len) / CHARS_PER_TOKEN).max(1)
}

/// Estimate the total token cost of all tool definitions.
pub fn estimate_total_tokens(defs: &[ToolDef]) -> usize {
    defs.iter().map(estimate_tokens).sum()
}

/// Point above which tool definitions are deferred behind search.
///
/// Serialized as `{"tokens": 20000}` or `{"fraction": 0.1}`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Threshold {
    /// Absolute token count.
    Tokens(usize),
    /// Fraction of the model's context window.
    Fraction(f64),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Fraction(DEFAULT_THRESHOLD_FRACTION)
    }
}

impl Threshold {
    /// Resolve to a token count for a model with the given context window.
    ///
    /// `None` falls back to [`DEFAULT_CONTEXT_WINDOW`].
    pub fn resolve(&self, context_window: Option<usize>) -> usize {
        match *self {
            Threshold::Tokens(tokens) => tokens,
            Threshold::Fraction(fraction) => {
                let window = context_window.unwrap_or(DEFAULT_CONTEXT_WINDOW);
                (window as f64 * fraction) as usize
            }
        }
    }

    /// Check that a fractional threshold lies in `(0, 1]`.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Threshold::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(format!("threshold fraction must be in (0, 1], got {f}"))
            }
            _ => Ok(()),
        }
    }
}

/// Token accounting for a catalog, produced once per index build.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CatalogBudget {
    /// Number of tool definitions counted.
    pub tool_count: usize,
    /// Sum of per-tool estimates.
    pub total_tokens: usize,
    /// Resolved threshold in tokens.
    pub threshold_tokens: usize,
    /// Whether the catalog exceeds the threshold.
    pub over_threshold: bool,
}

impl CatalogBudget {
    /// Measure a catalog against a threshold.
    pub fn measure(
        defs: &[ToolDef],
        threshold: Threshold,
        context_window: Option<usize>,
    ) -> Self {
        let total_tokens = estimate_total_tokens(defs);
        let threshold_tokens = threshold.resolve(context_window);
        Self {
            tool_count: defs.len(),
            total_tokens,
            threshold_tokens,
            over_threshold: total_tokens > threshold_tokens,
        }
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "tool definitions: {} tools, ~{} tokens (threshold {})",
            self.tool_count, self.total_tokens, self.threshold_tokens
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_tool(name: &str, desc: &str) -> ToolDef {
        ToolDef::new(
            name,
            desc,
            json!({
                "type": "object",
                "properties": {
                    "input": { "type": "string" }
                }
            }),
        )
    }

    #[test]
    fn estimate_uses_four_chars_per_token() {
        let tool = ToolDef::new("abcd", "efghijkl", json!(null));
        // 4 + 8 + "null".len() = 16 chars.
        assert_eq!(estimate_tokens(&tool), 4);
    }

    #[test]
    fn estimate_is_at_least_one() {
        let tool = ToolDef::new("", "", json!(null));
        assert_eq!(estimate_tokens(&tool), 1);
    }

    #[test]
    fn estimate_total_matches_sum() {
        let tools = vec![
            make_tool("read_file", "Read a file from disk."),
            make_tool("write_file", "Write content to a file."),
            make_tool("grep", "Search file contents with regex."),
        ];
        let total = estimate_total_tokens(&tools);
        let sum: usize = tools.iter().map(estimate_tokens).sum();
        assert_eq!(total, sum);
    }

    #[test]
    fn fraction_threshold_uses_context_window() {
        let threshold = Threshold::Fraction(0.10);
        assert_eq!(threshold.resolve(Some(200_000)), 20_000);
        assert_eq!(threshold.resolve(None), 12_800);
    }

    #[test]
    fn token_threshold_ignores_context_window() {
        assert_eq!(Threshold::Tokens(500).resolve(Some(1_000_000)), 500);
    }

    #[test]
    fn invalid_fractions_are_rejected() {
        assert!(Threshold::Fraction(0.0).validate().is_err());
        assert!(Threshold::Fraction(1.5).validate().is_err());
        assert!(Threshold::Fraction(f64::NAN).validate().is_err());
        assert!(Threshold::Fraction(1.0).validate().is_ok());
        assert!(Threshold::Tokens(0).validate().is_ok());
    }

    #[test]
    fn threshold_serializes_as_tagged_value() {
        assert_eq!(
            serde_json::to_value(Threshold::Tokens(20_000)).unwrap(),
            json!({"tokens": 20_000})
        );
        let parsed: Threshold = serde_json::from_value(json!({"fraction": 0.25})).unwrap();
        assert_eq!(parsed, Threshold::Fraction(0.25));
    }

    #[test]
    fn measure_compares_strictly() {
        let tools = vec![ToolDef::new("abcd", "efghijkl", json!(null))];
        let at = CatalogBudget::measure(&tools, Threshold::Tokens(4), None);
        assert!(!at.over_threshold);
        let below = CatalogBudget::measure(&tools, Threshold::Tokens(3), None);
        assert!(below.over_threshold);
        assert!(below.to_log_string().contains("~4 tokens"));
    }
}
