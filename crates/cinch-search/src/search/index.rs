//! Searchable index over a tool catalog.
//!
//! [`ToolIndex`] turns each [`ToolDef`] into one text document and offers
//! three ways to query it:
//!
//! - [`SearchMode::Bm25`] — statistical relevance via [`Bm25Index`].
//! - [`SearchMode::Regex`] — case-insensitive pattern match over names and
//!   descriptions; a name match outscores a description match.
//! - [`SearchMode::Hybrid`] — both, with regex scores weighted so exact name
//!   and pattern hits dominate while BM25-only hits still surface.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::bm25::Bm25Index;
use crate::ToolDef;
use crate::error::{Result, SearchError};

/// Hard cap on the number of tools a single index accepts.
pub const MAX_CATALOG_TOOLS: usize = 10_000;

/// Longest accepted regex pattern, in characters.
pub const MAX_PATTERN_LEN: usize = 200;

/// How many times a tool's name is repeated in its searchable text.
const NAME_REPEAT: usize = 3;

const REGEX_NAME_SCORE: f64 = 2.0;
const REGEX_TEXT_SCORE: f64 = 1.0;

/// Multiplier applied to regex scores when combining with BM25.
const HYBRID_REGEX_WEIGHT: f64 = 2.0;

// ── Search mode ────────────────────────────────────────────────────

/// Strategy used to match a query against the catalog.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Ranked keyword relevance.
    Bm25,
    /// Case-insensitive regular expression over names and descriptions.
    Regex,
    /// BM25 and regex combined.
    #[default]
    Hybrid,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Bm25 => write!(f, "bm25"),
            SearchMode::Regex => write!(f, "regex"),
            SearchMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bm25" => Ok(SearchMode::Bm25),
            "regex" => Ok(SearchMode::Regex),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(format!(
                "unknown search mode '{other}' (expected bm25, regex, or hybrid)"
            )),
        }
    }
}

// ── Results ────────────────────────────────────────────────────────

/// A single ranked match.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SearchHit {
    /// Tool name.
    pub name: String,
    /// Relevance score; higher is better in every mode.
    pub score: f64,
}

// ── ToolIndex ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ToolEntry {
    name: String,
    description: String,
    /// Parameter names and their descriptions, space-separated.
    param_text: String,
}

impl ToolEntry {
    fn from_def(def: &ToolDef) -> Self {
        Self {
            name: def.function.name.clone(),
            description: def.function.description.clone(),
            param_text: def
                .parameter_docs()
                .into_iter()
                .flat_map(|(name, desc)| [name, desc])
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    fn document(&self) -> String {
        let mut doc = vec![self.name.as_str(); NAME_REPEAT].join(" ");
        for part in [&self.description, &self.param_text] {
            if !part.is_empty() {
                doc.push(' ');
                doc.push_str(part);
            }
        }
        doc
    }
}

/// Search index over a tool catalog.
///
/// Built once from the full catalog and read-only afterwards.
///
/// # Example
///
/// ```
/// use cinch_search::ToolDef;
/// use cinch_search::search::{SearchMode, ToolIndex};
///
/// let mut index = ToolIndex::new();
/// index
///     .add_tools(&[
///         ToolDef::new("read_file", "Read a file from disk", serde_json::json!({})),
///         ToolDef::new("http_get", "Fetch a URL over HTTP", serde_json::json!({})),
///     ])
///     .unwrap();
///
/// let hits = index.search("^http", SearchMode::Regex, 5).unwrap();
/// assert_eq!(hits[0].name, "http_get");
/// assert_eq!(hits[0].score, 2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ToolIndex {
    entries: Vec<ToolEntry>,
    positions: HashMap<String, usize>,
    bm25: Bm25Index,
}

impl ToolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a batch of tools.
    ///
    /// Fails without modifying the index if the total number of indexed
    /// tools would exceed [`MAX_CATALOG_TOOLS`].
    pub fn add_tools(&mut self, tools: &[ToolDef]) -> Result<()> {
        let count = self.entries.len() + tools.len();
        if count > MAX_CATALOG_TOOLS {
            return Err(SearchError::CatalogTooLarge {
                count,
                max: MAX_CATALOG_TOOLS,
            });
        }

        let new_entries: Vec<ToolEntry> = tools.iter().map(ToolEntry::from_def).collect();
        self.bm25
            .add_documents(new_entries.iter().map(ToolEntry::document));
        for entry in new_entries {
            self.positions.insert(entry.name.clone(), self.entries.len());
            self.entries.push(entry);
        }

        debug!(
            "Tool index built: {} tools, avg document length {:.1} tokens",
            self.entries.len(),
            self.bm25.avg_doc_len()
        );
        Ok(())
    }

    /// Number of indexed tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no tools.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tool names in catalog order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Whether a tool with this name is indexed.
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Description of an indexed tool.
    pub fn description(&self, name: &str) -> Option<&str> {
        self.positions
            .get(name)
            .map(|&i| self.entries[i].description.as_str())
    }

    /// Rank tools by BM25 relevance.
    pub fn search_bm25(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.to_hits(self.bm25.search(query, limit))
    }

    /// Match tools against a case-insensitive regular expression.
    ///
    /// A pattern that does not compile is matched as a literal substring.
    /// Patterns longer than [`MAX_PATTERN_LEN`] are rejected.
    pub fn search_regex(&self, pattern: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let re = compile_pattern(pattern)?;
        Ok(self.to_hits(self.regex_scores(&re, limit)))
    }

    /// Search in the given mode.
    ///
    /// Regex and hybrid modes reject queries longer than [`MAX_PATTERN_LEN`].
    pub fn search(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<SearchHit>> {
        let hits = match mode {
            SearchMode::Bm25 => self.search_bm25(query, limit),
            SearchMode::Regex => self.search_regex(query, limit)?,
            SearchMode::Hybrid => self.to_hits(self.hybrid_scores(query, limit)?),
        };
        trace!("{mode} search for {query:?}: {} hit(s)", hits.len());
        Ok(hits)
    }

    fn regex_scores(&self, re: &Regex, limit: usize) -> Vec<(usize, f64)> {
        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                if re.is_match(&entry.name) {
                    Some((i, REGEX_NAME_SCORE))
                } else if re.is_match(&entry.description) || re.is_match(&entry.param_text) {
                    Some((i, REGEX_TEXT_SCORE))
                } else {
                    None
                }
            })
            .collect();
        sort_scored(&mut scored);
        scored.truncate(limit);
        scored
    }

    fn hybrid_scores(&self, query: &str, limit: usize) -> Result<Vec<(usize, f64)>> {
        let re = compile_pattern(query)?;
        let candidates = limit.saturating_mul(2);
        let mut combined: HashMap<usize, f64> = HashMap::new();

        for (i, score) in self.bm25.search(query, candidates) {
            *combined.entry(i).or_insert(0.0) += score;
        }
        for (i, score) in self.regex_scores(&re, candidates) {
            *combined.entry(i).or_insert(0.0) += HYBRID_REGEX_WEIGHT * score;
        }

        let mut scored: Vec<(usize, f64)> = combined.into_iter().collect();
        sort_scored(&mut scored);
        scored.truncate(limit);
        Ok(scored)
    }

    fn to_hits(&self, scored: Vec<(usize, f64)>) -> Vec<SearchHit> {
        scored
            .into_iter()
            .map(|(i, score)| SearchHit {
                name: self.entries[i].name.clone(),
                score,
            })
            .collect()
    }
}

/// Descending by score, then ascending by catalog position.
fn sort_scored(scored: &mut [(usize, f64)]) {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// Compile a case-insensitive pattern, falling back to a literal match.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    let len = pattern.chars().count();
    if len > MAX_PATTERN_LEN {
        return Err(SearchError::PatternTooLong {
            len,
            max: MAX_PATTERN_LEN,
        });
    }
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Ok(re),
        Err(e) => {
            debug!("Invalid regex {pattern:?} ({e}), matching as literal text");
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .map_err(|e| SearchError::InvalidConfig(format!("unusable pattern: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_catalog() -> Vec<ToolDef> {
        vec![
            ToolDef::new("read_file", "Read a file from disk", json!({})),
            ToolDef::new("write_file", "Write a file to disk", json!({})),
            ToolDef::new("http_get", "Fetch a URL over HTTP", json!({})),
        ]
    }

    fn sample_index() -> ToolIndex {
        let mut index = ToolIndex::new();
        index.add_tools(&sample_catalog()).unwrap();
        index
    }

    fn names(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn document_repeats_name_and_includes_parameters() {
        let def = ToolDef::new(
            "grep",
            "Search file contents",
            json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Regex to match"},
                    "path": {"type": "string"}
                }
            }),
        );
        let doc = ToolEntry::from_def(&def).document();
        assert!(doc.starts_with("grep grep grep Search file contents"));
        assert!(doc.contains("pattern Regex to match"));
        assert!(doc.contains("path"));
    }

    #[test]
    fn bm25_search_prefers_name_matches() {
        let index = sample_index();
        let hits = index.search_bm25("file", 5);
        assert_eq!(names(&hits), vec!["read_file", "write_file"]);
    }

    #[test]
    fn bm25_search_finds_parameter_descriptions() {
        let mut index = ToolIndex::new();
        index
            .add_tools(&[
                ToolDef::new("a", "first", json!({})),
                ToolDef::new(
                    "b",
                    "second",
                    json!({"properties": {"timeout": {"description": "seconds to wait"}}}),
                ),
            ])
            .unwrap();
        let hits = index.search_bm25("wait", 5);
        assert_eq!(names(&hits), vec!["b"]);
    }

    #[test]
    fn regex_anchor_matches_name_only() {
        let index = sample_index();
        let hits = index.search_regex("^http", 5).unwrap();
        assert_eq!(
            hits,
            vec![SearchHit {
                name: "http_get".into(),
                score: 2.0
            }]
        );
    }

    #[test]
    fn regex_name_match_outscores_description_match() {
        let index = sample_index();
        // "read" hits a name, "url" only a description.
        let hits = index.search_regex("read|url", 5).unwrap();
        assert_eq!(names(&hits), vec!["read_file", "http_get"]);
        assert_eq!(hits[0].score, 2.0);
        assert_eq!(hits[1].score, 1.0);
    }

    #[test]
    fn regex_is_case_insensitive() {
        let index = sample_index();
        let hits = index.search_regex("FETCH", 5).unwrap();
        assert_eq!(names(&hits), vec!["http_get"]);
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        let mut index = ToolIndex::new();
        index
            .add_tools(&[
                ToolDef::new("calc", "Evaluate (a+b expressions", json!({})),
                ToolDef::new("other", "Nothing here", json!({})),
            ])
            .unwrap();
        let hits = index.search_regex("(a+b", 5).unwrap();
        assert_eq!(names(&hits), vec!["calc"]);
        assert_eq!(hits[0].score, 1.0);
    }

    #[test]
    fn overlong_pattern_is_rejected() {
        let index = sample_index();
        let pattern = "a".repeat(MAX_PATTERN_LEN + 1);
        let err = index.search_regex(&pattern, 5).unwrap_err();
        assert!(matches!(err, SearchError::PatternTooLong { len: 201, max: 200 }));
        assert!(index.search_regex(&"a".repeat(MAX_PATTERN_LEN), 5).is_ok());
    }

    #[test]
    fn regex_ties_keep_catalog_order() {
        let index = sample_index();
        let hits = index.search_regex("_", 5).unwrap();
        assert_eq!(names(&hits), vec!["read_file", "write_file", "http_get"]);
    }

    #[test]
    fn hybrid_surfaces_regex_only_matches() {
        let index = sample_index();
        // "^http" tokenizes to "http", but the regex anchor is what matches
        // the name; BM25 also matches the description word.
        let hybrid = index.search("^http", SearchMode::Hybrid, 5).unwrap();
        assert_eq!(hybrid[0].name, "http_get");

        // "_get" is not a token of any document, but the regex matches the name.
        assert!(index.search_bm25("_get$", 5).is_empty());
        let hybrid = index.search("_get$", SearchMode::Hybrid, 5).unwrap();
        assert_eq!(names(&hybrid), vec!["http_get"]);
        assert_eq!(hybrid[0].score, HYBRID_REGEX_WEIGHT * REGEX_NAME_SCORE);
    }

    #[test]
    fn hybrid_sums_bm25_and_weighted_regex() {
        let index = sample_index();
        let bm25 = index.search_bm25("file", 10);
        let hybrid = index.search("file", SearchMode::Hybrid, 5).unwrap();
        assert_eq!(names(&hybrid), vec!["read_file", "write_file"]);
        let expected = bm25[0].score + HYBRID_REGEX_WEIGHT * REGEX_NAME_SCORE;
        assert!((hybrid[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn overlong_query_is_rejected_in_hybrid_and_regex_modes() {
        let index = sample_index();
        let query = format!("http {}", "x".repeat(MAX_PATTERN_LEN));
        for mode in [SearchMode::Hybrid, SearchMode::Regex] {
            assert!(matches!(
                index.search(&query, mode, 5),
                Err(SearchError::PatternTooLong { .. })
            ));
        }
        assert_eq!(
            names(&index.search(&query, SearchMode::Bm25, 5).unwrap()),
            vec!["http_get"]
        );
    }

    #[test]
    fn catalog_over_cap_is_rejected() {
        let tools: Vec<ToolDef> = (0..=MAX_CATALOG_TOOLS)
            .map(|i| ToolDef::new(format!("tool_{i}"), "", json!({})))
            .collect();
        let mut index = ToolIndex::new();
        let err = index.add_tools(&tools).unwrap_err();
        assert!(matches!(
            err,
            SearchError::CatalogTooLarge {
                count: 10_001,
                max: 10_000
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn lookup_helpers() {
        let index = sample_index();
        assert_eq!(index.len(), 3);
        assert!(index.contains("http_get"));
        assert_eq!(index.description("read_file"), Some("Read a file from disk"));
        assert_eq!(
            index.tool_names().collect::<Vec<_>>(),
            vec!["read_file", "write_file", "http_get"]
        );
    }

    #[test]
    fn search_mode_parses_and_displays() {
        assert_eq!("BM25".parse::<SearchMode>().unwrap(), SearchMode::Bm25);
        assert_eq!(" regex ".parse::<SearchMode>().unwrap(), SearchMode::Regex);
        assert!("semantic".parse::<SearchMode>().is_err());
        assert_eq!(SearchMode::Hybrid.to_string(), "hybrid");
        assert_eq!(
            serde_json::to_value(SearchMode::Bm25).unwrap(),
            json!("bm25")
        );
    }
}
