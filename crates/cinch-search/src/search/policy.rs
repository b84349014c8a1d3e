//! Deferred tool loading: decides which tools a model call gets to see.
//!
//! When a catalog's tool definitions would occupy too much of the context
//! window, the policy switches to **deferred mode**: each request only
//! carries the always-include tools, the tools unlocked earlier in the
//! session, and a `search_tools` meta-tool. Calling `search_tools` ranks
//! the catalog and unlocks the matches for the rest of the session.
//!
//! The index is built lazily from the first catalog the policy sees and is
//! read-only afterwards. Direct vs. deferred mode is decided at that point
//! and never changes for the lifetime of the policy.
//!
//! The policy itself holds no per-session data. Hosts keep a
//! [`SessionState`] per conversation, pass it to
//! [`filter_tools`](ToolSearchPolicy::filter_tools), and adopt the state
//! returned by [`handle_search`](ToolSearchPolicy::handle_search).

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::{MAX_SEARCH_LIMIT, ToolSearchConfig};
use super::index::{SearchHit, SearchMode, ToolIndex};
use super::state::{ExpandedToolSet, SessionState};
use crate::error::Result;
use crate::tools::budget::CatalogBudget;
use crate::tools::names::SEARCH_TOOLS;
use crate::{ModelInfo, ToolDef, json_schema_for};

/// Longest tool description shown in search output, in characters.
const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// System prompt fragment appended in deferred mode.
pub const SEARCH_TOOLS_PROMPT: &str = "\
## Tool discovery

Only a subset of the available tools is loaded. If none of the tools you can \
see fits the task, call `search_tools` with keywords describing what you need \
(e.g. \"create github issue\" or \"read csv\"). Matching tools are unlocked and \
become callable from your next step onward. Use mode \"regex\" to match tool \
names by pattern (e.g. \"^git_\"). Search again with different wording if the \
first attempt finds nothing useful.";

// ── search_tools arguments ─────────────────────────────────────────

/// Arguments of the `search_tools` meta-tool.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, Default, PartialEq)]
pub struct SearchToolsArgs {
    /// Keywords describing the capability you need, or a regex pattern when
    /// mode is "regex".
    pub query: String,
    /// Search strategy: "bm25" (keyword relevance), "regex" (pattern over
    /// names and descriptions), or "hybrid" (both). Defaults to the
    /// configured mode.
    #[serde(default)]
    pub mode: Option<SearchMode>,
    /// Maximum number of tools to return (at most 5).
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchToolsArgs {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Definition of the `search_tools` meta-tool sent to the model.
pub fn search_tools_definition() -> ToolDef {
    ToolDef::new(
        SEARCH_TOOLS,
        "Search the full tool catalog and unlock matching tools for the rest of \
         the session. Use this when none of the currently available tools fits \
         the task. Returns each match with a relevance score and a short \
         description.",
        json_schema_for::<SearchToolsArgs>(),
    )
}

// ── Results ────────────────────────────────────────────────────────

/// Tools to present for one model call.
#[derive(Debug, Clone)]
pub struct FilteredTools {
    /// Visible tool definitions in catalog order, followed by `search_tools`.
    pub tools: Vec<ToolDef>,
    /// Instructions to append to the system prompt (deferred mode only).
    pub prompt_addendum: Option<String>,
}

/// Result of a `search_tools` call.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Human-readable summary returned to the model.
    pub text: String,
    /// Session state to adopt. Equal to the input state when nothing was
    /// unlocked.
    pub state: SessionState,
    /// Ranked matches (empty when the search could not run).
    pub hits: Vec<SearchHit>,
    /// Tools unlocked by this call, in rank order.
    pub newly_expanded: Vec<String>,
}

impl SearchOutcome {
    fn unchanged(text: String, state: &SessionState) -> Self {
        Self {
            text,
            state: state.clone(),
            hits: Vec::new(),
            newly_expanded: Vec::new(),
        }
    }

    /// The tools this call unlocked, as a set that can be unioned into a
    /// shared session state by hosts running searches in parallel.
    pub fn delta(&self) -> ExpandedToolSet {
        self.newly_expanded.iter().cloned().collect()
    }
}

// ── Policy ─────────────────────────────────────────────────────────

/// Immutable product of the one-time index build.
#[derive(Debug)]
struct IndexedCatalog {
    index: ToolIndex,
    budget: CatalogBudget,
    deferred: bool,
}

/// Decides tool visibility per request and serves `search_tools`.
///
/// # Example
///
/// ```
/// use cinch_search::prelude::*;
/// use serde_json::json;
///
/// let catalog = vec![
///     ToolDef::new("read_file", "Read a file from disk", json!({})),
///     ToolDef::new("write_file", "Write a file to disk", json!({})),
///     ToolDef::new("http_get", "Fetch a URL over HTTP", json!({})),
/// ];
/// let policy = ToolSearchPolicy::new(
///     &UnknownModel,
///     ToolSearchConfig::default().with_force_deferred(true),
/// )
/// .unwrap();
///
/// let session = policy.initial_state();
/// let visible = policy.filter_tools(&catalog, &session).unwrap();
/// assert_eq!(visible.tools.len(), 1); // just search_tools
///
/// let outcome = policy
///     .handle_search(&SearchToolsArgs::new("file"), &session)
///     .unwrap();
/// assert_eq!(outcome.newly_expanded, vec!["read_file", "write_file"]);
///
/// let visible = policy.filter_tools(&catalog, &outcome.state).unwrap();
/// assert_eq!(visible.tools.len(), 3);
/// ```
#[derive(Debug)]
pub struct ToolSearchPolicy {
    config: ToolSearchConfig,
    always_include: HashSet<String>,
    context_window: Option<usize>,
    indexed: OnceLock<IndexedCatalog>,
    /// Serializes the one-time index build.
    init_lock: Mutex<()>,
    builds: AtomicUsize,
}

/// Name used for this component by agent frameworks that model it as
/// request middleware.
pub type ToolSearchMiddleware = ToolSearchPolicy;

impl ToolSearchPolicy {
    /// Create a policy for a model. The model is consulted only for its
    /// context window, which matters when the threshold is a fraction.
    pub fn new(model: &dyn ModelInfo, config: ToolSearchConfig) -> Result<Self> {
        config.validate()?;
        let always_include = config.always_include.iter().cloned().collect();
        Ok(Self {
            context_window: model.max_input_tokens(),
            always_include,
            config,
            indexed: OnceLock::new(),
            init_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &ToolSearchConfig {
        &self.config
    }

    /// A fresh session with the always-include tools expanded.
    pub fn initial_state(&self) -> SessionState {
        SessionState::with_expanded(self.config.always_include.iter().cloned())
    }

    /// Whether the index has been built.
    pub fn is_indexed(&self) -> bool {
        self.indexed.get().is_some()
    }

    /// Deferred-mode decision, or `None` before the index is built.
    pub fn is_deferred(&self) -> Option<bool> {
        self.indexed.get().map(|c| c.deferred)
    }

    /// Token accounting from the index build, or `None` before it.
    pub fn budget(&self) -> Option<&CatalogBudget> {
        self.indexed.get().map(|c| &c.budget)
    }

    /// How many times the index has been built (at most once).
    pub fn index_builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Build the index from `catalog` if it has not been built yet.
    ///
    /// Safe to call from several threads at once: exactly one caller
    /// builds, the rest wait and reuse its result. A build failure leaves
    /// the policy un-indexed so a later call can retry.
    pub fn ensure_index(&self, catalog: &[ToolDef]) -> Result<&CatalogBudget> {
        if let Some(indexed) = self.indexed.get() {
            return Ok(&indexed.budget);
        }
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(indexed) = self.indexed.get() {
            return Ok(&indexed.budget);
        }

        let built = self.build(catalog)?;
        self.builds.fetch_add(1, Ordering::Relaxed);
        Ok(&self.indexed.get_or_init(|| built).budget)
    }

    fn build(&self, catalog: &[ToolDef]) -> Result<IndexedCatalog> {
        let searchable: Vec<ToolDef> = catalog
            .iter()
            .filter(|t| t.function.name != SEARCH_TOOLS)
            .cloned()
            .collect();

        let mut index = ToolIndex::new();
        index.add_tools(&searchable)?;

        let budget =
            CatalogBudget::measure(&searchable, self.config.threshold, self.context_window);
        let deferred = self.config.force_deferred.unwrap_or(budget.over_threshold);
        debug!(
            "Tool search {}: {}",
            if deferred { "deferred" } else { "direct" },
            budget.to_log_string()
        );
        Ok(IndexedCatalog {
            index,
            budget,
            deferred,
        })
    }

    /// Select the tools to present for one model call.
    ///
    /// Builds the index on first use. In direct mode every catalog tool is
    /// returned; in deferred mode only always-include and expanded tools.
    /// Catalog order is preserved and `search_tools` is appended last.
    pub fn filter_tools(
        &self,
        catalog: &[ToolDef],
        state: &SessionState,
    ) -> Result<FilteredTools> {
        self.ensure_index(catalog)?;
        let deferred = self.is_deferred().unwrap_or(false);

        let mut tools: Vec<ToolDef> = catalog
            .iter()
            .filter(|t| t.function.name != SEARCH_TOOLS)
            .filter(|t| !deferred || self.is_visible(&t.function.name, state))
            .cloned()
            .collect();
        tools.push(search_tools_definition());

        debug!(
            "Presenting {} of {} tool(s) ({} mode)",
            tools.len() - 1,
            catalog.len(),
            if deferred { "deferred" } else { "direct" }
        );

        Ok(FilteredTools {
            tools,
            prompt_addendum: deferred.then(|| SEARCH_TOOLS_PROMPT.to_string()),
        })
    }

    fn is_visible(&self, name: &str, state: &SessionState) -> bool {
        self.always_include.contains(name) || state.is_expanded(name)
    }

    /// Run a `search_tools` call against the session's state.
    ///
    /// Blank queries, an unbuilt index, and searches without matches are
    /// answered with an explanatory message and leave the state unchanged.
    /// Any other query reaches the index verbatim, so whitespace inside a
    /// regex pattern is significant. An over-long pattern is an error.
    pub fn handle_search(
        &self,
        args: &SearchToolsArgs,
        state: &SessionState,
    ) -> Result<SearchOutcome> {
        if args.query.trim().is_empty() {
            return Ok(SearchOutcome::unchanged(
                "Error: search query is empty. Describe the capability you need, \
                 e.g. \"send email\" or \"query database\"."
                    .to_string(),
                state,
            ));
        }

        let Some(indexed) = self.indexed.get() else {
            return Ok(SearchOutcome::unchanged(
                "Tool search is not initialized: the tool catalog has not been indexed yet. \
                 Try again on the next step."
                    .to_string(),
                state,
            ));
        };

        let mode = args.mode.unwrap_or(self.config.default_mode);
        let limit = args
            .limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, MAX_SEARCH_LIMIT);

        let query = args.query.as_str();
        let hits = indexed.index.search(query, mode, limit)?;
        if hits.is_empty() {
            return Ok(SearchOutcome::unchanged(
                format!(
                    "No tools found matching \"{query}\" (mode: {mode}). \
                     Try different keywords or a broader pattern."
                ),
                state,
            ));
        }

        let mut next = state.clone();
        let mut newly_expanded = Vec::new();
        for hit in &hits {
            if !self.always_include.contains(&hit.name)
                && next.expanded_tools.insert(hit.name.clone())
            {
                newly_expanded.push(hit.name.clone());
            }
        }

        if !newly_expanded.is_empty() {
            info!(
                "search_tools({query:?}) unlocked {} tool(s): {}",
                newly_expanded.len(),
                newly_expanded.join(", ")
            );
        }

        let text = format_results(query, mode, &hits, &newly_expanded, &indexed.index);
        Ok(SearchOutcome {
            text,
            state: next,
            hits,
            newly_expanded,
        })
    }

    /// Async form of [`filter_tools`](Self::filter_tools).
    pub async fn filter_tools_async(
        &self,
        catalog: &[ToolDef],
        state: &SessionState,
    ) -> Result<FilteredTools> {
        self.filter_tools(catalog, state)
    }

    /// Async form of [`handle_search`](Self::handle_search).
    pub async fn handle_search_async(
        &self,
        args: &SearchToolsArgs,
        state: &SessionState,
    ) -> Result<SearchOutcome> {
        self.handle_search(args, state)
    }
}

/// Append the deferred-mode addendum to a system prompt.
///
/// Existing text is kept. The addendum is not added twice.
pub fn apply_prompt_addendum(system_prompt: &str, addendum: Option<&str>) -> String {
    match addendum {
        Some(extra) if !system_prompt.contains(extra) => {
            if system_prompt.trim().is_empty() {
                extra.to_string()
            } else {
                format!("{system_prompt}\n\n{extra}")
            }
        }
        _ => system_prompt.to_string(),
    }
}

fn format_results(
    query: &str,
    mode: SearchMode,
    hits: &[SearchHit],
    newly_expanded: &[String],
    index: &ToolIndex,
) -> String {
    let mut out = format!(
        "Found {} tool(s) matching \"{query}\" (mode: {mode}):\n",
        hits.len()
    );
    for (rank, hit) in hits.iter().enumerate() {
        let desc = index.description(&hit.name).unwrap_or_default();
        out.push_str(&format!(
            "{}. {} (score: {:.2}) - {}\n",
            rank + 1,
            hit.name,
            hit.score,
            preview(desc, DESCRIPTION_PREVIEW_CHARS)
        ));
    }

    if newly_expanded.is_empty() {
        out.push_str("\nAll matching tools were already available.");
    } else {
        out.push_str(&format!(
            "\nNewly unlocked: {}\nThese tools can be called from your next step onward.",
            newly_expanded.join(", ")
        ));
    }
    out
}

/// Collapse whitespace and cut to at most `max` characters.
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
