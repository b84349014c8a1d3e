//! `search_tools` as a regular [`Tool`] bound to one session.
//!
//! Hosts that dispatch every model tool call through a [`ToolSet`] register
//! a [`SearchToolsTool`] next to their other tools. Each call runs the
//! search against the shared session and unions the unlocked tools into it,
//! so the next [`filter_tools`](ToolSearchPolicy::filter_tools) pass on that
//! session sees them.
//!
//! [`ToolSet`]: crate::tools::ToolSet

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use super::policy::{SearchToolsArgs, ToolSearchPolicy, search_tools_definition};
use super::state::SessionState;
use crate::ToolDef;
use crate::tools::core::{Tool, ToolFuture, parse_tool_args};

/// The `search_tools` meta-tool for one conversation.
///
/// # Example
///
/// ```ignore
/// let policy = Arc::new(ToolSearchPolicy::new(&model, config)?);
/// let session = Arc::new(Mutex::new(policy.initial_state()));
///
/// let tools = ToolSet::new()
///     .with(ReadFile::new())
///     .with(SearchToolsTool::new(policy.clone(), session.clone()));
/// ```
#[derive(Debug, Clone)]
pub struct SearchToolsTool {
    policy: Arc<ToolSearchPolicy>,
    session: Arc<Mutex<SessionState>>,
}

impl SearchToolsTool {
    pub fn new(policy: Arc<ToolSearchPolicy>, session: Arc<Mutex<SessionState>>) -> Self {
        Self { policy, session }
    }

    /// Snapshot of the bound session.
    pub fn session(&self) -> SessionState {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn run(&self, args: &SearchToolsArgs) -> String {
        let snapshot = self.session();
        match self.policy.handle_search(args, &snapshot) {
            Ok(outcome) => {
                if !outcome.newly_expanded.is_empty() {
                    // Union rather than replace: another call on this session
                    // may have unlocked tools since the snapshot was taken.
                    self.session
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .merge(&outcome.state);
                }
                outcome.text
            }
            Err(e) => {
                warn!("search_tools failed: {e}");
                format!("Error: {e}")
            }
        }
    }
}

impl Tool for SearchToolsTool {
    fn definition(&self) -> ToolDef {
        search_tools_definition()
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let parsed = parse_tool_args::<SearchToolsArgs>(arguments);
        Box::pin(async move {
            match parsed {
                Ok(args) => self.run(&args),
                Err(e) => e,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UnknownModel;
    use crate::search::{SearchMode, ToolSearchConfig};
    use crate::tools::ToolSet;
    use crate::tools::names::SEARCH_TOOLS;
    use serde_json::json;

    fn catalog() -> Vec<ToolDef> {
        vec![
            ToolDef::new("read_file", "Read a file from disk", json!({})),
            ToolDef::new("write_file", "Write a file to disk", json!({})),
            ToolDef::new("http_get", "Fetch a URL over HTTP", json!({})),
        ]
    }

    fn setup() -> (Arc<ToolSearchPolicy>, Arc<Mutex<SessionState>>, SearchToolsTool) {
        let policy = Arc::new(
            ToolSearchPolicy::new(
                &UnknownModel,
                ToolSearchConfig::default().with_force_deferred(true),
            )
            .unwrap(),
        );
        policy.ensure_index(&catalog()).unwrap();
        let session = Arc::new(Mutex::new(SessionState::default()));
        let tool = SearchToolsTool::new(policy.clone(), session.clone());
        (policy, session, tool)
    }

    #[test]
    fn definition_is_search_tools() {
        let (_, _, tool) = setup();
        assert_eq!(tool.name(), SEARCH_TOOLS);
    }

    #[tokio::test]
    async fn execution_unlocks_tools_for_next_filter() {
        let (policy, session, tool) = setup();
        let result = tool.execute(r#"{"query": "http"}"#).await;
        assert!(result.contains("Newly unlocked: http_get"));

        let state = session.lock().unwrap().clone();
        let filtered = policy.filter_tools(&catalog(), &state).unwrap();
        let names: Vec<&str> = filtered
            .tools
            .iter()
            .map(|t| t.function.name.as_str())
            .collect();
        assert_eq!(names, vec!["http_get", SEARCH_TOOLS]);
    }

    #[tokio::test]
    async fn concurrent_calls_union_their_results() {
        let (_, _, tool) = setup();
        let (a, b) = tokio::join!(
            tool.execute(r#"{"query": "http"}"#),
            tool.execute(r#"{"query": "^read", "mode": "regex"}"#),
        );
        assert!(a.contains("http_get"));
        assert!(b.contains("read_file"));
        let state = tool.session();
        assert!(state.is_expanded("http_get"));
        assert!(state.is_expanded("read_file"));
    }

    #[tokio::test]
    async fn bad_arguments_are_reported() {
        let (_, session, tool) = setup();
        let result = tool.execute(r#"{"mode": "bm25"}"#).await;
        assert!(result.starts_with("Error: invalid tool arguments"));
        assert!(session.lock().unwrap().expanded_tools.is_empty());
    }

    #[tokio::test]
    async fn search_errors_become_error_strings() {
        let (_, session, tool) = setup();
        let args = SearchToolsArgs::new("x".repeat(201)).with_mode(SearchMode::Regex);
        let result = tool.execute(&serde_json::to_string(&args).unwrap()).await;
        assert!(result.starts_with("Error:"));
        assert!(result.contains("200"));
        assert!(session.lock().unwrap().expanded_tools.is_empty());
    }

    #[tokio::test]
    async fn toolset_validates_search_arguments() {
        let (_, _, tool) = setup();
        let set = ToolSet::new().with_arg_validation(true).with(tool);
        let result = set
            .execute(SEARCH_TOOLS, r#"{"query": "file", "mode": "fuzzy"}"#)
            .await;
        assert!(result.starts_with("Error: argument validation failed"));

        let result = set
            .execute(SEARCH_TOOLS, r#"{"query": "file", "limit": 2}"#)
            .await;
        assert!(result.contains("read_file"));
    }
}
