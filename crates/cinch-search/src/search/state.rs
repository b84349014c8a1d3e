//! Per-session tool visibility state.
//!
//! The host owns one [`SessionState`] per conversation and threads it
//! through [`ToolSearchPolicy::filter_tools`](super::policy::ToolSearchPolicy::filter_tools)
//! and [`ToolSearchPolicy::handle_search`](super::policy::ToolSearchPolicy::handle_search).
//! The expanded set only ever grows: merging is a set union, so concurrent
//! search results within one turn can be combined in any order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Names of tools unlocked for a session.
///
/// Stored sorted so serialized state is stable across runs.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ExpandedToolSet(BTreeSet<String>);

impl ExpandedToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool name. Returns `true` if it was not already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Union `other` into this set.
    pub fn merge(&mut self, other: &ExpandedToolSet) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Return the union of two sets without modifying either.
    pub fn union(&self, other: &ExpandedToolSet) -> ExpandedToolSet {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }
}

impl<S: Into<String>> FromIterator<S> for ExpandedToolSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ExpandedToolSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Conversation-scoped state consumed by the search policy.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Tools visible beyond the always-include set.
    #[serde(default)]
    pub expanded_tools: ExpandedToolSet,
}

impl SessionState {
    /// Start a session with the given tools already expanded (typically the
    /// policy's always-include list).
    pub fn with_expanded<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expanded_tools: names.into_iter().collect(),
        }
    }

    /// Whether a tool has been unlocked in this session.
    pub fn is_expanded(&self, name: &str) -> bool {
        self.expanded_tools.contains(name)
    }

    /// Fold another state (e.g. from a parallel tool call) into this one.
    pub fn merge(&mut self, other: &SessionState) {
        self.expanded_tools.merge(&other.expanded_tools);
    }
}
