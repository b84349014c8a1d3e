//! Deferred tool loading example — a scripted agent loop with tool search.
//!
//! Demonstrates:
//! - Registering a large catalog of `FnTool`s in a `ToolSet`
//! - Letting `ToolSearchPolicy` decide which tools each request carries
//! - Dispatching `search_tools` through the same `ToolSet` as every other tool
//!
//! The "model" is a fixed script of tool calls, so this runs offline.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=cinch_search=info cargo run --example deferred_loop
//! ```

use std::sync::{Arc, Mutex};

use cinch_search::observability::init_tracing;
use cinch_search::prelude::*;
use schemars::JsonSchema;
use serde::Deserialize;

/// Arguments shared by the generated service tools.
#[derive(Deserialize, JsonSchema)]
struct ServiceArgs {
    /// Resource identifier to operate on.
    id: String,
}

fn service_tool(service: &str, action: &str) -> FnTool {
    let name = format!("{service}_{action}");
    let description = format!("{action} a {service} resource by id");
    let label = name.clone();
    FnTool::new(
        ToolDef::new(name, description, json_schema_for::<ServiceArgs>()),
        move |args: ServiceArgs| {
            let label = label.clone();
            async move { format!("[stub] {label}({})", args.id) }
        },
    )
}

fn catalog() -> ToolSet {
    let services = ["github", "jira", "slack", "postgres", "s3", "stripe"];
    let actions = ["create", "read", "update", "delete", "list"];
    let base = ToolSet::new().with_arg_validation(true);
    services
        .iter()
        .flat_map(|s| actions.iter().map(move |a| service_tool(s, a)))
        .fold(base, |set, tool| set.with(tool))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    let mut tools = catalog();
    let defs = tools.definitions();

    let config = ToolSearchConfig::default()
        .with_threshold_tokens(500)
        .with_always_include("slack_list");
    let policy = Arc::new(ToolSearchPolicy::new(&ContextWindow(32_000), config)?);
    let session = Arc::new(Mutex::new(policy.initial_state()));
    tools.register(SearchToolsTool::new(policy.clone(), session.clone()));

    // What the model "decides" to call on each turn.
    let script = [
        ("search_tools", r#"{"query": "create github issue"}"#),
        ("github_create", r#"{"id": "bug-42"}"#),
        ("search_tools", r#"{"query": "^stripe_", "mode": "regex", "limit": 2}"#),
        ("stripe_read", r#"{"id": "ch_123"}"#),
    ];

    for (turn, (name, args)) in script.iter().enumerate() {
        let state = session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let visible = policy.filter_tools_async(&defs, &state).await?;
        let names: Vec<&str> = visible
            .tools
            .iter()
            .map(|t| t.function.name.as_str())
            .collect();
        println!("── turn {} ── visible: {}", turn + 1, names.join(", "));
        if turn == 0 {
            let prompt = apply_prompt_addendum(
                "You are an ops assistant.",
                visible.prompt_addendum.as_deref(),
            );
            println!("system prompt:\n{prompt}\n");
        }

        let result = tools.execute(name, args).await;
        println!("{name} -> {result}\n");
    }

    if let Some(budget) = policy.budget() {
        println!("{}", budget.to_log_string());
    }
    Ok(())
}
