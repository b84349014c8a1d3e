//! Search a tool catalog and inspect the deferred-loading decision.
//!
//! # Examples
//!
//! ```sh
//! # What would search_tools return for this query?
//! cinch-search --tools tools.json search "create github issue"
//!
//! # Regex over tool names, top 3, as JSON
//! cinch-search --tools tools.json search '^git_' --mode regex --limit 3 --json
//!
//! # Would this catalog be deferred for a 200k-token model?
//! cinch-search --tools tools.json --config policy.json --context-window 200000 inspect
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=debug` for index details and
//! `CINCH_LOG_FORMAT=json` for JSON lines.

use std::path::PathBuf;
use std::process;

use cinch_search::catalog::load_catalog;
use cinch_search::observability::init_tracing;
use cinch_search::search::{SearchMode, SearchToolsArgs, ToolSearchConfig, ToolSearchPolicy};
use cinch_search::{ContextWindow, ModelInfo, Result, ToolDef, UnknownModel};
use clap::{Parser, Subcommand};

/// Search a tool catalog the way an agent's `search_tools` call would.
#[derive(Parser)]
#[command(name = "cinch-search", version)]
struct Cli {
    /// Tool catalog: JSON array of function-calling tool definitions
    #[arg(long)]
    tools: PathBuf,

    /// Policy configuration (JSON; every field optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model context window in tokens (default: 128000)
    #[arg(long)]
    context_window: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a search against a fresh session and print the tool result text
    Search {
        /// Keywords, or a pattern in regex mode
        query: String,

        /// bm25, regex, or hybrid (default: from config)
        #[arg(long)]
        mode: Option<SearchMode>,

        /// Maximum number of results (clamped to 1-5)
        #[arg(long)]
        limit: Option<usize>,

        /// Print ranked hits as JSON instead of the tool result text
        #[arg(long)]
        json: bool,
    },
    /// Print the catalog's token cost and whether tools would be deferred
    Inspect {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn build_policy(cli: &Cli) -> Result<ToolSearchPolicy> {
    let config = match &cli.config {
        Some(path) => ToolSearchConfig::from_json_file(path)?,
        None => ToolSearchConfig::default(),
    };
    let model: Box<dyn ModelInfo> = match cli.context_window {
        Some(tokens) => Box::new(ContextWindow(tokens)),
        None => Box::new(UnknownModel),
    };
    ToolSearchPolicy::new(model.as_ref(), config)
}

async fn run(cli: &Cli) -> Result<String> {
    let catalog: Vec<ToolDef> = load_catalog(&cli.tools)?;
    let policy = build_policy(cli)?;
    let session = policy.initial_state();
    let filtered = policy.filter_tools_async(&catalog, &session).await?;

    match &cli.command {
        Command::Search {
            query,
            mode,
            limit,
            json,
        } => {
            let args = SearchToolsArgs {
                query: query.clone(),
                mode: *mode,
                limit: *limit,
            };
            let outcome = policy.handle_search_async(&args, &session).await?;
            if *json {
                let report = serde_json::json!({
                    "hits": outcome.hits,
                    "newly_expanded": outcome.newly_expanded,
                });
                return Ok(serde_json::to_string_pretty(&report)?);
            }
            Ok(outcome.text)
        }
        Command::Inspect { json } => {
            let Some(budget) = policy.budget() else {
                return Ok("catalog was not indexed".into());
            };
            let deferred = policy.is_deferred().unwrap_or(false);
            if *json {
                let report = serde_json::json!({
                    "budget": budget,
                    "deferred": deferred,
                    "visible_tools": filtered
                        .tools
                        .iter()
                        .map(|t| t.function.name.as_str())
                        .collect::<Vec<_>>(),
                });
                return Ok(serde_json::to_string_pretty(&report)?);
            }
            let visible: Vec<&str> = filtered
                .tools
                .iter()
                .map(|t| t.function.name.as_str())
                .collect();
            Ok(format!(
                "tools:            {}\n\
                 estimated tokens: {}\n\
                 threshold:        {}\n\
                 mode:             {}\n\
                 initially visible: {}",
                budget.tool_count,
                budget.total_tokens,
                budget.threshold_tokens,
                if deferred { "deferred" } else { "direct" },
                visible.join(", ")
            ))
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing("warn");
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
