//! `eval-nodes` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: check a node definition JSON file.
//! - `run`: execute a node definition once.
//! - `next-row`: emit the next row of a dataset (resumable trigger).
//!
//! Node state is kept in a JSON file (`--state`), so repeated invocations
//! continue where the previous one stopped.

mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use client::{ClientConfig, PlatformClient};
use engine::{CursorConfig, ScopeStore};
use nodes::resumable_trigger::ResumableDatasetTriggerNode;
use nodes::{build_node, ExecutableNode, ExecutionContext, NodeDefinition};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::store::FileStore;

#[derive(Parser)]
#[command(
    name = "eval-nodes",
    about = "Dataset, evaluation and prompt nodes for an evaluation platform",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a node definition JSON file.
    Validate {
        /// Path to the node definition JSON file.
        path: PathBuf,
    },
    /// Execute a node definition once.
    Run {
        path: PathBuf,
        /// JSON input item passed to the node.
        #[arg(long)]
        input: Option<String>,
        #[command(flatten)]
        state: StateArgs,
        #[command(flatten)]
        platform: PlatformArgs,
    },
    /// Emit the next row of a dataset, resuming from the state file.
    NextRow {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value = "next-row")]
        node_id: String,
        #[command(flatten)]
        state: StateArgs,
        #[command(flatten)]
        platform: PlatformArgs,
    },
}

#[derive(Args)]
struct WindowArgs {
    #[arg(long)]
    dataset: String,
    #[arg(long, default_value_t = 0)]
    start_row: i64,
    /// Inclusive last row, or "all".
    #[arg(long, default_value = "all")]
    end_row: String,
    #[arg(long, default_value_t = 1)]
    step_size: i64,
    /// Cap the window at this many rows.
    #[arg(long)]
    max_rows: Option<usize>,
    /// Shuffle the dataset; 0 picks a random order.
    #[arg(long)]
    shuffle_seed: Option<i64>,
    /// Refetch the dataset and start over.
    #[arg(long)]
    reset: bool,
}

#[derive(Args)]
struct StateArgs {
    /// JSON file holding node state between runs.
    #[arg(long = "state", default_value = ".eval-nodes-state.json")]
    path: PathBuf,
}

#[derive(Args)]
struct PlatformArgs {
    /// Overrides EVAL_API_URL.
    #[arg(long)]
    api_url: Option<String>,
    /// Overrides EVAL_API_KEY.
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl PlatformArgs {
    fn connect(self) -> anyhow::Result<Arc<PlatformClient>> {
        let mut config = match (self.api_url, self.api_key) {
            (Some(url), Some(key)) => ClientConfig::new(url, key),
            (url, key) => {
                let mut config = ClientConfig::from_env()
                    .context("platform credentials missing; pass --api-url/--api-key or set the environment")?;
                if let Some(url) = url {
                    config.base_url = url;
                }
                if let Some(key) = key {
                    config.api_key = key;
                }
                config
            }
        };
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(Arc::new(PlatformClient::new(config)?))
    }
}

/// Cursor configuration for `next-row`. Passing `--max-rows` enables the row
/// limit and passing `--shuffle-seed` (even 0) enables shuffling.
fn next_row_config(args: &WindowArgs) -> anyhow::Result<CursorConfig> {
    let config = CursorConfig::from_params(&json!({
        "collectionId": args.dataset,
        "startRow": args.start_row,
        "endRow": args.end_row,
        "stepSize": args.step_size,
        "limitRows": args.max_rows.is_some(),
        "maxRows": args.max_rows.unwrap_or(10),
        "shuffleRows": args.shuffle_seed.is_some(),
        "shuffleSeed": args.shuffle_seed.unwrap_or(0),
        "resetProgress": args.reset,
    }))?;
    Ok(config)
}

fn read_definition(path: &PathBuf) -> anyhow::Result<NodeDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid node definition in {}", path.display()))
}

async fn execute(
    node: Arc<dyn ExecutableNode>,
    node_id: &str,
    input: Value,
    store: Arc<dyn ScopeStore>,
) -> anyhow::Result<()> {
    let mut ctx = ExecutionContext::new(node_id, store);
    ctx.input = input.clone();
    let output = node.execute(input, &ctx).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => {
            let def = read_definition(&path)?;
            // Validation never talks to the platform.
            let offline = Arc::new(nodes::mock::MockPlatform::new());
            if let Err(e) = build_node(&def, offline) {
                bail!("validation failed for node '{}': {e}", def.id);
            }
            println!("node '{}' ({}) is valid", def.id, def.node_type);
        }
        Command::Run { path, input, state, platform } => {
            let def = read_definition(&path)?;
            let input: Value = match input {
                Some(raw) => serde_json::from_str(&raw).context("--input is not valid JSON")?,
                None => Value::Null,
            };
            let node = build_node(&def, platform.connect()?)?;
            info!("running node '{}' ({}) with state in {}", def.id, def.node_type, state.path.display());
            execute(node, &def.id, input, Arc::new(FileStore::new(state.path))).await?;
        }
        Command::NextRow { window, node_id, state, platform } => {
            let config = next_row_config(&window)?;
            let node = Arc::new(ResumableDatasetTriggerNode::new(platform.connect()?, config));
            execute(node, &node_id, Value::Null, Arc::new(FileStore::new(state.path))).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::EndRow;

    fn window_args(args: &[&str]) -> WindowArgs {
        let argv = ["eval-nodes", "next-row"].iter().chain(args.iter()).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Command::NextRow { window, .. } => window,
            _ => panic!("expected next-row"),
        }
    }

    #[test]
    fn next_row_defaults_match_node_defaults() {
        let config = next_row_config(&window_args(&["--dataset", "qa"])).unwrap();
        assert_eq!(config, CursorConfig::new("qa"));
        assert_eq!(config.row_limit(), None);
        assert!(!config.shuffle_rows);
    }

    #[test]
    fn seeded_limited_window_is_mapped() {
        let args = window_args(&[
            "--dataset", "qa",
            "--start-row", "2",
            "--end-row", "9",
            "--step-size", "2",
            "--max-rows", "3",
            "--shuffle-seed", "42",
            "--reset",
        ]);
        let config = next_row_config(&args).unwrap();

        assert_eq!(config.start_row, 2);
        assert_eq!(config.end_row, EndRow::Index(9));
        assert_eq!(config.step_size, 2);
        assert_eq!(config.row_limit(), Some(3));
        assert!(config.shuffle_rows);
        assert_eq!(config.shuffle_seed, 42);
        assert!(config.reset_progress);
    }

    #[test]
    fn explicit_zero_seed_requests_a_random_shuffle() {
        let config = next_row_config(&window_args(&["--dataset", "qa", "--shuffle-seed", "0"])).unwrap();
        assert!(config.shuffle_rows);
        assert_eq!(config.shuffle_seed, 0);
    }

    #[test]
    fn invalid_window_is_rejected() {
        assert!(next_row_config(&window_args(&["--dataset", "qa", "--max-rows", "0"])).is_err());
        assert!(next_row_config(&window_args(&["--dataset", "qa", "--end-row", "last"])).is_err());
    }
}
