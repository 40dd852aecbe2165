use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use weft_config::Settings;
use weft_runtime::NodeRuntime;
use weft_script::{Interpreter, InterpreterOptions, ScriptDefinition};
use weft_workflow::{ExecutionState, WorkflowContext, WorkflowNode};

/// Weft - declarative node logic with fault-tolerant execution
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a settings file (JSON). Defaults apply when omitted.
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a script function or a single node
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run a function of a script definition
  Function {
    /// Path to the script definition (JSON)
    script_file: PathBuf,

    /// Name of the function to run
    name: String,

    /// Positional arguments as a JSON array
    #[arg(long)]
    args: Option<String>,
  },

  /// Run a single node with its recovery strategy
  Node {
    /// Path to the node definition (JSON)
    node_file: PathBuf,

    /// Workflow context as JSON; stdin is used as `data` when piped
    #[arg(long)]
    context: Option<String>,

    /// Execution state as JSON
    #[arg(long)]
    state: Option<String>,

    /// Print the recovery metrics export to stderr afterwards
    #[arg(long)]
    metrics: bool,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load_or_default(cli.config.as_deref())
    .context("failed to load settings")?;

  match cli.command {
    Some(Commands::Run { target }) => match target {
      RunTarget::Function {
        script_file,
        name,
        args,
      } => {
        run_function(&settings, &script_file, &name, args.as_deref())?;
      }
      RunTarget::Node {
        node_file,
        context,
        state,
        metrics,
      } => {
        run_node(settings, node_file, context, state, metrics)?;
      }
    },
    None => {
      println!("weft - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_function(settings: &Settings, script_file: &Path, name: &str, args: Option<&str>) -> Result<()> {
  let script = ScriptDefinition::from_path(script_file)
    .with_context(|| format!("failed to load script: {}", script_file.display()))?;

  let args = match args {
    Some(json) => match serde_json::from_str(json).context("failed to parse --args")? {
      serde_json::Value::Array(items) => items,
      other => bail!("--args must be a JSON array, got {}", other),
    },
    None => Vec::new(),
  };

  let interpreter = Interpreter::new().with_options(InterpreterOptions {
    strict_kinds: settings.script.strict_kinds,
  });
  let result = interpreter
    .run_function(&script, name, &args)
    .with_context(|| format!("function '{}' failed", name))?;

  // `undefined` has no JSON form; print null.
  println!(
    "{}",
    serde_json::to_string_pretty(&result.unwrap_or(serde_json::Value::Null))?
  );

  Ok(())
}

fn run_node(
  settings: Settings,
  node_file: PathBuf,
  context: Option<String>,
  state: Option<String>,
  metrics: bool,
) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_node_async(settings, node_file, context, state, metrics).await })
}

async fn run_node_async(
  settings: Settings,
  node_file: PathBuf,
  context: Option<String>,
  state: Option<String>,
  metrics: bool,
) -> Result<()> {
  let node_content = tokio::fs::read_to_string(&node_file)
    .await
    .with_context(|| format!("failed to read node file: {}", node_file.display()))?;

  let node: WorkflowNode = serde_json::from_str(&node_content)
    .with_context(|| format!("failed to parse node file: {}", node_file.display()))?;

  let context: WorkflowContext = match context {
    Some(json) => serde_json::from_str(&json).context("failed to parse --context")?,
    None => WorkflowContext::default().with_data(read_payload_from_stdin()?),
  };

  let state: ExecutionState = match state {
    Some(json) => serde_json::from_str(&json).context("failed to parse --state")?,
    None => ExecutionState::default(),
  };

  eprintln!("Running node: {} (type: {})", node.id, node.node_type);

  let runtime = NodeRuntime::from_settings(&settings);

  let cancel = CancellationToken::new();
  let interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      interrupt.cancel();
    }
  });

  let result = runtime
    .execute_node(&node, &context, &state, cancel)
    .await
    .context("node execution failed")?;

  if metrics {
    eprintln!(
      "{}",
      serde_json::to_string_pretty(&runtime.recovery().export_metrics())?
    );
  }

  println!("{}", serde_json::to_string_pretty(&result)?);

  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
