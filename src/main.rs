use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use blok_node::{ExecutionContext, NodeRunner};
use blok_nodes::NodeRegistry;

/// Blok - run workflow nodes with validated input and output
#[derive(Parser)]
#[command(name = "blok")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a single node
  Run {
    /// Name of the node to run
    node: String,

    /// Path to an execution context file (JSON). Read from stdin when omitted.
    #[arg(long)]
    context: Option<PathBuf>,

    /// Request body (JSON), overrides the context's request body
    #[arg(long)]
    body: Option<String>,

    /// Node config (JSON object), overrides the context's config
    #[arg(long)]
    config: Option<String>,

    /// Output format: json, pretty, or file:<path>
    #[arg(long, default_value = "pretty")]
    output: OutputFormat,
  },

  /// List available nodes
  List,

  /// Print a node's input and output schemas
  Schema {
    /// Name of the node
    node: String,
  },
}

#[derive(Debug, Clone)]
enum OutputFormat {
  Json,
  Pretty,
  File(PathBuf),
}

impl FromStr for OutputFormat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "json" => Ok(Self::Json),
      "pretty" => Ok(Self::Pretty),
      _ => match s.strip_prefix("file:") {
        Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
        _ => Err(format!("unknown output format '{}'", s)),
      },
    }
  }
}

fn main() -> Result<()> {
  init_tracing();
  let cli = Cli::parse();

  let registry = NodeRegistry::builtin().context("failed to load built-in nodes")?;

  match cli.command {
    Some(Commands::Run {
      node,
      context,
      body,
      config,
      output,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      let success = rt.block_on(async {
        run_node(&registry, &node, context.as_deref(), body, config, &output).await
      })?;
      if !success {
        std::process::exit(1);
      }
    }
    Some(Commands::List) => {
      for name in registry.names() {
        println!("{}", name);
      }
    }
    Some(Commands::Schema { node }) => {
      let node = registry.get(&node)?;
      let schemas = node.schemas().get_schemas();
      println!("{}", serde_json::to_string_pretty(&schemas)?);
    }
    None => {
      println!("blok - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .try_init();
}

/// Run a node and write its report. Returns whether the envelope succeeded.
async fn run_node(
  registry: &NodeRegistry,
  node_name: &str,
  context_file: Option<&Path>,
  body: Option<String>,
  config: Option<String>,
  output: &OutputFormat,
) -> Result<bool> {
  // Resolve node and context
  let node = registry.get(node_name)?;
  let ctx = build_context(context_file, body, config).await?;

  // Ctrl-C cancels the in-flight handler
  let cancel = CancellationToken::new();
  let signal_cancel = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      signal_cancel.cancel();
    }
  });

  // Execute node
  let start = Instant::now();
  let result = NodeRunner::new()
    .run_with_cancel(node.as_ref(), &ctx, cancel)
    .await;
  let duration_ms = start.elapsed().as_millis() as u64;

  // Write report
  match result {
    Ok(envelope) => {
      let report = serde_json::json!({
        "node": node_name,
        "success": envelope.success,
        "duration_ms": duration_ms,
        "result": envelope,
      });
      write_output(&report, output).await?;
      Ok(envelope.success)
    }
    Err(e) => {
      let report = serde_json::json!({
        "node": node_name,
        "success": false,
        "duration_ms": duration_ms,
        "error": e.to_string(),
      });
      write_output(&report, output).await?;
      Err(e).with_context(|| format!("node '{}' failed", node_name))
    }
  }
}

async fn build_context(
  context_file: Option<&Path>,
  body: Option<String>,
  config: Option<String>,
) -> Result<ExecutionContext> {
  let mut ctx = match context_file {
    Some(path) => {
      let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read context file: {}", path.display()))?;
      serde_json::from_str(&content)
        .with_context(|| format!("failed to parse context file: {}", path.display()))?
    }
    None => read_context_from_stdin()?,
  };

  if let Some(body) = body {
    ctx.request.body = serde_json::from_str(&body).context("failed to parse --body JSON")?;
  }

  if let Some(config) = config {
    let value: serde_json::Value =
      serde_json::from_str(&config).context("failed to parse --config JSON")?;
    match value {
      serde_json::Value::Object(map) => ctx.config = map,
      _ => bail!("--config must be a JSON object"),
    }
  }

  Ok(ctx)
}

fn read_context_from_stdin() -> Result<ExecutionContext> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(ExecutionContext::new());
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read context from stdin")?;

  if input.trim().is_empty() {
    Ok(ExecutionContext::new())
  } else {
    serde_json::from_str(&input).context("failed to parse context JSON from stdin")
  }
}

async fn write_output(report: &serde_json::Value, format: &OutputFormat) -> Result<()> {
  match format {
    OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
    OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(report)?),
    OutputFormat::File(path) => {
      if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
          .await
          .with_context(|| format!("failed to create directory: {}", dir.display()))?;
      }
      tokio::fs::write(path, serde_json::to_string_pretty(report)?)
        .await
        .with_context(|| format!("failed to write output file: {}", path.display()))?;
      eprintln!("Output written to: {}", path.display());
    }
  }
  Ok(())
}
