mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// modgraph - resolve source and prebuilt modules in a build graph
#[derive(Parser)]
#[command(name = "modgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve a graph description and print the output plan
  Resolve {
    /// Path to the graph description (JSON)
    graph: PathBuf,

    /// Path to the product configuration (JSON)
    #[arg(short, long)]
    product: Option<PathBuf>,

    /// Number of concurrent visits (default: available parallelism)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },

  /// Show how one family was resolved
  Explain {
    /// Path to the graph description (JSON)
    graph: PathBuf,

    /// Base name of the family
    family: String,

    /// Path to the product configuration (JSON)
    #[arg(short, long)]
    product: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },

  /// List phases and registered passes
  Passes {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Resolve {
      graph,
      product,
      jobs,
      json,
    } => cmd::cmd_resolve(&graph, product.as_deref(), jobs, json, cli.verbose),
    Commands::Explain {
      graph,
      family,
      product,
      json,
    } => cmd::cmd_explain(&graph, &family, product.as_deref(), json),
    Commands::Passes { json } => cmd::cmd_passes(json),
  }
}
