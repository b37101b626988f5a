mod explain;
mod passes;
mod resolve;

pub use explain::cmd_explain;
pub use passes::cmd_passes;
pub use resolve::cmd_resolve;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use modgraph_lib::config::{EngineConfig, ProductConfig};
use modgraph_lib::default_pipeline;
use modgraph_lib::load::load_graph;
use modgraph_lib::pipeline::Resolution;

/// Load the graph and product configuration, then run the default pipeline.
fn resolve_graph(graph: &Path, product: Option<&Path>, jobs: Option<usize>) -> Result<Resolution> {
  let module_graph = load_graph(graph).with_context(|| format!("Failed to load graph: {}", graph.display()))?;
  let product = match product {
    Some(path) => ProductConfig::load(path).with_context(|| format!("Failed to load product: {}", path.display()))?,
    None => ProductConfig::default(),
  };
  let config = jobs.map(EngineConfig::with_parallelism).unwrap_or_default();
  info!(graph = %graph.display(), parallelism = config.parallelism, "resolving");

  let pipeline = default_pipeline(config).context("Failed to register passes")?;
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(pipeline.run(module_graph, &product)).context("Resolution aborted")
}
