//! Implementation of the `modgraph passes` command.

use anyhow::{Context, Result};

use modgraph_lib::config::EngineConfig;
use modgraph_lib::default_pipeline;

use crate::output::{print_json, print_stat};

pub fn cmd_passes(json: bool) -> Result<()> {
  let pipeline = default_pipeline(EngineConfig::default()).context("Failed to register passes")?;
  let passes = pipeline.passes();

  if json {
    return print_json(&passes);
  }

  let mut current = None;
  for pass in &passes {
    if current != Some(pass.phase) {
      println!("{}:", pass.phase);
      current = Some(pass.phase);
    }
    print_stat(pass.name, &pass.traversal.to_string());
  }
  Ok(())
}
