//! Implementation of the `modgraph resolve` command.
//!
//! Loads a graph description, runs every pass and prints the modules that
//! reach the output. Any recorded diagnostic fails the command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Result, bail};

use modgraph_lib::output::OutputPlan;
use modgraph_lib::pipeline::Resolution;
use modgraph_lib::prebuilt::{Decision, SELECTION};

use super::resolve_graph;
use crate::output::{format_duration, print_diagnostic, print_info, print_json, print_success, symbols};

pub fn cmd_resolve(graph: &Path, product: Option<&Path>, jobs: Option<usize>, json: bool, verbose: bool) -> Result<()> {
  let started = Instant::now();
  let resolution = resolve_graph(graph, product, jobs)?;
  let elapsed = started.elapsed();

  if !resolution.is_usable() {
    if json {
      let diagnostics: Vec<_> = resolution.diagnostics.iter().collect();
      print_json(&serde_json::json!({ "diagnostics": diagnostics }))?;
    } else {
      for diagnostic in resolution.diagnostics.iter() {
        print_diagnostic(diagnostic);
      }
    }
    bail!(
      "{} diagnostic(s) recorded, the graph cannot be used for output",
      resolution.diagnostics.len()
    );
  }

  let plan = OutputPlan::from_resolution(&resolution)?;
  if json {
    return print_json(&plan);
  }

  for entry in &plan.modules {
    let name = if entry.variant.is_common() {
      entry.name.clone()
    } else {
      format!("{}[{}]", entry.name, entry.variant)
    };
    println!("  {} {} ({}, {}, {})", symbols::INFO, name, entry.kind, entry.module_type, entry.partition);
  }

  if verbose {
    print_replacements(&resolution);
  }

  println!();
  print_success(&format!(
    "Resolved {} output module(s) in {}",
    plan.len(),
    format_duration(elapsed)
  ));
  Ok(())
}

fn print_replacements(resolution: &Resolution) {
  let replaced: Vec<String> = resolution
    .graph
    .modules()
    .filter_map(|(id, module)| {
      let selection = resolution.providers.get(id, SELECTION)?;
      match selection.decision {
        Decision::UsePrebuilt(prebuilt) => Some(format!(
          "{} {} {} ({})",
          module,
          symbols::ARROW,
          resolution.graph.module(prebuilt),
          selection.source
        )),
        Decision::UseSource => None,
      }
    })
    .collect();

  if replaced.is_empty() {
    return;
  }
  println!();
  print_info("Replaced by prebuilts:");
  for line in replaced {
    println!("  {}", line);
  }
}
