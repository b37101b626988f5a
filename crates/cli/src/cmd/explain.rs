//! Implementation of the `modgraph explain` command.
//!
//! Resolves the graph and shows every member of one family, the decision its
//! source recorded, and the diagnostics that involve it.

use std::path::Path;

use anyhow::{Result, bail};

use modgraph_lib::output::MemberReport;

use super::resolve_graph;
use crate::output::{print_diagnostic, print_info, print_json, print_stat, symbols};

pub fn cmd_explain(graph: &Path, family: &str, product: Option<&Path>, json: bool) -> Result<()> {
  let resolution = resolve_graph(graph, product, None)?;
  let Some(report) = resolution.family(family) else {
    bail!("No module belongs to family {}", family);
  };

  if json {
    return print_json(&report);
  }

  print_info(&format!("Family {} ({} member(s))", report.family, report.members.len()));
  for member in &report.members {
    let marker = if member.enabled && !member.hidden {
      symbols::VISIBLE
    } else {
      symbols::HIDDEN
    };
    println!("  {} {} [{}]", marker, display_name(member), flags(member).join(", "));

    if let Some(selection) = &member.selection {
      let chosen = member.chosen(&report).unwrap_or("unknown");
      print_stat("  decision", &format!("{} {} ({})", symbols::ARROW, chosen, selection.source));
    }
    if let Some(usable) = &member.usable {
      print_stat("  usable", &format!("{} ({})", usable.usable, usable.source));
    }
  }

  if !report.diagnostics.is_empty() {
    println!();
    for diagnostic in &report.diagnostics {
      print_diagnostic(diagnostic);
    }
  }
  Ok(())
}

fn display_name(member: &MemberReport) -> String {
  if member.variant.is_common() {
    member.name.clone()
  } else {
    format!("{}[{}]", member.name, member.variant)
  }
}

fn flags(member: &MemberReport) -> Vec<&'static str> {
  let mut flags = vec![member.kind.as_str()];
  if !member.enabled {
    flags.push("disabled");
  }
  if member.hidden {
    flags.push("hidden");
  }
  if member.replaced_by_prebuilt {
    flags.push("replaced");
  }
  flags
}
