//! Application of queued mutations at a pass barrier.
//!
//! Mutations apply in a fixed order: splits, renames, new edges, redirects,
//! then flags. Within each group they apply in module id order.

use tracing::debug;

use crate::graph::{EdgeId, GraphError, ModuleGraph, Rename};

use super::context::Mutation;

/// Counts of applied mutations, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MutationStats {
  pub splits: usize,
  pub renames: usize,
  pub edges_added: usize,
  pub edges_redirected: usize,
  pub flags: usize,
}

pub(crate) fn apply_mutations(graph: &mut ModuleGraph, mutations: Vec<Mutation>) -> Result<MutationStats, GraphError> {
  let mut stats = MutationStats::default();
  let mut splits = Vec::new();
  let mut renames = Vec::new();
  let mut additions = Vec::new();
  let mut redirects = Vec::new();
  let mut flags = Vec::new();

  for mutation in mutations {
    match mutation {
      Mutation::Split { module, variants } => splits.push((module, variants)),
      Mutation::Rename { module, to } => renames.push((module, to)),
      Mutation::AddDependency { from, to, tag } => additions.push((from, to, tag)),
      Mutation::RedirectInbound { from, to } => redirects.push((from, to)),
      flag @ (Mutation::SetHidden { .. } | Mutation::SetReplacedByPrebuilt { .. }) => flags.push(flag),
    }
  }

  for (module, variants) in splits {
    graph.split_module(module, variants)?;
    stats.splits += 1;
  }

  let batch: Vec<Rename> = renames
    .into_iter()
    .map(|(module, to)| {
      let m = graph.module(module);
      Rename {
        module,
        variant: m.variant.clone(),
        from: m.name.clone(),
        to,
      }
    })
    .collect();
  graph.apply_renames(&batch)?;
  stats.renames = batch.len();

  for (from, to, tag) in additions {
    if graph.direct_deps(from).any(|e| e.to == to && e.tag == tag) {
      continue;
    }
    graph.add_dependency(from, to, tag);
    stats.edges_added += 1;
  }

  for (from, to) in redirects {
    let edges: Vec<EdgeId> = graph
      .dependents(from)
      .filter(|e| !e.tag.excluded_from_replacement && e.from != to)
      .map(|e| e.id)
      .collect();
    for edge in edges {
      graph.redirect_edge(edge, to);
      stats.edges_redirected += 1;
    }
  }

  for flag in flags {
    match flag {
      Mutation::SetHidden { module, hidden } => graph.module_mut(module).hidden_from_output = hidden,
      Mutation::SetReplacedByPrebuilt { module, replaced } => graph.module_mut(module).replaced_by_prebuilt = replaced,
      _ => continue,
    }
    stats.flags += 1;
  }

  debug!(
    splits = stats.splits,
    renames = stats.renames,
    edges_added = stats.edges_added,
    edges_redirected = stats.edges_redirected,
    flags = stats.flags,
    "applied mutations"
  );

  Ok(stats)
}
