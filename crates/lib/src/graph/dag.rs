//! Traversal DAG for bottom-up passes.
//!
//! A petgraph snapshot of the module graph with edges pointing from each
//! dependency to its dependent, used to compute dependency-first orderings and
//! the waves a bottom-up pass runs in.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::module::ModuleId;

use super::{GraphError, ModuleGraph};

pub struct TraversalDag {
  graph: DiGraph<ModuleId, ()>,
}

impl TraversalDag {
  /// Snapshot `graph` and verify it has no dependency cycle.
  pub fn from_graph(graph: &ModuleGraph) -> Result<Self, GraphError> {
    let mut dag = DiGraph::with_capacity(graph.len(), graph.edge_count());

    // Node indices line up with module ids.
    for (id, _) in graph.modules() {
      dag.add_node(id);
    }

    for edge in graph.edges() {
      if edge.from == edge.to {
        return Err(GraphError::CycleDetected);
      }
      dag.add_edge(NodeIndex::new(edge.to.0), NodeIndex::new(edge.from.0), ());
    }

    let dag = Self { graph: dag };
    toposort(&dag.graph, None).map_err(|_| GraphError::CycleDetected)?;
    Ok(dag)
  }

  /// Modules with every dependency ahead of its dependents.
  pub fn bottom_up_order(&self) -> Result<Vec<ModuleId>, GraphError> {
    let sorted = toposort(&self.graph, None).map_err(|_| GraphError::CycleDetected)?;
    Ok(sorted.into_iter().map(|idx| self.graph[idx]).collect())
  }

  /// Modules grouped into waves.
  ///
  /// Every module's dependencies sit in earlier waves, so the modules of one
  /// wave can be visited concurrently. Each wave is sorted by id.
  pub fn waves(&self) -> Result<Vec<Vec<ModuleId>>, GraphError> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();
    let mut ready: Vec<NodeIndex> = in_degree.iter().filter(|(_, deg)| **deg == 0).map(|(idx, _)| *idx).collect();
    let mut visited = 0;
    let mut waves = Vec::new();

    while !ready.is_empty() {
      visited += ready.len();
      let mut next = Vec::new();
      for idx in &ready {
        // Parallel edges show up once per edge, matching the in-degree count.
        for dependent in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&dependent) {
            *deg -= 1;
            if *deg == 0 {
              next.push(dependent);
            }
          }
        }
      }

      let mut wave: Vec<ModuleId> = ready.iter().map(|idx| self.graph[*idx]).collect();
      wave.sort();
      waves.push(wave);
      ready = next;
    }

    if visited != self.graph.node_count() {
      return Err(GraphError::CycleDetected);
    }
    Ok(waves)
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }
}
