use modgraph_lib::config::{EngineConfig, ProductConfig};
use modgraph_lib::default_pipeline;
use modgraph_lib::graph::{DependencyTag, ModuleGraph};
use modgraph_lib::module::{Module, ModuleId, Variant};
use modgraph_lib::pipeline::Resolution;
use modgraph_lib::prebuilt::{SELECTION, Selection};

/// Run the default pipeline over `graph`.
pub async fn resolve(graph: ModuleGraph, product: &ProductConfig) -> Resolution {
  default_pipeline(EngineConfig::with_parallelism(4))
    .expect("built-in passes register")
    .run(graph, product)
    .await
    .expect("pipeline runs")
}

/// Look up a common-variant module by its current name.
pub fn id(resolution: &Resolution, name: &str) -> ModuleId {
  id_in(resolution, name, &Variant::common())
}

pub fn id_in(resolution: &Resolution, name: &str, variant: &Variant) -> ModuleId {
  resolution
    .graph
    .lookup(name, variant)
    .unwrap_or_else(|| panic!("no module {name} in variant {variant}"))
}

pub fn hidden(resolution: &Resolution, id: ModuleId) -> bool {
  resolution.graph.module(id).hidden_from_output
}

pub fn selection(resolution: &Resolution, source: ModuleId) -> Selection {
  resolution
    .providers
    .get(source, SELECTION)
    .map(|s| (*s).clone())
    .expect("source has a selection")
}

/// Target of every non-link edge leaving `from`.
pub fn deps_of(resolution: &Resolution, from: ModuleId) -> Vec<ModuleId> {
  resolution
    .graph
    .direct_deps(from)
    .filter(|e| e.tag != DependencyTag::PREBUILT && e.tag != DependencyTag::SELECTION_MANIFEST)
    .map(|e| e.to)
    .collect()
}

/// Family `lib` with a source, one prebuilt and an `app` depending on it.
pub fn family(prefer: bool, srcs: &[&str]) -> ModuleGraph {
  let mut graph = ModuleGraph::new();
  graph
    .add_module(Module::source("lib").with_type("cc_library").with_package("lib"))
    .unwrap();
  graph
    .add_module(
      Module::prebuilt("prebuilt_lib", srcs)
        .with_type("cc_prebuilt_library")
        .with_package("prebuilts/lib")
        .with_prefer(prefer),
    )
    .unwrap();
  graph
    .add_module(Module::source("app").with_type("cc_binary").with_package("app").with_dep("lib"))
    .unwrap();
  graph
}

/// Add a selection manifest and one contributions module per
/// `(name, content)` pair.
pub fn with_manifest(mut graph: ModuleGraph, contributions: &[(&str, &str)]) -> ModuleGraph {
  for &(name, content) in contributions {
    graph
      .add_module(Module::contributions(name, &format!("com.{name}"), &[content]))
      .unwrap();
  }
  graph
    .add_module(Module::selection_manifest("all_apex_contributions"))
    .unwrap();
  graph
}
