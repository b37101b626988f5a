use modgraph_lib::config::{EngineConfig, ProductConfig};
use modgraph_lib::default_pipeline;
use modgraph_lib::diagnostics::{ConflictKind, ModuleError};
use modgraph_lib::graph::{DependencyTag, ModuleGraph};
use modgraph_lib::module::{Module, ModuleId, Variant};
use modgraph_lib::pipeline::Resolution;
use modgraph_lib::prebuilt::{Decision, DecisionSource, LegacyReason};

use super::common::{deps_of, family, hidden, id, resolve, selection, with_manifest};

fn visible_members(resolution: &Resolution, family: &str) -> Vec<String> {
  resolution
    .family(family)
    .map(|r| r.visible().map(|m| m.name.clone()).collect())
    .unwrap_or_default()
}

#[tokio::test]
async fn exactly_one_member_reaches_the_output() {
  for prefer in [true, false] {
    for srcs in [&["lib.so"][..], &[][..]] {
      let resolution = resolve(family(prefer, srcs), &ProductConfig::default()).await;
      assert!(resolution.is_usable());

      let visible = visible_members(&resolution, "lib");
      let expected = if prefer && !srcs.is_empty() { "prebuilt_lib" } else { "lib" };
      assert_eq!(visible, vec![expected.to_string()], "prefer={prefer} srcs={srcs:?}");
    }
  }
}

#[tokio::test]
async fn unopposed_prebuilt_is_addressable_by_base_name_only() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::prebuilt("libz", &["libz.so"])).unwrap();
  graph.add_module(Module::source("app").with_dep("libz")).unwrap();

  let resolution = resolve(graph, &ProductConfig::default()).await;
  assert!(resolution.is_usable());

  let prebuilt = id(&resolution, "libz");
  assert!(resolution.graph.module(prebuilt).is_prebuilt());
  assert!(resolution.graph.lookup("prebuilt_libz", &Variant::common()).is_none());
  assert_eq!(deps_of(&resolution, id(&resolution, "app")), vec![prebuilt]);
}

#[tokio::test]
async fn rival_prebuilts_without_source_keep_prefixed_names_and_conflict() {
  let mut graph = ModuleGraph::new();
  for name in ["prebuilt_libz_v1", "prebuilt_libz_v2"] {
    graph
      .add_module(Module::prebuilt(name, &["libz.so"]).with_source_module_name("libz"))
      .unwrap();
  }

  let resolution = resolve(graph, &ProductConfig::default()).await;
  assert!(!resolution.graph.names().lookup_any("libz"));
  assert!(!resolution.is_usable());
  assert!(resolution.diagnostics.iter().all(|d| matches!(
    &d.error,
    ModuleError::Conflict {
      conflict: ConflictKind::MultipleSelected,
      ..
    }
  )));
}

#[tokio::test]
async fn manifest_beats_config_variable_and_prefer() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::source("lib")).unwrap();
  graph
    .add_module(
      Module::prebuilt("lib", &["lib.so"])
        .with_prefer(false)
        .with_use_source_config_var("lib", "use_source"),
    )
    .unwrap();
  let graph = with_manifest(graph, &[("lib.contributions", "prebuilt_lib")]);
  let product = ProductConfig::default()
    .with_selected_contributions(&["lib.contributions"])
    .with_vendor_var("lib", "use_source", "true");

  let resolution = resolve(graph, &product).await;
  assert!(resolution.is_usable(), "{:?}", resolution.diagnostics);

  let source = id(&resolution, "lib");
  assert!(selection(&resolution, source).source.is_manifest());
  assert!(hidden(&resolution, source));
  assert!(resolution.graph.module(source).replaced_by_prebuilt);
  assert!(!hidden(&resolution, id(&resolution, "prebuilt_lib")));
}

#[tokio::test]
async fn manifest_choice_without_artifacts_uses_legacy_rules() {
  let graph = with_manifest(family(true, &[]), &[("lib.contributions", "prebuilt_lib")]);
  let product = ProductConfig::default().with_selected_contributions(&["lib.contributions"]);

  let resolution = resolve(graph, &product).await;
  let source = id(&resolution, "lib");
  let chosen = selection(&resolution, source);
  assert_eq!(chosen.decision, Decision::UseSource);
  assert_eq!(chosen.source, DecisionSource::Legacy(LegacyReason::NoArtifacts));
  // The manifest's choice is not viable, so the sweep leaves the source alone.
  assert!(!hidden(&resolution, source));
}

#[tokio::test]
async fn pinned_edges_are_never_redirected() {
  let mut graph = family(true, &["lib.so"]);
  graph
    .add_module(Module::source("tool").with_package("lib").with_pinned_dep("lib"))
    .unwrap();

  let resolution = resolve(graph, &ProductConfig::default()).await;
  assert!(resolution.is_usable(), "{:?}", resolution.diagnostics);

  let source = id(&resolution, "lib");
  let tool = id(&resolution, "tool");
  assert!(hidden(&resolution, source));
  let pinned: Vec<ModuleId> = resolution
    .graph
    .direct_deps(tool)
    .filter(|e| e.tag == DependencyTag::NO_REPLACE)
    .map(|e| e.to)
    .collect();
  assert_eq!(pinned, vec![source]);
  assert_eq!(deps_of(&resolution, id(&resolution, "app")), vec![id(&resolution, "prebuilt_lib")]);
}

#[tokio::test]
async fn second_run_keeps_the_same_assignment() {
  let graph = with_manifest(family(false, &["lib.so"]), &[("lib.contributions", "prebuilt_lib")]);
  let product = ProductConfig::default().with_selected_contributions(&["lib.contributions"]);
  let pipeline = default_pipeline(EngineConfig::with_parallelism(2)).unwrap();

  let first = pipeline.run(graph, &product).await.unwrap();
  assert!(first.is_usable(), "{:?}", first.diagnostics);
  let flags = |r: &Resolution| -> Vec<(String, bool, bool)> {
    r.graph
      .modules()
      .map(|(_, m)| (m.to_string(), m.hidden_from_output, m.replaced_by_prebuilt))
      .collect()
  };
  let before = flags(&first);
  let edges = first.graph.edge_count();

  let second = pipeline.resume(first, &product).await.unwrap();
  assert!(second.is_usable(), "{:?}", second.diagnostics);
  assert_eq!(flags(&second), before);
  assert_eq!(second.graph.edge_count(), edges);
}
