use std::fs;

use modgraph_lib::config::ProductConfig;
use modgraph_lib::diagnostics::{ConflictKind, ModuleError};
use modgraph_lib::graph::ModuleGraph;
use modgraph_lib::load::load_graph;
use modgraph_lib::module::{ArchOverrides, Module, ModuleKind, Variant};
use modgraph_lib::output::{OutputError, OutputPlan};
use modgraph_lib::prebuilt::{Decision, DecisionSource, LegacyReason, linked_prebuilts};
use tempfile::TempDir;

use super::common::{deps_of, family, hidden, id, id_in, resolve, selection, with_manifest};

#[tokio::test]
async fn preferred_prebuilt_replaces_source() {
  let resolution = resolve(family(true, &["lib.so"]), &ProductConfig::default()).await;
  assert!(resolution.is_usable(), "{:?}", resolution.diagnostics);

  // The source holds the base name, so the prebuilt keeps its prefix.
  let source = id(&resolution, "lib");
  let prebuilt = id(&resolution, "prebuilt_lib");
  let app = id(&resolution, "app");

  assert_eq!(linked_prebuilts(&resolution.graph, source), vec![prebuilt]);
  let chosen = selection(&resolution, source);
  assert_eq!(chosen.decision, Decision::UsePrebuilt(prebuilt));
  assert_eq!(chosen.source, DecisionSource::Legacy(LegacyReason::PreferFlag));

  assert!(hidden(&resolution, source));
  assert!(resolution.graph.module(source).replaced_by_prebuilt);
  assert!(!hidden(&resolution, prebuilt));
  assert_eq!(deps_of(&resolution, app), vec![prebuilt]);
}

#[tokio::test]
async fn prebuilt_without_artifacts_falls_back_to_source() {
  let resolution = resolve(family(true, &[]), &ProductConfig::default()).await;
  assert!(resolution.is_usable());

  let source = id(&resolution, "lib");
  let prebuilt = id(&resolution, "prebuilt_lib");
  let chosen = selection(&resolution, source);
  assert_eq!(chosen.decision, Decision::UseSource);
  assert_eq!(chosen.source, DecisionSource::Legacy(LegacyReason::NoArtifacts));

  assert!(!hidden(&resolution, source));
  assert!(!resolution.graph.module(source).replaced_by_prebuilt);
  assert!(hidden(&resolution, prebuilt));
  assert_eq!(deps_of(&resolution, id(&resolution, "app")), vec![source]);
}

#[tokio::test]
async fn manifest_choice_overrides_prefer_flag() {
  let graph = with_manifest(family(false, &["lib.so"]), &[("lib.contributions", "prebuilt_lib")]);
  let product = ProductConfig::default().with_selected_contributions(&["lib.contributions"]);
  let resolution = resolve(graph, &product).await;
  assert!(resolution.is_usable(), "{:?}", resolution.diagnostics);

  let source = id(&resolution, "lib");
  let prebuilt = id(&resolution, "prebuilt_lib");
  let chosen = selection(&resolution, source);
  assert_eq!(chosen.decision, Decision::UsePrebuilt(prebuilt));
  assert_eq!(
    chosen.source,
    DecisionSource::Manifest {
      contributions: vec!["lib.contributions".to_string()]
    }
  );
  assert!(hidden(&resolution, source));
  assert!(!hidden(&resolution, prebuilt));
}

#[tokio::test]
async fn two_manifest_claims_are_a_conflict() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::source("lib")).unwrap();
  for name in ["prebuilt_lib_a", "prebuilt_lib_b"] {
    graph
      .add_module(Module::prebuilt(name, &["lib.so"]).with_source_module_name("lib"))
      .unwrap();
  }
  let graph = with_manifest(
    graph,
    &[("a.contributions", "prebuilt_lib_a"), ("b.contributions", "prebuilt_lib_b")],
  );
  let product = ProductConfig::default().with_selected_contributions(&["a.contributions", "b.contributions"]);
  let resolution = resolve(graph, &product).await;

  assert!(!resolution.is_usable());
  let source = id(&resolution, "lib");
  let conflict = resolution
    .diagnostics
    .for_module(source)
    .find_map(|d| match &d.error {
      ModuleError::Conflict {
        conflict: ConflictKind::MultipleSelected,
        candidates,
        ..
      } => Some(candidates.clone()),
      _ => None,
    })
    .expect("source records the conflict");
  let names: Vec<&str> = conflict.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, vec!["prebuilt_lib_a", "prebuilt_lib_b"]);

  // Nothing was chosen behind the conflict.
  assert!(resolution.providers.get(source, modgraph_lib::prebuilt::SELECTION).is_none());
  assert!(!resolution.graph.module(source).replaced_by_prebuilt);
  assert!(matches!(
    OutputPlan::from_resolution(&resolution),
    Err(OutputError::Unusable { .. })
  ));

  let report = resolution.family("lib").unwrap();
  assert_eq!(report.members.len(), 3);
  assert!(report.diagnostics.iter().any(|d| d.to_string().contains("prebuilt_lib_b")));
}

#[tokio::test]
async fn arch_variants_resolve_independently() {
  let mut graph = ModuleGraph::new();
  let both = |m: Module, x86: ArchOverrides| m.with_arch("arm64", ArchOverrides::default()).with_arch("x86_64", x86);
  graph.add_module(both(Module::source("lib"), ArchOverrides::default())).unwrap();
  graph
    .add_module(both(
      Module::prebuilt("lib", &["arm64/lib.so"]).with_prefer(true),
      ArchOverrides {
        srcs: Some(vec![]),
        ..Default::default()
      },
    ))
    .unwrap();
  graph
    .add_module(both(Module::source("app").with_dep("lib"), ArchOverrides::default()))
    .unwrap();

  let resolution = resolve(graph, &ProductConfig::default()).await;
  assert!(resolution.is_usable(), "{:?}", resolution.diagnostics);
  assert!(resolution.graph.lookup("lib", &Variant::common()).is_none());

  let arm = Variant::arch("arm64");
  let x86 = Variant::arch("x86_64");
  let arm_prebuilt = id_in(&resolution, "prebuilt_lib", &arm);
  assert_eq!(deps_of(&resolution, id_in(&resolution, "app", &arm)), vec![arm_prebuilt]);
  assert!(hidden(&resolution, id_in(&resolution, "lib", &arm)));

  let x86_source = id_in(&resolution, "lib", &x86);
  assert_eq!(deps_of(&resolution, id_in(&resolution, "app", &x86)), vec![x86_source]);
  assert!(hidden(&resolution, id_in(&resolution, "prebuilt_lib", &x86)));
}

#[tokio::test]
async fn common_source_with_arch_only_prebuilt_conflicts() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::source("lib")).unwrap();
  graph
    .add_module(Module::prebuilt("lib", &["lib.so"]).with_arch("arm64", ArchOverrides::default()))
    .unwrap();
  graph.add_module(Module::source("app").with_dep("lib")).unwrap();

  let resolution = resolve(graph, &ProductConfig::default()).await;
  assert!(!resolution.is_usable());

  let prebuilt = id_in(&resolution, "prebuilt_lib", &Variant::arch("arm64"));
  let errors: Vec<ModuleError> = resolution
    .diagnostics
    .for_module(prebuilt)
    .map(|d| d.error.clone())
    .collect();
  assert!(matches!(
    errors.as_slice(),
    [ModuleError::Conflict {
      conflict: ConflictKind::VariantMismatch { .. },
      ..
    }]
  ));
  assert!(matches!(
    OutputPlan::from_resolution(&resolution),
    Err(OutputError::Unusable { .. })
  ));
}

#[tokio::test]
async fn description_file_resolves_to_output_plan() {
  let temp = TempDir::new().unwrap();
  let path = temp.path().join("graph.json");
  fs::write(
    &path,
    r#"{
      "modules": [
        { "name": "libfoo", "type": "cc_library", "package": "libfoo" },
        { "name": "prebuilt_libfoo", "type": "cc_prebuilt_library", "package": "prebuilts",
          "prebuilt": { "srcs": ["libfoo.so"], "prefer": true } },
        { "name": "libbar", "type": "cc_prebuilt_library",
          "prebuilt": { "srcs": ["libbar.so"] } },
        { "name": "app", "type": "cc_binary", "package": "app", "deps": ["libfoo", "libbar"] }
      ]
    }"#,
  )
  .unwrap();

  let resolution = resolve(load_graph(&path).unwrap(), &ProductConfig::default()).await;
  let plan = OutputPlan::from_resolution(&resolution).unwrap();
  let entries: Vec<(&str, ModuleKind)> = plan.modules.iter().map(|e| (e.name.as_str(), e.kind)).collect();
  // libbar has no source, so its prebuilt takes the base name.
  assert_eq!(
    entries,
    vec![
      ("app", ModuleKind::Source),
      ("libbar", ModuleKind::Prebuilt),
      ("prebuilt_libfoo", ModuleKind::Prebuilt),
    ]
  );
}
