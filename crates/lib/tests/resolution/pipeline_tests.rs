use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use modgraph_lib::config::{EngineConfig, ProductConfig};
use modgraph_lib::diagnostics::{ConflictKind, ModuleError};
use modgraph_lib::graph::ModuleGraph;
use modgraph_lib::module::Module;
use modgraph_lib::pipeline::{Phase, Pipeline, PipelineError, Resolution, Traversal, VisitError};
use modgraph_lib::prebuilt::{Decision, DecisionSource, LegacyReason, SELECTION};
use modgraph_lib::register_builtin_passes;

use super::common::{family, hidden, id, resolve, selection};

fn errors_of(resolution: &Resolution, name: &str) -> Vec<ModuleError> {
  resolution
    .diagnostics
    .for_module(id(resolution, name))
    .map(|d| d.error.clone())
    .collect()
}

#[tokio::test]
async fn custom_pass_reads_selection_after_builtins() {
  let seen = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&seen);

  let mut builder = Pipeline::builder().with_config(EngineConfig::with_parallelism(3));
  register_builtin_passes(&mut builder).unwrap();
  builder
    .register_pass(Phase::Final, "count_replaced", Traversal::Parallel, move |ctx| {
      if let Some(selection) = ctx.provider(SELECTION)
        && matches!(selection.decision, Decision::UsePrebuilt(_))
      {
        counter.fetch_add(1, Ordering::SeqCst);
      }
      Ok(())
    })
    .unwrap();

  let resolution = builder
    .build()
    .run(family(true, &["lib.so"]), &ProductConfig::default())
    .await
    .unwrap();
  assert!(resolution.is_usable());
  assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fatal_visit_aborts_the_run() {
  let mut builder = Pipeline::builder();
  register_builtin_passes(&mut builder).unwrap();
  builder
    .register_pass(Phase::PostDependency, "explode", Traversal::BottomUp, |ctx| {
      if ctx.module().name == "app" {
        return Err(VisitError::Fatal("invariant broken".to_string()));
      }
      Ok(())
    })
    .unwrap();

  let err = builder
    .build()
    .run(family(true, &["lib.so"]), &ProductConfig::default())
    .await
    .unwrap_err();
  match err {
    PipelineError::Fatal { pass, module, message } => {
      assert_eq!(pass, "explode");
      assert_eq!(module, "app");
      assert_eq!(message, "invariant broken");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn config_variable_takes_precedence_over_prefer() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::source("lib")).unwrap();
  graph
    .add_module(
      Module::prebuilt("lib", &["lib.so"])
        .with_prefer(true)
        .with_use_source_config_var("lib", "use_source"),
    )
    .unwrap();

  let product = ProductConfig::default().with_vendor_var("lib", "use_source", "true");
  let resolution = resolve(graph.clone(), &product).await;
  let chosen = selection(&resolution, id(&resolution, "lib"));
  assert_eq!(chosen.decision, Decision::UseSource);
  assert_eq!(chosen.source, DecisionSource::Legacy(LegacyReason::ConfigVariable));

  // Unset means the prebuilt is used.
  let resolution = resolve(graph, &ProductConfig::default()).await;
  let chosen = selection(&resolution, id(&resolution, "lib"));
  assert!(matches!(chosen.decision, Decision::UsePrebuilt(_)));
}

#[tokio::test]
async fn malformed_config_variable_is_a_module_error() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::source("lib")).unwrap();
  graph
    .add_module(Module::prebuilt("lib", &["lib.so"]).with_use_source_config_var("lib", "use_source"))
    .unwrap();
  graph.add_module(Module::source("other")).unwrap();

  let product = ProductConfig::default().with_vendor_var("lib", "use_source", "maybe");
  let resolution = resolve(graph, &product).await;

  assert!(!resolution.is_usable());
  let errors = errors_of(&resolution, "lib");
  assert_eq!(errors.len(), 1);
  assert!(matches!(&errors[0], ModuleError::MalformedConfigVariable { value, .. } if value == "maybe"));
  assert!(errors_of(&resolution, "other").is_empty());
  assert!(resolution.providers.get(id(&resolution, "lib"), SELECTION).is_none());
}

#[tokio::test]
async fn partition_mismatch_is_a_conflict() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::source("lib")).unwrap();
  graph
    .add_module(Module::prebuilt("lib", &["lib.so"]).with_prefer(true).with_partition("vendor"))
    .unwrap();

  let resolution = resolve(graph, &ProductConfig::default()).await;
  let errors = errors_of(&resolution, "lib");
  assert_eq!(errors.len(), 1);
  assert!(matches!(
    &errors[0],
    ModuleError::Conflict {
      conflict: ConflictKind::PartitionMismatch { .. },
      ..
    }
  ));
  assert!(errors[0].to_string().contains("partition is different"));
  assert!(!hidden(&resolution, id(&resolution, "lib")));
}

#[tokio::test]
async fn namespace_gating_rejects_unexported_prebuilts() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::source("lib")).unwrap();
  graph
    .add_module(Module::prebuilt("lib", &["lib.so"]).with_prefer(true).with_exported(false))
    .unwrap();

  let product = ProductConfig::default().with_namespace_gating(true);
  let resolution = resolve(graph, &product).await;
  let chosen = selection(&resolution, id(&resolution, "lib"));
  assert_eq!(chosen.decision, Decision::UseSource);
  assert_eq!(chosen.source, DecisionSource::Legacy(LegacyReason::NotExported));
}

#[tokio::test]
async fn missing_dependencies_are_reported_unless_allowed() {
  let mut graph = ModuleGraph::new();
  graph.add_module(Module::source("app").with_dep("nowhere")).unwrap();

  let resolution = resolve(graph.clone(), &ProductConfig::default()).await;
  let errors = errors_of(&resolution, "app");
  assert_eq!(
    errors,
    vec![ModuleError::MissingDependency {
      dep: "nowhere".to_string()
    }]
  );
  assert_eq!(
    resolution.diagnostics.iter().next().map(|d| d.to_string()),
    Some("app (deps): depends on undefined module nowhere".to_string())
  );

  let allowed = ProductConfig::default().with_allow_missing_dependencies(true);
  assert!(resolve(graph, &allowed).await.is_usable());
}

#[tokio::test]
async fn visibility_is_checked_against_the_rewired_target() {
  let mut graph = ModuleGraph::new();
  graph
    .add_module(Module::source("lib").with_package("lib").with_visibility(&["//app:__pkg__"]))
    .unwrap();
  graph
    .add_module(
      Module::prebuilt("lib", &["lib.so"])
        .with_package("prebuilts/lib")
        .with_prefer(true)
        .with_visibility(&["//visibility:private"]),
    )
    .unwrap();
  graph
    .add_module(Module::source("app").with_package("app").with_dep("lib"))
    .unwrap();

  let resolution = resolve(graph, &ProductConfig::default()).await;
  let errors = errors_of(&resolution, "app");
  assert_eq!(
    errors,
    vec![ModuleError::NotVisible {
      dep: "prebuilt_lib".to_string()
    }]
  );
}
