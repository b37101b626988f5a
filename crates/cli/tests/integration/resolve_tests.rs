//! Resolve command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn resolve_prefers_prebuilt() {
  let env = TestEnv::from_fixture("prefer_prebuilt.json");

  env
    .modgraph_cmd()
    .arg("resolve")
    .arg(&env.graph_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("prebuilt_libfoo (prebuilt, cc_prebuilt_library, system)"))
    .stdout(predicate::str::contains("libfoo (source").not())
    .stdout(predicate::str::contains("Resolved 2 output module(s)"));
}

#[test]
fn resolve_verbose_lists_replacements() {
  let env = TestEnv::from_fixture("prefer_prebuilt.json");

  env
    .modgraph_cmd()
    .arg("resolve")
    .arg(&env.graph_path)
    .arg("--verbose")
    .assert()
    .success()
    .stdout(predicate::str::contains("Replaced by prebuilts:"))
    .stdout(predicate::str::contains("libfoo → prebuilt_libfoo (prefer flag)"));
}

#[test]
fn resolve_json_lists_output_modules() {
  let env = TestEnv::from_fixture("prefer_prebuilt.json");

  let output = env
    .modgraph_cmd()
    .arg("resolve")
    .arg(&env.graph_path)
    .arg("--json")
    .output()
    .unwrap();
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let modules = plan["modules"].as_array().unwrap();
  assert_eq!(modules.len(), 2);
  assert_eq!(modules[1]["name"], "prebuilt_libfoo");
  assert_eq!(modules[1]["kind"], "prebuilt");
}

#[test]
fn resolve_without_product_ignores_manifest() {
  let env = TestEnv::from_fixture("manifest.json");

  env
    .modgraph_cmd()
    .arg("resolve")
    .arg(&env.graph_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("libfoo (source, cc_library, system)"));
}

#[test]
fn resolve_with_product_follows_manifest() {
  let env = TestEnv::from_fixture("manifest.json");
  let product = env.with_product("product_manifest.json");

  env
    .modgraph_cmd()
    .arg("resolve")
    .arg(&env.graph_path)
    .arg("--product")
    .arg(&product)
    .assert()
    .success()
    .stdout(predicate::str::contains("prebuilt_libfoo (prebuilt"))
    .stdout(predicate::str::contains("libfoo (source").not());
}

#[test]
fn resolve_conflict_fails_with_diagnostics() {
  let env = TestEnv::from_fixture("conflict.json");
  let product = env.with_product("product_conflict.json");

  env
    .modgraph_cmd()
    .arg("resolve")
    .arg(&env.graph_path)
    .arg("--product")
    .arg(&product)
    .assert()
    .failure()
    .stderr(predicate::str::contains("multiple prebuilts selected in family libfoo"))
    .stderr(predicate::str::contains("prebuilt_libfoo_a"))
    .stderr(predicate::str::contains("prebuilt_libfoo_b"))
    .stderr(predicate::str::contains("cannot be used for output"));
}

#[test]
fn resolve_conflict_json_reports_diagnostics() {
  let env = TestEnv::from_fixture("conflict.json");
  let product = env.with_product("product_conflict.json");

  let output = env
    .modgraph_cmd()
    .arg("resolve")
    .arg(&env.graph_path)
    .arg("--product")
    .arg(&product)
    .arg("--json")
    .output()
    .unwrap();
  assert!(!output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let kinds: Vec<&str> = report["diagnostics"]
    .as_array()
    .unwrap()
    .iter()
    .filter_map(|d| d["error"]["kind"].as_str())
    .collect();
  assert!(kinds.iter().all(|k| *k == "conflict"), "{kinds:?}");
  assert!(!kinds.is_empty());
}

#[test]
fn resolve_bad_product_fails() {
  let env = TestEnv::from_fixture("prefer_prebuilt.json");
  let product = env.write_file("product.json", r#"{ "selected_contributions": 3 }"#);

  env
    .modgraph_cmd()
    .arg("resolve")
    .arg(&env.graph_path)
    .arg("--product")
    .arg(&product)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load product"));
}
