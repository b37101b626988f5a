//! Explain command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn explain_shows_decision_and_flags() {
  let env = TestEnv::from_fixture("prefer_prebuilt.json");

  env
    .modgraph_cmd()
    .arg("explain")
    .arg(&env.graph_path)
    .arg("libfoo")
    .assert()
    .success()
    .stdout(predicate::str::contains("Family libfoo (2 member(s))"))
    .stdout(predicate::str::contains("libfoo [source, hidden, replaced]"))
    .stdout(predicate::str::contains("prebuilt_libfoo [prebuilt]"))
    .stdout(predicate::str::contains("→ prebuilt_libfoo (prefer flag)"));
}

#[test]
fn explain_names_manifest_as_source_of_decision() {
  let env = TestEnv::from_fixture("manifest.json");
  let product = env.with_product("product_manifest.json");

  env
    .modgraph_cmd()
    .arg("explain")
    .arg(&env.graph_path)
    .arg("libfoo")
    .arg("--product")
    .arg(&product)
    .assert()
    .success()
    .stdout(predicate::str::contains("(manifest foo.contributions)"));
}

#[test]
fn explain_conflict_lists_diagnostics_without_failing() {
  let env = TestEnv::from_fixture("conflict.json");
  let product = env.with_product("product_conflict.json");

  env
    .modgraph_cmd()
    .arg("explain")
    .arg(&env.graph_path)
    .arg("libfoo")
    .arg("--product")
    .arg(&product)
    .assert()
    .success()
    .stdout(predicate::str::contains("Family libfoo (3 member(s))"))
    .stderr(predicate::str::contains("multiple prebuilts selected"));
}

#[test]
fn explain_json_reports_members() {
  let env = TestEnv::from_fixture("prefer_prebuilt.json");

  let output = env
    .modgraph_cmd()
    .arg("explain")
    .arg(&env.graph_path)
    .arg("libfoo")
    .arg("--json")
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["family"], "libfoo");
  let members = report["members"].as_array().unwrap();
  assert_eq!(members.len(), 2);
  assert_eq!(members[0]["selection"]["decision"]["use"], "use_prebuilt");
  assert_eq!(members[0]["replaced_by_prebuilt"], true);
}
