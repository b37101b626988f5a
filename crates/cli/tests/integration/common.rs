//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the graph description
/// and, optionally, a product configuration.
pub struct TestEnv {
  pub temp: TempDir,
  pub graph_path: PathBuf,
}

impl TestEnv {
  /// Create from a graph fixture, copied to a temporary `graph.json`.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let graph_path = temp.path().join("graph.json");
    std::fs::write(&graph_path, fixture_content(name)).unwrap();
    Self { temp, graph_path }
  }

  /// Copy a product fixture next to the graph and return its path.
  pub fn with_product(&self, name: &str) -> PathBuf {
    let path = self.temp.path().join("product.json");
    std::fs::write(&path, fixture_content(name)).unwrap();
    path
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Get a Command for the modgraph binary with logging pinned to warnings.
  pub fn modgraph_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("modgraph");
    cmd.env("RUST_LOG", "warn");
    cmd.current_dir(self.temp.path());
    cmd
  }
}
