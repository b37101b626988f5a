//! Module nodes of the build graph.

mod types;

pub use types::*;
