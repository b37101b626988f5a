//! Downstream consumer interface.
//!
//! After a run, consumers walk the output modules and read each one's kind.
//! [`OutputPlan`] is that walk, refused outright when the run recorded any
//! diagnostic. [`FamilyReport`] explains how one family was resolved.

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, ModuleError};
use crate::graph::ModuleGraph;
use crate::module::{ModuleId, ModuleKind, Variant};
use crate::pipeline::Resolution;
use crate::prebuilt::{Decision, PREBUILT_USABLE, PrebuiltUsable, SELECTION, Selection};

#[derive(Debug, Error)]
pub enum OutputError {
  /// Module-scoped or conflict errors were recorded.
  #[error("graph has {count} unresolved diagnostics and cannot be used for output")]
  Unusable { count: usize },
}

/// One module that reaches the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEntry {
  pub name: String,
  pub variant: Variant,
  pub kind: ModuleKind,
  pub module_type: String,
  pub partition: String,
  /// Direct dependencies that count as this module's content, by name.
  pub contents: Vec<String>,
}

/// Every output module, ordered by name and variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputPlan {
  pub modules: Vec<OutputEntry>,
}

impl OutputPlan {
  pub fn from_resolution(resolution: &Resolution) -> Result<Self, OutputError> {
    if !resolution.is_usable() {
      return Err(OutputError::Unusable {
        count: resolution.diagnostics.len(),
      });
    }

    let mut modules: Vec<OutputEntry> = resolution
      .graph
      .output_modules()
      .map(|(id, m)| OutputEntry {
        name: m.name.clone(),
        variant: m.variant.clone(),
        kind: m.kind,
        module_type: m.module_type.clone(),
        partition: m.partition.clone(),
        contents: content_names(&resolution.graph, id),
      })
      .collect();
    modules.sort_by(|a, b| (&a.name, &a.variant).cmp(&(&b.name, &b.variant)));
    Ok(Self { modules })
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }
}

fn content_names(graph: &ModuleGraph, id: ModuleId) -> Vec<String> {
  let mut names: Vec<String> = graph
    .direct_deps(id)
    .filter(|e| !e.tag.excluded_from_content_membership)
    .map(|e| graph.module(e.to).name.clone())
    .collect();
  names.sort();
  names.dedup();
  names
}

/// State of one family member after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberReport {
  pub id: ModuleId,
  pub name: String,
  pub declared_name: String,
  pub variant: Variant,
  pub kind: ModuleKind,
  pub enabled: bool,
  pub hidden: bool,
  pub replaced_by_prebuilt: bool,
  /// The decision recorded on a source module.
  pub selection: Option<Selection>,
  /// The decision recorded on a prebuilt without a source.
  pub usable: Option<PrebuiltUsable>,
}

impl MemberReport {
  /// Name of the member a source's decision picked.
  pub fn chosen<'a>(&'a self, report: &'a FamilyReport) -> Option<&'a str> {
    match self.selection.as_ref()?.decision {
      Decision::UseSource => Some(self.declared_name.as_str()),
      Decision::UsePrebuilt(id) => report
        .members
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.declared_name.as_str()),
    }
  }
}

/// How one family was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyReport {
  pub family: String,
  pub members: Vec<MemberReport>,
  pub diagnostics: Vec<Diagnostic>,
}

impl FamilyReport {
  /// Members that reach the output.
  pub fn visible(&self) -> impl Iterator<Item = &MemberReport> {
    self.members.iter().filter(|m| m.enabled && !m.hidden)
  }
}

impl Resolution {
  /// Report on the family `base_name`, or `None` if no module belongs to it.
  pub fn family(&self, base_name: &str) -> Option<FamilyReport> {
    let ids = self.graph.family_members(base_name);
    if ids.is_empty() {
      return None;
    }

    let members: Vec<MemberReport> = ids
      .iter()
      .map(|&id| {
        let m = self.graph.module(id);
        MemberReport {
          id,
          name: m.name.clone(),
          declared_name: m.declared_name.clone(),
          variant: m.variant.clone(),
          kind: m.kind,
          enabled: m.enabled,
          hidden: m.hidden_from_output,
          replaced_by_prebuilt: m.replaced_by_prebuilt,
          selection: self.providers.get(id, SELECTION).map(|s| (*s).clone()),
          usable: self.providers.get(id, PREBUILT_USABLE).map(|u| (*u).clone()),
        }
      })
      .collect();

    let diagnostics: Vec<Diagnostic> = self
      .diagnostics
      .iter()
      .filter(|d| ids.contains(&d.module) || mentions_family(d, base_name))
      .cloned()
      .collect();

    Some(FamilyReport {
      family: base_name.to_string(),
      members,
      diagnostics,
    })
  }
}

fn mentions_family(diagnostic: &Diagnostic, family: &str) -> bool {
  matches!(&diagnostic.error, ModuleError::Conflict { family: f, .. } if f == family)
}
