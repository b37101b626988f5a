//! Visibility enforcement.
//!
//! Runs in the final phase, after rewiring, so that dependents are checked
//! against the module they actually ended up depending on.
//!
//! # Rules
//!
//! - `//visibility:public`: any package (the default)
//! - `//visibility:private`: the owning package only
//! - `//pkg:__pkg__` or `//pkg`: exactly `pkg`
//! - `//pkg:__subpackages__`: `pkg` and everything below it
//! - `:__pkg__`, `:__subpackages__`: the same, relative to the owning package

use tracing::trace;

use crate::diagnostics::ModuleError;
use crate::module::Module;
use crate::pipeline::{Phase, PipelineBuilder, RegistrationError, Traversal, VisitContext, VisitError};

pub const VISIBILITY_PASS: &str = "visibility";

const PUBLIC: &str = "//visibility:public";
const PRIVATE: &str = "//visibility:private";

pub fn register_visibility_passes(builder: &mut PipelineBuilder) -> Result<(), RegistrationError> {
  builder.register_pass(Phase::Final, VISIBILITY_PASS, Traversal::Parallel, visit)?;
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityRule {
  Public,
  Private,
  Package(String),
  Subpackages(String),
}

impl VisibilityRule {
  /// Parse one rule of a module in package `owner`.
  pub fn parse(rule: &str, owner: &str) -> Result<Self, ModuleError> {
    let invalid = |reason: &str| ModuleError::InvalidVisibilityRule {
      rule: rule.to_string(),
      reason: reason.to_string(),
    };

    match rule {
      PUBLIC => return Ok(VisibilityRule::Public),
      PRIVATE => return Ok(VisibilityRule::Private),
      _ => {}
    }

    let (pkg, scope) = if let Some(rest) = rule.strip_prefix("//") {
      match rest.split_once(':') {
        Some((pkg, scope)) => (pkg, scope),
        None => (rest, "__pkg__"),
      }
    } else if let Some(scope) = rule.strip_prefix(':') {
      (owner, scope)
    } else {
      return Err(invalid("must start with // or :"));
    };

    if pkg == "visibility" {
      return Err(invalid("unrecognized visibility rule"));
    }
    match scope {
      "__pkg__" => Ok(VisibilityRule::Package(pkg.to_string())),
      "__subpackages__" => Ok(VisibilityRule::Subpackages(pkg.to_string())),
      _ => Err(invalid("scope must be one of \"__pkg__\", \"__subpackages__\"")),
    }
  }

  /// True if a module in `package` may depend on a module in `owner`
  /// carrying this rule.
  pub fn admits(&self, package: &str, owner: &str) -> bool {
    match self {
      VisibilityRule::Public => true,
      VisibilityRule::Private => package == owner,
      VisibilityRule::Package(pkg) => package == pkg,
      VisibilityRule::Subpackages(pkg) => {
        pkg.is_empty()
          || package == pkg
          || package.strip_prefix(pkg.as_str()).is_some_and(|rest| rest.starts_with('/'))
      }
    }
  }
}

/// Parse every rule of `module`. Empty rules mean public.
pub fn parse_rules(module: &Module) -> Result<Vec<VisibilityRule>, Vec<ModuleError>> {
  if module.visibility.is_empty() {
    return Ok(vec![VisibilityRule::Public]);
  }

  let mut rules = Vec::new();
  let mut errors = Vec::new();
  for rule in &module.visibility {
    match VisibilityRule::parse(rule, &module.package) {
      Ok(parsed) => rules.push(parsed),
      Err(e) => errors.push(e),
    }
  }

  if rules.len() > 1 {
    for (exclusive, spelled) in [(VisibilityRule::Private, PRIVATE), (VisibilityRule::Public, PUBLIC)] {
      if rules.contains(&exclusive) {
        errors.push(ModuleError::InvalidVisibilityRule {
          rule: spelled.to_string(),
          reason: "cannot be mixed with any other visibility rules".to_string(),
        });
      }
    }
  }

  if errors.is_empty() { Ok(rules) } else { Err(errors) }
}

/// True if `dependent` may depend on `target`. Targets with invalid rules
/// admit everyone; their own visit reports the rules.
pub fn is_visible_to(target: &Module, dependent: &Module) -> bool {
  if target.package == dependent.package {
    return true;
  }
  match parse_rules(target) {
    Ok(rules) => rules.iter().any(|r| r.admits(&dependent.package, &target.package)),
    Err(_) => true,
  }
}

fn visit(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  if module.hidden_from_output {
    return Ok(());
  }

  if let Err(errors) = parse_rules(module) {
    for error in errors {
      ctx.report_error(error);
    }
  }

  let graph = ctx.graph();
  let denied: Vec<String> = graph
    .direct_deps(ctx.id())
    .filter(|e| !e.tag.excluded_from_visibility_enforcement)
    .map(|e| graph.module(e.to))
    .filter(|target| !is_visible_to(target, module))
    .map(|target| target.name.clone())
    .collect();

  for dep in denied {
    trace!(module = %module, dep = %dep, "dependency not visible");
    ctx.report_error(ModuleError::NotVisible { dep });
  }
  Ok(())
}
