//! Well-known names shared across the engine.

/// Prefix that marks a declared module name as a prebuilt.
pub const PREBUILT_PREFIX: &str = "prebuilt_";

/// Module type of a contributions module in description files.
pub const CONTRIBUTIONS_MODULE_TYPE: &str = "apex_contributions";

/// Module type of the selection manifest module in description files.
pub const SELECTION_MANIFEST_MODULE_TYPE: &str = "all_apex_contributions";

/// Variant name of a module before architecture expansion.
pub const COMMON_VARIANT: &str = "common";

/// Partition a module installs to when none is declared.
pub const DEFAULT_PARTITION: &str = "system";
