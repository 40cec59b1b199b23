//! # Instance Type Extender
//!
//! Adds statically configured extended resources to cloud instance types, scoped per node pool.
//!
//! Rules pair an instance name pattern with an optional node pool label gate and a set of
//! resource quantities. For each (node pool, instance type name) pair the first passing rule
//! is resolved once and cached; its resources are then written into the candidate's capacity.

pub mod extender;
pub mod extension;
pub mod loader;
pub mod match_cache;
pub mod matcher;
pub mod merger;
pub mod rule;
pub mod types;

// Re-export commonly used types
pub use extender::{ExtenderStats, InstanceTypeExtender, LazyExtender};
pub use extension::{ExtensionParser, ExtensionSpec, InstanceTypeExtensionSpec, ParseError};
pub use loader::{load_rules, try_load_rules, ExtenderConfig, LoadError};
pub use match_cache::{CachedMatch, MatchCache};
pub use rule::{CompileError, CompileReport, Rule, RuleCompiler};
pub use types::{
    InstanceType, InstanceTypeView, Labels, NodePool, NodePoolKey, NodePoolView, ResourceList,
};
