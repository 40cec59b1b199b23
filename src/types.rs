//! # Extender Types Module
//!
//! Core type definitions and traits shared by the matcher, cache and merger.
//!
//! This module provides:
//! - Node pool identification (`NodePoolKey`)
//! - Read/write views over the host's node pool and instance type objects
//! - Simple owned implementations of those views

use std::collections::BTreeMap;
use std::fmt;

/// Resource name -> absolute integer quantity
pub type ResourceList = BTreeMap<String, i64>;

/// Label key -> exact value
pub type Labels = BTreeMap<String, String>;

// ================================================================================================
// NODE POOL IDENTIFICATION
// ================================================================================================

/// Composite identity of a node pool: (name, namespace)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePoolKey {
    pub name: String,
    pub namespace: String,
}

impl NodePoolKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        NodePoolKey {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for NodePoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}&{}", self.name, self.namespace)
    }
}

// ================================================================================================
// HOST OBJECT VIEWS
// ================================================================================================

/// Read-only view of a node pool owned by the host.
pub trait NodePoolView {
    fn name(&self) -> &str;

    fn namespace(&self) -> &str;

    /// Label lookup. `None` means the pool does not carry the label.
    fn label(&self, key: &str) -> Option<&str>;

    /// Cache key for this pool
    fn key(&self) -> NodePoolKey {
        NodePoolKey::new(self.name(), self.namespace())
    }
}

/// Read/write view of a candidate instance type owned by the host.
///
/// The extender only ever adds or overwrites capacity entries; it never removes them.
pub trait InstanceTypeView {
    fn name(&self) -> &str;

    /// Sets `capacity[resource] = quantity`, replacing any existing value.
    fn set_capacity(&mut self, resource: &str, quantity: i64);
}

impl<T: NodePoolView + ?Sized> NodePoolView for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn namespace(&self) -> &str {
        (**self).namespace()
    }

    fn label(&self, key: &str) -> Option<&str> {
        (**self).label(key)
    }
}

impl<T: InstanceTypeView + ?Sized> InstanceTypeView for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn set_capacity(&mut self, resource: &str, quantity: i64) {
        (**self).set_capacity(resource, quantity)
    }
}

// ================================================================================================
// OWNED IMPLEMENTATIONS
// ================================================================================================

/// Plain node pool value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePool {
    pub name: String,
    pub namespace: String,
    pub labels: Labels,
}

impl NodePool {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        NodePool {
            name: name.into(),
            namespace: namespace.into(),
            labels: Labels::new(),
        }
    }

    /// Adds a label to this pool
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

impl NodePoolView for NodePool {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Plain instance type value with an integer capacity map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceType {
    pub name: String,
    pub capacity: ResourceList,
}

impl InstanceType {
    pub fn new(name: impl Into<String>) -> Self {
        InstanceType {
            name: name.into(),
            capacity: ResourceList::new(),
        }
    }

    /// Adds a capacity entry to this instance type
    pub fn with_capacity(mut self, resource: impl Into<String>, quantity: i64) -> Self {
        self.capacity.insert(resource.into(), quantity);
        self
    }
}

impl InstanceTypeView for InstanceType {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_capacity(&mut self, resource: &str, quantity: i64) {
        self.capacity.insert(resource.to_string(), quantity);
    }
}
