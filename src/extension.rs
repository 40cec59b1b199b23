// Parse raw extension rule specifications from their JSON configuration form.
// This module provides:
// 1. ExtensionSpec, a single uncompiled rule as written in configuration
// 2. InstanceTypeExtensionSpec, the object-wrapped list form
// 3. ExtensionParser for both document shapes

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Labels, ResourceList};

/// A single extension rule as declared in configuration (not yet compiled)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    /// Pattern searched anywhere within the instance type name
    pub instance_name_regex: String,
    /// Labels the node pool must carry with identical values
    #[serde(default, deserialize_with = "default_if_null", skip_serializing_if = "Labels::is_empty")]
    pub required_node_pool_labels: Labels,
    /// Resources written into a matching instance type's capacity.
    /// Missing or `null` loads as an empty set, so the rule matches but adds nothing.
    #[serde(default, deserialize_with = "default_if_null")]
    pub extended_resources: ResourceList,
}

impl ExtensionSpec {
    pub fn new(instance_name_regex: impl Into<String>) -> Self {
        Self {
            instance_name_regex: instance_name_regex.into(),
            required_node_pool_labels: Labels::new(),
            extended_resources: ResourceList::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.required_node_pool_labels.insert(key.into(), value.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>, quantity: i64) -> Self {
        self.extended_resources.insert(resource.into(), quantity);
        self
    }
}

fn default_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Object-wrapped form: `{ "extensions": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTypeExtensionSpec {
    pub extensions: Vec<ExtensionSpec>,
}

/// Parser for extension configuration documents
pub struct ExtensionParser;

impl ExtensionParser {
    /// Parse from a JSON string. Declaration order is preserved.
    pub fn from_json(json: &str) -> Result<Vec<ExtensionSpec>, ParseError> {
        Self::from_json_bytes(json.as_bytes())
    }

    /// Parse from raw JSON bytes.
    ///
    /// The first non-whitespace byte picks the shape: `{` is the wrapped form,
    /// anything else is read as the bare list. Errors keep serde_json's line and column.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Vec<ExtensionSpec>, ParseError> {
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'{') {
            let wrapped: InstanceTypeExtensionSpec = serde_json::from_slice(bytes)?;
            Ok(wrapped.extensions)
        } else {
            Ok(serde_json::from_slice(bytes)?)
        }
    }

    /// Serialize specs as the bare JSON array form
    pub fn to_json(specs: &[ExtensionSpec]) -> Result<String, ParseError> {
        serde_json::to_string_pretty(specs).map_err(ParseError::Serialization)
    }
}

/// Parse errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),
}
