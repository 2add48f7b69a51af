// Copyright (c) 2025 - Cowboy AI, Inc.
//! Value resolution
//!
//! Pure functions that turn computed value references into concrete values
//! once the output resources they point at have been deployed.
//!
//! Precedence, lowest to highest:
//!
//! 1. property and JSON pointer references against deployed resources
//! 2. static values supplied by the renderer
//! 3. recipe output values (applied by the processor)
//!
//! A reference that resolves to `null` is omitted.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::{ComputedValueReference, ProviderDocument};
use crate::errors::{DeploymentError, DeploymentResult};
use crate::registry::PutResponse;

/// What one deployed output resource exposes for value resolution
#[derive(Debug, Clone, PartialEq)]
pub struct DeployedValues {
    /// Named properties reported by the handler
    pub properties: Map<String, Value>,
    /// Document JSON pointers are evaluated against
    pub document: ProviderDocument,
}

impl DeployedValues {
    pub fn from_response(response: &PutResponse) -> Self {
        Self {
            properties: response.properties.clone(),
            document: response.provider_document(),
        }
    }

    /// Values read back from a raw provider document
    pub fn from_document(document: Value) -> Self {
        Self {
            properties: Map::new(),
            document: ProviderDocument::Raw(document),
        }
    }

    /// Named property, falling back to a top-level document member
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .get(name)
            .or_else(|| self.document.property(name))
    }

    pub fn pointer(&self, pointer: &str) -> DeploymentResult<Value> {
        self.document
            .pointer(pointer)
            .map_err(|source| DeploymentError::pointer(pointer, source))
    }
}

/// Resolve computed value references against deployed resources
///
/// With `skip_unresolved` set, references to resources that were not
/// deployed are ignored instead of failing the deployment.
pub fn resolve_computed_values(
    references: &BTreeMap<String, ComputedValueReference>,
    deployed: &BTreeMap<String, DeployedValues>,
    skip_unresolved: bool,
) -> DeploymentResult<BTreeMap<String, Value>> {
    let mut values = BTreeMap::new();

    for (name, reference) in references {
        let (local_id, resolved) = match reference {
            ComputedValueReference::Static { .. } => continue,
            ComputedValueReference::Property { local_id, property } => {
                let Some(source) = lookup(deployed, local_id, name, skip_unresolved)? else {
                    continue;
                };
                (local_id, source.property(property).cloned().unwrap_or(Value::Null))
            }
            ComputedValueReference::JsonPointer { local_id, pointer } => {
                let Some(source) = lookup(deployed, local_id, name, skip_unresolved)? else {
                    continue;
                };
                (local_id, source.pointer(pointer)?)
            }
        };

        if resolved.is_null() {
            tracing::debug!(value = %name, local_id = %local_id, "Computed value resolved to null");
            continue;
        }
        values.insert(name.clone(), resolved);
    }

    for (name, reference) in references {
        if let ComputedValueReference::Static { value } = reference {
            if !value.is_null() {
                values.insert(name.clone(), value.clone());
            }
        }
    }

    Ok(values)
}

/// Overlay non-null values on top of already resolved values
pub fn overlay_values(values: &mut BTreeMap<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        if !value.is_null() {
            values.insert(key.clone(), value.clone());
        }
    }
}

fn lookup<'a>(
    deployed: &'a BTreeMap<String, DeployedValues>,
    local_id: &str,
    name: &str,
    skip_unresolved: bool,
) -> DeploymentResult<Option<&'a DeployedValues>> {
    match deployed.get(local_id) {
        Some(values) => Ok(Some(values)),
        None if skip_unresolved => Ok(None),
        None => Err(DeploymentError::MissingReference {
            local_id: local_id.to_string(),
            reference: format!("computed value {:?}", name),
        }),
    }
}
