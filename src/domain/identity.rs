// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider-assigned identities for deployed output resources

use serde::{Deserialize, Serialize};
use std::fmt;

use super::resource_type::{Provider, ResourceType};
use crate::resources::ResourceId;

/// Handle a provider returns once an output resource exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum ResourceIdentity {
    /// Azure Resource Manager resource
    #[serde(rename_all = "camelCase")]
    Arm { id: String, api_version: String },

    /// Kubernetes object
    #[serde(rename_all = "camelCase")]
    Kubernetes {
        api_version: String,
        object_kind: String,
        namespace: String,
        name: String,
    },

    /// AWS Cloud Control resource addressed by a UCP id
    Aws { id: String },

    /// Control plane resource
    Ucp { id: String },
}

impl ResourceIdentity {
    /// Build an identity from a provider resource ID created by a recipe
    pub fn from_provider_id(id: &ResourceId, api_version: &str) -> Self {
        if id.find_scope("subscriptions").is_some() {
            return Self::Arm {
                id: id.to_string(),
                api_version: api_version.to_string(),
            };
        }

        let aws = id
            .scope_segments()
            .first()
            .is_some_and(|s| id.is_ucp_qualified() && s.scope_type.eq_ignore_ascii_case("aws"));
        if aws {
            Self::Aws { id: id.to_string() }
        } else {
            Self::Ucp { id: id.to_string() }
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::Arm { .. } => Provider::Azure,
            Self::Kubernetes { .. } => Provider::Kubernetes,
            Self::Aws { .. } => Provider::Aws,
            Self::Ucp { .. } => Provider::Radius,
        }
    }

    /// Provider resource ID, absent for Kubernetes objects
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::Arm { id, .. } | Self::Aws { id } | Self::Ucp { id } => Some(id),
            Self::Kubernetes { .. } => None,
        }
    }

    /// API version recorded with the identity
    pub fn api_version(&self) -> Option<&str> {
        match self {
            Self::Arm { api_version, .. } | Self::Kubernetes { api_version, .. } => {
                Some(api_version).filter(|v| !v.is_empty()).map(String::as_str)
            }
            _ => None,
        }
    }

    /// Kind of the identified resource
    pub fn resource_type(&self) -> Option<ResourceType> {
        match self {
            Self::Kubernetes { object_kind, .. } => {
                Some(ResourceType::new(object_kind.clone(), Provider::Kubernetes))
            }
            _ => {
                let id = ResourceId::parse(self.provider_id()?).ok()?;
                Some(ResourceType::new(id.resource_type(), self.provider()))
            }
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kubernetes {
                object_kind,
                namespace,
                name,
                ..
            } => write!(f, "{}/{}/{}", object_kind, namespace, name),
            Self::Arm { id, .. } | Self::Aws { id } | Self::Ucp { id } => f.write_str(id),
        }
    }
}
