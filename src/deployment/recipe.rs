// Copyright (c) 2025 - Cowboy AI, Inc.
//! Recipe output matching
//!
//! A recipe reports the provider IDs it created. Renderer output resources
//! that describe one of those IDs (same provider, same provider resource
//! type) adopt it as their identity; every remaining ID becomes a synthesized
//! `Resource<i>` output resource so it can be resolved against and deleted.

use std::collections::HashSet;

use crate::domain::{OutputResource, RecipeData, ResourceIdentity, ResourceType};
use crate::errors::{DeploymentError, DeploymentResult};
use crate::resources::ResourceId;

/// Combine renderer output resources with the resources a recipe created
pub fn match_recipe_resources(
    resource_id: &ResourceId,
    rendered: Vec<OutputResource>,
    recipe: &RecipeData,
) -> DeploymentResult<Vec<OutputResource>> {
    let created = recipe
        .resources
        .iter()
        .map(|raw| {
            ResourceId::parse(raw).map_err(|err| {
                DeploymentError::InvalidRequest(format!(
                    "failed to parse id {:?} of the resource deployed by recipe {:?} for resource {:?}: {}",
                    raw, recipe.name, resource_id.as_str(), err
                ))
            })
        })
        .collect::<DeploymentResult<Vec<_>>>()?;

    let api_version = recipe.api_version.as_deref().unwrap_or_default();
    let mut matched = HashSet::new();
    let mut resources = Vec::with_capacity(created.len());

    for output in rendered {
        let found = created.iter().enumerate().find_map(|(index, id)| {
            if matched.contains(&index) {
                return None;
            }
            let identity = ResourceIdentity::from_provider_id(id, api_version);
            let same_kind = output.resource_type.provider == Some(identity.provider())
                && output
                    .provider_resource_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(&id.resource_type()));
            same_kind.then_some((index, identity))
        });

        if let Some((index, identity)) = found {
            matched.insert(index);
            resources.push(output.with_identity(identity));
        }
    }

    for (index, id) in created.iter().enumerate() {
        if matched.contains(&index) {
            continue;
        }
        // Unknown resource kinds carry no preferred API version
        let identity = ResourceIdentity::from_provider_id(id, "");
        let resource_type = ResourceType::new(id.resource_type(), identity.provider());
        resources.push(
            OutputResource::new(format!("Resource{}", index), resource_type)
                .with_identity(identity)
                .with_radius_managed(true),
        );
    }

    Ok(resources)
}
