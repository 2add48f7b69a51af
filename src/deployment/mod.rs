// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Processor
//!
//! Turns a logical resource into deployed infrastructure and back.
//!
//! # Architecture
//!
//! ```text
//! LogicalResource ──render──▶ RendererOutput ──deploy──▶ DeploymentOutput
//!        │                        │                          │
//!  EnvironmentResolver      Renderer (registry)     ResourceHandler / RecipeHandler
//!                                                            │
//!                                         computed values + secret references
//! ```
//!
//! - [`DeploymentProcessor::render`] resolves the environment, application
//!   and recipe context, invokes the renderer and validates providers.
//! - [`DeploymentProcessor::deploy`] runs the recipe or the handlers in
//!   dependency order and resolves computed values.
//! - [`DeploymentProcessor::delete`] tears everything down in reverse order.
//! - [`DeploymentProcessor::fetch_secrets`] resolves secret references on
//!   demand without mutating infrastructure.
//!
//! The processor holds no per-request state; every call is independent.
//!
//! # Example
//!
//! ```rust,ignore
//! let processor = DeploymentProcessor::new(registry, store, ProcessorConfig::from_env());
//! let cancel = Cancellation::new();
//!
//! let rendered = processor.render(&id, &resource).await?;
//! let deployed = processor.deploy(&id, rendered, &cancel).await?;
//! ```

pub mod cancellation;
pub mod recipe;
pub mod values;

pub use cancellation::Cancellation;
pub use values::{resolve_computed_values, DeployedValues};

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ProcessorConfig;
use crate::domain::{
    evaluate_pointer, ComputedValueReference, LogicalResource, OutputResource, ProviderDocument,
    RecipeData, SecretSource, SecretValueReference,
};
use crate::environment::{build_recipe_request, EnvironmentResolver};
use crate::errors::{DeploymentError, DeploymentResult};
use crate::graph::{order_output_resources, DependencyGraph};
use crate::registry::{PutRequest, RecipeHandler, Registry, RenderOptions, RendererOutput, ResourceHandler};
use crate::resources::ResourceId;
use crate::store::StorageClient;

/// Result of a successful deployment, ready to persist
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentOutput {
    /// Output resources in deploy order, each carrying its identity
    pub output_resources: Vec<OutputResource>,
    pub computed_values: BTreeMap<String, Value>,
    /// Unresolved secret references
    pub secret_values: BTreeMap<String, SecretValueReference>,
    pub recipe_data: Option<RecipeData>,
}

/// Renders, deploys and deletes logical resources
#[derive(Clone)]
pub struct DeploymentProcessor {
    registry: Registry,
    environments: EnvironmentResolver,
    config: ProcessorConfig,
}

impl DeploymentProcessor {
    pub fn new(registry: Registry, store: Arc<dyn StorageClient>, config: ProcessorConfig) -> Self {
        Self {
            registry,
            environments: EnvironmentResolver::new(store),
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render a logical resource against its environment
    #[instrument(skip(self, resource), fields(resource_id = %id))]
    pub async fn render(&self, id: &ResourceId, resource: &LogicalResource) -> DeploymentResult<RendererOutput> {
        info!("Rendering resource");
        let resource_type = id.resource_type();

        let environment = self
            .environments
            .resolve(&resource.properties.environment, resource.recipe_name(), &resource_type)
            .await
            .inspect_err(|err| warn!(error = %err, "Environment resolution failed"))?;

        let application = match resource.properties.application.as_deref().filter(|a| !a.is_empty()) {
            Some(application_id) => Some(self.environments.resolve_application(application_id).await?),
            None => None,
        };

        // Application-scoped namespace wins over the environment namespace
        let namespace = application
            .as_ref()
            .and_then(|app| app.namespace())
            .unwrap_or(environment.namespace.as_str())
            .to_string();

        let renderer = self.registry.renderer(&resource_type).ok_or_else(|| {
            warn!(resource_type = %resource_type, "No renderer registered");
            DeploymentError::UnsupportedResourceType(resource_type.clone())
        })?;

        let recipe = build_recipe_request(resource, &environment, application.as_ref(), &namespace);
        let options = RenderOptions {
            environment_id: environment.id.clone(),
            namespace,
            environment_namespace: environment.namespace.clone(),
            providers: environment.providers.clone(),
            recipe: recipe.clone(),
        };

        let mut output = renderer.render(resource, &options).await?;
        if output.recipe.is_none() {
            output.recipe = recipe;
        }

        self.validate_providers(&output.resources)?;

        debug!(
            output_resources = output.resources.len(),
            recipe = output.recipe.is_some(),
            "Rendered resource"
        );
        Ok(output)
    }

    /// Deploy a render result
    ///
    /// A failure after at least one output resource was provisioned is
    /// returned as [`DeploymentError::PartialDeployment`] carrying those
    /// resources.
    #[instrument(skip(self, output, cancel), fields(resource_id = %id))]
    pub async fn deploy(
        &self,
        id: &ResourceId,
        output: RendererOutput,
        cancel: &Cancellation,
    ) -> DeploymentResult<DeploymentOutput> {
        info!("Deploying resource");
        self.validate_providers(&output.resources)?;

        let RendererOutput {
            resources,
            computed_values: computed_refs,
            secret_values: secret_refs,
            recipe: recipe_request,
        } = output;

        let (deployed, deployed_values, recipe_output) = match recipe_request {
            Some(request) => {
                let handler = self
                    .registry
                    .recipe_handler()
                    .ok_or_else(|| DeploymentError::RecipeUnavailable(request.name.clone()))?;

                info!(recipe = %request.name, template_path = %request.template_path, "Deploying recipe");
                let recipe_output = cancel
                    .guard(self.config.recipe_timeout, "recipe deployment", handler.deploy(&request))
                    .await
                    .inspect_err(|err| error!(error = %err, "Recipe deployment failed"))?;

                let recipe_data = RecipeData::from_request(&request, recipe_output.resources.clone());
                let matched = recipe::match_recipe_resources(id, resources, &recipe_data)
                    .and_then(|resources| order_output_resources(resources).map_err(DeploymentError::from))
                    .map_err(|err| self.defect(err, &[], Some(&recipe_data)))?;

                let documents = self
                    .read_recipe_documents(handler.as_ref(), &request.name, &matched, &computed_refs, cancel)
                    .await
                    .map_err(|err| self.defect(err, &matched, Some(&recipe_data)))?;

                (matched, documents, Some((recipe_data, recipe_output)))
            }
            None => {
                let ordered = order_output_resources(resources).map_err(|err| self.defect(err.into(), &[], None))?;
                let (deployed, responses) = self.put_all(ordered, cancel).await?;
                (deployed, responses, None)
            }
        };

        let mut computed_values =
            values::resolve_computed_values(&computed_refs, &deployed_values, recipe_output.is_some())
                .map_err(|err| self.defect(err, &deployed, recipe_output.as_ref().map(|(data, _)| data)))?;

        let local_ids: HashSet<&str> = deployed.iter().map(|r| r.local_id.as_str()).collect();
        let mut secret_values: BTreeMap<String, SecretValueReference> = secret_refs
            .into_iter()
            .filter(|(name, reference)| {
                // Recipes may not create what the renderer expected
                let keep = recipe_output.is_none()
                    || reference.local_id().map_or(true, |local_id| local_ids.contains(local_id));
                if !keep {
                    debug!(secret = %name, "Dropping secret reference to unmatched output resource");
                }
                keep
            })
            .collect();

        let recipe_data = match recipe_output {
            Some((recipe_data, recipe_output)) => {
                values::overlay_values(&mut computed_values, &recipe_output.values);
                for (key, value) in recipe_output.secrets {
                    if let Value::String(secret) = value {
                        secret_values.insert(key, SecretValueReference::literal(secret));
                    }
                }
                Some(recipe_data)
            }
            None => None,
        };

        info!(
            output_resources = deployed.len(),
            computed_values = computed_values.len(),
            "Deployed resource"
        );

        Ok(DeploymentOutput {
            output_resources: deployed,
            computed_values,
            secret_values,
            recipe_data,
        })
    }

    /// Delete previously deployed output resources in reverse dependency order
    ///
    /// Resources the provider reports as already gone count as deleted.
    #[instrument(skip(self, output_resources, recipe, cancel), fields(resource_id = %id))]
    pub async fn delete(
        &self,
        id: &ResourceId,
        output_resources: &[OutputResource],
        recipe: Option<&RecipeData>,
        cancel: &Cancellation,
    ) -> DeploymentResult<()> {
        info!(output_resources = output_resources.len(), "Deleting resource");

        let order = DependencyGraph::build(output_resources)
            .and_then(|graph| graph.delete_order())
            .map_err(|err| self.defect(err.into(), &[], None))?;

        let recipe_ids: HashSet<String> = recipe
            .map(|r| r.resources.iter().map(|id| id.to_lowercase()).collect())
            .unwrap_or_default();
        let owned_by_recipe = |resource: &OutputResource| {
            resource
                .identity
                .as_ref()
                .and_then(|identity| identity.provider_id())
                .is_some_and(|provider_id| recipe_ids.contains(&provider_id.to_lowercase()))
        };

        // Validate everything before the first provider call
        let mut plan: Vec<(&OutputResource, Arc<dyn ResourceHandler>)> = Vec::new();
        for local_id in &order {
            let Some(resource) = output_resources.iter().find(|r| &r.local_id == local_id) else {
                continue;
            };
            if owned_by_recipe(resource) {
                continue;
            }
            let handler = self.handler_for(resource)?;
            plan.push((resource, handler));
        }

        let recipe_handler = match recipe {
            Some(data) if !data.resources.is_empty() => Some((
                data,
                self.registry
                    .recipe_handler()
                    .ok_or_else(|| DeploymentError::RecipeUnavailable(data.name.clone()))?,
            )),
            _ => None,
        };

        for (resource, handler) in plan {
            debug!(local_id = %resource.local_id, resource_type = %resource.resource_type, "Deleting output resource");
            let result = cancel
                .guard(self.config.handler_timeout, "output resource deletion", handler.delete(resource))
                .await;
            tolerate_not_found(result, &resource.local_id)?;
        }

        if let Some((data, handler)) = recipe_handler {
            let api_version = data.api_version.as_deref().unwrap_or_default();
            for provider_id in data.resources.iter().rev() {
                debug!(provider_id = %provider_id, "Deleting recipe resource");
                let result = cancel
                    .guard(
                        self.config.recipe_timeout,
                        "recipe resource deletion",
                        handler.delete(provider_id, api_version),
                    )
                    .await;
                tolerate_not_found(result, provider_id)?;
            }
        }

        info!("Deleted resource");
        Ok(())
    }

    /// Resolve every secret reference of a deployed resource
    #[instrument(skip(self, resource, cancel), fields(resource_id = %resource.id))]
    pub async fn fetch_secrets(
        &self,
        resource: &LogicalResource,
        cancel: &Cancellation,
    ) -> DeploymentResult<BTreeMap<String, Value>> {
        let mut secrets = BTreeMap::new();

        for (name, reference) in &resource.secret_values {
            let mut secret = self
                .fetch_secret(resource, name, reference, cancel)
                .await
                .inspect_err(|err| warn!(secret = %name, error = %err, "Failed to fetch secret"))?;

            if let Some(transformer_type) = &reference.transformer {
                let transformer = self.registry.transformer(transformer_type).ok_or_else(|| {
                    DeploymentError::Handler(format!(
                        "could not find a secret transformer for {:?}",
                        transformer_type.to_string()
                    ))
                })?;
                secret = cancel
                    .guard(
                        self.config.handler_timeout,
                        "secret transformation",
                        transformer.transform(&resource.computed_values, secret),
                    )
                    .await?;
            }

            secrets.insert(name.clone(), secret);
        }

        Ok(secrets)
    }

    async fn fetch_secret(
        &self,
        resource: &LogicalResource,
        name: &str,
        reference: &SecretValueReference,
        cancel: &Cancellation,
    ) -> DeploymentResult<Value> {
        match &reference.source {
            SecretSource::Value { value } => Ok(Value::String(value.clone())),
            SecretSource::Action {
                local_id,
                action,
                api_version,
                value_selector,
            } => {
                let output = find_output(resource, local_id, name)?;
                let handler = self.handler_for(output)?;
                let response = cancel
                    .guard(
                        self.config.handler_timeout,
                        "secret action",
                        handler.invoke_action(output, action, api_version),
                    )
                    .await?;
                evaluate_pointer(&response, value_selector)
                    .cloned()
                    .map_err(|source| DeploymentError::pointer(value_selector.clone(), source))
            }
            SecretSource::Property { local_id, property } => {
                let output = find_output(resource, local_id, name)?;
                let document = self.read_document(resource, output, cancel).await?;
                document.property(property).cloned().ok_or_else(|| {
                    DeploymentError::Handler(format!(
                        "output resource {:?} has no property {:?}",
                        output.local_id, property
                    ))
                })
            }
            SecretSource::JsonPointer { local_id, pointer } => {
                let output = find_output(resource, local_id, name)?;
                let document = self.read_document(resource, output, cancel).await?;
                document
                    .pointer(pointer)
                    .map_err(|source| DeploymentError::pointer(pointer.clone(), source))
            }
        }
    }

    /// Current provider document of a deployed output resource
    async fn read_document(
        &self,
        resource: &LogicalResource,
        output: &OutputResource,
        cancel: &Cancellation,
    ) -> DeploymentResult<ProviderDocument> {
        let provider_id = output.identity.as_ref().and_then(|identity| identity.provider_id());

        if let (Some(recipe), Some(provider_id)) = (&resource.recipe_data, provider_id) {
            let handler = self
                .registry
                .recipe_handler()
                .ok_or_else(|| DeploymentError::RecipeUnavailable(resource.name.clone()))?;
            let document = cancel
                .guard(self.config.recipe_timeout, "recipe resource read", handler.get_resource(provider_id))
                .await
                .map_err(|err| match err {
                    // The recipe reported a resource it did not leave behind
                    DeploymentError::NotFound(reason) => DeploymentError::Handler(format!(
                        "resource {} created by recipe {:?} could not be read: {}",
                        provider_id, recipe.name, reason
                    )),
                    other => other,
                })?;
            return Ok(ProviderDocument::Raw(document));
        }

        let handler = self.handler_for(output)?;
        cancel
            .guard(self.config.handler_timeout, "output resource read", handler.get(output))
            .await
    }

    /// Put every output resource in order
    async fn put_all(
        &self,
        ordered: Vec<OutputResource>,
        cancel: &Cancellation,
    ) -> DeploymentResult<(Vec<OutputResource>, BTreeMap<String, DeployedValues>)> {
        // Every kind must be supported before anything is mutated
        let handlers = ordered
            .iter()
            .map(|resource| self.handler_for(resource))
            .collect::<DeploymentResult<Vec<_>>>()?;

        let mut deployed: Vec<OutputResource> = Vec::with_capacity(ordered.len());
        let mut values: BTreeMap<String, DeployedValues> = BTreeMap::new();

        for (mut resource, handler) in ordered.into_iter().zip(handlers) {
            if let Err(err) = cancel.check() {
                return Err(self.defect(err, &deployed, None));
            }

            debug!(local_id = %resource.local_id, resource_type = %resource.resource_type, "Deploying output resource");

            let dependency_properties = resource
                .dependency_ids()
                .filter_map(|dependency| {
                    values
                        .get(dependency)
                        .map(|v| (dependency.to_string(), v.properties.clone()))
                })
                .collect();
            let request = PutRequest {
                resource: resource.clone(),
                dependency_properties,
            };

            let response = match cancel
                .guard(self.config.handler_timeout, "output resource deployment", handler.put(request))
                .await
            {
                Ok(response) => response,
                Err(err) => return Err(self.defect(err, &deployed, None)),
            };

            if let Some(identity) = response.identity.clone() {
                resource.identity = Some(identity);
            }
            if resource.identity.is_none() {
                let err = DeploymentError::MissingIdentity {
                    local_id: resource.local_id.clone(),
                };
                return Err(self.defect(err, &deployed, None));
            }

            values.insert(resource.local_id.clone(), DeployedValues::from_response(&response));
            deployed.push(resource);
        }

        Ok((deployed, values))
    }

    /// Read back documents of recipe resources that computed values point at
    async fn read_recipe_documents(
        &self,
        handler: &dyn RecipeHandler,
        recipe_name: &str,
        resources: &[OutputResource],
        computed_refs: &BTreeMap<String, ComputedValueReference>,
        cancel: &Cancellation,
    ) -> DeploymentResult<BTreeMap<String, DeployedValues>> {
        let referenced: HashSet<&str> = computed_refs
            .values()
            .filter_map(ComputedValueReference::local_id)
            .collect();

        let mut values = BTreeMap::new();
        for resource in resources.iter().filter(|r| referenced.contains(r.local_id.as_str())) {
            let Some(provider_id) = resource.identity.as_ref().and_then(|i| i.provider_id()) else {
                continue;
            };
            let document = cancel
                .guard(self.config.recipe_timeout, "recipe resource read", handler.get_resource(provider_id))
                .await
                .map_err(|err| match err {
                    // The recipe reported a resource it did not leave behind
                    DeploymentError::NotFound(reason) => DeploymentError::Handler(format!(
                        "resource {} created by recipe {:?} could not be read: {}",
                        provider_id, recipe_name, reason
                    )),
                    other => other,
                })?;
            values.insert(resource.local_id.clone(), DeployedValues::from_document(document));
        }

        Ok(values)
    }

    fn handler_for(&self, resource: &OutputResource) -> DeploymentResult<Arc<dyn ResourceHandler>> {
        self.registry.handler(&resource.resource_type).ok_or_else(|| {
            error!(local_id = %resource.local_id, resource_type = %resource.resource_type, "No handler registered");
            DeploymentError::UnsupportedOutputResource(resource.resource_type.clone())
        })
    }

    fn validate_providers(&self, resources: &[OutputResource]) -> DeploymentResult<()> {
        for resource in resources {
            let Some(provider) = resource.resource_type.provider else {
                error!(local_id = %resource.local_id, "Output resource has no provider");
                return Err(DeploymentError::MissingProvider {
                    local_id: resource.local_id.clone(),
                });
            };
            if !self.config.enabled_providers.contains(provider) {
                error!(provider = %provider, resource_type = %resource.resource_type.type_name, "Provider is not enabled");
                return Err(DeploymentError::ProviderNotEnabled {
                    provider,
                    resource_type: resource.resource_type.type_name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Log a failure and attach already provisioned resources
    fn defect(&self, err: DeploymentError, deployed: &[OutputResource], recipe: Option<&RecipeData>) -> DeploymentError {
        if err.is_client_error() {
            warn!(error = %err, deployed = deployed.len(), "Deployment rejected");
        } else {
            error!(error = %err, deployed = deployed.len(), "Deployment failed");
        }

        let recipe_ran = recipe.is_some_and(|data| !data.resources.is_empty());
        if deployed.is_empty() && !recipe_ran {
            err
        } else {
            DeploymentError::PartialDeployment {
                source: Box::new(err),
                deployed: deployed.to_vec(),
                recipe: recipe.cloned(),
            }
        }
    }
}

fn find_output<'a>(
    resource: &'a LogicalResource,
    local_id: &str,
    secret: &str,
) -> DeploymentResult<&'a OutputResource> {
    resource
        .output_resources()
        .iter()
        .find(|r| r.local_id == local_id)
        .ok_or_else(|| DeploymentError::MissingReference {
            local_id: local_id.to_string(),
            reference: format!("secret reference {:?}", secret),
        })
}

fn tolerate_not_found(result: DeploymentResult<()>, target: &str) -> DeploymentResult<()> {
    match result {
        Err(DeploymentError::NotFound(message)) => {
            debug!(target_resource = %target, reason = %message, "Already deleted");
            Ok(())
        }
        other => other,
    }
}
