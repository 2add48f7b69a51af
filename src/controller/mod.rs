// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Controller
//!
//! Thin CRUD layer over the [`DeploymentProcessor`] that owns every write to
//! the resource record store.
//!
//! # Create or update
//!
//! ```text
//! load record ─▶ check preconditions ─▶ lifecycle transition
//!      ─▶ render ─▶ deploy ─▶ garbage collect ─▶ save (ETag-conditioned)
//! ```
//!
//! Nothing is rendered or deployed unless the preconditions hold. The stored
//! ETag only changes once a deployment has finished, successfully or not;
//! a failed deployment is recorded with `Failed` and the output resources it
//! managed to provision so a retry can resume.
//!
//! Output resources a deployment supersedes are queued on the record status
//! (`stale_output_resources`, `stale_recipe`) and stay there until their
//! deletion succeeds, either on a later update or when the record is deleted.
//!
//! # Delete
//!
//! Deleting a record that does not exist succeeds. A failed teardown leaves
//! the record untouched.

pub mod precondition;

pub use precondition::{PreconditionError, Preconditions};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::deployment::{Cancellation, DeploymentOutput, DeploymentProcessor};
use crate::domain::{LogicalResource, OutputResource, RecipeData, RecipeStatus, ResourceStatus};
use crate::errors::DeploymentError;
use crate::resources::ResourceId;
use crate::state_machine::{LifecycleCommand, LifecycleState, StateMachine, TransitionError};
use crate::store::{Query, StorageClient, StoreError, StoredObject};

/// Controller errors
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The request itself is malformed
    #[error("{0}")]
    InvalidRequest(String),

    /// Conditional request headers do not hold
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The record does not exist
    #[error("the resource with id {0:?} was not found")]
    NotFound(String),

    /// The record's lifecycle does not allow the operation
    #[error("{0}")]
    Conflict(String),

    /// Render, deploy, delete or secret resolution failed
    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    /// Record store failure
    #[error(transparent)]
    Storage(StoreError),
}

/// Controller result type
pub type ControllerResult<T> = Result<T, ControllerError>;

impl ControllerError {
    /// HTTP-like status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            ControllerError::InvalidRequest(_) => 400,
            ControllerError::Precondition(_) => 412,
            ControllerError::NotFound(_) => 404,
            ControllerError::Conflict(_) => 409,
            ControllerError::Deployment(err) => err.status_code(),
            ControllerError::Storage(StoreError::NotFound(_)) => 404,
            ControllerError::Storage(StoreError::Conflict { .. }) => 412,
            ControllerError::Storage(StoreError::InvalidQuery(_)) => 400,
            ControllerError::Storage(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<StoreError> for ControllerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => ControllerError::Precondition(PreconditionError::EtagMismatch),
            other => ControllerError::Storage(other),
        }
    }
}

impl From<TransitionError> for ControllerError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Missing => ControllerError::Precondition(PreconditionError::DoesNotExist),
            TransitionError::AlreadyExists => ControllerError::Precondition(PreconditionError::AlreadyExists),
            other => ControllerError::Conflict(other.to_string()),
        }
    }
}

/// A stored record with its ETag
#[derive(Debug, Clone, PartialEq)]
pub struct SavedResource {
    pub resource: LogicalResource,
    pub etag: String,
}

/// Outcome of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete
    NotFound,
}

/// One page of a list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcePage {
    pub items: Vec<SavedResource>,
    pub continuation: Option<String>,
}

/// CRUD operations on logical resources
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Create or update a resource and deploy it
    async fn create_or_update(
        &self,
        id: &str,
        resource: LogicalResource,
        preconditions: &Preconditions,
        cancel: &Cancellation,
    ) -> ControllerResult<SavedResource>;

    /// Tear down a resource and remove its record
    async fn delete(
        &self,
        id: &str,
        preconditions: &Preconditions,
        cancel: &Cancellation,
    ) -> ControllerResult<DeleteOutcome>;

    async fn get(&self, id: &str) -> ControllerResult<SavedResource>;

    /// List resources of one type under a scope
    async fn list(
        &self,
        root_scope: &str,
        resource_type: &str,
        max_items: Option<usize>,
        continuation: Option<String>,
    ) -> ControllerResult<ResourcePage>;

    /// Resolve the secrets of a deployed resource
    async fn list_secrets(&self, id: &str, cancel: &Cancellation) -> ControllerResult<BTreeMap<String, Value>>;
}

/// Store-backed [`ResourceService`]
#[derive(Clone)]
pub struct ResourceController {
    processor: DeploymentProcessor,
    store: Arc<dyn StorageClient>,
}

impl ResourceController {
    pub fn new(processor: DeploymentProcessor, store: Arc<dyn StorageClient>) -> Self {
        Self { processor, store }
    }

    pub fn processor(&self) -> &DeploymentProcessor {
        &self.processor
    }

    async fn load(&self, id: &str) -> ControllerResult<Option<SavedResource>> {
        match self.store.get(id).await {
            Ok(object) => Ok(Some(decode(object)?)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(
        &self,
        resource: &LogicalResource,
        expected_etag: Option<&str>,
    ) -> ControllerResult<SavedResource> {
        let data = serde_json::to_value(resource).map_err(DeploymentError::from)?;
        let etag = self.store.save(&resource.id, data, expected_etag).await?;
        Ok(SavedResource {
            resource: resource.clone(),
            etag,
        })
    }

    /// Render and deploy
    async fn provision(
        &self,
        id: &ResourceId,
        resource: &LogicalResource,
        cancel: &Cancellation,
    ) -> Result<DeploymentOutput, DeploymentError> {
        let rendered = self.processor.render(id, resource).await?;
        self.processor.deploy(id, rendered, cancel).await
    }

    /// Delete superseded resources recorded on the status
    async fn collect_garbage(
        &self,
        id: &ResourceId,
        status: &ResourceStatus,
        cancel: &Cancellation,
    ) -> Result<(), DeploymentError> {
        if !status.has_stale() {
            return Ok(());
        }
        info!(stale = status.stale_output_resources.len(), "Garbage collecting output resources");
        self.processor
            .delete(id, &status.stale_output_resources, status.stale_recipe.as_ref(), cancel)
            .await
    }
}

#[async_trait]
impl ResourceService for ResourceController {
    #[instrument(skip(self, resource, preconditions, cancel), fields(resource_id = %id))]
    async fn create_or_update(
        &self,
        id: &str,
        mut resource: LogicalResource,
        preconditions: &Preconditions,
        cancel: &Cancellation,
    ) -> ControllerResult<SavedResource> {
        let parsed = parse_id(id)?;
        let existing = self.load(id).await?;
        let current_etag = existing.as_ref().map(|saved| saved.etag.as_str());

        preconditions.check(current_etag).inspect_err(|err| {
            warn!(error = %err, "Precondition failed");
        })?;

        let state = LifecycleState::from_record(existing.as_ref().map(|saved| saved.resource.provisioning_state()));
        let command = if existing.is_some() {
            LifecycleCommand::BeginUpdate
        } else {
            LifecycleCommand::BeginCreate
        };
        let in_flight = advance(state, command)?;
        debug!(from = %state, to = %in_flight, "Starting operation");

        let now = Utc::now();
        resource.id = parsed.to_string();
        resource.name = parsed.name().to_string();
        resource.resource_type = parsed.resource_type();
        resource.system_data.created_at = existing
            .as_ref()
            .and_then(|saved| saved.resource.system_data.created_at)
            .or(Some(now));
        resource.system_data.last_modified_at = Some(now);

        let expected = preconditions.expected_etag(current_etag);

        // On failure: the error and the record to persist, if any
        let outcome = match self.provision(&parsed, &resource, cancel).await {
            Ok(output) => {
                apply_deployment(&mut resource, output);
                if let Some(saved) = &existing {
                    retire_superseded(&mut resource, &saved.resource);
                }
                match self.collect_garbage(&parsed, &resource.properties.status, cancel).await {
                    Ok(()) => {
                        resource.properties.status.stale_output_resources.clear();
                        resource.properties.status.stale_recipe = None;
                        Ok(())
                    }
                    // The new deployment is live; the superseded resources stay on record
                    Err(err) => Err((err, Some(resource.clone()))),
                }
            }
            Err(err) if existing.is_none() && !err.provisioned_anything() => Err((err, None)),
            Err(err) => {
                let mut record = match &existing {
                    Some(saved) => saved.resource.clone(),
                    None => resource.clone(),
                };
                record_partial_deployment(&mut record, &err);
                Err((err, Some(record)))
            }
        };

        match outcome {
            Ok(()) => {
                let done = advance(in_flight, LifecycleCommand::Complete)?;
                resource.properties.provisioning_state = done.provisioning_state().unwrap_or_default();

                let saved = self.save(&resource, expected).await?;
                info!(etag = %saved.etag, "Resource provisioned");
                Ok(saved)
            }
            Err((err, record)) => {
                let command = if is_cancellation(&err) {
                    LifecycleCommand::Cancel
                } else {
                    LifecycleCommand::Fail
                };
                let failed = advance(in_flight, command)?;

                // A first attempt that provisioned nothing leaves no record
                let Some(mut record) = record else {
                    return Err(err.into());
                };
                record.properties.status.error = Some(err.to_string());
                record.properties.provisioning_state = failed.provisioning_state().unwrap_or_default();
                record.system_data.last_modified_at = Some(now);

                match self.save(&record, expected).await {
                    Ok(saved) => debug!(etag = %saved.etag, "Recorded failed deployment"),
                    Err(save_err) => warn!(error = %save_err, "Failed to record failed deployment"),
                }
                Err(err.into())
            }
        }
    }

    #[instrument(skip(self, preconditions, cancel), fields(resource_id = %id))]
    async fn delete(
        &self,
        id: &str,
        preconditions: &Preconditions,
        cancel: &Cancellation,
    ) -> ControllerResult<DeleteOutcome> {
        let parsed = parse_id(id)?;
        let Some(existing) = self.load(id).await? else {
            info!("Resource does not exist");
            return Ok(DeleteOutcome::NotFound);
        };

        preconditions.check(Some(&existing.etag))?;

        let state = LifecycleState::from_record(Some(existing.resource.provisioning_state()));
        let deleting = advance(state, LifecycleCommand::BeginDelete)?;

        self.processor
            .delete(
                &parsed,
                existing.resource.output_resources(),
                existing.resource.recipe_data.as_ref(),
                cancel,
            )
            .await?;
        self.collect_garbage(&parsed, &existing.resource.properties.status, cancel)
            .await?;

        advance(deleting, LifecycleCommand::Complete)?;

        match self.store.delete(id, Some(&existing.etag)).await {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        info!("Resource deleted");
        Ok(DeleteOutcome::Deleted)
    }

    #[instrument(skip(self), fields(resource_id = %id))]
    async fn get(&self, id: &str) -> ControllerResult<SavedResource> {
        parse_id(id)?;
        self.load(id)
            .await?
            .ok_or_else(|| ControllerError::NotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        root_scope: &str,
        resource_type: &str,
        max_items: Option<usize>,
        continuation: Option<String>,
    ) -> ControllerResult<ResourcePage> {
        let query = Query {
            max_items,
            continuation,
            ..Query::new(root_scope, resource_type)
        };

        let page = self.store.query(&query).await?;
        let items = page
            .items
            .into_iter()
            .map(decode)
            .collect::<ControllerResult<Vec<_>>>()?;

        Ok(ResourcePage {
            items,
            continuation: page.continuation,
        })
    }

    #[instrument(skip(self, cancel), fields(resource_id = %id))]
    async fn list_secrets(&self, id: &str, cancel: &Cancellation) -> ControllerResult<BTreeMap<String, Value>> {
        let saved = self.get(id).await?;
        Ok(self.processor.fetch_secrets(&saved.resource, cancel).await?)
    }
}

fn parse_id(id: &str) -> ControllerResult<ResourceId> {
    ResourceId::parse(id).map_err(|err| ControllerError::InvalidRequest(err.to_string()))
}

fn is_cancellation(err: &DeploymentError) -> bool {
    match err {
        DeploymentError::Cancelled => true,
        DeploymentError::PartialDeployment { source, .. } => is_cancellation(source),
        _ => false,
    }
}

fn decode(object: StoredObject) -> ControllerResult<SavedResource> {
    let resource = object.decode::<LogicalResource>()?;
    Ok(SavedResource {
        resource,
        etag: object.etag,
    })
}

fn apply_deployment(resource: &mut LogicalResource, output: DeploymentOutput) {
    resource.properties.status.output_resources = output.output_resources;
    resource.properties.status.recipe = output.recipe_data.as_ref().map(recipe_status);
    resource.properties.status.error = None;
    resource.computed_values = output.computed_values;
    resource.secret_values = output.secret_values;
    resource.recipe_data = output.recipe_data;
}

/// Apply a lifecycle command and log what the transition reports
fn advance(state: LifecycleState, command: LifecycleCommand) -> ControllerResult<LifecycleState> {
    let (next, output) = state.transition(&command)?;
    output.log();
    Ok(next)
}

/// Queue everything the previous record owned that the new deployment no
/// longer does, including leftovers of an earlier failed collection
fn retire_superseded(resource: &mut LogicalResource, previous: &LogicalResource) {
    let superseded: Vec<OutputResource> = previous
        .output_resources()
        .iter()
        .chain(&previous.properties.status.stale_output_resources)
        .cloned()
        .collect();
    for old in superseded {
        retire_output_resource(&mut resource.properties.status, old);
    }

    let kept: Vec<String> = resource
        .recipe_data
        .iter()
        .flat_map(|recipe| recipe.resources.clone())
        .collect();
    for old in previous.recipe_data.iter().chain(&previous.properties.status.stale_recipe) {
        retire_recipe_resources(&mut resource.properties.status, old, &kept);
    }
}

/// Fold a failed deployment into the record that will be persisted
///
/// Output resources are replaced by local ID. A replaced entry whose identity
/// changed is queued for deletion instead of being forgotten.
fn record_partial_deployment(record: &mut LogicalResource, err: &DeploymentError) {
    let status = &mut record.properties.status;
    for resource in err.deployed_resources() {
        let replaced = match status.output_resources.iter_mut().find(|r| r.local_id == resource.local_id) {
            Some(slot) => Some(std::mem::replace(slot, resource.clone())),
            None => {
                status.output_resources.push(resource.clone());
                None
            }
        };
        if let Some(old) = replaced {
            retire_output_resource(status, old);
        }
    }

    if let Some(recipe) = err.recipe_data() {
        if let Some(old) = record.recipe_data.take() {
            retire_recipe_resources(&mut record.properties.status, &old, &recipe.resources);
        }
        record.properties.status.recipe = Some(recipe_status(recipe));
        record.recipe_data = Some(recipe.clone());
    }
}

/// Queue an output resource for deletion unless it is still live
fn retire_output_resource(status: &mut ResourceStatus, old: OutputResource) {
    let Some(identity) = old.identity.as_ref() else {
        return;
    };
    let known = status
        .output_resources
        .iter()
        .chain(&status.stale_output_resources)
        .any(|r| r.identity.as_ref() == Some(identity));
    if known {
        return;
    }
    // Dependencies may point at resources that are still live
    status.stale_output_resources.push(OutputResource {
        dependencies: Vec::new(),
        ..old
    });
}

/// Queue recipe-created resources of `old` that are not in `kept`
fn retire_recipe_resources(status: &mut ResourceStatus, old: &RecipeData, kept: &[String]) {
    let stale = status.stale_recipe.get_or_insert_with(|| RecipeData {
        resources: Vec::new(),
        ..old.clone()
    });
    for id in &old.resources {
        let known = kept
            .iter()
            .chain(&stale.resources)
            .any(|other| other.eq_ignore_ascii_case(id));
        if !known {
            stale.resources.push(id.clone());
        }
    }
    if stale.resources.is_empty() {
        status.stale_recipe = None;
    }
}

fn recipe_status(recipe: &RecipeData) -> RecipeStatus {
    RecipeStatus {
        template_kind: recipe.template_kind.clone(),
        template_path: recipe.template_path.clone(),
    }
}
