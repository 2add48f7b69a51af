// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Controller Integration Tests
//!
//! ETag preconditions, lifecycle transitions, failure persistence, garbage
//! collection and the read paths.

mod fixtures;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

use cim_deployment::api::RequestContext;
use cim_deployment::controller::{
    ControllerError, DeleteOutcome, PreconditionError, Preconditions, ResourceService,
};
use cim_deployment::deployment::Cancellation;
use cim_deployment::domain::{
    ComputedValueReference, LogicalResource, OutputResource, ProvisioningState, SecretValueReference,
};
use cim_deployment::registry::{HandlerResult, Registry, RenderOptions, Renderer, RendererOutput};
use cim_deployment::store::{InMemoryStore, StorageClient};

use fixtures::*;

const OTHER_CONTAINER_ID: &str =
    "/planes/radius/local/resourceGroups/radius-test-rg/providers/Applications.Core/containers/backend";

fn deployment(local_id: &str) -> OutputResource {
    OutputResource::new(local_id, kubernetes("Deployment"))
}

fn two_deployments() -> RendererOutput {
    RendererOutput::default()
        .with_resource(deployment("A"))
        .with_resource(deployment("B").with_dependency("A"))
        .with_computed_value("host", ComputedValueReference::property("A", "host"))
        .with_secret_value("password", SecretValueReference::property("A", "password"))
}

struct Harness {
    log: CallLog,
    handler: Arc<RecordingHandler>,
    renderer: Arc<StaticRenderer>,
    store: Arc<InMemoryStore>,
    controller: cim_deployment::controller::ResourceController,
}

async fn harness_with_log(output: RendererOutput, build: impl FnOnce(CallLog) -> RecordingHandler) -> Harness {
    let log = call_log();
    let handler = Arc::new(build(log.clone()));
    let renderer = StaticRenderer::new(output);
    let registry = Registry::builder()
        .with_renderer(CONTAINER_TYPE, renderer.clone())
        .with_handler(kubernetes("Deployment"), handler.clone())
        .build();
    let store = seeded_store().await;
    let controller = controller(registry, store.clone());
    Harness {
        log,
        handler,
        renderer,
        store,
        controller,
    }
}

async fn default_harness() -> Harness {
    harness_with_log(two_deployments(), |log| {
        RecordingHandler::new(log)
            .with_property("A", "host", json!("a.internal"))
            .with_property("A", "password", json!("s3cret"))
    })
    .await
}

// ============================================================================
// Create and update
// ============================================================================

#[tokio::test]
async fn test_create_persists_deployed_resource() {
    let h = default_harness().await;

    let saved = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(calls(&h.log), vec!["put:A", "put:B"]);
    assert_eq!(saved.resource.provisioning_state(), ProvisioningState::Succeeded);
    assert_eq!(saved.resource.name, "frontend");
    assert_eq!(saved.resource.resource_type, CONTAINER_TYPE);
    assert_eq!(saved.resource.computed_values["host"], json!("a.internal"));
    assert_eq!(saved.resource.output_resources().len(), 2);
    assert!(saved.resource.system_data.created_at.is_some());
    assert!(saved.resource.properties.status.error.is_none());

    let stored = h.controller.get(CONTAINER_ID).await.unwrap();
    assert_eq!(stored, saved);
}

#[tokio::test]
async fn test_update_changes_etag_and_keeps_created_at() {
    let h = default_harness().await;
    let first = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    let second = h
        .controller
        .create_or_update(
            CONTAINER_ID,
            container(CONTAINER_ID),
            &Preconditions::if_match(first.etag.clone()),
            &Cancellation::new(),
        )
        .await
        .unwrap();

    assert_ne!(first.etag, second.etag);
    assert_eq!(
        first.resource.system_data.created_at,
        second.resource.system_data.created_at
    );
}

#[tokio::test]
async fn test_create_only_rejects_existing_resource_without_rendering() {
    let h = default_harness().await;
    h.controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    let context = RequestContext::from_headers([("If-None-Match", "*")]);
    let err = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &context.preconditions(), &Cancellation::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::Precondition(PreconditionError::AlreadyExists)));
    assert_eq!(err.status_code(), 412);
    assert_eq!(h.renderer.render_count(), 1);
}

#[tokio::test]
async fn test_stale_etag_is_rejected_without_rendering() {
    let h = default_harness().await;
    h.controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    let err = h
        .controller
        .create_or_update(
            CONTAINER_ID,
            container(CONTAINER_ID),
            &Preconditions::if_match("stale"),
            &Cancellation::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "etags do not match");
    assert_eq!(err.status_code(), 412);
    assert_eq!(h.renderer.render_count(), 1);
    assert_eq!(calls(&h.log), vec!["put:A", "put:B"]);
}

#[tokio::test]
async fn test_if_match_on_absent_resource() {
    let h = default_harness().await;

    let err = h
        .controller
        .create_or_update(
            CONTAINER_ID,
            container(CONTAINER_ID),
            &Preconditions::if_match("*"),
            &Cancellation::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "requested resource does not exist");
    assert_eq!(h.renderer.render_count(), 0);
}

#[tokio::test]
async fn test_invalid_id_is_client_error() {
    let h = default_harness().await;

    let err = h
        .controller
        .create_or_update("not-an-id", container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_operation_in_flight_conflicts() {
    let h = default_harness().await;
    let mut record = container(CONTAINER_ID);
    record.properties.provisioning_state = ProvisioningState::Updating;
    seed(&h.store, CONTAINER_ID, serde_json::to_value(&record).unwrap()).await;

    let err = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::Conflict(_)));
    assert_eq!(err.status_code(), 409);
    assert_eq!(h.renderer.render_count(), 0);
}

/// Renderer that rewrites the stored record while the request is in flight
struct ConcurrentWriter {
    store: Arc<InMemoryStore>,
}

#[async_trait]
impl Renderer for ConcurrentWriter {
    async fn render(&self, resource: &LogicalResource, _options: &RenderOptions) -> HandlerResult<RendererOutput> {
        let current = self.store.get(&resource.id).await.unwrap();
        self.store.save(&resource.id, current.data, None).await.unwrap();
        Ok(RendererOutput::default())
    }
}

#[tokio::test]
async fn test_concurrent_write_is_rejected_at_save() {
    let store = seeded_store().await;
    let mut record = container(CONTAINER_ID);
    record.properties.provisioning_state = ProvisioningState::Succeeded;
    let etag = seed(&store, CONTAINER_ID, serde_json::to_value(&record).unwrap()).await;

    let registry = Registry::builder()
        .with_renderer(CONTAINER_TYPE, Arc::new(ConcurrentWriter { store: store.clone() }))
        .build();
    let controller = controller(registry, store.clone());

    let err = controller
        .create_or_update(
            CONTAINER_ID,
            container(CONTAINER_ID),
            &Preconditions::if_match(etag.clone()),
            &Cancellation::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 412);
    assert_ne!(store.get(CONTAINER_ID).await.unwrap().etag, etag);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_first_deployment_persists_nothing() {
    let h = harness_with_log(
        RendererOutput::default().with_resource(deployment("A").with_dependency("Missing")),
        RecordingHandler::new,
    )
    .await;

    let err = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 500);
    let missing = h.controller.get(CONTAINER_ID).await.unwrap_err();
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_partial_deployment_is_persisted_and_retried() {
    let h = harness_with_log(two_deployments(), |log| RecordingHandler::new(log).failing_put("B")).await;

    let err = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);

    let failed = h.controller.get(CONTAINER_ID).await.unwrap();
    assert_eq!(failed.resource.provisioning_state(), ProvisioningState::Failed);
    let recorded: Vec<&str> = failed
        .resource
        .output_resources()
        .iter()
        .map(|r| r.local_id.as_str())
        .collect();
    assert_eq!(recorded, vec!["A"]);
    assert_eq!(failed.resource.properties.status.error.as_deref(), Some("failed to apply B"));

    h.renderer
        .set_output(RendererOutput::default().with_resource(deployment("A")));
    let retried = h
        .controller
        .create_or_update(
            CONTAINER_ID,
            container(CONTAINER_ID),
            &Preconditions::if_match(failed.etag.clone()),
            &Cancellation::new(),
        )
        .await
        .unwrap();

    assert_eq!(retried.resource.provisioning_state(), ProvisioningState::Succeeded);
    assert!(retried.resource.properties.status.error.is_none());
    assert_eq!(calls(&h.log), vec!["put:A", "put:B", "put:A"]);
}

#[tokio::test]
async fn test_cancelled_update_is_recorded() {
    let h = default_harness().await;
    let created = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    let cancel = Cancellation::new();
    cancel.cancel();
    let err = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);

    let stored = h.controller.get(CONTAINER_ID).await.unwrap();
    assert_ne!(stored.etag, created.etag);
    assert_eq!(stored.resource.provisioning_state(), ProvisioningState::Canceled);
    assert_eq!(stored.resource.output_resources(), created.resource.output_resources());
}

#[tokio::test]
async fn test_failed_recipe_deployment_can_be_deleted() {
    let log = call_log();
    // No documents: reading the database back after the recipe ran fails
    let recipes = Arc::new(RecordingRecipeHandler::new(log.clone(), recipe_output()));
    let renderer_output = RendererOutput::default()
        .with_resource(cosmos_database())
        .with_computed_value("database", ComputedValueReference::property("MongoDatabase", "name"));
    let registry = Registry::builder()
        .with_renderer(MONGO_TYPE, StaticRenderer::new(renderer_output))
        .with_recipe_handler(recipes)
        .build();
    let controller = controller_with(registry, seeded_store().await, cloud_config());

    let err = tokio_test::assert_err!(
        controller
            .create_or_update(MONGO_ID, mongo_with_recipe(), &Preconditions::none(), &Cancellation::new())
            .await
    );
    assert_eq!(err.status_code(), 500);

    let failed = controller.get(MONGO_ID).await.unwrap();
    assert_eq!(failed.resource.provisioning_state(), ProvisioningState::Failed);
    let recipe = failed.resource.recipe_data.as_ref().expect("recipe data on the failed record");
    assert_eq!(recipe.resources, vec![COSMOS_ACCOUNT_ID, COSMOS_DATABASE_ID]);
    assert_eq!(failed.resource.output_resources().len(), 2);

    let outcome = tokio_test::assert_ok!(
        controller
            .delete(MONGO_ID, &Preconditions::if_match(failed.etag), &Cancellation::new())
            .await
    );

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(
        calls(&log),
        vec![
            "recipe:mongoDB".to_string(),
            format!("get:{}", COSMOS_DATABASE_ID),
            format!("recipe-delete:{}", COSMOS_DATABASE_ID),
            format!("recipe-delete:{}", COSMOS_ACCOUNT_ID),
        ]
    );
    assert_eq!(controller.get(MONGO_ID).await.unwrap_err().status_code(), 404);
}

// ============================================================================
// Garbage collection
// ============================================================================

#[tokio::test]
async fn test_update_deletes_output_resources_no_longer_rendered() {
    let h = default_harness().await;
    h.controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    h.renderer
        .set_output(RendererOutput::default().with_resource(deployment("A")));
    let updated = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(calls(&h.log), vec!["put:A", "put:B", "put:A", "delete:B"]);
    let remaining: Vec<&str> = updated
        .resource
        .output_resources()
        .iter()
        .map(|r| r.local_id.as_str())
        .collect();
    assert_eq!(remaining, vec!["A"]);
}

/// Deploys A named "old", then re-renders it as "new" while deletes of A fail
async fn replaced_identity_with_failing_collection() -> (Harness, cim_deployment::controller::SavedResource) {
    let h = harness_with_log(RendererOutput::default().with_resource(deployment("A")), RecordingHandler::new).await;
    h.handler.rename("A", "old");
    h.controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    h.handler.rename("A", "new");
    h.handler.fail_delete("A", true);
    let err = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(err.to_string().contains("boom"));

    let failed = h.controller.get(CONTAINER_ID).await.unwrap();
    (h, failed)
}

#[tokio::test]
async fn test_failed_collection_keeps_new_identity() {
    let (h, failed) = replaced_identity_with_failing_collection().await;

    let status = &failed.resource.properties.status;
    assert_eq!(failed.resource.provisioning_state(), ProvisioningState::Failed);
    assert_eq!(status.output_resources.len(), 1);
    assert_eq!(identity_name(status.output_resources[0].identity.as_ref().unwrap()), "new");
    assert_eq!(status.stale_output_resources.len(), 1);
    assert_eq!(identity_name(status.stale_output_resources[0].identity.as_ref().unwrap()), "old");
    assert!(h.handler.deleted_names().is_empty());
}

#[tokio::test]
async fn test_failed_collection_is_retried_by_next_update() {
    let (h, failed) = replaced_identity_with_failing_collection().await;
    h.handler.fail_delete("A", false);

    let retried = h
        .controller
        .create_or_update(
            CONTAINER_ID,
            container(CONTAINER_ID),
            &Preconditions::if_match(failed.etag),
            &Cancellation::new(),
        )
        .await
        .unwrap();

    assert_eq!(retried.resource.provisioning_state(), ProvisioningState::Succeeded);
    assert!(!retried.resource.properties.status.has_stale());
    assert_eq!(h.handler.deleted_names(), vec!["old"]);
}

#[tokio::test]
async fn test_delete_removes_superseded_identity() {
    let (h, failed) = replaced_identity_with_failing_collection().await;
    h.handler.fail_delete("A", false);

    h.controller
        .delete(CONTAINER_ID, &Preconditions::if_match(failed.etag), &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(h.handler.deleted_names(), vec!["new", "old"]);
    assert_eq!(h.controller.get(CONTAINER_ID).await.unwrap_err().status_code(), 404);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_tears_down_and_removes_record() {
    let h = default_harness().await;
    let created = h
        .controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    let outcome = h
        .controller
        .delete(CONTAINER_ID, &Preconditions::if_match(created.etag), &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(calls(&h.log), vec!["put:A", "put:B", "delete:B", "delete:A"]);
    assert_eq!(h.controller.get(CONTAINER_ID).await.unwrap_err().status_code(), 404);

    // Deleting again succeeds without touching any provider
    let again = h
        .controller
        .delete(CONTAINER_ID, &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();
    assert_eq!(again, DeleteOutcome::NotFound);
    assert_eq!(calls(&h.log).len(), 4);
}

#[tokio::test]
async fn test_delete_with_stale_etag_keeps_record() {
    let h = default_harness().await;
    h.controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    let err = h
        .controller
        .delete(CONTAINER_ID, &Preconditions::if_match("stale"), &Cancellation::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 412);
    assert!(h.controller.get(CONTAINER_ID).await.is_ok());
    assert_eq!(calls(&h.log), vec!["put:A", "put:B"]);
}

#[tokio::test]
async fn test_failed_teardown_keeps_record() {
    let h = default_harness().await;
    let mut record = container(CONTAINER_ID);
    record.properties.provisioning_state = ProvisioningState::Succeeded;
    record.properties.status.output_resources = vec![
        OutputResource::new("Config", kubernetes("ConfigMap")).with_identity(kubernetes_identity("Config")),
    ];
    let etag = seed(&h.store, CONTAINER_ID, serde_json::to_value(&record).unwrap()).await;

    let err = h
        .controller
        .delete(CONTAINER_ID, &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert_eq!(h.controller.get(CONTAINER_ID).await.unwrap().etag, etag);
}

// ============================================================================
// Read paths
// ============================================================================

#[tokio::test]
async fn test_list_pages_through_resources() {
    let h = default_harness().await;
    for id in [CONTAINER_ID, OTHER_CONTAINER_ID] {
        h.controller
            .create_or_update(id, container(id), &Preconditions::none(), &Cancellation::new())
            .await
            .unwrap();
    }

    let first = h.controller.list(SCOPE, CONTAINER_TYPE, Some(1), None).await.unwrap();
    assert_eq!(first.items.len(), 1);
    let token = first.continuation.clone().expect("continuation token");

    let second = h
        .controller
        .list(SCOPE, CONTAINER_TYPE, Some(1), Some(token))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.continuation, None);
    assert_ne!(first.items[0].resource.id, second.items[0].resource.id);

    // Environment and application records are not containers
    let all = h.controller.list(SCOPE, CONTAINER_TYPE, None, None).await.unwrap();
    assert_eq!(all.items.len(), 2);
}

#[tokio::test]
async fn test_list_secrets() {
    let h = default_harness().await;
    h.controller
        .create_or_update(CONTAINER_ID, container(CONTAINER_ID), &Preconditions::none(), &Cancellation::new())
        .await
        .unwrap();

    let secrets = h
        .controller
        .list_secrets(CONTAINER_ID, &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(secrets["password"], json!("s3cret"));
    assert!(calls(&h.log).contains(&"get:A".to_string()));
}

#[tokio::test]
async fn test_list_secrets_of_missing_resource() {
    let h = default_harness().await;

    let err = h
        .controller
        .list_secrets(CONTAINER_ID, &Cancellation::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::NotFound(_)));
}
