// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end integration tests for cross-stack composition.
//!
//! These tests compose the base stack against scenario engines, publish its
//! outputs into a backend, compose the pipeline stack against them, and
//! verify the cross-stack contracts: output passthrough, URI derivation,
//! identity wiring, route ordering and failure semantics.

mod common;

use std::collections::BTreeMap;

use common::{engines_with_failing_charts, ScenarioEngines, ROUTER_ADDRESS};
use crosswire::base_stack::{compose_base, BaseStackSettings, ComposedBase};
use crosswire::config::StackConfig;
use crosswire::errors::{ComposeError, RouteError, StackError};
use crosswire::pipeline_stack::{compose_pipeline, ComposedPipeline, PipelineStackSettings};
use crosswire::providers::ServiceHandle;
use crosswire::route::{register_route, RouteSpec};
use crosswire::stack::{InMemoryBackend, OutputValue, StackOutputs, StackReference};
use crosswire::state::FileBackend;

async fn composed_base() -> ComposedBase {
    compose_base(&ScenarioEngines::engines(), BaseStackSettings::default())
        .await
        .expect("base stack composes against scenario engines")
}

async fn composed_pipeline(backend: &InMemoryBackend) -> ComposedPipeline {
    let config = StackConfig::from_pairs([("baseStack", "base"), ("runID", "run-42")]);
    compose_pipeline(
        &ScenarioEngines,
        backend,
        &config,
        PipelineStackSettings::default(),
    )
    .await
    .expect("pipeline stack composes against published base outputs")
}

fn backend_with(base: &ComposedBase) -> InMemoryBackend {
    let mut backend = InMemoryBackend::new();
    backend.register(base.stack.name(), base.outputs.clone());
    backend
}

fn env_value<'a>(pipeline: &'a ComposedPipeline, name: &str) -> &'a str {
    pipeline
        .deployment
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap()
        .containers[0]
        .env
        .as_ref()
        .unwrap()
        .iter()
        .find(|e| e.name == name)
        .and_then(|e| e.value.as_deref())
        .unwrap_or_else(|| panic!("missing env var {name}"))
}

#[tokio::test]
async fn test_artifact_bucket_uri_passes_through_unmodified() {
    let base = composed_base().await;
    assert_eq!(
        base.outputs.get("artifactBucketURI").unwrap().as_str(),
        "s3://artifact-bucket-abc123"
    );

    let backend = backend_with(&base);
    let pipeline = composed_pipeline(&backend).await;

    assert_eq!(
        env_value(&pipeline, "ARTIFACT_BUCKET"),
        "s3://artifact-bucket-abc123"
    );
}

#[tokio::test]
async fn test_tracking_uri_is_derived_from_the_published_router_address() {
    let base = composed_base().await;
    assert_eq!(
        base.outputs.get("traefikURI").unwrap().as_str(),
        ROUTER_ADDRESS
    );

    let backend = backend_with(&base);
    let pipeline = composed_pipeline(&backend).await;

    assert_eq!(
        env_value(&pipeline, "MLFLOW_TRACKING_URI"),
        "http://lb-1234.elb.amazonaws.com/mlflow"
    );
    assert_eq!(env_value(&pipeline, "MLFLOW_RUN_ID"), "run-42");
}

#[tokio::test]
async fn test_serving_workload_runs_as_the_published_read_only_identity() {
    let base = composed_base().await;
    let backend = backend_with(&base);
    let pipeline = composed_pipeline(&backend).await;

    let pod = pipeline
        .deployment
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap();
    assert_eq!(
        pod.service_account_name.as_deref(),
        Some(base.models_binding.service_account_name())
    );
    // The published identity is the read-only one.
    assert!(!base
        .models_binding
        .permission_policy()
        .statement
        .iter()
        .any(|s| s.action.iter().any(|a| a == "s3:PutObject")));
}

#[tokio::test]
async fn test_routes_are_ordered_after_their_services_in_both_stacks() {
    let base = composed_base().await;
    assert!(base
        .stack
        .graph()
        .ordered_before("mlflow", base.tracking_route.node()));

    let backend = backend_with(&base);
    let pipeline = composed_pipeline(&backend).await;
    assert!(pipeline
        .stack
        .graph()
        .ordered_before("iris-serving-service", pipeline.route.node()));
    assert!(pipeline
        .stack
        .graph()
        .ordered_before("base", pipeline.route.node()));
}

#[tokio::test]
async fn test_both_stacks_claim_distinct_prefixes_and_reuse_conflicts() {
    let base = composed_base().await;
    let backend = backend_with(&base);
    let pipeline = composed_pipeline(&backend).await;

    assert_eq!(base.tracking_route.prefix(), "/mlflow");
    assert_eq!(pipeline.route.prefix(), "/models/iris");

    // Claims against the shared router handle of the base stack conflict.
    let mut stack = base.stack.clone();
    let another = ServiceHandle {
        resource: "mlflow".to_string(),
        name: "another".to_string(),
        namespace: "mlflow".to_string(),
        port: 80,
        external_hostname: None,
    };
    let err = register_route(
        &mut stack,
        &base.router,
        &another,
        &RouteSpec {
            name: "another".to_string(),
            prefix: "/mlflow".to_string(),
            namespace: "mlflow".to_string(),
        },
    )
    .unwrap_err();

    assert_eq!(
        err,
        ComposeError::Route(RouteError::PrefixConflict {
            prefix: "/mlflow".to_string(),
            router: "traefik".to_string(),
            existing: "mlflow".to_string()
        })
    );
}

#[tokio::test]
async fn test_cross_stack_resolution_is_idempotent_within_a_deploy() {
    let base = composed_base().await;
    let backend = backend_with(&base);

    let first = StackReference::resolve(&backend, "base").unwrap();
    let second = StackReference::resolve(&backend, "base").unwrap();
    assert_eq!(first.outputs(), second.outputs());

    // Two full composes against the same snapshot agree on every derived value.
    let a = composed_pipeline(&backend).await;
    let b = composed_pipeline(&backend).await;
    assert_eq!(
        env_value(&a, "MLFLOW_TRACKING_URI"),
        env_value(&b, "MLFLOW_TRACKING_URI")
    );
    assert_eq!(a.image.image_ref, b.image.image_ref);
}

#[tokio::test]
async fn test_missing_upstream_output_aborts_the_pipeline() {
    let mut backend = InMemoryBackend::new();
    backend.register(
        "base",
        StackOutputs::publish(BTreeMap::from([(
            "kubeconfig".to_string(),
            OutputValue::Secret("apiVersion: v1".to_string()),
        )])),
    );

    let config = StackConfig::from_pairs([("baseStack", "base"), ("runID", "run-42")]);
    let err = compose_pipeline(
        &ScenarioEngines,
        &backend,
        &config,
        PipelineStackSettings::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err,
        ComposeError::Stack(StackError::MissingOutput {
            stack: "base".to_string(),
            output: "traefikURI".to_string()
        })
    );
}

#[tokio::test]
async fn test_step_failure_aborts_the_base_compose_without_outputs() {
    let err = compose_base(&engines_with_failing_charts(), BaseStackSettings::default())
        .await
        .unwrap_err();

    match err {
        ComposeError::Engine(engine) => {
            assert_eq!(engine.resource, "traefik");
        }
        other => panic!("expected an engine error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_outputs_survive_the_file_backend_round_trip() {
    let base = composed_base().await;

    let dir = tempfile::tempdir().unwrap();
    let file_backend = FileBackend::new(dir.path().join("state.json"));
    file_backend.store(base.stack.name(), &base.outputs).unwrap();

    let config = StackConfig::from_pairs([("baseStack", "base"), ("runID", "run-42")]);
    let pipeline = compose_pipeline(
        &ScenarioEngines,
        &file_backend,
        &config,
        PipelineStackSettings::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        env_value(&pipeline, "ARTIFACT_BUCKET"),
        "s3://artifact-bucket-abc123"
    );
}
