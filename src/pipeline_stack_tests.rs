// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `pipeline_stack.rs`

use std::collections::BTreeMap;

use crate::config::StackConfig;
use crate::errors::{ComposeError, ConfigError, StackError};
use crate::pipeline_stack::{compose_pipeline, PipelineStackSettings};
use crate::plan::PlanEngines;
use crate::stack::{InMemoryBackend, OutputValue, StackOutputs};

fn base_outputs() -> StackOutputs {
    StackOutputs::publish(BTreeMap::from([
        (
            "kubeconfig".to_string(),
            OutputValue::Secret("apiVersion: v1".to_string()),
        ),
        (
            "dvcBucketURI".to_string(),
            OutputValue::String("s3://dvc-bucket-def456".to_string()),
        ),
        (
            "artifactBucketURI".to_string(),
            OutputValue::String("s3://artifact-bucket-abc123".to_string()),
        ),
        (
            "modelsServiceAccountName".to_string(),
            OutputValue::String("models-service-account".to_string()),
        ),
        (
            "traefikURI".to_string(),
            OutputValue::String("lb-1234.elb.amazonaws.com".to_string()),
        ),
    ]))
}

fn backend_with_base() -> InMemoryBackend {
    let mut backend = InMemoryBackend::new();
    backend.register("base", base_outputs());
    backend
}

fn pipeline_config() -> StackConfig {
    StackConfig::from_pairs([("baseStack", "base"), ("runID", "run-42")])
}

#[tokio::test]
async fn test_missing_config_fails_fast() {
    let backend = backend_with_base();
    let err = compose_pipeline(
        &PlanEngines,
        &backend,
        &StackConfig::from_pairs([("baseStack", "base")]),
        PipelineStackSettings::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err,
        ComposeError::Config(ConfigError::MissingKey {
            key: "runID".to_string()
        })
    );
}

#[tokio::test]
async fn test_unknown_base_stack_fails_fast() {
    let backend = InMemoryBackend::new();
    let err = compose_pipeline(
        &PlanEngines,
        &backend,
        &pipeline_config(),
        PipelineStackSettings::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err,
        ComposeError::Stack(StackError::UnknownStack {
            stack: "base".to_string()
        })
    );
}

#[tokio::test]
async fn test_missing_upstream_output_fails_fast() {
    let mut backend = InMemoryBackend::new();
    backend.register(
        "base",
        StackOutputs::publish(BTreeMap::from([(
            "kubeconfig".to_string(),
            OutputValue::Secret("apiVersion: v1".to_string()),
        )])),
    );

    let err = compose_pipeline(
        &PlanEngines,
        &backend,
        &pipeline_config(),
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
async fn test_serving_environment_is_derived_from_upstream_outputs() {
    let backend = backend_with_base();
    let pipeline = compose_pipeline(
        &PlanEngines,
        &backend,
        &pipeline_config(),
        PipelineStackSettings::default(),
    )
    .await
    .unwrap();

    let container = &pipeline
        .deployment
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap()
        .containers[0];
    let env = container.env.as_ref().unwrap();
    let get = |name: &str| {
        env.iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.as_deref())
            .unwrap()
    };

    assert_eq!(
        get("MLFLOW_TRACKING_URI"),
        "http://lb-1234.elb.amazonaws.com/mlflow"
    );
    assert_eq!(get("MLFLOW_RUN_ID"), "run-42");
    assert_eq!(get("ARTIFACT_BUCKET"), "s3://artifact-bucket-abc123");
    assert_eq!(get("LISTEN_PORT"), "80");
}

#[tokio::test]
async fn test_workload_runs_as_the_published_identity() {
    let backend = backend_with_base();
    let pipeline = compose_pipeline(
        &PlanEngines,
        &backend,
        &pipeline_config(),
        PipelineStackSettings::default(),
    )
    .await
    .unwrap();

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
        Some("models-service-account")
    );
}

#[tokio::test]
async fn test_route_is_ordered_after_service_and_reference() {
    let backend = backend_with_base();
    let pipeline = compose_pipeline(
        &PlanEngines,
        &backend,
        &pipeline_config(),
        PipelineStackSettings::default(),
    )
    .await
    .unwrap();

    let graph = pipeline.stack.graph();
    assert!(graph.ordered_before("iris-serving-service", pipeline.route.node()));
    assert!(graph.ordered_before("iris-serving", pipeline.route.node()));
    assert!(graph.ordered_before("base", pipeline.route.node()));

    assert_eq!(pipeline.route.prefix(), "/models/iris");
    assert_eq!(
        pipeline.route.ingress_route().spec.routes[0].match_expr,
        "PathPrefix(`/models/iris`)"
    );
}

#[tokio::test]
async fn test_consumed_outputs_become_stack_output_edges() {
    let backend = backend_with_base();
    let pipeline = compose_pipeline(
        &PlanEngines,
        &backend,
        &pipeline_config(),
        PipelineStackSettings::default(),
    )
    .await
    .unwrap();

    let consumed: Vec<String> = pipeline
        .stack
        .graph()
        .edges()
        .iter()
        .filter(|e| e.consumer == "iris-serving" && e.producer == "base")
        .filter_map(|e| match &e.kind {
            crate::graph::EdgeKind::StackOutput { output } => Some(output.clone()),
            crate::graph::EdgeKind::Resource => None,
        })
        .collect();

    assert_eq!(
        consumed,
        vec![
            "kubeconfig",
            "traefikURI",
            "artifactBucketURI",
            "modelsServiceAccountName"
        ]
    );
}
