// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `base_stack.rs`

use super::random_password;
use crate::base_stack::{compose_base, BaseStackSettings};
use crate::identity::AccessLevel;
use crate::plan::PlanEngines;

#[test]
fn test_random_password_is_alphanumeric_and_sized() {
    let password = random_password(16);
    assert_eq!(password.len(), 16);
    assert!(password.chars().all(char::is_alphanumeric));

    // Vanishingly unlikely to collide; a collision means the generator is broken.
    assert_ne!(random_password(16), random_password(16));
}

#[tokio::test]
async fn test_compose_base_publishes_all_five_outputs() {
    let engines = PlanEngines::engines();
    let base = compose_base(&engines, BaseStackSettings::default())
        .await
        .unwrap();

    assert_eq!(
        base.outputs.names(),
        vec![
            "artifactBucketURI",
            "dvcBucketURI",
            "kubeconfig",
            "modelsServiceAccountName",
            "traefikURI"
        ]
    );
    assert!(base.outputs.get("kubeconfig").unwrap().is_secret());
    assert!(base
        .outputs
        .get("artifactBucketURI")
        .unwrap()
        .as_str()
        .starts_with("s3://artifact-bucket"));
    assert_eq!(
        base.outputs.get("modelsServiceAccountName").unwrap().as_str(),
        "models-service-account"
    );
}

#[tokio::test]
async fn test_compose_base_binds_identities_per_access_level() {
    let engines = PlanEngines::engines();
    let base = compose_base(&engines, BaseStackSettings::default())
        .await
        .unwrap();

    assert_eq!(base.tracking_binding.access(), AccessLevel::ReadWrite);
    assert_eq!(base.tracking_binding.namespace(), "mlflow");
    assert_eq!(base.models_binding.access(), AccessLevel::ReadOnly);
    assert_eq!(base.models_binding.namespace(), "default");
}

#[tokio::test]
async fn test_compose_base_orders_route_after_tracking_server() {
    let engines = PlanEngines::engines();
    let base = compose_base(&engines, BaseStackSettings::default())
        .await
        .unwrap();

    let graph = base.stack.graph();
    assert!(graph.ordered_before("mlflow", base.tracking_route.node()));
    assert!(graph.ordered_before("traefik", base.tracking_route.node()));

    // The cluster is the root of the program.
    let order = graph.toposort().unwrap();
    assert_eq!(order[0], "cloud-ml-eks");
}

#[tokio::test]
async fn test_compose_base_router_claims_the_tracking_prefix() {
    let engines = PlanEngines::engines();
    let base = compose_base(&engines, BaseStackSettings::default())
        .await
        .unwrap();

    assert!(base.router.claimed_prefixes().contains("/mlflow"));
    assert_eq!(
        base.outputs.get("traefikURI").unwrap().as_str(),
        base.router.hostname()
    );
}
