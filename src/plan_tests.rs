// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `plan.rs`

use crate::plan::PlanEngines;
use crate::providers::{BucketSpec, ClusterSpec, ImageSpec};

#[tokio::test]
async fn test_preview_cluster_carries_an_identity_provider() {
    let engines = PlanEngines::engines();
    let cluster = engines
        .cluster
        .create_cluster(&ClusterSpec {
            name: "cloud-ml-eks".to_string(),
            enable_oidc_provider: true,
        })
        .await
        .unwrap();

    let oidc = cluster.oidc.unwrap();
    assert!(oidc.arn.starts_with("arn:aws:iam::123456789012:oidc-provider/"));
    assert!(oidc.issuer_url.starts_with("https://oidc.eks."));
    assert!(!cluster.kubeconfig.is_empty());
}

#[tokio::test]
async fn test_preview_cluster_without_oidc_has_no_provider() {
    let engines = PlanEngines::engines();
    let cluster = engines
        .cluster
        .create_cluster(&ClusterSpec {
            name: "plain".to_string(),
            enable_oidc_provider: false,
        })
        .await
        .unwrap();

    assert!(cluster.oidc.is_none());
}

#[tokio::test]
async fn test_preview_handles_are_deterministic() {
    let engines = PlanEngines::engines();
    let spec = BucketSpec {
        name: "artifact-bucket".to_string(),
    };

    let first = engines.object_store.create_bucket(&spec).await.unwrap();
    let second = engines.object_store.create_bucket(&spec).await.unwrap();

    assert_eq!(first.bucket, second.bucket);
    assert!(first.bucket.starts_with("artifact-bucket-"));
    assert_eq!(first.uri(), format!("s3://{}", first.bucket));
}

#[tokio::test]
async fn test_preview_image_ref_is_digest_qualified() {
    let engines = PlanEngines::engines();
    let image = engines
        .image
        .build_and_push(&ImageSpec {
            name: "iris-image".to_string(),
            context: "../".to_string(),
        })
        .await
        .unwrap();

    let (repo, digest) = image.image_ref.split_once("@sha256:").unwrap();
    assert!(repo.ends_with("/iris-image"));
    assert_eq!(digest.len(), 64);
}
