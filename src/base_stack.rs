// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Base stack composer.
//!
//! Composes the platform's shared infrastructure as one linear program:
//!
//! 1. Kubernetes cluster with federated-identity support
//! 2. Postgres instance for the MLflow backend store
//! 3. Three independent object-storage buckets (created concurrently)
//! 4. Traefik ingress router
//! 5. MLflow tracking server, wired to the database and tracking bucket
//!    through a read-write identity binding
//! 6. `/mlflow` route on the router
//! 7. Read-only identity binding for downstream model-serving workloads
//! 8. Output publication
//!
//! Any step failure aborts the compose; outputs are only published after
//! full success.

use k8s_openapi::api::core::v1::Namespace;
use rand::{distr::Alphanumeric, RngExt};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::constants::{
    CHART_MLFLOW, CHART_MLFLOW_REPO, CHART_TRAEFIK, CHART_TRAEFIK_REPO, DB_ENGINE,
    DB_ENGINE_VERSION, DB_INSTANCE_CLASS, DB_NAME, DB_PASSWORD_LEN, DB_STORAGE_GB, DB_USERNAME,
    OUTPUT_ARTIFACT_BUCKET_URI, OUTPUT_DVC_BUCKET_URI, OUTPUT_KUBECONFIG,
    OUTPUT_MODELS_SERVICE_ACCOUNT, OUTPUT_TRAEFIK_URI, PREFIX_TRACKING, SERVING_NAMESPACE,
    STACK_BASE, TRACKING_NAMESPACE,
};
use crate::errors::{ComposeError, EngineError};
use crate::graph::{EdgeKind, ResourceKind};
use crate::identity::{bind_service_identity, AccessLevel, IdentityBinding, IdentityBindingSpec};
use crate::labels::COMPONENT_TRACKING_SERVER;
use crate::providers::{
    BucketHandle, BucketSpec, ChartSpec, ClusterHandle, ClusterSpec, DatabaseHandle, DatabaseSpec,
    Engines, RouterHandle,
};
use crate::route::{register_route, RouteBinding, RouteSpec};
use crate::stack::{OutputValue, Stack, StackOutputs};
use crate::workload::{build_namespace, mlflow_chart_values};

/// Logical node name of the cluster
const NODE_CLUSTER: &str = "cloud-ml-eks";

/// Logical node name of the MLflow database instance
const NODE_DATABASE: &str = "mlflow-db";

/// Logical node name of the tracking namespace
const NODE_TRACKING_NAMESPACE: &str = "mlflow-namespace";

/// Settings of a base-stack compose.
#[derive(Clone, Debug)]
pub struct BaseStackSettings {
    /// Stack name downstream references resolve
    pub stack_name: String,
    /// Logical name of the bucket backing MLflow artifacts
    pub tracking_bucket: String,
    /// Logical name of the data-version (DVC) bucket
    pub dvc_bucket: String,
    /// Logical name of the generic artifact bucket
    pub artifact_bucket: String,
}

impl Default for BaseStackSettings {
    fn default() -> Self {
        Self {
            stack_name: STACK_BASE.to_string(),
            tracking_bucket: "mlflow-bucket".to_string(),
            dvc_bucket: "dvc-bucket".to_string(),
            artifact_bucket: "artifact-bucket".to_string(),
        }
    }
}

/// Result of a successful base-stack compose.
#[derive(Debug)]
pub struct ComposedBase {
    /// The composed stack with its frozen outputs
    pub stack: Stack,
    /// The published outputs, as downstream stacks will resolve them
    pub outputs: StackOutputs,
    /// Cluster handle
    pub cluster: ClusterHandle,
    /// Database handle
    pub database: DatabaseHandle,
    /// Bucket backing MLflow artifacts
    pub tracking_bucket: BucketHandle,
    /// Data-version bucket
    pub dvc_bucket: BucketHandle,
    /// Generic artifact bucket
    pub artifact_bucket: BucketHandle,
    /// Handle to the shared ingress router
    pub router: RouterHandle,
    /// Read-write binding of the tracking server
    pub tracking_binding: IdentityBinding,
    /// Read-only binding published for model-serving workloads
    pub models_binding: IdentityBinding,
    /// The `/mlflow` route
    pub tracking_route: RouteBinding,
    /// Manifest of the tracking namespace
    pub tracking_namespace: Namespace,
}

/// 16 characters, no specials; the provider rejects some special characters
/// in master passwords.
fn random_password(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Compose the base stack.
///
/// # Errors
///
/// Fails on the first engine, binding, route or graph error; nothing is
/// published in that case.
pub async fn compose_base(
    engines: &Engines,
    settings: BaseStackSettings,
) -> Result<ComposedBase, ComposeError> {
    let mut stack = Stack::new(settings.stack_name.clone());
    info!(stack = %stack.name(), "composing base stack");

    // 1. Cluster, with the OIDC provider the identity bindings require.
    stack.declare(NODE_CLUSTER, ResourceKind::Cluster)?;
    let cluster = engines
        .cluster
        .create_cluster(&ClusterSpec {
            name: NODE_CLUSTER.to_string(),
            enable_oidc_provider: true,
        })
        .await?;
    debug!(cluster = %cluster.name, "cluster created");

    // 2. MLflow backend store, scoped to the cluster's network boundary.
    stack.declare(NODE_DATABASE, ResourceKind::DatabaseInstance)?;
    stack.depend(NODE_DATABASE, NODE_CLUSTER, EdgeKind::Resource)?;
    let database = engines
        .database
        .create_instance(&DatabaseSpec {
            name: NODE_DATABASE.to_string(),
            engine: DB_ENGINE.to_string(),
            engine_version: DB_ENGINE_VERSION.to_string(),
            instance_class: DB_INSTANCE_CLASS.to_string(),
            storage_gb: DB_STORAGE_GB,
            database: DB_NAME.to_string(),
            username: DB_USERNAME.to_string(),
            password: random_password(DB_PASSWORD_LEN),
            vpc_security_group_ids: cluster.security_group_ids.clone(),
            skip_final_snapshot: true,
        })
        .await?;
    debug!(host = %database.host, "database created");

    // 3. Buckets are independent of each other; create them concurrently.
    stack.declare(&settings.tracking_bucket, ResourceKind::Bucket)?;
    stack.declare(&settings.dvc_bucket, ResourceKind::Bucket)?;
    stack.declare(&settings.artifact_bucket, ResourceKind::Bucket)?;
    let tracking_spec = BucketSpec {
        name: settings.tracking_bucket.clone(),
    };
    let dvc_spec = BucketSpec {
        name: settings.dvc_bucket.clone(),
    };
    let artifact_spec = BucketSpec {
        name: settings.artifact_bucket.clone(),
    };
    let (tracking_bucket, dvc_bucket, artifact_bucket) = futures::try_join!(
        engines.object_store.create_bucket(&tracking_spec),
        engines.object_store.create_bucket(&dvc_spec),
        engines.object_store.create_bucket(&artifact_spec),
    )?;
    debug!(
        tracking = %tracking_bucket.bucket,
        dvc = %dvc_bucket.bucket,
        artifact = %artifact_bucket.bucket,
        "buckets created"
    );

    // 4. Shared ingress router.
    stack.declare(CHART_TRAEFIK, ResourceKind::ChartRelease)?;
    stack.depend(CHART_TRAEFIK, NODE_CLUSTER, EdgeKind::Resource)?;
    let traefik = engines
        .chart
        .install(&ChartSpec {
            release: CHART_TRAEFIK.to_string(),
            chart: CHART_TRAEFIK.to_string(),
            repo: CHART_TRAEFIK_REPO.to_string(),
            namespace: SERVING_NAMESPACE.to_string(),
            values: json!({}),
        })
        .await?;
    let router_service = traefik
        .service(CHART_TRAEFIK)
        .ok_or_else(|| EngineError::new(CHART_TRAEFIK, "release did not create the router service"))?;
    let router_address = router_service
        .external_hostname
        .clone()
        .ok_or_else(|| EngineError::new(CHART_TRAEFIK, "router service has no external hostname"))?;
    let router = RouterHandle::new(CHART_TRAEFIK, router_address.clone());
    info!(address = %router_address, "ingress router installed");

    // 5. Tracking server: namespace, read-write binding, chart release.
    stack.declare(NODE_TRACKING_NAMESPACE, ResourceKind::Namespace)?;
    stack.depend(NODE_TRACKING_NAMESPACE, NODE_CLUSTER, EdgeKind::Resource)?;
    let tracking_namespace = build_namespace(TRACKING_NAMESPACE, COMPONENT_TRACKING_SERVER);

    let tracking_binding = bind_service_identity(
        &mut stack,
        &cluster,
        &IdentityBindingSpec {
            name: "mlflow-service-account".to_string(),
            namespace: TRACKING_NAMESPACE.to_string(),
            access: AccessLevel::ReadWrite,
            namespace_node: Some(NODE_TRACKING_NAMESPACE.to_string()),
        },
    )?;

    stack.declare(CHART_MLFLOW, ResourceKind::ChartRelease)?;
    stack.depend(CHART_MLFLOW, NODE_TRACKING_NAMESPACE, EdgeKind::Resource)?;
    stack.depend(CHART_MLFLOW, NODE_DATABASE, EdgeKind::Resource)?;
    stack.depend(CHART_MLFLOW, &settings.tracking_bucket, EdgeKind::Resource)?;
    stack.depend(
        CHART_MLFLOW,
        tracking_binding.service_account_name(),
        EdgeKind::Resource,
    )?;
    let mlflow = engines
        .chart
        .install(&ChartSpec {
            release: CHART_MLFLOW.to_string(),
            chart: CHART_MLFLOW.to_string(),
            repo: CHART_MLFLOW_REPO.to_string(),
            namespace: TRACKING_NAMESPACE.to_string(),
            values: mlflow_chart_values(
                &database,
                &tracking_bucket.uri(),
                tracking_binding.service_account_name(),
            ),
        })
        .await?;
    let tracking_service = mlflow
        .service(CHART_MLFLOW)
        .ok_or_else(|| EngineError::new(CHART_MLFLOW, "release did not create the tracking service"))?
        .clone();
    info!(release = %mlflow.release, "tracking server installed");

    // 6. Expose the tracking server under /mlflow.
    let tracking_route = register_route(
        &mut stack,
        &router,
        &tracking_service,
        &RouteSpec {
            name: CHART_MLFLOW.to_string(),
            prefix: PREFIX_TRACKING.to_string(),
            namespace: TRACKING_NAMESPACE.to_string(),
        },
    )?;

    // 7. Read-only binding for downstream model-serving workloads.
    let models_binding = bind_service_identity(
        &mut stack,
        &cluster,
        &IdentityBindingSpec {
            name: "models-service-account".to_string(),
            namespace: SERVING_NAMESPACE.to_string(),
            access: AccessLevel::ReadOnly,
            namespace_node: None,
        },
    )?;

    // 8. Publish. Valid only now, after every step succeeded.
    let outputs = stack
        .publish_outputs(BTreeMap::from([
            (
                OUTPUT_KUBECONFIG.to_string(),
                OutputValue::Secret(cluster.kubeconfig.clone()),
            ),
            (
                OUTPUT_DVC_BUCKET_URI.to_string(),
                OutputValue::String(dvc_bucket.uri()),
            ),
            (
                OUTPUT_ARTIFACT_BUCKET_URI.to_string(),
                OutputValue::String(artifact_bucket.uri()),
            ),
            (
                OUTPUT_MODELS_SERVICE_ACCOUNT.to_string(),
                OutputValue::String(models_binding.service_account_name().to_string()),
            ),
            (
                OUTPUT_TRAEFIK_URI.to_string(),
                OutputValue::String(router_address),
            ),
        ]))?
        .clone();
    info!(stack = %stack.name(), outputs = outputs.names().len(), "base stack composed");

    Ok(ComposedBase {
        stack,
        outputs,
        cluster,
        database,
        tracking_bucket,
        dvc_bucket,
        artifact_bucket,
        router,
        tracking_binding,
        models_binding,
        tracking_route,
        tracking_namespace,
    })
}

#[cfg(test)]
#[path = "base_stack_tests.rs"]
mod base_stack_tests;
