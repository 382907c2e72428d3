// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes resource builders for the platform workloads.
//!
//! This module provides functions to build the Kubernetes resources
//! (`Deployment`, `Service`, `Namespace`) for the model-serving workload and
//! the chart values for the MLflow tracking server. All functions are pure
//! and easily testable.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, Namespace, PodSpec, PodTemplateSpec, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use url::Url;

use crate::constants::{
    ENV_ARTIFACT_BUCKET, ENV_LISTEN_PORT, ENV_RUN_ID, ENV_TRACKING_URI, PREFIX_TRACKING,
};
use crate::errors::RouteError;
use crate::labels::{
    K8S_COMPONENT, K8S_INSTANCE, K8S_MANAGED_BY, K8S_NAME, K8S_PART_OF, MANAGED_BY_CROSSWIRE,
    PART_OF_CROSSWIRE,
};
use crate::providers::DatabaseHandle;

/// Name of the single container in the serving pod
const CONTAINER_NAME_SERVING: &str = "serving";

/// Name of the serving container's HTTP port
const PORT_NAME_HTTP: &str = "http";

/// Builds standardized Kubernetes labels for platform workloads.
#[must_use]
pub fn build_labels(name: &str, component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), name.into());
    labels.insert(K8S_INSTANCE.into(), name.into());
    labels.insert(K8S_COMPONENT.into(), component.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_CROSSWIRE.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_CROSSWIRE.into());
    labels
}

/// Derive the router-relative tracking URL from the router's published
/// address.
///
/// `lb-1234.elb.amazonaws.com` becomes `http://lb-1234.elb.amazonaws.com/mlflow`.
///
/// # Errors
///
/// Returns [`RouteError::InvalidRouterAddress`] when the address does not
/// parse as a host.
pub fn tracking_uri(router_address: &str) -> Result<String, RouteError> {
    let invalid = || RouteError::InvalidRouterAddress {
        address: router_address.to_string(),
    };
    if router_address.is_empty() || router_address.contains('/') {
        return Err(invalid());
    }
    let mut url = Url::parse(&format!("http://{router_address}")).map_err(|_| invalid())?;
    url.set_path(PREFIX_TRACKING);
    Ok(url.to_string())
}

/// Build the generated environment of the serving container.
///
/// Upstream-derived values pass through unmodified; only the tracking URI is
/// derived (see [`tracking_uri`]).
#[must_use]
pub fn serving_env(
    listen_port: u16,
    tracking_uri: &str,
    run_id: &str,
    artifact_bucket_uri: &str,
) -> Vec<EnvVar> {
    let plain = |name: &str, value: &str| EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    };
    vec![
        plain(ENV_LISTEN_PORT, &listen_port.to_string()),
        plain(ENV_TRACKING_URI, tracking_uri),
        plain(ENV_RUN_ID, run_id),
        plain(ENV_ARTIFACT_BUCKET, artifact_bucket_uri),
    ]
}

/// Desired state of the model-serving workload.
#[derive(Clone, Debug)]
pub struct ServingWorkloadSpec {
    /// Workload name; deployment and service derive from it
    pub name: String,
    /// Namespace the workload runs in
    pub namespace: String,
    /// Fully qualified image reference
    pub image: String,
    /// Port the container listens on
    pub listen_port: u16,
    /// Replica count
    pub replicas: i32,
    /// Service account injected as `serviceAccountName`
    pub service_account: String,
    /// Component label value
    pub component: String,
}

/// Builds the serving `Deployment`: one container, the built image, the
/// generated environment, the bound service identity.
#[must_use]
pub fn build_serving_deployment(spec: &ServingWorkloadSpec, env: Vec<EnvVar>) -> Deployment {
    let labels = build_labels(&spec.name, &spec.component);
    let selector = BTreeMap::from([(K8S_NAME.to_string(), spec.name.clone())]);

    Deployment {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(selector),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(spec.service_account.clone()),
                    containers: vec![Container {
                        name: CONTAINER_NAME_SERVING.to_string(),
                        image: Some(spec.image.clone()),
                        ports: Some(vec![ContainerPort {
                            name: Some(PORT_NAME_HTTP.to_string()),
                            container_port: i32::from(spec.listen_port),
                            ..Default::default()
                        }]),
                        env: Some(env),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds the serving `Service` fronting the deployment's pods.
#[must_use]
pub fn build_serving_service(spec: &ServingWorkloadSpec) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(build_labels(&spec.name, &spec.component)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(BTreeMap::from([(K8S_NAME.to_string(), spec.name.clone())])),
            ports: Some(vec![ServicePort {
                name: Some(PORT_NAME_HTTP.to_string()),
                port: i32::from(spec.listen_port),
                target_port: Some(IntOrString::Int(i32::from(spec.listen_port))),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

/// Builds a labeled `Namespace`.
#[must_use]
pub fn build_namespace(name: &str, component: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(build_labels(name, component)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Builds the MLflow chart values: Postgres backend store, default artifact
/// root, and the pre-created service account.
#[must_use]
pub fn mlflow_chart_values(
    db: &DatabaseHandle,
    artifact_root: &str,
    service_account: &str,
) -> Value {
    json!({
        "backendStore": {
            "postgres": {
                "username": db.username,
                "password": db.password,
                "host": db.host,
                "port": db.port,
                "database": db.database,
            }
        },
        "defaultArtifactRoot": artifact_root,
        "serviceAccount": {
            "create": false,
            "name": service_account,
        }
    })
}

#[cfg(test)]
#[path = "workload_tests.rs"]
mod workload_tests;
