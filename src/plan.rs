// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deterministic preview engines.
//!
//! Real engines provision cloud resources; these derive placeholder handles
//! from the resource's logical name alone, so a preview renders the same
//! graph, names and outputs on every run without touching any provider.
//! Placeholder values follow the shape of the real ones (ARNs, endpoint
//! hostnames, suffixed bucket names, image digests) so downstream wiring is
//! exercised end to end.
//!
//! The suffix scheme mirrors how providers decorate physical names: a short
//! digest of the logical name, stable across runs.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::constants::DB_PORT;
use crate::errors::EngineError;
use crate::providers::{
    BucketHandle, BucketSpec, ChartEngine, ChartSpec, ClusterEngine, ClusterHandle, ClusterSpec,
    DatabaseEngine, DatabaseHandle, DatabaseSpec, Engines, ImageEngine, ImageHandle, ImageSpec,
    ObjectStoreEngine, OidcProvider, ReleaseHandle, ServiceHandle,
};

/// Account id used in placeholder ARNs and registries.
const PREVIEW_ACCOUNT: &str = "123456789012";

/// Region used in placeholder endpoints.
const PREVIEW_REGION: &str = "us-east-1";

fn hex_digest(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Short, stable physical-name suffix for a logical name.
fn suffix(name: &str) -> String {
    hex_digest(name)[..7].to_string()
}

/// Preview implementation of every engine contract.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanEngines;

impl PlanEngines {
    /// Bundle preview engines for a compose.
    #[must_use]
    pub fn engines() -> Engines {
        Engines {
            cluster: Box::new(PlanEngines),
            database: Box::new(PlanEngines),
            object_store: Box::new(PlanEngines),
            chart: Box::new(PlanEngines),
            image: Box::new(PlanEngines),
        }
    }
}

#[async_trait]
impl ClusterEngine for PlanEngines {
    async fn create_cluster(&self, spec: &ClusterSpec) -> Result<ClusterHandle, EngineError> {
        let id = hex_digest(&spec.name)[..32].to_uppercase();
        let oidc = spec.enable_oidc_provider.then(|| {
            let issuer_host =
                format!("oidc.eks.{PREVIEW_REGION}.amazonaws.com/id/{id}");
            OidcProvider {
                arn: format!("arn:aws:iam::{PREVIEW_ACCOUNT}:oidc-provider/{issuer_host}"),
                issuer_url: format!("https://{issuer_host}"),
            }
        });
        Ok(ClusterHandle {
            resource: spec.name.clone(),
            name: spec.name.clone(),
            kubeconfig: format!(
                "apiVersion: v1\nkind: Config\ncurrent-context: {name}\n",
                name = spec.name
            ),
            security_group_ids: vec![format!("sg-{}", suffix(&spec.name))],
            oidc,
        })
    }
}

#[async_trait]
impl DatabaseEngine for PlanEngines {
    async fn create_instance(&self, spec: &DatabaseSpec) -> Result<DatabaseHandle, EngineError> {
        Ok(DatabaseHandle {
            resource: spec.name.clone(),
            host: format!(
                "{}.{}.{PREVIEW_REGION}.rds.amazonaws.com",
                spec.name,
                suffix(&spec.name)
            ),
            port: DB_PORT,
            database: spec.database.clone(),
            username: spec.username.clone(),
            password: spec.password.clone(),
        })
    }
}

#[async_trait]
impl ObjectStoreEngine for PlanEngines {
    async fn create_bucket(&self, spec: &BucketSpec) -> Result<BucketHandle, EngineError> {
        Ok(BucketHandle {
            resource: spec.name.clone(),
            bucket: format!("{}-{}", spec.name, suffix(&spec.name)),
        })
    }
}

#[async_trait]
impl ChartEngine for PlanEngines {
    async fn install(&self, spec: &ChartSpec) -> Result<ReleaseHandle, EngineError> {
        // Every preview release exposes one service named after the release.
        let service = ServiceHandle {
            resource: spec.release.clone(),
            name: spec.release.clone(),
            namespace: spec.namespace.clone(),
            port: 80,
            external_hostname: Some(format!(
                "{}-{}.elb.amazonaws.com",
                spec.release,
                suffix(&spec.release)
            )),
        };
        Ok(ReleaseHandle {
            resource: spec.release.clone(),
            release: spec.release.clone(),
            namespace: spec.namespace.clone(),
            services: BTreeMap::from([(spec.release.clone(), service)]),
        })
    }
}

#[async_trait]
impl ImageEngine for PlanEngines {
    async fn build_and_push(&self, spec: &ImageSpec) -> Result<ImageHandle, EngineError> {
        let digest = hex_digest(&format!("{}:{}", spec.name, spec.context));
        Ok(ImageHandle {
            resource: spec.name.clone(),
            image_ref: format!(
                "{PREVIEW_ACCOUNT}.dkr.ecr.{PREVIEW_REGION}.amazonaws.com/{}@sha256:{digest}",
                spec.name
            ),
        })
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod plan_tests;
