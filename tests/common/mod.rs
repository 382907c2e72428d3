// Common test utilities for integration tests

use async_trait::async_trait;
use std::collections::BTreeMap;

use crosswire::errors::EngineError;
use crosswire::providers::{
    BucketHandle, BucketSpec, ChartEngine, ChartSpec, ClusterEngine, ClusterHandle, ClusterSpec,
    DatabaseEngine, DatabaseHandle, DatabaseSpec, Engines, ImageEngine, ImageHandle, ImageSpec,
    ObjectStoreEngine, OidcProvider, ReleaseHandle, ServiceHandle,
};

/// External hostname the scenario router publishes.
pub const ROUTER_ADDRESS: &str = "lb-1234.elb.amazonaws.com";

/// Suffix the scenario object store appends to bucket names.
pub const BUCKET_SUFFIX: &str = "abc123";

/// Engines returning fixed, scenario-shaped handles.
///
/// Unlike the preview engines, physical names here match the values the
/// cross-stack scenarios assert on (`artifact-bucket-abc123`,
/// `lb-1234.elb.amazonaws.com`).
#[derive(Clone, Copy, Debug, Default)]
pub struct ScenarioEngines;

impl ScenarioEngines {
    pub fn engines() -> Engines {
        Engines {
            cluster: Box::new(ScenarioEngines),
            database: Box::new(ScenarioEngines),
            object_store: Box::new(ScenarioEngines),
            chart: Box::new(ScenarioEngines),
            image: Box::new(ScenarioEngines),
        }
    }
}

#[async_trait]
impl ClusterEngine for ScenarioEngines {
    async fn create_cluster(&self, spec: &ClusterSpec) -> Result<ClusterHandle, EngineError> {
        let oidc = spec.enable_oidc_provider.then(|| OidcProvider {
            arn: "arn:aws:iam::123456789012:oidc-provider/oidc.eks.us-east-1.amazonaws.com/id/TEST"
                .to_string(),
            issuer_url: "https://oidc.eks.us-east-1.amazonaws.com/id/TEST".to_string(),
        });
        Ok(ClusterHandle {
            resource: spec.name.clone(),
            name: spec.name.clone(),
            kubeconfig: "apiVersion: v1\nkind: Config\n".to_string(),
            security_group_ids: vec!["sg-cluster".to_string(), "sg-nodes".to_string()],
            oidc,
        })
    }
}

#[async_trait]
impl DatabaseEngine for ScenarioEngines {
    async fn create_instance(&self, spec: &DatabaseSpec) -> Result<DatabaseHandle, EngineError> {
        Ok(DatabaseHandle {
            resource: spec.name.clone(),
            host: format!("{}.rds.amazonaws.com", spec.name),
            port: 5432,
            database: spec.database.clone(),
            username: spec.username.clone(),
            password: spec.password.clone(),
        })
    }
}

#[async_trait]
impl ObjectStoreEngine for ScenarioEngines {
    async fn create_bucket(&self, spec: &BucketSpec) -> Result<BucketHandle, EngineError> {
        Ok(BucketHandle {
            resource: spec.name.clone(),
            bucket: format!("{}-{BUCKET_SUFFIX}", spec.name),
        })
    }
}

#[async_trait]
impl ChartEngine for ScenarioEngines {
    async fn install(&self, spec: &ChartSpec) -> Result<ReleaseHandle, EngineError> {
        let external_hostname = if spec.release == "traefik" {
            Some(ROUTER_ADDRESS.to_string())
        } else {
            None
        };
        let service = ServiceHandle {
            resource: spec.release.clone(),
            name: spec.release.clone(),
            namespace: spec.namespace.clone(),
            port: 80,
            external_hostname,
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
impl ImageEngine for ScenarioEngines {
    async fn build_and_push(&self, spec: &ImageSpec) -> Result<ImageHandle, EngineError> {
        Ok(ImageHandle {
            resource: spec.name.clone(),
            image_ref: format!(
                "123456789012.dkr.ecr.us-east-1.amazonaws.com/{}:latest",
                spec.name
            ),
        })
    }
}

/// Chart engine failing every install, for abort-semantics tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingChartEngine;

#[async_trait]
impl ChartEngine for FailingChartEngine {
    async fn install(&self, spec: &ChartSpec) -> Result<ReleaseHandle, EngineError> {
        Err(EngineError::new(
            spec.release.clone(),
            "chart repository unreachable",
        ))
    }
}

/// Scenario engines with the failing chart engine swapped in.
pub fn engines_with_failing_charts() -> Engines {
    Engines {
        cluster: Box::new(ScenarioEngines),
        database: Box::new(ScenarioEngines),
        object_store: Box::new(ScenarioEngines),
        chart: Box::new(FailingChartEngine),
        image: Box::new(ScenarioEngines),
    }
}
