// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider handles and provisioning-engine contracts.
//!
//! The cluster, database, object-storage, chart and image engines are
//! external collaborators: their provisioning logic lives elsewhere and is
//! reached through the async traits defined here. The composers only consume
//! the stable handle types each engine returns.
//!
//! Handles carry the logical resource name they were provisioned under
//! (`resource`), which is the node name the composers use when declaring
//! dependency edges against them.
//!
//! # Capability abstractions
//!
//! - [`OidcProvider`] - a cluster's federated identity provider, consumed by
//!   the identity binding resolver
//! - [`ServiceHandle`] - a network service reachable inside the cluster,
//!   consumed by the route binding resolver
//! - [`RouterHandle`] - the shared ingress router; route registrations claim
//!   path prefixes on it

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::errors::{EngineError, RouteError};

// ============================================================================
// Identity Provider
// ============================================================================

/// A cluster's OIDC identity provider.
///
/// Supports issuing federated trust relationships keyed by a service
/// identity's namespace and name. Present only when the cluster was created
/// with federated-identity support enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidcProvider {
    /// Cloud ARN of the provider, `arn:aws:iam::<account>:oidc-provider/<host>`
    pub arn: String,
    /// Issuer URL, `https://oidc.eks.<region>.amazonaws.com/id/<id>`
    pub issuer_url: String,
}

impl OidcProvider {
    /// The issuer without its scheme, as used in trust-policy condition keys.
    #[must_use]
    pub fn issuer_host(&self) -> &str {
        self.issuer_url
            .strip_prefix("https://")
            .or_else(|| self.issuer_url.strip_prefix("http://"))
            .unwrap_or(&self.issuer_url)
    }
}

// ============================================================================
// Provisioned Handles
// ============================================================================

/// A provisioned Kubernetes cluster.
#[derive(Clone, Debug)]
pub struct ClusterHandle {
    /// Logical resource name the cluster was declared under
    pub resource: String,
    /// Cloud-side cluster name
    pub name: String,
    /// Serialized kubeconfig granting access to the cluster
    pub kubeconfig: String,
    /// Security groups forming the cluster's network boundary
    pub security_group_ids: Vec<String>,
    /// Federated identity provider, when enabled at creation
    pub oidc: Option<OidcProvider>,
}

/// A provisioned managed database instance.
#[derive(Clone, Debug)]
pub struct DatabaseHandle {
    /// Logical resource name the instance was declared under
    pub resource: String,
    /// Hostname of the instance endpoint
    pub host: String,
    /// Port of the instance endpoint
    pub port: u16,
    /// Database name
    pub database: String,
    /// Admin username
    pub username: String,
    /// Admin password
    pub password: String,
}

/// A provisioned object-storage bucket.
#[derive(Clone, Debug)]
pub struct BucketHandle {
    /// Logical resource name the bucket was declared under
    pub resource: String,
    /// Physical bucket name (provider-suffixed)
    pub bucket: String,
}

impl BucketHandle {
    /// The bucket's `s3://<bucket>` URI.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// A network service reachable inside the cluster.
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    /// Logical resource name of the producer (chart release or deployment)
    pub resource: String,
    /// Kubernetes service name
    pub name: String,
    /// Namespace the service lives in
    pub namespace: String,
    /// Service port
    pub port: u16,
    /// External hostname, for LoadBalancer services once provisioned
    pub external_hostname: Option<String>,
}

/// An installed chart release.
#[derive(Clone, Debug)]
pub struct ReleaseHandle {
    /// Logical resource name the release was declared under
    pub resource: String,
    /// Release name
    pub release: String,
    /// Namespace the release was installed into
    pub namespace: String,
    /// Services created by the release, by service name
    pub services: BTreeMap<String, ServiceHandle>,
}

impl ReleaseHandle {
    /// Look up a service created by this release.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceHandle> {
        self.services.get(name)
    }
}

/// A built and published container image.
#[derive(Clone, Debug)]
pub struct ImageHandle {
    /// Logical resource name the image was declared under
    pub resource: String,
    /// Fully qualified image reference (`<registry>/<repo>@sha256:<digest>`)
    pub image_ref: String,
}

// ============================================================================
// Ingress Router
// ============================================================================

/// Where a router handle came from, which decides the edge kind of route
/// registrations against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterOrigin {
    /// The router is a resource of the current stack
    Resource,
    /// The router was resolved from an upstream stack's published output
    StackOutput {
        /// Name of the consumed output
        output: String,
    },
}

/// Handle to the shared ingress router.
///
/// The router is a single shared mutable resource: every route registration
/// is an additive declaration against it, and the claimed-prefix set rejects
/// a second claim of the same prefix on the same handle.
///
/// The claim set is scoped to this handle. A downstream stack that rebuilds
/// its handle from a published router address starts with an empty claim set,
/// so prefix uniqueness across independently deployed stacks stays the
/// operator's responsibility.
#[derive(Debug)]
pub struct RouterHandle {
    node: String,
    origin: RouterOrigin,
    hostname: String,
    claimed: Mutex<BTreeMap<String, String>>,
}

impl RouterHandle {
    /// Handle to a router installed by the current stack.
    #[must_use]
    pub fn new(node: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            origin: RouterOrigin::Resource,
            hostname: hostname.into(),
            claimed: Mutex::new(BTreeMap::new()),
        }
    }

    /// Handle to a router reached through an upstream stack's published
    /// address.
    ///
    /// `ref_node` is the stack-reference node of the consuming stack; route
    /// registrations will depend on it with a stack-output edge for `output`.
    #[must_use]
    pub fn from_stack_output(
        ref_node: impl Into<String>,
        output: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            node: ref_node.into(),
            origin: RouterOrigin::StackOutput {
                output: output.into(),
            },
            hostname: hostname.into(),
            claimed: Mutex::new(BTreeMap::new()),
        }
    }

    /// Graph node route registrations must depend on.
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// How this handle reaches the router.
    #[must_use]
    pub fn origin(&self) -> &RouterOrigin {
        &self.origin
    }

    /// Externally reachable hostname of the router.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Claim a path prefix for a route.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::PrefixConflict`] naming the earlier claimant if
    /// the prefix is already taken on this handle.
    pub fn claim_prefix(&self, prefix: &str, route: &str) -> Result<(), RouteError> {
        let mut claimed = self.claimed.lock().expect("prefix claim lock poisoned");
        if let Some(existing) = claimed.get(prefix) {
            return Err(RouteError::PrefixConflict {
                prefix: prefix.to_string(),
                router: self.node.clone(),
                existing: existing.clone(),
            });
        }
        claimed.insert(prefix.to_string(), route.to_string());
        Ok(())
    }

    /// Prefixes currently claimed on this handle, sorted.
    #[must_use]
    pub fn claimed_prefixes(&self) -> BTreeSet<String> {
        self.claimed
            .lock()
            .expect("prefix claim lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

// ============================================================================
// Provisioning Engine Contracts
// ============================================================================

/// Desired state of a managed Kubernetes cluster.
#[derive(Clone, Debug)]
pub struct ClusterSpec {
    /// Logical resource name
    pub name: String,
    /// Whether to create an OIDC identity provider for the cluster
    pub enable_oidc_provider: bool,
}

/// Desired state of a managed database instance.
#[derive(Clone, Debug)]
pub struct DatabaseSpec {
    /// Logical resource name
    pub name: String,
    /// Database engine, e.g. `postgres`
    pub engine: String,
    /// Engine version
    pub engine_version: String,
    /// Instance class
    pub instance_class: String,
    /// Allocated storage in gigabytes
    pub storage_gb: u32,
    /// Database name to create
    pub database: String,
    /// Admin username
    pub username: String,
    /// Admin password
    pub password: String,
    /// Security groups scoping the instance to the cluster's network boundary
    pub vpc_security_group_ids: Vec<String>,
    /// Skip the final snapshot on teardown
    pub skip_final_snapshot: bool,
}

/// Desired state of an object-storage bucket.
#[derive(Clone, Debug)]
pub struct BucketSpec {
    /// Logical resource name; engines may suffix the physical name
    pub name: String,
}

/// Desired state of a chart release.
#[derive(Clone, Debug)]
pub struct ChartSpec {
    /// Release (and logical resource) name
    pub release: String,
    /// Chart name
    pub chart: String,
    /// Chart repository URL
    pub repo: String,
    /// Namespace to install into
    pub namespace: String,
    /// Chart values
    pub values: serde_json::Value,
}

/// Build context of a container image.
#[derive(Clone, Debug)]
pub struct ImageSpec {
    /// Logical resource name
    pub name: String,
    /// Build context directory
    pub context: String,
}

/// Provisions managed Kubernetes clusters.
#[async_trait]
pub trait ClusterEngine: Send + Sync {
    /// Create a cluster, returning its handle once credentials exist.
    async fn create_cluster(&self, spec: &ClusterSpec) -> Result<ClusterHandle, EngineError>;
}

/// Provisions managed database instances.
#[async_trait]
pub trait DatabaseEngine: Send + Sync {
    /// Create a database instance, returning its endpoint handle.
    async fn create_instance(&self, spec: &DatabaseSpec) -> Result<DatabaseHandle, EngineError>;
}

/// Provisions object-storage buckets.
#[async_trait]
pub trait ObjectStoreEngine: Send + Sync {
    /// Create a bucket, returning its handle.
    async fn create_bucket(&self, spec: &BucketSpec) -> Result<BucketHandle, EngineError>;
}

/// Installs chart releases into a cluster.
#[async_trait]
pub trait ChartEngine: Send + Sync {
    /// Install a release, returning its handle once its services exist.
    async fn install(&self, spec: &ChartSpec) -> Result<ReleaseHandle, EngineError>;
}

/// Builds and publishes container images.
#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// Build and push an image, returning its published reference.
    async fn build_and_push(&self, spec: &ImageSpec) -> Result<ImageHandle, EngineError>;
}

/// The full set of engines a base-stack compose needs.
pub struct Engines {
    /// Cluster provisioning engine
    pub cluster: Box<dyn ClusterEngine>,
    /// Database provisioning engine
    pub database: Box<dyn DatabaseEngine>,
    /// Object-storage provisioning engine
    pub object_store: Box<dyn ObjectStoreEngine>,
    /// Chart installation engine
    pub chart: Box<dyn ChartEngine>,
    /// Image build/publish engine
    pub image: Box<dyn ImageEngine>,
}
