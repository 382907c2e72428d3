// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Identity binding resolver.
//!
//! Derives a scoped cloud identity for a workload: an IAM permission policy
//! granting the minimum capability set for an access level, a federated trust
//! policy scoping role assumption to one service account, and the annotated
//! Kubernetes `ServiceAccount` that workloads reference as
//! `serviceAccountName`.
//!
//! A binding is created once per (namespace, access level) pair a stack
//! needs. Two calls with equal inputs derive equal policies but distinct
//! named resources; the resolver does not deduplicate.
//!
//! # Preconditions
//!
//! The cluster must carry an OIDC identity provider
//! ([`crate::providers::OidcProvider`]). Its absence is a hard error, not a
//! retryable condition: a cluster created without federated-identity support
//! cannot issue the trust relationship.

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::ROLE_ARN_ANNOTATION;
use crate::errors::{BindingError, ComposeError};
use crate::graph::{EdgeKind, ResourceKind};
use crate::labels::{K8S_MANAGED_BY, K8S_NAME, K8S_PART_OF, MANAGED_BY_CROSSWIRE, PART_OF_CROSSWIRE};
use crate::providers::{ClusterHandle, OidcProvider};
use crate::stack::Stack;

/// IAM policy document version understood by the cloud provider.
const POLICY_VERSION: &str = "2012-10-17";

/// Bucket-level and object-level resource patterns the storage policies
/// apply to.
const STORAGE_RESOURCES: [&str; 2] = ["arn:aws:s3:::*", "arn:aws:s3:::*/*"];

/// Actions granted to read-only bindings.
const READ_ACTIONS: [&str; 2] = ["s3:GetObject", "s3:ListBucket"];

/// Actions additionally granted to read-write bindings.
const WRITE_ACTIONS: [&str; 2] = ["s3:PutObject", "s3:DeleteObject"];

/// Access level of an identity binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    /// Get and list on the designated storage resources
    ReadOnly,
    /// Read access plus put and delete
    ReadWrite,
}

impl AccessLevel {
    /// The exact set of actions this level grants, sorted.
    #[must_use]
    pub fn actions(self) -> Vec<&'static str> {
        let mut actions: Vec<&'static str> = match self {
            Self::ReadOnly => READ_ACTIONS.to_vec(),
            Self::ReadWrite => READ_ACTIONS.iter().chain(&WRITE_ACTIONS).copied().collect(),
        };
        actions.sort_unstable();
        actions
    }
}

/// One statement of an IAM policy document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    /// Statement effect, `Allow` here
    #[serde(rename = "Effect")]
    pub effect: String,
    /// Granted actions
    #[serde(rename = "Action")]
    pub action: Vec<String>,
    /// Resources the actions apply to
    #[serde(rename = "Resource")]
    pub resource: Vec<String>,
}

/// An IAM permission policy document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Policy language version
    #[serde(rename = "Version")]
    pub version: String,
    /// Policy statements
    #[serde(rename = "Statement")]
    pub statement: Vec<PolicyStatement>,
}

/// Build the permission policy granting exactly the capability set of an
/// access level.
#[must_use]
pub fn storage_access_policy(access: AccessLevel) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        statement: vec![PolicyStatement {
            effect: "Allow".to_string(),
            action: access.actions().iter().map(ToString::to_string).collect(),
            resource: STORAGE_RESOURCES.iter().map(ToString::to_string).collect(),
        }],
    }
}

/// Build the trust policy scoping role assumption to one service account.
///
/// The federated principal is the cluster's OIDC provider; the condition pins
/// the token subject to `system:serviceaccount:<namespace>:<name>`.
#[must_use]
pub fn federated_trust_policy(oidc: &OidcProvider, namespace: &str, service_account: &str) -> Value {
    let subject_key = format!("{}:sub", oidc.issuer_host());
    let subject = format!("system:serviceaccount:{namespace}:{service_account}");
    json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Federated": oidc.arn },
            "Action": "sts:AssumeRoleWithWebIdentity",
            "Condition": { "StringEquals": { (subject_key): subject } }
        }]
    })
}

/// Extract the account id embedded in an OIDC provider ARN.
///
/// # Errors
///
/// Returns [`BindingError::MalformedProviderArn`] if the ARN does not look
/// like `arn:aws:iam::<account>:oidc-provider/<host>`.
pub fn account_id_from_provider_arn(arn: &str) -> Result<&str, BindingError> {
    let malformed = || BindingError::MalformedProviderArn {
        arn: arn.to_string(),
    };

    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() != 6 || parts[0] != "arn" || parts[2] != "iam" {
        return Err(malformed());
    }
    let account = parts[4];
    if account.is_empty() || !account.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    if !parts[5].starts_with("oidc-provider/") {
        return Err(malformed());
    }
    Ok(account)
}

/// Desired state of an identity binding.
#[derive(Clone, Debug)]
pub struct IdentityBindingSpec {
    /// Logical name; also the service account name workloads reference
    pub name: String,
    /// Namespace the bound service account lives in
    pub namespace: String,
    /// Capability set to grant
    pub access: AccessLevel,
    /// Graph node of the namespace, when the namespace is managed by the
    /// same stack (`None` for pre-existing namespaces such as `default`)
    pub namespace_node: Option<String>,
}

/// A derived identity binding.
///
/// Immutable after creation; destroyed with its owning stack.
#[derive(Clone, Debug)]
pub struct IdentityBinding {
    name: String,
    namespace: String,
    access: AccessLevel,
    role_name: String,
    role_arn: String,
    permission_policy: PolicyDocument,
    trust_policy: Value,
    service_account: ServiceAccount,
}

impl IdentityBinding {
    /// Name of the bound service account, for injection into workload specs.
    #[must_use]
    pub fn service_account_name(&self) -> &str {
        &self.name
    }

    /// Namespace the binding is scoped to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Capability set the binding grants.
    #[must_use]
    pub fn access(&self) -> AccessLevel {
        self.access
    }

    /// Name of the derived IAM role.
    #[must_use]
    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    /// ARN of the derived IAM role.
    #[must_use]
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    /// The permission policy attached to the role.
    #[must_use]
    pub fn permission_policy(&self) -> &PolicyDocument {
        &self.permission_policy
    }

    /// The federated trust policy of the role.
    #[must_use]
    pub fn trust_policy(&self) -> &Value {
        &self.trust_policy
    }

    /// The annotated `ServiceAccount` manifest.
    #[must_use]
    pub fn service_account(&self) -> &ServiceAccount {
        &self.service_account
    }
}

fn binding_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (K8S_NAME.to_string(), name.to_string()),
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_CROSSWIRE.to_string()),
        (K8S_PART_OF.to_string(), PART_OF_CROSSWIRE.to_string()),
    ])
}

fn build_service_account(name: &str, namespace: &str, role_arn: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(binding_labels(name)),
            annotations: Some(BTreeMap::from([(
                ROLE_ARN_ANNOTATION.to_string(),
                role_arn.to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Derive a scoped identity binding and declare its resources in the stack.
///
/// Declares an IAM role node (depending on the cluster, whose identity
/// provider the trust policy references) and a service account node
/// (depending on the role and, for managed namespaces, on the namespace).
///
/// # Errors
///
/// Returns [`BindingError::FederatedIdentityUnsupported`] when the cluster
/// has no identity provider, [`BindingError::MalformedProviderArn`] when the
/// provider ARN carries no account id, or a graph error on duplicate
/// declarations.
pub fn bind_service_identity(
    stack: &mut Stack,
    cluster: &ClusterHandle,
    spec: &IdentityBindingSpec,
) -> Result<IdentityBinding, ComposeError> {
    let oidc = cluster
        .oidc
        .as_ref()
        .ok_or_else(|| BindingError::FederatedIdentityUnsupported {
            cluster: cluster.name.clone(),
        })?;

    let account = account_id_from_provider_arn(&oidc.arn)?;
    let role_name = format!("{}-role", spec.name);
    let role_arn = format!("arn:aws:iam::{account}:role/{role_name}");

    debug!(
        name = %spec.name,
        namespace = %spec.namespace,
        access = ?spec.access,
        %role_arn,
        "deriving identity binding"
    );

    let permission_policy = storage_access_policy(spec.access);
    let trust_policy = federated_trust_policy(oidc, &spec.namespace, &spec.name);
    let service_account = build_service_account(&spec.name, &spec.namespace, &role_arn);

    stack.declare(&role_name, ResourceKind::IamRole)?;
    stack.depend(&role_name, &cluster.resource, EdgeKind::Resource)?;
    stack.declare(&spec.name, ResourceKind::ServiceAccount)?;
    stack.depend(&spec.name, &role_name, EdgeKind::Resource)?;
    if let Some(namespace_node) = &spec.namespace_node {
        stack.depend(&spec.name, namespace_node, EdgeKind::Resource)?;
    }

    Ok(IdentityBinding {
        name: spec.name.clone(),
        namespace: spec.namespace.clone(),
        access: spec.access,
        role_name,
        role_arn,
        permission_policy,
        trust_policy,
        service_account,
    })
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod identity_tests;
