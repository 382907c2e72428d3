// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for stack composition.
//!
//! This module provides specialized error types for:
//! - Dependency graph construction (duplicate nodes, unknown nodes, cycles)
//! - Cross-stack output resolution (unknown stacks, missing outputs)
//! - Deploy-time configuration (missing or empty required keys)
//! - Identity bindings (absent federated-identity support, malformed provider ARNs)
//! - Route bindings (invalid or conflicting path prefixes)
//!
//! Missing-precondition errors are fatal: composition stops at the first one
//! and the error is surfaced verbatim to the operator. Transient provider
//! errors are retried inside the provisioning engines and never reach these
//! types.

use thiserror::Error;

/// Errors raised while declaring the dependency graph of a stack.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A resource with this logical name was already declared in the stack.
    ///
    /// Logical names are unique per stack; composers must not declare the same
    /// name twice.
    #[error("Resource '{name}' is already declared in this stack")]
    DuplicateResource {
        /// The logical name that was declared twice
        name: String,
    },

    /// An edge referenced a resource that was never declared.
    #[error("Resource '{name}' is not declared in this stack (referenced by '{referenced_by}')")]
    UnknownResource {
        /// The logical name that could not be found
        name: String,
        /// The resource that declared the dangling edge
        referenced_by: String,
    },

    /// The declared dependency edges form a cycle.
    ///
    /// A resource may only reference outputs of resources it transitively
    /// depends on, so the graph must stay acyclic.
    #[error("Dependency cycle detected involving resource '{name}'")]
    DependencyCycle {
        /// A resource on the detected cycle
        name: String,
    },
}

/// Errors raised while resolving stacks and their published outputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    /// The named upstream stack does not exist in the backend.
    #[error("Stack '{stack}' was not found in the stack backend")]
    UnknownStack {
        /// The stack name that failed to resolve
        stack: String,
    },

    /// The upstream stack exists but has not published the named output.
    ///
    /// Raised at downstream-compose time, before any resource of the consumer
    /// is materialized. There is no silent default.
    #[error("Stack '{stack}' has no output named '{output}'")]
    MissingOutput {
        /// The resolved upstream stack
        stack: String,
        /// The output name that is absent
        output: String,
    },

    /// Outputs were published twice for the same stack.
    ///
    /// Outputs freeze at publication; a second publication indicates a
    /// composer bug.
    #[error("Outputs of stack '{stack}' are already published")]
    OutputsAlreadyPublished {
        /// The stack whose outputs were already frozen
        stack: String,
    },

    /// The stack backend could not be read.
    #[error("Stack backend unavailable: {reason}")]
    Backend {
        /// Why the backend failed (I/O error, malformed state file, ...)
        reason: String,
    },
}

/// Errors raised while reading deploy-time stack configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required configuration key is not set.
    #[error("Missing required configuration value '{key}'")]
    MissingKey {
        /// The key that must be provided at deploy time
        key: String,
    },

    /// A required configuration key is set to an empty string.
    ///
    /// An empty `runID` would otherwise flow into the serving environment and
    /// surface as a confusing provider rejection much later.
    #[error("Configuration value '{key}' must not be empty")]
    EmptyValue {
        /// The key whose value was empty
        key: String,
    },

    /// A configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    InvalidFile {
        /// Path of the configuration file
        path: String,
        /// Why loading failed
        reason: String,
    },
}

/// Errors raised by the identity binding resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The cluster was created without federated-identity (OIDC) support.
    ///
    /// This is a hard precondition of every identity binding, not a retryable
    /// condition: the cluster must be recreated with an identity provider.
    #[error("Cluster '{cluster}' has no OIDC identity provider; create it with federated-identity support enabled")]
    FederatedIdentityUnsupported {
        /// The cluster missing an identity provider
        cluster: String,
    },

    /// The identity provider ARN does not carry an account id.
    ///
    /// Role ARNs are derived from the account embedded in the provider ARN
    /// (`arn:aws:iam::<account>:oidc-provider/...`).
    #[error("Malformed identity provider ARN '{arn}'")]
    MalformedProviderArn {
        /// The ARN that could not be parsed
        arn: String,
    },
}

/// Errors raised by the route binding resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The route was registered with an empty path prefix.
    #[error("Route '{route}' has an empty path prefix")]
    EmptyPrefix {
        /// The route being registered
        route: String,
    },

    /// The path prefix is not absolute.
    ///
    /// Traefik matches `` PathPrefix(`/...`) `` rules; a relative prefix
    /// would never match.
    #[error("Route '{route}' has invalid path prefix '{prefix}' (must start with '/')")]
    InvalidPrefix {
        /// The route being registered
        route: String,
        /// The rejected prefix
        prefix: String,
    },

    /// The prefix is already claimed on this router instance.
    ///
    /// Two active routes must not claim the same prefix; the first
    /// registration wins and later ones are rejected.
    #[error("Path prefix '{prefix}' on router '{router}' is already claimed by route '{existing}'")]
    PrefixConflict {
        /// The contested prefix
        prefix: String,
        /// The router the prefix was claimed on
        router: String,
        /// The route that claimed the prefix first
        existing: String,
    },

    /// The router's published address could not be turned into a URL.
    #[error("Router address '{address}' is not a valid host")]
    InvalidRouterAddress {
        /// The address taken from the router handle or stack output
        address: String,
    },
}

/// Error returned by provisioning engines.
///
/// Engines are external collaborators; whatever retries or backoff they apply
/// happen before this error is returned. From the composers' point of view an
/// engine error is terminal for the deploy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to provision '{resource}': {reason}")]
pub struct EngineError {
    /// Logical name of the resource that failed
    pub resource: String,
    /// Engine-supplied failure reason
    pub reason: String,
}

impl EngineError {
    /// Build an engine error for a named resource.
    pub fn new(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level composition error.
///
/// Any step failure aborts the stack compose; no partial outputs are
/// published.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// Dependency graph construction failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Stack or output resolution failed
    #[error(transparent)]
    Stack(#[from] StackError),

    /// Deploy-time configuration is incomplete
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Identity binding could not be derived
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Route binding could not be registered
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A provisioning engine reported a terminal failure
    #[error(transparent)]
    Engine(#[from] EngineError),
}
