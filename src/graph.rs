// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed dependency graph for declared resources.
//!
//! Resources are nodes; declared dependencies are directed edges from a
//! consumer to the producer it waits on. Two edge kinds exist:
//!
//! - [`EdgeKind::Resource`] - the consumer reads a handle produced by another
//!   resource of the same stack
//! - [`EdgeKind::StackOutput`] - the consumer reads a named output published
//!   by an upstream stack, via a stack-reference node
//!
//! The execution engine that topologically schedules creation is an external
//! collaborator. This module's job is to hold correct edges and validate them:
//! the graph must stay acyclic, and [`DependencyGraph::toposort`] yields a
//! producer-first order used by previews and by tests asserting ordering
//! invariants (a route node must never sort before its target service node).
//!
//! Iteration order is deterministic (`BTreeMap`/`BTreeSet` keyed by logical
//! name) so previews and tests are stable across runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::GraphError;

/// Kind of a declared resource.
///
/// Kinds are informational: they drive preview rendering and labels, not
/// scheduling. Scheduling follows edges only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Managed Kubernetes cluster
    Cluster,
    /// Managed database instance
    DatabaseInstance,
    /// Object-storage bucket
    Bucket,
    /// Installed chart release
    ChartRelease,
    /// Kubernetes namespace
    Namespace,
    /// Cloud IAM role (permission + trust policy pair)
    IamRole,
    /// Kubernetes service account bound to an IAM role
    ServiceAccount,
    /// Traefik middleware
    Middleware,
    /// Traefik ingress route
    IngressRoute,
    /// Built and pushed container image
    ContainerImage,
    /// Kubernetes deployment
    Deployment,
    /// Kubernetes service
    Service,
    /// Reference to an upstream stack's published outputs
    StackReference,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cluster => "cluster",
            Self::DatabaseInstance => "database-instance",
            Self::Bucket => "bucket",
            Self::ChartRelease => "chart-release",
            Self::Namespace => "namespace",
            Self::IamRole => "iam-role",
            Self::ServiceAccount => "service-account",
            Self::Middleware => "middleware",
            Self::IngressRoute => "ingress-route",
            Self::ContainerImage => "container-image",
            Self::Deployment => "deployment",
            Self::Service => "service",
            Self::StackReference => "stack-reference",
        };
        f.write_str(s)
    }
}

/// Kind of a dependency edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// Consumer reads a handle of a resource in the same stack
    Resource,
    /// Consumer reads a named output published by an upstream stack
    StackOutput {
        /// Name of the consumed output
        output: String,
    },
}

/// A declared dependency: `consumer` waits on `producer`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The resource that must wait
    pub consumer: String,
    /// The resource that must exist first
    pub producer: String,
    /// Why the consumer waits
    pub kind: EdgeKind,
}

/// Dependency graph of one stack.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, ResourceKind>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateResource`] if the logical name is taken.
    pub fn declare(&mut self, name: &str, kind: ResourceKind) -> Result<(), GraphError> {
        if self.nodes.contains_key(name) {
            return Err(GraphError::DuplicateResource {
                name: name.to_string(),
            });
        }
        self.nodes.insert(name.to_string(), kind);
        Ok(())
    }

    /// Declare that `consumer` depends on `producer`.
    ///
    /// Duplicate edges are collapsed; declaring the same dependency twice is
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownResource`] if either endpoint was never
    /// declared.
    pub fn depend(
        &mut self,
        consumer: &str,
        producer: &str,
        kind: EdgeKind,
    ) -> Result<(), GraphError> {
        for name in [consumer, producer] {
            if !self.nodes.contains_key(name) {
                return Err(GraphError::UnknownResource {
                    name: name.to_string(),
                    referenced_by: consumer.to_string(),
                });
            }
        }
        let edge = DependencyEdge {
            consumer: consumer.to_string(),
            producer: producer.to_string(),
            kind,
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    /// Whether a resource with this logical name is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Kind of a declared resource, if present.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<ResourceKind> {
        self.nodes.get(name).copied()
    }

    /// Number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All declared edges, in declaration order.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Direct producers a resource waits on.
    #[must_use]
    pub fn producers_of(&self, consumer: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.consumer == consumer)
            .map(|e| e.producer.as_str())
            .collect()
    }

    /// Whether `producer` is strictly ordered before `consumer`, i.e. whether
    /// the consumer transitively depends on the producer.
    ///
    /// Resources with no path between them have no relative ordering
    /// guarantee and this returns `false` for both directions.
    #[must_use]
    pub fn ordered_before(&self, producer: &str, consumer: &str) -> bool {
        if producer == consumer {
            return false;
        }
        // Walk the producer sets backwards from the consumer.
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut frontier: Vec<&str> = vec![consumer];
        while let Some(current) = frontier.pop() {
            for next in self.producers_of(current) {
                if next == producer {
                    return true;
                }
                if seen.insert(next) {
                    frontier.push(next);
                }
            }
        }
        false
    }

    /// Producer-first topological order of all declared resources.
    ///
    /// Independent resources sort by logical name so the order is stable.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DependencyCycle`] if the declared edges form a
    /// cycle.
    pub fn toposort(&self) -> Result<Vec<String>, GraphError> {
        // Kahn's algorithm over name-ordered ready sets.
        let mut waiting_on: BTreeMap<&str, BTreeSet<&str>> = self
            .nodes
            .keys()
            .map(|name| (name.as_str(), self.producers_of(name)))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while !waiting_on.is_empty() {
            let ready: Vec<&str> = waiting_on
                .iter()
                .filter(|(_, producers)| producers.is_empty())
                .map(|(name, _)| *name)
                .collect();
            if ready.is_empty() {
                // Everything left waits on something else: a cycle.
                let name = waiting_on
                    .keys()
                    .next()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                return Err(GraphError::DependencyCycle { name });
            }
            for name in ready {
                waiting_on.remove(name);
                for producers in waiting_on.values_mut() {
                    producers.remove(name);
                }
                order.push(name.to_string());
            }
        }
        Ok(order)
    }

    /// Validate the graph without materializing an order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DependencyCycle`] if the declared edges form a
    /// cycle.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.toposort().map(|_| ())
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod graph_tests;
