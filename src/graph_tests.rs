// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `graph.rs`

use crate::errors::GraphError;
use crate::graph::{DependencyGraph, EdgeKind, ResourceKind};

fn output_edge(name: &str) -> EdgeKind {
    EdgeKind::StackOutput {
        output: name.to_string(),
    }
}

#[test]
fn test_declare_duplicate_resource_fails() {
    let mut graph = DependencyGraph::new();
    graph.declare("cluster", ResourceKind::Cluster).unwrap();

    let err = graph.declare("cluster", ResourceKind::Cluster).unwrap_err();
    assert_eq!(
        err,
        GraphError::DuplicateResource {
            name: "cluster".to_string()
        }
    );
}

#[test]
fn test_depend_on_unknown_resource_fails() {
    let mut graph = DependencyGraph::new();
    graph.declare("db", ResourceKind::DatabaseInstance).unwrap();

    let err = graph
        .depend("db", "cluster", EdgeKind::Resource)
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::UnknownResource {
            name: "cluster".to_string(),
            referenced_by: "db".to_string()
        }
    );
}

#[test]
fn test_duplicate_edges_collapse() {
    let mut graph = DependencyGraph::new();
    graph.declare("cluster", ResourceKind::Cluster).unwrap();
    graph.declare("db", ResourceKind::DatabaseInstance).unwrap();

    graph.depend("db", "cluster", EdgeKind::Resource).unwrap();
    graph.depend("db", "cluster", EdgeKind::Resource).unwrap();

    assert_eq!(graph.edges().len(), 1);
}

#[test]
fn test_toposort_orders_producers_first() {
    let mut graph = DependencyGraph::new();
    graph.declare("route", ResourceKind::IngressRoute).unwrap();
    graph.declare("service", ResourceKind::Service).unwrap();
    graph.declare("router", ResourceKind::ChartRelease).unwrap();
    graph.depend("route", "service", EdgeKind::Resource).unwrap();
    graph.depend("route", "router", EdgeKind::Resource).unwrap();

    let order = graph.toposort().unwrap();
    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

    assert!(pos("service") < pos("route"));
    assert!(pos("router") < pos("route"));
}

#[test]
fn test_toposort_is_deterministic_for_independent_nodes() {
    let mut graph = DependencyGraph::new();
    graph.declare("mlflow-bucket", ResourceKind::Bucket).unwrap();
    graph.declare("dvc-bucket", ResourceKind::Bucket).unwrap();
    graph
        .declare("artifact-bucket", ResourceKind::Bucket)
        .unwrap();

    // Independent resources sort by name.
    assert_eq!(
        graph.toposort().unwrap(),
        vec!["artifact-bucket", "dvc-bucket", "mlflow-bucket"]
    );
}

#[test]
fn test_cycle_is_detected() {
    let mut graph = DependencyGraph::new();
    graph.declare("a", ResourceKind::Service).unwrap();
    graph.declare("b", ResourceKind::Service).unwrap();
    graph.depend("a", "b", EdgeKind::Resource).unwrap();
    graph.depend("b", "a", EdgeKind::Resource).unwrap();

    let err = graph.toposort().unwrap_err();
    assert!(matches!(err, GraphError::DependencyCycle { .. }));
    assert!(graph.validate().is_err());
}

#[test]
fn test_ordered_before_follows_transitive_edges() {
    let mut graph = DependencyGraph::new();
    graph.declare("cluster", ResourceKind::Cluster).unwrap();
    graph.declare("release", ResourceKind::ChartRelease).unwrap();
    graph.declare("route", ResourceKind::IngressRoute).unwrap();
    graph
        .depend("release", "cluster", EdgeKind::Resource)
        .unwrap();
    graph.depend("route", "release", EdgeKind::Resource).unwrap();

    assert!(graph.ordered_before("cluster", "route"));
    assert!(!graph.ordered_before("route", "cluster"));
    // No path between a node and itself.
    assert!(!graph.ordered_before("route", "route"));
}

#[test]
fn test_unrelated_nodes_have_no_ordering() {
    let mut graph = DependencyGraph::new();
    graph.declare("dvc-bucket", ResourceKind::Bucket).unwrap();
    graph
        .declare("artifact-bucket", ResourceKind::Bucket)
        .unwrap();

    assert!(!graph.ordered_before("dvc-bucket", "artifact-bucket"));
    assert!(!graph.ordered_before("artifact-bucket", "dvc-bucket"));
}

#[test]
fn test_stack_output_edges_carry_output_name() {
    let mut graph = DependencyGraph::new();
    graph
        .declare("base-stack", ResourceKind::StackReference)
        .unwrap();
    graph
        .declare("serving", ResourceKind::Deployment)
        .unwrap();
    graph
        .depend("serving", "base-stack", output_edge("artifactBucketURI"))
        .unwrap();

    let edge = &graph.edges()[0];
    assert_eq!(
        edge.kind,
        EdgeKind::StackOutput {
            output: "artifactBucketURI".to_string()
        }
    );
    assert!(graph.ordered_before("base-stack", "serving"));
}
