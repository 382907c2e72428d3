// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Crosswire - Cross-stack ML platform composition for Kubernetes
//!
//! Crosswire declares a two-stack machine-learning platform as dependency-ordered
//! resource programs: a *base* stack (Kubernetes cluster, Postgres, S3 buckets,
//! Traefik ingress, MLflow tracking server) and a *pipeline* stack (model-serving
//! workload) that consumes the base stack's published outputs.
//!
//! ## Overview
//!
//! This library provides the core functionality for composing both stacks:
//!
//! - A typed dependency graph with resource and stack-output edges
//! - Stack outputs frozen at publication, resolved downstream via [`stack::StackReference`]
//! - Scoped cloud-identity bindings (IAM policy + federated trust + `ServiceAccount`)
//! - Traefik route bindings with explicit service-before-route ordering
//!
//! ## Modules
//!
//! - [`graph`] - Dependency graph: nodes, typed edges, topological validation
//! - [`stack`] - Stack programs, published outputs, cross-stack references
//! - [`config`] - Deploy-time stack configuration
//! - [`providers`] - Provider handles and async provisioning-engine traits
//! - [`identity`] - Identity binding resolver (scoped storage access)
//! - [`route`] - Route binding resolver (Traefik `IngressRoute`/`Middleware`)
//! - [`workload`] - Kubernetes resource builders for the serving workload
//! - [`base_stack`] - Base stack composer
//! - [`pipeline_stack`] - Pipeline stack composer
//! - [`plan`] - Deterministic preview engines
//!
//! ## Example
//!
//! ```rust,no_run
//! use crosswire::base_stack::{compose_base, BaseStackSettings};
//! use crosswire::plan::PlanEngines;
//! use crosswire::stack::InMemoryBackend;
//!
//! # async fn example() -> Result<(), crosswire::errors::ComposeError> {
//! let engines = PlanEngines::engines();
//! let base = compose_base(&engines, BaseStackSettings::default()).await?;
//!
//! let mut backend = InMemoryBackend::new();
//! backend.register(base.stack.name(), base.outputs.clone());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Typed edges** - resource → resource and stack-output → resource
//! - **Fail-fast references** - missing upstream outputs abort composition
//! - **Least privilege** - access levels grant exactly their capability set
//! - **Prefix conflicts are errors** - duplicate route prefixes are rejected
//!
//! For more information, see the [documentation](https://firestoned.github.io/crosswire/).

pub mod base_stack;
pub mod config;
pub mod constants;
pub mod errors;
pub mod graph;
pub mod identity;
pub mod labels;
pub mod pipeline_stack;
pub mod plan;
pub mod providers;
pub mod route;
pub mod stack;
pub mod state;
pub mod workload;
