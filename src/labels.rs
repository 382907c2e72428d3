// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label constants used across all resource builders.
//!
//! This module defines standard Kubernetes labels and Crosswire-specific label
//! values to ensure consistency across all resources declared by the composers.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "model-server")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application (e.g., "iris-serving")
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of` indicating this resource is part of the ML platform
pub const PART_OF_CROSSWIRE: &str = "crosswire";

/// Value for `app.kubernetes.io/managed-by` for resources declared by the composers
pub const MANAGED_BY_CROSSWIRE: &str = "crosswire";

/// Component value for the MLflow tracking server
pub const COMPONENT_TRACKING_SERVER: &str = "tracking-server";

/// Component value for model-serving workloads
pub const COMPONENT_MODEL_SERVER: &str = "model-server";

/// Component value for the shared ingress router
pub const COMPONENT_INGRESS_ROUTER: &str = "ingress-router";
