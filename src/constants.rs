// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Crosswire composers.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Stack Names
// ============================================================================

/// Default name of the base (infrastructure) stack
pub const STACK_BASE: &str = "base";

/// Default name of the pipeline (model serving) stack
pub const STACK_PIPELINE: &str = "pipeline";

// ============================================================================
// Published Output Names (base stack)
// ============================================================================

/// Cluster credentials, serialized kubeconfig
pub const OUTPUT_KUBECONFIG: &str = "kubeconfig";

/// URI of the DVC (data-version) bucket, `s3://<bucket>`
pub const OUTPUT_DVC_BUCKET_URI: &str = "dvcBucketURI";

/// URI of the generic artifact bucket, `s3://<bucket>`
pub const OUTPUT_ARTIFACT_BUCKET_URI: &str = "artifactBucketURI";

/// Name of the read-only service account for model-serving workloads
pub const OUTPUT_MODELS_SERVICE_ACCOUNT: &str = "modelsServiceAccountName";

/// Externally reachable hostname of the Traefik router
pub const OUTPUT_TRAEFIK_URI: &str = "traefikURI";

// ============================================================================
// Stack Configuration Keys (pipeline stack)
// ============================================================================

/// Config key naming the upstream base stack
pub const CFG_BASE_STACK: &str = "baseStack";

/// Config key carrying the MLflow run identifier to serve
pub const CFG_RUN_ID: &str = "runID";

// ============================================================================
// Route Prefixes
// ============================================================================

/// Path prefix under which the MLflow tracking server is exposed
pub const PREFIX_TRACKING: &str = "/mlflow";

/// Path prefix under which the iris serving workload is exposed
pub const PREFIX_MODEL_SERVING: &str = "/models/iris";

// ============================================================================
// Generated Environment (serving workload)
// ============================================================================

/// Port the serving container listens on
pub const ENV_LISTEN_PORT: &str = "LISTEN_PORT";

/// Router-relative MLflow tracking URL
pub const ENV_TRACKING_URI: &str = "MLFLOW_TRACKING_URI";

/// MLflow run identifier of the model to serve
pub const ENV_RUN_ID: &str = "MLFLOW_RUN_ID";

/// URI of the artifact bucket the feature pipeline is loaded from
pub const ENV_ARTIFACT_BUCKET: &str = "ARTIFACT_BUCKET";

// ============================================================================
// Kubernetes Names
// ============================================================================

/// Namespace the MLflow tracking server is installed into
pub const TRACKING_NAMESPACE: &str = "mlflow";

/// Namespace model-serving workloads run in
pub const SERVING_NAMESPACE: &str = "default";

/// Annotation binding a service account to an IAM role (IRSA)
pub const ROLE_ARN_ANNOTATION: &str = "eks.amazonaws.com/role-arn";

/// API group of the Traefik custom resources
pub const TRAEFIK_API_GROUP: &str = "traefik.containo.us";

// ============================================================================
// Chart Releases
// ============================================================================

/// Release and chart name of the ingress router
pub const CHART_TRAEFIK: &str = "traefik";

/// Helm repository serving the Traefik chart
pub const CHART_TRAEFIK_REPO: &str = "https://containous.github.io/traefik-helm-chart";

/// Release and chart name of the MLflow tracking server
pub const CHART_MLFLOW: &str = "mlflow";

/// Helm repository serving the MLflow chart
pub const CHART_MLFLOW_REPO: &str = "https://larribas.me/helm-charts";

// ============================================================================
// Database Defaults
// ============================================================================

/// Database engine for the MLflow backend store
pub const DB_ENGINE: &str = "postgres";

/// Engine version the chart values are written against
pub const DB_ENGINE_VERSION: &str = "11.11";

/// Instance class of the backend store
pub const DB_INSTANCE_CLASS: &str = "db.t3.micro";

/// Allocated storage, in gigabytes
pub const DB_STORAGE_GB: u32 = 5;

/// Database name for the MLflow backend store
pub const DB_NAME: &str = "mlflow";

/// Admin username of the backend store
pub const DB_USERNAME: &str = "postgres";

/// Length of the generated database password (alphanumeric, no specials)
pub const DB_PASSWORD_LEN: usize = 16;

/// Default Postgres port, used by preview engines
pub const DB_PORT: u16 = 5432;

// ============================================================================
// Workload Defaults
// ============================================================================

/// Port the serving container listens on by default
pub const SERVING_LISTEN_PORT: u16 = 80;

/// Default replica count for the serving deployment
pub const SERVING_REPLICAS: i32 = 1;
