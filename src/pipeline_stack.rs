// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pipeline stack composer.
//!
//! Composes the model-serving stack against a deployed base stack:
//!
//! 1. Resolve the upstream stack named by `baseStack` and require its
//!    published outputs (fail fast on anything missing)
//! 2. Build and publish the serving image
//! 3. Declare the serving deployment, configured from upstream outputs and
//!    running as the upstream-published service identity
//! 4. Declare the serving service
//! 5. Register the `/models/iris` route on the upstream router
//!
//! Every consumed output becomes a stack-output edge on the consuming
//! resource, so the declared graph mirrors the cross-stack data flow.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use tracing::{debug, info};

use crate::config::StackConfig;
use crate::constants::{
    CFG_BASE_STACK, CFG_RUN_ID, OUTPUT_ARTIFACT_BUCKET_URI, OUTPUT_KUBECONFIG,
    OUTPUT_MODELS_SERVICE_ACCOUNT, OUTPUT_TRAEFIK_URI, PREFIX_MODEL_SERVING, SERVING_LISTEN_PORT,
    SERVING_NAMESPACE, SERVING_REPLICAS, STACK_PIPELINE,
};
use crate::errors::ComposeError;
use crate::graph::{EdgeKind, ResourceKind};
use crate::labels::COMPONENT_MODEL_SERVER;
use crate::providers::{ImageEngine, ImageHandle, ImageSpec, RouterHandle, ServiceHandle};
use crate::route::{register_route, RouteBinding, RouteSpec};
use crate::stack::{Stack, StackBackend, StackReference};
use crate::workload::{
    build_serving_deployment, build_serving_service, serving_env, tracking_uri,
    ServingWorkloadSpec,
};

/// Settings of a pipeline-stack compose.
#[derive(Clone, Debug)]
pub struct PipelineStackSettings {
    /// Stack name
    pub stack_name: String,
    /// Name of the serving deployment and service
    pub workload_name: String,
    /// Logical name of the built image
    pub image_name: String,
    /// Build context directory of the image
    pub build_context: String,
    /// Logical route name
    pub route_name: String,
    /// Path prefix the workload is exposed under
    pub route_prefix: String,
    /// Namespace the workload runs in
    pub namespace: String,
    /// Port the serving container listens on
    pub listen_port: u16,
    /// Replica count of the serving deployment
    pub replicas: i32,
}

impl Default for PipelineStackSettings {
    fn default() -> Self {
        Self {
            stack_name: STACK_PIPELINE.to_string(),
            workload_name: "iris-serving".to_string(),
            image_name: "iris-image".to_string(),
            build_context: "../".to_string(),
            route_name: "iris".to_string(),
            route_prefix: PREFIX_MODEL_SERVING.to_string(),
            namespace: SERVING_NAMESPACE.to_string(),
            listen_port: SERVING_LISTEN_PORT,
            replicas: SERVING_REPLICAS,
        }
    }
}

/// Result of a successful pipeline-stack compose.
#[derive(Debug)]
pub struct ComposedPipeline {
    /// The composed stack
    pub stack: Stack,
    /// The resolved upstream reference
    pub reference: StackReference,
    /// The built serving image
    pub image: ImageHandle,
    /// Serving deployment manifest
    pub deployment: Deployment,
    /// Serving service manifest
    pub service: Service,
    /// Handle to the serving service, as the route resolver consumed it
    pub service_handle: ServiceHandle,
    /// The `/models/iris` route
    pub route: RouteBinding,
    /// Handle to the upstream router
    pub router: RouterHandle,
}

fn output_edge(output: &str) -> EdgeKind {
    EdgeKind::StackOutput {
        output: output.to_string(),
    }
}

/// Compose the pipeline stack against a deployed base stack.
///
/// # Errors
///
/// Fails fast when required configuration or upstream outputs are missing,
/// and on any engine, route or graph error.
pub async fn compose_pipeline(
    image_engine: &dyn ImageEngine,
    backend: &dyn StackBackend,
    config: &StackConfig,
    settings: PipelineStackSettings,
) -> Result<ComposedPipeline, ComposeError> {
    let mut stack = Stack::new(settings.stack_name.clone());
    info!(stack = %stack.name(), "composing pipeline stack");

    // 1. Resolve the upstream stack and everything this stack consumes.
    let base_name = config.require(CFG_BASE_STACK)?;
    let run_id = config.require(CFG_RUN_ID)?.to_string();
    let reference = StackReference::resolve(backend, base_name)?;
    let ref_node = reference.stack().to_string();
    stack.declare(&ref_node, ResourceKind::StackReference)?;

    // The kubeconfig configures the Kubernetes provider every workload
    // resource deploys through; requiring it up front fails fast even though
    // the value itself is opaque here.
    let _kubeconfig = reference.require_output(OUTPUT_KUBECONFIG)?;
    let router_address = reference.require_output(OUTPUT_TRAEFIK_URI)?;
    let artifact_bucket = reference.require_output(OUTPUT_ARTIFACT_BUCKET_URI)?;
    let service_account = reference.require_output(OUTPUT_MODELS_SERVICE_ACCOUNT)?;
    debug!(stack = %ref_node, "upstream outputs resolved");

    // 2. Serving image.
    stack.declare(&settings.image_name, ResourceKind::ContainerImage)?;
    let image = image_engine
        .build_and_push(&ImageSpec {
            name: settings.image_name.clone(),
            context: settings.build_context.clone(),
        })
        .await?;
    debug!(image = %image.image_ref, "serving image published");

    // 3. Serving deployment, configured from the upstream outputs.
    let workload = ServingWorkloadSpec {
        name: settings.workload_name.clone(),
        namespace: settings.namespace.clone(),
        image: image.image_ref.clone(),
        listen_port: settings.listen_port,
        replicas: settings.replicas,
        service_account: service_account.as_str().to_string(),
        component: COMPONENT_MODEL_SERVER.to_string(),
    };
    let env = serving_env(
        settings.listen_port,
        &tracking_uri(router_address.as_str())?,
        &run_id,
        artifact_bucket.as_str(),
    );
    let deployment = build_serving_deployment(&workload, env);

    stack.declare(&settings.workload_name, ResourceKind::Deployment)?;
    stack.depend(&settings.workload_name, &settings.image_name, EdgeKind::Resource)?;
    for output in [
        OUTPUT_KUBECONFIG,
        OUTPUT_TRAEFIK_URI,
        OUTPUT_ARTIFACT_BUCKET_URI,
        OUTPUT_MODELS_SERVICE_ACCOUNT,
    ] {
        stack.depend(&settings.workload_name, &ref_node, output_edge(output))?;
    }

    // 4. Serving service.
    let service = build_serving_service(&workload);
    let service_node = format!("{}-service", settings.workload_name);
    stack.declare(&service_node, ResourceKind::Service)?;
    stack.depend(&service_node, &settings.workload_name, EdgeKind::Resource)?;
    stack.depend(&service_node, &ref_node, output_edge(OUTPUT_KUBECONFIG))?;
    let service_handle = ServiceHandle {
        resource: service_node,
        name: settings.workload_name.clone(),
        namespace: settings.namespace.clone(),
        port: settings.listen_port,
        external_hostname: None,
    };

    // 5. Route on the upstream router, once the service exists.
    let router = RouterHandle::from_stack_output(
        &ref_node,
        OUTPUT_TRAEFIK_URI,
        router_address.as_str().to_string(),
    );
    let route = register_route(
        &mut stack,
        &router,
        &service_handle,
        &RouteSpec {
            name: settings.route_name.clone(),
            prefix: settings.route_prefix.clone(),
            namespace: settings.namespace.clone(),
        },
    )?;

    stack.graph().validate()?;
    info!(stack = %stack.name(), resources = stack.graph().len(), "pipeline stack composed");

    Ok(ComposedPipeline {
        stack,
        reference,
        image,
        deployment,
        service,
        service_handle,
        route,
        router,
    })
}

#[cfg(test)]
#[path = "pipeline_stack_tests.rs"]
mod pipeline_stack_tests;
