// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route binding resolver.
//!
//! Registers a routing rule on the shared Traefik router: incoming requests
//! matching a path prefix are forwarded to a target network service inside
//! the cluster. Each registration emits a strip-prefix [`Middleware`] and an
//! [`IngressRoute`] whose single rule matches `` PathPrefix(`<prefix>`) ``.
//!
//! Ordering is enforced through declared edges, never eagerly: the route node
//! depends on the target service's producer (the router needs a resolvable
//! backend address) and on the router itself (the rule is meaningless before
//! the router's custom resources are installed).
//!
//! Prefix matching is exact-prefix; no wildcard or regex semantics. A prefix
//! may be claimed once per router handle - a second claim of the same prefix
//! is rejected as a conflict.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ComposeError, RouteError};
use crate::graph::{EdgeKind, ResourceKind};
use crate::providers::{RouterHandle, RouterOrigin, ServiceHandle};
use crate::stack::Stack;

/// Traefik entry point the routes attach to.
const ENTRYPOINT_WEB: &str = "web";

/// Strip-prefix behavior of a [`Middleware`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct StripPrefixConfig {
    /// Prefixes removed from the request path before forwarding
    pub prefixes: Vec<String>,
}

/// Traefik `Middleware` custom resource.
///
/// Only the strip-prefix behavior is modeled; the backing services expect
/// router-relative paths stripped of their public prefix.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "traefik.containo.us",
    version = "v1alpha1",
    kind = "Middleware",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareSpec {
    /// Strip matched prefixes from the forwarded request path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_prefix: Option<StripPrefixConfig>,
}

/// Reference from a route rule to a middleware.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct MiddlewareRef {
    /// Middleware name
    pub name: String,
    /// Namespace of the middleware, when it differs from the route's
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Backend service of a route rule.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct RouteBackend {
    /// Service name
    pub name: String,
    /// Service port forwarded to
    pub port: u16,
    /// Namespace of the service, when it differs from the route's
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// One matching rule of an [`IngressRoute`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct RouteRule {
    /// Rule kind, always `Rule`
    pub kind: String,
    /// Traefik matcher expression, `` PathPrefix(`/...`) ``
    #[serde(rename = "match")]
    pub match_expr: String,
    /// Middlewares applied to matched requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middlewares: Option<Vec<MiddlewareRef>>,
    /// Backend services matched requests are forwarded to
    pub services: Vec<RouteBackend>,
}

/// Traefik `IngressRoute` custom resource.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "traefik.containo.us",
    version = "v1alpha1",
    kind = "IngressRoute",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteSpec {
    /// Entry points the route listens on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_points: Option<Vec<String>>,
    /// Matching rules
    pub routes: Vec<RouteRule>,
}

/// Desired state of a route registration.
#[derive(Clone, Debug)]
pub struct RouteSpec {
    /// Logical route name; resource nodes derive from it
    pub name: String,
    /// Non-empty URL path prefix, starting with `/`
    pub prefix: String,
    /// Namespace the route objects are created in
    pub namespace: String,
}

/// A registered route binding.
#[derive(Clone, Debug)]
pub struct RouteBinding {
    name: String,
    prefix: String,
    node: String,
    middleware_node: String,
    middleware: Middleware,
    ingress_route: IngressRoute,
}

impl RouteBinding {
    /// Logical route name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Claimed path prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Graph node of the ingress route.
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Graph node of the strip-prefix middleware.
    #[must_use]
    pub fn middleware_node(&self) -> &str {
        &self.middleware_node
    }

    /// The strip-prefix middleware manifest.
    #[must_use]
    pub fn middleware(&self) -> &Middleware {
        &self.middleware
    }

    /// The ingress route manifest.
    #[must_use]
    pub fn ingress_route(&self) -> &IngressRoute {
        &self.ingress_route
    }
}

fn validate_prefix(spec: &RouteSpec) -> Result<(), RouteError> {
    if spec.prefix.is_empty() {
        return Err(RouteError::EmptyPrefix {
            route: spec.name.clone(),
        });
    }
    if !spec.prefix.starts_with('/') {
        return Err(RouteError::InvalidPrefix {
            route: spec.name.clone(),
            prefix: spec.prefix.clone(),
        });
    }
    Ok(())
}

fn build_middleware(name: &str, namespace: &str, prefix: &str) -> Middleware {
    let mut middleware = Middleware::new(
        name,
        MiddlewareSpec {
            strip_prefix: Some(StripPrefixConfig {
                prefixes: vec![prefix.to_string()],
            }),
        },
    );
    middleware.metadata.namespace = Some(namespace.to_string());
    middleware
}

fn build_ingress_route(
    name: &str,
    spec: &RouteSpec,
    service: &ServiceHandle,
    middleware: &str,
) -> IngressRoute {
    let mut route = IngressRoute::new(
        name,
        IngressRouteSpec {
            entry_points: Some(vec![ENTRYPOINT_WEB.to_string()]),
            routes: vec![RouteRule {
                kind: "Rule".to_string(),
                match_expr: format!("PathPrefix(`{}`)", spec.prefix),
                middlewares: Some(vec![MiddlewareRef {
                    name: middleware.to_string(),
                    namespace: Some(spec.namespace.clone()),
                }]),
                services: vec![RouteBackend {
                    name: service.name.clone(),
                    port: service.port,
                    namespace: Some(service.namespace.clone()),
                }],
            }],
        },
    );
    route.metadata.namespace = Some(spec.namespace.clone());
    route
}

fn router_edge(router: &RouterHandle) -> EdgeKind {
    match router.origin() {
        RouterOrigin::Resource => EdgeKind::Resource,
        RouterOrigin::StackOutput { output } => EdgeKind::StackOutput {
            output: output.clone(),
        },
    }
}

/// Register a route on the shared router and declare its resources.
///
/// The route node depends on the target service's producer and on the
/// router, so the rule is never evaluated for creation before its backend
/// address resolves.
///
/// # Errors
///
/// Returns a [`RouteError`] for empty, relative or already-claimed prefixes,
/// or a graph error on duplicate declarations.
pub fn register_route(
    stack: &mut Stack,
    router: &RouterHandle,
    service: &ServiceHandle,
    spec: &RouteSpec,
) -> Result<RouteBinding, ComposeError> {
    validate_prefix(spec).map_err(ComposeError::from)?;
    router
        .claim_prefix(&spec.prefix, &spec.name)
        .map_err(ComposeError::from)?;

    debug!(
        route = %spec.name,
        prefix = %spec.prefix,
        service = %service.name,
        namespace = %spec.namespace,
        "registering route"
    );

    let middleware_node = format!("{}-stripprefix", spec.name);
    let route_node = format!("{}-route", spec.name);
    let middleware = build_middleware(&middleware_node, &spec.namespace, &spec.prefix);
    let ingress_route = build_ingress_route(&route_node, spec, service, &middleware_node);

    stack.declare(&middleware_node, ResourceKind::Middleware)?;
    stack.depend(&middleware_node, router.node(), router_edge(router))?;
    stack.declare(&route_node, ResourceKind::IngressRoute)?;
    stack.depend(&route_node, &middleware_node, EdgeKind::Resource)?;
    stack.depend(&route_node, router.node(), router_edge(router))?;
    stack.depend(&route_node, &service.resource, EdgeKind::Resource)?;

    Ok(RouteBinding {
        name: spec.name.clone(),
        prefix: spec.prefix.clone(),
        node: route_node,
        middleware_node,
        middleware,
        ingress_route,
    })
}

#[cfg(test)]
#[path = "route_tests.rs"]
mod route_tests;
