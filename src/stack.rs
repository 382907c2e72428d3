// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Stacks, published outputs and cross-stack references.
//!
//! A [`Stack`] is a named, independently deployable unit: a dependency graph
//! of declared resources plus, after a successful compose, a frozen mapping
//! of output name → [`OutputValue`]. Downstream stacks never see a stack
//! directly; they resolve its outputs through a [`StackBackend`] and a
//! [`StackReference`], which fails fast when a required output is absent.
//!
//! Output values are typed as plain strings or secrets. Secrets (the
//! kubeconfig) render redacted in logs and previews but serialize in full to
//! the state backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{ComposeError, StackError};
use crate::graph::{DependencyGraph, EdgeKind, ResourceKind};

/// A single published output value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum OutputValue {
    /// A plain string value
    String(String),
    /// A sensitive string value, redacted in human-facing output
    Secret(String),
}

impl OutputValue {
    /// The underlying string, secret or not.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String(s) | Self::Secret(s) => s,
        }
    }

    /// Whether the value is sensitive.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

impl fmt::Display for OutputValue {
    /// Secrets display as `[secret]`; use [`OutputValue::as_str`] for the raw value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Secret(_) => f.write_str("[secret]"),
        }
    }
}

/// Outputs of a successfully composed stack, frozen at publication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutputs {
    values: BTreeMap<String, OutputValue>,
    published_at: DateTime<Utc>,
}

impl StackOutputs {
    /// Freeze a set of output values, stamping the publication time.
    #[must_use]
    pub fn publish(values: BTreeMap<String, OutputValue>) -> Self {
        Self {
            values,
            published_at: Utc::now(),
        }
    }

    /// Look up an output by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.values.get(name)
    }

    /// Names of all published outputs, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// Iterate over all published outputs, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// When the outputs were frozen.
    #[must_use]
    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

/// A named, independently deployable unit of declared resources.
#[derive(Clone, Debug)]
pub struct Stack {
    name: String,
    graph: DependencyGraph,
    outputs: Option<StackOutputs>,
}

impl Stack {
    /// Create an empty stack.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: DependencyGraph::new(),
            outputs: None,
        }
    }

    /// The stack's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared dependency graph.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Declare a resource node, see [`DependencyGraph::declare`].
    pub fn declare(&mut self, name: &str, kind: ResourceKind) -> Result<(), ComposeError> {
        self.graph.declare(name, kind).map_err(ComposeError::from)
    }

    /// Declare a dependency edge, see [`DependencyGraph::depend`].
    pub fn depend(
        &mut self,
        consumer: &str,
        producer: &str,
        kind: EdgeKind,
    ) -> Result<(), ComposeError> {
        self.graph
            .depend(consumer, producer, kind)
            .map_err(ComposeError::from)
    }

    /// Publish the stack's outputs, freezing them.
    ///
    /// The dependency graph is validated first: a cyclic graph means the
    /// declared program could never have deployed, so nothing is published.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::OutputsAlreadyPublished`] on a second
    /// publication, or a graph error if validation fails.
    pub fn publish_outputs(
        &mut self,
        values: BTreeMap<String, OutputValue>,
    ) -> Result<&StackOutputs, ComposeError> {
        if self.outputs.is_some() {
            return Err(StackError::OutputsAlreadyPublished {
                stack: self.name.clone(),
            }
            .into());
        }
        self.graph.validate()?;
        Ok(&*self.outputs.insert(StackOutputs::publish(values)))
    }

    /// The published outputs, if the stack composed successfully.
    #[must_use]
    pub fn outputs(&self) -> Option<&StackOutputs> {
        self.outputs.as_ref()
    }
}

/// Source of published stack outputs.
///
/// Implemented by the in-memory backend used in previews and tests and by the
/// file-backed store the CLI reads. Resolution is read-only: a backend never
/// mutates the upstream stack.
pub trait StackBackend {
    /// Resolve a stack's published outputs by stack name.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UnknownStack`] if no stack of that name has
    /// published outputs, or [`StackError::Backend`] if the backend itself
    /// cannot be read.
    fn resolve(&self, stack: &str) -> Result<StackOutputs, StackError>;
}

/// In-memory stack backend.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    stacks: BTreeMap<String, StackOutputs>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stack's published outputs under its name.
    pub fn register(&mut self, stack: impl Into<String>, outputs: StackOutputs) {
        self.stacks.insert(stack.into(), outputs);
    }
}

impl StackBackend for InMemoryBackend {
    fn resolve(&self, stack: &str) -> Result<StackOutputs, StackError> {
        self.stacks
            .get(stack)
            .cloned()
            .ok_or_else(|| StackError::UnknownStack {
                stack: stack.to_string(),
            })
    }
}

/// A resolved reference to an upstream stack's published outputs.
///
/// Bound at downstream-compose time, never ambient: the consumer resolves the
/// upstream stack once, then reads required outputs from the frozen snapshot.
/// Re-resolving the same reference within one compose yields identical
/// values, because the snapshot is cloned from the frozen upstream outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackReference {
    stack: String,
    outputs: StackOutputs,
}

impl StackReference {
    /// Resolve the named upstream stack through a backend.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UnknownStack`] if the stack does not exist or
    /// has not published outputs.
    pub fn resolve(backend: &dyn StackBackend, stack: &str) -> Result<Self, StackError> {
        let outputs = backend.resolve(stack)?;
        Ok(Self {
            stack: stack.to_string(),
            outputs,
        })
    }

    /// Name of the referenced stack.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// The full resolved snapshot.
    #[must_use]
    pub fn outputs(&self) -> &StackOutputs {
        &self.outputs
    }

    /// Require a named output, failing fast when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::MissingOutput`] naming the stack and the absent
    /// output. There is no silent default.
    pub fn require_output(&self, name: &str) -> Result<OutputValue, StackError> {
        self.outputs
            .get(name)
            .cloned()
            .ok_or_else(|| StackError::MissingOutput {
                stack: self.stack.clone(),
                output: name.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "stack_tests.rs"]
mod stack_tests;
