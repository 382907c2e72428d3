// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! File-backed stack-output store.
//!
//! The CLI persists published outputs as one JSON document mapping stack name
//! to its frozen outputs. Deploy tooling writes the file after a successful
//! deploy; `crosswire preview pipeline --state <file>` and
//! `crosswire outputs <stack>` read it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::StackError;
use crate::stack::{StackBackend, StackOutputs};

/// Stack backend reading published outputs from a JSON state file.
#[derive(Clone, Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Create a backend over the given state file.
    ///
    /// The file is read on each resolution, not cached, so a deploy finishing
    /// between two CLI invocations is picked up.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, StackOutputs>, StackError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| StackError::Backend {
            reason: format!("failed to read '{}': {e}", self.path.display()),
        })?;
        serde_json::from_str(&raw).map_err(|e| StackError::Backend {
            reason: format!("malformed state file '{}': {e}", self.path.display()),
        })
    }

    /// Record a stack's published outputs, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Backend`] on I/O or serialization failure.
    pub fn store(&self, stack: &str, outputs: &StackOutputs) -> Result<(), StackError> {
        let mut stacks = if self.path.exists() {
            self.load()?
        } else {
            BTreeMap::new()
        };
        stacks.insert(stack.to_string(), outputs.clone());

        let raw = serde_json::to_string_pretty(&stacks).map_err(|e| StackError::Backend {
            reason: format!("failed to serialize state: {e}"),
        })?;
        fs::write(&self.path, raw).map_err(|e| StackError::Backend {
            reason: format!("failed to write '{}': {e}", self.path.display()),
        })
    }
}

impl StackBackend for FileBackend {
    fn resolve(&self, stack: &str) -> Result<StackOutputs, StackError> {
        let stacks = self.load()?;
        stacks
            .get(stack)
            .cloned()
            .ok_or_else(|| StackError::UnknownStack {
                stack: stack.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
