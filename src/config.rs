// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deploy-time stack configuration.
//!
//! The pipeline stack takes two required inputs at deploy time: the name of
//! the upstream base stack ([`crate::constants::CFG_BASE_STACK`]) and the
//! MLflow run identifier to serve ([`crate::constants::CFG_RUN_ID`]).
//! Configuration is a flat string map populated from `key=value` pairs on the
//! command line or from a JSON file.
//!
//! [`StackConfig::require`] fails fast on both missing and empty values, so a
//! blank `runID` is rejected before any resource is declared rather than
//! surfacing later as a provider rejection.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;

/// Flat deploy-time configuration for one stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackConfig {
    values: BTreeMap<String, String>,
}

impl StackConfig {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `(key, value)` pairs.
    ///
    /// Later pairs override earlier ones, matching the CLI's
    /// last-flag-wins behavior.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load a configuration from a JSON file of string values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFile`] if the file cannot be read or is
    /// not a flat JSON object of strings.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::InvalidFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let values: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { values })
    }

    /// Set a single value, overriding any existing one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up an optional value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Require a value, failing fast when it is missing or empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] or [`ConfigError::EmptyValue`].
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        match self.values.get(key) {
            None => Err(ConfigError::MissingKey {
                key: key.to_string(),
            }),
            Some(v) if v.is_empty() => Err(ConfigError::EmptyValue {
                key: key.to_string(),
            }),
            Some(v) => Ok(v),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
