// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics document written by the child process.
//!
//! The child must leave `metrics.json` in its output directory. `params`
//! and `metrics` are required; `performance` is optional and its entries
//! are recorded under a `system/` prefix. Unknown top-level keys are
//! ignored.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Prefix applied to performance metric names before tracker recording.
pub const PERFORMANCE_PREFIX: &str = "system/";

/// Errors from parsing a metrics document.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics document: {0}")]
    Invalid(String),
    #[error("params must be scalar values, got {0} for key {1}")]
    NonScalarParam(String, String),
}

/// Parsed contents of `metrics.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricsDocument {
    /// Hyperparameters of the run. Values must be JSON scalars.
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Result metrics keyed by name.
    pub metrics: BTreeMap<String, f64>,
    /// Optional system performance figures (latency, throughput).
    #[serde(default)]
    pub performance: Option<BTreeMap<String, f64>>,
}

impl MetricsDocument {
    /// Parse and validate a metrics document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, MetricsError> {
        let doc: MetricsDocument =
            serde_json::from_str(text).map_err(|e| MetricsError::Invalid(e.to_string()))?;
        for (key, value) in &doc.params {
            if value.is_array() || value.is_object() {
                let kind = if value.is_array() { "array" } else { "object" };
                return Err(MetricsError::NonScalarParam(kind.to_string(), key.clone()));
            }
        }
        Ok(doc)
    }

    /// Performance metrics with the `system/` prefix applied, empty when
    /// the section is absent.
    pub fn prefixed_performance(&self) -> BTreeMap<String, f64> {
        self.performance
            .iter()
            .flatten()
            .map(|(k, v)| (format!("{PERFORMANCE_PREFIX}{k}"), *v))
            .collect()
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
