// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-facing error taxonomy of the control plane.
//!
//! Worker failure kinds (timeout, child failure, metrics, tracker) are
//! deliberately absent here: they are [`crate::worker::WorkerError`]
//! values, recorded once as the job record's error text and observed
//! through the status query rather than returned to a caller.

use eb_adapters::{BundleError, GateError, QueueError, StateError};
use eb_core::NameError;
use thiserror::Error;

/// Failures surfaced by the submission and admission services.
///
/// Validation failures are immediate, local, and non-retriable. The HTTP
/// surface maps each variant to a status code via [`ServiceError::http_status`];
/// internal errors keep their precise cause in logs only.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("submission {0} not found")]
    SubmissionNotFound(String),
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("file {0} already exists in submission")]
    Duplicate(String),
    #[error("not the owner of submission {0}")]
    NotOwner(String),
    #[error("submission incomplete: {0}")]
    Incomplete(String),
    #[error("submission rate limit exceeded")]
    RateExceeded,
    #[error("too many running jobs")]
    ConcurrencyExceeded,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status the surface layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::SubmissionNotFound(_) => 404,
            ServiceError::NotOwner(_) => 403,
            ServiceError::InvalidName(_)
            | ServiceError::Duplicate(_)
            | ServiceError::Incomplete(_)
            | ServiceError::RateExceeded
            | ServiceError::ConcurrencyExceeded => 400,
            ServiceError::Internal(_) => 500,
        }
    }
}

impl From<BundleError> for ServiceError {
    fn from(e: BundleError) -> Self {
        match e {
            BundleError::NotFound(sid) => ServiceError::SubmissionNotFound(sid),
            BundleError::NotOwner(sid) => ServiceError::NotOwner(sid),
            BundleError::Duplicate(name) => ServiceError::Duplicate(name),
            BundleError::InvalidName(err) => ServiceError::InvalidName(err),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<StateError> for ServiceError {
    fn from(e: StateError) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

impl From<QueueError> for ServiceError {
    fn from(e: QueueError) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

impl From<GateError> for ServiceError {
    fn from(e: GateError) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
