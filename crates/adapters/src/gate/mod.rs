// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission gate: atomic rate + concurrency check.

mod redis;

pub use self::redis::RedisAdmissionGate;

use async_trait::async_trait;
use eb_core::UserId;
use thiserror::Error;

/// Retention for the hourly rate counter.
pub const RATE_TTL_SECS: i64 = 60 * 60;

/// Errors from gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("gate backend error: {0}")]
    Backend(String),
}

/// Atomic admission primitive over the `running:<uid>` and `rate:<uid>`
/// counters.
///
/// `try_admit` must check both counters and bump the hourly one in a
/// single round; a separate read-then-increment admits classical races
/// under concurrent admissions.
#[async_trait]
pub trait AdmissionGate: Clone + Send + Sync + 'static {
    /// Admit if the user is under both caps; on admit, consume one hourly
    /// slot (and refresh its TTL). Returns whether admission was granted.
    async fn try_admit(
        &self,
        user_id: &UserId,
        max_concurrency: u32,
        max_rate: u32,
    ) -> Result<bool, GateError>;

    /// Return a consumed hourly slot; used to roll back a failed
    /// admission.
    async fn decr_hourly(&self, user_id: &UserId) -> Result<(), GateError>;

    /// Current hourly counter value (0 when expired).
    async fn submission_count(&self, user_id: &UserId) -> Result<i64, GateError>;
}

pub(crate) fn rate_key(user_id: &UserId) -> String {
    format!("rate:{user_id}")
}
