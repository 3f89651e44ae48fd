// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission service: validate, pass the gate, create state, publish.
//!
//! Every path that consumes an hourly rate slot either leaves a queued
//! pending job behind or returns the slot before surfacing its error. The
//! gate runs before the state write, so a refused admission costs
//! nothing.

use crate::error::ServiceError;
use eb_adapters::{AdmissionGate, BundleStore, JobQueue, JobStateStore};
use eb_core::{
    IdGen, JobId, JobStatus, Limits, QueueMessage, SubmissionId, UpdateFields, UserId,
};

/// `EnqueueJob` use-case.
#[derive(Clone)]
pub struct EnqueueJob<B, Q, S, G, I> {
    store: B,
    queue: Q,
    state: S,
    gate: G,
    ids: I,
    limits: Limits,
}

impl<B, Q, S, G, I> EnqueueJob<B, Q, S, G, I>
where
    B: BundleStore,
    Q: JobQueue,
    S: JobStateStore,
    G: AdmissionGate,
    I: IdGen,
{
    pub fn new(store: B, queue: Q, state: S, gate: G, ids: I, limits: Limits) -> Self {
        Self {
            store,
            queue,
            state,
            gate,
            ids,
            limits,
        }
    }

    pub async fn execute(
        &self,
        sid: &SubmissionId,
        user_id: &UserId,
        config: serde_json::Map<String, serde_json::Value>,
    ) -> Result<JobId, ServiceError> {
        if !self.store.exists(sid).await {
            return Err(ServiceError::SubmissionNotFound(sid.to_string()));
        }
        let meta = self.store.metadata(sid).await?;

        // Warm the running counter so an expired key is rebuilt before the
        // gate's atomic read.
        self.state.count_running(user_id).await?;

        let admitted = self
            .gate
            .try_admit(
                user_id,
                self.limits.max_concurrent_running,
                self.limits.max_submissions_per_hour,
            )
            .await?;
        if !admitted {
            // The gate only reports a boolean; reconstruct the cause for
            // the error message. Informational, not load-bearing.
            let running = self.state.count_running(user_id).await?;
            let err = if running >= self.limits.max_concurrent_running as i64 {
                ServiceError::ConcurrencyExceeded
            } else {
                ServiceError::RateExceeded
            };
            tracing::info!(sid = %sid, user_id = %user_id, error = %err, "admission refused");
            return Err(err);
        }

        // Completeness check, post-gate: roll the consumed slot back on
        // failure.
        if !self.store.validate_entrypoint(sid, &meta.entrypoint).await {
            self.release_rate_slot(user_id).await;
            return Err(ServiceError::Incomplete(format!(
                "entrypoint {} not found in bundle",
                meta.entrypoint
            )));
        }
        if !self.store.contains_file(sid, &meta.config_file).await {
            self.release_rate_slot(user_id).await;
            return Err(ServiceError::Incomplete(format!(
                "config file {} not found in bundle",
                meta.config_file
            )));
        }

        let jid = JobId::new(self.ids.next());
        if let Err(e) = self.state.create(&jid, sid, user_id).await {
            self.release_rate_slot(user_id).await;
            return Err(e.into());
        }

        let msg = QueueMessage {
            job_id: jid.clone(),
            submission_id: sid.clone(),
            entrypoint: meta.entrypoint,
            config_file: meta.config_file,
            config,
        };
        if let Err(e) = self.queue.enqueue(&msg).await {
            if let Err(update_err) = self
                .state
                .update(
                    &jid,
                    JobStatus::Failed,
                    UpdateFields::error("Queue enqueue failed"),
                )
                .await
            {
                tracing::error!(jid = %jid, error = %update_err, "failed to mark unqueued job failed");
            }
            self.release_rate_slot(user_id).await;
            return Err(e.into());
        }

        tracing::info!(jid = %jid, sid = %sid, user_id = %user_id, "job admitted");
        Ok(jid)
    }

    /// Return a consumed rate slot. A failed release cannot be rolled
    /// back further, so it is logged and swallowed.
    async fn release_rate_slot(&self, user_id: &UserId) {
        if let Err(e) = self.gate.decr_hourly(user_id).await {
            tracing::error!(user_id = %user_id, error = %e, "failed to release rate slot");
        }
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
