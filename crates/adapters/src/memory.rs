// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process backend standing in for the shared Redis instance.
//!
//! One [`MemoryBackend`] is shared by the state store, queue, and gate
//! views so the gate's admission decisions observe the state store's
//! counter maintenance, exactly as they would against a single server.
//! TTLs are not simulated; tests force expiry through
//! [`MemoryBackend::expire_running_counter`].

use crate::gate::{AdmissionGate, GateError};
use crate::queue::{JobQueue, QueueError};
use crate::state::{JobStateStore, StateError};
use async_trait::async_trait;
use eb_core::{
    Clock, FakeClock, JobId, JobRecord, JobStatus, QueueMessage, SubmissionId, UpdateFields, UserId,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Both per-user counters behind one lock, so the gate's check-and-bump
/// is atomic across them.
#[derive(Default)]
struct Counters {
    running: HashMap<String, i64>,
    rate: HashMap<String, i64>,
}

struct Inner {
    jobs: Mutex<HashMap<String, JobRecord>>,
    counters: Mutex<Counters>,
    queue: Mutex<VecDeque<QueueMessage>>,
    queue_notify: Notify,
    clock: FakeClock,
}

/// Shared in-process stand-in for the state store / queue backend.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(FakeClock::default())
    }
}

impl MemoryBackend {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs: Mutex::new(HashMap::new()),
                counters: Mutex::new(Counters::default()),
                queue: Mutex::new(VecDeque::new()),
                queue_notify: Notify::new(),
                clock,
            }),
        }
    }

    pub fn clock(&self) -> FakeClock {
        self.inner.clock.clone()
    }

    /// State store view of this backend.
    pub fn state_store(&self) -> MemoryJobStateStore {
        MemoryJobStateStore {
            backend: self.clone(),
        }
    }

    /// Queue view of this backend.
    pub fn job_queue(&self) -> MemoryJobQueue {
        MemoryJobQueue {
            backend: self.clone(),
        }
    }

    /// Gate view of this backend.
    pub fn gate(&self) -> MemoryGate {
        MemoryGate {
            backend: self.clone(),
        }
    }

    /// Observed hourly rate counter (0 when absent).
    pub fn rate_count(&self, user_id: &UserId) -> i64 {
        self.inner
            .counters
            .lock()
            .rate
            .get(user_id.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Drop the cached running counter, as TTL expiry would.
    pub fn expire_running_counter(&self, user_id: &UserId) {
        self.inner.counters.lock().running.remove(user_id.as_str());
    }

    /// Raw cached running counter, `None` when absent.
    pub fn cached_running(&self, user_id: &UserId) -> Option<i64> {
        self.inner
            .counters
            .lock()
            .running
            .get(user_id.as_str())
            .copied()
    }

    /// Number of messages currently queued.
    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().len()
    }
}

/// State store view over a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryJobStateStore {
    backend: MemoryBackend,
}

#[async_trait]
impl JobStateStore for MemoryJobStateStore {
    async fn create(
        &self,
        job_id: &JobId,
        submission_id: &SubmissionId,
        user_id: &UserId,
    ) -> Result<(), StateError> {
        let now = self.backend.inner.clock.now();
        let record = JobRecord::pending(
            job_id.clone(),
            submission_id.clone(),
            user_id.clone(),
            now,
        );
        self.backend
            .inner
            .jobs
            .lock()
            .insert(job_id.to_string(), record);
        Ok(())
    }

    async fn update(
        &self,
        job_id: &JobId,
        status: JobStatus,
        fields: UpdateFields,
    ) -> Result<(), StateError> {
        let now = self.backend.inner.clock.now();
        let (prev, user_id) = {
            let mut jobs = self.backend.inner.jobs.lock();
            let record = jobs
                .get_mut(job_id.as_str())
                .ok_or_else(|| StateError::NotFound(job_id.to_string()))?;
            let prev = record.status;
            record.status = status;
            record.updated_at = now;
            if let Some(run_id) = fields.run_id {
                record.run_id = Some(run_id);
            }
            if let Some(error) = fields.error {
                record.error = Some(error);
            }
            (prev, record.user_id.clone())
        };

        if prev != status {
            let mut counters = self.backend.inner.counters.lock();
            if prev != JobStatus::Running && status == JobStatus::Running {
                *counters.running.entry(user_id.to_string()).or_insert(0) += 1;
            } else if prev == JobStatus::Running && status != JobStatus::Running {
                *counters.running.entry(user_id.to_string()).or_insert(0) -= 1;
            }
        }
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>, StateError> {
        Ok(self.backend.inner.jobs.lock().get(job_id.as_str()).cloned())
    }

    async fn count_running(&self, user_id: &UserId) -> Result<i64, StateError> {
        if let Some(cached) = self.backend.cached_running(user_id) {
            return Ok(cached.max(0));
        }
        // Rebuild from the authoritative records and persist, as the
        // Redis backend does after counter expiry.
        let rebuilt = self
            .backend
            .inner
            .jobs
            .lock()
            .values()
            .filter(|r| r.user_id == *user_id && r.status == JobStatus::Running)
            .count() as i64;
        self.backend
            .inner
            .counters
            .lock()
            .running
            .insert(user_id.to_string(), rebuilt);
        Ok(rebuilt)
    }
}

/// Queue view over a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryJobQueue {
    backend: MemoryBackend,
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, msg: &QueueMessage) -> Result<(), QueueError> {
        self.backend.inner.queue.lock().push_back(msg.clone());
        self.backend.inner.queue_notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<QueueMessage>, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(msg) = self.backend.inner.queue.lock().pop_front() {
                return Ok(Some(msg));
            }
            let notified = self.backend.inner.queue_notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }
}

/// Gate view over a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryGate {
    backend: MemoryBackend,
}

#[async_trait]
impl AdmissionGate for MemoryGate {
    async fn try_admit(
        &self,
        user_id: &UserId,
        max_concurrency: u32,
        max_rate: u32,
    ) -> Result<bool, GateError> {
        let mut counters = self.backend.inner.counters.lock();
        let running = counters
            .running
            .get(user_id.as_str())
            .copied()
            .unwrap_or(0);
        if running >= max_concurrency as i64 {
            return Ok(false);
        }
        let hourly = counters.rate.get(user_id.as_str()).copied().unwrap_or(0);
        if hourly >= max_rate as i64 {
            return Ok(false);
        }
        *counters.rate.entry(user_id.to_string()).or_insert(0) += 1;
        Ok(true)
    }

    async fn decr_hourly(&self, user_id: &UserId) -> Result<(), GateError> {
        let mut counters = self.backend.inner.counters.lock();
        *counters.rate.entry(user_id.to_string()).or_insert(0) -= 1;
        Ok(())
    }

    async fn submission_count(&self, user_id: &UserId) -> Result<i64, GateError> {
        Ok(self.backend.rate_count(user_id))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
