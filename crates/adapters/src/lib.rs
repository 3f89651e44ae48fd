// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! eb-adapters: Capability ports and their backends.
//!
//! Five independent capabilities back the control plane: the bundle
//! store, the job state store, the job queue, the admission gate, and
//! the experiment tracker. Each is a trait here with a production
//! backend (filesystem, Redis, MLflow REST) and, behind the
//! `test-support` feature, an in-process substitute.

pub mod bundle;
pub mod gate;
pub mod queue;
pub mod state;
pub mod traced;
pub mod tracker;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use bundle::{BundleError, BundleStore, FsBundleStore, StoredFile};
pub use gate::{AdmissionGate, GateError, RedisAdmissionGate};
pub use queue::{JobQueue, QueueError, RedisJobQueue};
pub use state::{JobStateStore, RedisJobStateStore, StateError};
pub use traced::TracedTracker;
pub use tracker::{MlflowTracker, Tracker, TrackerError};

#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryBackend, MemoryGate, MemoryJobQueue, MemoryJobStateStore};
#[cfg(any(test, feature = "test-support"))]
pub use tracker::{FakeTracker, TrackerCall};
