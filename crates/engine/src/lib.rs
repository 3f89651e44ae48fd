// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! eb-engine: Use-cases over the capability ports, plus the job worker.
//!
//! The submission service and admission service are what the HTTP surface
//! calls into; the worker is the queue consumer that executes jobs.

pub mod admission;
pub mod error;
pub mod queries;
pub mod submissions;
pub mod worker;

pub use admission::EnqueueJob;
pub use error::ServiceError;
pub use queries::{GetJobLogs, GetJobResults, GetJobStatus, JobLogs, JobResults};
pub use submissions::{AddSubmissionFile, CreateSubmission, ListSubmissionFiles};
pub use worker::{JobWorker, StopSignal, WorkerConfig};
