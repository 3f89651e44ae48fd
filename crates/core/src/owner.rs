// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission and job ownership.

crate::define_id! {
    /// Identity of an authenticated user.
    ///
    /// The HTTP surface resolves a bearer token to this string; the core
    /// treats it as opaque. Bundles are owned by exactly one user and jobs
    /// inherit ownership from their submission.
    pub struct UserId;
}
