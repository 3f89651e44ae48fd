// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token identity resolution.
//!
//! The core does not manage identities: the token string itself is the
//! user id. When a non-empty allowlist is configured, unknown tokens are
//! rejected.

use crate::owner::UserId;
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

/// Errors from authorization header handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("invalid token")]
    InvalidToken,
}

/// Resolve an `Authorization` header value to a [`UserId`].
///
/// `allowlist` is the parsed `API_TOKENS` configuration; when empty, any
/// bearer token is accepted.
pub fn authenticate(header: Option<&str>, allowlist: &[String]) -> Result<UserId, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MissingHeader)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingHeader);
    }
    if !allowlist.is_empty() && !allowlist.iter().any(|t| t == token) {
        return Err(AuthError::InvalidToken);
    }
    Ok(UserId::new(token))
}

/// Parse the comma-separated `API_TOKENS` value into an allowlist.
pub fn parse_token_allowlist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
