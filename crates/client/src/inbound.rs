// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound classification of responses.

use reqwest::StatusCode;

/// The status the service uses to reject an access credential.
pub const EXPIRY_STATUS: StatusCode = StatusCode::UNAUTHORIZED;

/// Whether a request is on its first attempt or is a replay after renewal.
///
/// A replay is never handed to renewal again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Replay,
}

/// What to do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Hand the response to the caller.
    Deliver,
    /// Credential expired on a first attempt: renew, then replay.
    Renew,
    /// Credential rejected even after renewal: tear the session down.
    Terminal,
    /// Some other failure: surface it untouched.
    PassThrough,
}

pub fn is_expiry(status: StatusCode) -> bool {
    status == EXPIRY_STATUS
}

pub fn classify(status: StatusCode, attempt: Attempt) -> Disposition {
    if status.is_success() || status.is_redirection() || status.is_informational() {
        return Disposition::Deliver;
    }
    if !is_expiry(status) {
        return Disposition::PassThrough;
    }
    match attempt {
        Attempt::First => Disposition::Renew,
        Attempt::Replay => Disposition::Terminal,
    }
}

#[cfg(test)]
#[path = "inbound_tests.rs"]
mod tests;
