// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle notifications broadcast to the application.

use serde::{Deserialize, Serialize};

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownReason {
    /// An expiry failure arrived but no renewal credential was stored.
    MissingRenewalCredential,
    /// The renewal exchange failed.
    RenewalRejected,
    /// A request replayed with fresh credentials was rejected again.
    ReplayRejected,
    /// The application ended the session itself.
    Logout,
}

impl TeardownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRenewalCredential => "missing_renewal_credential",
            Self::RenewalRejected => "renewal_rejected",
            Self::ReplayRejected => "replay_rejected",
            Self::Logout => "logout",
        }
    }
}

impl std::fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the session client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A renewal exchange succeeded and the store holds the new pair.
    Renewed,
    /// Session state was cleared. The application should navigate to
    /// `entry_point`.
    TornDown { reason: TeardownReason, entry_point: String },
}
