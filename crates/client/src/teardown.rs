// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session teardown: clear all session state and send the application back to
//! its unauthenticated entry point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::events::{SessionEvent, TeardownReason};
use crate::store::CredentialStore;

pub struct SessionTeardown {
    store: Arc<dyn CredentialStore>,
    event_tx: broadcast::Sender<SessionEvent>,
    entry_point: String,
    /// Cleared by the first teardown, set again by [`SessionTeardown::rearm`].
    armed: AtomicBool,
}

impl SessionTeardown {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        event_tx: broadcast::Sender<SessionEvent>,
        entry_point: impl Into<String>,
    ) -> Self {
        Self { store, event_tx, entry_point: entry_point.into(), armed: AtomicBool::new(true) }
    }

    /// Clear the store and, on the first call since the session began, emit
    /// [`SessionEvent::TornDown`]. Returns whether the event was emitted.
    pub fn run(&self, reason: TeardownReason) -> bool {
        self.store.clear();

        if !self.armed.swap(false, Ordering::AcqRel) {
            tracing::debug!(%reason, "session already torn down");
            return false;
        }

        tracing::info!(%reason, entry_point = %self.entry_point, "session torn down");
        let _ = self.event_tx.send(SessionEvent::TornDown {
            reason,
            entry_point: self.entry_point.clone(),
        });
        true
    }

    /// Allow the next teardown to emit again. Called when a new session starts.
    pub fn rearm(&self) {
        self.armed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "teardown_tests.rs"]
mod tests;
