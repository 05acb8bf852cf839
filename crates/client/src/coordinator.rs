// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight credential renewal.
//!
//! The coordinator is `Idle` or `Renewing`. The first expiry failure seen while
//! idle starts one renewal exchange; every failure that arrives while it is
//! outstanding parks a oneshot waiter instead of starting another. When the
//! exchange settles, the store is updated first and then all waiters are
//! released in arrival order with the same outcome.
//!
//! An idle expiry failure can skip the exchange entirely: if the store already
//! holds a different access credential than the failed request carried, a
//! renewal finished after that request was stamped and the caller just replays.
//!
//! The state check and transition happen under one synchronous lock with no
//! `.await` in between, so at most one exchange is ever in flight. A failed
//! exchange tears the session down before leaving `Renewing`, so late failures
//! never reach the rejected renewal credential.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

use crate::events::{SessionEvent, TeardownReason};
use crate::renewal::Renewer;
use crate::store::CredentialStore;
use crate::teardown::SessionTeardown;

/// How a renewal settled, as seen by one waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// The store now holds a fresh pair. Replay the request.
    Renewed,
    /// The session was torn down. Surface the original failure.
    Failed(TeardownReason),
}

enum State {
    Idle,
    Renewing { waiters: Vec<oneshot::Sender<RenewalOutcome>> },
}

pub struct RenewalCoordinator {
    store: Arc<dyn CredentialStore>,
    renewer: Arc<dyn Renewer>,
    teardown: Arc<SessionTeardown>,
    event_tx: broadcast::Sender<SessionEvent>,
    state: Mutex<State>,
}

impl RenewalCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        renewer: Arc<dyn Renewer>,
        teardown: Arc<SessionTeardown>,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Arc<Self> {
        Arc::new(Self { store, renewer, teardown, event_tx, state: Mutex::new(State::Idle) })
    }

    #[cfg(test)]
    pub(crate) fn is_renewing(&self) -> bool {
        matches!(*self.state.lock(), State::Renewing { .. })
    }

    /// Number of callers parked behind the in-flight exchange.
    #[cfg(test)]
    pub(crate) fn waiting(&self) -> usize {
        match &*self.state.lock() {
            State::Idle => 0,
            State::Renewing { waiters } => waiters.len(),
        }
    }

    /// Called after a request stamped with `failed_with` got an expiry
    /// failure. Resolves once a fresh credential is stored or the session has
    /// been torn down.
    pub async fn renew(self: &Arc<Self>, failed_with: Option<&str>) -> RenewalOutcome {
        let rx = match self.enqueue(failed_with) {
            Ok(rx) => rx,
            Err(outcome) => return outcome,
        };
        // Every waiter is answered by `Settle`, even if the exchange unwinds.
        rx.await.unwrap_or(RenewalOutcome::Failed(TeardownReason::RenewalRejected))
    }

    fn enqueue(
        self: &Arc<Self>,
        failed_with: Option<&str>,
    ) -> Result<oneshot::Receiver<RenewalOutcome>, RenewalOutcome> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock();

        if let State::Renewing { waiters } = &mut *state {
            waiters.push(tx);
            tracing::debug!(waiting = waiters.len(), "queued behind in-flight renewal");
            return Ok(rx);
        }

        let current = self.store.access_token();
        if current.is_some() && current.as_deref() != failed_with {
            tracing::debug!("credential already renewed, replaying without exchange");
            return Err(RenewalOutcome::Renewed);
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            drop(state);
            tracing::warn!("expiry failure with no renewal credential");
            self.teardown.run(TeardownReason::MissingRenewalCredential);
            return Err(RenewalOutcome::Failed(TeardownReason::MissingRenewalCredential));
        };

        *state = State::Renewing { waiters: vec![tx] };
        drop(state);

        tracing::debug!("starting renewal exchange");
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.exchange(refresh_token).await;
        });
        Ok(rx)
    }

    async fn exchange(&self, refresh_token: String) {
        let mut settle = Settle { coordinator: self, outcome: None };

        let outcome = match self.renewer.renew(refresh_token).await {
            Ok(pair) => {
                self.store.set(&pair);
                tracing::info!("credentials renewed");
                RenewalOutcome::Renewed
            }
            Err(e) => {
                tracing::warn!(err = %e, "renewal exchange failed");
                self.teardown.run(TeardownReason::RenewalRejected);
                RenewalOutcome::Failed(TeardownReason::RenewalRejected)
            }
        };
        settle.outcome = Some(outcome);
    }

    /// Leave `Renewing` and answer every parked waiter with `outcome`.
    fn release(&self, outcome: RenewalOutcome) {
        let waiters = match std::mem::replace(&mut *self.state.lock(), State::Idle) {
            State::Renewing { waiters } => waiters,
            State::Idle => Vec::new(),
        };

        if outcome == RenewalOutcome::Renewed {
            let _ = self.event_tx.send(SessionEvent::Renewed);
        }

        tracing::debug!(released = waiters.len(), "renewal settled");
        for tx in waiters {
            let _ = tx.send(outcome);
        }
    }
}

/// Settles the coordinator when the exchange task ends. An exchange that
/// unwinds or is dropped before recording an outcome counts as rejected.
struct Settle<'a> {
    coordinator: &'a RenewalCoordinator,
    outcome: Option<RenewalOutcome>,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => {
                tracing::warn!("renewal exchange ended without an outcome");
                self.coordinator.teardown.run(TeardownReason::RenewalRejected);
                RenewalOutcome::Failed(TeardownReason::RenewalRejected)
            }
        };
        self.coordinator.release(outcome);
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
