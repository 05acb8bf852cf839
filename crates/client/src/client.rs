// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application-facing client: stamp, send, classify, renew, replay.

use std::sync::Arc;

use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::coordinator::{RenewalCoordinator, RenewalOutcome};
use crate::error::ClientError;
use crate::events::{SessionEvent, TeardownReason};
use crate::inbound::{classify, Attempt, Disposition};
use crate::outbound::{Outbound, RequestDescriptor};
use crate::renewal::{HttpRenewer, Renewer};
use crate::store::{CredentialPair, CredentialStore};
use crate::teardown::SessionTeardown;

/// HTTP client that keeps a session alive across access-credential expiry.
///
/// Construct once and share it; every clone of the inner `Arc`s refers to the
/// same coordinator, so single-flight renewal holds across all callers.
pub struct SessionClient {
    outbound: Outbound,
    coordinator: Arc<RenewalCoordinator>,
    teardown: Arc<SessionTeardown>,
    store: Arc<dyn CredentialStore>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionClient {
    /// Build a client that renews via `POST {base_url}{refresh_path}`.
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        crate::ensure_crypto();
        // Separate client so the exchange never shares the stamped pipeline.
        let renewal_http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        let renewer = Arc::new(HttpRenewer::new(renewal_http, config.refresh_url()));
        Self::with_renewer(config, store, renewer)
    }

    pub fn with_renewer(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
        renewer: Arc<dyn Renewer>,
    ) -> anyhow::Result<Self> {
        crate::ensure_crypto();
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        let (event_tx, _) = broadcast::channel(64);
        let teardown = Arc::new(SessionTeardown::new(
            Arc::clone(&store),
            event_tx.clone(),
            config.entry_point.clone(),
        ));
        let coordinator = RenewalCoordinator::new(
            Arc::clone(&store),
            renewer,
            Arc::clone(&teardown),
            event_tx.clone(),
        );
        let outbound = Outbound::new(http, config.base_url.clone(), Arc::clone(&store));
        Ok(Self { outbound, coordinator, teardown, store, event_tx })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Start a session with a pair obtained from login or registration.
    pub fn establish(&self, pair: &CredentialPair) {
        self.store.set(pair);
        self.teardown.rearm();
        tracing::info!("session established");
    }

    /// End the session on the application's request.
    pub fn logout(&self) {
        self.teardown.run(TeardownReason::Logout);
    }

    /// Send a request. Expiry failures are renewed and replayed underneath;
    /// the caller sees one outcome.
    pub async fn send(&self, req: RequestDescriptor) -> Result<Response, ClientError> {
        let stamped = self.outbound.stamp(&req);
        let resp = stamped.builder.send().await?;

        match classify(resp.status(), Attempt::First) {
            Disposition::Deliver => Ok(resp),
            Disposition::Renew => {
                let original = ClientError::from_response(resp).await;
                tracing::debug!(
                    method = %req.method,
                    path = %req.path,
                    "access credential expired"
                );
                match self.coordinator.renew(stamped.access_token.as_deref()).await {
                    RenewalOutcome::Renewed => self.replay(&req).await,
                    RenewalOutcome::Failed(reason) => {
                        tracing::debug!(%reason, path = %req.path, "renewal failed");
                        Err(original)
                    }
                }
            }
            Disposition::PassThrough | Disposition::Terminal => {
                Err(ClientError::from_response(resp).await)
            }
        }
    }

    /// Second and final attempt with whatever credential is now stored.
    async fn replay(&self, req: &RequestDescriptor) -> Result<Response, ClientError> {
        tracing::debug!(method = %req.method, path = %req.path, "replaying request");
        let resp = self.outbound.stamp(req).builder.send().await?;

        match classify(resp.status(), Attempt::Replay) {
            Disposition::Deliver => Ok(resp),
            Disposition::Terminal => {
                let err = ClientError::from_response(resp).await;
                tracing::warn!(path = %req.path, "replay rejected with fresh credential");
                self.teardown.run(TeardownReason::ReplayRejected);
                Err(err)
            }
            Disposition::PassThrough | Disposition::Renew => {
                Err(ClientError::from_response(resp).await)
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        self.send(RequestDescriptor::get(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, ClientError> {
        self.send(RequestDescriptor::delete(path)).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ClientError> {
        self.send(RequestDescriptor::new(Method::POST, path).with_json(body)?).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ClientError> {
        self.send(RequestDescriptor::new(Method::PUT, path).with_json(body)?).await
    }

    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ClientError> {
        self.send(RequestDescriptor::new(Method::PATCH, path).with_json(body)?).await
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        Ok(self.get(path).await?.json().await?)
    }
}
