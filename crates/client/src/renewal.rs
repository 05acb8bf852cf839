// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The renewal exchange: trade a renewal credential for a fresh pair.
//!
//! This call is never stamped with the access credential and never routed
//! back through expiry handling.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::store::CredentialPair;

#[derive(Debug, thiserror::Error)]
pub enum RenewalError {
    #[error("renewal rejected ({status}): {body}")]
    Rejected { status: reqwest::StatusCode, body: String },
    #[error("renewal request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Performs one renewal exchange.
///
/// Object-safe for use as `Arc<dyn Renewer>`.
pub trait Renewer: Send + Sync + 'static {
    fn renew(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = Result<CredentialPair, RenewalError>> + Send + '_>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenewalRequest<'a> {
    refresh_token: &'a str,
}

/// Renews against `POST {refresh_url}` with a JSON `{"refreshToken"}` body.
pub struct HttpRenewer {
    client: reqwest::Client,
    refresh_url: String,
}

impl HttpRenewer {
    /// `client` must be a plain client, not one wired into the session pipeline.
    pub fn new(client: reqwest::Client, refresh_url: impl Into<String>) -> Self {
        Self { client, refresh_url: refresh_url.into() }
    }

    async fn exchange(&self, refresh_token: &str) -> Result<CredentialPair, RenewalError> {
        let resp = self
            .client
            .post(&self.refresh_url)
            .json(&RenewalRequest { refresh_token })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RenewalError::Rejected { status, body });
        }

        Ok(resp.json::<CredentialPair>().await?)
    }
}

impl Renewer for HttpRenewer {
    fn renew(
        &self,
        refresh_token: String,
    ) -> Pin<Box<dyn Future<Output = Result<CredentialPair, RenewalError>> + Send + '_>> {
        Box::pin(async move { self.exchange(&refresh_token).await })
    }
}

#[cfg(test)]
#[path = "renewal_tests.rs"]
mod tests;
