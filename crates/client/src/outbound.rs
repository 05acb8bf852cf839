// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound stamping: attach the current access credential to a request.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder};

use crate::store::CredentialStore;

/// Everything needed to send (and later replay) one request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the client's base URL, e.g. `/posts/3`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: HeaderMap::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body and content type.
    pub fn with_json<T: serde::Serialize + ?Sized>(mut self, body: &T) -> serde_json::Result<Self> {
        let bytes = serde_json::to_vec(body)?;
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }
}

/// A request ready to send, plus the access credential it carries.
pub struct Stamped {
    pub builder: RequestBuilder,
    pub access_token: Option<String>,
}

/// Builds requests against a base URL, stamping each with the stored access
/// credential when one exists.
pub struct Outbound {
    client: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
}

impl Outbound {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url, store }
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}{}", self.base_url, path)
    }

    /// Read the store afresh and build the request. Without a credential the
    /// request goes out unmodified.
    pub fn stamp(&self, req: &RequestDescriptor) -> Stamped {
        let mut builder = self
            .client
            .request(req.method.clone(), self.url(&req.path))
            .headers(req.headers.clone());
        if let Some(ref body) = req.body {
            builder = builder.body(body.clone());
        }

        let access_token = self.store.access_token();
        if let Some(ref token) = access_token {
            builder = builder.bearer_auth(token);
        }
        Stamped { builder, access_token }
    }
}

#[cfg(test)]
#[path = "outbound_tests.rs"]
mod tests;
