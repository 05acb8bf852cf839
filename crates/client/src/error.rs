// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::StatusCode;

/// Failure of a call made through the session client.
///
/// `Status` carries the response exactly as the service sent it; the client
/// never rewrites one failure into another.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed ({status}): {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Drain a failed response into an error.
    pub async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Self::Status { status, body }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            Self::Json(_) => None,
        }
    }

    pub fn is_expiry(&self) -> bool {
        self.status().is_some_and(crate::inbound::is_expiry)
    }
}
