// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`SessionClient`](crate::client::SessionClient).
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the token-protected service.
    #[arg(long, default_value = "http://127.0.0.1:3000", env = "TOKENRELAY_BASE_URL")]
    pub base_url: String,

    /// Path of the renewal exchange, relative to the base URL.
    #[arg(long, default_value = "/auth/refresh", env = "TOKENRELAY_REFRESH_PATH")]
    pub refresh_path: String,

    /// Unauthenticated entry point announced on teardown.
    #[arg(long, default_value = "/login", env = "TOKENRELAY_ENTRY_POINT")]
    pub entry_point: String,

    /// Credential file. Defaults to `credentials.json` in the state directory.
    #[arg(long, env = "TOKENRELAY_CREDENTIAL_FILE")]
    pub credential_file: Option<PathBuf>,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 30000, env = "TOKENRELAY_TIMEOUT_MS")]
    pub timeout_ms: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: "/auth/refresh".to_owned(),
            entry_point: "/login".to_owned(),
            credential_file: None,
            timeout_ms: 30000,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn refresh_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.refresh_path)
    }

    pub fn credential_file(&self) -> PathBuf {
        self.credential_file.clone().unwrap_or_else(|| state_dir().join("credentials.json"))
    }
}

/// Resolve the state directory.
///
/// Checks `TOKENRELAY_STATE_DIR`, then `$XDG_STATE_HOME/tokenrelay`,
/// then `$HOME/.local/state/tokenrelay`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TOKENRELAY_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("tokenrelay");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/tokenrelay");
    }
    PathBuf::from(".tokenrelay")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
