// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: the only place the session's credentials live.
//!
//! The persisted record uses the well-known keys `accessToken`, `refreshToken`
//! and `user`. Each key is independently optional so a session holding an
//! access credential without a renewal credential is representable.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// An access credential and the renewal credential that can replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Everything the store persists for one session.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Cached identity of the signed-in user. Opaque to this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

/// Storage boundary for session credentials.
///
/// Implementations must make every `save` visible to the next `load`, and
/// must never fail outward: read errors look like an empty session.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> StoredSession;

    fn save(&self, session: &StoredSession);

    /// The full pair, or `None` unless both credentials are present.
    fn get(&self) -> Option<CredentialPair> {
        let session = self.load();
        Some(CredentialPair {
            access_token: session.access_token?,
            refresh_token: session.refresh_token?,
        })
    }

    /// Overwrite both credentials in one write. The identity cache is kept.
    fn set(&self, pair: &CredentialPair) {
        let mut session = self.load();
        session.access_token = Some(pair.access_token.clone());
        session.refresh_token = Some(pair.refresh_token.clone());
        self.save(&session);
    }

    fn clear(&self) {
        self.save(&StoredSession::default());
    }

    fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn identity(&self) -> Option<serde_json::Value> {
        self.load().user
    }

    fn set_identity(&self, user: serde_json::Value) {
        let mut session = self.load();
        session.user = Some(user);
        self.save(&session);
    }
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    session: RwLock<StoredSession>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: &CredentialPair) -> Self {
        let store = Self::new();
        store.set(pair);
        store
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> StoredSession {
        self.session.read().clone()
    }

    fn save(&self, session: &StoredSession) {
        *self.session.write() = session.clone();
    }

    fn set(&self, pair: &CredentialPair) {
        let mut session = self.session.write();
        session.access_token = Some(pair.access_token.clone());
        session.refresh_token = Some(pair.refresh_token.clone());
    }
}

/// JSON-file store that survives restarts.
///
/// Every `load` re-reads the file; there is no in-memory copy to go stale.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> StoredSession {
        match read_session(&self.path) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), err = %e, "no readable credentials");
                StoredSession::default()
            }
        }
    }

    fn save(&self, session: &StoredSession) {
        let result = if session.is_empty() {
            remove_session(&self.path)
        } else {
            write_session(&self.path, session)
        };
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), err = %e, "failed to persist credentials");
        }
    }
}

fn read_session(path: &Path) -> anyhow::Result<StoredSession> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write atomically (unique tmp file + rename) so a concurrent reader never
/// sees a torn file.
fn write_session(path: &Path, session: &StoredSession) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(session)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn remove_session(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
