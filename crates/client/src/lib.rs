// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokenrelay: HTTP session client with single-flight credential renewal.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod inbound;
pub mod outbound;
pub mod renewal;
pub mod store;
pub mod teardown;

use std::sync::Once;

pub use client::SessionClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use events::{SessionEvent, TeardownReason};
pub use outbound::RequestDescriptor;
pub use store::{CredentialPair, CredentialStore, FileStore, MemoryStore};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
