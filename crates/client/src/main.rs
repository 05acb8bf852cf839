// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use tokenrelay::{
    ClientConfig, CredentialPair, CredentialStore, FileStore, RequestDescriptor, SessionClient,
    SessionEvent,
};

/// Send requests to a token-protected service, renewing credentials as needed.
#[derive(Debug, Parser)]
#[command(name = "tokenrelay", version, about)]
struct Cli {
    #[command(flatten)]
    client: ClientConfig,

    /// Log format (text, json).
    #[arg(long, env = "TOKENRELAY_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TOKENRELAY_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a credential pair obtained from login.
    Seed {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        refresh_token: String,
    },
    /// Send one request and print the response body.
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE).
        method: String,
        /// Path relative to the base URL.
        path: String,
        /// JSON request body.
        #[arg(long)]
        data: Option<String>,
    },
    /// Show which credentials are stored.
    Status,
    /// Clear the stored session.
    Logout,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    tokenrelay::ensure_crypto();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("fatal: {e:#}");
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let store: Arc<dyn CredentialStore> = Arc::new(FileStore::new(cli.client.credential_file()));
    let client = SessionClient::new(&cli.client, store)?;

    match cli.command {
        Command::Seed { access_token, refresh_token } => {
            client.establish(&CredentialPair { access_token, refresh_token });
            println!("seeded");
            Ok(0)
        }
        Command::Status => {
            let session = client.store().load();
            let status = serde_json::json!({
                "access_token": session.access_token.is_some(),
                "refresh_token": session.refresh_token.is_some(),
                "user": session.user.is_some(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(0)
        }
        Command::Logout => {
            client.logout();
            println!("logged out");
            Ok(0)
        }
        Command::Request { method, path, data } => {
            let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut req = RequestDescriptor::new(method, path);
            if let Some(data) = data {
                let body: serde_json::Value = serde_json::from_str(&data)?;
                req = req.with_json(&body)?;
            }

            let mut events = client.subscribe();
            let result = client.send(req).await;
            while let Ok(event) = events.try_recv() {
                if let SessionEvent::TornDown { reason, entry_point } = event {
                    eprintln!("session ended ({reason}); sign in again at {entry_point}");
                }
            }

            match result {
                Ok(resp) => {
                    println!("{}", resp.text().await?);
                    Ok(0)
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    Ok(1)
                }
            }
        }
    }
}
