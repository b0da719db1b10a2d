//! partylined - party-line group chat over XMPP.
//!
//! Boot shim around the engine: tracing, configuration, credentials, the
//! transport seam, and signal-driven shutdown. The wire XMPP client is an
//! external collaborator; this binary wires a console transport in its
//! place (stdin lines `jid body` in, stanzas printed to stdout) so the
//! daemon can be driven end-to-end without a server.

use async_trait::async_trait;
use partylined::config::{Config, Credentials};
use partylined::error::TransportError;
use partylined::transport::{ChatTransport, MessageStanza, Roster};
use partylined::ChatEngine;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Console stand-in for the injected client session: outbound chat stanzas
/// go to stdout.
struct ConsoleTransport;

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_chat(&self, to: &str, body: &str) -> Result<(), TransportError> {
        println!("-> {to}: {body}");
        Ok(())
    }
}

struct ConsoleRoster;

#[async_trait]
impl Roster for ConsoleRoster {
    async fn accept_subscription(&self, jid: &str) -> Result<(), TransportError> {
        info!(jid = %jid, "Subscription accepted");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Any fault in a background worker must take the process down rather
    // than silently dropping the worker.
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    let credentials = Credentials::load(&config.xmpp.credentials_file).map_err(|e| {
        error!(path = %config.xmpp.credentials_file.display(), error = %e, "Failed to read credentials");
        e
    })?;
    info!(jid = %credentials.jid, "Starting partylined");

    let engine = ChatEngine::start(&config, Arc::new(ConsoleTransport), Arc::new(ConsoleRoster))
        .map_err(|e| {
            error!(error = %e, "Failed to load state");
            e
        })?;

    // Feed console input into the engine in place of the wire callbacks.
    {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut lines = stdin.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Some((from, body)) = line.split_once(' ') else {
                    warn!(line = %line, "Console input needs the form: jid body");
                    continue;
                };
                engine.handle_message(&MessageStanza::chat(from, body));
            }
        });
    }

    // Park until a shutdown signal, then save synchronously and exit 0.
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT - shutting down"),
        _ = sigterm.recv() => info!("Received SIGTERM - shutting down"),
    }

    match engine.save_state_if_changed() {
        Ok(true) => info!("State saved"),
        Ok(false) => info!("State unchanged; nothing to save"),
        Err(e) => error!(error = %e, "Failed to save state during shutdown"),
    }
    Ok(())
}
