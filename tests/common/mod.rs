//! Integration test common infrastructure.
//!
//! Provides a recording transport/roster pair and an engine factory wired
//! for deterministic assertions: zero batching interval and one stanza per
//! queued line, so every reply shows up as its own `(to, body)` record.

#![allow(dead_code)]

use async_trait::async_trait;
use partylined::config::Config;
use partylined::error::TransportError;
use partylined::transport::{ChatTransport, MessageStanza, Roster};
use partylined::ChatEngine;
use std::sync::{Arc, Mutex};

/// Records every outbound chat stanza.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    /// Everything sent so far, in delivery order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Bodies delivered to one recipient, in delivery order.
    pub fn sent_to(&self, jid: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == jid)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_chat(&self, to: &str, body: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// Records accepted subscription requests.
#[derive(Default)]
pub struct MockRoster {
    accepted: Mutex<Vec<String>>,
}

impl MockRoster {
    pub fn accepted(&self) -> Vec<String> {
        self.accepted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Roster for MockRoster {
    async fn accept_subscription(&self, jid: &str) -> Result<(), TransportError> {
        self.accepted.lock().unwrap().push(jid.to_string());
        Ok(())
    }
}

/// An engine wired to mocks, with its state file in a scratch directory.
pub struct TestEngine {
    pub engine: Arc<ChatEngine>,
    pub transport: Arc<MockTransport>,
    pub roster: Arc<MockRoster>,
    pub config: Config,
    _dir: tempfile::TempDir,
}

impl TestEngine {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.state.file = dir.path().join("state.yaml");
        config.batch.interval_ms = 0;
        config.batch.separate_messages = true;
        Self::start_with(config, dir)
    }

    fn start_with(config: Config, dir: tempfile::TempDir) -> Self {
        let transport = Arc::new(MockTransport::default());
        let roster = Arc::new(MockRoster::default());
        let engine = ChatEngine::start(&config, transport.clone(), roster.clone())
            .expect("engine starts");
        Self {
            engine,
            transport,
            roster,
            config,
            _dir: dir,
        }
    }

    /// Start a second engine over the same state file, as a restart would.
    pub fn reopen(&self) -> (Arc<ChatEngine>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        let roster = Arc::new(MockRoster::default());
        let engine = ChatEngine::start(&self.config, transport.clone(), roster)
            .expect("engine restarts");
        (engine, transport)
    }

    /// Deliver a chat body from `jid` and wait for outbound traffic to
    /// drain.
    pub async fn say(&self, jid: &str, body: &str) {
        self.engine.handle_message(&MessageStanza::chat(jid, body));
        self.engine.batcher().wait_until_drained().await;
    }

    pub fn received(&self, jid: &str) -> Vec<String> {
        self.transport.sent_to(jid)
    }

    pub fn clear(&self) {
        self.transport.clear();
    }
}
