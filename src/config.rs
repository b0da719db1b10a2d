//! Configuration loading and management.
//!
//! Structured TOML configuration for the daemon: the bot account credentials
//! file, outbound batching knobs, and state persistence knobs. Every field
//! has a serde default so a missing section falls back to sane values.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("malformed credentials file: expected a single \"jid password\" line")]
    Credentials,
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Bot account settings.
    #[serde(default)]
    pub xmpp: XmppConfig,
    /// Outbound batching settings.
    #[serde(default)]
    pub batch: BatchConfig,
    /// State persistence settings.
    #[serde(default)]
    pub state: StateConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Bot account settings.
#[derive(Debug, Clone, Deserialize)]
pub struct XmppConfig {
    /// File holding a single `jid password` line.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
}

impl Default for XmppConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
        }
    }
}

/// Outbound batching settings.
///
/// XMPP servers rate-limit aggressive senders, so outbound lines are queued
/// per recipient and flushed at most once per interval.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Minimum spacing between flush bursts, in milliseconds.
    #[serde(default = "default_batch_interval_ms")]
    pub interval_ms: u64,
    /// Emit one stanza per queued line instead of newline-joining each
    /// recipient's backlog into a single stanza.
    #[serde(default)]
    pub separate_messages: bool,
}

impl BatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_batch_interval_ms(),
            separate_messages: false,
        }
    }
}

/// State persistence settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Snapshot file. Written via temp-file-plus-rename, mode 0600.
    #[serde(default = "default_state_file")]
    pub file: PathBuf,
    /// Minimum spacing between snapshot writes, in seconds.
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
}

impl StateConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: default_state_file(),
            save_interval_secs: default_save_interval_secs(),
        }
    }
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials")
}

fn default_batch_interval_ms() -> u64 {
    1000
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state.yaml")
}

fn default_save_interval_secs() -> u64 {
    10
}

/// Bot account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub jid: String,
    pub password: String,
}

impl Credentials {
    /// Read credentials from a file holding a single `jid password` line.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut fields = content.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(jid), Some(password), None) => Ok(Self {
                jid: jid.to_string(),
                password: password.to_string(),
            }),
            _ => Err(ConfigError::Credentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = toml::from_str("").expect("empty config parses");
        assert_eq!(config.batch.interval_ms, 1000);
        assert!(!config.batch.separate_messages);
        assert_eq!(config.state.save_interval_secs, 10);
        assert_eq!(config.state.file, PathBuf::from("state.yaml"));
    }

    #[test]
    fn sections_override_defaults() {
        let doc = r#"
[batch]
interval_ms = 0
separate_messages = true

[state]
file = "/var/lib/partylined/state.yaml"
save_interval_secs = 30
"#;
        let config: Config = toml::from_str(doc).expect("config parses");
        assert_eq!(config.batch.interval_ms, 0);
        assert!(config.batch.separate_messages);
        assert_eq!(config.state.save_interval_secs, 30);
    }

    #[test]
    fn credentials_single_line() {
        let creds = Credentials::parse("bot@example.com hunter2\n").expect("parses");
        assert_eq!(creds.jid, "bot@example.com");
        assert_eq!(creds.password, "hunter2");
    }

    #[test]
    fn credentials_reject_malformed() {
        assert!(Credentials::parse("").is_err());
        assert!(Credentials::parse("only-a-jid").is_err());
        assert!(Credentials::parse("jid password extra").is_err());
    }
}
