//! Versioned state persistence.
//!
//! A background worker waits for the version counter to move past the saved
//! mark, sleeps out the save cooldown, serializes a snapshot under the
//! state mutex, and renames a fresh temp file over the state file. Write
//! errors are logged and never roll the counter back, so the next version
//! change retries.
//!
//! The snapshot document is a human-readable YAML mapping with two
//! top-level sequences, `channels` and `users`. Channel membership is not
//! stored on the channel; it is rebuilt from each user's `channel_name` on
//! load, and channels that end up memberless are dropped.

use crate::state::engine::{ChatEngine, EngineState};
use crate::state::{Channel, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Serialized engine state.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub channels: Vec<ChannelSnapshot>,
    #[serde(default)]
    pub users: Vec<UserSnapshot>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub name: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Zero-valued scores are elided at snapshot time.
    #[serde(default)]
    pub scores: BTreeMap<String, i64>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub jid: String,
    pub nick: String,
    #[serde(default)]
    pub channel_name: Option<String>,
}

/// Build a snapshot of every serializable field, in stable order.
pub(crate) fn snapshot(state: &EngineState) -> StateSnapshot {
    let mut channels: Vec<ChannelSnapshot> = state
        .channels
        .values()
        .map(|channel| ChannelSnapshot {
            name: channel.name.clone(),
            password: channel.password.clone(),
            scores: channel
                .scores
                .iter()
                .filter(|(_, score)| **score != 0)
                .map(|(item, score)| (item.clone(), *score))
                .collect(),
        })
        .collect();
    channels.sort_by(|a, b| a.name.cmp(&b.name));

    let mut users: Vec<UserSnapshot> = state
        .users
        .values()
        .map(|user| UserSnapshot {
            jid: user.jid.clone(),
            nick: user.nick.clone(),
            channel_name: user.channel.clone(),
        })
        .collect();
    users.sort_by(|a, b| a.jid.cmp(&b.jid));

    StateSnapshot { channels, users }
}

/// Rebuild an [`EngineState`] from a snapshot.
///
/// Duplicate nicks are renamed with the same smallest-suffix rule as nick
/// invention, users naming a missing channel lose the membership, and
/// channels that end up with no members are dropped. All repairs are
/// logged; nothing short of an unparseable document rejects a snapshot.
pub(crate) fn restore(snapshot: StateSnapshot) -> EngineState {
    let mut state = EngineState::new();

    for channel in snapshot.channels {
        if state.channels.contains_key(&channel.name) {
            warn!(channel = %channel.name, "Duplicate channel in snapshot; keeping the last");
        }
        let mut restored = Channel::new(channel.name.clone(), channel.password);
        restored.scores = channel.scores;
        state.channels.insert(channel.name, restored);
    }

    for user in snapshot.users {
        if state.users.contains_key(&user.jid) {
            warn!(jid = %user.jid, "Duplicate user in snapshot; keeping the last");
            state.move_user_to_channel(&user.jid, None);
            state.users.remove(&user.jid);
        }
        let mut nick = user.nick;
        if state.nick_in_use(&nick) {
            let renamed = state.uniquify_nick(&nick, &user.jid);
            warn!(jid = %user.jid, nick = %nick, renamed = %renamed, "Duplicate nick in snapshot; renaming");
            nick = renamed;
        }
        state.users.insert(user.jid.clone(), User::new(user.jid.clone(), nick));

        if let Some(channel_name) = user.channel_name {
            if state.channels.contains_key(&channel_name) {
                state.move_user_to_channel(&user.jid, Some(&channel_name));
            } else {
                warn!(jid = %user.jid, channel = %channel_name, "User references a missing channel; clearing membership");
            }
        }
    }

    let before = state.channels.len();
    state.channels.retain(|_, channel| !channel.members.is_empty());
    let dropped = before - state.channels.len();
    if dropped > 0 {
        debug!(dropped, "Dropped memberless channels from snapshot");
    }

    // The document's content, not the counter, is what survives restarts.
    state.reset_versions();
    state
}

/// Write a snapshot document atomically: exclusive-create `{path}.tmp`
/// with mode 0600, write, fsync, rename over `path`.
pub fn write_snapshot(path: &Path, document: &str) -> std::io::Result<()> {
    let tmp_path = tmp_sibling(path);

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = match options.open(&tmp_path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            // Leftover from an interrupted save.
            std::fs::remove_file(&tmp_path)?;
            options.open(&tmp_path)?
        }
        Err(e) => return Err(e),
    };

    let written = file
        .write_all(document.as_bytes())
        .and_then(|()| file.sync_all());
    drop(file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Start the persister worker. Runs for the process lifetime.
pub(crate) fn spawn_persister(engine: Arc<ChatEngine>) {
    tokio::spawn(async move {
        let mut last_save: Option<Instant> = None;
        loop {
            // Wait for the version counter to pass the saved mark. The
            // predicate is re-checked under the lock after every wake.
            loop {
                {
                    let state = engine.state();
                    if state.is_dirty() {
                        break;
                    }
                }
                engine.dirty.notified().await;
            }

            // Cooldown between saves.
            if let Some(at) = last_save {
                let wait = engine.save_interval.saturating_sub(at.elapsed());
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
            }

            // Snapshot under the mutex; a concurrent synchronous save may
            // have beaten us to it.
            let document = match engine.serialize_if_dirty() {
                Ok(Some(document)) => document,
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "Failed to serialize state");
                    continue;
                }
            };
            last_save = Some(Instant::now());

            match write_snapshot(&engine.state_file, &document) {
                Ok(()) => {
                    debug!(path = %engine.state_file.display(), "State snapshot written")
                }
                // The saved mark already advanced; the next version change
                // retries.
                Err(e) => {
                    error!(path = %engine.state_file.display(), error = %e, "Failed to write state snapshot")
                }
            }
        }
    });
}
