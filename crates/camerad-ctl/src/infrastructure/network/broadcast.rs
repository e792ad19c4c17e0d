//! The command broadcast engine.
//!
//! One broadcast sends a single command line to every open host and reduces
//! the per-host replies to one outcome.  The phases are strictly ordered:
//!
//! 1. Snapshot the open hosts.
//! 2. Transmit the line to each host concurrently (one task per host).
//! 3. Join every transmit task — the barrier.  No reply is read until every
//!    command has been sent, so a fast host's reply cannot race a slow
//!    host's still-in-flight command.
//! 4. Read each host's reply in turn under a fixed inactivity timeout.
//! 5. Compare first tokens: all equal is success, anything else is failure.
//!
//! Reads are sequential on purpose even though sends are parallel: it keeps
//! the host↔reply correlation trivial and bounds total blocking time at
//! N × [`READ_TIMEOUT`].  Callers that need a tighter worst case would have
//! to parallelize the read phase as well.
//!
//! A transmit failure on one host is logged and does not abort the others;
//! that host's link is dropped after the barrier and its missing reply fails
//! the reduction.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use camerad_core::{Command, ReplyBuffer};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::hosts::HostSet;

/// Per-host inactivity timeout during the read phase.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// The reduced result of one host for one broadcast.  `token` is `None`
/// when the host produced no parsable reply (timeout, closed connection, or
/// failed transmit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReply {
    pub host: String,
    pub token: Option<String>,
}

fn token_list(replies: &[HostReply]) -> String {
    let tokens: Vec<&str> = replies
        .iter()
        .map(|r| r.token.as_deref().unwrap_or("<none>"))
        .collect();
    tokens.join(", ")
}

/// Errors produced by [`Broadcaster::send`].
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The host set has no open connections; nothing was sent.
    #[error("no connected hosts")]
    NoConnection,
    /// At least one host produced no terminal reply within the timeout.
    #[error("missing reply from one or more hosts: {}", token_list(.0))]
    NoReply(Vec<HostReply>),
    /// The hosts answered, but not all with the same value.  Carries every
    /// per-host token so the caller can see exactly who disagreed.
    #[error("hosts returned different values: {}", token_list(.0))]
    Disagreement(Vec<HostReply>),
}

impl BroadcastError {
    /// The per-host replies behind a failed reduction, if any.
    pub fn replies(&self) -> Option<&[HostReply]> {
        match self {
            BroadcastError::NoConnection => None,
            BroadcastError::NoReply(r) | BroadcastError::Disagreement(r) => Some(r),
        }
    }
}

/// Dispatches command lines to every open host of a [`HostSet`].
///
/// The broadcaster itself is stateless apart from its read timeout; it
/// borrows the host set mutably for the duration of one call, which also
/// serializes broadcasts on the same set.
pub struct Broadcaster {
    read_timeout: Duration,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self {
            read_timeout: READ_TIMEOUT,
        }
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the per-host read timeout.  Tests use this to avoid
    /// waiting the full 10 s on a deliberately silent mock host.
    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }

    /// Broadcasts `command` to every open host and reduces the replies.
    ///
    /// On success returns the token shared by all hosts.
    ///
    /// # Errors
    ///
    /// - [`BroadcastError::NoConnection`] when no host is open (checked
    ///   before any I/O).
    /// - [`BroadcastError::NoReply`] when a host yields no parsable reply.
    /// - [`BroadcastError::Disagreement`] when hosts return different
    ///   values.
    pub async fn send(
        &self,
        hosts: &mut HostSet,
        command: &Command,
    ) -> Result<String, BroadcastError> {
        if hosts.is_empty() {
            return Err(BroadcastError::NoConnection);
        }

        let line = command.to_line();
        debug!("broadcasting '{command}' to {} host(s)", hosts.open_count());

        // Phase 1: snapshot the open hosts at call time.
        let snapshot: Vec<usize> = hosts
            .hosts
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_open())
            .map(|(i, _)| i)
            .collect();

        // Phase 2: concurrent transmit, one task per host.
        let mut transmits: JoinSet<(usize, std::io::Result<()>)> = JoinSet::new();
        for &index in &snapshot {
            let host = &hosts.hosts[index];
            let Some(link) = host.link.as_ref() else {
                continue;
            };
            let writer = Arc::clone(&link.writer);
            let bytes = line.clone().into_bytes();
            transmits.spawn(async move {
                let mut writer = writer.lock().await;
                (index, writer.write_all(&bytes).await)
            });
        }

        // Phase 3: the barrier.  Every send completes (or fails) before any
        // read begins.
        let mut failed = Vec::new();
        while let Some(joined) = transmits.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((index, Err(e))) => {
                    warn!(
                        "unable to send command to {}: {e}; host may be down",
                        hosts.hosts[index].name
                    );
                    failed.push(index);
                }
                Err(e) => warn!("transmit task failed: {e}"),
            }
        }
        for index in failed {
            hosts.drop_link_at(index);
        }

        // Phase 4: sequential timed reads, in snapshot order.
        let mut replies = Vec::with_capacity(snapshot.len());
        for &index in &snapshot {
            let host = &mut hosts.hosts[index];
            let name = host.name.clone();
            let mut reply = ReplyBuffer::new();

            if let Some(link) = host.link.as_mut() {
                let mut buf = [0u8; 1024];
                loop {
                    match timeout(self.read_timeout, link.reader.read(&mut buf)).await {
                        Err(_elapsed) => {
                            warn!("read timeout waiting for {name}");
                            break;
                        }
                        Ok(Ok(0)) => {
                            warn!("connection to {name} closed mid-reply");
                            break;
                        }
                        Ok(Ok(n)) => {
                            let fragment = String::from_utf8_lossy(&buf[..n]).into_owned();
                            if reply.push(fragment) {
                                break;
                            }
                        }
                        Ok(Err(e)) => {
                            warn!("read error on {name}: {e}");
                            break;
                        }
                    }
                }
            }

            if reply.is_complete() {
                debug!("{name} complete");
            }
            replies.push(HostReply {
                host: name,
                token: reply.token().map(str::to_string),
            });
        }

        // Phase 5: reduce.
        let Some(first) = replies.first().and_then(|r| r.token.clone()) else {
            return Err(BroadcastError::NoReply(replies));
        };
        if replies.iter().any(|r| r.token.is_none()) {
            return Err(BroadcastError::NoReply(replies));
        }
        if replies
            .iter()
            .all(|r| r.token.as_deref() == Some(first.as_str()))
        {
            Ok(first)
        } else {
            Err(BroadcastError::Disagreement(replies))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(host: &str, token: Option<&str>) -> HostReply {
        HostReply {
            host: host.to_string(),
            token: token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_send_with_no_open_hosts_fails_fast() {
        let mut hosts = HostSet::new(Vec::new());
        let result = Broadcaster::new()
            .send(&mut hosts, &Command::new("open"))
            .await;
        assert!(matches!(result, Err(BroadcastError::NoConnection)));
    }

    #[test]
    fn test_disagreement_message_lists_every_token() {
        let err = BroadcastError::Disagreement(vec![
            reply("camera1", Some("DONE")),
            reply("camera2", Some("ERROR")),
        ]);
        assert_eq!(
            err.to_string(),
            "hosts returned different values: DONE, ERROR"
        );
    }

    #[test]
    fn test_no_reply_message_marks_missing_tokens() {
        let err = BroadcastError::NoReply(vec![
            reply("camera1", Some("DONE")),
            reply("camera2", None),
        ]);
        assert_eq!(
            err.to_string(),
            "missing reply from one or more hosts: DONE, <none>"
        );
    }

    #[test]
    fn test_replies_accessor_covers_failure_variants() {
        assert!(BroadcastError::NoConnection.replies().is_none());
        let err = BroadcastError::NoReply(vec![reply("camera1", None)]);
        assert_eq!(err.replies().map(<[HostReply]>::len), Some(1));
    }
}
