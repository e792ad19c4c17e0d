//! The host set: one persistent TCP connection per camera controller.
//!
//! Each controller host is a separate physical machine running the camerad
//! daemon.  The client keeps an ordered set of them, opens a stream
//! connection per host, and broadcasts every command to all open hosts (see
//! [`super::broadcast`]).
//!
//! Connection handles are split into read/write halves on open.  The write
//! half sits behind an `Arc<Mutex<…>>` so the broadcast layer can hand it to
//! a per-host transmit task; the read half stays with the set and is only
//! touched by the sequential read phase.  Broadcast calls on one `HostSet`
//! are serialized by the `&mut` borrow — there is no internal locking beyond
//! the writer mutex.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors that can occur while opening controller connections.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The TCP connection attempt to one host failed.  Hosts opened before
    /// the failure keep their connections (no rollback).
    #[error("failed to connect to {name} at {address}:{port}: {source}")]
    Connect {
        name: String,
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    /// A host name was requested that is not in the configured set.
    #[error("unknown host name: {0}")]
    UnknownHost(String),
}

/// Static identity of one controller host, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub name: String,
    pub address: String,
    pub port: u16,
}

/// Live connection to one host: the split halves of its TCP stream.
pub(crate) struct HostLink {
    pub(crate) writer: Arc<Mutex<OwnedWriteHalf>>,
    pub(crate) reader: OwnedReadHalf,
}

/// One controller host: identity plus, while open, its connection.
pub struct Host {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub(crate) link: Option<HostLink>,
}

impl Host {
    fn from_entry(entry: HostEntry) -> Self {
        Self {
            name: entry.name,
            address: entry.address,
            port: entry.port,
            link: None,
        }
    }

    /// True while this host holds a live connection and is therefore
    /// eligible for dispatch.
    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }
}

/// Ordered collection of controller hosts, keyed by name.
///
/// The open-connection count is derived from the hosts themselves, so it is
/// equal to the number of live links by construction.
#[derive(Default)]
pub struct HostSet {
    pub(crate) hosts: Vec<Host>,
}

impl HostSet {
    pub fn new(entries: Vec<HostEntry>) -> Self {
        Self {
            hosts: entries.into_iter().map(Host::from_entry).collect(),
        }
    }

    /// Opens a stream connection to each named host (or to every configured
    /// host when `names` is `None`).  Hosts that are already open are left
    /// alone.
    ///
    /// All connection attempts are made; successfully opened hosts are
    /// retained even when a later attempt fails, and the first failure is
    /// returned.  The caller decides whether to proceed with a partial set.
    pub async fn open(&mut self, names: Option<&[String]>) -> Result<(), ConnectionError> {
        if let Some(names) = names {
            for name in names {
                if !self.hosts.iter().any(|h| &h.name == name) {
                    return Err(ConnectionError::UnknownHost(name.clone()));
                }
            }
        }

        let mut first_failure = None;
        for host in &mut self.hosts {
            let selected = names.map_or(true, |names| names.iter().any(|n| n == &host.name));
            if !selected || host.is_open() {
                continue;
            }
            debug!("connecting to {}: {}:{}", host.name, host.address, host.port);
            match TcpStream::connect((host.address.as_str(), host.port)).await {
                Ok(stream) => {
                    let (reader, writer) = stream.into_split();
                    host.link = Some(HostLink {
                        writer: Arc::new(Mutex::new(writer)),
                        reader,
                    });
                    info!("connected to {}", host.name);
                }
                Err(source) => {
                    warn!("could not connect to {}: {source}", host.name);
                    if first_failure.is_none() {
                        first_failure = Some(ConnectionError::Connect {
                            name: host.name.clone(),
                            address: host.address.clone(),
                            port: host.port,
                            source,
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Releases every connection handle unconditionally.  Subsequent
    /// broadcasts fail fast with `NoConnection`.
    pub fn drop_links(&mut self) {
        for host in &mut self.hosts {
            if host.link.take().is_some() {
                debug!("closing connection to {}", host.name);
            }
        }
    }

    /// Drops the link of the host at `index`, used by the broadcast layer
    /// when a transmit on that connection failed.
    pub(crate) fn drop_link_at(&mut self, index: usize) {
        if let Some(host) = self.hosts.get_mut(index) {
            if host.link.take().is_some() {
                warn!("dropping connection to {} after send failure", host.name);
            }
        }
    }

    /// Number of hosts currently holding a live connection.
    pub fn open_count(&self) -> usize {
        self.hosts.iter().filter(|h| h.is_open()).count()
    }

    /// True when no host is open.
    pub fn is_empty(&self) -> bool {
        self.open_count() == 0
    }

    /// All configured hosts, open or not, in configuration order.
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
