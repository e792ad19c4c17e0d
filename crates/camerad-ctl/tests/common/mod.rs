//! Shared test support: an in-process stand-in for one camerad controller
//! daemon.
//!
//! A [`MockController`] listens on an ephemeral loopback port, accepts one
//! connection, records every request line it receives, and answers each
//! line with a fixed scripted reply (or stays silent to provoke the read
//! timeout).

#![allow(dead_code)]

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use camerad_ctl::infrastructure::network::HostEntry;

pub struct MockController {
    name: String,
    address: String,
    port: u16,
    lines: Arc<Mutex<Vec<String>>>,
}

impl MockController {
    /// Starts a controller that answers every request line with `reply`
    /// (include the trailing newline in `reply` if one is wanted).
    pub async fn start(name: &str, reply: &'static str) -> Self {
        Self::spawn(name, Some(reply)).await
    }

    /// Starts a controller that records requests but never answers, so the
    /// client's read phase times out.
    pub async fn silent(name: &str) -> Self {
        Self::spawn(name, None).await
    }

    /// Starts a controller that writes an interim `preamble` fragment, waits
    /// long enough for the client to read it separately, then answers with
    /// `reply`.
    pub async fn chatty(name: &str, preamble: &'static str, reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock controller");
        let addr = listener.local_addr().expect("local addr");
        let lines = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&lines);
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                recorded.lock().await.push(line);
                if write_half.write_all(preamble.as_bytes()).await.is_err() {
                    break;
                }
                let _ = write_half.flush().await;
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                if write_half.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        Self {
            name: name.to_string(),
            address: addr.ip().to_string(),
            port: addr.port(),
            lines,
        }
    }

    async fn spawn(name: &str, reply: Option<&'static str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock controller");
        let addr = listener.local_addr().expect("local addr");
        let lines = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&lines);
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                recorded.lock().await.push(line);
                if let Some(reply) = reply {
                    if write_half.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            name: name.to_string(),
            address: addr.ip().to_string(),
            port: addr.port(),
            lines,
        }
    }

    /// The host entry pointing a client at this mock.
    pub fn entry(&self) -> HostEntry {
        HostEntry {
            name: self.name.clone(),
            address: self.address.clone(),
            port: self.port,
        }
    }

    /// Every request line received so far, newline included.
    pub async fn lines(&self) -> Vec<String> {
        self.lines.lock().await.clone()
    }
}

/// Host entries for a batch of mocks, in the given order.
pub fn entries(mocks: &[&MockController]) -> Vec<HostEntry> {
    mocks.iter().map(|m| m.entry()).collect()
}
