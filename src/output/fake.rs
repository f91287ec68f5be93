//! Scripted in-memory connector for channel and bridge tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use super::Connector;

/// Outcome of one connect attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    Accept,
    Refuse,
    /// Never completes; models a slow or silent endpoint.
    Hang,
}

/// Connector that follows a script, then hangs once the script runs out.
#[derive(Debug, Clone)]
pub(crate) struct FakeConnector {
    script: Arc<Mutex<VecDeque<Script>>>,
    attempts: Arc<AtomicUsize>,
    peers: mpsc::UnboundedSender<DuplexStream>,
}

impl FakeConnector {
    /// Connector plus the receiving end for the remote side of accepted links.
    pub(crate) fn new(script: &[Script]) -> (Self, mpsc::UnboundedReceiver<DuplexStream>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            script: Arc::new(Mutex::new(script.iter().copied().collect())),
            attempts: Arc::new(AtomicUsize::new(0)),
            peers,
        };
        (connector, rx)
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn attempts_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }

    pub(crate) fn push(&self, step: Script) {
        self.script.lock().unwrap().push_back(step);
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Stream = DuplexStream;

    async fn connect(&self, _host: &str, _port: u16) -> io::Result<DuplexStream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Script::Hang);

        match step {
            Script::Accept => {
                let (ours, theirs) = tokio::io::duplex(4096);
                let _ = self.peers.send(theirs);
                Ok(ours)
            }
            Script::Refuse => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
            Script::Hang => std::future::pending().await,
        }
    }
}
