//! Self-healing connection to the vMix TCP API.
//!
//! [`OutputChannel`] owns the single output socket. Connect attempts and
//! socket I/O run as background tasks, which report back through an event
//! queue; the owner of the channel feeds those events to
//! [`OutputChannel::handle`] from its own loop. All state changes therefore
//! happen on the caller's task, one event at a time, without locks.
//!
//! # Tasks per connection
//!
//! ```text
//! connect task ──Connected(stream)/ConnectFailed──┐
//! read task   ──ClosedByRemote/Errored────────────┼──► event queue ──► handle()
//! write task  ──Errored───────────────────────────┘
//! ```
//!
//! Each attempt gets a new generation number. Events from an older
//! generation are stale and dropped.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::connector::Connector;
use super::state::{transition, ConnectionState, Effect, Event};
use super::{ChannelTarget, OverlaySink};
use crate::frontend::Frontend;

/// Raw report from a connection task.
#[derive(Debug)]
pub enum LinkEvent<S> {
    /// Connect attempt succeeded.
    Connected(S),
    /// Connect attempt failed.
    ConnectFailed(std::io::Error),
    /// Read or write on an established socket failed.
    Errored(std::io::Error),
    /// Remote side closed the socket.
    ClosedByRemote,
}

/// A [`LinkEvent`] tagged with the connection generation that produced it.
#[derive(Debug)]
pub struct ChannelEvent<S> {
    generation: u64,
    event: LinkEvent<S>,
}

/// The current socket, from connect attempt until replaced or released.
#[derive(Debug)]
struct Link {
    /// Queue into the write task; set once connected.
    writer: Option<UnboundedSender<Vec<u8>>>,
    /// Connect and read tasks.
    tasks: Vec<JoinHandle<()>>,
}

impl Link {
    /// Stop the connect and read tasks. Dropping the writer lets the write
    /// task flush what was already queued, then close its half.
    fn release(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Output channel to one vMix title field.
pub struct OutputChannel<C: Connector> {
    target: ChannelTarget,
    connector: Arc<C>,
    state: ConnectionState,
    link: Option<Link>,
    generation: u64,
    waiters: Vec<oneshot::Sender<()>>,
    events_tx: UnboundedSender<ChannelEvent<C::Stream>>,
    events_rx: UnboundedReceiver<ChannelEvent<C::Stream>>,
}

impl<C: Connector> std::fmt::Debug for OutputChannel<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputChannel")
            .field("target", &self.target)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> OutputChannel<C> {
    /// Create a channel. Nothing connects until [`Self::ready`] is called.
    pub fn new(target: ChannelTarget, connector: C) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            target,
            connector: Arc::new(connector),
            state: ConnectionState::Disconnected,
            link: None,
            generation: 0,
            waiters: Vec::new(),
            events_tx,
            events_rx,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Where this channel sends.
    pub fn target(&self) -> &ChannelTarget {
        &self.target
    }

    /// Request a connection and get notified once it is ready.
    ///
    /// The receiver completes when the state reaches `Ready`, immediately if
    /// it already is. It only completes while the owner keeps feeding
    /// [`Self::next_event`] into [`Self::handle`]. After shutdown the sender
    /// is dropped and the receiver yields an error.
    pub fn ready(&mut self, frontend: &mut dyn Frontend) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();

        match self.state {
            ConnectionState::Ready => {
                let _ = tx.send(());
            }
            ConnectionState::Closing => {}
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                self.waiters.push(tx);
                self.apply(Event::ConnectRequested, frontend);
            }
        }

        rx
    }

    /// Wait for the next report from a connection task.
    pub async fn next_event(&mut self) -> Option<ChannelEvent<C::Stream>> {
        self.events_rx.recv().await
    }

    /// Apply a report from a connection task.
    pub fn handle(&mut self, event: ChannelEvent<C::Stream>, frontend: &mut dyn Frontend) {
        if event.generation != self.generation {
            log::debug!(
                "[Output] Ignoring stale event from generation {} (current {})",
                event.generation,
                self.generation
            );
            return;
        }

        match event.event {
            LinkEvent::Connected(stream) => {
                if self.state != ConnectionState::Connecting {
                    return;
                }
                self.attach(stream);
                self.apply(Event::Connected, frontend);
            }
            LinkEvent::ConnectFailed(e) => {
                log::warn!("[Output] Connect to {} failed: {e}", self.target.address());
                self.apply(Event::ConnectFailed(e.to_string()), frontend);
            }
            LinkEvent::Errored(e) => {
                log::warn!("[Output] Socket error on {}: {e}", self.target.address());
                self.apply(Event::Errored(e.to_string()), frontend);
            }
            LinkEvent::ClosedByRemote => {
                log::info!("[Output] {} closed the connection", self.target.address());
                self.apply(Event::ClosedByRemote, frontend);
            }
        }
    }

    /// Send one overlay update. Never blocks and never fails; problems are
    /// reported on the frontend and the value is dropped.
    pub fn send(&mut self, value: &str, frontend: &mut dyn Frontend) {
        let Some(link) = &self.link else {
            frontend.add_log("No client");
            return;
        };

        match self.state {
            ConnectionState::Ready => {
                let command = self.target.set_text_command(value);
                let written = link
                    .writer
                    .as_ref()
                    .is_some_and(|writer| writer.send(command.into_bytes()).is_ok());

                if written {
                    frontend.set_remote_time(value);
                } else {
                    self.apply(Event::Destroyed, frontend);
                    self.reconnect_destroyed(frontend);
                }
            }
            ConnectionState::Disconnected => self.reconnect_destroyed(frontend),
            ConnectionState::Connecting => {
                frontend.add_log(&format!(
                    "Unable to set title to {}. Connection to vMix {} not ready.",
                    value, self.target
                ));
            }
            ConnectionState::Closing => frontend.add_log("No client"),
        }
    }

    /// Shut the channel down for good.
    pub fn shutdown(&mut self, frontend: &mut dyn Frontend) {
        self.apply(Event::Shutdown, frontend);
    }

    fn reconnect_destroyed(&mut self, frontend: &mut dyn Frontend) {
        frontend.add_log("The client was destroyed. Reconnecting.");
        self.release_link();
        self.apply(Event::ConnectRequested, frontend);
    }

    fn apply(&mut self, event: Event, frontend: &mut dyn Frontend) {
        let (next, effects) = transition(self.state, event, &self.target);
        if next != self.state {
            log::debug!("[Output] {:?} -> {:?}", self.state, next);
        }
        self.state = next;

        for effect in effects {
            match effect {
                Effect::StartConnect => self.start_connect(),
                Effect::ResolveWaiters => {
                    for waiter in self.waiters.drain(..) {
                        let _ = waiter.send(());
                    }
                }
                Effect::ReleaseSocket => {
                    self.release_link();
                    self.waiters.clear();
                }
                Effect::Report(text) => frontend.add_log(&text),
            }
        }
    }

    fn release_link(&mut self) {
        if let Some(link) = self.link.take() {
            link.release();
        }
    }

    /// Spawn a connect attempt as a new generation.
    fn start_connect(&mut self) {
        self.release_link();
        self.generation += 1;

        let generation = self.generation;
        let connector = Arc::clone(&self.connector);
        let host = self.target.host.clone();
        let port = self.target.port;
        let events_tx = self.events_tx.clone();

        log::info!("[Output] Connect attempt {} to {}:{}", generation, host, port);

        let task = tokio::spawn(async move {
            let event = match connector.connect(&host, port).await {
                Ok(stream) => LinkEvent::Connected(stream),
                Err(e) => LinkEvent::ConnectFailed(e),
            };
            let _ = events_tx.send(ChannelEvent { generation, event });
        });

        self.link = Some(Link {
            writer: None,
            tasks: vec![task],
        });
    }

    /// Start read and write tasks for a freshly connected stream.
    fn attach(&mut self, stream: C::Stream) {
        let (reader, writer) = tokio::io::split(stream);
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let generation = self.generation;

        let read_task = tokio::spawn(Self::read_loop(generation, reader, self.events_tx.clone()));
        // Detached: ends once the queue is dropped and drained, or on error.
        tokio::spawn(Self::write_loop(
            generation,
            writer,
            frame_rx,
            self.events_tx.clone(),
        ));

        let link = self.link.get_or_insert_with(|| Link {
            writer: None,
            tasks: Vec::new(),
        });
        link.writer = Some(frame_tx);
        link.tasks.push(read_task);
    }

    /// Read loop: vMix replies are discarded; only EOF and errors matter.
    async fn read_loop(
        generation: u64,
        mut reader: ReadHalf<C::Stream>,
        events_tx: UnboundedSender<ChannelEvent<C::Stream>>,
    ) {
        let mut buf = [0u8; 4096];
        let event = loop {
            match reader.read(&mut buf).await {
                Ok(0) => break LinkEvent::ClosedByRemote,
                Ok(_) => continue,
                Err(e) => break LinkEvent::Errored(e),
            }
        };
        let _ = events_tx.send(ChannelEvent { generation, event });
    }

    /// Write loop: writes queued commands in order, then closes its half.
    async fn write_loop(
        generation: u64,
        mut writer: WriteHalf<C::Stream>,
        mut frame_rx: UnboundedReceiver<Vec<u8>>,
        events_tx: UnboundedSender<ChannelEvent<C::Stream>>,
    ) {
        while let Some(data) = frame_rx.recv().await {
            if let Err(e) = writer.write_all(&data).await {
                let _ = events_tx.send(ChannelEvent {
                    generation,
                    event: LinkEvent::Errored(e),
                });
                return;
            }
        }
        let _ = writer.shutdown().await;
    }
}

impl<C: Connector> OverlaySink for OutputChannel<C> {
    fn send(&mut self, value: &str, frontend: &mut dyn Frontend) {
        OutputChannel::send(self, value, frontend);
    }
}

impl<C: Connector> Drop for OutputChannel<C> {
    fn drop(&mut self) {
        self.release_link();
    }
}
