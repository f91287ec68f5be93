//! Connection state machine for the vMix output.
//!
//! Transitions are a pure function of the current state and an event; the
//! returned [`Effect`]s are carried out by [`super::OutputChannel`]. Keeping
//! the table here makes every reconnect rule testable without a socket.
//!
//! ```text
//!                 ConnectRequested
//!  Disconnected ────────────────────► Connecting ◄──┐ ConnectFailed / Errored
//!       ▲                                  │        │ (new attempt, no backoff)
//!       │ ClosedByRemote / Destroyed       │ Connected
//!       │                                  ▼        │
//!       └─────────────────────────────── Ready ─────┘
//!
//!  any ── Shutdown ──► Closing (terminal)
//! ```

use crate::output::ChannelTarget;

/// Lifecycle of the single output connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No usable connection.
    #[default]
    Disconnected,
    /// A connect attempt is outstanding.
    Connecting,
    /// Connected; commands can be written.
    Ready,
    /// Shut down locally. Never left.
    Closing,
}

/// Something that happened to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `ready()` or `send()` wants a connection.
    ConnectRequested,
    /// The outstanding connect attempt succeeded.
    Connected,
    /// The outstanding connect attempt failed.
    ConnectFailed(String),
    /// An established socket reported an error.
    Errored(String),
    /// The remote end closed the connection cleanly.
    ClosedByRemote,
    /// The socket was found unusable while sending.
    Destroyed,
    /// Local shutdown.
    Shutdown,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue a new connect attempt, replacing any current socket.
    StartConnect,
    /// Wake every `ready()` waiter.
    ResolveWaiters,
    /// Drop the socket and stop its tasks.
    ReleaseSocket,
    /// Log a line on the frontend.
    Report(String),
}

/// Compute the next state and its effects.
pub fn transition(
    state: ConnectionState,
    event: Event,
    target: &ChannelTarget,
) -> (ConnectionState, Vec<Effect>) {
    use ConnectionState::{Closing, Connecting, Disconnected, Ready};

    match (state, event) {
        (Closing, _) => (Closing, Vec::new()),

        (_, Event::Shutdown) => (
            Closing,
            vec![
                Effect::ReleaseSocket,
                Effect::Report(format!("Closed connection to {}", target.address())),
            ],
        ),

        (Disconnected, Event::ConnectRequested) => (
            Connecting,
            vec![
                Effect::Report(format!("Connecting to {}", target.address())),
                Effect::StartConnect,
            ],
        ),

        (Connecting, Event::Connected) => (
            Ready,
            vec![
                Effect::Report(format!("Connected to {}", target.address())),
                Effect::ResolveWaiters,
            ],
        ),

        // The failed attempt is over, so nothing is outstanding: retry now.
        (Connecting, Event::ConnectFailed(err)) => (
            Connecting,
            vec![
                Effect::Report(format!(
                    "Connection to {} failed: {}. Retrying.",
                    target.address(),
                    err
                )),
                Effect::StartConnect,
            ],
        ),

        (Ready, Event::Errored(err)) => (
            Connecting,
            vec![
                Effect::Report(format!(
                    "Connection to {} errored: {}. Reconnecting.",
                    target.address(),
                    err
                )),
                Effect::StartConnect,
            ],
        ),

        // An attempt is already outstanding.
        (Connecting, Event::Errored(err)) => (
            Connecting,
            vec![Effect::Report(format!(
                "Connection to {} errored: {}",
                target.address(),
                err
            ))],
        ),

        (Ready, Event::ClosedByRemote) => (
            Disconnected,
            vec![Effect::Report("Connection closed by remote side.".to_string())],
        ),

        (Ready, Event::Destroyed) => (
            Disconnected,
            vec![Effect::Report("Connection closed".to_string())],
        ),

        (state, _) => (state, Vec::new()),
    }
}
