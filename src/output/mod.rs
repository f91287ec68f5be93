//! Output side of the bridge: overlay updates to vMix.
//!
//! - [`protocol`] - target description and the `SetText` command line
//! - [`state`] - pure connection state machine
//! - [`connector`] - transport seam (TCP in production)
//! - [`channel`] - the self-healing channel that ties them together

pub mod channel;
pub mod connector;
pub mod protocol;
pub mod state;

#[cfg(test)]
pub(crate) mod fake;

pub use channel::{ChannelEvent, LinkEvent, OutputChannel};
pub use connector::{Connector, TcpConnector};
pub use protocol::ChannelTarget;
pub use state::ConnectionState;

use crate::frontend::Frontend;

/// Destination for forwarded readings.
///
/// Implemented by [`OutputChannel`]; the change detector only depends on this.
pub trait OverlaySink {
    /// Forward one value. Fire-and-forget: never blocks, never fails.
    fn send(&mut self, value: &str, frontend: &mut dyn Frontend);
}
