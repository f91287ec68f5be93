//! Polaris Bridge - forwards a Daktronics-style Polaris timing console's
//! clock to a vMix title.
//!
//! The console streams delimiter-terminated ASCII readings over a serial
//! line. Each reading is shown locally; whenever the value changes it is
//! written to vMix as a `SetText` command over the vMix TCP API. The link
//! to vMix heals itself: failed connects are retried and a lost connection
//! is re-established on the next change.
//!
//! # Architecture
//!
//! ```text
//!  SerialDevice ─┐                                   ┌─► TCP ─► vMix
//!                ├─► RawInput ─► ReadingStream ─► Bridge
//!  TestData ─────┘                                   └─► Frontend
//! ```
//!
//! One async task runs the [`bridge::Bridge`] loop; only the serial reader
//! lives on its own thread because serial I/O is blocking.
//!
//! # Modules
//!
//! - [`input`] - timer sources (serial console, test generator)
//! - [`framing`] - delimiter framing of raw input into readings
//! - [`detector`] - forward-on-change logic
//! - [`output`] - vMix protocol and the self-healing output channel
//! - [`frontend`] - plain, dashboard and in-memory displays
//! - [`config`] - configuration loading
//! - [`bridge`] - the loop tying it all together

pub mod bridge;
pub mod config;
pub mod detector;
pub mod framing;
pub mod frontend;
pub mod input;
pub mod output;

pub use bridge::{Bridge, StopReason};
pub use config::Config;
pub use detector::ChangeDetector;
pub use framing::{Delimiter, LineFramer, Reading, ReadingStream};
pub use frontend::{Frontend, FrontendKind};
pub use input::{DeviceSource, RawInput, SerialDevice, TestDataGenerator};
pub use output::{ChannelTarget, ConnectionState, OutputChannel, TcpConnector};
