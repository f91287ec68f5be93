//! Timer data sources.
//!
//! A source is anything that can produce the console's output, either as raw
//! byte chunks that still need framing or as ready-made frames:
//!
//! - [`SerialDevice`] - the physical Polaris console on a serial port
//! - [`TestDataGenerator`] - synthetic elapsed-time frames for rehearsals
//!
//! Both hand back a [`RawInput`], which [`crate::framing::ReadingStream`]
//! turns into readings.

mod generator;
mod serial;

pub use generator::{format_elapsed, TestDataGenerator};
pub use serial::SerialDevice;

use anyhow::Result;
use tokio::sync::mpsc;

/// Channel capacity between a producer and the bridge loop.
pub const INPUT_BUFFER: usize = 256;

/// Raw output of an opened source.
#[derive(Debug)]
pub enum RawInput {
    /// Arbitrarily split byte chunks; framed on the configured delimiter.
    Chunks(mpsc::Receiver<Vec<u8>>),
    /// One event per complete frame; passed through unchanged.
    Frames(mpsc::Receiver<String>),
}

/// A producer of timer output.
///
/// Opening starts the producer; it keeps running until the returned
/// [`RawInput`] is dropped or the underlying device fails.
pub trait DeviceSource {
    /// Human readable description used in the startup log line.
    fn describe(&self) -> String;

    /// Start producing.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened at all.
    fn open(self: Box<Self>) -> Result<RawInput>;
}
