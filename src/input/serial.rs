//! Serial port source for the Polaris console.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::mpsc;

use super::{DeviceSource, RawInput, INPUT_BUFFER};

/// Read timeout; bounds how long the reader thread takes to notice shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Physical console attached to a serial port.
#[derive(Debug, Clone)]
pub struct SerialDevice {
    path: String,
    baud_rate: u32,
}

impl SerialDevice {
    /// Describe a serial device; nothing is opened yet.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }

    fn open_port(&self) -> Result<Box<dyn SerialPort>> {
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("Failed to open serial port {}", self.path))?;

        log::info!("[Serial] Opened {} at {} baud", self.path, self.baud_rate);
        Ok(port)
    }

    /// Blocking read loop; runs on its own thread.
    fn read_loop(path: String, mut port: Box<dyn SerialPort>, tx: mpsc::Sender<Vec<u8>>) {
        let mut buf = [0u8; 1024];

        while !tx.is_closed() {
            match port.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("[Serial] Read error on {}: {e}", path);
                    break;
                }
            }
        }

        log::info!("[Serial] Reader for {} stopped", path);
    }
}

impl DeviceSource for SerialDevice {
    fn describe(&self) -> String {
        format!(
            "Connecting to serial port at {} (speed {})",
            self.path, self.baud_rate
        )
    }

    fn open(self: Box<Self>) -> Result<RawInput> {
        let port = self.open_port()?;
        let (tx, rx) = mpsc::channel(INPUT_BUFFER);
        let path = self.path.clone();

        std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || Self::read_loop(path, port, tx))
            .context("Failed to spawn serial reader thread")?;

        Ok(RawInput::Chunks(rx))
    }
}
