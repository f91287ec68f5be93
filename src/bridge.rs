//! The bridge loop: console readings in, vMix overlay updates out.
//!
//! ```text
//! ReadingStream ──► ChangeDetector ──► OutputChannel ──► vMix
//!                        │                  │
//!                        └── local time ──► Frontend ◄── logs, remote time
//! ```
//!
//! Everything runs on one task. A single `select!` multiplexes the reading
//! stream, connection events, the frontend refresh tick and the shutdown
//! signal, so readings are handled strictly one at a time, in arrival order.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::MissedTickBehavior;

use crate::detector::ChangeDetector;
use crate::framing::ReadingStream;
use crate::frontend::Frontend;
use crate::output::{Connector, OutputChannel};

/// Default interval between frontend refreshes.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(50);

/// Why [`Bridge::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The input source ended.
    InputEnded,
    /// The user quit from the frontend.
    QuitRequested,
    /// The shutdown signal fired.
    Interrupted,
}

/// Wires a reading stream to an output channel.
#[derive(Debug)]
pub struct Bridge<C: Connector> {
    channel: OutputChannel<C>,
    detector: ChangeDetector,
    refresh_interval: Duration,
}

impl<C: Connector> Bridge<C> {
    /// Bridge forwarding into `channel`.
    pub fn new(channel: OutputChannel<C>) -> Self {
        Self {
            channel,
            detector: ChangeDetector::new(),
            refresh_interval: REFRESH_INTERVAL,
        }
    }

    /// Override the frontend refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// The output channel.
    pub fn channel(&self) -> &OutputChannel<C> {
        &self.channel
    }

    /// Run until the input ends, the user quits, or `shutdown` completes.
    ///
    /// No reading is consumed before the channel has connected once. The
    /// channel is shut down before returning.
    ///
    /// # Errors
    ///
    /// Only frontend failures (e.g. the terminal going away) are returned;
    /// connection problems are reported on the frontend and retried.
    pub async fn run(
        &mut self,
        mut readings: ReadingStream,
        frontend: &mut dyn Frontend,
        shutdown: impl Future<Output = ()>,
    ) -> Result<StopReason> {
        tokio::pin!(shutdown);

        let mut tick = tokio::time::interval(self.refresh_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let stop = match self.wait_ready(frontend, &mut tick, &mut shutdown).await? {
            Some(stop) => stop,
            None => {
                log::info!("[Bridge] Output ready, forwarding readings");
                self.forward(&mut readings, frontend, &mut tick, &mut shutdown)
                    .await?
            }
        };

        log::info!("[Bridge] Stopping: {:?}", stop);
        self.channel.shutdown(frontend);
        frontend.refresh()?;
        Ok(stop)
    }

    /// Pump channel events until the first connection is up.
    ///
    /// Returns `Some` if the bridge was stopped while waiting.
    async fn wait_ready<S>(
        &mut self,
        frontend: &mut dyn Frontend,
        tick: &mut tokio::time::Interval,
        shutdown: &mut std::pin::Pin<&mut S>,
    ) -> Result<Option<StopReason>>
    where
        S: Future<Output = ()>,
    {
        let mut ready = self.channel.ready(frontend);

        loop {
            tokio::select! {
                _ = &mut ready => return Ok(None),
                Some(event) = self.channel.next_event() => self.channel.handle(event, frontend),
                _ = tick.tick() => {
                    if frontend.refresh()? {
                        return Ok(Some(StopReason::QuitRequested));
                    }
                }
                () = shutdown.as_mut() => return Ok(Some(StopReason::Interrupted)),
            }
        }
    }

    async fn forward<S>(
        &mut self,
        readings: &mut ReadingStream,
        frontend: &mut dyn Frontend,
        tick: &mut tokio::time::Interval,
        shutdown: &mut std::pin::Pin<&mut S>,
    ) -> Result<StopReason>
    where
        S: Future<Output = ()>,
    {
        loop {
            tokio::select! {
                reading = readings.next() => match reading {
                    Some(value) => {
                        self.detector.on_reading(&value, &mut self.channel, frontend);
                    }
                    None => return Ok(StopReason::InputEnded),
                },
                Some(event) = self.channel.next_event() => self.channel.handle(event, frontend),
                _ = tick.tick() => {
                    if frontend.refresh()? {
                        return Ok(StopReason::QuitRequested);
                    }
                }
                () = shutdown.as_mut() => return Ok(StopReason::Interrupted),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::Delimiter;
    use crate::frontend::MemoryFrontend;
    use crate::input::RawInput;
    use crate::output::fake::{FakeConnector, Script};
    use crate::output::{ChannelTarget, ConnectionState};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::mpsc;

    fn target() -> ChannelTarget {
        ChannelTarget::new("127.0.0.1", 8099, 1, "Clock.text")
    }

    /// Frontend that asks to quit on the first refresh.
    #[derive(Default)]
    struct QuittingFrontend(MemoryFrontend);

    impl Frontend for QuittingFrontend {
        fn add_log(&mut self, text: &str) {
            self.0.add_log(text);
        }
        fn set_local_time(&mut self, value: &str) {
            self.0.set_local_time(value);
        }
        fn set_remote_time(&mut self, value: &str) {
            self.0.set_remote_time(value);
        }
        fn refresh(&mut self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_forwards_changes_and_shows_every_reading() {
        let (connector, mut peers) = FakeConnector::new(&[Script::Accept]);
        let mut bridge = Bridge::new(OutputChannel::new(target(), connector));
        let mut frontend = MemoryFrontend::new();

        let (tx, rx) = mpsc::channel(16);
        for value in ["1.00", "1.00", "1.01", "1.01", "1.01", "1.02"] {
            tx.send(value.to_string()).await.unwrap();
        }
        drop(tx);
        let readings = ReadingStream::new(RawInput::Frames(rx), Delimiter::Cr);

        let stop = bridge
            .run(readings, &mut frontend, std::future::pending())
            .await
            .unwrap();

        assert_eq!(stop, StopReason::InputEnded);
        assert_eq!(
            frontend.local,
            vec!["1.00", "1.00", "1.01", "1.01", "1.01", "1.02"]
        );
        assert_eq!(frontend.remote, vec!["1.00", "1.01", "1.02"]);
        assert_eq!(bridge.channel().state(), ConnectionState::Closing);

        let mut peer = BufReader::new(peers.recv().await.unwrap());
        let mut lines = Vec::new();
        let mut line = String::new();
        while peer.read_line(&mut line).await.unwrap() > 0 {
            lines.push(std::mem::take(&mut line));
        }
        assert_eq!(
            lines,
            vec![
                "FUNCTION SetText Input=1&SelectedName=Clock.text&Value=1.00\r\n",
                "FUNCTION SetText Input=1&SelectedName=Clock.text&Value=1.01\r\n",
                "FUNCTION SetText Input=1&SelectedName=Clock.text&Value=1.02\r\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_frames_chunked_serial_input() {
        let (connector, _peers) = FakeConnector::new(&[Script::Accept]);
        let mut bridge = Bridge::new(OutputChannel::new(target(), connector));
        let mut frontend = MemoryFrontend::new();

        let (tx, rx) = mpsc::channel(16);
        for chunk in ["12.3", "4\r\n56", ".7\r\n"] {
            tx.send(chunk.as_bytes().to_vec()).await.unwrap();
        }
        drop(tx);
        let readings = ReadingStream::new(RawInput::Chunks(rx), Delimiter::Crlf);

        bridge
            .run(readings, &mut frontend, std::future::pending())
            .await
            .unwrap();

        assert_eq!(frontend.local, vec!["12.34", "56.7"]);
        assert_eq!(frontend.remote, vec!["12.34", "56.7"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reading_before_first_connection() {
        let (connector, _peers) = FakeConnector::new(&[Script::Hang]);
        let mut bridge = Bridge::new(OutputChannel::new(target(), connector));
        let mut frontend = MemoryFrontend::new();

        let (tx, rx) = mpsc::channel(16);
        tx.send("1.00".to_string()).await.unwrap();
        let readings = ReadingStream::new(RawInput::Frames(rx), Delimiter::Cr);

        let stop = bridge
            .run(
                readings,
                &mut frontend,
                tokio::time::sleep(Duration::from_secs(5)),
            )
            .await
            .unwrap();

        assert_eq!(stop, StopReason::Interrupted);
        assert!(frontend.local.is_empty());
        assert!(frontend.logged("Connecting to 127.0.0.1:8099"));
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_retrying_unreachable_endpoint() {
        let (connector, _peers) = FakeConnector::new(&[Script::Refuse; 5]);
        let attempts = connector.attempts_handle();
        let mut bridge = Bridge::new(OutputChannel::new(target(), connector));
        let mut frontend = MemoryFrontend::new();

        let (_tx, rx) = mpsc::channel::<String>(1);
        let readings = ReadingStream::new(RawInput::Frames(rx), Delimiter::Cr);

        bridge
            .run(
                readings,
                &mut frontend,
                tokio::time::sleep(Duration::from_secs(1)),
            )
            .await
            .unwrap();

        // Five refusals, then the sixth attempt hangs.
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 6);
        assert_eq!(
            frontend.logs.iter().filter(|l| l.contains("Retrying")).count(),
            5
        );
    }

    #[tokio::test]
    async fn test_quit_from_frontend() {
        let (connector, _peers) = FakeConnector::new(&[Script::Hang]);
        let mut bridge = Bridge::new(OutputChannel::new(target(), connector));
        let mut frontend = QuittingFrontend::default();

        let (_tx, rx) = mpsc::channel::<String>(1);
        let readings = ReadingStream::new(RawInput::Frames(rx), Delimiter::Cr);

        let stop = bridge
            .run(readings, &mut frontend, std::future::pending())
            .await
            .unwrap();

        assert_eq!(stop, StopReason::QuitRequested);
        assert_eq!(bridge.channel().state(), ConnectionState::Closing);
    }

    #[tokio::test]
    async fn test_reconnects_after_remote_close_mid_run() {
        let (connector, mut peers) = FakeConnector::new(&[Script::Accept]);
        let handle = connector.clone();
        let mut bridge = Bridge::new(OutputChannel::new(target(), connector));
        let mut frontend = MemoryFrontend::new();

        let (tx, rx) = mpsc::channel(16);
        let readings = ReadingStream::new(RawInput::Frames(rx), Delimiter::Cr);

        let driver = async {
            tx.send("1".to_string()).await.unwrap();
            let first = peers.recv().await.unwrap();
            let mut first = BufReader::new(first);
            let mut line = String::new();
            first.read_line(&mut line).await.unwrap();
            assert!(line.ends_with("Value=1\r\n"));

            // vMix restarts.
            handle.push(Script::Accept);
            drop(first);
            tokio::time::sleep(Duration::from_millis(20)).await;

            // Triggers the reconnect; dropped.
            tx.send("2".to_string()).await.unwrap();
            let second = peers.recv().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send("3".to_string()).await.unwrap();

            let mut second = BufReader::new(second);
            line.clear();
            second.read_line(&mut line).await.unwrap();
            assert!(line.ends_with("Value=3\r\n"));
        };

        let run = bridge.run(readings, &mut frontend, driver);
        let stop = run.await.unwrap();

        assert_eq!(stop, StopReason::Interrupted);
        assert!(frontend.logged("Connection closed by remote side."));
        assert!(frontend.logged("The client was destroyed. Reconnecting."));
        assert_eq!(frontend.remote, vec!["1", "3"]);
    }
}
