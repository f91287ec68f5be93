//! Synthetic timer output for rehearsals without a console attached.
//!
//! Emits the time elapsed since start, in hundredths of a second, as one
//! whole frame per tick. Frames carry no delimiter, so they take the
//! pass-through path of the reading stream.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use super::{DeviceSource, RawInput, INPUT_BUFFER};

/// Default emission interval.
pub const DEFAULT_TICK: Duration = Duration::from_millis(5);

/// Generator of monotonically increasing elapsed-time frames.
#[derive(Debug, Clone)]
pub struct TestDataGenerator {
    tick: Duration,
}

impl TestDataGenerator {
    /// Generator emitting every `tick`.
    pub fn new(tick: Duration) -> Self {
        Self { tick }
    }
}

impl Default for TestDataGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl DeviceSource for TestDataGenerator {
    fn describe(&self) -> String {
        "Generating test data".to_string()
    }

    fn open(self: Box<Self>) -> Result<RawInput> {
        let (tx, rx) = mpsc::channel(INPUT_BUFFER);
        let tick = self.tick;

        tokio::spawn(async move {
            let start = Instant::now();
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let centis = (start.elapsed().as_millis() + 5) / 10;
                let frame = format_elapsed(u64::try_from(centis).unwrap_or(u64::MAX));
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        Ok(RawInput::Frames(rx))
    }
}

/// Format hundredths of a second the way the console's number display does:
/// no trailing zeros, no trailing point.
///
/// `0` → `"0"`, `150` → `"1.5"`, `1234` → `"12.34"`.
pub fn format_elapsed(centis: u64) -> String {
    let secs = centis / 100;
    let frac = centis % 100;

    if frac == 0 {
        secs.to_string()
    } else if frac % 10 == 0 {
        format!("{}.{}", secs, frac / 10)
    } else {
        format!("{}.{:02}", secs, frac)
    }
}
