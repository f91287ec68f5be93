//! Delimiter framing for the timer's serial byte stream.
//!
//! The Polaris console terminates every reading with a delimiter. Two styles
//! are seen in the field:
//!
//! ```text
//! CRLF:  "12.34\r\n"   UTF-8 text
//! CR:    "12.34\r"     single-byte (Latin-1) text
//! ```
//!
//! [`LineFramer`] reassembles readings from arbitrarily split chunks.
//! [`ReadingStream`] wraps a [`RawInput`] and yields one [`Reading`] per frame,
//! falling back to pass-through when the source already delivers whole frames.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::input::RawInput;

/// One elapsed-time value extracted from a single frame.
///
/// Kept as text: the bridge never interprets the number.
pub type Reading = String;

/// Frame delimiter and the text decoding that goes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// `\r\n`, UTF-8 decoded (invalid sequences are replaced).
    Crlf,
    /// Lone `\r`, Latin-1 decoded.
    #[default]
    Cr,
}

impl Delimiter {
    /// Delimiter bytes.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Delimiter::Crlf => b"\r\n",
            Delimiter::Cr => b"\r",
        }
    }

    /// Decode one frame body into text.
    fn decode(self, bytes: &[u8]) -> Reading {
        match self {
            Delimiter::Crlf => String::from_utf8_lossy(bytes).into_owned(),
            // Latin-1 maps every byte to the code point of the same value.
            Delimiter::Cr => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Crlf => write!(f, "crlf"),
            Delimiter::Cr => write!(f, "cr"),
        }
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crlf" | "\\r\\n" => Ok(Delimiter::Crlf),
            "cr" | "\\r" => Ok(Delimiter::Cr),
            other => Err(format!("unknown delimiter '{other}' (expected 'crlf' or 'cr')")),
        }
    }
}

/// Incremental splitter that handles partial reads.
///
/// Feed bytes via [`LineFramer::feed`] and collect complete readings. Bytes
/// after the last delimiter are held until a later chunk completes them.
#[derive(Debug)]
pub struct LineFramer {
    delimiter: Delimiter,
    buf: Vec<u8>,
}

impl LineFramer {
    /// Create a framer with an empty buffer.
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            buf: Vec::new(),
        }
    }

    /// Feed bytes and extract every reading completed by them, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Reading> {
        let delim = self.delimiter.as_bytes();
        // A delimiter may straddle the previous chunk boundary.
        let mut search_from = self.buf.len().saturating_sub(delim.len() - 1);
        self.buf.extend_from_slice(bytes);

        let mut readings = Vec::new();
        let mut frame_start = 0;

        while let Some(offset) = find(&self.buf[search_from..], delim) {
            let end = search_from + offset;
            readings.push(self.delimiter.decode(&self.buf[frame_start..end]));
            frame_start = end + delim.len();
            search_from = frame_start;
        }

        self.buf.drain(..frame_start);
        readings
    }

    /// Returns true if a partial frame is buffered.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Lazy, non-restartable sequence of readings from one input source.
#[derive(Debug)]
pub struct ReadingStream {
    input: RawInput,
    framer: LineFramer,
    pending: VecDeque<Reading>,
}

impl ReadingStream {
    /// Wrap a raw input. Chunked inputs are framed; frame inputs pass through.
    pub fn new(input: RawInput, delimiter: Delimiter) -> Self {
        Self {
            input,
            framer: LineFramer::new(delimiter),
            pending: VecDeque::new(),
        }
    }

    /// Next reading, or `None` once the source has ended.
    ///
    /// A partial frame left when a chunked source ends is never emitted.
    pub async fn next(&mut self) -> Option<Reading> {
        loop {
            if let Some(reading) = self.pending.pop_front() {
                return Some(reading);
            }

            match &mut self.input {
                RawInput::Frames(rx) => return rx.recv().await,
                RawInput::Chunks(rx) => {
                    let chunk = rx.recv().await?;
                    self.pending.extend(self.framer.feed(&chunk));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_crlf_reassembles_across_chunks() {
        let mut framer = LineFramer::new(Delimiter::Crlf);
        assert!(framer.feed(b"12.3").is_empty());
        assert_eq!(framer.feed(b"4\r\n56"), vec!["12.34"]);
        assert_eq!(framer.feed(b".7\r\n"), vec!["56.7"]);
        assert!(!framer.has_partial());
    }

    #[test]
    fn test_crlf_split_between_cr_and_lf() {
        let mut framer = LineFramer::new(Delimiter::Crlf);
        assert!(framer.feed(b"9.99\r").is_empty());
        assert!(framer.has_partial());
        assert_eq!(framer.feed(b"\n10.00\r\n"), vec!["9.99", "10.00"]);
    }

    #[test]
    fn test_lone_cr_inside_crlf_stream_is_kept() {
        let mut framer = LineFramer::new(Delimiter::Crlf);
        assert_eq!(framer.feed(b"a\rb\r\n"), vec!["a\rb"]);
    }

    #[test]
    fn test_cr_multiple_frames_in_one_chunk() {
        let mut framer = LineFramer::new(Delimiter::Cr);
        assert_eq!(framer.feed(b"1.00\r1.01\r1.0"), vec!["1.00", "1.01"]);
        assert!(framer.has_partial());
        assert_eq!(framer.feed(b"2\r"), vec!["1.02"]);
    }

    #[test]
    fn test_cr_decodes_latin1() {
        let mut framer = LineFramer::new(Delimiter::Cr);
        assert_eq!(framer.feed(&[0xB0, b'1', b'\r']), vec!["\u{b0}1"]);
    }

    #[test]
    fn test_empty_frames_are_not_dropped() {
        let mut framer = LineFramer::new(Delimiter::Cr);
        assert_eq!(framer.feed(b"\r\r5\r"), vec!["", "", "5"]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut framer = LineFramer::new(Delimiter::Crlf);
        let input = b"45.67\r\n";
        for (i, byte) in input.iter().enumerate() {
            let readings = framer.feed(&[*byte]);
            if i < input.len() - 1 {
                assert!(readings.is_empty());
            } else {
                assert_eq!(readings, vec!["45.67"]);
            }
        }
    }

    #[test]
    fn test_delimiter_parse() {
        assert_eq!("CRLF".parse::<Delimiter>(), Ok(Delimiter::Crlf));
        assert_eq!("cr".parse::<Delimiter>(), Ok(Delimiter::Cr));
        assert!("lf".parse::<Delimiter>().is_err());
    }

    #[tokio::test]
    async fn test_stream_frames_chunked_input() {
        let (tx, rx) = mpsc::channel(8);
        let mut stream = ReadingStream::new(RawInput::Chunks(rx), Delimiter::Crlf);

        for chunk in ["12.3", "4\r\n56", ".7\r\n", "8.9"] {
            tx.send(chunk.as_bytes().to_vec()).await.unwrap();
        }
        drop(tx);

        assert_eq!(stream.next().await.as_deref(), Some("12.34"));
        assert_eq!(stream.next().await.as_deref(), Some("56.7"));
        // Trailing partial frame is never emitted.
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_stream_passes_frames_through() {
        let (tx, rx) = mpsc::channel(8);
        let mut stream = ReadingStream::new(RawInput::Frames(rx), Delimiter::Cr);

        tx.send("0.5".to_string()).await.unwrap();
        tx.send("0.5".to_string()).await.unwrap();
        tx.send("with\rcr".to_string()).await.unwrap();
        drop(tx);

        assert_eq!(stream.next().await.as_deref(), Some("0.5"));
        assert_eq!(stream.next().await.as_deref(), Some("0.5"));
        assert_eq!(stream.next().await.as_deref(), Some("with\rcr"));
        assert_eq!(stream.next().await, None);
    }
}
