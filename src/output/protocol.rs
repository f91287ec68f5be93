//! vMix TCP API command encoding.
//!
//! Only one command is ever sent, one ASCII line per forwarded reading:
//!
//! ```text
//! FUNCTION SetText Input=<input>&SelectedName=<field>&Value=<value>\r\n
//! ```
//!
//! The value goes out verbatim. vMix answers each command, but the bridge
//! never reads the replies.

use std::fmt;

/// Where overlay updates go. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    /// vMix host name or address.
    pub host: String,
    /// vMix TCP API port.
    pub port: u16,
    /// vMix input number holding the title.
    pub input_id: u32,
    /// Title field to update, e.g. `Clock.text`.
    pub field_name: String,
}

impl ChannelTarget {
    /// Creates a target.
    pub fn new(host: impl Into<String>, port: u16, input_id: u32, field_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            input_id,
            field_name: field_name.into(),
        }
    }

    /// `host:port`, as used in connection log lines.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Encode the SetText command that shows `value` in the target field.
    pub fn set_text_command(&self, value: &str) -> String {
        format!(
            "FUNCTION SetText Input={}&SelectedName={}&Value={}\r\n",
            self.input_id, self.field_name, value
        )
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.input_id)
    }
}
