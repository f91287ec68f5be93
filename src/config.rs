//! Configuration loading.
//!
//! Layers, later ones win:
//!
//! 1. Built-in defaults (vMix on localhost, Polaris at 4800 baud)
//! 2. JSON config file (`--config`, `POLARIS_CONFIG`, or the platform config
//!    dir's `polaris-bridge/config.json` when it exists)
//! 3. `POLARIS_*` environment variables
//! 4. Command-line flags (applied by the binary)

use std::path::{Path, PathBuf};
use std::{fs, str::FromStr};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::framing::Delimiter;
use crate::output::ChannelTarget;

/// Bridge configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Serial device path of the Polaris console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Serial baud rate.
    pub baud: u32,
    /// vMix host name or address.
    pub vmix_host: String,
    /// vMix TCP API port.
    pub vmix_port: u16,
    /// vMix input holding the title.
    pub vmix_input: u32,
    /// Title field to update.
    pub field_name: String,
    /// Frame delimiter used by the console.
    pub delimiter: Delimiter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            baud: 4800,
            vmix_host: "127.0.0.1".to_string(),
            vmix_port: 8099,
            vmix_input: 1,
            field_name: "Clock.text".to_string(),
            delimiter: Delimiter::default(),
        }
    }
}

impl Config {
    /// Default config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("polaris-bridge").join("config.json"))
    }

    /// Load defaults, then the config file, then environment overrides.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("POLARIS_CONFIG").ok().map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load_from_file(&path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a JSON config file. Missing keys take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `POLARIS_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(device) = lookup("POLARIS_DEVICE") {
            self.device = Some(device);
        }
        if let Some(host) = lookup("POLARIS_VMIX_HOST") {
            self.vmix_host = host;
        }
        if let Some(field) = lookup("POLARIS_FIELD_NAME") {
            self.field_name = field;
        }

        override_parsed(&lookup, "POLARIS_BAUD", &mut self.baud);
        override_parsed(&lookup, "POLARIS_VMIX_PORT", &mut self.vmix_port);
        override_parsed(&lookup, "POLARIS_VMIX_INPUT", &mut self.vmix_input);
        override_parsed(&lookup, "POLARIS_DELIMITER", &mut self.delimiter);
    }

    /// Check the configuration is usable.
    ///
    /// A device is only required when reading from real hardware.
    pub fn validate(&self, test_data: bool) -> Result<()> {
        if !test_data && self.device.as_deref().map_or(true, str::is_empty) {
            bail!("No input device given (use --device or POLARIS_DEVICE, or --test)");
        }
        if self.vmix_host.is_empty() {
            bail!("vMix host must not be empty");
        }
        if self.vmix_port == 0 {
            bail!("vMix port must not be 0");
        }
        if self.vmix_input == 0 {
            bail!("vMix input must be a positive number");
        }
        if self.field_name.is_empty() {
            bail!("vMix field name must not be empty");
        }
        Ok(())
    }

    /// The immutable output target described by this config.
    pub fn channel_target(&self) -> ChannelTarget {
        ChannelTarget::new(
            self.vmix_host.clone(),
            self.vmix_port,
            self.vmix_input,
            self.field_name.clone(),
        )
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => log::warn!("Ignoring invalid {}={:?}", key, raw),
        }
    }
}
