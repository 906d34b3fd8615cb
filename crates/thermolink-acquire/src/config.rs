use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AcquireError, Result};

/// A statically configured channel on one datalogger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Operator-chosen display name.
    pub name: String,
    /// Thermocouple type letter ("K", "J", "T", ...).
    pub thermocouple_type: String,
    /// Channel number on the instrument, 1 through 12.
    pub number: u8,
}

/// One datalogger to acquire from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataloggerConfig {
    /// Stable identifier used to key channel state.
    pub id: String,
    pub name: String,
    /// Serial device path, e.g. `/dev/ttyUSB0`.
    pub device: PathBuf,
    /// Channels the operator has named. Channels that report but are not
    /// listed here get generated names and the default thermocouple type.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// True when this entry came from auto-detection rather than the
    /// operator's hand.
    #[serde(default)]
    pub auto_detected: bool,
}

impl DataloggerConfig {
    /// The static channel configured for a given instrument channel number,
    /// if any.
    pub fn channel_by_number(&self, number: u8) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.number == number)
    }
}

/// Top-level acquisition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireConfig {
    /// Thermocouple type assumed for channels with no static config.
    #[serde(default = "default_thermocouple_type")]
    pub default_thermocouple_type: String,
    /// Seconds of silence after which a channel counts as disconnected.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    pub dataloggers: Vec<DataloggerConfig>,
}

fn default_thermocouple_type() -> String {
    "K".to_string()
}

fn default_connection_timeout_secs() -> u64 {
    60
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            default_thermocouple_type: default_thermocouple_type(),
            connection_timeout_secs: default_connection_timeout_secs(),
            dataloggers: Vec::new(),
        }
    }
}

impl AcquireConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AcquireError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| AcquireError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(|source| {
            AcquireError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, text).map_err(|source| AcquireError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, logger) in self.dataloggers.iter().enumerate() {
            if logger.id.is_empty() {
                return Err(AcquireError::ConfigInvalid(format!(
                    "datalogger #{i} has an empty id"
                )));
            }
            if self.dataloggers[..i].iter().any(|other| other.id == logger.id) {
                return Err(AcquireError::ConfigInvalid(format!(
                    "duplicate datalogger id {:?}",
                    logger.id
                )));
            }
            for channel in &logger.channels {
                if channel.number < 1 || channel.number > 12 {
                    return Err(AcquireError::ConfigInvalid(format!(
                        "datalogger {:?} channel number {} out of range 1-12",
                        logger.id, channel.number
                    )));
                }
            }
        }
        Ok(())
    }

    /// A starter config with one named channel, for `--write-example`.
    pub fn example() -> Self {
        Self {
            default_thermocouple_type: default_thermocouple_type(),
            connection_timeout_secs: default_connection_timeout_secs(),
            dataloggers: vec![DataloggerConfig {
                id: "logger-1".to_string(),
                name: "Bench logger".to_string(),
                device: PathBuf::from("/dev/ttyUSB0"),
                channels: vec![ChannelConfig {
                    name: "Oven core".to_string(),
                    thermocouple_type: "K".to_string(),
                    number: 1,
                }],
                auto_detected: false,
            }],
        }
    }
}
