use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thermolink_port::{DriverConfig, PortSettings, SerialPort};
use thermolink_protocol::{ChannelCode, FrameCarry, Unit, CHANNEL_COUNT};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{DiscoverError, Result};

/// One channel that produced a non-zero reading during the probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChannel {
    pub code: ChannelCode,
    pub temperature: f64,
    pub unit: Unit,
}

/// Outcome of a successful live data test.
#[derive(Debug)]
pub struct DataProbe {
    pub path: PathBuf,
    /// Channels with a thermocouple attached. A channel that only ever
    /// reported exactly 0.0 counts as observed but is excluded here, since
    /// the hardware reports 0.0 for unpopulated channels.
    pub channels: Vec<ActiveChannel>,
}

/// Open a candidate port and watch its byte stream for datalogger frames.
///
/// Succeeds early once all 12 channel codes have been observed at least
/// once, whether or not each yielded a non-zero reading. Otherwise the hard
/// timeout fails the test: with `NoData` when nothing arrived at all, or
/// `UnrecognizedData` when bytes arrived but no full scan completed.
pub async fn test_port_for_data(
    path: &Path,
    budget: Duration,
    settings: PortSettings,
    config: DriverConfig,
) -> Result<DataProbe> {
    let mut port = SerialPort::new(path, settings, config);
    port.open().await?;
    let Some(mut reader) = port.take_reader() else {
        port.close().await;
        return Err(DiscoverError::UnrecognizedData {
            path: path.to_path_buf(),
        });
    };

    let mut carry = FrameCarry::new();
    let mut seen: BTreeSet<ChannelCode> = BTreeSet::new();
    let mut active: BTreeMap<ChannelCode, ActiveChannel> = BTreeMap::new();
    let mut any_bytes = false;

    let deadline = Instant::now() + budget;
    'watch: loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, reader.recv()).await {
            Err(_) => break,       // budget exhausted
            Ok(None) => break,     // port went away mid-test
            Ok(Some(chunk)) => {
                any_bytes = true;
                for parsed in carry.feed(&chunk) {
                    match parsed {
                        Ok(reading) => {
                            seen.insert(reading.code);
                            if !reading.is_zero() {
                                active.entry(reading.code).or_insert(ActiveChannel {
                                    code: reading.code,
                                    temperature: reading.temperature(),
                                    unit: reading.unit,
                                });
                            }
                            if seen.len() == CHANNEL_COUNT {
                                break 'watch;
                            }
                        }
                        Err(err) => trace!(%err, "probe skipping malformed frame"),
                    }
                }
            }
        }
    }
    port.close().await;

    if seen.len() == CHANNEL_COUNT {
        debug!(
            path = %path.display(),
            populated = active.len(),
            "full channel scan observed"
        );
        return Ok(DataProbe {
            path: path.to_path_buf(),
            channels: active.into_values().collect(),
        });
    }
    if any_bytes {
        Err(DiscoverError::UnrecognizedData {
            path: path.to_path_buf(),
        })
    } else {
        Err(DiscoverError::NoData {
            path: path.to_path_buf(),
            budget,
        })
    }
}
