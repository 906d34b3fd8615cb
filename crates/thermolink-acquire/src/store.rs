use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thermolink_protocol::{ChannelCode, Reading, Unit};
use tracing::debug;

use crate::config::DataloggerConfig;

/// Channel state key. One entry per channel per datalogger, so two loggers
/// reporting the same channel code never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChannelKey {
    pub logger_id: String,
    pub code: ChannelCode,
}

/// Live state of one instrument channel.
///
/// Created at most once per key. After creation only `temperature`, `unit`,
/// `last_update` and `sample_count` change; identity fields are frozen.
#[derive(Debug, Clone)]
pub struct ChannelEntry {
    pub display_name: String,
    pub thermocouple_type: String,
    pub channel_number: u8,
    pub temperature: f64,
    pub unit: Unit,
    /// `UNIX_EPOCH` means no reading has ever arrived.
    pub last_update: SystemTime,
    pub first_seen: SystemTime,
    pub sample_count: u64,
    pub auto_detected: bool,
}

/// A read-only row for reporting. Connectivity and age are derived at
/// snapshot time, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    pub logger_id: String,
    pub channel_code: String,
    pub channel_number: u8,
    pub display_name: String,
    pub thermocouple_type: String,
    pub temperature: f64,
    pub unit: String,
    pub connected: bool,
    /// Seconds since the last reading; `None` when none has ever arrived.
    pub age_secs: Option<u64>,
    pub sample_count: u64,
    pub auto_detected: bool,
}

/// Per-channel state across all dataloggers.
#[derive(Debug)]
pub struct ChannelStore {
    default_type: String,
    timeout: Duration,
    entries: BTreeMap<ChannelKey, ChannelEntry>,
}

impl ChannelStore {
    pub fn new(default_type: impl Into<String>, timeout: Duration) -> Self {
        Self {
            default_type: default_type.into(),
            timeout,
            entries: BTreeMap::new(),
        }
    }

    /// Pre-create entries for a logger's statically configured channels so
    /// they show up in snapshots (disconnected) before any data arrives.
    pub fn seed(&mut self, logger: &DataloggerConfig) {
        self.seed_at(logger, SystemTime::now());
    }

    pub fn seed_at(&mut self, logger: &DataloggerConfig, now: SystemTime) {
        for channel in &logger.channels {
            let Some(code) = ChannelCode::from_number(channel.number) else {
                continue; // validated at config load, but stay tolerant
            };
            let key = ChannelKey {
                logger_id: logger.id.clone(),
                code,
            };
            self.entries.entry(key).or_insert_with(|| ChannelEntry {
                display_name: channel.name.clone(),
                thermocouple_type: channel.thermocouple_type.clone(),
                channel_number: channel.number,
                temperature: 0.0,
                unit: Unit::Unknown,
                last_update: UNIX_EPOCH,
                first_seen: now,
                sample_count: 0,
                auto_detected: false,
            });
        }
    }

    /// Apply one reading. `logger_number` is the 1-based position of the
    /// logger in the configuration, used in generated channel names.
    pub fn record(&mut self, logger: &DataloggerConfig, logger_number: usize, reading: &Reading) {
        self.record_at(logger, logger_number, reading, SystemTime::now());
    }

    pub fn record_at(
        &mut self,
        logger: &DataloggerConfig,
        logger_number: usize,
        reading: &Reading,
        now: SystemTime,
    ) {
        let key = ChannelKey {
            logger_id: logger.id.clone(),
            code: reading.code,
        };
        let entry = self.entries.entry(key).or_insert_with(|| {
            let number = reading.channel();
            let (display_name, thermocouple_type, auto_detected) =
                match logger.channel_by_number(number) {
                    Some(channel) => (
                        channel.name.clone(),
                        channel.thermocouple_type.clone(),
                        false,
                    ),
                    None => (
                        format!("D{logger_number}-T{number}"),
                        self.default_type.clone(),
                        true,
                    ),
                };
            debug!(
                logger = %logger.id,
                channel = number,
                name = %display_name,
                auto_detected,
                "new channel"
            );
            ChannelEntry {
                display_name,
                thermocouple_type,
                channel_number: number,
                temperature: 0.0,
                unit: Unit::Unknown,
                last_update: UNIX_EPOCH,
                first_seen: now,
                sample_count: 0,
                auto_detected,
            }
        });
        entry.temperature = reading.temperature();
        entry.unit = reading.unit;
        entry.last_update = now;
        entry.sample_count += 1;
    }

    pub fn snapshot(&self) -> Vec<ChannelSnapshot> {
        self.snapshot_at(SystemTime::now())
    }

    pub fn snapshot_at(&self, now: SystemTime) -> Vec<ChannelSnapshot> {
        self.entries
            .iter()
            .map(|(key, entry)| {
                let age = self.age(entry, now);
                ChannelSnapshot {
                    logger_id: key.logger_id.clone(),
                    channel_code: key.code.as_str().to_string(),
                    channel_number: entry.channel_number,
                    display_name: entry.display_name.clone(),
                    thermocouple_type: entry.thermocouple_type.clone(),
                    temperature: entry.temperature,
                    unit: entry.unit.to_string(),
                    connected: age.is_some_and(|a| a < self.timeout),
                    age_secs: age.map(|a| a.as_secs()),
                    sample_count: entry.sample_count,
                    auto_detected: entry.auto_detected,
                }
            })
            .collect()
    }

    /// True when any channel of the given logger has reported within the
    /// connection timeout.
    pub fn logger_connected(&self, logger_id: &str) -> bool {
        self.logger_connected_at(logger_id, SystemTime::now())
    }

    pub fn logger_connected_at(&self, logger_id: &str, now: SystemTime) -> bool {
        self.entries
            .iter()
            .filter(|(key, _)| key.logger_id == logger_id)
            .any(|(_, entry)| self.age(entry, now).is_some_and(|a| a < self.timeout))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn age(&self, entry: &ChannelEntry, now: SystemTime) -> Option<Duration> {
        if entry.last_update == UNIX_EPOCH {
            return None; // never reported
        }
        // A clock step backwards reads as age zero.
        Some(
            now.duration_since(entry.last_update)
                .unwrap_or(Duration::ZERO),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use thermolink_protocol::parse_frame;

    use super::*;
    use crate::config::ChannelConfig;

    fn logger(id: &str, channels: Vec<ChannelConfig>) -> DataloggerConfig {
        DataloggerConfig {
            id: id.to_string(),
            name: id.to_string(),
            device: PathBuf::from("/dev/null"),
            channels,
            auto_detected: false,
        }
    }

    fn reading(code: ChannelCode, tenths: i32) -> Reading {
        Reading {
            code,
            unit: Unit::Celsius,
            negative: tenths < 0,
            tenths,
        }
    }

    fn code(number: u8) -> ChannelCode {
        ChannelCode::from_number(number).expect("test uses valid channel numbers")
    }

    #[test]
    fn unconfigured_channel_gets_generated_name_and_default_type() {
        let mut store = ChannelStore::new("K", Duration::from_secs(60));
        let logger = logger("lab", Vec::new());
        store.record(&logger, 1, &reading(code(3), 215));

        let rows = store.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "D1-T3");
        assert_eq!(rows[0].thermocouple_type, "K");
        assert_eq!(rows[0].temperature, 21.5);
        assert!(rows[0].auto_detected);
        assert!(rows[0].connected);
    }

    #[test]
    fn static_config_overlays_name_and_type() {
        let mut store = ChannelStore::new("K", Duration::from_secs(60));
        let logger = logger(
            "lab",
            vec![ChannelConfig {
                name: "Exhaust".to_string(),
                thermocouple_type: "J".to_string(),
                number: 2,
            }],
        );
        store.record(&logger, 1, &reading(code(2), -55));

        let rows = store.snapshot();
        assert_eq!(rows[0].display_name, "Exhaust");
        assert_eq!(rows[0].thermocouple_type, "J");
        assert!(!rows[0].auto_detected);
    }

    #[test]
    fn entry_is_created_once_and_identity_is_frozen() {
        let mut store = ChannelStore::new("K", Duration::from_secs(60));
        let bare = logger("lab", Vec::new());
        store.record(&bare, 1, &reading(code(1), 100));

        // A later static config for the same channel must not rewrite the
        // already-created entry.
        let configured = logger(
            "lab",
            vec![ChannelConfig {
                name: "Renamed".to_string(),
                thermocouple_type: "T".to_string(),
                number: 1,
            }],
        );
        store.record(&configured, 1, &reading(code(1), 200));

        let rows = store.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "D1-T1");
        assert!(rows[0].auto_detected);
        assert_eq!(rows[0].temperature, 20.0);
        assert_eq!(rows[0].sample_count, 2);
    }

    #[test]
    fn staleness_is_derived_at_snapshot_time() {
        let mut store = ChannelStore::new("K", Duration::from_secs(60));
        let lab = logger("lab", Vec::new());
        let t0 = UNIX_EPOCH + Duration::from_secs(1_000_000);
        store.record_at(&lab, 1, &reading(code(1), 300), t0);

        let fresh = store.snapshot_at(t0 + Duration::from_secs(59));
        assert!(fresh[0].connected);
        assert_eq!(fresh[0].age_secs, Some(59));

        let stale = store.snapshot_at(t0 + Duration::from_secs(61));
        assert!(!stale[0].connected);
        assert_eq!(stale[0].age_secs, Some(61));

        assert!(store.logger_connected_at("lab", t0 + Duration::from_secs(59)));
        assert!(!store.logger_connected_at("lab", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn seeded_channels_are_present_but_never_connected() {
        let mut store = ChannelStore::new("K", Duration::from_secs(60));
        let lab = logger(
            "lab",
            vec![ChannelConfig {
                name: "Inlet".to_string(),
                thermocouple_type: "K".to_string(),
                number: 5,
            }],
        );
        store.seed(&lab);

        let rows = store.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "Inlet");
        assert!(!rows[0].connected);
        assert_eq!(rows[0].age_secs, None);
        assert_eq!(rows[0].sample_count, 0);
        assert!(!store.logger_connected("lab"));

        // A reading lands in the seeded entry rather than a new one.
        store.record(&lab, 1, &reading(code(5), 421));
        let rows = store.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sample_count, 1);
        assert!(rows[0].connected);
    }

    #[test]
    fn seeding_runs_on_the_injected_clock() {
        let mut store = ChannelStore::new("K", Duration::from_secs(60));
        let lab = logger(
            "lab",
            vec![ChannelConfig {
                name: "Inlet".to_string(),
                thermocouple_type: "K".to_string(),
                number: 5,
            }],
        );
        let t0 = UNIX_EPOCH + Duration::from_secs(1_000_000);
        store.seed_at(&lab, t0);

        // The sentinel, not the seed time, drives connectivity; an arbitrary
        // amount of wall time never flips a seeded entry on its own.
        let rows = store.snapshot_at(t0 + Duration::from_secs(3600));
        assert!(!rows[0].connected);
        assert_eq!(rows[0].age_secs, None);

        store.record_at(&lab, 1, &reading(code(5), 10), t0 + Duration::from_secs(3600));
        let rows = store.snapshot_at(t0 + Duration::from_secs(3601));
        assert!(rows[0].connected);
        assert_eq!(rows[0].age_secs, Some(1));
    }

    #[test]
    fn same_code_on_two_loggers_is_two_entries() {
        let mut store = ChannelStore::new("K", Duration::from_secs(60));
        let a = logger("a", Vec::new());
        let b = logger("b", Vec::new());
        store.record(&a, 1, &reading(code(1), 100));
        store.record(&b, 2, &reading(code(1), 900));

        let rows = store.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].logger_id, "a");
        assert_eq!(rows[0].display_name, "D1-T1");
        assert_eq!(rows[0].temperature, 10.0);
        assert_eq!(rows[1].logger_id, "b");
        assert_eq!(rows[1].display_name, "D2-T1");
        assert_eq!(rows[1].temperature, 90.0);
    }

    #[test]
    fn wire_frames_land_in_the_store() {
        let mut store = ChannelStore::new("K", Duration::from_secs(60));
        let lab = logger("lab", Vec::new());
        let reading =
            parse_frame(b"\x0241010100005123").expect("reference frame should parse");
        store.record(&lab, 1, &reading);

        let rows = store.snapshot();
        assert_eq!(rows[0].channel_code, "41");
        assert_eq!(rows[0].temperature, 12.3);
        assert_eq!(rows[0].unit, "C");
    }
}
