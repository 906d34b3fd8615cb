use std::path::PathBuf;
use std::time::Duration;

use thermolink_port::{list_ports, DriverConfig, PortInfo, PortSettings};
use tracing::{debug, info, warn};

use crate::error::{DiscoverError, Result};
use crate::probe::{test_port_for_data, ActiveChannel};
use crate::score::{score_port, HIGH_CONFIDENCE};

/// A port that passed both the heuristic and the live data test.
#[derive(Debug)]
pub struct Detected {
    pub path: PathBuf,
    pub channels: Vec<ActiveChannel>,
    pub score: i32,
    pub rationale: String,
}

/// Enumerate the host's serial devices and find attached dataloggers.
///
/// `budget` is the per-port live test allowance; with several candidates
/// the total wall time can be a multiple of it.
pub async fn auto_detect(budget: Duration) -> Result<Vec<Detected>> {
    auto_detect_with(
        list_ports(),
        budget,
        PortSettings::default(),
        DriverConfig::default(),
    )
    .await
}

/// Detection over an explicit candidate list.
///
/// Candidates are ranked by [`score_port`]; only those at or above
/// [`HIGH_CONFIDENCE`] get a live test. A candidate whose probe fails is
/// skipped with a warning rather than failing the whole scan. Fails with
/// `NothingFound` only when no candidate yields an active channel.
pub async fn auto_detect_with(
    ports: Vec<PortInfo>,
    budget: Duration,
    settings: PortSettings,
    config: DriverConfig,
) -> Result<Vec<Detected>> {
    let candidates = ports.len();
    let mut ranked: Vec<(PortInfo, i32, String)> = ports
        .into_iter()
        .map(|info| {
            let scored = score_port(&info);
            (info, scored.score, scored.rationale)
        })
        .filter(|(_, score, _)| *score > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    for (info, score, rationale) in &ranked {
        debug!(path = %info.path.display(), score, %rationale, "candidate ranked");
    }

    let mut found = Vec::new();
    for (info, score, rationale) in ranked {
        if score < HIGH_CONFIDENCE {
            debug!(
                path = %info.path.display(),
                score,
                "below confidence cutoff, skipping live test"
            );
            continue;
        }
        match test_port_for_data(&info.path, budget, settings, config.clone()).await {
            Ok(probe) if !probe.channels.is_empty() => {
                info!(
                    path = %probe.path.display(),
                    channels = probe.channels.len(),
                    "datalogger detected"
                );
                found.push(Detected {
                    path: probe.path,
                    channels: probe.channels,
                    score,
                    rationale,
                });
            }
            Ok(probe) => {
                let err = DiscoverError::NoThermocouples { path: probe.path };
                warn!(path = %info.path.display(), %err, "candidate skipped");
            }
            Err(err) => {
                warn!(path = %info.path.display(), %err, "live test failed, skipping");
            }
        }
    }

    if found.is_empty() {
        return Err(DiscoverError::NothingFound { candidates });
    }
    Ok(found)
}

#[cfg(all(test, unix))]
mod tests {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    use bytes::Bytes;
    use thermolink_protocol::{encode_frame, Unit, CHANNEL_CODES};
    use tokio::io::AsyncWriteExt;

    use super::*;

    fn detect_config() -> DriverConfig {
        DriverConfig {
            settle_delay: Duration::from_millis(50),
            max_open_attempts: 1,
            configure_line: false,
            ..DriverConfig::default()
        }
    }

    fn info(path: PathBuf, vendor: Option<&str>) -> PortInfo {
        PortInfo {
            path,
            vendor_id: vendor.map(str::to_string),
            manufacturer: None,
        }
    }

    fn make_fifo(tag: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "thermolink-detect-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let fifo = dir.join("loop");
        let cpath = CString::new(fifo.as_os_str().as_bytes()).expect("path has no NUL");
        // SAFETY: valid NUL-terminated path.
        let rc = unsafe { libc::mkfifo(cpath.as_ptr(), 0o600) };
        assert_eq!(rc, 0, "mkfifo should succeed");
        (dir, fifo)
    }

    fn full_scan_traffic() -> Bytes {
        let mut traffic = Vec::new();
        for (i, code) in CHANNEL_CODES.iter().enumerate() {
            let tenths = if i < 3 { 200 + i as i32 } else { 0 };
            traffic.extend_from_slice(&encode_frame(*code, Unit::Celsius, tenths));
        }
        Bytes::from(traffic)
    }

    fn spawn_feeder(fifo: PathBuf, payload: Bytes) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut file = loop {
                match tokio::fs::OpenOptions::new().write(true).open(&fifo).await {
                    Ok(file) => break file,
                    Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
                }
            };
            let _ = file.write_all(&payload).await;
            let _ = file.flush().await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
    }

    #[tokio::test]
    async fn empty_candidate_list_reports_nothing_found() {
        let err = auto_detect_with(
            Vec::new(),
            Duration::from_millis(100),
            PortSettings::default(),
            detect_config(),
        )
        .await
        .expect_err("no candidates should fail");
        assert!(matches!(err, DiscoverError::NothingFound { candidates: 0 }));
    }

    #[tokio::test]
    async fn low_confidence_candidates_are_never_live_tested() {
        // Paths that do not exist; a live test attempt would error loudly,
        // but these score below the cutoff and must be skipped outright.
        let ports = vec![
            info("/dev/cu.Bluetooth-Incoming-Port".into(), None),
            info("/dev/ttyS9".into(), Some("dead")),
        ];
        let err = auto_detect_with(
            ports,
            Duration::from_millis(100),
            PortSettings::default(),
            detect_config(),
        )
        .await
        .expect_err("no high-confidence candidates should fail");
        assert!(matches!(err, DiscoverError::NothingFound { candidates: 2 }));
    }

    #[tokio::test]
    async fn all_zero_scan_is_skipped_with_attachment_guidance() {
        let (dir, fifo) = make_fifo("zeros");
        let mut traffic = Vec::new();
        for code in CHANNEL_CODES {
            traffic.extend_from_slice(&encode_frame(code, Unit::Celsius, 0));
        }
        let feeder = spawn_feeder(fifo.clone(), Bytes::from(traffic));

        let err = auto_detect_with(
            vec![info(fifo.clone(), Some("0403"))],
            Duration::from_secs(10),
            PortSettings::default(),
            detect_config(),
        )
        .await
        .expect_err("a logger with no thermocouples should not be detected");
        assert!(matches!(err, DiscoverError::NothingFound { candidates: 1 }));

        let hint = DiscoverError::NoThermocouples { path: fifo }.to_string();
        assert!(hint.contains("attach at least one thermocouple"));

        feeder.abort();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn detects_a_logger_and_skips_a_dead_candidate() {
        let (dir, fifo) = make_fifo("mixed");
        let feeder = spawn_feeder(fifo.clone(), full_scan_traffic());

        // The missing FTDI device outranks the fifo but fails its probe;
        // detection should fall through to the live one.
        let ports = vec![
            info(fifo.clone(), Some("0403")),
            info("/dev/definitely-missing-usbserial".into(), Some("0403")),
        ];
        let found = auto_detect_with(
            ports,
            Duration::from_secs(10),
            PortSettings::default(),
            detect_config(),
        )
        .await
        .expect("the fifo-backed candidate should be detected");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, fifo);
        assert_eq!(found[0].channels.len(), 3);
        assert!(found[0].score >= HIGH_CONFIDENCE);

        feeder.abort();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
