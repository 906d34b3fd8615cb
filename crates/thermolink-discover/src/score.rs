use thermolink_port::PortInfo;

/// Score at or above which a candidate is worth a live data test.
pub const HIGH_CONFIDENCE: i32 = 8;

/// A candidate's likelihood score with a human-readable rationale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortScore {
    /// Non-negative; higher means more likely a datalogger.
    pub score: i32,
    /// Semicolon-joined reasons behind the score.
    pub rationale: String,
}

/// Deterministic likelihood heuristic over vendor ID, device path and
/// manufacturer string. Purely a ranking aid; does no I/O.
pub fn score_port(info: &PortInfo) -> PortScore {
    let mut score = 0i32;
    let mut reasons: Vec<String> = Vec::new();

    match info.vendor_id.as_deref() {
        Some("0403") => {
            score += 10;
            reasons.push("FTDI vendor ID, the usual HH-4208SD cable chipset".into());
        }
        Some("067b") => {
            score += 6;
            reasons.push("Prolific vendor ID".into());
        }
        Some("10c4") => {
            score += 6;
            reasons.push("Silicon Labs vendor ID".into());
        }
        Some(other) => {
            score -= 2;
            reasons.push(format!("unrecognized vendor ID {other}"));
        }
        None => {
            score -= 1;
            reasons.push("no vendor ID exposed".into());
        }
    }

    let path = info.path.to_string_lossy().to_ascii_lowercase();
    if path.contains("usbserial") || path.contains("ttyusb") {
        score += 3;
        reasons.push("USB-serial device path".into());
    }
    if path.contains("usbmodem") || path.contains("ttyacm") {
        score += 2;
        reasons.push("USB-modem device path".into());
    }
    if path.contains("bluetooth") || path.contains("rfcomm") {
        score -= 10;
        reasons.push("Bluetooth device path".into());
    }
    if path.contains("console") || path.contains("debug") {
        score -= 10;
        reasons.push("debug console device path".into());
    }

    if let Some(manufacturer) = info.manufacturer.as_deref() {
        if manufacturer.contains("ftdi") {
            score += 2;
            reasons.push("FTDI manufacturer string".into());
        }
    }

    PortScore {
        score: score.max(0),
        rationale: reasons.join("; "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(path: &str, vendor: Option<&str>, manufacturer: Option<&str>) -> PortInfo {
        PortInfo {
            path: path.into(),
            vendor_id: vendor.map(str::to_string),
            manufacturer: manufacturer.map(str::to_string),
        }
    }

    #[test]
    fn ftdi_usb_serial_clears_the_cutoff() {
        let scored = score_port(&info("/dev/ttyUSB0", Some("0403"), Some("ftdi")));
        assert!(scored.score >= HIGH_CONFIDENCE);
        assert!(scored.rationale.contains("FTDI"));
    }

    #[test]
    fn secondary_chipsets_score_moderately() {
        let prolific = score_port(&info("/dev/ttyUSB1", Some("067b"), None));
        let silabs = score_port(&info("/dev/cu.usbserial-01", Some("10c4"), None));
        assert!(prolific.score >= HIGH_CONFIDENCE);
        assert!(silabs.score >= HIGH_CONFIDENCE);
        let ftdi = score_port(&info("/dev/ttyUSB0", Some("0403"), None));
        assert!(ftdi.score > prolific.score);
    }

    #[test]
    fn unknown_vendor_is_penalized_but_floored() {
        let scored = score_port(&info("/dev/thing", Some("dead"), None));
        assert_eq!(scored.score, 0);
        assert!(scored.rationale.contains("unrecognized vendor ID dead"));
    }

    #[test]
    fn bluetooth_paths_are_heavily_penalized() {
        let scored = score_port(&info("/dev/cu.Bluetooth-Incoming-Port", None, None));
        assert_eq!(scored.score, 0);
        let scored = score_port(&info("/dev/rfcomm0", Some("0403"), None));
        assert!(scored.score < HIGH_CONFIDENCE);
    }

    #[test]
    fn path_hints_add_small_increments() {
        let bare = score_port(&info("/dev/something", None, None));
        let usb = score_port(&info("/dev/ttyACM0", None, None));
        assert!(usb.score > bare.score);
    }

    #[test]
    fn scoring_is_deterministic() {
        let descriptor = info("/dev/ttyUSB0", Some("0403"), Some("ftdi"));
        assert_eq!(score_port(&descriptor), score_port(&descriptor));
    }
}
