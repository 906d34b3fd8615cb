//! Best-effort serial device enumeration.
//!
//! Listing is per-OS and degrades to an empty list on any failure; callers
//! treat the result as a hint, not an inventory.

use std::path::{Path, PathBuf};

use tracing::debug;

/// One enumerated serial device with whatever metadata the OS exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device node path, e.g. `/dev/ttyUSB0` or `/dev/cu.usbserial-A1B2`.
    pub path: PathBuf,
    /// USB vendor ID as 4 lowercase hex characters, when known.
    pub vendor_id: Option<String>,
    /// USB manufacturer string, when known.
    pub manufacturer: Option<String>,
}

impl PortInfo {
    /// A bare descriptor with no USB metadata.
    pub fn bare(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            vendor_id: None,
            manufacturer: None,
        }
    }
}

/// Enumerate candidate serial devices on this host.
pub fn list_ports() -> Vec<PortInfo> {
    let entries = match std::fs::read_dir("/dev") {
        Ok(entries) => entries,
        Err(err) => {
            debug!(%err, "device enumeration unavailable");
            return Vec::new();
        }
    };

    let mut ports = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_serial_name(&name) {
            continue;
        }
        let (vendor_id, manufacturer) = usb_metadata(&name);
        ports.push(PortInfo {
            path: entry.path(),
            vendor_id,
            manufacturer,
        });
    }
    ports.sort_by(|a, b| a.path.cmp(&b.path));
    ports
}

/// Whether a `/dev` entry name looks like a serial device on this OS.
pub fn is_serial_name(name: &str) -> bool {
    if cfg!(target_os = "macos") {
        name.starts_with("cu.")
    } else if cfg!(unix) {
        name.starts_with("ttyUSB") || name.starts_with("ttyACM") || name.starts_with("rfcomm")
    } else {
        false
    }
}

/// Read `(idVendor, manufacturer)` from sysfs for a tty name, on Linux.
fn usb_metadata(name: &str) -> (Option<String>, Option<String>) {
    if !cfg!(target_os = "linux") {
        return (None, None);
    }
    let device = match std::fs::canonicalize(format!("/sys/class/tty/{name}/device")) {
        Ok(path) => path,
        Err(_) => return (None, None),
    };
    // The USB device directory sits a couple of levels above the tty node.
    let mut dir: &Path = &device;
    for _ in 0..5 {
        let vendor = dir.join("idVendor");
        if vendor.is_file() {
            return (read_trimmed(&vendor), read_trimmed(&dir.join("manufacturer")));
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }
    (None, None)
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_ascii_lowercase())
}
