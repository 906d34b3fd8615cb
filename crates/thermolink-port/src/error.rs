use std::path::{Path, PathBuf};

/// Errors that can occur in port driver operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The device node exists but access was denied.
    #[error("permission denied opening {path} (is the user in the dialout/uucp group?)")]
    PermissionDenied { path: PathBuf },

    /// The device is held by another process.
    #[error("device {path} is busy or in use by another process")]
    Busy { path: PathBuf },

    /// The device node is missing.
    #[error("device {path} not found")]
    NotFound { path: PathBuf },

    /// The device dropped off the bus mid-session.
    #[error("I/O error on {path}: device disconnected")]
    Disconnected { path: PathBuf },

    /// An advisory lock artifact names another live process.
    #[error("device {path} appears locked by another process")]
    Locked { path: PathBuf },

    /// No platform utilities are available for serial line discipline.
    #[error("serial I/O is not supported on this platform")]
    UnsupportedPlatform,

    /// `open` was called on a port that is already open.
    #[error("port already open")]
    AlreadyOpen,

    /// The port is closed; the operation cannot proceed.
    #[error("port closed")]
    Closed,

    /// The write FIFO is at capacity; the write was rejected, not queued.
    #[error("write buffer overflow ({cap} writes pending)")]
    BufferOverflow { cap: usize },

    /// The relay or configuration process could not be started.
    #[error("failed to spawn line-discipline process: {0}")]
    Spawn(std::io::Error),

    /// Line discipline configuration failed with unrecognized diagnostics.
    #[error("line discipline configuration failed: {0}")]
    Configure(String),

    /// An I/O error occurred on the port's byte streams.
    #[error("port I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PortError {
    /// True for failure classes worth retrying with backoff.
    ///
    /// Permission, busy, lock and disconnect-class errors commonly clear on
    /// their own (replug, another process releasing the device). A missing
    /// node is transient too: a logger being replugged briefly unregisters
    /// its device node. Unsupported platforms and unrecognized configuration
    /// failures do not improve with retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::PermissionDenied { .. }
                | PortError::Busy { .. }
                | PortError::NotFound { .. }
                | PortError::Disconnected { .. }
                | PortError::Locked { .. }
                | PortError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PortError>;

/// Map diagnostic text from the platform utilities onto an error class.
///
/// The utilities write free-form messages to stderr; this recognizes the
/// actionable families. Unrecognized text returns `None` and callers
/// surface it generically.
pub fn classify_diagnostic(path: &Path, text: &str) -> Option<PortError> {
    let lower = text.to_ascii_lowercase();
    let path = path.to_path_buf();
    if lower.contains("permission denied") || lower.contains("access denied") {
        Some(PortError::PermissionDenied { path })
    } else if lower.contains("resource busy")
        || lower.contains("device busy")
        || lower.contains("in use")
    {
        Some(PortError::Busy { path })
    } else if lower.contains("no such file")
        || lower.contains("no such device")
        || lower.contains("not found")
        || lower.contains("nonexistent")
    {
        Some(PortError::NotFound { path })
    } else if lower.contains("input/output error")
        || lower.contains("i/o error")
        || lower.contains("disconnect")
    {
        Some(PortError::Disconnected { path })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Option<PortError> {
        classify_diagnostic(Path::new("/dev/ttyUSB0"), text)
    }

    #[test]
    fn recognizes_permission_denied() {
        assert!(matches!(
            classify("stty: /dev/ttyUSB0: Permission denied"),
            Some(PortError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn recognizes_busy() {
        assert!(matches!(
            classify("cat: /dev/ttyUSB0: Device or resource busy"),
            Some(PortError::Busy { .. })
        ));
    }

    #[test]
    fn recognizes_not_found() {
        assert!(matches!(
            classify("stty: /dev/ttyUSB0: No such file or directory"),
            Some(PortError::NotFound { .. })
        ));
    }

    #[test]
    fn recognizes_disconnect() {
        assert!(matches!(
            classify("cat: /dev/ttyUSB0: Input/output error"),
            Some(PortError::Disconnected { .. })
        ));
    }

    #[test]
    fn unrecognized_text_stays_generic() {
        assert!(classify("something peculiar happened").is_none());
    }

    #[test]
    fn transient_classification() {
        let path = PathBuf::from("/dev/ttyUSB0");
        assert!(PortError::Busy { path: path.clone() }.is_transient());
        assert!(PortError::NotFound { path: path.clone() }.is_transient());
        assert!(PortError::PermissionDenied { path }.is_transient());
        assert!(!PortError::UnsupportedPlatform.is_transient());
        assert!(!PortError::AlreadyOpen.is_transient());
        assert!(!PortError::Configure("weird".into()).is_transient());
    }
}
