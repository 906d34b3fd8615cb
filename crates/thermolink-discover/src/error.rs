use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur during discovery.
///
/// Per-candidate failures carry remediation hints for the operator;
/// discovery as a whole fails only when zero dataloggers turn up.
#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    /// Nothing arrived on the port within the probe budget.
    #[error(
        "no data from {path} within {budget:?}; check the logger is powered on \
         and its RS-232 output is enabled (hold the USB/RS232 button)"
    )]
    NoData { path: PathBuf, budget: Duration },

    /// Bytes arrived but no frame parsed before the budget ran out.
    #[error(
        "data from {path} is not in the expected protocol; check the logger \
         is set to 9600 baud RS-232 mode and the sampling interval is running"
    )]
    UnrecognizedData { path: PathBuf },

    /// A full channel scan completed but every reading was exactly 0.0.
    #[error(
        "datalogger at {path} completed a full channel scan but every channel \
         read 0.0; attach at least one thermocouple or check probe wiring"
    )]
    NoThermocouples { path: PathBuf },

    /// Every candidate was filtered out or failed its live test.
    #[error(
        "no dataloggers found across {candidates} candidate port(s); connect \
         a logger or configure device paths manually"
    )]
    NothingFound { candidates: usize },

    /// The candidate port could not be opened.
    #[error("port error: {0}")]
    Port(#[from] thermolink_port::PortError),
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
