use std::fmt;
use std::io;

use thermolink_acquire::AcquireError;
use thermolink_discover::DiscoverError;
use thermolink_port::PortError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn port_error(context: &str, err: PortError) -> CliError {
    match err {
        PortError::PermissionDenied { .. } => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        PortError::Io(source) => io_error(context, source),
        PortError::Spawn(source) => io_error(context, source),
        PortError::UnsupportedPlatform => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(PORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn discover_error(context: &str, err: DiscoverError) -> CliError {
    match err {
        DiscoverError::NoData { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        DiscoverError::UnrecognizedData { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        DiscoverError::NoThermocouples { .. } | DiscoverError::NothingFound { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        DiscoverError::Port(err) => port_error(context, err),
    }
}

pub fn acquire_error(context: &str, err: AcquireError) -> CliError {
    match err {
        AcquireError::NoSources { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        AcquireError::ConfigIo { source, .. } => io_error(context, source),
        AcquireError::ConfigParse { .. } | AcquireError::ConfigInvalid(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        AcquireError::Port(err) => port_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_maps_to_its_own_code() {
        let err = port_error(
            "opening",
            PortError::PermissionDenied {
                path: "/dev/ttyUSB0".into(),
            },
        );
        assert_eq!(err.code, PERMISSION_DENIED);
        assert!(err.message.starts_with("opening:"));
    }

    #[test]
    fn discovery_timeouts_map_to_timeout() {
        let err = discover_error(
            "detecting",
            DiscoverError::NoData {
                path: "/dev/ttyUSB0".into(),
                budget: std::time::Duration::from_secs(30),
            },
        );
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn empty_detection_is_a_plain_failure() {
        let err = discover_error("detecting", DiscoverError::NothingFound { candidates: 3 });
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn bad_config_maps_to_data_invalid() {
        let err = acquire_error(
            "loading config",
            AcquireError::ConfigInvalid("duplicate id".to_string()),
        );
        assert_eq!(err.code, DATA_INVALID);
    }
}
