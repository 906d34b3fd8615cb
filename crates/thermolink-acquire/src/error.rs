use std::path::PathBuf;

/// Errors that can occur while loading configuration or running acquisition.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// Every configured datalogger failed to start. Individual failures are
    /// tolerated; acquisition is only fatal with zero working sources.
    #[error("none of the {attempted} configured datalogger(s) could be started")]
    NoSources { attempted: usize },

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("port error: {0}")]
    Port(#[from] thermolink_port::PortError),
}

pub type Result<T> = std::result::Result<T, AcquireError>;
