use bytes::Bytes;

/// Lifecycle and data signals emitted by one port driver.
///
/// Every driver owns its own broadcast channel; events never cross drivers
/// and there is no process-wide event bus.
#[derive(Debug, Clone)]
pub enum PortEvent {
    /// The relay process is up and the port accepts traffic.
    Opened,
    /// A chunk of inbound bytes, in arrival order.
    Data(Bytes),
    /// Health transitioned (true = receiving, false = silent past threshold).
    HealthChanged(bool),
    /// A non-fatal diagnostic surfaced from the device or relay.
    Error(String),
    /// The port is closed; no further events follow until reopened.
    Closed,
}

impl PortEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            PortEvent::Opened => "opened",
            PortEvent::Data(_) => "data",
            PortEvent::HealthChanged(_) => "health_changed",
            PortEvent::Error(_) => "error",
            PortEvent::Closed => "closed",
        }
    }
}
