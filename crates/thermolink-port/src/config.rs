use std::time::Duration;

/// Serial line settings.
///
/// The HH-4208SD speaks 9600 baud, 8 data bits, 1 stop bit, no parity, and
/// that is the default. Other combinations are passed through to the
/// platform utility untested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSettings {
    pub baud: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            baud: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
    }
}

/// Driver timing and capacity knobs.
///
/// Defaults match the hardware's expected behavior; tests shrink the
/// durations to keep suites fast.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// First retry delay after a transient open failure.
    pub retry_initial: Duration,
    /// Upper bound on the doubling retry delay.
    pub retry_cap: Duration,
    /// Total open attempts before giving up permanently.
    pub max_open_attempts: u32,
    /// Maximum pending entries in the write FIFO.
    pub write_queue_cap: usize,
    /// Pause between successive drained writes.
    pub inter_write_delay: Duration,
    /// Wait after spawning the relay before declaring the port open.
    pub settle_delay: Duration,
    /// Cadence of the health check task.
    pub health_interval: Duration,
    /// Silence window after which an open port is considered unhealthy.
    pub silence_threshold: Duration,
    /// Grace period between SIGTERM and SIGKILL on close.
    pub kill_grace: Duration,
    /// Broadcast capacity for port events.
    pub event_capacity: usize,
    /// Capacity of the pull-style byte stream.
    pub reader_capacity: usize,
    /// Run the line-discipline utility before spawning the relay.
    ///
    /// Disabled for endpoints that are not tty nodes (FIFOs in tests,
    /// recorded-traffic replay files).
    pub configure_line: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            retry_initial: Duration::from_secs(1),
            retry_cap: Duration::from_secs(30),
            max_open_attempts: 10,
            write_queue_cap: 1000,
            inter_write_delay: Duration::from_millis(10),
            settle_delay: Duration::from_millis(250),
            health_interval: Duration::from_secs(10),
            silence_threshold: Duration::from_secs(60),
            kill_grace: Duration::from_secs(5),
            event_capacity: 64,
            reader_capacity: 256,
            configure_line: true,
        }
    }
}

impl DriverConfig {
    /// Delay before retry number `attempt` (1-based): doubles from
    /// `retry_initial`, capped at `retry_cap`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_initial.saturating_mul(factor).min(self.retry_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = DriverConfig::default();
        let delays: Vec<u64> = (1..=9)
            .map(|attempt| config.retry_delay(attempt).as_secs())
            .collect();
        assert_eq!(delays, [1, 2, 4, 8, 16, 30, 30, 30, 30]);
    }

    #[test]
    fn backoff_survives_large_attempt_numbers() {
        let config = DriverConfig::default();
        assert_eq!(config.retry_delay(64), Duration::from_secs(30));
    }

    #[test]
    fn defaults_match_hardware() {
        let settings = PortSettings::default();
        assert_eq!(settings.baud, 9600);
        assert_eq!(settings.data_bits, 8);
        assert_eq!(settings.stop_bits, 1);
        assert_eq!(settings.parity, Parity::None);
    }
}
