//! Process-backed serial port driver.
//!
//! Presents a duplex byte channel for one serial device without a native
//! serial binding: line discipline is configured with platform utilities,
//! raw I/O runs through a relay child process, and their instability is
//! masked behind retry, health monitoring and write pacing.

pub mod config;
pub mod driver;
pub mod enumerate;
pub mod error;
pub mod event;
mod platform;

pub use config::{DriverConfig, Parity, PortSettings};
pub use driver::{SerialPort, WriteAck};
pub use enumerate::{list_ports, PortInfo};
pub use error::{classify_diagnostic, PortError, Result};
pub use event::PortEvent;
