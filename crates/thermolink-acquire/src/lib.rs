//! Acquisition core: configuration, channel state and the per-logger
//! supervisor.
//!
//! Readings flow from the port driver through the frame parser into a
//! [`ChannelStore`], which reconciles statically configured channels with
//! channels that first appear at runtime. Each datalogger gets its own
//! acquisition task; they share nothing but the store.

pub mod config;
pub mod error;
pub mod store;
pub mod supervisor;

pub use config::{AcquireConfig, ChannelConfig, DataloggerConfig};
pub use error::{AcquireError, Result};
pub use store::{ChannelEntry, ChannelKey, ChannelSnapshot, ChannelStore};
pub use supervisor::Supervisor;
