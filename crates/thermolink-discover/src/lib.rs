//! Datalogger discovery.
//!
//! Two-stage filter: a cheap deterministic heuristic ranks the host's
//! serial devices, then only high-confidence candidates get the expensive
//! live data test. The heuristic is a ranking aid, not a hard filter;
//! callers decide cutoffs.

pub mod detect;
pub mod error;
pub mod probe;
pub mod score;

pub use detect::{auto_detect, auto_detect_with, Detected};
pub use error::{DiscoverError, Result};
pub use probe::{test_port_for_data, ActiveChannel, DataProbe};
pub use score::{score_port, PortScore, HIGH_CONFIDENCE};
