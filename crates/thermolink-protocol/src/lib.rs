//! HH-4208SD serial frame parsing.
//!
//! The datalogger emits `\r`-delimited ASCII frames. Each frame carries:
//! - A 1-byte STX (0x02) start marker for stream synchronization
//! - A 2-character channel code ("41" through "4C", channels 1-12)
//! - A 2-character unit code, a polarity digit, a decimal-position digit
//! - A digit payload whose last three digits encode tenths of a degree
//!
//! No partial reads, no buffer management in user code: [`FrameCarry`]
//! turns arbitrarily chunked byte input into complete parsed readings.

pub mod carry;
pub mod channel;
pub mod error;
pub mod frame;

pub use carry::FrameCarry;
pub use channel::{ChannelCode, CHANNEL_CODES, CHANNEL_COUNT};
pub use error::{ParseError, Result};
pub use frame::{encode_frame, parse_frame, Reading, Unit, STX, TERMINATOR};
