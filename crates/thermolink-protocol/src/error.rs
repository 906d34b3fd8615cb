/// Errors that can occur while parsing a frame.
///
/// Parse errors are protocol-level: they describe one bad frame and never
/// carry I/O state. The stream continues after any of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The frame is shorter than the minimal STX + channel code.
    #[error("frame too short ({len} bytes, need at least 3)")]
    TooShort { len: usize },

    /// The frame does not begin with the STX start marker.
    #[error("frame does not start with STX 0x02 (got 0x{found:02X})")]
    MissingStx { found: u8 },

    /// The two channel-code bytes are not one of the 12 known codes.
    #[error("unknown channel code {code:?} (expected \"41\" through \"4C\")")]
    UnknownChannel { code: String },

    /// Fewer than three digits remained after scrubbing the payload.
    #[error("payload carries {found} digits after scrubbing, need 3")]
    TooFewDigits { found: usize },

    /// The decoded temperature falls outside the instrument's range.
    #[error("temperature {} out of range [-200.0, 2000.0]", *.tenths as f64 / 10.0)]
    OutOfRange { tenths: i32 },
}

pub type Result<T> = std::result::Result<T, ParseError>;
