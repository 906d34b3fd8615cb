//! Hardware channel codes.
//!
//! The HH-4208SD names its 12 thermocouple inputs with the ASCII hex pairs
//! "41" through "4C". Codes map bijectively onto channel numbers 1-12.

use crate::error::ParseError;

/// Number of thermocouple channels on the hardware.
pub const CHANNEL_COUNT: usize = 12;

/// All valid channel codes in channel-number order.
pub const CHANNEL_CODES: [ChannelCode; CHANNEL_COUNT] = [
    ChannelCode(*b"41"),
    ChannelCode(*b"42"),
    ChannelCode(*b"43"),
    ChannelCode(*b"44"),
    ChannelCode(*b"45"),
    ChannelCode(*b"46"),
    ChannelCode(*b"47"),
    ChannelCode(*b"48"),
    ChannelCode(*b"49"),
    ChannelCode(*b"4A"),
    ChannelCode(*b"4B"),
    ChannelCode(*b"4C"),
];

/// A validated 2-character channel code.
///
/// Always stored uppercased, so `"4a"` and `"4A"` compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelCode([u8; 2]);

impl ChannelCode {
    /// Parse a channel code from its two raw wire bytes.
    ///
    /// Lowercase hex letters are accepted and normalized.
    pub fn from_wire(raw: [u8; 2]) -> Result<Self, ParseError> {
        let upper = [raw[0].to_ascii_uppercase(), raw[1].to_ascii_uppercase()];
        match upper {
            [b'4', b'1'..=b'9' | b'A'..=b'C'] => Ok(Self(upper)),
            _ => Err(ParseError::UnknownChannel {
                code: String::from_utf8_lossy(&raw).into_owned(),
            }),
        }
    }

    /// Look up the code for a channel number (1-12).
    pub fn from_number(number: u8) -> Option<Self> {
        CHANNEL_CODES.get(usize::from(number).checked_sub(1)?).copied()
    }

    /// The channel number this code names (1-12).
    pub fn number(&self) -> u8 {
        match self.0[1] {
            d @ b'1'..=b'9' => d - b'0',
            l => 10 + (l - b'A'),
        }
    }

    /// The code as a 2-character string slice.
    pub fn as_str(&self) -> &str {
        // Validated ASCII on construction.
        std::str::from_utf8(&self.0).unwrap_or("??")
    }

    /// The raw wire bytes.
    pub fn as_bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl std::fmt::Display for ChannelCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for ChannelCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChannelCode({})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_numbers_are_bijective() {
        for (i, code) in CHANNEL_CODES.iter().enumerate() {
            assert_eq!(code.number() as usize, i + 1);
            assert_eq!(ChannelCode::from_number(code.number()), Some(*code));
        }
    }

    #[test]
    fn lowercase_wire_bytes_normalize() {
        let code = ChannelCode::from_wire(*b"4a").unwrap();
        assert_eq!(code.as_str(), "4A");
        assert_eq!(code.number(), 10);
    }

    #[test]
    fn rejects_codes_outside_the_set() {
        for raw in [*b"40", *b"4D", *b"51", *b"xx", *b"  "] {
            assert!(matches!(
                ChannelCode::from_wire(raw),
                Err(ParseError::UnknownChannel { .. })
            ));
        }
    }

    #[test]
    fn from_number_bounds() {
        assert!(ChannelCode::from_number(0).is_none());
        assert!(ChannelCode::from_number(13).is_none());
        assert_eq!(ChannelCode::from_number(12).unwrap().as_str(), "4C");
    }
}
