use crate::channel::ChannelCode;
use crate::error::{ParseError, Result};

/// Frame start marker.
pub const STX: u8 = 0x02;

/// Frame terminator. Frames on the wire are `\r`-delimited.
pub const TERMINATOR: u8 = 0x0D;

/// Lowest accepted temperature, in tenths of a degree.
pub const MIN_TENTHS: i32 = -2000;

/// Highest accepted temperature, in tenths of a degree.
pub const MAX_TENTHS: i32 = 20000;

/// Temperature unit reported in a frame.
///
/// Any unit code other than `"01"`/`"02"` is carried as `Unknown`; an odd
/// unit code alone does not invalidate a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Fahrenheit,
    Unknown,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Unit::Celsius => "C",
            Unit::Fahrenheit => "F",
            Unit::Unknown => "?",
        })
    }
}

/// One validated temperature reading decoded from a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// The channel code the frame named.
    pub code: ChannelCode,
    /// Reported unit.
    pub unit: Unit,
    /// True when the polarity digit marked the value negative.
    pub negative: bool,
    /// Signed temperature in tenths of a degree.
    pub tenths: i32,
}

impl Reading {
    /// Channel number 1-12, derived from the code.
    pub fn channel(&self) -> u8 {
        self.code.number()
    }

    /// Temperature as a decimal value with one fractional digit.
    pub fn temperature(&self) -> f64 {
        f64::from(self.tenths) / 10.0
    }

    /// True for an exact 0.0 reading, which the hardware reports on
    /// populated channels with no thermocouple attached.
    pub fn is_zero(&self) -> bool {
        self.tenths == 0
    }
}

/// Parse one `\r`-delimited frame body (terminator already stripped).
///
/// Layout after the STX byte: channel code (2), unit code (2), polarity (1),
/// decimal position (1), digit payload (rest). The payload is scrubbed of
/// non-digit bytes and the last three surviving digits, divided by 10, are
/// the magnitude. The line protocol is noisy, so bytes past the header are
/// treated tolerantly; the trailing three digits are the load-bearing part.
pub fn parse_frame(frame: &[u8]) -> Result<Reading> {
    if frame.len() < 3 {
        return Err(ParseError::TooShort { len: frame.len() });
    }
    if frame[0] != STX {
        return Err(ParseError::MissingStx { found: frame[0] });
    }
    let code = ChannelCode::from_wire([frame[1], frame[2]])?;

    let unit = match frame.get(3..5) {
        Some(b"01") => Unit::Celsius,
        Some(b"02") => Unit::Fahrenheit,
        _ => Unit::Unknown,
    };

    // Anything other than '1' is positive polarity.
    let negative = frame.get(5) == Some(&b'1');

    // frame[6] is the decimal-position digit; the instrument always reports
    // one fractional digit so the fixed /10 below stands in for it.

    let payload = frame.get(7..).unwrap_or(&[]);
    let digits: Vec<u8> = payload
        .iter()
        .copied()
        .filter(u8::is_ascii_digit)
        .collect();
    if digits.len() < 3 {
        return Err(ParseError::TooFewDigits { found: digits.len() });
    }

    let magnitude: i32 = digits[digits.len() - 3..]
        .iter()
        .fold(0, |acc, d| acc * 10 + i32::from(d - b'0'));
    let tenths = if negative { -magnitude } else { magnitude };

    if !(MIN_TENTHS..=MAX_TENTHS).contains(&tenths) {
        return Err(ParseError::OutOfRange { tenths });
    }

    Ok(Reading {
        code,
        unit,
        negative,
        tenths,
    })
}

/// Encode a frame the way the instrument would emit it, terminator included.
///
/// Used to synthesize device traffic in tests and simulations.
pub fn encode_frame(code: ChannelCode, unit: Unit, tenths: i32) -> Vec<u8> {
    let unit_code: &[u8; 2] = match unit {
        Unit::Celsius => b"01",
        Unit::Fahrenheit => b"02",
        Unit::Unknown => b"00",
    };
    let polarity = if tenths < 0 { b'1' } else { b'0' };
    let mut frame = Vec::with_capacity(16);
    frame.push(STX);
    frame.extend_from_slice(&code.as_bytes());
    frame.extend_from_slice(unit_code);
    frame.push(polarity);
    frame.push(b'1'); // decimal position
    frame.extend_from_slice(format!("{:06}", tenths.unsigned_abs()).as_bytes());
    frame.push(TERMINATOR);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut f = vec![STX];
        f.extend_from_slice(body);
        f
    }

    #[test]
    fn parses_celsius_reading() {
        // Channel "41", Celsius, positive, payload ending in 123 -> 12.3
        let reading = parse_frame(&frame(b"410101005123")).unwrap();
        assert_eq!(reading.channel(), 1);
        assert_eq!(reading.unit, Unit::Celsius);
        assert!(!reading.negative);
        assert_eq!(reading.temperature(), 12.3);
    }

    #[test]
    fn parses_negative_fahrenheit_reading() {
        let reading = parse_frame(&frame(b"4C0211000457")).unwrap();
        assert_eq!(reading.channel(), 12);
        assert_eq!(reading.unit, Unit::Fahrenheit);
        assert!(reading.negative);
        assert_eq!(reading.temperature(), -45.7);
    }

    #[test]
    fn unknown_unit_code_is_still_valid() {
        let reading = parse_frame(&frame(b"419901000500")).unwrap();
        assert_eq!(reading.unit, Unit::Unknown);
        assert_eq!(reading.temperature(), 50.0);
    }

    #[test]
    fn odd_polarity_byte_defaults_positive() {
        let reading = parse_frame(&frame(b"4101x1000250")).unwrap();
        assert!(!reading.negative);
        assert_eq!(reading.temperature(), 25.0);
    }

    #[test]
    fn scrubs_interleaved_garbage_from_payload() {
        let reading = parse_frame(&frame(b"410101\x00a0\xff0ok5\t123")).unwrap();
        assert_eq!(reading.temperature(), 12.3);
    }

    #[test]
    fn too_short_frame() {
        assert_eq!(parse_frame(&[STX, b'4']), Err(ParseError::TooShort { len: 2 }));
        assert_eq!(parse_frame(&[]), Err(ParseError::TooShort { len: 0 }));
    }

    #[test]
    fn missing_stx() {
        assert_eq!(
            parse_frame(b"410101000123"),
            Err(ParseError::MissingStx { found: b'4' })
        );
    }

    #[test]
    fn unknown_channel_code() {
        assert!(matches!(
            parse_frame(&frame(b"4D0101000123")),
            Err(ParseError::UnknownChannel { .. })
        ));
    }

    #[test]
    fn lowercase_channel_code_accepted() {
        let reading = parse_frame(&frame(b"4b0101000250")).unwrap();
        assert_eq!(reading.channel(), 11);
    }

    #[test]
    fn too_few_digits_after_scrubbing() {
        assert_eq!(
            parse_frame(&frame(b"410101xx1y2z")),
            Err(ParseError::TooFewDigits { found: 2 })
        );
        assert_eq!(
            parse_frame(&frame(b"41")),
            Err(ParseError::TooFewDigits { found: 0 })
        );
    }

    #[test]
    fn short_valid_code_frame_lacks_digits() {
        // Length 3 passes the structural check, then fails on digits.
        assert_eq!(
            parse_frame(&[STX, b'4', b'1']),
            Err(ParseError::TooFewDigits { found: 0 })
        );
    }

    #[test]
    fn range_boundaries() {
        // The /10 decode caps magnitudes at 99.9, so exercise the boundary
        // checks directly on the tenths range.
        assert!((MIN_TENTHS..=MAX_TENTHS).contains(&20000));
        assert!((MIN_TENTHS..=MAX_TENTHS).contains(&-2000));
        assert!(!(MIN_TENTHS..=MAX_TENTHS).contains(&20001));
        assert!(!(MIN_TENTHS..=MAX_TENTHS).contains(&-2001));

        let max = parse_frame(&frame(b"410101000999")).unwrap();
        assert_eq!(max.temperature(), 99.9);
        let min = parse_frame(&frame(b"410111000999")).unwrap();
        assert_eq!(min.temperature(), -99.9);
    }

    #[test]
    fn zero_reading_flagged() {
        let reading = parse_frame(&frame(b"410101000000")).unwrap();
        assert!(reading.is_zero());
        assert_eq!(reading.temperature(), 0.0);
    }

    #[test]
    fn parse_is_pure() {
        let bytes = frame(b"410101005123");
        assert_eq!(parse_frame(&bytes), parse_frame(&bytes));
    }

    #[test]
    fn encode_parse_roundtrip() {
        for code in crate::channel::CHANNEL_CODES {
            let wire = encode_frame(code, Unit::Celsius, 235);
            assert_eq!(*wire.last().unwrap(), TERMINATOR);
            let reading = parse_frame(&wire[..wire.len() - 1]).unwrap();
            assert_eq!(reading.code, code);
            assert_eq!(reading.temperature(), 23.5);
        }
    }

    #[test]
    fn encode_negative_roundtrip() {
        let code = ChannelCode::from_wire(*b"45").unwrap();
        let wire = encode_frame(code, Unit::Celsius, -457);
        let reading = parse_frame(&wire[..wire.len() - 1]).unwrap();
        assert!(reading.negative);
        assert_eq!(reading.temperature(), -45.7);
    }
}
