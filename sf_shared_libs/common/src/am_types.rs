/// Addressing values carried in every ActiveMessage header.
/// All of them are written and read as hex on the command line, e.g. `FFFF` for broadcast.
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmParseError {
    #[error("empty value")]
    Empty,
    #[error("'{value}' is longer than {max_digits} hex digits")]
    TooLong { value: String, max_digits: usize },
    #[error("'{0}' is not a hex number")]
    NotHex(String),
}

/// Parse 1..=max_digits hex digits, an optional 0x prefix is tolerated
fn parse_hex_digits(s: &str, max_digits: usize) -> Result<u16, AmParseError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() {
        return Err(AmParseError::Empty);
    }
    if digits.len() > max_digits {
        return Err(AmParseError::TooLong {
            value: s.to_string(),
            max_digits,
        });
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AmParseError::NotHex(s.to_string()));
    }
    u16::from_str_radix(digits, 16).map_err(|_| AmParseError::NotHex(s.to_string()))
}

/// 16 bit node address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AmAddr(pub u16);

/// 8 bit network group, nodes drop packets from other groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AmGroup(pub u8);

/// 8 bit application message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AmId(pub u8);

impl fmt::Display for AmAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl fmt::Display for AmGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

impl fmt::Display for AmId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

impl FromStr for AmAddr {
    type Err = AmParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_digits(s, 4).map(AmAddr)
    }
}

impl FromStr for AmGroup {
    type Err = AmParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // at most 2 digits so the cast cannot truncate
        parse_hex_digits(s, 2).map(|v| AmGroup(v as u8))
    }
}

impl FromStr for AmId {
    type Err = AmParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_digits(s, 2).map(|v| AmId(v as u8))
    }
}
