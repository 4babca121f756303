/*
Hex text <-> bytes, used for packet payloads given on the command line and for
printing payloads in logs. Encoding is always lowercase.
*/
use std::fmt::Write;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("odd length hex string ({0} digits)")]
    OddLength(usize),
    #[error("invalid hex character '{character}' at position {index}")]
    InvalidCharacter { character: char, index: usize },
}

fn nibble(byte: u8, index: usize) -> Result<u8, HexError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(HexError::InvalidCharacter {
            character: byte as char,
            index,
        }),
    }
}

/// Decode a string of hex digit pairs into bytes. The empty string decodes to no bytes.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let digits = hex_str.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }
    digits
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| Ok(nibble(pair[0], i * 2)? << 4 | nibble(pair[1], i * 2 + 1)?))
        .collect()
}

pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // writing to a String cannot fail
        let _ = write!(out, "{:02x}", b);
    }
    out
}
