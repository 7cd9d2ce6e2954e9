//! Communications-register framing and MSB-first register payloads.

use core::fmt;

use crate::registers::{comm_addr, COMM_CREAD, COMM_READ, COMM_WRITE};

/// Largest payload of any register, DATA with the status byte appended.
pub const MAX_WIDTH: usize = 4;

/// R/W bit of the Comm byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Register address does not fit in 3 bits.
    InvalidRegister(u8),
    /// Payload width in bytes is not one of 1, 3 or 4.
    InvalidWidth(u8),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegister(address) => write!(f, "invalid register address {address}"),
            Self::InvalidWidth(width) => write!(f, "invalid register width of {width} bytes"),
        }
    }
}

/// Check that `address` names one of the eight registers.
pub fn check_address(address: u8) -> Result<u8, CodecError> {
    if address > 0x7 {
        Err(CodecError::InvalidRegister(address))
    } else {
        Ok(address)
    }
}

/// Check that `width` bytes is a width some register has (8, 24 or 32 bits).
pub fn check_width(width: u8) -> Result<usize, CodecError> {
    match width {
        1 | 3 | 4 => Ok(width as usize),
        _ => Err(CodecError::InvalidWidth(width)),
    }
}

/// Build the communications-register byte that opens a transaction.
///
/// ```text
///   7      6     5    4    3     2      1  0
/// WEN(0)  R/W  RS2  RS1  RS0  CREAD    0  0
/// ```
///
/// WEN is left clear so the device accepts the frame.
pub fn comm_byte(address: u8, direction: Direction, continuous: bool) -> Result<u8, CodecError> {
    let address = check_address(address)?;

    let direction = match direction {
        Direction::Write => COMM_WRITE,
        Direction::Read => COMM_READ,
    };

    let continuous = if continuous { COMM_CREAD } else { 0 };

    Ok(direction | comm_addr(address) | continuous)
}

/// A register payload of 1 to 4 bytes, most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    bytes: [u8; MAX_WIDTH],
    len: usize,
}

impl Payload {
    /// Bytes to clock out, most significant first.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Serialize the low `width` bytes of `value`, MSB first. Higher bytes are dropped.
pub fn encode(value: u32, width: u8) -> Result<Payload, CodecError> {
    let len = check_width(width)?;

    let mut bytes = [0; MAX_WIDTH];
    bytes[..len].copy_from_slice(&value.to_be_bytes()[MAX_WIDTH - len..]);

    Ok(Payload { bytes, len })
}

/// Combine an MSB-first payload back into an integer.
pub fn decode(bytes: &[u8]) -> Result<u32, CodecError> {
    let len = u8::try_from(bytes.len()).unwrap_or(u8::MAX);
    check_width(len)?;

    Ok(bytes
        .iter()
        .fold(0u32, |value, &byte| (value << 8) | byte as u32))
}
