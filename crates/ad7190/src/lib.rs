//! Provides a driver for an Analog Devices AD7190 24-bit sigma-delta ADC via the `embedded-hal` ecosystem.
//!
//! The chip is reached through an [`SpiDevice`](embedded_hal::spi::SpiDevice) in SPI mode 3, with the
//! RDY line (DOUT/RDY, or a GPIO wired to it) read through an
//! [`InputPin`](embedded_hal::digital::InputPin). The driver keeps an in-memory copy of the MODE and
//! CONF registers and writes every change through to the device.

#![cfg_attr(not(any(test, feature = "sim")), no_std)]
#![forbid(unsafe_code)]

use core::fmt;

pub mod codec;
pub mod device;
pub mod registers;
pub mod settings;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use codec::CodecError;
pub use device::Ad7190;
pub use registers::{
    Calibration, Channel, ClockSource, ConfigRegister, Gain, ModeRegister, OperatingMode,
    Polarity, Reference, Register, Status,
};
pub use settings::{Settings, TemperatureCalibration};

/// Driver errors, generic over the SPI error `SE` and the RDY pin error `PE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error<SE, PE> {
    /// Register address outside 0..=7.
    InvalidRegister(u8),
    /// Byte count other than 1, 3 or 4, or not the width of the addressed register.
    InvalidWidth(u8),
    /// Argument out of range for the operation, such as zero samples or a bare register write.
    InvalidArgument,
    /// ID register held this value instead of an AD7190 ID.
    DeviceNotFound(u8),
    /// RDY did not go low within the configured bound.
    Timeout,
    /// RDY did not go low while a calibration was running.
    CalibrationTimeout,
    /// A framed register access was attempted while continuous read is active.
    ContinuousReadActive,
    /// The SPI transfer failed.
    Spi(SE),
    /// Reading the RDY pin failed.
    Ready(PE),
}

impl<SE, PE> From<CodecError> for Error<SE, PE> {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::InvalidRegister(address) => Self::InvalidRegister(address),
            CodecError::InvalidWidth(width) => Self::InvalidWidth(width),
        }
    }
}

impl<SE: fmt::Debug, PE: fmt::Debug> fmt::Display for Error<SE, PE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegister(address) => write!(f, "invalid register address {address}"),
            Self::InvalidWidth(width) => write!(f, "invalid register width of {width} bytes"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::DeviceNotFound(id) => write!(f, "no AD7190 found (ID register read {id:#04x})"),
            Self::Timeout => write!(f, "timed out waiting for RDY"),
            Self::CalibrationTimeout => write!(f, "timed out waiting for calibration"),
            Self::ContinuousReadActive => write!(f, "device is in continuous read mode"),
            Self::Spi(e) => write!(f, "SPI transfer failed: {e:?}"),
            Self::Ready(e) => write!(f, "RDY pin read failed: {e:?}"),
        }
    }
}
