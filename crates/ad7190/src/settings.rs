//! Driver tuning that is not stored on the chip.

#[cfg(feature = "serde")]
use serde::Deserialize;

/// Turns a temperature-channel code into degrees Celsius:
/// `(code - zero_code) / counts_per_kelvin - kelvin_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct TemperatureCalibration {
    /// Code read at 0 K, the bipolar mid-scale.
    pub zero_code: u32,
    pub counts_per_kelvin: u32,
    pub kelvin_offset: i32,
}

impl Default for TemperatureCalibration {
    /// Sensitivity and offset from the AD7190 datasheet (bipolar, gain 1).
    fn default() -> Self {
        Self {
            zero_code: 0x80_0000,
            counts_per_kelvin: 2815,
            kelvin_offset: 273,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct Settings {
    /// Number of RDY samples taken before giving up.
    pub ready_poll_limit: u32,
    /// Pause between RDY samples.
    pub ready_poll_interval_us: u32,
    pub temperature: TemperatureCalibration,
    /// Write the previous MODE value back once a calibration finishes.
    pub restore_mode_after_calibration: bool,
    /// Write the previous CONF value back after a temperature reading.
    pub restore_channel_after_temperature: bool,
}

impl Settings {
    /// Upper bound on a single RDY wait, in microseconds.
    pub fn ready_timeout_us(&self) -> u64 {
        self.ready_poll_limit as u64 * self.ready_poll_interval_us as u64
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // 2 s covers a full-scale calibration at the slowest filter setting
            ready_poll_limit: 200_000,
            ready_poll_interval_us: 10,
            temperature: TemperatureCalibration::default(),
            restore_mode_after_calibration: false,
            restore_channel_after_temperature: true,
        }
    }
}
