//! JSON configuration for the Raspberry Pi reader.

use std::path::Path;

use ad7190::{Calibration, Channel, ClockSource, Gain, Polarity, Settings};
use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub bus: BusConfig,
    pub driver: Settings,
    pub measurement: MeasurementConfig,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;

        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Where the ADC sits on the Pi.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// SPI bus number, `/dev/spidev<bus>.*`.
    pub bus: u8,
    /// Slave select line of the bus driving the chip select.
    pub slave_id: u8,
    pub clock_hz: u32,
    /// BCM number of the GPIO used as chip select.
    pub chip_select_gpio: u8,
    /// BCM number of the GPIO wired to DOUT/RDY.
    pub ready_gpio: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bus: 0,
            slave_id: 1,
            clock_hz: 1_000_000,
            chip_select_gpio: 24,
            ready_gpio: 25,
        }
    }
}

/// What to set up and read once the device is found.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeasurementConfig {
    pub reset_on_start: bool,
    /// Pause after reset before the first command.
    pub settle_ms: u64,
    pub channel: Channel,
    pub polarity: Polarity,
    pub gain: Gain,
    pub clock: ClockSource,
    /// Filter word FS9..FS0, 1 to 1023.
    pub filter_rate: u16,
    pub sinc3: bool,
    pub reject_60hz: bool,
    pub status_append: bool,
    /// Run in order on `channel` before measuring.
    pub calibrations: Vec<Calibration>,
    /// Conversions averaged per reading, 0 skips the average.
    pub samples: u8,
    pub read_temperature: bool,
    pub interval_ms: u64,
    /// Stop after this many readings, run forever when absent.
    pub iterations: Option<u32>,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            reset_on_start: true,
            settle_ms: 1,
            channel: Channel::Ain1Ain2,
            polarity: Polarity::Bipolar,
            gain: Gain::G1,
            clock: ClockSource::Internal,
            filter_rate: 0x060,
            sinc3: false,
            reject_60hz: false,
            status_append: false,
            calibrations: vec![Calibration::InternalZero, Calibration::InternalFull],
            samples: 10,
            read_temperature: true,
            interval_ms: 500,
            iterations: None,
        }
    }
}
