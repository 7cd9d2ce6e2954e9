//! Bring-up and measurement sequence run against an AD7190.

use std::fmt::Debug;
use std::time::Duration;

use ad7190::Ad7190;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::spi::SpiDevice;
use serde::Serialize;

use crate::config::MeasurementConfig;

/// One line of output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reading {
    pub channel: u8,
    pub single: u32,
    pub average: Option<u32>,
    pub temperature_c: Option<i32>,
}

/// Turn a driver error into an [`anyhow::Error`] carrying its message.
fn lift<T, SE: Debug, PE: Debug>(result: Result<T, ad7190::Error<SE, PE>>) -> anyhow::Result<T> {
    result.map_err(|e| anyhow::anyhow!("{e}"))
}

/// Reset (optionally), identify, configure and calibrate the device.
pub fn prepare<SPI, RDY, D>(
    adc: &mut Ad7190<SPI, RDY, D>,
    config: &MeasurementConfig,
) -> anyhow::Result<()>
where
    SPI: SpiDevice,
    RDY: InputPin,
    D: DelayNs,
{
    if config.reset_on_start {
        lift(adc.reset())?;
        std::thread::sleep(Duration::from_millis(config.settle_ms));
    }

    if !lift(adc.init())? {
        anyhow::bail!("AD7190 not found");
    }

    let mode = adc
        .mode()
        .with_clock(config.clock)
        .with_rate(config.filter_rate)
        .with_sinc3(config.sinc3)
        .with_reject_60hz(config.reject_60hz)
        .with_status_append(config.status_append);

    lift(adc.write_mode(mode))?;
    lift(adc.range_setup(config.polarity, config.gain))?;

    for calibration in &config.calibrations {
        log::info!("running {:?} calibration on {:?}", calibration, config.channel);
        lift(adc.calibrate(*calibration, config.channel))?;
    }

    lift(adc.channel_select(config.channel))?;

    log::info!(
        "configured: MODE={:#08x} CONF={:#08x}",
        adc.mode().bits(),
        adc.configuration().bits()
    );

    Ok(())
}

/// Take one reading as configured.
pub fn measure<SPI, RDY, D>(
    adc: &mut Ad7190<SPI, RDY, D>,
    config: &MeasurementConfig,
) -> anyhow::Result<Reading>
where
    SPI: SpiDevice,
    RDY: InputPin,
    D: DelayNs,
{
    if adc.configuration().channels() != config.channel.mask() {
        lift(adc.channel_select(config.channel))?;
    }

    let single = lift(adc.single_conversion())?;

    let average = match config.samples {
        0 => None,
        samples => Some(lift(adc.continuous_read_avg(samples))?),
    };

    let temperature_c = if config.read_temperature {
        Some(lift(adc.temperature_read())?)
    } else {
        None
    };

    Ok(Reading {
        channel: config.channel as u8,
        single,
        average,
        temperature_c,
    })
}
