use std::cell::RefCell;
use std::time::Duration;

use ad7190::Ad7190;
use ad7190_pi::config::{AppConfig, BusConfig};
use ad7190_pi::session;
use anyhow::bail;
use embedded_hal_bus::spi::RefCellDevice;
use rppal::gpio::Gpio;
use rppal::hal::Delay;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

fn bus(config: &BusConfig) -> anyhow::Result<Bus> {
    Ok(match config.bus {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        other => bail!("no SPI bus {other}"),
    })
}

fn slave_select(config: &BusConfig) -> anyhow::Result<SlaveSelect> {
    Ok(match config.slave_id {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        other => bail!("unsupported slave select {other}"),
    })
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    log::debug!("{config:?}");

    let gpio = Gpio::new()?;

    // AD7190 samples on the rising edge with an idle-high clock
    let spi = Spi::new(bus(&config.bus)?, slave_select(&config.bus)?, config.bus.clock_hz, Mode::Mode3)?;

    let spi = RefCell::new(spi);

    let device = RefCellDevice::new_no_delay(&spi, gpio.get(config.bus.chip_select_gpio)?.into_output_high());

    let ready = gpio.get(config.bus.ready_gpio)?.into_input();

    let mut adc = Ad7190::with_settings(device, ready, Delay::new(), config.driver);

    session::prepare(&mut adc, &config.measurement)?;

    let mut taken = 0;

    loop {
        if config.measurement.iterations.is_some_and(|limit| taken >= limit) {
            break;
        }

        let reading = session::measure(&mut adc, &config.measurement)?;

        println!("{}", serde_json::to_string(&reading)?);

        taken += 1;

        std::thread::sleep(Duration::from_millis(config.measurement.interval_ms));
    }

    Ok(())
}
