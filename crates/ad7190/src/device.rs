use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::codec::{self, Direction, MAX_WIDTH};
use crate::registers::{
    Calibration, Channel, ConfigRegister, Gain, ModeRegister, OperatingMode, Polarity, Register,
    Status, COMM_EXIT_CREAD, ID, ID_MASK, REG24_MASK,
};
use crate::settings::Settings;
use crate::Error;

/// Error type produced by a driver built on `SPI` and `RDY`.
pub type DriverError<SPI, RDY> =
    Error<<SPI as spi::ErrorType>::Error, <RDY as digital::ErrorType>::Error>;

/// At least 40 consecutive ones on DIN reset the serial interface and all registers.
const RESET_SEQUENCE: [u8; 6] = [0xFF; 6];

/// AD7190 driver
pub struct Ad7190<SPI, RDY, D> {
    spi: SPI,
    ready: RDY,
    delay: D,
    settings: Settings,
    mode: ModeRegister,
    config: ConfigRegister,
    continuous_read: bool,
}

impl<SPI, RDY, D> Ad7190<SPI, RDY, D>
where
    SPI: SpiDevice,
    RDY: InputPin,
    D: DelayNs,
{
    /// Creates a new driver with default [`Settings`].
    /// Please ensure the SPI bus is in SPI mode 3, aka (1, 1).
    ///
    /// No bus traffic happens here. The register mirrors start at the power-on values,
    /// so call [`reset`](Self::reset) or [`sync`](Self::sync) if the chip may have been
    /// configured before.
    pub fn new(spi: SPI, ready: RDY, delay: D) -> Self {
        Self::with_settings(spi, ready, delay, Settings::default())
    }

    /// Like [`Ad7190::new`] with explicit timeouts and calibration constants.
    pub fn with_settings(spi: SPI, ready: RDY, delay: D, settings: Settings) -> Self {
        Self {
            spi,
            ready,
            delay,
            settings,
            mode: ModeRegister::POWER_ON,
            config: ConfigRegister::POWER_ON,
            continuous_read: false,
        }
    }

    /// Give back the bus, RDY pin and delay.
    pub fn release(self) -> (SPI, RDY, D) {
        (self.spi, self.ready, self.delay)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Cached MODE register.
    pub fn mode(&self) -> ModeRegister {
        self.mode
    }

    /// Cached CONF register.
    pub fn configuration(&self) -> ConfigRegister {
        self.config
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.mode.mode()
    }

    pub fn is_continuous_read(&self) -> bool {
        self.continuous_read
    }

    /// Write the low `byte_count` bytes of `value` to `register`.
    ///
    /// The payload is always framed by a Comm byte addressing `register`, so `modify_comm`
    /// must be set; a bare payload would be taken as a Comm byte and is rejected with
    /// [`Error::InvalidArgument`]. `byte_count` must match the register width.
    /// Writes to MODE or CONF update the cached copies.
    pub fn set_register_value(
        &mut self,
        register: u8,
        value: u32,
        byte_count: u8,
        modify_comm: bool,
    ) -> Result<(), DriverError<SPI, RDY>> {
        let comm = codec::comm_byte(register, Direction::Write, false)?;
        let payload = codec::encode(value, byte_count)?;
        self.check_register_width(register, byte_count)?;

        if !modify_comm {
            return Err(Error::InvalidArgument);
        }

        if self.continuous_read {
            return Err(Error::ContinuousReadActive);
        }

        let mut frame = [0; 1 + MAX_WIDTH];
        frame[0] = comm;
        let end = 1 + payload.len();
        frame[1..end].copy_from_slice(payload.as_slice());

        self.spi.write(&frame[..end]).map_err(Error::Spi)?;

        // mirror exactly what went over the wire
        let written = codec::decode(payload.as_slice())? & REG24_MASK;

        match Register::from_address(register) {
            Some(Register::Mode) => self.mode = ModeRegister(written),
            Some(Register::Configuration) => self.config = ConfigRegister(written),
            _ => {}
        }

        log::debug!("wrote {:#08x} to register {} ({} bytes)", written, register, byte_count);

        Ok(())
    }

    /// Read `byte_count` bytes from `register`, combined MSB first.
    ///
    /// Without `modify_comm` no Comm byte is sent and the bytes are clocked straight out,
    /// which is only valid for DATA in continuous-read mode; anything else is
    /// [`Error::InvalidArgument`]. `byte_count` must match the register width.
    pub fn get_register_value(
        &mut self,
        register: u8,
        byte_count: u8,
        modify_comm: bool,
    ) -> Result<u32, DriverError<SPI, RDY>> {
        let comm = codec::comm_byte(register, Direction::Read, false)?;
        let len = codec::check_width(byte_count)?;
        self.check_register_width(register, byte_count)?;

        if modify_comm && self.continuous_read {
            return Err(Error::ContinuousReadActive);
        }

        if !modify_comm && !(self.continuous_read && register == Register::Data.address()) {
            return Err(Error::InvalidArgument);
        }

        let mut buffer = [0; MAX_WIDTH];

        if modify_comm {
            self.spi
                .transaction(&mut [Operation::Write(&[comm]), Operation::Read(&mut buffer[..len])])
                .map_err(Error::Spi)?;
        } else {
            self.spi.read(&mut buffer[..len]).map_err(Error::Spi)?;
        }

        let value = codec::decode(&buffer[..len])?;

        log::trace!("read {:#010x} from register {}", value, register);

        Ok(value)
    }

    /// Check the ID register for an AD7190. Nothing is written.
    pub fn init(&mut self) -> Result<bool, DriverError<SPI, RDY>> {
        let id = self.read_id()?;
        let found = id & ID_MASK == ID;

        if found {
            log::info!("AD7190 found (ID {:#04x})", id);
        } else {
            log::info!("no AD7190 present, ID register read {:#04x}", id);
        }

        Ok(found)
    }

    /// Like [`init`](Self::init) but a missing device is an error.
    pub fn verify(&mut self) -> Result<(), DriverError<SPI, RDY>> {
        let id = self.read_id()?;

        if id & ID_MASK == ID {
            Ok(())
        } else {
            Err(Error::DeviceNotFound(id))
        }
    }

    fn read_id(&mut self) -> Result<u8, DriverError<SPI, RDY>> {
        let id = self.get_register_value(Register::Id.address(), Register::Id.width(), true)?;
        Ok(id as u8)
    }

    /// Clock out the reset sequence, returning every register to its power-on value.
    ///
    /// The device needs about 500 µs before it accepts the next command; this driver does not wait.
    pub fn reset(&mut self) -> Result<(), DriverError<SPI, RDY>> {
        self.spi.write(&RESET_SEQUENCE).map_err(Error::Spi)?;

        self.mode = ModeRegister::POWER_ON;
        self.config = ConfigRegister::POWER_ON;
        self.continuous_read = false;

        log::debug!("reset");

        Ok(())
    }

    /// Reload the MODE and CONF mirrors from the device.
    pub fn sync(&mut self) -> Result<(), DriverError<SPI, RDY>> {
        let mode = self.read_register(Register::Mode)?;
        let config = self.read_register(Register::Configuration)?;

        self.mode = ModeRegister(mode);
        self.config = ConfigRegister(config);

        Ok(())
    }

    /// Write a whole MODE value through to the device.
    pub fn write_mode(&mut self, mode: ModeRegister) -> Result<(), DriverError<SPI, RDY>> {
        self.write_register(Register::Mode, mode.bits())
    }

    /// Write a whole CONF value through to the device.
    pub fn write_configuration(&mut self, config: ConfigRegister) -> Result<(), DriverError<SPI, RDY>> {
        self.write_register(Register::Configuration, config.bits())
    }

    /// Select an operation mode, keeping every other MODE bit.
    /// Meant for [`OperatingMode::Idle`] and [`OperatingMode::PowerDown`].
    pub fn set_power(&mut self, mode: OperatingMode) -> Result<(), DriverError<SPI, RDY>> {
        self.write_mode(self.mode.with_mode(mode))
    }

    /// Block until RDY reads low, sampling it at most `ready_poll_limit` times.
    pub fn wait_rdy_go_low(&mut self) -> Result<(), DriverError<SPI, RDY>> {
        for _ in 0..self.settings.ready_poll_limit {
            if self.ready.is_low().map_err(Error::Ready)? {
                return Ok(());
            }

            self.delay.delay_us(self.settings.ready_poll_interval_us);
        }

        log::warn!(
            "RDY stayed high for {} polls ({} us)",
            self.settings.ready_poll_limit,
            self.settings.ready_timeout_us()
        );

        Err(Error::Timeout)
    }

    /// Enable exactly one channel.
    pub fn channel_select(&mut self, channel: Channel) -> Result<(), DriverError<SPI, RDY>> {
        self.channel_select_mask(channel.mask())
    }

    /// Enable every channel whose bit is set in `mask`; the device sequences through them.
    pub fn channel_select_mask(&mut self, mask: u8) -> Result<(), DriverError<SPI, RDY>> {
        self.write_configuration(self.config.with_channels(mask))
    }

    /// Run `calibration` on `channel` and wait for it to finish.
    ///
    /// The device idles once the calibration is done. With
    /// [`Settings::restore_mode_after_calibration`] the previous MODE value is written back.
    pub fn calibrate(
        &mut self,
        calibration: Calibration,
        channel: Channel,
    ) -> Result<(), DriverError<SPI, RDY>> {
        let previous = self.mode;

        self.channel_select(channel)?;
        self.write_mode(previous.with_mode(calibration.into()))?;

        log::debug!("calibrating {:?} on {:?}", calibration, channel);

        match self.wait_rdy_go_low() {
            Ok(()) => {}
            Err(Error::Timeout) => return Err(Error::CalibrationTimeout),
            Err(e) => return Err(e),
        }

        self.mode = self.mode.with_mode(OperatingMode::Idle);

        if self.settings.restore_mode_after_calibration {
            self.write_mode(previous)?;
        }

        Ok(())
    }

    /// Set input polarity and PGA gain.
    pub fn range_setup(&mut self, polarity: Polarity, gain: Gain) -> Result<(), DriverError<SPI, RDY>> {
        self.write_configuration(self.config.with_polarity(polarity).with_gain(gain))
    }

    /// Run one conversion and return the raw DATA value.
    ///
    /// The value is 24 bits wide, or 32 bits with the status byte in the low byte when
    /// status append is enabled. The device idles afterwards on its own.
    pub fn single_conversion(&mut self) -> Result<u32, DriverError<SPI, RDY>> {
        self.write_mode(self.mode.with_mode(OperatingMode::Single))?;
        self.wait_rdy_go_low()?;

        let sample = self.read_data()?;

        self.mode = self.mode.with_mode(OperatingMode::Idle);

        Ok(sample)
    }

    /// Average `sample_count` conversions taken in continuous mode.
    ///
    /// Only the 24-bit conversion codes are averaged; an appended status byte is dropped.
    /// The device is left converting continuously.
    pub fn continuous_read_avg(&mut self, sample_count: u8) -> Result<u32, DriverError<SPI, RDY>> {
        if sample_count == 0 {
            return Err(Error::InvalidArgument);
        }

        self.write_mode(self.mode.with_mode(OperatingMode::Continuous))?;

        // 255 full-scale codes still fit in a u32
        let mut sum = 0u32;

        for _ in 0..sample_count {
            self.wait_rdy_go_low()?;
            let sample = self.read_data()?;
            sum += self.conversion_code(sample);
        }

        Ok(sum / sample_count as u32)
    }

    /// Read the on-chip temperature sensor in degrees Celsius.
    ///
    /// Switches to bipolar, gain 1 and the temperature channel. Unless
    /// [`Settings::restore_channel_after_temperature`] is cleared the previous CONF value
    /// is written back afterwards.
    ///
    /// Fails with [`Error::InvalidArgument`] before touching the bus when
    /// `counts_per_kelvin` is zero, and afterwards when the configured calibration
    /// puts the result outside `i32`.
    pub fn temperature_read(&mut self) -> Result<i32, DriverError<SPI, RDY>> {
        let calibration = self.settings.temperature;

        if calibration.counts_per_kelvin == 0 {
            return Err(Error::InvalidArgument);
        }

        let previous = self.config;

        self.write_configuration(
            previous
                .with_polarity(Polarity::Bipolar)
                .with_gain(Gain::G1)
                .with_channels(Channel::Temperature.mask()),
        )?;

        let sample = self.single_conversion()?;
        let code = self.conversion_code(sample);

        if self.settings.restore_channel_after_temperature {
            self.write_configuration(previous)?;
        }

        let kelvin = (i64::from(code) - i64::from(calibration.zero_code))
            / i64::from(calibration.counts_per_kelvin);

        i32::try_from(kelvin - i64::from(calibration.kelvin_offset))
            .map_err(|_| Error::InvalidArgument)
    }

    /// Read and decode the status register.
    pub fn read_status(&mut self) -> Result<Status, DriverError<SPI, RDY>> {
        let status = self.read_register(Register::Status)?;
        Ok(Status(status as u8))
    }

    /// Write the general-purpose output control register.
    pub fn set_gpocon(&mut self, value: u8) -> Result<(), DriverError<SPI, RDY>> {
        self.write_register(Register::Gpocon, value as u32)
    }

    pub fn offset(&mut self) -> Result<u32, DriverError<SPI, RDY>> {
        self.read_register(Register::Offset)
    }

    /// Overwrite the offset calibration coefficient of the active channel.
    pub fn set_offset(&mut self, value: u32) -> Result<(), DriverError<SPI, RDY>> {
        self.write_register(Register::Offset, value)
    }

    pub fn full_scale(&mut self) -> Result<u32, DriverError<SPI, RDY>> {
        self.read_register(Register::FullScale)
    }

    /// Overwrite the full-scale calibration coefficient of the active channel.
    pub fn set_full_scale(&mut self, value: u32) -> Result<(), DriverError<SPI, RDY>> {
        self.write_register(Register::FullScale, value)
    }

    /// Put DATA into continuous read: conversions are clocked out without a Comm byte
    /// until [`stop_continuous_read`](Self::stop_continuous_read).
    pub fn start_continuous_read(&mut self) -> Result<(), DriverError<SPI, RDY>> {
        if self.continuous_read {
            return Ok(());
        }

        self.write_mode(self.mode.with_mode(OperatingMode::Continuous))?;

        let comm = codec::comm_byte(Register::Data.address(), Direction::Read, true)?;
        self.spi.write(&[comm]).map_err(Error::Spi)?;
        self.continuous_read = true;

        log::debug!("continuous read started");

        Ok(())
    }

    /// Wait for the next conversion and clock it out, continuous read must be active.
    pub fn read_continuous_sample(&mut self) -> Result<u32, DriverError<SPI, RDY>> {
        if !self.continuous_read {
            return Err(Error::InvalidArgument);
        }

        self.wait_rdy_go_low()?;
        self.get_register_value(Register::Data.address(), self.mode.data_width(), false)
    }

    /// Leave continuous read. The pending conversion is read out and discarded.
    pub fn stop_continuous_read(&mut self) -> Result<(), DriverError<SPI, RDY>> {
        if !self.continuous_read {
            return Ok(());
        }

        self.wait_rdy_go_low()?;

        let mut discard = [0; MAX_WIDTH];
        let len = self.mode.data_width() as usize;

        self.spi
            .transaction(&mut [
                Operation::Write(&[COMM_EXIT_CREAD]),
                Operation::Read(&mut discard[..len]),
            ])
            .map_err(Error::Spi)?;

        self.continuous_read = false;

        log::debug!("continuous read stopped");

        Ok(())
    }

    /// Reject transfers shorter or longer than the register, the device would misframe them.
    fn check_register_width(
        &self,
        register: u8,
        byte_count: u8,
    ) -> Result<(), DriverError<SPI, RDY>> {
        let width = match Register::from_address(register) {
            Some(Register::Data) => self.mode.data_width(),
            Some(other) => other.width(),
            None => return Err(Error::InvalidRegister(register)),
        };

        if byte_count == width {
            Ok(())
        } else {
            Err(Error::InvalidWidth(byte_count))
        }
    }

    fn write_register(&mut self, register: Register, value: u32) -> Result<(), DriverError<SPI, RDY>> {
        self.set_register_value(register.address(), value, register.width(), true)
    }

    fn read_register(&mut self, register: Register) -> Result<u32, DriverError<SPI, RDY>> {
        self.get_register_value(register.address(), register.width(), true)
    }

    fn read_data(&mut self) -> Result<u32, DriverError<SPI, RDY>> {
        self.get_register_value(Register::Data.address(), self.mode.data_width(), true)
    }

    /// Strip the appended status byte, if any.
    fn conversion_code(&self, sample: u32) -> u32 {
        if self.mode.status_append() {
            sample >> 8
        } else {
            sample
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{conf_chan, CONF_UNIPOLAR, MODE_DAT_STA};
    use crate::sim::{Event, NoDelay, SimError, Simulator};

    fn driver(sim: &Simulator) -> Ad7190<crate::sim::SimSpi, crate::sim::SimReady, NoDelay> {
        Ad7190::new(sim.spi(), sim.ready(), NoDelay)
    }

    fn driver_with(
        sim: &Simulator,
        settings: Settings,
    ) -> Ad7190<crate::sim::SimSpi, crate::sim::SimReady, NoDelay> {
        Ad7190::with_settings(sim.spi(), sim.ready(), NoDelay, settings)
    }

    #[test]
    fn mode_write_then_read_back() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        for value in [0, 1, 0xFF_FFFF, 0x08_0060, 0x28_03FF, 0x14_8460] {
            adc.set_register_value(1, value, 3, true).unwrap();
            assert_eq!(adc.get_register_value(1, 3, true), Ok(value));
            assert_eq!(adc.mode().bits(), value);
        }
    }

    #[test]
    fn configuration_writes_update_mirror() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        adc.set_register_value(2, 0x12_3456, 3, true).unwrap();

        assert_eq!(adc.configuration().bits(), 0x12_3456);
        assert_eq!(sim.register(2), 0x12_3456);
    }

    #[test]
    fn invalid_register_and_width_touch_nothing() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        assert_eq!(adc.set_register_value(8, 0, 3, true), Err(Error::InvalidRegister(8)));
        assert_eq!(adc.get_register_value(9, 1, true), Err(Error::InvalidRegister(9)));
        assert_eq!(adc.set_register_value(1, 0, 2, true), Err(Error::InvalidWidth(2)));
        assert_eq!(adc.get_register_value(1, 5, true), Err(Error::InvalidWidth(5)));
        assert_eq!(sim.transactions(), 0);
        assert_eq!(adc.mode(), ModeRegister::POWER_ON);
    }

    #[test]
    fn bare_write_is_rejected_and_mirror_stays_in_sync() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        assert_eq!(adc.set_register_value(1, 0x10_1234, 3, false), Err(Error::InvalidArgument));
        assert_eq!(sim.transactions(), 0);
        assert_eq!(adc.mode(), ModeRegister::POWER_ON);
        assert_eq!(sim.register(1), ModeRegister::POWER_ON.bits());
    }

    #[test]
    fn width_must_match_register() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        assert_eq!(adc.set_register_value(1, 0x12, 1, true), Err(Error::InvalidWidth(1)));
        assert_eq!(adc.set_register_value(2, 0x12, 4, true), Err(Error::InvalidWidth(4)));
        assert_eq!(adc.set_register_value(5, 0x12_3456, 3, true), Err(Error::InvalidWidth(3)));
        assert_eq!(adc.get_register_value(4, 3, true), Err(Error::InvalidWidth(3)));
        assert_eq!(adc.get_register_value(3, 4, true), Err(Error::InvalidWidth(4)));
        assert_eq!(sim.transactions(), 0);
        assert_eq!(adc.mode(), ModeRegister::POWER_ON);
        assert_eq!(adc.configuration(), ConfigRegister::POWER_ON);

        adc.write_mode(adc.mode().with_status_append(true)).unwrap();
        sim.push_samples([0x12_3456]);
        assert_eq!(adc.get_register_value(3, 3, true), Err(Error::InvalidWidth(3)));
        assert!(adc.get_register_value(3, 4, true).is_ok());
    }

    #[test]
    fn bare_read_needs_continuous_data() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        assert_eq!(adc.get_register_value(1, 3, false), Err(Error::InvalidArgument));
        assert_eq!(adc.get_register_value(3, 3, false), Err(Error::InvalidArgument));
        assert_eq!(sim.transactions(), 0);

        sim.push_samples([5]);
        adc.start_continuous_read().unwrap();
        assert_eq!(adc.get_register_value(1, 3, false), Err(Error::InvalidArgument));
        assert_eq!(adc.get_register_value(3, 3, false), Ok(5));
    }

    #[test]
    fn init_matches_low_nibble() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        sim.set_register(4, 0xA4);
        assert_eq!(adc.init(), Ok(true));

        sim.set_register(4, 0x04);
        assert_eq!(adc.init(), Ok(true));

        sim.set_register(4, 0xA5);
        assert_eq!(adc.init(), Ok(false));
        assert_eq!(adc.verify(), Err(Error::DeviceNotFound(0xA5)));

        assert!(sim.events().iter().all(|e| matches!(e, Event::Read { address: 4 })));
    }

    #[test]
    fn reset_restores_power_on_state() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        adc.range_setup(Polarity::Unipolar, Gain::G8).unwrap();
        adc.set_power(OperatingMode::PowerDown).unwrap();
        adc.reset().unwrap();

        assert!(sim.events().contains(&Event::Reset));
        assert_eq!(sim.register(1), ModeRegister::POWER_ON.bits());
        assert_eq!(sim.register(2), ConfigRegister::POWER_ON.bits());
        assert_eq!(adc.mode(), ModeRegister::POWER_ON);
        assert_eq!(adc.configuration(), ConfigRegister::POWER_ON);
    }

    #[test]
    fn set_power_keeps_other_mode_bits() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        adc.write_mode(ModeRegister::POWER_ON.with_rate(0x3FF).with_sinc3(true)).unwrap();
        adc.set_power(OperatingMode::PowerDown).unwrap();

        let mode = ModeRegister(sim.register(1));
        assert_eq!(mode.mode(), OperatingMode::PowerDown);
        assert_eq!(mode.rate(), 0x3FF);
        assert!(mode.sinc3());
        assert_eq!(adc.operating_mode(), OperatingMode::PowerDown);

        adc.set_power(OperatingMode::Idle).unwrap();
        assert_eq!(ModeRegister(sim.register(1)).mode(), OperatingMode::Idle);
    }

    #[test]
    fn channel_select_only_touches_channel_bits() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        adc.range_setup(Polarity::Unipolar, Gain::G16).unwrap();
        let before = adc.get_register_value(2, 3, true).unwrap();

        adc.channel_select_mask(0b0101_0000).unwrap();
        let after = adc.get_register_value(2, 3, true).unwrap();

        assert_eq!(before ^ after, (before ^ conf_chan(0b0101_0000)) & conf_chan(0xFF));
        assert_eq!(after & !conf_chan(0xFF), before & !conf_chan(0xFF));
        assert_eq!(ConfigRegister(after).channels(), 0b0101_0000);

        adc.channel_select(Channel::Ain4Com).unwrap();
        assert_eq!(ConfigRegister(sim.register(2)).channels(), 0b1000_0000);
    }

    #[test]
    fn range_setup_sets_polarity_and_gain() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        adc.range_setup(Polarity::Unipolar, Gain::G1).unwrap();

        let conf = sim.register(2);
        assert_ne!(conf & CONF_UNIPOLAR, 0);
        assert_eq!(conf & 0x7, 0);
        assert_eq!(ConfigRegister(conf).channels(), Channel::Ain1Ain2.mask());
    }

    #[test]
    fn wait_times_out_when_rdy_stays_high() {
        let sim = Simulator::new();
        sim.set_ready_latency(None);
        let settings = Settings {
            ready_poll_limit: 50,
            ..Settings::default()
        };
        let mut adc = driver_with(&sim, settings);

        adc.set_power(OperatingMode::Idle).unwrap();
        sim.clear_events();

        assert_eq!(adc.wait_rdy_go_low(), Err(Error::Timeout));
        assert_eq!(sim.ready_polls(), 50);
    }

    #[test]
    fn calibrate_selects_channel_then_mode_then_polls() {
        let sim = Simulator::new();
        sim.set_ready_latency(Some(3));
        let mut adc = driver(&sim);

        adc.calibrate(Calibration::InternalZero, Channel::Ain1Ain2).unwrap();

        let events = sim.events();
        let conf = events
            .iter()
            .position(|e| matches!(e, Event::Write { address: 2, value } if ConfigRegister(*value).channels() == 0b1))
            .unwrap();
        let mode = events
            .iter()
            .position(|e| matches!(e, Event::Write { address: 1, value } if ModeRegister(*value).mode() == OperatingMode::InternalZeroCalibration))
            .unwrap();
        let poll = events.iter().position(|e| *e == Event::ReadyPoll).unwrap();

        assert!(conf < mode);
        assert!(mode < poll);
        assert_eq!(adc.operating_mode(), OperatingMode::Idle);
        assert_eq!(ModeRegister(sim.register(1)).mode(), OperatingMode::Idle);
    }

    #[test]
    fn calibrate_reports_calibration_timeout() {
        let sim = Simulator::new();
        sim.set_ready_latency(None);
        let settings = Settings {
            ready_poll_limit: 10,
            ..Settings::default()
        };
        let mut adc = driver_with(&sim, settings);

        assert_eq!(
            adc.calibrate(Calibration::SystemFull, Channel::Ain3Ain4),
            Err(Error::CalibrationTimeout)
        );
    }

    #[test]
    fn calibrate_can_restore_previous_mode() {
        let sim = Simulator::new();
        let settings = Settings {
            restore_mode_after_calibration: true,
            ..Settings::default()
        };
        let mut adc = driver_with(&sim, settings);

        adc.set_power(OperatingMode::PowerDown).unwrap();
        adc.calibrate(Calibration::InternalFull, Channel::Ain1Com).unwrap();

        assert_eq!(adc.operating_mode(), OperatingMode::PowerDown);
        assert_eq!(ModeRegister(sim.register(1)).mode(), OperatingMode::PowerDown);
    }

    #[test]
    fn single_conversion_reads_one_sample() {
        let sim = Simulator::new();
        sim.push_samples([0x12_3456, 0x65_4321]);
        let mut adc = driver(&sim);

        assert_eq!(adc.single_conversion(), Ok(0x12_3456));
        assert_eq!(adc.operating_mode(), OperatingMode::Idle);
        assert_eq!(sim.pending_samples(), 1);
    }

    #[test]
    fn single_conversion_with_status_byte() {
        let sim = Simulator::new();
        sim.push_samples([0x80_0001]);
        let mut adc = driver(&sim);

        adc.write_mode(ModeRegister::POWER_ON.with_status_append(true)).unwrap();
        adc.channel_select(Channel::Ain2Com).unwrap();

        let sample = adc.single_conversion().unwrap();
        assert_eq!(sample >> 8, 0x80_0001);
        assert_eq!(Status(sample as u8).channel(), Channel::Ain2Com);
    }

    #[test]
    fn continuous_average() {
        let sim = Simulator::new();
        sim.push_samples([10, 20, 30, 40]);
        let mut adc = driver(&sim);

        assert_eq!(adc.continuous_read_avg(4), Ok(25));
        assert_eq!(adc.operating_mode(), OperatingMode::Continuous);
        assert_eq!(sim.pending_samples(), 0);
    }

    #[test]
    fn continuous_average_truncates_and_strips_status() {
        let sim = Simulator::new();
        sim.push_samples([1, 2]);
        let mut adc = driver(&sim);

        adc.write_mode(ModeRegister(MODE_DAT_STA | ModeRegister::POWER_ON.bits())).unwrap();

        assert_eq!(adc.continuous_read_avg(2), Ok(1));
    }

    #[test]
    fn continuous_average_handles_full_scale() {
        let sim = Simulator::new();
        sim.push_samples(core::iter::repeat(0xFF_FFFF).take(255));
        let mut adc = driver(&sim);

        assert_eq!(adc.continuous_read_avg(255), Ok(0xFF_FFFF));
    }

    #[test]
    fn zero_samples_is_rejected_before_bus_activity() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        assert_eq!(adc.continuous_read_avg(0), Err(Error::InvalidArgument));
        assert_eq!(sim.transactions(), 0);
    }

    #[test]
    fn temperature_restores_configuration() {
        let sim = Simulator::new();
        // 25 C: (298 * 2815) above mid-scale
        sim.push_samples([0x80_0000 + 298 * 2815]);
        let mut adc = driver(&sim);

        adc.range_setup(Polarity::Unipolar, Gain::G64).unwrap();
        adc.channel_select(Channel::Ain3Com).unwrap();
        let before = adc.configuration();

        assert_eq!(adc.temperature_read(), Ok(25));
        assert_eq!(adc.configuration(), before);
        assert_eq!(sim.register(2), before.bits());

        let temperature_conf = sim.events().into_iter().find_map(|e| match e {
            Event::Write { address: 2, value } if ConfigRegister(value).channels() == Channel::Temperature.mask() => {
                Some(ConfigRegister(value))
            }
            _ => None,
        });
        let temperature_conf = temperature_conf.unwrap();
        assert_eq!(temperature_conf.polarity(), Polarity::Bipolar);
        assert_eq!(temperature_conf.gain(), Some(Gain::G1));
    }

    #[test]
    fn temperature_without_restore_keeps_sensor_selected() {
        let sim = Simulator::new();
        sim.push_samples([0x80_0000 + 273 * 2815]);
        let settings = Settings {
            restore_channel_after_temperature: false,
            ..Settings::default()
        };
        let mut adc = driver_with(&sim, settings);

        assert_eq!(adc.temperature_read(), Ok(0));
        assert_eq!(adc.configuration().channels(), Channel::Temperature.mask());
    }

    #[test]
    fn temperature_uses_configured_calibration() {
        let sim = Simulator::new();
        sim.push_samples([0x80_0000 + 1000]);
        let settings = Settings {
            temperature: crate::TemperatureCalibration {
                zero_code: 0x80_0000,
                counts_per_kelvin: 10,
                kelvin_offset: 50,
            },
            ..Settings::default()
        };
        let mut adc = driver_with(&sim, settings);

        assert_eq!(adc.temperature_read(), Ok(50));
    }

    #[test]
    fn temperature_is_computed_without_overflow() {
        let sim = Simulator::new();
        sim.push_samples([0]);
        let settings = Settings {
            temperature: crate::TemperatureCalibration {
                zero_code: 0x8000_0000,
                ..crate::TemperatureCalibration::default()
            },
            ..Settings::default()
        };
        let mut adc = driver_with(&sim, settings);

        assert_eq!(adc.temperature_read(), Ok(-763_144));
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let sim = Simulator::new();
        sim.push_samples([0x80_0000 + 300 * 2815]);
        let settings = Settings {
            temperature: crate::TemperatureCalibration {
                kelvin_offset: i32::MIN,
                ..crate::TemperatureCalibration::default()
            },
            ..Settings::default()
        };
        let mut adc = driver_with(&sim, settings);

        assert_eq!(adc.temperature_read(), Err(Error::InvalidArgument));
        assert_eq!(adc.configuration(), ConfigRegister::POWER_ON);
    }

    #[test]
    fn zero_counts_per_kelvin_is_rejected_before_bus_activity() {
        let sim = Simulator::new();
        let settings = Settings {
            temperature: crate::TemperatureCalibration {
                counts_per_kelvin: 0,
                ..crate::TemperatureCalibration::default()
            },
            ..Settings::default()
        };
        let mut adc = driver_with(&sim, settings);

        assert_eq!(adc.temperature_read(), Err(Error::InvalidArgument));
        assert_eq!(sim.transactions(), 0);
    }

    #[test]
    fn continuous_read_mode() {
        let sim = Simulator::new();
        sim.push_samples([7, 8, 9]);
        let mut adc = driver(&sim);

        adc.start_continuous_read().unwrap();
        assert!(adc.is_continuous_read());
        assert_eq!(adc.read_continuous_sample(), Ok(7));
        assert_eq!(adc.read_continuous_sample(), Ok(8));

        assert_eq!(adc.read_status(), Err(Error::ContinuousReadActive));

        adc.stop_continuous_read().unwrap();
        assert!(!adc.is_continuous_read());
        assert!(!sim.continuous_read());
        assert_eq!(sim.pending_samples(), 0);

        assert!(adc.read_status().is_ok());
        assert_eq!(adc.read_continuous_sample(), Err(Error::InvalidArgument));
    }

    #[test]
    fn sync_reads_mirrors_from_device() {
        let sim = Simulator::new();
        sim.set_register(1, 0x68_0001);
        sim.set_register(2, 0x80_0207);
        let mut adc = driver(&sim);

        adc.sync().unwrap();

        assert_eq!(adc.mode().bits(), 0x68_0001);
        assert_eq!(adc.operating_mode(), OperatingMode::PowerDown);
        assert_eq!(adc.configuration().channels(), Channel::Ain3Ain4.mask());
        assert!(adc.configuration().chop());
    }

    #[test]
    fn calibration_coefficients_and_gpocon() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);

        adc.set_offset(0x80_0123).unwrap();
        adc.set_full_scale(0x55_AA55).unwrap();
        adc.set_gpocon(crate::registers::GPOCON_GP10EN | crate::registers::GPOCON_P0DAT).unwrap();

        assert_eq!(adc.offset(), Ok(0x80_0123));
        assert_eq!(adc.full_scale(), Ok(0x55_AA55));
        assert_eq!(sim.register(5), 0b0001_0001);
    }

    #[test]
    fn transport_errors_propagate() {
        let sim = Simulator::new();
        let mut adc = driver(&sim);
        sim.fail_transfers(true);

        assert_eq!(adc.init(), Err(Error::Spi(SimError)));
        assert_eq!(adc.channel_select(Channel::Ain1Com), Err(Error::Spi(SimError)));
        assert_eq!(adc.configuration(), ConfigRegister::POWER_ON);
    }
}
