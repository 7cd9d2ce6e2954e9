//! AD7190 register map, bit fields and typed register values.

#[cfg(feature = "serde")]
use serde::Deserialize;

/// On-chip registers reachable through the communications register.
///
/// The communications register (write only) and the status register (read only)
/// share address 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Comm,
    Status,
    Mode,
    Configuration,
    Data,
    Id,
    Gpocon,
    Offset,
    FullScale,
}

impl Register {
    /// 3-bit register address.
    pub const fn address(self) -> u8 {
        match self {
            Self::Comm | Self::Status => 0,
            Self::Mode => 1,
            Self::Configuration => 2,
            Self::Data => 3,
            Self::Id => 4,
            Self::Gpocon => 5,
            Self::Offset => 6,
            Self::FullScale => 7,
        }
    }

    /// Width in bytes. DATA grows to 4 bytes when the status byte is appended.
    pub const fn width(self) -> u8 {
        match self {
            Self::Comm | Self::Status | Self::Id | Self::Gpocon => 1,
            Self::Mode | Self::Configuration | Self::Data | Self::Offset | Self::FullScale => 3,
        }
    }

    /// Register read back from `address`, if the address is valid.
    pub const fn from_address(address: u8) -> Option<Self> {
        match address {
            0 => Some(Self::Status),
            1 => Some(Self::Mode),
            2 => Some(Self::Configuration),
            3 => Some(Self::Data),
            4 => Some(Self::Id),
            5 => Some(Self::Gpocon),
            6 => Some(Self::Offset),
            7 => Some(Self::FullScale),
            _ => None,
        }
    }
}

// Communications register
/// Must be clear for the device to accept the frame.
pub const COMM_WEN: u8 = 1 << 7;
pub const COMM_WRITE: u8 = 0 << 6;
pub const COMM_READ: u8 = 1 << 6;
pub const COMM_CREAD: u8 = 1 << 2;

pub const fn comm_addr(address: u8) -> u8 {
    (address & 0x7) << 3
}

/// Comm byte that leaves continuous read: a plain DATA read with CREAD clear.
pub const COMM_EXIT_CREAD: u8 = COMM_READ | comm_addr(3);

// Status register
pub const STAT_RDY: u8 = 1 << 7;
pub const STAT_ERR: u8 = 1 << 6;
pub const STAT_NOREF: u8 = 1 << 5;
pub const STAT_PARITY: u8 = 1 << 4;
pub const STAT_CH_MASK: u8 = 0b111;

// Mode register
pub const MODE_DAT_STA: u32 = 1 << 20;
pub const MODE_SINC3: u32 = 1 << 15;
pub const MODE_ENPAR: u32 = 1 << 13;
pub const MODE_SCYCLE: u32 = 1 << 11;
pub const MODE_REJ60: u32 = 1 << 10;

pub const fn mode_sel(mode: u8) -> u32 {
    ((mode as u32) & 0x7) << 21
}

pub const fn mode_clksrc(clock: u8) -> u32 {
    ((clock as u32) & 0x3) << 18
}

pub const fn mode_rate(rate: u16) -> u32 {
    (rate as u32) & 0x3FF
}

// Configuration register
pub const CONF_CHOP: u32 = 1 << 23;
pub const CONF_REFSEL: u32 = 1 << 20;
pub const CONF_BURN: u32 = 1 << 7;
pub const CONF_REFDET: u32 = 1 << 6;
pub const CONF_BUF: u32 = 1 << 4;
pub const CONF_UNIPOLAR: u32 = 1 << 3;

pub const fn conf_chan(mask: u8) -> u32 {
    (mask as u32) << 8
}

pub const fn conf_gain(gain: u8) -> u32 {
    (gain as u32) & 0x7
}

// ID register
pub const ID: u8 = 0x4;
pub const ID_MASK: u8 = 0x0F;

// GPOCON register
pub const GPOCON_BPDSW: u8 = 1 << 6;
pub const GPOCON_GP32EN: u8 = 1 << 5;
pub const GPOCON_GP10EN: u8 = 1 << 4;
pub const GPOCON_P3DAT: u8 = 1 << 3;
pub const GPOCON_P2DAT: u8 = 1 << 2;
pub const GPOCON_P1DAT: u8 = 1 << 1;
pub const GPOCON_P0DAT: u8 = 1 << 0;

/// Largest value a 24-bit register can hold.
pub const REG24_MASK: u32 = 0x00FF_FFFF;

/// Operation mode select (MD2..MD0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[repr(u8)]
pub enum OperatingMode {
    Continuous = 0,
    Single = 1,
    Idle = 2,
    PowerDown = 3,
    InternalZeroCalibration = 4,
    InternalFullCalibration = 5,
    SystemZeroCalibration = 6,
    SystemFullCalibration = 7,
}

impl OperatingMode {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            0 => Self::Continuous,
            1 => Self::Single,
            2 => Self::Idle,
            3 => Self::PowerDown,
            4 => Self::InternalZeroCalibration,
            5 => Self::InternalFullCalibration,
            6 => Self::SystemZeroCalibration,
            _ => Self::SystemFullCalibration,
        }
    }

    pub const fn is_calibration(self) -> bool {
        (self as u8) >= 4
    }
}

/// Calibration sequences accepted by `calibrate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum Calibration {
    InternalZero,
    InternalFull,
    SystemZero,
    SystemFull,
}

impl From<Calibration> for OperatingMode {
    fn from(calibration: Calibration) -> Self {
        match calibration {
            Calibration::InternalZero => Self::InternalZeroCalibration,
            Calibration::InternalFull => Self::InternalFullCalibration,
            Calibration::SystemZero => Self::SystemZeroCalibration,
            Calibration::SystemFull => Self::SystemFullCalibration,
        }
    }
}

/// Master clock source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[repr(u8)]
pub enum ClockSource {
    /// External crystal between MCLK1 and MCLK2.
    ExternalCrystal = 0,
    /// External clock applied to MCLK2.
    ExternalClock = 1,
    /// Internal 4.92 MHz clock, MCLK2 tristated.
    Internal = 2,
    /// Internal 4.92 MHz clock, also driven out on MCLK2.
    InternalOut = 3,
}

impl ClockSource {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::ExternalCrystal,
            1 => Self::ExternalClock,
            2 => Self::Internal,
            _ => Self::InternalOut,
        }
    }
}

/// Input channels. The discriminant is the bit index in the channel mask.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[repr(u8)]
pub enum Channel {
    Ain1Ain2 = 0,
    Ain3Ain4 = 1,
    Temperature = 2,
    Ain2Ain2 = 3,
    Ain1Com = 4,
    Ain2Com = 5,
    Ain3Com = 6,
    Ain4Com = 7,
}

impl Channel {
    /// Single-bit mask for the CH7..CH0 field.
    pub const fn mask(self) -> u8 {
        1 << self as u8
    }

    pub const fn from_index(index: u8) -> Self {
        match index & 0x7 {
            0 => Self::Ain1Ain2,
            1 => Self::Ain3Ain4,
            2 => Self::Temperature,
            3 => Self::Ain2Ain2,
            4 => Self::Ain1Com,
            5 => Self::Ain2Com,
            6 => Self::Ain3Com,
            _ => Self::Ain4Com,
        }
    }

    /// Iterate over all channels.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..8).map(Self::from_index)
    }
}

/// PGA gain. Input range with a 5 V reference is ±5 V divided by the gain.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[repr(u8)]
pub enum Gain {
    G1 = 0,
    G8 = 3,
    G16 = 4,
    G32 = 5,
    G64 = 6,
    G128 = 7,
}

impl Gain {
    /// Decode the G2..G0 field. Codes 1 and 2 are reserved.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x7 {
            0 => Some(Self::G1),
            3 => Some(Self::G8),
            4 => Some(Self::G16),
            5 => Some(Self::G32),
            6 => Some(Self::G64),
            7 => Some(Self::G128),
            _ => None,
        }
    }

    pub const fn factor(self) -> u8 {
        match self {
            Self::G1 => 1,
            Self::G8 => 8,
            Self::G16 => 16,
            Self::G32 => 32,
            Self::G64 => 64,
            Self::G128 => 128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum Polarity {
    Bipolar,
    Unipolar,
}

/// Reference input pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    RefIn1,
    RefIn2,
}

/// 24-bit MODE register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRegister(pub u32);

impl ModeRegister {
    /// MODE register after reset: continuous conversion, internal clock, FS = 96.
    pub const POWER_ON: Self = Self(0x08_0060);

    pub const fn bits(self) -> u32 {
        self.0 & REG24_MASK
    }

    pub const fn mode(self) -> OperatingMode {
        OperatingMode::from_bits((self.0 >> 21) as u8)
    }

    pub const fn with_mode(self, mode: OperatingMode) -> Self {
        Self((self.0 & !mode_sel(0x7)) | mode_sel(mode as u8))
    }

    pub const fn status_append(self) -> bool {
        self.0 & MODE_DAT_STA != 0
    }

    pub const fn with_status_append(self, enable: bool) -> Self {
        Self(set_flag(self.0, MODE_DAT_STA, enable))
    }

    pub const fn clock(self) -> ClockSource {
        ClockSource::from_bits((self.0 >> 18) as u8)
    }

    pub const fn with_clock(self, clock: ClockSource) -> Self {
        Self((self.0 & !mode_clksrc(0x3)) | mode_clksrc(clock as u8))
    }

    pub const fn sinc3(self) -> bool {
        self.0 & MODE_SINC3 != 0
    }

    pub const fn with_sinc3(self, enable: bool) -> Self {
        Self(set_flag(self.0, MODE_SINC3, enable))
    }

    pub const fn parity(self) -> bool {
        self.0 & MODE_ENPAR != 0
    }

    pub const fn with_parity(self, enable: bool) -> Self {
        Self(set_flag(self.0, MODE_ENPAR, enable))
    }

    pub const fn single_cycle(self) -> bool {
        self.0 & MODE_SCYCLE != 0
    }

    pub const fn with_single_cycle(self, enable: bool) -> Self {
        Self(set_flag(self.0, MODE_SCYCLE, enable))
    }

    pub const fn reject_60hz(self) -> bool {
        self.0 & MODE_REJ60 != 0
    }

    pub const fn with_reject_60hz(self, enable: bool) -> Self {
        Self(set_flag(self.0, MODE_REJ60, enable))
    }

    /// Filter word FS9..FS0. Output rate is `MCLK / 1024 / rate`.
    pub const fn rate(self) -> u16 {
        (self.0 & 0x3FF) as u16
    }

    pub const fn with_rate(self, rate: u16) -> Self {
        Self((self.0 & !mode_rate(0x3FF)) | mode_rate(rate))
    }

    /// Bytes clocked out of DATA per conversion.
    pub const fn data_width(self) -> u8 {
        if self.status_append() {
            4
        } else {
            3
        }
    }
}

impl Default for ModeRegister {
    fn default() -> Self {
        Self::POWER_ON
    }
}

/// 24-bit CONF register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRegister(pub u32);

impl ConfigRegister {
    /// CONF register after reset: AIN1-AIN2, buffered, gain 128, bipolar.
    pub const POWER_ON: Self = Self(0x00_0117);

    pub const fn bits(self) -> u32 {
        self.0 & REG24_MASK
    }

    pub const fn chop(self) -> bool {
        self.0 & CONF_CHOP != 0
    }

    pub const fn with_chop(self, enable: bool) -> Self {
        Self(set_flag(self.0, CONF_CHOP, enable))
    }

    pub const fn reference(self) -> Reference {
        if self.0 & CONF_REFSEL != 0 {
            Reference::RefIn2
        } else {
            Reference::RefIn1
        }
    }

    pub const fn with_reference(self, reference: Reference) -> Self {
        Self(set_flag(self.0, CONF_REFSEL, matches!(reference, Reference::RefIn2)))
    }

    /// CH7..CH0 enable mask.
    pub const fn channels(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn with_channels(self, mask: u8) -> Self {
        Self((self.0 & !conf_chan(0xFF)) | conf_chan(mask))
    }

    pub const fn burnout(self) -> bool {
        self.0 & CONF_BURN != 0
    }

    pub const fn with_burnout(self, enable: bool) -> Self {
        Self(set_flag(self.0, CONF_BURN, enable))
    }

    pub const fn reference_detect(self) -> bool {
        self.0 & CONF_REFDET != 0
    }

    pub const fn with_reference_detect(self, enable: bool) -> Self {
        Self(set_flag(self.0, CONF_REFDET, enable))
    }

    pub const fn buffered(self) -> bool {
        self.0 & CONF_BUF != 0
    }

    pub const fn with_buffered(self, enable: bool) -> Self {
        Self(set_flag(self.0, CONF_BUF, enable))
    }

    pub const fn polarity(self) -> Polarity {
        if self.0 & CONF_UNIPOLAR != 0 {
            Polarity::Unipolar
        } else {
            Polarity::Bipolar
        }
    }

    pub const fn with_polarity(self, polarity: Polarity) -> Self {
        Self(set_flag(self.0, CONF_UNIPOLAR, matches!(polarity, Polarity::Unipolar)))
    }

    /// `None` when the field holds a reserved code.
    pub const fn gain(self) -> Option<Gain> {
        Gain::from_bits(self.0 as u8)
    }

    pub const fn with_gain(self, gain: Gain) -> Self {
        Self((self.0 & !conf_gain(0x7)) | conf_gain(gain as u8))
    }
}

impl Default for ConfigRegister {
    fn default() -> Self {
        Self::POWER_ON
    }
}

/// Decoded status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    /// RDY is active low: a set bit means no result is waiting.
    pub const fn ready(self) -> bool {
        self.0 & STAT_RDY == 0
    }

    pub const fn error(self) -> bool {
        self.0 & STAT_ERR != 0
    }

    pub const fn no_reference(self) -> bool {
        self.0 & STAT_NOREF != 0
    }

    pub const fn parity(self) -> bool {
        self.0 & STAT_PARITY != 0
    }

    /// Channel the last conversion came from.
    pub const fn channel(self) -> Channel {
        Channel::from_index(self.0 & STAT_CH_MASK)
    }
}

const fn set_flag(value: u32, flag: u32, enable: bool) -> u32 {
    if enable {
        value | flag
    } else {
        value & !flag
    }
}
