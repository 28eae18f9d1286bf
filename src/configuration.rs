//! The configuration register and the settings used to derive it
//!
//! [`Configuration`] is a one-to-one description of the configuration register. [`Settings`] is
//! what a user hands to `configure()`: it leaves the gain open ([`Gain::Auto`]) and always
//! results in continuous conversions.
//!
//! # Example
//! The `..` completion can be used to only change specific values:
//! ```rust
//! use ina219_autocal::configuration::{AdcMode, Gain, Settings, ShuntVoltageRange};
//! let settings = Settings {
//!     gain: Gain::Fixed(ShuntVoltageRange::Fsr80mv),
//!     shunt_adc: AdcMode::Samples128,
//!     ..Settings::default()
//! };
//! ```

use crate::errors::ConfigurationError;
use crate::register::{ReadRegister, Register, RegisterName, WriteRegister};
use core::time::Duration;

const fn field(reg: u16, shift: u8, mask: u16) -> u16 {
    (reg >> shift) & mask
}

const fn with_field(reg: u16, shift: u8, mask: u16, value: u16) -> u16 {
    (reg & !(mask << shift)) | ((value & mask) << shift)
}

/// Perform a system reset or continue work as normal
///
/// Writing `Reset` sets every register to its power-on value. The device clears the flag itself,
/// so it always reads back as `Run`.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reset {
    /// Continue normal operation
    #[default]
    Run,
    /// Perform system reset
    Reset,
}

impl Reset {
    const SHIFT: u8 = 15;
    const MASK: u16 = 1;

    const fn from_field(bits: u16) -> Self {
        if bits == 0 {
            Self::Run
        } else {
            Self::Reset
        }
    }

    const fn bits(self) -> u16 {
        match self {
            Self::Run => 0,
            Self::Reset => 1,
        }
    }
}

/// Full scale range of the bus voltage ADC
#[derive(Default, Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusVoltageRange {
    /// Up to 16V
    Fsr16v,
    /// Up to 32V (the pins themselves are limited to 26V)
    #[default]
    Fsr32v,
}

impl BusVoltageRange {
    const SHIFT: u8 = 13;
    const MASK: u16 = 1;

    /// Upper end of the range in mV
    #[must_use]
    pub const fn max_mv(self) -> u16 {
        match self {
            Self::Fsr16v => 16_000,
            Self::Fsr32v => 32_000,
        }
    }

    const fn from_field(bits: u16) -> Self {
        if bits == 0 {
            Self::Fsr16v
        } else {
            Self::Fsr32v
        }
    }

    const fn bits(self) -> u16 {
        match self {
            Self::Fsr16v => 0,
            Self::Fsr32v => 1,
        }
    }
}

/// Full scale range of the shunt voltage ADC, set through the gain of its
/// [PGA](https://en.wikipedia.org/wiki/Programmable-gain_amplifier)
///
/// A larger range has more headroom for current peaks, a smaller one resolves small currents
/// better. The variants are ordered from the smallest to the largest range.
#[derive(Default, Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShuntVoltageRange {
    /// ±40mV, gain of 1
    Fsr40mv,
    /// ±80mV, gain of 1/2
    Fsr80mv,
    /// ±160mV, gain of 1/4
    Fsr160mv,
    /// ±320mV, gain of 1/8
    #[default]
    Fsr320mv,
}

impl ShuntVoltageRange {
    const SHIFT: u8 = 11;
    const MASK: u16 = 0b11;

    /// All ranges, smallest first
    pub const ALL: [Self; 4] = [Self::Fsr40mv, Self::Fsr80mv, Self::Fsr160mv, Self::Fsr320mv];

    /// Look up the range with the given full scale voltage
    ///
    /// # Errors
    /// Only 40, 80, 160 and 320 are accepted.
    pub const fn from_millivolts(mv: u16) -> Result<Self, ConfigurationError> {
        match mv {
            40 => Ok(Self::Fsr40mv),
            80 => Ok(Self::Fsr80mv),
            160 => Ok(Self::Fsr160mv),
            320 => Ok(Self::Fsr320mv),
            other => Err(ConfigurationError::UnknownShuntVoltageRange(other)),
        }
    }

    /// Full scale shunt voltage in mV, the range covers `-max_mv()..=max_mv()`
    #[must_use]
    pub const fn max_mv(self) -> u16 {
        match self {
            Self::Fsr40mv => 40,
            Self::Fsr80mv => 80,
            Self::Fsr160mv => 160,
            Self::Fsr320mv => 320,
        }
    }

    /// The next larger range, `None` for [`Self::Fsr320mv`]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Fsr40mv => Some(Self::Fsr80mv),
            Self::Fsr80mv => Some(Self::Fsr160mv),
            Self::Fsr160mv => Some(Self::Fsr320mv),
            Self::Fsr320mv => None,
        }
    }

    const fn from_field(bits: u16) -> Self {
        match bits {
            0 => Self::Fsr40mv,
            1 => Self::Fsr80mv,
            2 => Self::Fsr160mv,
            _ => Self::Fsr320mv,
        }
    }

    const fn bits(self) -> u16 {
        match self {
            Self::Fsr40mv => 0,
            Self::Fsr80mv => 1,
            Self::Fsr160mv => 2,
            Self::Fsr320mv => 3,
        }
    }
}

/// Gain requested from `configure()`
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// Pick the range from the expected current and raise it whenever an overflow is detected
    #[default]
    Auto,
    /// Always use the given range, overflows are only reported
    Fixed(ShuntVoltageRange),
}

/// Resolution or averaging used by one of the ADCs
#[derive(Default, Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcMode {
    /// Single 9 bit sample
    Bits9 = 0b0000,
    /// Single 10 bit sample
    Bits10 = 0b0001,
    /// Single 11 bit sample
    Bits11 = 0b0010,
    /// Single 12 bit sample
    #[default]
    Bits12 = 0b0011,
    /// 2 averaged 12 bit samples
    Samples2 = 0b1001,
    /// 4 averaged 12 bit samples
    Samples4 = 0b1010,
    /// 8 averaged 12 bit samples
    Samples8 = 0b1011,
    /// 16 averaged 12 bit samples
    Samples16 = 0b1100,
    /// 32 averaged 12 bit samples
    Samples32 = 0b1101,
    /// 64 averaged 12 bit samples
    Samples64 = 0b1110,
    /// 128 averaged 12 bit samples
    Samples128 = 0b1111,
}

impl AdcMode {
    const BUS_SHIFT: u8 = 7;
    const SHUNT_SHIFT: u8 = 3;
    const MASK: u16 = 0b1111;

    // The device ignores the upper bit for the single sample modes and treats 0b1000 as 12 bit
    const fn from_field(bits: u16) -> Self {
        match bits {
            0b0000 | 0b0100 => Self::Bits9,
            0b0001 | 0b0101 => Self::Bits10,
            0b0010 | 0b0110 => Self::Bits11,
            0b1001 => Self::Samples2,
            0b1010 => Self::Samples4,
            0b1011 => Self::Samples8,
            0b1100 => Self::Samples16,
            0b1101 => Self::Samples32,
            0b1110 => Self::Samples64,
            0b1111 => Self::Samples128,
            _ => Self::Bits12,
        }
    }

    const fn bits(self) -> u16 {
        self as u16
    }

    /// Conversion time of a single measurement in µs (table 5 of the datasheet)
    #[must_use]
    pub const fn conversion_time_us(self) -> u32 {
        match self {
            Self::Bits9 => 84,
            Self::Bits10 => 148,
            Self::Bits11 => 276,
            Self::Bits12 => 532,
            Self::Samples2 => 1_060,
            Self::Samples4 => 2_130,
            Self::Samples8 => 4_260,
            Self::Samples16 => 8_510,
            Self::Samples32 => 17_020,
            Self::Samples64 => 34_050,
            Self::Samples128 => 68_100,
        }
    }
}

impl TryFrom<u8> for AdcMode {
    type Error = ConfigurationError;

    /// Only the canonical 4 bit codes are accepted, aliases are rejected
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        let mode = Self::from_field(u16::from(code));
        if code <= 0b1111 && mode.bits() == u16::from(code) {
            Ok(mode)
        } else {
            Err(ConfigurationError::UnknownAdcMode(code))
        }
    }
}

/// Which signals are measured during a conversion
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasuredSignals {
    /// Only the shunt voltage
    ShuntVoltage,
    /// Only the bus voltage
    BusVoltage,
    /// Both voltages
    #[default]
    ShuntAndBusVoltage,
}

impl MeasuredSignals {
    const fn bits(self) -> u16 {
        match self {
            Self::ShuntVoltage => 0b01,
            Self::BusVoltage => 0b10,
            Self::ShuntAndBusVoltage => 0b11,
        }
    }
}

/// Operating mode of the INA219
///
/// The driver itself only ever selects [`Self::PowerDown`] and continuous conversions, the other
/// modes exist so every register value can be decoded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// Lowest power state, recovery takes 40µs
    PowerDown,
    /// The ADCs are disabled
    AdcOff,
    /// A single conversion is started with every configuration write
    Triggered(MeasuredSignals),
    /// The device converts continuously
    Continuous(MeasuredSignals),
}

impl OperatingMode {
    const SHIFT: u8 = 0;
    const MASK: u16 = 0b111;

    const fn from_field(bits: u16) -> Self {
        let signals = match bits & 0b11 {
            0b01 => MeasuredSignals::ShuntVoltage,
            0b10 => MeasuredSignals::BusVoltage,
            _ => MeasuredSignals::ShuntAndBusVoltage,
        };

        match bits {
            0b000 => Self::PowerDown,
            0b100 => Self::AdcOff,
            0b001..=0b011 => Self::Triggered(signals),
            _ => Self::Continuous(signals),
        }
    }

    /// Return the bits representing this mode
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::PowerDown => 0b000,
            Self::AdcOff => 0b100,
            Self::Triggered(signals) => signals.bits(),
            Self::Continuous(signals) => signals.bits() | 0b100,
        }
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self::Continuous(MeasuredSignals::ShuntAndBusVoltage)
    }
}

/// Configuration register
///
/// The default matches the value the device holds after power on or a reset.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    /// Request a reset or continue to run normally
    pub reset: Reset,
    /// Full scale range of the bus voltage
    pub bus_voltage_range: BusVoltageRange,
    /// Full scale range of the shunt voltage, the gain
    pub shunt_voltage_range: ShuntVoltageRange,
    /// Resolution / averaging of the bus voltage ADC
    pub bus_adc: AdcMode,
    /// Resolution / averaging of the shunt voltage ADC
    pub shunt_adc: AdcMode,
    /// Which signals to measure and how conversions are started
    pub operating_mode: OperatingMode,
}

impl Configuration {
    /// Register value after power on
    pub const POWER_ON_BITS: u16 = 0x399F;

    /// Decode the contents of the configuration register
    #[must_use]
    pub const fn from_bits(reg: u16) -> Self {
        Self {
            reset: Reset::from_field(field(reg, Reset::SHIFT, Reset::MASK)),
            bus_voltage_range: BusVoltageRange::from_field(field(
                reg,
                BusVoltageRange::SHIFT,
                BusVoltageRange::MASK,
            )),
            shunt_voltage_range: ShuntVoltageRange::from_field(field(
                reg,
                ShuntVoltageRange::SHIFT,
                ShuntVoltageRange::MASK,
            )),
            bus_adc: AdcMode::from_field(field(reg, AdcMode::BUS_SHIFT, AdcMode::MASK)),
            shunt_adc: AdcMode::from_field(field(reg, AdcMode::SHUNT_SHIFT, AdcMode::MASK)),
            operating_mode: OperatingMode::from_field(field(
                reg,
                OperatingMode::SHIFT,
                OperatingMode::MASK,
            )),
        }
    }

    /// Encode into the bits of the configuration register
    #[must_use]
    pub const fn as_bits(self) -> u16 {
        let mut reg = 0;
        reg = with_field(reg, Reset::SHIFT, Reset::MASK, self.reset.bits());
        reg = with_field(
            reg,
            BusVoltageRange::SHIFT,
            BusVoltageRange::MASK,
            self.bus_voltage_range.bits(),
        );
        reg = with_field(
            reg,
            ShuntVoltageRange::SHIFT,
            ShuntVoltageRange::MASK,
            self.shunt_voltage_range.bits(),
        );
        reg = with_field(reg, AdcMode::BUS_SHIFT, AdcMode::MASK, self.bus_adc.bits());
        reg = with_field(reg, AdcMode::SHUNT_SHIFT, AdcMode::MASK, self.shunt_adc.bits());
        reg = with_field(
            reg,
            OperatingMode::SHIFT,
            OperatingMode::MASK,
            self.operating_mode.bits(),
        );
        reg
    }

    /// The same configuration with another shunt voltage range
    #[must_use]
    pub const fn with_shunt_voltage_range(self, shunt_voltage_range: ShuntVoltageRange) -> Self {
        Self {
            shunt_voltage_range,
            ..self
        }
    }

    /// The same configuration with the device powered down
    #[must_use]
    pub const fn asleep(self) -> Self {
        Self {
            operating_mode: OperatingMode::PowerDown,
            ..self
        }
    }

    /// The same configuration continuously converting shunt and bus voltage
    #[must_use]
    pub const fn awake(self) -> Self {
        Self {
            operating_mode: OperatingMode::Continuous(MeasuredSignals::ShuntAndBusVoltage),
            ..self
        }
    }

    /// Time it takes the device to produce one set of measurements
    ///
    /// Returns `None` if the device is not converting.
    #[must_use]
    pub fn conversion_time(self) -> Option<Duration> {
        let signals = match self.operating_mode {
            OperatingMode::PowerDown | OperatingMode::AdcOff => return None,
            OperatingMode::Triggered(signals) | OperatingMode::Continuous(signals) => signals,
        };

        let us = match signals {
            MeasuredSignals::ShuntVoltage => self.shunt_adc.conversion_time_us(),
            MeasuredSignals::BusVoltage => self.bus_adc.conversion_time_us(),
            MeasuredSignals::ShuntAndBusVoltage => {
                self.shunt_adc.conversion_time_us() + self.bus_adc.conversion_time_us()
            }
        };

        Some(Duration::from_micros(u64::from(us)))
    }
}

impl Register for Configuration {
    const NAME: RegisterName = RegisterName::Configuration;
}

impl ReadRegister for Configuration {
    fn from_bits(bits: u16) -> Self {
        Self::from_bits(bits)
    }
}

impl WriteRegister for Configuration {
    fn as_bits(&self) -> u16 {
        Configuration::as_bits(*self)
    }
}

/// Measurement settings applied by `configure()`
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// Full scale range of the bus voltage
    pub bus_voltage_range: BusVoltageRange,
    /// Fixed shunt voltage range or automatic selection
    pub gain: Gain,
    /// Resolution / averaging of the bus voltage ADC
    pub bus_adc: AdcMode,
    /// Resolution / averaging of the shunt voltage ADC
    pub shunt_adc: AdcMode,
}

impl Settings {
    /// The configuration register contents for these settings once the gain has been resolved
    #[must_use]
    pub const fn configuration(self, shunt_voltage_range: ShuntVoltageRange) -> Configuration {
        Configuration {
            reset: Reset::Run,
            bus_voltage_range: self.bus_voltage_range,
            shunt_voltage_range,
            bus_adc: self.bus_adc,
            shunt_adc: self.shunt_adc,
            operating_mode: OperatingMode::Continuous(MeasuredSignals::ShuntAndBusVoltage),
        }
    }
}
