//! Decoded measurements
//!
//! Shunt and bus voltage are independent of the calibration and decode directly from their
//! registers. Current and power are only meaningful together with the least significant bit
//! (LSB) of the [`Calibration`](crate::calibration::Calibration) that was active when the device
//! computed them, so [`Current`] and [`Power`] carry it along with the raw count.

use crate::calibration::{NanoAmpere, NanoWatt};
use crate::register::{ReadRegister, Register, RegisterName};

#[allow(clippy::cast_possible_wrap)]
const fn signed(bits: u16) -> i16 {
    bits as i16
}

/// A set of measurements
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    /// Bus voltage, including the status flags of the conversion
    pub bus_voltage: BusVoltage,
    /// Voltage across the shunt
    pub shunt_voltage: ShuntVoltage,
    /// Current through the shunt
    pub current: Current,
    /// Power delivered to the load
    pub power: Power,
}

impl Measurements {
    /// Voltage at the supply side of the shunt
    #[must_use]
    pub fn supply_voltage(&self) -> SupplyVoltage {
        SupplyVoltage::new(self.bus_voltage, self.shunt_voltage)
    }
}

/// Contents of the shunt voltage register
///
/// The sign tells the direction of the current.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShuntVoltage(i16);

impl ShuntVoltage {
    /// Decode the register bits, a two's complement count of 10µV
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(signed(bits))
    }

    /// Create a shunt voltage from a value in 10µV
    #[must_use]
    pub const fn from_10uv(ten_uv: i16) -> Self {
        Self(ten_uv)
    }

    /// The shunt voltage in the 10µV resolution of the device
    #[must_use]
    pub const fn shunt_voltage_10uv(self) -> i16 {
        self.0
    }

    /// The shunt voltage in µV
    #[must_use]
    pub fn shunt_voltage_uv(self) -> i32 {
        i32::from(self.0) * 10
    }

    /// The shunt voltage in mV, truncating trailing digits
    #[must_use]
    pub const fn shunt_voltage_mv(self) -> i16 {
        self.0 / 100
    }

    /// The shunt voltage in mV
    #[must_use]
    pub fn millivolts(self) -> f32 {
        f32::from(self.0) * 0.01
    }
}

impl Register for ShuntVoltage {
    const NAME: RegisterName = RegisterName::ShuntVoltage;
}

impl ReadRegister for ShuntVoltage {
    fn from_bits(bits: u16) -> Self {
        Self::from_bits(bits)
    }
}

/// Contents of the bus voltage register
///
/// Next to the voltage the register holds two flags describing the last conversion.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusVoltage(u16);

impl BusVoltage {
    const CONVERSION_READY: u16 = 0b10;
    const MATH_OVERFLOW: u16 = 0b01;
    const MAX_MV: u16 = (u16::MAX >> 3) * 4;

    /// Decode the register bits
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Create a bus voltage without any flags set, rounding down to the 4mV resolution
    ///
    /// Voltages above the largest value of the register (32764mV) are clamped to it.
    #[must_use]
    pub const fn from_mv(mv: u16) -> Self {
        let mv = if mv > Self::MAX_MV { Self::MAX_MV } else { mv };
        Self((mv / 4) << 3)
    }

    /// The bus voltage in the 4mV resolution of the device
    #[must_use]
    pub const fn voltage_4mv(self) -> u16 {
        self.0 >> 3
    }

    /// The bus voltage in mV
    #[must_use]
    pub const fn voltage_mv(self) -> u16 {
        self.voltage_4mv() * 4
    }

    /// The bus voltage in V
    #[must_use]
    pub fn volts(self) -> f32 {
        f32::from(self.voltage_mv()) / 1000.0
    }

    /// Whether new data is available
    ///
    /// The flag is set when a conversion finishes and cleared by reading the power register or
    /// writing the configuration.
    #[must_use]
    pub const fn is_conversion_ready(self) -> bool {
        self.0 & Self::CONVERSION_READY != 0
    }

    /// Whether the current or power calculation overflowed
    ///
    /// The bus voltage itself is still valid, current and power are not.
    #[must_use]
    pub const fn has_math_overflowed(self) -> bool {
        self.0 & Self::MATH_OVERFLOW != 0
    }
}

impl Register for BusVoltage {
    const NAME: RegisterName = RegisterName::BusVoltage;
}

impl ReadRegister for BusVoltage {
    fn from_bits(bits: u16) -> Self {
        Self::from_bits(bits)
    }
}

/// Voltage on the supply side of the shunt, bus voltage plus shunt voltage
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SupplyVoltage(i32);

impl SupplyVoltage {
    /// Combine a bus and a shunt voltage measurement
    #[must_use]
    pub fn new(bus: BusVoltage, shunt: ShuntVoltage) -> Self {
        Self(i32::from(bus.voltage_mv()) * 1000 + shunt.shunt_voltage_uv())
    }

    /// The supply voltage in µV
    #[must_use]
    pub const fn voltage_uv(self) -> i32 {
        self.0
    }

    /// The supply voltage in V
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn volts(self) -> f32 {
        self.0 as f32 / 1_000_000.0
    }
}

/// Raw contents of the current register
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CurrentRegister(pub u16);

impl Register for CurrentRegister {
    const NAME: RegisterName = RegisterName::Current;
}

impl ReadRegister for CurrentRegister {
    fn from_bits(bits: u16) -> Self {
        Self(bits)
    }
}

/// Raw contents of the power register
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerRegister(pub u16);

impl Register for PowerRegister {
    const NAME: RegisterName = RegisterName::Power;
}

impl ReadRegister for PowerRegister {
    fn from_bits(bits: u16) -> Self {
        Self(bits)
    }
}

/// A current measurement
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Current {
    count: i16,
    lsb: NanoAmpere,
}

impl Current {
    /// Decode the current register using the current LSB it was computed with
    #[must_use]
    pub const fn from_register(reg: CurrentRegister, lsb: NanoAmpere) -> Self {
        Self {
            count: signed(reg.0),
            lsb,
        }
    }

    /// Signed count as reported by the device
    #[must_use]
    pub const fn count(self) -> i16 {
        self.count
    }

    /// The current in nA
    #[must_use]
    pub fn nanoamperes(self) -> i64 {
        i64::from(self.count) * self.lsb.0
    }

    /// The current in µA, truncating trailing digits
    #[must_use]
    pub fn microamperes(self) -> i64 {
        self.nanoamperes() / 1_000
    }

    /// The current in mA
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn milliamperes(self) -> f32 {
        self.nanoamperes() as f32 / 1_000_000.0
    }
}

/// A power measurement
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Power {
    count: u16,
    lsb: NanoWatt,
}

impl Power {
    /// Decode the power register using the power LSB it was computed with
    #[must_use]
    pub const fn from_register(reg: PowerRegister, lsb: NanoWatt) -> Self {
        Self { count: reg.0, lsb }
    }

    /// Unsigned count as reported by the device
    #[must_use]
    pub const fn count(self) -> u16 {
        self.count
    }

    /// The power in nW
    #[must_use]
    pub fn nanowatts(self) -> i64 {
        i64::from(self.count) * self.lsb.0
    }

    /// The power in µW, truncating trailing digits
    #[must_use]
    pub fn microwatts(self) -> i64 {
        self.nanowatts() / 1_000
    }

    /// The power in mW
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn milliwatts(self) -> f32 {
        self.nanowatts() as f32 / 1_000_000.0
    }
}
