//! Register map of the INA219
//!
//! Every register is 16 bits wide and transferred big-endian. The types describing the contents
//! of a register implement [`ReadRegister`] and/or [`WriteRegister`], which ties them to the
//! address they live at.
#![allow(clippy::module_name_repetitions)]

/// Addresses of the internal registers of the INA219
///
/// See `read_raw()` on the driver.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterName {
    /// Configuration register, see [`Configuration`](crate::configuration::Configuration)
    Configuration = 0x00,
    /// Shunt voltage register, see [`ShuntVoltage`](crate::measurements::ShuntVoltage)
    ShuntVoltage = 0x01,
    /// Bus voltage register, see [`BusVoltage`](crate::measurements::BusVoltage)
    BusVoltage = 0x02,
    /// Power register, see [`Power`](crate::measurements::Power)
    Power = 0x03,
    /// Current register, see [`Current`](crate::measurements::Current)
    Current = 0x04,
    /// Calibration register, see [`CalibrationRegister`](crate::calibration::CalibrationRegister)
    Calibration = 0x05,
}

impl RegisterName {
    /// Address byte sent on the bus to select this register
    #[must_use]
    pub const fn address(self) -> u8 {
        self as u8
    }
}

/// A type describing the contents of one register
pub trait Register {
    /// The register this type is stored in
    const NAME: RegisterName;

    /// Address byte of [`Self::NAME`]
    const ADDRESS: u8 = Self::NAME.address();
}

/// A register that can be decoded from the bits read from the device
///
/// Decoding is total, every bit pattern results in a value.
pub trait ReadRegister: Register {
    /// Decode the register contents
    fn from_bits(bits: u16) -> Self;
}

/// A register that can be written to the device
pub trait WriteRegister: Register {
    /// Encode the value as the bits to write
    fn as_bits(&self) -> u16;
}
