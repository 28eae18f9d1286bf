//! Bus address of the INA219
//!
//! The lower four bits of the 7-bit address are strapped with the pins A0 and A1 (table 1 of the
//! datasheet), the upper bits are fixed to `0b100`. Without strapping the device answers at 0x40.

use core::fmt::Formatter;

/// Signal an address pin is tied to
///
/// # Example
/// ```rust
/// use ina219_autocal::address::Pin;
///
/// assert_eq!(Pin::Sda.bits(), 0b10);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pin {
    /// Tied to GND
    Gnd,
    /// Tied to Vcc
    Vcc,
    /// Tied to SDA
    Sda,
    /// Tied to SCL
    Scl,
}

impl Pin {
    const ALL: [Self; 4] = [Self::Gnd, Self::Vcc, Self::Sda, Self::Scl];

    /// The two address bits selected by tying a pin to this signal
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Gnd => 0b00,
            Self::Vcc => 0b01,
            Self::Sda => 0b10,
            Self::Scl => 0b11,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0b11) as usize]
    }
}

/// 7-bit bus address of the INA219
///
/// # Example
/// ```rust
/// use ina219_autocal::address::{Address, Pin};
///
/// assert_eq!(Address::default().as_byte(), 0x40);
/// assert_eq!(Address::from_pins(Pin::Sda, Pin::Scl).as_byte(), 0x4E);
/// assert_eq!(Address::from_byte(0x45).unwrap().as_pins(), (Pin::Vcc, Pin::Vcc));
/// assert!(Address::from_byte(0x50).is_err());
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(u8);

impl Address {
    const BASE: u8 = 0b100_0000;
    const LAST: u8 = 0b100_1111;

    /// Address selected by the strapping of A0 and A1
    #[must_use]
    pub const fn from_pins(a0: Pin, a1: Pin) -> Self {
        Self(Self::BASE | a0.bits() | (a1.bits() << 2))
    }

    /// Use the given 7-bit address
    ///
    /// # Errors
    /// Returns `Err` if the byte is not an address the INA219 can be strapped to.
    pub const fn from_byte(byte: u8) -> Result<Self, OutOfRange> {
        match byte {
            Self::BASE..=Self::LAST => Ok(Self(byte)),
            which => Err(OutOfRange { which }),
        }
    }

    /// The address as sent on the bus
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self.0
    }

    /// The strapping of A0 and A1 that selects this address
    #[must_use]
    pub const fn as_pins(self) -> (Pin, Pin) {
        (Pin::from_bits(self.0), Pin::from_bits(self.0 >> 2))
    }
}

impl Default for Address {
    fn default() -> Self {
        Self(Self::BASE)
    }
}

impl TryFrom<u8> for Address {
    type Error = OutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value)
    }
}

/// The given byte is not an address of an INA219
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRange {
    which: u8,
}

impl core::fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Address {:#04x} out of range {:#04x}..={:#04x}",
            self.which,
            Address::BASE,
            Address::LAST,
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OutOfRange {}
