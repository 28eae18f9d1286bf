//! Derive the calibration of the INA219 from the shunt resistor and the expected current
//!
//! The device computes current and power itself from the shunt voltage and the value in its
//! calibration register. The datasheet relates them through the LSB of the current register:
//!
//! ```text
//! calibration = trunc(0.04096 / (current_lsb * r_shunt))
//! power_lsb   = 20 * current_lsb
//! ```
//!
//! [`Calibration::new`] picks the current LSB:
//! 1. The working current is the expected current, or the full scale current of the shunt
//!    voltage range if none was given. Dividing it by 32767 gives the finest useful LSB.
//! 2. The LSB is raised to the smallest value that keeps the calibration within 15 bits.
//! 3. The LSB is rounded up to two significant digits in nA so that it is a readable number.
//!    Rounding up never makes the working current unrepresentable.
//!
//! The calibration register ignores its lowest bit, so the value is always made even.

use crate::address::Address;
use crate::configuration::{Gain, ShuntVoltageRange};
use crate::errors::ConfigurationError;
use crate::register::{ReadRegister, Register, RegisterName, WriteRegister};

/// 0.04096 expressed for a current in nA and a resistance in µΩ
const SCALING_FACTOR: u64 = 40_960_000_000_000;
/// Largest positive count of the current register
const CURRENT_FULL_SCALE: u64 = i16::MAX as u64;
/// Largest calibration value we program
const MAX_CALIBRATION: u64 = 0x7FFF;
const LSB_SIGNIFICANT_DIGITS: u32 = 2;

/// A current in µA
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MicroAmpere(pub i64);

impl MicroAmpere {
    /// Convert a current in A, rounding to the nearest µA
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn from_amperes(amperes: f32) -> Self {
        let ua = amperes * 1_000_000.0;
        // `as` saturates, NaN turns into zero
        let rounded = if ua < 0.0 { ua - 0.5 } else { ua + 0.5 };
        Self(rounded as i64)
    }
}

/// A current in nA, used for the current LSB
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NanoAmpere(pub i64);

/// A power in nW, used for the power LSB
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NanoWatt(pub i64);

/// Resistance of the shunt resistor in µΩ
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShuntResistance(u32);

impl ShuntResistance {
    /// Create a shunt resistance from a value in µΩ
    ///
    /// # Errors
    /// The resistance has to be larger than zero.
    pub const fn from_micro_ohms(micro_ohms: u32) -> Result<Self, ConfigurationError> {
        if micro_ohms == 0 {
            Err(ConfigurationError::InvalidShuntResistance)
        } else {
            Ok(Self(micro_ohms))
        }
    }

    /// Create a shunt resistance from a value in Ω, rounding to the nearest µΩ
    ///
    /// # Errors
    /// The resistance has to be finite, at least 1µΩ and below 4294.97Ω.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_ohms(ohms: f32) -> Result<Self, ConfigurationError> {
        if !ohms.is_finite() || ohms <= 0.0 {
            return Err(ConfigurationError::InvalidShuntResistance);
        }

        // The cast saturates, anything that does not fit must not get there
        let micro_ohms = ohms * 1_000_000.0 + 0.5;
        if micro_ohms >= u32::MAX as f32 {
            return Err(ConfigurationError::InvalidShuntResistance);
        }

        Self::from_micro_ohms(micro_ohms as u32)
    }

    /// The resistance in µΩ
    #[must_use]
    pub const fn micro_ohms(self) -> u32 {
        self.0
    }

    /// Largest current measurable in the given shunt voltage range
    #[must_use]
    pub const fn max_current(self, range: ShuntVoltageRange) -> MicroAmpere {
        // mV * 10^9 / µΩ = µA
        #[allow(clippy::cast_possible_wrap)]
        let ua = (range.max_mv() as u64 * 1_000_000_000 / self.0 as u64) as i64;
        MicroAmpere(ua)
    }
}

/// Construction time options of the driver
///
/// # Example
/// ```rust
/// use ina219_autocal::address::{Address, Pin};
/// use ina219_autocal::calibration::{MicroAmpere, Options, ShuntResistance};
///
/// let options = Options::new(ShuntResistance::from_micro_ohms(100_000).unwrap())
///     .with_address(Address::from_pins(Pin::Vcc, Pin::Gnd))
///     .with_max_expected_current(MicroAmpere(400_000));
/// assert_eq!(options.address.as_byte(), 0x41);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Options {
    /// Address of the device on the bus
    pub address: Address,
    /// Resistance of the shunt
    pub shunt: ShuntResistance,
    /// Largest current expected through the shunt, `None` to use the full range of the device
    pub max_expected_current: Option<MicroAmpere>,
}

impl Options {
    /// Options for a device at the default address without an expected current
    #[must_use]
    pub fn new(shunt: ShuntResistance) -> Self {
        Self {
            address: Address::default(),
            shunt,
            max_expected_current: None,
        }
    }

    /// Use another bus address
    #[must_use]
    pub const fn with_address(self, address: Address) -> Self {
        Self { address, ..self }
    }

    /// Set the largest current expected through the shunt
    #[must_use]
    pub const fn with_max_expected_current(self, current: MicroAmpere) -> Self {
        Self {
            max_expected_current: Some(current),
            ..self
        }
    }
}

/// Pick the smallest shunt voltage range that can measure `expected`
///
/// Without an expected current the largest range is used.
///
/// # Errors
/// Returns an error if the expected current is not positive or above what the largest range
/// can measure.
pub fn select_range(
    shunt: ShuntResistance,
    expected: Option<MicroAmpere>,
) -> Result<ShuntVoltageRange, ConfigurationError> {
    let Some(expected) = expected else {
        return Ok(ShuntVoltageRange::Fsr320mv);
    };
    if expected.0 <= 0 {
        return Err(ConfigurationError::InvalidExpectedCurrent(expected));
    }

    ShuntVoltageRange::ALL
        .into_iter()
        .find(|&range| shunt.max_current(range) >= expected)
        .ok_or(ConfigurationError::ExpectedCurrentOutOfRange {
            expected,
            max_possible: shunt.max_current(ShuntVoltageRange::Fsr320mv),
        })
}

/// Round `value` up so that only its `digits` leading decimal digits are non zero
fn round_up_significant(value: u64, digits: u32) -> u64 {
    let mut step = 1;
    while value / step >= 10u64.pow(digits) {
        step *= 10;
    }
    value.div_ceil(step) * step
}

/// Calibration of the device for one shunt voltage range
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    shunt: ShuntResistance,
    max_expected_current: Option<MicroAmpere>,
    shunt_voltage_range: ShuntVoltageRange,
    current_lsb: NanoAmpere,
    value: u16,
}

impl Calibration {
    /// Compute the calibration for measuring up to `max_expected_current` in `range`
    ///
    /// An expected current above what `range` can measure is accepted, such currents will show up
    /// as overflows.
    ///
    /// # Errors
    /// Returns an error if the expected current is not positive or the resulting calibration
    /// value does not fit the register.
    pub fn new(
        shunt: ShuntResistance,
        max_expected_current: Option<MicroAmpere>,
        range: ShuntVoltageRange,
    ) -> Result<Self, ConfigurationError> {
        let full_scale = shunt.max_current(range);
        let working = match max_expected_current {
            Some(expected) if expected.0 <= 0 => {
                return Err(ConfigurationError::InvalidExpectedCurrent(expected))
            }
            Some(expected) => {
                if expected > full_scale {
                    warn!(
                        "expected current {}uA exceeds the {}mV range ({}uA), expect overflows",
                        expected.0,
                        range.max_mv(),
                        full_scale.0
                    );
                }
                expected
            }
            None => full_scale,
        };

        let working_na = u64::try_from(working.0)
            .ok()
            .and_then(|ua| ua.checked_mul(1_000))
            .ok_or(ConfigurationError::CalibrationOutOfRange)?;
        let shunt_uohm = u64::from(shunt.micro_ohms());

        let requested_lsb = working_na.div_ceil(CURRENT_FULL_SCALE);
        let min_lsb = SCALING_FACTOR / ((MAX_CALIBRATION + 1) * shunt_uohm) + 1;
        let lsb = round_up_significant(requested_lsb.max(min_lsb), LSB_SIGNIFICANT_DIGITS);

        let value = lsb
            .checked_mul(shunt_uohm)
            .map_or(0, |product| SCALING_FACTOR / product)
            & !1;
        if value == 0 {
            return Err(ConfigurationError::CalibrationOutOfRange);
        }
        let value = u16::try_from(value).map_err(|_| ConfigurationError::CalibrationOutOfRange)?;
        let current_lsb =
            NanoAmpere(i64::try_from(lsb).map_err(|_| ConfigurationError::CalibrationOutOfRange)?);

        debug!(
            "calibrated {}mV range: current lsb {}nA, calibration {}",
            range.max_mv(),
            current_lsb.0,
            value
        );

        Ok(Self {
            shunt,
            max_expected_current,
            shunt_voltage_range: range,
            current_lsb,
            value,
        })
    }

    /// Value of the calibration register
    #[must_use]
    pub const fn register_bits(&self) -> u16 {
        self.value
    }

    /// Value of one count of the current register
    #[must_use]
    pub const fn current_lsb(&self) -> NanoAmpere {
        self.current_lsb
    }

    /// Value of one count of the power register
    #[must_use]
    pub const fn power_lsb(&self) -> NanoWatt {
        NanoWatt(20 * self.current_lsb.0)
    }

    /// Shunt voltage range this calibration was computed for
    #[must_use]
    pub const fn shunt_voltage_range(&self) -> ShuntVoltageRange {
        self.shunt_voltage_range
    }

    /// Resistance of the shunt
    #[must_use]
    pub const fn shunt(&self) -> ShuntResistance {
        self.shunt
    }

    /// The expected current this calibration was computed for
    #[must_use]
    pub const fn max_expected_current(&self) -> Option<MicroAmpere> {
        self.max_expected_current
    }

    /// The calibration register contents
    #[must_use]
    pub const fn register(&self) -> CalibrationRegister {
        CalibrationRegister(self.value)
    }
}

/// Contents of the calibration register
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationRegister(pub u16);

impl Register for CalibrationRegister {
    const NAME: RegisterName = RegisterName::Calibration;
}

impl ReadRegister for CalibrationRegister {
    fn from_bits(bits: u16) -> Self {
        Self(bits)
    }
}

impl WriteRegister for CalibrationRegister {
    fn as_bits(&self) -> u16 {
        self.0
    }
}

/// A calibration together with the gain policy it was created under
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibrator {
    calibration: Calibration,
    auto_gain: bool,
}

impl Calibrator {
    /// Resolve `gain` and compute the matching calibration
    ///
    /// # Errors
    /// See [`select_range`] and [`Calibration::new`].
    pub fn new(
        shunt: ShuntResistance,
        max_expected_current: Option<MicroAmpere>,
        gain: Gain,
    ) -> Result<Self, ConfigurationError> {
        let (range, auto_gain) = match gain {
            Gain::Auto => (select_range(shunt, max_expected_current)?, true),
            Gain::Fixed(range) => (range, false),
        };

        Ok(Self {
            calibration: Calibration::new(shunt, max_expected_current, range)?,
            auto_gain,
        })
    }

    /// The current calibration
    #[must_use]
    pub const fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Whether overflows raise the gain
    #[must_use]
    pub const fn is_auto_gain(&self) -> bool {
        self.auto_gain
    }

    /// The state to move to after the device reported an overflow
    ///
    /// The next range is calibrated for its full scale current since the expected current
    /// evidently was too low.
    #[must_use]
    pub fn on_overflow(&self) -> Escalation {
        if !self.auto_gain {
            return Escalation::Disabled;
        }

        let next = self
            .calibration
            .shunt_voltage_range
            .next()
            .and_then(|range| Calibration::new(self.calibration.shunt, None, range).ok());

        match next {
            Some(calibration) => Escalation::Escalated(Self {
                calibration,
                auto_gain: true,
            }),
            None => Escalation::AtLimit,
        }
    }
}

/// Outcome of an overflow for the gain
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Escalation {
    /// The gain is fixed or unknown, nothing was changed
    Disabled,
    /// The gain was raised, following measurements use this calibration
    Escalated(Calibrator),
    /// Already at the largest range
    AtLimit,
}
