//! Errors that can be returned by the different functions

use crate::calibration::{Escalation, MicroAmpere};
use crate::configuration::{Configuration, ShuntVoltageRange};
use core::fmt::{Debug, Display, Formatter};

/// A requested configuration or calibration can not be represented by the device
///
/// These are detected before anything is written to the device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationError {
    /// The shunt resistance has to be positive and finite
    InvalidShuntResistance,
    /// The expected current has to be positive
    InvalidExpectedCurrent(MicroAmpere),
    /// Even the largest shunt voltage range can not measure the expected current
    ExpectedCurrentOutOfRange {
        /// Current that was asked for
        expected: MicroAmpere,
        /// Largest current measurable with the given shunt
        max_possible: MicroAmpere,
    },
    /// The current resolution and shunt give a calibration value that does not fit the register
    CalibrationOutOfRange,
    /// Not one of the 4 bit ADC mode codes
    UnknownAdcMode(u8),
    /// Not one of the supported shunt voltage ranges in mV
    UnknownShuntVoltageRange(u16),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidShuntResistance => {
                write!(f, "Shunt resistance has to be positive and finite")
            }
            Self::InvalidExpectedCurrent(current) => {
                write!(f, "Expected current has to be positive, got {}µA", current.0)
            }
            Self::ExpectedCurrentOutOfRange {
                expected,
                max_possible,
            } => write!(
                f,
                "Expected current {}µA is greater than the largest measurable current {}µA",
                expected.0, max_possible.0
            ),
            Self::CalibrationOutOfRange => {
                write!(f, "Calibration value does not fit the calibration register")
            }
            Self::UnknownAdcMode(code) => write!(f, "Unknown ADC mode {code:#06b}"),
            Self::UnknownShuntVoltageRange(mv) => write!(f, "Unknown shunt voltage range {mv}mV"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigurationError {}

/// Errors that can happen while configuring the device
#[derive(Debug, Copy, Clone)]
pub enum ConfigureError<I2cErr> {
    /// An I2C read or write failed
    I2cError(I2cErr),
    /// The settings or options can not be represented, nothing was written
    InvalidConfiguration(ConfigurationError),
    /// The configuration read back from the device differs from the one written
    ConfigurationMismatch {
        /// Configuration read from the device
        read: Configuration,
        /// Configuration that was written
        written: Configuration,
    },
}

impl<E> From<E> for ConfigureError<E> {
    fn from(value: E) -> Self {
        Self::I2cError(value)
    }
}

impl<I2cErr: Debug> Display for ConfigureError<I2cErr> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::I2cError(err) => write!(f, "I2C error: {err:?}"),
            Self::InvalidConfiguration(err) => write!(f, "Invalid configuration: {err}"),
            Self::ConfigurationMismatch { read, written } => write!(
                f,
                "Configuration read from device {read:?} did not match written configuration {written:?}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl<I2cErr> std::error::Error for ConfigureError<I2cErr>
where
    I2cErr: Debug + std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::I2cError(err) => Some(err),
            Self::InvalidConfiguration(err) => Some(err),
            Self::ConfigurationMismatch { .. } => None,
        }
    }
}

/// The device reported that its current or power calculation overflowed
///
/// Current and power of this conversion are invalid, the bus voltage is not affected.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overflow {
    /// Shunt voltage range that was active, `None` if the driver does not know the configuration
    pub shunt_voltage_range: Option<ShuntVoltageRange>,
    /// What the driver did about it
    pub escalation: Escalation,
}

impl Display for Overflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Current out of range (overflow)")?;
        if let Some(range) = self.shunt_voltage_range {
            write!(f, " for {}mV shunt range", range.max_mv())?;
        }
        match self.escalation {
            Escalation::Disabled => Ok(()),
            Escalation::Escalated(next) => write!(
                f,
                ", gain raised to {}mV",
                next.calibration().shunt_voltage_range().max_mv()
            ),
            Escalation::AtLimit => write!(f, ", device limit reached"),
        }
    }
}

/// Errors that can happen when a measurement is read
#[derive(Debug, Copy, Clone)]
pub enum MeasurementError<I2cErr> {
    /// An I2C read or write failed
    I2cError(I2cErr),
    /// Current and power need a calibration, call `configure()` first
    NotCalibrated,
    /// The math overflow flag of the bus voltage register was set
    Overflow(Overflow),
}

impl<E> From<E> for MeasurementError<E> {
    fn from(value: E) -> Self {
        Self::I2cError(value)
    }
}

impl<I2cErr: Debug> Display for MeasurementError<I2cErr> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::I2cError(err) => write!(f, "I2C error: {err:?}"),
            Self::NotCalibrated => write!(f, "Device is not calibrated"),
            Self::Overflow(overflow) => Display::fmt(overflow, f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Overflow {}

#[cfg(feature = "std")]
impl<I2cErr> std::error::Error for MeasurementError<I2cErr>
where
    I2cErr: Debug + std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::I2cError(err) => Some(err),
            Self::Overflow(overflow) => Some(overflow),
            Self::NotCalibrated => None,
        }
    }
}

/// Errors that can happen when the configuration is read
#[derive(Debug, Copy, Clone)]
pub enum ConfigurationReadError<I2cErr> {
    /// The I2C read failed
    I2cError(I2cErr),
    /// The read configuration did not match the saved configuration
    ConfigurationMismatch {
        /// Configuration read from the device
        read: Configuration,
        /// Configuration saved in the driver
        saved: Configuration,
    },
}

impl<E> From<E> for ConfigurationReadError<E> {
    fn from(value: E) -> Self {
        Self::I2cError(value)
    }
}

impl<E: Debug> Display for ConfigurationReadError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::I2cError(err) => write!(f, "I2C error: {err:?}"),
            Self::ConfigurationMismatch { read, saved } => write!(
                f,
                "Configuration read from device {read:?} did not match saved configuration {saved:?}",
            ),
        }
    }
}

#[cfg(feature = "std")]
impl<I2cErr> std::error::Error for ConfigurationReadError<I2cErr>
where
    I2cErr: Debug + std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::I2cError(err) => Some(err),
            Self::ConfigurationMismatch { .. } => None,
        }
    }
}
