//! Driver for the INA219 current/power monitor that derives its own calibration
//!
//! Instead of asking for a raw calibration register value the driver takes the value of the shunt
//! resistor and, optionally, the largest current you expect to measure. From this it picks the
//! gain of the shunt ADC, computes the current and power resolution and programs the calibration
//! register. With [`Gain::Auto`](configuration::Gain::Auto) the gain is raised whenever the device
//! reports that its current or power calculation overflowed.
//!
//! # Example
//! ```rust,no_run
//! # #[cfg(feature = "sync")]
//! # fn demo<I2C: embedded_hal::i2c::I2c>(i2c: I2C) -> Result<(), ()> {
//! use ina219_autocal::calibration::{MicroAmpere, Options, ShuntResistance};
//! use ina219_autocal::configuration::Settings;
//! use ina219_autocal::SyncIna219;
//!
//! let shunt = ShuntResistance::from_ohms(0.1).map_err(|_| ())?;
//! let options = Options::new(shunt).with_max_expected_current(MicroAmpere(200_000));
//!
//! let mut ina = SyncIna219::new(i2c, options);
//! ina.configure(Settings::default()).map_err(|_| ())?;
//!
//! if !ina.current_overflow().map_err(|_| ())? {
//!     let current = ina.current().map_err(|_| ())?;
//!     let _ma = current.milliamperes();
//! }
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

#[macro_use]
mod logger;

pub mod address;
pub mod calibration;
pub mod configuration;
pub mod errors;
pub mod measurements;
pub mod register;

#[cfg(feature = "async")]
mod r#async;

#[cfg(feature = "async")]
pub use r#async::INA219 as AsyncIna219;

#[cfg(feature = "sync")]
mod sync {
    include!(concat!(env!("OUT_DIR"), "/de-asynced.rs"));
}

#[cfg(feature = "sync")]
pub use sync::INA219 as SyncIna219;

#[cfg(all(test, feature = "sync"))]
mod tests;
