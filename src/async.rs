use crate::calibration::{Calibration, Calibrator, Escalation, Options};
use crate::configuration::{Configuration, Reset, Settings};
use crate::errors::{ConfigurationReadError, ConfigureError, MeasurementError, Overflow};
use crate::measurements::{
    BusVoltage, Current, CurrentRegister, Measurements, Power, PowerRegister, ShuntVoltage,
    SupplyVoltage,
};
use crate::register::{ReadRegister, RegisterName, WriteRegister};
use embedded_hal_async::i2c::I2c;

/// Embedded HAL compatible driver for the INA219
///
/// The driver does not touch the device until [`Self::configure`] is called.
pub struct INA219<I2C> {
    i2c: I2C,
    options: Options,
    /// Last configuration written to or read from the device
    config: Option<Configuration>,
    calibrator: Option<Calibrator>,
}

impl<I2C> INA219<I2C>
where
    I2C: I2c,
{
    /// Create a driver for the device described by `options`
    ///
    /// Nothing is sent on the bus, current and power can only be read after [`Self::configure`].
    pub const fn new(i2c: I2C, options: Options) -> Self {
        INA219 {
            i2c,
            options,
            config: None,
            calibrator: None,
        }
    }

    /// Destroy the driver returning the underlying I2C device
    ///
    /// This does leave the device in it's current state.
    pub fn destroy(self) -> I2C {
        self.i2c
    }

    /// The options this driver was created with
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// The active calibration, `None` before [`Self::configure`] or after [`Self::reset`]
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibrator.as_ref().map(Calibrator::calibration)
    }

    /// Calibrate the device and start continuous conversions
    ///
    /// The calibration is derived from the shunt and expected current in the [`Options`] and the
    /// gain in `settings`. It is written first, followed by the configuration.
    ///
    /// # Errors
    /// Returns [`ConfigureError::InvalidConfiguration`] without touching the device if no
    /// calibration can be derived, and the I2C error if a transfer fails.
    ///
    /// *With feature `paranoid`*:
    ///
    /// The configuration is read back and a mismatch is reported.
    pub async fn configure(&mut self, settings: Settings) -> Result<(), ConfigureError<I2C::Error>> {
        let calibrator = Calibrator::new(
            self.options.shunt,
            self.options.max_expected_current,
            settings.gain,
        )
        .map_err(ConfigureError::InvalidConfiguration)?;
        let calibration = *calibrator.calibration();
        let conf = settings.configuration(calibration.shunt_voltage_range());

        // Until both registers are written the device state is unknown
        self.calibrator = None;
        self.config = None;

        self.write(calibration.register()).await?;
        self.write(conf).await?;

        #[cfg(feature = "paranoid")]
        {
            let read = self.read::<Configuration>().await?;
            if read != conf {
                return Err(ConfigureError::ConfigurationMismatch {
                    read,
                    written: conf,
                });
            }
        }

        debug!(
            "configured {}mV range, current lsb {}nA, auto gain {}",
            calibration.shunt_voltage_range().max_mv(),
            calibration.current_lsb().0,
            calibrator.is_auto_gain()
        );

        self.config = Some(conf);
        self.calibrator = Some(calibrator);
        Ok(())
    }

    /// Read the current [`Configuration`]
    ///
    /// # Errors
    /// Returns Err() when the underlying I2C device returns an error.
    ///
    /// *With feature `paranoid`*:
    ///
    /// If the read configuration does not match the last saved configuration an error is returned
    /// and the saved configuration is updated to the read configuration.
    pub async fn configuration(
        &mut self,
    ) -> Result<Configuration, ConfigurationReadError<I2C::Error>> {
        let read = self.read::<Configuration>().await?;
        let saved = self.config.replace(read);

        #[cfg(feature = "paranoid")]
        {
            if let Some(saved) = saved.filter(|&saved| saved != read) {
                return Err(ConfigurationReadError::ConfigurationMismatch { read, saved });
            }
        }
        #[cfg(not(feature = "paranoid"))]
        let _ = saved;

        Ok(read)
    }

    /// Read the bus voltage
    ///
    /// The overflow flag only concerns current and power, so this never fails because of it.
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error.
    pub async fn voltage(&mut self) -> Result<BusVoltage, I2C::Error> {
        self.read().await
    }

    /// Check whether the last current or power calculation overflowed
    ///
    /// This is the polling alternative to handling [`MeasurementError::Overflow`]. It never
    /// changes the gain.
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error.
    pub async fn current_overflow(&mut self) -> Result<bool, I2C::Error> {
        let bus = self.read::<BusVoltage>().await?;
        Ok(bus.has_math_overflowed())
    }

    /// Check whether a conversion finished since the flag was last cleared
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error.
    pub async fn is_conversion_ready(&mut self) -> Result<bool, I2C::Error> {
        let bus = self.read::<BusVoltage>().await?;
        Ok(bus.is_conversion_ready())
    }

    /// Read the shunt voltage
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error or the device reports an
    /// overflow.
    pub async fn shunt_voltage(&mut self) -> Result<ShuntVoltage, MeasurementError<I2C::Error>> {
        self.checked_bus_voltage().await?;
        Ok(self.read::<ShuntVoltage>().await?)
    }

    /// Read the voltage on the supply side of the shunt
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error or the device reports an
    /// overflow.
    pub async fn supply_voltage(
        &mut self,
    ) -> Result<SupplyVoltage, MeasurementError<I2C::Error>> {
        let bus = self.checked_bus_voltage().await?;
        let shunt = self.read::<ShuntVoltage>().await?;
        Ok(SupplyVoltage::new(bus, shunt))
    }

    /// Read the current through the shunt
    ///
    /// # Errors
    /// Returns an error if the device is not calibrated, the underlying I2C device returns an
    /// error or the device reports an overflow.
    pub async fn current(&mut self) -> Result<Current, MeasurementError<I2C::Error>> {
        let calibration = self.active_calibration()?;
        self.checked_bus_voltage().await?;
        let reg = self.read::<CurrentRegister>().await?;
        Ok(Current::from_register(reg, calibration.current_lsb()))
    }

    /// Read the power delivered to the load
    ///
    /// # Errors
    /// Returns an error if the device is not calibrated, the underlying I2C device returns an
    /// error or the device reports an overflow.
    pub async fn power(&mut self) -> Result<Power, MeasurementError<I2C::Error>> {
        let calibration = self.active_calibration()?;
        self.checked_bus_voltage().await?;
        let reg = self.read::<PowerRegister>().await?;
        Ok(Power::from_register(reg, calibration.power_lsb()))
    }

    /// Read bus voltage, shunt voltage, current and power
    ///
    /// The registers are read one after another, they are not guaranteed to belong to the same
    /// conversion.
    ///
    /// # Errors
    /// Returns an error if the device is not calibrated, the underlying I2C device returns an
    /// error or the device reports an overflow.
    pub async fn measurements(&mut self) -> Result<Measurements, MeasurementError<I2C::Error>> {
        let calibration = self.active_calibration()?;
        let bus_voltage = self.checked_bus_voltage().await?;
        let shunt_voltage = self.read::<ShuntVoltage>().await?;
        let current = self.read::<CurrentRegister>().await?;
        let power = self.read::<PowerRegister>().await?;

        Ok(Measurements {
            bus_voltage,
            shunt_voltage,
            current: Current::from_register(current, calibration.current_lsb()),
            power: Power::from_register(power, calibration.power_lsb()),
        })
    }

    /// Power the device down, keeping the rest of the configuration
    ///
    /// The written configuration is not read back, also not with feature `paranoid`.
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error.
    pub async fn sleep(&mut self) -> Result<(), I2C::Error> {
        let conf = self.read::<Configuration>().await?.asleep();
        self.write(conf).await?;
        self.config = Some(conf);
        Ok(())
    }

    /// Resume continuous conversions of shunt and bus voltage
    ///
    /// The device needs 40µs to recover from power down.
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error.
    pub async fn wake(&mut self) -> Result<(), I2C::Error> {
        let conf = self.read::<Configuration>().await?.awake();
        self.write(conf).await?;
        self.config = Some(conf);
        Ok(())
    }

    /// Reset every register of the device to its power-on value
    ///
    /// The calibration is forgotten, [`Self::configure`] has to be called again before current
    /// or power can be read.
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error.
    pub async fn reset(&mut self) -> Result<(), I2C::Error> {
        self.calibrator = None;
        self.config = None;

        debug!("resetting device at {}", self.options.address.as_byte());
        self.write(Configuration {
            reset: Reset::Reset,
            ..Configuration::default()
        })
        .await
    }

    /// Read the raw contents of any register
    ///
    /// # Errors
    /// Returns an error if the underlying I2C device returns an error.
    pub async fn read_raw(&mut self, register: RegisterName) -> Result<u16, I2C::Error> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.options.address.as_byte(), &[register.address()], &mut buf)
            .await?;

        let bits = u16::from_be_bytes(buf);
        trace!("read {:?} = {}", register, bits);
        Ok(bits)
    }

    fn active_calibration(&self) -> Result<Calibration, MeasurementError<I2C::Error>> {
        self.calibrator
            .map(|calibrator| *calibrator.calibration())
            .ok_or(MeasurementError::NotCalibrated)
    }

    /// Read the bus voltage and turn a set overflow flag into an error
    async fn checked_bus_voltage(&mut self) -> Result<BusVoltage, MeasurementError<I2C::Error>> {
        let bus = self.read::<BusVoltage>().await?;
        if bus.has_math_overflowed() {
            let overflow = self.handle_overflow().await?;
            return Err(MeasurementError::Overflow(overflow));
        }

        Ok(bus)
    }

    /// Apply the gain escalation for an overflow
    ///
    /// The conversion that overflowed is not repeated, only later conversions use the new gain.
    async fn handle_overflow(&mut self) -> Result<Overflow, I2C::Error> {
        let shunt_voltage_range = self.config.map(|conf| conf.shunt_voltage_range);
        let escalation = self
            .calibrator
            .map_or(Escalation::Disabled, |calibrator| calibrator.on_overflow());

        match escalation {
            Escalation::Escalated(next) => {
                let range = next.calibration().shunt_voltage_range();
                let conf = match self.config {
                    Some(conf) => conf,
                    None => self.read::<Configuration>().await?,
                }
                .with_shunt_voltage_range(range);

                self.write(next.calibration().register()).await?;
                // The device holds the new calibration but still the old gain
                self.calibrator = None;
                self.write(conf).await?;

                self.config = Some(conf);
                self.calibrator = Some(next);
                warn!("current overflow, gain raised to {}mV", range.max_mv());
            }
            Escalation::AtLimit => warn!("current overflow at the largest gain"),
            Escalation::Disabled => warn!("current overflow"),
        }

        Ok(Overflow {
            shunt_voltage_range,
            escalation,
        })
    }

    async fn read<Reg: ReadRegister>(&mut self) -> Result<Reg, I2C::Error> {
        let bits = self.read_raw(Reg::NAME).await?;
        Ok(Reg::from_bits(bits))
    }

    /// Write the value contained in the register to the address dictated by its type
    async fn write<Reg: WriteRegister>(&mut self, reg: Reg) -> Result<(), I2C::Error> {
        let bits = reg.as_bits();
        trace!("write {:?} = {}", Reg::NAME, bits);

        let [hi, lo] = bits.to_be_bytes();
        self.i2c
            .write(self.options.address.as_byte(), &[Reg::ADDRESS, hi, lo])
            .await
    }
}
