use crate::calibration::{Escalation, MicroAmpere, NanoAmpere, Options, ShuntResistance};
use crate::configuration::{Configuration, Gain, Settings, ShuntVoltageRange};
use crate::errors::{ConfigurationError, ConfigureError, MeasurementError, Overflow};
use crate::register::RegisterName;
use crate::SyncIna219;
use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

const DEV_ADDR: u8 = 0x40;

/// 0.1Ω shunt, auto gain picks 40mV for 0.2A: current LSB 13µA, calibration 31506
const CALIBRATION_40MV: u16 = 31_506;
/// 32V, 40mV, 12 bit, 12 bit, continuous shunt and bus
const CONFIG_40MV: u16 = 0x219F;

/// Create the expected `Transaction` for a register read
fn read_reg(reg: RegisterName, value: u16) -> Transaction {
    Transaction::write_read(DEV_ADDR, vec![reg as u8], value.to_be_bytes().to_vec())
}

/// Create the expected `Transaction` for a register write
fn write_reg(reg: RegisterName, value: u16) -> Transaction {
    let [hi, lo] = value.to_be_bytes();
    Transaction::write(DEV_ADDR, vec![reg as u8, hi, lo])
}

/// Calculate the value for the bus voltage register without the flags
const fn bus_voltage(milli_volts: u16) -> u16 {
    (milli_volts / 4) << 3
}

const CONVERSION_READY: u16 = 0b10;
const MATH_OVERFLOW: u16 = 0b01;

fn options() -> Options {
    Options::new(ShuntResistance::from_micro_ohms(100_000).unwrap())
        .with_max_expected_current(MicroAmpere(200_000))
}

/// All expected `Transaction`s of `configure()` ending with `config` being active
fn configure_transactions(calibration: u16, config: u16) -> Vec<Transaction> {
    let mut transactions = vec![
        write_reg(RegisterName::Calibration, calibration),
        write_reg(RegisterName::Configuration, config),
    ];
    if cfg!(feature = "paranoid") {
        transactions.push(read_reg(RegisterName::Configuration, config));
    }
    transactions
}

/// Create a driver configured with `settings` that will then react with the given transactions
fn mock_configured(
    options: Options,
    settings: Settings,
    setup: Vec<Transaction>,
    transactions: &[Transaction],
) -> SyncIna219<I2cMock> {
    let mut all_transactions = setup;
    all_transactions.extend_from_slice(transactions);

    let mut ina = SyncIna219::new(I2cMock::new(&all_transactions), options);
    ina.configure(settings).unwrap();
    ina
}

/// Auto gain, 0.1Ω, 0.2A
fn mock_auto(transactions: &[Transaction]) -> SyncIna219<I2cMock> {
    mock_configured(
        options(),
        Settings::default(),
        configure_transactions(CALIBRATION_40MV, CONFIG_40MV),
        transactions,
    )
}

/// Gain fixed to 40mV, 0.1Ω, 0.2A
fn mock_fixed(transactions: &[Transaction]) -> SyncIna219<I2cMock> {
    let settings = Settings {
        gain: Gain::Fixed(ShuntVoltageRange::Fsr40mv),
        ..Settings::default()
    };
    mock_configured(
        options(),
        settings,
        configure_transactions(CALIBRATION_40MV, CONFIG_40MV),
        transactions,
    )
}

#[test]
fn configure_programs_calibration_and_configuration() {
    let ina = mock_auto(&[]);

    let calibration = ina.calibration().unwrap();
    assert_eq!(calibration.shunt_voltage_range(), ShuntVoltageRange::Fsr40mv);
    assert_eq!(calibration.current_lsb(), NanoAmpere(13_000));
    assert_eq!(calibration.register_bits(), CALIBRATION_40MV);

    ina.destroy().done();
}

#[test]
fn invalid_options_do_not_touch_the_bus() {
    // 5A through 0.1Ω would need 500mV
    let options = options().with_max_expected_current(MicroAmpere(5_000_000));
    let mut ina = SyncIna219::new(I2cMock::new(&[]), options);

    match ina.configure(Settings::default()) {
        Err(ConfigureError::InvalidConfiguration(ConfigurationError::ExpectedCurrentOutOfRange {
            expected,
            max_possible,
        })) => {
            assert_eq!(expected, MicroAmpere(5_000_000));
            assert_eq!(max_possible, MicroAmpere(3_200_000));
        }
        other => panic!("Unexpected result: {other:?}"),
    }
    assert!(ina.calibration().is_none());

    ina.destroy().done();
}

#[cfg(feature = "paranoid")]
#[test]
fn configure_verifies_the_written_configuration() {
    let mut ina = SyncIna219::new(
        I2cMock::new(&[
            write_reg(RegisterName::Calibration, CALIBRATION_40MV),
            write_reg(RegisterName::Configuration, CONFIG_40MV),
            // The device did not take the configuration
            read_reg(RegisterName::Configuration, Configuration::POWER_ON_BITS),
        ]),
        options(),
    );

    match ina.configure(Settings::default()) {
        Err(ConfigureError::ConfigurationMismatch { read, written }) => {
            assert_eq!(read, Configuration::default());
            assert_eq!(written.as_bits(), CONFIG_40MV);
        }
        other => panic!("Unexpected result: {other:?}"),
    }

    // Nothing is known about the device, so no current can be computed
    assert!(matches!(ina.current(), Err(MeasurementError::NotCalibrated)));

    ina.destroy().done();
}

#[cfg(feature = "paranoid")]
#[test]
fn configuration_changes_are_noticed() {
    let mut ina = mock_auto(&[
        read_reg(RegisterName::Configuration, CONFIG_40MV),
        read_reg(RegisterName::Configuration, CONFIG_40MV & !0b111),
    ]);

    assert_eq!(ina.configuration().unwrap().as_bits(), CONFIG_40MV);
    assert!(ina.configuration().is_err());

    ina.destroy().done();
}

#[cfg(not(feature = "paranoid"))]
#[test]
fn configuration_changes_are_accepted() {
    let asleep = CONFIG_40MV & !0b111;
    let mut ina = mock_auto(&[
        read_reg(RegisterName::Configuration, asleep),
        read_reg(RegisterName::Configuration, CONFIG_40MV),
    ]);

    assert_eq!(ina.configuration().unwrap().as_bits(), asleep);
    assert_eq!(ina.configuration().unwrap().as_bits(), CONFIG_40MV);

    ina.destroy().done();
}

#[test]
fn conversion_ready_flag() {
    let mut ina = mock_auto(&[
        read_reg(RegisterName::BusVoltage, bus_voltage(12_000)),
        read_reg(RegisterName::BusVoltage, bus_voltage(12_000) | CONVERSION_READY),
        // An overflow does not hide a finished conversion
        read_reg(
            RegisterName::BusVoltage,
            bus_voltage(12_000) | CONVERSION_READY | MATH_OVERFLOW,
        ),
    ]);

    assert!(!ina.is_conversion_ready().unwrap());
    assert!(ina.is_conversion_ready().unwrap());
    assert!(ina.is_conversion_ready().unwrap());

    // Polling never touches the gain
    assert_eq!(
        ina.calibration().unwrap().shunt_voltage_range(),
        ShuntVoltageRange::Fsr40mv
    );

    ina.destroy().done();
}

#[test]
fn reads_scaled_current_and_power() {
    let mut ina = mock_auto(&[
        read_reg(RegisterName::BusVoltage, bus_voltage(12_000) | CONVERSION_READY),
        read_reg(RegisterName::Current, 1_000),
        read_reg(RegisterName::BusVoltage, bus_voltage(12_000) | CONVERSION_READY),
        read_reg(RegisterName::Power, 100),
    ]);

    // 1000 * 13µA
    let current = ina.current().unwrap();
    assert_eq!(current.nanoamperes(), 13_000_000);
    assert_eq!(current.microamperes(), 13_000);

    // 100 * 20 * 13µA * 1V
    let power = ina.power().unwrap();
    assert_eq!(power.nanowatts(), 26_000_000);

    ina.destroy().done();
}

#[test]
fn reads_voltages() {
    let mut ina = mock_auto(&[
        read_reg(RegisterName::BusVoltage, bus_voltage(12_000)),
        read_reg(RegisterName::BusVoltage, bus_voltage(12_000)),
        read_reg(RegisterName::ShuntVoltage, 2_000),
        read_reg(RegisterName::BusVoltage, bus_voltage(12_000)),
        read_reg(RegisterName::ShuntVoltage, 0xFFF6),
    ]);

    assert_eq!(ina.voltage().unwrap().voltage_mv(), 12_000);
    assert_eq!(ina.supply_voltage().unwrap().voltage_uv(), 12_020_000);
    assert_eq!(ina.shunt_voltage().unwrap().shunt_voltage_uv(), -100);

    ina.destroy().done();
}

#[test]
fn reads_all_measurements() {
    let mut ina = mock_auto(&[
        read_reg(RegisterName::BusVoltage, bus_voltage(5_000) | CONVERSION_READY),
        read_reg(RegisterName::ShuntVoltage, 1_300),
        read_reg(RegisterName::Current, 10_000),
        read_reg(RegisterName::Power, 2_500),
    ]);

    let m = ina.measurements().unwrap();
    assert_eq!(m.bus_voltage.voltage_mv(), 5_000);
    assert!(m.bus_voltage.is_conversion_ready());
    assert_eq!(m.shunt_voltage.shunt_voltage_mv(), 13);
    assert_eq!(m.current.microamperes(), 130_000);
    assert_eq!(m.power.microwatts(), 650_000);
    assert_eq!(m.supply_voltage().voltage_uv(), 5_013_000);

    ina.destroy().done();
}

#[test]
fn overflow_is_reported_by_every_checked_reading() {
    let overflowed = bus_voltage(12_000) | CONVERSION_READY | MATH_OVERFLOW;
    let mut ina = mock_fixed(&[
        read_reg(RegisterName::BusVoltage, overflowed),
        read_reg(RegisterName::BusVoltage, overflowed),
        read_reg(RegisterName::BusVoltage, overflowed),
        read_reg(RegisterName::BusVoltage, overflowed),
        read_reg(RegisterName::BusVoltage, overflowed),
        read_reg(RegisterName::BusVoltage, overflowed),
    ]);

    let expected = Overflow {
        shunt_voltage_range: Some(ShuntVoltageRange::Fsr40mv),
        escalation: Escalation::Disabled,
    };

    assert!(matches!(ina.current(), Err(MeasurementError::Overflow(o)) if o == expected));
    assert!(matches!(ina.power(), Err(MeasurementError::Overflow(o)) if o == expected));
    assert!(matches!(ina.shunt_voltage(), Err(MeasurementError::Overflow(o)) if o == expected));
    assert!(matches!(ina.supply_voltage(), Err(MeasurementError::Overflow(o)) if o == expected));

    // The bus voltage itself is unaffected, and the flag can be polled
    assert_eq!(ina.voltage().unwrap().voltage_mv(), 12_000);
    assert!(ina.current_overflow().unwrap());

    // A fixed gain is never changed
    assert_eq!(
        ina.calibration().unwrap().shunt_voltage_range(),
        ShuntVoltageRange::Fsr40mv
    );

    ina.destroy().done();
}

#[test]
fn auto_gain_escalates_after_overflow() {
    let mut ina = mock_auto(&[
        read_reg(
            RegisterName::BusVoltage,
            bus_voltage(12_000) | CONVERSION_READY | MATH_OVERFLOW,
        ),
        // Recalibrated for the full 0.8A of the 80mV range: 25µA LSB
        write_reg(RegisterName::Calibration, 16_384),
        write_reg(RegisterName::Configuration, 0x299F),
        // The next reading uses the new calibration
        read_reg(RegisterName::BusVoltage, bus_voltage(12_000) | CONVERSION_READY),
        read_reg(RegisterName::Current, 1_000),
    ]);

    match ina.current() {
        Err(MeasurementError::Overflow(Overflow {
            shunt_voltage_range,
            escalation: Escalation::Escalated(next),
        })) => {
            assert_eq!(shunt_voltage_range, Some(ShuntVoltageRange::Fsr40mv));
            assert_eq!(
                next.calibration().shunt_voltage_range(),
                ShuntVoltageRange::Fsr80mv
            );
        }
        other => panic!("Unexpected result: {other:?}"),
    }

    assert_eq!(ina.calibration().unwrap().current_lsb(), NanoAmpere(25_000));
    assert_eq!(ina.current().unwrap().nanoamperes(), 25_000_000);

    ina.destroy().done();
}

#[test]
fn auto_gain_stops_at_the_largest_range() {
    // Without an expected current auto gain starts at 320mV: 3.2A / 32767 -> 98µA LSB
    let options = Options::new(ShuntResistance::from_micro_ohms(100_000).unwrap());
    let mut ina = mock_configured(
        options,
        Settings::default(),
        configure_transactions(4_178, Configuration::POWER_ON_BITS),
        &[read_reg(
            RegisterName::BusVoltage,
            bus_voltage(12_000) | MATH_OVERFLOW,
        )],
    );

    let expected = Overflow {
        shunt_voltage_range: Some(ShuntVoltageRange::Fsr320mv),
        escalation: Escalation::AtLimit,
    };
    assert!(matches!(ina.power(), Err(MeasurementError::Overflow(o)) if o == expected));

    ina.destroy().done();
}

#[test]
fn sleep_and_wake_restore_the_configuration() {
    let asleep = CONFIG_40MV & !0b111;
    let mut ina = mock_auto(&[
        read_reg(RegisterName::Configuration, CONFIG_40MV),
        write_reg(RegisterName::Configuration, asleep),
        read_reg(RegisterName::Configuration, asleep),
        write_reg(RegisterName::Configuration, CONFIG_40MV),
    ]);

    ina.sleep().unwrap();
    ina.wake().unwrap();

    ina.destroy().done();
}

#[test]
fn sleep_and_wake_pass_bus_errors_through() {
    let asleep = CONFIG_40MV & !0b111;
    let mut ina = mock_auto(&[
        // Reading the configuration fails, nothing is written
        read_reg(RegisterName::Configuration, 0).with_error(ErrorKind::Other),
        // Writing the configuration fails
        read_reg(RegisterName::Configuration, CONFIG_40MV),
        write_reg(RegisterName::Configuration, asleep).with_error(ErrorKind::Other),
        read_reg(RegisterName::Configuration, asleep),
        write_reg(RegisterName::Configuration, CONFIG_40MV).with_error(ErrorKind::Other),
    ]);

    assert_eq!(ina.sleep(), Err(ErrorKind::Other));
    assert_eq!(ina.sleep(), Err(ErrorKind::Other));
    assert_eq!(ina.wake(), Err(ErrorKind::Other));

    // The calibration survives failed mode changes
    assert!(ina.calibration().is_some());

    ina.destroy().done();
}

#[test]
fn reset_forgets_the_calibration() {
    let mut ina = mock_auto(&[write_reg(RegisterName::Configuration, 0xB99F)]);

    ina.reset().unwrap();

    assert!(ina.calibration().is_none());
    assert!(matches!(ina.current(), Err(MeasurementError::NotCalibrated)));
    assert!(matches!(ina.measurements(), Err(MeasurementError::NotCalibrated)));

    ina.destroy().done();
}

#[test]
fn voltages_need_no_calibration() {
    let mut ina = SyncIna219::new(
        I2cMock::new(&[
            read_reg(RegisterName::BusVoltage, bus_voltage(3_300)),
            read_reg(RegisterName::ShuntVoltage, 100),
            read_reg(RegisterName::BusVoltage, bus_voltage(3_300) | MATH_OVERFLOW),
        ]),
        options(),
    );

    assert_eq!(ina.shunt_voltage().unwrap().shunt_voltage_mv(), 1);
    assert!(matches!(ina.power(), Err(MeasurementError::NotCalibrated)));

    // Without a known configuration the overflow can only be reported
    let expected = Overflow {
        shunt_voltage_range: None,
        escalation: Escalation::Disabled,
    };
    assert!(matches!(ina.shunt_voltage(), Err(MeasurementError::Overflow(o)) if o == expected));

    ina.destroy().done();
}

#[test]
fn bus_errors_are_passed_through() {
    let mut ina = mock_auto(&[
        read_reg(RegisterName::BusVoltage, 0).with_error(ErrorKind::Other),
        read_reg(RegisterName::Current, 0).with_error(ErrorKind::Other),
    ]);

    assert!(matches!(
        ina.current(),
        Err(MeasurementError::I2cError(ErrorKind::Other))
    ));
    assert_eq!(ina.read_raw(RegisterName::Current), Err(ErrorKind::Other));

    ina.destroy().done();
}
