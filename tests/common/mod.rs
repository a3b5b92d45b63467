//! Demonstration binding tables for two Lake Shore temperature instruments.
//!
//! The library ships no instrument command sets; these tables exist so the
//! integration tests drive realistic declarations.
#![allow(dead_code)]

use daq_bindings::adapters::MockAdapter;
use daq_bindings::binding::{BindingTable, Command, Feature};
use daq_bindings::processing::Processor;
use daq_bindings::validation::Rule;
use daq_bindings::{DefinitionError, Driver, MockHandle};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

pub const INPUT_NAMES: [&str; 8] = [
    "input 1", "input 2", "input 3", "input 4", "input 5", "input 6", "input 7", "input 8",
];

pub static LS218: LazyLock<Arc<BindingTable>> =
    LazyLock::new(|| Arc::new(ls218_table().expect("LS218 table is well formed")));

pub static LS350: LazyLock<Arc<BindingTable>> =
    LazyLock::new(|| Arc::new(ls350_table().expect("LS350 table is well formed")));

fn ls218_reading(name: &str, mnemonic: &str) -> Result<Command, DefinitionError> {
    Command::query(name)
        .params(["input"])
        .validate("input", [Rule::IsInteger, Rule::range(1.0, 8.0)])
        .process(Processor::ToReal)
        .template(format!("{mnemonic}? {{input}}"))
        .build()
}

fn ls218_reading_all(name: &str, mnemonic: &str) -> Result<Command, DefinitionError> {
    Command::query(name)
        .process(Processor::record(INPUT_NAMES))
        .template(format!("{mnemonic}? 0"))
        .build()
}

/// Eight-input temperature monitor.
pub fn ls218_table() -> Result<BindingTable, DefinitionError> {
    BindingTable::new("LS218")
        .with(
            Command::write("set_baud_rate")
                .params(["bps"])
                .validate("bps", Rule::one_of([0, 1, 2]))
                .template("BAUD {bps}")
                .build()?,
        )?
        .with(
            Command::query("get_baud_rate")
                .process(Processor::ToInteger)
                .template("BAUD?")
                .build()?,
        )?
        .with(ls218_reading("get_celsius_reading", "CRDG")?)?
        .with(ls218_reading("get_kelvin_reading", "KRDG")?)?
        .with(ls218_reading("get_sensor_reading", "SRDG")?)?
        .with(ls218_reading_all("get_celsius_reading_all", "CRDG")?)?
        .with(ls218_reading_all("get_kelvin_reading_all", "KRDG")?)?
        .with(ls218_reading_all("get_sensor_reading_all", "SRDG")?)?
        .unsupported("set_pid", "LS218 is a monitor without control loops")
}

fn output_rules() -> [Rule; 2] {
    [Rule::IsInteger, Rule::one_of([1, 2, 3, 4])]
}

/// Temperature controller with four outputs.
pub fn ls350_table() -> Result<BindingTable, DefinitionError> {
    let mut table = BindingTable::new("LS350")
        .with(
            Feature::new("brightness")
                .get_template("BRIGT?")
                .process(Processor::ToInteger)
                .validate_set([Rule::IsInteger, Rule::range(1.0, 32.0)]),
        )?
        .with(
            Command::query("get_kelvin_reading")
                .params(["input"])
                .validate("input", Rule::one_of(["A", "B", "C", "D"]))
                .process(Processor::ToReal)
                .template("KRDG? {input}")
                .build()?,
        )?
        .with(
            Command::query("get_curve_header")
                .params(["curve"])
                .validate("curve", [Rule::IsInteger, Rule::range(1.0, 59.0)])
                .process(
                    Processor::record(["name", "SN", "format", "limit value", "coefficient"])
                        .optional_fields([
                            None,
                            None,
                            Some(Processor::ToInteger),
                            Some(Processor::ToReal),
                            Some(Processor::ToInteger),
                        ]),
                )
                .template("CRVHDR? {curve}")
                .build()?,
        )?
        .with(
            Command::query("get_curve_data_point")
                .params(["curve", "index"])
                .validate("curve", [Rule::IsInteger, Rule::range(1.0, 59.0)])
                .validate("index", [Rule::IsInteger, Rule::range(1.0, 200.0)])
                .process(
                    Processor::record(["units value", "temp value"])
                        .fields([Processor::ToReal, Processor::ToReal]),
                )
                .template("CRVPT? {curve},{index}")
                .build()?,
        )?
        .with(
            Command::query("get_pid")
                .params(["output"])
                .validate("output", output_rules())
                .process(
                    Processor::record(["P", "I", "D"]).fields([
                        Processor::ToReal,
                        Processor::ToReal,
                        Processor::ToReal,
                    ]),
                )
                .template("PID? {output}")
                .build()?,
        )?
        .with(
            Command::write("set_pid")
                .params(["output", "p", "i", "d"])
                .validate("output", output_rules())
                .validate("p", [Rule::IsReal, Rule::range(0.0, 9999.9)])
                .validate("i", [Rule::IsReal, Rule::range(0.0, 9999.9)])
                .validate("d", [Rule::IsReal, Rule::range(0.0, 200.0)])
                .sends(|t, args| {
                    t.send(&format!("PID {},{},{},{}", args[0], args[1], args[2], args[3]))
                })
                .build()?,
        )?
        .with(
            Command::query("get_ramp_parameters")
                .params(["output"])
                .validate("output", output_rules())
                .process(
                    Processor::record(["on/off", "rate value"])
                        .fields([Processor::ToInteger, Processor::ToReal]),
                )
                .template("RAMP? {output}")
                .build()?,
        )?
        .with(
            Command::query("get_heater_range")
                .params(["output"])
                .validate("output", output_rules())
                .process(Processor::ToInteger)
                .template("RANGE? {output}")
                .build()?,
        )?
        .with(
            Command::write("set_heater_range")
                .params(["output", "range"])
                .validate("output", output_rules())
                .validate("range", [Rule::IsInteger, Rule::range(1.0, 5.0)])
                .template("RANGE {output},{range}")
                .build()?,
        )?
        .with(
            Command::query("get_setpoint")
                .params(["output"])
                .validate("output", output_rules())
                .process(Processor::ToReal)
                .template("SETP? {output}")
                .build()?,
        )?
        .with(
            Command::write("set_setpoint")
                .params(["output", "value"])
                .validate("output", output_rules())
                .validate("value", Rule::IsReal)
                .template("SETP {output},{value}")
                .build()?,
        )?;

    // The setter joins the getter-only feature after declaration.
    if let Some(brightness) = table.feature_mut("brightness") {
        brightness.attach_set_template("BRIGT {value}")?;
    }
    Ok(table)
}

pub fn ls218_driver() -> (Driver<MockAdapter>, MockHandle) {
    let (mock, handle) = MockAdapter::pair();
    (Driver::with_settle_delay(mock, Arc::clone(&LS218), Duration::ZERO), handle)
}

pub fn ls350_driver() -> (Driver<MockAdapter>, MockHandle) {
    let (mock, handle) = MockAdapter::pair();
    (Driver::with_settle_delay(mock, Arc::clone(&LS350), Duration::ZERO), handle)
}
