//! Instrument driver: one transport plus a shared binding table.
//!
//! # Example Usage
//!
//! ```
//! use std::sync::{Arc, LazyLock};
//! use std::time::Duration;
//! use daq_bindings::adapters::MockAdapter;
//! use daq_bindings::binding::{BindingTable, Command};
//! use daq_bindings::processing::Processor;
//! use daq_bindings::validation::Rule;
//! use daq_bindings::{Driver, Value};
//!
//! static LS218: LazyLock<Arc<BindingTable>> = LazyLock::new(|| {
//!     let table = BindingTable::new("LS218").with(
//!         Command::query("get_kelvin")
//!             .params(["input"])
//!             .validate("input", [Rule::IsInteger, Rule::range(0.0, 8.0)])
//!             .process(Processor::ToReal)
//!             .template("KRDG? {input}")
//!             .build()
//!             .expect("valid declaration"),
//!     );
//!     Arc::new(table.expect("unique names"))
//! });
//!
//! # fn main() -> daq_bindings::Result<()> {
//! let (mock, handle) = MockAdapter::pair();
//! handle.reply("KRDG? 1", "+077.35");
//!
//! let mut driver = Driver::with_settle_delay(mock, Arc::clone(&LS218), Duration::ZERO);
//! assert_eq!(driver.query("get_kelvin", &[1.into()])?, Value::Real(77.35));
//! # Ok(())
//! # }
//! ```

use crate::adapters::{Paced, Transport};
use crate::binding::{Binding, BindingTable, CommandKind};
use crate::config::{DriverConfig, TransportConfig};
use crate::error::{BindingError, Result};
use crate::value::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Identification query understood by IEEE-488.2 instruments.
pub const IDN_QUERY: &str = "*IDN?";

/// Drives one instrument through its binding table.
///
/// Every operation takes `&mut self`, so at most one command is in flight
/// per driver.
pub struct Driver<T: Transport> {
    name: String,
    transport: Paced<T>,
    table: Arc<BindingTable>,
}

impl<T: Transport> Driver<T> {
    /// Create a driver named after the table's model, with the default
    /// settle delay.
    pub fn new(transport: T, table: Arc<BindingTable>) -> Self {
        Self::with_settle_delay(transport, table, TransportConfig::default().settle_delay)
    }

    /// Create a driver with an explicit settle delay.
    pub fn with_settle_delay(transport: T, table: Arc<BindingTable>, settle: Duration) -> Self {
        Self {
            name: table.model().to_string(),
            transport: Paced::new(transport, settle),
            table,
        }
    }

    /// Create a driver using the configured name and settle delay.
    pub fn from_config(transport: T, table: Arc<BindingTable>, config: &DriverConfig) -> Self {
        Self {
            name: config.name.clone(),
            transport: Paced::new(transport, config.transport.settle_delay),
            table,
        }
    }

    /// Instance name used in log spans.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binding table shared by drivers of this type.
    pub fn bindings(&self) -> &BindingTable {
        &self.table
    }

    /// Settle delay enforced between operations.
    pub fn settle_delay(&self) -> Duration {
        self.transport.settle_delay()
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        self.transport.get_ref()
    }

    /// Tear down the driver and return its transport.
    pub fn into_transport(self) -> T {
        self.transport.into_inner()
    }

    /// Invoke a command binding of either kind.
    ///
    /// Returns `None` for write commands and the processed reply for queries.
    #[instrument(level = "debug", skip(self, args), fields(instrument = %self.name))]
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        let table = Arc::clone(&self.table);
        match resolve(&table, name)? {
            Binding::Command(command) => command.invoke(&mut self.transport, args),
            other => Err(kind_mismatch(name, other, "command")),
        }
    }

    /// Invoke a query command and return its processed reply.
    #[instrument(level = "debug", skip(self, args), fields(instrument = %self.name))]
    pub fn query(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let table = Arc::clone(&self.table);
        match resolve(&table, name)? {
            Binding::Command(command) if command.kind() == CommandKind::Query => command
                .invoke(&mut self.transport, args)?
                .ok_or_else(|| BindingError::KindMismatch {
                    name: name.to_string(),
                    actual: "write command",
                    requested: "query command",
                }),
            other => Err(kind_mismatch(name, other, "query command")),
        }
    }

    /// Invoke a write command.
    #[instrument(level = "debug", skip(self, args), fields(instrument = %self.name))]
    pub fn write(&mut self, name: &str, args: &[Value]) -> Result<()> {
        let table = Arc::clone(&self.table);
        match resolve(&table, name)? {
            Binding::Command(command) if command.kind() == CommandKind::Write => {
                command.invoke(&mut self.transport, args).map(|_| ())
            }
            other => Err(kind_mismatch(name, other, "write command")),
        }
    }

    /// Read a feature.
    #[instrument(level = "debug", skip(self), fields(instrument = %self.name))]
    pub fn get(&mut self, feature: &str) -> Result<Value> {
        let table = Arc::clone(&self.table);
        match resolve(&table, feature)? {
            Binding::Feature(f) => f.read(&mut self.transport),
            other => Err(kind_mismatch(feature, other, "feature")),
        }
    }

    /// Write a feature.
    #[instrument(level = "debug", skip(self, value), fields(instrument = %self.name))]
    pub fn set(&mut self, feature: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let table = Arc::clone(&self.table);
        match resolve(&table, feature)? {
            Binding::Feature(f) => f.write(&mut self.transport, &value),
            other => Err(kind_mismatch(feature, other, "feature")),
        }
    }

    /// Query `*IDN?` and return the reply unprocessed.
    #[instrument(level = "debug", skip(self), fields(instrument = %self.name))]
    pub fn identification(&mut self) -> Result<String> {
        Ok(self.transport.query(IDN_QUERY)?)
    }

    /// Send a raw command, bypassing the binding table.
    pub fn send(&mut self, command: &str) -> Result<()> {
        Ok(self.transport.send(command)?)
    }

    /// Send a raw query, bypassing the binding table.
    pub fn query_raw(&mut self, command: &str) -> Result<String> {
        Ok(self.transport.query(command)?)
    }
}

/// Resolve a binding by name; unsupported commands fail here, before any I/O.
fn resolve<'t>(table: &'t BindingTable, name: &str) -> Result<&'t Binding> {
    let binding = table
        .get(name)
        .ok_or_else(|| BindingError::UnknownBinding {
            model: table.model().to_string(),
            name: name.to_string(),
        })?;
    if let Binding::Unsupported { reason, .. } = binding {
        debug!(binding = name, "unsupported command invoked");
        return Err(BindingError::Unsupported {
            model: table.model().to_string(),
            command: name.to_string(),
            reason: reason.clone(),
        });
    }
    Ok(binding)
}

fn kind_mismatch(name: &str, actual: &Binding, requested: &'static str) -> BindingError {
    BindingError::KindMismatch {
        name: name.to_string(),
        actual: actual.kind_name(),
        requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockAdapter, MockHandle};
    use crate::binding::{Command, Feature};
    use crate::processing::Processor;
    use crate::validation::Rule;

    fn table() -> Arc<BindingTable> {
        let table = BindingTable::new("LS350")
            .with(
                Command::write("set_setpoint")
                    .params(["output", "value"])
                    .validate("output", [Rule::IsInteger, Rule::one_of([1, 2, 3, 4])])
                    .template("SETP {output},{value}")
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .with(
                Command::query("get_setpoint")
                    .params(["output"])
                    .validate("output", [Rule::IsInteger, Rule::one_of([1, 2, 3, 4])])
                    .process(Processor::ToReal)
                    .template("SETP? {output}")
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .with(
                Feature::new("brightness")
                    .get_template("BRIGT?")
                    .process(Processor::ToInteger)
                    .validate_set([Rule::IsInteger, Rule::range(1.0, 32.0)])
                    .set_template("BRIGT {value}"),
            )
            .unwrap()
            .unsupported("set_display_field", "front panel not modelled")
            .unwrap();
        Arc::new(table)
    }

    fn driver() -> (Driver<MockAdapter>, MockHandle) {
        let (mock, handle) = MockAdapter::pair();
        (Driver::with_settle_delay(mock, table(), Duration::ZERO), handle)
    }

    #[test]
    fn name_defaults_to_model() {
        let (driver, _) = driver();
        assert_eq!(driver.name(), "LS350");
        assert_eq!(driver.bindings().len(), 4);
    }

    #[test]
    fn write_then_query() {
        let (mut driver, handle) = driver();
        handle.reply("SETP? 1", "+295.000");
        driver.write("set_setpoint", &[1.into(), 295.0.into()]).unwrap();
        let value = driver.query("get_setpoint", &[1.into()]).unwrap();
        assert_eq!(value, Value::Real(295.0));
        assert_eq!(handle.commands(), vec!["SETP 1,295", "SETP? 1"]);
    }

    #[test]
    fn call_returns_none_for_writes() {
        let (mut driver, _) = driver();
        let result = driver.call("set_setpoint", &[2.into(), 10.into()]).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn unknown_and_unsupported_fail_before_io() {
        let (mut driver, handle) = driver();
        let err = driver.call("get_pid", &[]).unwrap_err();
        assert!(matches!(err, BindingError::UnknownBinding { .. }));

        let err = driver.call("set_display_field", &[]).unwrap_err();
        assert!(matches!(err, BindingError::Unsupported { ref model, .. } if model == "LS350"));
        assert_eq!(handle.call_count(), 0);
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let (mut driver, handle) = driver();
        let err = driver.get("get_setpoint").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'get_setpoint' is a query command, not a feature"
        );
        let err = driver.write("get_setpoint", &[1.into()]).unwrap_err();
        assert!(matches!(err, BindingError::KindMismatch { requested: "write command", .. }));
        let err = driver.call("brightness", &[]).unwrap_err();
        assert!(matches!(err, BindingError::KindMismatch { actual: "feature", .. }));
        assert_eq!(handle.call_count(), 0);
    }

    #[test]
    fn feature_get_and_set() {
        let (mut driver, handle) = driver();
        handle.reply("BRIGT?", "28");
        driver.set("brightness", 28).unwrap();
        assert_eq!(driver.get("brightness").unwrap(), Value::Int(28));
        assert!(driver.set("brightness", 33).is_err());
        assert_eq!(handle.commands(), vec!["BRIGT 28", "BRIGT?"]);
    }

    #[test]
    fn identification_and_raw_passthrough() {
        let (mut driver, handle) = driver();
        handle.reply(IDN_QUERY, "LSCI,MODEL350,1234567,1.5");
        handle.reply("HTR? 1", "+045.2");
        assert_eq!(driver.identification().unwrap(), "LSCI,MODEL350,1234567,1.5");
        assert_eq!(driver.query_raw("HTR? 1").unwrap(), "+045.2");
        driver.send("*CLS").unwrap();
        assert_eq!(handle.commands(), vec!["*IDN?", "HTR? 1", "*CLS"]);
    }

    #[test]
    fn from_config_uses_configured_name_and_delay() {
        let mut config = DriverConfig::default();
        config.name = "cryostat-a".into();
        config.transport.settle_delay = Duration::from_millis(5);
        let driver = Driver::from_config(MockAdapter::new(), table(), &config);
        assert_eq!(driver.name(), "cryostat-a");
        assert_eq!(driver.settle_delay(), Duration::from_millis(5));
    }
}
