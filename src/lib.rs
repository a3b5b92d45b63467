//! # DAQ Bindings
//!
//! Declarative command bindings for text-protocol laboratory instruments.
//!
//! A driver type describes its instrument's command set once, as a table of
//! named bindings, instead of hand-writing a method per command:
//!
//! - **`validation`**: argument rules (`IsInteger`, `IsReal`, `InRange`,
//!   `InSet`, custom predicates) checked before anything reaches the wire.
//! - **`processing`**: response converters (`ToInteger`, `ToReal`, `ToRecord`)
//!   applied to the raw reply, left to right.
//! - **`binding`**: query and write commands, get/set features and unsupported
//!   markers, collected in a [`BindingTable`].
//! - **`adapters`**: the [`Transport`] trait plus stream, pacing and mock
//!   adapters.
//! - **`driver`**: [`Driver`] dispatches calls by name through a shared table
//!   over one paced transport.
//! - **`config`** / **`logging`**: figment-based configuration and tracing
//!   setup.

pub mod adapters;
pub mod binding;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod processing;
pub mod validation;
pub mod value;

pub use adapters::{MockAdapter, MockHandle, Paced, StreamAdapter, Transport};
pub use binding::{Args, Binding, BindingTable, Command, CommandKind, Feature, FeatureState};
pub use config::{ConfigError, DriverConfig, TransportConfig};
pub use driver::Driver;
pub use error::{
    BindingError, DefinitionError, ProcessingError, Result, TransportError, ValidationError,
};
pub use processing::{IntoProcessors, Processor, ProcessorChain, RecordParser};
pub use validation::{IntoRules, ParameterRules, Rule, Rules};
pub use value::{Record, Value};
