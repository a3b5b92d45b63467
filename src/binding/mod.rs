//! Declarative command bindings.
//!
//! A driver type declares its command set once as a [`BindingTable`]: a fixed
//! table of named [`Binding`]s built when the driver type is first used, then
//! shared read-only by every driver instance. Invocation dispatches through
//! the table by name.
//!
//! ```
//! use daq_bindings::binding::{BindingTable, Command, Feature};
//! use daq_bindings::processing::Processor;
//! use daq_bindings::validation::Rule;
//!
//! # fn main() -> Result<(), daq_bindings::DefinitionError> {
//! let table = BindingTable::new("LS350")
//!     .with(
//!         Command::query("get_setpoint")
//!             .params(["output"])
//!             .validate("output", [Rule::IsInteger, Rule::one_of([1, 2, 3, 4])])
//!             .process(Processor::ToReal)
//!             .template("SETP? {output}")
//!             .build()?,
//!     )?
//!     .with(
//!         Feature::new("brightness")
//!             .get_template("BRIGT?")
//!             .process(Processor::ToInteger)
//!             .validate_set([Rule::IsInteger, Rule::range(1.0, 32.0)])
//!             .set_template("BRIGT {value}"),
//!     )?
//!     .unsupported("set_pid", "monitor-only variant")?;
//! assert_eq!(table.len(), 3);
//! # Ok(())
//! # }
//! ```

use crate::error::DefinitionError;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Index;

pub mod command;
pub mod feature;

pub use command::{Command, CommandKind, QueryBuilder, WriteBuilder};
pub use feature::{Feature, FeatureState};

/// Positional arguments of one invocation, addressable by declared name.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    names: &'a [String],
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub(crate) fn new(names: &'a [String], values: &'a [Value]) -> Self {
        Self { names, values }
    }

    /// Argument bound to the parameter `name`.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
    }

    /// Arguments in positional order.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the command takes no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name and value pairs in positional order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.names.iter().map(String::as_str).zip(self.values)
    }
}

impl Index<usize> for Args<'_> {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

/// Render a wire template such as `"CRVPT? {curve},{index}"`.
pub(crate) fn render_template(
    binding: &str,
    template: &str,
    args: Args<'_>,
) -> Result<String, DefinitionError> {
    let vars: HashMap<String, String> = args
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    strfmt::strfmt(template, &vars).map_err(|e| DefinitionError::Template {
        binding: binding.to_string(),
        reason: e.to_string(),
    })
}

/// Render a template once with placeholder values to catch references to
/// undeclared parameters when the binding is declared.
pub(crate) fn check_template(
    binding: &str,
    template: &str,
    params: &[String],
) -> Result<(), DefinitionError> {
    let samples: Vec<Value> = params.iter().map(|_| Value::Int(0)).collect();
    render_template(binding, template, Args::new(params, &samples)).map(|_| ())
}

/// One named entry of a [`BindingTable`].
pub enum Binding {
    /// Query or write command.
    Command(Command),
    /// Get/set property.
    Feature(Feature),
    /// Declared but not implemented on this instrument variant; invoking it
    /// fails without touching the transport.
    Unsupported { name: String, reason: String },
}

impl Binding {
    /// Placeholder for a command this variant lacks.
    pub fn unsupported(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Binding::Unsupported {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Name the binding is registered under.
    pub fn name(&self) -> &str {
        match self {
            Binding::Command(c) => c.name(),
            Binding::Feature(f) => f.name(),
            Binding::Unsupported { name, .. } => name,
        }
    }

    /// Human readable kind, used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Binding::Command(c) => match c.kind() {
                CommandKind::Write => "write command",
                CommandKind::Query => "query command",
            },
            Binding::Feature(_) => "feature",
            Binding::Unsupported { .. } => "unsupported command",
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Command(c) => fmt::Debug::fmt(c, f),
            Binding::Feature(feat) => fmt::Debug::fmt(feat, f),
            Binding::Unsupported { name, reason } => f
                .debug_struct("Unsupported")
                .field("name", name)
                .field("reason", reason)
                .finish(),
        }
    }
}

impl From<Command> for Binding {
    fn from(command: Command) -> Self {
        Binding::Command(command)
    }
}

impl From<Feature> for Binding {
    fn from(feature: Feature) -> Self {
        Binding::Feature(feature)
    }
}

/// The fixed set of bindings a driver type exposes.
#[derive(Debug)]
pub struct BindingTable {
    model: String,
    bindings: BTreeMap<String, Binding>,
}

impl BindingTable {
    /// Empty table for `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            bindings: BTreeMap::new(),
        }
    }

    /// Instrument model the table describes.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Add a binding, consuming and returning the table for chaining.
    pub fn with(mut self, binding: impl Into<Binding>) -> Result<Self, DefinitionError> {
        self.insert(binding)?;
        Ok(self)
    }

    /// Declare a command this instrument variant does not implement.
    pub fn unsupported(
        self,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        self.with(Binding::unsupported(name, reason))
    }

    /// Add a binding. Names are unique and features must have a getter.
    pub fn insert(&mut self, binding: impl Into<Binding>) -> Result<(), DefinitionError> {
        let binding = binding.into();
        if let Binding::Feature(feature) = &binding {
            feature.check()?;
        }
        let name = binding.name().to_string();
        if self.bindings.contains_key(&name) {
            return Err(DefinitionError::DuplicateBinding {
                model: self.model.clone(),
                name,
            });
        }
        self.bindings.insert(name, binding);
        Ok(())
    }

    /// Look up a binding by name.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Mutable access to a declared feature, e.g. to attach a setter after
    /// the getter was registered.
    pub fn feature_mut(&mut self, name: &str) -> Option<&mut Feature> {
        match self.bindings.get_mut(name) {
            Some(Binding::Feature(f)) => Some(f),
            _ => None,
        }
    }

    /// Binding names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
