//! Feature bindings: a named instrument property with get and optional set.
//!
//! The getter and setter take no positional arguments. The value written by
//! `set` is checked against the set rules before the setter runs. The value
//! returned by `get` is the processed reply, checked against the get rules;
//! a reply that fails them is a [`ProcessingError`], since the query has
//! already gone out.

use super::{check_template, render_template, Args};
use crate::adapters::Transport;
use crate::error::{BindingError, DefinitionError, ProcessingError, Result, TransportError};
use crate::processing::{IntoProcessors, ProcessorChain};
use crate::validation::{IntoRules, Rules};
use crate::value::Value;
use std::fmt;
use std::slice;
use std::sync::Arc;
use tracing::{debug, trace};

/// Placeholder name available in set templates.
pub const VALUE_PLACEHOLDER: &str = "value";

/// Closure getter: issues the read and returns the raw reply.
pub type GetFn =
    Arc<dyn Fn(&mut dyn Transport) -> std::result::Result<String, TransportError> + Send + Sync>;

/// Closure setter: writes an already validated value.
pub type SetFn = Arc<
    dyn Fn(&mut dyn Transport, &Value) -> std::result::Result<(), TransportError> + Send + Sync,
>;

#[derive(Clone)]
enum Getter {
    Fn(GetFn),
    Template(String),
}

#[derive(Clone)]
enum Setter {
    Fn(SetFn),
    Template(String),
}

/// What a feature can currently do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    /// Declared without a getter; rejected when added to a table.
    Unbound,
    /// Getter only; writes fail with [`BindingError::ReadOnly`].
    ReadOnly,
    /// Getter and setter bound.
    ReadWrite,
}

/// Named instrument property read through a getter and, once a setter is
/// attached, written through it.
#[derive(Clone)]
pub struct Feature {
    name: String,
    getter: Option<Getter>,
    setter: Option<Setter>,
    get_rules: Rules,
    set_rules: Rules,
    processors: ProcessorChain,
}

impl Feature {
    /// Feature with no getter or setter yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            getter: None,
            setter: None,
            get_rules: Rules::new(),
            set_rules: Rules::new(),
            processors: ProcessorChain::new(),
        }
    }

    /// Binding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current capability, derived from which accessors are bound.
    pub fn state(&self) -> FeatureState {
        match (&self.getter, &self.setter) {
            (None, _) => FeatureState::Unbound,
            (Some(_), None) => FeatureState::ReadOnly,
            (Some(_), Some(_)) => FeatureState::ReadWrite,
        }
    }

    /// Closure getter, for reads a single query string cannot express.
    pub fn getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&mut dyn Transport) -> std::result::Result<String, TransportError>
            + Send
            + Sync
            + 'static,
    {
        self.getter = Some(Getter::Fn(Arc::new(getter)));
        self
    }

    /// Query sent verbatim to read the feature, e.g. `"BRIGT?"`.
    pub fn get_template(mut self, command: impl Into<String>) -> Self {
        self.getter = Some(Getter::Template(command.into()));
        self
    }

    /// Closure setter.
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&mut dyn Transport, &Value) -> std::result::Result<(), TransportError>
            + Send
            + Sync
            + 'static,
    {
        self.setter = Some(Setter::Fn(Arc::new(setter)));
        self
    }

    /// Write template with a `{value}` placeholder, e.g. `"BRIGT {value}"`.
    pub fn set_template(mut self, template: impl Into<String>) -> Self {
        self.setter = Some(Setter::Template(template.into()));
        self
    }

    /// Rules the processed reply must satisfy.
    pub fn validate_get(mut self, rules: impl IntoRules) -> Self {
        self.get_rules.extend(rules.into_rules());
        self
    }

    /// Rules checked against a value before it is written.
    pub fn validate_set(mut self, rules: impl IntoRules) -> Self {
        self.set_rules.extend(rules.into_rules());
        self
    }

    /// Append processors applied to the getter's reply.
    pub fn process(mut self, processors: impl IntoProcessors) -> Self {
        self.processors.extend(processors.into_processors());
        self
    }

    /// Attach a setter to a feature that already has a getter.
    pub fn attach_setter<F>(&mut self, setter: F) -> std::result::Result<&mut Self, DefinitionError>
    where
        F: Fn(&mut dyn Transport, &Value) -> std::result::Result<(), TransportError>
            + Send
            + Sync
            + 'static,
    {
        self.attach(Setter::Fn(Arc::new(setter)))
    }

    /// Template form of [`Feature::attach_setter`].
    pub fn attach_set_template(
        &mut self,
        template: impl Into<String>,
    ) -> std::result::Result<&mut Self, DefinitionError> {
        let template = template.into();
        check_template(&self.name, &template, &[VALUE_PLACEHOLDER.to_string()])?;
        self.attach(Setter::Template(template))
    }

    fn attach(&mut self, setter: Setter) -> std::result::Result<&mut Self, DefinitionError> {
        if self.getter.is_none() {
            return Err(DefinitionError::MissingGetter(self.name.clone()));
        }
        if self.setter.is_some() {
            return Err(DefinitionError::SetterAlreadyBound(self.name.clone()));
        }
        self.setter = Some(setter);
        Ok(self)
    }

    /// Declaration checks run when the feature joins a binding table.
    pub(crate) fn check(&self) -> std::result::Result<(), DefinitionError> {
        if self.getter.is_none() {
            return Err(DefinitionError::MissingGetter(self.name.clone()));
        }
        if let Some(Setter::Template(template)) = &self.setter {
            check_template(&self.name, template, &[VALUE_PLACEHOLDER.to_string()])?;
        }
        Ok(())
    }

    /// Read the feature: getter, processors, then get rules.
    pub fn read(&self, transport: &mut dyn Transport) -> Result<Value> {
        let raw = match &self.getter {
            Some(Getter::Fn(f)) => f(transport)?,
            Some(Getter::Template(command)) => transport.query(command)?,
            None => return Err(DefinitionError::MissingGetter(self.name.clone()).into()),
        };
        trace!(feature = %self.name, raw = %raw, "reply");

        let value = self.processors.apply(Value::Text(raw)).map_err(|err| {
            debug!(feature = %self.name, error = %err, "response processing failed");
            err
        })?;
        if let Err(err) = self.get_rules.check(&value) {
            debug!(feature = %self.name, error = %err, "read value failed validation");
            let target = format!("an accepted '{}' reading", self.name);
            return Err(ProcessingError::new(&value, target, err.constraint).into());
        }
        Ok(value)
    }

    /// Write the feature. Fails with [`BindingError::ReadOnly`] before any
    /// I/O when no setter is attached.
    pub fn write(&self, transport: &mut dyn Transport, value: &Value) -> Result<()> {
        let Some(setter) = &self.setter else {
            return Err(BindingError::ReadOnly(self.name.clone()));
        };

        if let Err(err) = self.set_rules.check(value) {
            debug!(feature = %self.name, error = %err, "validation failed");
            return Err(err.for_parameter(&self.name).into());
        }

        match setter {
            Setter::Fn(f) => f(transport, value)?,
            Setter::Template(template) => {
                let names = [VALUE_PLACEHOLDER.to_string()];
                let args = Args::new(&names, slice::from_ref(value));
                let line = render_template(&self.name, template, args)?;
                transport.send(&line)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("get_rules", &self.get_rules)
            .field("set_rules", &self.set_rules)
            .field("processors", &self.processors)
            .finish_non_exhaustive()
    }
}
