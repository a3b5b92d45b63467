//! Query and write command bindings.
//!
//! A command binding wraps the function that talks to the instrument with a
//! fixed pipeline:
//!
//! 1. arity check against the declared parameter names
//! 2. validation of every argument that has rules
//! 3. the command action itself (closure or wire template)
//! 4. for queries, the response processors, left to right
//!
//! Steps 1 and 2 never touch the transport, so a rejected call leaves the
//! instrument untouched.

use super::{check_template, render_template, Args};
use crate::adapters::Transport;
use crate::error::{BindingError, DefinitionError, Result, TransportError};
use crate::processing::{IntoProcessors, ProcessorChain};
use crate::validation::{IntoRules, ParameterRules};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Write action: send a command, no reply.
pub type SendFn = Arc<
    dyn Fn(&mut dyn Transport, Args<'_>) -> std::result::Result<(), TransportError> + Send + Sync,
>;

/// Query action: send a command and return the raw reply.
pub type QueryFn = Arc<
    dyn Fn(&mut dyn Transport, Args<'_>) -> std::result::Result<String, TransportError>
        + Send
        + Sync,
>;

/// Whether a command expects a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Sends only; invocation yields `None`.
    Write,
    /// Sends and reads a reply, which is then processed.
    Query,
}

#[derive(Clone)]
enum Action {
    Send(SendFn),
    SendTemplate(String),
    Query(QueryFn),
    QueryTemplate(String),
}

impl Action {
    fn kind(&self) -> CommandKind {
        match self {
            Action::Send(_) | Action::SendTemplate(_) => CommandKind::Write,
            Action::Query(_) | Action::QueryTemplate(_) => CommandKind::Query,
        }
    }
}

/// A bound instrument command.
#[derive(Clone)]
pub struct Command {
    name: String,
    params: Vec<String>,
    rules: ParameterRules,
    processors: ProcessorChain,
    action: Action,
}

impl Command {
    /// Start declaring a write command.
    pub fn write(name: impl Into<String>) -> WriteBuilder {
        WriteBuilder {
            decl: Declaration::new(name.into()),
            action: None,
        }
    }

    /// Start declaring a query command.
    pub fn query(name: impl Into<String>) -> QueryBuilder {
        QueryBuilder {
            decl: Declaration::new(name.into()),
            processors: ProcessorChain::new(),
            action: None,
        }
    }

    /// Binding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter names, in positional order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Write or query, fixed by the builder that produced the command.
    pub fn kind(&self) -> CommandKind {
        self.action.kind()
    }

    /// Validation rules keyed by parameter.
    pub fn rules(&self) -> &ParameterRules {
        &self.rules
    }

    /// Processors applied to the reply; empty for writes.
    pub fn processors(&self) -> &ProcessorChain {
        &self.processors
    }

    /// Run the command with positional arguments.
    ///
    /// Returns `None` for writes and the processed reply for queries.
    pub fn invoke(&self, transport: &mut dyn Transport, values: &[Value]) -> Result<Option<Value>> {
        if values.len() != self.params.len() {
            return Err(BindingError::Arity {
                command: self.name.clone(),
                expected: self.params.len(),
                given: values.len(),
            });
        }

        if let Err(err) = self.rules.check(&self.params, values) {
            debug!(command = %self.name, error = %err, "validation failed");
            return Err(err.into());
        }

        let args = Args::new(&self.params, values);
        let raw = match &self.action {
            Action::Send(f) => {
                f(transport, args)?;
                return Ok(None);
            }
            Action::SendTemplate(template) => {
                let line = render_template(&self.name, template, args)?;
                transport.send(&line)?;
                return Ok(None);
            }
            Action::Query(f) => f(transport, args)?,
            Action::QueryTemplate(template) => {
                let line = render_template(&self.name, template, args)?;
                transport.query(&line)?
            }
        };

        trace!(command = %self.name, raw = %raw, "reply");
        let value = self.processors.apply(Value::Text(raw)).map_err(|err| {
            debug!(command = %self.name, error = %err, "response processing failed");
            err
        })?;
        Ok(Some(value))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("params", &self.params)
            .field("rules", &self.rules)
            .field("processors", &self.processors)
            .finish_non_exhaustive()
    }
}

/// Name, parameters and rules shared by both builder kinds.
struct Declaration {
    name: String,
    params: Vec<String>,
    rules: ParameterRules,
    error: Option<DefinitionError>,
}

impl Declaration {
    fn new(name: String) -> Self {
        Self {
            name,
            params: Vec::new(),
            rules: ParameterRules::new(),
            error: None,
        }
    }

    fn add_params<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if self.params.contains(&name) {
                self.error.get_or_insert(DefinitionError::DuplicateParameter {
                    binding: self.name.clone(),
                    parameter: name.clone(),
                });
            }
            self.params.push(name);
        }
    }

    fn finish(self) -> std::result::Result<(String, Vec<String>, ParameterRules), DefinitionError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if let Some(unknown) = self
            .rules
            .parameters()
            .find(|p| !self.params.iter().any(|declared| declared == p))
        {
            return Err(DefinitionError::UnknownParameter {
                binding: self.name.clone(),
                parameter: unknown.to_string(),
            });
        }
        Ok((self.name, self.params, self.rules))
    }
}

/// Builder returned by [`Command::write`].
pub struct WriteBuilder {
    decl: Declaration,
    action: Option<Action>,
}

impl WriteBuilder {
    /// Declare positional parameter names.
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.decl.add_params(names);
        self
    }

    /// Attach one rule or a sequence of rules to a parameter.
    pub fn validate(mut self, parameter: impl Into<String>, rules: impl IntoRules) -> Self {
        self.decl.rules.insert(parameter, rules);
        self
    }

    /// Use a closure as the command action.
    pub fn sends<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut dyn Transport, Args<'_>) -> std::result::Result<(), TransportError>
            + Send
            + Sync
            + 'static,
    {
        self.action = Some(Action::Send(Arc::new(action)));
        self
    }

    /// Use a wire template such as `"SETP {output},{value}"` as the action.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.action = Some(Action::SendTemplate(template.into()));
        self
    }

    /// Check the declaration and produce the command.
    pub fn build(self) -> std::result::Result<Command, DefinitionError> {
        finish(self.decl, self.action, ProcessorChain::new())
    }
}

/// Builder returned by [`Command::query`].
pub struct QueryBuilder {
    decl: Declaration,
    processors: ProcessorChain,
    action: Option<Action>,
}

impl QueryBuilder {
    /// Declare positional parameter names.
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.decl.add_params(names);
        self
    }

    /// Attach one rule or a sequence of rules to a parameter.
    pub fn validate(mut self, parameter: impl Into<String>, rules: impl IntoRules) -> Self {
        self.decl.rules.insert(parameter, rules);
        self
    }

    /// Append response processors; repeated calls extend the chain.
    pub fn process(mut self, processors: impl IntoProcessors) -> Self {
        self.processors.extend(processors.into_processors());
        self
    }

    /// Use a closure as the command action.
    pub fn queries<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut dyn Transport, Args<'_>) -> std::result::Result<String, TransportError>
            + Send
            + Sync
            + 'static,
    {
        self.action = Some(Action::Query(Arc::new(action)));
        self
    }

    /// Use a wire template such as `"KRDG? {input}"` as the action.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.action = Some(Action::QueryTemplate(template.into()));
        self
    }

    /// Check the declaration and produce the command.
    pub fn build(self) -> std::result::Result<Command, DefinitionError> {
        finish(self.decl, self.action, self.processors)
    }
}

fn finish(
    decl: Declaration,
    action: Option<Action>,
    processors: ProcessorChain,
) -> std::result::Result<Command, DefinitionError> {
    let (name, params, rules) = decl.finish()?;
    let action = action.ok_or_else(|| DefinitionError::MissingAction(name.clone()))?;
    if let Action::SendTemplate(template) | Action::QueryTemplate(template) = &action {
        check_template(&name, template, &params)?;
    }
    Ok(Command {
        name,
        params,
        rules,
        processors,
        action,
    })
}
