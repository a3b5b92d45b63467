//! Error types for the binding layer.
//!
//! `BindingError` is the single error type returned by every driver
//! operation. It consolidates the failure kinds a bound command can produce:
//!
//! - **`Validation`**: an argument failed a configured rule. Raised before any
//!   transport I/O, so nothing has been written to the instrument.
//! - **`Processing`**: the instrument answered, but the response text could not
//!   be converted by a configured processor, or a feature reading failed its
//!   get rules. The command has already been sent.
//! - **`Transport`**: the transport adapter itself failed. These are passed
//!   through transparently so callers see the adapter's own error.
//! - **`Unsupported`**: the command is declared but not implemented on this
//!   instrument variant. Fails before any I/O.
//! - **`Definition`**: a binding declaration is inconsistent (unknown parameter
//!   in a rule map, template referring to an undeclared parameter, ...). These
//!   normally surface once, when the binding table is built.
//!
//! None of these are retried at this layer.

use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// Convenience alias for results using the binding error type.
pub type Result<T> = std::result::Result<T, BindingError>;

/// Error returned by every binding and driver operation.
#[derive(Error, Debug)]
pub enum BindingError {
    /// An argument failed a rule; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The reply could not be converted or was rejected; the command was sent.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Adapter failure, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Inconsistent binding declaration.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Declared but not implemented on this instrument variant.
    #[error("'{command}' is not supported by {model}: {reason}")]
    Unsupported {
        model: String,
        command: String,
        reason: String,
    },

    /// Write to a feature that has no setter.
    #[error("feature '{0}' is read-only (no setter attached)")]
    ReadOnly(String),

    /// Wrong number of positional arguments.
    #[error("'{command}' takes {expected} argument(s) but {given} were given")]
    Arity {
        command: String,
        expected: usize,
        given: usize,
    },

    /// No binding with this name in the table.
    #[error("{model} has no binding named '{name}'")]
    UnknownBinding { model: String, name: String },

    /// Binding exists but is of another kind than the operation expects.
    #[error("'{name}' is a {actual}, not a {requested}")]
    KindMismatch {
        name: String,
        actual: &'static str,
        requested: &'static str,
    },
}

impl BindingError {
    /// True when the error was raised before anything reached the transport.
    pub fn is_pre_transport(&self) -> bool {
        !matches!(
            self,
            BindingError::Processing(_) | BindingError::Transport(_)
        )
    }
}

/// An argument failed a validation rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Parameter the value was bound to, when known.
    pub parameter: Option<String>,
    /// The offending value.
    pub value: Value,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl ValidationError {
    pub(crate) fn new(value: &Value, constraint: impl Into<String>) -> Self {
        Self {
            parameter: None,
            value: value.clone(),
            constraint: constraint.into(),
        }
    }

    pub(crate) fn for_parameter(mut self, parameter: &str) -> Self {
        self.parameter = Some(parameter.to_string());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(name) => write!(
                f,
                "invalid value {} for '{}': {}",
                self.value.describe(),
                name,
                self.constraint
            ),
            None => write!(
                f,
                "invalid value {}: {}",
                self.value.describe(),
                self.constraint
            ),
        }
    }
}

/// A response could not be converted by a processor.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("could not convert {input} into {target}: {reason}")]
pub struct ProcessingError {
    /// Rendering of the value handed to the processor.
    pub input: String,
    /// What the processor was producing ("an integer", "a real", ...).
    pub target: String,
    /// Underlying parse failure.
    pub reason: String,
}

impl ProcessingError {
    pub(crate) fn new(
        input: &Value,
        target: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            input: input.describe(),
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures of the transport adapter itself.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Underlying stream I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No complete reply before the deadline.
    #[error("timed out after {waited_ms} ms waiting for a reply to '{command}'")]
    Timeout { command: String, waited_ms: u128 },

    /// Stream reached end of file mid-reply.
    #[error("transport closed while waiting for a reply to '{command}'")]
    Closed { command: String },

    /// Reply bytes were not UTF-8.
    #[error("reply to '{command}' is not valid UTF-8")]
    Encoding { command: String },

    /// Adapter-specific failure.
    #[error("transport failure: {0}")]
    Other(String),
}

/// A binding declaration is inconsistent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// Rules name a parameter the binding does not declare.
    #[error("'{binding}' has rules for undeclared parameter '{parameter}'")]
    UnknownParameter { binding: String, parameter: String },

    /// A parameter name appears twice.
    #[error("'{binding}' declares parameter '{parameter}' twice")]
    DuplicateParameter { binding: String, parameter: String },

    /// Builder finished without a closure or template.
    #[error("'{0}' has no command action (closure or template)")]
    MissingAction(String),

    /// Template failed to render.
    #[error("template for '{binding}' is invalid: {reason}")]
    Template { binding: String, reason: String },

    /// Feature lacks the getter every feature needs.
    #[error("feature '{0}' has no getter")]
    MissingGetter(String),

    /// A second setter was attached.
    #[error("feature '{0}' already has a setter")]
    SetterAlreadyBound(String),

    /// Name already taken in the table.
    #[error("binding '{name}' is already declared on {model}")]
    DuplicateBinding { model: String, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_parameter_and_constraint() {
        let err = ValidationError::new(&Value::Int(40), "must be <= 32").for_parameter("contrast");
        let msg = err.to_string();
        assert!(msg.contains("'contrast'"));
        assert!(msg.contains("40"));
        assert!(msg.contains("must be <= 32"));
    }

    #[test]
    fn transport_errors_pass_through_unchanged() {
        let inner = TransportError::Closed {
            command: "KRDG? A".into(),
        };
        let expected = inner.to_string();
        let err: BindingError = inner.into();
        assert_eq!(err.to_string(), expected);
        assert!(matches!(err, BindingError::Transport(TransportError::Closed { .. })));
        assert!(!err.is_pre_transport());
    }

    #[test]
    fn processing_errors_are_post_transport() {
        let err: BindingError =
            ProcessingError::new(&Value::Int(99), "a reading", "too high").into();
        assert!(!err.is_pre_transport());
    }

    #[test]
    fn validation_and_unsupported_are_pre_transport() {
        let validation: BindingError = ValidationError::new(&Value::Int(9), "bad").into();
        assert!(validation.is_pre_transport());

        let unsupported = BindingError::Unsupported {
            model: "LS218".into(),
            command: "set_pid".into(),
            reason: "monitor only".into(),
        };
        assert!(unsupported.is_pre_transport());
    }
}
