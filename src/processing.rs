//! Response processors: raw instrument text to typed values.
//!
//! Processors are applied left to right, each consuming the previous output.
//! Leaf processors ([`Processor::ToInteger`], [`Processor::ToReal`]) never
//! return a value for unparseable input; they fail with a
//! [`ProcessingError`].
//!
//! [`RecordParser`] decomposes a comma delimited reply into a named
//! [`Record`]. Names and fields are zipped: when the counts differ the
//! surplus on the longer side is dropped without error.
//!
//! ```
//! use daq_bindings::processing::{Processor, IntoProcessors};
//! use daq_bindings::Value;
//!
//! let pid = Processor::record(["P", "I", "D"])
//!     .fields([Processor::ToReal, Processor::ToReal, Processor::ToReal])
//!     .into_processors();
//! let record = pid.apply(Value::from("+0050.0,+0020.0,+0000.0")).unwrap();
//! assert_eq!(record.as_record().unwrap().get("I"), Some(&Value::Real(20.0)));
//! ```

use crate::error::ProcessingError;
use crate::value::{Record, Value};
use std::fmt;
use std::sync::Arc;

/// Response field delimiter.
pub const FIELD_DELIMITER: char = ',';

/// Transform signature for [`Processor::Custom`].
pub type TransformFn = Arc<dyn Fn(Value) -> Result<Value, ProcessingError> + Send + Sync>;

/// A single response transform.
#[derive(Clone)]
pub enum Processor {
    /// Parse text as an integer.
    ToInteger,
    /// Parse text as a real number.
    ToReal,
    /// Split delimited text into named fields.
    ToRecord(RecordParser),
    /// Caller-supplied transform.
    Custom { name: String, transform: TransformFn },
}

impl Processor {
    /// Start a record parser over the given field names.
    pub fn record<I, S>(names: I) -> RecordParser
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RecordParser::new(names)
    }

    /// Caller-supplied transform, named for diagnostics.
    pub fn custom(
        name: impl Into<String>,
        transform: impl Fn(Value) -> Result<Value, ProcessingError> + Send + Sync + 'static,
    ) -> Self {
        Processor::Custom {
            name: name.into(),
            transform: Arc::new(transform),
        }
    }

    /// Apply this processor to one value.
    pub fn apply(&self, value: Value) -> Result<Value, ProcessingError> {
        match self {
            Processor::ToInteger => to_integer(value),
            Processor::ToReal => to_real(value),
            Processor::ToRecord(parser) => parser.apply(value),
            Processor::Custom { transform, .. } => transform(value),
        }
    }
}

fn to_integer(value: Value) -> Result<Value, ProcessingError> {
    match &value {
        Value::Int(_) => Ok(value),
        Value::Real(r) if r.is_finite() => Ok(Value::Int(r.trunc() as i64)),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| ProcessingError::new(&value, "an integer", e)),
        _ => Err(ProcessingError::new(
            &value,
            "an integer",
            format!("{} is not convertible", value.kind()),
        )),
    }
}

fn to_real(value: Value) -> Result<Value, ProcessingError> {
    match &value {
        Value::Real(_) => Ok(value),
        Value::Int(i) => Ok(Value::Real(*i as f64)),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|e| ProcessingError::new(&value, "a real", e)),
        Value::Record(_) => Err(ProcessingError::new(
            &value,
            "a real",
            "record is not convertible",
        )),
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Processor::ToInteger => write!(f, "ToInteger"),
            Processor::ToReal => write!(f, "ToReal"),
            Processor::ToRecord(parser) => f.debug_tuple("ToRecord").field(parser).finish(),
            Processor::Custom { name, .. } => write!(f, "Custom({name})"),
        }
    }
}

impl From<RecordParser> for Processor {
    fn from(parser: RecordParser) -> Self {
        Processor::ToRecord(parser)
    }
}

/// Splits a delimited reply into named, optionally processed, fields.
#[derive(Debug, Clone)]
pub struct RecordParser {
    names: Vec<String>,
    fields: Vec<Option<ProcessorChain>>,
    strip: bool,
}

impl RecordParser {
    /// Parser for comma delimited fields named `names`, trimming whitespace.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            fields: Vec::new(),
            strip: true,
        }
    }

    /// Per-field processors aligned by position with the names. Every entry
    /// is processed, so plain processors may be given directly.
    pub fn fields<I, P>(mut self, processors: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoProcessors,
    {
        self.fields = processors
            .into_iter()
            .map(|p| Some(p.into_processors()))
            .collect();
        self
    }

    /// Per-field processors where `None` keeps the field as text.
    pub fn optional_fields<I, P>(mut self, processors: I) -> Self
    where
        I: IntoIterator<Item = Option<P>>,
        P: IntoProcessors,
    {
        self.fields = processors
            .into_iter()
            .map(|p| p.map(IntoProcessors::into_processors))
            .collect();
        self
    }

    /// Keep whitespace around fields instead of trimming it.
    pub fn keep_whitespace(mut self) -> Self {
        self.strip = false;
        self
    }

    /// Field names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Split a text reply into a record.
    pub fn apply(&self, value: Value) -> Result<Value, ProcessingError> {
        let Value::Text(text) = &value else {
            return Err(ProcessingError::new(
                &value,
                "a record",
                format!("{} is not delimited text", value.kind()),
            ));
        };

        let mut record = Record::new();
        let pairs = self.names.iter().zip(text.split(FIELD_DELIMITER));
        for (i, (name, field)) in pairs.enumerate() {
            let field = if self.strip { field.trim() } else { field };
            let mut field = Value::Text(field.to_string());
            if let Some(Some(chain)) = self.fields.get(i) {
                field = chain.apply(field)?;
            }
            record.insert(name.clone(), field);
        }
        Ok(Value::Record(record))
    }
}

/// Ordered processors applied left to right.
#[derive(Debug, Clone, Default)]
pub struct ProcessorChain(Vec<Processor>);

impl ProcessorChain {
    /// Empty chain; returns its input unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no processors are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of processors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn extend(&mut self, other: ProcessorChain) {
        self.0.extend(other.0);
    }

    /// Returns `P_n(...P_2(P_1(value)))`; an empty chain is the identity.
    pub fn apply(&self, value: Value) -> Result<Value, ProcessingError> {
        self.0.iter().try_fold(value, |acc, p| p.apply(acc))
    }
}

/// Normalizes "one processor" and "sequence of processors" into a
/// [`ProcessorChain`].
pub trait IntoProcessors {
    fn into_processors(self) -> ProcessorChain;
}

impl IntoProcessors for Processor {
    fn into_processors(self) -> ProcessorChain {
        ProcessorChain(vec![self])
    }
}

impl IntoProcessors for RecordParser {
    fn into_processors(self) -> ProcessorChain {
        ProcessorChain(vec![Processor::ToRecord(self)])
    }
}

impl IntoProcessors for ProcessorChain {
    fn into_processors(self) -> ProcessorChain {
        self
    }
}

impl IntoProcessors for Vec<Processor> {
    fn into_processors(self) -> ProcessorChain {
        ProcessorChain(self)
    }
}

impl<const N: usize> IntoProcessors for [Processor; N] {
    fn into_processors(self) -> ProcessorChain {
        ProcessorChain(self.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn to_integer_parses_or_fails() {
        assert_eq!(Processor::ToInteger.apply(text("42")).unwrap(), Value::Int(42));
        assert_eq!(Processor::ToInteger.apply(text(" +07 ")).unwrap(), Value::Int(7));
        let err = Processor::ToInteger.apply(text("abc")).unwrap_err();
        assert_eq!(err.target, "an integer");
        assert!(Processor::ToInteger.apply(text("2.5")).is_err());
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn to_real_parses_or_fails() {
        assert_eq!(Processor::ToReal.apply(text("3.14")).unwrap(), Value::Real(3.14));
        assert_eq!(Processor::ToReal.apply(text("+273.150")).unwrap(), Value::Real(273.15));
        assert_eq!(Processor::ToReal.apply(text("1E+02")).unwrap(), Value::Real(100.0));
        assert!(Processor::ToReal.apply(text("")).is_err());
        assert!(Processor::ToReal.apply(text("OVER")).is_err());
    }

    #[test]
    fn leaf_processors_on_typed_values() {
        assert_eq!(Processor::ToReal.apply(Value::Int(2)).unwrap(), Value::Real(2.0));
        assert_eq!(Processor::ToInteger.apply(Value::Real(-2.7)).unwrap(), Value::Int(-2));
        assert!(Processor::ToInteger.apply(Value::Real(f64::NAN)).is_err());
        assert!(Processor::ToReal.apply(Value::Record(Record::new())).is_err());
    }

    #[test]
    fn record_trims_and_processes_fields() {
        let parser =
            Processor::record(["a", "b"]).fields([Processor::ToInteger, Processor::ToReal]);
        let value = parser.apply(text("5, 2.5")).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("a"), Some(&Value::Int(5)));
        assert_eq!(record.get("b"), Some(&Value::Real(2.5)));
    }

    #[test]
    fn record_with_partial_field_processors() {
        let header = Processor::record(["name", "SN", "format", "limit value", "coefficient"])
            .optional_fields([
                None,
                None,
                Some(Processor::ToInteger),
                Some(Processor::ToReal),
                Some(Processor::ToInteger),
            ]);
        let value = header
            .apply(text("DT-670          ,00011134  ,2,+325.000,1"))
            .unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("name"), Some(&text("DT-670")));
        assert_eq!(record.get("SN"), Some(&text("00011134")));
        assert_eq!(record.get("format"), Some(&Value::Int(2)));
        assert_eq!(record.get("limit value"), Some(&Value::Real(325.0)));
        assert_eq!(record.get("coefficient"), Some(&Value::Int(1)));
    }

    #[test]
    fn record_field_accepts_a_processor_sequence() {
        let scaled = Processor::custom("double", |v| {
            let r = v.as_f64().unwrap_or_default();
            Ok(Value::Real(r * 2.0))
        });
        let parser = Processor::record(["x"]).fields([vec![Processor::ToReal, scaled]]);
        let value = parser.apply(text("1.5")).unwrap();
        assert_eq!(value.as_record().unwrap().get("x"), Some(&Value::Real(3.0)));
    }

    #[test]
    fn record_keep_whitespace() {
        let parser = Processor::record(["a", "b"]).keep_whitespace();
        let value = parser.apply(text(" x , y")).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("a"), Some(&text(" x ")));
        assert_eq!(record.get("b"), Some(&text(" y")));
    }

    // Mismatched counts are zip-truncated, not reported. This is the
    // documented behavior, kept deliberately.
    #[test]
    fn record_count_mismatch_truncates_silently() {
        let more_names = Processor::record(["a", "b", "c"]);
        let value = more_names.apply(text("1,2")).unwrap();
        assert_eq!(value.as_record().unwrap().names().collect::<Vec<_>>(), vec!["a", "b"]);

        let more_fields = Processor::record(["a"]);
        let value = more_fields.apply(text("1,2,3")).unwrap();
        assert_eq!(value.as_record().unwrap().len(), 1);
    }

    #[test]
    fn fields_past_the_processor_list_stay_text() {
        let parser = Processor::record(["a", "b", "c"]).fields([Processor::ToInteger]);
        let value = parser.apply(text("1,x,y")).unwrap();

        let expected: Record =
            [("a", Value::Int(1)), ("b", text("x")), ("c", text("y"))].into_iter().collect();
        assert_eq!(value, Value::Record(expected));
    }

    #[test]
    fn record_inner_failure_propagates() {
        let parser =
            Processor::record(["a", "b"]).fields([Processor::ToInteger, Processor::ToInteger]);
        let err = parser.apply(text("1,x")).unwrap_err();
        assert!(err.input.contains("\"x\""));
    }

    #[test]
    fn record_requires_text_input() {
        let err = Processor::record(["a"]).apply(Value::Int(3)).unwrap_err();
        assert_eq!(err.target, "a record");
    }

    #[test]
    fn chain_applies_left_to_right() {
        let add_one = Processor::custom("add one", |v| Ok(Value::Int(v.as_i64().unwrap_or(0) + 1)));
        let triple = Processor::custom("triple", |v| Ok(Value::Int(v.as_i64().unwrap_or(0) * 3)));
        let chain = vec![Processor::ToInteger, add_one, triple].into_processors();
        // triple(add_one(4)) = 15, add_one(triple(4)) would be 13
        assert_eq!(chain.apply(text("4")).unwrap(), Value::Int(15));
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = ProcessorChain::new();
        assert_eq!(chain.apply(text("raw")).unwrap(), text("raw"));
    }
}
