//! Dynamically typed argument and response values.
//!
//! Arguments handed to a bound command and the results of response processing
//! share one representation so that validation rules and processors can be
//! declared per binding without generic plumbing.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// A value flowing through a binding.
///
/// Equality is structural and never coerces between kinds:
/// `Value::Int(1) != Value::Real(1.0)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Whole number.
    Int(i64),
    /// Floating point number.
    Real(f64),
    /// Unprocessed or textual value.
    Text(String),
    /// Named fields decomposed from a delimited response.
    Record(Record),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Record(_) => "record",
        }
    }

    /// Numeric view of the value. Integers widen, losing precision above 2^53.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Integer view of the value. Reals are not narrowed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Record view of the value.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Take the record out of the value.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Rendering for diagnostics: the wire form plus the kind, text quoted.
    pub(crate) fn describe(&self) -> String {
        match self {
            Value::Text(s) => format!("{s:?} ({})", self.kind()),
            other => format!("{other} ({})", other.kind()),
        }
    }
}

/// Wire form of the value, as it is interpolated into command strings.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Record(r) => write!(f, "{r}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

/// Insertion-ordered mapping from field name to value.
///
/// Field counts are small (a handful of comma separated fields), so lookups
/// scan a vector instead of hashing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value of an existing field of the same
    /// name in place (position is kept).
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Name and value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_does_not_coerce_kinds() {
        assert_ne!(Value::Int(1), Value::Real(1.0));
        assert_ne!(Value::Text("1".into()), Value::Int(1));
        assert_eq!(Value::from(2), Value::Int(2));
    }

    #[test]
    fn display_is_wire_form() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Real(2.5).to_string(), "2.5");
        assert_eq!(Value::from("A").to_string(), "A");
    }

    #[test]
    fn record_keeps_insertion_order() {
        let record: Record = [
            ("P", Value::Real(50.0)),
            ("I", Value::Real(20.0)),
            ("D", Value::Real(0.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["P", "I", "D"]);
        assert_eq!(record.get("I"), Some(&Value::Real(20.0)));
        assert_eq!(record.to_string(), "{P: 50, I: 20, D: 0}");
    }

    #[test]
    fn record_insert_replaces_in_place() {
        let mut record = Record::new();
        record.insert("a", Value::Int(1));
        record.insert("b", Value::Int(2));
        record.insert("a", Value::Int(3));
        assert_eq!(record.len(), 2);
        assert_eq!(record.iter().next(), Some(("a", &Value::Int(3))));
    }

    #[test]
    fn record_serializes_as_ordered_object() {
        let record: Record = [
            ("on/off", Value::Int(1)),
            ("rate value", Value::Real(10.5)),
            ("name", Value::from("DT-670")),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&Value::Record(record)).unwrap();
        assert_eq!(json, r#"{"on/off":1,"rate value":10.5,"name":"DT-670"}"#);
    }
}
