//! Validation rules gating argument values before they reach the wire.
//!
//! A [`Rule`] is a pure predicate over one [`Value`]. Rules are grouped into
//! ordered [`Rules`] (all must pass, first failure wins) and keyed by parameter
//! name in a [`ParameterRules`] map that a command binding owns.
//!
//! Call sites may pass either a single rule or a sequence of rules; both are
//! normalized into [`Rules`] through [`IntoRules`] when the binding is
//! declared, never per call.
//!
//! ```
//! use daq_bindings::validation::{Rule, Rules, IntoRules};
//! use daq_bindings::Value;
//!
//! let rules = [Rule::IsInteger, Rule::range(1.0, 59.0)].into_rules();
//! assert!(rules.check(&Value::Int(32)).is_ok());
//! assert!(rules.check(&Value::Int(60)).is_err());
//! assert!(rules.check(&Value::Real(3.0)).is_err());
//! ```

use crate::error::ValidationError;
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Predicate signature for [`Rule::Custom`].
pub type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A single validation rule.
#[derive(Clone)]
pub enum Rule {
    /// Value must be an integer.
    IsInteger,
    /// Value must be numeric; integers are accepted as reals.
    IsReal,
    /// Inclusive numeric bounds, each optional.
    InRange { min: Option<f64>, max: Option<f64> },
    /// Value must equal one of the allowed values (no coercion between kinds).
    InSet(Vec<Value>),
    /// Caller-supplied predicate.
    Custom { description: String, check: CheckFn },
}

impl Rule {
    /// Inclusive range with both bounds.
    pub fn range(min: f64, max: f64) -> Self {
        Rule::InRange {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Inclusive lower bound only.
    pub fn at_least(min: f64) -> Self {
        Rule::InRange {
            min: Some(min),
            max: None,
        }
    }

    /// Inclusive upper bound only.
    pub fn at_most(max: f64) -> Self {
        Rule::InRange {
            min: None,
            max: Some(max),
        }
    }

    /// Membership in a set of allowed values.
    pub fn one_of<I, V>(allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Rule::InSet(allowed.into_iter().map(Into::into).collect())
    }

    /// Caller-supplied predicate; `description` is reported on failure.
    pub fn custom(
        description: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Rule::Custom {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// Check a value against this rule.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        match self {
            Rule::IsInteger => match value {
                Value::Int(_) => Ok(()),
                other => Err(ValidationError::new(
                    value,
                    format!("must be an integer, got {}", other.kind()),
                )),
            },
            Rule::IsReal => match value {
                Value::Int(_) | Value::Real(_) => Ok(()),
                other => Err(ValidationError::new(
                    value,
                    format!("must be a real, got {}", other.kind()),
                )),
            },
            Rule::InRange { min, max } => {
                if value.as_f64().is_none() {
                    return Err(ValidationError::new(value, "must be numeric"));
                }
                if let Some(max) = max {
                    if compare_to_bound(value, *max) == Some(Ordering::Greater) {
                        return Err(ValidationError::new(value, format!("must be <= {max}")));
                    }
                }
                if let Some(min) = min {
                    if compare_to_bound(value, *min) == Some(Ordering::Less) {
                        return Err(ValidationError::new(value, format!("must be >= {min}")));
                    }
                }
                Ok(())
            }
            Rule::InSet(allowed) => {
                if allowed.iter().any(|a| a == value) {
                    Ok(())
                } else {
                    Err(ValidationError::new(
                        value,
                        format!("must be one of {}", render_set(allowed)),
                    ))
                }
            }
            Rule::Custom { description, check } => {
                if check(value) {
                    Ok(())
                } else {
                    Err(ValidationError::new(value, description.clone()))
                }
            }
        }
    }
}

/// Order a numeric value against a bound. Integers are compared exactly
/// rather than rounded through `f64`.
fn compare_to_bound(value: &Value, bound: f64) -> Option<Ordering> {
    match value {
        Value::Int(i) => compare_int_to_real(*i, bound),
        Value::Real(r) => r.partial_cmp(&bound),
        _ => None,
    }
}

fn compare_int_to_real(i: i64, r: f64) -> Option<Ordering> {
    // 2^63; every finite f64 in [-2^63, 2^63) has a floor that fits in i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if r.is_nan() {
        return None;
    }
    if r >= LIMIT {
        return Some(Ordering::Less);
    }
    if r < -LIMIT {
        return Some(Ordering::Greater);
    }
    let floor = r.floor();
    let fractional = if r > floor { Ordering::Less } else { Ordering::Equal };
    Some(i.cmp(&(floor as i64)).then(fractional))
}

fn render_set(allowed: &[Value]) -> String {
    let items: Vec<String> = allowed.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::IsInteger => write!(f, "IsInteger"),
            Rule::IsReal => write!(f, "IsReal"),
            Rule::InRange { min, max } => f
                .debug_struct("InRange")
                .field("min", min)
                .field("max", max)
                .finish(),
            Rule::InSet(allowed) => f.debug_tuple("InSet").field(allowed).finish(),
            Rule::Custom { description, .. } => write!(f, "Custom({description})"),
        }
    }
}

/// Ordered rule sequence; every rule must pass.
#[derive(Debug, Clone, Default)]
pub struct Rules(Vec<Rule>);

impl Rules {
    /// Empty sequence; accepts every value.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.0.iter()
    }

    pub(crate) fn extend(&mut self, other: Rules) {
        self.0.extend(other.0);
    }

    /// Check rules in order, surfacing the first failure. Later rules are
    /// not evaluated once one fails.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        self.0.iter().try_for_each(|rule| rule.check(value))
    }
}

/// Normalizes "one rule" and "sequence of rules" into [`Rules`].
pub trait IntoRules {
    /// Normalize into an ordered rule sequence.
    fn into_rules(self) -> Rules;
}

impl IntoRules for Rule {
    fn into_rules(self) -> Rules {
        Rules(vec![self])
    }
}

impl IntoRules for Rules {
    fn into_rules(self) -> Rules {
        self
    }
}

impl IntoRules for Vec<Rule> {
    fn into_rules(self) -> Rules {
        Rules(self)
    }
}

impl<const N: usize> IntoRules for [Rule; N] {
    fn into_rules(self) -> Rules {
        Rules(self.into())
    }
}

/// Rules keyed by parameter name. Parameters absent from the map are not
/// checked.
#[derive(Debug, Clone, Default)]
pub struct ParameterRules {
    entries: Vec<(String, Rules)>,
}

impl ParameterRules {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rules for a parameter, appending to any rules already present.
    pub fn insert(&mut self, parameter: impl Into<String>, rules: impl IntoRules) {
        let parameter = parameter.into();
        let rules = rules.into_rules();
        match self.entries.iter_mut().find(|(p, _)| *p == parameter) {
            Some((_, existing)) => existing.extend(rules),
            None => self.entries.push((parameter, rules)),
        }
    }

    /// Rules for one parameter, if any.
    pub fn get(&self, parameter: &str) -> Option<&Rules> {
        self.entries
            .iter()
            .find(|(p, _)| p == parameter)
            .map(|(_, r)| r)
    }

    /// Parameter names that carry rules.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    /// True when no parameter carries rules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate positional arguments against their declared names, in
    /// positional order.
    pub fn check(&self, names: &[String], values: &[Value]) -> Result<(), ValidationError> {
        for (name, value) in names.iter().zip(values) {
            if let Some(rules) = self.get(name) {
                rules
                    .check(value)
                    .map_err(|e| e.for_parameter(name))?;
            }
        }
        Ok(())
    }
}
