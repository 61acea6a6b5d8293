//! Runtime values.
//!
//! [`RawValue`] is what a host hands in: it may contain callables and opaque
//! host objects.  [`Value`] is what the evaluator sees after
//! [sanitization](super::context::sanitize): plain data plus read-only
//! [`HostView`]s, never a callable.
//!
//! Coercions follow loose dynamic-language rules: `Absent` and `Null` are
//! distinct, numbers are `f64`, and NaN is a first-class result of bad
//! arithmetic rather than an error.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::context::{HostObject, HostView};
use crate::error::ExprError;

// ── Value ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value: unbound identifiers, missing or disallowed properties.
    #[default]
    Absent,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Host(HostView),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => a.same_object(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Map(_) | Value::Host(_) => write!(f, "[object Object]"),
        }
    }
}

/// Integral values print without a fractional part (`5`, not `5.0`).
/// Magnitudes of at least 1e21 or below 1e-6 use exponent form (`1e+21`,
/// `1.5e-7`).
fn format_number(n: f64) -> String {
    let abs = n.abs();
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else if !(1e-6..1e21).contains(&abs) {
        let s = format!("{n:e}");
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => s,
        }
    } else if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

impl Value {
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Absent | Value::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    /// Absent, null, or NaN: the operands that take the special-case
    /// branch in binary operators.
    pub fn is_void(&self) -> bool {
        self.is_nullish() || self.is_nan()
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Absent | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Host(_) => true,
        }
    }

    /// Numeric coercion; anything unconvertible is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Absent => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => parse_number(s),
            Value::List(_) | Value::Map(_) | Value::Host(_) => f64::NAN,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "array",
            Value::Map(_) | Value::Host(_) => "object",
        }
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    /// `+`: concatenation when either side is a string, numeric otherwise.
    pub fn arith_add(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{self}{rhs}")),
            _ => Value::Number(self.to_number() + rhs.to_number()),
        }
    }

    pub fn arith_sub(&self, rhs: &Value) -> Value {
        Value::Number(self.to_number() - rhs.to_number())
    }

    pub fn arith_mul(&self, rhs: &Value) -> Value {
        Value::Number(self.to_number() * rhs.to_number())
    }

    /// Only a numeric zero divisor is an error; other divisors that
    /// coerce to zero (`''`, `false`) divide by IEEE rules.
    pub fn arith_div(&self, rhs: &Value) -> Result<Value, ExprError> {
        if matches!(rhs, Value::Number(d) if *d == 0.0) {
            return Err(ExprError::Eval("division by zero".into()));
        }
        Ok(Value::Number(self.to_number() / rhs.to_number()))
    }

    /// `%` by zero is NaN, not an error.
    pub fn arith_rem(&self, rhs: &Value) -> Value {
        Value::Number(self.to_number() % rhs.to_number())
    }

    pub fn arith_neg(&self) -> Value {
        Value::Number(-self.to_number())
    }

    // ── Comparison helpers ────────────────────────────────────────────────────

    /// `===`: same kind and same value; NaN is never equal to itself.
    pub fn strict_eq(&self, rhs: &Value) -> bool {
        self == rhs
    }

    /// `==`: `Absent` and `Null` are equal to each other only; numbers,
    /// strings, and booleans compare numerically when kinds differ.
    pub fn loose_eq(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_) | Value::Str(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_))
            | (Value::Number(_) | Value::Bool(_), Value::Str(_)) => {
                self.to_number() == rhs.to_number()
            }
            _ => self.strict_eq(rhs),
        }
    }

    /// Relational ordering: lexicographic for two strings, numeric
    /// otherwise.  `None` when either side is NaN after coercion.
    pub fn compare(&self, rhs: &Value) -> Option<Ordering> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&rhs.to_number()),
        }
    }
}

fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if !t.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')) {
        return f64::NAN;
    }
    t.parse().unwrap_or(f64::NAN)
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

// ── RawValue ──────────────────────────────────────────────────────────────────

/// A host callable.  Never reachable from an expression.
pub type HostFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Unsanitized host data.
#[derive(Clone)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<RawValue>),
    Map(IndexMap<String, RawValue>),
    Function(HostFn),
    Object(Arc<dyn HostObject>),
}

/// The mapping a host passes to `evaluate` / `interpolate`.
pub type RawContext = IndexMap<String, RawValue>;

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "Null"),
            RawValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            RawValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            RawValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            RawValue::List(items) => f.debug_tuple("List").field(items).finish(),
            RawValue::Map(map) => f.debug_tuple("Map").field(map).finish(),
            RawValue::Function(_) => write!(f, "Function(..)"),
            RawValue::Object(_) => write!(f, "Object(..)"),
        }
    }
}

impl RawValue {
    pub fn function(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        RawValue::Function(Arc::new(f))
    }

    pub fn object(obj: impl HostObject + 'static) -> Self {
        RawValue::Object(Arc::new(obj))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, RawValue::Function(_))
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<f64> for RawValue {
    fn from(x: f64) -> Self {
        RawValue::Number(x)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Str(s)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Str(s.to_owned())
    }
}

impl From<Vec<RawValue>> for RawValue {
    fn from(items: Vec<RawValue>) -> Self {
        RawValue::List(items)
    }
}

impl From<IndexMap<String, RawValue>> for RawValue {
    fn from(map: IndexMap<String, RawValue>) -> Self {
        RawValue::Map(map)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
