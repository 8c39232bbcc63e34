// src/table/value.rs

use std::fmt;
use std::hash::{Hash, Hasher};

use super::utils::clean_str;

/// A single cell.
///
/// `Missing` is distinct from `Str("null")` and from numeric zero. Equality and
/// hashing are total so whole rows can be used as dedupe keys; floats compare
/// by bit pattern after folding `-0.0` into `0.0` and every NaN into one.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell. Strings are *not* parsed here; use
    /// [`Value::coerce_numeric`] for that.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Parse the cell as a number, recovering any failure as `Missing`.
    pub fn coerce_numeric(&self) -> Value {
        match self {
            Value::Int(i) => Value::Float(*i as f64),
            Value::Float(f) if f.is_nan() => Value::Missing,
            Value::Float(f) => Value::Float(*f),
            Value::Str(s) => match clean_str(s).parse::<f64>() {
                Ok(f) if f.is_finite() => Value::Float(f),
                _ => Value::Missing,
            },
            Value::Missing => Value::Missing,
        }
    }

    /// Render the cell as a string, keeping `Missing` missing.
    pub fn coerce_string(&self) -> Value {
        match self {
            Value::Missing => Value::Missing,
            Value::Str(s) => Value::Str(s.clone()),
            other => Value::Str(other.to_string()),
        }
    }

    /// Type a raw text cell: integer, then float, then string. Empty is missing.
    pub fn infer(raw: &str) -> Value {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Missing;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Int(i);
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::Str(raw.to_string()),
        }
    }

    fn float_bits(f: f64) -> u64 {
        if f.is_nan() {
            f64::NAN.to_bits()
        } else if f == 0.0 {
            0.0f64.to_bits()
        } else {
            f.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => Value::float_bits(*a) == Value::float_bits(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Missing, Value::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(i) => i.hash(state),
            Value::Float(f) => Value::float_bits(*f).hash(state),
            Value::Str(s) => s.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}
