use std::fmt;

/// A typed value: a route variable after coercion, a rule argument, or a
/// route attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string.
    String(String),
}

/// The type a captured variable is coerced to before it is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    String,
}

impl Value {
    /// Classify a raw lexed literal: integers, then floats, then booleans,
    /// falling back to a string.
    #[must_use]
    pub fn from_literal(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
        if looks_numeric(raw) {
            if let Ok(f) = raw.parse::<f64>() {
                if f.is_finite() {
                    return Value::Float(f);
                }
            }
        }
        match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_owned()),
        }
    }

    /// Coerce a raw captured string to `ty`. Falls back to a string when the
    /// raw text does not parse; rules run before coercion, so this only happens
    /// for untyped variables.
    #[must_use]
    pub fn coerce(raw: &str, ty: ValueType) -> Self {
        match ty {
            ValueType::Int => raw
                .parse::<i64>()
                .map_or_else(|_| Value::String(raw.to_owned()), Value::Int),
            ValueType::Float => raw
                .parse::<f64>()
                .map_or_else(|_| Value::String(raw.to_owned()), Value::Float),
            ValueType::String => Value::String(raw.to_owned()),
        }
    }

    /// Numeric view used by the range rules.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(_) | Value::String(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Whether a raw captured string equals this value, compared in this
    /// value's own type.
    #[must_use]
    pub fn matches_raw(&self, raw: &str) -> bool {
        match self {
            Value::Int(v) => raw.parse::<i64>().is_ok_and(|parsed| parsed == *v),
            Value::Float(v) => raw.parse::<f64>().is_ok_and(|parsed| parsed == *v),
            Value::Bool(v) => match raw {
                "true" => *v,
                "false" => !*v,
                _ => false,
            },
            Value::String(v) => v == raw,
        }
    }
}

fn looks_numeric(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Renders the value the way it appears inside a URI: strings are written
/// raw, without quotes.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}
