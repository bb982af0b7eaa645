//! Variable validation rules.
//!
//! Built-in rules are a closed set of [`VariableRule`] variants, resolved by
//! slug when a template is compiled. Applications extend the set by
//! implementing [`Rule`] and registering a factory with a [`RuleRegistry`].

mod builtin;
mod registry;

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::types::ValueType;
use crate::Value;

pub use registry::{RuleFactory, RuleRegistry};

/// A stateless predicate over a captured variable.
///
/// Implementations must be pure: the same input always yields the same
/// answer, so a compiled collection can be matched from many threads.
pub trait Rule: fmt::Debug + Send + Sync {
    /// The name this rule is invoked by in templates.
    fn slug(&self) -> &str;

    /// Whether `value` satisfies the rule.
    fn passes(&self, value: &str) -> bool;
}

/// A rule bound to its arguments.
#[derive(Debug, Clone)]
pub enum VariableRule {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `uuidv4`
    UuidV4,
    /// `alphanumeric`
    Alphanumeric,
    /// `regex(pattern)`
    Regex(Regex),
    /// `in(a, b, ...)`; each member compares in its own declared type.
    In(Vec<Value>),
    /// `min(n[, inclusive])`
    Min { min: f64, inclusive: bool },
    /// `max(n[, inclusive])`
    Max { max: f64, inclusive: bool },
    /// `between(min, max[, inclusive])`
    Between { min: f64, max: f64, inclusive: bool },
    Custom(Arc<dyn Rule>),
}

impl VariableRule {
    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            VariableRule::Int => "int",
            VariableRule::Float => "float",
            VariableRule::UuidV4 => "uuidv4",
            VariableRule::Alphanumeric => "alphanumeric",
            VariableRule::Regex(_) => "regex",
            VariableRule::In(_) => "in",
            VariableRule::Min { .. } => "min",
            VariableRule::Max { .. } => "max",
            VariableRule::Between { .. } => "between",
            VariableRule::Custom(rule) => rule.slug(),
        }
    }

    #[must_use]
    pub fn passes(&self, value: &str) -> bool {
        match self {
            VariableRule::Int => builtin::is_int(value),
            VariableRule::Float => builtin::is_float(value),
            VariableRule::UuidV4 => builtin::is_uuid_v4(value),
            VariableRule::Alphanumeric => builtin::is_alphanumeric(value),
            VariableRule::Regex(regex) => regex.is_match(value),
            VariableRule::In(members) => members.iter().any(|m| m.matches_raw(value)),
            VariableRule::Min { min, inclusive } => {
                builtin::as_number(value).is_some_and(|n| builtin::above(n, *min, *inclusive))
            }
            VariableRule::Max { max, inclusive } => {
                builtin::as_number(value).is_some_and(|n| builtin::below(n, *max, *inclusive))
            }
            VariableRule::Between {
                min,
                max,
                inclusive,
            } => builtin::as_number(value).is_some_and(|n| {
                builtin::above(n, *min, *inclusive) && builtin::below(n, *max, *inclusive)
            }),
            VariableRule::Custom(rule) => rule.passes(value),
        }
    }

    /// The type a value that passed this rule is returned as, if the rule
    /// implies one.
    pub(crate) fn value_type(&self) -> Option<ValueType> {
        match self {
            VariableRule::Int => Some(ValueType::Int),
            VariableRule::Float => Some(ValueType::Float),
            _ => None,
        }
    }
}

impl Rule for VariableRule {
    fn slug(&self) -> &str {
        VariableRule::slug(self)
    }

    fn passes(&self, value: &str) -> bool {
        VariableRule::passes(self, value)
    }
}
