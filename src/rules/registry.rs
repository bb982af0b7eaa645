use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::{CompileError, Value};

use super::{Rule, VariableRule};

/// Builds a custom rule from its raw template arguments. An `Err` carries a
/// human-readable reason and is reported as
/// [`CompileError::InvalidRuleArgument`].
pub type RuleFactory = dyn Fn(&[Value]) -> Result<Arc<dyn Rule>, String> + Send + Sync;

/// Resolves rule slugs to bound rules at compile time.
///
/// The built-in rules are always available. Custom factories registered under
/// the same slug as a built-in take precedence over it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use routemill::{Rule, RuleRegistry};
///
/// #[derive(Debug)]
/// struct Even;
///
/// impl Rule for Even {
///     fn slug(&self) -> &str {
///         "even"
///     }
///
///     fn passes(&self, value: &str) -> bool {
///         value.parse::<i64>().is_ok_and(|n| n % 2 == 0)
///     }
/// }
///
/// let registry = RuleRegistry::new().with_rule("even", |_| Ok(Arc::new(Even)));
/// assert!(registry.contains("even"));
/// assert!(registry.contains("int"));
/// ```
#[derive(Clone, Default)]
pub struct RuleRegistry {
    custom: HashMap<String, Arc<RuleFactory>>,
}

const BUILTIN_SLUGS: &[&str] = &[
    "int",
    "float",
    "uuidv4",
    "alphanumeric",
    "regex",
    "in",
    "min",
    "max",
    "between",
];

impl RuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom rule factory under `slug`.
    pub fn register<F>(&mut self, slug: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Arc<dyn Rule>, String> + Send + Sync + 'static,
    {
        self.custom.insert(slug.into(), Arc::new(factory));
        self
    }

    /// Chaining form of [`register`](Self::register).
    #[must_use]
    pub fn with_rule<F>(mut self, slug: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Arc<dyn Rule>, String> + Send + Sync + 'static,
    {
        self.register(slug, factory);
        self
    }

    /// Whether `slug` names a built-in or registered rule.
    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.custom.contains_key(slug) || BUILTIN_SLUGS.contains(&slug)
    }

    /// Construct the rule `slug` bound to `arguments`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnknownRule`] if no rule is registered under
    /// `slug` (the `variable` field is left empty for the caller to fill), or
    /// [`CompileError::InvalidRuleArgument`] if the arguments do not fit.
    pub fn get(&self, slug: &str, arguments: &[Value]) -> Result<VariableRule, CompileError> {
        if let Some(factory) = self.custom.get(slug) {
            return factory(arguments)
                .map(VariableRule::Custom)
                .map_err(|reason| invalid(slug, reason));
        }
        match slug {
            "int" => no_arguments(slug, arguments).map(|()| VariableRule::Int),
            "float" => no_arguments(slug, arguments).map(|()| VariableRule::Float),
            "uuidv4" => no_arguments(slug, arguments).map(|()| VariableRule::UuidV4),
            "alphanumeric" => no_arguments(slug, arguments).map(|()| VariableRule::Alphanumeric),
            "regex" => regex_rule(arguments),
            "in" => {
                if arguments.is_empty() {
                    return Err(invalid(slug, "expected at least 1 argument, got 0"));
                }
                Ok(VariableRule::In(arguments.to_vec()))
            }
            "min" => {
                arity(slug, arguments, 1, 2)?;
                Ok(VariableRule::Min {
                    min: number(slug, &arguments[0])?,
                    inclusive: inclusive_flag(slug, arguments.get(1))?,
                })
            }
            "max" => {
                arity(slug, arguments, 1, 2)?;
                Ok(VariableRule::Max {
                    max: number(slug, &arguments[0])?,
                    inclusive: inclusive_flag(slug, arguments.get(1))?,
                })
            }
            "between" => {
                arity(slug, arguments, 2, 3)?;
                let min = number(slug, &arguments[0])?;
                let max = number(slug, &arguments[1])?;
                if min > max {
                    return Err(invalid(slug, format!("minimum {min} exceeds maximum {max}")));
                }
                Ok(VariableRule::Between {
                    min,
                    max,
                    inclusive: inclusive_flag(slug, arguments.get(2))?,
                })
            }
            _ => Err(CompileError::UnknownRule {
                slug: slug.to_owned(),
                variable: String::new(),
            }),
        }
    }
}

fn invalid(slug: &str, reason: impl Into<String>) -> CompileError {
    CompileError::InvalidRuleArgument {
        slug: slug.to_owned(),
        reason: reason.into(),
    }
}

fn no_arguments(slug: &str, arguments: &[Value]) -> Result<(), CompileError> {
    arity(slug, arguments, 0, 0)
}

fn arity(slug: &str, arguments: &[Value], min: usize, max: usize) -> Result<(), CompileError> {
    let n = arguments.len();
    if n >= min && n <= max {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min} or {max}")
    };
    Err(invalid(slug, format!("expected {expected} arguments, got {n}")))
}

fn number(slug: &str, value: &Value) -> Result<f64, CompileError> {
    value
        .as_f64()
        .ok_or_else(|| invalid(slug, format!("expected a number, got '{value}'")))
}

fn inclusive_flag(slug: &str, value: Option<&Value>) -> Result<bool, CompileError> {
    match value {
        None => Ok(true),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| invalid(slug, format!("expected true or false, got '{v}'"))),
    }
}

fn regex_rule(arguments: &[Value]) -> Result<VariableRule, CompileError> {
    arity("regex", arguments, 1, 1)?;
    let pattern = arguments[0].to_string();
    Regex::new(&pattern)
        .map(VariableRule::Regex)
        .map_err(|e| invalid("regex", e.to_string()))
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        custom.sort_unstable();
        f.debug_struct("RuleRegistry")
            .field("builtin", &BUILTIN_SLUGS)
            .field("custom", &custom)
            .finish()
    }
}
