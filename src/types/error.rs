use thiserror::Error;

use crate::parse::SyntaxError;

/// A malformed route declaration. Always fatal: these are raised while the
/// route collection is built and indicate a programming error.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid template '{template}': {source}")]
    Syntax {
        template: String,
        #[source]
        source: SyntaxError,
    },

    #[error("unknown rule '{slug}' on variable '{variable}'")]
    UnknownRule { slug: String, variable: String },

    #[error("invalid arguments for rule '{slug}': {reason}")]
    InvalidRuleArgument { slug: String, reason: String },

    #[error("duplicate variable name '{name}'")]
    DuplicateVariableName { name: String },

    #[error("default value '{value}' of variable '{variable}' fails its own rules")]
    InvalidDefault { variable: String, value: String },

    #[error("failed to build match pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("route '{template}' has no action")]
    MissingAction { template: String },

    #[error("duplicate route name '{name}'")]
    DuplicateRouteName { name: String },
}

/// Why a request did not resolve to a route. Ordinary per-request outcomes,
/// not bugs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no route matches the request")]
    RouteNotFound,

    #[error("method {method} not allowed; allowed: {}", allowed.join(", "))]
    MethodNotAllowed { method: String, allowed: Vec<String> },
}

impl MatchError {
    /// The HTTP status a caller would typically answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            MatchError::RouteNotFound => 404,
            MatchError::MethodNotAllowed { .. } => 405,
        }
    }
}

/// Failures of named-route lookup and reverse URI generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("no route named '{name}'")]
    RouteNotFound { name: String },

    #[error("no value supplied for required variable '{name}'")]
    MissingVariable { name: String },

    #[error("value '{value}' of variable '{name}' does not fit in one segment")]
    InvalidValue { name: String, value: String },
}
