use thiserror::Error;

use crate::parse::SyntaxError;
use crate::{CompileError, MatchError, UriError};

/// Unified error type for callers that handle every router failure in one
/// place.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Uri(#[from] UriError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
