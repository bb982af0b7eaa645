mod error;
mod node;
mod parser;

pub use error::SyntaxError;
pub use node::{RuleInvocation, SyntaxNode};

use crate::lex::Token;

/// Parse a token stream into a [`SyntaxNode::Root`].
///
/// Only the shape of rule lists is checked here; whether a rule slug exists
/// is decided by the compiler against a [`RuleRegistry`](crate::RuleRegistry).
///
/// # Errors
///
/// Returns [`SyntaxError`] if the tokens do not form a valid template.
pub fn parse(tokens: &[Token]) -> Result<SyntaxNode, SyntaxError> {
    parser::parse_template(tokens)
}

/// Tokenize and parse a raw template string in one step.
///
/// # Errors
///
/// Returns [`SyntaxError`] if the template is malformed.
pub fn parse_str(raw: &str) -> Result<SyntaxNode, SyntaxError> {
    parse(&crate::lex::tokenize(raw))
}
