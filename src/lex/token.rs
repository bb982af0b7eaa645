use std::fmt;

use crate::Value;

/// A single lexed token with the byte offset it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Literal text between structural characters.
    Text(String),
    /// `/`
    Slash,
    /// `:`
    VariableOpen,
    /// A variable name after `:`, or a rule name inside a rule list.
    Identifier(String),
    /// `[`
    OptionalOpen,
    /// `]`
    OptionalClose,
    /// `(` directly after a variable name.
    RuleListOpen,
    /// `)` closing a rule list.
    RuleListClose,
    /// `,` between two rules.
    Comma,
    /// A rule's whole parenthesized argument list.
    Arguments(Vec<Value>),
    /// `=` introducing a default value.
    Equals,
    Eof,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text(text) => write!(f, "text \"{text}\""),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::VariableOpen => f.write_str("':'"),
            TokenKind::Identifier(name) => write!(f, "identifier \"{name}\""),
            TokenKind::OptionalOpen => f.write_str("'['"),
            TokenKind::OptionalClose => f.write_str("']'"),
            TokenKind::RuleListOpen => f.write_str("'('"),
            TokenKind::RuleListClose => f.write_str("')'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Arguments(args) => write!(f, "argument list of {} value(s)", args.len()),
            TokenKind::Equals => f.write_str("'='"),
            TokenKind::Eof => f.write_str("end of template"),
        }
    }
}
