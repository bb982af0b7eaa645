use std::fmt;

use crate::Value;

/// A rule named in a variable's rule list, with its raw lexed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleInvocation {
    pub slug: String,
    pub arguments: Vec<Value>,
}

impl RuleInvocation {
    pub fn new(slug: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            slug: slug.into(),
            arguments,
        }
    }
}

/// Template syntax tree. Each node owns its children; there are no parent
/// links.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Root(Vec<SyntaxNode>),
    Literal(String),
    Variable {
        name: String,
        rules: Vec<RuleInvocation>,
        default: Option<String>,
    },
    /// Never empty.
    Optional(Vec<SyntaxNode>),
}

impl SyntaxNode {
    /// Children of a `Root` or `Optional`; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            SyntaxNode::Root(children) | SyntaxNode::Optional(children) => children,
            SyntaxNode::Literal(_) | SyntaxNode::Variable { .. } => &[],
        }
    }

    /// Names of every variable in this subtree, in template order.
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_names(self, &mut names);
        names
    }
}

fn collect_names<'a>(node: &'a SyntaxNode, out: &mut Vec<&'a str>) {
    match node {
        SyntaxNode::Variable { name, .. } => out.push(name),
        SyntaxNode::Literal(_) => {}
        SyntaxNode::Root(children) | SyntaxNode::Optional(children) => {
            for child in children {
                collect_names(child, out);
            }
        }
    }
}

/// Writes the invocation so that it lexes back to the same arguments.
impl fmt::Display for RuleInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug)?;
        if !self.arguments.is_empty() {
            f.write_str("(")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write_argument(f, argument)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Strings are always quoted, so `"12"` stays a string and `"a,b"` stays one
/// argument. Floats keep their fractional part.
fn write_argument(f: &mut fmt::Formatter<'_>, argument: &Value) -> fmt::Result {
    match argument {
        Value::String(text) => {
            f.write_str("\"")?;
            for c in text.chars() {
                if matches!(c, '"' | '\\') {
                    f.write_str("\\")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str("\"")
        }
        Value::Float(v) => write!(f, "{v:?}"),
        other => write!(f, "{other}"),
    }
}

/// Writes the node back out in template syntax.
impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxNode::Root(children) => {
                for child in children {
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            SyntaxNode::Literal(text) => f.write_str(text),
            SyntaxNode::Variable {
                name,
                rules,
                default,
            } => {
                write!(f, ":{name}")?;
                if !rules.is_empty() {
                    let rules: Vec<String> = rules.iter().map(ToString::to_string).collect();
                    write!(f, "({})", rules.join(","))?;
                }
                if let Some(default) = default {
                    write!(f, "={default}")?;
                }
                Ok(())
            }
            SyntaxNode::Optional(children) => {
                f.write_str("[")?;
                for child in children {
                    write!(f, "{child}")?;
                }
                f.write_str("]")
            }
        }
    }
}
