use crate::lex::{Token, TokenKind};

use super::error::SyntaxError;
use super::node::{RuleInvocation, SyntaxNode};

/// Cursor over a token slice. Running past the end reads as end-of-stream,
/// so callers do not need a trailing `Eof` token.
struct TokenStream<'t> {
    tokens: &'t [Token],
    cursor: usize,
    end: usize,
}

impl<'t> TokenStream<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let end = tokens.last().map_or(0, |t| t.position);
        Self {
            tokens,
            cursor: 0,
            end,
        }
    }

    fn current(&self) -> Option<&'t TokenKind> {
        self.tokens.get(self.cursor).map(|t| &t.kind)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.cursor).map_or(self.end, |t| t.position)
    }

    fn advance(&mut self) {
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
    }

    fn error(&self, expected: &str) -> SyntaxError {
        let found = self
            .current()
            .map_or_else(|| TokenKind::Eof.to_string(), ToString::to_string);
        SyntaxError::new(self.position(), expected, found)
    }
}

/// Deepest nesting of optional segments a template may use.
pub(crate) const MAX_OPTIONAL_DEPTH: usize = 128;

pub(crate) fn parse_template(tokens: &[Token]) -> Result<SyntaxNode, SyntaxError> {
    let mut stream = TokenStream::new(tokens);
    let children = parse_sequence(&mut stream, 0)?;
    Ok(SyntaxNode::Root(children))
}

/// Parse segments until end of stream, or until the `]` closing the enclosing
/// optional when `depth` is non-zero. The `]` itself is left unconsumed.
fn parse_sequence(
    stream: &mut TokenStream<'_>,
    depth: usize,
) -> Result<Vec<SyntaxNode>, SyntaxError> {
    let inside_optional = depth > 0;
    let mut nodes = Vec::new();
    loop {
        match stream.current() {
            None | Some(TokenKind::Eof) => {
                if inside_optional {
                    return Err(stream.error("']'"));
                }
                return Ok(nodes);
            }
            Some(TokenKind::OptionalClose) => {
                if inside_optional {
                    return Ok(nodes);
                }
                return Err(stream.error("literal text, variable, or '['"));
            }
            Some(TokenKind::Text(text)) => {
                push_literal(&mut nodes, text);
                stream.advance();
            }
            Some(TokenKind::Slash) => {
                push_literal(&mut nodes, "/");
                stream.advance();
            }
            Some(TokenKind::VariableOpen) => nodes.push(parse_variable(stream)?),
            Some(TokenKind::OptionalOpen) => nodes.push(parse_optional(stream, depth + 1)?),
            Some(_) => return Err(stream.error("literal text, variable, or '['")),
        }
    }
}

fn push_literal(nodes: &mut Vec<SyntaxNode>, text: &str) {
    if let Some(SyntaxNode::Literal(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(SyntaxNode::Literal(text.to_owned()));
    }
}

fn parse_optional(stream: &mut TokenStream<'_>, depth: usize) -> Result<SyntaxNode, SyntaxError> {
    let open = stream.position();
    if depth > MAX_OPTIONAL_DEPTH {
        return Err(SyntaxError::new(
            open,
            format!("at most {MAX_OPTIONAL_DEPTH} nested optional segments"),
            "'['",
        ));
    }
    stream.advance();
    let children = parse_sequence(stream, depth)?;
    if children.is_empty() {
        return Err(SyntaxError::new(
            open,
            "a non-empty optional segment",
            "'[]'",
        ));
    }
    // parse_sequence only returns inside an optional when sitting on `]`.
    stream.advance();
    Ok(SyntaxNode::Optional(children))
}

fn parse_variable(stream: &mut TokenStream<'_>) -> Result<SyntaxNode, SyntaxError> {
    stream.advance();
    let name = match stream.current() {
        Some(TokenKind::Identifier(name)) => name.clone(),
        _ => return Err(stream.error("variable name")),
    };
    stream.advance();

    let rules = if stream.current() == Some(&TokenKind::RuleListOpen) {
        parse_rule_list(stream)?
    } else {
        Vec::new()
    };

    let default = if stream.current() == Some(&TokenKind::Equals) {
        stream.advance();
        match stream.current() {
            Some(TokenKind::Text(text)) => {
                let text = text.clone();
                stream.advance();
                Some(text)
            }
            _ => return Err(stream.error("default value")),
        }
    } else {
        None
    };

    Ok(SyntaxNode::Variable {
        name,
        rules,
        default,
    })
}

fn parse_rule_list(stream: &mut TokenStream<'_>) -> Result<Vec<RuleInvocation>, SyntaxError> {
    stream.advance();
    let mut rules = Vec::new();
    loop {
        let slug = match stream.current() {
            Some(TokenKind::Identifier(slug)) => slug.clone(),
            _ => return Err(stream.error("rule name")),
        };
        stream.advance();

        let arguments = match stream.current() {
            Some(TokenKind::Arguments(arguments)) => {
                let arguments = arguments.clone();
                stream.advance();
                arguments
            }
            _ => Vec::new(),
        };
        rules.push(RuleInvocation::new(slug, arguments));

        match stream.current() {
            Some(TokenKind::Comma) => stream.advance(),
            Some(TokenKind::RuleListClose) => {
                stream.advance();
                return Ok(rules);
            }
            _ => return Err(stream.error("',' or ')'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::lex::tokenize;
    use crate::parse::parse;
    use crate::Value;

    use super::*;

    fn parse_str(raw: &str) -> Result<SyntaxNode, SyntaxError> {
        parse(&tokenize(raw))
    }

    fn literal(s: &str) -> SyntaxNode {
        SyntaxNode::Literal(s.to_owned())
    }

    fn var(name: &str) -> SyntaxNode {
        SyntaxNode::Variable {
            name: name.to_owned(),
            rules: Vec::new(),
            default: None,
        }
    }

    #[test]
    fn parse_literal_only() {
        let root = parse_str("users/list").unwrap();
        assert_eq!(root, SyntaxNode::Root(vec![literal("users/list")]));
    }

    #[test]
    fn parse_empty_template() {
        assert_eq!(parse_str("").unwrap(), SyntaxNode::Root(vec![]));
    }

    #[test]
    fn parse_simple_variable() {
        let root = parse_str("users/:userId").unwrap();
        assert_eq!(
            root,
            SyntaxNode::Root(vec![literal("users/"), var("userId")])
        );
    }

    #[test]
    fn parse_rules_and_arguments() {
        let root = parse_str(":month(int,min(1),max(12))").unwrap();
        match &root.children()[0] {
            SyntaxNode::Variable { name, rules, .. } => {
                assert_eq!(name, "month");
                assert_eq!(
                    rules,
                    &vec![
                        RuleInvocation::new("int", vec![]),
                        RuleInvocation::new("min", vec![Value::Int(1)]),
                        RuleInvocation::new("max", vec![Value::Int(12)]),
                    ]
                );
            }
            other => panic!("expected Variable, got {other:?}"),
        }
    }

    #[test]
    fn parse_default_value() {
        let root = parse_str(":page(int)=1").unwrap();
        match &root.children()[0] {
            SyntaxNode::Variable { default, .. } => assert_eq!(default.as_deref(), Some("1")),
            other => panic!("expected Variable, got {other:?}"),
        }
    }

    #[test]
    fn parse_archive_template() {
        let root = parse_str("books/archives/:year(int)[/:month(int,min(1),max(12))]").unwrap();
        let children = root.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], literal("books/archives/"));
        assert!(matches!(&children[1], SyntaxNode::Variable { name, .. } if name == "year"));
        match &children[2] {
            SyntaxNode::Optional(inner) => {
                assert_eq!(inner[0], literal("/"));
                assert!(matches!(&inner[1], SyntaxNode::Variable { name, .. } if name == "month"));
            }
            other => panic!("expected Optional, got {other:?}"),
        }
    }

    #[test]
    fn parse_nested_optionals() {
        let root = parse_str("a[/:b[/:c]]").unwrap();
        match &root.children()[1] {
            SyntaxNode::Optional(outer) => {
                assert!(matches!(outer.last(), Some(SyntaxNode::Optional(_))));
            }
            other => panic!("expected Optional, got {other:?}"),
        }
        assert_eq!(root.variable_names(), vec!["b", "c"]);
    }

    #[test]
    fn unclosed_optional_fails() {
        let err = parse_str("a[/:b").unwrap_err();
        assert_eq!(err.expected(), "']'");
        assert_eq!(err.position(), 5);
    }

    #[test]
    fn stray_close_fails() {
        let err = parse_str("a]b").unwrap_err();
        assert_eq!(err.position(), 1);
    }

    #[test]
    fn empty_optional_fails() {
        let err = parse_str("a[]").unwrap_err();
        assert_eq!(err.position(), 1);
        assert_eq!(err.expected(), "a non-empty optional segment");
    }

    #[test]
    fn colon_without_name_fails() {
        let err = parse_str("a/:/b").unwrap_err();
        assert_eq!(err.expected(), "variable name");
        assert_eq!(err.position(), 3);
    }

    #[test]
    fn unclosed_rule_list_fails() {
        let err = parse_str(":x(int").unwrap_err();
        assert_eq!(err.expected(), "',' or ')'");
    }

    #[test]
    fn unclosed_argument_list_fails() {
        assert!(parse_str(":x(min(1").is_err());
        assert!(parse_str(":x(min(1)").is_err());
    }

    #[test]
    fn empty_rule_list_fails() {
        let err = parse_str(":x()").unwrap_err();
        assert_eq!(err.expected(), "rule name");
    }

    #[test]
    fn missing_default_text_fails() {
        let err = parse_str(":x=/y").unwrap_err();
        assert_eq!(err.expected(), "default value");
    }

    #[test]
    fn unknown_rule_names_are_accepted_by_the_parser() {
        assert!(parse_str(":x(nonexistent)").is_ok());
    }

    #[test]
    fn parser_works_without_trailing_eof() {
        let mut tokens = tokenize("a/:b");
        tokens.pop();
        let root = parse(&tokens).unwrap();
        assert_eq!(root.variable_names(), vec!["b"]);
    }

    #[test]
    fn display_round_trips_template_syntax() {
        let raw = "books/:year(int)[/:month(int,min(1))]";
        assert_eq!(parse_str(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let depth = MAX_OPTIONAL_DEPTH;
        let raw = format!("{}{}", "[a".repeat(depth), "]".repeat(depth));
        assert!(parse_str(&raw).is_ok());
    }

    #[test]
    fn nesting_past_the_limit_fails() {
        let depth = MAX_OPTIONAL_DEPTH + 1;
        let raw = format!("{}{}", "[a".repeat(depth), "]".repeat(depth));
        let err = parse_str(&raw).unwrap_err();
        assert_eq!(err.position(), 2 * MAX_OPTIONAL_DEPTH);
        assert_eq!(err.found(), "'['");
    }
}
