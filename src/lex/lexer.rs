use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::Value;

use super::token::{Token, TokenKind};

// -- Character classes ------------------------------------------------------

fn is_structural(c: char) -> bool {
    matches!(c, ':' | '[' | ']' | '/')
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn ends_default(c: char) -> bool {
    matches!(c, '/' | '[' | ']' | ':' | '(' | ')' | ',')
}

// -- Sub-lexers -------------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., is_identifier_start),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn text_run<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| !is_structural(c)).parse_next(input)
}

fn default_text<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(0.., |c: char| !ends_default(c)).parse_next(input)
}

fn bare_argument<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| !matches!(c, ',' | '(' | ')')).parse_next(input)
}

fn quoted(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        match any.parse_next(input)? {
            '"' => return Ok(s),
            '\\' => match any.parse_next(input)? {
                '"' => s.push('"'),
                '\\' => s.push('\\'),
                other => {
                    s.push('\\');
                    s.push(other);
                }
            },
            c => s.push(c),
        }
    }
}

// -- Driver -----------------------------------------------------------------

/// Split a raw template into tokens.
///
/// Never fails: anything that is not grammar punctuation becomes literal
/// text, and malformed constructs are left for the parser to reject. The
/// returned sequence always ends with [`TokenKind::Eof`].
#[must_use]
pub fn tokenize(raw: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        source: raw,
        input: raw,
        tokens: Vec::new(),
    };
    lexer.lex_segments();
    let end = lexer.position();
    lexer.tokens.push(Token::new(TokenKind::Eof, end));
    lexer.tokens
}

struct Lexer<'s> {
    source: &'s str,
    input: &'s str,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn position(&self) -> usize {
        self.source.len() - self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.input = &self.input[c.len_utf8()..];
        }
    }

    fn emit(&mut self, kind: TokenKind, position: usize) {
        self.tokens.push(Token::new(kind, position));
    }

    fn punct(&mut self, kind: TokenKind) {
        let position = self.position();
        self.bump();
        self.emit(kind, position);
    }

    fn lex_segments(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ':' => {
                    self.punct(TokenKind::VariableOpen);
                    self.lex_variable();
                }
                '[' => self.punct(TokenKind::OptionalOpen),
                ']' => self.punct(TokenKind::OptionalClose),
                '/' => self.punct(TokenKind::Slash),
                _ => self.lex_text(),
            }
        }
    }

    fn lex_text(&mut self) {
        let position = self.position();
        if let Ok(text) = text_run.parse_next(&mut self.input) {
            self.emit(TokenKind::Text(text.to_owned()), position);
        } else if let Some(c) = self.peek() {
            self.bump();
            self.emit(TokenKind::Text(c.to_string()), position);
        }
    }

    fn lex_variable(&mut self) {
        let position = self.position();
        let Ok(name) = identifier.parse_next(&mut self.input) else {
            return;
        };
        self.emit(TokenKind::Identifier(name.to_owned()), position);

        if self.peek() == Some('(') {
            self.lex_rule_list();
        }

        if self.peek() == Some('=') {
            self.punct(TokenKind::Equals);
            let position = self.position();
            if let Ok(text) = default_text.parse_next(&mut self.input) {
                if !text.is_empty() {
                    self.emit(TokenKind::Text(text.to_owned()), position);
                }
            }
        }
    }

    fn lex_rule_list(&mut self) {
        self.punct(TokenKind::RuleListOpen);
        loop {
            let _ = ws.parse_next(&mut self.input);
            let Some(c) = self.peek() else {
                return;
            };
            match c {
                ')' => {
                    self.punct(TokenKind::RuleListClose);
                    return;
                }
                ',' => self.punct(TokenKind::Comma),
                c if is_identifier_start(c) => {
                    let position = self.position();
                    if let Ok(name) = identifier.parse_next(&mut self.input) {
                        self.emit(TokenKind::Identifier(name.to_owned()), position);
                    }
                    if self.peek() == Some('(') {
                        self.lex_arguments();
                    }
                }
                // Hand the rest back to the segment lexer; the parser reports
                // the unterminated rule list.
                _ => return,
            }
        }
    }

    /// Lex `( arg, arg, ... )` into one [`TokenKind::Arguments`] token. Nothing
    /// is emitted when the list is unterminated or malformed.
    fn lex_arguments(&mut self) {
        let position = self.position();
        self.bump();
        let mut arguments = Vec::new();
        loop {
            let _ = ws.parse_next(&mut self.input);
            match self.peek() {
                None | Some('(') => return,
                Some(')') => {
                    self.bump();
                    self.emit(TokenKind::Arguments(arguments), position);
                    return;
                }
                Some(',') => self.bump(),
                Some('"') => match quoted.parse_next(&mut self.input) {
                    Ok(s) => arguments.push(Value::String(s)),
                    Err(_) => return,
                },
                Some(_) => match bare_argument.parse_next(&mut self.input) {
                    Ok(raw) => arguments.push(Value::from_literal(raw.trim())),
                    Err(_) => return,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(raw: &str) -> Vec<TokenKind> {
        tokenize(raw).into_iter().map(|t| t.kind).collect()
    }

    fn text(s: &str) -> TokenKind {
        TokenKind::Text(s.to_owned())
    }

    fn ident(s: &str) -> TokenKind {
        TokenKind::Identifier(s.to_owned())
    }

    #[test]
    fn empty_template_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn literal_path() {
        assert_eq!(
            kinds("users/list"),
            vec![text("users"), TokenKind::Slash, text("list"), TokenKind::Eof]
        );
    }

    #[test]
    fn simple_variable() {
        assert_eq!(
            kinds("users/:userId"),
            vec![
                text("users"),
                TokenKind::Slash,
                TokenKind::VariableOpen,
                ident("userId"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn variable_name_stops_at_non_identifier() {
        assert_eq!(
            kinds(":sub.example.com"),
            vec![
                TokenKind::VariableOpen,
                ident("sub"),
                text(".example.com"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn rule_list_with_arguments() {
        assert_eq!(
            kinds(":month(int,min(1),max(12))"),
            vec![
                TokenKind::VariableOpen,
                ident("month"),
                TokenKind::RuleListOpen,
                ident("int"),
                TokenKind::Comma,
                ident("min"),
                TokenKind::Arguments(vec![Value::Int(1)]),
                TokenKind::Comma,
                ident("max"),
                TokenKind::Arguments(vec![Value::Int(12)]),
                TokenKind::RuleListClose,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn in_list_is_one_argument_token() {
        assert_eq!(
            kinds(":x(in(1,2,3))"),
            vec![
                TokenKind::VariableOpen,
                ident("x"),
                TokenKind::RuleListOpen,
                ident("in"),
                TokenKind::Arguments(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
                TokenKind::RuleListClose,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn mixed_argument_types() {
        let tokens = kinds(r#":x(between(1.5, 10, false), in(a, "b,c"))"#);
        assert!(tokens.contains(&TokenKind::Arguments(vec![
            Value::Float(1.5),
            Value::Int(10),
            Value::Bool(false)
        ])));
        assert!(tokens.contains(&TokenKind::Arguments(vec![
            Value::String("a".into()),
            Value::String("b,c".into())
        ])));
    }

    #[test]
    fn quoted_argument_keeps_regex_punctuation() {
        let tokens = kinds(r#":code(regex("^[a-z]{2,3}$"))"#);
        assert!(tokens.contains(&TokenKind::Arguments(vec![Value::String(
            "^[a-z]{2,3}$".into()
        )])));
    }

    #[test]
    fn optional_brackets() {
        assert_eq!(
            kinds("a[/:b]"),
            vec![
                text("a"),
                TokenKind::OptionalOpen,
                TokenKind::Slash,
                TokenKind::VariableOpen,
                ident("b"),
                TokenKind::OptionalClose,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn default_value() {
        assert_eq!(
            kinds(":page(int)=1/x"),
            vec![
                TokenKind::VariableOpen,
                ident("page"),
                TokenKind::RuleListOpen,
                ident("int"),
                TokenKind::RuleListClose,
                TokenKind::Equals,
                text("1"),
                TokenKind::Slash,
                text("x"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn punctuation_outside_variables_is_text() {
        assert_eq!(
            kinds("a(b),c=d"),
            vec![text("a(b),c=d"), TokenKind::Eof]
        );
    }

    #[test]
    fn colon_without_identifier() {
        assert_eq!(
            kinds("a:1"),
            vec![
                text("a"),
                TokenKind::VariableOpen,
                text("1"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_argument_list_emits_no_arguments() {
        assert_eq!(
            kinds(":x(min(1"),
            vec![
                TokenKind::VariableOpen,
                ident("x"),
                TokenKind::RuleListOpen,
                ident("min"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn positions_are_byte_offsets() {
        let tokens = tokenize("ab/:id");
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 2, 3, 4, 6]);
    }

    #[test]
    fn non_ascii_literals() {
        assert_eq!(
            kinds("café/:id"),
            vec![
                text("café"),
                TokenKind::Slash,
                TokenKind::VariableOpen,
                ident("id"),
                TokenKind::Eof
            ]
        );
    }
}
