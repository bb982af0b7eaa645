use std::collections::HashMap;

use proptest::prelude::*;
use routemill::Value;

/// One `/`-separated piece of a generated template, with the value the
/// request will carry for it.
#[derive(Debug, Clone)]
pub enum GenSegment {
    Literal(String),
    /// `:name(int)` matched by an integer.
    Int(i64),
    /// `:name` matched by an arbitrary path-safe word.
    Word(String),
    /// `:name(regex("..."),in("...", ...))` matched by `value`. The other
    /// members are awkward strings that only have to survive lexing.
    Member { value: String, others: Vec<String> },
}

/// Quote a rule argument the way the lexer reads quoted strings back.
pub fn quote(text: &str) -> String {
    let mut out = String::from("\"");
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// A path template built from literal and variable segments, along with a full
/// set of values for its variables.
#[derive(Debug, Clone)]
pub struct GenRoute {
    pub segments: Vec<GenSegment>,
}

impl GenRoute {
    fn variable_name(index: usize) -> String {
        format!("v{index}")
    }

    pub fn template(&self) -> String {
        let parts: Vec<String> = self
            .segments
            .iter()
            .enumerate()
            .map(|(i, segment)| match segment {
                GenSegment::Literal(text) => text.clone(),
                GenSegment::Int(_) => format!(":{}(int)", Self::variable_name(i)),
                GenSegment::Word(_) => format!(":{}", Self::variable_name(i)),
                GenSegment::Member { value, others } => {
                    let members: Vec<String> = others
                        .iter()
                        .chain(std::iter::once(value))
                        .map(|m| quote(m))
                        .collect();
                    format!(
                        ":{}(regex({}),in({}))",
                        Self::variable_name(i),
                        quote("^[A-Za-z0-9_.~-]{1,12}$"),
                        members.join(",")
                    )
                }
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    pub fn values(&self) -> HashMap<String, Value> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, segment)| match segment {
                GenSegment::Literal(_) => None,
                GenSegment::Int(n) => Some((Self::variable_name(i), Value::Int(*n))),
                GenSegment::Word(w) | GenSegment::Member { value: w, .. } => {
                    Some((Self::variable_name(i), Value::String(w.clone())))
                }
            })
            .collect()
    }
}

pub fn arb_word() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.~-]{1,12}"
}

fn arb_segment() -> impl Strategy<Value = GenSegment> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(GenSegment::Literal),
        any::<i64>().prop_map(GenSegment::Int),
        arb_word().prop_map(GenSegment::Word),
        (arb_word(), prop::collection::vec(arb_rule_argument(), 0..4))
            .prop_map(|(value, others)| GenSegment::Member { value, others }),
    ]
}

pub fn arb_route() -> impl Strategy<Value = GenRoute> {
    prop::collection::vec(arb_segment(), 1..8).prop_map(|segments| GenRoute { segments })
}

/// Strings dense in template punctuation, for exercising the lexer and parser
/// on malformed input.
pub fn arb_template_text() -> impl Strategy<Value = String> {
    prop_oneof![
        ".{0,40}",
        "[a-z0-9:/\\[\\]()=,\" ]{0,40}",
    ]
}

/// String arguments that look like other things: numbers, booleans, and text
/// holding separators, quotes or backslashes.
pub fn arb_rule_argument() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("12".to_owned()),
        Just("true".to_owned()),
        Just("1.5".to_owned()),
        Just(String::new()),
        "[a-z,()\\[\\]/:=\"\\\\ ]{0,10}",
    ]
}

/// A captured value that may or may not be an integer.
pub fn arb_raw_value() -> impl Strategy<Value = String> {
    prop_oneof![
        (-50_i64..50).prop_map(|n| n.to_string()),
        "[a-z]{1,6}",
    ]
}
