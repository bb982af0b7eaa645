use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::parse::{RuleInvocation, SyntaxNode};
use crate::rules::{RuleRegistry, VariableRule};
use crate::types::{CompiledTemplate, CompiledVariable};
use crate::{CompileError, ValueType};

/// Where a variable sits, which decides what its capture group may span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Host,
    Path,
}

impl Part {
    fn capture_class(self) -> &'static str {
        match self {
            Part::Host => r"[^.\x00]+",
            Part::Path => "[^/]+",
        }
    }
}

struct PatternWriter<'r> {
    registry: &'r RuleRegistry,
    pattern: String,
    variables: Vec<CompiledVariable>,
    seen: HashSet<String>,
}

pub(crate) fn compile(
    path: &SyntaxNode,
    host: Option<&SyntaxNode>,
    registry: &RuleRegistry,
) -> Result<CompiledTemplate, CompileError> {
    let mut writer = PatternWriter {
        registry,
        pattern: String::from("^"),
        variables: Vec::new(),
        seen: HashSet::new(),
    };

    match host {
        Some(tree) => {
            writer.pattern.push_str("(?i:");
            writer.emit(tree, Part::Host, false)?;
            writer.pattern.push(')');
        }
        None => writer.pattern.push_str(r"[^\x00]*"),
    }
    writer.pattern.push_str(r"\x00");
    writer.emit(path, Part::Path, false)?;
    writer.pattern.push('$');

    let pattern = Regex::new(&writer.pattern)?;
    debug!(
        pattern = %pattern.as_str(),
        variables = writer.variables.len(),
        host = host.is_some(),
        "compiled template"
    );

    Ok(CompiledTemplate {
        pattern,
        variables: writer.variables,
        is_host_template: host.is_some(),
    })
}

impl PatternWriter<'_> {
    fn emit(&mut self, node: &SyntaxNode, part: Part, optional: bool) -> Result<(), CompileError> {
        match node {
            SyntaxNode::Root(children) => {
                for child in children {
                    self.emit(child, part, optional)?;
                }
            }
            SyntaxNode::Literal(text) => self.pattern.push_str(&regex::escape(text)),
            SyntaxNode::Variable {
                name,
                rules,
                default,
            } => {
                let variable = self.variable(name, rules, default.as_deref(), optional)?;
                self.pattern.push_str("(?P<");
                self.pattern.push_str(name);
                self.pattern.push('>');
                self.pattern.push_str(part.capture_class());
                self.pattern.push(')');
                self.variables.push(variable);
            }
            SyntaxNode::Optional(children) => {
                self.pattern.push_str("(?:");
                for child in children {
                    self.emit(child, part, true)?;
                }
                self.pattern.push_str(")?");
            }
        }
        Ok(())
    }

    fn variable(
        &mut self,
        name: &str,
        invocations: &[RuleInvocation],
        default: Option<&str>,
        optional: bool,
    ) -> Result<CompiledVariable, CompileError> {
        if !self.seen.insert(name.to_owned()) {
            return Err(CompileError::DuplicateVariableName {
                name: name.to_owned(),
            });
        }

        let rules = invocations
            .iter()
            .map(|invocation| self.resolve(name, invocation))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(value) = default {
            if !rules.iter().all(|r| r.passes(value)) {
                return Err(CompileError::InvalidDefault {
                    variable: name.to_owned(),
                    value: value.to_owned(),
                });
            }
        }

        let value_type = rules
            .iter()
            .find_map(VariableRule::value_type)
            .unwrap_or(ValueType::String);

        Ok(CompiledVariable {
            name: name.to_owned(),
            invocations: invocations.to_vec(),
            rules,
            default: default.map(str::to_owned),
            optional,
            value_type,
        })
    }

    fn resolve(
        &self,
        variable: &str,
        invocation: &RuleInvocation,
    ) -> Result<VariableRule, CompileError> {
        self.registry
            .get(&invocation.slug, &invocation.arguments)
            .map_err(|err| match err {
                CompileError::UnknownRule { slug, .. } => CompileError::UnknownRule {
                    slug,
                    variable: variable.to_owned(),
                },
                other => other,
            })
    }
}
