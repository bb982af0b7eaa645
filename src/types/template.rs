use std::collections::HashMap;

use regex::Regex;

use crate::parse::{RuleInvocation, SyntaxNode};
use crate::rules::{RuleRegistry, VariableRule};
use crate::{CompileError, UriError, Value, ValueType};

/// Separates the host from the path in the string a compiled pattern is
/// tested against.
pub(crate) const HOST_PATH_SEPARATOR: char = '\0';

/// One captured variable of a compiled template.
#[derive(Debug, Clone)]
pub struct CompiledVariable {
    pub(crate) name: String,
    pub(crate) invocations: Vec<RuleInvocation>,
    pub(crate) rules: Vec<VariableRule>,
    pub(crate) default: Option<String>,
    pub(crate) optional: bool,
    pub(crate) value_type: ValueType,
}

impl CompiledVariable {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rule invocations as written in the template, in declared order.
    #[must_use]
    pub fn invocations(&self) -> &[RuleInvocation] {
        &self.invocations
    }

    #[must_use]
    pub fn rules(&self) -> &[VariableRule] {
        &self.rules
    }

    #[must_use]
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Whether the variable sits inside an optional segment.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

/// Resolved rules are derived from the invocations, so they are left out.
impl PartialEq for CompiledVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.invocations == other.invocations
            && self.default == other.default
            && self.optional == other.optional
            && self.value_type == other.value_type
    }
}

/// The executable form of a host and path template: one anchored pattern
/// over `host + "\0" + path`, plus the ordered variables it captures.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub(crate) pattern: Regex,
    pub(crate) variables: Vec<CompiledVariable>,
    pub(crate) is_host_template: bool,
}

/// Outcome of testing one compiled template against a request.
#[derive(Debug)]
pub(crate) enum Extraction {
    NoMatch,
    Rejected { variable: String, rule: String },
    Matched(HashMap<String, Value>),
}

impl CompiledTemplate {
    /// The regular expression source of the match pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Variable names in template order, host variables first.
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// The resolved rules of variable `name`, or `None` if there is no such
    /// variable.
    #[must_use]
    pub fn variable_rules(&self, name: &str) -> Option<&[VariableRule]> {
        self.variable(name).map(|v| v.rules.as_slice())
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&CompiledVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    #[must_use]
    pub fn variables(&self) -> &[CompiledVariable] {
        &self.variables
    }

    #[must_use]
    pub fn is_host_template(&self) -> bool {
        self.is_host_template
    }

    /// Test the pattern, then every captured variable's rules in declared
    /// order. The first failing rule rejects the whole template.
    pub(crate) fn extract(&self, subject: &str) -> Extraction {
        let Some(captures) = self.pattern.captures(subject) else {
            return Extraction::NoMatch;
        };
        let mut values = HashMap::with_capacity(self.variables.len());
        for variable in &self.variables {
            let raw = match captures.name(&variable.name) {
                Some(m) => m.as_str(),
                None => match &variable.default {
                    Some(default) => default.as_str(),
                    None => continue,
                },
            };
            if let Some(rule) = variable.rules.iter().find(|r| !r.passes(raw)) {
                return Extraction::Rejected {
                    variable: variable.name.clone(),
                    rule: rule.slug().to_owned(),
                };
            }
            values.insert(
                variable.name.clone(),
                Value::coerce(raw, variable.value_type),
            );
        }
        Extraction::Matched(values)
    }
}

impl PartialEq for CompiledTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str()
            && self.variables == other.variables
            && self.is_host_template == other.is_host_template
    }
}

/// A path template, an optional host template, their syntax trees, and the
/// compiled pattern built from them.
///
/// The trees are kept for reverse URI generation, which substitutes values
/// into the template rather than into the compiled pattern.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use routemill::{RuleRegistry, UriTemplate, Value};
///
/// let template = UriTemplate::parse(
///     "/books/archives/:year(int)[/:month(int,min(1),max(12))]",
///     None,
///     &RuleRegistry::new(),
/// )
/// .unwrap();
///
/// let mut values = HashMap::new();
/// values.insert("year".to_owned(), Value::Int(2013));
/// assert_eq!(template.build_path(&values).unwrap(), "/books/archives/2013");
///
/// values.insert("month".to_owned(), Value::Int(2));
/// assert_eq!(template.build_path(&values).unwrap(), "/books/archives/2013/2");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UriTemplate {
    pub(crate) path: String,
    pub(crate) host: Option<String>,
    pub(crate) path_tree: SyntaxNode,
    pub(crate) host_tree: Option<SyntaxNode>,
    pub(crate) compiled: CompiledTemplate,
}

impl UriTemplate {
    /// Lex, parse and compile a path template and an optional host template.
    /// Leading `/` characters of the path are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Syntax`] for malformed grammar, or any error the
    /// compiler raises for the resulting trees.
    pub fn parse(
        path: &str,
        host: Option<&str>,
        registry: &RuleRegistry,
    ) -> Result<Self, CompileError> {
        let path = path.trim_start_matches('/');
        let path_tree = parse_tree(path)?;
        let host_tree = host.map(parse_tree).transpose()?;
        let compiled = crate::compile::compile(&path_tree, host_tree.as_ref(), registry)?;
        Ok(Self {
            path: path.to_owned(),
            host: host.map(str::to_owned),
            path_tree,
            host_tree,
            compiled,
        })
    }

    /// The path template, without its leading `/`.
    #[must_use]
    pub fn path_template(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn host_template(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn path_tree(&self) -> &SyntaxNode {
        &self.path_tree
    }

    #[must_use]
    pub fn host_tree(&self) -> Option<&SyntaxNode> {
        self.host_tree.as_ref()
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledTemplate {
        &self.compiled
    }

    /// Substitute `values` into the path template. The result starts with `/`.
    ///
    /// An optional segment is written only when every variable directly inside
    /// it has a supplied value; required variables fall back to their default.
    /// Values are not checked against the variable's rules.
    ///
    /// # Errors
    ///
    /// Returns [`UriError::MissingVariable`] when a required variable has
    /// neither a supplied value nor a default, and [`UriError::InvalidValue`]
    /// when a value is empty or contains `/`.
    pub fn build_path(&self, values: &HashMap<String, Value>) -> Result<String, UriError> {
        let mut out = String::from("/");
        render(self.path_tree.children(), values, &['/'], &mut out)?;
        Ok(out)
    }

    /// Substitute `values` into the host template, if there is one.
    ///
    /// # Errors
    ///
    /// Same as [`build_path`](Self::build_path), except that host values may
    /// not contain `.`.
    pub fn build_host(&self, values: &HashMap<String, Value>) -> Result<Option<String>, UriError> {
        let Some(tree) = &self.host_tree else {
            return Ok(None);
        };
        let mut out = String::new();
        render(tree.children(), values, &['.', HOST_PATH_SEPARATOR], &mut out)?;
        Ok(Some(out))
    }
}

fn parse_tree(raw: &str) -> Result<SyntaxNode, CompileError> {
    crate::parse::parse_str(raw).map_err(|source| CompileError::Syntax {
        template: raw.to_owned(),
        source,
    })
}

/// `forbidden` holds the characters a single captured segment cannot contain.
fn render(
    nodes: &[SyntaxNode],
    values: &HashMap<String, Value>,
    forbidden: &[char],
    out: &mut String,
) -> Result<(), UriError> {
    for node in nodes {
        match node {
            SyntaxNode::Literal(text) => out.push_str(text),
            SyntaxNode::Variable { name, default, .. } => {
                let text = match (values.get(name), default) {
                    (Some(value), _) => value.to_string(),
                    (None, Some(default)) => default.clone(),
                    (None, None) => {
                        return Err(UriError::MissingVariable { name: name.clone() });
                    }
                };
                if text.is_empty() || text.contains(forbidden) {
                    return Err(UriError::InvalidValue {
                        name: name.clone(),
                        value: text,
                    });
                }
                out.push_str(&text);
            }
            SyntaxNode::Optional(children) => {
                if segment_supplied(children, values) {
                    render(children, values, forbidden, out)?;
                }
            }
            SyntaxNode::Root(children) => render(children, values, forbidden, out)?,
        }
    }
    Ok(())
}

fn segment_supplied(children: &[SyntaxNode], values: &HashMap<String, Value>) -> bool {
    let mut direct = children.iter().filter_map(|child| match child {
        SyntaxNode::Variable { name, .. } => Some(name),
        _ => None,
    });
    let Some(first) = direct.next() else {
        return false;
    };
    values.contains_key(first) && direct.all(|name| values.contains_key(name))
}
