use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::rules::RuleRegistry;
use crate::{CompileError, UriError, UriTemplate, Value};

/// What a matched route dispatches to. Dispatch itself happens outside the
/// router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    /// A method on a controller.
    Method { controller: String, method: String },
    /// A named handler.
    Handler(String),
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteAction::Method { controller, method } => write!(f, "{controller}::{method}"),
            RouteAction::Handler(name) => f.write_str(name),
        }
    }
}

/// A middleware to run for a route, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MiddlewareBinding {
    pub name: String,
    pub parameters: BTreeMap<String, Value>,
}

impl MiddlewareBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// An immutable route: the methods it accepts, its compiled template, the
/// action it dispatches to, and the constraints and metadata attached to it.
///
/// Built with [`RouteBuilder`], usually through
/// [`RouteCollectionBuilder::route`](crate::RouteCollectionBuilder::route).
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub(crate) methods: Vec<String>,
    pub(crate) template: UriTemplate,
    pub(crate) action: RouteAction,
    pub(crate) middleware: Vec<MiddlewareBinding>,
    pub(crate) name: Option<String>,
    pub(crate) attributes: BTreeMap<String, Value>,
    pub(crate) headers_to_match: BTreeMap<String, String>,
}

impl Route {
    /// Accepted HTTP methods, deduplicated, in declared order.
    #[must_use]
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    #[must_use]
    pub fn accepts_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    #[must_use]
    pub fn template(&self) -> &UriTemplate {
        &self.template
    }

    #[must_use]
    pub fn action(&self) -> &RouteAction {
        &self.action
    }

    #[must_use]
    pub fn middleware(&self) -> &[MiddlewareBinding] {
        &self.middleware
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    #[must_use]
    pub fn headers_to_match(&self) -> &BTreeMap<String, String> {
        &self.headers_to_match
    }

    /// Generate this route's path from `values`.
    ///
    /// # Errors
    ///
    /// Returns [`UriError::MissingVariable`] when a required variable has no
    /// value and no default, or [`UriError::InvalidValue`] when a value would
    /// not stay inside its own segment.
    pub fn build_uri(&self, values: &HashMap<String, Value>) -> Result<String, UriError> {
        self.template.build_path(values)
    }

    /// Generate this route's host from `values`; `None` when the route has no
    /// host template.
    ///
    /// # Errors
    ///
    /// Same as [`build_uri`](Self::build_uri).
    pub fn build_host(&self, values: &HashMap<String, Value>) -> Result<Option<String>, UriError> {
        self.template.build_host(values)
    }

    /// Every declared header must be present with an equal value. Names are
    /// compared ignoring ASCII case, values exactly.
    pub(crate) fn headers_match(&self, headers: &HashMap<String, String>) -> bool {
        self.headers_to_match.iter().all(|(name, expected)| {
            headers
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case(name) && v == expected)
        })
    }
}

/// Collects the parts of one route declaration. Consumed by
/// [`build`](Self::build), which compiles the template.
///
/// ```
/// use routemill::{RouteBuilder, RuleRegistry};
///
/// let route = RouteBuilder::new(&["GET"], "/users/:id(int)")
///     .to_method("UserController", "show")
///     .named("GetUser")
///     .with_header("Accept", "application/json")
///     .build(&RuleRegistry::new())
///     .unwrap();
///
/// assert_eq!(route.name(), Some("GetUser"));
/// assert_eq!(route.template().compiled().variable_names(), vec!["id"]);
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct RouteBuilder {
    methods: Vec<String>,
    path: String,
    host: Option<String>,
    action: Option<RouteAction>,
    middleware: Vec<MiddlewareBinding>,
    name: Option<String>,
    attributes: BTreeMap<String, Value>,
    headers_to_match: BTreeMap<String, String>,
}

impl RouteBuilder {
    pub fn new(methods: &[&str], path: &str) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(methods.len());
        for method in methods {
            if !deduped.iter().any(|m| m == method) {
                deduped.push((*method).to_owned());
            }
        }
        Self {
            methods: deduped,
            path: path.to_owned(),
            ..Self::default()
        }
    }

    pub fn to_method(mut self, controller: &str, method: &str) -> Self {
        self.action = Some(RouteAction::Method {
            controller: controller.to_owned(),
            method: method.to_owned(),
        });
        self
    }

    pub fn to_handler(mut self, handler: &str) -> Self {
        self.action = Some(RouteAction::Handler(handler.to_owned()));
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Restrict the route to hosts matching `template`, which uses the same
    /// grammar as paths.
    pub fn host(mut self, template: &str) -> Self {
        self.host = Some(template.to_owned());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_owned(), value.into());
        self
    }

    pub fn with_many_attributes<K, V>(mut self, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_middleware(mut self, binding: MiddlewareBinding) -> Self {
        self.middleware.push(binding);
        self
    }

    pub fn with_many_middleware(
        mut self,
        bindings: impl IntoIterator<Item = MiddlewareBinding>,
    ) -> Self {
        self.middleware.extend(bindings);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers_to_match
            .insert(name.to_owned(), value.to_owned());
        self
    }

    /// Compile the template and produce the route.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingAction`] if neither
    /// [`to_method`](Self::to_method) nor [`to_handler`](Self::to_handler) was
    /// called, or any error raised while compiling the templates.
    pub fn build(self, registry: &RuleRegistry) -> Result<Route, CompileError> {
        let Some(action) = self.action else {
            return Err(CompileError::MissingAction {
                template: self.path,
            });
        };
        let template = UriTemplate::parse(&self.path, self.host.as_deref(), registry)?;
        Ok(Route {
            methods: self.methods,
            template,
            action,
            middleware: self.middleware,
            name: self.name,
            attributes: self.attributes,
            headers_to_match: self.headers_to_match,
        })
    }
}
