use std::collections::HashMap;

use tracing::debug;

use crate::rules::RuleRegistry;
use crate::{CompileError, MatchError, MatchedRoute, RouteMatcher, UriError};

use super::route::{Route, RouteBuilder};

/// Builder for a [`RouteCollection`].
///
/// Routes are declared through closures and compiled together on
/// [`build`](Self::build). Declaration order is match order.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use routemill::{RouteCollectionBuilder, Value};
///
/// let routes = RouteCollectionBuilder::new()
///     .route(&["GET"], "/users/:id(int)", |r| r.to_method("Users", "show").named("GetUser"))
///     .route(&["POST"], "/users", |r| r.to_method("Users", "create"))
///     .build()
///     .unwrap();
///
/// let matched = routes
///     .match_request("GET", "example.com", "/users/7", &HashMap::new())
///     .unwrap();
/// assert_eq!(matched.variable("id"), Some(&Value::Int(7)));
/// ```
#[derive(Debug, Default)]
#[must_use]
pub struct RouteCollectionBuilder {
    registry: RuleRegistry,
    routes: Vec<RouteBuilder>,
}

impl RouteCollectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `registry` to resolve rule slugs instead of the built-ins alone.
    pub fn with_rules(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Declare a route. The closure must set an action with
    /// [`to_method`](RouteBuilder::to_method) or
    /// [`to_handler`](RouteBuilder::to_handler); otherwise
    /// [`build`](Self::build) fails with [`CompileError::MissingAction`].
    pub fn route(
        mut self,
        methods: &[&str],
        path: &str,
        f: impl FnOnce(RouteBuilder) -> RouteBuilder,
    ) -> Self {
        self.routes.push(f(RouteBuilder::new(methods, path)));
        self
    }

    /// Add an already assembled route declaration.
    pub fn add(mut self, route: RouteBuilder) -> Self {
        self.routes.push(route);
        self
    }

    /// Compile every declared route into an immutable collection.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`] raised by any route, or
    /// [`CompileError::DuplicateRouteName`].
    pub fn build(self) -> Result<RouteCollection, CompileError> {
        let registry = &self.registry;
        let routes = self
            .routes
            .into_iter()
            .map(|route| route.build(registry))
            .collect::<Result<Vec<_>, _>>()?;
        RouteCollection::from_routes(routes)
    }
}

/// Compiled routes indexed by method and by name. Immutable and safe to share
/// across threads behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RouteCollection {
    routes: Vec<Route>,
    /// Indices into `routes`, in registration order.
    by_method: HashMap<String, Vec<usize>>,
    by_name: HashMap<String, usize>,
}

impl RouteCollection {
    /// Index `routes`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::DuplicateRouteName`] if two routes share a name.
    pub fn from_routes(routes: Vec<Route>) -> Result<Self, CompileError> {
        let mut by_method: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_name = HashMap::new();

        for (index, route) in routes.iter().enumerate() {
            for method in &route.methods {
                by_method.entry(method.clone()).or_default().push(index);
            }
            if let Some(name) = &route.name {
                if by_name.insert(name.clone(), index).is_some() {
                    return Err(CompileError::DuplicateRouteName { name: name.clone() });
                }
            }
        }

        debug!(
            routes = routes.len(),
            methods = by_method.len(),
            named = by_name.len(),
            "built route collection"
        );

        Ok(Self {
            routes,
            by_method,
            by_name,
        })
    }

    /// Routes accepting `method`, in registration order. Empty for a method
    /// nothing was registered for.
    #[must_use]
    pub fn get_by_method(&self, method: &str) -> Vec<&Route> {
        self.by_method
            .get(method)
            .map(|indices| indices.iter().map(|&i| &self.routes[i]).collect())
            .unwrap_or_default()
    }

    /// Look up a route by name, for reverse URI generation.
    ///
    /// # Errors
    ///
    /// Returns [`UriError::RouteNotFound`] if no route has that name.
    pub fn get_named_route(&self, name: &str) -> Result<&Route, UriError> {
        self.by_name
            .get(name)
            .map(|&i| &self.routes[i])
            .ok_or_else(|| UriError::RouteNotFound {
                name: name.to_owned(),
            })
    }

    /// Every route, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Match a request with a default [`RouteMatcher`].
    ///
    /// # Errors
    ///
    /// See [`RouteMatcher::match_request`].
    pub fn match_request(
        &self,
        method: &str,
        host: &str,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> Result<MatchedRoute<'_>, MatchError> {
        RouteMatcher::new().match_request(method, host, path, headers, self)
    }
}

#[cfg(feature = "binary-cache")]
impl RouteCollection {
    /// Serialize this compiled collection to a byte vector.
    ///
    /// The optional `version` (typically the application version) is hashed
    /// and embedded, so a loader can refuse a snapshot built by another
    /// release.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(&self, version: Option<&str>) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, version)
    }

    /// Load a collection previously produced by [`to_bytes`](Self::to_bytes).
    /// Rules are resolved against `registry`, so custom rules must be
    /// registered again.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, version, or validation failure.
    pub fn from_bytes(
        bytes: &[u8],
        registry: &RuleRegistry,
        expected_version: Option<&str>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes, registry, expected_version)
    }
}

/// The indices are derived from the routes, so only the routes are compared.
impl PartialEq for RouteCollection {
    fn eq(&self, other: &Self) -> bool {
        self.routes == other.routes
    }
}
