//! A compiled URI-template router.
//!
//! Templates such as `books/archives/:year(int)[/:month(int,min(1),max(12))]`
//! are lexed, parsed and compiled once into anchored patterns with typed,
//! rule-constrained variables. A [`RouteCollection`] then matches requests
//! against them in registration order.
//!
//! ```
//! use std::collections::HashMap;
//! use routemill::{MatchError, RouteCollectionBuilder, Value};
//!
//! let routes = RouteCollectionBuilder::new()
//!     .route(
//!         &["GET"],
//!         "/books/archives/:year(int)[/:month(int,min(1),max(12))]",
//!         |r| r.to_method("Archive", "show").named("Archive"),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let headers = HashMap::new();
//! let matched = routes
//!     .match_request("GET", "example.com", "/books/archives/2013/2", &headers)
//!     .unwrap();
//! assert_eq!(matched.variable("year"), Some(&Value::Int(2013)));
//! assert_eq!(matched.variable("month"), Some(&Value::Int(2)));
//!
//! let missed = routes.match_request("GET", "example.com", "/books/archives/2013/13", &headers);
//! assert_eq!(missed.unwrap_err(), MatchError::RouteNotFound);
//! ```

mod compile;
mod error;
mod factory;
pub mod lex;
mod matcher;
pub mod parse;
mod rules;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod types;

pub use error::RouterError;
pub use factory::{CacheError, RouteCache, RouteFactory};
pub use matcher::RouteMatcher;
pub use parse::{RuleInvocation, SyntaxError, SyntaxNode};
pub use rules::{Rule, RuleFactory, RuleRegistry, VariableRule};
#[cfg(feature = "binary-cache")]
pub use serial::{DeserializeError, SerializeError};
pub use types::{
    CompileError, CompiledTemplate, CompiledVariable, MatchError, MatchedRoute, MiddlewareBinding,
    Route, RouteAction, RouteBuilder, RouteCollection, RouteCollectionBuilder, UriError,
    UriTemplate, Value, ValueType,
};
