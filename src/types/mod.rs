mod collection;
mod error;
mod matched;
mod route;
mod template;
mod value;

pub use collection::{RouteCollection, RouteCollectionBuilder};
pub use error::{CompileError, MatchError, UriError};
pub use matched::MatchedRoute;
pub use route::{MiddlewareBinding, Route, RouteAction, RouteBuilder};
pub use template::{CompiledTemplate, CompiledVariable, UriTemplate};
pub use value::{Value, ValueType};

pub(crate) use template::{Extraction, HOST_PATH_SEPARATOR};
