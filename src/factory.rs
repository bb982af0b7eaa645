use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::{CompileError, RouteCollection, RouteCollectionBuilder};

/// A cache write that did not go through. Never fatal: the collection that
/// failed to be stored is still returned to the caller.
#[derive(Debug, Error)]
#[error("failed to store route collection: {message}")]
pub struct CacheError {
    message: String,
}

impl CacheError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Storage for a compiled [`RouteCollection`], keyed by whatever the
/// implementation chooses (usually the application version).
///
/// A hit is authoritative: the factory returns it without compiling anything.
pub trait RouteCache: Send + Sync {
    fn get(&self) -> Option<RouteCollection>;

    /// # Errors
    ///
    /// Returns [`CacheError`] if the collection could not be stored.
    fn set(&self, routes: &RouteCollection) -> Result<(), CacheError>;
}

impl<C: RouteCache + ?Sized> RouteCache for Arc<C> {
    fn get(&self) -> Option<RouteCollection> {
        (**self).get()
    }

    fn set(&self, routes: &RouteCollection) -> Result<(), CacheError> {
        (**self).set(routes)
    }
}

/// Produces the application's route collection, from a cache when one is
/// configured and holds a collection, otherwise by running the registrar.
///
/// ```
/// use routemill::RouteFactory;
///
/// let factory = RouteFactory::new(|routes| {
///     routes.route(&["GET"], "/health", |r| r.to_handler("health"))
/// });
/// let routes = factory.create_routes().unwrap();
/// assert_eq!(routes.len(), 1);
/// ```
pub struct RouteFactory<F> {
    registrar: F,
    cache: Option<Box<dyn RouteCache>>,
}

impl<F> RouteFactory<F>
where
    F: Fn(RouteCollectionBuilder) -> RouteCollectionBuilder,
{
    pub fn new(registrar: F) -> Self {
        Self {
            registrar,
            cache: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: impl RouteCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Return the cached collection, or compile one and offer it to the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if a route declaration is malformed. Cache
    /// write failures are logged, not returned.
    pub fn create_routes(&self) -> Result<RouteCollection, CompileError> {
        if let Some(cache) = &self.cache {
            if let Some(routes) = cache.get() {
                info!(routes = routes.len(), "route cache hit");
                return Ok(routes);
            }
            info!("route cache miss, compiling routes");
        }

        let routes = (self.registrar)(RouteCollectionBuilder::new()).build()?;

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.set(&routes) {
                warn!(error = %err, "could not store compiled routes");
            }
        }
        Ok(routes)
    }
}

impl<F> fmt::Debug for RouteFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteFactory")
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}
